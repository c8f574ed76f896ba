#![allow(dead_code)]

use std::path::PathBuf;
use swaggerc::config::GenOpts;
use swaggerc::generator::{build_models, GenerationOutput};
use swaggerc::spec::{preprocess, Preprocessed};

/// Path of a file under `tests/fixtures`
pub fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub fn fixture_str(name: &str) -> String {
    fixture(name).display().to_string()
}

/// Run the preprocessing pipeline on a fixture with the given options
pub fn preprocess_fixture(name: &str, opts: &GenOpts) -> swaggerc::Result<Preprocessed> {
    preprocess(&fixture_str(name), &opts.preprocess_options())
}

/// Preprocess and build the models of a fixture
pub fn models_for(name: &str, opts: &GenOpts) -> swaggerc::Result<GenerationOutput> {
    let pre = preprocess_fixture(name, opts)?;
    build_models(&pre, opts)
}

pub mod temp_files {
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::{SystemTime, UNIX_EPOCH};

    // Global counter and lock for thread-safe temporary file creation
    static TEMP_COUNTER: AtomicUsize = AtomicUsize::new(0);
    static TEMP_LOCK: Mutex<()> = Mutex::new(());

    /// Creates a temporary file with guaranteed unique name
    pub fn create_temp_spec(content: &str, ext: &str) -> PathBuf {
        let _lock = TEMP_LOCK.lock().unwrap();
        let counter = TEMP_COUNTER.fetch_add(1, Ordering::SeqCst);
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();

        let path = std::env::temp_dir().join(format!(
            "swaggerc_test_{}_{}_{}.{}",
            std::process::id(),
            counter,
            nanos,
            ext
        ));

        std::fs::write(&path, content).unwrap();
        path
    }

    pub fn create_temp_yaml(content: &str) -> PathBuf {
        create_temp_spec(content, "yaml")
    }

    pub fn create_temp_json(content: &str) -> PathBuf {
        create_temp_spec(content, "json")
    }

    /// Cleanup temporary files (best effort)
    pub fn cleanup_temp_files(paths: &[PathBuf]) {
        for path in paths {
            let _ = std::fs::remove_file(path);
        }
    }
}
