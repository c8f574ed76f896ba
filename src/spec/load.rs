use super::types::Swagger;
use crate::error::{GenError, Result};
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Candidate file names probed when no spec location is given
pub const DEFAULT_SPEC_NAMES: [&str; 3] = ["swagger.json", "swagger.yml", "swagger.yaml"];

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Where a document came from. Remote references are resolved relative to it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DocumentLocation {
    File(PathBuf),
    Url(Url),
    /// Built in memory; relative references cannot be resolved against it
    Memory,
}

impl DocumentLocation {
    /// Interpret a user-supplied location: absolute `http(s)`/`file` URLs, else a filesystem path
    pub fn parse(location: &str) -> Self {
        match Url::parse(location) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => DocumentLocation::Url(url),
            Ok(url) if url.scheme() == "file" => match url.to_file_path() {
                Ok(path) => DocumentLocation::File(path),
                Err(()) => DocumentLocation::Url(url),
            },
            _ => DocumentLocation::File(PathBuf::from(location)),
        }
    }

    /// Resolve the document part of a `$ref` against this location
    pub fn join(&self, reference: &str) -> Result<DocumentLocation> {
        if reference.is_empty() {
            return Ok(self.clone());
        }
        if let Ok(url) = Url::parse(reference) {
            return Ok(DocumentLocation::parse(url.as_str()));
        }
        match self {
            DocumentLocation::Url(base) => base
                .join(reference)
                .map(DocumentLocation::Url)
                .map_err(|e| GenError::UnreachableSpec {
                    location: reference.to_string(),
                    reason: e.to_string(),
                }),
            DocumentLocation::File(path) => {
                let dir = path.parent().unwrap_or_else(|| Path::new(""));
                Ok(DocumentLocation::File(dir.join(reference)))
            }
            DocumentLocation::Memory => Ok(DocumentLocation::File(PathBuf::from(reference))),
        }
    }

    /// Stem used when a whole remote document becomes a definition
    pub fn stem(&self) -> String {
        let raw = match self {
            DocumentLocation::File(path) => path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
            DocumentLocation::Url(url) => url
                .path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
                .unwrap_or_default(),
            DocumentLocation::Memory => String::new(),
        };
        match raw.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem.to_string(),
            _ => raw,
        }
    }

    fn is_yaml(&self) -> bool {
        let name = match self {
            DocumentLocation::File(path) => path.to_string_lossy().into_owned(),
            DocumentLocation::Url(url) => url.path().to_string(),
            DocumentLocation::Memory => return false,
        };
        name.ends_with(".yaml") || name.ends_with(".yml")
    }
}

impl fmt::Display for DocumentLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentLocation::File(path) => write!(f, "{}", path.display()),
            DocumentLocation::Url(url) => write!(f, "{url}"),
            DocumentLocation::Memory => write!(f, "<memory>"),
        }
    }
}

/// Parse JSON or YAML text. The extension only decides which parser goes first.
pub fn parse_document(content: &str, prefer_yaml: bool) -> std::result::Result<Value, String> {
    if prefer_yaml {
        serde_yaml::from_str(content).map_err(|e| e.to_string())
    } else {
        serde_json::from_str(content).or_else(|json_err| {
            serde_yaml::from_str(content)
                .map_err(|yaml_err| format!("not JSON ({json_err}) nor YAML ({yaml_err})"))
        })
    }
}

/// Read a document from disk or over HTTP and parse it
pub fn fetch_document(location: &DocumentLocation) -> Result<Value> {
    let content = match location {
        DocumentLocation::File(path) => {
            std::fs::read_to_string(path).map_err(|e| GenError::UnreachableSpec {
                location: location.to_string(),
                reason: e.to_string(),
            })?
        }
        DocumentLocation::Url(url) => fetch_remote(url)?,
        DocumentLocation::Memory => {
            return Err(GenError::UnreachableSpec {
                location: location.to_string(),
                reason: "in-memory documents cannot be fetched".to_string(),
            })
        }
    };
    debug!(location = %location, bytes = content.len(), "fetched document");
    parse_document(&content, location.is_yaml()).map_err(|reason| GenError::ParseSpec {
        location: location.to_string(),
        reason,
    })
}

fn fetch_remote(url: &Url) -> Result<String> {
    let unreachable = |reason: String| GenError::UnreachableSpec {
        location: url.to_string(),
        reason,
    };
    let client = reqwest::blocking::Client::builder()
        .timeout(FETCH_TIMEOUT)
        .build()
        .map_err(|e| unreachable(e.to_string()))?;
    let response = client
        .get(url.clone())
        .send()
        .map_err(|e| unreachable(e.to_string()))?;
    if !response.status().is_success() {
        return Err(unreachable(format!("HTTP {}", response.status())));
    }
    response.text().map_err(|e| unreachable(e.to_string()))
}

/// Drop `x-` keys from the Paths Object so every remaining value is a Path Item
fn strip_path_extensions(val: &mut Value) {
    if let Some(Value::Object(paths)) = val.get_mut("paths") {
        paths.retain(|k, _| !k.starts_with("x-"));
    }
}

/// Immutable snapshot of a spec at one preprocessing stage.
///
/// Every transforming stage produces a new snapshot with [`SpecDocument::with_value`];
/// earlier snapshots stay valid, so the typed view never goes stale.
#[derive(Debug, Clone)]
pub struct SpecDocument {
    location: DocumentLocation,
    pristine: Arc<Value>,
    value: Arc<Value>,
    spec: Arc<Swagger>,
}

impl SpecDocument {
    /// Load from a file path or URL
    pub fn load(location: &str) -> Result<Self> {
        let location = DocumentLocation::parse(location);
        let value = fetch_document(&location)?;
        info!(location = %location, "loaded spec");
        Self::from_value(location, value)
    }

    /// Build a snapshot from an already parsed document
    pub fn from_value(location: DocumentLocation, value: Value) -> Result<Self> {
        let spec = typed(&location, &value)?;
        let value = Arc::new(value);
        Ok(Self {
            location,
            pristine: Arc::clone(&value),
            value,
            spec: Arc::new(spec),
        })
    }

    /// Snapshot of `value` that remembers `pristine` as the loaded document
    pub fn from_stages(location: DocumentLocation, pristine: Value, value: Value) -> Result<Self> {
        let spec = typed(&location, &value)?;
        Ok(Self {
            location,
            pristine: Arc::new(pristine),
            value: Arc::new(value),
            spec: Arc::new(spec),
        })
    }

    /// New snapshot with the same origin and pristine document
    pub fn with_value(&self, value: Value) -> Result<Self> {
        let spec = typed(&self.location, &value)?;
        Ok(Self {
            location: self.location.clone(),
            pristine: Arc::clone(&self.pristine),
            value: Arc::new(value),
            spec: Arc::new(spec),
        })
    }

    /// Snapshot of the document exactly as it was loaded
    pub fn pristine(&self) -> Result<Self> {
        self.with_value(self.pristine.as_ref().clone())
    }

    pub fn location(&self) -> &DocumentLocation {
        &self.location
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn pristine_value(&self) -> &Value {
        &self.pristine
    }

    pub fn spec(&self) -> &Swagger {
        &self.spec
    }

    /// Declared Swagger version, empty when absent
    pub fn version(&self) -> &str {
        &self.spec.swagger
    }
}

/// Typed view of a parsed document, or why its shape does not fit one
pub fn typed_view(value: &Value) -> std::result::Result<Swagger, String> {
    if !value.is_object() {
        return Err("document root is not an object".to_string());
    }
    let mut view = value.clone();
    strip_path_extensions(&mut view);
    serde_json::from_value(view).map_err(|e| e.to_string())
}

fn typed(location: &DocumentLocation, value: &Value) -> Result<Swagger> {
    typed_view(value).map_err(|reason| GenError::ParseSpec {
        location: location.to_string(),
        reason,
    })
}

/// Locate a spec file: an explicit path must exist; otherwise the default names
/// are probed in `dir`.
pub fn find_spec(explicit: Option<&Path>, dir: &Path) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        return Err(GenError::UnreachableSpec {
            location: path.display().to_string(),
            reason: "file does not exist".to_string(),
        });
    }
    DEFAULT_SPEC_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|candidate| candidate.exists())
        .ok_or_else(|| GenError::UnreachableSpec {
            location: dir.display().to_string(),
            reason: format!("none of {} found", DEFAULT_SPEC_NAMES.join(", ")),
        })
}
