use crate::config::{load_config, resolve_config_path, split_list, DumpFormat, GenOpts};
use crate::generator::{self, dump_to_string, write_dump, DirectoryRenderer};
use crate::spec::{
    fetch_document, find_spec, preprocess, print_issues, validate_value, DocumentLocation,
    FlattenMode, PreprocessOptions,
};
use anyhow::Context;
use clap::{ArgAction, Args, Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Command-line interface for swaggerc
#[derive(Parser)]
#[command(name = "swaggerc", version)]
#[command(about = "Swagger 2.0 compiler front-end", long_about = None)]
pub struct Cli {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build generation models from a spec and write them out
    Generate(GenerateArgs),
    /// Validate a spec, reporting every issue found
    Validate {
        /// Path or URL of the spec; probed in the working directory when omitted
        #[arg(short, long)]
        spec: Option<String>,
    },
    /// Print the preprocessed document
    Flatten(FlattenArgs),
}

#[derive(Args, Debug, Default)]
pub struct GenerateArgs {
    /// Path or URL of the spec; probed in the working directory when omitted
    #[arg(short, long)]
    pub spec: Option<String>,

    /// Config file (default: swaggerc.toml next to the spec)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Namespace of the definition models
    #[arg(long)]
    pub models_namespace: Option<String>,

    #[arg(long, value_enum)]
    pub flatten: Option<FlattenMode>,

    #[arg(long, default_value_t = false)]
    pub skip_validation: bool,

    /// Keep properties in declaration order
    #[arg(long, default_value_t = false)]
    pub properties_spec_order: bool,

    /// Accept a document that only declares definitions
    #[arg(long, default_value_t = false)]
    pub accept_definitions_only: bool,

    /// Only operations with one of these tags (comma-separated)
    #[arg(long)]
    pub tags: Option<String>,

    /// Only these operations (comma-separated)
    #[arg(long)]
    pub operations: Option<String>,

    /// Only these definitions (comma-separated)
    #[arg(long)]
    pub models: Option<String>,

    /// Print the models instead of writing files
    #[arg(long, default_value_t = false)]
    pub dump_only: bool,

    #[arg(long, value_enum)]
    pub dump_format: Option<DumpFormat>,

    /// Directory the model files are written to
    #[arg(short, long, default_value = "generated")]
    pub output: PathBuf,
}

#[derive(Args, Debug)]
pub struct FlattenArgs {
    #[arg(short, long)]
    pub spec: Option<String>,

    #[arg(long, value_enum, default_value_t = FlattenMode::Minimal)]
    pub flatten: FlattenMode,

    #[arg(long, value_enum, default_value_t = DumpFormat::Json)]
    pub format: DumpFormat,

    #[arg(long, default_value_t = false)]
    pub skip_validation: bool,

    #[arg(long, default_value_t = false)]
    pub properties_spec_order: bool,
}

/// Execute a parsed command line
///
/// # Errors
///
/// Returns an error if:
/// - The spec cannot be located, loaded or parsed
/// - The config file or an environment override is invalid
/// - Validation finds errors
/// - A model cannot be built or written
pub fn run_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Generate(args) => {
            let opts = generation_options(&args, |key| std::env::var(key).ok())?;
            let mut renderer = DirectoryRenderer::new(&args.output, opts.dump_format);
            let output = generator::run(&opts, &mut renderer)?;
            if opts.dump_only {
                let stdout = std::io::stdout();
                let mut lock = stdout.lock();
                write_dump(&output, opts.dump_format, &mut lock)?;
                lock.flush().context("Failed to flush stdout")?;
            } else {
                info!(
                    files = renderer.written().len(),
                    root = %renderer.root().display(),
                    "generation complete"
                );
                println!(
                    "Wrote {} file(s) to {}",
                    renderer.written().len(),
                    renderer.root().display()
                );
            }
            Ok(())
        }
        Commands::Validate { spec } => {
            let location = locate_spec(spec.as_deref())?;
            let value = fetch_document(&DocumentLocation::parse(&location))?;
            let issues = validate_value(&value);
            if issues.is_empty() {
                println!("{location} is valid");
                return Ok(());
            }
            print_issues(&issues);
            let errors = issues.iter().filter(|i| i.is_error()).count();
            if errors > 0 {
                anyhow::bail!("{location} has {errors} validation error(s)");
            }
            Ok(())
        }
        Commands::Flatten(args) => {
            let location = locate_spec(args.spec.as_deref())?;
            let opts = PreprocessOptions {
                validate: !args.skip_validation,
                flatten_mode: args.flatten,
                properties_spec_order: args.properties_spec_order,
                minimal_header: false,
            };
            let pre = preprocess(&location, &opts)?;
            for collision in &pre.report.collisions {
                eprintln!(
                    "renamed {} to {} ({})",
                    collision.requested, collision.assigned, collision.origin
                );
            }
            println!("{}", dump_to_string(pre.document.value(), args.format)?);
            Ok(())
        }
    }
}

/// Layer defaults, config file, environment and flags into one set of options.
/// The spec is probed in the working directory when no layer names one.
pub fn generation_options<F>(args: &GenerateArgs, env: F) -> anyhow::Result<GenOpts>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = &args.config {
        if !path.exists() {
            anyhow::bail!("Config file not found: {}", path.display());
        }
    }
    let spec_hint = args
        .spec
        .clone()
        .or_else(|| env("SWAGGERC_SPEC"))
        .unwrap_or_else(|| ".".to_string());
    let spec_path = Path::new(&spec_hint);
    let config_path = match args.config.as_deref() {
        Some(path) => Some(path.to_path_buf()),
        None if spec_path.is_dir() => {
            Some(spec_path.join(crate::config::CONFIG_FILE_NAME)).filter(|p| p.exists())
        }
        None => resolve_config_path(None, spec_path),
    };

    let mut opts = match &config_path {
        Some(path) => load_config(path)?.unwrap_or_default(),
        None => GenOpts::default(),
    };
    opts.apply_env_from(&env)?;

    if let Some(spec) = &args.spec {
        opts.spec = Some(spec.clone());
    }
    if let Some(ns) = &args.models_namespace {
        opts.models_namespace = ns.clone();
    }
    if let Some(mode) = args.flatten {
        opts.flatten_mode = mode;
    }
    if args.skip_validation {
        opts.validate_spec = false;
    }
    if args.properties_spec_order {
        opts.properties_spec_order = true;
    }
    if args.accept_definitions_only {
        opts.accept_definitions_only = true;
    }
    if let Some(tags) = &args.tags {
        opts.tag_filter = split_list(tags);
    }
    if let Some(ops) = &args.operations {
        opts.operation_filter = split_list(ops);
    }
    if let Some(models) = &args.models {
        opts.model_filter = split_list(models);
    }
    if args.dump_only {
        opts.dump_only = true;
    }
    if let Some(format) = args.dump_format {
        opts.dump_format = format;
    }

    if opts.spec.is_none() {
        opts.spec = Some(locate_spec(None)?);
    }
    Ok(opts)
}

fn locate_spec(spec: Option<&str>) -> anyhow::Result<String> {
    if let Some(spec) = spec {
        return Ok(spec.to_string());
    }
    let cwd = std::env::current_dir().context("Failed to read working directory")?;
    Ok(find_spec(None, &cwd)?.display().to_string())
}
