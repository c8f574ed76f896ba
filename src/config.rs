//! Generation options.
//!
//! Options are layered: built-in defaults, then an optional `swaggerc.toml`
//! (explicit path or auto-detected next to the spec), then `SWAGGERC_*`
//! environment variables, then command-line flags.

use crate::spec::{FlattenMode, PreprocessOptions};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Config file looked up alongside the spec
pub const CONFIG_FILE_NAME: &str = "swaggerc.toml";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DumpFormat {
    #[default]
    Json,
    Yaml,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenOpts {
    /// Path or URL of the spec; probed in the working directory when unset
    pub spec: Option<String>,
    pub validate_spec: bool,
    pub flatten_mode: FlattenMode,
    /// Keep properties in declaration order via `x-order`
    pub properties_spec_order: bool,
    /// Build models only; the document may lack `swagger`, `info` and `paths`
    pub accept_definitions_only: bool,
    pub models_namespace: String,
    /// Namespace for operations without tags
    pub default_namespace: String,
    pub tag_filter: BTreeSet<String>,
    pub operation_filter: BTreeSet<String>,
    pub model_filter: BTreeSet<String>,
    /// Produce the models without rendering them
    pub dump_only: bool,
    pub dump_format: DumpFormat,
}

impl Default for GenOpts {
    fn default() -> Self {
        GenOpts {
            spec: None,
            validate_spec: true,
            flatten_mode: FlattenMode::Minimal,
            properties_spec_order: false,
            accept_definitions_only: false,
            models_namespace: "models".to_string(),
            default_namespace: "operations".to_string(),
            tag_filter: BTreeSet::new(),
            operation_filter: BTreeSet::new(),
            model_filter: BTreeSet::new(),
            dump_only: false,
            dump_format: DumpFormat::Json,
        }
    }
}

impl GenOpts {
    pub fn preprocess_options(&self) -> PreprocessOptions {
        PreprocessOptions {
            validate: self.validate_spec,
            flatten_mode: self.flatten_mode,
            properties_spec_order: self.properties_spec_order,
            minimal_header: self.accept_definitions_only,
        }
    }

    /// Apply `SWAGGERC_*` overrides from the process environment
    pub fn apply_env(&mut self) -> anyhow::Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup
    pub fn apply_env_from<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(spec) = lookup("SWAGGERC_SPEC") {
            self.spec = Some(spec);
        }
        if let Some(v) = lookup("SWAGGERC_VALIDATE_SPEC") {
            self.validate_spec = parse_bool("SWAGGERC_VALIDATE_SPEC", &v)?;
        }
        if let Some(v) = lookup("SWAGGERC_FLATTEN_MODE") {
            self.flatten_mode = v
                .parse()
                .map_err(|e: String| anyhow::anyhow!(e))
                .context("Invalid SWAGGERC_FLATTEN_MODE")?;
        }
        if let Some(v) = lookup("SWAGGERC_PROPERTIES_SPEC_ORDER") {
            self.properties_spec_order = parse_bool("SWAGGERC_PROPERTIES_SPEC_ORDER", &v)?;
        }
        if let Some(v) = lookup("SWAGGERC_MODELS_NAMESPACE") {
            self.models_namespace = v;
        }
        if let Some(v) = lookup("SWAGGERC_DEFAULT_NAMESPACE") {
            self.default_namespace = v;
        }
        if let Some(v) = lookup("SWAGGERC_ACCEPT_DEFINITIONS_ONLY") {
            self.accept_definitions_only = parse_bool("SWAGGERC_ACCEPT_DEFINITIONS_ONLY", &v)?;
        }
        if let Some(v) = lookup("SWAGGERC_TAGS") {
            self.tag_filter = split_list(&v);
        }
        if let Some(v) = lookup("SWAGGERC_OPERATIONS") {
            self.operation_filter = split_list(&v);
        }
        if let Some(v) = lookup("SWAGGERC_MODELS") {
            self.model_filter = split_list(&v);
        }
        if let Some(v) = lookup("SWAGGERC_DUMP_ONLY") {
            self.dump_only = parse_bool("SWAGGERC_DUMP_ONLY", &v)?;
        }
        if let Some(v) = lookup("SWAGGERC_DUMP_FORMAT") {
            self.dump_format = <DumpFormat as clap::ValueEnum>::from_str(&v, true)
                .map_err(|e| anyhow::anyhow!(e))
                .context("Invalid SWAGGERC_DUMP_FORMAT")?;
        }
        Ok(())
    }
}

fn parse_bool(key: &str, value: &str) -> anyhow::Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("Invalid boolean for {key}: {other:?}"),
    }
}

/// Comma-separated list, blanks dropped
pub fn split_list(value: &str) -> BTreeSet<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Load options from a TOML file.
///
/// Returns `Ok(None)` when the file does not exist and `Err` when it exists
/// but cannot be read or parsed.
pub fn load_config(config_path: &Path) -> anyhow::Result<Option<GenOpts>> {
    if !config_path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(config_path)
        .with_context(|| format!("Failed to read config: {}", config_path.display()))?;
    let opts: GenOpts = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config: {}", config_path.display()))?;
    debug!(path = %config_path.display(), "loaded config");
    Ok(Some(opts))
}

/// `swaggerc.toml` next to the spec, if it exists
pub fn auto_detect_config_path(spec_path: &Path) -> Option<PathBuf> {
    let config_path = spec_path.parent()?.join(CONFIG_FILE_NAME);
    config_path.exists().then_some(config_path)
}

/// Explicit path first, then auto-detection
pub fn resolve_config_path(explicit_path: Option<&Path>, spec_path: &Path) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        if path.exists() {
            return Some(path.to_path_buf());
        }
    }
    auto_detect_config_path(spec_path)
}
