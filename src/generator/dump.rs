//! Serialized output of the generation models.

use super::{DefinitionModel, GenerationOutput, OperationGroup, OperationModel, Renderer};
use crate::config::DumpFormat;
use anyhow::Context;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

pub fn dump_to_string<T: Serialize>(value: &T, format: DumpFormat) -> anyhow::Result<String> {
    match format {
        DumpFormat::Json => {
            serde_json::to_string_pretty(value).context("Failed to serialize models as JSON")
        }
        DumpFormat::Yaml => serde_yaml::to_string(value).context("Failed to serialize models as YAML"),
    }
}

/// Write the whole output as one document
pub fn write_dump<W: Write>(
    output: &GenerationOutput,
    format: DumpFormat,
    writer: &mut W,
) -> anyhow::Result<()> {
    let text = dump_to_string(output, format)?;
    writer
        .write_all(text.as_bytes())
        .context("Failed to write dump")?;
    if !text.ends_with('\n') {
        writer.write_all(b"\n").context("Failed to write dump")?;
    }
    Ok(())
}

/// Writes one file per model under `<root>/<package>/`
#[derive(Debug, Clone)]
pub struct DirectoryRenderer {
    root: PathBuf,
    format: DumpFormat,
    written: Vec<PathBuf>,
}

impl DirectoryRenderer {
    pub fn new(root: impl Into<PathBuf>, format: DumpFormat) -> Self {
        DirectoryRenderer {
            root: root.into(),
            format,
            written: Vec::new(),
        }
    }

    /// Files written so far
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    fn write<T: Serialize>(&mut self, package: &str, name: &str, model: &T) -> anyhow::Result<()> {
        let dir = self.root.join(package);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create directory {}", dir.display()))?;
        let ext = match self.format {
            DumpFormat::Json => "json",
            DumpFormat::Yaml => "yaml",
        };
        let path = dir.join(format!("{name}.{ext}"));
        let text = dump_to_string(model, self.format)?;
        std::fs::write(&path, text)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        debug!(path = %path.display(), "wrote model");
        self.written.push(path);
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Renderer for DirectoryRenderer {
    fn render_definition(&mut self, model: &DefinitionModel) -> anyhow::Result<()> {
        self.write(&model.package, &model.type_name, model)
    }

    fn render_operation(&mut self, model: &OperationModel) -> anyhow::Result<()> {
        self.write(&model.package, &model.name, model)
    }

    fn render_group(&mut self, group: &OperationGroup) -> anyhow::Result<()> {
        self.write(&group.package, "_group", group)
    }
}
