//! # Generator Module
//!
//! Turns a preprocessed document into generation models and hands them to a
//! [`Renderer`].
//!
//! ```text
//! spec → preprocess → registry → {definitions, operations} → renderer | dump
//! ```
//!
//! 1. **Registry** - every definition name is registered before any body is resolved
//! 2. **Definitions** - one [`DefinitionModel`] per selected definition
//! 3. **Operations** - one [`OperationModel`] per selected operation and tag
//! 4. **Groups** - operations grouped by namespace
//!
//! Definitions and operations are resolved in parallel once the registry is frozen.
//!
//! ## Programmatic Usage
//!
//! ```rust,ignore
//! use swaggerc::config::GenOpts;
//! use swaggerc::generator::generate;
//!
//! let opts = GenOpts { spec: Some("swagger.yaml".into()), ..GenOpts::default() };
//! let output = generate(&opts)?;
//! for model in &output.definitions {
//!     println!("{} -> {}", model.name, model.resolved);
//! }
//! ```

mod definition;
mod dump;
mod operation;
#[cfg(test)]
mod tests;

pub use definition::*;
pub use dump::*;
pub use operation::*;

use crate::config::GenOpts;
use crate::error::{GenError, Result};
use crate::resolver::{KnownDefinitions, TypeResolver};
use crate::spec::{find_spec, preprocess, NameCollision, Preprocessed, ValidationIssue};
use serde::Serialize;
use tracing::info;

/// Consumer of the generation models
pub trait Renderer {
    fn render_definition(&mut self, model: &DefinitionModel) -> anyhow::Result<()>;

    fn render_operation(&mut self, model: &OperationModel) -> anyhow::Result<()>;

    fn render_group(&mut self, _group: &OperationGroup) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Everything produced by one run
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationOutput {
    pub definitions: Vec<DefinitionModel>,
    pub operations: Vec<OperationModel>,
    pub groups: Vec<OperationGroup>,
    /// Definitions renamed by flattening
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub collisions: Vec<NameCollision>,
    /// Validation warnings
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ValidationIssue>,
}

/// Build the models of a preprocessed document
pub fn build_models(pre: &Preprocessed, opts: &GenOpts) -> Result<GenerationOutput> {
    let spec = pre.document.spec();
    let registry = KnownDefinitions::from_spec(spec, &opts.models_namespace);
    let resolver = TypeResolver::new(&opts.models_namespace, &registry);

    let selected = gather_definitions(spec, &opts.model_filter)?;
    let definitions = build_definitions(&resolver, &selected)?;

    let (operations, groups) = if opts.accept_definitions_only {
        (Vec::new(), Vec::new())
    } else {
        let filter = OperationFilter {
            tags: &opts.tag_filter,
            operations: &opts.operation_filter,
            default_namespace: &opts.default_namespace,
        };
        let entries = select_operations(gather_operations(spec), &filter)?;
        let operations = build_operations(&resolver, spec, &entries, &filter)?;
        let groups = group_operations(&operations);
        (operations, groups)
    };

    info!(
        definitions = definitions.len(),
        operations = operations.len(),
        groups = groups.len(),
        "built generation models"
    );
    Ok(GenerationOutput {
        definitions,
        operations,
        groups,
        collisions: pre.report.collisions.clone(),
        warnings: pre.issues.clone(),
    })
}

/// Locate, preprocess and build. A missing `spec` is looked up in the working directory.
pub fn generate(opts: &GenOpts) -> Result<GenerationOutput> {
    let location = match &opts.spec {
        Some(location) => location.clone(),
        None => {
            let cwd = std::env::current_dir().map_err(|e| GenError::UnreachableSpec {
                location: ".".to_string(),
                reason: e.to_string(),
            })?;
            find_spec(None, &cwd)?.display().to_string()
        }
    };
    let pre = preprocess(&location, &opts.preprocess_options())?;
    build_models(&pre, opts)
}

/// Hand every model to the renderer: definitions, then operations, then groups
pub fn render<R: Renderer + ?Sized>(output: &GenerationOutput, renderer: &mut R) -> anyhow::Result<()> {
    for model in &output.definitions {
        renderer.render_definition(model)?;
    }
    for model in &output.operations {
        renderer.render_operation(model)?;
    }
    for group in &output.groups {
        renderer.render_group(group)?;
    }
    Ok(())
}

/// Generate and render, unless `dump_only` is set
pub fn run<R: Renderer + ?Sized>(opts: &GenOpts, renderer: &mut R) -> anyhow::Result<GenerationOutput> {
    let output = generate(opts)?;
    if !opts.dump_only {
        render(&output, renderer)?;
    }
    Ok(output)
}
