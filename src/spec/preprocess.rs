//! Spec preprocessing pipeline.
//!
//! `load → [annotate order] → [minimal header] → [validate] → flatten`
//!
//! The stages up to validation work on the parsed value, so a document whose
//! shape does not fit the typed view still gets every problem reported. After
//! that each stage takes a [`SpecDocument`] snapshot and returns a new one with
//! a typed view derived from its own value. Nothing is mutated in place, so an
//! expanded document never needs reloading and a failed stage never leaves a
//! half-transformed document behind.

use super::flatten::{flatten, FlattenMode, FlattenReport};
use super::load::{fetch_document, DocumentLocation, SpecDocument};
use super::order::annotate_property_order;
use super::validate::{fail_if_errors, validate_value, ValidationIssue};
use crate::error::Result;
use serde_json::{json, Map, Value};
use std::fmt;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Load,
    AnnotateOrder,
    MinimalHeader,
    Validate,
    Flatten,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Load => "load",
            Stage::AnnotateOrder => "annotate_order",
            Stage::MinimalHeader => "minimal_header",
            Stage::Validate => "validate",
            Stage::Flatten => "flatten",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PreprocessOptions {
    pub validate: bool,
    pub flatten_mode: FlattenMode,
    /// Inject `x-order` on every property
    pub properties_spec_order: bool,
    /// Fill in the header of a definitions-only document
    pub minimal_header: bool,
}

impl Default for PreprocessOptions {
    fn default() -> Self {
        PreprocessOptions {
            validate: true,
            flatten_mode: FlattenMode::Minimal,
            properties_spec_order: false,
            minimal_header: false,
        }
    }
}

/// Result of a full pipeline run
#[derive(Debug, Clone)]
pub struct Preprocessed {
    pub document: SpecDocument,
    pub report: FlattenReport,
    /// Warning-level validation issues
    pub issues: Vec<ValidationIssue>,
}

/// Load a document from a path or URL and run every stage
pub fn preprocess(location: &str, opts: &PreprocessOptions) -> Result<Preprocessed> {
    info!(stage = %Stage::Load, location = %location, "preprocessing");
    let location = DocumentLocation::parse(location);
    let value = fetch_document(&location)?;
    preprocess_value(location, value, opts)
}

/// Run every stage after loading
pub fn preprocess_document(doc: SpecDocument, opts: &PreprocessOptions) -> Result<Preprocessed> {
    let pristine = doc.pristine_value().clone();
    let staged = staged_value(doc.value().clone(), opts);
    finish(doc.location().clone(), pristine, staged, opts)
}

/// Run every stage on a parsed document
pub fn preprocess_value(
    location: DocumentLocation,
    value: Value,
    opts: &PreprocessOptions,
) -> Result<Preprocessed> {
    let staged = staged_value(value.clone(), opts);
    finish(location, value, staged, opts)
}

/// Order annotation and header synthesis
fn staged_value(mut value: Value, opts: &PreprocessOptions) -> Value {
    if opts.properties_spec_order {
        info!(stage = %Stage::AnnotateOrder, "annotating property order");
        annotate_property_order(&mut value);
    }
    if opts.minimal_header && synthesize_minimal_header(&mut value) {
        info!(stage = %Stage::MinimalHeader, "synthesized minimal header");
    }
    value
}

fn finish(
    location: DocumentLocation,
    pristine: Value,
    value: Value,
    opts: &PreprocessOptions,
) -> Result<Preprocessed> {
    let mut issues = Vec::new();
    if opts.validate {
        info!(stage = %Stage::Validate, "validating");
        issues = fail_if_errors(&location.to_string(), validate_value(&value))?;
    } else {
        debug!(stage = %Stage::Validate, "validation skipped");
    }

    let doc = SpecDocument::from_stages(location, pristine, value)?;
    info!(stage = %Stage::Flatten, mode = %opts.flatten_mode, "flattening");
    let (doc, report) = flatten(&doc, opts.flatten_mode)?;

    Ok(Preprocessed {
        document: doc,
        report,
        issues,
    })
}

/// Add `swagger`, `info` and `paths` when missing. Returns whether anything changed.
pub fn synthesize_minimal_header(value: &mut Value) -> bool {
    let Value::Object(root) = value else {
        return false;
    };
    let mut changed = false;
    if !root.contains_key("swagger") {
        root.insert("swagger".to_string(), json!("2.0"));
        changed = true;
    }
    if !root.contains_key("info") {
        root.insert(
            "info".to_string(),
            json!({"title": "minimal", "version": "0.0.0"}),
        );
        changed = true;
    }
    if !root.contains_key("paths") {
        root.insert("paths".to_string(), Value::Object(Map::new()));
        changed = true;
    }
    changed
}
