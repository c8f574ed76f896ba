//! Structural validation of a Swagger 2.0 document.
//!
//! Checks run against the raw document first (header, node shapes, references,
//! defaults) and then against the typed view (operations, parameters) when the
//! document's shape allows one. Every issue is collected; nothing here stops
//! at the first problem, and a badly shaped node is reported like any other.
//!
//! ## Checks Performed
//!
//! 1. `swagger` is `"2.0"` and `info` carries a title and a version
//! 2. Nodes have the JSON type the object model expects (`invalid_type`)
//! 3. Path keys start with `/`
//! 4. Operations declare at least one response and unique operation ids
//! 5. Parameters use a known `in`, carry a schema (body) or a type (others),
//!    appear at most once per `(name, in)`, and never mix body with formData
//! 6. Path parameters are required and match the path template one to one
//! 7. Array schemas declare `items`
//! 8. Local `$ref`s resolve
//! 9. `required` names exist in `properties` (warning)
//! 10. Defaults validate against their own schema

use super::pointer;
use super::load::typed_view;
use super::types::{Operation, Parameter, ParameterLocation, Swagger};
use super::SpecDocument;
use crate::error::{GenError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, warn};

static PATH_TEMPLATE_PARAM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([^{}/]+)\}").expect("path template regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Blocks generation
    Error,
    /// Reported, generation continues
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A problem found in a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    /// JSON pointer to the offending node
    pub location: String,
    pub severity: Severity,
    /// Machine-readable issue kind (e.g. `duplicate_operation_id`)
    pub kind: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(
        location: impl Into<String>,
        kind: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        ValidationIssue {
            location: location.into(),
            severity: Severity::Error,
            kind: kind.into(),
            message: message.into(),
        }
    }

    pub fn warning(
        location: impl Into<String>,
        kind: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        ValidationIssue {
            severity: Severity::Warning,
            ..Self::new(location, kind, message)
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let location = if self.location.is_empty() {
            "#"
        } else {
            &self.location
        };
        write!(
            f,
            "[{}] {} at {}: {}",
            self.severity, self.kind, location, self.message
        )
    }
}

pub fn print_issues(issues: &[ValidationIssue]) {
    let errors = issues.iter().filter(|i| i.is_error()).count();
    eprintln!(
        "\n{} issue(s) found ({} error(s), {} warning(s)):\n",
        issues.len(),
        errors,
        issues.len() - errors
    );
    for issue in issues {
        eprintln!("{issue}");
    }
}

/// Turn collected issues into `InvalidSpec` when any of them is an error.
/// Warnings are logged and returned.
pub fn fail_if_errors(
    location: &str,
    issues: Vec<ValidationIssue>,
) -> Result<Vec<ValidationIssue>> {
    let (errors, warnings): (Vec<_>, Vec<_>) = issues.into_iter().partition(|i| i.is_error());
    for w in &warnings {
        warn!(location = %w.location, kind = %w.kind, "{}", w.message);
    }
    if errors.is_empty() {
        Ok(warnings)
    } else {
        Err(GenError::InvalidSpec {
            location: location.to_string(),
            errors,
        })
    }
}

/// Validate a document snapshot, returning every issue found
pub fn validate_spec(doc: &SpecDocument) -> Vec<ValidationIssue> {
    validate_value(doc.value())
}

/// Validate a parsed document that may not fit the typed view yet
pub fn validate_value(root: &Value) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    check_header(root, &mut issues);
    check_tags(root, &mut issues);
    check_references(root, &mut issues);
    check_all_schemas(root, &mut issues);
    match typed_view(root) {
        Ok(spec) => check_paths(&spec, &mut issues),
        Err(reason) => {
            // shape problems already reported explain the failed view
            if !issues.iter().any(|i| i.kind == INVALID_TYPE) {
                issues.push(ValidationIssue::new(
                    "",
                    "malformed_document",
                    format!("document does not fit the Swagger 2.0 object model: {reason}"),
                ));
            }
        }
    }
    debug!(issues = issues.len(), "validation finished");
    issues
}

const INVALID_TYPE: &str = "invalid_type";

fn invalid_type(ptr: &str, expected: &str) -> ValidationIssue {
    ValidationIssue::new(ptr, INVALID_TYPE, format!("expected {expected}"))
}

fn non_blank(value: Option<&Value>) -> bool {
    value
        .and_then(Value::as_str)
        .map(|s| !s.trim().is_empty())
        .unwrap_or(false)
}

fn check_header(root: &Value, issues: &mut Vec<ValidationIssue>) {
    let Value::Object(root) = root else {
        issues.push(invalid_type("", "the document root to be an object"));
        return;
    };
    match root.get("swagger") {
        Some(Value::String(version)) if version == "2.0" => {}
        other => issues.push(ValidationIssue::new(
            "/swagger",
            "unsupported_version",
            format!(
                "expected swagger \"2.0\", found {}",
                other.map(Value::to_string).unwrap_or_else(|| "nothing".to_string())
            ),
        )),
    }
    match root.get("info") {
        None => issues.push(ValidationIssue::new(
            "/info",
            "missing_info",
            "info object is required",
        )),
        Some(Value::Object(info)) => {
            if !non_blank(info.get("title")) {
                issues.push(ValidationIssue::new(
                    "/info/title",
                    "missing_title",
                    "info.title is required",
                ));
            }
            if !non_blank(info.get("version")) {
                issues.push(ValidationIssue::new(
                    "/info/version",
                    "missing_version",
                    "info.version is required",
                ));
            }
        }
        Some(_) => issues.push(invalid_type("/info", "an object")),
    }
    if let Some(paths) = root.get("paths") {
        if !paths.is_object() {
            issues.push(invalid_type("/paths", "an object"));
        }
    }
}

fn check_tags(root: &Value, issues: &mut Vec<ValidationIssue>) {
    match root.get("tags") {
        None => {}
        Some(Value::Array(tags)) => {
            for (i, tag) in tags.iter().enumerate() {
                if !tag.get("name").map(Value::is_string).unwrap_or(false) {
                    issues.push(invalid_type(
                        &pointer::join("/tags", &i.to_string()),
                        "a tag object with a string name",
                    ));
                }
            }
        }
        Some(_) => issues.push(invalid_type("/tags", "a list of tags")),
    }
}

fn check_paths(spec: &Swagger, issues: &mut Vec<ValidationIssue>) {
    let mut operation_ids: HashSet<&str> = HashSet::new();
    let paths_ptr = pointer::join("", "paths");

    for (path, item) in &spec.paths {
        let path_ptr = pointer::join(&paths_ptr, path);
        if !path.starts_with('/') {
            issues.push(ValidationIssue::new(
                &path_ptr,
                "invalid_path",
                format!("path {path:?} must begin with '/'"),
            ));
        }
        for (method, op) in item.operations() {
            let op_ptr = pointer::join(&path_ptr, &method.as_str().to_ascii_lowercase());
            if let Some(id) = op.operation_id.as_deref() {
                if !operation_ids.insert(id) {
                    issues.push(ValidationIssue::new(
                        pointer::join(&op_ptr, "operationId"),
                        "duplicate_operation_id",
                        format!("operationId {id:?} is used more than once"),
                    ));
                }
            }
            if op.responses.is_empty() {
                issues.push(ValidationIssue::new(
                    pointer::join(&op_ptr, "responses"),
                    "missing_responses",
                    "operation must declare at least one response",
                ));
            }
            let params = effective_parameters(spec, &item.parameters, op);
            check_parameters(path, &op_ptr, &params, issues);
        }
    }
}

/// Path-level parameters overlaid by operation-level ones, `$ref`s resolved.
/// Unresolvable references are left out; the reference check reports them.
fn effective_parameters<'a>(
    spec: &'a Swagger,
    path_level: &'a [Parameter],
    op: &'a Operation,
) -> Vec<&'a Parameter> {
    let resolve = |p: &'a Parameter| -> Option<&'a Parameter> {
        match &p.reference {
            Some(r) if !pointer::is_local(r) => None,
            Some(r) => {
                let (_, fragment) = pointer::split_ref(r);
                let name = fragment.strip_prefix("/parameters/")?;
                spec.parameters.get(&pointer::unescape(name))
            }
            None => Some(p),
        }
    };
    let op_params: Vec<&Parameter> = op.parameters.iter().filter_map(resolve).collect();
    let mut merged: Vec<&Parameter> = path_level
        .iter()
        .filter_map(resolve)
        .filter(|p| {
            !op_params
                .iter()
                .any(|o| o.name == p.name && o.location == p.location)
        })
        .collect();
    merged.extend(op_params);
    merged
}

fn check_parameters(
    path: &str,
    op_ptr: &str,
    params: &[&Parameter],
    issues: &mut Vec<ValidationIssue>,
) {
    let params_ptr = pointer::join(op_ptr, "parameters");
    let mut seen: HashSet<(&str, &str)> = HashSet::new();
    let mut body_count = 0;
    let mut has_form = false;
    let mut path_params: HashSet<&str> = HashSet::new();

    for param in params {
        let ptr = pointer::join(&params_ptr, &param.name);
        if !seen.insert((param.name.as_str(), param.location.as_str())) {
            issues.push(ValidationIssue::new(
                &ptr,
                "duplicate_parameter",
                format!(
                    "parameter {:?} in {:?} is declared more than once",
                    param.name, param.location
                ),
            ));
        }
        match param.parsed_location() {
            None => issues.push(ValidationIssue::new(
                &ptr,
                "invalid_parameter_location",
                format!("unknown parameter location {:?}", param.location),
            )),
            Some(ParameterLocation::Body) => {
                body_count += 1;
                if param.schema.is_none() {
                    issues.push(ValidationIssue::new(
                        &ptr,
                        "missing_body_schema",
                        "body parameter must declare a schema",
                    ));
                }
            }
            Some(location) => {
                if location == ParameterLocation::FormData {
                    has_form = true;
                }
                match param.param_type.as_deref() {
                    None => issues.push(ValidationIssue::new(
                        &ptr,
                        "missing_parameter_type",
                        format!("{location} parameter must declare a type"),
                    )),
                    Some("array") if param.items.is_none() => {
                        issues.push(ValidationIssue::new(
                            &ptr,
                            "missing_items",
                            "array parameter must declare items",
                        ))
                    }
                    Some("file") if location != ParameterLocation::FormData => {
                        issues.push(ValidationIssue::new(
                            &ptr,
                            "invalid_file_parameter",
                            "file parameters are only allowed in formData",
                        ))
                    }
                    _ => {}
                }
                if location == ParameterLocation::Path {
                    path_params.insert(param.name.as_str());
                    if !param.required {
                        issues.push(ValidationIssue::new(
                            &ptr,
                            "path_parameter_not_required",
                            "path parameters must be required",
                        ));
                    }
                }
            }
        }
    }

    if body_count > 1 {
        issues.push(ValidationIssue::new(
            &params_ptr,
            "multiple_body_parameters",
            "an operation may declare at most one body parameter",
        ));
    }
    if body_count > 0 && has_form {
        issues.push(ValidationIssue::new(
            &params_ptr,
            "body_and_form_data",
            "body and formData parameters cannot be mixed",
        ));
    }

    let template: HashSet<&str> = PATH_TEMPLATE_PARAM
        .captures_iter(path)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();
    for missing in template.difference(&path_params) {
        issues.push(ValidationIssue::new(
            &params_ptr,
            "missing_path_parameter",
            format!("path template variable {{{missing}}} has no matching path parameter"),
        ));
    }
    for extra in path_params.difference(&template) {
        issues.push(ValidationIssue::new(
            &params_ptr,
            "unused_path_parameter",
            format!("path parameter {extra:?} does not appear in {path:?}"),
        ));
    }
}

/// Every local `$ref` must point at an existing node
fn check_references(root: &Value, issues: &mut Vec<ValidationIssue>) {
    for (holder, reference) in pointer::collect_refs(root, "") {
        if !pointer::is_local(&reference) {
            continue;
        }
        let (_, fragment) = pointer::split_ref(&reference);
        if root.pointer(&fragment).is_none() {
            issues.push(ValidationIssue::new(
                holder,
                "unresolved_reference",
                format!("$ref {reference:?} does not resolve"),
            ));
        }
    }
}

fn check_all_schemas(root: &Value, issues: &mut Vec<ValidationIssue>) {
    if let Some(Value::Object(defs)) = root.get("definitions") {
        for (name, schema) in defs {
            let ptr = pointer::join(&pointer::join("", "definitions"), name);
            check_schema(schema, &ptr, issues);
        }
    }
    if let Some(Value::Object(params)) = root.get("parameters") {
        for (name, param) in params {
            let ptr = pointer::join(&pointer::join("", "parameters"), name);
            check_parameter_value(param, &ptr, issues);
        }
    }
    if let Some(Value::Object(responses)) = root.get("responses") {
        for (name, response) in responses {
            if let Some(schema) = response.get("schema") {
                let ptr = pointer::join(&pointer::join("", "responses"), name);
                check_schema(schema, &pointer::join(&ptr, "schema"), issues);
            }
        }
    }
    let Some(Value::Object(paths)) = root.get("paths") else {
        return;
    };
    for (path, item) in paths {
        let Value::Object(item) = item else { continue };
        let path_ptr = pointer::join(&pointer::join("", "paths"), path);
        for (key, entry) in item {
            let entry_ptr = pointer::join(&path_ptr, key);
            if key == "parameters" {
                check_parameter_list(entry, &entry_ptr, issues);
                continue;
            }
            if key.starts_with("x-") {
                continue;
            }
            if let Some(params) = entry.get("parameters") {
                check_parameter_list(params, &pointer::join(&entry_ptr, "parameters"), issues);
            }
            if let Some(Value::Object(responses)) = entry.get("responses") {
                for (status, response) in responses {
                    if let Some(schema) = response.get("schema") {
                        let ptr = pointer::join(&pointer::join(&entry_ptr, "responses"), status);
                        check_schema(schema, &pointer::join(&ptr, "schema"), issues);
                    }
                }
            }
        }
    }
}

fn check_parameter_list(list: &Value, ptr: &str, issues: &mut Vec<ValidationIssue>) {
    if let Value::Array(list) = list {
        for (i, param) in list.iter().enumerate() {
            check_parameter_value(param, &pointer::join(ptr, &i.to_string()), issues);
        }
    }
}

fn check_parameter_value(param: &Value, ptr: &str, issues: &mut Vec<ValidationIssue>) {
    let Value::Object(obj) = param else {
        issues.push(invalid_type(ptr, "a parameter object"));
        return;
    };
    if obj.contains_key("$ref") {
        return;
    }
    for key in ["name", "in", "type"] {
        if obj.get(key).is_some_and(|v| !v.is_string()) {
            issues.push(invalid_type(&pointer::join(ptr, key), "a string"));
        }
    }
    if obj.get("required").is_some_and(|v| !v.is_boolean()) {
        issues.push(invalid_type(&pointer::join(ptr, "required"), "a boolean"));
    }
    match param.get("schema") {
        Some(schema) => check_schema(schema, &pointer::join(ptr, "schema"), issues),
        None => check_default(param, ptr, issues),
    }
}

/// Shape checks for one schema and its nested schemas
fn check_schema(schema: &Value, ptr: &str, issues: &mut Vec<ValidationIssue>) {
    let Value::Object(obj) = schema else { return };
    if obj.contains_key("$ref") {
        return;
    }

    let is_array = match obj.get("type") {
        Some(Value::String(t)) => t == "array",
        Some(Value::Array(ts)) => ts.iter().any(|t| t == "array"),
        _ => false,
    };
    check_schema_shape(obj, ptr, issues);
    if is_array && !obj.contains_key("items") {
        issues.push(ValidationIssue::new(
            ptr,
            "missing_items",
            "array schema must declare items",
        ));
    }

    let props = obj.get("properties").and_then(Value::as_object);
    if let (Some(Value::Array(required)), Some(props)) = (obj.get("required"), props) {
        for name in required.iter().filter_map(Value::as_str) {
            if !props.contains_key(name) {
                issues.push(ValidationIssue::warning(
                    pointer::join(ptr, "required"),
                    "unknown_required_property",
                    format!("required property {name:?} is not declared in properties"),
                ));
            }
        }
    }

    check_default(schema, ptr, issues);

    if let Some(props) = props {
        for (name, prop) in props {
            check_schema(prop, &pointer::join(&pointer::join(ptr, "properties"), name), issues);
        }
    }
    match obj.get("items") {
        Some(Value::Array(list)) => {
            for (i, item) in list.iter().enumerate() {
                check_schema(item, &pointer::join(&pointer::join(ptr, "items"), &i.to_string()), issues);
            }
        }
        Some(item) => check_schema(item, &pointer::join(ptr, "items"), issues),
        None => {}
    }
    if let Some(Value::Array(members)) = obj.get("allOf") {
        for (i, member) in members.iter().enumerate() {
            check_schema(member, &pointer::join(&pointer::join(ptr, "allOf"), &i.to_string()), issues);
        }
    }
    if let Some(additional @ Value::Object(_)) = obj.get("additionalProperties") {
        check_schema(additional, &pointer::join(ptr, "additionalProperties"), issues);
    }
}

/// JSON types of the schema keys the typed view reads strictly
fn check_schema_shape(obj: &Map<String, Value>, ptr: &str, issues: &mut Vec<ValidationIssue>) {
    let is_string_list = |v: &Value| {
        v.as_array()
            .map(|list| list.iter().all(Value::is_string))
            .unwrap_or(false)
    };
    if let Some(required) = obj.get("required") {
        if !is_string_list(required) {
            issues.push(invalid_type(
                &pointer::join(ptr, "required"),
                "a list of property names",
            ));
        }
    }
    if let Some(schema_type) = obj.get("type") {
        if !schema_type.is_string() && !is_string_list(schema_type) {
            issues.push(invalid_type(
                &pointer::join(ptr, "type"),
                "a type name or a list of type names",
            ));
        }
    }
    for (key, expected) in [("properties", "an object"), ("allOf", "a list of schemas")] {
        let fits = match obj.get(key) {
            None => true,
            Some(v) if key == "properties" => v.is_object(),
            Some(v) => v.is_array(),
        };
        if !fits {
            issues.push(invalid_type(&pointer::join(ptr, key), expected));
        }
    }
    for key in ["readOnly", "uniqueItems", "exclusiveMaximum", "exclusiveMinimum"] {
        if obj.get(key).is_some_and(|v| !v.is_boolean()) {
            issues.push(invalid_type(&pointer::join(ptr, key), "a boolean"));
        }
    }
}

/// Validate `default` against the schema that declares it
fn check_default(schema: &Value, ptr: &str, issues: &mut Vec<ValidationIssue>) {
    let Value::Object(obj) = schema else { return };
    let Some(default) = obj.get("default") else {
        return;
    };
    if obj.contains_key("$ref") || obj.get("type").and_then(Value::as_str) == Some("file") {
        return;
    }

    let candidate = Value::Object(validation_schema(obj));
    match jsonschema::draft4::new(&candidate) {
        Ok(validator) => {
            for error in validator.iter_errors(default) {
                issues.push(ValidationIssue::new(
                    pointer::join(ptr, "default"),
                    "invalid_default",
                    format!("default value does not match its schema: {error}"),
                ));
            }
        }
        Err(e) => debug!(location = %ptr, error = %e, "default not checked, schema did not compile"),
    }
}

/// Copy of a schema suitable for JSON Schema validation: no vendor
/// extensions, no parameter-only keys, no self-referential `default`.
fn validation_schema(obj: &Map<String, Value>) -> Map<String, Value> {
    const PARAMETER_KEYS: [&str; 7] = [
        "name",
        "in",
        "required",
        "collectionFormat",
        "allowEmptyValue",
        "description",
        "default",
    ];
    let mut out = Map::new();
    for (key, value) in obj {
        if key.starts_with("x-") || PARAMETER_KEYS.contains(&key.as_str()) {
            continue;
        }
        out.insert(key.clone(), value.clone());
    }
    // Schema-level `required` is a list of names; parameter `required` is a bool
    if let Some(Value::Array(required)) = obj.get("required") {
        out.insert("required".to_string(), Value::Array(required.clone()));
    }
    out
}
