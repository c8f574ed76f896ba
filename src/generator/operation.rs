//! Operation models: one per operation and tag.

use super::definition::{build_properties, PropertyModel, Validations};
use crate::error::{GenError, Result};
use crate::naming::{pascalize, to_snake_case, unique_name};
use crate::resolver::{ResolveContext, ResolvedType, TypeResolver};
use crate::spec::{
    pointer, Operation, Parameter, ParameterLocation, Response, SecurityRequirement, Swagger,
};
use rayon::prelude::*;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterModel {
    pub name: String,
    pub field_name: String,
    pub location: ParameterLocation,
    pub required: bool,
    #[serde(rename = "type")]
    pub resolved: ResolvedType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection_format: Option<String>,
    #[serde(skip_serializing_if = "Validations::is_empty")]
    pub validations: Validations,
    /// Members of an inline body schema
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<PropertyModel>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeaderModel {
    pub name: String,
    #[serde(rename = "type")]
    pub resolved: ResolvedType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseModel {
    /// Status code as declared, or `default`
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub is_success: bool,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<ResolvedType>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<HeaderModel>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationModel {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    pub method: String,
    pub path: String,
    /// Namespace the operation is generated into
    pub package: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub parameters: Vec<ParameterModel>,
    pub responses: Vec<ResponseModel>,
    pub authorized: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub security: Vec<SecurityRequirement>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub consumes: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub produces: Vec<String>,
    pub deprecated: bool,
}

impl OperationModel {
    /// Success response with a body, preferring the lowest 2xx code
    pub fn success_response(&self) -> Option<&ResponseModel> {
        self.responses
            .iter()
            .filter(|r| r.is_success)
            .min_by_key(|r| r.status)
    }
}

/// Operations sharing one namespace
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationGroup {
    pub name: String,
    pub package: String,
    pub operations: Vec<String>,
}

/// Which operations to build and where they go
#[derive(Debug, Clone, Copy)]
pub struct OperationFilter<'a> {
    pub tags: &'a BTreeSet<String>,
    pub operations: &'a BTreeSet<String>,
    pub default_namespace: &'a str,
}

/// An operation found under `paths`, with its unique name
#[derive(Debug, Clone)]
pub struct OperationEntry<'a> {
    pub name: String,
    pub method: String,
    pub path: &'a str,
    pub operation: &'a Operation,
    pub path_parameters: &'a [Parameter],
}

/// Every operation in document order. Names come from `operationId`, else from
/// the method and path; a clashing `operationId` falls back to the latter.
pub fn gather_operations(spec: &Swagger) -> Vec<OperationEntry<'_>> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut entries = Vec::new();
    for (path, item) in &spec.paths {
        for (method, op) in item.operations() {
            let method = method.as_str().to_ascii_lowercase();
            let key_name = pascalize(&format!("{method} {path}"));
            let name = match op.operation_id.as_deref().filter(|id| !id.is_empty()) {
                Some(id) if !seen.contains(id) => id.to_string(),
                Some(id) => {
                    warn!(operation_id = %id, path = %path, method = %method, "duplicate operationId, naming by method and path");
                    key_name
                }
                None => key_name,
            };
            let name = unique_name(&mut seen, &name);
            entries.push(OperationEntry {
                name,
                method,
                path,
                operation: op,
                path_parameters: &item.parameters,
            });
        }
    }
    entries
}

/// Apply the operation and tag filters. Fails when the operation filter names
/// an unknown operation.
pub fn select_operations<'a>(
    entries: Vec<OperationEntry<'a>>,
    filter: &OperationFilter<'_>,
) -> Result<Vec<OperationEntry<'a>>> {
    let known: HashSet<&str> = entries.iter().map(|e| e.name.as_str()).collect();
    let missing: Vec<String> = filter
        .operations
        .iter()
        .filter(|name| !known.contains(name.as_str()))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(GenError::UnknownOperation { names: missing });
    }
    Ok(entries
        .into_iter()
        .filter(|e| filter.operations.is_empty() || filter.operations.contains(&e.name))
        .filter(|e| {
            filter.tags.is_empty() || e.operation.tags.iter().any(|t| filter.tags.contains(t))
        })
        .collect())
}

/// Build every selected operation in parallel. An operation with several tags
/// yields one model per tag; tags outside a non-empty tag filter are skipped.
pub fn build_operations(
    resolver: &TypeResolver<'_>,
    spec: &Swagger,
    selected: &[OperationEntry<'_>],
    filter: &OperationFilter<'_>,
) -> Result<Vec<OperationModel>> {
    let per_entry = selected
        .par_iter()
        .map(|entry| {
            build_operation(resolver, spec, entry)
                .map(|model| replicate_per_tag(model, entry.operation, filter))
                .map_err(|e| GenError::in_operation(&entry.name, e))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(per_entry.into_iter().flatten().collect())
}

fn replicate_per_tag(
    model: OperationModel,
    op: &Operation,
    filter: &OperationFilter<'_>,
) -> Vec<OperationModel> {
    let tags: Vec<&String> = op
        .tags
        .iter()
        .filter(|t| filter.tags.is_empty() || filter.tags.contains(*t))
        .collect();
    if tags.is_empty() {
        return vec![OperationModel {
            package: filter.default_namespace.to_string(),
            ..model
        }];
    }
    tags.into_iter()
        .map(|tag| OperationModel {
            package: to_snake_case(tag),
            tag: Some(tag.clone()),
            ..model.clone()
        })
        .collect()
}

/// Model for one operation, before tag assignment
pub fn build_operation(
    resolver: &TypeResolver<'_>,
    spec: &Swagger,
    entry: &OperationEntry<'_>,
) -> Result<OperationModel> {
    let op = entry.operation;
    let path_ptr = pointer::join(&pointer::join("", "paths"), entry.path);
    let op_ptr = pointer::join(&path_ptr, &entry.method);

    let parameters = merged_parameters(spec, entry, &path_ptr, &op_ptr)?
        .into_iter()
        .map(|(param, ptr)| build_parameter(resolver, param, &ptr))
        .collect::<Result<Vec<_>>>()?;

    let responses_ptr = pointer::join(&op_ptr, "responses");
    let responses = op
        .responses
        .iter()
        .map(|(code, response)| {
            let ptr = pointer::join(&responses_ptr, code);
            let (response, ptr) = resolve_response(spec, response, ptr)?;
            build_response(resolver, code, response, &ptr)
        })
        .collect::<Result<Vec<_>>>()?;

    let security = op.security.clone().unwrap_or_else(|| spec.security.clone());
    debug!(operation = %entry.name, parameters = parameters.len(), responses = responses.len(), "built operation");
    Ok(OperationModel {
        name: entry.name.clone(),
        operation_id: op.operation_id.clone(),
        method: entry.method.clone(),
        path: entry.path.to_string(),
        package: String::new(),
        tag: None,
        summary: op.summary.clone(),
        description: op.description.clone(),
        parameters,
        responses,
        authorized: !security.is_empty(),
        security,
        consumes: if op.consumes.is_empty() {
            spec.consumes.clone()
        } else {
            op.consumes.clone()
        },
        produces: if op.produces.is_empty() {
            spec.produces.clone()
        } else {
            op.produces.clone()
        },
        deprecated: op.deprecated,
    })
}

/// Path-level parameters overlaid by operation-level ones on `(name, in)`,
/// references resolved, each with the pointer of its declaration
fn merged_parameters<'a>(
    spec: &'a Swagger,
    entry: &OperationEntry<'a>,
    path_ptr: &str,
    op_ptr: &str,
) -> Result<Vec<(&'a Parameter, String)>> {
    let resolve_all = |list: &'a [Parameter], base: &str| -> Result<Vec<(&'a Parameter, String)>> {
        let list_ptr = pointer::join(base, "parameters");
        list.iter()
            .enumerate()
            .map(|(i, p)| resolve_parameter(spec, p, pointer::join(&list_ptr, &i.to_string())))
            .collect()
    };
    let op_params = resolve_all(&entry.operation.parameters, op_ptr)?;
    let mut merged: Vec<(&Parameter, String)> = resolve_all(entry.path_parameters, path_ptr)?
        .into_iter()
        .filter(|(p, _)| {
            !op_params
                .iter()
                .any(|(o, _)| o.name == p.name && o.location == p.location)
        })
        .collect();
    merged.extend(op_params);
    Ok(merged)
}

fn resolve_parameter<'a>(
    spec: &'a Swagger,
    param: &'a Parameter,
    ptr: String,
) -> Result<(&'a Parameter, String)> {
    let Some(reference) = &param.reference else {
        return Ok((param, ptr));
    };
    let broken = || GenError::BrokenReference {
        reference: reference.clone(),
        referrer: ptr.clone(),
    };
    let (_, fragment) = pointer::split_ref(reference);
    let name = fragment
        .strip_prefix("/parameters/")
        .map(pointer::unescape)
        .ok_or_else(broken)?;
    let target = spec.parameters.get(&name).ok_or_else(broken)?;
    Ok((target, pointer::join(&pointer::join("", "parameters"), &name)))
}

fn resolve_response<'a>(
    spec: &'a Swagger,
    response: &'a Response,
    ptr: String,
) -> Result<(&'a Response, String)> {
    let Some(reference) = &response.reference else {
        return Ok((response, ptr));
    };
    let broken = || GenError::BrokenReference {
        reference: reference.clone(),
        referrer: ptr.clone(),
    };
    let (_, fragment) = pointer::split_ref(reference);
    let name = fragment
        .strip_prefix("/responses/")
        .map(pointer::unescape)
        .ok_or_else(broken)?;
    let target = spec.responses.get(&name).ok_or_else(broken)?;
    Ok((target, pointer::join(&pointer::join("", "responses"), &name)))
}

fn build_parameter(
    resolver: &TypeResolver<'_>,
    param: &Parameter,
    ptr: &str,
) -> Result<ParameterModel> {
    let location = param
        .parsed_location()
        .ok_or_else(|| GenError::ParseSpec {
            location: ptr.to_string(),
            reason: format!("unknown parameter location {:?}", param.location),
        })?;
    let schema = param.value_schema();
    let schema_ptr = if param.schema.is_some() {
        pointer::join(ptr, "schema")
    } else {
        ptr.to_string()
    };
    let ctx = ResolveContext::anonymous(schema_ptr.clone()).with_required(param.required);
    let resolved = resolver.resolve(&schema, &ctx)?;
    let properties = if location == ParameterLocation::Body && schema.reference.is_none() {
        build_properties(resolver, &schema, &schema_ptr)?
    } else {
        Vec::new()
    };
    Ok(ParameterModel {
        name: param.name.clone(),
        field_name: pascalize(&param.name),
        location,
        required: param.required,
        resolved,
        description: param.description.clone(),
        default: param.default.clone(),
        collection_format: param.collection_format.clone(),
        validations: Validations::from_schema(&schema),
        properties,
    })
}

fn build_response(
    resolver: &TypeResolver<'_>,
    code: &str,
    response: &Response,
    ptr: &str,
) -> Result<ResponseModel> {
    let status = code.parse::<u16>().ok();
    let schema = match &response.schema {
        Some(schema) => {
            let ctx = ResolveContext::anonymous(pointer::join(ptr, "schema"));
            Some(resolver.resolve(schema, &ctx)?)
        }
        None => None,
    };
    let headers_ptr = pointer::join(ptr, "headers");
    let headers = response
        .headers
        .iter()
        .map(|(name, header)| {
            let ctx = ResolveContext::anonymous(pointer::join(&headers_ptr, name));
            Ok(HeaderModel {
                name: name.clone(),
                resolved: resolver.resolve(&header.to_schema(), &ctx)?,
                description: header.description.clone(),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(ResponseModel {
        code: code.to_string(),
        status,
        is_success: status.map(|s| (200..300).contains(&s)).unwrap_or(false),
        description: response.description.clone(),
        schema,
        headers,
    })
}

/// Group operations by namespace, sorted by group name
pub fn group_operations(operations: &[OperationModel]) -> Vec<OperationGroup> {
    let mut groups: BTreeMap<&str, OperationGroup> = BTreeMap::new();
    for op in operations {
        groups
            .entry(op.package.as_str())
            .or_insert_with(|| OperationGroup {
                name: op.tag.clone().unwrap_or_else(|| op.package.clone()),
                package: op.package.clone(),
                operations: Vec::new(),
            })
            .operations
            .push(op.name.clone());
    }
    let mut groups: Vec<OperationGroup> = groups.into_values().collect();
    groups.sort_by(|a, b| a.name.cmp(&b.name));
    groups
}
