//! # Type Resolver
//!
//! Maps a Swagger schema node to exactly one [`ResolvedType`]. Rules are tried
//! in order and the first match wins:
//!
//! 1. a well-formed `x-external-type` override short-circuits everything
//! 2. `$ref` → the registered definition it names
//! 3. a known `format` → primitive from the type table
//! 4. `type: array` → array (or tuple for positional `items`)
//! 5. a primitive `type` → primitive from the type table
//! 6. `additionalProperties` with a schema and no declared properties → map
//! 7. `type: object` or no type → named/inline object when properties or
//!    `allOf` are declared, else a map of anything
//! 8. anything else → interface
//!
//! The resolver never mutates the schema and only fails on broken references.
//! Nested nodes (items, map values, tuple members) are resolved recursively;
//! recursive definitions terminate because every `$ref` stops at a named type.

pub mod external;
pub mod registry;
mod types;

#[cfg(test)]
mod tests;

pub use external::{
    extract, short_circuit_resolve_external, ExternalHints, ExternalImport, ExternalOverride,
    ShapeHint, X_EXTERNAL_TYPE,
};
pub use registry::{known_definition, KnownDefinition, KnownDefinitions, X_TYPE_NAME};
pub use types::{ObjectRef, QualifiedName, ResolvedType, TypeKind};

use crate::error::{GenError, Result};
use crate::spec::{pointer, AdditionalProperties, Schema, SchemaItems};
use crate::typemap::{self, SemanticType};
use serde_json::Value;
use tracing::warn;

/// Where in the document a schema is being resolved
#[derive(Debug, Clone)]
pub struct ResolveContext<'a> {
    /// Set when the schema is the top-level body of a named definition
    pub model_name: Option<&'a str>,
    /// JSON pointer of the schema, used in diagnostics
    pub location: String,
    /// The enclosing object lists this node as required
    pub required: bool,
}

impl<'a> ResolveContext<'a> {
    pub fn anonymous(location: impl Into<String>) -> Self {
        ResolveContext {
            model_name: None,
            location: location.into(),
            required: false,
        }
    }

    pub fn definition(name: &'a str, location: impl Into<String>) -> Self {
        ResolveContext {
            model_name: Some(name),
            location: location.into(),
            required: false,
        }
    }

    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Context for a nested node. Nested nodes are always anonymous.
    pub fn child(&self, token: &str) -> ResolveContext<'a> {
        ResolveContext {
            model_name: None,
            location: pointer::join(&self.location, token),
            required: false,
        }
    }
}

/// Resolves schemas against a frozen definition registry
#[derive(Debug, Clone, Copy)]
pub struct TypeResolver<'a> {
    namespace: &'a str,
    registry: &'a KnownDefinitions,
}

impl<'a> TypeResolver<'a> {
    pub fn new(namespace: &'a str, registry: &'a KnownDefinitions) -> Self {
        TypeResolver {
            namespace,
            registry,
        }
    }

    pub fn namespace(&self) -> &str {
        self.namespace
    }

    pub fn registry(&self) -> &KnownDefinitions {
        self.registry
    }

    pub fn resolve(&self, schema: &Schema, ctx: &ResolveContext<'_>) -> Result<ResolvedType> {
        match extract(schema, &ctx.location) {
            Ok(Some(ext)) => {
                let known = ctx.model_name.and_then(|name| self.registry.get(name));
                let (target, package) = match known {
                    Some(known) => (known.target.clone(), known.package.clone()),
                    None => (
                        ext.target(),
                        if ext.embedded { None } else { ext.package() },
                    ),
                };
                return Ok(short_circuit_resolve_external(
                    target, package, &ext, schema,
                ));
            }
            Ok(None) => {}
            Err(e) => warn!(location = %ctx.location, error = %e, "ignoring override"),
        }

        if let Some(reference) = &schema.reference {
            return self.resolve_ref(reference, schema, ctx);
        }

        let mut resolved = self.resolve_shape(schema, ctx)?;
        if let Some(omit) = schema.extension_bool("x-omitempty") {
            resolved.omit_empty = omit;
        }
        Ok(resolved)
    }

    fn resolve_ref(
        &self,
        reference: &str,
        schema: &Schema,
        ctx: &ResolveContext<'_>,
    ) -> Result<ResolvedType> {
        let broken = || GenError::BrokenReference {
            reference: reference.to_string(),
            referrer: ctx.location.clone(),
        };
        let name = pointer::definition_name(reference).ok_or_else(broken)?;
        let known = self.registry.get(&name).ok_or_else(broken)?;

        if let Some(ext) = &known.external {
            return Ok(short_circuit_resolve_external(
                known.target.clone(),
                known.package.clone(),
                ext,
                schema,
            ));
        }
        let mut resolved = ResolvedType::named(known.target.clone());
        resolved.package = known.package.clone();
        resolved.nullable = explicit_nullable(schema).unwrap_or(known.nullable);
        Ok(resolved)
    }

    fn resolve_shape(&self, schema: &Schema, ctx: &ResolveContext<'_>) -> Result<ResolvedType> {
        let mut has_null = false;
        let types: Vec<&str> = schema
            .schema_type
            .iter()
            .map(String::as_str)
            .filter(|t| {
                let is_null = *t == "null";
                has_null |= is_null;
                !is_null
            })
            .collect();
        let format = schema.format.as_deref().unwrap_or("");

        let mut resolved = if types.len() > 1 {
            // heterogeneous type list
            ResolvedType::new(TypeKind::Interface, types[0]).with_format(format)
        } else if types.is_empty() && has_null {
            ResolvedType::new(TypeKind::Interface, "null")
        } else {
            let swagger_type = types.first().copied().unwrap_or("");
            self.resolve_single(schema, swagger_type, format, ctx)?
        };
        if has_null {
            resolved.nullable = true;
        }
        Ok(resolved)
    }

    fn resolve_single(
        &self,
        schema: &Schema,
        swagger_type: &str,
        format: &str,
        ctx: &ResolveContext<'_>,
    ) -> Result<ResolvedType> {
        if swagger_type != "array" && !format.is_empty() {
            if let Some(semantic) = typemap::lookup_format(format) {
                let swagger_type = if swagger_type.is_empty() {
                    "string"
                } else {
                    swagger_type
                };
                let mut resolved =
                    ResolvedType::primitive(semantic, swagger_type).with_format(format);
                resolved.nullable =
                    primitive_nullable(semantic, swagger_type, schema, ctx.required);
                return Ok(resolved);
            }
        }

        if swagger_type == "array" {
            return self.resolve_array(schema, ctx);
        }

        if let Some(semantic) = typemap::lookup_type(swagger_type) {
            let mut resolved = ResolvedType::primitive(semantic, swagger_type).with_format(format);
            resolved.nullable = primitive_nullable(semantic, swagger_type, schema, ctx.required);
            return Ok(resolved);
        }

        if schema.is_bare() {
            return Ok(ResolvedType::interface());
        }

        let declares_members = !schema.properties.is_empty() || !schema.all_of.is_empty();

        if !declares_members {
            if let Some(AdditionalProperties::Schema(values)) = &schema.additional_properties {
                let value = self.resolve(values, &ctx.child("additionalProperties"))?;
                let mut resolved = ResolvedType::map_of(value).with_format(format);
                resolved.nullable = explicit_nullable(schema).unwrap_or(false);
                return Ok(resolved);
            }
        }

        if swagger_type == "object" || swagger_type.is_empty() {
            let mut resolved = if declares_members {
                match ctx.model_name.and_then(|name| self.registry.get(name)) {
                    Some(known) => ResolvedType::named(known.target.clone()),
                    None => ResolvedType::inline_object(),
                }
            } else {
                ResolvedType::map_of(ResolvedType::interface())
            };
            resolved.swagger_format = format.to_string();
            resolved.nullable = explicit_nullable(schema).unwrap_or(declares_members);
            return Ok(resolved);
        }

        Ok(ResolvedType::new(TypeKind::Interface, swagger_type).with_format(format))
    }

    fn resolve_array(&self, schema: &Schema, ctx: &ResolveContext<'_>) -> Result<ResolvedType> {
        let items_ctx = ctx.child("items");
        let mut resolved = match &schema.items {
            None => ResolvedType::array_of(ResolvedType::interface()),
            Some(SchemaItems::Single(items)) => {
                ResolvedType::array_of(self.resolve(items, &items_ctx)?)
            }
            Some(SchemaItems::Tuple(list)) => {
                let members = list
                    .iter()
                    .enumerate()
                    .map(|(i, member)| self.resolve(member, &items_ctx.child(&i.to_string())))
                    .collect::<Result<Vec<_>>>()?;
                collection_or_tuple(members)
            }
        };
        resolved.swagger_format = schema.format.clone().unwrap_or_default();
        resolved.nullable = explicit_nullable(schema).unwrap_or(false);
        Ok(resolved)
    }
}

/// Positional items that all resolve alike are a plain collection
fn collection_or_tuple(mut members: Vec<ResolvedType>) -> ResolvedType {
    let homogeneous = members
        .first()
        .map(|first| members.iter().all(|m| m == first))
        .unwrap_or(false);
    if homogeneous {
        let element = members.swap_remove(0);
        return ResolvedType::array_of(element);
    }
    ResolvedType::new(TypeKind::Tuple { members }, "array")
}

/// `x-nullable` / `x-isnullable`, when declared
pub fn explicit_nullable(schema: &Schema) -> Option<bool> {
    schema
        .extension_bool("x-nullable")
        .or_else(|| schema.extension_bool("x-isnullable"))
}

fn has_non_zero_default(schema: &Schema) -> bool {
    match &schema.default {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
    }
}

/// Whether a primitive value may be absent, distinct from its zero value
fn primitive_nullable(
    semantic: SemanticType,
    swagger_type: &str,
    schema: &Schema,
    required: bool,
) -> bool {
    if semantic.is_custom_formatter() {
        return nullable_formatted(semantic, schema, required);
    }
    if let Some(explicit) = explicit_nullable(schema) {
        return explicit;
    }
    match swagger_type {
        "boolean" => {
            let required_no_default = required && schema.default.is_none() && !schema.read_only;
            let optional_with_default =
                !required && (schema.default.is_some() || schema.read_only);
            required_no_default || optional_with_default
        }
        "integer" | "number" => nullable_number(schema, required),
        "string" => {
            let is_min = schema.min_length.map(|m| m != 0).unwrap_or(false);
            let bc_min = schema.min_length == Some(0);
            !schema.read_only
                && (required || (has_non_zero_default(schema) && !is_min) || bc_min)
        }
        _ => false,
    }
}

fn nullable_number(schema: &Schema, required: bool) -> bool {
    let (min, max) = (schema.minimum, schema.maximum);
    let is_min = min
        .map(|m| m != 0.0 || schema.exclusive_minimum)
        .unwrap_or(false);
    let bc_min = min == Some(0.0) && !schema.exclusive_minimum;
    let is_max = min.is_none()
        && max
            .map(|m| m != 0.0 || schema.exclusive_maximum)
            .unwrap_or(false);
    let bc_max = max == Some(0.0) && !schema.exclusive_maximum;
    let (is_min_max, bc_min_max) = match (min, max) {
        (Some(lo), Some(hi)) => (lo < hi, lo < 0.0 && 0.0 < hi),
        _ => (false, false),
    };
    !schema.read_only
        && (required
            || (has_non_zero_default(schema) && !(is_min || is_max || is_min_max))
            || bc_min
            || bc_max
            || bc_min_max)
}

fn nullable_formatted(semantic: SemanticType, schema: &Schema, required: bool) -> bool {
    if semantic == SemanticType::Binary {
        return false;
    }
    if let Some(explicit) = explicit_nullable(schema) {
        return explicit;
    }
    !schema.read_only && (required || has_non_zero_default(schema))
}
