//! `x-external-type` overrides.
//!
//! A schema carrying the extension names a type that lives outside the
//! generated code. Resolution short-circuits: the declared shape hint decides
//! the kind, and the schema body is not inspected further.
//!
//! ```yaml
//! x-external-type:
//!   type: Decimal
//!   import:
//!     package: github.com/shopspring/decimal
//!     alias: dec
//!   hints:
//!     kind: primitive
//!     nullable: false
//!   embedded: false
//! ```

use super::types::{ObjectRef, QualifiedName, ResolvedType, TypeKind};
use crate::error::{GenError, Result};
use crate::spec::Schema;
use serde::{Deserialize, Serialize};

pub const X_EXTERNAL_TYPE: &str = "x-external-type";

/// Shape the external type takes in the generated code
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeHint {
    Primitive,
    Array,
    Map,
    Tuple,
    Interface,
    #[default]
    Object,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalImport {
    #[serde(default)]
    pub package: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalHints {
    #[serde(default)]
    pub kind: ShapeHint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_validation: Option<bool>,
}

/// Parsed `x-external-type` extension
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalOverride {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub import: ExternalImport,
    #[serde(default)]
    pub hints: ExternalHints,
    #[serde(default)]
    pub embedded: bool,
}

impl ExternalOverride {
    /// Import alias: explicit, else the last path segment of the package
    pub fn alias(&self) -> Option<String> {
        if let Some(alias) = self.import.alias.as_deref().filter(|a| !a.is_empty()) {
            return Some(alias.to_string());
        }
        let package = self.import.package.trim_end_matches('/');
        if package.is_empty() {
            return None;
        }
        package.rsplit('/').next().map(str::to_string)
    }

    pub fn package(&self) -> Option<String> {
        Some(self.import.package.clone()).filter(|p| !p.is_empty())
    }

    /// Name the type is referred to by. Embedded overrides stay unqualified.
    pub fn target(&self) -> QualifiedName {
        if self.embedded {
            return QualifiedName::bare(&self.type_name);
        }
        match self.alias() {
            Some(alias) => QualifiedName::new(alias, &self.type_name),
            None => QualifiedName::bare(&self.type_name),
        }
    }

    pub fn nullable(&self) -> bool {
        self.hints.nullable.unwrap_or(false)
    }
}

/// Parse the override on a schema, if present
pub fn extract(schema: &Schema, location: &str) -> Result<Option<ExternalOverride>> {
    let Some(raw) = schema.extension(X_EXTERNAL_TYPE) else {
        return Ok(None);
    };
    let malformed = |reason: String| GenError::MalformedOverride {
        location: location.to_string(),
        reason,
    };
    let parsed: ExternalOverride =
        serde_json::from_value(raw.clone()).map_err(|e| malformed(e.to_string()))?;
    if parsed.type_name.trim().is_empty() {
        return Err(malformed("type must not be empty".to_string()));
    }
    Ok(Some(parsed))
}

/// Resolve a schema carrying an override without looking at its body.
///
/// `target` and `package` come from the registry for named definitions, or from
/// the override itself for anonymous schemas. Swagger type metadata follows the
/// hinted shape; the declared format is kept.
pub fn short_circuit_resolve_external(
    target: QualifiedName,
    package: Option<String>,
    ext: &ExternalOverride,
    schema: &Schema,
) -> ResolvedType {
    let nullable = ext.nullable();
    let (kind, swagger_type) = match ext.hints.kind {
        ShapeHint::Primitive => (TypeKind::Primitive { semantic: None }, ""),
        ShapeHint::Array => (
            TypeKind::Array {
                element: Box::new(ResolvedType::interface()),
            },
            "array",
        ),
        ShapeHint::Map => (
            TypeKind::Map {
                value: Box::new(ResolvedType::interface()),
            },
            "object",
        ),
        ShapeHint::Tuple => (TypeKind::Tuple { members: Vec::new() }, "array"),
        ShapeHint::Interface => (TypeKind::Interface, "object"),
        ShapeHint::Object => (
            TypeKind::Object {
                target: ObjectRef::Named(target.clone()),
            },
            "object",
        ),
    };
    let mut resolved = ResolvedType::new(kind, swagger_type)
        .with_format(schema.format.clone().unwrap_or_default());
    resolved.nullable = nullable;
    resolved.omit_empty = !nullable;
    resolved.package = package;
    resolved.external = Some(target);
    resolved
}
