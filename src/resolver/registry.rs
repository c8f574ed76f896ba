//! Known-definition registry.
//!
//! Maps every definition name in the document to the qualified target name it
//! will be referred to by. Built completely before any resolution starts, so
//! definitions may reference each other in any order; afterwards it is only read.

use super::external::{extract, ExternalOverride};
use super::types::QualifiedName;
use crate::naming::pascalize;
use crate::spec::{pointer, Schema, Swagger};
use indexmap::IndexMap;
use tracing::{debug, warn};

/// Extension renaming the generated type of a definition
pub const X_TYPE_NAME: &str = "x-type-name";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnownDefinition {
    /// Name as declared under `definitions`
    pub definition: String,
    pub target: QualifiedName,
    /// Import path when the definition maps to an external type
    pub package: Option<String>,
    /// References to this definition may be absent
    pub nullable: bool,
    /// Override declared on the definition, if any
    pub external: Option<ExternalOverride>,
}

/// Case-insensitive lookup from definition name to target name
#[derive(Debug, Clone, Default)]
pub struct KnownDefinitions {
    entries: IndexMap<String, KnownDefinition>,
}

impl KnownDefinitions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every definition of a document
    pub fn from_spec(spec: &Swagger, namespace: &str) -> Self {
        let mut registry = Self::new();
        for (name, schema) in &spec.definitions {
            let location = pointer::join(&pointer::join("", "definitions"), name);
            let entry = known_definition(name, schema, namespace, &location);
            debug!(definition = %name, target = %entry.target, "registered definition");
            if !registry.insert(entry) {
                warn!(definition = %name, "definition name differs only by case from an earlier one, ignored");
            }
        }
        registry
    }

    /// Append-only. Returns `false` and keeps the existing entry when the name
    /// (ignoring case) is already registered.
    pub fn insert(&mut self, entry: KnownDefinition) -> bool {
        let key = entry.definition.to_lowercase();
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, entry);
        true
    }

    pub fn get(&self, name: &str) -> Option<&KnownDefinition> {
        self.entries.get(&name.to_lowercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &KnownDefinition> {
        self.entries.values()
    }
}

/// Registry entry for one definition.
///
/// With an override, the target is the override type (bare when embedded,
/// else qualified by its alias). Otherwise the definition lives in `namespace`
/// under its `x-type-name` or its own name, pascalized. A malformed override is
/// logged and ignored.
pub fn known_definition(
    name: &str,
    schema: &Schema,
    namespace: &str,
    location: &str,
) -> KnownDefinition {
    let nullable = super::explicit_nullable(schema)
        .unwrap_or(!schema.properties.is_empty() || !schema.all_of.is_empty());

    match extract(schema, location) {
        Ok(Some(ext)) => {
            return KnownDefinition {
                definition: name.to_string(),
                target: ext.target(),
                package: if ext.embedded { None } else { ext.package() },
                nullable: ext.nullable(),
                external: Some(ext),
            };
        }
        Ok(None) => {}
        Err(e) => warn!(definition = %name, error = %e, "ignoring override"),
    }

    let type_name = schema
        .extension_str(X_TYPE_NAME)
        .filter(|n| !n.trim().is_empty())
        .unwrap_or(name);
    KnownDefinition {
        definition: name.to_string(),
        target: QualifiedName::new(namespace, pascalize(type_name)),
        package: None,
        nullable,
        external: None,
    }
}
