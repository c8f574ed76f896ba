//! Definition models: one per named schema under `definitions`.

use crate::error::{GenError, Result};
use crate::naming::pascalize;
use crate::resolver::{ResolveContext, ResolvedType, TypeKind, TypeResolver};
use crate::spec::{pointer, AdditionalProperties, Schema, SchemaItems, Swagger};
use rayon::prelude::*;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;
use tracing::debug;

/// Extension naming the discriminator value of a subtype
pub const X_DISCRIMINATOR_VALUE: &str = "x-discriminator-value";

/// Validation keywords carried through to the renderer
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Validations {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub exclusive_maximum: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub exclusive_minimum: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_items: Option<u64>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub unique_items: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiple_of: Option<f64>,
    #[serde(rename = "enum", skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<Value>,
}

impl Validations {
    pub fn from_schema(schema: &Schema) -> Self {
        Validations {
            maximum: schema.maximum,
            exclusive_maximum: schema.exclusive_maximum,
            minimum: schema.minimum,
            exclusive_minimum: schema.exclusive_minimum,
            max_length: schema.max_length,
            min_length: schema.min_length,
            pattern: schema.pattern.clone(),
            max_items: schema.max_items,
            min_items: schema.min_items,
            unique_items: schema.unique_items,
            multiple_of: schema.multiple_of,
            enum_values: schema.enum_values.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Validations::default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyModel {
    /// Name as declared in the document
    pub name: String,
    /// Exported identifier form of `name`
    pub field_name: String,
    #[serde(rename = "type")]
    pub resolved: ResolvedType,
    pub required: bool,
    pub read_only: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(skip_serializing_if = "Validations::is_empty")]
    pub validations: Validations,
    /// Members of an inline object property
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<PropertyModel>,
}

/// One `allOf` member: a referenced type, or inline properties merged into the model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllOfMember {
    #[serde(rename = "type")]
    pub resolved: ResolvedType,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<PropertyModel>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DefinitionModel {
    /// Name as declared under `definitions`
    pub name: String,
    /// Generated type name
    pub type_name: String,
    pub package: String,
    #[serde(rename = "type")]
    pub resolved: ResolvedType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub properties: Vec<PropertyModel>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub all_of: Vec<AllOfMember>,
    /// Value type of extra properties alongside declared ones
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<ResolvedType>,
    /// Property that selects the concrete subtype
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discriminator: Option<String>,
    /// Value identifying this model as a subtype of a discriminated base
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discriminator_value: Option<String>,
    /// Definitions extending this one through `allOf`, when it is a discriminated base
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subtypes: Vec<String>,
    /// Not an object of its own: the model is a named alias of another shape
    pub is_alias: bool,
    #[serde(skip_serializing_if = "Validations::is_empty")]
    pub validations: Validations,
}

/// Definitions to build, in document order. Fails when the filter names an
/// unknown definition.
pub fn gather_definitions<'a>(
    spec: &'a Swagger,
    model_filter: &BTreeSet<String>,
) -> Result<Vec<(&'a str, &'a Schema)>> {
    let missing: Vec<String> = model_filter
        .iter()
        .filter(|name| !spec.definitions.contains_key(name.as_str()))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(GenError::UnknownDefinition { names: missing });
    }
    Ok(spec
        .definitions
        .iter()
        .filter(|(name, _)| model_filter.is_empty() || model_filter.contains(name.as_str()))
        .map(|(name, schema)| (name.as_str(), schema))
        .collect())
}

/// Build every selected definition in parallel, preserving document order
pub fn build_definitions(
    resolver: &TypeResolver<'_>,
    selected: &[(&str, &Schema)],
) -> Result<Vec<DefinitionModel>> {
    let mut models = selected
        .par_iter()
        .map(|(name, schema)| {
            build_definition(resolver, name, schema).map_err(|e| GenError::in_definition(name, e))
        })
        .collect::<Result<Vec<_>>>()?;
    link_subtypes(&mut models);
    Ok(models)
}

pub fn build_definition(
    resolver: &TypeResolver<'_>,
    name: &str,
    schema: &Schema,
) -> Result<DefinitionModel> {
    let location = pointer::join(&pointer::join("", "definitions"), name);
    let ctx = ResolveContext::definition(name, location.clone());
    let mut resolved = resolver.resolve(schema, &ctx)?;
    complete_tuple(resolver, &mut resolved, schema, &ctx)?;

    let (type_name, package) = match resolver.registry().get(name) {
        Some(known) => (
            known.target.name.clone(),
            known
                .target
                .namespace
                .clone()
                .unwrap_or_else(|| resolver.namespace().to_string()),
        ),
        None => (pascalize(name), resolver.namespace().to_string()),
    };

    let properties = if resolved.is_external() {
        Vec::new()
    } else {
        build_properties(resolver, schema, &location)?
    };

    let all_of = schema
        .all_of
        .iter()
        .enumerate()
        .map(|(i, member)| {
            let member_ptr = pointer::join(&pointer::join(&location, "allOf"), &i.to_string());
            let member_resolved = resolver.resolve(member, &ResolveContext::anonymous(&member_ptr))?;
            let properties = if member.reference.is_none() {
                build_properties(resolver, member, &member_ptr)?
            } else {
                Vec::new()
            };
            Ok(AllOfMember {
                resolved: member_resolved,
                properties,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let additional_properties = match &schema.additional_properties {
        Some(AdditionalProperties::Schema(values)) if !schema.properties.is_empty() => {
            let ctx = ResolveContext::anonymous(pointer::join(&location, "additionalProperties"));
            Some(resolver.resolve(values, &ctx)?)
        }
        _ => None,
    };

    // a bare `$ref` names another model instead of declaring one
    let is_reference_only =
        schema.reference.is_some() && schema.properties.is_empty() && schema.all_of.is_empty();
    let is_alias = !matches!(resolved.kind, TypeKind::Object { .. })
        || resolved.is_external()
        || is_reference_only;
    let discriminator_value = schema
        .extension_str(X_DISCRIMINATOR_VALUE)
        .map(str::to_string)
        .or_else(|| {
            schema
                .all_of
                .iter()
                .any(|m| m.reference.is_some())
                .then(|| name.to_string())
        });

    debug!(definition = %name, resolved = %resolved, properties = properties.len(), "built definition");
    Ok(DefinitionModel {
        name: name.to_string(),
        type_name,
        package,
        resolved,
        title: schema.title.clone(),
        description: schema.description.clone(),
        properties,
        all_of,
        additional_properties,
        discriminator: schema.discriminator.clone(),
        discriminator_value,
        subtypes: Vec::new(),
        is_alias,
        validations: Validations::from_schema(schema),
    })
}

/// Properties of an object schema, ordered by `x-order` when present, else as declared
pub fn build_properties(
    resolver: &TypeResolver<'_>,
    schema: &Schema,
    location: &str,
) -> Result<Vec<PropertyModel>> {
    let props_ptr = pointer::join(location, "properties");
    let mut properties = schema
        .properties
        .iter()
        .map(|(name, prop)| {
            let prop_ptr = pointer::join(&props_ptr, name);
            let ctx = ResolveContext::anonymous(prop_ptr.clone()).with_required(schema.is_required(name));
            let mut resolved = resolver.resolve(prop, &ctx)?;
            complete_tuple(resolver, &mut resolved, prop, &ctx)?;
            let nested = match resolved.kind {
                TypeKind::Object { .. } if prop.reference.is_none() && !resolved.is_external() => {
                    build_properties(resolver, prop, &prop_ptr)?
                }
                _ => Vec::new(),
            };
            Ok(PropertyModel {
                name: name.clone(),
                field_name: pascalize(name),
                resolved,
                required: ctx.required,
                read_only: prop.read_only,
                description: prop.description.clone(),
                default: prop.default.clone(),
                example: prop.example.clone(),
                order: prop.order(),
                validations: Validations::from_schema(prop),
                properties: nested,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    // stable: unordered properties keep declaration order after ordered ones
    properties.sort_by_key(|p| p.order.unwrap_or(i64::MAX));
    Ok(properties)
}

/// Fill the members of an override-declared tuple from the schema's positional items
fn complete_tuple(
    resolver: &TypeResolver<'_>,
    resolved: &mut ResolvedType,
    schema: &Schema,
    ctx: &ResolveContext<'_>,
) -> Result<()> {
    let TypeKind::Tuple { members } = &mut resolved.kind else {
        return Ok(());
    };
    if !members.is_empty() {
        return Ok(());
    }
    if let Some(SchemaItems::Tuple(list)) = &schema.items {
        let items_ctx = ctx.child("items");
        for (i, item) in list.iter().enumerate() {
            members.push(resolver.resolve(item, &items_ctx.child(&i.to_string()))?);
        }
    }
    Ok(())
}

/// Record each subtype on the discriminated base it extends
fn link_subtypes(models: &mut [DefinitionModel]) {
    let links: Vec<(String, String)> = models
        .iter()
        .flat_map(|model| {
            model.all_of.iter().filter_map(move |member| {
                member
                    .resolved
                    .target()
                    .map(|base| (base.name.clone(), model.name.clone()))
            })
        })
        .collect();
    for (base, subtype) in links {
        if let Some(base_model) = models
            .iter_mut()
            .find(|m| m.type_name == base && m.discriminator.is_some())
        {
            base_model.subtypes.push(subtype);
        }
    }
}
