#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Unit tests for the type resolver

use super::*;
use crate::spec::Swagger;
use serde_json::json;

fn schema(value: serde_json::Value) -> Schema {
    serde_json::from_value(value).expect("valid schema")
}

fn registry_for(definitions: serde_json::Value) -> KnownDefinitions {
    let spec: Swagger = serde_json::from_value(json!({
        "swagger": "2.0",
        "info": {"title": "t", "version": "1"},
        "paths": {},
        "definitions": definitions,
    }))
    .expect("valid spec");
    KnownDefinitions::from_spec(&spec, "models")
}

fn resolve_with(registry: &KnownDefinitions, value: serde_json::Value) -> ResolvedType {
    TypeResolver::new("models", registry)
        .resolve(&schema(value), &ResolveContext::anonymous("/test"))
        .expect("resolves")
}

fn resolve(value: serde_json::Value) -> ResolvedType {
    resolve_with(&KnownDefinitions::new(), value)
}

/// `(type, format, expected)` for every entry of both type tables. Formats are
/// declared on a `string`; the format wins regardless of the declared type.
fn table_pairs() -> Vec<(&'static str, &'static str, SemanticType)> {
    let mut pairs: Vec<_> = typemap::format_entries()
        .map(|(format, semantic)| ("string", format, semantic))
        .chain(typemap::type_entries().map(|(name, semantic)| (name, "", semantic)))
        .collect();
    pairs.sort_by_key(|(swagger_type, format, _)| (*swagger_type, *format));
    pairs
}

fn typed(swagger_type: &str, format: &str) -> serde_json::Value {
    if format.is_empty() {
        json!({"type": swagger_type})
    } else {
        json!({"type": swagger_type, "format": format})
    }
}

#[test]
fn test_every_table_pair_resolves_to_its_primitive() {
    let pairs = table_pairs();
    assert!(pairs.len() > 40);
    for (swagger_type, format, expected) in pairs {
        let resolved = resolve(typed(swagger_type, format));
        assert_eq!(
            resolved.semantic(),
            Some(expected),
            "({swagger_type}, {format})"
        );
        assert_eq!(
            resolved.zero_value(),
            expected.zero_value(),
            "zero value of ({swagger_type}, {format})"
        );
        assert_eq!(resolved.swagger_type, swagger_type);
        assert_eq!(resolved.swagger_format, format);
    }
}

#[test]
fn test_hyphenated_formats_resolve() {
    for (format, expected) in [
        ("date-time", SemanticType::DateTime),
        ("uuid-4", SemanticType::Uuid4),
        ("credit-card", SemanticType::CreditCard),
    ] {
        assert_eq!(resolve(typed("string", format)).semantic(), Some(expected));
    }
}

#[test]
fn test_every_table_pair_wraps_as_array() {
    for (swagger_type, format, _) in table_pairs() {
        let bare = resolve(typed(swagger_type, format));
        let wrapped = resolve(json!({"type": "array", "items": typed(swagger_type, format)}));
        assert_eq!(wrapped.swagger_type, "array");
        match wrapped.kind {
            TypeKind::Array { element } => assert_eq!(*element, bare),
            other => panic!("expected array for ({swagger_type}, {format}), got {other:?}"),
        }
    }
}

#[test]
fn test_streams_are_flagged() {
    assert!(resolve(json!({"type": "file"})).is_stream);
    assert!(resolve(json!({"type": "string", "format": "binary"})).is_stream);
    assert!(!resolve(json!({"type": "string"})).is_stream);
}

#[test]
fn test_ref_resolves_case_insensitively() {
    let registry = registry_for(json!({
        "Pet": {"type": "object", "properties": {"id": {"type": "integer"}}}
    }));
    for reference in ["#/definitions/Pet", "#/definitions/pet", "#/definitions/PET"] {
        let resolved = resolve_with(&registry, json!({"$ref": reference}));
        assert_eq!(resolved.swagger_type, "object");
        assert_eq!(
            resolved.target(),
            Some(&QualifiedName::new("models", "Pet"))
        );
        assert_eq!(resolved.to_string(), "?models.Pet");
    }
}

#[test]
fn test_unregistered_ref_is_broken() {
    let registry = KnownDefinitions::new();
    let err = TypeResolver::new("models", &registry)
        .resolve(
            &schema(json!({"$ref": "#/definitions/Missing"})),
            &ResolveContext::anonymous("/definitions/Owner/properties/pet"),
        )
        .unwrap_err();
    match err {
        GenError::BrokenReference {
            reference,
            referrer,
        } => {
            assert_eq!(reference, "#/definitions/Missing");
            assert_eq!(referrer, "/definitions/Owner/properties/pet");
        }
        other => panic!("expected BrokenReference, got {other:?}"),
    }
}

#[test]
fn test_non_definition_ref_is_broken() {
    let registry = registry_for(json!({"Pet": {"type": "object"}}));
    let err = TypeResolver::new("models", &registry)
        .resolve(
            &schema(json!({"$ref": "#/parameters/limit"})),
            &ResolveContext::anonymous("/x"),
        )
        .unwrap_err();
    assert!(matches!(err, GenError::BrokenReference { .. }));
}

#[test]
fn test_empty_object_is_map_of_interface() {
    let resolved = resolve(json!({"type": "object"}));
    assert_eq!(resolved.swagger_type, "object");
    match resolved.kind {
        TypeKind::Map { value } => assert!(value.is_interface()),
        other => panic!("expected map, got {other:?}"),
    }
}

#[test]
fn test_additional_properties_schema_is_map() {
    let resolved = resolve(json!({
        "type": "object",
        "additionalProperties": {"type": "integer", "format": "int32"}
    }));
    match resolved.kind {
        TypeKind::Map { value } => assert_eq!(value.semantic(), Some(SemanticType::Int32)),
        other => panic!("expected map, got {other:?}"),
    }
}

#[test]
fn test_additional_properties_true_is_map_of_interface() {
    let resolved = resolve(json!({"type": "object", "additionalProperties": true}));
    assert!(resolved.is_map());
}

#[test]
fn test_bare_schema_is_interface() {
    assert!(resolve(json!({})).is_interface());
    assert!(resolve(json!({"description": "anything"})).is_interface());
}

#[test]
fn test_heterogeneous_and_null_types() {
    assert!(resolve(json!({"type": ["string", "integer"]})).is_interface());
    assert!(resolve(json!({"type": "null"})).is_interface());
    let nullable = resolve(json!({"type": ["string", "null"]}));
    assert_eq!(nullable.semantic(), Some(SemanticType::String));
    assert!(nullable.nullable);
}

#[test]
fn test_array_without_items_holds_interface() {
    match resolve(json!({"type": "array"})).kind {
        TypeKind::Array { element } => assert!(element.is_interface()),
        other => panic!("expected array, got {other:?}"),
    }
}

#[test]
fn test_positional_items() {
    let tuple = resolve(json!({
        "type": "array",
        "items": [{"type": "string"}, {"type": "integer"}]
    }));
    assert_eq!(tuple.swagger_type, "array");
    match tuple.kind {
        TypeKind::Tuple { members } => {
            assert_eq!(members.len(), 2);
            assert_eq!(members[1].semantic(), Some(SemanticType::Int64));
        }
        other => panic!("expected tuple, got {other:?}"),
    }

    let homogeneous = resolve(json!({
        "type": "array",
        "items": [{"type": "string"}, {"type": "string"}]
    }));
    assert!(homogeneous.is_array());
}

#[test]
fn test_inline_and_named_objects() {
    let registry = registry_for(json!({
        "pet_owner": {"type": "object", "properties": {"name": {"type": "string"}}}
    }));
    let body = schema(json!({"type": "object", "properties": {"name": {"type": "string"}}}));
    let resolver = TypeResolver::new("models", &registry);

    let named = resolver
        .resolve(
            &body,
            &ResolveContext::definition("pet_owner", "/definitions/pet_owner"),
        )
        .unwrap();
    assert_eq!(
        named.target(),
        Some(&QualifiedName::new("models", "PetOwner"))
    );

    let inline = resolver
        .resolve(&body, &ResolveContext::anonymous("/paths/x"))
        .unwrap();
    assert_eq!(
        inline.kind,
        TypeKind::Object {
            target: ObjectRef::Inline
        }
    );
}

#[test]
fn test_recursive_definition_stops_at_named_reference() {
    let registry = registry_for(json!({
        "Node": {
            "type": "object",
            "properties": {
                "children": {"type": "array", "items": {"$ref": "#/definitions/Node"}}
            }
        }
    }));
    let children = resolve_with(
        &registry,
        json!({"type": "array", "items": {"$ref": "#/definitions/Node"}}),
    );
    match children.kind {
        TypeKind::Array { element } => {
            assert_eq!(element.target(), Some(&QualifiedName::new("models", "Node")))
        }
        other => panic!("expected array, got {other:?}"),
    }
}

fn override_schema(kind: &str, embedded: bool) -> serde_json::Value {
    json!({
        "type": "object",
        "x-external-type": {
            "type": "Mytype",
            "import": {"package": "p", "alias": "ext"},
            "hints": {"kind": kind},
            "embedded": embedded
        }
    })
}

#[test]
fn test_override_map() {
    let resolved = resolve(override_schema("map", false));
    assert!(resolved.is_map());
    assert_eq!(resolved.swagger_type, "object");
    assert_eq!(resolved.target(), Some(&QualifiedName::new("ext", "Mytype")));
    assert_eq!(resolved.package.as_deref(), Some("p"));
    assert!(resolved.omit_empty);
    assert!(!resolved.nullable);
}

#[test]
fn test_override_embedded_is_bare() {
    let resolved = resolve(override_schema("map", true));
    assert_eq!(resolved.target(), Some(&QualifiedName::bare("Mytype")));
    assert_eq!(resolved.to_string(), "Mytype");
    assert_eq!(resolved.package, None);
}

#[test]
fn test_override_tuple_is_not_array() {
    let resolved = resolve(override_schema("tuple", false));
    assert_eq!(resolved.swagger_type, "array");
    assert!(resolved.is_tuple());
    assert!(!resolved.is_array());
}

#[test]
fn test_override_primitive_and_nullable_array() {
    let primitive = resolve(override_schema("primitive", false));
    assert_eq!(primitive.swagger_type, "");
    assert_eq!(primitive.kind, TypeKind::Primitive { semantic: None });

    let array = resolve(json!({
        "type": "array",
        "items": {"type": "string"},
        "x-external-type": {
            "type": "Mytype",
            "import": {"package": "github.com/acme/types"},
            "hints": {"kind": "array", "nullable": true}
        }
    }));
    assert!(array.is_array());
    assert!(array.nullable);
    assert!(!array.omit_empty);
    assert_eq!(array.target(), Some(&QualifiedName::new("types", "Mytype")));
}

#[test]
fn test_malformed_override_falls_back_to_inference() {
    let resolved = resolve(json!({
        "type": "string",
        "x-external-type": {"import": {"package": "p"}}
    }));
    assert_eq!(resolved.semantic(), Some(SemanticType::String));
    assert!(resolved.external.is_none());
}

#[test]
fn test_ref_to_overridden_definition_uses_registry_target() {
    let registry = registry_for(json!({
        "Money": {
            "type": "string",
            "x-external-type": {
                "type": "Decimal",
                "import": {"package": "github.com/shopspring/decimal"},
                "hints": {"kind": "primitive"}
            }
        }
    }));
    let resolved = resolve_with(&registry, json!({"$ref": "#/definitions/Money"}));
    assert_eq!(resolved.kind, TypeKind::Primitive { semantic: None });
    assert_eq!(
        resolved.target(),
        Some(&QualifiedName::new("decimal", "Decimal"))
    );
    assert_eq!(
        resolved.package.as_deref(),
        Some("github.com/shopspring/decimal")
    );
}

#[test]
fn test_type_name_extension_renames_definition() {
    let registry = registry_for(json!({
        "pet": {"type": "object", "x-type-name": "animal", "properties": {"a": {"type": "string"}}}
    }));
    assert_eq!(
        registry.get("PET").unwrap().target,
        QualifiedName::new("models", "Animal")
    );
}

#[test]
fn test_nullability_rules() {
    let resolver_registry = KnownDefinitions::new();
    let resolver = TypeResolver::new("models", &resolver_registry);
    let ctx = ResolveContext::anonymous("/p").with_required(true);

    let required_int = resolver.resolve(&schema(json!({"type": "integer"})), &ctx).unwrap();
    assert!(required_int.nullable);

    let optional_int = resolve(json!({"type": "integer"}));
    assert!(!optional_int.nullable);

    let read_only = resolver
        .resolve(&schema(json!({"type": "string", "readOnly": true})), &ctx)
        .unwrap();
    assert!(!read_only.nullable);

    let explicit = resolve(json!({"type": "integer", "x-nullable": true}));
    assert!(explicit.nullable);

    let binary = resolver
        .resolve(&schema(json!({"type": "string", "format": "binary"})), &ctx)
        .unwrap();
    assert!(!binary.nullable);

    let omitted = resolve(json!({"type": "string", "x-omitempty": true}));
    assert!(omitted.omit_empty);
}
