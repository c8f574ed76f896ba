#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::models_for;
use swaggerc::config::GenOpts;
use swaggerc::generator::{DefinitionModel, GenerationOutput, OperationModel};
use swaggerc::resolver::{QualifiedName, TypeKind};
use swaggerc::spec::FlattenMode;
use swaggerc::typemap::SemanticType;

fn definition<'a>(output: &'a GenerationOutput, name: &str) -> &'a DefinitionModel {
    output
        .definitions
        .iter()
        .find(|d| d.name == name)
        .unwrap_or_else(|| panic!("missing definition {name}"))
}

fn operation<'a>(output: &'a GenerationOutput, name: &str) -> &'a OperationModel {
    output
        .operations
        .iter()
        .find(|o| o.name == name)
        .unwrap_or_else(|| panic!("missing operation {name}"))
}

#[test]
fn test_petstore_definitions() {
    let output = models_for("petstore.yaml", &GenOpts::default()).unwrap();
    let names: Vec<&str> = output.definitions.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["Pet", "Cat", "Point", "Error"]);

    let pet = definition(&output, "Pet");
    let birthday = pet.properties.iter().find(|p| p.name == "birthday").unwrap();
    assert_eq!(birthday.resolved.semantic(), Some(SemanticType::Date));
    assert!(!birthday.required);
    assert!(pet.properties.iter().find(|p| p.name == "id").unwrap().required);
    assert_eq!(pet.subtypes, vec!["Cat".to_string()]);
    assert_eq!(definition(&output, "Cat").discriminator_value.as_deref(), Some("Cat"));
}

#[test]
fn test_external_override_is_referenced_by_alias() {
    let output = models_for("petstore.yaml", &GenOpts::default()).unwrap();
    let point = definition(&output, "Point");
    assert!(point.is_alias);
    assert!(point.properties.is_empty());
    assert_eq!(point.package, "geo");

    let pet = definition(&output, "Pet");
    let location = pet.properties.iter().find(|p| p.name == "location").unwrap();
    assert!(location.resolved.is_external());
    assert_eq!(location.resolved.target(), Some(&QualifiedName::new("geo", "Point")));
    assert_eq!(location.resolved.package.as_deref(), Some("example.com/geo"));
}

#[test]
fn test_petstore_operations() {
    let output = models_for("petstore.yaml", &GenOpts::default()).unwrap();
    assert_eq!(output.operations.len(), 4);

    let list = operation(&output, "listPets");
    assert_eq!(list.package, "pets");
    assert_eq!(list.method, "get");
    assert!(list.authorized);
    assert_eq!(list.produces, vec!["application/json".to_string()]);
    let limit = &list.parameters[0];
    assert_eq!(limit.resolved.semantic(), Some(SemanticType::Int32));
    assert_eq!(limit.default, Some(serde_json::json!(20)));
    let ok = list.success_response().unwrap();
    match &ok.schema.as_ref().unwrap().kind {
        TypeKind::Array { element } => {
            assert_eq!(element.target(), Some(&QualifiedName::new("models", "Pet")))
        }
        other => panic!("expected array, got {other:?}"),
    }

    let show = operation(&output, "showPetById");
    assert_eq!(show.parameters[0].name, "petId");
    assert!(show.parameters[0].required);

    let add = operation(&output, "addPet");
    let body = &add.parameters[0];
    assert_eq!(body.properties.len(), 2);
    assert!(body.properties[0].required);

    let health = operation(&output, "health");
    assert!(!health.authorized);
    assert_eq!(health.package, "operations");
}

#[test]
fn test_full_flatten_feeds_promoted_models() {
    let opts = GenOpts {
        flatten_mode: FlattenMode::Full,
        ..GenOpts::default()
    };
    let output = models_for("petstore.yaml", &opts).unwrap();
    let owner = definition(&output, "PetOwner");
    assert_eq!(owner.properties[0].name, "name");

    let add = operation(&output, "addPet");
    assert_eq!(
        add.parameters[0].resolved.target(),
        Some(&QualifiedName::new("models", "AddPetBody"))
    );
}

#[test]
fn test_expand_produces_inline_models() {
    let opts = GenOpts {
        flatten_mode: FlattenMode::Expand,
        ..GenOpts::default()
    };
    let output = models_for("petstore.yaml", &opts).unwrap();
    let list = operation(&output, "listPets");
    match &list.success_response().unwrap().schema.as_ref().unwrap().kind {
        TypeKind::Array { element } => assert!(element.is_complex_object() && element.target().is_none()),
        other => panic!("expected array, got {other:?}"),
    }
}

#[test]
fn test_definitions_only_document() {
    let opts = GenOpts {
        accept_definitions_only: true,
        ..GenOpts::default()
    };
    let output = models_for("definitions_only.yaml", &opts).unwrap();
    assert!(output.operations.is_empty());
    let price = definition(&output, "Price");
    assert_eq!(
        price.properties[0].resolved.target(),
        Some(&QualifiedName::new("models", "Money"))
    );
}

#[test]
fn test_remote_models_are_generated() {
    let output = models_for("split_main.yaml", &GenOpts::default()).unwrap();
    let names: Vec<&str> = output.definitions.iter().map(|d| d.name.as_str()).collect();
    assert!(names.contains(&"Order"));
    assert!(names.contains(&"Line"));
    let order = definition(&output, "Order");
    let lines = order.properties.iter().find(|p| p.name == "lines").unwrap();
    match &lines.resolved.kind {
        TypeKind::Array { element } => {
            assert_eq!(element.target(), Some(&QualifiedName::new("models", "Line")))
        }
        other => panic!("expected array, got {other:?}"),
    }
}

#[test]
fn test_remote_parameters_and_responses_build() {
    let output = models_for("split_operations.yaml", &GenOpts::default()).unwrap();
    let list = operation(&output, "listItems");
    let limit = &list.parameters[0];
    assert_eq!(limit.name, "limit");
    assert_eq!(limit.resolved.semantic(), Some(SemanticType::Int32));
    let not_found = list.responses.iter().find(|r| r.code == "404").unwrap();
    assert_eq!(not_found.description, "not found");
    assert_eq!(
        not_found.schema.as_ref().unwrap().target(),
        Some(&QualifiedName::new("models", "Problem"))
    );
    assert!(output.definitions.iter().any(|d| d.name == "Problem"));
}

#[test]
fn test_custom_models_namespace() {
    let opts = GenOpts {
        models_namespace: "entities".to_string(),
        ..GenOpts::default()
    };
    let output = models_for("petstore.yaml", &opts).unwrap();
    assert_eq!(definition(&output, "Error").package, "entities");
    assert_eq!(
        definition(&output, "Pet").resolved.target(),
        Some(&QualifiedName::new("entities", "Pet"))
    );
}
