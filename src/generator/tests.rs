use super::*;
use crate::config::{DumpFormat, GenOpts};
use crate::error::GenError;
use crate::resolver::{ObjectRef, QualifiedName, TypeKind};
use crate::spec::{preprocess_document, DocumentLocation, ParameterLocation, SpecDocument};
use crate::typemap::SemanticType;
use serde_json::{json, Value};

fn models_with(value: Value, opts: &GenOpts) -> crate::error::Result<GenerationOutput> {
    let doc = SpecDocument::from_value(DocumentLocation::Memory, value)?;
    let pre = preprocess_document(doc, &opts.preprocess_options())?;
    build_models(&pre, opts)
}

fn models(value: Value) -> GenerationOutput {
    models_with(value, &GenOpts::default()).unwrap()
}

fn unvalidated() -> GenOpts {
    GenOpts {
        validate_spec: false,
        ..GenOpts::default()
    }
}

fn definitions_doc() -> Value {
    json!({
        "swagger": "2.0",
        "info": {"title": "t", "version": "1"},
        "paths": {},
        "definitions": {
            "Pet": {
                "type": "object",
                "required": ["name"],
                "discriminator": "petType",
                "properties": {
                    "name": {"type": "string", "minLength": 1},
                    "petType": {"type": "string"},
                    "category": {"$ref": "#/definitions/Category"},
                    "tags": {"type": "array", "items": {"type": "string"}},
                    "address": {
                        "type": "object",
                        "properties": {"street": {"type": "string"}}
                    }
                }
            },
            "Dog": {
                "allOf": [
                    {"$ref": "#/definitions/Pet"},
                    {"type": "object", "properties": {"bark": {"type": "boolean"}}}
                ]
            },
            "Category": {
                "type": "object",
                "properties": {"id": {"type": "integer", "format": "int64"}}
            },
            "Labels": {
                "type": "object",
                "additionalProperties": {"type": "string"}
            }
        }
    })
}

fn find<'a>(output: &'a GenerationOutput, name: &str) -> &'a DefinitionModel {
    output
        .definitions
        .iter()
        .find(|d| d.name == name)
        .unwrap_or_else(|| panic!("no definition {name}"))
}

#[test]
fn test_forward_references_resolve() {
    let output = models(definitions_doc());
    let pet = find(&output, "Pet");
    let category = pet.properties.iter().find(|p| p.name == "category").unwrap();
    assert_eq!(
        category.resolved.target(),
        Some(&QualifiedName::new("models", "Category"))
    );
    assert!(!pet.is_alias);
    assert_eq!(pet.package, "models");
    assert_eq!(
        pet.resolved.kind,
        TypeKind::Object {
            target: ObjectRef::Named(QualifiedName::new("models", "Pet"))
        }
    );
}

#[test]
fn test_definitions_keep_document_order() {
    let output = models(definitions_doc());
    let names: Vec<&str> = output.definitions.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["Pet", "Dog", "Category", "Labels"]);
}

#[test]
fn test_property_metadata() {
    let output = models(definitions_doc());
    let pet = find(&output, "Pet");
    let name = &pet.properties[0];
    assert_eq!(name.name, "name");
    assert_eq!(name.field_name, "Name");
    assert!(name.required);
    assert_eq!(name.validations.min_length, Some(1));

    let address = pet.properties.iter().find(|p| p.name == "address").unwrap();
    assert_eq!(
        address.resolved.kind,
        TypeKind::Object {
            target: ObjectRef::Inline
        }
    );
    assert_eq!(address.properties.len(), 1);
    assert_eq!(address.properties[0].name, "street");

    let id = &find(&output, "Category").properties[0];
    assert_eq!(id.resolved.semantic(), Some(SemanticType::Int64));
    assert_eq!(id.field_name, "ID");
}

#[test]
fn test_map_definition_is_alias() {
    let output = models(definitions_doc());
    let labels = find(&output, "Labels");
    assert!(labels.is_alias);
    assert!(labels.resolved.is_map());
}

#[test]
fn test_reference_only_definition_is_alias() {
    let mut value = definitions_doc();
    value["definitions"]["PetAlias"] = json!({"$ref": "#/definitions/Pet"});
    let output = models(value);
    let alias = find(&output, "PetAlias");
    assert!(alias.is_alias);
    assert!(alias.properties.is_empty());
    assert_eq!(
        alias.resolved.target(),
        Some(&QualifiedName::new("models", "Pet"))
    );
    assert!(!find(&output, "Pet").is_alias);
}

#[test]
fn test_discriminated_subtypes_are_linked() {
    let output = models(definitions_doc());
    let pet = find(&output, "Pet");
    assert_eq!(pet.discriminator.as_deref(), Some("petType"));
    assert_eq!(pet.subtypes, vec!["Dog".to_string()]);

    let dog = find(&output, "Dog");
    assert_eq!(dog.discriminator_value.as_deref(), Some("Dog"));
    assert_eq!(dog.all_of.len(), 2);
    assert_eq!(
        dog.all_of[0].resolved.target(),
        Some(&QualifiedName::new("models", "Pet"))
    );
    assert_eq!(dog.all_of[1].properties[0].name, "bark");
}

#[test]
fn test_x_order_sorts_properties() {
    let value = json!({
        "swagger": "2.0",
        "info": {"title": "t", "version": "1"},
        "paths": {},
        "definitions": {
            "Point": {
                "type": "object",
                "properties": {
                    "z": {"type": "number"},
                    "y": {"type": "number", "x-order": 1},
                    "x": {"type": "number", "x-order": 0}
                }
            }
        }
    });
    let output = models(value);
    let names: Vec<&str> = find(&output, "Point")
        .properties
        .iter()
        .map(|p| p.name.as_str())
        .collect();
    assert_eq!(names, vec!["x", "y", "z"]);
}

#[test]
fn test_spec_order_annotation_keeps_declaration_order() {
    let value = json!({
        "swagger": "2.0",
        "info": {"title": "t", "version": "1"},
        "paths": {},
        "definitions": {
            "Point": {
                "type": "object",
                "properties": {"z": {"type": "number"}, "a": {"type": "number"}}
            }
        }
    });
    let opts = GenOpts {
        properties_spec_order: true,
        ..GenOpts::default()
    };
    let output = models_with(value, &opts).unwrap();
    let point = find(&output, "Point");
    assert_eq!(point.properties[0].name, "z");
    assert_eq!(point.properties[0].order, Some(0));
    assert_eq!(point.properties[1].order, Some(1));
}

#[test]
fn test_override_tuple_arity_comes_from_items() {
    let value = json!({
        "swagger": "2.0",
        "info": {"title": "t", "version": "1"},
        "paths": {},
        "definitions": {
            "Pair": {
                "type": "array",
                "items": [{"type": "string"}, {"type": "integer"}],
                "x-external-type": {
                    "type": "Pair",
                    "import": {"package": "example.com/lib/pairs"},
                    "hints": {"kind": "tuple"}
                }
            }
        }
    });
    let output = models(value);
    let pair = find(&output, "Pair");
    assert!(pair.is_alias);
    assert_eq!(pair.resolved.swagger_type, "array");
    assert_eq!(pair.package, "pairs");
    match &pair.resolved.kind {
        TypeKind::Tuple { members } => {
            assert_eq!(members.len(), 2);
            assert_eq!(members[0].semantic(), Some(SemanticType::String));
            assert_eq!(members[1].semantic(), Some(SemanticType::Int64));
        }
        other => panic!("expected tuple, got {other:?}"),
    }
}

#[test]
fn test_broken_reference_names_the_definition() {
    let value = json!({
        "swagger": "2.0",
        "info": {"title": "t", "version": "1"},
        "paths": {},
        "definitions": {
            "Pet": {
                "type": "object",
                "properties": {"owner": {"$ref": "#/definitions/Owner"}}
            }
        }
    });
    let err = models_with(value, &unvalidated()).unwrap_err();
    match &err {
        GenError::Definition { name, .. } => assert_eq!(name, "Pet"),
        other => panic!("unexpected error: {other}"),
    }
    match err.root_cause() {
        GenError::BrokenReference { reference, referrer } => {
            assert_eq!(reference, "#/definitions/Owner");
            assert_eq!(referrer, "/definitions/Pet/properties/owner");
        }
        other => panic!("unexpected cause: {other}"),
    }
}

#[test]
fn test_model_filter() {
    let mut opts = GenOpts::default();
    opts.model_filter.insert("Category".to_string());
    let output = models_with(definitions_doc(), &opts).unwrap();
    assert_eq!(output.definitions.len(), 1);
    assert_eq!(output.definitions[0].name, "Category");

    opts.model_filter.insert("Unicorn".to_string());
    let err = models_with(definitions_doc(), &opts).unwrap_err();
    match err {
        GenError::UnknownDefinition { names } => assert_eq!(names, vec!["Unicorn".to_string()]),
        other => panic!("unexpected error: {other}"),
    }
}

fn operations_doc() -> Value {
    json!({
        "swagger": "2.0",
        "info": {"title": "t", "version": "1"},
        "securityDefinitions": {"api_key": {"type": "apiKey", "name": "key", "in": "header"}},
        "security": [{"api_key": []}],
        "parameters": {
            "limit": {"name": "limit", "in": "query", "type": "integer", "format": "int32"}
        },
        "responses": {
            "Problem": {"description": "problem", "schema": {"type": "string"}}
        },
        "paths": {
            "/pets": {
                "get": {
                    "operationId": "listPets",
                    "tags": ["pets"],
                    "parameters": [{"$ref": "#/parameters/limit"}],
                    "responses": {
                        "200": {
                            "description": "ok",
                            "schema": {"type": "array", "items": {"$ref": "#/definitions/Pet"}},
                            "headers": {"X-Rate": {"type": "integer"}}
                        },
                        "default": {"$ref": "#/responses/Problem"}
                    }
                },
                "post": {
                    "tags": ["pets", "Store Front"],
                    "security": [],
                    "parameters": [{
                        "name": "body",
                        "in": "body",
                        "required": true,
                        "schema": {"$ref": "#/definitions/Pet"}
                    }],
                    "responses": {"201": {"description": "created"}}
                }
            },
            "/pets/{petId}": {
                "parameters": [
                    {"name": "petId", "in": "path", "required": true, "type": "string"}
                ],
                "get": {
                    "operationId": "showPet",
                    "parameters": [
                        {"name": "petId", "in": "path", "required": true, "type": "integer"}
                    ],
                    "responses": {"200": {"description": "ok", "schema": {"$ref": "#/definitions/Pet"}}}
                }
            }
        },
        "definitions": {
            "Pet": {"type": "object", "properties": {"name": {"type": "string"}}}
        }
    })
}

fn operation<'a>(output: &'a GenerationOutput, name: &str, package: &str) -> &'a OperationModel {
    output
        .operations
        .iter()
        .find(|o| o.name == name && o.package == package)
        .unwrap_or_else(|| panic!("no operation {name} in {package}"))
}

#[test]
fn test_operation_names_and_namespaces() {
    let output = models(operations_doc());
    let mut seen: Vec<(String, String)> = output
        .operations
        .iter()
        .map(|o| (o.name.clone(), o.package.clone()))
        .collect();
    seen.sort();
    assert_eq!(
        seen,
        vec![
            ("PostPets".to_string(), "pets".to_string()),
            ("PostPets".to_string(), "store_front".to_string()),
            ("listPets".to_string(), "pets".to_string()),
            ("showPet".to_string(), "operations".to_string()),
        ]
    );
    let post = operation(&output, "PostPets", "store_front");
    assert_eq!(post.tag.as_deref(), Some("Store Front"));
}

#[test]
fn test_groups_are_sorted() {
    let output = models(operations_doc());
    let names: Vec<&str> = output.groups.iter().map(|g| g.name.as_str()).collect();
    assert_eq!(names, vec!["Store Front", "operations", "pets"]);
    let pets = output.groups.iter().find(|g| g.package == "pets").unwrap();
    assert_eq!(pets.operations, vec!["listPets".to_string(), "PostPets".to_string()]);
}

#[test]
fn test_parameters_merge_and_resolve() {
    let output = models(operations_doc());
    let show = operation(&output, "showPet", "operations");
    assert_eq!(show.parameters.len(), 1);
    let pet_id = &show.parameters[0];
    assert_eq!(pet_id.location, ParameterLocation::Path);
    assert_eq!(pet_id.resolved.swagger_type, "integer");
    assert!(pet_id.required);

    let list = operation(&output, "listPets", "pets");
    assert_eq!(list.parameters[0].name, "limit");
    assert_eq!(list.parameters[0].resolved.semantic(), Some(SemanticType::Int32));

    let post = operation(&output, "PostPets", "pets");
    let body = &post.parameters[0];
    assert_eq!(body.location, ParameterLocation::Body);
    assert_eq!(
        body.resolved.target(),
        Some(&QualifiedName::new("models", "Pet"))
    );
}

#[test]
fn test_responses() {
    let output = models(operations_doc());
    let list = operation(&output, "listPets", "pets");
    assert_eq!(list.responses.len(), 2);
    let ok = &list.responses[0];
    assert_eq!(ok.status, Some(200));
    assert!(ok.is_success);
    assert!(ok.schema.as_ref().unwrap().is_array());
    assert_eq!(ok.headers[0].name, "X-Rate");
    assert_eq!(ok.headers[0].resolved.semantic(), Some(SemanticType::Int64));

    let default = &list.responses[1];
    assert_eq!(default.code, "default");
    assert_eq!(default.status, None);
    assert!(!default.is_success);
    assert_eq!(default.description, "problem");
    assert_eq!(list.success_response().map(|r| r.code.as_str()), Some("200"));
}

#[test]
fn test_authorization_follows_effective_security() {
    let output = models(operations_doc());
    assert!(operation(&output, "listPets", "pets").authorized);
    assert!(!operation(&output, "PostPets", "pets").authorized);
}

#[test]
fn test_tag_filter() {
    let mut opts = GenOpts::default();
    opts.tag_filter.insert("Store Front".to_string());
    let output = models_with(operations_doc(), &opts).unwrap();
    assert_eq!(output.operations.len(), 1);
    assert_eq!(output.operations[0].name, "PostPets");
    assert_eq!(output.operations[0].package, "store_front");
}

#[test]
fn test_operation_filter() {
    let mut opts = GenOpts::default();
    opts.operation_filter.insert("showPet".to_string());
    let output = models_with(operations_doc(), &opts).unwrap();
    assert_eq!(output.operations.len(), 1);

    opts.operation_filter.insert("deletePet".to_string());
    match models_with(operations_doc(), &opts).unwrap_err() {
        GenError::UnknownOperation { names } => assert_eq!(names, vec!["deletePet".to_string()]),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_duplicate_operation_id_falls_back_to_method_and_path() {
    let value = json!({
        "swagger": "2.0",
        "info": {"title": "t", "version": "1"},
        "paths": {
            "/a": {"get": {"operationId": "fetch", "responses": {"200": {"description": "ok"}}}},
            "/b": {"get": {"operationId": "fetch", "responses": {"200": {"description": "ok"}}}}
        }
    });
    let output = models_with(value, &unvalidated()).unwrap();
    let names: Vec<&str> = output.operations.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, vec!["fetch", "GetB"]);
}

#[test]
fn test_definitions_only_skips_operations() {
    let opts = GenOpts {
        accept_definitions_only: true,
        ..GenOpts::default()
    };
    let output = models_with(operations_doc(), &opts).unwrap();
    assert!(output.operations.is_empty());
    assert!(output.groups.is_empty());
    assert_eq!(output.definitions.len(), 1);
}

#[test]
fn test_dump_formats() {
    let output = models(definitions_doc());
    let mut json_out = Vec::new();
    write_dump(&output, DumpFormat::Json, &mut json_out).unwrap();
    let parsed: Value = serde_json::from_slice(&json_out).unwrap();
    assert_eq!(parsed["definitions"][0]["name"], json!("Pet"));
    assert_eq!(parsed["definitions"][0]["type"]["kind"], json!("object"));

    let yaml = dump_to_string(&output, DumpFormat::Yaml).unwrap();
    let parsed: Value = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(parsed["definitions"][2]["name"], json!("Category"));
}

#[derive(Default)]
struct Recorder {
    events: Vec<String>,
}

impl Renderer for Recorder {
    fn render_definition(&mut self, model: &DefinitionModel) -> anyhow::Result<()> {
        self.events.push(format!("definition:{}", model.name));
        Ok(())
    }

    fn render_operation(&mut self, model: &OperationModel) -> anyhow::Result<()> {
        self.events.push(format!("operation:{}", model.name));
        Ok(())
    }
}

#[test]
fn test_render_order() {
    let output = models(operations_doc());
    let mut recorder = Recorder::default();
    render(&output, &mut recorder).unwrap();
    assert_eq!(recorder.events[0], "definition:Pet");
    assert!(recorder.events[1].starts_with("operation:"));
    assert_eq!(recorder.events.len(), 1 + output.operations.len());
}

#[test]
fn test_directory_renderer_writes_per_package() {
    let output = models(operations_doc());
    let dir = tempfile::tempdir().unwrap();
    let mut renderer = DirectoryRenderer::new(dir.path(), DumpFormat::Json);
    render(&output, &mut renderer).unwrap();
    assert!(dir.path().join("models").join("Pet.json").exists());
    assert!(dir.path().join("pets").join("listPets.json").exists());
    assert!(dir.path().join("operations").join("_group.json").exists());
    assert_eq!(
        renderer.written().len(),
        output.definitions.len() + output.operations.len() + output.groups.len()
    );
}
