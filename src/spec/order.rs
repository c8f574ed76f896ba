//! Property order annotation.
//!
//! Mapping keys lose their order in most target representations, so before
//! anything else touches the document each property gets an `x-order` index
//! matching its declaration position. Existing annotations are replaced.

use serde_json::Value;

pub const X_ORDER: &str = "x-order";

/// Annotate every schema reachable from the document root
pub fn annotate_property_order(root: &mut Value) {
    if let Some(Value::Object(defs)) = root.get_mut("definitions") {
        for schema in defs.values_mut() {
            annotate_schema(schema);
        }
    }
    if let Some(Value::Object(params)) = root.get_mut("parameters") {
        for param in params.values_mut() {
            annotate_parameter(param);
        }
    }
    if let Some(Value::Object(responses)) = root.get_mut("responses") {
        for response in responses.values_mut() {
            annotate_response(response);
        }
    }
    if let Some(Value::Object(paths)) = root.get_mut("paths") {
        for item in paths.values_mut() {
            let Value::Object(item) = item else { continue };
            for (key, entry) in item.iter_mut() {
                if key == "parameters" {
                    annotate_parameter_list(entry);
                    continue;
                }
                if key.starts_with("x-") || !entry.is_object() {
                    continue;
                }
                if let Some(params) = entry.get_mut("parameters") {
                    annotate_parameter_list(params);
                }
                if let Some(Value::Object(responses)) = entry.get_mut("responses") {
                    for response in responses.values_mut() {
                        annotate_response(response);
                    }
                }
            }
        }
    }
}

fn annotate_parameter_list(params: &mut Value) {
    if let Value::Array(list) = params {
        for param in list {
            annotate_parameter(param);
        }
    }
}

fn annotate_parameter(param: &mut Value) {
    if let Some(schema) = param.get_mut("schema") {
        annotate_schema(schema);
    }
}

fn annotate_response(response: &mut Value) {
    if let Some(schema) = response.get_mut("schema") {
        annotate_schema(schema);
    }
}

/// Annotate one schema and everything nested in it
pub fn annotate_schema(schema: &mut Value) {
    let Value::Object(obj) = schema else { return };

    if let Some(Value::Object(props)) = obj.get_mut("properties") {
        for (index, prop) in props.values_mut().enumerate() {
            if let Value::Object(prop_obj) = prop {
                prop_obj.insert(X_ORDER.to_string(), Value::from(index as u64));
            }
            annotate_schema(prop);
        }
    }
    match obj.get_mut("items") {
        Some(Value::Array(list)) => list.iter_mut().for_each(annotate_schema),
        Some(items) => annotate_schema(items),
        None => {}
    }
    if let Some(Value::Array(members)) = obj.get_mut("allOf") {
        members.iter_mut().for_each(annotate_schema);
    }
    if let Some(additional) = obj.get_mut("additionalProperties") {
        annotate_schema(additional);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_annotates_in_declaration_order() {
        let mut doc = json!({
            "definitions": {
                "Pet": {
                    "type": "object",
                    "properties": {
                        "zeta": {"type": "string"},
                        "alpha": {
                            "type": "object",
                            "properties": {"inner": {"type": "integer"}}
                        },
                        "mid": {"type": "array", "items": {
                            "type": "object",
                            "properties": {"b": {"type": "string"}, "a": {"type": "string"}}
                        }}
                    }
                }
            }
        });
        annotate_property_order(&mut doc);
        let props = &doc["definitions"]["Pet"]["properties"];
        assert_eq!(props["zeta"][X_ORDER], 0);
        assert_eq!(props["alpha"][X_ORDER], 1);
        assert_eq!(props["mid"][X_ORDER], 2);
        assert_eq!(props["alpha"]["properties"]["inner"][X_ORDER], 0);
        assert_eq!(props["mid"]["items"]["properties"]["a"][X_ORDER], 1);
    }

    #[test]
    fn test_replaces_existing_annotation() {
        let mut doc = json!({
            "definitions": {
                "A": {"properties": {"x": {"type": "string", "x-order": 7}}}
            }
        });
        annotate_property_order(&mut doc);
        assert_eq!(doc["definitions"]["A"]["properties"]["x"][X_ORDER], 0);
    }

    #[test]
    fn test_annotates_operation_schemas() {
        let mut doc = json!({
            "paths": {
                "/pets": {
                    "x-internal": true,
                    "post": {
                        "parameters": [{
                            "in": "body", "name": "body",
                            "schema": {"properties": {"name": {"type": "string"}}}
                        }],
                        "responses": {"200": {"description": "ok", "schema": {
                            "properties": {"id": {"type": "integer"}, "name": {"type": "string"}}
                        }}}
                    }
                }
            }
        });
        annotate_property_order(&mut doc);
        let op = &doc["paths"]["/pets"]["post"];
        assert_eq!(op["parameters"][0]["schema"]["properties"]["name"][X_ORDER], 0);
        assert_eq!(
            op["responses"]["200"]["schema"]["properties"]["name"][X_ORDER],
            1
        );
    }
}
