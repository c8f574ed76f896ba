//! JSON pointer and `$ref` helpers.

use serde_json::Value;

/// Keys whose values are instance data, never schemas
const DATA_KEYS: [&str; 4] = ["default", "example", "examples", "enum"];

/// Keys whose values map arbitrary names to nodes
const NAME_MAPS: [&str; 7] = [
    "properties",
    "definitions",
    "parameters",
    "responses",
    "paths",
    "headers",
    "securityDefinitions",
];

/// Escape one reference token (`~` → `~0`, `/` → `~1`)
pub fn escape(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

pub fn unescape(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}

/// Append a token to a pointer
pub fn join(pointer: &str, token: &str) -> String {
    format!("{pointer}/{}", escape(token))
}

/// Unescaped tokens of a pointer. The empty pointer has no tokens.
pub fn tokens(pointer: &str) -> Vec<String> {
    if pointer.is_empty() {
        return Vec::new();
    }
    pointer
        .trim_start_matches('/')
        .split('/')
        .map(unescape)
        .collect()
}

/// Split a reference into its document part and its fragment pointer.
///
/// `other.yaml#/definitions/Pet` → `("other.yaml", "/definitions/Pet")`;
/// `#/definitions/Pet` → `("", "/definitions/Pet")`. Fragments are percent-decoded.
pub fn split_ref(reference: &str) -> (&str, String) {
    match reference.split_once('#') {
        Some((doc, fragment)) => {
            let decoded = urlencoding::decode(fragment)
                .map(|c| c.into_owned())
                .unwrap_or_else(|_| fragment.to_string());
            (doc, decoded)
        }
        None => (reference, String::new()),
    }
}

/// A reference that points inside the current document
pub fn is_local(reference: &str) -> bool {
    reference.starts_with('#')
}

/// Definition name of a `#/definitions/<name>` reference
pub fn definition_name(reference: &str) -> Option<String> {
    let (doc, fragment) = split_ref(reference);
    if !doc.is_empty() {
        return None;
    }
    let rest = fragment.strip_prefix("/definitions/")?;
    if rest.is_empty() || rest.contains('/') {
        return None;
    }
    Some(unescape(rest))
}

/// Local reference to a named definition
pub fn definition_ref(name: &str) -> String {
    format!("#/definitions/{}", escape(name))
}

/// Whether a child key can hold schemas. Inside a name map every key is a name.
pub fn is_structural_key(key: &str, in_name_map: bool) -> bool {
    in_name_map || !(key.starts_with("x-") || DATA_KEYS.contains(&key))
}

pub fn is_name_map(key: &str, in_name_map: bool) -> bool {
    !in_name_map && NAME_MAPS.contains(&key)
}

/// Every `$ref` below `node`, as `(pointer of the holding object, reference)`,
/// in document order. `base` is the pointer of `node` itself.
pub fn collect_refs(node: &Value, base: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    walk_refs(node, base, false, &mut out);
    out
}

fn walk_refs(node: &Value, ptr: &str, in_name_map: bool, out: &mut Vec<(String, String)>) {
    match node {
        Value::Object(map) => {
            if !in_name_map {
                if let Some(Value::String(reference)) = map.get("$ref") {
                    out.push((ptr.to_string(), reference.clone()));
                }
            }
            for (key, child) in map {
                if !in_name_map && key == "$ref" {
                    continue;
                }
                if is_structural_key(key, in_name_map) {
                    walk_refs(child, &join(ptr, key), is_name_map(key, in_name_map), out);
                }
            }
        }
        Value::Array(list) => {
            for (i, child) in list.iter().enumerate() {
                walk_refs(child, &join(ptr, &i.to_string()), false, out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definition_name() {
        assert_eq!(definition_name("#/definitions/Pet"), Some("Pet".to_string()));
        assert_eq!(definition_name("#/definitions/a~1b"), Some("a/b".to_string()));
        assert_eq!(
            definition_name("#/definitions/My%20Pet"),
            Some("My Pet".to_string())
        );
        assert_eq!(definition_name("#/definitions/Pet/properties/id"), None);
        assert_eq!(definition_name("other.json#/definitions/Pet"), None);
        assert_eq!(definition_name("#/parameters/limit"), None);
    }

    #[test]
    fn test_collect_refs_skips_data_but_not_property_names() {
        let doc = serde_json::json!({
            "definitions": {
                "A": {
                    "properties": {
                        "default": {"$ref": "#/definitions/B"},
                        "x-meta": {"$ref": "#/definitions/C"}
                    },
                    "default": {"$ref": "not-a-ref"},
                    "x-vendor": {"$ref": "ignored"}
                }
            }
        });
        let refs = collect_refs(&doc, "");
        assert_eq!(
            refs,
            vec![
                (
                    "/definitions/A/properties/default".to_string(),
                    "#/definitions/B".to_string()
                ),
                (
                    "/definitions/A/properties/x-meta".to_string(),
                    "#/definitions/C".to_string()
                ),
            ]
        );
    }

    #[test]
    fn test_tokens_roundtrip() {
        let p = join(&join("", "paths"), "/pets/{id}");
        assert_eq!(p, "/paths/~1pets~1{id}");
        assert_eq!(tokens(&p), vec!["paths".to_string(), "/pets/{id}".to_string()]);
        assert!(tokens("").is_empty());
    }
}
