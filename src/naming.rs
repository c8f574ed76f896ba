//! Identifier helpers shared by the registry, the flattener and the model builders.

use std::collections::HashSet;

/// Split a raw name into words on separators and lower-to-upper case boundaries.
fn split_words(s: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut prev_lower_or_digit = false;
    for c in s.chars() {
        if !c.is_ascii_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower_or_digit = false;
            continue;
        }
        if c.is_ascii_uppercase() && prev_lower_or_digit && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        prev_lower_or_digit = c.is_ascii_lowercase() || c.is_ascii_digit();
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// Convert a `snake_case` name to `CamelCase`
///
/// ```rust,ignore
/// assert_eq!(to_camel_case("user_profile"), "UserProfile");
/// ```
pub fn to_camel_case(s: &str) -> String {
    s.split('_')
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

/// Exported-identifier form of any name: `pet-store` → `PetStore`, `get /pets/{id}` → `GetPetsID`.
///
/// Words keep their inner casing, so `HTTPServer` stays `HTTPServer`. A name that
/// would start with a digit is prefixed with `Nr`.
pub fn pascalize(s: &str) -> String {
    let mut out: String = split_words(s)
        .iter()
        .map(|w| {
            if w.eq_ignore_ascii_case("id") {
                return "ID".to_string();
            }
            to_camel_case(w)
        })
        .collect();
    if out.is_empty() {
        return "Empty".to_string();
    }
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert_str(0, "Nr");
    }
    out
}

/// Lower snake case, used for namespaces derived from tags
pub fn to_snake_case(s: &str) -> String {
    let joined = split_words(s)
        .iter()
        .map(|w| w.to_ascii_lowercase())
        .collect::<Vec<_>>()
        .join("_");
    if joined.is_empty() {
        "_".to_string()
    } else {
        joined
    }
}

/// First free name among `name`, `name_1`, `name_2`, ... Records the winner in `seen`.
pub(crate) fn unique_name(seen: &mut HashSet<String>, name: &str) -> String {
    if !seen.contains(name) {
        seen.insert(name.to_string());
        return name.to_string();
    }
    let mut counter = 1;
    loop {
        let candidate = format!("{name}_{counter}");
        if !seen.contains(&candidate) {
            tracing::warn!(requested = %name, assigned = %candidate, "duplicate name");
            seen.insert(candidate.clone());
            return candidate;
        }
        counter += 1;
    }
}
