//! Reference flattening.
//!
//! Rewrites a document so every schema reference points at a uniquely named
//! local definition:
//!
//! - **minimal** imports remote documents as definitions and relocates local
//!   pointers that do not target `#/definitions/<name>`
//! - **full** additionally promotes every inline object (declared properties
//!   or `allOf`) to a standalone definition
//! - **expand** inlines every local reference instead, leaving only circular
//!   ones in place
//!
//! New names that collide with an existing, different definition are
//! disambiguated with [`disambiguate`]. Output is deterministic, and flattening
//! an already flattened document leaves it unchanged.

use super::load::{fetch_document, DocumentLocation, SpecDocument};
use super::pointer;
use crate::error::{GenError, Result};
use crate::naming::pascalize;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

/// Tag inserted between a base name and its occurrence number
pub const DISAMBIGUATION_TAG: &str = "OAIGen";

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum FlattenMode {
    #[default]
    Minimal,
    Full,
    Expand,
}

impl fmt::Display for FlattenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlattenMode::Minimal => write!(f, "minimal"),
            FlattenMode::Full => write!(f, "full"),
            FlattenMode::Expand => write!(f, "expand"),
        }
    }
}

impl FromStr for FlattenMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "minimal" => Ok(FlattenMode::Minimal),
            "full" => Ok(FlattenMode::Full),
            "expand" => Ok(FlattenMode::Expand),
            other => Err(format!(
                "unknown flatten mode {other:?} (expected minimal, full or expand)"
            )),
        }
    }
}

/// Name for the `occurrence`-th claim of `base`: `base`, `baseOAIGen`, `baseOAIGen2`, ...
pub fn disambiguate(base: &str, occurrence: usize) -> String {
    match occurrence {
        0 => base.to_string(),
        1 => format!("{base}{DISAMBIGUATION_TAG}"),
        n => format!("{base}{DISAMBIGUATION_TAG}{n}"),
    }
}

/// A derived definition name that was already taken by a different schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameCollision {
    pub requested: String,
    pub assigned: String,
    /// Pointer or URI of the schema that was renamed
    pub origin: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FlattenReport {
    pub mode: FlattenMode,
    /// Definitions added by flattening, in creation order
    pub created: Vec<String>,
    pub collisions: Vec<NameCollision>,
}

/// Flatten a snapshot, returning the new snapshot and what changed
pub fn flatten(doc: &SpecDocument, mode: FlattenMode) -> Result<(SpecDocument, FlattenReport)> {
    let mut flattener = Flattener::new(doc.location().clone(), doc.value(), mode)?;
    flattener.bundle_remote()?;
    match mode {
        FlattenMode::Minimal => flattener.relocate_pointers()?,
        FlattenMode::Full => {
            flattener.relocate_pointers()?;
            flattener.promote_inline()?;
        }
        FlattenMode::Expand => flattener.expand()?,
    }
    let (value, report) = flattener.finish();
    info!(
        mode = %mode,
        created = report.created.len(),
        collisions = report.collisions.len(),
        "flattened spec"
    );
    Ok((doc.with_value(value)?, report))
}

struct Flattener {
    base: DocumentLocation,
    /// Document without its definitions, which live in `defs` while working
    root: Map<String, Value>,
    defs: Map<String, Value>,
    report: FlattenReport,
    remote_docs: HashMap<String, Value>,
    /// `location#fragment` (remote) or `#fragment` (local) → definition name
    imported: HashMap<String, String>,
}

impl Flattener {
    fn new(base: DocumentLocation, value: &Value, mode: FlattenMode) -> Result<Self> {
        let Value::Object(root) = value else {
            return Err(GenError::Flatten {
                location: base.to_string(),
                reason: "document root is not an object".to_string(),
            });
        };
        let mut root = root.clone();
        let defs = match root.get_mut("definitions") {
            Some(Value::Object(defs)) => std::mem::take(defs),
            _ => Map::new(),
        };
        Ok(Flattener {
            base,
            root,
            defs,
            report: FlattenReport {
                mode,
                ..FlattenReport::default()
            },
            remote_docs: HashMap::new(),
            imported: HashMap::new(),
        })
    }

    fn finish(mut self) -> (Value, FlattenReport) {
        if !self.defs.is_empty() || self.root.contains_key("definitions") {
            self.root
                .insert("definitions".to_string(), Value::Object(self.defs));
        }
        (Value::Object(self.root), self.report)
    }

    fn node(&self, ptr: &str) -> Option<&Value> {
        let (first, tail) = split_first(ptr.strip_prefix('/')?);
        if first == "definitions" {
            let (name, tail) = split_first(tail.strip_prefix('/')?);
            return self.defs.get(&pointer::unescape(name))?.pointer(tail);
        }
        self.root.get(&pointer::unescape(first))?.pointer(tail)
    }

    fn node_mut(&mut self, ptr: &str) -> Option<&mut Value> {
        let (first, tail) = split_first(ptr.strip_prefix('/')?);
        if first == "definitions" {
            let (name, tail) = split_first(tail.strip_prefix('/')?);
            return self
                .defs
                .get_mut(&pointer::unescape(name))?
                .pointer_mut(tail);
        }
        self.root
            .get_mut(&pointer::unescape(first))?
            .pointer_mut(tail)
    }

    fn all_refs(&self) -> Vec<(String, String)> {
        let mut refs = pointer::collect_refs(&Value::Object(self.root.clone()), "");
        for (name, schema) in &self.defs {
            let ptr = pointer::join(&pointer::join("", "definitions"), name);
            refs.extend(pointer::collect_refs(schema, &ptr));
        }
        refs
    }

    /// Point the object at `holder` to `reference`. False when nothing holds it.
    fn set_ref(&mut self, holder: &str, reference: String) -> bool {
        match self.node_mut(holder) {
            Some(Value::Object(obj)) => {
                obj.insert("$ref".to_string(), Value::String(reference));
                true
            }
            _ => false,
        }
    }

    fn take_section(&mut self, section: Section) -> Map<String, Value> {
        match section {
            Section::Definitions => std::mem::take(&mut self.defs),
            other => match self.root.get_mut(other.key()) {
                Some(Value::Object(map)) => std::mem::take(map),
                _ => Map::new(),
            },
        }
    }

    fn put_section(&mut self, section: Section, map: Map<String, Value>) {
        match section {
            Section::Definitions => self.defs = map,
            other => match self.root.get_mut(other.key()) {
                Some(Value::Object(slot)) => *slot = map,
                _ => {
                    self.root.insert(other.key().to_string(), Value::Object(map));
                }
            },
        }
    }

    fn claim_name(&mut self, base: &str, candidate: &Value, origin: &str) -> String {
        self.claim_in(Section::Definitions, base, candidate, origin)
    }

    /// Store `candidate` in `section` under the first free variant of `base`.
    /// A variant that already holds an equal node is reused.
    fn claim_in(
        &mut self,
        section: Section,
        base: &str,
        candidate: &Value,
        origin: &str,
    ) -> String {
        let mut entries = self.take_section(section);
        let mut occurrence = 0;
        let name = loop {
            let name = disambiguate(base, occurrence);
            match entries.get(&name) {
                None => {
                    entries.insert(name.clone(), candidate.clone());
                    if section == Section::Definitions {
                        self.report.created.push(name.clone());
                    }
                    if occurrence > 0 {
                        info!(
                            requested = %base,
                            assigned = %name,
                            origin = %origin,
                            section = section.key(),
                            "name collision"
                        );
                        self.report.collisions.push(NameCollision {
                            requested: base.to_string(),
                            assigned: name.clone(),
                            origin: origin.to_string(),
                        });
                    }
                    break name;
                }
                Some(existing) if existing == candidate => break name,
                Some(_) => occurrence += 1,
            }
        };
        self.put_section(section, entries);
        name
    }

    // ---- minimal: remote bundling --------------------------------------

    fn bundle_remote(&mut self) -> Result<()> {
        for (holder, reference) in self.all_refs() {
            if pointer::is_local(&reference) {
                continue;
            }
            let base = self.base.clone();
            let local = self.import_remote(&base, &reference, &holder)?;
            self.set_ref(&holder, local);
        }
        Ok(())
    }

    fn remote_node(&mut self, location: &DocumentLocation, fragment: &str) -> Result<Option<Value>> {
        let key = location.to_string();
        if !self.remote_docs.contains_key(&key) {
            debug!(location = %location, "loading remote document");
            let document = fetch_document(location)?;
            self.remote_docs.insert(key.clone(), document);
        }
        Ok(self
            .remote_docs
            .get(&key)
            .and_then(|doc| doc.pointer(fragment))
            .cloned())
    }

    /// Import the node a remote reference points at into the section its
    /// fragment names, returning the local reference that replaces it
    fn import_remote(
        &mut self,
        base: &DocumentLocation,
        reference: &str,
        referrer: &str,
    ) -> Result<String> {
        let (doc_part, fragment) = pointer::split_ref(reference);
        let location = base.join(doc_part)?;

        if location == self.base && !fragment.is_empty() {
            // points back into the root document; relocation handles the rest
            return Ok(format!("#{fragment}"));
        }

        let section = Section::of(&fragment);
        let key = format!("{location}#{fragment}");
        if let Some(name) = self.imported.get(&key) {
            return Ok(section.reference(name));
        }

        let broken = || GenError::BrokenReference {
            reference: reference.to_string(),
            referrer: referrer.to_string(),
        };
        let mut target = self.remote_node(&location, &fragment)?.ok_or_else(broken)?;

        let base_name = pointer::tokens(&fragment)
            .pop()
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| location.stem());
        let base_name = if base_name.is_empty() {
            "Remote".to_string()
        } else {
            base_name
        };
        let name = self.claim_in(section, &base_name, &target, &key);
        self.imported.insert(key.clone(), name.clone());

        for (holder, nested) in pointer::collect_refs(&target, "") {
            let nested_local = self.import_remote(&location, &nested, &key)?;
            if let Some(Value::Object(obj)) = target.pointer_mut(&holder) {
                obj.insert("$ref".to_string(), Value::String(nested_local));
            }
        }
        let mut entries = self.take_section(section);
        entries.insert(name.clone(), target);
        self.put_section(section, entries);
        Ok(section.reference(&name))
    }

    // ---- minimal: pointer relocation -----------------------------------

    fn relocate_pointers(&mut self) -> Result<()> {
        loop {
            let mut changed = false;
            for (holder, reference) in self.all_refs() {
                if !needs_relocation(&reference) {
                    continue;
                }
                let (_, fragment) = pointer::split_ref(&reference);
                let key = format!("#{fragment}");
                let name = match self.imported.get(&key) {
                    Some(name) => name.clone(),
                    None => {
                        let target = self.node(&fragment).cloned().ok_or_else(|| {
                            GenError::BrokenReference {
                                reference: reference.clone(),
                                referrer: holder.clone(),
                            }
                        })?;
                        let name = self.claim_name(&name_from_pointer(&fragment), &target, &key);
                        self.imported.insert(key, name.clone());
                        name
                    }
                };
                if self.set_ref(&holder, pointer::definition_ref(&name)) {
                    changed = true;
                } else {
                    debug!(holder = %holder, reference = %reference, "reference holder vanished");
                }
            }
            if !changed {
                return Ok(());
            }
        }
    }

    // ---- full: inline promotion ----------------------------------------

    fn promote_inline(&mut self) -> Result<()> {
        for (ptr, base) in self.operation_schema_slots() {
            let Some(mut schema) = self.node(&ptr).cloned() else {
                continue;
            };
            if self.promote_slot(&mut schema, &base, &ptr) {
                if let Some(slot) = self.node_mut(&ptr) {
                    *slot = schema;
                }
            }
        }

        let mut processed: HashSet<String> = HashSet::new();
        loop {
            let pending: Vec<String> = self
                .defs
                .keys()
                .filter(|name| !processed.contains(*name))
                .cloned()
                .collect();
            if pending.is_empty() {
                return Ok(());
            }
            for name in pending {
                processed.insert(name.clone());
                let Some(mut schema) = self.defs.get(&name).cloned() else {
                    continue;
                };
                let ptr = pointer::join(&pointer::join("", "definitions"), &name);
                if self.promote_children(&mut schema, &name, &ptr) {
                    self.defs.insert(name, schema);
                }
            }
        }
    }

    /// Body parameter and response schemas, with the base name their
    /// promoted definitions derive from
    fn operation_schema_slots(&self) -> Vec<(String, String)> {
        let mut slots = Vec::new();
        if let Some(Value::Object(params)) = self.root.get("parameters") {
            for (name, param) in params {
                if param.get("schema").is_some() {
                    let ptr = pointer::join(&pointer::join("", "parameters"), name);
                    slots.push((pointer::join(&ptr, "schema"), format!("{name} body")));
                }
            }
        }
        if let Some(Value::Object(responses)) = self.root.get("responses") {
            for (name, response) in responses {
                if response.get("schema").is_some() {
                    let ptr = pointer::join(&pointer::join("", "responses"), name);
                    slots.push((pointer::join(&ptr, "schema"), format!("{name} body")));
                }
            }
        }
        let Some(Value::Object(paths)) = self.root.get("paths") else {
            return slots;
        };
        for (path, item) in paths {
            let Value::Object(item) = item else { continue };
            let path_ptr = pointer::join(&pointer::join("", "paths"), path);
            if let Some(Value::Array(params)) = item.get("parameters") {
                for (i, param) in params.iter().enumerate() {
                    if param.get("schema").is_some() {
                        let ptr = pointer::join(&pointer::join(&path_ptr, "parameters"), &i.to_string());
                        slots.push((pointer::join(&ptr, "schema"), format!("{path} body")));
                    }
                }
            }
            for (method, op) in item {
                if !is_method(method) {
                    continue;
                }
                let op_name = op
                    .get("operationId")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("{method} {path}"));
                let op_ptr = pointer::join(&path_ptr, method);
                if let Some(Value::Array(params)) = op.get("parameters") {
                    for (i, param) in params.iter().enumerate() {
                        if param.get("schema").is_some() {
                            let ptr = pointer::join(&pointer::join(&op_ptr, "parameters"), &i.to_string());
                            slots.push((pointer::join(&ptr, "schema"), format!("{op_name} body")));
                        }
                    }
                }
                if let Some(Value::Object(responses)) = op.get("responses") {
                    for (status, response) in responses {
                        if response.get("schema").is_some() {
                            let ptr = pointer::join(&pointer::join(&op_ptr, "responses"), status);
                            slots.push((
                                pointer::join(&ptr, "schema"),
                                format!("{op_name} {status} body"),
                            ));
                        }
                    }
                }
            }
        }
        slots
    }

    /// Promote `slot` itself when it is an inline object, else look inside it
    fn promote_slot(&mut self, slot: &mut Value, base: &str, ptr: &str) -> bool {
        if is_inline_object(slot) {
            let name = self.claim_name(&pascalize(base), slot, ptr);
            *slot = ref_to(&name);
            return true;
        }
        self.promote_children(slot, base, ptr)
    }

    fn promote_children(&mut self, schema: &mut Value, parent: &str, ptr: &str) -> bool {
        let Value::Object(obj) = schema else {
            return false;
        };
        if obj.contains_key("$ref") {
            return false;
        }
        let mut changed = false;

        if let Some(Value::Object(props)) = obj.get_mut("properties") {
            let props_ptr = pointer::join(ptr, "properties");
            for (name, prop) in props.iter_mut() {
                changed |= self.promote_slot(
                    prop,
                    &format!("{parent} {name}"),
                    &pointer::join(&props_ptr, name),
                );
            }
        }
        match obj.get_mut("items") {
            Some(Value::Array(list)) => {
                for (i, item) in list.iter_mut().enumerate() {
                    let item_ptr = pointer::join(&pointer::join(ptr, "items"), &i.to_string());
                    changed |= self.promote_slot(item, &format!("{parent} items {i}"), &item_ptr);
                }
            }
            Some(item) => {
                changed |= self.promote_slot(
                    item,
                    &format!("{parent} items"),
                    &pointer::join(ptr, "items"),
                );
            }
            None => {}
        }
        if let Some(additional @ Value::Object(_)) = obj.get_mut("additionalProperties") {
            changed |= self.promote_slot(
                additional,
                &format!("{parent} additionalProperties"),
                &pointer::join(ptr, "additionalProperties"),
            );
        }
        if let Some(Value::Array(members)) = obj.get_mut("allOf") {
            for (i, member) in members.iter_mut().enumerate() {
                let member_ptr = pointer::join(&pointer::join(ptr, "allOf"), &i.to_string());
                changed |= self.promote_slot(member, &format!("{parent} allOf {i}"), &member_ptr);
            }
        }
        changed
    }

    // ---- expand ----------------------------------------------------------

    fn expand(&mut self) -> Result<()> {
        let mut source = self.root.clone();
        source.insert("definitions".to_string(), Value::Object(self.defs.clone()));
        let source = Value::Object(source);

        let mut root = Value::Object(std::mem::take(&mut self.root));
        expand_node(&source, &mut root, &mut Vec::new(), false)?;
        if let Value::Object(root) = root {
            self.root = root;
        }

        for (name, schema) in self.defs.iter_mut() {
            let own = format!("/definitions/{}", pointer::escape(name));
            expand_node(&source, schema, &mut vec![own], false)?;
        }
        Ok(())
    }
}

fn expand_node(
    source: &Value,
    node: &mut Value,
    stack: &mut Vec<String>,
    in_name_map: bool,
) -> Result<()> {
    match node {
        Value::Object(map) => {
            let reference = if in_name_map {
                None
            } else {
                map.get("$ref").and_then(Value::as_str).map(str::to_string)
            };
            if let Some(reference) = reference.filter(|r| pointer::is_local(r)) {
                let (_, fragment) = pointer::split_ref(&reference);
                if stack.contains(&fragment) {
                    return Ok(());
                }
                let mut target = source.pointer(&fragment).cloned().ok_or_else(|| {
                    GenError::BrokenReference {
                        reference: reference.clone(),
                        referrer: stack.last().cloned().unwrap_or_default(),
                    }
                })?;
                stack.push(fragment);
                expand_node(source, &mut target, stack, false)?;
                stack.pop();
                *node = target;
                return Ok(());
            }
            for (key, child) in map.iter_mut() {
                if pointer::is_structural_key(key, in_name_map) {
                    expand_node(source, child, stack, pointer::is_name_map(key, in_name_map))?;
                }
            }
        }
        Value::Array(list) => {
            for child in list.iter_mut() {
                expand_node(source, child, stack, false)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Top-level section a bundled remote node lands in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Definitions,
    Parameters,
    Responses,
}

impl Section {
    /// Whole parameters and responses keep their kind; everything else is a schema
    fn of(fragment: &str) -> Self {
        let tokens = pointer::tokens(fragment);
        match tokens.first().map(String::as_str) {
            Some("parameters") if tokens.len() == 2 => Section::Parameters,
            Some("responses") if tokens.len() == 2 => Section::Responses,
            _ => Section::Definitions,
        }
    }

    fn key(self) -> &'static str {
        match self {
            Section::Definitions => "definitions",
            Section::Parameters => "parameters",
            Section::Responses => "responses",
        }
    }

    fn reference(self, name: &str) -> String {
        format!("#/{}/{}", self.key(), pointer::escape(name))
    }
}

fn split_first(ptr: &str) -> (&str, &str) {
    match ptr.find('/') {
        Some(i) => (&ptr[..i], &ptr[i..]),
        None => (ptr, ""),
    }
}

fn ref_to(name: &str) -> Value {
    let mut obj = Map::new();
    obj.insert(
        "$ref".to_string(),
        Value::String(pointer::definition_ref(name)),
    );
    Value::Object(obj)
}

fn is_method(key: &str) -> bool {
    matches!(
        key,
        "get" | "put" | "post" | "delete" | "options" | "head" | "patch"
    )
}

/// Local schema references that do not already name a definition. Parameter
/// and response references are left alone.
fn needs_relocation(reference: &str) -> bool {
    if !pointer::is_local(reference) || pointer::definition_name(reference).is_some() {
        return false;
    }
    let (_, fragment) = pointer::split_ref(reference);
    let tokens = pointer::tokens(&fragment);
    let whole_component =
        tokens.len() == 2 && matches!(tokens[0].as_str(), "parameters" | "responses");
    !whole_component && !tokens.is_empty()
}

/// Object schema declared in place
fn is_inline_object(schema: &Value) -> bool {
    let Value::Object(obj) = schema else {
        return false;
    };
    if obj.contains_key("$ref") {
        return false;
    }
    let has_props = obj
        .get("properties")
        .and_then(Value::as_object)
        .map(|p| !p.is_empty())
        .unwrap_or(false);
    let has_all_of = obj
        .get("allOf")
        .and_then(Value::as_array)
        .map(|a| !a.is_empty())
        .unwrap_or(false);
    has_props || has_all_of
}

/// Definition name derived from the meaningful tokens of a pointer
fn name_from_pointer(ptr: &str) -> String {
    const STRUCTURAL: [&str; 6] = [
        "definitions",
        "properties",
        "schema",
        "paths",
        "responses",
        "parameters",
    ];
    let words: Vec<String> = pointer::tokens(ptr)
        .into_iter()
        .filter(|t| !STRUCTURAL.contains(&t.as_str()))
        .collect();
    pascalize(&words.join(" "))
}
