use crate::typemap::SemanticType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A target type name, optionally qualified by the namespace it lives in
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QualifiedName {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub name: String,
}

impl QualifiedName {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        QualifiedName {
            namespace: Some(namespace.into()),
            name: name.into(),
        }
    }

    /// Name with no namespace, used for embedded external types
    pub fn bare(name: impl Into<String>) -> Self {
        QualifiedName {
            namespace: None,
            name: name.into(),
        }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) if !ns.is_empty() => write!(f, "{ns}.{}", self.name),
            _ => write!(f, "{}", self.name),
        }
    }
}

/// Target of an object-shaped type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum ObjectRef {
    /// A registered definition or an external type
    Named(QualifiedName),
    /// Object declared in place; its properties live on the owning model
    Inline,
}

/// Shape of a resolved type. Exactly one variant applies, so a type can never
/// be both a map and an array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeKind {
    /// Scalar. `None` only for externally declared primitives whose semantics are opaque.
    Primitive {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        semantic: Option<SemanticType>,
    },
    Array {
        element: Box<ResolvedType>,
    },
    /// String-keyed map
    Map {
        value: Box<ResolvedType>,
    },
    /// Fixed-position heterogeneous members. Empty when the arity comes from elsewhere.
    Tuple {
        members: Vec<ResolvedType>,
    },
    Object {
        target: ObjectRef,
    },
    /// Anything goes
    Interface,
}

/// Outcome of resolving one schema.
///
/// Always carries the Swagger type and format it came from, plus the flags a
/// renderer needs to decide how to declare a value of this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedType {
    #[serde(flatten)]
    pub kind: TypeKind,
    pub swagger_type: String,
    pub swagger_format: String,
    pub nullable: bool,
    pub omit_empty: bool,
    pub is_stream: bool,
    /// Namespace to import, for types declared outside the generated code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    /// Name of the externally declared type; `kind` then only describes its shape
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external: Option<QualifiedName>,
}

impl ResolvedType {
    pub fn new(kind: TypeKind, swagger_type: impl Into<String>) -> Self {
        ResolvedType {
            kind,
            swagger_type: swagger_type.into(),
            swagger_format: String::new(),
            nullable: false,
            omit_empty: false,
            is_stream: false,
            package: None,
            external: None,
        }
    }

    pub fn primitive(semantic: SemanticType, swagger_type: impl Into<String>) -> Self {
        let mut resolved = Self::new(
            TypeKind::Primitive {
                semantic: Some(semantic),
            },
            swagger_type,
        );
        resolved.is_stream = semantic.is_stream();
        resolved
    }

    pub fn interface() -> Self {
        Self::new(TypeKind::Interface, "")
    }

    pub fn array_of(element: ResolvedType) -> Self {
        Self::new(
            TypeKind::Array {
                element: Box::new(element),
            },
            "array",
        )
    }

    pub fn map_of(value: ResolvedType) -> Self {
        Self::new(
            TypeKind::Map {
                value: Box::new(value),
            },
            "object",
        )
    }

    pub fn named(target: QualifiedName) -> Self {
        Self::new(
            TypeKind::Object {
                target: ObjectRef::Named(target),
            },
            "object",
        )
    }

    pub fn inline_object() -> Self {
        Self::new(
            TypeKind::Object {
                target: ObjectRef::Inline,
            },
            "object",
        )
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.swagger_format = format.into();
        self
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self.kind, TypeKind::Primitive { .. })
    }

    pub fn is_array(&self) -> bool {
        matches!(self.kind, TypeKind::Array { .. })
    }

    pub fn is_map(&self) -> bool {
        matches!(self.kind, TypeKind::Map { .. })
    }

    pub fn is_tuple(&self) -> bool {
        matches!(self.kind, TypeKind::Tuple { .. })
    }

    pub fn is_interface(&self) -> bool {
        matches!(self.kind, TypeKind::Interface)
    }

    pub fn is_complex_object(&self) -> bool {
        matches!(self.kind, TypeKind::Object { .. })
    }

    pub fn semantic(&self) -> Option<SemanticType> {
        match self.kind {
            TypeKind::Primitive { semantic } => semantic,
            _ => None,
        }
    }

    pub fn is_external(&self) -> bool {
        self.external.is_some()
    }

    /// Name of the referenced definition or external type, if any
    pub fn target(&self) -> Option<&QualifiedName> {
        if let Some(external) = &self.external {
            return Some(external);
        }
        match &self.kind {
            TypeKind::Object {
                target: ObjectRef::Named(name),
            } => Some(name),
            _ => None,
        }
    }

    /// Literal for the zero value of primitive types
    pub fn zero_value(&self) -> Option<&'static str> {
        self.semantic().and_then(|s| s.zero_value())
    }
}

impl fmt::Display for ResolvedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nullable {
            write!(f, "?")?;
        }
        if let Some(external) = &self.external {
            return write!(f, "{external}");
        }
        match &self.kind {
            TypeKind::Primitive {
                semantic: Some(semantic),
            } => write!(f, "{semantic}"),
            TypeKind::Primitive { semantic: None } => write!(f, "primitive"),
            TypeKind::Array { element } => write!(f, "array<{element}>"),
            TypeKind::Map { value } => write!(f, "map<{value}>"),
            TypeKind::Tuple { members } => {
                write!(f, "tuple<")?;
                for (i, m) in members.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{m}")?;
                }
                write!(f, ">")
            }
            TypeKind::Object {
                target: ObjectRef::Named(name),
            } => write!(f, "{name}"),
            TypeKind::Object {
                target: ObjectRef::Inline,
            } => write!(f, "object"),
            TypeKind::Interface => write!(f, "any"),
        }
    }
}
