//! Static lookup tables mapping Swagger `(type, format)` pairs to semantic types.
//!
//! These tables are read-only and built once on first access. They describe
//! target-language-neutral semantics: which semantic type a format denotes, the
//! literal for its zero value, whether values must be converted from strings
//! when they arrive as path/query/header text, and whether a format needs a
//! custom formatter (for example a date or a UUID).

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Semantic type a schema resolves to once its Swagger type and format are known
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SemanticType {
    Bool,
    Char,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float32,
    Float64,
    String,
    /// Raw byte stream (`format: binary`)
    Binary,
    /// Uploaded file (`type: file`)
    File,
    Base64,
    CreditCard,
    Date,
    DateTime,
    Duration,
    Email,
    HexColor,
    Hostname,
    Ipv4,
    Ipv6,
    Isbn,
    Isbn10,
    Isbn13,
    Mac,
    ObjectId,
    Password,
    RgbColor,
    Ssn,
    Uri,
    Uuid,
    Uuid3,
    Uuid4,
    Uuid5,
}

impl SemanticType {
    /// Canonical name of the semantic type
    pub fn as_str(&self) -> &'static str {
        match self {
            SemanticType::Bool => "bool",
            SemanticType::Char => "char",
            SemanticType::Int8 => "int8",
            SemanticType::Int16 => "int16",
            SemanticType::Int32 => "int32",
            SemanticType::Int64 => "int64",
            SemanticType::Uint8 => "uint8",
            SemanticType::Uint16 => "uint16",
            SemanticType::Uint32 => "uint32",
            SemanticType::Uint64 => "uint64",
            SemanticType::Float32 => "float32",
            SemanticType::Float64 => "float64",
            SemanticType::String => "string",
            SemanticType::Binary => "binary",
            SemanticType::File => "file",
            SemanticType::Base64 => "Base64",
            SemanticType::CreditCard => "CreditCard",
            SemanticType::Date => "Date",
            SemanticType::DateTime => "DateTime",
            SemanticType::Duration => "Duration",
            SemanticType::Email => "Email",
            SemanticType::HexColor => "HexColor",
            SemanticType::Hostname => "Hostname",
            SemanticType::Ipv4 => "IPv4",
            SemanticType::Ipv6 => "IPv6",
            SemanticType::Isbn => "ISBN",
            SemanticType::Isbn10 => "ISBN10",
            SemanticType::Isbn13 => "ISBN13",
            SemanticType::Mac => "MAC",
            SemanticType::ObjectId => "ObjectId",
            SemanticType::Password => "Password",
            SemanticType::RgbColor => "RGBColor",
            SemanticType::Ssn => "SSN",
            SemanticType::Uri => "URI",
            SemanticType::Uuid => "UUID",
            SemanticType::Uuid3 => "UUID3",
            SemanticType::Uuid4 => "UUID4",
            SemanticType::Uuid5 => "UUID5",
        }
    }

    /// Values are delivered as a stream rather than buffered in memory
    pub fn is_stream(&self) -> bool {
        matches!(self, SemanticType::Binary | SemanticType::File)
    }

    /// Literal for the zero value, if the type has one
    pub fn zero_value(&self) -> Option<&'static str> {
        ZERO_VALUES.get(self).copied()
    }

    /// Text inputs (path, query, header) need an explicit conversion
    pub fn needs_string_conversion(&self) -> bool {
        STRING_CONVERTERS.contains(self)
    }

    /// The type is a string format that needs its own formatter and validator
    pub fn is_custom_formatter(&self) -> bool {
        !matches!(
            self,
            SemanticType::Bool
                | SemanticType::Char
                | SemanticType::Int8
                | SemanticType::Int16
                | SemanticType::Int32
                | SemanticType::Int64
                | SemanticType::Uint8
                | SemanticType::Uint16
                | SemanticType::Uint32
                | SemanticType::Uint64
                | SemanticType::Float32
                | SemanticType::Float64
                | SemanticType::String
                | SemanticType::File
        )
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Formats recognised regardless of the declared type. Hyphens are stripped
/// before lookup, so `date-time` and `datetime` hit the same entry.
static FORMAT_MAPPING: Lazy<HashMap<&'static str, SemanticType>> = Lazy::new(|| {
    HashMap::from([
        ("byte", SemanticType::Base64),
        ("date", SemanticType::Date),
        ("datetime", SemanticType::DateTime),
        ("uri", SemanticType::Uri),
        ("email", SemanticType::Email),
        ("hostname", SemanticType::Hostname),
        ("ipv4", SemanticType::Ipv4),
        ("ipv6", SemanticType::Ipv6),
        ("mac", SemanticType::Mac),
        ("uuid", SemanticType::Uuid),
        ("uuid3", SemanticType::Uuid3),
        ("uuid4", SemanticType::Uuid4),
        ("uuid5", SemanticType::Uuid5),
        ("isbn", SemanticType::Isbn),
        ("isbn10", SemanticType::Isbn10),
        ("isbn13", SemanticType::Isbn13),
        ("creditcard", SemanticType::CreditCard),
        ("ssn", SemanticType::Ssn),
        ("hexcolor", SemanticType::HexColor),
        ("rgbcolor", SemanticType::RgbColor),
        ("duration", SemanticType::Duration),
        ("password", SemanticType::Password),
        ("bsonobjectid", SemanticType::ObjectId),
        ("objectid", SemanticType::ObjectId),
        ("ObjectId", SemanticType::ObjectId),
        ("binary", SemanticType::Binary),
        ("char", SemanticType::Char),
        ("int", SemanticType::Int64),
        ("int8", SemanticType::Int8),
        ("int16", SemanticType::Int16),
        ("int32", SemanticType::Int32),
        ("int64", SemanticType::Int64),
        ("uint", SemanticType::Uint64),
        ("uint8", SemanticType::Uint8),
        ("uint16", SemanticType::Uint16),
        ("uint32", SemanticType::Uint32),
        ("uint64", SemanticType::Uint64),
        ("float", SemanticType::Float32),
        ("double", SemanticType::Float64),
    ])
});

/// Swagger primitive type names used when the format is absent or unknown
static TYPE_MAPPING: Lazy<HashMap<&'static str, SemanticType>> = Lazy::new(|| {
    HashMap::from([
        ("number", SemanticType::Float64),
        ("integer", SemanticType::Int64),
        ("boolean", SemanticType::Bool),
        ("string", SemanticType::String),
        ("file", SemanticType::File),
    ])
});

static ZERO_VALUES: Lazy<HashMap<SemanticType, &'static str>> = Lazy::new(|| {
    use SemanticType::*;
    let mut zeroes: HashMap<SemanticType, &'static str> = HashMap::from([
        (Bool, "false"),
        (Char, "0"),
        (String, "\"\""),
        (Base64, "null"),
        (HexColor, "\"#000000\""),
        (RgbColor, "\"rgb(0,0,0)\""),
        (Duration, "0"),
        (ObjectId, "null"),
    ]);
    for numeric in [
        Int8, Int16, Int32, Int64, Uint8, Uint16, Uint32, Uint64, Float32, Float64,
    ] {
        zeroes.insert(numeric, "0");
    }
    for text in [
        CreditCard, Date, DateTime, Email, Hostname, Ipv4, Ipv6, Isbn, Isbn10, Isbn13, Mac,
        Password, Ssn, Uri, Uuid, Uuid3, Uuid4, Uuid5,
    ] {
        zeroes.insert(text, "\"\"");
    }
    zeroes
});

static STRING_CONVERTERS: Lazy<HashSet<SemanticType>> = Lazy::new(|| {
    use SemanticType::*;
    HashSet::from([
        Bool, Int8, Int16, Int32, Int64, Uint8, Uint16, Uint32, Uint64, Float32, Float64,
    ])
});

/// Every entry of the format table, in no particular order
pub fn format_entries() -> impl Iterator<Item = (&'static str, SemanticType)> {
    FORMAT_MAPPING.iter().map(|(format, semantic)| (*format, *semantic))
}

/// Every entry of the primitive type table, in no particular order
pub fn type_entries() -> impl Iterator<Item = (&'static str, SemanticType)> {
    TYPE_MAPPING.iter().map(|(name, semantic)| (*name, *semantic))
}

/// Look up a format string. Unknown formats return `None`.
pub fn lookup_format(format: &str) -> Option<SemanticType> {
    if let Some(found) = FORMAT_MAPPING.get(format) {
        return Some(*found);
    }
    let normalized = format.replace('-', "").to_ascii_lowercase();
    FORMAT_MAPPING.get(normalized.as_str()).copied()
}

/// Look up a Swagger primitive type name (`string`, `integer`, ...)
pub fn lookup_type(swagger_type: &str) -> Option<SemanticType> {
    TYPE_MAPPING.get(swagger_type).copied()
}

/// Resolve a `(type, format)` pair. The format wins when it is known; otherwise
/// the primitive type name decides.
pub fn lookup(swagger_type: &str, format: &str) -> Option<SemanticType> {
    if !format.is_empty() {
        if let Some(found) = lookup_format(format) {
            return Some(found);
        }
    }
    lookup_type(swagger_type)
}
