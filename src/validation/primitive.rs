//! Type checking of JSON values against FHIR type names.
//!
//! Primitive kinds are checked for their JSON representation first and, when
//! format checks are enabled, for their lexical format. Complex types only
//! need to be JSON objects here: their content is validated by descending
//! into the type's own schema.

use crate::catalog::RESOURCE_TYPE;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::fmt;

static ID_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9\-\.]{1,64}$").unwrap());
static CODE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^\s]+( [^\s]+)*$").unwrap());
static OID_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^urn:oid:[0-2](\.(0|[1-9][0-9]*))+$").unwrap());
static UUID_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^urn:uuid:[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$").unwrap()
});
static BASE64_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\s*([0-9a-zA-Z+/=]){4}\s*)+$").unwrap());
static INTEGER64_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(0|[-+]?[1-9][0-9]*)$").unwrap());
static DATE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9]([0-9]([0-9][1-9]|[1-9]0)|[1-9]00)|[1-9]000)(-(0[1-9]|1[0-2])(-(0[1-9]|[1-2][0-9]|3[0-1]))?)?$")
        .unwrap()
});
static DATE_TIME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9]([0-9]([0-9][1-9]|[1-9]0)|[1-9]00)|[1-9]000)(-(0[1-9]|1[0-2])(-(0[1-9]|[1-2][0-9]|3[0-1])(T([01][0-9]|2[0-3]):[0-5][0-9]:([0-5][0-9]|60)(\.[0-9]{1,9})?(Z|(\+|-)((0[0-9]|1[0-3]):[0-5][0-9]|14:00)))?)?)?$")
        .unwrap()
});
static INSTANT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9]([0-9]([0-9][1-9]|[1-9]0)|[1-9]00)|[1-9]000)-(0[1-9]|1[0-2])-(0[1-9]|[1-2][0-9]|3[0-1])T([01][0-9]|2[0-3]):[0-5][0-9]:([0-5][0-9]|60)(\.[0-9]{1,9})?(Z|(\+|-)((0[0-9]|1[0-3]):[0-5][0-9]|14:00))$")
        .unwrap()
});
static TIME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([01][0-9]|2[0-3]):[0-5][0-9]:([0-5][0-9]|60)(\.[0-9]{1,9})?$").unwrap()
});

/// JSON representation class of a value, used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonKind {
    Null,
    Boolean,
    Number,
    String,
    Array,
    Object,
}

impl JsonKind {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => JsonKind::Null,
            Value::Bool(_) => JsonKind::Boolean,
            Value::Number(_) => JsonKind::Number,
            Value::String(_) => JsonKind::String,
            Value::Array(_) => JsonKind::Array,
            Value::Object(_) => JsonKind::Object,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JsonKind::Null => "null",
            JsonKind::Boolean => "boolean",
            JsonKind::Number => "number",
            JsonKind::String => "string",
            JsonKind::Array => "array",
            JsonKind::Object => "object",
        }
    }
}

impl fmt::Display for JsonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// FHIR primitive datatypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Boolean,
    Integer,
    UnsignedInt,
    PositiveInt,
    Integer64,
    Decimal,
    String,
    Markdown,
    Code,
    Id,
    Uri,
    Url,
    Canonical,
    Oid,
    Uuid,
    Base64Binary,
    Date,
    DateTime,
    Instant,
    Time,
    Xhtml,
}

impl PrimitiveKind {
    pub fn from_type_name(type_name: &str) -> Option<Self> {
        let kind = match type_name {
            "boolean" => PrimitiveKind::Boolean,
            "integer" => PrimitiveKind::Integer,
            "unsignedInt" => PrimitiveKind::UnsignedInt,
            "positiveInt" => PrimitiveKind::PositiveInt,
            "integer64" => PrimitiveKind::Integer64,
            "decimal" => PrimitiveKind::Decimal,
            "string" => PrimitiveKind::String,
            "markdown" => PrimitiveKind::Markdown,
            "code" => PrimitiveKind::Code,
            "id" => PrimitiveKind::Id,
            "uri" => PrimitiveKind::Uri,
            "url" => PrimitiveKind::Url,
            "canonical" => PrimitiveKind::Canonical,
            "oid" => PrimitiveKind::Oid,
            "uuid" => PrimitiveKind::Uuid,
            "base64Binary" => PrimitiveKind::Base64Binary,
            "date" => PrimitiveKind::Date,
            "dateTime" => PrimitiveKind::DateTime,
            "instant" => PrimitiveKind::Instant,
            "time" => PrimitiveKind::Time,
            "xhtml" => PrimitiveKind::Xhtml,
            _ => return None,
        };
        Some(kind)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Integer => "integer",
            PrimitiveKind::UnsignedInt => "unsignedInt",
            PrimitiveKind::PositiveInt => "positiveInt",
            PrimitiveKind::Integer64 => "integer64",
            PrimitiveKind::Decimal => "decimal",
            PrimitiveKind::String => "string",
            PrimitiveKind::Markdown => "markdown",
            PrimitiveKind::Code => "code",
            PrimitiveKind::Id => "id",
            PrimitiveKind::Uri => "uri",
            PrimitiveKind::Url => "url",
            PrimitiveKind::Canonical => "canonical",
            PrimitiveKind::Oid => "oid",
            PrimitiveKind::Uuid => "uuid",
            PrimitiveKind::Base64Binary => "base64Binary",
            PrimitiveKind::Date => "date",
            PrimitiveKind::DateTime => "dateTime",
            PrimitiveKind::Instant => "instant",
            PrimitiveKind::Time => "time",
            PrimitiveKind::Xhtml => "xhtml",
        }
    }

    /// JSON kind the primitive is serialized as.
    pub fn json_kind(&self) -> JsonKind {
        match self {
            PrimitiveKind::Boolean => JsonKind::Boolean,
            PrimitiveKind::Integer
            | PrimitiveKind::UnsignedInt
            | PrimitiveKind::PositiveInt
            | PrimitiveKind::Decimal => JsonKind::Number,
            _ => JsonKind::String,
        }
    }

    /// Checks the JSON kind of `value`, then its lexical format when `formats` is set.
    pub fn check(&self, value: &Value, formats: bool) -> Result<(), PrimitiveError> {
        match (self, value) {
            (PrimitiveKind::Boolean, Value::Bool(_)) => Ok(()),
            (PrimitiveKind::Decimal, Value::Number(_)) => Ok(()),
            (PrimitiveKind::Integer, Value::Number(n)) => {
                check_integer(n, i64::from(i32::MIN), "a 32-bit integer")
            }
            (PrimitiveKind::UnsignedInt, Value::Number(n)) => {
                check_integer(n, 0, "a non-negative 32-bit integer")
            }
            (PrimitiveKind::PositiveInt, Value::Number(n)) => {
                check_integer(n, 1, "a positive 32-bit integer")
            }
            (PrimitiveKind::Integer64, Value::Number(n)) => match n.as_i64() {
                Some(_) => Ok(()),
                None => Err(PrimitiveError::Format(format!("{n} is not a 64-bit integer"))),
            },
            (PrimitiveKind::Integer64, Value::String(s)) => {
                if formats && !INTEGER64_REGEX.is_match(s) {
                    return Err(PrimitiveError::Format(format!(
                        "'{s}' is not a valid integer64"
                    )));
                }
                Ok(())
            }
            (kind, Value::String(s)) if kind.json_kind() == JsonKind::String => {
                if s.trim().is_empty() {
                    return Err(PrimitiveError::Format(
                        "empty strings are not allowed".to_string(),
                    ));
                }
                if formats {
                    kind.check_format(s)?;
                }
                Ok(())
            }
            _ => Err(PrimitiveError::WrongKind(JsonKind::of(value))),
        }
    }

    fn check_format(&self, s: &str) -> Result<(), PrimitiveError> {
        let valid = match self {
            PrimitiveKind::Code => CODE_REGEX.is_match(s),
            PrimitiveKind::Id => ID_REGEX.is_match(s),
            PrimitiveKind::Oid => OID_REGEX.is_match(s),
            PrimitiveKind::Uuid => UUID_REGEX.is_match(s),
            PrimitiveKind::Base64Binary => BASE64_REGEX.is_match(s),
            PrimitiveKind::Uri | PrimitiveKind::Canonical => !s.chars().any(char::is_whitespace),
            PrimitiveKind::Url => url::Url::parse(s).is_ok(),
            PrimitiveKind::Date => DATE_REGEX.is_match(s) && is_calendar_date(s),
            PrimitiveKind::DateTime => DATE_TIME_REGEX.is_match(s) && is_calendar_date(s),
            PrimitiveKind::Instant => INSTANT_REGEX.is_match(s) && is_calendar_date(s),
            PrimitiveKind::Time => TIME_REGEX.is_match(s),
            _ => true,
        };
        if valid {
            Ok(())
        } else {
            Err(PrimitiveError::Format(format!(
                "'{s}' is not a valid {}",
                self.type_name()
            )))
        }
    }
}

fn check_integer(n: &serde_json::Number, min: i64, what: &str) -> Result<(), PrimitiveError> {
    match n.as_i64() {
        Some(v) if v >= min && v <= i64::from(i32::MAX) => Ok(()),
        _ => Err(PrimitiveError::Format(format!("{n} is not {what}"))),
    }
}

/// Rejects dates such as `2023-02-30` that match the lexical pattern.
fn is_calendar_date(s: &str) -> bool {
    match s.get(..10) {
        Some(date) if date.len() == 10 && date.as_bytes()[4] == b'-' && date.as_bytes()[7] == b'-' => {
            NaiveDate::parse_from_str(date, "%Y-%m-%d").is_ok()
        }
        _ => true,
    }
}

/// Why a value failed a primitive check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrimitiveError {
    /// The JSON representation is of the wrong kind
    WrongKind(JsonKind),
    /// The representation is right but the content is not
    Format(String),
}

/// Successful outcome of a type check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeMatch<'a> {
    Primitive(PrimitiveKind),
    /// A complex or backbone type whose schema must be walked next
    Complex(&'a str),
    /// A polymorphic `Resource` typed by its own `resourceType`
    Resource,
}

/// Failed type check, carrying the declared types verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeMismatch {
    pub expected: Vec<String>,
    pub found: JsonKind,
    /// Format problem when the JSON kind itself was acceptable
    pub detail: Option<String>,
}

impl TypeMismatch {
    pub fn expected_list(&self) -> String {
        self.expected.join(", ")
    }
}

pub type TypeResult<'a> = Result<TypeMatch<'a>, TypeMismatch>;

/// Matches values against the type names a schema entry declares.
#[derive(Debug, Clone, Copy)]
pub struct TypeChecker {
    check_formats: bool,
}

impl Default for TypeChecker {
    fn default() -> Self {
        Self::new(true)
    }
}

impl TypeChecker {
    pub fn new(check_formats: bool) -> Self {
        Self { check_formats }
    }

    /// Succeeds on the first expected type the value satisfies.
    pub fn check<'a, S: AsRef<str>>(&self, value: &Value, expected_types: &'a [S]) -> TypeResult<'a> {
        let mut detail = None;

        for expected in expected_types {
            let expected = expected.as_ref();
            match PrimitiveKind::from_type_name(expected) {
                Some(kind) => match kind.check(value, self.check_formats) {
                    Ok(()) => return Ok(TypeMatch::Primitive(kind)),
                    Err(PrimitiveError::Format(reason)) => {
                        detail.get_or_insert(reason);
                    }
                    Err(PrimitiveError::WrongKind(_)) => {}
                },
                None if value.is_object() => {
                    return Ok(if expected == RESOURCE_TYPE {
                        TypeMatch::Resource
                    } else {
                        TypeMatch::Complex(expected)
                    });
                }
                None => {}
            }
        }

        Err(TypeMismatch {
            expected: expected_types.iter().map(|t| t.as_ref().to_string()).collect(),
            found: JsonKind::of(value),
            detail,
        })
    }
}
