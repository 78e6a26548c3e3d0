//! Field declaration and compiled field schema types
//!
//! A schema is declared as a mapping of dotted field paths to [`FieldDecl`]
//! records. The declarative portion (types, flags, lengths, defaults) is
//! serializable; custom validate/transform slots hold closures and are
//! attachable programmatically only.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, OnceLock};

use regex::Regex;

/// Custom validation function over a field value
pub type ValidateFn = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Custom transform function over a field value
pub type TransformFn = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// Declared value type of a field (for arrays, of its elements)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    /// UTF-8 string
    String,
    /// 64-bit signed integer
    Int,
    /// 64-bit floating point
    Float,
    /// Boolean
    Bool,
    /// Date string or extended-JSON date object
    Date,
    /// Store-native identifier (24 hex chars or extended-JSON id object)
    Id,
}

impl ValueType {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            ValueType::String => "string",
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::Bool => "bool",
            ValueType::Date => "date",
            ValueType::Id => "id",
        }
    }

    /// Whether string transform flags are applicable to this type
    pub fn is_string(&self) -> bool {
        matches!(self, ValueType::String)
    }
}

/// Compiled shape category of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// A single value (scalar, date, identifier, or opaque object)
    Value,
    /// A single-level array of scalar values
    ArrayOfValues,
    /// An array of objects with their own schema'd fields
    ArrayOfObjects,
}

impl FieldKind {
    /// Returns the kind name for error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            FieldKind::Value => "value",
            FieldKind::ArrayOfValues => "array of values",
            FieldKind::ArrayOfObjects => "array of objects",
        }
    }
}

/// Scalar-or-pair length declaration
///
/// A bare number configures the outer (container or scalar) slot; a pair
/// configures outer and per-element slots, with `null` leaving a slot unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LengthDecl {
    /// Single value for the outer slot
    One(usize),
    /// Outer and per-element slots
    Two([Option<usize>; 2]),
}

impl LengthDecl {
    /// Coerce into the two-slot form (missing slot = None)
    pub fn into_slots(self) -> [Option<usize>; 2] {
        match self {
            LengthDecl::One(n) => [Some(n), None],
            LengthDecl::Two(slots) => slots,
        }
    }
}

/// Raw field declaration keyed by dotted path
///
/// The serializable portion mirrors what a declaration file carries; the
/// `validate`/`transform` closure slots are skipped during (de)serialization
/// and attached through the builder methods.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FieldDecl {
    /// Field must be present on insert
    pub required: bool,
    /// Field must not be null when present
    pub not_null: bool,
    /// Value filled in when the field is absent on insert
    pub default: Option<Value>,
    /// Declared value type (for arrays, of the elements)
    #[serde(rename = "type")]
    pub value_type: Option<ValueType>,
    /// Declared as a single-level array of scalar values
    pub array: bool,
    /// Trim surrounding whitespace from string values
    pub trim: bool,
    /// Lowercase string values
    pub lowercase: bool,
    /// Uppercase string values
    pub uppercase: bool,
    /// Sanitize string values through the text primitives
    pub sanitize: bool,
    /// Reject string values the text primitives flag as XSS
    #[serde(rename = "denyXSS")]
    pub deny_xss: bool,
    /// Drop null elements from array values before validation
    pub filter_nulls: bool,
    /// Minimum length (string chars or array elements), scalar or two-slot
    pub min_length: Option<LengthDecl>,
    /// Maximum length (string chars or array elements), scalar or two-slot
    pub max_length: Option<LengthDecl>,
    /// Custom validators: slot 0 = outer/scalar, slot 1 = array element
    #[serde(skip)]
    pub validate: [Option<ValidateFn>; 2],
    /// Custom transforms: slot 0 = outer/scalar, slot 1 = array element
    #[serde(skip)]
    pub transform: [Option<TransformFn>; 2],
}

impl FieldDecl {
    /// Create an empty declaration (optional, untyped value)
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a required string field
    pub fn required_string() -> Self {
        Self {
            required: true,
            value_type: Some(ValueType::String),
            ..Self::default()
        }
    }

    /// Create an optional string field
    pub fn optional_string() -> Self {
        Self {
            value_type: Some(ValueType::String),
            ..Self::default()
        }
    }

    /// Create a required int field
    pub fn required_int() -> Self {
        Self {
            required: true,
            value_type: Some(ValueType::Int),
            ..Self::default()
        }
    }

    /// Create an optional int field
    pub fn optional_int() -> Self {
        Self {
            value_type: Some(ValueType::Int),
            ..Self::default()
        }
    }

    /// Create an optional identifier field
    pub fn optional_id() -> Self {
        Self {
            value_type: Some(ValueType::Id),
            ..Self::default()
        }
    }

    /// Create an optional date field
    pub fn optional_date() -> Self {
        Self {
            value_type: Some(ValueType::Date),
            ..Self::default()
        }
    }

    /// Create a single-level array of the given scalar type
    pub fn array_of(value_type: ValueType) -> Self {
        Self {
            array: true,
            value_type: Some(value_type),
            ..Self::default()
        }
    }

    /// Mark the field required
    pub fn with_required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Forbid null values
    pub fn with_not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// Attach an insert-time default
    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Set the outer/per-element minimum lengths
    pub fn with_min_length(mut self, decl: LengthDecl) -> Self {
        self.min_length = Some(decl);
        self
    }

    /// Set the outer/per-element maximum lengths
    pub fn with_max_length(mut self, decl: LengthDecl) -> Self {
        self.max_length = Some(decl);
        self
    }

    /// Attach an outer/scalar custom validator
    pub fn with_validate<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.validate[0] = Some(Arc::new(f));
        self
    }

    /// Attach a per-element custom validator
    pub fn with_element_validate<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.validate[1] = Some(Arc::new(f));
        self
    }

    /// Attach an outer/scalar custom transform
    pub fn with_transform<F>(mut self, f: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.transform[0] = Some(Arc::new(f));
        self
    }

    /// Attach a per-element custom transform
    pub fn with_element_transform<F>(mut self, f: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.transform[1] = Some(Arc::new(f));
        self
    }

    /// Whether any string-only transform flag is set
    pub fn has_string_flags(&self) -> bool {
        self.trim || self.lowercase || self.uppercase || self.sanitize || self.deny_xss
    }
}

impl fmt::Debug for FieldDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDecl")
            .field("required", &self.required)
            .field("not_null", &self.not_null)
            .field("default", &self.default)
            .field("value_type", &self.value_type)
            .field("array", &self.array)
            .field("validate", &[self.validate[0].is_some(), self.validate[1].is_some()])
            .field(
                "transform",
                &[self.transform[0].is_some(), self.transform[1].is_some()],
            )
            .finish()
    }
}

/// Compiled per-field schema, one per dotted path in a [`SchemaTable`]
///
/// Immutable after compilation; shared read-only by every preprocessor for
/// the collection.
///
/// [`SchemaTable`]: super::SchemaTable
#[derive(Clone)]
pub struct FieldSchema {
    /// Canonical dotted path of the field
    pub path: String,
    /// Field must be present on insert
    pub required: bool,
    /// Field must not be null when present
    pub not_null: bool,
    /// Value filled in when the field is absent on insert
    pub default: Option<Value>,
    /// Compiled shape category
    pub kind: FieldKind,
    /// Declared value type, if any
    pub value_type: Option<ValueType>,
    /// True unless this path is a strict descendant of another schema path
    pub is_root: bool,
    /// Trim surrounding whitespace from string values
    pub trim: bool,
    /// Lowercase string values
    pub lowercase: bool,
    /// Uppercase string values
    pub uppercase: bool,
    /// Sanitize string values through the text primitives
    pub sanitize: bool,
    /// Reject string values flagged as XSS
    pub deny_xss: bool,
    /// Drop null elements from array values before validation
    pub filter_nulls: bool,
    /// Minimum lengths: slot 0 = outer/scalar, slot 1 = element
    pub min_length: [Option<usize>; 2],
    /// Maximum lengths: slot 0 = outer/scalar, slot 1 = element
    pub max_length: [Option<usize>; 2],
    /// Custom validators per slot
    pub validate: [Option<ValidateFn>; 2],
    /// Custom transforms per slot
    pub transform: [Option<TransformFn>; 2],
}

impl FieldSchema {
    /// Whether any string transform flag is set
    pub fn has_string_transforms(&self) -> bool {
        self.trim || self.lowercase || self.uppercase || self.sanitize
    }
}

impl fmt::Debug for FieldSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSchema")
            .field("path", &self.path)
            .field("required", &self.required)
            .field("not_null", &self.not_null)
            .field("default", &self.default)
            .field("kind", &self.kind)
            .field("value_type", &self.value_type)
            .field("is_root", &self.is_root)
            .field("min_length", &self.min_length)
            .field("max_length", &self.max_length)
            .field("validate", &[self.validate[0].is_some(), self.validate[1].is_some()])
            .field(
                "transform",
                &[self.transform[0].is_some(), self.transform[1].is_some()],
            )
            .finish()
    }
}

static OBJECT_ID_RE: OnceLock<Regex> = OnceLock::new();

fn object_id_re() -> &'static Regex {
    OBJECT_ID_RE.get_or_init(|| Regex::new("^[0-9a-fA-F]{24}$").expect("static pattern"))
}

/// Checks whether a value is a store-native identifier: a 24-character hex
/// string or an extended-JSON `{"$oid": "<hex24>"}` object.
pub fn is_object_id(value: &Value) -> bool {
    match value {
        Value::String(s) => object_id_re().is_match(s),
        Value::Object(map) => {
            map.len() == 1
                && map
                    .get("$oid")
                    .and_then(Value::as_str)
                    .map(|s| object_id_re().is_match(s))
                    .unwrap_or(false)
        }
        _ => false,
    }
}
