//! Schema configuration error types
//!
//! Error codes:
//! - GATE_SCHEMA_DEFAULT_CONFLICT (FATAL)
//! - GATE_SCHEMA_NULL_DEFAULT (FATAL)
//! - GATE_SCHEMA_FLAG_CONFLICT (FATAL)
//! - GATE_SCHEMA_NON_STRING_FLAGS (FATAL)
//! - GATE_SCHEMA_MALFORMED (FATAL)
//!
//! Every code here is fatal: a malformed schema is caught once at
//! registration time, never on the request path, and must not be allowed to
//! process any document.

use std::fmt;

/// Schema configuration error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaConfigCode {
    /// A field is both required and carries a default
    DefaultConflict,
    /// A field declares a null default while forbidding nulls
    NullDefault,
    /// sanitize and denyXSS are mutually exclusive
    FlagConflict,
    /// String-only transform flags set on a non-string field
    NonStringFlags,
    /// Declaration source unreadable or not valid JSON
    MalformedDeclaration,
}

impl SchemaConfigCode {
    /// Returns the string code for this error
    pub fn code(&self) -> &'static str {
        match self {
            SchemaConfigCode::DefaultConflict => "GATE_SCHEMA_DEFAULT_CONFLICT",
            SchemaConfigCode::NullDefault => "GATE_SCHEMA_NULL_DEFAULT",
            SchemaConfigCode::FlagConflict => "GATE_SCHEMA_FLAG_CONFLICT",
            SchemaConfigCode::NonStringFlags => "GATE_SCHEMA_NON_STRING_FLAGS",
            SchemaConfigCode::MalformedDeclaration => "GATE_SCHEMA_MALFORMED",
        }
    }
}

impl fmt::Display for SchemaConfigCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Fatal schema configuration error raised during compilation
#[derive(Debug, Clone)]
pub struct SchemaConfigError {
    /// Error code
    code: SchemaConfigCode,
    /// Human-readable message
    message: String,
    /// Offending field path if applicable
    field: Option<String>,
}

impl SchemaConfigError {
    /// Create a required/default conflict error
    pub fn default_conflict(field: impl Into<String>) -> Self {
        let field = field.into();
        Self {
            message: format!("Field '{}' cannot be required and carry a default", field),
            code: SchemaConfigCode::DefaultConflict,
            field: Some(field),
        }
    }

    /// Create a null-default error
    pub fn null_default(field: impl Into<String>) -> Self {
        let field = field.into();
        Self {
            message: format!("Field '{}' declares notNull but defaults to null", field),
            code: SchemaConfigCode::NullDefault,
            field: Some(field),
        }
    }

    /// Create a sanitize/denyXSS conflict error
    pub fn flag_conflict(field: impl Into<String>) -> Self {
        let field = field.into();
        Self {
            message: format!("Field '{}' cannot set both sanitize and denyXSS", field),
            code: SchemaConfigCode::FlagConflict,
            field: Some(field),
        }
    }

    /// Create a non-string transform-flag error
    pub fn non_string_flags(field: impl Into<String>, type_name: &str) -> Self {
        let field = field.into();
        Self {
            message: format!(
                "Field '{}' sets string transform flags but is declared as {}",
                field, type_name
            ),
            code: SchemaConfigCode::NonStringFlags,
            field: Some(field),
        }
    }

    /// Create an error for a malformed declaration source
    pub fn malformed(source: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            code: SchemaConfigCode::MalformedDeclaration,
            message: format!(
                "Malformed schema declaration '{}': {}",
                source.into(),
                reason.into()
            ),
            field: None,
        }
    }

    /// Returns the error code
    pub fn code(&self) -> SchemaConfigCode {
        self.code
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the offending field path if applicable
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }
}

impl fmt::Display for SchemaConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[FATAL] {}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for SchemaConfigError {}

/// Result type for schema compilation
pub type SchemaResult<T> = Result<T, SchemaConfigError>;
