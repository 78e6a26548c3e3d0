//! Validation error records
//!
//! Runtime, recoverable errors accumulated exhaustively across all fields
//! and documents in a call. The engine never throws on validation failure;
//! it returns these records and leaves surfacing policy to the caller.

use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// The schema property a value violated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Violation {
    /// Required field absent
    #[serde(rename = "required")]
    Required,
    /// Null value on a notNull field
    #[serde(rename = "notNull")]
    NotNull,
    /// Value does not match the declared type
    #[serde(rename = "type")]
    Type,
    /// String value flagged as XSS
    #[serde(rename = "denyXSS")]
    DenyXss,
    /// String/array shorter than the declared minimum
    #[serde(rename = "minLength")]
    MinLength,
    /// String/array longer than the declared maximum
    #[serde(rename = "maxLength")]
    MaxLength,
    /// Custom validator returned false
    #[serde(rename = "validate")]
    Validate,
    /// Field not declared in the schema
    #[serde(rename = "unknown")]
    Unknown,
}

impl Violation {
    /// Returns the property name as reported to callers
    pub fn property(&self) -> &'static str {
        match self {
            Violation::Required => "required",
            Violation::NotNull => "notNull",
            Violation::Type => "type",
            Violation::DenyXss => "denyXSS",
            Violation::MinLength => "minLength",
            Violation::MaxLength => "maxLength",
            Violation::Validate => "validate",
            Violation::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.property())
    }
}

/// One field-level validation failure
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationError {
    /// Dotted field path (element errors carry an `[i]` suffix)
    pub field: String,
    /// Violated property
    pub property: Violation,
    /// The offending value (`null` for absent fields)
    pub value: Value,
    /// Expected type or bound, if applicable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
}

impl ValidationError {
    /// Required field absent
    pub fn required(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            property: Violation::Required,
            value: Value::Null,
            expected: Some("field to be present".into()),
        }
    }

    /// Null value on a notNull field
    pub fn not_null(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            property: Violation::NotNull,
            value: Value::Null,
            expected: Some("non-null value".into()),
        }
    }

    /// Type mismatch
    pub fn type_mismatch(
        field: impl Into<String>,
        expected: impl Into<String>,
        value: Value,
    ) -> Self {
        Self {
            field: field.into(),
            property: Violation::Type,
            value,
            expected: Some(expected.into()),
        }
    }

    /// String flagged as XSS
    pub fn deny_xss(field: impl Into<String>, value: Value) -> Self {
        Self {
            field: field.into(),
            property: Violation::DenyXss,
            value,
            expected: None,
        }
    }

    /// Too short
    pub fn min_length(field: impl Into<String>, min: usize, value: Value) -> Self {
        Self {
            field: field.into(),
            property: Violation::MinLength,
            value,
            expected: Some(format!("length >= {}", min)),
        }
    }

    /// Too long
    pub fn max_length(field: impl Into<String>, max: usize, value: Value) -> Self {
        Self {
            field: field.into(),
            property: Violation::MaxLength,
            value,
            expected: Some(format!("length <= {}", max)),
        }
    }

    /// Custom validator failed
    pub fn custom(field: impl Into<String>, value: Value) -> Self {
        Self {
            field: field.into(),
            property: Violation::Validate,
            value,
            expected: None,
        }
    }

    /// Field not declared in the schema
    pub fn unknown_field(field: impl Into<String>, value: Value) -> Self {
        Self {
            field: field.into(),
            property: Violation::Unknown,
            value,
            expected: Some("a declared schema field".into()),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "field '{}' violates {}", self.field, self.property)?;
        if let Some(expected) = &self.expected {
            write!(f, " (expected {})", expected)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_property_names() {
        assert_eq!(Violation::NotNull.property(), "notNull");
        assert_eq!(Violation::DenyXss.property(), "denyXSS");
        assert_eq!(Violation::MinLength.property(), "minLength");
    }

    #[test]
    fn test_display_includes_field_and_bound() {
        let err = ValidationError::min_length("account.friends[1]", 1, json!(""));
        let display = format!("{}", err);
        assert!(display.contains("account.friends[1]"));
        assert!(display.contains("length >= 1"));
    }

    #[test]
    fn test_serialized_property_strings() {
        let err = ValidationError::deny_xss("bio", json!("<script>"));
        let serialized = serde_json::to_value(&err).unwrap();
        assert_eq!(serialized["property"], json!("denyXSS"));
    }
}
