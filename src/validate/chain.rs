//! Validator chain
//!
//! A fixed-order, short-circuiting pipeline per field:
//! `required -> notNull -> type -> denyXSS -> minLength -> maxLength ->
//! customValidate`. The first failing stage halts the chain for that field;
//! errors across different fields accumulate at the caller.
//!
//! Array-of-values fields run the chain twice: once over the whole array
//! with slot-0 config, once per element with slot-1 config. Element type
//! checking is folded into the outer array type check. Array-of-objects
//! fields run only the outer checks here; element validation happens through
//! subdocument recursion.

use serde_json::Value;

use crate::schema::{is_object_id, FieldKind, FieldSchema, ValueType};

use super::errors::ValidationError;
use super::primitives::TextPrimitives;

/// Per-field validator pipeline
pub struct ValidatorChain<'a> {
    field: &'a FieldSchema,
    primitives: &'a dyn TextPrimitives,
}

impl<'a> ValidatorChain<'a> {
    /// Creates a chain over one field schema.
    pub fn new(field: &'a FieldSchema, primitives: &'a dyn TextPrimitives) -> Self {
        Self { field, primitives }
    }

    /// Runs the chain appropriate to the field's kind.
    ///
    /// `value` is `None` when the field is absent from the payload. Element
    /// errors are reported with an `[i]` suffix on the field name.
    pub fn run(&self, field_name: &str, value: Option<&Value>) -> Vec<ValidationError> {
        match self.field.kind {
            FieldKind::Value => self.run_scalar(field_name, value).into_iter().collect(),
            FieldKind::ArrayOfValues => {
                if let Some(err) = self.run_outer(field_name, value) {
                    return vec![err];
                }
                let Some(Value::Array(items)) = value else {
                    return Vec::new();
                };
                let mut errors = Vec::new();
                for (i, item) in items.iter().enumerate() {
                    let elem_name = format!("{}[{}]", field_name, i);
                    if let Some(err) = self.run_element(&elem_name, item) {
                        errors.push(err);
                    }
                }
                errors
            }
            FieldKind::ArrayOfObjects => {
                self.run_outer(field_name, value).into_iter().collect()
            }
        }
    }

    /// Scalar chain with slot-0 config.
    fn run_scalar(&self, field_name: &str, value: Option<&Value>) -> Option<ValidationError> {
        let value = match self.check_presence(field_name, value) {
            Presence::Missing(err) => return err,
            Presence::Null(err) => return err,
            Presence::Present(v) => v,
        };

        if let Some(vt) = self.field.value_type {
            if !check_type(value, vt, self.primitives) {
                return Some(ValidationError::type_mismatch(
                    field_name,
                    vt.type_name(),
                    value.clone(),
                ));
            }
        }
        if let Some(err) = self.check_xss(field_name, value) {
            return Some(err);
        }
        if let Some(err) = self.check_lengths(field_name, value, 0) {
            return Some(err);
        }
        self.check_custom(field_name, value, 0)
    }

    /// Whole-array chain with slot-0 config; element types folded in.
    fn run_outer(&self, field_name: &str, value: Option<&Value>) -> Option<ValidationError> {
        let value = match self.check_presence(field_name, value) {
            Presence::Missing(err) => return err,
            Presence::Null(err) => return err,
            Presence::Present(v) => v,
        };

        let Value::Array(items) = value else {
            return Some(ValidationError::type_mismatch(
                field_name,
                "array",
                value.clone(),
            ));
        };
        if self.field.kind == FieldKind::ArrayOfValues {
            if let Some(vt) = self.field.value_type {
                for item in items {
                    if item.is_null() {
                        continue; // nulls are the notNull stage's concern
                    }
                    if !check_type(item, vt, self.primitives) {
                        return Some(ValidationError::type_mismatch(
                            field_name,
                            format!("array of {}", vt.type_name()),
                            item.clone(),
                        ));
                    }
                }
            }
        }
        if let Some(err) = self.check_array_lengths(field_name, items, 0) {
            return Some(err);
        }
        self.check_custom(field_name, value, 0)
    }

    /// Per-element chain with slot-1 config.
    pub fn run_element(&self, field_name: &str, value: &Value) -> Option<ValidationError> {
        if value.is_null() {
            if self.field.not_null {
                return Some(ValidationError::not_null(field_name));
            }
            return None;
        }
        if let Some(err) = self.check_xss(field_name, value) {
            return Some(err);
        }
        if let Some(err) = self.check_lengths(field_name, value, 1) {
            return Some(err);
        }
        self.check_custom(field_name, value, 1)
    }

    /// Element chain for `$push`/`$addToSet` values, where no outer array
    /// pass runs: the element type check happens here instead.
    pub fn run_pushed_element(&self, field_name: &str, value: &Value) -> Option<ValidationError> {
        if !value.is_null() {
            if let Some(vt) = self.field.value_type {
                if !check_type(value, vt, self.primitives) {
                    return Some(ValidationError::type_mismatch(
                        field_name,
                        vt.type_name(),
                        value.clone(),
                    ));
                }
            }
        }
        self.run_element(field_name, value)
    }

    fn check_presence<'v>(
        &self,
        field_name: &str,
        value: Option<&'v Value>,
    ) -> Presence<'v> {
        match value {
            None => Presence::Missing(if self.field.required {
                Some(ValidationError::required(field_name))
            } else {
                None
            }),
            Some(Value::Null) => Presence::Null(if self.field.not_null {
                Some(ValidationError::not_null(field_name))
            } else {
                None
            }),
            Some(v) => Presence::Present(v),
        }
    }

    fn check_xss(&self, field_name: &str, value: &Value) -> Option<ValidationError> {
        if !self.field.deny_xss {
            return None;
        }
        match value.as_str() {
            Some(s) if self.primitives.contains_xss(s) => {
                Some(ValidationError::deny_xss(field_name, value.clone()))
            }
            _ => None,
        }
    }

    fn check_lengths(
        &self,
        field_name: &str,
        value: &Value,
        slot: usize,
    ) -> Option<ValidationError> {
        let len = match value {
            Value::String(s) => s.chars().count(),
            Value::Array(a) => a.len(),
            _ => return None,
        };
        if let Some(min) = self.field.min_length[slot] {
            if len < min {
                return Some(ValidationError::min_length(field_name, min, value.clone()));
            }
        }
        if let Some(max) = self.field.max_length[slot] {
            if len > max {
                return Some(ValidationError::max_length(field_name, max, value.clone()));
            }
        }
        None
    }

    fn check_array_lengths(
        &self,
        field_name: &str,
        items: &[Value],
        slot: usize,
    ) -> Option<ValidationError> {
        if let Some(min) = self.field.min_length[slot] {
            if items.len() < min {
                return Some(ValidationError::min_length(
                    field_name,
                    min,
                    Value::Array(items.to_vec()),
                ));
            }
        }
        if let Some(max) = self.field.max_length[slot] {
            if items.len() > max {
                return Some(ValidationError::max_length(
                    field_name,
                    max,
                    Value::Array(items.to_vec()),
                ));
            }
        }
        None
    }

    fn check_custom(
        &self,
        field_name: &str,
        value: &Value,
        slot: usize,
    ) -> Option<ValidationError> {
        match &self.field.validate[slot] {
            Some(f) if !f(value) => Some(ValidationError::custom(field_name, value.clone())),
            _ => None,
        }
    }
}

enum Presence<'v> {
    Missing(Option<ValidationError>),
    Null(Option<ValidationError>),
    Present(&'v Value),
}

/// Checks a scalar value against a declared type.
pub fn check_type(value: &Value, vt: ValueType, primitives: &dyn TextPrimitives) -> bool {
    match vt {
        ValueType::String => value.is_string(),
        ValueType::Int => value.is_i64() || value.is_u64(),
        ValueType::Float => value.is_number(),
        ValueType::Bool => value.is_boolean(),
        ValueType::Date => match value {
            Value::String(s) => primitives.is_date(s),
            Value::Object(map) => map.len() == 1 && map.contains_key("$date"),
            _ => false,
        },
        ValueType::Id => is_object_id(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDecl, LengthDecl, SchemaCompiler, SchemaTable};
    use crate::validate::errors::Violation;
    use crate::validate::primitives::DefaultPrimitives;
    use serde_json::json;

    fn table_with(path: &str, decl: FieldDecl) -> SchemaTable {
        SchemaCompiler::compile(vec![(path.to_string(), decl)]).unwrap()
    }

    fn run_one(table: &SchemaTable, path: &str, value: Option<Value>) -> Vec<ValidationError> {
        let primitives = DefaultPrimitives;
        let field = table.get(path).unwrap();
        ValidatorChain::new(field, &primitives).run(path, value.as_ref())
    }

    #[test]
    fn test_required_missing() {
        let table = table_with("name", FieldDecl::required_string());
        let errors = run_one(&table, "name", None);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].property, Violation::Required);
    }

    #[test]
    fn test_optional_missing_passes() {
        let table = table_with("name", FieldDecl::optional_string());
        assert!(run_one(&table, "name", None).is_empty());
    }

    #[test]
    fn test_not_null_halts_before_type() {
        let table = table_with("name", FieldDecl::optional_string().with_not_null());
        let errors = run_one(&table, "name", Some(Value::Null));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].property, Violation::NotNull);
    }

    #[test]
    fn test_nullable_null_short_circuits_silently() {
        let table = table_with("name", FieldDecl::optional_string());
        assert!(run_one(&table, "name", Some(Value::Null)).is_empty());
    }

    #[test]
    fn test_type_mismatch() {
        let table = table_with("age", FieldDecl::optional_int());
        let errors = run_one(&table, "age", Some(json!("thirty")));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].property, Violation::Type);
        assert_eq!(errors[0].expected.as_deref(), Some("int"));
    }

    #[test]
    fn test_deny_xss() {
        let mut decl = FieldDecl::optional_string();
        decl.deny_xss = true;
        let table = table_with("bio", decl);

        let errors = run_one(&table, "bio", Some(json!("<script>x</script>")));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].property, Violation::DenyXss);

        assert!(run_one(&table, "bio", Some(json!("plain text"))).is_empty());
    }

    #[test]
    fn test_string_min_length() {
        let table = table_with(
            "name",
            FieldDecl::optional_string().with_min_length(LengthDecl::One(2)),
        );
        let errors = run_one(&table, "name", Some(json!("a")));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].property, Violation::MinLength);
    }

    #[test]
    fn test_custom_validate() {
        let table = table_with(
            "age",
            FieldDecl::optional_int().with_validate(|v| v.as_i64().unwrap_or(0) >= 18),
        );
        let errors = run_one(&table, "age", Some(json!(12)));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].property, Violation::Validate);
        assert!(run_one(&table, "age", Some(json!(30))).is_empty());
    }

    #[test]
    fn test_array_outer_type_folds_elements() {
        let table = table_with("tags", FieldDecl::array_of(ValueType::String));

        let errors = run_one(&table, "tags", Some(json!(["a", 2])));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].property, Violation::Type);
        assert_eq!(errors[0].expected.as_deref(), Some("array of string"));

        let errors = run_one(&table, "tags", Some(json!("not-an-array")));
        assert_eq!(errors[0].expected.as_deref(), Some("array"));
    }

    #[test]
    fn test_array_element_min_length_accumulates() {
        let table = table_with(
            "friends",
            FieldDecl::array_of(ValueType::String)
                .with_min_length(LengthDecl::Two([Some(0), Some(1)])),
        );

        let errors = run_one(&table, "friends", Some(json!(["a", "", ""])));
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].field, "friends[1]");
        assert_eq!(errors[1].field, "friends[2]");
        assert!(errors.iter().all(|e| e.property == Violation::MinLength));
    }

    #[test]
    fn test_chain_order_stops_at_first_failure() {
        // Too short AND failing the custom validator: only minLength reports.
        let table = table_with(
            "name",
            FieldDecl::optional_string()
                .with_min_length(LengthDecl::One(5))
                .with_validate(|_| false),
        );
        let errors = run_one(&table, "name", Some(json!("ab")));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].property, Violation::MinLength);
    }

    #[test]
    fn test_date_and_id_types() {
        let primitives = DefaultPrimitives;
        assert!(check_type(&json!("2024-01-01"), ValueType::Date, &primitives));
        assert!(check_type(
            &json!({"$date": "2024-01-01T00:00:00Z"}),
            ValueType::Date,
            &primitives
        ));
        assert!(!check_type(&json!("soon"), ValueType::Date, &primitives));
        assert!(check_type(
            &json!("507f1f77bcf86cd799439011"),
            ValueType::Id,
            &primitives
        ));
    }

    #[test]
    fn test_pushed_element_checks_type() {
        let table = table_with("tags", FieldDecl::array_of(ValueType::String));
        let primitives = DefaultPrimitives;
        let field = table.get("tags").unwrap();
        let chain = ValidatorChain::new(field, &primitives);

        let err = chain.run_pushed_element("tags", &json!(42)).unwrap();
        assert_eq!(err.property, Violation::Type);
        assert!(chain.run_pushed_element("tags", &json!("ok")).is_none());
    }
}
