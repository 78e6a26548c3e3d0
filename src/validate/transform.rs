//! Transform chain
//!
//! Order is fixed: for arrays of values, `filterNulls` first (recursively
//! for nested arrays), then the slot-0 custom transform over the whole
//! array, then per element the slot-1 custom transform followed by string
//! transforms `trim -> lowercase -> uppercase -> sanitize`. Scalar fields
//! apply slot-0 then string transforms; array-of-objects fields apply only
//! slot-0 here (their contents are transformed through subdocument
//! recursion). String transforms apply only to values that are currently
//! strings.

use serde_json::Value;

use crate::schema::{FieldKind, FieldSchema};

use super::primitives::TextPrimitives;

/// Per-field transform pipeline
pub struct TransformChain<'a> {
    field: &'a FieldSchema,
    primitives: &'a dyn TextPrimitives,
}

impl<'a> TransformChain<'a> {
    /// Creates a chain over one field schema.
    pub fn new(field: &'a FieldSchema, primitives: &'a dyn TextPrimitives) -> Self {
        Self { field, primitives }
    }

    /// Applies the transform sequence appropriate to the field's kind.
    pub fn apply(&self, value: Value) -> Value {
        match self.field.kind {
            FieldKind::Value => {
                let value = self.apply_custom(value, 0);
                self.apply_string_transforms(value)
            }
            FieldKind::ArrayOfValues => {
                let value = if self.field.filter_nulls {
                    drop_nulls(value)
                } else {
                    value
                };
                let value = self.apply_custom(value, 0);
                match value {
                    Value::Array(items) => Value::Array(
                        items.into_iter().map(|item| self.apply_element(item)).collect(),
                    ),
                    other => other,
                }
            }
            FieldKind::ArrayOfObjects => self.apply_custom(value, 0),
        }
    }

    /// Applies the per-element sequence: slot-1 custom then string
    /// transforms. Used for array elements and `$push`/`$addToSet` values.
    pub fn apply_element(&self, value: Value) -> Value {
        let value = self.apply_custom(value, 1);
        self.apply_string_transforms(value)
    }

    fn apply_custom(&self, value: Value, slot: usize) -> Value {
        match &self.field.transform[slot] {
            Some(f) => f(value),
            None => value,
        }
    }

    fn apply_string_transforms(&self, value: Value) -> Value {
        let Value::String(s) = value else {
            return value;
        };
        let mut s = s;
        if self.field.trim {
            s = s.trim().to_string();
        }
        if self.field.lowercase {
            s = s.to_lowercase();
        }
        if self.field.uppercase {
            s = s.to_uppercase();
        }
        if self.field.sanitize {
            s = self.primitives.sanitize(&s);
        }
        Value::String(s)
    }
}

/// Drops null elements from an array, descending into nested arrays.
fn drop_nulls(value: Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .filter(|v| !v.is_null())
                .map(drop_nulls)
                .collect(),
        ),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDecl, SchemaCompiler, SchemaTable, ValueType};
    use crate::validate::primitives::DefaultPrimitives;
    use serde_json::json;

    fn table_with(path: &str, decl: FieldDecl) -> SchemaTable {
        SchemaCompiler::compile(vec![(path.to_string(), decl)]).unwrap()
    }

    fn apply_one(table: &SchemaTable, path: &str, value: Value) -> Value {
        let primitives = DefaultPrimitives;
        TransformChain::new(table.get(path).unwrap(), &primitives).apply(value)
    }

    #[test]
    fn test_custom_transform() {
        let table = table_with(
            "account.name",
            FieldDecl::required_string()
                .with_transform(|v| json!(format!("hey {}", v.as_str().unwrap_or("")))),
        );
        assert_eq!(apply_one(&table, "account.name", json!("jay")), json!("hey jay"));
    }

    #[test]
    fn test_string_transform_order() {
        // trim applies before case folding; sanitize runs last.
        let mut decl = FieldDecl::optional_string();
        decl.trim = true;
        decl.uppercase = true;
        decl.sanitize = true;
        let table = table_with("name", decl);

        assert_eq!(apply_one(&table, "name", json!("  a<b  ")), json!("A&lt;B"));
    }

    #[test]
    fn test_string_transforms_skip_non_strings() {
        let mut decl = FieldDecl::new();
        decl.trim = true;
        let table = table_with("age", decl);
        assert_eq!(apply_one(&table, "age", json!(42)), json!(42));
    }

    #[test]
    fn test_filter_nulls_recurses() {
        let mut decl = FieldDecl::array_of(ValueType::String);
        decl.filter_nulls = true;
        let table = table_with("tags", decl);

        assert_eq!(
            apply_one(&table, "tags", json!(["a", null, "b"])),
            json!(["a", "b"])
        );
    }

    #[test]
    fn test_element_transforms_after_outer() {
        let mut decl = FieldDecl::array_of(ValueType::String)
            .with_transform(|v| {
                // outer: append a marker element
                let mut items = v.as_array().cloned().unwrap_or_default();
                items.push(json!("end"));
                Value::Array(items)
            })
            .with_element_transform(|v| json!(format!("#{}", v.as_str().unwrap_or(""))));
        decl.uppercase = true;
        let table = table_with("tags", decl);

        assert_eq!(
            apply_one(&table, "tags", json!(["a"])),
            json!(["#A", "#END"])
        );
    }

    #[test]
    fn test_array_of_objects_outer_only() {
        let table = SchemaCompiler::compile(vec![
            ("friends".into(), FieldDecl::new().with_transform(|v| v)),
            ("friends.name".into(), FieldDecl::required_string()),
        ])
        .unwrap();

        let value = json!([{"name": "x"}]);
        assert_eq!(apply_one(&table, "friends", value.clone()), value);
    }
}
