//! Subdocument recursion
//!
//! Elements of an array-of-objects field are processed against the schema
//! slice whose paths are strict descendants of the field's path. Each
//! element runs the same unknown/required/default/validate/transform
//! sequence as an insert, and the processed object is written back into the
//! parent array in place. Nesting depth is unbounded: a slice may itself
//! contain array-of-objects fields.

use serde_json::Value;

use crate::path::{deconstruct, reconstruct};
use crate::schema::{FieldSchema, SchemaTable};
use crate::validate::{TextPrimitives, ValidationError};

use super::preprocessor::{analyze_full, run_entry_chains};

/// Processes every element of an array-of-objects field in place.
///
/// Element errors are reported as `<display>[i].<field>`.
pub(crate) fn process_elements(
    schema: &SchemaTable,
    parent: &FieldSchema,
    display: &str,
    items: &mut [Value],
    primitives: &dyn TextPrimitives,
    errors: &mut Vec<ValidationError>,
) {
    let slice = schema.slice(&parent.path);
    for (i, item) in items.iter_mut().enumerate() {
        let name = format!("{}[{}]", display, i);
        process_into(&slice, &name, item, primitives, errors);
    }
}

/// Processes a single element addressed by index or placeholder.
pub(crate) fn process_element(
    schema: &SchemaTable,
    parent: &FieldSchema,
    display: &str,
    item: &mut Value,
    primitives: &dyn TextPrimitives,
    errors: &mut Vec<ValidationError>,
) {
    let slice = schema.slice(&parent.path);
    process_into(&slice, display, item, primitives, errors);
}

fn process_into(
    slice: &SchemaTable,
    name: &str,
    item: &mut Value,
    primitives: &dyn TextPrimitives,
    errors: &mut Vec<ValidationError>,
) {
    let Some(obj) = item.as_object() else {
        errors.push(ValidationError::type_mismatch(name, "object", item.clone()));
        return;
    };

    let mut entries = deconstruct(obj);
    let mut missing = Vec::new();
    analyze_full(slice, &mut entries, &mut missing);

    let mut element_errors: Vec<ValidationError> =
        missing.iter().map(|f| ValidationError::required(f.clone())).collect();
    run_entry_chains(slice, &mut entries, primitives, &mut element_errors);

    for mut err in element_errors {
        err.field = format!("{}.{}", name, err.field);
        errors.push(err);
    }

    *item = reconstruct(&entries);
}
