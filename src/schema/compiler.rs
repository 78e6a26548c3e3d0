//! Schema compiler: raw declarations -> SchemaTable
//!
//! Normalization steps, in order:
//! 1. Sort paths by ascending segment count (parents before children)
//! 2. Inject `_id` if absent, with an identity-format validator
//! 3. Infer field kinds (value / array of values / array of objects)
//! 4. Coerce scalar length/validator/transform config into two-slot arrays
//! 5. Run field-consistency checks
//! 6. Compute root flags
//!
//! Compilation happens once, at model-registration time. Failures raise a
//! fatal [`SchemaConfigError`] and never reach the request path.

use serde_json::Value;

use super::errors::{SchemaConfigError, SchemaResult};
use super::table::{recompute_roots, SchemaTable};
use super::types::{is_object_id, FieldDecl, FieldKind, FieldSchema, ValueType};

/// Compiles raw field declarations into a [`SchemaTable`].
pub struct SchemaCompiler;

impl SchemaCompiler {
    /// Compiles the declarations keyed by dotted path.
    ///
    /// # Errors
    ///
    /// Returns a fatal [`SchemaConfigError`] on the first inconsistent
    /// declaration encountered.
    pub fn compile(decls: Vec<(String, FieldDecl)>) -> SchemaResult<SchemaTable> {
        let mut decls = decls;

        // Parents before children, ties broken lexically for determinism.
        decls.sort_by(|(a, _), (b, _)| {
            let da = a.split('.').count();
            let db = b.split('.').count();
            da.cmp(&db).then_with(|| a.cmp(b))
        });

        if !decls.iter().any(|(path, _)| path == "_id") {
            decls.insert(0, ("_id".to_string(), identity_decl()));
        }

        let paths: Vec<String> = decls.iter().map(|(p, _)| p.clone()).collect();

        let mut fields = Vec::with_capacity(decls.len());
        for (path, decl) in decls {
            let kind = infer_kind(&path, &decl, &paths);
            check_consistency(&path, &decl)?;

            fields.push(FieldSchema {
                path,
                required: decl.required,
                not_null: decl.not_null,
                default: decl.default,
                kind,
                value_type: decl.value_type,
                is_root: true, // recomputed below
                trim: decl.trim,
                lowercase: decl.lowercase,
                uppercase: decl.uppercase,
                sanitize: decl.sanitize,
                deny_xss: decl.deny_xss,
                filter_nulls: decl.filter_nulls,
                min_length: decl.min_length.map_or([None, None], |d| d.into_slots()),
                max_length: decl.max_length.map_or([None, None], |d| d.into_slots()),
                validate: decl.validate,
                transform: decl.transform,
            });
        }

        recompute_roots(&mut fields);
        Ok(SchemaTable::from_fields(fields))
    }
}

/// The synthesized `_id` declaration: optional, identity-format checked.
fn identity_decl() -> FieldDecl {
    FieldDecl::optional_id().with_validate(|value| is_object_id(value))
}

/// A path is an array-of-objects container when any other declared path is a
/// strict, longer prefix-match child of it; a declared array of scalars is an
/// array of values; everything else is a single value.
fn infer_kind(path: &str, decl: &FieldDecl, paths: &[String]) -> FieldKind {
    let lead = format!("{}.", path);
    if paths.iter().any(|p| p != path && p.starts_with(&lead)) {
        FieldKind::ArrayOfObjects
    } else if decl.array {
        FieldKind::ArrayOfValues
    } else {
        FieldKind::Value
    }
}

fn check_consistency(path: &str, decl: &FieldDecl) -> SchemaResult<()> {
    if decl.required && decl.default.is_some() {
        return Err(SchemaConfigError::default_conflict(path));
    }
    if decl.not_null && decl.default == Some(Value::Null) {
        return Err(SchemaConfigError::null_default(path));
    }
    if decl.sanitize && decl.deny_xss {
        return Err(SchemaConfigError::flag_conflict(path));
    }
    if decl.has_string_flags() {
        if let Some(vt) = decl.value_type {
            if !vt.is_string() {
                return Err(SchemaConfigError::non_string_flags(path, vt.type_name()));
            }
        }
    }
    Ok(())
}
