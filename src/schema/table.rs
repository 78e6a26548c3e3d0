//! Ordered table of compiled field schemas
//!
//! Paths are held in ascending depth order (parents before children). The
//! table is immutable after compilation and shared read-only by every
//! preprocessor instance for its collection.

use std::collections::HashMap;

use super::types::{FieldKind, FieldSchema};

/// Ordered mapping of canonical dotted path to [`FieldSchema`]
#[derive(Debug, Clone)]
pub struct SchemaTable {
    /// Fields in ascending path-depth order
    fields: Vec<FieldSchema>,
    /// Canonical path -> position in `fields`
    index: HashMap<String, usize>,
}

impl SchemaTable {
    /// Builds a table from already-sorted compiled fields.
    pub(crate) fn from_fields(fields: Vec<FieldSchema>) -> Self {
        let index = fields
            .iter()
            .enumerate()
            .map(|(i, f)| (f.path.clone(), i))
            .collect();
        Self { fields, index }
    }

    /// Looks up a field schema by canonical dotted path.
    pub fn get(&self, canonical: &str) -> Option<&FieldSchema> {
        self.index.get(canonical).map(|&i| &self.fields[i])
    }

    /// Checks whether a canonical path is declared.
    pub fn contains(&self, canonical: &str) -> bool {
        self.index.contains_key(canonical)
    }

    /// Iterates fields in ascending depth order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldSchema> {
        self.fields.iter()
    }

    /// Returns the number of declared fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Extracts the slice of fields that are strict descendants of `prefix`,
    /// relativized by stripping the shared prefix.
    ///
    /// Used for subdocument recursion over an array-of-objects field: the
    /// slice is itself a complete table over the element schema. No `_id` is
    /// synthesized for slices.
    pub fn slice(&self, prefix: &str) -> SchemaTable {
        let lead = format!("{}.", prefix);
        let mut fields: Vec<FieldSchema> = self
            .fields
            .iter()
            .filter(|f| f.path.starts_with(&lead))
            .map(|f| {
                let mut child = f.clone();
                child.path = f.path[lead.len()..].to_string();
                child
            })
            .collect();
        recompute_roots(&mut fields);
        Self::from_fields(fields)
    }

    /// Whether any declared field is an array-of-objects container.
    pub fn has_subdocuments(&self) -> bool {
        self.fields.iter().any(|f| f.kind == FieldKind::ArrayOfObjects)
    }
}

/// Recomputes `is_root` for a set of fields: a field is a root unless its
/// path is a strict descendant of another field's path.
pub(crate) fn recompute_roots(fields: &mut [FieldSchema]) {
    let paths: Vec<String> = fields.iter().map(|f| f.path.clone()).collect();
    for field in fields.iter_mut() {
        field.is_root = !paths
            .iter()
            .any(|p| p != &field.path && field.path.starts_with(&format!("{}.", p)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDecl, SchemaCompiler, ValueType};
    use serde_json::json;

    fn sample_table() -> SchemaTable {
        SchemaCompiler::compile(vec![
            ("account.name".into(), FieldDecl::required_string()),
            ("friends".into(), FieldDecl::new()),
            ("friends.name".into(), FieldDecl::required_string()),
            ("friends.tags".into(), FieldDecl::array_of(ValueType::String)),
        ])
        .unwrap()
    }

    #[test]
    fn test_lookup_by_canonical_path() {
        let table = sample_table();
        assert!(table.contains("account.name"));
        assert!(table.contains("friends.name"));
        assert!(!table.contains("account.email"));
    }

    #[test]
    fn test_depth_ordering() {
        let table = sample_table();
        let depths: Vec<usize> = table
            .fields()
            .map(|f| f.path.split('.').count())
            .collect();
        let mut sorted = depths.clone();
        sorted.sort_unstable();
        assert_eq!(depths, sorted);
    }

    #[test]
    fn test_slice_relativizes_paths() {
        let table = sample_table();
        let slice = table.slice("friends");

        assert_eq!(slice.len(), 2);
        assert!(slice.contains("name"));
        assert!(slice.contains("tags"));
        assert!(!slice.contains("friends.name"));
        assert!(slice.get("name").unwrap().is_root);
    }

    #[test]
    fn test_slice_of_unrelated_prefix_is_empty() {
        let table = sample_table();
        assert!(table.slice("account.name").is_empty());
    }

    #[test]
    fn test_subdocument_detection() {
        let table = sample_table();
        assert!(table.has_subdocuments());

        let flat = SchemaCompiler::compile(vec![(
            "name".into(),
            FieldDecl::required_string(),
        )])
        .unwrap();
        assert!(!flat.has_subdocuments());
    }

    #[test]
    fn test_default_survives_slice() {
        let table = SchemaCompiler::compile(vec![
            ("posts".into(), FieldDecl::new()),
            (
                "posts.visibility".into(),
                FieldDecl::optional_string().with_default(json!("public")),
            ),
        ])
        .unwrap();

        let slice = table.slice("posts");
        assert_eq!(
            slice.get("visibility").unwrap().default,
            Some(json!("public"))
        );
    }
}
