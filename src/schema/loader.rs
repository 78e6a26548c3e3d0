//! Schema declaration loader
//!
//! Loads the declarative portion of collection schemas from disk at
//! registration time: one JSON file per collection at
//! `<dir>/schema_<collection>.json`, mapping dotted field paths to
//! declarations. Closure-valued validate/transform slots cannot be expressed
//! in JSON and are attached programmatically after loading.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::compiler::SchemaCompiler;
use super::errors::{SchemaConfigError, SchemaResult};
use super::table::SchemaTable;
use super::types::FieldDecl;

/// Loads and registers compiled schema tables per collection.
pub struct SchemaLoader {
    /// Directory containing declaration files
    schema_dir: PathBuf,
    /// Compiled tables indexed by collection name
    tables: HashMap<String, Arc<SchemaTable>>,
}

impl SchemaLoader {
    /// Creates a loader reading from `<dir>`.
    pub fn new(schema_dir: impl Into<PathBuf>) -> Self {
        Self {
            schema_dir: schema_dir.into(),
            tables: HashMap::new(),
        }
    }

    /// Returns the declaration directory.
    pub fn schema_dir(&self) -> &Path {
        &self.schema_dir
    }

    /// Loads every `schema_<collection>.json` file in the directory.
    ///
    /// Missing directory means no declarations; malformed files are fatal.
    pub fn load_all(&mut self) -> SchemaResult<()> {
        if !self.schema_dir.exists() {
            return Ok(());
        }

        let entries = fs::read_dir(&self.schema_dir).map_err(|e| {
            SchemaConfigError::malformed(
                self.schema_dir.display().to_string(),
                format!("Failed to read schema directory: {}", e),
            )
        })?;

        for entry in entries {
            let entry = entry.map_err(|e| {
                SchemaConfigError::malformed(
                    self.schema_dir.display().to_string(),
                    format!("Failed to read directory entry: {}", e),
                )
            })?;
            let path = entry.path();

            if path.extension().map_or(true, |ext| ext != "json") {
                continue;
            }
            let Some(collection) = collection_name(&path) else {
                continue;
            };

            self.load_file(&collection, &path)?;
        }

        Ok(())
    }

    fn load_file(&mut self, collection: &str, path: &Path) -> SchemaResult<()> {
        let content = fs::read_to_string(path).map_err(|e| {
            SchemaConfigError::malformed(
                path.display().to_string(),
                format!("Failed to read file: {}", e),
            )
        })?;

        let decls: HashMap<String, FieldDecl> =
            serde_json::from_str(&content).map_err(|e| {
                SchemaConfigError::malformed(
                    path.display().to_string(),
                    format!("Invalid JSON: {}", e),
                )
            })?;

        self.register(collection, decls.into_iter().collect())
    }

    /// Compiles and registers declarations for a collection.
    pub fn register(
        &mut self,
        collection: &str,
        decls: Vec<(String, FieldDecl)>,
    ) -> SchemaResult<()> {
        let table = SchemaCompiler::compile(decls)?;
        self.tables.insert(collection.to_string(), Arc::new(table));
        Ok(())
    }

    /// Gets the compiled table for a collection.
    pub fn get(&self, collection: &str) -> Option<Arc<SchemaTable>> {
        self.tables.get(collection).cloned()
    }

    /// Checks whether a collection has a registered schema.
    pub fn contains(&self, collection: &str) -> bool {
        self.tables.contains_key(collection)
    }

    /// Returns the number of registered collections.
    pub fn collection_count(&self) -> usize {
        self.tables.len()
    }
}

/// Extracts `<collection>` from a `schema_<collection>.json` filename.
fn collection_name(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    stem.strip_prefix("schema_").map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_declaration_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("schema_users.json"),
            r#"{
                "account.name": {"required": true, "type": "string", "trim": true},
                "account.friends": {"array": true, "type": "string", "minLength": [0, 1]}
            }"#,
        )
        .unwrap();

        let mut loader = SchemaLoader::new(tmp.path());
        loader.load_all().unwrap();

        let table = loader.get("users").expect("users registered");
        assert!(table.get("account.name").unwrap().required);
        assert!(table.get("account.name").unwrap().trim);
        assert_eq!(table.get("account.friends").unwrap().min_length, [Some(0), Some(1)]);
        assert!(table.contains("_id"));
    }

    #[test]
    fn test_non_schema_files_skipped() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("notes.txt"), "not a schema").unwrap();
        fs::write(tmp.path().join("other.json"), "{}").unwrap();

        let mut loader = SchemaLoader::new(tmp.path());
        loader.load_all().unwrap();
        assert_eq!(loader.collection_count(), 0);
    }

    #[test]
    fn test_invalid_json_is_fatal() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("schema_users.json"), "{ nope").unwrap();

        let mut loader = SchemaLoader::new(tmp.path());
        let err = loader.load_all().unwrap_err();
        assert_eq!(err.code().code(), "GATE_SCHEMA_MALFORMED");
    }

    #[test]
    fn test_inconsistent_declaration_is_fatal() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("schema_users.json"),
            r#"{"name": {"required": true, "default": "x"}}"#,
        )
        .unwrap();

        let mut loader = SchemaLoader::new(tmp.path());
        assert!(loader.load_all().is_err());
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let tmp = TempDir::new().unwrap();
        let mut loader = SchemaLoader::new(tmp.path().join("absent"));
        loader.load_all().unwrap();
        assert_eq!(loader.collection_count(), 0);
    }
}
