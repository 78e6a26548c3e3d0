//! Engine façade
//!
//! A [`Gate`] owns the preprocessor cache, metrics, text primitives, and the
//! per-namespace schema registry. Callers hand it the operation name, the
//! driver's positional arguments, and get back `(errors, args)`: on success
//! the document arguments are replaced by validated, transformed,
//! schema-shaped equivalents; on failure the errors are non-empty and the
//! arguments are returned unchanged, and callers must not apply them.
//!
//! The gate performs no I/O and never throws on validation failure; how
//! failures are surfaced belongs to the caller.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use serde_json::Value;
use thiserror::Error;

use crate::cache::{structural_signature, CacheKey, PreprocessorCache};
use crate::observability::{Logger, MetricsRegistry};
use crate::preprocess::{Operation, Preprocessor};
use crate::schema::{FieldDecl, SchemaCompiler, SchemaConfigError, SchemaTable};
use crate::validate::{DefaultPrimitives, TextPrimitives, ValidationError};

/// Fully qualified collection address
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    /// Connection name
    pub connection: String,
    /// Database name
    pub database: String,
    /// Collection name
    pub collection: String,
}

impl Namespace {
    /// Builds a namespace from its parts.
    pub fn new(
        connection: impl Into<String>,
        database: impl Into<String>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            connection: connection.into(),
            database: database.into(),
            collection: collection.into(),
        }
    }

    /// Dotted key form: `<connection>.<database>.<collection>`.
    pub fn key(&self) -> String {
        format!("{}.{}.{}", self.connection, self.database, self.collection)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Result of one preprocessing call
#[derive(Debug)]
pub struct PreprocessOutcome {
    /// Validation errors; `None` on success
    pub errors: Option<Vec<ValidationError>>,
    /// The call arguments: rewritten on success, unchanged on failure
    pub args: Vec<Value>,
}

impl PreprocessOutcome {
    /// Whether preprocessing succeeded.
    pub fn is_ok(&self) -> bool {
        self.errors.is_none()
    }
}

/// Collaborator-facing errors from the gate surface
#[derive(Debug, Clone, Error)]
pub enum GateError {
    /// Operation name outside the closed set
    #[error("Unknown operation '{0}'")]
    UnknownOperation(String),

    /// No schema registered for the namespace
    #[error("No schema registered for namespace '{0}'")]
    UnknownNamespace(String),
}

/// The preprocessing engine
pub struct Gate {
    schemas: RwLock<HashMap<String, Arc<SchemaTable>>>,
    cache: PreprocessorCache,
    metrics: MetricsRegistry,
    primitives: Arc<dyn TextPrimitives>,
}

impl Default for Gate {
    fn default() -> Self {
        Self::new()
    }
}

impl Gate {
    /// Creates a gate with the default text primitives.
    pub fn new() -> Self {
        Self::with_primitives(Arc::new(DefaultPrimitives))
    }

    /// Creates a gate with caller-supplied text primitives.
    pub fn with_primitives(primitives: Arc<dyn TextPrimitives>) -> Self {
        Self {
            schemas: RwLock::new(HashMap::new()),
            cache: PreprocessorCache::new(),
            metrics: MetricsRegistry::new(),
            primitives,
        }
    }

    /// Compiles and registers a schema for a namespace.
    ///
    /// # Errors
    ///
    /// Returns the fatal [`SchemaConfigError`] if the declarations are
    /// inconsistent; nothing is registered in that case.
    pub fn register_schema(
        &self,
        namespace: &Namespace,
        decls: Vec<(String, FieldDecl)>,
    ) -> Result<(), SchemaConfigError> {
        let table = SchemaCompiler::compile(decls)?;
        self.register_table(namespace, Arc::new(table));
        Ok(())
    }

    /// Registers an already-compiled schema table.
    pub fn register_table(&self, namespace: &Namespace, table: Arc<SchemaTable>) {
        let fields = table.len().to_string();
        self.schemas
            .write()
            .expect("schema registry lock poisoned")
            .insert(namespace.key(), table);
        self.metrics.increment_schemas_registered();
        Logger::info(
            "SCHEMA_REGISTERED",
            &[("namespace", &namespace.key()), ("fields", &fields)],
        );
    }

    /// Returns the registered schema table for a namespace.
    pub fn schema(&self, namespace: &Namespace) -> Option<Arc<SchemaTable>> {
        self.schemas
            .read()
            .expect("schema registry lock poisoned")
            .get(&namespace.key())
            .cloned()
    }

    /// Returns the metrics registry.
    pub fn metrics(&self) -> &MetricsRegistry {
        &self.metrics
    }

    /// Number of cached preprocessors.
    pub fn cached_preprocessors(&self) -> usize {
        self.cache.len()
    }

    /// Preprocesses a call addressed by operation name, using the
    /// namespace's registered schema.
    ///
    /// # Errors
    ///
    /// [`GateError`] covers the collaborator contract only: unknown
    /// operation names and unregistered namespaces. Validation failures are
    /// data, returned inside the outcome.
    pub fn preprocess(
        &self,
        namespace: &Namespace,
        operation: &str,
        args: Vec<Value>,
    ) -> Result<PreprocessOutcome, GateError> {
        let op = Operation::parse(operation)
            .ok_or_else(|| GateError::UnknownOperation(operation.to_string()))?;
        let schema = self
            .schema(namespace)
            .ok_or_else(|| GateError::UnknownNamespace(namespace.key()))?;
        Ok(self.preprocess_with(namespace, op, args, &schema))
    }

    /// Preprocesses a call with an explicit schema table.
    pub fn preprocess_with(
        &self,
        namespace: &Namespace,
        operation: Operation,
        args: Vec<Value>,
        schema: &Arc<SchemaTable>,
    ) -> PreprocessOutcome {
        let key = CacheKey::new(namespace.key(), operation, structural_signature(&args));
        let (documents, was_list) = Preprocessor::parse_payload(operation, &args);
        let is_upsert = operation.is_upsert(&args);

        let (errors, preprocessor) = match self.cache.get(&key) {
            Some(mut cached) => {
                self.metrics.increment_cache_hits();
                Logger::trace(
                    "CACHE_HIT",
                    &[("namespace", &namespace.key()), ("operation", operation.name())],
                );
                cached.rehydrate(&documents, is_upsert);
                let errors = cached.preprocess_from_cache(self.primitives.as_ref());
                (errors, cached)
            }
            None => {
                self.metrics.increment_cache_misses();
                self.metrics.increment_full_analyses();
                Logger::trace(
                    "CACHE_MISS",
                    &[("namespace", &namespace.key()), ("operation", operation.name())],
                );
                let mut preprocessor = Preprocessor::new(schema.clone(), operation);
                preprocessor.add_payload(&documents, is_upsert, was_list);
                if let Some(query) = operation.query(&args) {
                    preprocessor.check_query(&query);
                }
                let errors = preprocessor.preprocess(self.primitives.as_ref());
                self.cache.insert(key, preprocessor.cleared_clone());
                (errors, preprocessor)
            }
        };

        if errors.is_empty() {
            self.metrics.increment_calls_accepted();
            PreprocessOutcome {
                errors: None,
                args: preprocessor.update_args(args),
            }
        } else {
            self.metrics.increment_calls_rejected();
            Logger::warn(
                "PREPROCESS_REJECTED",
                &[
                    ("errors", &errors.len().to_string()),
                    ("namespace", &namespace.key()),
                    ("operation", operation.name()),
                ],
            );
            PreprocessOutcome {
                errors: Some(errors),
                args,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ValueType;
    use serde_json::json;

    fn users_namespace() -> Namespace {
        Namespace::new("local", "app", "users")
    }

    fn gate_with_users() -> Gate {
        let gate = Gate::new();
        gate.register_schema(
            &users_namespace(),
            vec![
                ("account.name".into(), FieldDecl::required_string()),
                (
                    "account.friends".into(),
                    FieldDecl::array_of(ValueType::String),
                ),
            ],
        )
        .unwrap();
        gate
    }

    #[test]
    fn test_unknown_operation() {
        let gate = gate_with_users();
        let err = gate
            .preprocess(&users_namespace(), "aggregate", vec![json!({})])
            .unwrap_err();
        assert!(matches!(err, GateError::UnknownOperation(_)));
    }

    #[test]
    fn test_unknown_namespace() {
        let gate = Gate::new();
        let err = gate
            .preprocess(&users_namespace(), "insert", vec![json!({})])
            .unwrap_err();
        assert!(matches!(err, GateError::UnknownNamespace(_)));
    }

    #[test]
    fn test_success_rewrites_args() {
        let gate = gate_with_users();
        let outcome = gate
            .preprocess(
                &users_namespace(),
                "insert",
                vec![json!({"account": {"name": "jay"}})],
            )
            .unwrap();

        assert!(outcome.is_ok());
        assert_eq!(outcome.args[0]["account"]["name"], json!("jay"));
    }

    #[test]
    fn test_failure_returns_args_unchanged() {
        let gate = gate_with_users();
        let original = vec![json!({"account": {"nick": "j"}})];
        let outcome = gate
            .preprocess(&users_namespace(), "insert", original.clone())
            .unwrap();

        assert!(!outcome.is_ok());
        assert_eq!(outcome.args, original);
        assert_eq!(gate.metrics().snapshot().calls_rejected, 1);
    }

    #[test]
    fn test_cache_hit_on_same_shape() {
        let gate = gate_with_users();
        let ns = users_namespace();

        gate.preprocess(&ns, "insert", vec![json!({"account": {"name": "a"}})])
            .unwrap();
        gate.preprocess(&ns, "insert", vec![json!({"account": {"name": "b"}})])
            .unwrap();

        let snap = gate.metrics().snapshot();
        assert_eq!(snap.cache_misses, 1);
        assert_eq!(snap.cache_hits, 1);
        assert_eq!(snap.full_analyses, 1);
        assert_eq!(gate.cached_preprocessors(), 1);
    }
}
