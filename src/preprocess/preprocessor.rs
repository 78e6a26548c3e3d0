//! The preprocessor: per-call orchestration of path algebra and chains
//!
//! A preprocessor is built per operation call on a cache miss. Full
//! preprocessing runs shape analysis (unknown marking, defaults, required
//! resolution, upsert query safety) followed by the validator/transform
//! chains. A cached preprocessor skips the shape analysis on later calls
//! with the same structural signature and re-runs only the chains over
//! rehydrated values.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::path::{deconstruct, deep_get, reconstruct, EntrySet, Path, PayloadEntry};
use crate::schema::{FieldKind, SchemaTable};
use crate::validate::{TextPrimitives, TransformChain, ValidationError, ValidatorChain};

use super::operation::Operation;
use super::subdoc;

/// Recognized update operator categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OperatorKind {
    /// `$set`: embedded-field updates, validated and transformed
    Set,
    /// `$inc`/`$mul`/`$min`/`$max`: field-existence check only
    Arithmetic,
    /// `$addToSet`/`$push`: per-element validation and transformation
    ArrayAdd,
}

fn operator_kind(key: &str) -> Option<OperatorKind> {
    match key {
        "$set" => Some(OperatorKind::Set),
        "$inc" | "$mul" | "$min" | "$max" => Some(OperatorKind::Arithmetic),
        "$addToSet" | "$push" => Some(OperatorKind::ArrayAdd),
        _ => None,
    }
}

/// One top-level operator of an update document
#[derive(Debug, Clone)]
enum OperatorGroup {
    /// An operator the engine validates
    Recognized {
        key: String,
        kind: OperatorKind,
        entries: EntrySet,
    },
    /// Any other operator passes through untouched, by policy
    Passthrough { key: String, value: Value },
}

/// Parsed payload of one document in the call
#[derive(Debug, Clone)]
enum DocumentPayload {
    /// Operator-free document: full insert/replace semantics
    Full {
        entries: EntrySet,
        /// Required root fields absent from the entry set (shape-invariant)
        missing_required: Vec<String>,
    },
    /// Operator document: one group per top-level operator key
    Operators { groups: Vec<OperatorGroup> },
}

/// Per-call preprocessing state
#[derive(Debug, Clone)]
pub struct Preprocessor {
    schema: Arc<SchemaTable>,
    operation: Operation,
    is_upsert: bool,
    documents: Vec<DocumentPayload>,
    /// The payload argument arrived as a list of documents
    payload_was_list: bool,
    /// Query field paths missing from the schema (shape-invariant); emitted
    /// as errors only on upsert calls
    query_violations: Vec<String>,
}

impl Preprocessor {
    /// Creates an empty preprocessor for one operation over one schema.
    pub fn new(schema: Arc<SchemaTable>, operation: Operation) -> Self {
        Self {
            schema,
            operation,
            is_upsert: false,
            documents: Vec::new(),
            payload_was_list: false,
            query_violations: Vec::new(),
        }
    }

    /// Returns the operation this preprocessor was built for.
    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Extracts the document list from the call's positional arguments.
    ///
    /// Returns the documents and whether the payload arrived as a list.
    /// Empty and keyless documents are dropped.
    pub fn parse_payload(operation: Operation, args: &[Value]) -> (Vec<Value>, bool) {
        match args.get(operation.payload_position()) {
            Some(Value::Array(docs)) => (
                docs.iter()
                    .filter(|d| matches!(d, Value::Object(m) if !m.is_empty()))
                    .cloned()
                    .collect(),
                true,
            ),
            Some(Value::Object(m)) if !m.is_empty() => {
                (vec![Value::Object(m.clone())], false)
            }
            _ => (Vec::new(), false),
        }
    }

    /// Deconstructs the call's documents into per-document payloads.
    pub fn add_payload(&mut self, documents: &[Value], is_upsert: bool, was_list: bool) {
        self.is_upsert = is_upsert;
        self.payload_was_list = was_list;

        for doc in documents {
            let Some(map) = doc.as_object() else { continue };

            if map.keys().any(|k| k.starts_with('$')) {
                let mut groups = Vec::new();
                for (key, value) in map {
                    match (operator_kind(key), value.as_object()) {
                        (Some(kind), Some(obj)) => {
                            let mut entries = deconstruct(obj);
                            if kind == OperatorKind::Set {
                                for entry in entries.iter_mut() {
                                    entry.embedded_field_update = true;
                                }
                            }
                            groups.push(OperatorGroup::Recognized {
                                key: key.clone(),
                                kind,
                                entries,
                            });
                        }
                        _ => groups.push(OperatorGroup::Passthrough {
                            key: key.clone(),
                            value: value.clone(),
                        }),
                    }
                }
                self.documents.push(DocumentPayload::Operators { groups });
            } else {
                self.documents.push(DocumentPayload::Full {
                    entries: deconstruct(map),
                    missing_required: Vec::new(),
                });
            }
        }
    }

    /// Records query field paths absent from the schema.
    ///
    /// The recorded set is shape-invariant; it is reported (and the call
    /// rejected before any document processing) only when the call is an
    /// upsert, so an upsert can never smuggle unknown fields through its
    /// query half.
    pub fn check_query(&mut self, query: &Value) {
        let mut paths = Vec::new();
        collect_query_paths(query, "", &mut paths);
        self.query_violations = paths
            .into_iter()
            .filter(|p| !self.schema.contains(p))
            .collect();
    }

    /// Full preprocessing: shape analysis plus chains.
    ///
    /// The shape analysis always runs (its results are cached and reused by
    /// later calls with other upsert flags); an upsert with unknown query
    /// fields is still rejected before any document values are touched.
    pub fn preprocess(&mut self, primitives: &dyn TextPrimitives) -> Vec<ValidationError> {
        let schema = self.schema.clone();
        for payload in &mut self.documents {
            match payload {
                DocumentPayload::Full {
                    entries,
                    missing_required,
                } => analyze_full(&schema, entries, missing_required),
                DocumentPayload::Operators { groups } => {
                    for group in groups {
                        if let OperatorGroup::Recognized { entries, .. } = group {
                            mark_unknown(&schema, entries);
                        }
                    }
                }
            }
        }

        if let Some(errors) = self.upsert_rejection() {
            return errors;
        }
        self.run_chains(primitives)
    }

    /// Cache-hit preprocessing: chains only, over rehydrated values.
    pub fn preprocess_from_cache(
        &mut self,
        primitives: &dyn TextPrimitives,
    ) -> Vec<ValidationError> {
        if let Some(errors) = self.upsert_rejection() {
            return errors;
        }
        self.run_chains(primitives)
    }

    /// Rewrites the positional arguments with the processed documents.
    ///
    /// Only meaningful after preprocessing succeeded; callers must not apply
    /// arguments from a failed call.
    pub fn update_args(&self, mut args: Vec<Value>) -> Vec<Value> {
        let rebuilt: Vec<Value> = self.documents.iter().map(rebuild_document).collect();
        let payload = if self.payload_was_list {
            Value::Array(rebuilt)
        } else {
            rebuilt
                .into_iter()
                .next()
                .unwrap_or(Value::Object(Map::new()))
        };

        let pos = self.operation.payload_position();
        if pos < args.len() {
            args[pos] = payload;
        }
        args
    }

    /// Returns a copy with all payload values cleared, suitable for caching:
    /// paths, flags, and shape-analysis results are retained.
    pub fn cleared_clone(&self) -> Preprocessor {
        let mut cleared = self.clone();
        for payload in &mut cleared.documents {
            match payload {
                DocumentPayload::Full { entries, .. } => entries.clear_values(),
                DocumentPayload::Operators { groups } => {
                    for group in groups {
                        match group {
                            OperatorGroup::Recognized { entries, .. } => {
                                entries.clear_values()
                            }
                            OperatorGroup::Passthrough { value, .. } => {
                                *value = Value::Null
                            }
                        }
                    }
                }
            }
        }
        cleared
    }

    /// Refills payload values from a new call's documents at the recorded
    /// payload paths, substituting schema defaults for omitted fields that
    /// were previously defaulted.
    pub fn rehydrate(&mut self, documents: &[Value], is_upsert: bool) {
        self.is_upsert = is_upsert;
        let schema = self.schema.clone();

        for (payload, doc) in self.documents.iter_mut().zip(documents) {
            match payload {
                DocumentPayload::Full { entries, .. } => {
                    rehydrate_entries(&schema, entries, doc)
                }
                DocumentPayload::Operators { groups } => {
                    for group in groups {
                        match group {
                            OperatorGroup::Recognized { key, entries, .. } => {
                                let sub = doc.get(key.as_str()).unwrap_or(&Value::Null);
                                rehydrate_entries(&schema, entries, sub);
                            }
                            OperatorGroup::Passthrough { key, value } => {
                                *value =
                                    doc.get(key.as_str()).cloned().unwrap_or(Value::Null);
                            }
                        }
                    }
                }
            }
        }
    }

    fn upsert_rejection(&self) -> Option<Vec<ValidationError>> {
        if self.is_upsert && !self.query_violations.is_empty() {
            Some(
                self.query_violations
                    .iter()
                    .map(|f| ValidationError::unknown_field(f.clone(), Value::Null))
                    .collect(),
            )
        } else {
            None
        }
    }

    fn run_chains(&mut self, primitives: &dyn TextPrimitives) -> Vec<ValidationError> {
        let schema = self.schema.clone();
        let mut errors = Vec::new();

        for payload in &mut self.documents {
            match payload {
                DocumentPayload::Full {
                    entries,
                    missing_required,
                } => {
                    for field in missing_required.iter() {
                        errors.push(ValidationError::required(field.clone()));
                    }
                    run_entry_chains(&schema, entries, primitives, &mut errors);
                }
                DocumentPayload::Operators { groups } => {
                    for group in groups {
                        let OperatorGroup::Recognized { kind, entries, .. } = group else {
                            continue;
                        };
                        match kind {
                            OperatorKind::Set => {
                                run_entry_chains(&schema, entries, primitives, &mut errors)
                            }
                            OperatorKind::Arithmetic => {
                                run_existence_checks(entries, &mut errors)
                            }
                            OperatorKind::ArrayAdd => {
                                run_array_add(&schema, entries, primitives, &mut errors)
                            }
                        }
                    }
                }
            }
        }

        errors
    }
}

/// Marks entries whose canonical key is not declared.
fn mark_unknown(schema: &SchemaTable, entries: &mut EntrySet) {
    for entry in entries.iter_mut() {
        entry.unknown = !schema.contains(&entry.canonical_key);
    }
}

/// Insert-semantics shape analysis: unknown marking, default injection, and
/// required-field resolution over root fields. Results are shape-invariant
/// and reused across cache hits.
pub(crate) fn analyze_full(
    schema: &SchemaTable,
    entries: &mut EntrySet,
    missing_required: &mut Vec<String>,
) {
    mark_unknown(schema, entries);
    missing_required.clear();

    for field in schema.fields() {
        if !field.is_root || entries.contains_canonical(&field.path) {
            continue;
        }
        if let Some(default) = &field.default {
            let mut entry = PayloadEntry::leaf(
                field.path.clone(),
                field.path.split('.').map(String::from).collect(),
                default.clone(),
            );
            entry.from_default = true;
            entries.push(entry);
        } else if field.required {
            missing_required.push(field.path.clone());
        }
    }
}

/// Runs validator and transform chains over a set of entries, recursing into
/// array-of-objects fields. Shared by insert semantics and `$set`.
pub(crate) fn run_entry_chains(
    schema: &SchemaTable,
    entries: &mut EntrySet,
    primitives: &dyn TextPrimitives,
    errors: &mut Vec<ValidationError>,
) {
    for entry in entries.iter_mut() {
        if entry.unknown {
            errors.push(ValidationError::unknown_field(
                entry.canonical_key.clone(),
                entry.value.clone().unwrap_or(Value::Null),
            ));
            continue;
        }
        let Some(field) = schema.get(&entry.canonical_key) else {
            continue;
        };
        let Some(mut value) = entry.value.take() else {
            continue;
        };

        let chain = ValidatorChain::new(field, primitives);
        let transform = TransformChain::new(field, primitives);
        let name = entry.canonical_key.clone();

        match field.kind {
            FieldKind::ArrayOfObjects => {
                if entry.item_in_array {
                    // One element addressed by index or placeholder:
                    // element-replace semantics.
                    if value.is_object() {
                        subdoc::process_element(
                            schema, field, &name, &mut value, primitives, errors,
                        );
                    } else {
                        errors.push(ValidationError::type_mismatch(
                            name.as_str(),
                            "object",
                            value.clone(),
                        ));
                    }
                } else {
                    let before = errors.len();
                    errors.extend(chain.run(&name, Some(&value)));
                    if errors.len() == before {
                        value = transform.apply(value);
                        if let Value::Array(items) = &mut value {
                            subdoc::process_elements(
                                schema, field, &name, items, primitives, errors,
                            );
                        }
                    }
                }
            }
            FieldKind::ArrayOfValues if entry.item_in_array => {
                match chain.run_pushed_element(&name, &value) {
                    Some(err) => errors.push(err),
                    None => value = transform.apply_element(value),
                }
            }
            _ => {
                let field_errors = chain.run(&name, Some(&value));
                if field_errors.is_empty() {
                    value = transform.apply(value);
                } else {
                    errors.extend(field_errors);
                }
            }
        }

        entry.value = Some(value);
    }
}

/// `$inc`/`$mul`/`$min`/`$max`: schema existence only; arithmetic semantics
/// belong to the store.
fn run_existence_checks(entries: &mut EntrySet, errors: &mut Vec<ValidationError>) {
    for entry in entries.iter_mut() {
        if entry.unknown {
            errors.push(ValidationError::unknown_field(
                entry.canonical_key.clone(),
                entry.value.clone().unwrap_or(Value::Null),
            ));
        }
    }
}

/// `$addToSet`/`$push`: unwrap `$each`, validate and transform each element,
/// recursing for object elements.
fn run_array_add(
    schema: &SchemaTable,
    entries: &mut EntrySet,
    primitives: &dyn TextPrimitives,
    errors: &mut Vec<ValidationError>,
) {
    for entry in entries.iter_mut() {
        if entry.unknown {
            errors.push(ValidationError::unknown_field(
                entry.canonical_key.clone(),
                entry.value.clone().unwrap_or(Value::Null),
            ));
            continue;
        }
        let Some(field) = schema.get(&entry.canonical_key) else {
            continue;
        };
        let Some(value) = entry.value.take() else {
            continue;
        };
        let name = entry.canonical_key.clone();

        // Absent $each means a single-element add.
        let mut elements = if entry.is_each {
            match value {
                Value::Array(items) => items,
                other => {
                    errors.push(ValidationError::type_mismatch(
                        name.as_str(),
                        "array",
                        other.clone(),
                    ));
                    entry.value = Some(other);
                    continue;
                }
            }
        } else {
            vec![value]
        };

        let chain = ValidatorChain::new(field, primitives);
        let transform = TransformChain::new(field, primitives);

        if field.kind == FieldKind::ArrayOfObjects {
            subdoc::process_elements(schema, field, &name, &mut elements, primitives, errors);
        } else {
            for (i, element) in elements.iter_mut().enumerate() {
                let elem_name = if entry.is_each {
                    format!("{}[{}]", name, i)
                } else {
                    name.clone()
                };
                match chain.run_pushed_element(&elem_name, element) {
                    Some(err) => errors.push(err),
                    None => {
                        let taken = std::mem::take(element);
                        *element = transform.apply_element(taken);
                    }
                }
            }
        }

        entry.value = Some(if entry.is_each {
            Value::Array(elements)
        } else {
            elements.into_iter().next().unwrap_or(Value::Null)
        });
    }
}

/// Collects the field paths a query references. Logical operators are
/// descended; comparison-operator wrappers are transparent; plain nested
/// objects extend the dotted path.
fn collect_query_paths(query: &Value, prefix: &str, out: &mut Vec<String>) {
    let Some(map) = query.as_object() else { return };

    for (key, value) in map {
        if key.starts_with('$') {
            match key.as_str() {
                "$and" | "$or" | "$nor" => {
                    if let Some(items) = value.as_array() {
                        for item in items {
                            collect_query_paths(item, prefix, out);
                        }
                    }
                }
                "$elemMatch" | "$not" => collect_query_paths(value, prefix, out),
                _ => {}
            }
            continue;
        }

        let canonical = {
            let own = Path::parse(key).canonical();
            if prefix.is_empty() {
                own
            } else if own.is_empty() {
                prefix.to_string()
            } else {
                format!("{}.{}", prefix, own)
            }
        };

        match value.as_object() {
            Some(obj) if obj.keys().all(|k| k.starts_with('$')) && !obj.is_empty() => {
                out.push(canonical.clone());
                for (k, v) in obj {
                    if k == "$elemMatch" || k == "$not" {
                        collect_query_paths(v, &canonical, out);
                    }
                }
            }
            Some(obj) if !obj.is_empty() => {
                collect_query_paths(&Value::Object(obj.clone()), &canonical, out)
            }
            _ => out.push(canonical),
        }
    }
}

fn rehydrate_entries(schema: &SchemaTable, entries: &mut EntrySet, doc: &Value) {
    for entry in entries.iter_mut() {
        if entry.from_default {
            entry.value = schema
                .get(&entry.canonical_key)
                .and_then(|f| f.default.clone());
            continue;
        }
        entry.value = match deep_get(doc, &entry.payload_path) {
            Some(v) => Some(v.clone()),
            None => schema
                .get(&entry.canonical_key)
                .and_then(|f| f.default.clone()),
        };
    }
}

fn rebuild_document(payload: &DocumentPayload) -> Value {
    match payload {
        DocumentPayload::Full { entries, .. } => reconstruct(entries),
        DocumentPayload::Operators { groups } => {
            let mut map = Map::new();
            for group in groups {
                match group {
                    OperatorGroup::Recognized { key, entries, .. } => {
                        map.insert(key.clone(), reconstruct(entries));
                    }
                    OperatorGroup::Passthrough { key, value } => {
                        map.insert(key.clone(), value.clone());
                    }
                }
            }
            Value::Object(map)
        }
    }
}
