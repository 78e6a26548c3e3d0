//! Path segments and payload entries
//!
//! A dotted key like `account.friends.0` parses into tagged segments; the
//! canonical form keeps named segments only. Payload entries remember the
//! original keys they were walked from, so reconstruction is exact.

use serde_json::Value;

/// One segment of a dotted path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// A field name
    Name(String),
    /// A numeric array index
    Index(usize),
    /// The positional placeholder `$`
    Placeholder,
}

impl Segment {
    /// Parses a raw segment string.
    pub fn parse(raw: &str) -> Segment {
        if raw == "$" {
            Segment::Placeholder
        } else if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
            Segment::Index(raw.parse().unwrap_or(0))
        } else {
            Segment::Name(raw.to_string())
        }
    }

    /// Whether this segment addresses an array position.
    pub fn is_positional(&self) -> bool {
        matches!(self, Segment::Index(_) | Segment::Placeholder)
    }
}

/// An ordered list of path segments
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Path {
    segments: Vec<Segment>,
}

impl Path {
    /// Parses a dotted key into segments.
    pub fn parse(dotted: &str) -> Path {
        Path {
            segments: dotted.split('.').map(Segment::parse).collect(),
        }
    }

    /// Returns the segments.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Number of segments.
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Canonical dotted form: named segments only, indices and placeholders
    /// stripped.
    pub fn canonical(&self) -> String {
        let names: Vec<&str> = self
            .segments
            .iter()
            .filter_map(|s| match s {
                Segment::Name(n) => Some(n.as_str()),
                _ => None,
            })
            .collect();
        names.join(".")
    }

    /// Whether the final segment addresses an array position.
    pub fn last_is_positional(&self) -> bool {
        self.segments.last().map_or(false, Segment::is_positional)
    }
}

/// One flattened field occurrence in a payload
///
/// Created by deconstruction, mutated in place by the validator/transform
/// chains, consumed by reconstruction. When a preprocessor is cached the
/// values are cleared and the paths retained for rehydration.
#[derive(Debug, Clone)]
pub struct PayloadEntry {
    /// Schema path with indices and placeholders stripped
    pub canonical_key: String,
    /// Original walk keys, preserved for exact reconstruction
    pub payload_path: Vec<String>,
    /// Current value; `None` once cleared for caching
    pub value: Option<Value>,
    /// Emitted from a `$each` key
    pub is_each: bool,
    /// The original key addressed one array element
    pub item_in_array: bool,
    /// Addressed by dotted path rather than replacing its parent
    pub embedded_field_update: bool,
    /// Non-`$each` operator siblings split out of an array-update value
    pub modifiers: Option<Vec<(String, Value)>>,
    /// Filled from the schema default rather than the payload
    pub from_default: bool,
    /// Canonical key not present in the schema table
    pub unknown: bool,
}

impl PayloadEntry {
    /// Creates a leaf entry at the given canonical key and walk path.
    pub fn leaf(canonical_key: String, payload_path: Vec<String>, value: Value) -> Self {
        Self {
            canonical_key,
            payload_path,
            value: Some(value),
            is_each: false,
            item_in_array: false,
            embedded_field_update: false,
            modifiers: None,
            from_default: false,
            unknown: false,
        }
    }
}

/// The ordered set of payload entries for one document
#[derive(Debug, Clone, Default)]
pub struct EntrySet {
    entries: Vec<PayloadEntry>,
}

impl EntrySet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry.
    pub fn push(&mut self, entry: PayloadEntry) {
        self.entries.push(entry);
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in payload order.
    pub fn iter(&self) -> impl Iterator<Item = &PayloadEntry> {
        self.entries.iter()
    }

    /// Iterates entries mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut PayloadEntry> {
        self.entries.iter_mut()
    }

    /// Whether any entry resolves to the given canonical key.
    pub fn contains_canonical(&self, canonical: &str) -> bool {
        self.entries.iter().any(|e| e.canonical_key == canonical)
    }

    /// Mutable slice starting at `from`, for attaching modifiers to the
    /// entries a recursion produced.
    pub(crate) fn tail_mut(&mut self, from: usize) -> &mut [PayloadEntry] {
        &mut self.entries[from..]
    }

    /// Clears every entry's value, retaining paths and flags.
    pub fn clear_values(&mut self) {
        for entry in &mut self.entries {
            entry.value = None;
        }
    }
}
