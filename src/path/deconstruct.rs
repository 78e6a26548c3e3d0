//! Payload deconstruction
//!
//! Flattens a nested document or operator-value object into addressable
//! payload entries. The walk is pure path algebra with no schema knowledge:
//! - a trailing index or `$` placeholder is stripped into the canonical key
//!   and marks the entry as an item-in-array update
//! - plain nested objects recurse; opaque leaf objects (extended-JSON
//!   identifiers, dates) and empty objects do not
//! - `$`-prefixed siblings other than `$each` are split out as modifiers and
//!   attached to the entries the recursion produced

use serde_json::{Map, Value};

use super::types::{EntrySet, Path, PayloadEntry};

/// Extended-JSON keys whose objects are opaque leaves. Recursing into one
/// would corrupt the canonical key.
const OPAQUE_LEAF_KEYS: &[&str] = &[
    "$oid",
    "$date",
    "$numberInt",
    "$numberLong",
    "$numberDouble",
    "$numberDecimal",
    "$binary",
    "$timestamp",
    "$uuid",
];

/// Checks whether a value is an opaque leaf object.
pub fn is_opaque_leaf(value: &Value) -> bool {
    match value {
        Value::Object(map) => {
            map.len() == 1
                && map
                    .keys()
                    .next()
                    .map(|k| OPAQUE_LEAF_KEYS.contains(&k.as_str()))
                    .unwrap_or(false)
        }
        _ => false,
    }
}

/// Deconstructs a payload object into its flattened entry set.
pub fn deconstruct(payload: &Map<String, Value>) -> EntrySet {
    let mut out = EntrySet::new();
    walk(payload, "", &[], false, &mut out);
    out
}

fn walk(
    obj: &Map<String, Value>,
    parent_canonical: &str,
    parent_path: &[String],
    has_parent: bool,
    out: &mut EntrySet,
) {
    for (key, value) in obj {
        let mut payload_path = parent_path.to_vec();
        payload_path.push(key.clone());

        if key == "$each" {
            let mut entry = PayloadEntry::leaf(
                parent_canonical.to_string(),
                payload_path,
                value.clone(),
            );
            entry.is_each = true;
            entry.embedded_field_update = has_parent;
            out.push(entry);
            continue;
        }

        let parsed = Path::parse(key);
        let stripped = parsed.last_is_positional();
        let canonical = join_canonical(parent_canonical, &parsed.canonical());

        let child = match value {
            Value::Object(m) if !stripped && !m.is_empty() && !is_opaque_leaf(value) => Some(m),
            _ => None,
        };

        if let Some(child) = child {
            let (modifiers, rest) = split_modifiers(child);

            if rest.is_empty() {
                // Nothing left to recurse over; keep the original object
                // intact as a leaf.
                let mut entry =
                    PayloadEntry::leaf(canonical, payload_path, value.clone());
                entry.item_in_array = stripped;
                entry.embedded_field_update = has_parent;
                out.push(entry);
                continue;
            }

            let start = out.len();
            walk(&rest, &canonical, &payload_path, true, out);
            if !modifiers.is_empty() {
                for entry in out.tail_mut(start) {
                    entry.modifiers = Some(modifiers.clone());
                }
            }
        } else {
            let mut entry = PayloadEntry::leaf(canonical, payload_path, value.clone());
            entry.item_in_array = stripped;
            entry.embedded_field_update = has_parent;
            out.push(entry);
        }
    }
}

fn join_canonical(parent: &str, child: &str) -> String {
    if parent.is_empty() {
        child.to_string()
    } else if child.is_empty() {
        parent.to_string()
    } else {
        format!("{}.{}", parent, child)
    }
}

/// Splits `$`-prefixed keys other than `$each` out of an object.
fn split_modifiers(obj: &Map<String, Value>) -> (Vec<(String, Value)>, Map<String, Value>) {
    let mut modifiers = Vec::new();
    let mut rest = Map::new();
    for (key, value) in obj {
        if key.starts_with('$') && key != "$each" {
            modifiers.push((key.clone(), value.clone()));
        } else {
            rest.insert(key.clone(), value.clone());
        }
    }
    (modifiers, rest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entries_of(payload: Value) -> EntrySet {
        deconstruct(payload.as_object().unwrap())
    }

    #[test]
    fn test_nested_document_flattens() {
        let set = entries_of(json!({
            "account": {"name": "jay", "email": "j@x.io"},
            "age": 30
        }));

        assert_eq!(set.len(), 3);
        assert!(set.contains_canonical("account.name"));
        assert!(set.contains_canonical("account.email"));
        assert!(set.contains_canonical("age"));

        let name = set.iter().find(|e| e.canonical_key == "account.name").unwrap();
        assert_eq!(name.payload_path, vec!["account".to_string(), "name".to_string()]);
        assert!(name.embedded_field_update);
        assert!(!name.item_in_array);

        let age = set.iter().find(|e| e.canonical_key == "age").unwrap();
        assert!(!age.embedded_field_update);
    }

    #[test]
    fn test_dotted_keys_stay_single_entries() {
        let set = entries_of(json!({"account.name": "lrn"}));

        assert_eq!(set.len(), 1);
        let entry = set.iter().next().unwrap();
        assert_eq!(entry.canonical_key, "account.name");
        assert_eq!(entry.payload_path, vec!["account.name".to_string()]);
        assert!(!entry.embedded_field_update);
    }

    #[test]
    fn test_trailing_index_stripped() {
        let set = entries_of(json!({"account.friends.0": "sam"}));

        let entry = set.iter().next().unwrap();
        assert_eq!(entry.canonical_key, "account.friends");
        assert!(entry.item_in_array);
        assert_eq!(entry.payload_path, vec!["account.friends.0".to_string()]);
    }

    #[test]
    fn test_positional_placeholder_stripped() {
        let set = entries_of(json!({"friends.$": {"name": "sam"}}));

        let entry = set.iter().next().unwrap();
        assert_eq!(entry.canonical_key, "friends");
        assert!(entry.item_in_array);
        // Positional values stay leaves even when they are objects.
        assert_eq!(entry.value, Some(json!({"name": "sam"})));
    }

    #[test]
    fn test_each_with_modifier_siblings() {
        let set = entries_of(json!({
            "friends": {"$each": ["a", "b"], "$slice": 3, "$position": 0}
        }));

        assert_eq!(set.len(), 1);
        let entry = set.iter().next().unwrap();
        assert_eq!(entry.canonical_key, "friends");
        assert!(entry.is_each);
        assert_eq!(entry.value, Some(json!(["a", "b"])));
        assert_eq!(
            entry.payload_path,
            vec!["friends".to_string(), "$each".to_string()]
        );

        let mods = entry.modifiers.as_ref().unwrap();
        assert_eq!(mods.len(), 2);
        assert!(mods.contains(&("$slice".to_string(), json!(3))));
        assert!(mods.contains(&("$position".to_string(), json!(0))));
    }

    #[test]
    fn test_operator_only_object_stays_leaf() {
        let set = entries_of(json!({"age": {"$gt": 5}}));

        assert_eq!(set.len(), 1);
        let entry = set.iter().next().unwrap();
        assert_eq!(entry.canonical_key, "age");
        assert_eq!(entry.value, Some(json!({"$gt": 5})));
    }

    #[test]
    fn test_opaque_leaves_do_not_recurse() {
        let set = entries_of(json!({
            "_id": {"$oid": "507f1f77bcf86cd799439011"},
            "created": {"$date": "2024-01-01T00:00:00Z"}
        }));

        assert_eq!(set.len(), 2);
        assert!(set.contains_canonical("_id"));
        assert!(set.contains_canonical("created"));

        let id = set.iter().find(|e| e.canonical_key == "_id").unwrap();
        assert_eq!(id.value, Some(json!({"$oid": "507f1f77bcf86cd799439011"})));
    }

    #[test]
    fn test_empty_object_is_a_leaf() {
        let set = entries_of(json!({"meta": {}}));

        assert_eq!(set.len(), 1);
        assert_eq!(set.iter().next().unwrap().value, Some(json!({})));
    }

    #[test]
    fn test_arrays_are_leaves() {
        let set = entries_of(json!({"tags": ["a", "b"], "friends": [{"name": "x"}]}));

        assert_eq!(set.len(), 2);
        let friends = set.iter().find(|e| e.canonical_key == "friends").unwrap();
        assert_eq!(friends.value, Some(json!([{"name": "x"}])));
    }
}
