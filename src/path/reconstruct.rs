//! Payload reconstruction
//!
//! Rebuilds a payload object from its entry set by deep-setting each value
//! at its original walk path. Modifier siblings are written back next to the
//! `$each` key they were split from. For any operator-free document P,
//! `reconstruct(deconstruct(P)) == P`.

use serde_json::{Map, Value};

use super::types::EntrySet;

/// Rebuilds a payload object from hydrated entries.
///
/// Entries with cleared values are skipped.
pub fn reconstruct(entries: &EntrySet) -> Value {
    let mut root = Map::new();

    for entry in entries.iter() {
        let Some(value) = &entry.value else { continue };
        deep_set(&mut root, &entry.payload_path, value.clone());

        if let Some(modifiers) = &entry.modifiers {
            for (mod_key, mod_value) in modifiers {
                let mut path = entry.payload_path.clone();
                if path.last().map(|s| s == "$each").unwrap_or(false) {
                    path.pop();
                }
                path.push(mod_key.clone());
                deep_set(&mut root, &path, mod_value.clone());
            }
        }
    }

    Value::Object(root)
}

/// Deep-sets `value` at `path`, creating intermediate objects as needed.
pub fn deep_set(target: &mut Map<String, Value>, path: &[String], value: Value) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };

    let mut current = target;
    for key in parents {
        let slot = current
            .entry(key.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        current = slot.as_object_mut().expect("set to object above");
    }
    current.insert(last.clone(), value);
}

/// Reads the value at `path` in a document, following the original walk
/// keys literally.
pub fn deep_get<'a>(doc: &'a Value, path: &[String]) -> Option<&'a Value> {
    let mut current = doc;
    for key in path {
        current = current.as_object()?.get(key)?;
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::deconstruct;
    use serde_json::json;

    fn round_trip(payload: Value) {
        let set = deconstruct(payload.as_object().unwrap());
        assert_eq!(reconstruct(&set), payload);
    }

    #[test]
    fn test_round_trip_flat() {
        round_trip(json!({"name": "jay", "age": 30, "active": true}));
    }

    #[test]
    fn test_round_trip_nested() {
        round_trip(json!({
            "account": {"name": "jay", "contact": {"email": "j@x.io", "phones": ["1", "2"]}},
            "tags": ["a"]
        }));
    }

    #[test]
    fn test_round_trip_opaque_and_empty_leaves() {
        round_trip(json!({
            "_id": {"$oid": "507f1f77bcf86cd799439011"},
            "meta": {},
            "created": {"$date": "2024-01-01T00:00:00Z"}
        }));
    }

    #[test]
    fn test_round_trip_dotted_keys() {
        round_trip(json!({"account.name": "lrn", "account.friends.0": "sam"}));
    }

    #[test]
    fn test_modifiers_written_back_as_siblings() {
        let payload = json!({
            "friends": {"$each": ["a"], "$slice": 3}
        });
        let set = deconstruct(payload.as_object().unwrap());
        assert_eq!(reconstruct(&set), payload);
    }

    #[test]
    fn test_cleared_entries_skipped() {
        let payload = json!({"a": 1, "b": 2});
        let mut set = deconstruct(payload.as_object().unwrap());
        set.clear_values();
        assert_eq!(reconstruct(&set), json!({}));
    }

    #[test]
    fn test_deep_get_follows_walk_keys() {
        let doc = json!({"account": {"name": "jay"}, "account.email": "flat"});
        assert_eq!(
            deep_get(&doc, &["account".into(), "name".into()]),
            Some(&json!("jay"))
        );
        assert_eq!(
            deep_get(&doc, &["account.email".into()]),
            Some(&json!("flat"))
        );
        assert_eq!(deep_get(&doc, &["missing".into()]), None);
    }
}
