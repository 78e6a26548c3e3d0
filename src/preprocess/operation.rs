//! Closed operation model
//!
//! Every preprocessing call routes through this enum; there is no dynamic
//! interception of method names. Each operation knows where its payload and
//! options sit in the driver's positional argument list.

use serde_json::Value;

use crate::schema::is_object_id;

/// The write operations the engine preprocesses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Insert one document or a list of documents: `[docs, options?]`
    Insert,
    /// Update by query: `[query, update, options?]`
    Update,
    /// Insert-or-replace by identifier: `[doc, options?]`
    Save,
    /// Find and modify: `[query, sort, update, options?]`
    FindAndModify,
}

impl Operation {
    /// Operation name as drivers spell it
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Insert => "insert",
            Operation::Update => "update",
            Operation::Save => "save",
            Operation::FindAndModify => "findAndModify",
        }
    }

    /// Parses a driver operation name.
    pub fn parse(name: &str) -> Option<Operation> {
        match name {
            "insert" => Some(Operation::Insert),
            "update" => Some(Operation::Update),
            "save" => Some(Operation::Save),
            "findAndModify" => Some(Operation::FindAndModify),
            _ => None,
        }
    }

    /// Position of the document payload in the argument list.
    pub fn payload_position(&self) -> usize {
        match self {
            Operation::Insert | Operation::Save => 0,
            Operation::Update => 1,
            Operation::FindAndModify => 2,
        }
    }

    /// Position of the options object, if the operation takes one.
    pub fn options_position(&self) -> usize {
        match self {
            Operation::Insert | Operation::Save => 1,
            Operation::Update => 2,
            Operation::FindAndModify => 3,
        }
    }

    /// Whether this call may insert when no document matches.
    ///
    /// Update and findAndModify read their options argument; save is an
    /// upsert exactly when the document carries a store-native identifier.
    pub fn is_upsert(&self, args: &[Value]) -> bool {
        match self {
            Operation::Insert => false,
            Operation::Update | Operation::FindAndModify => args
                .get(self.options_position())
                .and_then(|o| o.get("upsert"))
                .and_then(Value::as_bool)
                .unwrap_or(false),
            Operation::Save => args
                .first()
                .and_then(|d| d.get("_id"))
                .map(is_object_id)
                .unwrap_or(false),
        }
    }

    /// The query half of the call, if the operation has one.
    ///
    /// Save synthesizes an identifier query from the document itself.
    pub fn query(&self, args: &[Value]) -> Option<Value> {
        match self {
            Operation::Insert => None,
            Operation::Update | Operation::FindAndModify => args.first().cloned(),
            Operation::Save => {
                let id = args.first().and_then(|d| d.get("_id"))?;
                if is_object_id(id) {
                    let mut query = serde_json::Map::new();
                    query.insert("_id".to_string(), id.clone());
                    Some(Value::Object(query))
                } else {
                    None
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_known_names() {
        assert_eq!(Operation::parse("insert"), Some(Operation::Insert));
        assert_eq!(Operation::parse("update"), Some(Operation::Update));
        assert_eq!(Operation::parse("save"), Some(Operation::Save));
        assert_eq!(Operation::parse("findAndModify"), Some(Operation::FindAndModify));
        assert_eq!(Operation::parse("aggregate"), None);
    }

    #[test]
    fn test_round_trips_names() {
        for op in [
            Operation::Insert,
            Operation::Update,
            Operation::Save,
            Operation::FindAndModify,
        ] {
            assert_eq!(Operation::parse(op.name()), Some(op));
        }
    }

    #[test]
    fn test_update_upsert_from_options() {
        let args = vec![json!({}), json!({"$set": {"a": 1}}), json!({"upsert": true})];
        assert!(Operation::Update.is_upsert(&args));

        let args = vec![json!({}), json!({"$set": {"a": 1}})];
        assert!(!Operation::Update.is_upsert(&args));
    }

    #[test]
    fn test_find_and_modify_upsert_from_options() {
        let args = vec![
            json!({}),
            json!({}),
            json!({"$set": {"a": 1}}),
            json!({"upsert": true}),
        ];
        assert!(Operation::FindAndModify.is_upsert(&args));
    }

    #[test]
    fn test_save_upsert_requires_identifier() {
        let with_id = vec![json!({"_id": "507f1f77bcf86cd799439011", "name": "x"})];
        assert!(Operation::Save.is_upsert(&with_id));
        assert_eq!(
            Operation::Save.query(&with_id),
            Some(json!({"_id": "507f1f77bcf86cd799439011"}))
        );

        let without = vec![json!({"name": "x"})];
        assert!(!Operation::Save.is_upsert(&without));
        assert_eq!(Operation::Save.query(&without), None);
    }
}
