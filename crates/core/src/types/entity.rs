//! Untyped content records.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::id::EntityId;

/// Field bag of an entity, without its `id`.
pub type Fields = Map<String, Value>;

/// A record within a collection.
///
/// Collections carry no schema; an entity is an id plus whatever fields the
/// caller stored. It serializes flat, so `{"id": "e1", "title": "Meeting"}`
/// round-trips through an `Entity` unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    #[serde(flatten)]
    pub fields: Fields,
}

impl Entity {
    /// Build an entity, discarding any `id` key inside `fields`.
    ///
    /// The store-assigned id always wins over a submitted one.
    #[must_use]
    pub fn new(id: EntityId, mut fields: Fields) -> Self {
        fields.remove("id");
        Self { id, fields }
    }

    /// Look up a field value.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Look up a string field.
    #[must_use]
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(Value::as_str)
    }

    /// Shallow field-level merge: keys in `partial` overwrite, others are kept.
    pub fn merge(&mut self, partial: Fields) {
        for (key, value) in partial {
            if key != "id" {
                self.fields.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_new_discards_submitted_id() {
        let entity = Entity::new(
            EntityId::new("real"),
            fields(json!({"id": "forged", "title": "Meeting"})),
        );
        assert_eq!(entity.id.as_str(), "real");
        assert!(entity.get("id").is_none());
        assert_eq!(entity.get_str("title"), Some("Meeting"));
    }

    #[test]
    fn test_merge_keeps_untouched_fields() {
        let mut entity = Entity::new(
            EntityId::new("e1"),
            fields(json!({"title": "Meeting", "date": "2025-01-01"})),
        );
        entity.merge(fields(json!({"title": "Meeting 2", "id": "nope"})));
        assert_eq!(entity.get_str("title"), Some("Meeting 2"));
        assert_eq!(entity.get_str("date"), Some("2025-01-01"));
        assert_eq!(entity.id.as_str(), "e1");
    }

    #[test]
    fn test_serializes_flat() {
        let entity = Entity::new(EntityId::new("e1"), fields(json!({"order": 2})));
        let value = serde_json::to_value(&entity).unwrap();
        assert_eq!(value, json!({"id": "e1", "order": 2}));

        let back: Entity = serde_json::from_value(value).unwrap();
        assert_eq!(back, entity);
    }
}
