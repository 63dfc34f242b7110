//! Sort specifications for collection listings.
//!
//! A sort spec is written as a field name, optionally prefixed with `-` for
//! descending order: `"date"` sorts oldest first, `"-date"` newest first.

use core::cmp::Ordering;
use core::fmt;

use serde_json::Value;

use super::entity::Entity;

/// Direction of a [`SortSpec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Errors that can occur when parsing a [`SortSpec`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SortSpecError {
    #[error("sort field cannot be empty")]
    EmptyField,
}

/// Order-by field plus direction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SortSpec {
    field: String,
    direction: SortDirection,
}

impl SortSpec {
    /// Sort by `field`, smallest first.
    #[must_use]
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Ascending,
        }
    }

    /// Sort by `field`, largest first.
    #[must_use]
    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Descending,
        }
    }

    /// Parse `"field"` or `"-field"`.
    ///
    /// # Errors
    ///
    /// Returns `SortSpecError::EmptyField` for `""` or a bare `"-"`.
    pub fn parse(s: &str) -> Result<Self, SortSpecError> {
        let s = s.trim();
        let (field, direction) = s
            .strip_prefix('-')
            .map_or((s, SortDirection::Ascending), |rest| {
                (rest, SortDirection::Descending)
            });

        if field.is_empty() {
            return Err(SortSpecError::EmptyField);
        }

        Ok(Self {
            field: field.to_owned(),
            direction,
        })
    }

    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    #[must_use]
    pub const fn direction(&self) -> SortDirection {
        self.direction
    }

    #[must_use]
    pub const fn is_descending(&self) -> bool {
        matches!(self.direction, SortDirection::Descending)
    }

    /// Compare two entities by this spec's field and direction.
    ///
    /// Entities missing the field sort before those that have it (ascending).
    #[must_use]
    pub fn compare(&self, a: &Entity, b: &Entity) -> Ordering {
        let ordering = if self.field == "id" {
            a.id.cmp(&b.id)
        } else {
            compare_optional(a.get(&self.field), b.get(&self.field))
        };

        match self.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }

    /// Stable in-place sort of a listing.
    pub fn sort(&self, entities: &mut [Entity]) {
        entities.sort_by(|a, b| self.compare(a, b));
    }
}

impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_descending() {
            write!(f, "-{}", self.field)
        } else {
            f.write_str(&self.field)
        }
    }
}

impl std::str::FromStr for SortSpec {
    type Err = SortSpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn compare_optional(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => compare_values(a, b),
    }
}

// null < bool < number < string < array < object
const fn kind_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Number(a), Value::Number(b)) => {
            let a = a.as_f64().unwrap_or(f64::NAN);
            let b = b.as_f64().unwrap_or(f64::NAN);
            a.total_cmp(&b)
        }
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Array(a), Value::Array(b)) => a.len().cmp(&b.len()),
        _ => kind_rank(a).cmp(&kind_rank(b)),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::id::EntityId;
    use serde_json::json;

    fn entity(id: &str, value: Value) -> Entity {
        Entity::new(EntityId::new(id), value.as_object().cloned().unwrap())
    }

    fn ids(entities: &[Entity]) -> Vec<&str> {
        entities.iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn test_parse() {
        let spec = SortSpec::parse("-date").unwrap();
        assert_eq!(spec.field(), "date");
        assert!(spec.is_descending());

        let spec: SortSpec = "order".parse().unwrap();
        assert_eq!(spec.direction(), SortDirection::Ascending);
        assert_eq!(spec.to_string(), "order");

        assert_eq!(SortSpec::parse(""), Err(SortSpecError::EmptyField));
        assert_eq!(SortSpec::parse("-"), Err(SortSpecError::EmptyField));
    }

    #[test]
    fn test_sort_strings_both_directions() {
        let mut events = vec![
            entity("b", json!({"date": "2025-02-01"})),
            entity("a", json!({"date": "2025-01-01"})),
            entity("c", json!({"date": "2025-03-01"})),
        ];

        SortSpec::parse("date").unwrap().sort(&mut events);
        assert_eq!(ids(&events), ["a", "b", "c"]);

        SortSpec::parse("-date").unwrap().sort(&mut events);
        assert_eq!(ids(&events), ["c", "b", "a"]);
    }

    #[test]
    fn test_numbers_compare_numerically() {
        let mut members = vec![
            entity("ten", json!({"order": 10})),
            entity("two", json!({"order": 2})),
            entity("half", json!({"order": 0.5})),
        ];
        SortSpec::ascending("order").sort(&mut members);
        assert_eq!(ids(&members), ["half", "two", "ten"]);
    }

    #[test]
    fn test_missing_field_sorts_first() {
        let mut members = vec![
            entity("ranked", json!({"order": 1})),
            entity("unranked", json!({"name": "x"})),
        ];
        SortSpec::ascending("order").sort(&mut members);
        assert_eq!(ids(&members), ["unranked", "ranked"]);

        SortSpec::descending("order").sort(&mut members);
        assert_eq!(ids(&members), ["ranked", "unranked"]);
    }

    #[test]
    fn test_mixed_kinds_order_by_kind() {
        let mut values = vec![
            entity("object", json!({"v": {"a": 1}})),
            entity("string", json!({"v": "a"})),
            entity("array", json!({"v": [1]})),
            entity("number", json!({"v": 1})),
            entity("bool", json!({"v": true})),
            entity("null", json!({"v": null})),
            entity("missing", json!({})),
        ];
        SortSpec::ascending("v").sort(&mut values);
        assert_eq!(
            ids(&values),
            ["missing", "null", "bool", "number", "string", "array", "object"]
        );
    }

    #[test]
    fn test_sort_is_stable_for_ties() {
        let mut events = vec![
            entity("first", json!({"date": "2025-01-01"})),
            entity("second", json!({"date": "2025-01-01"})),
        ];
        SortSpec::ascending("date").sort(&mut events);
        assert_eq!(ids(&events), ["first", "second"]);
    }
}
