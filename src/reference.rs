//! The external reference handle returned by save and consumed by load.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::ValidationError;

/// A lightweight handle to an externally stored value.
///
/// Serializes as `{"class_name": "...", "id": "<uuid>"}`. Equality is
/// structural; two equal references name the same stored record, but a
/// reference never implies the record is unchanged (records are mutable
/// via upsert).
///
/// # Examples
///
/// ```
/// use exostore::ExternalReference;
/// use uuid::Uuid;
///
/// let id = Uuid::new_v4();
/// let reference = ExternalReference::new("User", id);
/// assert_eq!(reference.class_name, "User");
///
/// let json = serde_json::to_value(&reference).unwrap();
/// assert!(exostore::ExternalReference::is_reference(&json));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExternalReference {
    /// Canonical name of the stored type.
    pub class_name: String,

    /// Random unique identifier assigned at save time.
    pub id: Uuid,
}

impl ExternalReference {
    /// Creates a reference from a class name and id.
    pub fn new(class_name: impl Into<String>, id: Uuid) -> Self {
        Self {
            class_name: class_name.into(),
            id,
        }
    }

    /// Returns true iff `value` has the external reference shape.
    ///
    /// A reference is a JSON object with exactly the keys `class_name` and
    /// `id`, both strings, where `id` parses as a UUID. Used to tell "this
    /// is a reference to fetch" from "this is inline data" at boundaries
    /// that accept either.
    pub fn is_reference(value: &Value) -> bool {
        let Some(map) = value.as_object() else {
            return false;
        };
        if map.len() != 2 {
            return false;
        }
        let (Some(class_name), Some(id)) = (map.get("class_name"), map.get("id")) else {
            return false;
        };
        if !class_name.is_string() {
            return false;
        }
        id.as_str().is_some_and(|s| Uuid::parse_str(s).is_ok())
    }
}

impl fmt::Display for ExternalReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.class_name, self.id)
    }
}

impl TryFrom<&Value> for ExternalReference {
    type Error = ValidationError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        let invalid = |message: &str| ValidationError::InvalidReference {
            message: message.to_string(),
        };

        let map = value.as_object().ok_or_else(|| invalid("not a JSON object"))?;
        let class_name = map
            .get("class_name")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("class_name must be a string"))?;
        let id_str = map
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("id must be a string"))?;
        let id = Uuid::parse_str(id_str).map_err(|_| ValidationError::InvalidReference {
            message: format!("invalid UUID format: {}", id_str),
        })?;

        Ok(ExternalReference::new(class_name, id))
    }
}
