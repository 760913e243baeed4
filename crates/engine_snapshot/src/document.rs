//! The JSON snapshot document.
//!
//! The assembler only composes and decomposes the document structure.
//! Component and resource payloads pass through as [`RawValue`]s and are
//! interpreted by the codecs that own their types.
//!
//! ```json
//! {
//!   "World": { "Entities": [[0,0],[1,0]], "Alive": [1], "Next": 0, "Available": 0 },
//!   "Types": ["game::Position"],
//!   "Components": [ { "game::Position": {"x":1.0,"y":2.0} } ],
//!   "Resources": { "game::Gravity": {"y":-9.8} }
//! }
//! ```

use std::collections::HashSet;
use std::fmt;

use engine_world::EntityDump;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::value::RawValue;

use crate::error::SerdeError;

/// Suffix appended to a relation component's name to form the key of its
/// target pseudo-field.
pub const RELATION_TARGET_SUFFIX: &str = ".ark.relation.Target";

/// Key of the target pseudo-field for relation component `name`.
#[must_use]
pub fn target_key(name: &str) -> String {
    format!("{name}{RELATION_TARGET_SUFFIX}")
}

/// If `key` is a target pseudo-field, returns the owning component's name.
#[must_use]
pub fn target_owner(key: &str) -> Option<&str> {
    key.strip_suffix(RELATION_TARGET_SUFFIX)
}

/// A JSON object of opaque payloads that keeps key order and rejects
/// duplicate keys.
#[derive(Debug, Default, Clone)]
pub struct PayloadMap {
    entries: Vec<(String, Box<RawValue>)>,
}

impl PayloadMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry. Keys are expected to be unique.
    pub fn insert(&mut self, key: impl Into<String>, value: Box<RawValue>) {
        self.entries.push((key.into(), value));
    }

    /// Returns the payload stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&RawValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_ref())
    }

    /// Entries in document order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    /// Keys in document order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for PayloadMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for PayloadMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PayloadVisitor;

        impl<'de> Visitor<'de> for PayloadVisitor {
            type Value = PayloadMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object of payloads keyed by type name")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<PayloadMap, A::Error> {
                let mut map = PayloadMap::new();
                let mut seen = HashSet::new();
                while let Some((key, value)) = access.next_entry::<String, Box<RawValue>>()? {
                    if !seen.insert(key.clone()) {
                        return Err(serde::de::Error::custom(format!("duplicate key {key}")));
                    }
                    map.insert(key, value);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(PayloadVisitor)
    }
}

/// A complete snapshot document.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Document {
    /// Entity pool state. Absent when entities were skipped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub world: Option<EntityDump>,
    /// Names of the component types the records may reference.
    pub types: Vec<String>,
    /// One record per alive entity, aligned with `World.Alive`.
    pub components: Vec<PayloadMap>,
    /// Resource payloads keyed by type name.
    pub resources: PayloadMap,
}

impl Document {
    /// Encode the document as compact JSON.
    ///
    /// # Errors
    ///
    /// Returns [`SerdeError::MalformedDocument`] if the writer fails, which
    /// only happens for payloads that are not valid JSON.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SerdeError> {
        serde_json::to_vec(self).map_err(|e| SerdeError::MalformedDocument(e.to_string()))
    }

    /// Parse a document from JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`SerdeError::MalformedDocument`] on any syntax or structure
    /// error.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, SerdeError> {
        serde_json::from_slice(bytes).map_err(|e| SerdeError::MalformedDocument(e.to_string()))
    }
}
