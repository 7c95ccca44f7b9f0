//! The application record whose attributes point at stored files.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Attribute name → value.
pub type Attributes = Map<String, Value>;

/// A mutable bag of named attributes.
///
/// The finalization core only reads and writes attributes by key;
/// persistence lives in [`crate::services::record_service::RecordService`].
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Record {
    pub id: Uuid,

    /// Resource (table-like namespace) the record belongs to, e.g. `users`.
    pub resource: String,

    pub attributes: Attributes,

    pub updated_at: DateTime<Utc>,
}

impl Record {
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            resource: resource.into(),
            attributes: Attributes::new(),
            updated_at: Utc::now(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// String value of `name`, or `None` when unset, null, or not a string.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).and_then(Value::as_str)
    }

    /// Set `name`, returning the previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.attributes.insert(name.into(), value.into())
    }

    /// Null out `name`. The key stays present so the change is persisted.
    pub fn clear(&mut self, name: &str) {
        self.attributes.insert(name.to_string(), Value::Null);
    }
}
