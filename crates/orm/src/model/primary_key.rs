//! Primary Key System - values a model's primary key column can hold
//!
//! Supports integer, text and UUID keys with conversion to and from
//! [`DatabaseValue`].

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::backends::DatabaseValue;
use crate::error::{ModelError, ModelResult};

/// Primary key types supported by the ORM
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimaryKey {
    /// Auto-incrementing integer primary key
    Integer(i64),
    /// Natural or generated text key
    Text(String),
    /// UUID primary key
    Uuid(Uuid),
}

impl std::fmt::Display for PrimaryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrimaryKey::Integer(id) => write!(f, "{}", id),
            PrimaryKey::Text(id) => write!(f, "{}", id),
            PrimaryKey::Uuid(id) => write!(f, "{}", id),
        }
    }
}

impl PrimaryKey {
    /// Extract as i64 if this is an Integer primary key
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PrimaryKey::Integer(id) => Some(*id),
            _ => None,
        }
    }

    /// Extract as UUID if this is a UUID primary key
    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            PrimaryKey::Uuid(id) => Some(*id),
            _ => None,
        }
    }

    pub fn to_value(&self) -> DatabaseValue {
        match self {
            PrimaryKey::Integer(id) => DatabaseValue::Int64(*id),
            PrimaryKey::Text(id) => DatabaseValue::String(id.clone()),
            PrimaryKey::Uuid(id) => DatabaseValue::Uuid(*id),
        }
    }

    /// `Ok(None)` for a NULL column
    pub fn from_value(value: DatabaseValue) -> ModelResult<Option<Self>> {
        match value {
            DatabaseValue::Null => Ok(None),
            DatabaseValue::Int32(id) => Ok(Some(PrimaryKey::Integer(i64::from(id)))),
            DatabaseValue::Int64(id) => Ok(Some(PrimaryKey::Integer(id))),
            DatabaseValue::String(id) => Ok(Some(PrimaryKey::Text(id))),
            DatabaseValue::Uuid(id) => Ok(Some(PrimaryKey::Uuid(id))),
            other => Err(ModelError::TypeMismatch {
                expected: "primary key (integer, text or uuid)",
                found: other.type_name().to_string(),
            }),
        }
    }
}

impl From<i64> for PrimaryKey {
    fn from(id: i64) -> Self {
        PrimaryKey::Integer(id)
    }
}

impl From<i32> for PrimaryKey {
    fn from(id: i32) -> Self {
        PrimaryKey::Integer(i64::from(id))
    }
}

impl From<String> for PrimaryKey {
    fn from(id: String) -> Self {
        PrimaryKey::Text(id)
    }
}

impl From<&str> for PrimaryKey {
    fn from(id: &str) -> Self {
        PrimaryKey::Text(id.to_string())
    }
}

impl From<Uuid> for PrimaryKey {
    fn from(id: Uuid) -> Self {
        PrimaryKey::Uuid(id)
    }
}
