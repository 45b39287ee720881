//! Core Database Driver Traits
//!
//! This module defines the values that travel between models and the database,
//! the row shape drivers hand back, and the driver traits the persistence engine
//! talks to. Concrete drivers (see [`super::postgres`]) implement these traits;
//! the engine never depends on a specific database.

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::binding::Bindings;
use crate::error::{ModelError, ModelResult};

/// Abstract database driver
#[async_trait]
pub trait Driver: Send + Sync {
    /// Begin a transaction; every write of a save runs inside one
    async fn begin(&self) -> ModelResult<Box<dyn DriverTransaction>>;

    /// Run a SELECT with named bindings and return all rows
    async fn fetch_all(&self, sql: &str, bindings: &Bindings) -> ModelResult<Vec<Row>>;

    /// Fetch the row most recently inserted into `table`
    ///
    /// The persistence engine expects exactly one row back.
    async fn last_inserted_row(&self, table: &str, primary_key: &str) -> ModelResult<Vec<Row>>;
}

/// Abstract database transaction
///
/// A statement is staged with [`sql`](Self::sql), values are attached with
/// [`bind_value`](Self::bind_value), and [`execute`](Self::execute) runs it.
#[async_trait]
pub trait DriverTransaction: Send {
    /// Stage the statement to execute next
    fn sql(&mut self, statement: &str);

    /// Attach a value to a named placeholder of the staged statement
    fn bind_value(&mut self, placeholder: &str, value: DatabaseValue, kind: ParamKind);

    /// Execute the staged statement and return affected rows count
    async fn execute(&mut self) -> ModelResult<u64>;

    /// Commit the transaction
    async fn commit(self: Box<Self>) -> ModelResult<()>;

    /// Rollback the transaction
    async fn rollback(self: Box<Self>) -> ModelResult<()>;
}

/// SQL parameter kind attached to every binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ParamKind {
    #[default]
    String,
    Int,
    Bool,
    Null,
    /// Driver-specific type name
    Custom(&'static str),
}

impl ParamKind {
    /// Kind inferred from the shape of a value
    pub fn for_value(value: &DatabaseValue) -> Self {
        match value {
            DatabaseValue::Null => ParamKind::Null,
            DatabaseValue::Bool(_) => ParamKind::Bool,
            DatabaseValue::Int32(_) | DatabaseValue::Int64(_) => ParamKind::Int,
            _ => ParamKind::String,
        }
    }
}

/// Database value enumeration for type-safe parameter binding
#[derive(Debug, Clone, PartialEq)]
pub enum DatabaseValue {
    Null,
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Float64(f64),
    String(String),
    Bytes(Vec<u8>),
    Uuid(uuid::Uuid),
    DateTime(chrono::DateTime<chrono::Utc>),
    Date(chrono::NaiveDate),
    Json(JsonValue),
}

impl DatabaseValue {
    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, DatabaseValue::Null)
    }

    /// Short name of the variant, used in mismatch errors
    pub fn type_name(&self) -> &'static str {
        match self {
            DatabaseValue::Null => "null",
            DatabaseValue::Bool(_) => "bool",
            DatabaseValue::Int32(_) => "int32",
            DatabaseValue::Int64(_) => "int64",
            DatabaseValue::Float64(_) => "float64",
            DatabaseValue::String(_) => "string",
            DatabaseValue::Bytes(_) => "bytes",
            DatabaseValue::Uuid(_) => "uuid",
            DatabaseValue::DateTime(_) => "datetime",
            DatabaseValue::Date(_) => "date",
            DatabaseValue::Json(_) => "json",
        }
    }

    /// Convert into a typed Rust value
    pub fn extract<T: FromDatabaseValue>(self) -> ModelResult<T> {
        T::from_database_value(self)
    }

    /// Convert to JSON value
    pub fn to_json(&self) -> JsonValue {
        match self {
            DatabaseValue::Null => JsonValue::Null,
            DatabaseValue::Bool(b) => JsonValue::Bool(*b),
            DatabaseValue::Int32(i) => JsonValue::from(*i),
            DatabaseValue::Int64(i) => JsonValue::from(*i),
            DatabaseValue::Float64(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            DatabaseValue::String(s) => JsonValue::String(s.clone()),
            DatabaseValue::Bytes(b) => JsonValue::Array(b.iter().map(|&x| JsonValue::from(x)).collect()),
            DatabaseValue::Uuid(u) => JsonValue::String(u.to_string()),
            DatabaseValue::DateTime(dt) => JsonValue::String(dt.to_rfc3339()),
            DatabaseValue::Date(d) => JsonValue::String(d.to_string()),
            DatabaseValue::Json(j) => j.clone(),
        }
    }
}

impl From<bool> for DatabaseValue {
    fn from(value: bool) -> Self {
        DatabaseValue::Bool(value)
    }
}

impl From<i32> for DatabaseValue {
    fn from(value: i32) -> Self {
        DatabaseValue::Int32(value)
    }
}

impl From<i64> for DatabaseValue {
    fn from(value: i64) -> Self {
        DatabaseValue::Int64(value)
    }
}

impl From<f64> for DatabaseValue {
    fn from(value: f64) -> Self {
        DatabaseValue::Float64(value)
    }
}

impl From<String> for DatabaseValue {
    fn from(value: String) -> Self {
        DatabaseValue::String(value)
    }
}

impl From<&str> for DatabaseValue {
    fn from(value: &str) -> Self {
        DatabaseValue::String(value.to_string())
    }
}

impl From<Vec<u8>> for DatabaseValue {
    fn from(value: Vec<u8>) -> Self {
        DatabaseValue::Bytes(value)
    }
}

impl From<uuid::Uuid> for DatabaseValue {
    fn from(value: uuid::Uuid) -> Self {
        DatabaseValue::Uuid(value)
    }
}

impl From<chrono::DateTime<chrono::Utc>> for DatabaseValue {
    fn from(value: chrono::DateTime<chrono::Utc>) -> Self {
        DatabaseValue::DateTime(value)
    }
}

impl From<chrono::NaiveDate> for DatabaseValue {
    fn from(value: chrono::NaiveDate) -> Self {
        DatabaseValue::Date(value)
    }
}

impl From<JsonValue> for DatabaseValue {
    fn from(value: JsonValue) -> Self {
        DatabaseValue::Json(value)
    }
}

impl<T> From<Option<T>> for DatabaseValue
where
    T: Into<DatabaseValue>,
{
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => DatabaseValue::Null,
        }
    }
}

/// Conversion out of a [`DatabaseValue`], used by field setters
pub trait FromDatabaseValue: Sized {
    fn from_database_value(value: DatabaseValue) -> ModelResult<Self>;
}

fn mismatch(expected: &'static str, value: &DatabaseValue) -> ModelError {
    ModelError::TypeMismatch {
        expected,
        found: value.type_name().to_string(),
    }
}

impl FromDatabaseValue for DatabaseValue {
    fn from_database_value(value: DatabaseValue) -> ModelResult<Self> {
        Ok(value)
    }
}

impl FromDatabaseValue for String {
    fn from_database_value(value: DatabaseValue) -> ModelResult<Self> {
        match value {
            DatabaseValue::String(s) => Ok(s),
            DatabaseValue::Uuid(u) => Ok(u.to_string()),
            other => Err(mismatch("string", &other)),
        }
    }
}

impl FromDatabaseValue for i64 {
    fn from_database_value(value: DatabaseValue) -> ModelResult<Self> {
        match value {
            DatabaseValue::Int64(i) => Ok(i),
            DatabaseValue::Int32(i) => Ok(i64::from(i)),
            other => Err(mismatch("int64", &other)),
        }
    }
}

impl FromDatabaseValue for i32 {
    fn from_database_value(value: DatabaseValue) -> ModelResult<Self> {
        match value {
            DatabaseValue::Int32(i) => Ok(i),
            DatabaseValue::Int64(i) => i32::try_from(i).map_err(|_| ModelError::TypeMismatch {
                expected: "int32",
                found: format!("int64 {} out of range", i),
            }),
            other => Err(mismatch("int32", &other)),
        }
    }
}

impl FromDatabaseValue for f64 {
    fn from_database_value(value: DatabaseValue) -> ModelResult<Self> {
        match value {
            DatabaseValue::Float64(f) => Ok(f),
            DatabaseValue::Int32(i) => Ok(f64::from(i)),
            other => Err(mismatch("float64", &other)),
        }
    }
}

impl FromDatabaseValue for bool {
    fn from_database_value(value: DatabaseValue) -> ModelResult<Self> {
        match value {
            DatabaseValue::Bool(b) => Ok(b),
            DatabaseValue::Int32(i) => Ok(i != 0),
            DatabaseValue::Int64(i) => Ok(i != 0),
            other => Err(mismatch("bool", &other)),
        }
    }
}

impl FromDatabaseValue for uuid::Uuid {
    fn from_database_value(value: DatabaseValue) -> ModelResult<Self> {
        match value {
            DatabaseValue::Uuid(u) => Ok(u),
            DatabaseValue::String(s) => uuid::Uuid::parse_str(&s).map_err(|e| ModelError::TypeMismatch {
                expected: "uuid",
                found: format!("string '{}' ({})", s, e),
            }),
            other => Err(mismatch("uuid", &other)),
        }
    }
}

impl FromDatabaseValue for chrono::DateTime<chrono::Utc> {
    fn from_database_value(value: DatabaseValue) -> ModelResult<Self> {
        match value {
            DatabaseValue::DateTime(dt) => Ok(dt),
            other => Err(mismatch("datetime", &other)),
        }
    }
}

impl FromDatabaseValue for JsonValue {
    fn from_database_value(value: DatabaseValue) -> ModelResult<Self> {
        Ok(value.to_json())
    }
}

impl<T: FromDatabaseValue> FromDatabaseValue for Option<T> {
    fn from_database_value(value: DatabaseValue) -> ModelResult<Self> {
        match value {
            DatabaseValue::Null => Ok(None),
            other => T::from_database_value(other).map(Some),
        }
    }
}

/// A result row, columns in the order the database returned them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, DatabaseValue)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style column append
    pub fn with(mut self, column: impl Into<String>, value: impl Into<DatabaseValue>) -> Self {
        self.push(column, value);
        self
    }

    pub fn push(&mut self, column: impl Into<String>, value: impl Into<DatabaseValue>) {
        self.columns.push((column.into(), value.into()));
    }

    /// Get a column value by name
    pub fn get(&self, column: &str) -> Option<&DatabaseValue> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Get column names
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DatabaseValue)> {
        self.columns.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Convert row to JSON object
    pub fn to_json(&self) -> JsonValue {
        let map = self
            .columns
            .iter()
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect::<serde_json::Map<_, _>>();
        JsonValue::Object(map)
    }
}

impl IntoIterator for Row {
    type Item = (String, DatabaseValue);
    type IntoIter = std::vec::IntoIter<(String, DatabaseValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.into_iter()
    }
}

impl<K: Into<String>, V: Into<DatabaseValue>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            columns: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_kind_inference() {
        assert_eq!(ParamKind::for_value(&DatabaseValue::Null), ParamKind::Null);
        assert_eq!(ParamKind::for_value(&true.into()), ParamKind::Bool);
        assert_eq!(ParamKind::for_value(&7i64.into()), ParamKind::Int);
        assert_eq!(ParamKind::for_value(&7i32.into()), ParamKind::Int);
        assert_eq!(ParamKind::for_value(&"Ann".into()), ParamKind::String);
        assert_eq!(ParamKind::for_value(&1.5f64.into()), ParamKind::String);
        assert_eq!(ParamKind::default(), ParamKind::String);
    }

    #[test]
    fn test_extract_conversions() {
        assert_eq!(DatabaseValue::Int32(7).extract::<i64>().unwrap(), 7);
        assert_eq!(DatabaseValue::Int64(7).extract::<i32>().unwrap(), 7);
        assert_eq!(
            DatabaseValue::String("Ann".into()).extract::<String>().unwrap(),
            "Ann"
        );
        assert_eq!(DatabaseValue::Null.extract::<Option<String>>().unwrap(), None);
        assert_eq!(
            DatabaseValue::Int64(3).extract::<Option<i64>>().unwrap(),
            Some(3)
        );
    }

    #[test]
    fn test_extract_mismatch() {
        let err = DatabaseValue::Bool(true).extract::<String>().unwrap_err();
        assert_eq!(
            err,
            ModelError::TypeMismatch {
                expected: "string",
                found: "bool".into()
            }
        );

        let err = DatabaseValue::Int64(i64::MAX).extract::<i32>().unwrap_err();
        assert!(matches!(err, ModelError::TypeMismatch { expected: "int32", .. }));
    }

    #[test]
    fn test_row_access() {
        let row = Row::new().with("id", 7i64).with("name", "Ann");

        assert_eq!(row.len(), 2);
        assert_eq!(row.get("id"), Some(&DatabaseValue::Int64(7)));
        assert_eq!(row.get("missing"), None);
        assert_eq!(row.column_names().collect::<Vec<_>>(), vec!["id", "name"]);
        assert_eq!(row.to_json(), serde_json::json!({"id": 7, "name": "Ann"}));
    }
}
