//! Error types for the ORM system
//!
//! A single error enum covers driver failures, persistence contract violations
//! and programming errors. Only driver failures are ever converted into a
//! boolean by [`crate::Persistence::save`]; everything else propagates.

/// Result type alias for model operations
pub type ModelResult<T> = Result<T, ModelError>;

/// Error types for ORM operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    /// Statement execution failed inside the driver
    #[error("Database error: {0}")]
    Database(String),

    /// Begin, commit or rollback failed
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Connection pool error
    #[error("Connection error: {0}")]
    Connection(String),

    /// The post-insert fetch did not return exactly one row
    #[error("Expected exactly one freshly inserted row in '{table}', found {found}")]
    ReconciliationCardinality { table: String, found: usize },

    /// The freshly inserted row carried no usable primary key
    #[error("Freshly inserted row in '{table}' has no value for primary key '{primary_key}'")]
    UnreconciledPrimaryKey { table: String, primary_key: String },

    /// A custom insert/update capability produced unusable SQL or bindings
    #[error("Custom {operation} on '{table}' is malformed: {reason}")]
    CapabilityMisuse {
        operation: &'static str,
        table: String,
        reason: String,
    },

    /// A field name that the model's registry does not know
    #[error("Unknown field '{field}' on model '{model}'")]
    UnknownField { model: String, field: String },

    /// A setter received a value of the wrong shape
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: &'static str, found: String },

    /// Primary key is missing or invalid
    #[error("Primary key is missing or invalid")]
    MissingPrimaryKey,

    /// Model not found in database
    #[error("Record not found in table '{0}'")]
    NotFound(String),

    /// Query building error
    #[error("Query error: {0}")]
    Query(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ModelError {
    /// Whether the error came out of the driver rather than from the caller's code.
    pub fn is_driver_failure(&self) -> bool {
        matches!(
            self,
            ModelError::Database(_) | ModelError::Transaction(_) | ModelError::Connection(_)
        )
    }

    pub(crate) fn unknown_field(model: &str, field: &str) -> Self {
        ModelError::UnknownField {
            model: model.to_string(),
            field: field.to_string(),
        }
    }
}

// Convert from sqlx errors
impl From<sqlx::Error> for ModelError {
    fn from(err: sqlx::Error) -> Self {
        ModelError::Database(err.to_string())
    }
}

// Convert from serde_json errors
impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        ModelError::Serialization(err.to_string())
    }
}
