//! Custom INSERT / UPDATE capabilities
//!
//! A model that needs hand-written SQL implements [`CustomInsert`] and/or
//! [`CustomUpdate`] and exposes it through [`crate::Model::as_custom_insert`] /
//! [`crate::Model::as_custom_update`]. The engine then sends that SQL and those
//! bindings verbatim instead of generating its own.
//!
//! ```ignore
//! impl CustomInsert for User {
//!     fn insert_statement(&self) -> String {
//!         "INSERT INTO users(name, surname) VALUES (:name, :surname);".into()
//!     }
//!
//!     fn insert_bindings(&self) -> Vec<(String, DatabaseValue)> {
//!         vec![
//!             (":name".into(), self.name.clone().into()),
//!             (":surname".into(), self.surname.clone().into()),
//!         ]
//!     }
//! }
//! ```

use crate::backends::DatabaseValue;
use crate::binding::{normalize_placeholder, placeholders_in, Bindings};
use crate::error::{ModelError, ModelResult};

/// Model-supplied INSERT statement
pub trait CustomInsert: Send + Sync {
    fn insert_statement(&self) -> String;

    /// Placeholder → value, in bind order
    fn insert_bindings(&self) -> Vec<(String, DatabaseValue)>;
}

/// Model-supplied UPDATE statement
pub trait CustomUpdate: Send + Sync {
    fn update_statement(&self) -> String;

    /// Placeholder → value, in bind order
    fn update_bindings(&self) -> Vec<(String, DatabaseValue)>;
}

/// A custom statement that passed validation
#[derive(Debug, Clone)]
pub(crate) struct CustomStatement {
    pub sql: String,
    pub bindings: Bindings,
}

impl CustomStatement {
    pub(crate) fn from_insert(table: &str, custom: &dyn CustomInsert) -> ModelResult<Self> {
        Self::validate("insert", table, custom.insert_statement(), custom.insert_bindings())
    }

    pub(crate) fn from_update(table: &str, custom: &dyn CustomUpdate) -> ModelResult<Self> {
        Self::validate("update", table, custom.update_statement(), custom.update_bindings())
    }

    /// The statement must be non-empty and its placeholders must match the
    /// binding keys exactly.
    fn validate(
        operation: &'static str,
        table: &str,
        sql: String,
        raw: Vec<(String, DatabaseValue)>,
    ) -> ModelResult<Self> {
        let misuse = |reason: String| ModelError::CapabilityMisuse {
            operation,
            table: table.to_string(),
            reason,
        };

        if sql.trim().is_empty() {
            return Err(misuse("statement is empty".to_string()));
        }

        let mut bindings = Bindings::new();
        for (placeholder, value) in raw {
            let placeholder = normalize_placeholder(&placeholder);
            if bindings.contains(&placeholder) {
                return Err(misuse(format!("placeholder {} is bound twice", placeholder)));
            }
            bindings.bind_inferred(placeholder, value);
        }

        let expected = placeholders_in(&sql);
        let unbound: Vec<&str> = expected
            .iter()
            .map(String::as_str)
            .filter(|p| !bindings.contains(p))
            .collect();
        if !unbound.is_empty() {
            return Err(misuse(format!("unbound placeholders {}", unbound.join(", "))));
        }

        let unused: Vec<&str> = bindings
            .placeholders()
            .filter(|p| !expected.iter().any(|e| e == p))
            .collect();
        if !unused.is_empty() {
            return Err(misuse(format!(
                "bindings without a placeholder in the statement {}",
                unused.join(", ")
            )));
        }

        Ok(Self { sql, bindings })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::ParamKind;

    struct Insert {
        sql: &'static str,
        bindings: Vec<(&'static str, DatabaseValue)>,
    }

    impl CustomInsert for Insert {
        fn insert_statement(&self) -> String {
            self.sql.to_string()
        }

        fn insert_bindings(&self) -> Vec<(String, DatabaseValue)> {
            self.bindings
                .iter()
                .map(|(p, v)| (p.to_string(), v.clone()))
                .collect()
        }
    }

    #[test]
    fn test_valid_custom_insert() {
        let custom = Insert {
            sql: "INSERT INTO users(name, age) VALUES (:name, :age);",
            bindings: vec![(":name", "Ann".into()), ("age", 30i64.into())],
        };

        let statement = CustomStatement::from_insert("users", &custom).unwrap();
        assert_eq!(statement.sql, custom.sql);
        assert_eq!(
            statement.bindings.placeholders().collect::<Vec<_>>(),
            vec![":name", ":age"]
        );
        assert_eq!(
            statement.bindings.get(":age").map(|e| e.kind),
            Some(ParamKind::Int)
        );
    }

    #[test]
    fn test_empty_statement_is_misuse() {
        let custom = Insert {
            sql: "   ",
            bindings: vec![],
        };

        let err = CustomStatement::from_insert("users", &custom).unwrap_err();
        assert!(matches!(
            err,
            ModelError::CapabilityMisuse { operation: "insert", .. }
        ));
    }

    #[test]
    fn test_unbound_placeholder_is_misuse() {
        let custom = Insert {
            sql: "INSERT INTO users(name, surname) VALUES (:name, :surname)",
            bindings: vec![(":name", "Ann".into())],
        };

        let err = CustomStatement::from_insert("users", &custom).unwrap_err();
        match err {
            ModelError::CapabilityMisuse { reason, .. } => assert!(reason.contains(":surname")),
            other => panic!("Expected capability misuse, got {:?}", other),
        }
    }

    #[test]
    fn test_extra_binding_is_misuse() {
        let custom = Insert {
            sql: "INSERT INTO users(name) VALUES (:name)",
            bindings: vec![(":name", "Ann".into()), (":surname", "Lee".into())],
        };

        let err = CustomStatement::from_insert("users", &custom).unwrap_err();
        assert!(err.to_string().contains(":surname"));
    }

    #[test]
    fn test_duplicate_binding_is_misuse() {
        let custom = Insert {
            sql: "INSERT INTO users(name) VALUES (:name)",
            bindings: vec![(":name", "Ann".into()), ("name", "Bea".into())],
        };

        assert!(CustomStatement::from_insert("users", &custom).is_err());
    }
}
