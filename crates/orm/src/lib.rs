//! # micro-orm: Change-tracking ORM for PostgreSQL
//!
//! Models are plain structs that embed a [`ModelState`] and describe their
//! columns through [`Model::fields`]. Assignments are tracked as pending
//! changes; [`Persistence::save`] turns them into one transactional INSERT or
//! UPDATE, notifies registered observers and reads database-assigned values
//! back into the model after an insert.
//!
//! Reads go through a typed, fluent query builder ([`Select`] and the stages
//! that follow it) that only allows clauses in SQL order.

pub mod backends;
pub mod binding;
pub mod database;
pub mod error;
pub mod events;
pub mod model;
pub mod observers;
pub mod persistence;
pub mod query;
pub mod transaction;

#[cfg(test)]
mod testing;


// Re-export core traits and types
pub use backends::{
    DatabaseValue, Driver, DriverTransaction, FromDatabaseValue, ParamKind, PostgresDriver, Row,
};
pub use binding::{BindingEntry, Bindings};
pub use database::{ConnectionInfo, DatabaseConfig, PoolConfig};
pub use error::{ModelError, ModelResult};
pub use events::{ModelEvent, ModelObserver};
pub use model::*;
pub use observers::{ObserverManager, ObserverRegistry};
pub use persistence::{Persistence, SaveOutcome};
pub use query::{
    FluentQuery, GroupBy, Having, Join, JoinType, Limit, OrderBy, OrderDirection, QueryOperator,
    Select, Where,
};
pub use transaction::Transaction;
