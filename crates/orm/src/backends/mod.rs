//! Database Backend Abstractions
//!
//! The persistence engine talks to the database only through the [`Driver`]
//! and [`DriverTransaction`] traits. PostgreSQL support lives in [`postgres`].

pub mod core;
pub mod postgres;

// Re-export core traits and types
pub use core::*;
pub use postgres::{PostgresDriver, PostgresTransaction};
