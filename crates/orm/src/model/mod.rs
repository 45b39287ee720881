//! Model System - entity definitions and their metadata
//!
//! - `core_trait`: the [`Model`] trait every entity implements
//! - `state`: per-instance change tracking
//! - `fields`: the field registry entries a model declares
//! - `metadata`: per-type metadata and its registry
//! - `custom`: optional custom INSERT / UPDATE capabilities
//! - `primary_key`: primary key values

pub mod core_trait;
pub mod custom;
pub mod fields;
pub mod metadata;
pub mod primary_key;
pub mod state;

pub use core_trait::Model;
pub use custom::{CustomInsert, CustomUpdate};
pub use fields::{Field, Getter, Setter};
pub use metadata::{default_table_name, MetadataRegistry, ModelMetadata};
pub use primary_key::PrimaryKey;
pub use state::{ChangeSet, ModelState};
