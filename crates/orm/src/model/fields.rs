//! Field registry entries
//!
//! A model declares its persistable fields once as a list of [`Field`]s: the
//! column name, a getter and a setter. Closures without captures coerce to the
//! function pointers stored here.
//!
//! ```ignore
//! Field::new("name", |u: &User| u.name.clone().into(), |u, v| {
//!     u.name = v.extract()?;
//!     Ok(())
//! })
//! ```

use crate::backends::{DatabaseValue, ParamKind};
use crate::error::ModelResult;

pub type Getter<M> = fn(&M) -> DatabaseValue;
pub type Setter<M> = fn(&mut M, DatabaseValue) -> ModelResult<()>;

/// One persistable field of model `M`
pub struct Field<M> {
    name: &'static str,
    kind: ParamKind,
    get: Getter<M>,
    set: Setter<M>,
}

impl<M> Field<M> {
    pub fn new(name: &'static str, get: Getter<M>, set: Setter<M>) -> Self {
        Self {
            name,
            kind: ParamKind::String,
            get,
            set,
        }
    }

    /// Override the parameter kind used when binding this field
    pub fn kind(mut self, kind: ParamKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn param_kind(&self) -> ParamKind {
        self.kind
    }

    pub fn read(&self, model: &M) -> DatabaseValue {
        (self.get)(model)
    }

    pub fn write(&self, model: &mut M, value: DatabaseValue) -> ModelResult<()> {
        (self.set)(model, value)
    }
}

impl<M> Clone for Field<M> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            kind: self.kind,
            get: self.get,
            set: self.set,
        }
    }
}

impl<M> std::fmt::Debug for Field<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish()
    }
}
