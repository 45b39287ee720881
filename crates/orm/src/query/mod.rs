//! Query Builder Module - Typed, fluent SELECT pipeline
//!
//! Every clause is its own stage type and only offers the clauses that may
//! legally follow it:
//!
//! ```text
//! Select ─┬─ Join* ─┬─ Where ─┬─ GroupBy ─┬─ Having ─┬─ OrderBy ─┬─ Limit
//! ```
//!
//! so `HAVING` before `GROUP BY` or `WHERE` after `GROUP BY` does not compile.
//! Stages are immutable: each transition copies the accumulated fragments and
//! bindings into a new stage, so several queries may branch off one ancestor.
//!
//! Comparisons with a literal value are bound under generated placeholders
//! `:p0`, `:p1`, … in call order, skipping any `:pN` the caller named
//! explicitly. Binding one named placeholder to two different values is
//! reported by [`FluentQuery::validate`]. Operators are inserted verbatim and are not
//! checked; only pass operators from a fixed set such as [`QueryOperator`].

/// Implements [`FluentQuery`] and `Display` for a stage wrapping `QueryParts`.
macro_rules! stage {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        pub struct $name {
            pub(super) parts: $crate::query::parts::QueryParts,
        }

        impl $crate::query::FluentQuery for $name {
            fn to_sql(&self) -> String {
                self.parts.to_sql()
            }

            fn bindings(&self) -> &$crate::binding::Bindings {
                &self.parts.bindings
            }

            fn row_limit(&self) -> Option<u64> {
                self.parts.limit
            }

            fn validate(&self) -> $crate::error::ModelResult<()> {
                self.parts.validate()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.parts.to_sql())
            }
        }
    };
}

macro_rules! join_clauses {
    ($stage:ident) => {
        impl $stage {
            /// Append ` INNER JOIN table ON left = right`
            pub fn join(&self, table: &str, left: &str, right: &str) -> $crate::query::Join {
                $crate::query::Join::new(&self.parts, $crate::query::JoinType::Inner, table, left, right)
            }

            pub fn left_join(&self, table: &str, left: &str, right: &str) -> $crate::query::Join {
                $crate::query::Join::new(&self.parts, $crate::query::JoinType::Left, table, left, right)
            }

            pub fn right_join(&self, table: &str, left: &str, right: &str) -> $crate::query::Join {
                $crate::query::Join::new(&self.parts, $crate::query::JoinType::Right, table, left, right)
            }
        }
    };
}

macro_rules! where_clauses {
    ($stage:ident) => {
        impl $stage {
            /// ` WHERE column operator :pN`, binding `value` to the generated placeholder
            pub fn where_(
                &self,
                column: &str,
                operator: impl AsRef<str>,
                value: impl Into<$crate::backends::DatabaseValue>,
            ) -> $crate::query::Where {
                $crate::query::Where::open(
                    &self.parts,
                    column,
                    operator.as_ref(),
                    $crate::query::parts::Operand::Value(value.into()),
                )
            }

            /// ` WHERE column operator :placeholder` with a caller-chosen placeholder
            pub fn where_param(
                &self,
                column: &str,
                operator: impl AsRef<str>,
                placeholder: &str,
                value: impl Into<$crate::backends::DatabaseValue>,
            ) -> $crate::query::Where {
                $crate::query::Where::open(
                    &self.parts,
                    column,
                    operator.as_ref(),
                    $crate::query::parts::Operand::Named(placeholder.to_string(), value.into()),
                )
            }
        }
    };
}

macro_rules! group_clauses {
    ($stage:ident) => {
        impl $stage {
            pub fn group_by(&self, columns: &[&str]) -> $crate::query::GroupBy {
                $crate::query::GroupBy::new(&self.parts, columns)
            }
        }
    };
}

macro_rules! order_clauses {
    ($stage:ident) => {
        impl $stage {
            pub fn order_by(&self, column: &str, direction: $crate::query::OrderDirection) -> $crate::query::OrderBy {
                $crate::query::OrderBy::new(&self.parts, column, direction)
            }
        }
    };
}

macro_rules! limit_clauses {
    ($stage:ident) => {
        impl $stage {
            pub fn limit(&self, count: u64) -> $crate::query::Limit {
                $crate::query::Limit::new(&self.parts, count, None)
            }

            /// `LIMIT per_page OFFSET (page - 1) * per_page`; pages start at 1
            pub fn paginate(&self, per_page: u64, page: u64) -> $crate::query::Limit {
                let offset = page.max(1).saturating_sub(1).saturating_mul(per_page);
                $crate::query::Limit::new(&self.parts, per_page, Some(offset))
            }
        }
    };
}

mod parts;

pub mod grouping;
pub mod joins;
pub mod ordering;
pub mod pagination;
pub mod select;
pub mod types;
pub mod where_clause;

pub use grouping::{GroupBy, Having};
pub use joins::Join;
pub use ordering::OrderBy;
pub use pagination::Limit;
pub use select::Select;
pub use types::{JoinType, OrderDirection, QueryOperator};
pub use where_clause::Where;

use crate::binding::Bindings;
use crate::error::ModelResult;

/// Anything that renders to parameterised SQL
pub trait FluentQuery {
    /// Fragments concatenated in clause order
    fn to_sql(&self) -> String;

    /// `(placeholder, value)` pairs in the order they were added
    fn bindings(&self) -> &Bindings;

    /// LIMIT already present in the rendered SQL, if any
    fn row_limit(&self) -> Option<u64>;

    /// Fails when a caller-named placeholder was bound to two different values
    fn validate(&self) -> ModelResult<()>;
}
