//! Query Builder WHERE stage

use super::parts::{Operand, QueryParts};
use crate::backends::DatabaseValue;

stage! {
    /// A WHERE clause and its AND / OR continuations
    Where
}

impl Where {
    pub(crate) fn open(parts: &QueryParts, column: &str, operator: &str, operand: Operand) -> Self {
        let mut parts = parts.clone();
        let condition = parts.condition(column, operator, operand);
        parts.wheres.push_str(&format!(" WHERE {}", condition));
        Self { parts }
    }

    fn chain(&self, connective: &str, column: &str, operator: &str, operand: Operand) -> Self {
        let mut parts = self.parts.clone();
        let condition = parts.condition(column, operator, operand);
        parts
            .wheres
            .push_str(&format!(" {} {}", connective, condition));
        Self { parts }
    }

    pub fn and_where(&self, column: &str, operator: impl AsRef<str>, value: impl Into<DatabaseValue>) -> Self {
        self.chain("AND", column, operator.as_ref(), Operand::Value(value.into()))
    }

    pub fn or_where(&self, column: &str, operator: impl AsRef<str>, value: impl Into<DatabaseValue>) -> Self {
        self.chain("OR", column, operator.as_ref(), Operand::Value(value.into()))
    }

    pub fn and_where_param(
        &self,
        column: &str,
        operator: impl AsRef<str>,
        placeholder: &str,
        value: impl Into<DatabaseValue>,
    ) -> Self {
        self.chain(
            "AND",
            column,
            operator.as_ref(),
            Operand::Named(placeholder.to_string(), value.into()),
        )
    }

    pub fn or_where_param(
        &self,
        column: &str,
        operator: impl AsRef<str>,
        placeholder: &str,
        value: impl Into<DatabaseValue>,
    ) -> Self {
        self.chain(
            "OR",
            column,
            operator.as_ref(),
            Operand::Named(placeholder.to_string(), value.into()),
        )
    }
}

group_clauses!(Where);
order_clauses!(Where);
limit_clauses!(Where);
