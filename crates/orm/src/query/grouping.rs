//! Query Builder GROUP BY and HAVING stages

use super::parts::{Operand, QueryParts};
use crate::backends::DatabaseValue;

stage! {
    GroupBy
}

stage! {
    /// HAVING; only reachable from [`GroupBy`]
    Having
}

impl GroupBy {
    pub(crate) fn new(parts: &QueryParts, columns: &[&str]) -> Self {
        let mut parts = parts.clone();
        parts
            .group_by
            .push_str(&format!(" GROUP BY {}", columns.join(", ")));
        Self { parts }
    }

    /// ` HAVING column operator :pN`
    pub fn having(&self, column: &str, operator: impl AsRef<str>, value: impl Into<DatabaseValue>) -> Having {
        Having::open(&self.parts, column, operator.as_ref(), Operand::Value(value.into()))
    }

    pub fn having_param(
        &self,
        column: &str,
        operator: impl AsRef<str>,
        placeholder: &str,
        value: impl Into<DatabaseValue>,
    ) -> Having {
        Having::open(
            &self.parts,
            column,
            operator.as_ref(),
            Operand::Named(placeholder.to_string(), value.into()),
        )
    }
}

impl Having {
    fn open(parts: &QueryParts, column: &str, operator: &str, operand: Operand) -> Self {
        let mut parts = parts.clone();
        let condition = parts.condition(column, operator, operand);
        parts.having.push_str(&format!(" HAVING {}", condition));
        Self { parts }
    }

    pub fn and_having(&self, column: &str, operator: impl AsRef<str>, value: impl Into<DatabaseValue>) -> Self {
        let mut parts = self.parts.clone();
        let condition = parts.condition(column, operator.as_ref(), Operand::Value(value.into()));
        parts.having.push_str(&format!(" AND {}", condition));
        Self { parts }
    }
}

order_clauses!(GroupBy);
limit_clauses!(GroupBy);
order_clauses!(Having);
limit_clauses!(Having);
