//! Query Builder ORDER BY stage

use super::parts::QueryParts;
use super::types::OrderDirection;

stage! {
    OrderBy
}

impl OrderBy {
    pub(crate) fn new(parts: &QueryParts, column: &str, direction: OrderDirection) -> Self {
        let mut parts = parts.clone();
        parts
            .order_by
            .push_str(&format!(" ORDER BY {} {}", column, direction));
        Self { parts }
    }

    /// Secondary sort key
    pub fn then_by(&self, column: &str, direction: OrderDirection) -> Self {
        let mut parts = self.parts.clone();
        parts.order_by.push_str(&format!(", {} {}", column, direction));
        Self { parts }
    }
}

limit_clauses!(OrderBy);
