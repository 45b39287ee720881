//! Query Builder JOIN stage

use super::parts::QueryParts;
use super::types::JoinType;

stage! {
    /// One or more joins after the SELECT
    Join
}

impl Join {
    pub(crate) fn new(parts: &QueryParts, join_type: JoinType, table: &str, left: &str, right: &str) -> Self {
        let mut parts = parts.clone();
        parts
            .joins
            .push_str(&format!(" {} {} ON {} = {}", join_type, table, left, right));
        Self { parts }
    }
}

join_clauses!(Join);
where_clauses!(Join);
group_clauses!(Join);
order_clauses!(Join);
limit_clauses!(Join);
