//! Query Builder SELECT stage

use super::parts::QueryParts;

stage! {
    /// Entry point of every query: `SELECT columns FROM table [AS alias]`
    Select
}

impl Select {
    /// `SELECT * FROM table`
    pub fn from_table(table: &str) -> Self {
        Self {
            parts: QueryParts::select(&[], table, None),
        }
    }

    /// `SELECT * FROM table AS alias`
    pub fn from_aliased(table: &str, alias: &str) -> Self {
        Self {
            parts: QueryParts::select(&[], table, Some(alias)),
        }
    }

    /// `SELECT c1, c2 FROM table`; no columns selects `*`
    pub fn columns(columns: &[&str], table: &str) -> Self {
        Self {
            parts: QueryParts::select(columns, table, None),
        }
    }

    /// Select from `table`, aliased when `alias` is set
    pub fn with_alias(table: &str, alias: Option<&str>) -> Self {
        Self {
            parts: QueryParts::select(&[], table, alias),
        }
    }
}

join_clauses!(Select);
where_clauses!(Select);
group_clauses!(Select);
order_clauses!(Select);
limit_clauses!(Select);
