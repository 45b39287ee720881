//! Accumulated state shared by every stage

use crate::backends::DatabaseValue;
use crate::binding::{normalize_placeholder, Bindings};
use crate::error::{ModelError, ModelResult};

/// Right-hand side of a WHERE / HAVING comparison
#[derive(Debug, Clone)]
pub(crate) enum Operand {
    /// Bound under the next anonymous `:pN` placeholder
    Value(DatabaseValue),
    /// Bound under a caller-chosen placeholder
    Named(String, DatabaseValue),
}

/// SQL fragments in clause order plus the bindings collected so far
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct QueryParts {
    pub select: String,
    pub joins: String,
    pub wheres: String,
    pub group_by: String,
    pub having: String,
    pub order_by: String,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub bindings: Bindings,
    pub current: usize,
    /// Placeholders bound twice with different values
    pub conflicts: Vec<String>,
}

impl QueryParts {
    pub fn select(columns: &[&str], table: &str, alias: Option<&str>) -> Self {
        let columns = if columns.is_empty() {
            "*".to_string()
        } else {
            columns.join(", ")
        };
        let select = match alias {
            Some(alias) => format!("SELECT {} FROM {} AS {}", columns, table, alias),
            None => format!("SELECT {} FROM {}", columns, table),
        };
        Self {
            select,
            ..Self::default()
        }
    }

    /// Render `column operator :placeholder` and bind the operand.
    ///
    /// Anonymous placeholders skip any `:pN` the caller already named. A named
    /// placeholder that is already bound keeps its first value; binding it to a
    /// different value is recorded as a conflict.
    pub fn condition(&mut self, column: &str, operator: &str, operand: Operand) -> String {
        let placeholder = match operand {
            Operand::Value(value) => {
                let placeholder = self.next_anonymous();
                self.bindings.bind_inferred(placeholder.clone(), value);
                placeholder
            }
            Operand::Named(name, value) => {
                let placeholder = normalize_placeholder(&name);
                match self.bindings.get(&placeholder) {
                    Some(entry) if entry.value != value => self.conflicts.push(placeholder.clone()),
                    Some(_) => {}
                    None => self.bindings.bind_inferred(placeholder.clone(), value),
                }
                placeholder
            }
        };
        format!("{} {} {}", column, operator, placeholder)
    }

    fn next_anonymous(&mut self) -> String {
        loop {
            let placeholder = format!(":p{}", self.current);
            self.current += 1;
            if !self.bindings.contains(&placeholder) {
                return placeholder;
            }
        }
    }

    /// Fail if a placeholder was bound to two different values
    pub fn validate(&self) -> ModelResult<()> {
        if self.conflicts.is_empty() {
            return Ok(());
        }
        Err(ModelError::Query(format!(
            "placeholder bound to conflicting values: {}",
            self.conflicts.join(", ")
        )))
    }

    pub fn to_sql(&self) -> String {
        let mut sql = [
            self.select.as_str(),
            self.joins.as_str(),
            self.wheres.as_str(),
            self.group_by.as_str(),
            self.having.as_str(),
            self.order_by.as_str(),
        ]
        .concat();
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        if let Some(offset) = self.offset {
            sql.push_str(&format!(" OFFSET {}", offset));
        }
        sql
    }
}
