//! Binding table and named-placeholder scanning
//!
//! [`Bindings`] is an ordered placeholder → value table. It is filled by the
//! persistence engine and the fluent query builder and handed to a driver in
//! insertion order.

use std::ops::Range;

use crate::backends::{DatabaseValue, ParamKind};

/// One bound parameter
#[derive(Debug, Clone, PartialEq)]
pub struct BindingEntry {
    pub placeholder: String,
    pub value: DatabaseValue,
    pub kind: ParamKind,
}

/// Ordered placeholder → (value, kind) table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    entries: Vec<BindingEntry>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a value; an already bound placeholder keeps its position and gets the new value.
    pub fn bind(&mut self, placeholder: impl Into<String>, value: impl Into<DatabaseValue>, kind: ParamKind) {
        let placeholder = normalize_placeholder(&placeholder.into());
        let value = value.into();

        if let Some(entry) = self.entries.iter_mut().find(|e| e.placeholder == placeholder) {
            entry.value = value;
            entry.kind = kind;
            return;
        }
        self.entries.push(BindingEntry { placeholder, value, kind });
    }

    /// Bind with the kind inferred from the value
    pub fn bind_inferred(&mut self, placeholder: impl Into<String>, value: impl Into<DatabaseValue>) {
        let value = value.into();
        let kind = ParamKind::for_value(&value);
        self.bind(placeholder, value, kind);
    }

    pub fn get(&self, placeholder: &str) -> Option<&BindingEntry> {
        let placeholder = normalize_placeholder(placeholder);
        self.entries.iter().find(|e| e.placeholder == placeholder)
    }

    pub fn contains(&self, placeholder: &str) -> bool {
        self.get(placeholder).is_some()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BindingEntry> {
        self.entries.iter()
    }

    /// `(placeholder, value)` pairs in bind order
    pub fn pairs(&self) -> Vec<(&str, &DatabaseValue)> {
        self.entries
            .iter()
            .map(|e| (e.placeholder.as_str(), &e.value))
            .collect()
    }

    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.placeholder.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a Bindings {
    type Item = &'a BindingEntry;
    type IntoIter = std::slice::Iter<'a, BindingEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Prefix a placeholder name with `:` unless it already has one.
pub fn normalize_placeholder(name: &str) -> String {
    if name.starts_with(':') {
        name.to_string()
    } else {
        format!(":{}", name)
    }
}

/// Locate every `:name` placeholder in `sql`.
///
/// `::type` casts and anything inside single or double quotes are skipped.
/// Returned names include the leading `:`.
pub fn scan_placeholders(sql: &str) -> Vec<(Range<usize>, &str)> {
    let bytes = sql.as_bytes();
    let mut found = Vec::new();
    let mut quote: Option<u8> = None;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) => {
                if b == q {
                    quote = None;
                }
                i += 1;
            }
            None if b == b'\'' || b == b'"' => {
                quote = Some(b);
                i += 1;
            }
            None if b == b':' => {
                if bytes.get(i + 1) == Some(&b':') {
                    i += 2;
                    continue;
                }
                let start = i;
                let mut end = i + 1;
                if bytes.get(end).is_some_and(|c| c.is_ascii_alphabetic() || *c == b'_') {
                    while bytes.get(end).is_some_and(|c| c.is_ascii_alphanumeric() || *c == b'_') {
                        end += 1;
                    }
                    found.push((start..end, &sql[start..end]));
                }
                i = end;
            }
            None => i += 1,
        }
    }

    found
}

/// Distinct placeholder names in order of first appearance.
pub fn placeholders_in(sql: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for (_, name) in scan_placeholders(sql) {
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_preserves_order_and_replaces() {
        let mut bindings = Bindings::new();
        bindings.bind(":name", "Ann", ParamKind::String);
        bindings.bind("surname", "Lee", ParamKind::String);
        bindings.bind(":name", "Bea", ParamKind::String);

        assert_eq!(bindings.len(), 2);
        assert_eq!(
            bindings.pairs(),
            vec![
                (":name", &DatabaseValue::from("Bea")),
                (":surname", &DatabaseValue::from("Lee")),
            ]
        );
        assert!(bindings.contains("surname"));
    }

    #[test]
    fn test_bind_inferred_kind() {
        let mut bindings = Bindings::new();
        bindings.bind_inferred(":age", 30i64);
        bindings.bind_inferred(":deleted", DatabaseValue::Null);

        assert_eq!(bindings.get(":age").map(|e| e.kind), Some(ParamKind::Int));
        assert_eq!(bindings.get(":deleted").map(|e| e.kind), Some(ParamKind::Null));
    }

    #[test]
    fn test_placeholders_in_statement() {
        let sql = "INSERT INTO users(name, surname) VALUES (:name, :surname);";
        assert_eq!(placeholders_in(sql), vec![":name", ":surname"]);
    }

    #[test]
    fn test_placeholders_skip_casts_and_literals() {
        let sql = "SELECT id::text, ':nope' FROM users WHERE name = :name AND note <> \":x\" AND id = :id OR name = :name";
        assert_eq!(placeholders_in(sql), vec![":name", ":id"]);

        let spans = scan_placeholders(sql);
        assert_eq!(spans.len(), 3);
        assert_eq!(&sql[spans[0].0.clone()], ":name");
    }

    #[test]
    fn test_lone_colon_is_not_a_placeholder() {
        assert!(placeholders_in("SELECT 1 : 2, :1").is_empty());
    }
}
