//! Change tracking state embedded in every model
//!
//! A model owns one [`ModelState`]. It carries the primary key value, the
//! changed-set that drives UPDATE generation, and the lock flag that
//! suppresses change recording while database values are copied back in.

use crate::binding::normalize_placeholder;
use crate::model::primary_key::PrimaryKey;

/// Pending changes, field name → placeholder, in first-change order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    entries: Vec<(String, String)>,
}

impl ChangeSet {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(f, p)| (f.as_str(), p.as_str()))
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(f, _)| f.as_str())
    }

    pub fn placeholder_for(&self, field: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(f, _)| f == field)
            .map(|(_, p)| p.as_str())
    }

    pub fn contains(&self, field: &str) -> bool {
        self.placeholder_for(field).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn record(&mut self, field: &str, placeholder: String) {
        match self.entries.iter_mut().find(|(f, _)| f == field) {
            Some(entry) => entry.1 = placeholder,
            None => self.entries.push((field.to_string(), placeholder)),
        }
    }

    /// Drop entries whose placeholder is already used by an earlier field.
    fn dedup_placeholders(&mut self) {
        let mut seen: Vec<String> = Vec::with_capacity(self.entries.len());
        self.entries.retain(|(_, placeholder)| {
            if seen.contains(placeholder) {
                false
            } else {
                seen.push(placeholder.clone());
                true
            }
        });
    }
}

/// Per-instance persistence bookkeeping
#[derive(Debug, Clone, Default)]
pub struct ModelState {
    primary_key: Option<PrimaryKey>,
    changed: ChangeSet,
    locked: bool,
}

impl ModelState {
    pub fn new() -> Self {
        Self::default()
    }

    /// State of a row that already exists in the database
    pub fn persisted(primary_key: impl Into<PrimaryKey>) -> Self {
        Self {
            primary_key: Some(primary_key.into()),
            ..Self::default()
        }
    }

    pub fn primary_key(&self) -> Option<&PrimaryKey> {
        self.primary_key.as_ref()
    }

    pub fn set_primary_key(&mut self, key: Option<PrimaryKey>) {
        self.primary_key = key;
    }

    pub fn is_persisted(&self) -> bool {
        self.primary_key.is_some()
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub(crate) fn set_locked(&mut self, locked: bool) {
        self.locked = locked;
    }

    /// Mark `field` as changed.
    ///
    /// Ignored while locked. The placeholder defaults to `:field`; repeated
    /// changes to one field keep a single entry.
    pub fn record_change(&mut self, field: &str, placeholder: Option<&str>) {
        if self.locked {
            return;
        }
        let placeholder = match placeholder {
            Some(name) => normalize_placeholder(name),
            None => format!(":{}", field),
        };
        self.changed.record(field, placeholder);
    }

    pub fn changes(&self) -> &ChangeSet {
        &self.changed
    }

    pub fn is_dirty(&self) -> bool {
        !self.changed.is_empty()
    }

    pub fn reset_changes(&mut self) {
        self.changed = ChangeSet::default();
    }

    /// Reset the changed-set and return what it held, placeholders de-duplicated.
    pub(crate) fn take_changes(&mut self) -> ChangeSet {
        let mut taken = std::mem::take(&mut self.changed);
        taken.dedup_placeholders();
        taken
    }

    /// Put back a snapshot taken by a failed save.
    pub(crate) fn restore_changes(&mut self, snapshot: ChangeSet) {
        let newer = std::mem::replace(&mut self.changed, snapshot);
        for (field, placeholder) in newer.entries {
            self.changed.record(&field, placeholder);
        }
    }
}
