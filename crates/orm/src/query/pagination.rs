//! Query Builder LIMIT / OFFSET stage

use super::parts::QueryParts;

stage! {
    /// Final stage; only an offset may follow
    Limit
}

impl Limit {
    pub(crate) fn new(parts: &QueryParts, count: u64, offset: Option<u64>) -> Self {
        let mut parts = parts.clone();
        parts.limit = Some(count);
        parts.offset = offset;
        Self { parts }
    }

    /// Set the OFFSET, replacing any previous one
    pub fn offset(&self, count: u64) -> Self {
        let mut parts = self.parts.clone();
        parts.offset = Some(count);
        Self { parts }
    }
}
