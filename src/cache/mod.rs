//! In-memory record of which entity ids are already stored.

use std::collections::HashSet;

use crate::app::Result;
use crate::domain::EntityKind;
use crate::store::Store;

/// Per-kind sets of ids known to be persisted.
///
/// Purely an optimization: the store stays the source of truth, the cache
/// only spares a crawl from re-requesting what a previous run captured.
#[derive(Debug, Default, Clone)]
pub struct MemoCache {
    boards: HashSet<i64>,
    members: HashSet<i64>,
    topics: HashSet<i64>,
}

impl MemoCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a cache holding every id currently in the store.
    pub fn prime<S: Store + ?Sized>(store: &S) -> Result<Self> {
        let mut cache = Self::new();
        for kind in EntityKind::ALL {
            let ids = store.list_ids(kind)?;
            tracing::debug!("Remembered {} stored {} ids", ids.len(), kind);
            cache.set_mut(kind).extend(ids);
        }
        Ok(cache)
    }

    pub fn contains(&self, kind: EntityKind, id: i64) -> bool {
        self.set(kind).contains(&id)
    }

    /// Mark an id as stored. Returns false if it was already known.
    pub fn record(&mut self, kind: EntityKind, id: i64) -> bool {
        self.set_mut(kind).insert(id)
    }

    pub fn len(&self, kind: EntityKind) -> usize {
        self.set(kind).len()
    }

    pub fn is_empty(&self) -> bool {
        EntityKind::ALL.iter().all(|kind| self.set(*kind).is_empty())
    }

    fn set(&self, kind: EntityKind) -> &HashSet<i64> {
        match kind {
            EntityKind::Board => &self.boards,
            EntityKind::Member => &self.members,
            EntityKind::Topic => &self.topics,
        }
    }

    fn set_mut(&mut self, kind: EntityKind) -> &mut HashSet<i64> {
        match kind {
            EntityKind::Board => &mut self.boards,
            EntityKind::Member => &mut self.members,
            EntityKind::Topic => &mut self.topics,
        }
    }
}
