//! Round-robin scan position over the known level ids
//!
//! The known-id list is kept in the order ids were confirmed (remote order,
//! not numeric). The cursor is an id, not an index, so it stays meaningful
//! when ids are removed between ticks.

use std::collections::HashSet;
use tracing::info;

#[derive(Debug, Clone)]
pub struct CursorScheduler {
    known_ids: Vec<i64>,
    index: HashSet<i64>,
    cursor: i64,
    batch_size: usize,
}

impl CursorScheduler {
    pub fn new(batch_size: usize) -> Self {
        Self {
            known_ids: Vec::new(),
            index: HashSet::new(),
            cursor: 0,
            batch_size: batch_size.max(1),
        }
    }

    pub fn with_known_ids(batch_size: usize, ids: Vec<i64>) -> Self {
        let mut scheduler = Self::new(batch_size);
        scheduler.extend(ids);
        scheduler
    }

    pub fn cursor(&self) -> i64 {
        self.cursor
    }

    pub fn set_cursor(&mut self, cursor: i64) {
        self.cursor = cursor;
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn known_ids(&self) -> &[i64] {
        &self.known_ids
    }

    pub fn len(&self) -> usize {
        self.known_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known_ids.is_empty()
    }

    pub fn contains(&self, id: i64) -> bool {
        self.index.contains(&id)
    }

    /// Append ids not known yet, keeping their order; returns how many were new
    pub fn extend<I>(&mut self, ids: I) -> usize
    where
        I: IntoIterator<Item = i64>,
    {
        let before = self.known_ids.len();
        for id in ids {
            if self.index.insert(id) {
                self.known_ids.push(id);
            }
        }
        self.known_ids.len() - before
    }

    pub fn remove(&mut self, ids: &[i64]) {
        if ids.is_empty() {
            return;
        }
        let removed: HashSet<i64> = ids.iter().copied().collect();
        self.known_ids.retain(|id| !removed.contains(id));
        self.index.retain(|id| !removed.contains(id));
    }

    /// Resume position at start-up
    ///
    /// The cursor becomes `last_updated` (or 0), snapped down to the first id
    /// of its batch when it is a known id. Returns the snapped index.
    pub fn find_start(&mut self, last_updated: Option<i64>) -> Option<usize> {
        self.cursor = last_updated.unwrap_or(0);

        let position = self.position_of(self.cursor);
        if let Some(pos) = position {
            let start = pos / self.batch_size * self.batch_size;
            self.cursor = self.known_ids[start];
            info!(cursor = self.cursor, index = start, "Updates will start from level");
            return Some(start);
        }

        info!(cursor = self.cursor, "Updates will start from level (not a known id)");
        None
    }

    /// Move the cursor one batch forward, wrapping to the first id
    ///
    /// A purged cursor id continues from the first later id in list order;
    /// when there is none the list counts as exhausted and the scan wraps.
    /// Returns the new index, or `None` (cursor unchanged) for an empty list.
    pub fn advance(&mut self) -> Option<usize> {
        if self.known_ids.is_empty() {
            return None;
        }

        let current = self
            .position_of(self.cursor)
            .or_else(|| self.known_ids.iter().position(|&id| id > self.cursor));

        let next = match current {
            Some(pos) if pos + self.batch_size < self.known_ids.len() => pos + self.batch_size,
            _ => 0,
        };

        self.cursor = self.known_ids[next];
        info!(cursor = self.cursor, index = next, "Next update will start from level");
        Some(next)
    }

    fn position_of(&self, id: i64) -> Option<usize> {
        if !self.contains(id) {
            return None;
        }
        self.known_ids.iter().position(|&known| known == id)
    }
}
