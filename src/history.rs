//! Bounded, newest-first log of completed attempts.

use serde::{Deserialize, Serialize};

use crate::domain::HistoryEntry;

pub const HISTORY_LIMIT: usize = 50;

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct HistoryLog {
  entries: Vec<HistoryEntry>,
}

impl HistoryLog {
  /// Inserts at the head and evicts from the tail past `HISTORY_LIMIT`.
  pub fn append(&mut self, entry: HistoryEntry) {
    self.entries.insert(0, entry);
    self.entries.truncate(HISTORY_LIMIT);
  }

  /// Newest first.
  pub fn list(&self) -> &[HistoryEntry] {
    &self.entries
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  /// Applies the bound to data loaded from storage.
  pub fn bounded(mut self) -> Self {
    self.entries.truncate(HISTORY_LIMIT);
    self
  }
}
