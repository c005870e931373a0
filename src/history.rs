//! Command history as seen by `$history`.
//!
//! Expansion only ever reads history: `$history[1]` is the most recently executed command, and the
//! whole variable lists every item newest first. Storage is left to the embedder, which plugs in
//! through [`HistorySource`]. [`History`] is a session-local implementation kept in memory.

use crate::flog::FLOGF;
use crate::wchar::prelude::*;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Read access to a list of history items. Index 1 is the most recent item.
pub trait HistorySource {
    fn size(&self) -> usize;

    /// None for index 0, which would be the command line being edited, and past the end.
    fn item_at_index(&self, idx: usize) -> Option<WString>;

    /// Every item, newest first. This may be long.
    fn get_history(&self) -> Vec<WString> {
        (1..=self.size())
            .map_while(|idx| self.item_at_index(idx))
            .collect()
    }

    /// The items at the given one-based indexes, keyed by index. Indexes without an item are
    /// left out.
    fn items_at_indexes(&self, indexes: &[usize]) -> HashMap<usize, WString> {
        indexes
            .iter()
            .filter_map(|&idx| Some((idx, self.item_at_index(idx)?)))
            .collect()
    }
}

/// An in-memory history, stored oldest first. Each command appears once.
#[derive(Default)]
pub struct History {
    items: Mutex<Vec<WString>>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    fn items(&self) -> MutexGuard<Vec<WString>> {
        // A poisoned lock still holds a consistent list.
        self.items.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make `s` the most recent item, moving an identical older one. Empty commands are dropped.
    pub fn add_commandline(&self, s: WString) {
        if s.is_empty() {
            return;
        }
        FLOGF!(history, "Adding history item '{}'", s);
        let mut items = self.items();
        items.retain(|existing| *existing != s);
        items.push(s);
    }

    pub fn remove(&self, s: &wstr) {
        self.items().retain(|item| item.as_utfstr() != s);
    }

    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }

    pub fn clear(&self) {
        self.items().clear();
    }
}

impl HistorySource for History {
    fn size(&self) -> usize {
        self.items().len()
    }

    fn item_at_index(&self, idx: usize) -> Option<WString> {
        let items = self.items();
        let pos = items.len().checked_sub(idx)?;
        (idx > 0).then(|| items[pos].clone())
    }
}

impl<S: AsRef<wstr>> FromIterator<S> for History {
    /// Items are listed oldest first.
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        let history = History::new();
        for item in iter {
            history.add_commandline(item.as_ref().to_owned());
        }
        history
    }
}

#[cfg(test)]
mod tests {
    use super::{History, HistorySource};
    use crate::wchar::prelude::*;

    #[test]
    fn test_history_indexes() {
        let history: History = [L!("alpha"), L!("beta"), L!("gamma")].into_iter().collect();
        assert_eq!(history.size(), 3);
        assert_eq!(history.item_at_index(0), None);
        assert_eq!(history.item_at_index(1).unwrap(), "gamma");
        assert_eq!(history.item_at_index(3).unwrap(), "alpha");
        assert_eq!(history.item_at_index(4), None);
        assert_eq!(history.get_history(), &["gamma", "beta", "alpha"]);

        let found = history.items_at_indexes(&[1, 3, 7, 1]);
        assert_eq!(found.len(), 2);
        assert_eq!(found[&1], "gamma");
        assert_eq!(found[&3], "alpha");
    }

    #[test]
    fn test_history_add_dedups() {
        let history = History::new();
        history.add_commandline(L!("echo hi").to_owned());
        history.add_commandline(L!("ls").to_owned());
        history.add_commandline(L!("").to_owned());
        history.add_commandline(L!("echo hi").to_owned());
        assert_eq!(history.get_history(), &["echo hi", "ls"]);

        history.remove(L!("ls"));
        assert_eq!(history.size(), 1);
        history.clear();
        assert!(history.is_empty());
    }
}
