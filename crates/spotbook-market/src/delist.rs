//! Pairs waiting to be delisted.
//!
//! Entries are keyed `(effective_time, pair)`, so a time-bounded scan
//! yields pairs by effective time and then by pair.

use std::collections::{BTreeMap, BTreeSet};

use spotbook_types::TradingPair;

#[derive(Debug, Clone, Default)]
pub struct DelistScheduler {
    queue: BTreeSet<(i64, TradingPair)>,
    by_pair: BTreeMap<TradingPair, i64>,
}

impl DelistScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `pair` for removal at `effective_time`, replacing any
    /// earlier request for the same pair.
    pub fn add_delist_request(&mut self, pair: TradingPair, effective_time: i64) {
        if let Some(previous) = self.by_pair.insert(pair.clone(), effective_time) {
            self.queue.remove(&(previous, pair.clone()));
        }
        self.queue.insert((effective_time, pair));
    }

    /// Pairs whose effective time is at or before `time`.
    #[must_use]
    pub fn get_delist_symbols_before_time(&self, time: i64) -> Vec<TradingPair> {
        self.due(time).map(|(_, pair)| pair.clone()).collect()
    }

    /// Drop every entry with effective time at or before `time`.
    pub fn remove_delist_symbols_before_time(&mut self, time: i64) {
        let due: Vec<(i64, TradingPair)> = self.due(time).cloned().collect();
        for entry in due {
            self.by_pair.remove(&entry.1);
            self.queue.remove(&entry);
        }
    }

    #[must_use]
    pub fn has_delist_request(&self, pair: &TradingPair) -> bool {
        self.by_pair.contains_key(pair)
    }

    #[must_use]
    pub fn effective_time(&self, pair: &TradingPair) -> Option<i64> {
        self.by_pair.get(pair).copied()
    }

    /// All pending requests, earliest first.
    pub fn iter(&self) -> impl Iterator<Item = &(i64, TradingPair)> {
        self.queue.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    fn due(&self, time: i64) -> impl Iterator<Item = &(i64, TradingPair)> {
        self.queue.iter().take_while(move |(t, _)| *t <= time)
    }
}
