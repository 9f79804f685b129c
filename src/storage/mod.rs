//! Persistence of quota counters and daily totals across restarts.

mod counters;

pub use counters::{CounterFile, StoredCounter, StoredCounters, StoredTotals};
