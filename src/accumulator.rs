use crate::models::{GroupKey, GroupedSeriesEntry};
use crate::series::Series;
use std::collections::BTreeMap;

/// Folds per-record deltas into one entry per group key.
///
/// Entries are created on first sight of a key with every known slot at zero
/// and are only ever added to. Applying the same record twice counts it twice.
#[derive(Debug, Clone, Default)]
pub struct Accumulator {
    slots: Vec<String>,
    entries: BTreeMap<GroupKey, GroupedSeriesEntry>,
}

impl Accumulator {
    /// Accumulator with pre-declared slots, in display order.
    pub fn new<S: AsRef<str>>(declared: &[S]) -> Self {
        let mut slots: Vec<String> = Vec::with_capacity(declared.len());
        for s in declared {
            let s = s.as_ref();
            if !slots.iter().any(|x| x == s) {
                slots.push(s.to_string());
            }
        }
        Self {
            slots,
            entries: BTreeMap::new(),
        }
    }

    /// Entry for `key`, created with all slots at zero if absent.
    pub fn ensure(&mut self, key: &GroupKey) -> &mut GroupedSeriesEntry {
        let slots = &self.slots;
        self.entries
            .entry(key.clone())
            .or_insert_with(|| GroupedSeriesEntry::new(key.clone(), slots.as_slice()))
    }

    /// Add `delta` to the `category` slot of the `key` entry.
    pub fn upsert(&mut self, key: &GroupKey, category: &str, delta: f64) {
        if !self.slots.iter().any(|s| s == category) {
            self.slots.push(category.to_string());
        }
        let entry = self.ensure(key);
        *entry.values.entry(category.to_string()).or_insert(0.0) += delta;
    }

    pub fn get(&self, key: &GroupKey) -> Option<&GroupedSeriesEntry> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Declared slots followed by slots first seen while accumulating.
    pub fn slots(&self) -> &[String] {
        &self.slots
    }

    /// Close the accumulator into a series ordered by key. Slots an entry never
    /// saw are filled with zero so every row has the same columns.
    pub fn finish(self, name: &str) -> Series {
        let Accumulator { slots, entries } = self;
        let entries = entries
            .into_values()
            .map(|mut entry| {
                for slot in &slots {
                    entry.values.entry(slot.clone()).or_insert(0.0);
                }
                entry
            })
            .collect();
        Series {
            name: name.to_string(),
            categories: slots,
            entries,
        }
    }
}
