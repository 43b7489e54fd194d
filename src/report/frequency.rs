use crate::filter::CategoryKey;
use serde::Serialize;
use std::collections::HashMap;

/// One row of a frequency snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrequencyRow {
    pub category: CategoryKey,
    pub count: u64,
    /// Fraction of all observations, 0.0..=1.0
    pub share: f64,
}

/// Occurrence counts per category key, remembering first-seen order
#[derive(Debug, Clone, Default)]
pub struct FrequencyTable {
    index: HashMap<CategoryKey, usize>,
    entries: Vec<(CategoryKey, u64)>,
    total: u64,
}

impl FrequencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, key: CategoryKey) {
        self.total += 1;
        match self.index.get(&key) {
            Some(&slot) => self.entries[slot].1 += 1,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, 1));
            }
        }
    }

    pub fn count(&self, key: &CategoryKey) -> Option<u64> {
        self.index.get(key).map(|&slot| self.entries[slot].1)
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rows by descending count; equal counts keep first-seen order
    pub fn snapshot(&self) -> Vec<FrequencyRow> {
        let mut rows: Vec<FrequencyRow> = self
            .entries
            .iter()
            .map(|(category, count)| FrequencyRow {
                category: category.clone(),
                count: *count,
                share: *count as f64 / self.total.max(1) as f64,
            })
            .collect();
        rows.sort_by(|a, b| b.count.cmp(&a.count));
        rows
    }
}
