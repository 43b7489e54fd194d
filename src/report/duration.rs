use crate::filter::CategoryKey;
use serde::Serialize;
use std::collections::HashMap;

/// Row ordering for duration snapshots
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Sum,
    Mean,
    Count,
    Max,
    Category,
}

/// Running statistics for one category, updated in O(1)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DurationAccumulator {
    pub count: u64,
    pub sum: f64,
    pub min: f64,
    pub max: f64,
    mean: f64,
    m2: f64,
}

impl DurationAccumulator {
    fn new(value: f64) -> Self {
        Self {
            count: 1,
            sum: value,
            min: value,
            max: value,
            mean: value,
            m2: 0.0,
        }
    }

    fn observe(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);

        // Welford
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Sample variance; zero below two observations
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }
}

/// One row of a duration snapshot, values in seconds
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DurationRow {
    pub category: CategoryKey,
    pub count: u64,
    pub sum: f64,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub variance: f64,
    pub std_dev: f64,
}

/// Duration statistics per category key
#[derive(Debug, Clone, Default)]
pub struct DurationStats {
    index: HashMap<CategoryKey, usize>,
    entries: Vec<(CategoryKey, DurationAccumulator)>,
}

impl DurationStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, key: CategoryKey, value: f64) {
        match self.index.get(&key) {
            Some(&slot) => self.entries[slot].1.observe(value),
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, DurationAccumulator::new(value)));
            }
        }
    }

    pub fn get(&self, key: &CategoryKey) -> Option<&DurationAccumulator> {
        self.index.get(key).map(|&slot| &self.entries[slot].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rows in the requested order; ties keep first-seen order
    pub fn snapshot(&self, order: SortOrder) -> Vec<DurationRow> {
        let mut rows: Vec<DurationRow> = self
            .entries
            .iter()
            .map(|(category, acc)| {
                let variance = acc.variance();
                DurationRow {
                    category: category.clone(),
                    count: acc.count,
                    sum: acc.sum,
                    mean: acc.mean(),
                    min: acc.min,
                    max: acc.max,
                    variance,
                    std_dev: variance.sqrt(),
                }
            })
            .collect();

        match order {
            SortOrder::Sum => rows.sort_by(|a, b| b.sum.total_cmp(&a.sum)),
            SortOrder::Mean => rows.sort_by(|a, b| b.mean.total_cmp(&a.mean)),
            SortOrder::Count => rows.sort_by(|a, b| b.count.cmp(&a.count)),
            SortOrder::Max => rows.sort_by(|a, b| b.max.total_cmp(&a.max)),
            SortOrder::Category => rows.sort_by(|a, b| a.category.cmp(&b.category)),
        }
        rows
    }
}
