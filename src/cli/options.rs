use crate::report::SortOrder;
use clap::ValueEnum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    Auto,
    Always,
    Never,
}

/// Ordering of duration report rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortBy {
    Sum,
    Mean,
    Count,
    Max,
    Category,
}

impl From<SortBy> for SortOrder {
    fn from(sort_by: SortBy) -> Self {
        match sort_by {
            SortBy::Sum => SortOrder::Sum,
            SortBy::Mean => SortOrder::Mean,
            SortBy::Count => SortOrder::Count,
            SortBy::Max => SortOrder::Max,
            SortBy::Category => SortOrder::Category,
        }
    }
}
