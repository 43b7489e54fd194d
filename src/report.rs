//! Streaming report aggregators.
//!
//! A [`ReportSet`] holds the configured reports and is the only place completed
//! requests are observed. Snapshots are read-only views taken at the end of a run.

mod display;
mod duration;
mod frequency;
mod hourly;
mod timespan;

pub use display::{create_styled_table, format_analysis_json, format_analysis_text};
pub use duration::{DurationAccumulator, DurationRow, DurationStats, SortOrder};
pub use frequency::{FrequencyRow, FrequencyTable};
pub use hourly::{HourlySnapshot, HourlySpread};
pub use timespan::{Timespan, TimespanSnapshot};

use crate::convert::FieldValue;
use crate::filter::{CategoryKey, Categorizer, FilterParseError, RequestFilter};
use crate::request::{EventRecord, Record, Request, RequestSink, TypedEvent};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_TIMESTAMP_FIELD: &str = "timestamp";

/// Errors detected while compiling report definitions
#[derive(Debug, Error, PartialEq)]
pub enum ReportError {
    #[error("report '{report}' needs a category")]
    MissingCategory { report: String },

    #[error("report '{report}' needs a value field")]
    MissingField { report: String },

    #[error("invalid filter for report '{report}': {source}")]
    InvalidFilter {
        report: String,
        source: FilterParseError,
    },

    #[error("invalid category for report '{report}': {source}")]
    InvalidCategory {
        report: String,
        source: FilterParseError,
    },

    #[error("report '{report}' refers to unknown line type '{line_type}'")]
    UnknownLineType { report: String, line_type: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    Frequency,
    Duration,
    Timespan,
    HourlySpread,
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportKind::Frequency => write!(f, "frequency"),
            ReportKind::Duration => write!(f, "duration"),
            ReportKind::Timespan => write!(f, "timespan"),
            ReportKind::HourlySpread => write!(f, "hourly_spread"),
        }
    }
}

/// Declarative report definition, as found in a profile's `[[reports]]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    pub kind: ReportKind,
    #[serde(default)]
    pub title: Option<String>,
    /// Value field for duration reports, timestamp field for timespan and hourly reports
    #[serde(default)]
    pub field: Option<String>,
    /// A field name, or a template such as `{controller}#{action}`
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub filter: Option<String>,
    /// Only requests containing one of these line kinds are considered
    #[serde(default)]
    pub line_types: Vec<String>,
    /// Report every event of the restricted line kinds separately
    #[serde(default)]
    pub multiple: bool,
}

impl ReportConfig {
    fn with_kind(kind: ReportKind) -> Self {
        Self {
            kind,
            title: None,
            field: None,
            category: None,
            filter: None,
            line_types: Vec::new(),
            multiple: false,
        }
    }

    pub fn frequency(category: &str) -> Self {
        Self {
            category: Some(category.to_string()),
            ..Self::with_kind(ReportKind::Frequency)
        }
    }

    pub fn duration(field: &str, category: &str) -> Self {
        Self {
            field: Some(field.to_string()),
            category: Some(category.to_string()),
            ..Self::with_kind(ReportKind::Duration)
        }
    }

    pub fn timespan() -> Self {
        Self::with_kind(ReportKind::Timespan)
    }

    pub fn hourly_spread() -> Self {
        Self::with_kind(ReportKind::HourlySpread)
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn field(mut self, field: &str) -> Self {
        self.field = Some(field.to_string());
        self
    }

    pub fn filter(mut self, filter: &str) -> Self {
        self.filter = Some(filter.to_string());
        self
    }

    pub fn line_types(mut self, line_types: &[&str]) -> Self {
        self.line_types = line_types.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn multiple(mut self) -> Self {
        self.multiple = true;
        self
    }

    pub fn effective_title(&self) -> String {
        if let Some(title) = &self.title {
            return title.clone();
        }
        match self.kind {
            ReportKind::Frequency => self.category.clone().unwrap_or_default(),
            ReportKind::Duration => self.field.clone().unwrap_or_default(),
            ReportKind::Timespan => "Request timespan".to_string(),
            ReportKind::HourlySpread => "Request distribution per hour".to_string(),
        }
    }
}

/// Records a report left out, by reason
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Exclusions {
    pub filtered: u64,
    pub errors: u64,
    pub missing_value: u64,
}

#[derive(Debug, Clone)]
enum Accumulator {
    Frequency(FrequencyTable),
    Duration(DurationStats),
    Timespan(Timespan),
    HourlySpread(HourlySpread),
}

impl Accumulator {
    fn empty(kind: ReportKind) -> Self {
        match kind {
            ReportKind::Frequency => Accumulator::Frequency(FrequencyTable::new()),
            ReportKind::Duration => Accumulator::Duration(DurationStats::new()),
            ReportKind::Timespan => Accumulator::Timespan(Timespan::new()),
            ReportKind::HourlySpread => Accumulator::HourlySpread(HourlySpread::new()),
        }
    }
}

/// A compiled report: selection rules plus its accumulator
#[derive(Debug, Clone)]
pub struct Report {
    title: String,
    kind: ReportKind,
    categorizer: Option<Categorizer>,
    value_field: Option<String>,
    filter: Option<RequestFilter>,
    line_types: Vec<String>,
    multiple: bool,
    accumulator: Accumulator,
    exclusions: Exclusions,
}

impl Report {
    fn new(title: &str, kind: ReportKind) -> Self {
        Self {
            title: title.to_string(),
            kind,
            categorizer: None,
            value_field: None,
            filter: None,
            line_types: Vec::new(),
            multiple: false,
            accumulator: Accumulator::empty(kind),
            exclusions: Exclusions::default(),
        }
    }

    pub fn frequency(title: &str, categorizer: Categorizer) -> Self {
        Self {
            categorizer: Some(categorizer),
            ..Self::new(title, ReportKind::Frequency)
        }
    }

    pub fn duration(title: &str, field: &str, categorizer: Categorizer) -> Self {
        Self {
            categorizer: Some(categorizer),
            value_field: Some(field.to_string()),
            ..Self::new(title, ReportKind::Duration)
        }
    }

    pub fn timespan(title: &str, field: &str) -> Self {
        Self {
            value_field: Some(field.to_string()),
            ..Self::new(title, ReportKind::Timespan)
        }
    }

    pub fn hourly_spread(title: &str, field: &str) -> Self {
        Self {
            value_field: Some(field.to_string()),
            ..Self::new(title, ReportKind::HourlySpread)
        }
    }

    pub fn with_filter(mut self, filter: RequestFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_line_types<I, S>(mut self, line_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.line_types = line_types.into_iter().map(Into::into).collect();
        self
    }

    /// Observe every event of the restricted line kinds instead of the whole request
    pub fn per_event(mut self) -> Self {
        self.multiple = true;
        self
    }

    /// Validates a declarative definition and builds the report
    pub fn compile(config: &ReportConfig) -> Result<Self, ReportError> {
        let title = config.effective_title();

        let categorizer = || -> Result<Categorizer, ReportError> {
            let category = config
                .category
                .as_deref()
                .ok_or_else(|| ReportError::MissingCategory {
                    report: title.clone(),
                })?;
            if category.contains('{') {
                Categorizer::template(category).map_err(|source| ReportError::InvalidCategory {
                    report: title.clone(),
                    source,
                })
            } else {
                Ok(Categorizer::field(category))
            }
        };

        let mut report = match config.kind {
            ReportKind::Frequency => Report::frequency(&title, categorizer()?),
            ReportKind::Duration => {
                let field = config
                    .field
                    .as_deref()
                    .ok_or_else(|| ReportError::MissingField {
                        report: title.clone(),
                    })?;
                Report::duration(&title, field, categorizer()?)
            }
            ReportKind::Timespan => Report::timespan(
                &title,
                config.field.as_deref().unwrap_or(DEFAULT_TIMESTAMP_FIELD),
            ),
            ReportKind::HourlySpread => Report::hourly_spread(
                &title,
                config.field.as_deref().unwrap_or(DEFAULT_TIMESTAMP_FIELD),
            ),
        };

        if let Some(expression) = &config.filter {
            let filter = RequestFilter::parse(expression).map_err(|source| {
                ReportError::InvalidFilter {
                    report: title.clone(),
                    source,
                }
            })?;
            report = report.with_filter(filter);
        }
        report = report.with_line_types(config.line_types.iter().cloned());
        if config.multiple {
            report = report.per_event();
        }
        Ok(report)
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn kind(&self) -> ReportKind {
        self.kind
    }

    pub fn categorizer(&self) -> Option<&Categorizer> {
        self.categorizer.as_ref()
    }

    pub fn value_field(&self) -> Option<&str> {
        self.value_field.as_deref()
    }

    pub fn filter(&self) -> Option<&RequestFilter> {
        self.filter.as_ref()
    }

    pub fn line_types(&self) -> &[String] {
        &self.line_types
    }

    pub fn is_per_event(&self) -> bool {
        self.multiple
    }

    pub fn exclusions(&self) -> Exclusions {
        self.exclusions
    }

    /// Feeds one completed request
    pub fn update(&mut self, request: &Request) {
        if !self.line_types.is_empty() && !self.line_types.iter().any(|t| request.has_line_type(t)) {
            return;
        }

        if self.multiple {
            let events: Vec<&TypedEvent> = request
                .events
                .iter()
                .filter(|e| self.line_types.is_empty() || self.line_types.contains(&e.line_type))
                .collect();
            for event in events {
                self.observe(&EventRecord { event, request });
            }
        } else {
            self.observe(request);
        }
    }

    fn observe(&mut self, record: &dyn Record) {
        if let Some(filter) = &self.filter {
            match filter.evaluate(record) {
                Ok(true) => {}
                Ok(false) => {
                    self.exclusions.filtered += 1;
                    return;
                }
                Err(error) => {
                    debug!(report = %self.title, %error, "filter failed, record excluded");
                    self.exclusions.errors += 1;
                    return;
                }
            }
        }

        let key = match &self.categorizer {
            Some(categorizer) => match categorizer.categorize(record) {
                Ok(key) => key,
                Err(error) => {
                    debug!(report = %self.title, %error, "categorizer failed, record excluded");
                    self.exclusions.errors += 1;
                    return;
                }
            },
            None => CategoryKey::Absent,
        };

        let value = self.value_field.as_deref().and_then(|f| record.field(f));
        let observed = match &mut self.accumulator {
            Accumulator::Frequency(table) => {
                table.observe(key);
                true
            }
            Accumulator::Duration(stats) => match value.and_then(FieldValue::as_f64) {
                Some(seconds) => {
                    stats.observe(key, seconds);
                    true
                }
                None => false,
            },
            Accumulator::Timespan(span) => match value.and_then(FieldValue::as_timestamp) {
                Some(ts) => {
                    span.observe(ts);
                    true
                }
                None => false,
            },
            Accumulator::HourlySpread(spread) => value
                .and_then(FieldValue::as_timestamp)
                .is_some_and(|ts| spread.observe(ts)),
        };
        if !observed {
            self.exclusions.missing_value += 1;
        }
    }

    /// Read-only view of the accumulated state
    pub fn snapshot(&self, order: SortOrder) -> ReportSnapshot {
        let data = match &self.accumulator {
            Accumulator::Frequency(table) => ReportData::Frequency {
                total: table.total(),
                rows: table.snapshot(),
            },
            Accumulator::Duration(stats) => ReportData::Duration {
                rows: stats.snapshot(order),
            },
            Accumulator::Timespan(span) => ReportData::Timespan(span.snapshot()),
            Accumulator::HourlySpread(spread) => ReportData::HourlySpread(spread.snapshot()),
        };
        ReportSnapshot {
            title: self.title.clone(),
            category: self.categorizer.as_ref().map(ToString::to_string),
            field: self.value_field.clone(),
            data,
            excluded: self.exclusions,
        }
    }

    /// Clears accumulated state, keeping the definition
    pub fn reset(&mut self) {
        self.accumulator = Accumulator::empty(self.kind);
        self.exclusions = Exclusions::default();
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportData {
    Frequency { total: u64, rows: Vec<FrequencyRow> },
    Duration { rows: Vec<DurationRow> },
    Timespan(TimespanSnapshot),
    HourlySpread(HourlySnapshot),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSnapshot {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(flatten)]
    pub data: ReportData,
    pub excluded: Exclusions,
}

impl ReportSnapshot {
    pub fn frequency_rows(&self) -> Option<&[FrequencyRow]> {
        match &self.data {
            ReportData::Frequency { rows, .. } => Some(rows),
            _ => None,
        }
    }

    pub fn duration_rows(&self) -> Option<&[DurationRow]> {
        match &self.data {
            ReportData::Duration { rows } => Some(rows),
            _ => None,
        }
    }
}

/// The configured reports of a run, fed with every emitted request
#[derive(Debug, Clone, Default)]
pub struct ReportSet {
    reports: Vec<Report>,
    observed: u64,
}

impl ReportSet {
    pub fn new(reports: Vec<Report>) -> Self {
        Self {
            reports,
            observed: 0,
        }
    }

    pub fn compile(configs: &[ReportConfig]) -> Result<Self, ReportError> {
        configs
            .iter()
            .map(Report::compile)
            .collect::<Result<Vec<_>, _>>()
            .map(Self::new)
    }

    pub fn push(&mut self, report: Report) {
        self.reports.push(report);
    }

    pub fn reports(&self) -> &[Report] {
        &self.reports
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    /// Requests observed since the last reset
    pub fn observed(&self) -> u64 {
        self.observed
    }

    pub fn update(&mut self, request: &Request) {
        self.observed += 1;
        for report in &mut self.reports {
            report.update(request);
        }
    }

    pub fn snapshot(&self, order: SortOrder) -> Vec<ReportSnapshot> {
        self.reports.iter().map(|r| r.snapshot(order)).collect()
    }

    pub fn reset(&mut self) {
        self.observed = 0;
        self.reports.iter_mut().for_each(Report::reset);
    }
}

impl RequestSink for ReportSet {
    fn accept(&mut self, request: Request) {
        self.update(&request);
    }
}
