use crate::convert::{FieldValue, Fields};
use crate::format::LineRole;
use serde::Serialize;
use std::fmt;

/// One classified line with its typed fields
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypedEvent {
    /// Name of the line definition that matched
    pub line_type: String,
    pub role: LineRole,
    /// Source line number (1-indexed)
    pub line_number: usize,
    pub fields: Fields,
}

impl TypedEvent {
    pub fn new(line_type: impl Into<String>, role: LineRole, line_number: usize) -> Self {
        Self {
            line_type: line_type.into(),
            role,
            line_number,
            fields: Fields::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }
}

/// Lifecycle of a reconstructed request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    /// Header seen, footer not yet seen
    Open,
    /// Terminated by a footer
    Completed,
    /// Flushed without a footer (new header or end of stream)
    Incomplete,
    /// A footer that arrived without a header
    Orphan,
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestStatus::Open => write!(f, "open"),
            RequestStatus::Completed => write!(f, "completed"),
            RequestStatus::Incomplete => write!(f, "incomplete"),
            RequestStatus::Orphan => write!(f, "orphan"),
        }
    }
}

/// Logical request assembled from related, adjacent log lines
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Request {
    pub status: RequestStatus,
    /// Fields merged from every contributing event
    pub fields: Fields,
    pub events: Vec<TypedEvent>,
    pub first_line: usize,
    pub last_line: usize,
}

impl Request {
    /// Starts a request from its first event
    pub fn open(event: TypedEvent) -> Self {
        Self {
            status: RequestStatus::Open,
            fields: event.fields.clone(),
            first_line: event.line_number,
            last_line: event.line_number,
            events: vec![event],
        }
    }

    /// Builds a request out of a terminating event that had no header
    pub fn orphan(event: TypedEvent) -> Self {
        let mut request = Self::open(event);
        request.status = RequestStatus::Orphan;
        request
    }

    /// Merges an event into the request.
    ///
    /// The first value of a field wins, except that numeric values repeated by
    /// body events accumulate (e.g. the durations of several rendered partials).
    pub fn merge(&mut self, event: TypedEvent) {
        for (name, value) in &event.fields {
            match self.fields.get_mut(name) {
                None => {
                    self.fields.insert(name.clone(), value.clone());
                }
                Some(existing) if event.role == LineRole::Body => {
                    if let Some(sum) = existing.accumulate(value) {
                        *existing = sum;
                    }
                }
                Some(_) => {}
            }
        }
        self.last_line = self.last_line.max(event.line_number);
        self.events.push(event);
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Every value of a field, one per event that carried it, in line order
    pub fn every(&self, name: &str) -> Vec<&FieldValue> {
        self.events.iter().filter_map(|e| e.get(name)).collect()
    }

    pub fn has_line_type(&self, line_type: &str) -> bool {
        self.events.iter().any(|e| e.line_type == line_type)
    }

    pub fn line_types(&self) -> impl Iterator<Item = &str> {
        self.events.iter().map(|e| e.line_type.as_str())
    }

    pub fn is_completed(&self) -> bool {
        self.status == RequestStatus::Completed
    }

    pub fn is_incomplete(&self) -> bool {
        self.status == RequestStatus::Incomplete
    }

    pub fn is_orphan(&self) -> bool {
        self.status == RequestStatus::Orphan
    }
}

/// Anything categorizers and filters can read fields from
pub trait Record {
    fn field(&self, name: &str) -> Option<&FieldValue>;
    fn has_line_type(&self, line_type: &str) -> bool;
}

impl Record for Request {
    fn field(&self, name: &str) -> Option<&FieldValue> {
        self.get(name)
    }

    fn has_line_type(&self, line_type: &str) -> bool {
        Request::has_line_type(self, line_type)
    }
}

/// A single event seen through its enclosing request: the event's own fields
/// shadow the request's merged ones. Used for per-item reporting.
#[derive(Debug, Clone, Copy)]
pub struct EventRecord<'a> {
    pub event: &'a TypedEvent,
    pub request: &'a Request,
}

impl Record for EventRecord<'_> {
    fn field(&self, name: &str) -> Option<&FieldValue> {
        self.event.get(name).or_else(|| self.request.get(name))
    }

    fn has_line_type(&self, line_type: &str) -> bool {
        self.event.line_type == line_type
    }
}
