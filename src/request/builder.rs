use super::entities::{Request, RequestStatus, TypedEvent};
use crate::format::{DEFAULT_MAX_OPEN_REQUESTS, FileFormat, LineRole};
use serde::Serialize;
use std::sync::Mutex;
use tracing::{debug, trace};

/// Receives requests as the builder finalizes them
pub trait RequestSink {
    fn accept(&mut self, request: Request);
}

impl RequestSink for Vec<Request> {
    fn accept(&mut self, request: Request) {
        self.push(request);
    }
}

impl<S: RequestSink> RequestSink for &Mutex<S> {
    fn accept(&mut self, request: Request) {
        self.lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .accept(request);
    }
}

/// Counters kept while reconstructing requests
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuilderStats {
    pub completed: usize,
    pub incomplete: usize,
    pub orphan: usize,
    /// Body lines that arrived while no request was open
    pub stray_body_lines: usize,
}

impl BuilderStats {
    pub fn merge(&mut self, other: &BuilderStats) {
        self.completed += other.completed;
        self.incomplete += other.incomplete;
        self.orphan += other.orphan;
        self.stray_body_lines += other.stray_body_lines;
    }

    pub fn total_requests(&self) -> usize {
        self.completed + self.incomplete + self.orphan
    }
}

#[derive(Debug)]
struct OpenRequest {
    key: Option<String>,
    request: Request,
}

/// Per-stream state machine turning classified events into requests.
///
/// Without a correlation field at most one request is open and lines belong to the
/// most recently opened one. With a correlation field, requests are keyed by that
/// field's value and up to `max_open` of them may be open at once.
#[derive(Debug)]
pub struct RequestBuilder {
    correlation_field: Option<String>,
    max_open: usize,
    /// Oldest first
    open: Vec<OpenRequest>,
    stats: BuilderStats,
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new(None, DEFAULT_MAX_OPEN_REQUESTS)
    }
}

impl RequestBuilder {
    pub fn new(correlation_field: Option<String>, max_open: usize) -> Self {
        Self {
            correlation_field,
            max_open: max_open.max(1),
            open: Vec::new(),
            stats: BuilderStats::default(),
        }
    }

    pub fn for_format(format: &FileFormat) -> Self {
        Self::new(format.correlation_field.clone(), format.max_open_requests)
    }

    pub fn stats(&self) -> &BuilderStats {
        &self.stats
    }

    pub fn open_requests(&self) -> usize {
        self.open.len()
    }

    /// Feeds one event, handing any request it finalizes to `sink`
    pub fn push(&mut self, event: TypedEvent, sink: &mut impl RequestSink) {
        let key = self.correlation_key(&event);

        match event.role {
            LineRole::Header | LineRole::Single => {
                if let Some(index) = self.open.iter().rposition(|o| o.key == key) {
                    let unterminated = self.open.remove(index);
                    debug!(
                        first_line = unterminated.request.first_line,
                        next_header = event.line_number,
                        "header line while a request is open, flushing it as incomplete"
                    );
                    self.emit(unterminated.request, RequestStatus::Incomplete, sink);
                }

                let request = Request::open(event);
                if request.events[0].role == LineRole::Single {
                    self.emit(request, RequestStatus::Completed, sink);
                } else {
                    self.open.push(OpenRequest { key, request });
                    self.enforce_limit(sink);
                }
            }
            LineRole::Body => match self.position_for(key.as_deref()) {
                Some(index) => self.open[index].request.merge(event),
                None => {
                    self.stats.stray_body_lines += 1;
                    debug!(
                        line = event.line_number,
                        line_type = %event.line_type,
                        "body line found outside of a request"
                    );
                }
            },
            LineRole::Footer => match self.position_for(key.as_deref()) {
                Some(index) => {
                    let mut open = self.open.remove(index);
                    open.request.merge(event);
                    self.emit(open.request, RequestStatus::Completed, sink);
                }
                None => {
                    trace!(
                        line = event.line_number,
                        line_type = %event.line_type,
                        "footer without header, emitting orphan request"
                    );
                    self.emit(Request::orphan(event), RequestStatus::Orphan, sink);
                }
            },
        }
    }

    /// End of stream: flushes every open request as incomplete, oldest first
    pub fn finish(&mut self, sink: &mut impl RequestSink) {
        for open in std::mem::take(&mut self.open) {
            debug!(
                first_line = open.request.first_line,
                "stream ended inside a request, flushing it as incomplete"
            );
            self.emit(open.request, RequestStatus::Incomplete, sink);
        }
    }

    fn correlation_key(&self, event: &TypedEvent) -> Option<String> {
        let field = self.correlation_field.as_deref()?;
        event.get(field).map(ToString::to_string)
    }

    /// Keyed events go to their own request; unkeyed ones to the newest open request
    fn position_for(&self, key: Option<&str>) -> Option<usize> {
        match key {
            Some(key) => self.open.iter().rposition(|o| o.key.as_deref() == Some(key)),
            None => self.open.len().checked_sub(1),
        }
    }

    fn enforce_limit(&mut self, sink: &mut impl RequestSink) {
        while self.open.len() > self.max_open {
            let evicted = self.open.remove(0);
            debug!(
                first_line = evicted.request.first_line,
                max_open = self.max_open,
                "too many open requests, flushing the oldest as incomplete"
            );
            self.emit(evicted.request, RequestStatus::Incomplete, sink);
        }
    }

    fn emit(&mut self, mut request: Request, status: RequestStatus, sink: &mut impl RequestSink) {
        request.status = status;
        match status {
            RequestStatus::Completed => self.stats.completed += 1,
            RequestStatus::Incomplete => self.stats.incomplete += 1,
            RequestStatus::Orphan => self.stats.orphan += 1,
            RequestStatus::Open => {}
        }
        sink.accept(request);
    }
}
