//! Request reconstruction: merging classified lines into logical requests.

mod builder;
mod entities;

pub use builder::{BuilderStats, RequestBuilder, RequestSink};
pub use entities::{EventRecord, Record, Request, RequestStatus, TypedEvent};
