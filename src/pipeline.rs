//! Stream processing: lines in, requests out to the reports.
//!
//! Each input stream gets its own [`StreamProcessor`] and request builder and is
//! processed strictly in order. Several streams can run in parallel; they share
//! only the report set, behind a mutex.

use crate::matcher::{LineMatcher, MatchOutcome};
use crate::report::{ReportSet, ReportSnapshot, SortOrder};
use crate::request::{BuilderStats, RequestBuilder, RequestSink};
use indicatif::ProgressBar;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use thiserror::Error;
use tracing::{info, trace, warn};

/// Source name that reads standard input
pub const STDIN_SOURCE: &str = "-";

const PROGRESS_BATCH: u64 = 1024;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Failed to open '{path}': {source}")]
    Open { path: PathBuf, source: io::Error },

    #[error("Failed to read '{path}': {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("Skipped '{path}': run was cancelled")]
    Cancelled { path: PathBuf },
}

/// Counters for one processed stream
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StreamSummary {
    pub lines: usize,
    pub blank_lines: usize,
    pub matched_lines: usize,
    /// Non-blank lines no definition accepted, including rejected ones
    pub unmatched_lines: usize,
    pub conversion_failures: usize,
    pub conversion_failures_by_line_type: BTreeMap<String, usize>,
    #[serde(flatten)]
    pub requests: BuilderStats,
}

impl StreamSummary {
    pub fn merge(&mut self, other: &StreamSummary) {
        self.lines += other.lines;
        self.blank_lines += other.blank_lines;
        self.matched_lines += other.matched_lines;
        self.unmatched_lines += other.unmatched_lines;
        self.conversion_failures += other.conversion_failures;
        for (line_type, count) in &other.conversion_failures_by_line_type {
            *self
                .conversion_failures_by_line_type
                .entry(line_type.clone())
                .or_default() += count;
        }
        self.requests.merge(&other.requests);
    }
}

/// Feeds the lines of one stream through the matcher and a request builder
#[derive(Debug)]
pub struct StreamProcessor<'a> {
    matcher: &'a LineMatcher,
    builder: RequestBuilder,
    summary: StreamSummary,
}

impl<'a> StreamProcessor<'a> {
    pub fn new(matcher: &'a LineMatcher) -> Self {
        Self {
            matcher,
            builder: RequestBuilder::for_format(matcher.format()),
            summary: StreamSummary::default(),
        }
    }

    /// Counters so far; request counts only cover requests already emitted
    pub fn summary(&self) -> StreamSummary {
        StreamSummary {
            requests: self.builder.stats().clone(),
            ..self.summary.clone()
        }
    }

    pub fn feed_line(&mut self, line: &str, sink: &mut impl RequestSink) {
        self.summary.lines += 1;
        let line_number = self.summary.lines;
        let line = line.trim_end_matches(['\r', '\n']);

        if line.trim().is_empty() {
            self.summary.blank_lines += 1;
            return;
        }

        match self.matcher.match_line(line, line_number) {
            MatchOutcome::Matched(event) => {
                self.summary.matched_lines += 1;
                self.builder.push(event, sink);
            }
            MatchOutcome::NoMatch => {
                self.summary.unmatched_lines += 1;
                trace!(line = line_number, "no line definition matched");
            }
            MatchOutcome::Rejected { line_type, .. } => {
                self.summary.unmatched_lines += 1;
                self.summary.conversion_failures += 1;
                *self
                    .summary
                    .conversion_failures_by_line_type
                    .entry(line_type)
                    .or_default() += 1;
            }
        }
    }

    /// End of stream: flushes open requests and returns the final counters
    pub fn finish(mut self, sink: &mut impl RequestSink) -> StreamSummary {
        self.builder.finish(sink);
        self.summary.requests = self.builder.stats().clone();
        self.summary
    }
}

/// Processes an in-memory sequence of lines as one stream
pub fn analyze_lines<I, S>(matcher: &LineMatcher, lines: I, sink: &mut impl RequestSink) -> StreamSummary
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut processor = StreamProcessor::new(matcher);
    for line in lines {
        processor.feed_line(line.as_ref(), sink);
    }
    processor.finish(sink)
}

/// Processes a reader as one stream. Invalid UTF-8 is replaced, not fatal.
///
/// When `cancel` is raised the stream stops being read and its open requests
/// are flushed as on a normal end of stream.
pub fn analyze_reader<R: BufRead>(
    matcher: &LineMatcher,
    reader: R,
    sink: &mut impl RequestSink,
    cancel: Option<&AtomicBool>,
) -> io::Result<StreamSummary> {
    read_stream(matcher, reader, sink, cancel, None)
}

fn read_stream<R: BufRead>(
    matcher: &LineMatcher,
    mut reader: R,
    sink: &mut impl RequestSink,
    cancel: Option<&AtomicBool>,
    progress: Option<&ProgressBar>,
) -> io::Result<StreamSummary> {
    let mut processor = StreamProcessor::new(matcher);
    let mut buf = Vec::new();
    let mut pending = 0u64;

    loop {
        if cancel.is_some_and(|c| c.load(Ordering::Relaxed)) {
            info!("cancelled, flushing open requests");
            break;
        }
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        processor.feed_line(&String::from_utf8_lossy(&buf), sink);

        pending += 1;
        if pending == PROGRESS_BATCH {
            if let Some(bar) = progress {
                bar.inc(pending);
            }
            pending = 0;
        }
    }
    if let Some(bar) = progress {
        bar.inc(pending);
    }

    Ok(processor.finish(sink))
}

/// Opens a file, or standard input for `-`, and processes it as one stream
pub fn analyze_path(
    matcher: &LineMatcher,
    path: &Path,
    sink: &mut impl RequestSink,
    cancel: Option<&AtomicBool>,
) -> Result<StreamSummary, PipelineError> {
    process_source(matcher, path, sink, cancel, None)
}

fn process_source(
    matcher: &LineMatcher,
    path: &Path,
    sink: &mut impl RequestSink,
    cancel: Option<&AtomicBool>,
    progress: Option<&ProgressBar>,
) -> Result<StreamSummary, PipelineError> {
    let read_error = |source: io::Error| PipelineError::Read {
        path: path.to_path_buf(),
        source,
    };

    let summary = if path.as_os_str() == STDIN_SOURCE {
        read_stream(matcher, io::stdin().lock(), sink, cancel, progress).map_err(read_error)?
    } else {
        let file = File::open(path).map_err(|source| PipelineError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        read_stream(matcher, BufReader::new(file), sink, cancel, progress).map_err(read_error)?
    };

    info!(
        source = %path.display(),
        lines = summary.lines,
        matched = summary.matched_lines,
        unmatched = summary.unmatched_lines,
        completed = summary.requests.completed,
        incomplete = summary.requests.incomplete,
        orphan = summary.requests.orphan,
        "finished stream"
    );
    Ok(summary)
}

/// Outcome for one input source
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceSummary {
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<StreamSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Counters for a whole run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub totals: StreamSummary,
    pub sources: Vec<SourceSummary>,
    pub cancelled: bool,
}

impl RunSummary {
    pub fn failed_sources(&self) -> usize {
        self.sources.iter().filter(|s| s.error.is_some()).count()
    }

    fn record(&mut self, source: &Path, outcome: Result<StreamSummary, PipelineError>) {
        let source = source.display().to_string();
        match outcome {
            Ok(summary) => {
                self.totals.merge(&summary);
                self.sources.push(SourceSummary {
                    source,
                    summary: Some(summary),
                    error: None,
                });
            }
            Err(error) => {
                warn!(%error, "skipping input");
                self.sources.push(SourceSummary {
                    source,
                    summary: None,
                    error: Some(error.to_string()),
                });
            }
        }
    }
}

/// Final, renderable result of a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub summary: RunSummary,
    pub reports: Vec<ReportSnapshot>,
}

/// Reports and counters after a run
#[derive(Debug)]
pub struct Analysis {
    pub reports: ReportSet,
    pub summary: RunSummary,
}

impl Analysis {
    pub fn snapshot(&self, order: SortOrder) -> AnalysisReport {
        AnalysisReport {
            summary: self.summary.clone(),
            reports: self.reports.snapshot(order),
        }
    }
}

/// Settings for [`analyze_files`]
#[derive(Debug, Clone, Default)]
pub struct AnalyzeOptions {
    jobs: Option<usize>,
    cancel: Option<Arc<AtomicBool>>,
    progress: Option<ProgressBar>,
}

impl AnalyzeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Worker threads; defaults to the available parallelism
    pub fn jobs(mut self, jobs: usize) -> Self {
        self.jobs = Some(jobs.max(1));
        self
    }

    pub fn cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    fn worker_count(&self, sources: usize) -> usize {
        let jobs = self
            .jobs
            .or_else(|| thread::available_parallelism().ok().map(usize::from))
            .unwrap_or(1);
        jobs.clamp(1, sources.max(1))
    }
}

/// Processes every source into one report set.
///
/// Sources are handed out to a bounded pool of scoped threads; each source is
/// one stream with its own request builder. Unreadable sources are recorded in
/// the summary and skipped.
pub fn analyze_files(
    matcher: &LineMatcher,
    sources: &[PathBuf],
    reports: ReportSet,
    options: &AnalyzeOptions,
) -> Analysis {
    let shared = Mutex::new(reports);
    let next = AtomicUsize::new(0);
    let outcomes = Mutex::new(Vec::with_capacity(sources.len()));
    let cancel = options.cancel.as_deref();
    let progress = options.progress.as_ref();

    thread::scope(|scope| {
        for _ in 0..options.worker_count(sources.len()) {
            scope.spawn(|| {
                loop {
                    if cancel.is_some_and(|c| c.load(Ordering::Relaxed)) {
                        break;
                    }
                    let index = next.fetch_add(1, Ordering::Relaxed);
                    let Some(path) = sources.get(index) else {
                        break;
                    };
                    let mut sink = &shared;
                    let outcome = process_source(matcher, path, &mut sink, cancel, progress);
                    outcomes
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .push((index, outcome));
                }
            });
        }
    });

    let mut by_source: Vec<Option<Result<StreamSummary, PipelineError>>> =
        sources.iter().map(|_| None).collect();
    for (index, outcome) in outcomes.into_inner().unwrap_or_else(PoisonError::into_inner) {
        by_source[index] = Some(outcome);
    }

    let mut summary = RunSummary {
        cancelled: cancel.is_some_and(|c| c.load(Ordering::Relaxed)),
        ..RunSummary::default()
    };
    // sources never picked up before cancellation are still accounted for
    for (path, outcome) in sources.iter().zip(by_source) {
        let outcome = outcome.unwrap_or_else(|| {
            Err(PipelineError::Cancelled {
                path: path.to_path_buf(),
            })
        });
        summary.record(path, outcome);
    }

    Analysis {
        reports: shared.into_inner().unwrap_or_else(PoisonError::into_inner),
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{CaptureConfig, FormatConfig, LineDefinitionConfig};
    use crate::request::{Request, RequestStatus};

    fn matcher() -> LineMatcher {
        let format = FormatConfig::new("test")
            .line(
                LineDefinitionConfig::new("start", r"^START (\w+)")
                    .header(true)
                    .capture(CaptureConfig::new("name", "string")),
            )
            .line(
                LineDefinitionConfig::new("end", r"^END (\S+)")
                    .footer(true)
                    .capture(CaptureConfig::new("status", "integer")),
            );
        LineMatcher::from_config(&format).unwrap()
    }

    #[test]
    fn counts_lines_by_outcome() {
        let mut out: Vec<Request> = Vec::new();
        let summary = analyze_lines(
            &matcher(),
            ["START a", "", "noise", "END 200", "END x", "START b"],
            &mut out,
        );
        assert_eq!(summary.lines, 6);
        assert_eq!(summary.blank_lines, 1);
        assert_eq!(summary.matched_lines, 3);
        assert_eq!(summary.unmatched_lines, 2);
        assert_eq!(summary.conversion_failures_by_line_type.get("end"), Some(&1));
        assert_eq!(summary.requests.completed, 1);
        assert_eq!(summary.requests.incomplete, 1);
        assert_eq!(out.len(), 2);
    }

    /// Raises `flag` once `lines` newlines have been consumed
    struct CancelAfter<'a, R> {
        inner: R,
        lines: usize,
        flag: &'a AtomicBool,
    }

    impl<R: BufRead> io::Read for CancelAfter<'_, R> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            io::Read::read(&mut self.inner, buf)
        }
    }

    impl<R: BufRead> BufRead for CancelAfter<'_, R> {
        fn fill_buf(&mut self) -> io::Result<&[u8]> {
            self.inner.fill_buf()
        }

        fn consume(&mut self, amt: usize) {
            let newlines = self
                .inner
                .fill_buf()
                .map(|b| b[..amt.min(b.len())].iter().filter(|&&c| c == b'\n').count())
                .unwrap_or(0);
            self.inner.consume(amt);
            self.lines = self.lines.saturating_sub(newlines);
            if self.lines == 0 {
                self.flag.store(true, Ordering::Relaxed);
            }
        }
    }

    #[test]
    fn cancel_mid_request_flushes_it_as_incomplete() {
        let cancel = AtomicBool::new(false);
        let reader = CancelAfter {
            inner: "START a\nEND 200\nSTART b\n".as_bytes(),
            lines: 1,
            flag: &cancel,
        };
        let mut out: Vec<Request> = Vec::new();
        let summary = analyze_reader(&matcher(), reader, &mut out, Some(&cancel)).unwrap();

        assert_eq!(summary.lines, 1);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].status, RequestStatus::Incomplete);
        assert_eq!(summary.requests.incomplete, 1);
        assert_eq!(summary.requests.completed, 0);
    }

    #[test]
    fn cancel_before_first_line_reads_nothing() {
        let cancel = AtomicBool::new(true);
        let mut out: Vec<Request> = Vec::new();
        let summary =
            analyze_reader(&matcher(), "START a\nEND 200\n".as_bytes(), &mut out, Some(&cancel))
                .unwrap();
        assert_eq!(summary.lines, 0);
        assert!(out.is_empty());
    }

    #[test]
    fn reader_handles_crlf_and_missing_trailing_newline() {
        let mut out: Vec<Request> = Vec::new();
        let summary =
            analyze_reader(&matcher(), "START a\r\nEND 200".as_bytes(), &mut out, None).unwrap();
        assert_eq!(summary.matched_lines, 2);
        assert_eq!(out.len(), 1);
        assert!(out[0].is_completed());
    }
}
