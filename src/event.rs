//! Exogenous event source.
//!
//! An `EventSource` reads a trace of whitespace separated `<time> <message>`
//! records in ascending time order and groups records with equal timestamps
//! into a single [`EventBatch`]. Times are non-negative decimals (`3`,
//! `0.5`, `1e3`); messages are integers. The trace is read lazily: only the
//! next batch is held in memory.
//!
//! A malformed record is fatal. The batches before it are still emitted;
//! after that the source stays failed and never reports a clean end.
//!
//! # Example
//!
//! ```rust
//! use devstone::event::EventSource;
//! use devstone::TimeAdvance;
//!
//! let mut source = EventSource::from_text("0 5\n0 7\n2 9").unwrap();
//! assert_eq!(source.output(), &[5, 7]);
//! assert_eq!(source.time_advance(), TimeAdvance::Finite(0.0));
//!
//! source.advance().unwrap();
//! assert_eq!(source.output(), &[9]);
//! assert_eq!(source.time_advance(), TimeAdvance::Finite(2.0));
//! ```

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{TopologyError, TopologyResult};
use crate::types::{Message, SimTime, TimeAdvance};

/// Messages emitted together at one instant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventBatch {
    /// Absolute time of the batch
    pub time: SimTime,
    /// Messages in trace order
    pub messages: Vec<Message>,
}

impl EventBatch {
    pub fn new(time: SimTime, messages: Vec<Message>) -> Self {
        Self { time, messages }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Splits a reader into whitespace separated tokens, tracking line numbers.
#[derive(Debug)]
struct Tokens<R> {
    reader: R,
    pending: VecDeque<String>,
    line: usize,
}

impl<R: BufRead> Tokens<R> {
    fn new(reader: R) -> Self {
        Self {
            reader,
            pending: VecDeque::new(),
            line: 0,
        }
    }

    fn next_token(&mut self) -> TopologyResult<Option<String>> {
        loop {
            if let Some(token) = self.pending.pop_front() {
                return Ok(Some(token));
            }
            let mut buf = String::new();
            if self.reader.read_line(&mut buf)? == 0 {
                return Ok(None);
            }
            self.line += 1;
            self.pending
                .extend(buf.split_whitespace().map(str::to_string));
        }
    }
}

/// Lazy, batched reader of an event trace.
#[derive(Debug)]
pub struct EventSource<R> {
    tokens: Tokens<R>,
    /// Time of the last emitted batch
    last: SimTime,
    /// Batch to emit on the next internal transition
    pending: Option<EventBatch>,
    /// First record of the batch after `pending`
    lookahead: Option<(SimTime, Message)>,
    emitted: u64,
    /// Error hit while prefetching, reported after the batch that
    /// preceded it
    deferred: Option<TopologyError>,
    /// Set once the deferred error has been reported
    failed: bool,
}

impl EventSource<BufReader<File>> {
    /// Opens a trace file.
    pub fn open<P: AsRef<Path>>(path: P) -> TopologyResult<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        tracing::debug!(path = %path.display(), "opened event trace");
        Self::new(BufReader::new(file))
    }
}

impl EventSource<Cursor<String>> {
    /// Reads a trace held in memory.
    pub fn from_text(text: &str) -> TopologyResult<Self> {
        Self::new(Cursor::new(text.to_string()))
    }
}

impl<R: BufRead> EventSource<R> {
    /// Creates a source and prefetches its first batch.
    pub fn new(reader: R) -> TopologyResult<Self> {
        let mut source = Self {
            tokens: Tokens::new(reader),
            last: 0.0,
            pending: None,
            lookahead: None,
            emitted: 0,
            deferred: None,
            failed: false,
        };
        source.pending = source.fetch_batch()?;
        Ok(source)
    }

    /// Time until the next batch, or infinity once the trace is exhausted.
    ///
    /// A rejected trace is due immediately, so the next [`advance`] reports
    /// the error instead of the source going quietly passive.
    ///
    /// [`advance`]: EventSource::advance
    pub fn time_advance(&self) -> TimeAdvance {
        if self.is_failed() {
            return TimeAdvance::Finite(0.0);
        }
        match &self.pending {
            Some(batch) => TimeAdvance::Finite(batch.time - self.last),
            None => TimeAdvance::Infinity,
        }
    }

    /// Messages the next internal transition emits.
    pub fn output(&self) -> &[Message] {
        self.pending
            .as_ref()
            .map(|b| b.messages.as_slice())
            .unwrap_or(&[])
    }

    /// Emits the pending batch and prefetches the one after it.
    ///
    /// Returns `Ok(None)` once the trace is exhausted. If prefetching hits a
    /// malformed record, the pending batch is still returned and the error
    /// comes from the following call. Every call after that fails too.
    pub fn advance(&mut self) -> TopologyResult<Option<EventBatch>> {
        if let Some(e) = self.deferred.take() {
            tracing::warn!(error = %e, emitted = self.emitted, "event trace rejected");
            self.failed = true;
            return Err(e);
        }
        if self.failed {
            return Err(TopologyError::malformed(
                self.tokens.line,
                "trace was already rejected",
            ));
        }

        let Some(batch) = self.pending.take() else {
            return Ok(None);
        };
        self.last = batch.time;
        self.emitted += 1;
        match self.fetch_batch() {
            Ok(next) => self.pending = next,
            Err(e) => self.deferred = Some(e),
        }
        Ok(Some(batch))
    }

    /// Time of the last emitted batch (0 before the first).
    pub fn last_time(&self) -> SimTime {
        self.last
    }

    /// Absolute time of the next batch.
    pub fn next_time(&self) -> Option<SimTime> {
        self.pending.as_ref().map(|b| b.time)
    }

    /// Returns true once every batch was emitted from a well-formed trace.
    pub fn is_exhausted(&self) -> bool {
        self.pending.is_none() && !self.is_failed()
    }

    /// Returns true if the trace was found to be malformed.
    pub fn is_failed(&self) -> bool {
        self.failed || self.deferred.is_some()
    }

    /// Number of batches emitted so far.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    fn read_record(&mut self) -> TopologyResult<Option<(SimTime, Message)>> {
        let Some(time) = self.tokens.next_token()? else {
            return Ok(None);
        };
        let line = self.tokens.line;
        let time: SimTime = match time.parse::<SimTime>() {
            Ok(t) if t.is_finite() && t >= 0.0 => t,
            _ => {
                return Err(TopologyError::malformed(
                    line,
                    format!("invalid timestamp {:?}", time),
                ))
            }
        };

        let Some(message) = self.tokens.next_token()? else {
            return Err(TopologyError::malformed(
                line,
                format!("timestamp {} has no message", time),
            ));
        };
        let line = self.tokens.line;
        let message: Message = message
            .parse()
            .map_err(|_| TopologyError::malformed(line, format!("invalid message {:?}", message)))?;

        tracing::trace!(time, message, "read trace record");
        Ok(Some((time, message)))
    }

    fn fetch_batch(&mut self) -> TopologyResult<Option<EventBatch>> {
        let first = match self.lookahead.take() {
            Some(record) => record,
            None => match self.read_record()? {
                Some(record) => record,
                None => return Ok(None),
            },
        };

        let mut batch = EventBatch::new(first.0, vec![first.1]);
        while let Some((time, message)) = self.read_record()? {
            if time == batch.time {
                batch.messages.push(message);
            } else if time > batch.time {
                self.lookahead = Some((time, message));
                break;
            } else {
                return Err(TopologyError::malformed(
                    self.tokens.line,
                    format!("timestamp {} is before {}", time, batch.time),
                ));
            }
        }
        Ok(Some(batch))
    }
}

/// Yields batches until the trace ends, or one error and then nothing.
impl<R: BufRead> Iterator for EventSource<R> {
    type Item = TopologyResult<EventBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        self.advance().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batches_equal_timestamps() {
        let mut source = EventSource::from_text("0 5\n0 7\n2 9").unwrap();

        assert_eq!(source.output(), &[5, 7]);
        assert_eq!(source.time_advance(), TimeAdvance::Finite(0.0));

        let first = source.advance().unwrap().unwrap();
        assert_eq!(first, EventBatch::new(0.0, vec![5, 7]));
        assert_eq!(source.output(), &[9]);
        assert_eq!(source.time_advance(), TimeAdvance::Finite(2.0));

        let second = source.advance().unwrap().unwrap();
        assert_eq!(second, EventBatch::new(2.0, vec![9]));
        assert!(source.is_exhausted());
        assert_eq!(source.time_advance(), TimeAdvance::Infinity);
        assert!(source.output().is_empty());
        assert!(source.advance().unwrap().is_none());
        assert_eq!(source.emitted(), 2);
    }

    #[test]
    fn test_empty_trace_is_passive() {
        let source = EventSource::from_text("").unwrap();
        assert!(source.is_exhausted());
        assert_eq!(source.time_advance(), TimeAdvance::Infinity);
    }

    #[test]
    fn test_records_may_share_lines() {
        let source = EventSource::from_text("1 1 1 2\n\n3 3").unwrap();
        let batches: Vec<_> = source.collect::<TopologyResult<_>>().unwrap();
        assert_eq!(
            batches,
            vec![EventBatch::new(1.0, vec![1, 2]), EventBatch::new(3.0, vec![3])]
        );
    }

    #[test]
    fn test_time_advance_is_relative() {
        let mut source = EventSource::from_text("4 1\n10 2").unwrap();
        assert_eq!(source.time_advance(), TimeAdvance::Finite(4.0));
        source.advance().unwrap();
        assert_eq!(source.last_time(), 4.0);
        assert_eq!(source.next_time(), Some(10.0));
        assert_eq!(source.time_advance(), TimeAdvance::Finite(6.0));
    }

    #[test]
    fn test_decreasing_timestamp_is_fatal() {
        let mut source = EventSource::from_text("1 1\n5 2\n3 3").unwrap();
        assert!(source.next().unwrap().is_ok());
        let err = source.next().unwrap().unwrap_err();
        assert!(matches!(err, TopologyError::MalformedTrace { line: 3, .. }));
        assert!(source.next().is_none());
    }

    #[test]
    fn test_advance_after_rejection_keeps_failing() {
        let mut source = EventSource::from_text("1 1\n5 2\n3 3").unwrap();

        let first = source.advance().unwrap().unwrap();
        assert_eq!(first, EventBatch::new(1.0, vec![1]));
        assert!(source.is_failed());
        assert!(!source.is_exhausted());
        assert_eq!(source.time_advance(), TimeAdvance::Finite(0.0));

        let err = source.advance().unwrap_err();
        assert!(matches!(err, TopologyError::MalformedTrace { line: 3, .. }));

        assert!(source.advance().is_err());
        assert!(!source.is_exhausted());
        assert_ne!(source.time_advance(), TimeAdvance::Infinity);
        assert_eq!(source.emitted(), 1);
    }

    #[test]
    fn test_decimal_timestamps() {
        let mut source = EventSource::from_text("0.5 1\n0.5 4\n1.5 2\n2e1 3").unwrap();
        assert_eq!(source.time_advance(), TimeAdvance::Finite(0.5));
        assert_eq!(source.output(), &[1, 4]);

        source.advance().unwrap();
        assert_eq!(source.next_time(), Some(1.5));
        assert_eq!(source.time_advance(), TimeAdvance::Finite(1.0));

        source.advance().unwrap();
        assert_eq!(source.next_time(), Some(20.0));
        assert_eq!(source.time_advance(), TimeAdvance::Finite(18.5));
    }

    #[test]
    fn test_decreasing_first_batch_fails_construction() {
        let result = EventSource::from_text("5 1\n2 2");
        assert!(matches!(result, Err(TopologyError::MalformedTrace { .. })));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(EventSource::from_text("x 1").is_err());
        assert!(EventSource::from_text("1 y").is_err());
        assert!(EventSource::from_text("-1 3").is_err());
        assert!(EventSource::from_text("-0.5 3").is_err());
        assert!(EventSource::from_text("inf 3").is_err());
        assert!(EventSource::from_text("NaN 3").is_err());
        assert!(EventSource::from_text("1 2.5").is_err());
        assert!(matches!(
            EventSource::from_text("1"),
            Err(TopologyError::MalformedTrace { line: 1, .. })
        ));
    }
}
