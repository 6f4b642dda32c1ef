// SPDX-License-Identifier: Apache-2.0

//! Downstream consumers of decoded lines.
//!
//! Each tracked archive owns one [`LineSink`]. The reader drives it with a
//! fixed call sequence: `opened` once, any number of `accept`, then exactly one
//! of `eof` or `error`. `deleted` follows `eof` once the archive is finished
//! for good.

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::warn;

use crate::bounded_channel::BoundedSender;

/// Receives the lines and lifecycle notifications for a single archive.
pub trait LineSink: Send {
    fn opened(&mut self);

    fn accept(&mut self, line: String);

    fn eof(&mut self);

    fn error(&mut self);

    /// The archive's content stream is closed for good.
    fn deleted(&mut self);

    /// Nothing handed to this sink from now on reaches a consumer.
    fn is_closed(&self) -> bool {
        false
    }
}

/// One call made against a [`LineSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEvent {
    Opened,
    Line(String),
    Eof,
    Error,
    Deleted,
}

impl LineEvent {
    /// Whether this event ends the read of an archive.
    pub fn is_terminal(&self) -> bool {
        matches!(self, LineEvent::Eof | LineEvent::Error)
    }
}

/// An event tagged with the archive it came from.
#[derive(Debug, Clone)]
pub struct SinkMessage {
    pub path: Arc<Path>,
    pub event: LineEvent,
}

/// Forwards events through a bounded channel to a consumer thread.
pub struct ChannelLineSink {
    path: Arc<Path>,
    tx: BoundedSender<SinkMessage>,
    disconnected: bool,
}

impl ChannelLineSink {
    pub fn new(path: impl AsRef<Path>, tx: BoundedSender<SinkMessage>) -> Self {
        Self {
            path: Arc::from(path.as_ref()),
            tx,
            disconnected: false,
        }
    }

    fn send(&mut self, event: LineEvent) {
        if self.disconnected {
            return;
        }

        let msg = SinkMessage {
            path: self.path.clone(),
            event,
        };
        if self.tx.send_blocking(msg).is_err() {
            warn!(
                path = %self.path.display(),
                "Line consumer disconnected, dropping remaining events"
            );
            self.disconnected = true;
        }
    }
}

impl LineSink for ChannelLineSink {
    fn opened(&mut self) {
        self.send(LineEvent::Opened);
    }

    fn accept(&mut self, line: String) {
        self.send(LineEvent::Line(line));
    }

    fn eof(&mut self) {
        self.send(LineEvent::Eof);
    }

    fn error(&mut self) {
        self.send(LineEvent::Error);
    }

    fn deleted(&mut self) {
        self.send(LineEvent::Deleted);
    }

    fn is_closed(&self) -> bool {
        self.disconnected || self.tx.is_disconnected()
    }
}

/// Keeps every event in memory. Clones share the same event list.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<LineEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events seen so far.
    pub fn events(&self) -> Vec<LineEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Only the accepted lines, in order.
    pub fn lines(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                LineEvent::Line(line) => Some(line),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: LineEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

impl LineSink for RecordingSink {
    fn opened(&mut self) {
        self.push(LineEvent::Opened);
    }

    fn accept(&mut self, line: String) {
        self.push(LineEvent::Line(line));
    }

    fn eof(&mut self) {
        self.push(LineEvent::Eof);
    }

    fn error(&mut self) {
        self.push(LineEvent::Error);
    }

    fn deleted(&mut self) {
        self.push(LineEvent::Deleted);
    }
}
