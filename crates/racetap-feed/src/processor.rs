//! Parser + projector + bookkeeping for one byte stream.

use std::collections::VecDeque;
use std::sync::Arc;

use racetap_core::Output;
use racetap_core::smb::{NametableCache, Projector};
use racetap_proto::parser::{ParseStatus, Parser};

pub const DEFAULT_MAX_OUTPUTS: usize = 128;

/// Feeds raw bytes through the wire parser and the game projector,
/// keeping the latest output, a bounded queue of unseen outputs, and the
/// run-relative m2 baseline.
pub struct StreamProcessor {
    parser: Parser,
    projector: Projector,
    latest: Option<Arc<Output>>,
    deck: VecDeque<Arc<Output>>,
    max_outputs: usize,
    start_m2: Option<u64>,
    message_count: u64,
    error_count: u64,
    ignored_count: u64,
}

impl StreamProcessor {
    pub fn new(nametables: Arc<NametableCache>, max_outputs: usize) -> Self {
        Self {
            parser: Parser::new(),
            projector: Projector::new(nametables),
            latest: None,
            deck: VecDeque::new(),
            max_outputs,
            start_m2: None,
            message_count: 0,
            error_count: 0,
            ignored_count: 0,
        }
    }

    pub fn reset(&mut self) {
        self.parser.reset();
        self.projector.reset();
        self.latest = None;
        self.deck.clear();
        self.start_m2 = None;
        self.message_count = 0;
        self.error_count = 0;
        self.ignored_count = 0;
    }

    /// Parse a batch of bytes stamped with one producer timestamp.
    /// Returns the number of complete messages in the batch.
    pub fn on_bytes(&mut self, bytes: &[u8], elapsed: i64) -> usize {
        let mut messages = 0;
        for &byte in bytes {
            match self.parser.feed(byte) {
                ParseStatus::Success => {
                    messages += 1;
                    let msg = self.parser.message();
                    if let Some(output) = self.projector.on_message(&msg, elapsed) {
                        self.push_output(output);
                    }
                }
                ParseStatus::Error(err) => {
                    self.error_count += 1;
                    tracing::trace!(?err, "parse error, resynchronizing");
                }
                ParseStatus::ByteIgnored => self.ignored_count += 1,
                ParseStatus::Again => {}
            }
        }
        self.message_count += messages as u64;
        messages
    }

    fn push_output(&mut self, mut output: Output) {
        if !output.powered_on {
            // A console reset re-arms start detection.
            self.start_m2 = None;
        } else {
            if self.start_m2.is_none() && output.frame.is_run_start() {
                self.start_m2 = Some(output.m2);
            }
            if let Some(start) = self.start_m2 {
                output.user_m2 = output.m2.saturating_sub(start);
            }
        }
        let output = Arc::new(output);
        self.latest = Some(Arc::clone(&output));
        self.deck.push_back(output);
        while self.deck.len() > self.max_outputs {
            self.deck.pop_front();
        }
    }

    pub fn latest(&self) -> Option<Arc<Output>> {
        self.latest.clone()
    }

    pub fn pop_next(&mut self) -> Option<Arc<Output>> {
        self.deck.pop_front()
    }

    pub fn message_count(&self) -> u64 {
        self.message_count
    }

    pub fn error_count(&self) -> u64 {
        self.error_count
    }

    /// Bytes skipped while resynchronizing; nonzero right after attach.
    pub fn ignored_count(&self) -> u64 {
        self.ignored_count
    }
}
