//! Frame recovery from raw transfer history
//!
//! The scanner does not know which events carry payload. For every candidate
//! start `s` it treats `events[s + 1]` as a frame header, reads the declared
//! length, then replays the decoy schedule to pick the remaining transfers:
//!
//! ```text
//! s     s+1     s+1+1+k0     ...
//! wait  header  chunk 1      ...      (k_i = spacing(i), i.e. decoys between chunks)
//! ```
//!
//! A candidate that fails to reveal moves the search one event forward. A
//! revealed frame moves it past the last event it consumed, whether or not
//! its type was requested.

use radio_core::{Codec, Frame, Operation};
use tracing::{debug, info};

use crate::ledger::ChainEvent;
use crate::metrics;

pub struct HistoryScanner<'a> {
    codec: &'a Codec,
}

impl<'a> HistoryScanner<'a> {
    pub fn new(codec: &'a Codec) -> Self {
        Self { codec }
    }

    /// Frames found in `events[start..]`, in ledger order
    ///
    /// `events` must be sorted by (block number, log index).
    pub fn scan(
        &self,
        events: &[ChainEvent],
        start: usize,
        type_filter: Option<u8>,
        limit: Option<usize>,
    ) -> Vec<Frame> {
        let mut frames = Vec::new();
        let mut candidates = 0u64;
        let mut s = start;

        while s + 1 < events.len() {
            if limit.is_some_and(|limit| frames.len() >= limit) {
                break;
            }
            candidates += 1;

            match self.try_frame(events, s) {
                Some((frame, consumed)) => {
                    let wanted = type_filter.map_or(true, |tag| tag == frame.type_tag);
                    debug!(
                        start = s,
                        consumed,
                        type_tag = frame.type_tag,
                        wanted,
                        "Frame found"
                    );
                    if wanted {
                        metrics::record_frame_recovered(
                            frame.content_type().map_or("unknown", |t| t.name()),
                        );
                        frames.push(frame);
                    }
                    s += consumed;
                }
                None => s += 1,
            }
        }

        metrics::record_scan_candidates(candidates);
        info!(
            events = events.len(),
            candidates,
            frames = frames.len(),
            "History scanned"
        );
        frames
    }

    /// Reveal the frame whose header is `events[s + 1]`.
    ///
    /// Returns the frame and the offset from `s` of its last transfer.
    fn try_frame(&self, events: &[ChainEvent], s: usize) -> Option<(Frame, usize)> {
        let header = events.get(s + 1)?.to_operation();
        let len = self.codec.declared_length(&header)?;
        let needed = self.codec.operations_for_length(len);

        let mut ops: Vec<Operation> = Vec::with_capacity(needed);
        let mut offset = 1;
        for chunk in 0..needed {
            let Some(event) = events.get(s + offset) else {
                debug!(start = s, needed, found = ops.len(), "History ends inside candidate frame");
                return None;
            };
            ops.push(event.to_operation());

            if chunk + 1 < needed {
                let spacing = self
                    .codec
                    .schedule()
                    .spacing(chunk as u64, self.codec.max_spacing());
                offset += 1 + spacing as usize;
            }
        }

        match self.codec.reveal(&ops) {
            Some(frame) => Some((frame, offset)),
            None => {
                debug!(start = s, declared = len, "Candidate rejected");
                None
            }
        }
    }
}
