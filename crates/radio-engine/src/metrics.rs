//! Metrics for plan execution and history scans
//!
//! Labels are limited to broadcast kind and content type, never addresses or
//! payload bytes.

use metrics::{counter, histogram};
use std::time::Duration;

pub const KIND_PAYLOAD: &str = "payload";
pub const KIND_DECOY: &str = "decoy";
pub const KIND_GAS_FUNDING: &str = "gas_funding";
pub const KIND_TOKEN_FUNDING: &str = "token_funding";

pub fn record_broadcast(kind: &str, duration: Duration) {
    counter!("radio_broadcasts_total", "kind" => kind.to_string()).increment(1);
    histogram!("radio_broadcast_duration_seconds", "kind" => kind.to_string())
        .record(duration.as_secs_f64());
}

pub fn record_broadcast_failure(kind: &str) {
    counter!("radio_broadcast_failures_total", "kind" => kind.to_string()).increment(1);
}

pub fn record_frame_recovered(content_type: &str) {
    counter!("radio_frames_recovered_total", "type" => content_type.to_string()).increment(1);
}

pub fn record_scan_candidates(candidates: u64) {
    counter!("radio_scan_candidates_total").increment(candidates);
}
