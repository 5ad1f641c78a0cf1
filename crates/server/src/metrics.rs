//! Lock-free counters for the editing core.
//!
//! Sessions bump these with relaxed atomics from their own tasks. Whoever
//! wants numbers takes a [`MetricsSnapshot`] at their own pace.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering::Relaxed};
use std::time::{Duration, Instant};

pub struct Metrics {
    // Monotonic counters
    draw_ops: AtomicU64,
    cells_changed: AtomicU64,
    cells_denied: AtomicU64,
    undo_overflows: AtomicU64,
    draw_ns_sum: AtomicU64,
    placements: AtomicU64,
    placements_denied: AtomicU64,
    chat_relayed: AtomicU64,
    spam_mutes: AtomicU64,
    spam_kicks: AtomicU64,

    // Draw duration histogram
    hist_under_1ms: AtomicU64,
    hist_1_10ms: AtomicU64,
    hist_10_100ms: AtomicU64,
    hist_100ms_1s: AtomicU64,
    hist_over_1s: AtomicU64,

    // Gauges
    sessions_connected: AtomicU64,

    started_at: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            draw_ops: AtomicU64::new(0),
            cells_changed: AtomicU64::new(0),
            cells_denied: AtomicU64::new(0),
            undo_overflows: AtomicU64::new(0),
            draw_ns_sum: AtomicU64::new(0),
            placements: AtomicU64::new(0),
            placements_denied: AtomicU64::new(0),
            chat_relayed: AtomicU64::new(0),
            spam_mutes: AtomicU64::new(0),
            spam_kicks: AtomicU64::new(0),
            hist_under_1ms: AtomicU64::new(0),
            hist_1_10ms: AtomicU64::new(0),
            hist_10_100ms: AtomicU64::new(0),
            hist_100ms_1s: AtomicU64::new(0),
            hist_over_1s: AtomicU64::new(0),
            sessions_connected: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    /// Called once per finished draw, copy, paste, undo or redo.
    pub fn record_draw(&self, changed: u64, denied: u64, overflowed: bool, duration: Duration) {
        self.draw_ops.fetch_add(1, Relaxed);
        self.cells_changed.fetch_add(changed, Relaxed);
        self.cells_denied.fetch_add(denied, Relaxed);
        if overflowed {
            self.undo_overflows.fetch_add(1, Relaxed);
        }
        self.draw_ns_sum.fetch_add(duration.as_nanos() as u64, Relaxed);

        let ms = duration.as_millis() as u64;
        match ms {
            0 => {
                self.hist_under_1ms.fetch_add(1, Relaxed);
            }
            1..=9 => {
                self.hist_1_10ms.fetch_add(1, Relaxed);
            }
            10..=99 => {
                self.hist_10_100ms.fetch_add(1, Relaxed);
            }
            100..=999 => {
                self.hist_100ms_1s.fetch_add(1, Relaxed);
            }
            _ => {
                self.hist_over_1s.fetch_add(1, Relaxed);
            }
        }
    }

    pub fn record_placement(&self, allowed: bool) {
        self.placements.fetch_add(1, Relaxed);
        if !allowed {
            self.placements_denied.fetch_add(1, Relaxed);
        }
    }

    pub fn chat_relayed(&self) {
        self.chat_relayed.fetch_add(1, Relaxed);
    }

    pub fn spam_muted(&self) {
        self.spam_mutes.fetch_add(1, Relaxed);
    }

    pub fn spam_kicked(&self) {
        self.spam_kicks.fetch_add(1, Relaxed);
    }

    pub fn session_joined(&self) {
        self.sessions_connected.fetch_add(1, Relaxed);
    }

    pub fn session_left(&self) {
        self.sessions_connected.fetch_sub(1, Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime_secs: self.started_at.elapsed().as_secs_f64(),
            draw_ops: self.draw_ops.load(Relaxed),
            cells_changed: self.cells_changed.load(Relaxed),
            cells_denied: self.cells_denied.load(Relaxed),
            undo_overflows: self.undo_overflows.load(Relaxed),
            draw_ns_sum: self.draw_ns_sum.load(Relaxed),
            placements: self.placements.load(Relaxed),
            placements_denied: self.placements_denied.load(Relaxed),
            chat_relayed: self.chat_relayed.load(Relaxed),
            spam_mutes: self.spam_mutes.load(Relaxed),
            spam_kicks: self.spam_kicks.load(Relaxed),
            sessions: self.sessions_connected.load(Relaxed),
            hist: [
                self.hist_under_1ms.load(Relaxed),
                self.hist_1_10ms.load(Relaxed),
                self.hist_10_100ms.load(Relaxed),
                self.hist_100ms_1s.load(Relaxed),
                self.hist_over_1s.load(Relaxed),
            ],
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializable view of [`Metrics`] at one point in time.
#[derive(Clone, Debug, Serialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: f64,
    pub draw_ops: u64,
    pub cells_changed: u64,
    pub cells_denied: u64,
    pub undo_overflows: u64,
    pub draw_ns_sum: u64,
    pub placements: u64,
    pub placements_denied: u64,
    pub chat_relayed: u64,
    pub spam_mutes: u64,
    pub spam_kicks: u64,
    pub sessions: u64,
    /// `[<1ms, 1-10ms, 10-100ms, 100ms-1s, >1s]`
    pub hist: [u64; 5],
}
