//! Chat spam detection.
//!
//! Remembers the timestamps of the last N accepted messages. A new message
//! trips the detector when the history is already full and its oldest entry
//! is still inside the window. Each trip adds a warning: up to the limit the
//! session is muted for a while, past it the session is kicked. Warnings
//! are never forgiven for the lifetime of the session.
//!
//! The detector takes `now` from the caller and reads no clock, so the same
//! inputs always give the same answer.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::config::CoreConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpamRules {
    /// Messages remembered. 0 disables detection.
    pub count: usize,
    pub window: Duration,
    pub max_warnings: u32,
    pub mute: Duration,
}

impl SpamRules {
    pub fn from_config(config: &CoreConfig) -> Self {
        Self {
            count: config.spam_message_count,
            window: config.spam_window(),
            max_warnings: config.spam_max_warnings,
            mute: config.spam_mute(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpamVerdict {
    Clean,
    /// Tripped with `warnings` on record; mute for `duration`.
    Mute { duration: Duration, warnings: u32 },
    /// Tripped past the warning limit.
    Kick { warnings: u32 },
}

#[derive(Debug, Default)]
pub struct SpamTracker {
    history: VecDeque<Instant>,
    warnings: u32,
}

impl SpamTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warnings(&self) -> u32 {
        self.warnings
    }

    pub fn check(&mut self, now: Instant, rules: &SpamRules) -> SpamVerdict {
        if rules.count == 0 {
            return SpamVerdict::Clean;
        }
        if self.history.len() >= rules.count {
            let oldest = self.history[self.history.len() - rules.count];
            if now.saturating_duration_since(oldest) < rules.window {
                self.warnings += 1;
                return if self.warnings > rules.max_warnings {
                    SpamVerdict::Kick {
                        warnings: self.warnings,
                    }
                } else {
                    SpamVerdict::Mute {
                        duration: rules.mute,
                        warnings: self.warnings,
                    }
                };
            }
        }
        self.history.push_back(now);
        while self.history.len() > rules.count {
            self.history.pop_front();
        }
        SpamVerdict::Clean
    }
}
