//! Outbound chat. The dispatcher decides *whether* a line is relayed; the
//! relay decides who receives it.

use crate::permission::{Actor, Rank};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatScope<'a> {
    Global,
    /// Everyone in the named level.
    Level(&'a str),
    /// Everyone of the sender's rank.
    Rank(Rank),
    Private { to: &'a str },
}

pub trait ChatRelay: Send + Sync {
    fn relay(&self, from: &Actor, scope: ChatScope<'_>, text: &str);
}

/// Writes every relayed line to the log. Used by the demo binary.
pub struct LogRelay;

impl ChatRelay for LogRelay {
    fn relay(&self, from: &Actor, scope: ChatScope<'_>, text: &str) {
        match scope {
            ChatScope::Global => tracing::info!("<{}> {}", from.name, text),
            ChatScope::Level(level) => tracing::info!("[{}] <{}> {}", level, from.name, text),
            ChatScope::Rank(rank) => tracing::info!("[rank {}] <{}> {}", rank.0, from.name, text),
            ChatScope::Private { to } => tracing::info!("[{} -> {}] {}", from.name, to, text),
        }
    }
}
