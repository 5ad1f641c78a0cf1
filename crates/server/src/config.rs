//! Runtime configuration, persisted as JSON.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::permission::{Capability, Rank};

/// Tunables for the editing core. Missing fields take their defaults, so an
/// empty `{}` file is a valid config.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CoreConfig {
    /// Undo entries kept per operation before history is abandoned.
    pub max_undo_count: usize,
    /// Horizontal column width used when walking draw regions.
    pub draw_stride: u32,
    /// Chat messages remembered for spam detection.
    pub spam_message_count: usize,
    /// A full history younger than this counts as spam.
    pub spam_window_ms: u64,
    /// Length of an automatic spam mute.
    pub spam_mute_secs: u64,
    /// Spam trips tolerated (each one mutes) before the session is kicked.
    pub spam_max_warnings: u32,
    /// How long a pending confirmation stays valid.
    pub confirm_timeout_secs: u64,
    /// Period of the block queue flusher.
    pub queue_flush_ms: u64,
    /// Upper bound on a buffered partial message.
    pub max_partial_len: usize,
    /// Rank table used by [`crate::permission::ConfiguredRanks`].
    pub ranks: Vec<RankConfig>,
}

/// One row of the bundled rank table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankConfig {
    pub rank: Rank,
    pub name: String,
    pub capabilities: Vec<Capability>,
    /// Most cells a single operation may touch; 0 is unlimited.
    pub draw_limit: u64,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            max_undo_count: 2_000_000,
            draw_stride: 16,
            spam_message_count: 3,
            spam_window_ms: 4_000,
            spam_mute_secs: 60,
            spam_max_warnings: 2,
            confirm_timeout_secs: 60,
            queue_flush_ms: 50,
            max_partial_len: 1024,
            ranks: default_ranks(),
        }
    }
}

impl CoreConfig {
    /// Load from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(ConfigError::Parse)
    }

    /// Write as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let text = serde_json::to_string_pretty(self).map_err(ConfigError::Parse)?;
        std::fs::write(path, text).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn spam_window(&self) -> Duration {
        Duration::from_millis(self.spam_window_ms)
    }

    pub fn spam_mute(&self) -> Duration {
        Duration::from_secs(self.spam_mute_secs)
    }

    pub fn confirm_timeout(&self) -> Duration {
        Duration::from_secs(self.confirm_timeout_secs)
    }

    pub fn queue_flush_interval(&self) -> Duration {
        Duration::from_millis(self.queue_flush_ms.max(1))
    }
}

/// Guest / builder / operator / admin.
fn default_ranks() -> Vec<RankConfig> {
    use Capability::*;
    vec![
        RankConfig {
            rank: Rank(0),
            name: "guest".into(),
            capabilities: vec![Build, Delete],
            draw_limit: 0,
        },
        RankConfig {
            rank: Rank(30),
            name: "builder".into(),
            capabilities: vec![Build, Delete, PlaceWater, Draw, Copy],
            draw_limit: 20_000,
        },
        RankConfig {
            rank: Rank(80),
            name: "operator".into(),
            capabilities: vec![Build, Delete, PlaceWater, PlaceLava, PlaceAdmin, Draw, Copy],
            draw_limit: 1_000_000,
        },
        RankConfig {
            rank: Rank(100),
            name: "admin".into(),
            capabilities: vec![Build, Delete, PlaceWater, PlaceLava, PlaceAdmin, DeleteAdmin, Draw, Copy],
            draw_limit: 0,
        },
    ]
}
