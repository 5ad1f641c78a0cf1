//! Server-wide state passed by reference into every core operation.

use std::sync::Arc;

use crate::chat::ChatRelay;
use crate::commands::CommandTable;
use crate::config::CoreConfig;
use crate::metrics::Metrics;
use crate::permission::{PlacementHook, RankTable};
use crate::session_registry::SessionRegistry;
use crate::spam::SpamRules;

pub struct ServerContext {
    pub config: CoreConfig,
    pub ranks: Arc<dyn RankTable>,
    pub commands: Arc<dyn CommandTable>,
    pub chat: Arc<dyn ChatRelay>,
    /// Run after the built-in permission checks, in registration order.
    pub hooks: Vec<Arc<dyn PlacementHook>>,
    pub registry: Arc<SessionRegistry>,
    pub metrics: Metrics,
}

impl ServerContext {
    pub fn new(
        config: CoreConfig,
        ranks: Arc<dyn RankTable>,
        commands: Arc<dyn CommandTable>,
        chat: Arc<dyn ChatRelay>,
    ) -> Self {
        Self {
            config,
            ranks,
            commands,
            chat,
            hooks: Vec::new(),
            registry: Arc::new(SessionRegistry::new()),
            metrics: Metrics::new(),
        }
    }

    pub fn with_hook(mut self, hook: Arc<dyn PlacementHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn spam_rules(&self) -> SpamRules {
        SpamRules::from_config(&self.config)
    }
}
