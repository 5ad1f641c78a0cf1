use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context as _;
use blockforge_engine::world::Dimensions;
use blockforge_engine::world::block::BlockId;
use blockforge_engine::world::position::BlockPos;
use blockforge_server::block;
use blockforge_server::chat::LogRelay;
use blockforge_server::commands::BuiltinCommands;
use blockforge_server::config::CoreConfig;
use blockforge_server::context::ServerContext;
use blockforge_server::dispatch::{self, Dispatch};
use blockforge_server::event_bus;
use blockforge_server::level::Level;
use blockforge_server::permission::{ConfiguredRanks, Rank};
use blockforge_server::session::Session;

/// One step of the scripted demo session.
enum Step {
    Line(&'static str),
    Click(BlockPos, BlockId),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path: Option<PathBuf> = std::env::args()
        .skip_while(|a| a != "--config")
        .nth(1)
        .map(PathBuf::from);
    let size: u32 = std::env::args()
        .skip_while(|a| a != "--size")
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(64);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = match &config_path {
        Some(path) => CoreConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => CoreConfig::default(),
    };
    tracing::info!("blockforge -- editing core demo ({}^3 world)", size);

    // ── Shared state ────────────────────────────────────────────────────
    let ranks = Arc::new(ConfiguredRanks::new(config.ranks.clone()));
    let flush_period = config.queue_flush_interval();
    let ctx = ServerContext::new(config, ranks, Arc::new(BuiltinCommands), Arc::new(LogRelay));

    let bus = event_bus::channel();
    let (level, queue) = Level::in_memory("main", Dimensions::new(size, size, size), bus.clone());
    queue.world().fill_layers(0..=0, block::BEDROCK);
    queue.world().fill_layers(1..=3, block::DIRT);
    let level = Arc::new(level);
    let flusher = queue.spawn_flusher(flush_period);

    let mut changes = bus.subscribe();
    let watcher = tokio::spawn(async move {
        let mut total = 0usize;
        while let Ok(batch) = changes.recv().await {
            total += batch.changes.len();
            tracing::debug!("{}: {} changes ({} total)", batch.level, batch.changes.len(), total);
        }
        total
    });

    // ── Scripted session ────────────────────────────────────────────────
    let mut session = Session::connect(&ctx, 1, "builder", Rank(30));
    session.join_level(&ctx, Arc::clone(&level), BlockPos::new(8, 4, 8));

    let script = [
        Step::Line("/cuboid hollow stone"),
        Step::Click(BlockPos::new(2, 4, 2), block::STONE),
        Step::Click(BlockPos::new(10, 9, 10), block::STONE),
        Step::Line("/sphere glass"),
        Step::Click(BlockPos::new(20, 4, 20), block::STONE),
        Step::Click(BlockPos::new(28, 12, 28), block::STONE),
        Step::Line("/copy"),
        Step::Click(BlockPos::new(2, 4, 2), block::STONE),
        Step::Click(BlockPos::new(10, 9, 10), block::STONE),
        Step::Line("/rotate y 90"),
        Step::Line("/paste"),
        Step::Click(BlockPos::new(40, 4, 2), block::STONE),
        Step::Line("/undo"),
        Step::Line("/undo"),
        Step::Line("/cuboid lava"),
        Step::Click(BlockPos::new(0, 10, 0), block::STONE),
        Step::Click(BlockPos::new(1, 11, 1), block::STONE),
        Step::Line("hello >"),
        Step::Line("world"),
    ];

    for step in script {
        let now = Instant::now();
        match step {
            Step::Line(line) => {
                tracing::info!("> {}", line);
                if let Dispatch::Kick { reason } = dispatch::handle_line(&ctx, &mut session, line, now)? {
                    tracing::warn!("Kicked: {}", reason);
                    break;
                }
            }
            Step::Click(pos, held) => {
                let outcome = dispatch::handle_click(&ctx, &mut session, pos, held, false)?;
                tracing::info!("click {:?}: {:?}", pos, outcome);
            }
        }
        for msg in session.take_messages() {
            tracing::info!("  {}", msg);
        }
    }

    for info in ctx.registry.snapshot() {
        let level = info.level.as_deref().unwrap_or("-");
        tracing::info!("online: {} ({}) in {} at {:?}", info.name, info.uuid, level, info.pos);
    }
    session.disconnect(&ctx);
    queue.flush();
    tokio::time::sleep(Duration::from_millis(10)).await;

    // Dropping every queue handle stops the flusher, which drops the last
    // bus sender clone held by the queue.
    drop(level);
    drop(queue);
    drop(bus);
    flusher.await?;
    let streamed = watcher.await?;

    let snapshot = ctx.metrics.snapshot();
    tracing::info!("{} block changes streamed to subscribers", streamed);
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}
