//! Benchmark: one session vs many sessions filling a shared world.
//!
//! Each session fills its own 32x32x32 box through the full dispatch path
//! (command, two marks, permission cascade, undo recording, queue).
//! Run with: `cargo run --release -p blockforge-server --example bench_fill`

use std::sync::Arc;
use std::time::{Duration, Instant};

use blockforge_engine::world::Dimensions;
use blockforge_engine::world::position::BlockPos;
use blockforge_server::block;
use blockforge_server::chat::LogRelay;
use blockforge_server::commands::BuiltinCommands;
use blockforge_server::config::CoreConfig;
use blockforge_server::context::ServerContext;
use blockforge_server::dispatch;
use blockforge_server::event_bus;
use blockforge_server::level::Level;
use blockforge_server::permission::{ConfiguredRanks, Rank};
use blockforge_server::queue::BlockQueue;
use blockforge_server::session::Session;

const BOX: i32 = 32;
const ADMIN: Rank = Rank(100);

fn main() {
    let sessions = 8;
    let side = BOX as u32 * sessions as u32;

    println!("=== blockforge: concurrent fill benchmark ===\n");
    println!("  {} sessions, {}^3 cells each, world {}x{}x{}\n", sessions, BOX, side, BOX, BOX);

    let config = CoreConfig::default();
    let ranks = Arc::new(ConfiguredRanks::new(config.ranks.clone()));
    let ctx = ServerContext::new(config, ranks, Arc::new(BuiltinCommands), Arc::new(LogRelay));

    // --- One session doing all the work ---
    let (level, queue) = build_level(side);
    let t0 = Instant::now();
    let mut solo = Session::connect(&ctx, 0, "solo", ADMIN);
    solo.join_level(&ctx, Arc::clone(&level), BlockPos::new(0, 0, 0));
    for i in 0..sessions {
        fill(&ctx, &mut solo, i);
    }
    let queued_solo = t0.elapsed();
    let flushed_solo = queue.flush();
    let dt_solo = t0.elapsed();
    solo.disconnect(&ctx);

    println!(
        "  Sequential: {:>8} cells queued in {:>8.2?}, applied in {:>8.2?}",
        flushed_solo, queued_solo, dt_solo
    );

    // --- One thread per session ---
    let (level, queue) = build_level(side);
    let t0 = Instant::now();
    std::thread::scope(|scope| {
        for i in 0..sessions {
            let ctx = &ctx;
            let level = Arc::clone(&level);
            scope.spawn(move || {
                let mut session = Session::connect(ctx, 1 + i as u64, format!("builder{}", i), ADMIN);
                session.join_level(ctx, level, BlockPos::new(0, 0, 0));
                fill(ctx, &mut session, i);
                session.disconnect(ctx);
            });
        }
    });
    let queued_par = t0.elapsed();
    let flushed_par = queue.flush();
    let dt_par = t0.elapsed();

    println!(
        "  Concurrent: {:>8} cells queued in {:>8.2?}, applied in {:>8.2?}",
        flushed_par, queued_par, dt_par
    );

    let speedup = dt_solo.as_secs_f64() / dt_par.as_secs_f64().max(f64::EPSILON);
    println!("\n  Speedup: {:.2}x", speedup);

    let expected = (BOX * BOX * BOX) as usize * sessions;
    if flushed_solo == expected && flushed_par == expected {
        println!("  Verification: PASS ({} cells each run)", expected);
    } else {
        println!(
            "  Verification: FAIL (expected {}, got {} / {})",
            expected, flushed_solo, flushed_par
        );
    }

    let snap = ctx.metrics.snapshot();
    println!(
        "  Draw ops: {}, mean {:.2?}",
        snap.draw_ops,
        Duration::from_nanos(snap.draw_ns_sum / snap.draw_ops.max(1))
    );
}

fn build_level(side: u32) -> (Arc<Level>, Arc<BlockQueue>) {
    let (level, queue) = Level::in_memory("bench", Dimensions::new(side, BOX as u32, BOX as u32), event_bus::channel());
    (Arc::new(level), queue)
}

/// Fill box number `i` along x with stone.
fn fill(ctx: &ServerContext, session: &mut Session, i: usize) {
    let x0 = i as i32 * BOX;
    let now = Instant::now();
    dispatch::handle_line(ctx, session, "/cuboid stone", now).expect("cuboid");
    dispatch::handle_click(ctx, session, BlockPos::new(x0, 0, 0), block::STONE, false).expect("mark 1");
    dispatch::handle_click(ctx, session, BlockPos::new(x0 + BOX - 1, BOX - 1, BOX - 1), block::STONE, false)
        .expect("mark 2");
    session.take_messages();
}
