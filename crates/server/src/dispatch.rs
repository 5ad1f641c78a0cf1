//! Routes raw client input: chat lines and block clicks.
//!
//! Lines are classified first ([`classify`] is pure), then acted on. The
//! dispatcher never interprets command semantics; commands go to the
//! context's [`CommandTable`](crate::commands::CommandTable).

use std::sync::Arc;
use std::time::{Duration, Instant};

use blockforge_engine::world::block::BlockId;
use blockforge_engine::world::position::BlockPos;

use crate::chat::ChatScope;
use crate::context::ServerContext;
use crate::draw::Editor;
use crate::error::CoreError;
use crate::permission::ChangeContext;
use crate::session::{MuteState, Session};
use crate::spam::SpamVerdict;

// ── Classification ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    Chat(String),
    /// `!text`: everyone in the same level.
    WorldChat(String),
    /// `#text`: everyone of the same rank.
    RankChat(String),
    /// `@name text`
    PrivateChat { to: String, text: String },
    /// `/name args`, name lowercased.
    Command { name: String, args: String },
    /// A bare `/`.
    RepeatCommand,
    Confirmation,
    /// Ends in `>` (joined with a space) or `<` (joined directly). Holds the
    /// text to prepend to the next line.
    Partial(String),
    Cancel,
    Invalid,
}

pub fn classify(line: &str) -> LineKind {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() || line.chars().any(char::is_control) {
        return LineKind::Invalid;
    }

    if line.len() > 1 {
        if let Some(head) = line.strip_suffix('>') {
            return LineKind::Partial(format!("{} ", head.trim_end()));
        }
        if let Some(head) = line.strip_suffix('<') {
            return LineKind::Partial(head.to_string());
        }
    }

    if line == "/" {
        return LineKind::RepeatCommand;
    }
    // "//" escapes a chat line that starts with a slash.
    if let Some(rest) = line.strip_prefix("//") {
        return LineKind::Chat(format!("/{}", rest));
    }
    if let Some(rest) = line.strip_prefix('/') {
        let (name, args) = rest.split_once(' ').unwrap_or((rest, ""));
        let name = name.to_ascii_lowercase();
        return match name.as_str() {
            "" => LineKind::Invalid,
            "nvm" | "nevermind" | "cancel" => LineKind::Cancel,
            "confirm" => LineKind::Confirmation,
            _ => LineKind::Command {
                name,
                args: args.trim().to_string(),
            },
        };
    }
    if let Some(rest) = line.strip_prefix('@') {
        return match rest.split_once(' ') {
            Some((to, text)) if !to.is_empty() && !text.trim().is_empty() => LineKind::PrivateChat {
                to: to.to_string(),
                text: text.trim().to_string(),
            },
            _ => LineKind::Invalid,
        };
    }
    if let Some(rest) = line.strip_prefix('!').filter(|r| !r.trim().is_empty()) {
        return LineKind::WorldChat(rest.trim_start().to_string());
    }
    if let Some(rest) = line.strip_prefix('#').filter(|r| !r.trim().is_empty()) {
        return LineKind::RankChat(rest.trim_start().to_string());
    }
    LineKind::Chat(line.to_string())
}

// ── Lines ───────────────────────────────────────────────────────────────

/// What the transport should do after a line was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    Handled,
    /// Disconnect the session with `reason`.
    Kick { reason: String },
}

pub fn handle_line(ctx: &ServerContext, session: &mut Session, line: &str, now: Instant) -> Result<Dispatch, CoreError> {
    if line.trim().is_empty() {
        return Ok(Dispatch::Handled);
    }

    let mut kind = classify(line);
    match kind {
        LineKind::Partial(part) => {
            buffer_partial(ctx, session, &part);
            return Ok(Dispatch::Handled);
        }
        LineKind::Cancel => {
            cancel(session);
            return Ok(Dispatch::Handled);
        }
        _ => {}
    }
    if let Some(mut joined) = session.partial.take() {
        joined.push_str(line.trim_end_matches(['\r', '\n']));
        kind = classify(&joined);
    }
    handle_kind(ctx, session, kind, now)
}

fn handle_kind(ctx: &ServerContext, session: &mut Session, kind: LineKind, now: Instant) -> Result<Dispatch, CoreError> {
    match kind {
        LineKind::Chat(text) => chat(ctx, session, ChatScope::Global, &text, now),
        LineKind::WorldChat(text) => {
            let Some(level) = session.level.as_ref().map(|l| Arc::clone(&l.name)) else {
                session.message("You are not in a level.");
                return Ok(Dispatch::Handled);
            };
            chat(ctx, session, ChatScope::Level(&level), &text, now)
        }
        LineKind::RankChat(text) => {
            let rank = session.rank;
            chat(ctx, session, ChatScope::Rank(rank), &text, now)
        }
        LineKind::PrivateChat { to, text } => {
            let Some(target) = ctx.registry.find_by_name(&to) else {
                session.message(format!("Player {} is not online.", to));
                return Ok(Dispatch::Handled);
            };
            chat(ctx, session, ChatScope::Private { to: &target.name }, &text, now)
        }
        LineKind::Command { name, args } => run_command(ctx, session, &name, &args, now),
        LineKind::RepeatCommand => {
            let Some(last) = session.last_command.clone() else {
                session.message("You have not used a command yet.");
                return Ok(Dispatch::Handled);
            };
            match classify(&last) {
                LineKind::Command { name, args } => run_command(ctx, session, &name, &args, now),
                _ => Ok(Dispatch::Handled),
            }
        }
        LineKind::Confirmation => confirm(ctx, session, now),
        LineKind::Partial(part) => {
            buffer_partial(ctx, session, &part);
            Ok(Dispatch::Handled)
        }
        LineKind::Cancel => {
            cancel(session);
            Ok(Dispatch::Handled)
        }
        LineKind::Invalid => {
            session.message("That message contains invalid characters.");
            Ok(Dispatch::Handled)
        }
    }
}

fn buffer_partial(ctx: &ServerContext, session: &mut Session, part: &str) {
    let too_long = {
        let buffered = session.partial.get_or_insert_with(String::new);
        buffered.push_str(part);
        buffered.len() > ctx.config.max_partial_len
    };
    if too_long {
        session.partial = None;
        session.message("Message too long; partial message discarded.");
    } else {
        session.message("Partial message saved.");
    }
}

fn cancel(session: &mut Session) {
    if session.partial.take().is_some() {
        session.message("Partial message discarded.");
    } else if session.cancel_selection() {
        session.message("Selection cancelled.");
    } else {
        session.message("There is nothing to cancel.");
    }
}

fn whole_seconds(d: Duration) -> u64 {
    d.as_secs() + u64::from(d.subsec_nanos() > 0)
}

fn chat(
    ctx: &ServerContext,
    session: &mut Session,
    scope: ChatScope<'_>,
    text: &str,
    now: Instant,
) -> Result<Dispatch, CoreError> {
    match session.mute_remaining(now) {
        Some(None) => {
            session.message("You are muted.");
            return Ok(Dispatch::Handled);
        }
        Some(Some(left)) => {
            session.message(format!("You are muted for another {} seconds.", whole_seconds(left)));
            return Ok(Dispatch::Handled);
        }
        None => {}
    }

    match session.spam.check(now, &ctx.spam_rules()) {
        SpamVerdict::Clean => {}
        SpamVerdict::Mute { duration, warnings } => {
            session.mute = MuteState::Until(now + duration);
            ctx.metrics.spam_muted();
            tracing::warn!("{} muted for spam (warning {})", session.name, warnings);
            session.message(format!(
                "You have been muted for {} seconds for spamming.",
                whole_seconds(duration)
            ));
            return Ok(Dispatch::Handled);
        }
        SpamVerdict::Kick { warnings } => {
            ctx.metrics.spam_kicked();
            tracing::info!("{} kicked for spam after {} warnings", session.name, warnings);
            return Ok(Dispatch::Kick {
                reason: "Kicked for spamming.".into(),
            });
        }
    }

    ctx.chat.relay(&session.actor(), scope, text);
    ctx.metrics.chat_relayed();
    Ok(Dispatch::Handled)
}

fn run_command(ctx: &ServerContext, session: &mut Session, name: &str, args: &str, now: Instant) -> Result<Dispatch, CoreError> {
    let Some(cmd) = ctx.commands.lookup(name) else {
        session.message(format!("Unknown command \"{}\".", name));
        return Ok(Dispatch::Handled);
    };
    if session.frozen && !cmd.frozen_safe {
        session.message(format!("You cannot use /{} while frozen.", cmd.name));
        return Ok(Dispatch::Handled);
    }

    session.last_command = Some(if args.is_empty() {
        format!("/{}", name)
    } else {
        format!("/{} {}", name, args)
    });
    tracing::debug!("{} runs /{} {}", session.name, cmd.name, args);
    ctx.commands.execute(ctx, session, &cmd, args, now)?;
    Ok(Dispatch::Handled)
}

fn confirm(ctx: &ServerContext, session: &mut Session, now: Instant) -> Result<Dispatch, CoreError> {
    let Some(pending) = session.pending_confirm.take() else {
        session.message("There is nothing to confirm.");
        return Ok(Dispatch::Handled);
    };
    if now.saturating_duration_since(pending.requested_at) > ctx.config.confirm_timeout() {
        session.message("Confirmation timed out. Use the command again.");
        return Ok(Dispatch::Handled);
    }
    let Some(cmd) = ctx.commands.lookup(&pending.command) else {
        session.message(format!("Unknown command \"{}\".", pending.command));
        return Ok(Dispatch::Handled);
    };

    session.confirmed = true;
    let result = ctx.commands.execute(ctx, session, &cmd, &pending.args, now);
    session.confirmed = false;
    result.map(|()| Dispatch::Handled)
}

// ── Clicks ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    /// Taken as a selection mark. The client should be sent the original
    /// block back.
    Marked,
    Placed,
    /// Allowed, but the cell already held that block.
    Unchanged,
    /// Denied. The client should be sent the original block back.
    Rejected,
}

/// A block placed (`deleting == false`) or broken by hand.
pub fn handle_click(
    ctx: &ServerContext,
    session: &mut Session,
    pos: BlockPos,
    held: BlockId,
    deleting: bool,
) -> Result<ClickOutcome, CoreError> {
    if session.selection.in_progress() {
        session.add_mark(ctx, pos, true)?;
        return Ok(ClickOutcome::Marked);
    }
    if session.spectating {
        session.message("You cannot build while spectating.");
        return Ok(ClickOutcome::Rejected);
    }
    if session.frozen {
        session.message("You cannot build while frozen.");
        return Ok(ClickOutcome::Rejected);
    }

    let level = session.level.clone().ok_or(CoreError::NoWorld(session.id))?;
    let block = if deleting {
        BlockId::AIR
    } else {
        session.last_block = held;
        session.bindings.resolve(held)
    };

    let mut editor = Editor::new(ctx, &level, session.actor(), ChangeContext::Manual, None);
    let prior = editor.place_stacking(pos, block);
    let report = editor.into_report();
    ctx.metrics.record_placement(report.first_denial.is_none());
    if let Some(verdict) = report.first_denial {
        session.message(verdict.describe());
        return Ok(ClickOutcome::Rejected);
    }
    Ok(if prior.is_some() {
        ClickOutcome::Placed
    } else {
        ClickOutcome::Unchanged
    })
}
