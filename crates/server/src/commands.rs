//! The command table collaborator, plus the built-in editing commands.

use std::time::Instant;

use blockforge_engine::world::block::BlockId;

use crate::block;
use crate::context::ServerContext;
use crate::draw::{quarter_turns, Axis, DrawAction, PasteFilter};
use crate::error::CoreError;
use crate::session::Session;
use crate::undo;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandDescriptor {
    /// Canonical name, even when looked up by alias.
    pub name: String,
    /// May be used while frozen.
    pub frozen_safe: bool,
    pub usage: String,
}

pub trait CommandTable: Send + Sync {
    fn lookup(&self, name: &str) -> Option<CommandDescriptor>;

    /// Run `cmd`. User mistakes are reported to the session; only contract
    /// violations come back as errors.
    fn execute(
        &self,
        ctx: &ServerContext,
        session: &mut Session,
        cmd: &CommandDescriptor,
        args: &str,
        now: Instant,
    ) -> Result<(), CoreError>;
}

// ── Built-ins ───────────────────────────────────────────────────────────

struct Builtin {
    name: &'static str,
    aliases: &'static [&'static str],
    frozen_safe: bool,
    usage: &'static str,
}

const BUILTINS: &[Builtin] = &[
    Builtin { name: "cuboid", aliases: &["z", "box"], frozen_safe: false, usage: "/cuboid [solid|hollow] [block]" },
    Builtin { name: "sphere", aliases: &["ellipsoid"], frozen_safe: false, usage: "/sphere [block]" },
    Builtin { name: "replace", aliases: &["r"], frozen_safe: false, usage: "/replace <block..> <new block>" },
    Builtin { name: "replacenot", aliases: &["rn"], frozen_safe: false, usage: "/replacenot <block..> <new block>" },
    Builtin { name: "copy", aliases: &["c"], frozen_safe: false, usage: "/copy" },
    Builtin { name: "cut", aliases: &[], frozen_safe: false, usage: "/cut [fill block]" },
    Builtin { name: "paste", aliases: &["v"], frozen_safe: false, usage: "/paste [only|except <block..>]" },
    Builtin { name: "mirror", aliases: &["flip"], frozen_safe: false, usage: "/mirror <x|y|z..>" },
    Builtin { name: "rotate", aliases: &["spin"], frozen_safe: false, usage: "/rotate [x|y|z] <degrees>" },
    Builtin { name: "undo", aliases: &["u"], frozen_safe: false, usage: "/undo" },
    Builtin { name: "redo", aliases: &[], frozen_safe: false, usage: "/redo" },
    Builtin { name: "bind", aliases: &[], frozen_safe: false, usage: "/bind <block> [as block]" },
    Builtin { name: "static", aliases: &["t"], frozen_safe: true, usage: "/static" },
    Builtin { name: "mark", aliases: &["m"], frozen_safe: false, usage: "/mark [go]" },
    Builtin { name: "abort", aliases: &["a"], frozen_safe: true, usage: "/abort" },
    Builtin { name: "clearundo", aliases: &[], frozen_safe: false, usage: "/clearundo" },
];

/// The editing commands this crate ships with.
pub struct BuiltinCommands;

impl CommandTable for BuiltinCommands {
    fn lookup(&self, name: &str) -> Option<CommandDescriptor> {
        let name = name.to_ascii_lowercase();
        BUILTINS
            .iter()
            .find(|b| b.name == name || b.aliases.contains(&name.as_str()))
            .map(|b| CommandDescriptor {
                name: b.name.to_string(),
                frozen_safe: b.frozen_safe,
                usage: b.usage.to_string(),
            })
    }

    fn execute(
        &self,
        ctx: &ServerContext,
        session: &mut Session,
        cmd: &CommandDescriptor,
        args: &str,
        now: Instant,
    ) -> Result<(), CoreError> {
        let words: Vec<&str> = args.split_whitespace().collect();
        match cmd.name.as_str() {
            "cuboid" => {
                let (hollow, rest) = match words.first().map(|w| w.to_ascii_lowercase()) {
                    Some(w) if w == "hollow" => (true, &words[1..]),
                    Some(w) if w == "solid" => (false, &words[1..]),
                    _ => (false, &words[..]),
                };
                if let Some(block) = block_or_held(session, rest.first().copied()) {
                    let block = session.bindings.resolve(block);
                    session.begin_selection(ctx, DrawAction::Cuboid { block, hollow });
                }
            }
            "sphere" => {
                if let Some(block) = block_or_held(session, words.first().copied()) {
                    let block = session.bindings.resolve(block);
                    session.begin_selection(ctx, DrawAction::Ellipsoid { block });
                }
            }
            "replace" | "replacenot" => {
                if words.len() < 2 {
                    session.message(format!("Usage: {}", cmd.usage));
                    return Ok(());
                }
                let Some(blocks) = parse_blocks(session, &words) else {
                    return Ok(());
                };
                let (block, targets) = match blocks.split_last() {
                    Some((block, targets)) => (session.bindings.resolve(*block), targets.to_vec()),
                    None => return Ok(()),
                };
                let invert = cmd.name == "replacenot";
                session.begin_selection(ctx, DrawAction::Replace { targets, block, invert });
            }
            "copy" => session.begin_selection(ctx, DrawAction::Copy),
            "cut" => {
                let fill = match words.first() {
                    Some(name) => match parse_block(session, name) {
                        Some(b) => b,
                        None => return Ok(()),
                    },
                    None => block::AIR,
                };
                session.begin_selection(ctx, DrawAction::Cut { fill });
            }
            "paste" => {
                if session.copy.is_none() {
                    session.message("You have not copied anything yet.");
                    return Ok(());
                }
                let filter = match words.split_first() {
                    None => PasteFilter::All,
                    Some((mode, list)) if !list.is_empty() => {
                        let Some(blocks) = parse_blocks(session, list) else {
                            return Ok(());
                        };
                        match mode.to_ascii_lowercase().as_str() {
                            "only" => PasteFilter::Only(blocks),
                            "except" | "not" => PasteFilter::Except(blocks),
                            _ => {
                                session.message(format!("Usage: {}", cmd.usage));
                                return Ok(());
                            }
                        }
                    }
                    Some(_) => {
                        session.message(format!("Usage: {}", cmd.usage));
                        return Ok(());
                    }
                };
                session.begin_selection(ctx, DrawAction::Paste { filter });
            }
            "mirror" => mirror(session, args, &cmd.usage),
            "rotate" => rotate(session, &words, &cmd.usage),
            "undo" => undo::undo(ctx, session)?,
            "redo" => undo::redo(ctx, session)?,
            "bind" => bind(session, &words, &cmd.usage),
            "static" => {
                session.static_mode = !session.static_mode;
                let state = if session.static_mode { "on" } else { "off" };
                session.message(format!("Static mode is now {}.", state));
            }
            "mark" => {
                if !session.selection.in_progress() {
                    session.message("There is no selection in progress.");
                } else if words.first().is_some_and(|w| w.eq_ignore_ascii_case("go")) {
                    let (have, want) = (session.selection.marks().len(), session.selection.marks_expected());
                    if have < want {
                        session.message(format!("Mark {} more block(s) first.", want - have));
                    } else {
                        session.execute_selection(ctx)?;
                    }
                } else {
                    let pos = session.position;
                    session.add_mark(ctx, pos, false)?;
                }
            }
            "abort" => {
                let had_confirm = session.pending_confirm.take().is_some();
                if session.cancel_selection() || had_confirm {
                    session.message("Aborted.");
                } else {
                    session.message("There is nothing to abort.");
                }
            }
            "clearundo" => {
                if session.history.is_empty() {
                    session.message("Your undo history is already empty.");
                } else if session.is_confirmed() {
                    session.history.begin_operation();
                    session.message("Your undo history has been cleared.");
                } else {
                    session.request_confirmation("clearundo", args, now, "This permanently discards your undo history.");
                }
            }
            other => {
                tracing::error!("Built-in command table has no handler for /{}", other);
                session.message(format!("Unknown command \"{}\".", other));
            }
        }
        Ok(())
    }
}

// ── Argument helpers ────────────────────────────────────────────────────

fn parse_block(session: &mut Session, name: &str) -> Option<BlockId> {
    let found = block::by_name(name);
    if found.is_none() {
        session.message(format!("Unknown block \"{}\".", name));
    }
    found
}

fn parse_blocks(session: &mut Session, names: &[&str]) -> Option<Vec<BlockId>> {
    names.iter().map(|n| parse_block(session, n)).collect()
}

/// The named block, or the last block held when no name was given.
fn block_or_held(session: &mut Session, name: Option<&str>) -> Option<BlockId> {
    match name {
        Some(name) => parse_block(session, name),
        None => Some(session.last_block),
    }
}

fn mirror(session: &mut Session, args: &str, usage: &str) {
    let mut axes = [false; 3];
    for c in args.chars().filter(|c| !c.is_whitespace()) {
        match Axis::parse(&c.to_string()) {
            Some(Axis::X) => axes[0] = true,
            Some(Axis::Y) => axes[1] = true,
            Some(Axis::Z) => axes[2] = true,
            None => {
                session.message(format!("Usage: {}", usage));
                return;
            }
        }
    }
    if !axes.iter().any(|a| *a) {
        session.message(format!("Usage: {}", usage));
        return;
    }
    let Some(buffer) = session.copy.as_mut() else {
        session.message("You have not copied anything yet.");
        return;
    };
    buffer.mirror(axes);
    session.message("Flipped the copy.");
}

fn rotate(session: &mut Session, words: &[&str], usage: &str) {
    let (axis, degrees) = match words {
        [degrees] => (Some(Axis::Y), *degrees),
        [axis, degrees] => (Axis::parse(axis), *degrees),
        _ => (None, ""),
    };
    let turns = degrees.parse::<i32>().ok().and_then(quarter_turns);
    let (Some(axis), Some(turns)) = (axis, turns) else {
        session.message(format!("Usage: {} (degrees must be a multiple of 90)", usage));
        return;
    };
    let Some(buffer) = session.copy.as_mut() else {
        session.message("You have not copied anything yet.");
        return;
    };
    buffer.rotate(axis, turns);
    session.message(format!("Rotated the copy {} degrees around {:?}.", degrees, axis));
}

fn bind(session: &mut Session, words: &[&str], usage: &str) {
    let (from, to) = match words {
        [from] => (block::by_name(from), None),
        [from, to] => (block::by_name(from), Some(block::by_name(to))),
        _ => {
            session.message(format!("Usage: {}", usage));
            return;
        }
    };
    let Some(from) = from else {
        session.message(format!("Unknown block \"{}\".", words[0]));
        return;
    };
    match to {
        None => {
            session.bindings.unbind(from);
            session.message(format!("Unbound {}.", block::name(from)));
        }
        Some(None) => session.message(format!("Unknown block \"{}\".", words[1])),
        Some(Some(to)) => {
            if session.bindings.bind(from, to) {
                session.message(format!("{} now places {}.", block::name(from), block::name(to)));
            } else {
                session.message(format!("{} cannot be bound.", block::name(from)));
            }
        }
    }
}
