pub mod block;
pub mod chat;
pub mod commands;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod draw;
pub mod error;
pub mod event_bus;
pub mod level;
pub mod metrics;
pub mod permission;
pub mod queue;
pub mod selection;
pub mod session;
pub mod session_registry;
pub mod spam;
pub mod undo;
