//! koai: terminal AI assistant.
//!
//! One-shot chat/edit commands, interactive stdin loops, and a two-panel
//! terminal session (chat transcript + git status) on top of a hosted
//! completion API.

pub mod agent;
pub mod app;
pub mod commands;
pub mod config;
pub mod error;
pub mod handler;
pub mod openai;
pub mod tooling;
pub mod tui;
pub mod ui;
