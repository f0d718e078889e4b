//! Thin wrappers around the filesystem, subprocesses, and the network.
//! Each operation returns a structured result or a typed error; the
//! callers decide how to present failures.

pub mod command;
pub mod directory;
pub mod fetch;
pub mod file;
pub mod git;
pub mod network;
pub mod search;
