//! Voice attendance logger CLI library.
//!
//! This crate wires the tracking engine to a JSONL event feed, the chat
//! command front end and a file-based report sink.

mod cli;
pub mod commands;
mod config;
pub mod feed;
pub mod frontend;
pub mod sink;

pub use cli::{Cli, Commands};
pub use config::Config;
