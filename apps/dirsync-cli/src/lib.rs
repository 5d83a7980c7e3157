//! aegee-dirsync library
//!
//! The binary in main.rs is a thin wrapper; everything lives here so the
//! integration tests can drive the pipeline against mock servers.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
pub mod pipeline;
pub mod sources;
