//! Configuration management for aegee-dirsync

mod paths;
mod settings;

pub use paths::ConfigPaths;
pub use settings::{Config, DirectorySettings, SyncSettings, DEFAULT_BODY_ID};
