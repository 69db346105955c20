//! Cachet - Content-addressable vcpkg asset cache
//!
//! Runs the installer once per project manifest in an isolated scratch
//! directory, records which cached assets each manifest needs, and
//! reconciles the cache directory against those records so unused files
//! can be pruned safely.

pub mod audit;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod install;
pub mod manifest;
pub mod ui;

pub use error::{CachetError, CachetResult};
