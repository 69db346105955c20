//! Asset events scraped from installer output
//!
//! The installer reports cache hits and misses only as free-form log
//! lines. The patterns below are the single place that knows their shape:
//!
//! ```text
//! ... using asset cache <uri>/<sha512> ... authoritative source <url>
//! ... Couldn't open file <uri>/<sha512> ... authoritative source <url>
//! ```
//!
//! A match never spans more than one line.

use crate::cache::metadata::AssetMap;
use regex::Regex;
use std::sync::LazyLock;

const ASSET_TAIL: &str = r"\S+/([0-9a-f]+)\s.*?authoritative source ([^\s,]+)";

static SERVED_ASSET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("using asset cache {ASSET_TAIL}")).expect("served asset pattern is valid")
});

static MISSING_ASSET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("Couldn't open file {ASSET_TAIL}")).expect("missing asset pattern is valid")
});

/// An asset hash and where it originally came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRecord {
    /// Asset content hash
    pub hash: String,
    /// Authoritative source URL
    pub url: String,
}

/// Everything of interest in one installer run's output
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetCapture {
    /// Assets served from the asset cache
    pub served: AssetMap,
    /// First asset the installer could not obtain
    pub missing: Option<AssetRecord>,
}

impl AssetCapture {
    /// Scan installer output
    pub fn parse(output: &str) -> Self {
        Self {
            served: parse_served_assets(output),
            missing: parse_missing_asset(output),
        }
    }
}

/// Collect every asset the installer reported serving from the cache
///
/// Repeated hashes keep the last URL seen.
pub fn parse_served_assets(output: &str) -> AssetMap {
    SERVED_ASSET
        .captures_iter(output)
        .map(|caps| (caps[1].to_string(), caps[2].to_string()))
        .collect()
}

/// Find the first asset the installer could not open
///
/// The installer stops at its first hard failure, so only one miss is
/// actionable per run.
pub fn parse_missing_asset(output: &str) -> Option<AssetRecord> {
    MISSING_ASSET.captures(output).map(|caps| AssetRecord {
        hash: caps[1].to_string(),
        url: caps[2].to_string(),
    })
}
