//! Content-addressed asset cache
//!
//! The asset cache is a flat directory shared by every manifest. Asset
//! blobs are named by their SHA-512 digest; each manifest also leaves a
//! `_<project>.json` metadata record listing the assets it needed and the
//! hash of the manifest they were recorded against.
//!
//! # File Categories
//!
//! | Kind | Category | Meaning |
//! |------|----------|---------|
//! | asset | good | referenced by current metadata |
//! | asset | missing | referenced by current metadata, not on disk |
//! | asset | extra | not referenced by current metadata |
//! | metadata | good | manifest unchanged since recording |
//! | metadata | outdated | manifest changed since recording |
//! | metadata | missing | manifest never processed |
//! | metadata | extra | manifest no longer exists |
//! | other | other | unrecognized file name |
//!
//! Pruning removes the extra and other files, and only once nothing is
//! missing or outdated.

pub mod hash;
pub mod layout;
pub mod metadata;
pub mod prune;
pub mod reconcile;

pub use hash::{hash_file, HashAlgorithm};
pub use layout::{short_hash, CacheLayout, FileKind};
pub use metadata::{AssetMap, ManifestMetadata};
pub use prune::{ensure_prunable, prune, PruneReport};
pub use reconcile::{reconcile, CacheState};
