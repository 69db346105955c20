//! Streaming content hashing
//!
//! Digests are computed block by block so memory use does not depend on
//! the size of the file being hashed.

use crate::error::{CachetError, CachetResult};
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::digest::core_api::BlockSizeUser;
use sha2::{Digest, Sha256, Sha512};
use std::fmt;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// Number of algorithm blocks read from disk per `read` call
const BLOCKS_PER_READ: usize = 1024;

/// Supported digest algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// SHA-1 (160-bit), used for manifest change detection
    #[default]
    Sha1,
    /// SHA-256
    Sha256,
    /// SHA-512, the digest vcpkg uses to address assets
    Sha512,
}

impl HashAlgorithm {
    /// Internal block size of the algorithm in bytes
    pub fn block_size(&self) -> usize {
        match self {
            Self::Sha1 => Sha1::block_size(),
            Self::Sha256 => Sha256::block_size(),
            Self::Sha512 => Sha512::block_size(),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for HashAlgorithm {
    type Err = CachetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha1" => Ok(Self::Sha1),
            "sha256" => Ok(Self::Sha256),
            "sha512" => Ok(Self::Sha512),
            other => Err(CachetError::UnsupportedAlgorithm(other.to_string())),
        }
    }
}

/// Hash a file's contents, returning the lowercase hex digest
pub fn hash_file(path: &Path, algorithm: HashAlgorithm) -> CachetResult<String> {
    let file = File::open(path)
        .map_err(|e| CachetError::io(format!("opening {} for hashing", path.display()), e))?;

    let digest = match algorithm {
        HashAlgorithm::Sha1 => digest_reader::<Sha1, _>(file),
        HashAlgorithm::Sha256 => digest_reader::<Sha256, _>(file),
        HashAlgorithm::Sha512 => digest_reader::<Sha512, _>(file),
    }
    .map_err(|e| CachetError::io(format!("reading {} for hashing", path.display()), e))?;

    debug!("{} {} = {}", algorithm, path.display(), digest);
    Ok(digest)
}

fn digest_reader<D, R>(mut reader: R) -> std::io::Result<String>
where
    D: Digest + BlockSizeUser,
    R: Read,
{
    let mut hasher = D::new();
    let mut buf = vec![0u8; D::block_size() * BLOCKS_PER_READ];

    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => hasher.update(&buf[..n]),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    Ok(hex::encode(hasher.finalize()))
}
