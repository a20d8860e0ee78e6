//! Hashing helpers for resource fingerprints and content checksums.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use sha2::{Digest, Sha256, Sha512};
use tokio::io::AsyncReadExt;

/// Read buffer size used when hashing files (64 KiB).
pub const HASH_CHUNK_SIZE: usize = 1 << 16;

/// Supported digest algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashType {
    /// SHA-256
    Sha256,
    /// SHA-512
    Sha512,
}

impl HashType {
    /// Returns the lowercase algorithm label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
        }
    }
}

impl fmt::Display for HashType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "").as_str() {
            "sha256" => Ok(Self::Sha256),
            "sha512" => Ok(Self::Sha512),
            other => Err(format!("unsupported hash type '{other}'")),
        }
    }
}

enum Hasher {
    Sha256(Sha256),
    Sha512(Sha512),
}

impl Hasher {
    fn new(hash_type: HashType) -> Self {
        match hash_type {
            HashType::Sha256 => Self::Sha256(Sha256::new()),
            HashType::Sha512 => Self::Sha512(Sha512::new()),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Self::Sha256(hasher) => hasher.update(data),
            Self::Sha512(hasher) => hasher.update(data),
        }
    }

    fn finalize_hex(self) -> String {
        match self {
            Self::Sha256(hasher) => format!("{:x}", hasher.finalize()),
            Self::Sha512(hasher) => format!("{:x}", hasher.finalize()),
        }
    }
}

/// Returns the lowercase hex digest of `data`.
#[must_use]
pub fn hash_bytes(data: &[u8], hash_type: HashType) -> String {
    let mut hasher = Hasher::new(hash_type);
    hasher.update(data);
    hasher.finalize_hex()
}

/// Returns the lowercase hex digest of the file at `path`, read in
/// [`HASH_CHUNK_SIZE`] chunks.
///
/// # Errors
///
/// Returns the underlying IO error if the file cannot be opened or read.
pub async fn hash_file(path: &Path, hash_type: HashType) -> std::io::Result<String> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut hasher = Hasher::new(hash_type);
    let mut buffer = vec![0u8; HASH_CHUNK_SIZE];
    loop {
        let read = file.read(&mut buffer).await?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hasher.finalize_hex())
}
