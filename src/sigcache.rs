// src/sigcache.rs

//! Signature-token cache for change detection
//!
//! Every fetchable artifact has a small detached signature blob published
//! next to it. The cache keeps the last-seen blob per artifact; byte
//! equality with the remote blob stands in for "content unchanged", so a
//! matching token means the cached payload can be reused without
//! re-downloading or re-hashing anything. The blobs are fingerprints here,
//! never cryptographically validated.

use crate::error::Result;
use std::fs;
use std::path::PathBuf;

/// Directory of persisted signature blobs (plus the cached index payload)
pub struct SignatureCache {
    dir: PathBuf,
}

impl SignatureCache {
    /// Open the cache, creating its directory if needed
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Read a cached artifact, if a prior run persisted one
    pub fn load(&self, name: &str) -> Option<Vec<u8>> {
        fs::read(self.dir.join(name)).ok()
    }

    /// Persist an artifact, replacing any previous copy
    pub fn store(&self, name: &str, data: &[u8]) -> Result<()> {
        fs::write(self.dir.join(name), data)?;
        Ok(())
    }

    /// Whether the persisted signature for `name` matches the remote blob
    /// byte-for-byte
    pub fn is_current(&self, name: &str, remote_sig: &[u8]) -> bool {
        self.load(name).is_some_and(|local| local == remote_sig)
    }
}
