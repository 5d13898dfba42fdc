// src/install.rs

//! Fetch & install orchestration
//!
//! Drives the end-to-end pipeline: cache-aware index fetch, index parse,
//! dependency resolution, per-package signature checks, memory-budgeted
//! concurrent downloads, hash verification, and in-order extraction.
//!
//! Concurrency is fork-join per batch: every fetch in a batch runs to
//! completion before results are examined, and no work spans batches. All
//! decoding, hashing, and extraction happen sequentially on the calling
//! thread, so the destination tree is never mutated concurrently.

use crate::archive::{self, tar};
use crate::error::{Error, Result};
use crate::repository::index::{PackageDescriptor, PackageIndex};
use crate::repository::{artifact_url, Fetcher};
use crate::resolver;
use crate::sigcache::SignatureCache;
use rayon::prelude::*;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::PathBuf;
use tracing::info;

/// Default repository base URL
pub const DEFAULT_REPO_URL: &str = "https://repo.msys2.org/msys/x86_64";

/// Default index artifact name within the repository
pub const DEFAULT_INDEX_NAME: &str = "msys.db";

/// Root packages installed when the caller does not name any
pub const DEFAULT_PACKAGES: &[&str] = &[
    "msys2-runtime",
    "tar",
    "libgpgme",
    "wget",
    "zstd",
    "unzip",
    "patch",
    "git",
];

/// Memory budget for one download batch
const MAX_BATCH_BYTES: u64 = 256 * 1024 * 1024;

/// Concurrent signature fetches per fork-join round
const SIG_CONCURRENCY: usize = 32;

/// Subdirectory of the destination holding persisted signature tokens
const SIG_CACHE_DIR: &str = ".toolstrap";

/// Outcome counts of one install run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstallSummary {
    pub installed: usize,
    pub up_to_date: usize,
    pub total: usize,
}

/// Configured install pipeline over a [`Fetcher`]
pub struct Installer<F: Fetcher> {
    fetcher: F,
    dest: PathBuf,
    repo_url: String,
    index_name: String,
    roots: Vec<String>,
    batch_budget: u64,
    sig_concurrency: usize,
}

impl<F: Fetcher> Installer<F> {
    pub fn new(fetcher: F, dest: impl Into<PathBuf>) -> Self {
        Self {
            fetcher,
            dest: dest.into(),
            repo_url: DEFAULT_REPO_URL.to_string(),
            index_name: DEFAULT_INDEX_NAME.to_string(),
            roots: Vec::new(),
            batch_budget: MAX_BATCH_BYTES,
            sig_concurrency: SIG_CONCURRENCY,
        }
    }

    pub fn repo_url(mut self, url: impl Into<String>) -> Self {
        self.repo_url = url.into();
        self
    }

    pub fn index_name(mut self, name: impl Into<String>) -> Self {
        self.index_name = name.into();
        self
    }

    /// Root packages to resolve; an empty list means the built-in defaults
    pub fn roots(mut self, roots: Vec<String>) -> Self {
        self.roots = roots;
        self
    }

    pub fn batch_budget(mut self, bytes: u64) -> Self {
        self.batch_budget = bytes;
        self
    }

    /// Run the full pipeline, leaving the destination populated with the
    /// extracted closure on success.
    pub fn install(&self) -> Result<InstallSummary> {
        fs::create_dir_all(&self.dest)?;
        let cache = SignatureCache::open(self.dest.join(SIG_CACHE_DIR))?;

        let db_bytes = self.fetch_index(&cache)?;
        let index = PackageIndex::parse(&archive::decompress_zstd(&db_bytes)?)?;
        info!("Package index: {} packages", index.len());

        let roots: Vec<String> = if self.roots.is_empty() {
            DEFAULT_PACKAGES.iter().map(|s| s.to_string()).collect()
        } else {
            self.roots.clone()
        };

        let resolved = resolver::resolve(&index, &roots);
        info!("Resolved {} packages", resolved.len());

        let (sigs, needs_install) = self.check_signatures(&cache, &resolved)?;

        let install_indices: Vec<usize> =
            (0..resolved.len()).filter(|&i| needs_install[i]).collect();
        let to_install = install_indices.len();
        info!(
            "{} to install, {} up to date",
            to_install,
            resolved.len() - to_install
        );

        self.download_and_extract(&cache, &resolved, &sigs, &install_indices)?;

        let summary = InstallSummary {
            installed: to_install,
            up_to_date: resolved.len() - to_install,
            total: resolved.len(),
        };
        info!(
            "Installed {}, up to date {} (total {} packages)",
            summary.installed, summary.up_to_date, summary.total
        );
        Ok(summary)
    }

    /// Fetch the index, reusing the cached payload when the remote
    /// signature matches the persisted one.
    fn fetch_index(&self, cache: &SignatureCache) -> Result<Vec<u8>> {
        info!("Checking package index");
        let sig_name = format!("{}.sig", self.index_name);
        let remote_sig = self.fetcher.fetch(&artifact_url(&self.repo_url, &sig_name))?;

        if cache.is_current(&sig_name, &remote_sig) {
            if let Some(cached) = cache.load(&self.index_name) {
                info!("Package index unchanged, using cached copy");
                return Ok(cached);
            }
        }

        info!("Downloading package index");
        let db_bytes = self
            .fetcher
            .fetch(&artifact_url(&self.repo_url, &self.index_name))?;
        cache.store(&self.index_name, &db_bytes)?;
        cache.store(&sig_name, &remote_sig)?;
        Ok(db_bytes)
    }

    /// Fetch every package's signature in fork-join rounds of fixed width,
    /// returning the blobs and the changed/unchanged partition.
    fn check_signatures(
        &self,
        cache: &SignatureCache,
        resolved: &[&PackageDescriptor],
    ) -> Result<(Vec<Vec<u8>>, Vec<bool>)> {
        info!("Checking package signatures");
        let mut sigs: Vec<Vec<u8>> = Vec::with_capacity(resolved.len());
        let mut needs_install: Vec<bool> = Vec::with_capacity(resolved.len());

        for chunk in resolved.chunks(self.sig_concurrency) {
            let results: Vec<Result<Vec<u8>>> = chunk
                .par_iter()
                .map(|pkg| {
                    let url = artifact_url(&self.repo_url, &format!("{}.sig", pkg.filename));
                    self.fetcher.fetch(&url)
                })
                .collect();

            // All fetches in the round have completed; a failure now aborts.
            for (pkg, result) in chunk.iter().zip(results) {
                let sig = result?;
                needs_install.push(!cache.is_current(&format!("{}.sig", pkg.filename), &sig));
                sigs.push(sig);
            }
        }

        Ok((sigs, needs_install))
    }

    /// Download the changed packages in memory-budgeted batches and extract
    /// them sequentially in resolution order.
    fn download_and_extract(
        &self,
        cache: &SignatureCache,
        resolved: &[&PackageDescriptor],
        sigs: &[Vec<u8>],
        install_indices: &[usize],
    ) -> Result<()> {
        let to_install = install_indices.len();
        let batches = plan_batches(install_indices, |i| resolved[i].csize, self.batch_budget);

        let mut dl_count = 0usize;
        let mut done_count = 0usize;
        for batch in &batches {
            for &idx in batch {
                let pkg = resolved[idx];
                dl_count += 1;
                info!(
                    "[{}/{}] downloading {}-{} ({})",
                    dl_count,
                    to_install,
                    pkg.name,
                    pkg.version,
                    human_size(pkg.csize)
                );
            }

            let mut results: Vec<(usize, Result<Vec<u8>>)> = batch
                .par_iter()
                .map(|&idx| {
                    let url = artifact_url(&self.repo_url, &resolved[idx].filename);
                    (idx, self.fetcher.fetch(&url))
                })
                .collect();

            // Downloads may complete out of order; extraction must not.
            results.sort_by_key(|(idx, _)| *idx);

            for (idx, result) in results {
                let pkg = resolved[idx];
                done_count += 1;
                info!(
                    "[{}/{}] installing {}-{}",
                    done_count, to_install, pkg.name, pkg.version
                );

                let data = result?;

                if !pkg.sha256.is_empty() {
                    let actual = sha256_hex(&data);
                    if actual != pkg.sha256 {
                        return Err(Error::ChecksumMismatch {
                            filename: pkg.filename.clone(),
                            expected: pkg.sha256.clone(),
                            actual,
                        });
                    }
                }

                let tar_bytes = archive::decompress_zstd(&data)?;
                tar::extract(&tar_bytes, &self.dest)?;

                // Persist the token only after a successful extraction
                cache.store(&format!("{}.sig", pkg.filename), &sigs[idx])?;
            }
        }

        Ok(())
    }
}

/// Partition `indices` into consecutive batches whose summed sizes stay
/// within `budget`. Every batch holds at least one element, so a single
/// oversized package occupies a batch of its own.
fn plan_batches(indices: &[usize], size_of: impl Fn(usize) -> u64, budget: u64) -> Vec<Vec<usize>> {
    let mut batches = Vec::new();
    let mut pos = 0usize;

    while pos < indices.len() {
        let mut batch_bytes = 0u64;
        let mut end = pos;
        while end < indices.len() {
            let size = size_of(indices[end]);
            if end > pos && batch_bytes + size > budget {
                break;
            }
            batch_bytes += size;
            end += 1;
        }
        batches.push(indices[pos..end].to_vec());
        pos = end;
    }

    batches
}

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

fn human_size(bytes: u64) -> String {
    if bytes >= 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    }
}
