// src/lib.rs

//! Toolstrap
//!
//! Bootstraps a minimal POSIX toolchain environment from a pacman-style
//! binary package repository: fetches the compressed package index,
//! resolves the transitive dependency closure, downloads changed packages
//! concurrently under a memory budget, verifies content hashes, and
//! extracts the payloads in dependency order.
//!
//! # Architecture
//!
//! - Index-driven: package metadata comes from the repository's compressed
//!   index of `%FIELD%` desc files, nothing is stored locally beyond
//!   signature tokens
//! - Change detection by signature token: byte equality of the detached
//!   `.sig` blob decides re-fetch, content is never re-hashed for staleness
//! - Fork-join batches: bounded concurrency with no cross-batch state and
//!   no cancellation
//! - Fail-fast: every fetch, format, or integrity error aborts the run;
//!   only unresolvable dependency tokens degrade to warnings

pub mod archive;
mod error;
pub mod install;
pub mod repository;
pub mod resolver;
pub mod sigcache;

pub use error::{Error, Result};
