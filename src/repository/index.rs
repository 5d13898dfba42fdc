// src/repository/index.rs

//! Package index parser
//!
//! The repository index is a compressed tar archive with one
//! `<package-dir>/desc` file per package, written in a custom text format
//! with %FIELD% markers.

use crate::archive::tar;
use crate::error::Result;
use std::collections::HashMap;

/// One row of the repository index
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageDescriptor {
    /// Unique canonical identifier
    pub name: String,
    /// Display version; not used for resolution
    pub version: String,
    /// Remote path component of the fetchable artifact
    pub filename: String,
    /// Expected SHA-256 digest of the artifact, hex
    pub sha256: String,
    /// Declared compressed size in bytes, used for batch planning
    pub csize: u64,
    /// Raw dependency tokens, possibly carrying version-constraint suffixes
    pub depends: Vec<String>,
    /// Alternate names this package satisfies, same suffix convention
    pub provides: Vec<String>,
}

/// Mapping from lookup key (canonical name or provides alias) to descriptor
///
/// The index owns every descriptor; lookups hand out references into it.
#[derive(Debug, Default)]
pub struct PackageIndex {
    packages: Vec<PackageDescriptor>,
    by_name: HashMap<String, usize>,
}

/// Strip a version constraint suffix from a dependency token
/// (e.g. "perl>=5.14.0" -> "perl", "libcurl=8.18.0" -> "libcurl")
pub fn strip_version_constraint(dep: &str) -> &str {
    match dep.find(['>', '<', '=']) {
        Some(pos) => &dep[..pos],
        None => dep,
    }
}

impl PackageIndex {
    /// Parse a decompressed index archive.
    ///
    /// Descriptors missing a name or filename are discarded; they are not a
    /// parse failure.
    pub fn parse(tar_bytes: &[u8]) -> Result<Self> {
        let mut index = Self::default();

        for entry in tar::list_entries(tar_bytes)? {
            // Entries are like "git-2.52.0-2/desc"
            let Some((_, file)) = entry.name.split_once('/') else {
                continue;
            };
            if file != "desc" {
                continue;
            }

            let content = String::from_utf8_lossy(&entry.data);
            if let Some(pkg) = parse_desc(&content) {
                index.register(pkg);
            }
        }

        Ok(index)
    }

    /// Register a descriptor under its canonical name, then under each of
    /// its provides aliases. A later descriptor with the same canonical
    /// name replaces the earlier one; the first descriptor to claim an
    /// alias wins.
    fn register(&mut self, pkg: PackageDescriptor) {
        // A key may name a canonical row or an alias of another package;
        // only a canonical row is replaced in place.
        let existing = match self.by_name.get(&pkg.name) {
            Some(&slot) if self.packages[slot].name == pkg.name => Some(slot),
            _ => None,
        };

        let slot = match existing {
            Some(slot) => {
                self.packages[slot] = pkg;
                slot
            }
            None => {
                let slot = self.packages.len();
                self.by_name.insert(pkg.name.clone(), slot);
                self.packages.push(pkg);
                slot
            }
        };

        for provide in &self.packages[slot].provides {
            let alias = strip_version_constraint(provide);
            self.by_name.entry(alias.to_string()).or_insert(slot);
        }
    }

    /// Look up a descriptor by canonical name or alias.
    ///
    /// The key must already have its constraint suffix stripped.
    pub fn get(&self, name: &str) -> Option<&PackageDescriptor> {
        self.by_name.get(name).map(|&slot| &self.packages[slot])
    }

    /// Number of descriptors in the index (aliases not counted)
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

/// Parse one desc file: `%FIELD%` opens a field, a blank line closes it,
/// any other line is a value of the open field.
fn parse_desc(content: &str) -> Option<PackageDescriptor> {
    let mut pkg = PackageDescriptor::default();
    let mut current_field = "";

    for line in content.lines() {
        if line.is_empty() {
            current_field = "";
            continue;
        }

        if line.len() >= 3 && line.starts_with('%') && line.ends_with('%') {
            current_field = &line[1..line.len() - 1];
            continue;
        }

        match current_field {
            "NAME" => pkg.name = line.to_string(),
            "VERSION" => pkg.version = line.to_string(),
            "FILENAME" => pkg.filename = line.to_string(),
            "SHA256SUM" => pkg.sha256 = line.to_string(),
            "CSIZE" => pkg.csize = line.parse().unwrap_or(0),
            "DEPENDS" => pkg.depends.push(line.to_string()),
            "PROVIDES" => pkg.provides.push(line.to_string()),
            _ => {} // Ignore unknown fields
        }
    }

    (!pkg.name.is_empty() && !pkg.filename.is_empty()).then_some(pkg)
}
