// src/resolver.rs

//! Dependency closure resolution over a package index
//!
//! Explicit-stack depth-first traversal with two-phase frames. The output
//! is dependency-first: every dependency of an emitted descriptor that
//! exists in the index appears earlier in the sequence.

use crate::repository::index::{strip_version_constraint, PackageDescriptor, PackageIndex};
use std::collections::HashSet;
use tracing::warn;

/// One stack frame of the traversal; a descriptor is visited twice, first
/// to expand its dependencies and then to finalize it into the output.
struct Frame {
    name: String,
    expanded: bool,
}

/// Compute the ordered, deduplicated dependency closure of `roots`.
///
/// Root and dependency tokens may carry version-constraint suffixes, which
/// are stripped before lookup. Tokens with no matching descriptor are
/// logged as warnings and omitted. Cyclic declarations terminate via the
/// pending guard, dropping the back-edge.
pub fn resolve<'a>(index: &'a PackageIndex, roots: &[String]) -> Vec<&'a PackageDescriptor> {
    let mut visited: HashSet<String> = HashSet::new();
    let mut pending: HashSet<String> = HashSet::new();
    let mut resolved: Vec<&PackageDescriptor> = Vec::new();

    let mut stack: Vec<Frame> = roots
        .iter()
        .rev()
        .map(|name| Frame {
            name: name.clone(),
            expanded: false,
        })
        .collect();

    while let Some(frame) = stack.pop() {
        let lookup = strip_version_constraint(&frame.name);

        // Resolve alias to canonical descriptor
        let Some(pkg) = index.get(lookup) else {
            if !frame.expanded {
                warn!("package '{}' not found in repository index", lookup);
            }
            continue;
        };

        if frame.expanded {
            // Second visit: finalize into the output
            if visited.insert(pkg.name.clone()) {
                resolved.push(pkg);
            }
            continue;
        }

        if visited.contains(&pkg.name) || pending.contains(&pkg.name) {
            continue;
        }
        pending.insert(pkg.name.clone());

        stack.push(Frame {
            name: pkg.name.clone(),
            expanded: true,
        });

        // Reverse order so the first declared dependency is processed first
        for dep in pkg.depends.iter().rev() {
            stack.push(Frame {
                name: dep.clone(),
                expanded: false,
            });
        }
    }

    resolved
}
