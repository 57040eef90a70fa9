//! Python package discovery.
//!
//! Walks a package directory on disk and collects module and subpackage
//! names, so an index can be generated without writing one by hand. Only
//! file and directory names are inspected; no Python source is read.

use std::path::Path;

use regex::Regex;
use tracing::{debug, info, instrument};

use rstindex_shared::{DiscoveryConfig, PackageTree, Result, RstIndexError};

/// File marking a directory as a package.
const PACKAGE_MARKER: &str = "__init__.py";

/// Source suffixes treated as modules.
const MODULE_SUFFIXES: &[&str] = &["py", "pyx"];

// ---------------------------------------------------------------------------
// Discovery options
// ---------------------------------------------------------------------------

/// Configuration for the discovery process.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryOptions {
    /// Include names beginning with `_`.
    pub include_private: bool,
    /// Dotted names matching any of these are skipped (with their children).
    pub exclude_patterns: Vec<Regex>,
}

impl DiscoveryOptions {
    /// Compile options from the `[discovery]` config section.
    pub fn from_config(config: &DiscoveryConfig) -> Result<Self> {
        let exclude_patterns = config
            .exclude_patterns
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|e| {
                    RstIndexError::config(format!("invalid exclude pattern '{p}': {e}"))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            include_private: config.include_private,
            exclude_patterns,
        })
    }

    fn skips(&self, stem: &str, dotted: &str) -> bool {
        if !self.include_private && stem.starts_with('_') {
            return true;
        }
        self.exclude_patterns.iter().any(|re| re.is_match(dotted))
    }
}

// ---------------------------------------------------------------------------
// Main entry point
// ---------------------------------------------------------------------------

/// Discover the package rooted at `dir`.
///
/// The directory name, after resolving `.`, `..` and symlinks, becomes the
/// root package name. Modules and subpackages are sorted by name at every level.
#[instrument(skip_all, fields(dir = %dir.display()))]
pub fn discover_package(dir: &Path, opts: &DiscoveryOptions) -> Result<PackageTree> {
    let resolved = dir.canonicalize().map_err(|e| RstIndexError::io(dir, e))?;
    let dir = resolved.as_path();
    let name = dir
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| {
            RstIndexError::validation(format!(
                "cannot derive a package name from {}",
                dir.display()
            ))
        })?;

    if !dir.join(PACKAGE_MARKER).is_file() {
        return Err(RstIndexError::validation(format!(
            "{} is not a Python package (no {PACKAGE_MARKER})",
            dir.display()
        )));
    }

    let tree = scan(dir, name, opts)?;

    info!(
        root = %tree.name,
        packages = tree.flatten().len(),
        "package discovery complete"
    );

    Ok(tree)
}

fn scan(dir: &Path, dotted: &str, opts: &DiscoveryOptions) -> Result<PackageTree> {
    let mut modules = Vec::new();
    let mut subpackages = Vec::new();

    let entries = std::fs::read_dir(dir).map_err(|e| RstIndexError::io(dir, e))?;

    for entry in entries {
        let entry = entry.map_err(|e| RstIndexError::io(dir, e))?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| RstIndexError::io(&path, e))?;

        if file_type.is_dir() {
            let Some(stem) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !path.join(PACKAGE_MARKER).is_file() {
                debug!(path = %path.display(), "skipping non-package directory");
                continue;
            }
            let child = format!("{dotted}.{stem}");
            if opts.skips(stem, &child) {
                debug!(package = %child, "excluded subpackage");
                continue;
            }
            subpackages.push(scan(&path, &child, opts)?);
        } else if let Some(stem) = module_stem(&path) {
            if stem == "__init__" {
                continue;
            }
            let child = format!("{dotted}.{stem}");
            if opts.skips(stem, &child) {
                debug!(module = %child, "excluded module");
                continue;
            }
            modules.push(child);
        }
    }

    modules.sort();
    modules.dedup();
    subpackages.sort_by(|a, b| a.name.cmp(&b.name));

    debug!(
        package = dotted,
        modules = modules.len(),
        subpackages = subpackages.len(),
        "scanned package"
    );

    Ok(PackageTree {
        name: dotted.to_string(),
        modules,
        subpackages,
    })
}

/// The module stem of a source file, if it has a module suffix.
fn module_stem(path: &Path) -> Option<&str> {
    let ext = path.extension()?.to_str()?;
    if !MODULE_SUFFIXES.contains(&ext) {
        return None;
    }
    path.file_stem()?.to_str()
}
