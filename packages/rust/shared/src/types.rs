//! Core domain types for rstindex reference trees.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current schema version for the output manifest format.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// AutodocFlags
// ---------------------------------------------------------------------------

/// Options attached to every `automodule` directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutodocFlags {
    /// Emit `:members:`.
    pub members: bool,
    /// Emit `:undoc-members:`.
    pub undoc_members: bool,
    /// Emit `:show-inheritance:`.
    pub show_inheritance: bool,
}

impl Default for AutodocFlags {
    fn default() -> Self {
        Self {
            members: true,
            undoc_members: true,
            show_inheritance: true,
        }
    }
}

// ---------------------------------------------------------------------------
// ModuleReference
// ---------------------------------------------------------------------------

/// A module documented through a single `automodule` directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleReference {
    /// Dotted module path (e.g., `ripyl.decode`).
    pub name: String,
    /// Directive options.
    #[serde(default)]
    pub flags: AutodocFlags,
}

impl ModuleReference {
    pub fn new(name: impl Into<String>, flags: AutodocFlags) -> Self {
        Self {
            name: name.into(),
            flags,
        }
    }
}

// ---------------------------------------------------------------------------
// PackageIndex / IndexFile
// ---------------------------------------------------------------------------

/// One package page: its own name plus the ordered names listed beneath it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageIndex {
    /// Dotted package path (e.g., `ripyl` or `ripyl.protocol`).
    pub name: String,
    /// Page title; defaults to `<name> package` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Subpackage names, in toctree order.
    #[serde(default)]
    pub subpackages: Vec<String>,
    /// Module names, in section order.
    #[serde(default)]
    pub modules: Vec<String>,
    /// Per-package directive options; falls back to the configured defaults.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub automodule: Option<AutodocFlags>,
}

impl PackageIndex {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: None,
            subpackages: Vec::new(),
            modules: Vec::new(),
            automodule: None,
        }
    }

    /// Output file name for this package page.
    pub fn filename(&self) -> String {
        format!("{}.rst", self.name)
    }
}

/// The hand-authored index file (`rstindex.index.toml` by convention).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexFile {
    /// Root package name; its page is linked from `modules.rst`.
    pub root: String,
    /// Every package page to render, in output order.
    #[serde(default)]
    pub packages: Vec<PackageIndex>,
}

impl IndexFile {
    /// Look up a package page by name.
    pub fn package(&self, name: &str) -> Option<&PackageIndex> {
        self.packages.iter().find(|p| p.name == name)
    }
}

// ---------------------------------------------------------------------------
// PackageTree
// ---------------------------------------------------------------------------

/// A package hierarchy as found on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageTree {
    /// Dotted package path.
    pub name: String,
    /// Dotted module paths directly inside this package.
    pub modules: Vec<String>,
    /// Nested packages.
    pub subpackages: Vec<PackageTree>,
}

impl PackageTree {
    /// Flatten the hierarchy into one page per package, parents before children.
    pub fn flatten(&self) -> Vec<PackageIndex> {
        let mut out = Vec::new();
        self.flatten_into(&mut out);
        out
    }

    fn flatten_into(&self, out: &mut Vec<PackageIndex>) {
        out.push(PackageIndex {
            name: self.name.clone(),
            title: None,
            subpackages: self.subpackages.iter().map(|s| s.name.clone()).collect(),
            modules: self.modules.clone(),
            automodule: None,
        });
        for sub in &self.subpackages {
            sub.flatten_into(out);
        }
    }

    /// Convert to an index file rooted at this package.
    pub fn to_index_file(&self) -> IndexFile {
        IndexFile {
            root: self.name.clone(),
            packages: self.flatten(),
        }
    }
}

// ---------------------------------------------------------------------------
// OutputManifest
// ---------------------------------------------------------------------------

/// The `manifest.json` written next to the generated pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputManifest {
    /// Schema version for forward compatibility.
    pub schema_version: u32,
    /// Root package name.
    pub root: String,
    /// Tool version that produced the output.
    pub tool_version: String,
    /// When the output was last assembled.
    pub generated_at: DateTime<Utc>,
    /// Every generated file with its checksum.
    pub files: Vec<ManifestFile>,
    /// Files from earlier builds that are no longer produced but were kept on disk.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stale: Vec<String>,
}

/// Checksum record for one generated file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestFile {
    pub filename: String,
    pub sha256: String,
    pub size_bytes: usize,
}
