//! Output directory assembler.
//!
//! Writes rendered pages to disk, records their checksums in
//! `manifest.json`, and leaves unchanged pages untouched so repeated
//! builds do not disturb file timestamps. Every file name read from a page
//! or a manifest must be a bare `*.rst` name inside the output directory.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, warn};

use rstindex_shared::{
    CURRENT_SCHEMA_VERSION, ManifestFile, OutputManifest, Result, RstIndexError,
};

use crate::index::RenderedPage;
use crate::toc::MODULES_TOC_FILENAME;

/// Manifest file name inside the output directory.
pub const MANIFEST_FILENAME: &str = "manifest.json";

/// Configuration for output assembly.
#[derive(Debug, Clone)]
pub struct AssembleConfig {
    /// Directory the pages are written into.
    pub output_dir: PathBuf,
    /// Root package name recorded in the manifest.
    pub root: String,
    /// Tool version string.
    pub tool_version: String,
    /// Remove files from the previous manifest that are no longer produced.
    pub prune: bool,
}

/// Output from a successful assembly.
#[derive(Debug, Clone)]
pub struct AssembleResult {
    /// Directory the pages were written into.
    pub output_dir: PathBuf,
    /// Files whose content was (re)written.
    pub written: Vec<String>,
    /// Files already up to date.
    pub unchanged: Vec<String>,
    /// Stale files deleted by pruning.
    pub removed: Vec<String>,
    /// The manifest that was written.
    pub manifest: OutputManifest,
}

/// Write all pages and the manifest.
#[instrument(skip_all, fields(output_dir = %config.output_dir.display(), pages = pages.len()))]
pub fn assemble(config: &AssembleConfig, pages: &[RenderedPage]) -> Result<AssembleResult> {
    let dir = &config.output_dir;
    for page in pages {
        check_output_filename(&page.filename)?;
    }
    std::fs::create_dir_all(dir).map_err(|e| RstIndexError::io(dir, e))?;

    let previous = match read_manifest(dir) {
        Ok(manifest) => Some(manifest),
        Err(RstIndexError::Io { .. }) => None,
        Err(e) => {
            warn!(error = %e, "ignoring unreadable previous manifest");
            None
        }
    };

    let mut written = Vec::new();
    let mut unchanged = Vec::new();
    let mut files = Vec::with_capacity(pages.len());

    for page in pages {
        let target = dir.join(&page.filename);
        let hash = sha256_hex(page.content.as_bytes());

        if existing_hash(&target).as_deref() == Some(hash.as_str()) {
            debug!(file = %page.filename, "page unchanged");
            unchanged.push(page.filename.clone());
        } else {
            write_atomic(&target, &page.content)?;
            debug!(file = %page.filename, size = page.content.len(), "wrote page");
            written.push(page.filename.clone());
        }

        files.push(ManifestFile {
            filename: page.filename.clone(),
            sha256: hash,
            size_bytes: page.content.len(),
        });
    }

    let current: HashSet<&str> = pages.iter().map(|p| p.filename.as_str()).collect();
    let leftovers = previous
        .as_ref()
        .map(|m| stale_candidates(m, &current))
        .unwrap_or_default();

    let mut removed = Vec::new();
    let mut stale = Vec::new();
    for old in leftovers {
        if let Err(e) = check_output_filename(&old) {
            warn!(file = %old, error = %e, "ignoring unsafe entry in previous manifest");
            continue;
        }
        let path = dir.join(&old);
        if !config.prune {
            if path.exists() {
                stale.push(old);
            }
            continue;
        }
        match std::fs::remove_file(&path) {
            Ok(()) => removed.push(old),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(RstIndexError::io(&path, e)),
        }
    }

    let manifest = OutputManifest {
        schema_version: CURRENT_SCHEMA_VERSION,
        root: config.root.clone(),
        tool_version: config.tool_version.clone(),
        generated_at: Utc::now(),
        files,
        stale,
    };
    write_json(&dir.join(MANIFEST_FILENAME), &manifest)?;

    info!(
        written = written.len(),
        unchanged = unchanged.len(),
        removed = removed.len(),
        stale = manifest.stale.len(),
        "output assembly complete"
    );

    Ok(AssembleResult {
        output_dir: dir.clone(),
        written,
        unchanged,
        removed,
        manifest,
    })
}

/// Verify that an output directory is well-formed.
///
/// Checks the manifest, every listed file's checksum, and that every page
/// parses. Toctree entries without a page are logged but not fatal.
#[instrument(skip_all, fields(output_dir = %dir.display()))]
pub fn validate_output(dir: &Path) -> Result<OutputManifest> {
    if !dir.join(MANIFEST_FILENAME).exists() {
        return Err(RstIndexError::validation(format!("missing {MANIFEST_FILENAME}")));
    }

    let manifest = read_manifest(dir)?;
    if manifest.schema_version != CURRENT_SCHEMA_VERSION {
        return Err(RstIndexError::validation(format!(
            "unsupported schema_version: {} (expected {})",
            manifest.schema_version, CURRENT_SCHEMA_VERSION
        )));
    }

    for name in &manifest.stale {
        check_output_filename(name)?;
    }

    for file in &manifest.files {
        check_output_filename(&file.filename)?;
        let path = dir.join(&file.filename);
        let content = std::fs::read_to_string(&path).map_err(|e| RstIndexError::io(&path, e))?;

        if sha256_hex(content.as_bytes()) != file.sha256 {
            return Err(RstIndexError::validation(format!(
                "checksum mismatch for {}",
                file.filename
            )));
        }

        let entries = if file.filename == MODULES_TOC_FILENAME {
            rstindex_rst::parse_toctree_entries(&content)
        } else {
            rstindex_rst::parse_package_page(&content)
                .map_err(|e| {
                    RstIndexError::validation(format!("{}: {e}", file.filename))
                })?
                .subpackages
        };

        for entry in entries {
            let expected = dir.join(format!("{entry}.rst"));
            if !expected.exists() {
                warn!(
                    file = %file.filename,
                    entry = %entry,
                    "toctree entry has no page (non-fatal)"
                );
            }
        }
    }

    debug!(files = manifest.files.len(), "output directory valid");
    Ok(manifest)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Reject anything but a bare `*.rst` file name.
fn check_output_filename(name: &str) -> Result<()> {
    let bare = !name.starts_with('.')
        && !name.contains(['/', '\\'])
        && Path::new(name).file_name().and_then(|n| n.to_str()) == Some(name);
    if !bare || !name.ends_with(".rst") || name.len() == ".rst".len() {
        return Err(RstIndexError::validation(format!(
            "refusing output file name '{}'",
            name.escape_debug()
        )));
    }
    Ok(())
}

/// Files the previous build produced, or kept as stale, that this build no longer does.
fn stale_candidates(previous: &OutputManifest, current: &HashSet<&str>) -> Vec<String> {
    let mut seen = HashSet::new();
    previous
        .files
        .iter()
        .map(|f| f.filename.as_str())
        .chain(previous.stale.iter().map(String::as_str))
        .filter(|name| !current.contains(name) && seen.insert(*name))
        .map(str::to_string)
        .collect()
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Hash of the file currently at `path`, if it can be read.
fn existing_hash(path: &Path) -> Option<String> {
    std::fs::read(path).ok().map(|bytes| sha256_hex(&bytes))
}

/// Write to a sibling temp file, then rename over the target.
fn write_atomic(target: &Path, content: &str) -> Result<()> {
    let file_name = target
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| RstIndexError::validation(format!("invalid output path {}", target.display())))?;
    let temp = target.with_file_name(format!(".{file_name}.tmp"));

    std::fs::write(&temp, content).map_err(|e| RstIndexError::io(&temp, e))?;
    std::fs::rename(&temp, target).map_err(|e| RstIndexError::io(target, e))?;
    Ok(())
}

fn read_manifest(dir: &Path) -> Result<OutputManifest> {
    let path = dir.join(MANIFEST_FILENAME);
    let content = std::fs::read_to_string(&path).map_err(|e| RstIndexError::io(&path, e))?;
    serde_json::from_str(&content)
        .map_err(|e| RstIndexError::validation(format!("invalid {MANIFEST_FILENAME}: {e}")))
}

/// Write a JSON file (pretty-printed).
fn write_json<T: serde::Serialize>(path: &Path, data: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(data).map_err(|e| {
        RstIndexError::validation(format!("JSON serialization failed: {e}"))
    })?;
    write_atomic(path, &json)?;
    debug!(path = %path.display(), "wrote JSON file");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
