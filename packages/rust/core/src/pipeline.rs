//! End-to-end build pipeline: index (or discovered tree) → render → assemble.

use std::path::PathBuf;
use std::time::Instant;

use tracing::{info, instrument};

use rstindex_shared::{BuildOptions, IndexFile, PackageTree, Result};

use crate::assembler::{self, AssembleConfig};
use crate::index::{self, RenderedPage};
use crate::toc;

/// Result of a build.
#[derive(Debug)]
pub struct BuildResult {
    /// Directory the pages were written into.
    pub output_dir: PathBuf,
    /// Root package name.
    pub root: String,
    /// Number of package pages (excluding `modules.rst`).
    pub package_count: usize,
    /// Files (re)written.
    pub written: usize,
    /// Files already up to date.
    pub unchanged: usize,
    /// Stale files pruned.
    pub removed: usize,
    /// Total elapsed time.
    pub elapsed: std::time::Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each page is rendered.
    fn page_rendered(&self, filename: &str, current: usize, total: usize);
    /// Called when the pipeline completes.
    fn done(&self, result: &BuildResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn page_rendered(&self, _filename: &str, _current: usize, _total: usize) {}
    fn done(&self, _result: &BuildResult) {}
}

/// Render every page of an index, plus `modules.rst`, without touching disk.
///
/// The index is validated up front; progress is reported as each page
/// finishes rendering.
pub fn render_pages(
    index: &IndexFile,
    opts: &BuildOptions,
    progress: &dyn ProgressReporter,
) -> Result<Vec<RenderedPage>> {
    index::validate_index(index)?;

    let total = index.packages.len() + 1;
    let mut pages = Vec::with_capacity(total);
    for package in &index.packages {
        let page = index::render_package(package, &opts.automodule)?;
        progress.page_rendered(&page.filename, pages.len() + 1, total);
        pages.push(page);
    }

    let modules_toc = toc::render_modules_toc(&index.root, opts.toc_maxdepth);
    progress.page_rendered(&modules_toc.filename, total, total);
    pages.push(modules_toc);

    Ok(pages)
}

/// Build the reference tree described by a hand-authored index.
///
/// 1. Validate and render every package page
/// 2. Render the root `modules.rst`
/// 3. Assemble the output directory
#[instrument(skip_all, fields(root = %index.root, output_dir = %opts.output_dir.display()))]
pub fn build_from_index(
    index: &IndexFile,
    opts: &BuildOptions,
    progress: &dyn ProgressReporter,
) -> Result<BuildResult> {
    let start = Instant::now();

    info!(packages = index.packages.len(), "starting build");

    progress.phase("Rendering pages");
    let pages = render_pages(index, opts, progress)?;

    progress.phase("Writing output");
    let assembled = assembler::assemble(
        &AssembleConfig {
            output_dir: opts.output_dir.clone(),
            root: index.root.clone(),
            tool_version: opts.tool_version.clone(),
            prune: opts.prune,
        },
        &pages,
    )?;

    let result = BuildResult {
        output_dir: assembled.output_dir,
        root: index.root.clone(),
        package_count: index.packages.len(),
        written: assembled.written.len(),
        unchanged: assembled.unchanged.len(),
        removed: assembled.removed.len(),
        elapsed: start.elapsed(),
    };

    info!(
        written = result.written,
        unchanged = result.unchanged,
        removed = result.removed,
        elapsed_ms = result.elapsed.as_millis() as u64,
        "build complete"
    );

    progress.done(&result);
    Ok(result)
}

/// Build the reference tree for a package found on disk.
pub fn build_from_tree(
    tree: &PackageTree,
    opts: &BuildOptions,
    progress: &dyn ProgressReporter,
) -> Result<BuildResult> {
    build_from_index(&tree.to_index_file(), opts, progress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::Mutex;

    use rstindex_shared::AppConfig;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("rstindex-pipeline-test-{}", uuid::Uuid::now_v7()))
    }

    fn options(output_dir: &Path) -> BuildOptions {
        BuildOptions {
            output_dir: output_dir.into(),
            tool_version: "0.1.0-test".into(),
            ..BuildOptions::from(&AppConfig::default())
        }
    }

    fn reference_index() -> IndexFile {
        let fixture = std::fs::read_to_string("../../../fixtures/index/ripyl.toml")
            .expect("read fixture");
        toml::from_str(&fixture).expect("parse fixture")
    }

    #[derive(Default)]
    struct RecordingProgress {
        phases: Mutex<Vec<String>>,
        rendered: Mutex<Vec<(String, usize, usize)>>,
    }

    impl ProgressReporter for RecordingProgress {
        fn phase(&self, name: &str) {
            self.phases.lock().unwrap().push(name.to_string());
        }
        fn page_rendered(&self, filename: &str, current: usize, total: usize) {
            self.rendered
                .lock()
                .unwrap()
                .push((filename.to_string(), current, total));
        }
        fn done(&self, _result: &BuildResult) {}
    }

    #[test]
    fn build_reference_index() {
        let tmp = temp_dir();
        let progress = RecordingProgress::default();

        let result = build_from_index(&reference_index(), &options(&tmp), &progress).unwrap();
        assert_eq!(result.package_count, 6);
        assert_eq!(result.written, 7);

        let root_page = std::fs::read_to_string(tmp.join("ripyl.rst")).unwrap();
        let fixture = std::fs::read_to_string("../../../fixtures/rst/ripyl.rst").unwrap();
        assert_eq!(root_page, fixture);

        let rendered = progress.rendered.lock().unwrap();
        assert_eq!(rendered.len(), 7);
        assert_eq!(rendered[0], ("ripyl.rst".to_string(), 1, 7));
        assert_eq!(rendered[6], ("modules.rst".to_string(), 7, 7));
        assert_eq!(
            *progress.phases.lock().unwrap(),
            ["Rendering pages", "Writing output"]
        );

        assert!(assembler::validate_output(&tmp).is_ok());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn progress_is_reported_while_rendering() {
        let mut index = reference_index();
        let progress = RecordingProgress::default();

        // Valid at index level, invalid once its page is rendered
        index.packages[1].title = Some(String::new());

        let err = render_pages(&index, &options(Path::new("unused")), &progress).unwrap_err();
        assert!(err.to_string().contains("empty title"));
        assert_eq!(
            *progress.rendered.lock().unwrap(),
            [("ripyl.rst".to_string(), 1, 7)]
        );
    }

    #[test]
    fn rebuild_is_a_no_op() {
        let tmp = temp_dir();
        let opts = options(&tmp);

        build_from_index(&reference_index(), &opts, &SilentProgress).unwrap();
        let second = build_from_index(&reference_index(), &opts, &SilentProgress).unwrap();
        assert_eq!(second.written, 0);
        assert_eq!(second.unchanged, 7);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn invalid_index_writes_nothing() {
        let tmp = temp_dir();
        let mut index = reference_index();
        index.packages[0].modules.push("ripyl.decode".into());

        let err = build_from_index(&index, &options(&tmp), &SilentProgress).unwrap_err();
        assert!(err.to_string().contains("duplicate module name"));
        assert!(!tmp.exists());
    }

    #[test]
    fn discovered_tree_matches_hand_written_index() {
        let discovery =
            rstindex_discovery::DiscoveryOptions::from_config(&AppConfig::default().discovery)
                .unwrap();
        let tree = rstindex_discovery::discover_package(
            Path::new("../../../fixtures/pkg/ripyl"),
            &discovery,
        )
        .unwrap();

        let build_opts = options(Path::new("unused"));
        let from_tree = render_pages(&tree.to_index_file(), &build_opts, &SilentProgress).unwrap();
        let from_index = render_pages(&reference_index(), &build_opts, &SilentProgress).unwrap();
        assert_eq!(from_tree, from_index);
    }

    #[test]
    fn build_from_tree_writes_every_package() {
        let tmp = temp_dir();
        let tree = PackageTree {
            name: "pkg".into(),
            modules: vec!["pkg.a".into()],
            subpackages: vec![PackageTree {
                name: "pkg.sub".into(),
                modules: vec!["pkg.sub.b".into()],
                subpackages: vec![],
            }],
        };

        let result = build_from_tree(&tree, &options(&tmp), &SilentProgress).unwrap();
        assert_eq!(result.root, "pkg");
        assert!(tmp.join("pkg.rst").exists());
        assert!(tmp.join("pkg.sub.rst").exists());
        assert!(tmp.join("modules.rst").exists());

        let _ = std::fs::remove_dir_all(&tmp);
    }
}
