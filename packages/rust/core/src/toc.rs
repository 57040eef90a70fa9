//! Root table of contents.
//!
//! Renders `modules.rst`, the entry point linking the root package page,
//! and checks that the subpackage toctrees of an index form a tree rooted
//! at that page.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::{debug, instrument};

use rstindex_rst::RstDocument;
use rstindex_rst::render::TITLE_UNDERLINE;
use rstindex_shared::IndexFile;

use crate::index::RenderedPage;

/// File name of the root table of contents.
pub const MODULES_TOC_FILENAME: &str = "modules.rst";

/// Findings from [`check_toc`].
#[derive(Debug, Default, PartialEq, Eq)]
pub struct TocReport {
    /// Subpackage entries that have no page in the index.
    pub dangling: Vec<String>,
    /// Pages not reachable from the root through subpackage toctrees.
    pub orphans: Vec<String>,
}

impl TocReport {
    pub fn is_clean(&self) -> bool {
        self.dangling.is_empty() && self.orphans.is_empty()
    }
}

/// Render `modules.rst` for the given root package.
pub fn render_modules_toc(root: &str, maxdepth: u32) -> RenderedPage {
    let mut doc = RstDocument::new();
    doc.heading(root, TITLE_UNDERLINE)
        .block(rstindex_rst::toctree(&[root], Some(maxdepth)));

    RenderedPage {
        name: "modules".into(),
        filename: MODULES_TOC_FILENAME.into(),
        content: doc.finish(),
    }
}

/// Walk subpackage toctrees breadth-first from the root page.
#[instrument(skip_all, fields(root = %index.root))]
pub fn check_toc(index: &IndexFile) -> TocReport {
    let by_name: HashMap<&str, _> = index
        .packages
        .iter()
        .map(|p| (p.name.as_str(), p))
        .collect();

    let mut report = TocReport::default();
    let mut visited: HashSet<&str> = HashSet::new();
    let mut queue: VecDeque<&str> = VecDeque::from([index.root.as_str()]);

    while let Some(name) = queue.pop_front() {
        if !visited.insert(name) {
            continue;
        }
        let Some(package) = by_name.get(name) else {
            report.dangling.push(name.to_string());
            continue;
        };
        for sub in &package.subpackages {
            queue.push_back(sub.as_str());
        }
    }

    report.orphans = index
        .packages
        .iter()
        .filter(|p| !visited.contains(p.name.as_str()))
        .map(|p| p.name.clone())
        .collect();

    debug!(
        dangling = report.dangling.len(),
        orphans = report.orphans.len(),
        "toctree check complete"
    );

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstindex_shared::PackageIndex;

    fn package(name: &str, subpackages: &[&str]) -> PackageIndex {
        let mut p = PackageIndex::new(name);
        p.subpackages = subpackages.iter().map(|s| s.to_string()).collect();
        p
    }

    #[test]
    fn modules_toc_matches_fixture() {
        let page = render_modules_toc("ripyl", 4);
        let fixture = std::fs::read_to_string("../../../fixtures/rst/modules.rst")
            .expect("read fixture");
        assert_eq!(page.filename, MODULES_TOC_FILENAME);
        assert_eq!(page.content, fixture);
    }

    #[test]
    fn complete_tree_is_clean() {
        let index = IndexFile {
            root: "ripyl".into(),
            packages: vec![
                package("ripyl", &["ripyl.io", "ripyl.protocol"]),
                package("ripyl.io", &[]),
                package("ripyl.protocol", &["ripyl.protocol.infrared"]),
                package("ripyl.protocol.infrared", &[]),
            ],
        };
        assert!(check_toc(&index).is_clean());
    }

    #[test]
    fn missing_pages_are_dangling() {
        let index = IndexFile {
            root: "ripyl".into(),
            packages: vec![package("ripyl", &["ripyl.io", "ripyl.util"]), package("ripyl.io", &[])],
        };
        let report = check_toc(&index);
        assert_eq!(report.dangling, ["ripyl.util"]);
        assert!(report.orphans.is_empty());
    }

    #[test]
    fn unlinked_pages_are_orphans() {
        let index = IndexFile {
            root: "ripyl".into(),
            packages: vec![package("ripyl", &[]), package("ripyl.cython", &[])],
        };
        let report = check_toc(&index);
        assert_eq!(report.orphans, ["ripyl.cython"]);
    }

    #[test]
    fn cycles_terminate() {
        let index = IndexFile {
            root: "a".into(),
            packages: vec![package("a", &["a.b"]), package("a.b", &["a"])],
        };
        assert!(check_toc(&index).is_clean());
    }

    #[test]
    fn reference_fixture_is_clean() {
        let fixture = std::fs::read_to_string("../../../fixtures/index/ripyl.toml")
            .expect("read fixture");
        let index: IndexFile = toml::from_str(&fixture).expect("parse fixture");
        assert!(check_toc(&index).is_clean());
    }
}
