//! Documentation index builder.
//!
//! Turns ordered module and subpackage names into one package page:
//! title, `Subpackages` toctree, one `automodule` subsection per module,
//! and a trailing `Module contents` section for the package itself.
//! Rendering is a pure function of its input; names are validated first.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, instrument, warn};

use rstindex_rst::render::{SECTION_UNDERLINE, TITLE_UNDERLINE};
use rstindex_rst::{MODULE_CONTENTS_SECTION, RstDocument, automodule, toctree};
use rstindex_shared::{AutodocFlags, IndexFile, ModuleReference, PackageIndex, Result, RstIndexError};

use crate::toc::{self, MODULES_TOC_FILENAME};

/// Matches a dotted Python name: identifiers joined by single dots.
static DOTTED_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\W\d]\w*(?:\.[^\W\d]\w*)*$").expect("dotted name regex")
});

/// A rendered page ready for assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    /// Dotted name of the documented package (or `modules` for the root TOC).
    pub name: String,
    /// File name within the output directory.
    pub filename: String,
    /// Full page text.
    pub content: String,
}

/// Render one package page.
///
/// Rejects names that are not dotted identifiers, a blank or multi-line
/// title, and duplicates within the module list or the subpackage list
/// before anything is rendered.
#[instrument(skip_all, fields(package = %package.name, modules = modules.len(), subpackages = subpackages.len()))]
pub fn render_index(
    package: &ModuleReference,
    title: Option<&str>,
    modules: &[ModuleReference],
    subpackages: &[String],
) -> Result<String> {
    validate_name("package", &package.name)?;
    validate_listing(
        "module",
        &package.name,
        modules.iter().map(|m| m.name.as_str()),
    )?;
    validate_listing(
        "subpackage",
        &package.name,
        subpackages.iter().map(String::as_str),
    )?;
    if let Some(title) = title {
        validate_title(title)?;
    }

    let default_title = format!("{} package", package.name);
    let mut doc = RstDocument::new();
    doc.heading(title.unwrap_or(&default_title), TITLE_UNDERLINE);

    if !subpackages.is_empty() {
        doc.heading("Subpackages", SECTION_UNDERLINE)
            .block(toctree(subpackages, None));
    }

    if !modules.is_empty() {
        doc.heading("Submodules", SECTION_UNDERLINE);
        for module in modules {
            doc.heading(&module.name, SECTION_UNDERLINE)
                .block(automodule(&module.name, &module.flags));
        }
    }

    doc.heading(MODULE_CONTENTS_SECTION, SECTION_UNDERLINE)
        .block(automodule(&package.name, &package.flags));

    debug!(blocks = doc.len(), "package page rendered");
    Ok(doc.finish())
}

/// Render a package page from its index entry.
///
/// `default_flags` applies when the entry has no `automodule` override.
pub fn render_package(package: &PackageIndex, default_flags: &AutodocFlags) -> Result<RenderedPage> {
    let flags = package.automodule.unwrap_or(*default_flags);
    let modules: Vec<ModuleReference> = package
        .modules
        .iter()
        .map(|name| ModuleReference::new(name.clone(), flags))
        .collect();

    for child in package.modules.iter().chain(&package.subpackages) {
        if !child.starts_with(&format!("{}.", package.name)) {
            warn!(package = %package.name, child = %child, "entry is not nested under its package");
        }
    }

    let content = render_index(
        &ModuleReference::new(package.name.clone(), flags),
        package.title.as_deref(),
        &modules,
        &package.subpackages,
    )?;

    Ok(RenderedPage {
        name: package.name.clone(),
        filename: package.filename(),
        content,
    })
}

/// Render every package page in an index file, in file order.
#[instrument(skip_all, fields(root = %index.root, packages = index.packages.len()))]
pub fn render_all(index: &IndexFile, default_flags: &AutodocFlags) -> Result<Vec<RenderedPage>> {
    validate_index(index)?;

    index
        .packages
        .iter()
        .map(|p| render_package(p, default_flags))
        .collect()
}

/// Index-level checks: root present, page names unique, no clash with the root TOC.
///
/// Toctree inconsistencies are logged, not rejected.
pub fn validate_index(index: &IndexFile) -> Result<()> {
    validate_name("root", &index.root)?;
    validate_listing(
        "package",
        &index.root,
        index.packages.iter().map(|p| p.name.as_str()),
    )?;

    if index.package(&index.root).is_none() {
        return Err(RstIndexError::validation(format!(
            "index has no page for root package '{}'",
            index.root
        )));
    }

    if let Some(clash) = index
        .packages
        .iter()
        .find(|p| p.filename() == MODULES_TOC_FILENAME)
    {
        return Err(RstIndexError::validation(format!(
            "package '{}' would overwrite {MODULES_TOC_FILENAME}",
            clash.name
        )));
    }

    let report = toc::check_toc(index);
    for name in &report.dangling {
        warn!(entry = %name, "toctree entry has no package page");
    }
    for name in &report.orphans {
        warn!(package = %name, "package page is not reachable from the root toctree");
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Names become directive arguments and file names, so only dotted identifiers pass.
fn validate_name(kind: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(RstIndexError::validation(format!("empty {kind} name")));
    }
    if !DOTTED_NAME_RE.is_match(name) {
        return Err(RstIndexError::validation(format!(
            "{kind} name '{}' is not a dotted identifier",
            name.escape_debug()
        )));
    }
    Ok(())
}

/// A title must be one non-blank line the parser can read back as a heading.
fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(RstIndexError::validation("empty title"));
    }
    if title.contains(['\n', '\r']) {
        return Err(RstIndexError::validation(format!(
            "title '{}' spans multiple lines",
            title.escape_debug()
        )));
    }
    if title != title.trim() || title.starts_with("..") {
        return Err(RstIndexError::validation(format!(
            "title '{title}' has surrounding whitespace or starts with '..'"
        )));
    }
    Ok(())
}

/// Every name valid, and unique within the listing.
fn validate_listing<'a>(
    kind: &str,
    owner: &str,
    names: impl Iterator<Item = &'a str>,
) -> Result<()> {
    let mut seen = HashSet::new();
    for name in names {
        validate_name(kind, name)?;
        if !seen.insert(name) {
            return Err(RstIndexError::validation(format!(
                "duplicate {kind} name '{name}' in '{owner}'"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODULES: [&str; 6] = [
        "ripyl.config",
        "ripyl.decode",
        "ripyl.manchester",
        "ripyl.sigproc",
        "ripyl.streaming",
        "ripyl.wave_synth",
    ];
    const SUBPACKAGES: [&str; 4] = ["ripyl.cython", "ripyl.io", "ripyl.protocol", "ripyl.util"];

    fn refs(names: &[&str]) -> Vec<ModuleReference> {
        names
            .iter()
            .map(|n| ModuleReference::new(*n, AutodocFlags::default()))
            .collect()
    }

    fn strings(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn root() -> ModuleReference {
        ModuleReference::new("ripyl", AutodocFlags::default())
    }

    #[test]
    fn reference_package_matches_fixture() {
        let out = render_index(&root(), None, &refs(&MODULES), &strings(&SUBPACKAGES)).unwrap();
        let fixture = std::fs::read_to_string("../../../fixtures/rst/ripyl.rst")
            .expect("read fixture");
        assert_eq!(out, fixture);
    }

    #[test]
    fn reference_package_counts_and_order() {
        let out = render_index(&root(), None, &refs(&MODULES), &strings(&SUBPACKAGES)).unwrap();
        let page = rstindex_rst::parse_package_page(&out).unwrap();

        let module_names: Vec<&str> = page.modules.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(module_names, MODULES);
        assert_eq!(page.subpackages, SUBPACKAGES);

        let module_headings = page
            .headings
            .iter()
            .filter(|h| MODULES.contains(&h.text.as_str()))
            .count();
        assert_eq!(module_headings, 6);

        assert_eq!(page.headings.last().unwrap().text, MODULE_CONTENTS_SECTION);
        assert_eq!(page.contents.unwrap().name, "ripyl");
        assert_eq!(out.matches("Module contents").count(), 1);
    }

    #[test]
    fn section_count_follows_input() {
        for n in 0..MODULES.len() {
            let out = render_index(&root(), None, &refs(&MODULES[..n]), &[]).unwrap();
            let page = rstindex_rst::parse_package_page(&out).unwrap();
            assert_eq!(page.modules.len(), n);
            assert!(page.subpackages.is_empty());
        }
    }

    #[test]
    fn input_order_is_preserved() {
        let reversed: Vec<&str> = MODULES.iter().rev().copied().collect();
        let out = render_index(&root(), None, &refs(&reversed), &[]).unwrap();
        let page = rstindex_rst::parse_package_page(&out).unwrap();
        let names: Vec<&str> = page.modules.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, reversed);
    }

    #[test]
    fn rendering_is_idempotent() {
        let a = render_index(&root(), None, &refs(&MODULES), &strings(&SUBPACKAGES)).unwrap();
        let b = render_index(&root(), None, &refs(&MODULES), &strings(&SUBPACKAGES)).unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn duplicate_module_is_rejected() {
        let err = render_index(&root(), None, &refs(&["ripyl.decode", "ripyl.decode"]), &[])
            .unwrap_err();
        assert!(err.to_string().contains("duplicate module name 'ripyl.decode'"));
    }

    #[test]
    fn duplicate_subpackage_is_rejected() {
        let err = render_index(&root(), None, &[], &strings(&["ripyl.io", "ripyl.io"]))
            .unwrap_err();
        assert!(err.to_string().contains("duplicate subpackage"));
    }

    #[test]
    fn same_name_in_both_lists_is_allowed() {
        let out = render_index(&root(), None, &refs(&["ripyl.io"]), &strings(&["ripyl.io"]));
        assert!(out.is_ok());
    }

    #[test]
    fn empty_and_whitespace_names_are_rejected() {
        assert!(render_index(&root(), None, &refs(&[""]), &[]).is_err());
        assert!(render_index(&root(), None, &[], &strings(&["ripyl. io"])).is_err());
        let blank = ModuleReference::new("", AutodocFlags::default());
        assert!(render_index(&blank, None, &[], &[]).is_err());
    }

    #[test]
    fn empty_lists_omit_their_sections() {
        let out = render_index(&root(), None, &[], &[]).unwrap();
        assert!(!out.contains("Subpackages"));
        assert!(!out.contains("Submodules"));
        assert!(out.starts_with("ripyl package\n=============\n"));
        assert!(out.contains(".. automodule:: ripyl\n"));
    }

    #[test]
    fn path_like_names_are_rejected() {
        for bad in ["../escaped", "ripyl/io", "ripyl\\io", ".ripyl", "ripyl..io", "ripyl.", "1ripyl"] {
            let pkg = ModuleReference::new(bad, AutodocFlags::default());
            let err = render_index(&pkg, None, &[], &[]).unwrap_err();
            assert!(err.to_string().contains("not a dotted identifier"), "{bad}");
        }
        assert!(render_index(&root(), None, &refs(&["ripyl/../x"]), &[]).is_err());
    }

    #[test]
    fn render_all_rejects_escaping_package_name() {
        let mut escaped = PackageIndex::new("../escaped");
        escaped.modules = vec!["x".into()];
        let mut root_page = PackageIndex::new("ripyl");
        root_page.subpackages = vec!["../escaped".into()];
        let index = IndexFile {
            root: "ripyl".into(),
            packages: vec![root_page, escaped],
        };
        assert!(render_all(&index, &AutodocFlags::default()).is_err());
    }

    #[test]
    fn blank_or_multiline_titles_are_rejected() {
        for bad in ["", "   ", "Ripyl\nAPI", "Ripyl\r", " Ripyl", ".. note::"] {
            assert!(render_index(&root(), Some(bad), &[], &[]).is_err(), "{bad:?}");
        }
    }

    #[test]
    fn one_char_title_parses_back() {
        let out = render_index(&root(), Some("X"), &refs(&["ripyl.decode"]), &[]).unwrap();
        assert!(out.starts_with("X\n=\n"));

        let page = rstindex_rst::parse_package_page(&out).unwrap();
        assert_eq!(page.title, "X");
        assert_eq!(page.modules.len(), 1);
        assert_eq!(page.contents.unwrap().name, "ripyl");
    }

    #[test]
    fn package_named_modules_is_rejected() {
        let index = IndexFile {
            root: "modules".into(),
            packages: vec![PackageIndex::new("modules")],
        };
        let err = render_all(&index, &AutodocFlags::default()).unwrap_err();
        assert!(err.to_string().contains("modules.rst"));
    }

    #[test]
    fn title_override_is_used() {
        let out = render_index(&root(), Some("Ripyl API"), &[], &[]).unwrap();
        assert!(out.starts_with("Ripyl API\n=========\n"));
    }

    #[test]
    fn package_override_flags_apply_to_every_directive() {
        let mut pkg = PackageIndex::new("ripyl.io");
        pkg.modules = vec!["ripyl.io.visa".into()];
        pkg.automodule = Some(AutodocFlags {
            members: true,
            undoc_members: false,
            show_inheritance: false,
        });

        let page = render_package(&pkg, &AutodocFlags::default()).unwrap();
        assert_eq!(page.filename, "ripyl.io.rst");
        assert!(!page.content.contains(":undoc-members:"));
        assert_eq!(page.content.matches(":members:").count(), 2);
    }

    #[test]
    fn render_all_requires_root_page() {
        let index = IndexFile {
            root: "ripyl".into(),
            packages: vec![PackageIndex::new("ripyl.io")],
        };
        let err = render_all(&index, &AutodocFlags::default()).unwrap_err();
        assert!(err.to_string().contains("no page for root package"));
    }

    #[test]
    fn render_all_rejects_duplicate_pages() {
        let index = IndexFile {
            root: "ripyl".into(),
            packages: vec![PackageIndex::new("ripyl"), PackageIndex::new("ripyl")],
        };
        assert!(render_all(&index, &AutodocFlags::default()).is_err());
    }

    #[test]
    fn render_all_reference_fixture() {
        let fixture = std::fs::read_to_string("../../../fixtures/index/ripyl.toml")
            .expect("read fixture");
        let index: IndexFile = toml::from_str(&fixture).expect("parse fixture");

        let pages = render_all(&index, &AutodocFlags::default()).unwrap();
        assert_eq!(pages.len(), 6);
        assert_eq!(pages[0].filename, "ripyl.rst");
        assert!(pages.iter().any(|p| p.filename == "ripyl.protocol.infrared.rst"));
    }
}
