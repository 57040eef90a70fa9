//! reStructuredText rendering primitives and package page parsing.
//!
//! [`render`] produces the headings and directives the index builder
//! composes into pages; [`parse_package_page`] reads such pages back so
//! existing output can be checked.

mod parser;
pub mod render;

pub use parser::{
    Heading, MODULE_CONTENTS_SECTION, ParsedPage, parse_package_page, parse_toctree_entries,
};
pub use render::{RstDocument, automodule, heading, toctree};

#[cfg(test)]
mod tests {
    use super::*;
    use rstindex_shared::AutodocFlags;

    #[test]
    fn rendered_blocks_parse_back() {
        let flags = AutodocFlags {
            members: true,
            undoc_members: false,
            show_inheritance: true,
        };

        let mut doc = RstDocument::new();
        doc.heading("pkg package", render::TITLE_UNDERLINE)
            .heading("Subpackages", render::SECTION_UNDERLINE)
            .block(toctree(&["pkg.sub"], None))
            .heading("pkg.mod", render::SECTION_UNDERLINE)
            .block(automodule("pkg.mod", &flags))
            .heading(MODULE_CONTENTS_SECTION, render::SECTION_UNDERLINE)
            .block(automodule("pkg", &flags));

        let page = parse_package_page(&doc.finish()).unwrap();
        assert_eq!(page.title, "pkg package");
        assert_eq!(page.subpackages, ["pkg.sub"]);
        assert_eq!(page.modules.len(), 1);
        assert_eq!(page.modules[0].flags, flags);
        assert_eq!(page.contents.unwrap().name, "pkg");
    }
}
