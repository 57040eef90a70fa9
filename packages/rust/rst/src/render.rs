//! reStructuredText building blocks.
//!
//! Every block returned here ends with exactly one newline; [`RstDocument`]
//! separates blocks with a single blank line.

use rstindex_shared::AutodocFlags;

/// Underline character for the page title.
pub const TITLE_UNDERLINE: char = '=';

/// Underline character for sections and module subsections.
pub const SECTION_UNDERLINE: char = '-';

/// Indentation for directive options and toctree entries.
pub const DIRECTIVE_INDENT: &str = "    ";

/// A heading line followed by an underline of the same width.
pub fn heading(text: &str, underline: char) -> String {
    let width = text.chars().count();
    let rule = underline.to_string().repeat(width);
    format!("{text}\n{rule}\n")
}

/// An `automodule` directive with the options enabled in `flags`.
pub fn automodule(name: &str, flags: &AutodocFlags) -> String {
    let mut out = format!(".. automodule:: {name}\n");
    let options = [
        (flags.members, "members"),
        (flags.undoc_members, "undoc-members"),
        (flags.show_inheritance, "show-inheritance"),
    ];
    for (enabled, option) in options {
        if enabled {
            out.push_str(DIRECTIVE_INDENT);
            out.push(':');
            out.push_str(option);
            out.push_str(":\n");
        }
    }
    out
}

/// A `toctree` directive listing `entries` in order.
pub fn toctree<S: AsRef<str>>(entries: &[S], maxdepth: Option<u32>) -> String {
    let mut out = String::from(".. toctree::\n");
    if let Some(depth) = maxdepth {
        out.push_str(&format!("{DIRECTIVE_INDENT}:maxdepth: {depth}\n"));
    }
    out.push('\n');
    for entry in entries {
        out.push_str(DIRECTIVE_INDENT);
        out.push_str(entry.as_ref());
        out.push('\n');
    }
    out
}

// ---------------------------------------------------------------------------
// Document builder
// ---------------------------------------------------------------------------

/// Accumulates blocks and joins them with blank lines.
#[derive(Debug, Default)]
pub struct RstDocument {
    blocks: Vec<String>,
}

impl RstDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a heading block.
    pub fn heading(&mut self, text: &str, underline: char) -> &mut Self {
        self.blocks.push(heading(text, underline));
        self
    }

    /// Append a pre-rendered block.
    pub fn block(&mut self, block: String) -> &mut Self {
        self.blocks.push(block);
        self
    }

    /// Number of blocks appended so far.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Join all blocks into the final document text.
    pub fn finish(self) -> String {
        self.blocks.join("\n")
    }
}
