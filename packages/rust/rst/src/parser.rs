//! Package page parser.
//!
//! Reads pages in the layout produced by [`crate::render`]:
//! - Title: text line underlined with `=`
//! - Sections: text lines underlined with `-`
//! - `.. toctree::` with optional `:option:` lines and indented entries
//! - `.. automodule:: <name>` with indented `:members:`-style flags

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use rstindex_shared::{AutodocFlags, ModuleReference, Result, RstIndexError};

/// Title of the trailing section documenting the package itself.
pub const MODULE_CONTENTS_SECTION: &str = "Module contents";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A heading found in the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    pub text: String,
    pub underline: char,
}

/// Parsed representation of a package page.
#[derive(Debug, Clone)]
pub struct ParsedPage {
    /// The first heading's text.
    pub title: String,
    /// Every heading after the title, in document order.
    pub headings: Vec<Heading>,
    /// Toctree entries, in document order.
    pub subpackages: Vec<String>,
    /// `automodule` directives outside the "Module contents" section.
    pub modules: Vec<ModuleReference>,
    /// The `automodule` directive inside "Module contents", if present.
    pub contents: Option<ModuleReference>,
}

// ---------------------------------------------------------------------------
// Regex patterns (compiled once)
// ---------------------------------------------------------------------------

/// Matches an underline: one punctuation character, repeated at least once.
static UNDERLINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(?:=+|-+|~+|\^+|"+|\*+|\++|#+)$"#).expect("underline regex")
});

/// Matches `.. name::` with an optional argument.
static DIRECTIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\.\.\s+([a-z][a-z0-9_-]*)::\s*(.*)$").expect("directive regex")
});

/// Matches an option line such as `:members:` or `:maxdepth: 4`.
static OPTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^:([a-z][a-z0-9_-]*):\s*(.*)$").expect("option regex")
});

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Parse a package page into structured data.
pub fn parse_package_page(content: &str) -> Result<ParsedPage> {
    let lines: Vec<&str> = content.lines().collect();
    if lines.iter().all(|l| l.trim().is_empty()) {
        return Err(RstIndexError::parse("document is empty"));
    }

    let mut title: Option<String> = None;
    let mut headings = Vec::new();
    let mut subpackages = Vec::new();
    let mut modules = Vec::new();
    let mut contents = None;
    let mut in_contents = false;

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        let trimmed = line.trim_end();

        if trimmed.trim().is_empty() {
            i += 1;
            continue;
        }

        // Heading: unindented text followed by an underline
        let underline_below = lines
            .get(i + 1)
            .map(|next| next.trim_end())
            .filter(|next| UNDERLINE_RE.is_match(next));
        if let Some(rule) = underline_below.filter(|_| {
            !line.starts_with(char::is_whitespace) && !trimmed.starts_with("..")
        }) {
            let text = trimmed.to_string();
            if rule.chars().count() < text.chars().count() {
                return Err(RstIndexError::parse(format!(
                    "underline too short for heading '{text}'"
                )));
            }
            let underline = rule.chars().next().unwrap_or('-');

            if title.is_none() {
                title = Some(text);
            } else {
                in_contents = text == MODULE_CONTENTS_SECTION;
                headings.push(Heading { text, underline });
            }
            i += 2;
            continue;
        }

        if let Some(caps) = DIRECTIVE_RE.captures(trimmed) {
            let directive = caps[1].to_string();
            let argument = caps[2].trim().to_string();
            let (options, body, next) = read_directive_body(&lines, i + 1);
            i = next;

            match directive.as_str() {
                "toctree" => subpackages.extend(body),
                "automodule" => {
                    if argument.is_empty() {
                        return Err(RstIndexError::parse(
                            "automodule directive without a module name",
                        ));
                    }
                    let reference = ModuleReference::new(argument, flags_from_options(&options));
                    if in_contents {
                        contents = Some(reference);
                    } else {
                        modules.push(reference);
                    }
                }
                other => debug!(directive = other, "skipping unrecognized directive"),
            }
            continue;
        }

        // Other lines (free text) — skip but don't error
        i += 1;
    }

    let title = title.ok_or_else(|| RstIndexError::parse("document has no title"))?;

    Ok(ParsedPage {
        title,
        headings,
        subpackages,
        modules,
        contents,
    })
}

/// Collect every toctree entry in a document (e.g., `modules.rst`).
pub fn parse_toctree_entries(content: &str) -> Vec<String> {
    let lines: Vec<&str> = content.lines().collect();
    let mut entries = Vec::new();

    let mut i = 0;
    while i < lines.len() {
        match DIRECTIVE_RE.captures(lines[i].trim_end()) {
            Some(caps) if &caps[1] == "toctree" => {
                let (_, body, next) = read_directive_body(&lines, i + 1);
                entries.extend(body);
                i = next;
            }
            _ => i += 1,
        }
    }

    entries
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Read the indented block after a directive line.
///
/// Returns `(option names, body lines, index of the first line after the block)`.
fn read_directive_body(lines: &[&str], start: usize) -> (Vec<String>, Vec<String>, usize) {
    let mut options = Vec::new();
    let mut body = Vec::new();
    let mut i = start;

    while i < lines.len() {
        let line = lines[i];
        if line.trim().is_empty() {
            i += 1;
            continue;
        }
        if !line.starts_with(char::is_whitespace) {
            break;
        }

        let item = line.trim();
        // Options only appear before the first body line
        match OPTION_RE.captures(item) {
            Some(caps) if body.is_empty() => options.push(caps[1].to_string()),
            _ => body.push(item.to_string()),
        }
        i += 1;
    }

    (options, body, i)
}

fn flags_from_options(options: &[String]) -> AutodocFlags {
    let has = |name: &str| options.iter().any(|o| o == name);
    AutodocFlags {
        members: has("members"),
        undoc_members: has("undoc-members"),
        show_inheritance: has("show-inheritance"),
    }
}
