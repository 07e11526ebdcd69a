//! Master document splicer
//!
//! The master document marks its injection region with two comment lines:
//!
//! ```text
//! %!!!ContentStart
//! \input{./parts/Differential/Differential-01-limits-trim.tex}   <- replaced
//! %!!!ContentEnd
//! ```
//!
//! Everything outside the region is kept, except stray `\usetikzlibrary`
//! lines: the libraries of every fragment are declared once, right after
//! `\begin{document}`.

use crate::decorate::rules::tikz_libraries;
use crate::paths::PathShortener;
use std::collections::BTreeSet;
use std::path::PathBuf;

pub const CONTENT_START: &str = "%!!!ContentStart";
pub const CONTENT_END: &str = "%!!!ContentEnd";
const BEGIN_DOCUMENT: &str = "\\begin{document}";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplicedDocument {
    pub text: String,
    /// Whether a start sentinel was found. Without one nothing is injected.
    pub injected: bool,
}

/// `\usetikzlibrary{a, b}` for a non-empty library set.
pub fn library_line(libraries: &BTreeSet<String>) -> Option<String> {
    if libraries.is_empty() {
        return None;
    }
    let names: Vec<&str> = libraries.iter().map(String::as_str).collect();
    Some(format!("\\usetikzlibrary{{{}}}", names.join(", ")))
}

/// One `\input` line per fragment, in the given order.
pub fn include_block(fragments: &[PathBuf], shortener: &PathShortener) -> String {
    fragments
        .iter()
        .map(|path| format!("\\input{{{}}}\n", shortener.shorten(path)))
        .collect()
}

/// Rewrite `master` with `fragments` injected after the start sentinel.
///
/// Lines between a start sentinel and the next end sentinel (or the end of
/// the document) are replaced by the include block.
pub fn splice(
    master: &str,
    fragments: &[PathBuf],
    libraries: &BTreeSet<String>,
    shortener: &PathShortener,
) -> SplicedDocument {
    let block = include_block(fragments, shortener);
    let libraries = library_line(libraries);
    let mut text = String::with_capacity(master.len() + block.len());
    let mut passing = true;
    let mut injected = false;

    for line in master.lines() {
        let stripped = line.trim();
        if stripped.starts_with(CONTENT_END) {
            passing = true;
        }
        if !passing {
            continue;
        }
        if tikz_libraries(stripped).is_none() {
            text.push_str(line);
            text.push('\n');
        }
        if stripped.starts_with(BEGIN_DOCUMENT) {
            if let Some(libraries) = &libraries {
                text.push_str(libraries);
                text.push('\n');
            }
        }
        if stripped.starts_with(CONTENT_START) {
            text.push_str(&block);
            passing = false;
            injected = true;
        }
    }

    SplicedDocument { text, injected }
}
