//! Trimmer: reduce a standalone fragment to its body
//!
//! A fragment is written as a complete document so it can be compiled alone.
//! Before it is spliced into the master document the preamble goes, the
//! `\title` becomes the chapter heading and `\end{document}` is dropped:
//!
//! ```text
//! \documentclass{ctexart}          (dropped)
//! \usetikzlibrary{arrows}          (dropped, library recorded)
//! \title{Limits}                   -> \chapter{Limits}
//! \begin{document}                 (dropped)
//! \maketitle                       (dropped, body starts after it)
//! ...                              (kept verbatim)
//! \end{document}                   (dropped)
//! ```

use super::{DestinationGroup, RawFragment, TrimmedFragment};
use crate::decorate::rules::tikz_libraries;
use crate::error::FragmentError;
use std::collections::BTreeSet;
use std::path::Path;

/// Suffix of every trimmed fragment file.
pub const TRIM_SUFFIX: &str = "-trim.tex";

const TITLE: &str = "\\title";
const MAKE_TITLE: &str = "\\maketitle";
const END_DOCUMENT: &str = "\\end{document}";

/// Text of a trimmed fragment plus the libraries its preamble asked for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trimmed {
    pub text: String,
    pub libraries: BTreeSet<String>,
}

/// Trim fragment source text.
///
/// Only the first `\title` line is turned into a chapter heading. Lines after
/// the first `\maketitle` are copied verbatim, except `\end{document}`. A
/// fragment with neither yields empty text.
pub fn trim_text(source: &str) -> Trimmed {
    let mut trimmed = Trimmed::default();
    let mut titled = false;
    let mut in_body = false;

    for line in source.lines() {
        let stripped = line.trim();
        if !in_body {
            if let Some(libraries) = tikz_libraries(stripped) {
                trimmed.libraries.extend(libraries);
            }
        }
        if !titled && stripped.starts_with(TITLE) {
            titled = true;
            push_line(&mut trimmed.text, &stripped.replacen("title", "chapter", 1));
        }
        if in_body && !stripped.starts_with(END_DOCUMENT) {
            push_line(&mut trimmed.text, line);
        }
        if stripped.starts_with(MAKE_TITLE) {
            in_body = true;
        }
    }
    trimmed
}

fn push_line(text: &mut String, line: &str) {
    text.push_str(line);
    text.push('\n');
}

/// `Differential 01 limits.tex` becomes `Differential_01_limits-trim.tex`.
pub fn trimmed_file_name(raw_name: &str) -> String {
    let stem = raw_name.strip_suffix(".tex").unwrap_or(raw_name);
    format!("{}{}", stem.replace(' ', "_"), TRIM_SUFFIX)
}

/// Trim `raw` into a fragment owned by `group`, placed in `group_dir`.
///
/// The fragment is not written; the caller saves it once decoration is done.
pub fn trim(
    raw: &RawFragment,
    group: DestinationGroup,
    group_dir: &Path,
) -> Result<TrimmedFragment, FragmentError> {
    let source = raw.read()?;
    let Trimmed { text, libraries } = trim_text(&source);
    let path = group_dir.join(trimmed_file_name(raw.file_name()));
    tracing::debug!(
        source = %raw.path().display(),
        trimmed = %path.display(),
        group = %group,
        "trimmed fragment"
    );
    Ok(TrimmedFragment {
        group,
        path,
        text,
        libraries,
    })
}
