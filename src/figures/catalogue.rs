//! Figure catalogue
//!
//! Renders a standalone document showing every figure source under the
//! figure root, one float per figure, captioned with its path. Useful for
//! proofreading the figure set without building the whole lecture.

use crate::error::ArrangeError;
use crate::figures::index::walk_files;
use crate::paths::PathShortener;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

const FILE_HEAD: &str = "\\documentclass{ctexart}\n\\begin{document}\n";
const FILE_TAIL: &str = "\\end{document}";
const FIGURE_HEAD: &str = "\\begin{figure}\n\\centering\n\\includegraphics{";
const FIGURE_BODY: &str = "}\n\\caption{";
const FIGURE_TAIL: &str = "}\n\\end{figure}\n";
const CLEAR_PAGE: &str = "\\clearpage\n";
/// Flush floats after the first figure and then after every this many.
const CLEAR_PAGE_EVERY: usize = 20;

static CJK: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\u{4e00}-\u{9fa5}]").unwrap());

/// Figure sources under `root`, skipping anything with CJK characters in its
/// name (folders included).
pub fn figure_sources(root: &Path) -> Vec<PathBuf> {
    walk_files(root, |name| !CJK.is_match(name))
        .into_iter()
        .filter(|path| {
            path.extension().is_some_and(|ext| ext == "asy")
                && path
                    .file_name()
                    .is_some_and(|name| !CJK.is_match(&name.to_string_lossy()))
        })
        .collect()
}

/// Render the catalogue for `figures`, with paths relative to `shortener`.
pub fn render(figures: &[PathBuf], shortener: &PathShortener) -> String {
    let mut content = String::from(FILE_HEAD);
    for (count, figure) in figures.iter().enumerate() {
        let path = shortener.shorten(&figure.with_extension("pdf"));
        let caption = path.replace('_', "\\_");
        content.push_str(FIGURE_HEAD);
        content.push_str(&path);
        content.push_str(FIGURE_BODY);
        content.push_str(&caption);
        content.push_str(FIGURE_TAIL);
        if count % CLEAR_PAGE_EVERY == 0 {
            content.push_str(CLEAR_PAGE);
        }
    }
    content.push_str(FILE_TAIL);
    content
}

/// Write the catalogue of `root` to `output`. Returns the number of figures.
pub fn write_catalogue(root: &Path, output: &Path) -> Result<usize, ArrangeError> {
    let shortener =
        PathShortener::for_main_document(output).map_err(|source| ArrangeError::Write {
            path: output.to_path_buf(),
            source,
        })?;
    let figures = figure_sources(root);
    let content = render(&figures, &shortener);
    fs::write(output, content).map_err(|source| ArrangeError::Write {
        path: output.to_path_buf(),
        source,
    })?;
    tracing::info!(output = %output.display(), figures = figures.len(), "figure list written");
    Ok(figures.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn renders_one_float_per_figure() {
        let shortener = PathShortener::with_prefix(Path::new("/book"));
        let figures = vec![
            PathBuf::from("/book/fig/size200/a_b.asy"),
            PathBuf::from("/book/fig/size100/c.asy"),
        ];
        let out = render(&figures, &shortener);
        insta::assert_snapshot!(out, @r"
        \documentclass{ctexart}
        \begin{document}
        \begin{figure}
        \centering
        \includegraphics{./fig/size200/a_b.pdf}
        \caption{./fig/size200/a\_b.pdf}
        \end{figure}
        \clearpage
        \begin{figure}
        \centering
        \includegraphics{./fig/size100/c.pdf}
        \caption{./fig/size100/c.pdf}
        \end{figure}
        \end{document}
        ");
    }

    #[test]
    fn clears_page_after_first_and_every_twentieth() {
        let shortener = PathShortener::with_prefix(Path::new("/book"));
        let figures: Vec<PathBuf> = (0..41)
            .map(|i| PathBuf::from(format!("/book/fig/f{}.asy", i)))
            .collect();
        let out = render(&figures, &shortener);
        assert_eq!(out.matches("\\clearpage").count(), 3);
    }

    #[test]
    fn skips_cjk_names() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        for rel in ["size100/a.asy", "size100/图.asy", "草稿/b.asy", "size100/c.pdf"] {
            let path = root.join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, "").unwrap();
        }
        let sources = figure_sources(root);
        assert_eq!(sources, vec![root.join("size100").join("a.asy")]);
    }

    #[test]
    fn writes_catalogue_next_to_output() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("fig");
        fs::create_dir_all(root.join("size100")).unwrap();
        fs::write(root.join("size100").join("a.asy"), "size(100);\n").unwrap();
        let output = dir.path().join("figures.tex");

        let count = write_catalogue(&root, &output).unwrap();

        assert_eq!(count, 1);
        let text = fs::read_to_string(output).unwrap();
        assert!(text.contains("\\includegraphics{./fig/size100/a.pdf}"));
    }
}
