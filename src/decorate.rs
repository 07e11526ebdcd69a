//! Line decorator
//!
//! Sweeps a trimmed fragment line by line through the [`rules`] table.
//! Hoisted chapter content is collected on the side and placed in front of
//! the rest of the body once the sweep is over, so the header include always
//! opens the fragment wherever the chapter line was.

pub mod rules;

use crate::figures::FigureLookup;
use crate::fragment::TrimmedFragment;
use crate::paths::PathShortener;
use crate::report::Diagnostic;
use rules::{Emit, RuleEnv};
use std::collections::BTreeSet;
use std::path::Path;

/// What the decorator needs besides the fragment itself.
pub struct DecorateEnv<'a> {
    lookup: &'a dyn FigureLookup,
    shortener: &'a PathShortener,
    header_include: String,
}

impl<'a> DecorateEnv<'a> {
    /// `header` should be absolute so the shortener can strip the master
    /// document's folder from it.
    pub fn new(lookup: &'a dyn FigureLookup, shortener: &'a PathShortener, header: &Path) -> Self {
        DecorateEnv {
            lookup,
            shortener,
            header_include: shortener.shorten(header),
        }
    }

    fn rule_env(&self) -> RuleEnv<'_> {
        RuleEnv {
            lookup: self.lookup,
            shortener: self.shortener,
            header_include: &self.header_include,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecoratedFragment {
    pub text: String,
    pub diagnostics: Vec<Diagnostic>,
    pub libraries: BTreeSet<String>,
}

/// Decorate `text`. Diagnostics carry their 1-based line number but no file.
pub fn decorate_text(text: &str, env: &DecorateEnv<'_>) -> DecoratedFragment {
    let rule_env = env.rule_env();
    let mut hoisted = String::new();
    let mut body = String::new();
    let mut decorated = DecoratedFragment::default();

    for (idx, line) in text.lines().enumerate() {
        let Some((rule, outcome)) = rules::apply(line, &rule_env) else {
            push_line(&mut body, line);
            continue;
        };
        tracing::trace!(rule, line = idx + 1, "rule matched");
        match outcome.emit {
            Emit::Line(line) => push_line(&mut body, &line),
            Emit::Hoisted(lines) => lines.iter().for_each(|l| push_line(&mut hoisted, l)),
            Emit::Dropped => {}
        }
        decorated.diagnostics.extend(outcome.diagnostics.into_iter().map(|mut d| {
            d.line = idx + 1;
            d
        }));
        decorated.libraries.extend(outcome.libraries);
    }

    hoisted.push_str(&body);
    decorated.text = hoisted;
    decorated
}

fn push_line(text: &mut String, line: &str) {
    text.push_str(line);
    text.push('\n');
}

/// Decorate a trimmed fragment. Diagnostics are located in the fragment's
/// output file.
pub fn decorate(fragment: &TrimmedFragment, env: &DecorateEnv<'_>) -> DecoratedFragment {
    let mut decorated = decorate_text(&fragment.text, env);
    for diagnostic in &mut decorated.diagnostics {
        diagnostic.file = Some(fragment.path.clone());
    }
    decorated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::DestinationGroup;
    use crate::report::DiagnosticKind;
    use std::path::PathBuf;

    struct NoFigures;

    impl FigureLookup for NoFigures {
        fn find(&self, _basename: &str) -> Vec<PathBuf> {
            Vec::new()
        }
    }

    struct OneFigure;

    impl FigureLookup for OneFigure {
        fn find(&self, basename: &str) -> Vec<PathBuf> {
            vec![PathBuf::from("/book/fig/size200").join(basename)]
        }
    }

    fn with_env<T>(lookup: &dyn FigureLookup, f: impl FnOnce(&DecorateEnv<'_>) -> T) -> T {
        let shortener = PathShortener::with_prefix(Path::new("/book"));
        let env = DecorateEnv::new(lookup, &shortener, Path::new("/book/parts/header.tex"));
        f(&env)
    }

    #[test]
    fn chapter_block_is_hoisted_to_the_front() {
        let text = "\\section{Intro}\n\\chapter{第二章\\,导数}\nbody\n";
        let decorated = with_env(&NoFigures, |env| decorate_text(text, env));
        insta::assert_snapshot!(decorated.text, @r"
        \chapter{导数}
        \input{./parts/header.tex}
        \section{Intro}
        body
        ");
        assert!(decorated.diagnostics.is_empty());
    }

    #[test]
    fn several_chapter_lines_are_hoisted_in_order() {
        let text = "\\chapter{A\\,One}\nx\n\\chapter{B\\,Two}\n";
        let decorated = with_env(&NoFigures, |env| decorate_text(text, env));
        assert_eq!(
            decorated.text,
            "\\chapter{One}\n\\input{./parts/header.tex}\n\\chapter{Two}\n\\input{./parts/header.tex}\nx\n"
        );
    }

    #[test]
    fn diagnostics_carry_line_numbers() {
        let text = "\\chapter{Plain}\ntext\n\\includegraphics[width=1cm]{a.pdf}\n";
        let decorated = with_env(&NoFigures, |env| decorate_text(text, env));
        let found: Vec<_> = decorated
            .diagnostics
            .iter()
            .map(|d| (d.kind, d.line))
            .collect();
        assert_eq!(
            found,
            vec![
                (DiagnosticKind::MalformedChapterTitle, 1),
                (DiagnosticKind::FigureNotFound, 3),
            ]
        );
        assert_eq!(decorated.diagnostics.iter().filter(|d| d.is_warning()).count(), 1);
    }

    #[test]
    fn drops_inputs_and_collects_libraries() {
        let text = "\\input{local}\n\\usetikzlibrary{calc}\n\\usetikzlibrary{arrows, calc}\nkept\n";
        let decorated = with_env(&NoFigures, |env| decorate_text(text, env));
        assert_eq!(decorated.text, "kept\n");
        let libraries: Vec<_> = decorated.libraries.into_iter().collect();
        assert_eq!(libraries, vec!["arrows", "calc"]);
    }

    #[test]
    fn resolves_figures_through_the_lookup() {
        let text = "  \\includegraphics[width=9cm]{x/plot.pdf}\n";
        let decorated = with_env(&OneFigure, |env| decorate_text(text, env));
        assert_eq!(
            decorated.text,
            "  \\includegraphics[width=5.20cm]{./fig/size200/plot.pdf}\n"
        );
    }

    #[test]
    fn empty_fragment_stays_empty() {
        let decorated = with_env(&NoFigures, |env| decorate_text("", env));
        assert_eq!(decorated, DecoratedFragment::default());
    }

    #[test]
    fn fragment_diagnostics_point_at_the_fragment_file() {
        let fragment = TrimmedFragment {
            group: DestinationGroup::Series,
            path: PathBuf::from("/book/parts/Series/Series-01-trim.tex"),
            text: "\\includegraphics[width=1cm]{a.pdf}\n".to_string(),
            libraries: BTreeSet::new(),
        };
        let decorated = with_env(&NoFigures, |env| decorate(&fragment, env));
        assert_eq!(
            decorated.diagnostics[0].to_string(),
            "WARNING--picture file not found: a.pdf at line 1 of file /book/parts/Series/Series-01-trim.tex"
        );
    }
}
