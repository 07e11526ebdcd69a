//! Line rules of the decorator
//!
//! Rules are data: a name, the text they match against, a pattern and a pure
//! handler. They are tried in declaration order and the first match wins:
//! 1. chapter - shorten the title, hoist it to the front with the header include
//! 2. section / 3. subsection - space out short non-word titles
//! 4. figure - resolve the include path and derive the width from `size<N>`
//! 5. tikz_library - record the libraries, drop the line
//! 6. input - drop the line
//!
//! Lines no rule matches are kept verbatim.

use crate::figures::FigureLookup;
use crate::paths::PathShortener;
use crate::report::{Diagnostic, DiagnosticKind};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::path::Path;

/// What a rule matches its pattern against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// The raw line.
    Line,
    /// The line with surrounding whitespace removed.
    Trimmed,
}

type Handler = fn(&Captures<'_>, &RuleEnv<'_>) -> RuleOutcome;

/// Rules as (name, scope, pattern, handler), in priority order.
const RULE_TABLE: &[(&str, Scope, &str, Handler)] = &[
    (
        "chapter",
        Scope::Line,
        r"^(?P<command>\s*\\chapter)\{(?P<title>[\s\S]+)\}(?P<trailing>\s*)$",
        chapter,
    ),
    (
        "section",
        Scope::Line,
        r"^(?P<command>\s*\\section)\{(?P<title>[^A-Za-z0-9_]+)\}(?P<trailing>\s*)$",
        spaced_heading,
    ),
    (
        "subsection",
        Scope::Line,
        r"^(?P<command>\s*\\subsection)\{(?P<title>[^A-Za-z0-9_]+)\}(?P<trailing>\s*)$",
        spaced_heading,
    ),
    (
        "figure",
        Scope::Line,
        r"^(?P<head>\s*\\includegraphics\[(?P<attribute>width|height)\s*=\s*)(?P<value>\S+)(?P<open>\]\{)(?P<path>\S+)(?P<tail>\}\S*\s*)$",
        figure,
    ),
    (
        "tikz_library",
        Scope::Trimmed,
        TIKZ_LIBRARY_PATTERN,
        tikz_library,
    ),
    ("input", Scope::Trimmed, r"^\\input\b", drop_line),
];

const TIKZ_LIBRARY_PATTERN: &str = r"^\\usetikzlibrary\{(?P<libraries>[\s\S]+)\}";

static TIKZ_LIBRARY: Lazy<Regex> = Lazy::new(|| Regex::new(TIKZ_LIBRARY_PATTERN).unwrap());
static SIZE_SEGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"/size(\d+)/").unwrap());

pub struct Rule {
    pub name: &'static str,
    pub scope: Scope,
    pattern: Regex,
    handler: Handler,
}

/// Compiled rule table.
pub static RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    RULE_TABLE
        .iter()
        .map(|(name, scope, pattern, handler)| Rule {
            name: *name,
            scope: *scope,
            pattern: Regex::new(pattern).unwrap(),
            handler: *handler,
        })
        .collect()
});

/// Read-only context every handler sees.
pub struct RuleEnv<'a> {
    pub lookup: &'a dyn FigureLookup,
    pub shortener: &'a PathShortener,
    /// Shortened path of the header included after every chapter line.
    pub header_include: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Emit {
    /// Keep this line in place.
    Line(String),
    /// Move these lines to the front of the fragment.
    Hoisted(Vec<String>),
    Dropped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleOutcome {
    pub emit: Emit,
    /// Diagnostics without a location; the decorator adds it.
    pub diagnostics: Vec<Diagnostic>,
    pub libraries: Vec<String>,
}

impl RuleOutcome {
    fn line(line: String) -> Self {
        RuleOutcome {
            emit: Emit::Line(line),
            diagnostics: Vec::new(),
            libraries: Vec::new(),
        }
    }

    fn hoisted(lines: Vec<String>) -> Self {
        RuleOutcome {
            emit: Emit::Hoisted(lines),
            diagnostics: Vec::new(),
            libraries: Vec::new(),
        }
    }

    fn dropped() -> Self {
        RuleOutcome {
            emit: Emit::Dropped,
            diagnostics: Vec::new(),
            libraries: Vec::new(),
        }
    }

    fn with_diagnostic(mut self, diagnostic: Diagnostic) -> Self {
        self.diagnostics.push(diagnostic);
        self
    }
}

/// Run the first matching rule on `line`. Returns the rule name with its
/// outcome, or `None` when the line is to be kept as it is.
pub fn apply(line: &str, env: &RuleEnv<'_>) -> Option<(&'static str, RuleOutcome)> {
    RULES.iter().find_map(|rule| {
        let subject = match rule.scope {
            Scope::Line => line,
            Scope::Trimmed => line.trim(),
        };
        rule.pattern
            .captures(subject)
            .map(|caps| (rule.name, (rule.handler)(&caps, env)))
    })
}

/// Library names of a `\usetikzlibrary{...}` line, which must already be
/// trimmed.
pub fn tikz_libraries(trimmed_line: &str) -> Option<Vec<String>> {
    TIKZ_LIBRARY
        .captures(trimmed_line)
        .map(|caps| split_libraries(&caps["libraries"]))
}

fn split_libraries(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Shorten a chapter title and hoist it followed by the header include.
///
/// A title with neither separator is not a numbered lecture title, so the
/// line is hoisted unchanged with a note and gets no header include.
fn chapter(caps: &Captures<'_>, env: &RuleEnv<'_>) -> RuleOutcome {
    let Some(title) = shortened_title(&caps["title"]) else {
        return RuleOutcome::hoisted(vec![caps[0].to_string()]).with_diagnostic(Diagnostic::new(
            DiagnosticKind::MalformedChapterTitle,
            "title error (ignore this if title exists)",
        ));
    };
    let mut line = caps["command"].to_string();
    if title.contains("\\\\") {
        line.push('[');
        line.push_str(&title.replace("\\\\", ""));
        line.push(']');
    }
    line.push('{');
    line.push_str(title);
    line.push('}');
    RuleOutcome::hoisted(vec![line, format!("\\input{{{}}}", env.header_include)])
}

/// Text after the rightmost `\,`, or failing that the rightmost em dash.
pub fn shortened_title(title: &str) -> Option<&str> {
    const SEPARATORS: [&str; 2] = ["\\,", "\u{2014}"];
    SEPARATORS.iter().find_map(|separator| {
        title
            .rfind(separator)
            .map(|idx| title[idx + separator.len()..].trim())
    })
}

fn spaced_heading(caps: &Captures<'_>, _env: &RuleEnv<'_>) -> RuleOutcome {
    RuleOutcome::line(format!(
        "{}{{{}}}{}",
        &caps["command"],
        space_title(&caps["title"]),
        &caps["trailing"]
    ))
}

/// Interleave a short title's characters with a spacer chosen by length.
pub fn space_title(title: &str) -> String {
    let spacer = match title.chars().count() {
        2 => "\\hskip 2em ",
        3 => "\\hskip 1em ",
        4 => "\\ ",
        5 => "\\hskip 0.25em ",
        _ => return title.to_string(),
    };
    let mut spaced = String::new();
    for (i, ch) in title.chars().enumerate() {
        if i > 0 {
            spaced.push_str(spacer);
        }
        spaced.push(ch);
    }
    spaced
}

fn figure(caps: &Captures<'_>, env: &RuleEnv<'_>) -> RuleOutcome {
    let captured = &caps["path"];
    // closing braces of an enclosing group end up in the greedy path capture
    let path = captured.trim_end_matches('}');
    let tail = format!("{}{}", &captured[path.len()..], &caps["tail"]);

    let name = Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string());
    let matches = env.lookup.find(&name);

    let resolved = match matches.as_slice() {
        [single] => env.shortener.shorten(single),
        [] => {
            return RuleOutcome::line(caps[0].to_string()).with_diagnostic(Diagnostic::new(
                DiagnosticKind::FigureNotFound,
                format!("picture file not found: {}", name),
            ))
        }
        _ => {
            return RuleOutcome::line(caps[0].to_string()).with_diagnostic(Diagnostic::new(
                DiagnosticKind::FigureDuplicated,
                format!("duplicated picture file: {}", name),
            ))
        }
    };

    let mut outcome = RuleOutcome::line(String::new());
    let size = match width_for(&resolved) {
        Some(width) => width,
        None => {
            outcome.diagnostics.push(Diagnostic::new(
                DiagnosticKind::FigureWithoutSize,
                format!("picture file: {} does not have size info", name),
            ));
            caps["value"].to_string()
        }
    };
    outcome.emit = Emit::Line(format!(
        "{}{}{}{}{}",
        &caps["head"], size, &caps["open"], resolved, tail
    ));
    outcome
}

/// Display width for a figure path with a `/size<N>/` segment.
pub fn width_for(path: &str) -> Option<String> {
    let caps = SIZE_SEGMENT.captures(path)?;
    let size: f64 = caps[1].parse().ok()?;
    Some(format!("{:.2}cm", 13.0 / 500.0 * size))
}

fn tikz_library(caps: &Captures<'_>, _env: &RuleEnv<'_>) -> RuleOutcome {
    let mut outcome = RuleOutcome::dropped();
    outcome.libraries = split_libraries(&caps["libraries"]);
    outcome
}

fn drop_line(_caps: &Captures<'_>, _env: &RuleEnv<'_>) -> RuleOutcome {
    RuleOutcome::dropped()
}
