//! Diagnostics and the per-run report
//!
//! Rules and stages never log counters into globals. They hand back
//! [`Diagnostic`]s, and the pipeline folds them into one [`MergeReport`] at a
//! single aggregation point.

use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Severity {
    /// Informational, not counted.
    Note,
    /// Counted towards the run's warning total.
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    FigureNotFound,
    FigureDuplicated,
    FigureWithoutSize,
    MalformedChapterTitle,
}

impl DiagnosticKind {
    pub fn severity(self) -> Severity {
        match self {
            DiagnosticKind::MalformedChapterTitle => Severity::Note,
            DiagnosticKind::FigureNotFound
            | DiagnosticKind::FigureDuplicated
            | DiagnosticKind::FigureWithoutSize => Severity::Warning,
        }
    }
}

/// One finding raised while decorating a line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Filled in once the diagnostic leaves the rule that raised it.
    pub file: Option<PathBuf>,
    /// 1-based line number within the trimmed fragment.
    pub line: usize,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Diagnostic {
            kind,
            file: None,
            line: 0,
            message: message.into(),
        }
    }

    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }

    pub fn is_warning(&self) -> bool {
        self.severity() == Severity::Warning
    }

    pub fn at(mut self, file: impl Into<PathBuf>, line: usize) -> Self {
        self.file = Some(file.into());
        self.line = line;
        self
    }

    /// Emit this diagnostic through `tracing`.
    pub fn log(&self) {
        let file = self
            .file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        match self.severity() {
            Severity::Warning => {
                tracing::warn!(file = %file, line = self.line, "{}", self.message)
            }
            Severity::Note => tracing::info!(file = %file, line = self.line, "{}", self.message),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.severity() {
            Severity::Warning => "WARNING",
            Severity::Note => "INFO",
        };
        write!(f, "{}--{}", label, self.message)?;
        if let Some(file) = &self.file {
            write!(f, " at line {} of file {}", self.line, file.display())?;
        }
        Ok(())
    }
}

/// A fragment that could not be processed and was left out of the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFragment {
    pub path: PathBuf,
    pub reason: String,
}

/// Everything a merge run produced besides the files it wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    pub diagnostics: Vec<Diagnostic>,
    pub libraries: BTreeSet<String>,
    pub injected: Vec<PathBuf>,
    pub skipped: Vec<SkippedFragment>,
}

impl MergeReport {
    pub fn warning_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_warning()).count()
    }

    pub fn notes(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| !d.is_warning())
    }

    pub fn extend_libraries<I>(&mut self, libraries: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.libraries.extend(libraries);
    }

    /// The closing log line of a run.
    pub fn summary(&self) -> String {
        match self.warning_count() {
            0 => "All done without warnings.".to_string(),
            n => format!("All done with {} warning(s).", n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_without_warnings() {
        let mut report = MergeReport::default();
        report.diagnostics.push(Diagnostic::new(
            DiagnosticKind::MalformedChapterTitle,
            "title error",
        ));
        assert_eq!(report.warning_count(), 0);
        assert_eq!(report.summary(), "All done without warnings.");
    }

    #[test]
    fn summary_counts_only_warnings() {
        let mut report = MergeReport::default();
        report
            .diagnostics
            .push(Diagnostic::new(DiagnosticKind::FigureNotFound, "a"));
        report
            .diagnostics
            .push(Diagnostic::new(DiagnosticKind::FigureDuplicated, "b"));
        report.diagnostics.push(Diagnostic::new(
            DiagnosticKind::MalformedChapterTitle,
            "c",
        ));
        assert_eq!(report.warning_count(), 2);
        assert_eq!(report.notes().count(), 1);
        assert_eq!(report.summary(), "All done with 2 warning(s).");
    }

    #[test]
    fn display_includes_location() {
        let diagnostic = Diagnostic::new(
            DiagnosticKind::FigureNotFound,
            "picture file not found: a.pdf",
        )
        .at("parts/Integral/x-trim.tex", 7);
        assert_eq!(
            diagnostic.to_string(),
            "WARNING--picture file not found: a.pdf at line 7 of file parts/Integral/x-trim.tex"
        );
    }
}
