//! Path rewriting for generated include directives
//!
//! TeX cannot digest paths with spaces, so every path written into a fragment
//! or into the master document goes through [`PathShortener::shorten`]: the
//! master document's directory becomes `./`, spaces become underscores and
//! backslashes become forward slashes. Decorator and splicer share one
//! shortener so both produce identical strings.

use std::io;
use std::path::{self, Path, PathBuf, MAIN_SEPARATOR};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathShortener {
    prefix: String,
}

impl PathShortener {
    /// Build a shortener anchored at the directory holding `main_document`.
    pub fn for_main_document(main_document: &Path) -> io::Result<Self> {
        let absolute = absolute(main_document)?;
        let dir = absolute.parent().unwrap_or_else(|| Path::new(""));
        Ok(Self::with_prefix(dir))
    }

    /// Build a shortener that strips `dir` (plus a trailing separator).
    pub fn with_prefix(dir: &Path) -> Self {
        let mut prefix = dir.to_string_lossy().into_owned();
        if !prefix.ends_with(MAIN_SEPARATOR) {
            prefix.push(MAIN_SEPARATOR);
        }
        PathShortener { prefix }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn shorten(&self, path: &Path) -> String {
        self.shorten_str(&path.to_string_lossy())
    }

    pub fn shorten_str(&self, path: &str) -> String {
        path.replace(self.prefix.as_str(), "./")
            .replace(' ', "_")
            .replace('\\', "/")
    }
}

/// Make `path` absolute against the working directory without touching
/// symlinks.
pub fn absolute(path: &Path) -> io::Result<PathBuf> {
    path::absolute(path)
}
