//! Basename lookup under the figure root
//!
//! [`find`] answers "which files under this root are called `name`". The
//! decorator only talks to the [`FigureLookup`] trait, so the re-scanning
//! default ([`ScanningIndex`]) and the scan-once [`CachedIndex`] are
//! interchangeable.

use crate::paths::absolute;
use ignore::WalkBuilder;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

static SIZE_DIR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^size(\d+)$").unwrap());

/// Whether a folder name follows the `size<N>` convention.
pub fn is_size_dir(name: &str) -> bool {
    SIZE_DIR.is_match(name)
}

/// Resolves a bare figure file name to the files carrying it.
pub trait FigureLookup: Send + Sync {
    fn find(&self, basename: &str) -> Vec<PathBuf>;
}

/// Walks the figure root again on every lookup.
#[derive(Debug, Clone)]
pub struct ScanningIndex {
    root: PathBuf,
    restrict_to_size_dirs: bool,
}

impl ScanningIndex {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        ScanningIndex {
            root: root.into(),
            restrict_to_size_dirs: false,
        }
    }

    /// Only descend into `size<N>` folders below the root.
    pub fn restricted(mut self, restrict: bool) -> Self {
        self.restrict_to_size_dirs = restrict;
        self
    }
}

impl FigureLookup for ScanningIndex {
    fn find(&self, basename: &str) -> Vec<PathBuf> {
        find_with(&self.root, basename, self.restrict_to_size_dirs)
    }
}

/// Scans the figure root once and answers lookups from memory.
#[derive(Debug, Clone, Default)]
pub struct CachedIndex {
    entries: HashMap<String, Vec<PathBuf>>,
}

impl CachedIndex {
    pub fn build(root: &Path, restrict_to_size_dirs: bool) -> Self {
        let mut entries: HashMap<String, Vec<PathBuf>> = HashMap::new();
        for path in walk_files(root, dir_filter(restrict_to_size_dirs)) {
            if let Some(name) = path.file_name() {
                entries
                    .entry(name.to_string_lossy().into_owned())
                    .or_default()
                    .push(path);
            }
        }
        CachedIndex { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FigureLookup for CachedIndex {
    fn find(&self, basename: &str) -> Vec<PathBuf> {
        self.entries.get(basename).cloned().unwrap_or_default()
    }
}

/// Unrestricted recursive lookup. Never fails: a missing root has no matches.
pub fn find(root: &Path, basename: &str) -> Vec<PathBuf> {
    find_with(root, basename, false)
}

/// Lookup that only descends into `size<N>` folders when `restrict` is set.
pub fn find_with(root: &Path, basename: &str, restrict: bool) -> Vec<PathBuf> {
    walk_files(root, dir_filter(restrict))
        .into_iter()
        .filter(|path| path.file_name().is_some_and(|name| name == basename))
        .collect()
}

fn dir_filter(restrict: bool) -> fn(&str) -> bool {
    fn any_dir(_: &str) -> bool {
        true
    }
    if restrict {
        is_size_dir
    } else {
        any_dir
    }
}

/// All regular files below `root` (absolute, sorted by name per directory).
/// Sub-directories are entered only when `descend` accepts their name; the
/// root itself is always entered.
pub(crate) fn walk_files<F>(root: &Path, descend: F) -> Vec<PathBuf>
where
    F: Fn(&str) -> bool + Send + Sync + 'static,
{
    let root = absolute(root).unwrap_or_else(|_| root.to_path_buf());
    if !root.is_dir() {
        return Vec::new();
    }
    WalkBuilder::new(&root)
        .standard_filters(false)
        .follow_links(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(move |entry| {
            let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
            entry.depth() == 0 || !is_dir || descend(&entry.file_name().to_string_lossy())
        })
        .build()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_some_and(|t| t.is_file()))
        .map(|entry| entry.into_path())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    #[test]
    fn finds_unique_figure_recursively() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("size200").join("limit.pdf"));
        touch(&dir.path().join("size200").join("other.pdf"));

        let found = find(dir.path(), "limit.pdf");
        assert_eq!(found, vec![dir.path().join("size200").join("limit.pdf")]);
        assert!(found[0].is_absolute());
    }

    #[test]
    fn reports_every_duplicate() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("size100").join("a.pdf"));
        touch(&dir.path().join("size300").join("a.pdf"));
        assert_eq!(find(dir.path(), "a.pdf").len(), 2);
    }

    #[test]
    fn matching_is_exact_and_case_sensitive() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("size100").join("Limit.pdf"));
        touch(&dir.path().join("size100").join("limit.pdf.bak"));
        assert!(find(dir.path(), "limit.pdf").is_empty());
    }

    #[test]
    fn missing_root_has_no_matches() {
        assert!(find(Path::new("/no/such/figure/root"), "a.pdf").is_empty());
    }

    #[test]
    fn restricted_walk_skips_other_folders() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("drafts").join("a.pdf"));
        touch(&dir.path().join("size100").join("a.pdf"));

        assert_eq!(find(dir.path(), "a.pdf").len(), 2);
        assert_eq!(
            find_with(dir.path(), "a.pdf", true),
            vec![dir.path().join("size100").join("a.pdf")]
        );
    }

    #[test]
    fn cached_index_agrees_with_scanning_index() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("size100").join("a.pdf"));
        touch(&dir.path().join("size300").join("a.pdf"));
        touch(&dir.path().join("size300").join("b.pdf"));

        let scanning = ScanningIndex::new(dir.path());
        let cached = CachedIndex::build(dir.path(), false);
        for name in ["a.pdf", "b.pdf", "c.pdf"] {
            assert_eq!(scanning.find(name), cached.find(name));
        }
        assert_eq!(cached.len(), 2);
    }

    #[test]
    fn size_dir_names() {
        assert!(is_size_dir("size200"));
        assert!(!is_size_dir("size"));
        assert!(!is_size_dir("size20a"));
        assert!(!is_size_dir("xsize20"));
    }
}
