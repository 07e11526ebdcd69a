//! Figure folder maintenance
//!
//! Asymptote sources declare their intended width with a `size(N);` line.
//! [`arrange`] moves every `.asy` file (and its compiled `.pdf`) into
//! `<root>/size<N>`, which is the layout the decorator reads widths from.

use crate::error::ArrangeError;
use crate::figures::index::{is_size_dir, walk_files};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

static SIZE_DECLARATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"^size\((\d+)\);$").unwrap());

const FIGURE_EXTENSION: &str = "asy";
const COMPILED_EXTENSION: &str = "pdf";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovedFile {
    pub from: PathBuf,
    pub to: PathBuf,
}

#[derive(Debug, Default)]
pub struct ArrangeReport {
    pub moved: Vec<MovedFile>,
    /// Sources without a `size(N);` line; left where they are.
    pub unsized_files: Vec<PathBuf>,
    pub failures: Vec<ArrangeError>,
}

/// Sort the figure sources under `root` into `size<N>` folders.
///
/// Looks at `.asy` files directly in `root` and inside existing `size<N>`
/// folders. A missing root is logged and yields an empty report.
pub fn arrange(root: &Path) -> ArrangeReport {
    let mut report = ArrangeReport::default();
    if !root.is_dir() {
        tracing::warn!(root = %root.display(), "figure folder does not exist");
        return report;
    }
    tracing::info!(root = %root.display(), "arranging figures");

    for source in arrange_candidates(root) {
        let size = match declared_size(&source) {
            Ok(Some(size)) => size,
            Ok(None) => {
                tracing::info!(
                    file = %source.display(),
                    "figure has no size declaration, left in place"
                );
                report.unsized_files.push(source);
                continue;
            }
            Err(source_err) => {
                tracing::error!(file = %source.display(), error = %source_err, "cannot read figure");
                continue;
            }
        };

        let target_dir = root.join(format!("size{}", size));
        if source.parent() == Some(target_dir.as_path()) {
            continue;
        }
        if let Err(err) = fs::create_dir_all(&target_dir) {
            report.failures.push(ArrangeError::CreateDir {
                path: target_dir,
                source: err,
            });
            continue;
        }

        let companion = source.with_extension(COMPILED_EXTENSION);
        match move_into(&source, &target_dir) {
            Ok(moved) => report.moved.push(moved),
            Err(err) => {
                tracing::warn!(error = %err, "move failed");
                report.failures.push(err);
                continue;
            }
        }
        if companion.is_file() {
            match move_into(&companion, &target_dir) {
                Ok(moved) => report.moved.push(moved),
                Err(err) => report.failures.push(err),
            }
        }
    }
    report
}

fn arrange_candidates(root: &Path) -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    let Ok(entries) = fs::read_dir(root) else {
        return candidates;
    };
    let mut entries: Vec<PathBuf> = entries.filter_map(Result::ok).map(|e| e.path()).collect();
    entries.sort();

    let mut top_level = Vec::new();
    for path in entries {
        let is_size_folder = path.is_dir()
            && path
                .file_name()
                .is_some_and(|name| is_size_dir(&name.to_string_lossy()));
        if is_size_folder {
            candidates.extend(asy_files_in(&path));
        } else if is_figure_source(&path) {
            top_level.push(path);
        }
    }
    candidates.extend(top_level);
    candidates
}

fn asy_files_in(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .map(|e| e.path())
                .filter(|p| is_figure_source(p))
                .collect()
        })
        .unwrap_or_default();
    files.sort();
    files
}

fn is_figure_source(path: &Path) -> bool {
    path.is_file() && path.extension().is_some_and(|ext| ext == FIGURE_EXTENSION)
}

/// The digits of the first `size(N);` line, kept verbatim for the folder name.
pub fn declared_size(path: &Path) -> std::io::Result<Option<String>> {
    let content = fs::read_to_string(path)?;
    Ok(content.lines().find_map(|line| {
        SIZE_DECLARATION
            .captures(line)
            .map(|caps| caps[1].to_string())
    }))
}

fn move_into(file: &Path, dir: &Path) -> Result<MovedFile, ArrangeError> {
    let Some(name) = file.file_name() else {
        return Err(ArrangeError::Move {
            from: file.to_path_buf(),
            to: dir.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "no file name"),
        });
    };
    let to = dir.join(name);
    fs::rename(file, &to).map_err(|source| ArrangeError::Move {
        from: file.to_path_buf(),
        to: to.clone(),
        source,
    })?;
    tracing::debug!(file = %file.display(), to = %dir.display(), "moved figure");
    Ok(MovedFile {
        from: file.to_path_buf(),
        to,
    })
}

/// `.asy` sources that share a file name, across the root and its `size<N>`
/// folders. Names seen only once are left out.
pub fn find_duplicates(root: &Path) -> BTreeMap<String, Vec<PathBuf>> {
    let mut by_name: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    for path in walk_files(root, is_size_dir) {
        if path.extension().is_some_and(|ext| ext == FIGURE_EXTENSION) {
            if let Some(name) = path.file_name() {
                by_name
                    .entry(name.to_string_lossy().into_owned())
                    .or_default()
                    .push(path);
            }
        }
    }
    by_name.retain(|_, paths| paths.len() > 1);
    by_name
}

#[derive(Debug, Default)]
pub struct PruneReport {
    pub kept: Vec<PathBuf>,
    pub deleted: Vec<PathBuf>,
    pub failures: Vec<ArrangeError>,
}

/// For every duplicated name keep the most recently modified source and
/// delete the others together with their compiled `.pdf`.
pub fn remove_duplicates_by_last_modified(root: &Path) -> PruneReport {
    let mut report = PruneReport::default();
    for (name, paths) in find_duplicates(root) {
        let Some(newest) = newest(&paths) else {
            continue;
        };
        tracing::info!(figure = %name, kept = %newest.display(), "pruning duplicates");
        for path in &paths {
            if path == &newest {
                continue;
            }
            for victim in [path.clone(), path.with_extension(COMPILED_EXTENSION)] {
                if !victim.exists() {
                    continue;
                }
                match fs::remove_file(&victim) {
                    Ok(()) => {
                        tracing::info!(file = %victim.display(), "deleted duplicate");
                        report.deleted.push(victim);
                    }
                    Err(source) => report.failures.push(ArrangeError::Delete {
                        path: victim,
                        source,
                    }),
                }
            }
        }
        report.kept.push(newest);
    }
    report
}

/// First path with the latest modification time.
fn newest(paths: &[PathBuf]) -> Option<PathBuf> {
    let mut best: Option<(SystemTime, &PathBuf)> = None;
    for path in paths {
        let modified = fs::metadata(path)
            .and_then(|m| m.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        if best.map_or(true, |(time, _)| modified > time) {
            best = Some((modified, path));
        }
    }
    best.map(|(_, path)| path.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::tempdir;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn set_mtime(path: &Path, secs: u64) {
        let file = fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
            .unwrap();
    }

    #[test]
    fn moves_sources_and_companions_into_size_folders() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write(&root.join("limit.asy"), "import graph;\nsize(200);\ndraw((0,0)--(1,1));\n");
        write(&root.join("limit.pdf"), "%PDF");
        write(&root.join("plain.asy"), "draw((0,0)--(1,1));\n");

        let report = arrange(root);

        assert!(root.join("size200").join("limit.asy").is_file());
        assert!(root.join("size200").join("limit.pdf").is_file());
        assert!(!root.join("limit.asy").exists());
        assert_eq!(report.moved.len(), 2);
        assert_eq!(report.unsized_files, vec![root.join("plain.asy")]);
        assert!(report.failures.is_empty());
    }

    #[test]
    fn corrects_files_sitting_in_the_wrong_size_folder() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write(&root.join("size100").join("wave.asy"), "size(300);\n");
        write(&root.join("size300").join("ok.asy"), "size(300);\n");

        let report = arrange(root);

        assert!(root.join("size300").join("wave.asy").is_file());
        assert!(root.join("size300").join("ok.asy").is_file());
        assert_eq!(report.moved.len(), 1);
    }

    #[test]
    fn missing_root_is_not_fatal() {
        let report = arrange(Path::new("/no/such/fig"));
        assert!(report.moved.is_empty());
    }

    #[test]
    fn size_declaration_must_fill_the_line() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.asy");
        write(&path, " size(100);\nsize(120); // wide\nsize(150);\n");
        assert_eq!(declared_size(&path).unwrap(), Some("150".to_string()));
    }

    #[test]
    fn finds_duplicates_across_size_folders() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write(&root.join("size100").join("a.asy"), "");
        write(&root.join("size200").join("a.asy"), "");
        write(&root.join("size200").join("b.asy"), "");
        write(&root.join("archive").join("b.asy"), "");

        let duplicates = find_duplicates(root);
        assert_eq!(duplicates.len(), 1);
        assert_eq!(duplicates["a.asy"].len(), 2);
    }

    #[test]
    fn pruning_keeps_the_newest_copy() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let old = root.join("size100").join("a.asy");
        let new = root.join("size200").join("a.asy");
        write(&old, "size(100);\n");
        write(&old.with_extension("pdf"), "%PDF");
        write(&new, "size(200);\n");
        set_mtime(&old, 1_000);
        set_mtime(&new, 2_000);

        let report = remove_duplicates_by_last_modified(root);

        assert_eq!(report.kept, vec![new.clone()]);
        assert!(new.exists());
        assert!(!old.exists());
        assert!(!old.with_extension("pdf").exists());
        assert_eq!(report.deleted.len(), 2);
    }
}
