//! Input selection
//!
//! Fragment paths handed to the pipeline are filtered before anything is
//! read: trimmed outputs are never re-merged, missing files are skipped, and
//! (unless told otherwise) only names following the course convention
//! `<Category>...<NN>` are accepted.

use super::trim::TRIM_SUFFIX;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

static CONVENTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(Differential|Integral|Series)\S*(\d{2})").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectOptions {
    /// Accept names that do not follow the convention.
    pub ignore_wrong_filenames: bool,
    /// Sort by category and number, dropping inputs that share both.
    pub auto_sort: bool,
}

impl Default for SelectOptions {
    fn default() -> Self {
        SelectOptions {
            ignore_wrong_filenames: false,
            auto_sort: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub accepted: Vec<PathBuf>,
    pub missing: Vec<PathBuf>,
    /// Names that break the convention, or repeat an already accepted slot.
    pub rejected: Vec<PathBuf>,
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn convention_number(name: &str) -> Option<String> {
    CONVENTION.captures(name).map(|caps| caps[2].to_string())
}

/// Filter and order the fragment paths the pipeline should merge.
pub fn select_inputs(paths: &[PathBuf], options: SelectOptions) -> Selection {
    let mut selection = Selection::default();
    for path in paths {
        let name = file_name(path);
        if name.ends_with(TRIM_SUFFIX) {
            tracing::debug!(file = %path.display(), "skipping trimmed output");
            continue;
        }
        if !path.is_file() {
            tracing::warn!(file = %path.display(), "tex file not found");
            selection.missing.push(path.clone());
            continue;
        }
        if !options.ignore_wrong_filenames && convention_number(&name).is_none() {
            tracing::warn!(file = %name, "file name does not follow the naming convention");
            selection.rejected.push(path.clone());
            continue;
        }
        selection.accepted.push(path.clone());
    }

    if options.auto_sort {
        let accepted = std::mem::take(&mut selection.accepted);
        let (kept, dropped) = sort_and_dedup(accepted);
        for path in &dropped {
            tracing::warn!(file = %path.display(), "duplicate chapter number, skipped");
        }
        selection.accepted = kept;
        selection.rejected.extend(dropped);
    }
    selection
}

struct Slot {
    first: Option<char>,
    number: Option<String>,
    name: String,
}

impl Slot {
    fn of(path: &Path) -> Self {
        let name = file_name(path);
        Slot {
            first: name.chars().next(),
            number: convention_number(&name),
            name,
        }
    }

    fn key(&self) -> (Option<char>, String, String) {
        let primary = self.number.clone().unwrap_or_else(|| self.name.clone());
        (self.first, primary, self.name.clone())
    }

    fn same_as(&self, other: &Slot) -> bool {
        if self.first != other.first {
            return false;
        }
        match (&self.number, &other.number) {
            (Some(a), Some(b)) => a == b,
            _ => self.name == other.name,
        }
    }
}

fn sort_and_dedup(paths: Vec<PathBuf>) -> (Vec<PathBuf>, Vec<PathBuf>) {
    let mut slots: Vec<(Slot, PathBuf)> = paths.into_iter().map(|p| (Slot::of(&p), p)).collect();
    slots.sort_by_cached_key(|(slot, _)| slot.key());

    let mut kept: Vec<(Slot, PathBuf)> = Vec::with_capacity(slots.len());
    let mut dropped = Vec::new();
    for (slot, path) in slots {
        match kept.last() {
            Some((last, _)) if last.same_as(&slot) => dropped.push(path),
            _ => kept.push((slot, path)),
        }
    }
    (kept.into_iter().map(|(_, p)| p).collect(), dropped)
}
