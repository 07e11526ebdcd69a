//! Orderer: sequence fragments within a group

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

static ORDINAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\S*-(\d{2})-\S*").unwrap());

/// The two-digit sequence number embedded as `-NN-` in a file name.
///
/// When a name carries several, the last one wins.
pub fn ordinal(file_name: &str) -> Option<&str> {
    ORDINAL
        .captures(file_name)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Sort key: the ordinal when present, otherwise the whole name, with the
/// name itself breaking ties.
pub fn sort_key(file_name: &str) -> (String, String) {
    let primary = ordinal(file_name).unwrap_or(file_name);
    (primary.to_string(), file_name.to_string())
}

/// Order the fragments of one group for splicing, by the ordinal in their
/// file names.
pub fn order<T: AsRef<Path>>(mut fragments: Vec<T>) -> Vec<T> {
    fragments.sort_by_cached_key(|fragment| {
        let path: &Path = fragment.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        sort_key(&name)
    });
    fragments
}
