//! Fragments and their destination groups
//!
//! A raw fragment is one independently authored `.tex` file. It is filed into
//! a [`DestinationGroup`] by name ([`classify`]), cut down to its body
//! ([`trim`]), decorated, and finally ordered within its group ([`order`]).
//!
//!     raw file ──classify──▶ group
//!        │
//!        └──trim──▶ TrimmedFragment ──decorate──▶ (same fragment, rewritten) ──order──▶ splice

pub mod classify;
pub mod order;
pub mod select;
pub mod trim;

pub use classify::classify;
pub use order::order;
pub use select::{select_inputs, SelectOptions, Selection};
pub use trim::{trim, trim_text, trimmed_file_name, TRIM_SUFFIX};

use crate::error::FragmentError;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use texmerge_config::GroupsConfig;

/// Bucket a fragment is filed into, in document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum DestinationGroup {
    Differential,
    Integral,
    Series,
    Uncategorized,
}

impl DestinationGroup {
    /// Every group, in the order their fragments appear in the document.
    pub const ALL: [DestinationGroup; 4] = [
        DestinationGroup::Differential,
        DestinationGroup::Integral,
        DestinationGroup::Series,
        DestinationGroup::Uncategorized,
    ];

    /// The six-character file name prefix that selects this group.
    pub fn prefix(self) -> Option<&'static str> {
        match self {
            DestinationGroup::Differential => Some("Differ"),
            DestinationGroup::Integral => Some("Integr"),
            DestinationGroup::Series => Some("Series"),
            DestinationGroup::Uncategorized => None,
        }
    }
}

impl fmt::Display for DestinationGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Where each group's trimmed fragments are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupDirs {
    root: PathBuf,
    names: [String; 4],
}

impl GroupDirs {
    pub fn new(root: impl Into<PathBuf>, config: &GroupsConfig) -> Self {
        GroupDirs {
            root: root.into(),
            names: [
                config.differential.clone(),
                config.integral.clone(),
                config.series.clone(),
                config.uncategorized.clone(),
            ],
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dir(&self, group: DestinationGroup) -> PathBuf {
        let idx = DestinationGroup::ALL
            .iter()
            .position(|g| *g == group)
            .unwrap_or(DestinationGroup::ALL.len() - 1);
        self.root.join(&self.names[idx])
    }

    /// The file `raw` is trimmed into.
    pub fn trimmed_path(&self, raw: &RawFragment) -> PathBuf {
        self.dir(raw.group()).join(trimmed_file_name(raw.file_name()))
    }

    /// Create the group folders that do not exist yet.
    pub fn ensure(&self) -> std::io::Result<()> {
        for group in DestinationGroup::ALL {
            fs::create_dir_all(self.dir(group))?;
        }
        Ok(())
    }
}

/// A source fragment as handed to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFragment {
    path: PathBuf,
    name: String,
}

impl RawFragment {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        RawFragment { path, name }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> &str {
        &self.name
    }

    pub fn group(&self) -> DestinationGroup {
        classify(&self.name)
    }

    pub fn read(&self) -> Result<String, FragmentError> {
        fs::read_to_string(&self.path).map_err(|source| FragmentError::Read {
            path: self.path.clone(),
            source,
        })
    }
}

/// The body of one fragment, owned by exactly one group.
///
/// Created by the trimmer, rewritten in place by the decorator and written
/// back to `path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrimmedFragment {
    pub group: DestinationGroup,
    pub path: PathBuf,
    pub text: String,
    /// TikZ libraries the fragment asked for, collected while trimming and
    /// decorating.
    pub libraries: BTreeSet<String>,
}

impl TrimmedFragment {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn save(&self) -> Result<(), FragmentError> {
        fs::write(&self.path, &self.text).map_err(|source| FragmentError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

impl AsRef<Path> for TrimmedFragment {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}
