//! Configuration for texmerge.
//!
//! The defaults live in `defaults/texmerge.default.toml` and are compiled in.
//! [`Loader`] puts a project file and command-line values over them and
//! yields a [`TexmergeConfig`].

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, File, FileFormat, ValueKind};

pub use config::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DEFAULT_TOML: &str = include_str!("../defaults/texmerge.default.toml");

/// Top-level configuration consumed by texmerge.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TexmergeConfig {
    pub paths: PathsConfig,
    pub groups: GroupsConfig,
    pub merge: MergeConfig,
    pub figures: FiguresConfig,
    pub toolchain: ToolchainConfig,
}

/// Locations of the resources a merge run depends on.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PathsConfig {
    pub main: PathBuf,
    pub figures: PathBuf,
    pub parts: PathBuf,
    pub header: PathBuf,
}

/// Directory names (under the parts root) of each destination group.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GroupsConfig {
    pub differential: String,
    pub integral: String,
    pub series: String,
    pub uncategorized: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MergeConfig {
    pub ignore_wrong_filenames: bool,
    pub auto_sort: bool,
    pub keep_existing_parts: bool,
    pub parallel: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FiguresConfig {
    pub arrange_before_merge: bool,
    pub prune_duplicates: bool,
    pub restrict_to_size_dirs: bool,
    pub cache_index: bool,
}

/// External typesetting programs run after a merge.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToolchainConfig {
    pub compiler: String,
    pub compiler_args: Vec<String>,
    pub indexer: String,
    pub passes: usize,
}

/// Stacks configuration sources: embedded defaults first, then a
/// `texmerge.toml`, then command-line values. Later sources win per key.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Add a TOML file that must exist.
    pub fn with_file(self, path: impl AsRef<Path>) -> Self {
        self.with_toml(path.as_ref(), true)
    }

    /// Add a TOML file that is skipped when absent, such as the
    /// `texmerge.toml` of the working directory.
    pub fn with_optional_file(self, path: impl AsRef<Path>) -> Self {
        self.with_toml(path.as_ref(), false)
    }

    fn with_toml(mut self, path: &Path, required: bool) -> Self {
        let source = File::from(path).format(FileFormat::Toml).required(required);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Pin one dotted key, e.g. `paths.main` from `--main`.
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    pub fn build(self) -> Result<TexmergeConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// The embedded defaults with nothing layered on top.
pub fn load_defaults() -> Result<TexmergeConfig, ConfigError> {
    Loader::new().build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_default_config() {
        let config = load_defaults().expect("defaults to deserialize");
        assert_eq!(config.paths.figures, PathBuf::from("fig"));
        assert_eq!(config.paths.header, PathBuf::from("parts/header.tex"));
        assert_eq!(config.groups.uncategorized, "Others");
        assert!(config.merge.auto_sort);
        assert!(!config.figures.restrict_to_size_dirs);
        assert_eq!(config.toolchain.compiler, "xelatex");
    }

    #[test]
    fn supports_overrides() {
        let config = Loader::new()
            .set_override("merge.parallel", false)
            .expect("override to apply")
            .set_override("paths.figures", "figures")
            .expect("override to apply")
            .build()
            .expect("config to build");
        assert!(!config.merge.parallel);
        assert_eq!(config.paths.figures, PathBuf::from("figures"));
    }

    #[test]
    fn user_file_overrides_defaults() {
        let dir = std::env::temp_dir().join(format!("texmerge-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("texmerge.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[toolchain]\ncompiler = \"lualatex\"\npasses = 2").unwrap();

        let config = Loader::new().with_file(&path).build().expect("config to build");
        assert_eq!(config.toolchain.compiler, "lualatex");
        assert_eq!(config.toolchain.passes, 2);
        assert_eq!(config.toolchain.indexer, "makeindex");

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_optional_file_is_ignored() {
        let config = Loader::new()
            .with_optional_file("/definitely/not/here/texmerge.toml")
            .build()
            .expect("config to build");
        assert_eq!(config.groups.differential, "Differential");
    }

    #[test]
    fn missing_required_file_fails() {
        let result = Loader::new()
            .with_file("/definitely/not/here/texmerge.toml")
            .build();
        assert!(result.is_err());
    }
}
