//! Merge pipeline
//!
//! Runs one merge from raw fragment files to a rewritten master document:
//!
//! 1. validate every required resource (nothing is touched when one is missing)
//! 2. optionally prune duplicated figures and arrange them into `size<N>` folders
//! 3. select the inputs and give each its own trimmed file
//! 4. classify, trim, decorate and save each fragment (on a rayon pool)
//! 5. fold the per-fragment results into one [`MergeReport`]
//! 6. order each group and splice the include block into the master document
//!
//! Fragment failures are isolated: the fragment is skipped and the run goes
//! on. Only missing resources and master document I/O abort a run.

use crate::decorate::{decorate, DecorateEnv};
use crate::error::{FragmentError, MergeError, MissingResource, ResourceKind};
use crate::figures::{self, CachedIndex, FigureLookup, ScanningIndex};
use crate::fragment::{
    order, select_inputs, trim, DestinationGroup, GroupDirs, RawFragment, SelectOptions,
    TrimmedFragment, TRIM_SUFFIX,
};
use crate::paths::{absolute, PathShortener};
use crate::report::{Diagnostic, MergeReport, SkippedFragment};
use crate::splice::splice;
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use texmerge_config::{GroupsConfig, TexmergeConfig};

/// Everything a merge run needs to know, resolved from configuration.
#[derive(Debug, Clone)]
pub struct MergeSettings {
    pub main: PathBuf,
    pub figures: PathBuf,
    pub parts: PathBuf,
    pub header: PathBuf,
    pub groups: GroupsConfig,
    pub select: SelectOptions,
    pub keep_existing_parts: bool,
    pub parallel: bool,
    pub arrange_before_merge: bool,
    pub prune_duplicates: bool,
    pub restrict_to_size_dirs: bool,
    pub cache_index: bool,
}

impl MergeSettings {
    /// Relative paths in `config` are taken relative to `base`.
    pub fn from_config(config: &TexmergeConfig, base: &Path) -> Self {
        let paths = &config.paths;
        MergeSettings {
            main: base.join(&paths.main),
            figures: base.join(&paths.figures),
            parts: base.join(&paths.parts),
            header: base.join(&paths.header),
            groups: config.groups.clone(),
            select: SelectOptions {
                ignore_wrong_filenames: config.merge.ignore_wrong_filenames,
                auto_sort: config.merge.auto_sort,
            },
            keep_existing_parts: config.merge.keep_existing_parts,
            parallel: config.merge.parallel,
            arrange_before_merge: config.figures.arrange_before_merge,
            prune_duplicates: config.figures.prune_duplicates,
            restrict_to_size_dirs: config.figures.restrict_to_size_dirs,
            cache_index: config.figures.cache_index,
        }
    }
}

/// A fragment that made it through trimming, decoration and saving.
struct Processed {
    fragment: TrimmedFragment,
    diagnostics: Vec<Diagnostic>,
}

/// Runs merges with fixed settings.
pub struct Merger {
    settings: MergeSettings,
}

impl Merger {
    pub fn new(settings: MergeSettings) -> Self {
        Merger { settings }
    }

    pub fn settings(&self) -> &MergeSettings {
        &self.settings
    }

    /// Check that every resource a run depends on exists. Each missing one is
    /// logged, and all of them are returned together.
    pub fn validate(&self) -> Result<(), MergeError> {
        let s = &self.settings;
        let checks = [
            (ResourceKind::Header, &s.header, s.header.is_file()),
            (ResourceKind::MainDocument, &s.main, s.main.is_file()),
            (ResourceKind::PartsRoot, &s.parts, s.parts.is_dir()),
            (ResourceKind::FigureRoot, &s.figures, s.figures.is_dir()),
        ];
        let missing: Vec<MissingResource> = checks
            .into_iter()
            .filter(|(_, _, present)| !present)
            .map(|(kind, path, _)| MissingResource {
                kind,
                path: path.clone(),
            })
            .collect();
        if missing.is_empty() {
            return Ok(());
        }
        for resource in &missing {
            tracing::error!("{}", resource);
        }
        Err(MergeError::MissingResources(missing))
    }

    /// Merge `inputs` into the master document.
    pub fn run(&self, inputs: &[PathBuf]) -> Result<MergeReport, MergeError> {
        self.validate()?;
        tracing::info!(inputs = inputs.len(), "merge started");

        let main = resolve(&self.settings.main)?;
        let figure_root = resolve(&self.settings.figures)?;
        let header = resolve(&self.settings.header)?;
        let dirs = GroupDirs::new(resolve(&self.settings.parts)?, &self.settings.groups);
        dirs.ensure().map_err(|source| MergeError::Io {
            action: "create group folders under",
            path: dirs.root().to_path_buf(),
            source,
        })?;
        let shortener = PathShortener::for_main_document(&main).map_err(|source| MergeError::Io {
            action: "resolve",
            path: main.clone(),
            source,
        })?;

        // Step 1: figure folder maintenance
        self.tidy_figures(&figure_root);

        // Step 2: input selection
        let mut report = MergeReport::default();
        let selection = select_inputs(inputs, self.settings.select);
        report.skipped.extend(selection.missing.into_iter().map(|path| SkippedFragment {
            path,
            reason: "file not found".to_string(),
        }));
        report.skipped.extend(selection.rejected.into_iter().map(|path| SkippedFragment {
            path,
            reason: "rejected by input selection".to_string(),
        }));
        let raws = claim_outputs(selection.accepted, &dirs, &mut report);

        // Step 3: trim and decorate, one worker per fragment
        let lookup = self.figure_lookup(&figure_root);
        let env = DecorateEnv::new(&*lookup, &shortener, &header);
        let process = |raw: &RawFragment| (raw.path().to_path_buf(), process_fragment(raw, &dirs, &env));
        let results: Vec<(PathBuf, Result<Processed, FragmentError>)> = if self.settings.parallel {
            raws.par_iter().map(process).collect()
        } else {
            raws.iter().map(process).collect()
        };

        // Step 4: aggregate
        let mut by_group: BTreeMap<DestinationGroup, Vec<PathBuf>> = BTreeMap::new();
        for (source, result) in results {
            match result {
                Ok(Processed {
                    fragment,
                    diagnostics,
                }) => {
                    for diagnostic in &diagnostics {
                        diagnostic.log();
                    }
                    report.diagnostics.extend(diagnostics);
                    report.extend_libraries(fragment.libraries);
                    by_group.entry(fragment.group).or_default().push(fragment.path);
                }
                Err(err) => {
                    tracing::error!(file = %source.display(), error = %err, "fragment skipped");
                    report.skipped.push(SkippedFragment {
                        path: source,
                        reason: err.to_string(),
                    });
                }
            }
        }
        if self.settings.keep_existing_parts {
            // parts whose source was skipped this run must not come back stale
            let retired: BTreeSet<PathBuf> = report
                .skipped
                .iter()
                .map(|skipped| dirs.trimmed_path(&RawFragment::new(skipped.path.clone())))
                .collect();
            self.add_existing_parts(&dirs, &retired, &mut by_group)?;
        }

        // Step 5: order and splice
        for group in DestinationGroup::ALL {
            if let Some(paths) = by_group.remove(&group) {
                report.injected.extend(order(paths));
            }
        }
        self.write_master(&main, &shortener, &report)?;
        for path in &report.injected {
            tracing::debug!(file = %path.display(), "injected into main file");
        }

        tracing::info!("{}", report.summary());
        Ok(report)
    }

    fn tidy_figures(&self, root: &Path) {
        if self.settings.prune_duplicates {
            let pruned = figures::remove_duplicates_by_last_modified(root);
            for failure in &pruned.failures {
                tracing::warn!(error = %failure, "could not prune duplicate");
            }
        }
        if self.settings.arrange_before_merge {
            let arranged = figures::arrange(root);
            for failure in &arranged.failures {
                tracing::warn!(error = %failure, "could not arrange figure");
            }
            tracing::info!(moved = arranged.moved.len(), "figures arranged");
        }
    }

    fn figure_lookup(&self, root: &Path) -> Box<dyn FigureLookup> {
        let restrict = self.settings.restrict_to_size_dirs;
        if self.settings.cache_index {
            let index = CachedIndex::build(root, restrict);
            tracing::debug!(names = index.len(), "figure index built");
            Box::new(index)
        } else {
            Box::new(ScanningIndex::new(root).restricted(restrict))
        }
    }

    /// Trimmed files left in the group folders by earlier runs, except those
    /// in `retired`.
    fn add_existing_parts(
        &self,
        dirs: &GroupDirs,
        retired: &BTreeSet<PathBuf>,
        by_group: &mut BTreeMap<DestinationGroup, Vec<PathBuf>>,
    ) -> Result<(), MergeError> {
        for group in DestinationGroup::ALL {
            let dir = dirs.dir(group);
            let entries = fs::read_dir(&dir).map_err(|source| MergeError::Io {
                action: "list",
                path: dir.clone(),
                source,
            })?;
            let current = by_group.entry(group).or_default();
            let known: BTreeSet<PathBuf> = current.iter().cloned().collect();
            for entry in entries.filter_map(Result::ok) {
                let path = entry.path();
                let is_part = path.is_file()
                    && path
                        .file_name()
                        .is_some_and(|name| name.to_string_lossy().ends_with(TRIM_SUFFIX));
                if is_part && !known.contains(&path) && !retired.contains(&path) {
                    tracing::debug!(file = %path.display(), "keeping part from an earlier run");
                    current.push(path);
                }
            }
        }
        Ok(())
    }

    fn write_master(
        &self,
        main: &Path,
        shortener: &PathShortener,
        report: &MergeReport,
    ) -> Result<(), MergeError> {
        let master = fs::read_to_string(main).map_err(|source| MergeError::Io {
            action: "read",
            path: main.to_path_buf(),
            source,
        })?;
        let spliced = splice(&master, &report.injected, &report.libraries, shortener);
        if !spliced.injected {
            tracing::warn!(
                file = %main.display(),
                "no %!!!ContentStart line in main file, nothing injected"
            );
        }
        fs::write(main, spliced.text).map_err(|source| MergeError::Io {
            action: "write",
            path: main.to_path_buf(),
            source,
        })
    }
}

fn resolve(path: &Path) -> Result<PathBuf, MergeError> {
    absolute(path).map_err(|source| MergeError::Io {
        action: "resolve",
        path: path.to_path_buf(),
        source,
    })
}

/// Give each input its own trimmed file. An input whose trimmed file is
/// already claimed by an earlier one is skipped.
fn claim_outputs(
    inputs: Vec<PathBuf>,
    dirs: &GroupDirs,
    report: &mut MergeReport,
) -> Vec<RawFragment> {
    let mut owners: BTreeMap<PathBuf, PathBuf> = BTreeMap::new();
    let mut raws = Vec::with_capacity(inputs.len());
    for raw in inputs.into_iter().map(RawFragment::new) {
        let output = dirs.trimmed_path(&raw);
        if let Some(owner) = owners.get(&output) {
            tracing::warn!(
                file = %raw.path().display(),
                owner = %owner.display(),
                "trimmed name already taken, fragment skipped"
            );
            report.skipped.push(SkippedFragment {
                path: raw.path().to_path_buf(),
                reason: format!("trimmed name collides with {}", owner.display()),
            });
            continue;
        }
        owners.insert(output, raw.path().to_path_buf());
        raws.push(raw);
    }
    raws
}

fn process_fragment(
    raw: &RawFragment,
    dirs: &GroupDirs,
    env: &DecorateEnv<'_>,
) -> Result<Processed, FragmentError> {
    let group = raw.group();
    let mut fragment = trim(raw, group, &dirs.dir(group))?;
    let decorated = decorate(&fragment, env);
    fragment.text = decorated.text;
    fragment.libraries.extend(decorated.libraries);
    fragment.save()?;
    Ok(Processed {
        fragment,
        diagnostics: decorated.diagnostics,
    })
}
