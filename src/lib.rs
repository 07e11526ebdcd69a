//! # texmerge
//!
//! Assembles a lecture text from independently authored LaTeX fragments.
//!
//! Each fragment is filed into a chapter group by its name, reduced to its
//! body, decorated (chapter titles, spaced section titles, figure paths and
//! widths resolved against the figure repository) and finally included into
//! the master document between its `%!!!ContentStart` and `%!!!ContentEnd`
//! lines. [`pipeline::Merger`] runs the whole thing; the other modules are the
//! individual stages.

pub mod decorate;
pub mod error;
pub mod figures;
pub mod fragment;
pub mod paths;
pub mod pipeline;
pub mod report;
pub mod splice;
pub mod toolchain;

pub use error::{ArrangeError, FragmentError, MergeError, ToolchainError};
pub use pipeline::{MergeSettings, Merger};
pub use report::{Diagnostic, MergeReport};
