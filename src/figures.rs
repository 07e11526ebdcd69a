//! Figure repository
//!
//! Figures live under one root, sorted into `size<N>` folders whose number is
//! the intended display width. This module resolves figure references
//! ([`index`]), keeps the folder layout in shape ([`arrange`]) and renders a
//! proofreading catalogue ([`catalogue`]).

pub mod arrange;
pub mod catalogue;
pub mod index;

pub use arrange::{arrange, find_duplicates, remove_duplicates_by_last_modified};
pub use index::{find, CachedIndex, FigureLookup, ScanningIndex};
