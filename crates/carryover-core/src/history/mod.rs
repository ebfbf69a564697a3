//! Revision history: walking a DAG of revisions and resolving baselines.
//!
//! [`RevisionWalker`] hands every revision reachable from a start revision to
//! a [`ChangeVisitor`], once each, children before parents. Baseline lookup
//! and change grouping are built on top of it in [`baseline`], and
//! [`RevisionReader`] bundles them per origin kind.

pub mod baseline;
pub mod error;
pub mod reader;
pub mod repository;
pub mod revision;
pub mod walker;

pub use baseline::{
    find_baseline, find_baseline_without_label, BaselineStrategy, ContextReference, DynWalker,
    GerritChange, GroupIdentity, LabelIdentity, LabelVisitor, LabeledAncestor, LabeledBaseline,
    NoGrouping, SkipStart, SkipStartVisitor,
};
pub use error::{HistoryError, HistoryResult};
pub use reader::{RevisionReader, GIT_ORIGIN_REV_ID};
pub use repository::{MemoryRepository, Repository};
pub use revision::{Revision, RevisionId};
pub use walker::{ChangeVisitor, RevisionWalker, Sorting, VisitResult, WalkOptions, WalkSummary};
