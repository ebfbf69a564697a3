//! Carryover Core Library
//!
//! Building blocks for moving code between repositories: message label
//! parsing, reversible rewriting of `TODO(user): ...` style annotations, and
//! baseline resolution over revision history.

pub mod git;
pub mod history;
pub mod label;
pub mod obs;
pub mod paths;
pub mod replace;
pub mod telemetry;

pub use git::{is_git_repo, GitCliRepository};

pub use history::{
    find_baseline, find_baseline_without_label, BaselineStrategy, ChangeVisitor, GroupIdentity,
    HistoryError, HistoryResult, LabeledBaseline, MemoryRepository, Repository, Revision,
    RevisionId, RevisionReader, RevisionWalker, Sorting, VisitResult, WalkOptions, WalkSummary,
};

pub use label::{Label, LabelFinder, VALID_LABEL};

pub use paths::{GlobMatcher, MatchAll, PathMatcher};

pub use replace::{
    ReplaceConfig, ReplaceEngine, ReplaceEngineBuilder, ReplaceError, ReplaceMode, ReplaceResult,
    TagScanner, TransformReport,
};

pub use obs::{emit_baseline_resolved, emit_transform_finished, emit_transform_started, TransformSpan};
pub use telemetry::init_tracing;

/// Carryover version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
