//! Origin readers: a repository plus the per-origin policies for walking it.

use std::collections::HashSet;
use std::fmt;

use super::baseline::{
    BaselineStrategy, ContextReference, DynWalker, GerritChange, GroupIdentity, LabeledAncestor,
    NoGrouping, SkipStart,
};
use super::error::{HistoryError, HistoryResult};
use super::repository::Repository;
use super::revision::Revision;
use super::walker::{ChangeVisitor, RevisionWalker, VisitResult, WalkOptions, WalkSummary};

/// Label a git destination leaves on imported revisions.
pub const GIT_ORIGIN_REV_ID: &str = "GitOrigin-RevId";

/// Reads history from one origin.
///
/// Built from a repository, walk options and two strategies: how to pick a
/// baseline and how to group revisions into changes.
pub struct RevisionReader<R> {
    repo: R,
    options: WalkOptions,
    baseline: Box<dyn BaselineStrategy>,
    identity: Box<dyn GroupIdentity>,
    required_reference: Option<&'static str>,
}

impl<R: Repository> RevisionReader<R> {
    pub fn new(
        repo: R,
        baseline: impl BaselineStrategy + 'static,
        identity: impl GroupIdentity + 'static,
    ) -> Self {
        Self {
            repo,
            options: WalkOptions::default(),
            baseline: Box::new(baseline),
            identity: Box::new(identity),
            required_reference: None,
        }
    }

    /// Plain git origin: the baseline is the nearest revision labeled
    /// [`GIT_ORIGIN_REV_ID`], and each revision is its own change.
    pub fn git(repo: R) -> Self {
        Self::new(repo, LabeledAncestor::new(GIT_ORIGIN_REV_ID), NoGrouping)
    }

    /// Gerrit origin: the baseline is the revision the change was uploaded
    /// on top of, and patch sets of one change share a group identity.
    pub fn gerrit(repo: R) -> Self {
        Self::new(repo, SkipStart, GerritChange).require_reference("change number")
    }

    /// Branch-tracking origin grouped by the reference revisions came from.
    pub fn by_reference(repo: R) -> Self {
        Self::new(repo, SkipStart, ContextReference)
    }

    pub fn with_options(mut self, options: WalkOptions) -> Self {
        self.options = options;
        self
    }

    /// Reject empty references; `what` names the expected kind in the error.
    pub fn require_reference(mut self, what: &'static str) -> Self {
        self.required_reference = Some(what);
        self
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn options(&self) -> WalkOptions {
        self.options
    }

    fn walker(&self) -> DynWalker<'_> {
        RevisionWalker::with_options(&self.repo as &dyn Repository, self.options)
    }

    pub fn resolve(&self, reference: &str) -> HistoryResult<Revision> {
        let reference = reference.trim();
        if let Some(what) = self.required_reference {
            if reference.is_empty() {
                return Err(HistoryError::MissingReference(what));
            }
        }
        self.repo.resolve(reference)
    }

    pub fn find_baseline(&self, start: &Revision) -> HistoryResult<Revision> {
        self.baseline.find_baseline(&self.walker(), start)
    }

    pub fn group_identity(&self, revision: &Revision) -> Option<String> {
        self.identity.group_identity(revision)
    }

    pub fn visit_changes<V>(&self, start: &Revision, visitor: &mut V) -> HistoryResult<WalkSummary>
    where
        V: ChangeVisitor + ?Sized,
    {
        self.walker().visit_changes(start, visitor)
    }

    /// Revisions reachable from `to` but not from `from`, oldest first.
    ///
    /// With no `from`, the whole history of `to`.
    pub fn changes(&self, from: Option<&Revision>, to: &Revision) -> HistoryResult<Vec<Revision>> {
        // A limit on the exclusion walk would leak old revisions back in.
        let exclusion = RevisionWalker::with_options(
            &self.repo as &dyn Repository,
            WalkOptions {
                limit: None,
                ..self.options
            },
        );
        let mut excluded = HashSet::new();
        if let Some(from) = from {
            exclusion.visit_changes(from, &mut |revision: &Revision| {
                excluded.insert(revision.id.clone());
                VisitResult::Continue
            })?;
        }

        let mut changes = Vec::new();
        self.visit_changes(to, &mut |revision: &Revision| {
            if !excluded.contains(&revision.id) {
                changes.push(revision.clone());
            }
            VisitResult::Continue
        })?;
        changes.reverse();
        Ok(changes)
    }
}

impl<R: fmt::Debug> fmt::Debug for RevisionReader<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RevisionReader")
            .field("repo", &self.repo)
            .field("options", &self.options)
            .field("required_reference", &self.required_reference)
            .finish_non_exhaustive()
    }
}
