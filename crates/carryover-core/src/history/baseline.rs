//! Baseline resolution and change grouping on top of [`RevisionWalker`].
//!
//! A baseline is the nearest ancestor of a start revision that the migration
//! treats as already imported. Which ancestor that is, and how revisions are
//! grouped into logical changes, differs per origin kind, so both are
//! pluggable strategies rather than fixed behaviour.

use serde::Serialize;

use super::error::{HistoryError, HistoryResult};
use super::repository::Repository;
use super::revision::Revision;
use super::walker::{ChangeVisitor, RevisionWalker, VisitResult};
use crate::label::LabelFinder;
use crate::obs;

/// Walker over a type-erased repository, as handed to strategies.
pub type DynWalker<'a> = RevisionWalker<&'a dyn Repository>;

/// Ignores the first visited revision (the start) and captures the next one.
#[derive(Debug, Default)]
pub struct SkipStartVisitor {
    seen_start: bool,
    found: Option<Revision>,
}

impl SkipStartVisitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn found(&self) -> Option<&Revision> {
        self.found.as_ref()
    }

    pub fn into_found(self) -> Option<Revision> {
        self.found
    }
}

impl ChangeVisitor for SkipStartVisitor {
    fn visit(&mut self, revision: &Revision) -> VisitResult {
        if !self.seen_start {
            self.seen_start = true;
            return VisitResult::Continue;
        }
        self.found = Some(revision.clone());
        VisitResult::Terminate
    }
}

/// The revision right after `start` in walk order.
///
/// Fails with [`HistoryError::BaselineNotFound`] when `start` has no
/// ancestors.
pub fn find_baseline_without_label<R: Repository>(
    walker: &RevisionWalker<R>,
    start: &Revision,
) -> HistoryResult<Revision> {
    let mut visitor = SkipStartVisitor::new();
    walker.visit_changes(start, &mut visitor)?;
    let baseline = visitor
        .into_found()
        .ok_or_else(|| HistoryError::BaselineNotFound {
            start: start.to_string(),
        })?;
    obs::emit_baseline_resolved(&start.id, &baseline.id);
    Ok(baseline)
}

/// Captures the first visited revision whose message carries a label.
#[derive(Debug)]
pub struct LabelVisitor {
    label: String,
    found: Option<LabeledBaseline>,
}

impl LabelVisitor {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            found: None,
        }
    }

    pub fn into_found(self) -> Option<LabeledBaseline> {
        self.found
    }
}

impl ChangeVisitor for LabelVisitor {
    fn visit(&mut self, revision: &Revision) -> VisitResult {
        // The last occurrence wins when a message repeats the label.
        let value = revision
            .message
            .lines()
            .map(LabelFinder::new)
            .filter(|finder| finder.is_label_named(&self.label))
            .last()
            .map(|finder| finder.value().to_string());
        match value {
            Some(origin_reference) => {
                self.found = Some(LabeledBaseline {
                    revision: revision.clone(),
                    origin_reference,
                });
                VisitResult::Terminate
            }
            None => VisitResult::Continue,
        }
    }
}

/// A baseline found through a label, e.g. `GitOrigin-RevId: <sha>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabeledBaseline {
    /// The destination revision carrying the label.
    pub revision: Revision,
    /// The label value: the origin reference that revision was imported from.
    pub origin_reference: String,
}

/// The first revision, `start` included, labeled `label`.
pub fn find_baseline<R: Repository>(
    walker: &RevisionWalker<R>,
    start: &Revision,
    label: &str,
) -> HistoryResult<LabeledBaseline> {
    let mut visitor = LabelVisitor::new(label);
    walker.visit_changes(start, &mut visitor)?;
    let baseline = visitor
        .into_found()
        .ok_or_else(|| HistoryError::LabelNotFound {
            start: start.to_string(),
            label: label.to_string(),
        })?;
    obs::emit_baseline_resolved(&start.id, &baseline.revision.id);
    Ok(baseline)
}

/// Picks the baseline revision for a start revision.
pub trait BaselineStrategy: Send + Sync {
    fn find_baseline(&self, walker: &DynWalker<'_>, start: &Revision) -> HistoryResult<Revision>;
}

impl<F> BaselineStrategy for F
where
    F: Fn(&DynWalker<'_>, &Revision) -> HistoryResult<Revision> + Send + Sync,
{
    fn find_baseline(&self, walker: &DynWalker<'_>, start: &Revision) -> HistoryResult<Revision> {
        self(walker, start)
    }
}

/// Baseline is the revision visited right after the start.
#[derive(Debug, Clone, Copy, Default)]
pub struct SkipStart;

impl BaselineStrategy for SkipStart {
    fn find_baseline(&self, walker: &DynWalker<'_>, start: &Revision) -> HistoryResult<Revision> {
        find_baseline_without_label(walker, start)
    }
}

/// Baseline is the nearest revision carrying a label.
#[derive(Debug, Clone)]
pub struct LabeledAncestor {
    pub label: String,
}

impl LabeledAncestor {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

impl BaselineStrategy for LabeledAncestor {
    fn find_baseline(&self, walker: &DynWalker<'_>, start: &Revision) -> HistoryResult<Revision> {
        find_baseline(walker, start, &self.label).map(|baseline| baseline.revision)
    }
}

/// Maps a revision to the key of the logical change it belongs to.
pub trait GroupIdentity: Send + Sync {
    fn group_identity(&self, revision: &Revision) -> Option<String>;
}

impl<F> GroupIdentity for F
where
    F: Fn(&Revision) -> Option<String> + Send + Sync,
{
    fn group_identity(&self, revision: &Revision) -> Option<String> {
        self(revision)
    }
}

/// Every revision is its own change.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGrouping;

impl GroupIdentity for NoGrouping {
    fn group_identity(&self, _revision: &Revision) -> Option<String> {
        None
    }
}

/// The reference the revision was resolved from, verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextReference;

impl GroupIdentity for ContextReference {
    fn group_identity(&self, revision: &Revision) -> Option<String> {
        revision.context_reference.clone()
    }
}

/// Gerrit change number, shared by all patch sets of a change.
///
/// `refs/changes/45/12345/3` and a bare `12345` both yield `12345`; any other
/// reference is used verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct GerritChange;

impl GerritChange {
    pub fn change_number(reference: &str) -> Option<&str> {
        let is_number = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
        if is_number(reference) {
            return Some(reference);
        }
        let mut parts = reference.strip_prefix("refs/changes/")?.split('/');
        let (_shard, change) = (parts.next()?, parts.next()?);
        is_number(change).then_some(change)
    }
}

impl GroupIdentity for GerritChange {
    fn group_identity(&self, revision: &Revision) -> Option<String> {
        let reference = revision.context_reference.as_deref()?;
        Some(
            GerritChange::change_number(reference)
                .unwrap_or(reference)
                .to_string(),
        )
    }
}

/// Value of a message label such as `Change-Id`.
#[derive(Debug, Clone)]
pub struct LabelIdentity {
    pub label: String,
}

impl LabelIdentity {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

impl GroupIdentity for LabelIdentity {
    fn group_identity(&self, revision: &Revision) -> Option<String> {
        revision.label_values(&self.label).pop()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};

    use super::*;
    use crate::history::repository::MemoryRepository;

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn linear() -> MemoryRepository {
        MemoryRepository::from_revisions([
            Revision::new("a", ts(1)).with_message("Initial\n\nGitOrigin-RevId: origin-1\n"),
            Revision::new("b", ts(2))
                .with_parents(["a"])
                .with_message("Second"),
            Revision::new("c", ts(3))
                .with_parents(["b"])
                .with_message("Third\n\nChange-Id: I42\n"),
        ])
    }

    #[test]
    fn skip_start_returns_parent() {
        let repo = linear();
        let start = repo.resolve("c").unwrap();
        let baseline = find_baseline_without_label(&RevisionWalker::new(&repo), &start).unwrap();
        assert_eq!(baseline.id.as_str(), "b");
    }

    #[test]
    fn single_revision_has_no_baseline() {
        let repo = MemoryRepository::from_revisions([Revision::new("only", ts(1))]);
        let start = repo.resolve("only").unwrap();
        let err = find_baseline_without_label(&RevisionWalker::new(&repo), &start).unwrap_err();
        assert!(matches!(err, HistoryError::BaselineNotFound { .. }));
        assert!(err.to_string().contains("only"));
    }

    #[test]
    fn visitor_state_is_inspectable() {
        let repo = linear();
        let start = repo.resolve("c").unwrap();
        let mut visitor = SkipStartVisitor::new();
        let summary = RevisionWalker::new(&repo)
            .visit_changes(&start, &mut visitor)
            .unwrap();
        assert!(summary.terminated);
        assert_eq!(summary.visited, 2);
        assert_eq!(visitor.found().map(|r| r.id.as_str()), Some("b"));
    }

    #[test]
    fn labeled_baseline_reports_origin_reference() {
        let repo = linear();
        let start = repo.resolve("c").unwrap();
        let baseline = find_baseline(&RevisionWalker::new(&repo), &start, "GitOrigin-RevId").unwrap();
        assert_eq!(baseline.revision.id.as_str(), "a");
        assert_eq!(baseline.origin_reference, "origin-1");
    }

    #[test]
    fn labeled_baseline_includes_start() {
        let repo = linear();
        let start = repo.resolve("c").unwrap();
        let baseline = find_baseline(&RevisionWalker::new(&repo), &start, "Change-Id").unwrap();
        assert_eq!(baseline.revision.id.as_str(), "c");
    }

    #[test]
    fn missing_label_is_an_error() {
        let repo = linear();
        let start = repo.resolve("c").unwrap();
        let err = find_baseline(&RevisionWalker::new(&repo), &start, "Nope").unwrap_err();
        assert!(matches!(err, HistoryError::LabelNotFound { .. }));
    }

    #[test]
    fn gerrit_change_numbers() {
        assert_eq!(GerritChange::change_number("refs/changes/45/12345/3"), Some("12345"));
        assert_eq!(GerritChange::change_number("12345"), Some("12345"));
        assert_eq!(GerritChange::change_number("refs/heads/main"), None);
        assert_eq!(GerritChange::change_number("refs/changes/45/abc/1"), None);
    }

    #[test]
    fn patch_sets_share_group_identity() {
        let ps1 = Revision::new("x1", ts(1)).with_context_reference("refs/changes/45/12345/1");
        let ps2 = Revision::new("x2", ts(2)).with_context_reference("refs/changes/45/12345/2");
        let other = Revision::new("y", ts(3)).with_context_reference("refs/changes/46/12346/1");
        let strategy = GerritChange;
        assert_eq!(strategy.group_identity(&ps1), strategy.group_identity(&ps2));
        assert_ne!(strategy.group_identity(&ps1), strategy.group_identity(&other));
        assert_eq!(strategy.group_identity(&ps1).as_deref(), Some("12345"));
        assert_eq!(strategy.group_identity(&Revision::new("z", ts(4))), None);
    }

    #[test]
    fn other_identity_strategies() {
        let rev = Revision::new("c", ts(1))
            .with_message("Fix\n\nChange-Id: I42\n")
            .with_context_reference("main");
        assert_eq!(NoGrouping.group_identity(&rev), None);
        assert_eq!(ContextReference.group_identity(&rev).as_deref(), Some("main"));
        assert_eq!(LabelIdentity::new("Change-Id").group_identity(&rev).as_deref(), Some("I42"));
        let by_author = |r: &Revision| Some(r.id.to_string());
        assert_eq!(by_author.group_identity(&rev).as_deref(), Some("c"));
    }
}
