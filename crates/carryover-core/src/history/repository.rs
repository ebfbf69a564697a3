//! The read interface a history walk needs from an origin repository.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use super::error::{HistoryError, HistoryResult};
use super::revision::{Revision, RevisionId};

/// Read-only access to a revision DAG.
///
/// Every call may block on IO and may fail with
/// [`HistoryError::RepositoryAccess`]. Implementations serialize their own
/// mutations; the walk never writes.
pub trait Repository: Send + Sync {
    /// Resolve a reference (branch, tag, change number, id) to a revision.
    fn resolve(&self, reference: &str) -> HistoryResult<Revision>;

    /// Load a revision by id.
    fn revision(&self, id: &RevisionId) -> HistoryResult<Revision>;

    /// Parents of `revision`, first parent first.
    fn parents_of(&self, revision: &Revision) -> HistoryResult<Vec<Revision>> {
        revision.parents.iter().map(|id| self.revision(id)).collect()
    }
}

impl<R: Repository + ?Sized> Repository for &R {
    fn resolve(&self, reference: &str) -> HistoryResult<Revision> {
        (**self).resolve(reference)
    }

    fn revision(&self, id: &RevisionId) -> HistoryResult<Revision> {
        (**self).revision(id)
    }

    fn parents_of(&self, revision: &Revision) -> HistoryResult<Vec<Revision>> {
        (**self).parents_of(revision)
    }
}

/// In-memory repository backed by a `HashMap<id, Revision>`.
///
/// Counts reads so tests can check how far a walk looked ahead, and can be
/// told to fail when a given revision is read.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    revisions: HashMap<RevisionId, Revision>,
    refs: HashMap<String, RevisionId>,
    unreadable: HashSet<RevisionId>,
    reads: AtomicUsize,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a repository from revisions.
    pub fn from_revisions<I: IntoIterator<Item = Revision>>(revisions: I) -> Self {
        let mut repo = Self::new();
        for revision in revisions {
            repo.insert(revision);
        }
        repo
    }

    pub fn insert(&mut self, revision: Revision) {
        self.revisions.insert(revision.id.clone(), revision);
    }

    /// Point `name` at `id`.
    pub fn set_ref(&mut self, name: impl Into<String>, id: impl Into<RevisionId>) {
        self.refs.insert(name.into(), id.into());
    }

    /// Make every read of `id` fail with a repository access error.
    pub fn make_unreadable(&mut self, id: impl Into<RevisionId>) {
        self.unreadable.insert(id.into());
    }

    /// Number of revision reads served so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.revisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.revisions.is_empty()
    }
}

impl Repository for MemoryRepository {
    fn resolve(&self, reference: &str) -> HistoryResult<Revision> {
        let id = self
            .refs
            .get(reference)
            .cloned()
            .unwrap_or_else(|| RevisionId::new(reference));
        if !self.revisions.contains_key(&id) {
            return Err(HistoryError::InvalidReference(reference.to_string()));
        }
        Ok(self.revision(&id)?.with_context_reference(reference))
    }

    fn revision(&self, id: &RevisionId) -> HistoryResult<Revision> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        if self.unreadable.contains(id) {
            return Err(HistoryError::RepositoryAccess(format!("cannot read {id}")));
        }
        self.revisions
            .get(id)
            .cloned()
            .ok_or_else(|| HistoryError::RevisionNotFound(id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};

    use super::*;

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn repo() -> MemoryRepository {
        let mut repo = MemoryRepository::from_revisions([
            Revision::new("a", ts(1)),
            Revision::new("b", ts(2)).with_parents(["a"]),
        ]);
        repo.set_ref("main", "b");
        repo
    }

    #[test]
    fn resolve_by_ref_and_id() {
        let repo = repo();
        let main = repo.resolve("main").unwrap();
        assert_eq!(main.id.as_str(), "b");
        assert_eq!(main.context_reference.as_deref(), Some("main"));
        assert_eq!(repo.resolve("a").unwrap().id.as_str(), "a");
    }

    #[test]
    fn resolve_unknown_reference_fails() {
        let err = repo().resolve("nope").unwrap_err();
        assert!(matches!(err, HistoryError::InvalidReference(_)));
    }

    #[test]
    fn parents_follow_ids() {
        let repo = repo();
        let b = repo.revision(&RevisionId::from("b")).unwrap();
        let parents = repo.parents_of(&b).unwrap();
        assert_eq!(parents.len(), 1);
        assert_eq!(parents[0].id.as_str(), "a");
    }

    #[test]
    fn dangling_parent_is_reported() {
        let repo = MemoryRepository::from_revisions([Revision::new("b", ts(2)).with_parents(["gone"])]);
        let b = repo.revision(&RevisionId::from("b")).unwrap();
        assert!(matches!(
            repo.parents_of(&b).unwrap_err(),
            HistoryError::RevisionNotFound(_)
        ));
    }

    #[test]
    fn unreadable_revision_fails_with_access_error() {
        let mut repo = repo();
        repo.make_unreadable("a");
        let err = repo.revision(&RevisionId::from("a")).unwrap_err();
        assert!(err.is_repository_error());
        assert!(matches!(err, HistoryError::RepositoryAccess(_)));
    }

    #[test]
    fn reads_are_counted() {
        let repo = repo();
        assert_eq!(repo.reads(), 0);
        repo.revision(&RevisionId::from("a")).unwrap();
        repo.resolve("main").unwrap();
        assert_eq!(repo.reads(), 2);
    }
}
