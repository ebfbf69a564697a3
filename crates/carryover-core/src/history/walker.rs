//! Deduplicated, visitor-driven walks over a revision DAG.
//!
//! The start revision is always visited first. Every revision reachable from
//! it is visited at most once, however many merge paths lead to it, and the
//! walk stops as soon as the visitor returns [`VisitResult::Terminate`].

use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::HistoryResult;
use super::repository::Repository;
use super::revision::{Revision, RevisionId};
use crate::obs;

/// Returned by a visitor for each revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitResult {
    Continue,
    Terminate,
}

/// Receives revisions in walk order.
pub trait ChangeVisitor {
    fn visit(&mut self, revision: &Revision) -> VisitResult;
}

impl<F> ChangeVisitor for F
where
    F: FnMut(&Revision) -> VisitResult,
{
    fn visit(&mut self, revision: &Revision) -> VisitResult {
        self(revision)
    }
}

/// Order in which reachable revisions are handed to the visitor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sorting {
    /// Children strictly before parents, newest first among revisions whose
    /// children have all been visited. Reads ahead only past merges, until
    /// the branches meet again.
    #[default]
    Topological,
    /// Newest first, reading parents only as revisions are visited. Children
    /// come before parents as long as commit times do not go backwards.
    ByCommitTime,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalkOptions {
    pub sorting: Sorting,
    /// Follow only the first parent of every revision.
    pub first_parent: bool,
    /// Stop after this many visits.
    pub limit: Option<usize>,
}

/// What a finished walk did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkSummary {
    pub visited: usize,
    /// The visitor asked to stop.
    pub terminated: bool,
}

/// Heap entry: newest timestamp first, then discovery order.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Ready {
    timestamp: DateTime<Utc>,
    order: Reverse<usize>,
}

impl Ready {
    fn new(revision: &Revision, index: usize) -> Self {
        Self {
            timestamp: revision.timestamp,
            order: Reverse(index),
        }
    }

    fn index(&self) -> usize {
        self.order.0
    }
}

/// Walks history of a [`Repository`].
///
/// The walker borrows nothing mutable and keeps no state between walks, so
/// one instance can serve any number of resolve calls.
#[derive(Debug, Clone)]
pub struct RevisionWalker<R> {
    repo: R,
    options: WalkOptions,
}

impl<R: Repository> RevisionWalker<R> {
    pub fn new(repo: R) -> Self {
        Self::with_options(repo, WalkOptions::default())
    }

    pub fn with_options(repo: R, options: WalkOptions) -> Self {
        Self { repo, options }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn options(&self) -> WalkOptions {
        self.options
    }

    /// Visit `start`, then its ancestors, until the history is exhausted,
    /// the limit is hit, or the visitor terminates.
    pub fn visit_changes<V>(&self, start: &Revision, visitor: &mut V) -> HistoryResult<WalkSummary>
    where
        V: ChangeVisitor + ?Sized,
    {
        let summary = match self.options.sorting {
            Sorting::Topological => self.walk_topological(start, visitor)?,
            Sorting::ByCommitTime => self.walk_by_commit_time(start, visitor)?,
        };
        obs::emit_walk_finished(&start.id, summary.visited, summary.terminated);
        Ok(summary)
    }

    /// Every revision the walk would visit, in order.
    pub fn collect(&self, start: &Revision) -> HistoryResult<Vec<Revision>> {
        let mut revisions = Vec::new();
        self.visit_changes(start, &mut |revision: &Revision| {
            revisions.push(revision.clone());
            VisitResult::Continue
        })?;
        Ok(revisions)
    }

    fn parent_ids<'r>(&self, revision: &'r Revision) -> &'r [RevisionId] {
        if self.options.first_parent {
            &revision.parents[..revision.parents.len().min(1)]
        } else {
            &revision.parents
        }
    }

    fn parents(&self, revision: &Revision) -> HistoryResult<Vec<Revision>> {
        if self.options.first_parent {
            return self
                .parent_ids(revision)
                .iter()
                .map(|id| self.repo.revision(id))
                .collect();
        }
        self.repo.parents_of(revision)
    }

    /// Records one visit and reports whether the walk must stop.
    fn visit_one<V>(&self, revision: &Revision, visitor: &mut V, summary: &mut WalkSummary) -> bool
    where
        V: ChangeVisitor + ?Sized,
    {
        summary.visited += 1;
        if visitor.visit(revision) == VisitResult::Terminate {
            summary.terminated = true;
            return true;
        }
        self.options.limit.is_some_and(|limit| summary.visited >= limit)
    }

    fn walk_by_commit_time<V>(&self, start: &Revision, visitor: &mut V) -> HistoryResult<WalkSummary>
    where
        V: ChangeVisitor + ?Sized,
    {
        let mut summary = WalkSummary::default();
        if self.options.limit == Some(0) {
            return Ok(summary);
        }
        let mut nodes = vec![start.clone()];
        let mut seen: HashSet<RevisionId> = HashSet::from([start.id.clone()]);
        let mut heap = BinaryHeap::from([Ready::new(start, 0)]);

        while let Some(ready) = heap.pop() {
            let index = ready.index();
            if self.visit_one(&nodes[index], visitor, &mut summary) {
                break;
            }
            for parent in self.parents(&nodes[index])? {
                if !seen.insert(parent.id.clone()) {
                    continue;
                }
                let parent_index = nodes.len();
                heap.push(Ready::new(&parent, parent_index));
                nodes.push(parent);
            }
        }
        Ok(summary)
    }

    fn walk_topological<V>(&self, start: &Revision, visitor: &mut V) -> HistoryResult<WalkSummary>
    where
        V: ChangeVisitor + ?Sized,
    {
        let mut summary = WalkSummary::default();
        if self.options.limit == Some(0) {
            return Ok(summary);
        }
        TopoWalk::new(self, start).run(visitor, &mut summary)?;
        Ok(summary)
    }
}

/// Incremental state of a topological walk.
///
/// Parents of a revision are read right after it is visited. Before a
/// candidate is visited, only the unexpanded revisions that might still lead
/// to an undiscovered child of it are read, so linear stretches of history
/// cost one read per visit.
struct TopoWalk<'w, R> {
    walker: &'w RevisionWalker<R>,
    nodes: Vec<Revision>,
    index: HashMap<RevisionId, usize>,
    /// Parent indices, `None` until the parents are read.
    parents: Vec<Option<Vec<usize>>>,
    /// Discovered children not visited yet.
    pending: Vec<usize>,
    visited: Vec<bool>,
    unexpanded: BTreeSet<Ready>,
    ready: BinaryHeap<Ready>,
}

impl<'w, R: Repository> TopoWalk<'w, R> {
    fn new(walker: &'w RevisionWalker<R>, start: &Revision) -> Self {
        let mut walk = Self {
            walker,
            nodes: Vec::new(),
            index: HashMap::new(),
            parents: Vec::new(),
            pending: Vec::new(),
            visited: Vec::new(),
            unexpanded: BTreeSet::new(),
            ready: BinaryHeap::new(),
        };
        walk.discover(start.clone());
        walk
    }

    fn run<V>(mut self, visitor: &mut V, summary: &mut WalkSummary) -> HistoryResult<()>
    where
        V: ChangeVisitor + ?Sized,
    {
        loop {
            let current = match self.pop_ready() {
                Some(current) => current,
                None => match break_cycle(&self.nodes, &self.visited) {
                    Some(ready) => {
                        tracing::warn!(
                            revision = %self.nodes[ready.index()].id,
                            "history contains a cycle; visiting revision before its children"
                        );
                        ready.index()
                    }
                    None => return Ok(()),
                },
            };

            if let Some(blocking) = self.blocking(current) {
                // The candidate's own parents rule out most of the frontier.
                let next = if self.parents[current].is_none() {
                    current
                } else {
                    blocking
                };
                self.expand(next)?;
                self.ready.push(Ready::new(&self.nodes[current], current));
                continue;
            }

            self.mark_visited(current);
            if self.walker.visit_one(&self.nodes[current], visitor, summary) {
                return Ok(());
            }
            if self.parents[current].is_none() {
                self.expand(current)?;
            }
        }
    }

    fn discover(&mut self, revision: Revision) -> usize {
        if let Some(&existing) = self.index.get(&revision.id) {
            return existing;
        }
        let added = self.nodes.len();
        self.index.insert(revision.id.clone(), added);
        self.unexpanded.insert(Ready::new(&revision, added));
        self.ready.push(Ready::new(&revision, added));
        self.nodes.push(revision);
        self.parents.push(None);
        self.pending.push(0);
        self.visited.push(false);
        added
    }

    /// Read the parents of `current` and link them in.
    fn expand(&mut self, current: usize) -> HistoryResult<()> {
        self.unexpanded
            .remove(&Ready::new(&self.nodes[current], current));
        let ids = self.walker.parent_ids(&self.nodes[current]).to_vec();
        let mut parents = Vec::with_capacity(ids.len());
        for id in &ids {
            let parent = match self.index.get(id) {
                Some(&existing) => existing,
                None => {
                    let revision = self.walker.repo.revision(id)?;
                    self.discover(revision)
                }
            };
            if parents.contains(&parent) {
                continue;
            }
            if !self.visited[current] {
                self.pending[parent] += 1;
            }
            parents.push(parent);
        }
        self.parents[current] = Some(parents);
        Ok(())
    }

    fn mark_visited(&mut self, current: usize) {
        self.visited[current] = true;
        if let Some(parents) = &self.parents[current] {
            for &parent in parents {
                self.pending[parent] -= 1;
                if self.pending[parent] == 0 && !self.visited[parent] {
                    self.ready.push(Ready::new(&self.nodes[parent], parent));
                }
            }
        }
    }

    /// Newest unvisited revision with no unvisited child discovered so far.
    fn pop_ready(&mut self) -> Option<usize> {
        while let Some(ready) = self.ready.pop() {
            let index = ready.index();
            if !self.visited[index] && self.pending[index] == 0 {
                return Some(index);
            }
        }
        None
    }

    /// Newest unexpanded revision that might still reach a child of
    /// `candidate`. Known ancestors of the candidate cannot.
    fn blocking(&self, candidate: usize) -> Option<usize> {
        if self.unexpanded.iter().all(|ready| ready.index() == candidate) {
            return None;
        }
        let ancestors = self.known_ancestors(candidate);
        self.unexpanded
            .iter()
            .rev()
            .map(Ready::index)
            .find(|&i| i != candidate && !ancestors.contains(&i))
    }

    fn known_ancestors(&self, candidate: usize) -> HashSet<usize> {
        let mut seen = HashSet::new();
        let mut stack = vec![candidate];
        while let Some(current) = stack.pop() {
            for &parent in self.parents[current].iter().flatten() {
                if seen.insert(parent) {
                    stack.push(parent);
                }
            }
        }
        seen
    }
}

/// Newest unvisited revision, used when every remaining revision still waits
/// on a child, which only happens on cyclic metadata.
fn break_cycle(nodes: &[Revision], visited: &[bool]) -> Option<Ready> {
    nodes
        .iter()
        .enumerate()
        .filter(|(i, _)| !visited[*i])
        .map(|(i, revision)| Ready::new(revision, i))
        .max()
}
