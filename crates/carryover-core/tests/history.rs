//! Integration tests for history walks and baseline resolution.

use carryover_core::history::{GerritChange, LabelIdentity, SkipStartVisitor};
use carryover_core::{
    find_baseline, find_baseline_without_label, HistoryError, MemoryRepository, Repository,
    Revision, RevisionReader, RevisionWalker, Sorting, VisitResult, WalkOptions,
};
use chrono::{DateTime, Utc};

fn ts(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
}

//      b
//    /   \
//  a       d - e
//    \   /
//      c
fn diamond() -> MemoryRepository {
    let mut repo = MemoryRepository::from_revisions([
        Revision::new("a", ts(0)).with_message("Import\n\nGitOrigin-RevId: origin-a\n"),
        Revision::new("b", ts(10)).with_parents(["a"]),
        Revision::new("c", ts(20)).with_parents(["a"]),
        Revision::new("d", ts(30))
            .with_parents(["b", "c"])
            .with_message("Merge\n\nChange-Id: Id\n"),
        Revision::new("e", ts(40)).with_parents(["d"]),
    ]);
    repo.set_ref("main", "e");
    repo
}

fn walk_ids(repo: &MemoryRepository, options: WalkOptions, start: &str) -> Vec<String> {
    let start = repo.resolve(start).unwrap();
    RevisionWalker::with_options(repo, options)
        .collect(&start)
        .unwrap()
        .into_iter()
        .map(|r| r.id.to_string())
        .collect()
}

#[test]
fn diamond_visits_shared_ancestor_once() {
    let repo = diamond();
    for sorting in [Sorting::Topological, Sorting::ByCommitTime] {
        let options = WalkOptions {
            sorting,
            ..WalkOptions::default()
        };
        let ids = walk_ids(&repo, options, "d");
        assert_eq!(ids, ["d", "c", "b", "a"], "sorting {sorting:?}");
        assert_eq!(ids.iter().filter(|id| *id == "a").count(), 1);
    }
}

#[test]
fn first_parent_skips_merged_side() {
    let repo = diamond();
    let options = WalkOptions {
        first_parent: true,
        ..WalkOptions::default()
    };
    assert_eq!(walk_ids(&repo, options, "main"), ["e", "d", "b", "a"]);
}

#[test]
fn visitor_terminates_walk() {
    let repo = diamond();
    let start = repo.resolve("main").unwrap();
    let mut visited = Vec::new();
    let summary = RevisionWalker::new(&repo)
        .visit_changes(&start, &mut |revision: &Revision| {
            visited.push(revision.id.to_string());
            if revision.is_merge() {
                VisitResult::Terminate
            } else {
                VisitResult::Continue
            }
        })
        .unwrap();
    assert!(summary.terminated);
    assert_eq!(visited, ["e", "d"]);
}

#[test]
fn baseline_without_label_is_next_revision() {
    let repo = diamond();
    let walker = RevisionWalker::new(&repo);

    let e = repo.resolve("main").unwrap();
    assert_eq!(find_baseline_without_label(&walker, &e).unwrap().id.as_str(), "d");

    let d = repo.resolve("d").unwrap();
    let mut visitor = SkipStartVisitor::new();
    walker.visit_changes(&d, &mut visitor).unwrap();
    assert_eq!(visitor.into_found().unwrap().id.as_str(), "c");
}

#[test]
fn single_revision_history_has_no_baseline() {
    let repo = MemoryRepository::from_revisions([Revision::new("root", ts(0))]);
    let root = repo.resolve("root").unwrap();
    let err = find_baseline_without_label(&RevisionWalker::new(&repo), &root).unwrap_err();
    assert!(matches!(err, HistoryError::BaselineNotFound { .. }));
    let message = err.to_string();
    assert!(message.contains("just one commit"), "{message}");
    assert!(message.contains("root"), "{message}");
}

#[test]
fn label_baseline_through_merge() {
    let repo = diamond();
    let start = repo.resolve("main").unwrap();
    let baseline = find_baseline(&RevisionWalker::new(&repo), &start, "GitOrigin-RevId").unwrap();
    assert_eq!(baseline.revision.id.as_str(), "a");
    assert_eq!(baseline.origin_reference, "origin-a");
}

#[test]
fn repository_failure_propagates_unchanged() {
    let mut repo = diamond();
    repo.make_unreadable("c");
    let start = repo.resolve("main").unwrap();
    let err = find_baseline(&RevisionWalker::new(&repo), &start, "GitOrigin-RevId").unwrap_err();
    assert!(err.is_repository_error());
    assert!(matches!(err, HistoryError::RepositoryAccess(_)));
}

#[test]
fn reader_with_injected_strategies() {
    let mut repo = diamond();
    repo.set_ref("refs/changes/07/1007/2", "e");
    let reader = RevisionReader::new(
        repo,
        carryover_core::history::SkipStart,
        LabelIdentity::new("Change-Id"),
    );
    let e = reader.resolve("refs/changes/07/1007/2").unwrap();
    let d = reader.find_baseline(&e).unwrap();
    assert_eq!(d.id.as_str(), "d");
    assert_eq!(reader.group_identity(&d).as_deref(), Some("Id"));
    assert_eq!(reader.group_identity(&e), None);
    assert_eq!(
        GerritChange::change_number(e.context_reference.as_deref().unwrap()),
        Some("1007")
    );
}

#[test]
fn changes_since_baseline() {
    let reader = RevisionReader::git(diamond());
    let main = reader.resolve("main").unwrap();
    let baseline = reader.find_baseline(&main).unwrap();
    let ids: Vec<String> = reader
        .changes(Some(&baseline), &main)
        .unwrap()
        .into_iter()
        .map(|r| r.id.to_string())
        .collect();
    assert_eq!(ids, ["b", "c", "d", "e"]);
}

#[test]
fn baseline_reads_only_what_it_needs() {
    let mut repo = MemoryRepository::from_revisions((0..5000).map(|i| {
        let parents: Vec<String> = if i == 0 { vec![] } else { vec![format!("r{}", i - 1)] };
        Revision::new(format!("r{i}"), ts(i)).with_parents(parents)
    }));
    repo.make_unreadable("r0");
    let start = repo.resolve("r4999").unwrap();
    let before = repo.reads();

    let baseline = find_baseline_without_label(&RevisionWalker::new(&repo), &start).unwrap();
    assert_eq!(baseline.id.as_str(), "r4998");
    assert_eq!(repo.reads() - before, 1);
}
