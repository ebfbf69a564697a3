//! [`Repository`] backed by the `git` command line.

use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::DateTime;

use crate::history::{HistoryError, HistoryResult, Repository, Revision, RevisionId};

/// Field separator in `git show` output. Cannot occur in names or ids.
const FIELD_SEP: char = '\x1f';
const SHOW_FORMAT: &str = "--format=%H%x1f%P%x1f%an <%ae>%x1f%ct%x1f%B";

/// Reads revisions from a local git checkout by running `git`.
#[derive(Debug, Clone)]
pub struct GitCliRepository {
    dir: PathBuf,
}

impl GitCliRepository {
    /// Open the repository containing `dir`.
    ///
    /// Fails if `dir` is not inside a git work tree or git is not available.
    pub fn open(dir: impl Into<PathBuf>) -> HistoryResult<Self> {
        let repo = Self { dir: dir.into() };
        if !is_git_repo(&repo.dir) {
            return Err(HistoryError::RepositoryAccess(format!(
                "not a git repository: {}",
                repo.dir.display()
            )));
        }
        Ok(repo)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn git(&self, args: &[&str]) -> HistoryResult<std::process::Output> {
        Command::new("git")
            .args(args)
            .current_dir(&self.dir)
            .output()
            .map_err(|e| HistoryError::RepositoryAccess(format!("failed to run git: {e}")))
    }

    fn rev_parse(&self, reference: &str) -> HistoryResult<Option<RevisionId>> {
        let spec = format!("{reference}^{{commit}}");
        let output = self.git(&["rev-parse", "--verify", "--quiet", &spec])?;
        if !output.status.success() {
            return Ok(None);
        }
        let sha = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok((!sha.is_empty()).then(|| RevisionId::new(sha)))
    }
}

impl Repository for GitCliRepository {
    fn resolve(&self, reference: &str) -> HistoryResult<Revision> {
        if reference.is_empty() || reference.starts_with('-') {
            return Err(HistoryError::InvalidReference(reference.to_string()));
        }
        let id = self
            .rev_parse(reference)?
            .ok_or_else(|| HistoryError::InvalidReference(reference.to_string()))?;
        Ok(self.revision(&id)?.with_context_reference(reference))
    }

    fn revision(&self, id: &RevisionId) -> HistoryResult<Revision> {
        let output = self.git(&["show", "-s", SHOW_FORMAT, id.as_str()])?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("unknown revision") || stderr.contains("bad object") {
                return Err(HistoryError::RevisionNotFound(id.clone()));
            }
            return Err(HistoryError::RepositoryAccess(format!(
                "git show {id} failed: {}",
                stderr.trim()
            )));
        }
        parse_show(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Parse one record of [`SHOW_FORMAT`].
fn parse_show(stdout: &str) -> HistoryResult<Revision> {
    let malformed = || HistoryError::RepositoryAccess(format!("unexpected git output: {stdout:?}"));
    let mut fields = stdout.splitn(5, FIELD_SEP);
    let (Some(sha), Some(parents), Some(author), Some(time), Some(message)) = (
        fields.next(),
        fields.next(),
        fields.next(),
        fields.next(),
        fields.next(),
    ) else {
        return Err(malformed());
    };
    let secs: i64 = time.trim().parse().map_err(|_| malformed())?;
    let timestamp = DateTime::from_timestamp(secs, 0).ok_or_else(malformed)?;
    Ok(Revision::new(sha.trim(), timestamp)
        .with_parents(parents.split_whitespace())
        .with_author(author)
        .with_message(message.trim_end_matches('\n')))
}

/// Check whether a directory is inside a git work tree.
pub fn is_git_repo(dir: &Path) -> bool {
    Command::new("git")
        .args(["rev-parse", "--is-inside-work-tree"])
        .current_dir(dir)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{RevisionReader, RevisionWalker};
    use std::process::Command as StdCommand;

    fn run_git(repo_dir: &Path, args: &[&str]) -> String {
        let output = StdCommand::new("git")
            .args(args)
            .current_dir(repo_dir)
            .output()
            .unwrap();
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    fn make_git_repo() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        run_git(dir.path(), &["init"]);
        run_git(dir.path(), &["config", "user.name", "test-user"]);
        run_git(dir.path(), &["config", "user.email", "test@example.com"]);
        run_git(dir.path(), &["commit", "--allow-empty", "-m", "initial"]);
        dir
    }

    fn commit(repo_dir: &Path, message: &str) -> String {
        run_git(repo_dir, &["commit", "--allow-empty", "-m", message]);
        run_git(repo_dir, &["rev-parse", "HEAD"])
    }

    #[test]
    fn open_fails_outside_repo() {
        let dir = tempfile::tempdir().unwrap();
        let err = GitCliRepository::open(dir.path()).unwrap_err();
        assert!(err.is_repository_error());
    }

    #[test]
    fn resolve_head_reads_metadata() {
        let dir = make_git_repo();
        let sha = commit(dir.path(), "second\n\nGitOrigin-RevId: abc");
        let repo = GitCliRepository::open(dir.path()).unwrap();

        let head = repo.resolve("HEAD").unwrap();
        assert_eq!(head.id.as_str(), sha);
        assert_eq!(head.parents.len(), 1);
        assert_eq!(head.author, "test-user <test@example.com>");
        assert_eq!(head.context_reference.as_deref(), Some("HEAD"));
        assert_eq!(head.label_values("GitOrigin-RevId"), vec!["abc"]);
    }

    #[test]
    fn resolve_unknown_reference_is_invalid() {
        let dir = make_git_repo();
        let repo = GitCliRepository::open(dir.path()).unwrap();
        assert!(matches!(
            repo.resolve("no-such-branch").unwrap_err(),
            HistoryError::InvalidReference(_)
        ));
        assert!(matches!(
            repo.resolve("--all").unwrap_err(),
            HistoryError::InvalidReference(_)
        ));
    }

    #[test]
    fn walk_and_baseline_over_real_history() {
        let dir = make_git_repo();
        let second = commit(dir.path(), "second");
        commit(dir.path(), "third");
        let repo = GitCliRepository::open(dir.path()).unwrap();

        let head = repo.resolve("HEAD").unwrap();
        let messages: Vec<String> = RevisionWalker::new(&repo)
            .collect(&head)
            .unwrap()
            .into_iter()
            .map(|r| r.message)
            .collect();
        assert_eq!(messages, ["third", "second", "initial"]);

        let reader = RevisionReader::gerrit(repo);
        assert_eq!(reader.find_baseline(&head).unwrap().id.as_str(), second);
    }

    #[test]
    fn single_commit_has_no_baseline() {
        let dir = make_git_repo();
        let reader = RevisionReader::gerrit(GitCliRepository::open(dir.path()).unwrap());
        let head = reader.resolve("HEAD").unwrap();
        let err = reader.find_baseline(&head).unwrap_err();
        assert!(matches!(err, HistoryError::BaselineNotFound { .. }));
    }

    #[test]
    fn parse_show_rejects_garbage() {
        assert!(parse_show("not a record").is_err());
    }
}
