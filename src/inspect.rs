//! Read-only git queries: commit existence, current branch, containing branches, changed files.
//!
//! Every query runs `git` in the repository working directory through a `CommandRunner`, so
//! tests can substitute a scripted runner.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::errors::ArchiveError;
use crate::util::exec::is_not_found;
use crate::{CommandRunner, ExecOutput, Invocation};

/// Ordered, de-duplicated repository-relative paths changed by one commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangedFileSet {
    paths: Vec<String>,
}

impl ChangedFileSet {
    /// Collapse duplicates (e.g. the same path against several merge parents), keeping first-seen order.
    pub fn from_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for p in paths {
            let p = p.into();
            if p.is_empty() {
                continue;
            }
            if seen.insert(p.clone()) {
                out.push(p);
            }
        }
        Self { paths: out }
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Query surface over one repository.
pub struct RepositoryInspector<'r> {
    runner: &'r dyn CommandRunner,
    repo: PathBuf,
}

impl<'r> RepositoryInspector<'r> {
    pub fn new(runner: &'r dyn CommandRunner, repo: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            repo: repo.into(),
        }
    }

    pub fn repo(&self) -> &Path {
        &self.repo
    }

    fn git(&self, args: &[&str]) -> Result<ExecOutput, ArchiveError> {
        let inv = Invocation::new("git").args(args).cwd(&self.repo);
        self.runner.run(&inv).map_err(|e| {
            if is_not_found(&e) {
                ArchiveError::BackendUnavailable("git not found in PATH".to_string())
            } else {
                ArchiveError::BackendUnavailable(format!("{e:#}"))
            }
        })
    }

    /// Fail with BackendUnavailable unless the directory is inside a git work tree.
    pub fn ensure_repository(&self) -> Result<(), ArchiveError> {
        let out = self.git(&["rev-parse", "--is-inside-work-tree"])?;
        if out.success() && out.stdout.trim() == "true" {
            Ok(())
        } else {
            Err(ArchiveError::BackendUnavailable(format!(
                "{} is not a git repository: {}",
                self.repo.display(),
                out.diagnostic()
            )))
        }
    }

    /// Top-level directory of the work tree containing `repo`.
    pub fn toplevel(&self) -> Result<PathBuf, ArchiveError> {
        let out = self.git(&["rev-parse", "--show-toplevel"])?;
        let s = out.stdout.trim();
        if !out.success() || s.is_empty() {
            return Err(ArchiveError::BackendUnavailable(format!(
                "{} is not a git repository: {}",
                self.repo.display(),
                out.diagnostic()
            )));
        }
        Ok(PathBuf::from(s))
    }

    /// Absolute path of the git directory (holds the run lock).
    pub fn git_dir(&self) -> Result<PathBuf, ArchiveError> {
        let out = self.git(&["rev-parse", "--absolute-git-dir"])?;
        let s = out.stdout.trim();
        if !out.success() || s.is_empty() {
            return Err(ArchiveError::BackendUnavailable(out.diagnostic()));
        }
        Ok(PathBuf::from(s))
    }

    /// Resolve `commit` to the full id of an existing commit, once.
    ///
    /// `Ok(None)` for a missing commit (never an error). Later steps use the returned id, so
    /// `HEAD`-relative input is not re-evaluated after a checkout.
    pub fn resolve_commit(&self, commit: &str) -> Result<Option<String>, ArchiveError> {
        self.ensure_repository()?;
        // A leading dash would be parsed as an option, and no ref or hash can start with one.
        if commit.is_empty()
            || commit.starts_with('-')
            || crate::reject_newlines(commit, "commit").is_err()
        {
            return Ok(None);
        }
        let spec = format!("{commit}^{{commit}}");
        let out = self.git(&["rev-parse", "--verify", "--quiet", &spec])?;
        let id = out.stdout.trim();
        if !out.success() || id.is_empty() {
            return Ok(None);
        }
        tracing::debug!(input = commit, commit = id, "commit resolved");
        Ok(Some(id.to_string()))
    }

    /// Does `commit` name an existing commit? Never an error for a missing commit.
    pub fn commit_exists(&self, commit: &str) -> Result<bool, ArchiveError> {
        Ok(self.resolve_commit(commit)?.is_some())
    }

    /// Name of the checked-out branch; detached HEAD or an unborn branch is an error.
    pub fn current_branch(&self) -> Result<String, ArchiveError> {
        let out = self.git(&["rev-parse", "--abbrev-ref", "HEAD"])?;
        let name = out.stdout.trim();
        if !out.success() || name.is_empty() || name == "HEAD" {
            tracing::debug!(stderr = %out.stderr.trim(), "current branch unresolvable");
            return Err(ArchiveError::DetachedOrUnresolvable);
        }
        Ok(name.to_string())
    }

    /// Every local branch whose history contains `commit`, in git's (ref) order.
    pub fn branches_containing(&self, commit: &str) -> Result<Vec<String>, ArchiveError> {
        let out = self.git(&[
            "branch",
            "--contains",
            commit,
            "--format=%(refname:short)",
        ])?;
        if !out.success() {
            return Err(ArchiveError::BackendUnavailable(format!(
                "git branch --contains {commit} failed: {}",
                out.diagnostic()
            )));
        }
        let branches: Vec<String> = out
            .stdout
            .lines()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
        tracing::debug!(commit, ?branches, "branches containing commit");
        if branches.is_empty() {
            return Err(ArchiveError::NoContainingBranch(commit.to_string()));
        }
        Ok(branches)
    }

    /// Source branch for `commit`: the first containing branch.
    ///
    /// This is a fixed tie-break, not a "best branch" choice: when history is shared by many
    /// branches the first one in ref order wins, which may not be the one the user expects.
    pub fn source_branch(&self, commit: &str) -> Result<String, ArchiveError> {
        let branches = self.branches_containing(commit)?;
        let first = branches
            .into_iter()
            .next()
            .ok_or_else(|| ArchiveError::NoContainingBranch(commit.to_string()))?;
        tracing::info!(commit, branch = %first, "selected source branch");
        Ok(first)
    }

    /// Paths changed by `commit` against each of its parents (root commits included).
    pub fn changed_files(&self, commit: &str) -> Result<ChangedFileSet, ArchiveError> {
        let out = self.git(&[
            "diff-tree",
            "--no-commit-id",
            "--name-only",
            "-r",
            "-m",
            "--root",
            "-z",
            commit,
        ])?;
        if !out.success() {
            return Err(ArchiveError::BackendUnavailable(format!(
                "git diff-tree {commit} failed: {}",
                out.diagnostic()
            )));
        }
        let set = parse_name_list_z(&out.stdout);
        tracing::debug!(commit, files = set.len(), "changed files listed");
        Ok(set)
    }
}

/// Parse NUL-separated `--name-only -z` output.
pub fn parse_name_list_z(raw: &str) -> ChangedFileSet {
    ChangedFileSet::from_paths(raw.split('\0').map(|s| s.trim_end_matches(['\n', '\r'])))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Replies to git invocations by matching a prefix of the argument list.
    struct Scripted {
        replies: Vec<(&'static str, ExecOutput)>,
        calls: Mutex<Vec<Vec<String>>>,
    }

    impl Scripted {
        fn new(replies: Vec<(&'static str, ExecOutput)>) -> Self {
            Self {
                replies,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl CommandRunner for Scripted {
        fn run(&self, inv: &Invocation) -> anyhow::Result<ExecOutput> {
            let argv = inv.argv();
            self.calls.lock().unwrap().push(argv.clone());
            let line = argv[1..].join(" ");
            for (prefix, out) in &self.replies {
                if line.starts_with(prefix) {
                    return Ok(out.clone());
                }
            }
            Ok(ExecOutput {
                code: Some(1),
                ..ExecOutput::default()
            })
        }
    }

    fn ok(stdout: &str) -> ExecOutput {
        ExecOutput {
            code: Some(0),
            stdout: stdout.to_string(),
            ..ExecOutput::default()
        }
    }

    fn fail(stderr: &str) -> ExecOutput {
        ExecOutput {
            code: Some(128),
            stderr: stderr.to_string(),
            ..ExecOutput::default()
        }
    }

    #[test]
    fn test_changed_file_set_dedupes_in_order() {
        let set = ChangedFileSet::from_paths(["b.txt", "a.txt", "b.txt", "", "dir/c.txt"]);
        assert_eq!(set.paths(), &["b.txt", "a.txt", "dir/c.txt"]);
    }

    #[test]
    fn test_parse_name_list_z_handles_spaces_and_trailing_nul() {
        let set = parse_name_list_z("a b.txt\0dir/\u{fc}.txt\0a b.txt\0");
        assert_eq!(set.paths(), &["a b.txt", "dir/\u{fc}.txt"]);
    }

    #[test]
    fn test_first_containing_branch_wins() {
        let r = Scripted::new(vec![("branch", ok("feature/x\nmain\n"))]);
        let i = RepositoryInspector::new(&r, "/repo");
        assert_eq!(i.source_branch("abc123").unwrap(), "feature/x");
    }

    #[test]
    fn test_no_containing_branch_is_error() {
        let r = Scripted::new(vec![("branch", ok("\n"))]);
        let i = RepositoryInspector::new(&r, "/repo");
        match i.branches_containing("abc123") {
            Err(ArchiveError::NoContainingBranch(c)) => assert_eq!(c, "abc123"),
            other => panic!("expected NoContainingBranch, got {other:?}"),
        }
    }

    #[test]
    fn test_detached_head_is_unresolvable() {
        let r = Scripted::new(vec![("rev-parse", ok("HEAD\n"))]);
        let i = RepositoryInspector::new(&r, "/repo");
        assert!(matches!(
            i.current_branch(),
            Err(ArchiveError::DetachedOrUnresolvable)
        ));
    }

    #[test]
    fn test_commit_exists_false_for_missing_commit() {
        let r = Scripted::new(vec![
            ("rev-parse --is-inside-work-tree", ok("true\n")),
            ("rev-parse --verify", fail("")),
        ]);
        let i = RepositoryInspector::new(&r, "/repo");
        assert!(!i.commit_exists("deadbeef").unwrap());
    }

    #[test]
    fn test_resolve_commit_returns_full_id() {
        let sha = "0123456789abcdef0123456789abcdef01234567";
        let r = Scripted::new(vec![
            ("rev-parse --is-inside-work-tree", ok("true\n")),
            ("rev-parse --verify --quiet HEAD~1^{commit}", ok(&format!("{sha}\n"))),
        ]);
        let i = RepositoryInspector::new(&r, "/repo");
        assert_eq!(i.resolve_commit("HEAD~1").unwrap().as_deref(), Some(sha));
    }

    #[test]
    fn test_commit_exists_rejects_option_like_input_without_running_git() {
        let r = Scripted::new(vec![
            ("rev-parse --is-inside-work-tree", ok("true\n")),
            ("rev-parse --verify", ok("0123abcd\n")),
        ]);
        let i = RepositoryInspector::new(&r, "/repo");
        assert!(!i.commit_exists("--all").unwrap());
        let calls = r.calls.lock().unwrap();
        assert!(
            calls.iter().all(|c| !c.contains(&"--verify".to_string())),
            "{calls:?}"
        );
    }

    #[test]
    fn test_not_a_repository_is_backend_unavailable() {
        let r = Scripted::new(vec![("rev-parse", fail("fatal: not a git repository"))]);
        let i = RepositoryInspector::new(&r, "/tmp");
        assert!(matches!(
            i.commit_exists("abc"),
            Err(ArchiveError::BackendUnavailable(_))
        ));
    }
}
