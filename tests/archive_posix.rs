#![cfg(unix)]

mod support;

use zip2commit::{
    archive_commit, emit::PosixEmitter, ArchiveRequest, ExecutionMode, RunOutcome, SystemRunner,
    Toolset,
};

fn posix_toolset() -> Option<Toolset> {
    if !support::have_git() || !support::have_bin("zip") {
        return None;
    }
    let bash = which::which("bash").ok()?;
    Some(Toolset::Posix(PosixEmitter::new(bash)))
}

fn run_with(mode: ExecutionMode) {
    let Some(toolset) = posix_toolset() else {
        eprintln!("skipping: git, bash or zip not found in PATH");
        return;
    };
    let td = tempfile::tempdir().expect("tmpdir");
    let repo = td.path();
    let sha = support::repo_with_feature_commit(repo);
    let req = ArchiveRequest {
        commit: sha,
        workspace_root: repo.to_path_buf(),
        toolset,
        mode,
        shell: None,
    };

    let outcome = archive_commit(&SystemRunner, &req, |_| {}).expect("archive run");

    match outcome {
        RunOutcome::Archived { path, files, .. } => {
            assert_eq!(files, vec!["a.txt", "dir/b.txt"]);
            assert_eq!(support::zip_entries(&path), vec!["a.txt", "dir/b.txt"]);
        }
        other => panic!("expected Archived, got {other:?}"),
    }
    assert_eq!(support::current_branch(repo), "main");
}

#[test]
fn test_posix_steps_archive_feature_commit() {
    run_with(ExecutionMode::Steps);
}

#[test]
fn test_posix_script_archive_feature_commit() {
    run_with(ExecutionMode::Script);
}

#[test]
fn test_posix_script_reports_nothing_to_compress() {
    let Some(toolset) = posix_toolset() else {
        eprintln!("skipping: git, bash or zip not found in PATH");
        return;
    };
    let td = tempfile::tempdir().expect("tmpdir");
    let repo = td.path();
    support::init_repo_with_default_user(repo).expect("init");
    support::commit_files(repo, &[("README.md", "hello\n")], "init");
    support::git(repo, &["checkout", "-q", "-b", "topic"]);
    let sha = support::commit_files(repo, &[("gone.txt", "x\n")], "add");
    support::remove_and_commit(repo, &["gone.txt"], "remove");
    support::git(repo, &["checkout", "-q", "main"]);

    let req = ArchiveRequest {
        commit: sha,
        workspace_root: repo.to_path_buf(),
        toolset,
        mode: ExecutionMode::Script,
        shell: None,
    };
    let outcome = archive_commit(&SystemRunner, &req, |_| {}).expect("archive run");

    match outcome {
        RunOutcome::NothingToCompress { warnings, .. } => {
            assert_eq!(warnings.len(), 1);
            assert!(warnings[0].is_missing());
        }
        other => panic!("expected NothingToCompress, got {other:?}"),
    }
    assert!(!repo.join("topic.zip").exists());
    assert_eq!(support::current_branch(repo), "main");
}

#[test]
fn test_symlinks_are_skipped_by_every_toolset() {
    let Some(toolset) = posix_toolset() else {
        eprintln!("skipping: git, bash or zip not found in PATH");
        return;
    };
    let td = tempfile::tempdir().expect("tmpdir");
    let repo = td.path();
    support::init_repo_with_default_user(repo).expect("init");
    support::commit_files(repo, &[("README.md", "hello\n")], "init");
    support::git(repo, &["checkout", "-q", "-b", "links"]);
    std::fs::write(repo.join("real.txt"), "real\n").expect("write");
    std::os::unix::fs::symlink("real.txt", repo.join("link.txt")).expect("symlink");
    support::git(repo, &["add", "--", "real.txt", "link.txt"]);
    support::git(repo, &["commit", "-q", "-m", "links"]);
    let sha = support::git(repo, &["rev-parse", "HEAD"]);
    support::git(repo, &["checkout", "-q", "main"]);

    let runs = [
        (Toolset::Native, ExecutionMode::Steps),
        (toolset.clone(), ExecutionMode::Steps),
        (toolset, ExecutionMode::Script),
    ];
    for (toolset, mode) in runs {
        let name = format!("{} {:?}", toolset.name(), mode);
        let req = ArchiveRequest {
            commit: sha.clone(),
            workspace_root: repo.to_path_buf(),
            toolset,
            mode,
            shell: None,
        };
        let outcome = archive_commit(&SystemRunner, &req, |_| {}).expect("archive run");
        match outcome {
            RunOutcome::Archived { path, warnings, .. } => {
                assert_eq!(support::zip_entries(&path), vec!["real.txt"], "{name}");
                assert_eq!(warnings.len(), 1, "{name}: {warnings:?}");
                assert_eq!(warnings[0].path, "link.txt", "{name}");
                assert!(warnings[0].is_missing(), "{name}");
            }
            other => panic!("{name}: expected Archived, got {other:?}"),
        }
        assert_eq!(support::current_branch(repo), "main", "{name}");
    }
}
