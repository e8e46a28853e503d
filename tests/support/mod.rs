/*!
Test support helpers shared across integration tests.

- have_git(): check git availability on PATH
- have_bin(bin): check any other tool on PATH
- init_repo_with_default_user(dir): initialize a git repo on `main` with a default identity
- commit_files / remove_and_commit / git: small porcelain wrappers for building fixtures

These helpers do not print skip messages themselves so tests can keep their own
"skipping: ..." outputs.
*/

use std::io;
use std::path::Path;
use std::process::{Command, Stdio};

/// Return true if `git` is available on PATH.
#[allow(dead_code)]
pub fn have_git() -> bool {
    Command::new("git")
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[allow(dead_code)]
pub fn have_bin(bin: &str) -> bool {
    which::which(bin).is_ok()
}

/// Run git in `dir`, panicking with its stderr on failure. Returns trimmed stdout.
#[allow(dead_code)]
pub fn git(dir: &Path, args: &[&str]) -> String {
    let out = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("spawn git");
    assert!(
        out.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&out.stderr)
    );
    String::from_utf8_lossy(&out.stdout).trim().to_string()
}

/// Initialize a git repository at `dir` on branch `main` and set a default user identity.
#[allow(dead_code)]
pub fn init_repo_with_default_user(dir: &Path) -> io::Result<()> {
    std::fs::create_dir_all(dir)?;
    let quiet = |args: &[&str]| {
        let _ = Command::new("git")
            .args(args)
            .current_dir(dir)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
    };
    quiet(&["init", "-q"]);
    // Older git has no `init -b`; pin the unborn branch name instead.
    quiet(&["symbolic-ref", "HEAD", "refs/heads/main"]);
    quiet(&["config", "user.name", "Zip2commit Test"]);
    quiet(&["config", "user.email", "zip2commit@example.com"]);
    quiet(&["config", "commit.gpgsign", "false"]);
    Ok(())
}

/// Write `files` as (path, contents), stage them and commit. Returns the new HEAD sha.
#[allow(dead_code)]
pub fn commit_files(dir: &Path, files: &[(&str, &str)], message: &str) -> String {
    for (rel, body) in files {
        let p = dir.join(rel);
        if let Some(parent) = p.parent() {
            std::fs::create_dir_all(parent).expect("mkdir");
        }
        std::fs::write(&p, body).expect("write fixture");
        git(dir, &["add", "--", rel]);
    }
    git(dir, &["commit", "-q", "-m", message]);
    git(dir, &["rev-parse", "HEAD"])
}

#[allow(dead_code)]
pub fn remove_and_commit(dir: &Path, files: &[&str], message: &str) -> String {
    for rel in files {
        git(dir, &["rm", "-q", "--", rel]);
    }
    git(dir, &["commit", "-q", "-m", message]);
    git(dir, &["rev-parse", "HEAD"])
}

/// Repo with `main` (README) and `feature/x` holding one commit that touches a.txt and dir/b.txt.
/// Leaves `main` checked out and returns the feature commit sha.
#[allow(dead_code)]
pub fn repo_with_feature_commit(dir: &Path) -> String {
    init_repo_with_default_user(dir).expect("init repo");
    commit_files(dir, &[("README.md", "hello\n")], "init");
    git(dir, &["checkout", "-q", "-b", "feature/x"]);
    let sha = commit_files(
        dir,
        &[("a.txt", "alpha\n"), ("dir/b.txt", "bravo\n")],
        "feature work",
    );
    git(dir, &["checkout", "-q", "main"]);
    sha
}

/// File entry names of the archive at `path`, sorted.
#[allow(dead_code)]
pub fn zip_entries(path: &Path) -> Vec<String> {
    let f = std::fs::File::open(path).expect("open archive");
    let mut z = zip::ZipArchive::new(f).expect("read archive");
    let mut names: Vec<String> = (0..z.len())
        .map(|i| z.by_index(i).expect("entry").name().to_string())
        .filter(|n| !n.ends_with('/'))
        .collect();
    names.sort();
    names
}

#[allow(dead_code)]
pub fn current_branch(dir: &Path) -> String {
    git(dir, &["rev-parse", "--abbrev-ref", "HEAD"])
}
