use std::io;
use std::path::{Path, PathBuf};

use super::{embeddable, path_str, status, PlatformEmitter};
use crate::plan::ExecutionPlan;
use crate::sanitize::ShellFlavor;
use crate::{Invocation, ShellFile};

/// Copy body run as `sh -c BODY zip2commit SRC DST`; paths arrive as positional parameters.
const COPY_BODY: &str = r#"mkdir -p -- "$(dirname -- "$2")" && cp -- "$1" "$2""#;

/// POSIX shell + `zip` toolset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PosixEmitter {
    shell: PathBuf,
}

impl PosixEmitter {
    pub fn new(shell: impl Into<PathBuf>) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

impl PlatformEmitter for PosixEmitter {
    fn flavor(&self) -> ShellFlavor {
        ShellFlavor::Posix
    }

    fn interpreter(&self) -> &Path {
        &self.shell
    }

    fn copy_file(&self, src: &Path, dst: &Path) -> Invocation {
        Invocation::new(self.shell.as_os_str())
            .args(["-c", COPY_BODY, "zip2commit"])
            .arg(src.as_os_str())
            .arg(dst.as_os_str())
    }

    fn compress(&self, staging: &Path, destination: &Path) -> Invocation {
        // -D: no directory entries, matching the in-process writer.
        Invocation::new("zip")
            .args(["-q", "-r", "-D"])
            .arg(destination.as_os_str())
            .arg(".")
            .cwd(staging)
    }

    fn render_script(&self, plan: &ExecutionPlan) -> io::Result<String> {
        let q = |s: &str| ShellFlavor::Posix.quote(s);
        let commit = embeddable(plan.commit(), "commit")?;
        let branch = embeddable(plan.source_branch(), "branch name")?;
        let workspace = path_str(plan.working_directory(), "workspace path")?;
        let archive = path_str(plan.destination(), "archive path")?;
        let file_name = ShellFlavor::Posix.escape_double_quoted(&plan.file_name());

        let mut f = ShellFile::new();
        f.push("#!/bin/sh");
        f.push(format!("# zip2commit: archive files changed by {commit}"));
        f.push(format!("COMMIT={}", q(commit)));
        f.push(format!("SOURCE_BRANCH={}", q(branch)));
        f.push(format!("WORKSPACE={}", q(workspace)));
        f.push(format!("ARCHIVE={}", q(archive)));
        f.blank();
        f.push(r#"cd -- "$WORKSPACE" || exit 1"#);
        f.push(r#"ORIGINAL_BRANCH="$(git rev-parse --abbrev-ref HEAD 2>/dev/null)" || ORIGINAL_BRANCH="""#);
        f.block(
            r#"if [ -z "$ORIGINAL_BRANCH" ] || [ "$ORIGINAL_BRANCH" = "HEAD" ]; then"#,
            "fi",
            |b| {
                b.push(r#"echo "ERROR: could not determine the current branch" >&2"#);
                b.push(format!("exit {}", status::DETACHED));
            },
        );
        f.push(r#"rm -f -- "$ARCHIVE""#);
        f.push(r#"echo "Current branch: $ORIGINAL_BRANCH""#);
        f.push(r#"echo "Commit branch: $SOURCE_BRANCH""#);
        f.push(format!(r#"echo "File name: {file_name}""#));
        f.push(r#"echo "Full path: $ARCHIVE""#);
        f.blank();
        f.push(r#"STAGING="$(mktemp -d "${TMPDIR:-/tmp}/zip2commit_XXXXXX")" || exit 1"#);
        f.push(r#"LIST="$(mktemp "${TMPDIR:-/tmp}/zip2commit_list_XXXXXX")" || { rm -rf -- "$STAGING"; exit 1; }"#);
        f.push("status=0");
        f.blank();
        f.block("restore() {", "}", |b| {
            b.block(
                r#"if ! git checkout -q "$ORIGINAL_BRANCH" --; then"#,
                "fi",
                |b| {
                    b.push(r#"echo "ERROR: failed to return to original branch $ORIGINAL_BRANCH" >&2"#);
                    b.push(r#"echo "Recover manually with: git checkout $ORIGINAL_BRANCH" >&2"#);
                    b.push(format!("status={}", status::RESTORE_FAILED));
                },
            );
        });
        f.block("cleanup() {", "}", |b| {
            b.push(r#"rm -rf -- "$STAGING""#);
            b.push(r#"rm -f -- "$LIST""#);
        });
        f.blank();
        f.block(
            r#"if ! git checkout -q "$SOURCE_BRANCH" --; then"#,
            "fi",
            |b| {
                b.push(r#"echo "ERROR: failed to check out branch $SOURCE_BRANCH" >&2"#);
                b.push("cleanup");
                b.push(format!("exit {}", status::CHECKOUT_FAILED));
            },
        );
        f.push(r#"trap 'restore; cleanup; exit 130' INT TERM"#);
        f.blank();
        f.block(
            r#"if git -c core.quotepath=off diff-tree --no-commit-id --name-only -r -m --root "$COMMIT" > "$LIST"; then"#,
            "fi",
            |b| {
                b.push("copied=0");
                b.block(r#"while IFS= read -r file; do"#, r#"done < "$LIST""#, |b| {
                    b.push(r#"[ -n "$file" ] || continue"#);
                    b.block(r#"if [ -L "$file" ] || [ ! -f "$file" ]; then"#, "fi", |b| {
                        b.push(r#"echo "WARNING: File not found: $file""#);
                        b.outdent(
                            r#"elif mkdir -p -- "$STAGING/$(dirname -- "$file")" && cp -- "$file" "$STAGING/$file"; then"#,
                        );
                        b.push(r#"echo "Copied: $file""#);
                        b.push("copied=$((copied + 1))");
                        b.outdent("else");
                        b.push(r#"echo "WARNING: Failed to copy: $file""#);
                    });
                });
                b.block(r#"if [ "$copied" -eq 0 ]; then"#, "fi", |b| {
                    b.push(r#"echo "No files to compress""#);
                    b.push(format!("status={}", status::NOTHING_TO_COMPRESS));
                    b.outdent(
                        r#"elif (cd -- "$STAGING" && zip -q -r -D "$ARCHIVE" .) && [ -f "$ARCHIVE" ]; then"#,
                    );
                    b.push(r#"echo "Archive created: $ARCHIVE""#);
                    b.outdent("else");
                    b.push(r#"echo "ERROR: failed to create archive $ARCHIVE" >&2"#);
                    b.push(format!("status={}", status::ARCHIVE_FAILED));
                });
                b.outdent("else");
                b.push(r#"echo "ERROR: failed to list files changed by $COMMIT" >&2"#);
                b.push(format!("status={}", status::LISTING_FAILED));
            },
        );
        f.blank();
        f.push("trap - INT TERM");
        f.push("restore");
        f.push("cleanup");
        f.push(r#"exit "$status""#);
        f.build()
    }

    fn script_invocation(&self, script: &Path, cwd: &Path) -> Invocation {
        Invocation::new(self.shell.as_os_str())
            .arg(script.as_os_str())
            .cwd(cwd)
    }
}
