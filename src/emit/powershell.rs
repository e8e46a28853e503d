use std::io;
use std::path::{Path, PathBuf};

use super::{embeddable, path_str, status, PlatformEmitter};
use crate::plan::ExecutionPlan;
use crate::sanitize::ShellFlavor;
use crate::{Invocation, ShellFile};

/// PowerShell toolset: `Copy-Item` and `Compress-Archive`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PowerShellEmitter {
    shell: PathBuf,
}

impl PowerShellEmitter {
    pub fn new(shell: impl Into<PathBuf>) -> Self {
        Self {
            shell: shell.into(),
        }
    }

    fn command(&self, script: String) -> Invocation {
        Invocation::new(self.shell.as_os_str())
            .args(["-NoProfile", "-NonInteractive", "-Command"])
            .arg(script)
    }
}

fn q(s: &str) -> String {
    ShellFlavor::PowerShell.quote(s)
}

fn lossy(p: &Path) -> String {
    p.to_string_lossy().to_string()
}

impl PlatformEmitter for PowerShellEmitter {
    fn flavor(&self) -> ShellFlavor {
        ShellFlavor::PowerShell
    }

    fn interpreter(&self) -> &Path {
        &self.shell
    }

    fn copy_file(&self, src: &Path, dst: &Path) -> Invocation {
        self.command(format!(
            "$d = {dst}; New-Item -ItemType Directory -Force -Path (Split-Path -Parent $d) | Out-Null; Copy-Item -LiteralPath {src} -Destination $d -Force -ErrorAction Stop",
            dst = q(&lossy(dst)),
            src = q(&lossy(src)),
        ))
    }

    fn compress(&self, staging: &Path, destination: &Path) -> Invocation {
        self.command(format!(
            "Compress-Archive -Path (Join-Path {staging} '*') -DestinationPath {dest} -Force -ErrorAction Stop",
            staging = q(&lossy(staging)),
            dest = q(&lossy(destination)),
        ))
        .cwd(staging)
    }

    fn render_script(&self, plan: &ExecutionPlan) -> io::Result<String> {
        let commit = embeddable(plan.commit(), "commit")?;
        let branch = embeddable(plan.source_branch(), "branch name")?;
        let workspace = path_str(plan.working_directory(), "workspace path")?;
        let archive = path_str(plan.destination(), "archive path")?;
        let file_name = ShellFlavor::PowerShell.escape_double_quoted(&plan.file_name());

        let mut f = ShellFile::new();
        f.push(format!("# zip2commit: archive files changed by {commit}"));
        f.push(format!("$commit = {}", q(commit)));
        f.push(format!("$sourceBranch = {}", q(branch)));
        f.push(format!("$workspace = {}", q(workspace)));
        f.push(format!("$archive = {}", q(archive)));
        f.blank();
        f.push("Set-Location -LiteralPath $workspace");
        f.push("$originalBranch = git rev-parse --abbrev-ref HEAD 2>$null");
        f.block(
            "if ($LASTEXITCODE -ne 0 -or [string]::IsNullOrWhiteSpace($originalBranch) -or $originalBranch.Trim() -eq 'HEAD') {",
            "}",
            |b| {
                b.push("[Console]::Error.WriteLine('ERROR: could not determine the current branch')");
                b.push(format!("exit {}", status::DETACHED));
            },
        );
        f.push("$originalBranch = $originalBranch.Trim()");
        f.block("if (Test-Path -LiteralPath $archive) {", "}", |b| {
            b.push("Remove-Item -LiteralPath $archive -Force");
        });
        f.push(r#"Write-Output "Current branch: $originalBranch""#);
        f.push(r#"Write-Output "Commit branch: $sourceBranch""#);
        f.push(format!(r#"Write-Output "File name: {file_name}""#));
        f.push(r#"Write-Output "Full path: $archive""#);
        f.blank();
        f.push(r#"$staging = Join-Path ([System.IO.Path]::GetTempPath()) ("zip2commit_" + [guid]::NewGuid().ToString('N'))"#);
        f.push("New-Item -ItemType Directory -Path $staging -Force | Out-Null");
        f.push(format!("$status = {}", status::ARCHIVED));
        f.blank();
        f.push("git checkout -q $sourceBranch --");
        f.block("if ($LASTEXITCODE -ne 0) {", "}", |b| {
            b.push(r#"[Console]::Error.WriteLine("ERROR: failed to check out branch $sourceBranch")"#);
            b.push("Remove-Item -LiteralPath $staging -Recurse -Force -ErrorAction SilentlyContinue");
            b.push(format!("exit {}", status::CHECKOUT_FAILED));
        });
        f.block("try {", "}", |b| {
            b.push("$files = @(git -c core.quotepath=off diff-tree --no-commit-id --name-only -r -m --root $commit)");
            b.block("if ($LASTEXITCODE -ne 0) {", "}", |b| {
                b.push(r#"[Console]::Error.WriteLine("ERROR: failed to list files changed by $commit")"#);
                b.push(format!("$status = {}", status::LISTING_FAILED));
                b.outdent("} else {");
                b.push("$copied = 0");
                b.block(
                    "foreach ($file in ($files | Where-Object { $_ } | Select-Object -Unique)) {",
                    "}",
                    |b| {
                        b.push("$src = Join-Path $workspace $file");
                        b.push("$item = Get-Item -LiteralPath $src -Force -ErrorAction SilentlyContinue");
                        b.block(
                            "if ($item -and -not $item.PSIsContainer -and -not ($item.Attributes -band [IO.FileAttributes]::ReparsePoint)) {",
                            "}",
                            |b| {
                                b.push("$dst = Join-Path $staging $file");
                                b.push("New-Item -ItemType Directory -Path (Split-Path -Parent $dst) -Force | Out-Null");
                                b.push("Copy-Item -LiteralPath $src -Destination $dst -Force -ErrorAction SilentlyContinue");
                                b.block("if ($?) {", "}", |b| {
                                    b.push(r#"Write-Output "Copied: $file""#);
                                    b.push("$copied++");
                                    b.outdent("} else {");
                                    b.push(r#"Write-Output "WARNING: Failed to copy: $file""#);
                                });
                                b.outdent("} else {");
                                b.push(r#"Write-Output "WARNING: File not found: $file""#);
                            },
                        );
                    },
                );
                b.block("if ($copied -eq 0) {", "}", |b| {
                    b.push(r#"Write-Output "No files to compress""#);
                    b.push(format!("$status = {}", status::NOTHING_TO_COMPRESS));
                    b.outdent("} else {");
                    b.push("Compress-Archive -Path (Join-Path $staging '*') -DestinationPath $archive -Force -ErrorAction Stop");
                    b.block("if (Test-Path -LiteralPath $archive) {", "}", |b| {
                        b.push(r#"Write-Output "Archive created: $archive""#);
                        b.outdent("} else {");
                        b.push(r#"[Console]::Error.WriteLine("ERROR: failed to create archive $archive")"#);
                        b.push(format!("$status = {}", status::ARCHIVE_FAILED));
                    });
                });
            });
            b.outdent("} catch {");
            b.push(r#"[Console]::Error.WriteLine("ERROR: $($_.Exception.Message)")"#);
            b.push(format!("$status = {}", status::ARCHIVE_FAILED));
            b.outdent("} finally {");
            b.push("git checkout -q $originalBranch --");
            b.block("if ($LASTEXITCODE -ne 0) {", "}", |b| {
                b.push(r#"[Console]::Error.WriteLine("ERROR: failed to return to original branch $originalBranch")"#);
                b.push(r#"[Console]::Error.WriteLine("Recover manually with: git checkout $originalBranch")"#);
                b.push(format!("$status = {}", status::RESTORE_FAILED));
            });
            b.push("Remove-Item -LiteralPath $staging -Recurse -Force -ErrorAction SilentlyContinue");
        });
        f.push("exit $status");
        f.build()
    }

    fn script_invocation(&self, script: &Path, cwd: &Path) -> Invocation {
        Invocation::new(self.shell.as_os_str())
            .args([
                "-NoProfile",
                "-NonInteractive",
                "-ExecutionPolicy",
                "Bypass",
                "-File",
            ])
            .arg(script.as_os_str())
            .cwd(cwd)
    }
}
