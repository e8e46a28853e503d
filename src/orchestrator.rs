//! Run state machine: checkout, materialize, archive, restore.
//!
//! Lifecycle (one run):
//!   Idle -> BranchResolved -> CheckedOut -> FilesMaterialized -> Archived -> Restored -> Done
//!
//! The foreign checkout is held by a `CheckoutGuard`. Every exit path after a successful
//! checkout goes through `CheckoutGuard::restore`; if a panic unwinds past it, its Drop issues a
//! best-effort checkout of the original branch.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::thread;

use serde::Serialize;

use crate::archive;
use crate::emit::{checkout_invocation, status, PlatformEmitter, Toolset};
use crate::errors::ArchiveError;
use crate::inspect::{ChangedFileSet, RepositoryInspector};
use crate::plan::ExecutionPlan;
use crate::CommandRunner;

/// Upper bound on concurrent copy workers.
const MAX_COPY_WORKERS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    BranchResolved,
    CheckedOut,
    FilesMaterialized,
    Archived,
    Restored { success: bool },
    Done,
}

/// A changed path that could not be copied into staging. Collected, never raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileMaterializationWarning {
    pub path: String,
    pub reason: String,
}

impl FileMaterializationWarning {
    fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn is_missing(&self) -> bool {
        self.reason == MISSING_REASON
    }
}

const MISSING_REASON: &str = "file not found";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    Archived {
        path: PathBuf,
        size_bytes: u64,
        files: Vec<String>,
        warnings: Vec<FileMaterializationWarning>,
    },
    NothingToCompress {
        changed: usize,
        warnings: Vec<FileMaterializationWarning>,
    },
}

impl RunOutcome {
    pub fn warnings(&self) -> &[FileMaterializationWarning] {
        match self {
            RunOutcome::Archived { warnings, .. } | RunOutcome::NothingToCompress { warnings, .. } => {
                warnings
            }
        }
    }
}

/// Holds the source-branch checkout until `restore` (or Drop) returns to the original branch.
struct CheckoutGuard<'r> {
    runner: &'r dyn CommandRunner,
    repo: PathBuf,
    original: String,
    armed: bool,
}

impl<'r> CheckoutGuard<'r> {
    fn acquire(
        runner: &'r dyn CommandRunner,
        repo: &Path,
        original: &str,
        target: &str,
    ) -> Result<Self, ArchiveError> {
        let failed = |detail: String| ArchiveError::CheckoutFailed {
            branch: target.to_string(),
            detail,
        };
        let out = runner
            .run(&checkout_invocation(repo, target))
            .map_err(|e| failed(format!("{e:#}")))?;
        if !out.success() {
            return Err(failed(out.diagnostic()));
        }
        tracing::info!(from = original, to = target, "checked out source branch");
        Ok(Self {
            runner,
            repo: repo.to_path_buf(),
            original: original.to_string(),
            armed: true,
        })
    }

    fn restore(mut self) -> Result<(), ArchiveError> {
        self.armed = false;
        let failed = |detail: String| ArchiveError::RestoreCheckoutFailed {
            branch: self.original.clone(),
            detail,
        };
        let out = self
            .runner
            .run(&checkout_invocation(&self.repo, &self.original))
            .map_err(|e| failed(format!("{e:#}")))?;
        if !out.success() {
            return Err(failed(out.diagnostic()));
        }
        tracing::info!(branch = %self.original, "restored original branch");
        Ok(())
    }
}

impl Drop for CheckoutGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        tracing::warn!(branch = %self.original, "run aborted; restoring original branch");
        match self
            .runner
            .run(&checkout_invocation(&self.repo, &self.original))
        {
            Ok(out) if out.success() => {}
            Ok(out) => tracing::error!(branch = %self.original, stderr = %out.diagnostic(), "restore failed"),
            Err(e) => tracing::error!(branch = %self.original, error = ?e, "restore failed"),
        }
    }
}

/// Executes one plan step by step with the selected toolset.
pub struct ArchiveOrchestrator<'r> {
    runner: &'r dyn CommandRunner,
    toolset: Toolset,
    history: Vec<RunState>,
}

impl<'r> ArchiveOrchestrator<'r> {
    pub fn new(runner: &'r dyn CommandRunner, toolset: Toolset) -> Self {
        Self {
            runner,
            toolset,
            history: vec![RunState::Idle],
        }
    }

    pub fn state(&self) -> RunState {
        self.history.last().copied().unwrap_or(RunState::Idle)
    }

    /// Every state entered so far, starting with Idle.
    pub fn history(&self) -> &[RunState] {
        &self.history
    }

    fn enter(&mut self, next: RunState) {
        tracing::debug!(from = ?self.state(), to = ?next, "state");
        self.history.push(next);
    }

    pub fn run(&mut self, plan: &ExecutionPlan) -> Result<RunOutcome, ArchiveError> {
        self.enter(RunState::BranchResolved);
        let repo = plan.working_directory();
        let runner = self.runner;
        let inspector = RepositoryInspector::new(runner, repo);
        let original = inspector.current_branch()?;
        remove_stale_archive(plan.destination())?;
        let staging = tempfile::Builder::new().prefix("zip2commit_").tempdir()?;

        let guard = CheckoutGuard::acquire(runner, repo, &original, plan.source_branch())?;
        self.enter(RunState::CheckedOut);

        let result = self.materialize_and_archive(&inspector, plan, staging.path());

        let restored = guard.restore();
        self.enter(RunState::Restored {
            success: restored.is_ok(),
        });

        let staging_path = staging.path().to_path_buf();
        if let Err(e) = staging.close() {
            tracing::warn!(staging = %staging_path.display(), error = %e, "failed to remove staging directory");
        }
        self.enter(RunState::Done);

        match restored {
            Err(restore_err) => {
                if let Err(e) = &result {
                    tracing::error!(error = %e, "run failed before the restore failure");
                }
                Err(restore_err)
            }
            Ok(()) => result,
        }
    }

    fn materialize_and_archive(
        &mut self,
        inspector: &RepositoryInspector<'_>,
        plan: &ExecutionPlan,
        staging: &Path,
    ) -> Result<RunOutcome, ArchiveError> {
        let changed = inspector.changed_files(plan.commit())?;
        let (files, warnings) = materialize(
            self.runner,
            &self.toolset,
            plan.working_directory(),
            &changed,
            staging,
        );
        self.enter(RunState::FilesMaterialized);

        if files.is_empty() {
            tracing::info!(commit = plan.commit(), changed = changed.len(), "nothing to compress");
            return Ok(RunOutcome::NothingToCompress {
                changed: changed.len(),
                warnings,
            });
        }

        let destination = plan.destination();
        self.compress(staging, destination)?;
        let size_bytes = fs::metadata(destination)
            .map_err(|e| ArchiveError::ArchiveCreationFailed {
                path: destination.to_path_buf(),
                detail: format!("archive missing after compression: {e}"),
            })?
            .len();
        self.enter(RunState::Archived);

        Ok(RunOutcome::Archived {
            path: destination.to_path_buf(),
            size_bytes,
            files,
            warnings,
        })
    }

    fn compress(&self, staging: &Path, destination: &Path) -> Result<(), ArchiveError> {
        let failed = |detail: String| ArchiveError::ArchiveCreationFailed {
            path: destination.to_path_buf(),
            detail,
        };
        match self.toolset.emitter() {
            None => {
                archive::write_zip(staging, destination).map_err(|e| failed(e.to_string()))?;
            }
            Some(emitter) => {
                let out = self
                    .runner
                    .run(&emitter.compress(staging, destination))
                    .map_err(|e| failed(format!("{e:#}")))?;
                if !out.success() {
                    return Err(failed(out.diagnostic()));
                }
            }
        }
        Ok(())
    }
}

fn remove_stale_archive(destination: &Path) -> Result<(), ArchiveError> {
    match fs::remove_file(destination) {
        Ok(()) => {
            tracing::debug!(archive = %destination.display(), "removed previous archive");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ArchiveError::Io(e)),
    }
}

/// Copy every changed regular file into staging.
///
/// Copies run on scoped workers over contiguous chunks; results are merged back in the
/// ChangedFileSet order. A failed copy becomes a warning and never stops the others.
fn materialize(
    runner: &dyn CommandRunner,
    toolset: &Toolset,
    repo: &Path,
    changed: &ChangedFileSet,
    staging: &Path,
) -> (Vec<String>, Vec<FileMaterializationWarning>) {
    let paths = changed.paths();
    if paths.is_empty() {
        return (Vec::new(), Vec::new());
    }
    let workers = thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .clamp(1, MAX_COPY_WORKERS)
        .min(paths.len());
    let chunk = paths.len().div_ceil(workers);

    let results: Vec<Result<(), String>> = thread::scope(|s| {
        let handles: Vec<_> = paths
            .chunks(chunk)
            .map(|part| {
                let handle = s.spawn(move || {
                    part.iter()
                        .map(|rel| copy_one(runner, toolset, repo, rel, staging))
                        .collect::<Vec<_>>()
                });
                (part.len(), handle)
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|(len, h)| match h.join() {
                Ok(v) => v,
                Err(_) => vec![Err("copy worker panicked".to_string()); len],
            })
            .collect()
    });

    let mut files = Vec::new();
    let mut warnings = Vec::new();
    for (rel, res) in paths.iter().zip(results) {
        match res {
            Ok(()) => {
                tracing::info!(path = %rel, "copied");
                files.push(rel.clone());
            }
            Err(reason) => {
                tracing::warn!(path = %rel, %reason, "file not materialized");
                warnings.push(FileMaterializationWarning::new(rel.clone(), reason));
            }
        }
    }
    (files, warnings)
}

fn copy_one(
    runner: &dyn CommandRunner,
    toolset: &Toolset,
    repo: &Path,
    rel: &str,
    staging: &Path,
) -> Result<(), String> {
    match toolset.emitter() {
        None => archive::copy_into_staging(repo, rel, staging)
            .map(|_| ())
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => MISSING_REASON.to_string(),
                _ => e.to_string(),
            }),
        Some(emitter) => {
            let src = archive::validate_relative_path(repo, rel)?;
            let dst = archive::validate_relative_path(staging, rel)?;
            match fs::symlink_metadata(&src) {
                Ok(md) if md.is_file() => {}
                _ => return Err(MISSING_REASON.to_string()),
            }
            let out = runner
                .run(&emitter.copy_file(&src, &dst))
                .map_err(|e| format!("{e:#}"))?;
            if out.success() {
                Ok(())
            } else {
                Err(format!("copy failed: {}", out.diagnostic()))
            }
        }
    }
}

/// Lines a rendered script prints that carry results.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ScriptReport {
    pub original_branch: Option<String>,
    pub files: Vec<String>,
    pub warnings: Vec<FileMaterializationWarning>,
}

pub fn parse_script_output(stdout: &str) -> ScriptReport {
    let mut report = ScriptReport::default();
    for line in stdout.lines() {
        let line = line.trim_end_matches('\r');
        if let Some(b) = line.strip_prefix("Current branch: ") {
            report.original_branch = Some(b.to_string());
        } else if let Some(p) = line.strip_prefix("Copied: ") {
            report.files.push(p.to_string());
        } else if let Some(p) = line.strip_prefix("WARNING: File not found: ") {
            report
                .warnings
                .push(FileMaterializationWarning::new(p, MISSING_REASON));
        } else if let Some(p) = line.strip_prefix("WARNING: Failed to copy: ") {
            report
                .warnings
                .push(FileMaterializationWarning::new(p, "copy failed"));
        }
    }
    report
}

/// Render the whole run as one script and execute it through the emitter's interpreter.
///
/// The script's exit status is mapped back onto the same outcomes and errors as `run`.
pub fn run_script(
    runner: &dyn CommandRunner,
    emitter: &dyn PlatformEmitter,
    plan: &ExecutionPlan,
) -> Result<RunOutcome, ArchiveError> {
    let body = emitter.render_script(plan)?;
    let mut file = tempfile::Builder::new()
        .prefix("zip2commit-")
        .suffix(emitter.flavor().script_suffix())
        .tempfile()?;
    file.write_all(body.as_bytes())?;
    file.flush()?;
    let script = file.into_temp_path();

    let inv = emitter.script_invocation(&script, plan.working_directory());
    tracing::debug!(script = %script.display(), flavor = emitter.flavor().as_str(), "running script");
    let out = runner
        .run(&inv)
        .map_err(|e| ArchiveError::BackendUnavailable(format!("{e:#}")))?;
    let report = parse_script_output(&out.stdout);
    let destination = plan.destination().to_path_buf();

    match out.code {
        Some(status::ARCHIVED) => {
            let size_bytes = fs::metadata(&destination)
                .map_err(|e| ArchiveError::ArchiveCreationFailed {
                    path: destination.clone(),
                    detail: format!("archive missing after compression: {e}"),
                })?
                .len();
            Ok(RunOutcome::Archived {
                path: destination,
                size_bytes,
                files: report.files,
                warnings: report.warnings,
            })
        }
        Some(status::NOTHING_TO_COMPRESS) => Ok(RunOutcome::NothingToCompress {
            changed: report.files.len() + report.warnings.len(),
            warnings: report.warnings,
        }),
        Some(status::CHECKOUT_FAILED) => Err(ArchiveError::CheckoutFailed {
            branch: plan.source_branch().to_string(),
            detail: out.diagnostic(),
        }),
        Some(status::ARCHIVE_FAILED) => Err(ArchiveError::ArchiveCreationFailed {
            path: destination,
            detail: out.diagnostic(),
        }),
        Some(status::RESTORE_FAILED) => Err(ArchiveError::RestoreCheckoutFailed {
            branch: report
                .original_branch
                .unwrap_or_else(|| "<original branch>".to_string()),
            detail: out.diagnostic(),
        }),
        Some(status::LISTING_FAILED) => Err(ArchiveError::BackendUnavailable(out.diagnostic())),
        Some(status::DETACHED) => Err(ArchiveError::DetachedOrUnresolvable),
        code => Err(ArchiveError::Io(io::Error::other(format!(
            "script exited with status {code:?}: {}",
            out.diagnostic()
        )))),
    }
}
