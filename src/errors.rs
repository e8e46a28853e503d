//! Error mapping guide:
//! - Map BackendUnavailable (git/shell not found) to exit code 127.
//! - RunInProgress maps to 4 and RestoreCheckoutFailed to 5; everything else is 1.
//! - Keep display strings stable: they are the single user-visible message for a failed run.
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Exit code for a run that found nothing to compress (not an error, no archive written).
pub const EXIT_NOTHING_TO_COMPRESS: u8 = 3;

/// Failures of one archive run.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("you need to provide a commit hash")]
    InputMissing,

    #[error("the commit {0} does not exist")]
    CommitNotFound(String),

    #[error("no branches found containing commit {0}")]
    NoContainingBranch(String),

    #[error("could not determine the current branch (detached HEAD or unborn branch)")]
    DetachedOrUnresolvable,

    #[error("branch name resolved for commit {0} is empty")]
    EmptyBranchName(String),

    #[error("failed to check out branch {branch}: {detail}")]
    CheckoutFailed { branch: String, detail: String },

    #[error("failed to create archive {}: {detail}", path.display())]
    ArchiveCreationFailed { path: PathBuf, detail: String },

    #[error("failed to return to original branch {branch}: {detail}")]
    RestoreCheckoutFailed { branch: String, detail: String },

    #[error("git backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("another zip2commit run is already in progress for this repository (lock held: {})", .0.display())]
    RunInProgress(PathBuf),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl ArchiveError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            ArchiveError::BackendUnavailable(_) => 127,
            ArchiveError::RunInProgress(_) => 4,
            ArchiveError::RestoreCheckoutFailed { .. } => 5,
            ArchiveError::Io(e) => exit_code_for_io_error(e),
            _ => 1,
        }
    }

    /// True only for the failure that leaves the working tree on a foreign branch.
    pub fn requires_manual_recovery(&self) -> bool {
        matches!(self, ArchiveError::RestoreCheckoutFailed { .. })
    }

    /// Extra guidance lines printed after the error message.
    pub fn guidance(&self) -> Vec<String> {
        match self {
            ArchiveError::RestoreCheckoutFailed { branch, .. } => vec![
                "the working tree was NOT returned to its original branch.".to_string(),
                format!("recover manually with: git checkout {branch}"),
            ],
            ArchiveError::CheckoutFailed { .. } => vec![
                "commit or stash your local changes and try again.".to_string(),
            ],
            ArchiveError::RunInProgress(path) => vec![format!(
                "wait for the other run to finish (its pid is recorded in {})",
                path.display()
            )],
            _ => Vec::new(),
        }
    }
}

/// Map an io::Error to a process exit code:
/// - 127 for NotFound (command not found)
/// - 1 for all other errors
pub fn exit_code_for_io_error(e: &io::Error) -> u8 {
    if e.kind() == io::ErrorKind::NotFound {
        127
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_distinguish_restore_failure() {
        let restore = ArchiveError::RestoreCheckoutFailed {
            branch: "main".to_string(),
            detail: "boom".to_string(),
        };
        let archive = ArchiveError::ArchiveCreationFailed {
            path: PathBuf::from("/tmp/x.zip"),
            detail: "boom".to_string(),
        };
        assert_eq!(restore.exit_code(), 5);
        assert_eq!(archive.exit_code(), 1);
        assert!(restore.requires_manual_recovery());
        assert!(!archive.requires_manual_recovery());
    }

    #[test]
    fn test_backend_and_not_found_map_to_127() {
        assert_eq!(ArchiveError::BackendUnavailable("x".into()).exit_code(), 127);
        let io = ArchiveError::Io(io::Error::new(io::ErrorKind::NotFound, "nope"));
        assert_eq!(io.exit_code(), 127);
        let other = ArchiveError::Io(io::Error::other("nope"));
        assert_eq!(other.exit_code(), 1);
    }

    #[test]
    fn test_restore_guidance_names_branch() {
        let e = ArchiveError::RestoreCheckoutFailed {
            branch: "feature/x".to_string(),
            detail: "conflict".to_string(),
        };
        let g = e.guidance();
        assert!(g.iter().any(|l| l.contains("git checkout feature/x")), "{g:?}");
    }

    #[test]
    fn test_display_messages_are_stable() {
        assert_eq!(
            ArchiveError::CommitNotFound("abc123".into()).to_string(),
            "the commit abc123 does not exist"
        );
        assert_eq!(
            ArchiveError::InputMissing.to_string(),
            "you need to provide a commit hash"
        );
    }
}
