use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::errors::ArchiveError;
use crate::inspect::RepositoryInspector;
use crate::sanitize::sanitize_branch_name;

/// Immutable description of one archive run. Built once by `build_plan`, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionPlan {
    commit: String,
    source_branch: String,
    safe_name: String,
    working_directory: PathBuf,
    destination: PathBuf,
}

impl ExecutionPlan {
    /// Full id of the commit, resolved once when the plan was built.
    pub fn commit(&self) -> &str {
        &self.commit
    }

    /// Raw branch name as reported by git (used for checkout).
    pub fn source_branch(&self) -> &str {
        &self.source_branch
    }

    /// Sanitized branch name (used for the archive file name).
    pub fn safe_name(&self) -> &str {
        &self.safe_name
    }

    pub fn working_directory(&self) -> &Path {
        &self.working_directory
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// File name component of the destination, e.g. `feature_x.zip`.
    pub fn file_name(&self) -> String {
        format!("{}.zip", self.safe_name)
    }
}

/// `<workspace_root>/<safe_name>.zip`
pub fn archive_path_for(workspace_root: &Path, safe_name: &str) -> PathBuf {
    workspace_root.join(format!("{safe_name}.zip"))
}

/// Validate `commit`, resolve its source branch and compute the destination.
///
/// Nothing here touches the working tree.
pub fn build_plan(
    inspector: &RepositoryInspector<'_>,
    commit: &str,
    workspace_root: &Path,
) -> Result<ExecutionPlan, ArchiveError> {
    let commit = commit.trim();
    if commit.is_empty() {
        return Err(ArchiveError::InputMissing);
    }
    let commit = inspector
        .resolve_commit(commit)?
        .ok_or_else(|| ArchiveError::CommitNotFound(commit.to_string()))?;

    let source_branch = inspector.source_branch(&commit)?;
    let safe_name = sanitize_branch_name(&source_branch);
    if safe_name.trim().is_empty() {
        return Err(ArchiveError::EmptyBranchName(commit));
    }

    let working_directory = match workspace_root.canonicalize() {
        Ok(p) => p,
        Err(e) => {
            tracing::debug!(root = %workspace_root.display(), error = %e, "canonicalize failed; using as given");
            workspace_root.to_path_buf()
        }
    };
    let destination = archive_path_for(&working_directory, &safe_name);
    tracing::debug!(
        commit = %commit,
        branch = %source_branch,
        destination = %destination.display(),
        "plan built"
    );

    Ok(ExecutionPlan {
        commit,
        source_branch,
        safe_name,
        working_directory,
        destination,
    })
}

#[cfg(test)]
impl ExecutionPlan {
    /// Plan fixture for emitter and orchestrator tests (skips git validation).
    pub(crate) fn for_tests(commit: &str, branch: &str, root: &Path) -> Self {
        let safe_name = sanitize_branch_name(branch);
        Self {
            commit: commit.to_string(),
            source_branch: branch.to_string(),
            destination: archive_path_for(root, &safe_name),
            safe_name,
            working_directory: root.to_path_buf(),
        }
    }
}
