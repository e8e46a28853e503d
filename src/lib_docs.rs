zip2commit crate: architecture overview, environment invariants and module map.

Architecture
- Binary glue (src/main.rs) parses the CLI, resolves settings, prompts for a commit and prints results.
- The library owns the workflow: validate, plan, check out, materialize, archive, restore.
- All git and shell access goes through the `CommandRunner` trait so failure paths are testable.

Key modules
- inspect: read-only git queries (commit existence, current branch, containing branches, changed files).
- sanitize: file-name-safe branch names and per-flavor shell escaping.
- plan: the immutable `ExecutionPlan` and the destination archive path.
- emit::*: toolset selection plus POSIX and PowerShell invocations and whole-run scripts.
- archive: in-process copy and ZIP writer used by the native toolset.
- orchestrator: the run state machine and the checkout guard that always restores the branch.
- workflow: run lock + plan + run, the single entry point used by the binary.
- config, color, logging, ui, report: ambient configuration, notifications and output.

Environment invariants (documented for contributors)
- ZIP2COMMIT_CONFIG: explicit YAML config path; else <repo>/.zip2commit.yml, then ~/.zip2commit.yml.
- ZIP2COMMIT_SHELL / ZIP2COMMIT_TOOLSET: interpreter and toolset overrides below CLI flags.
- ZIP2COMMIT_COLOR / NO_COLOR: notification color control; wrappers always preserve message text.
- ZIP2COMMIT_LOG (then RUST_LOG): tracing filter directive; default warn.

Working tree invariants
- The only persisted artifact is <workspace_root>/<safe_branch>.zip.
- After every run the original branch is checked out again, except when that checkout itself fails
  (RestoreCheckoutFailed, exit code 5, with manual recovery guidance).
- One run per repository at a time: <git_dir>/zip2commit.lock.
