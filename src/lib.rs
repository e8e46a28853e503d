#![doc = include_str!("lib_docs.rs")]

pub mod archive;
pub mod color;
pub mod config;
pub mod emit;
pub mod errors;
pub mod inspect;
pub mod lock;
pub mod logging;
pub mod orchestrator;
pub mod plan;
pub mod report;
pub mod sanitize;
pub mod ui;
pub mod util;
pub mod workflow;

pub use color::{
    color_enabled_stderr, color_enabled_stdout, log_error_stderr, log_info_stderr,
    log_success_stderr, log_warn_stderr, paint, set_color_mode, ColorMode,
};
pub use config::{resolve_settings, CliOverrides, Settings, ToolsetChoice};
pub use emit::{select_toolset, PlatformEmitter, Toolset};
pub use errors::{ArchiveError, EXIT_NOTHING_TO_COMPRESS};
pub use inspect::{ChangedFileSet, RepositoryInspector};
pub use lock::{acquire_run_lock, RunLock};
pub use logging::init_tracing;
pub use orchestrator::{ArchiveOrchestrator, FileMaterializationWarning, RunOutcome, RunState};
pub use plan::{build_plan, ExecutionPlan};
pub use report::{error_json, outcome_json, print_error, print_outcome, print_plan};
pub use sanitize::{sanitize_branch_name, ShellFlavor};
pub use ui::prompt_commit;
pub use util::{
    ps_quote, reject_newlines, shell_escape, shell_escape_double_quoted, shell_join, shell_quote,
    CommandRunner, ExecOutput, Invocation, ShellFile, SystemRunner,
};
pub use workflow::{
    archive_commit, prepare, script_emitter_for, ArchiveRequest, ExecutionMode, PlanPreview,
};
