use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Subcommand, Debug, Clone)]
pub(crate) enum Command {
    /// Run diagnostics to check git, toolsets and configuration
    Doctor,
}

#[derive(Parser, Debug)]
#[command(
    name = "zip2commit",
    version,
    about = "Archive the files a commit touched, as they are on the commit's branch, then return to the current branch.",
    override_usage = "zip2commit [OPTIONS] [COMMIT]\n       zip2commit doctor",
    after_long_help = "Examples:\n  zip2commit 1a2b3c4\n  zip2commit 1a2b3c4 --dry-run\n  zip2commit 1a2b3c4 --toolset native --json\n  zip2commit 1a2b3c4 --print-script > run.sh\n\n",
    after_help = "\n"
)]
pub(crate) struct Cli {
    /// Commit to archive (prompted for when omitted and stdin is a terminal)
    pub(crate) commit: Option<String>,

    /// Workspace root (default: top level of the repository containing the current directory)
    #[arg(long, global = true)]
    pub(crate) repo: Option<PathBuf>,

    /// Copy/compress toolset: auto|native|posix|powershell (overrides ZIP2COMMIT_TOOLSET)
    #[arg(long, value_enum, global = true)]
    pub(crate) toolset: Option<zip2commit::ToolsetChoice>,

    /// Shell interpreter override (overrides ZIP2COMMIT_SHELL)
    #[arg(long, global = true)]
    pub(crate) shell: Option<PathBuf>,

    /// Run the whole workflow as one generated script through the shell
    #[arg(long = "via-shell")]
    pub(crate) via_shell: bool,

    /// Print the generated script for this commit and exit without running it
    #[arg(long = "print-script", conflicts_with_all = ["dry_run", "via_shell"])]
    pub(crate) print_script: bool,

    /// Resolve and print the plan, but do not touch the working tree
    #[arg(long)]
    pub(crate) dry_run: bool,

    /// Emit machine-readable JSON on stdout
    #[arg(long)]
    pub(crate) json: bool,

    /// Print detailed execution info (debug logs)
    #[arg(long, global = true)]
    pub(crate) verbose: bool,

    /// Colorize output: auto|always|never
    #[arg(long = "color", value_enum, global = true)]
    pub(crate) color: Option<zip2commit::ColorMode>,

    #[command(subcommand)]
    pub(crate) command: Option<Command>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commit_and_flags() {
        let cli = Cli::parse_from([
            "zip2commit",
            "abc123",
            "--toolset",
            "powershell",
            "--dry-run",
            "--color",
            "never",
        ]);
        assert_eq!(cli.commit.as_deref(), Some("abc123"));
        assert_eq!(cli.toolset, Some(zip2commit::ToolsetChoice::PowerShell));
        assert!(cli.dry_run);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_parse_doctor_subcommand() {
        let cli = Cli::parse_from(["zip2commit", "doctor", "--verbose"]);
        assert!(matches!(cli.command, Some(Command::Doctor)));
        assert!(cli.verbose);
    }

    #[test]
    fn test_print_script_conflicts_with_dry_run() {
        let r = Cli::try_parse_from(["zip2commit", "abc", "--print-script", "--dry-run"]);
        assert!(r.is_err());
    }
}
