//! Platform emitters: translate a plan into concrete process invocations and script bodies.
//!
//! Selection order for `ToolsetChoice::Auto`:
//! - Windows: PowerShell when an interpreter is found, else Native.
//! - Other hosts: Posix when both `bash` and `zip` are found, else Native.
//!
//! Explicit choices never fall back: a missing interpreter or archiver is `BackendUnavailable`.
//!
//! Every toolset materializes regular files only. A symlink is reported as "file not found",
//! even when it points at a file.

use std::io;
use std::path::{Path, PathBuf};

use crate::config::ToolsetChoice;
use crate::errors::ArchiveError;
use crate::plan::ExecutionPlan;
use crate::sanitize::ShellFlavor;
use crate::Invocation;

pub mod posix;
pub mod powershell;

pub use posix::PosixEmitter;
pub use powershell::PowerShellEmitter;

/// Exit statuses of rendered scripts.
pub mod status {
    pub const ARCHIVED: i32 = 0;
    pub const NOTHING_TO_COMPRESS: i32 = 3;
    pub const CHECKOUT_FAILED: i32 = 10;
    pub const ARCHIVE_FAILED: i32 = 11;
    pub const RESTORE_FAILED: i32 = 12;
    pub const LISTING_FAILED: i32 = 13;
    pub const DETACHED: i32 = 14;
}

/// Search order for an interpreter of each flavor.
pub const POSIX_SHELLS: [&str; 2] = ["bash", "sh"];
pub const POWERSHELL_SHELLS: [&str; 3] = ["pwsh", "powershell", "powershell.exe"];

pub trait PlatformEmitter {
    fn flavor(&self) -> ShellFlavor;

    /// Interpreter used for copy steps and scripts.
    fn interpreter(&self) -> &Path;

    /// Copy one regular file to `dst`, creating parent directories.
    fn copy_file(&self, src: &Path, dst: &Path) -> Invocation;

    /// Pack the contents of `staging` (not the directory itself) into `destination`.
    fn compress(&self, staging: &Path, destination: &Path) -> Invocation;

    /// Complete script performing the whole run with rollback.
    fn render_script(&self, plan: &ExecutionPlan) -> io::Result<String>;

    /// Run a script file written from `render_script`.
    fn script_invocation(&self, script: &Path, cwd: &Path) -> Invocation;
}

/// Copy/compress primitives for one run.
#[derive(Debug, Clone)]
pub enum Toolset {
    /// In-process copy and ZIP writer.
    Native,
    Posix(PosixEmitter),
    PowerShell(PowerShellEmitter),
}

impl Toolset {
    pub fn name(&self) -> &'static str {
        match self {
            Toolset::Native => "native",
            Toolset::Posix(_) => "posix",
            Toolset::PowerShell(_) => "powershell",
        }
    }

    /// External-process emitter, or None for the in-process toolset.
    pub fn emitter(&self) -> Option<&dyn PlatformEmitter> {
        match self {
            Toolset::Native => None,
            Toolset::Posix(e) => Some(e),
            Toolset::PowerShell(e) => Some(e),
        }
    }
}

/// Emitter for a script of `flavor` run by `shell`.
pub fn script_emitter(flavor: ShellFlavor, shell: PathBuf) -> Box<dyn PlatformEmitter> {
    match flavor {
        ShellFlavor::Posix => Box::new(PosixEmitter::new(shell)),
        ShellFlavor::PowerShell => Box::new(PowerShellEmitter::new(shell)),
    }
}

/// `git checkout -q <branch> --` in the repository.
pub fn checkout_invocation(repo: &Path, branch: &str) -> Invocation {
    Invocation::new("git")
        .args(["checkout", "-q", branch, "--"])
        .cwd(repo)
}

/// Resolve an interpreter for `flavor`.
///
/// The override wins when it names an existing file; otherwise the flavor's search list is
/// tried through `find`. POSIX falls back to `/bin/bash` on Unix hosts.
pub fn resolve_shell_with(
    flavor: ShellFlavor,
    configured: Option<&Path>,
    find: &dyn Fn(&str) -> Option<PathBuf>,
) -> Option<PathBuf> {
    if let Some(p) = configured {
        if p.is_file() {
            return Some(p.to_path_buf());
        }
        tracing::warn!(shell = %p.display(), "configured shell is not a file; searching PATH");
    }
    let candidates: &[&str] = match flavor {
        ShellFlavor::Posix => &POSIX_SHELLS,
        ShellFlavor::PowerShell => &POWERSHELL_SHELLS,
    };
    if let Some(found) = candidates.iter().find_map(|c| find(c)) {
        return Some(found);
    }
    if flavor == ShellFlavor::Posix && cfg!(unix) {
        return Some(PathBuf::from("/bin/bash"));
    }
    None
}

pub fn resolve_shell(flavor: ShellFlavor, configured: Option<&Path>) -> Option<PathBuf> {
    resolve_shell_with(flavor, configured, &which_ok)
}

fn which_ok(bin: &str) -> Option<PathBuf> {
    which::which(bin).ok()
}

/// Pure toolset selection; `find` stands in for PATH lookup and `windows` for the host.
pub fn select_toolset_with(
    choice: ToolsetChoice,
    configured_shell: Option<&Path>,
    windows: bool,
    find: &dyn Fn(&str) -> Option<PathBuf>,
) -> Result<Toolset, ArchiveError> {
    let search_only = |flavor: ShellFlavor| -> Option<PathBuf> {
        if let Some(p) = configured_shell.filter(|p| p.is_file()) {
            return Some(p.to_path_buf());
        }
        let candidates: &[&str] = match flavor {
            ShellFlavor::Posix => &POSIX_SHELLS[..1],
            ShellFlavor::PowerShell => &POWERSHELL_SHELLS,
        };
        candidates.iter().find_map(|c| find(c))
    };

    match choice {
        ToolsetChoice::Native => Ok(Toolset::Native),
        ToolsetChoice::Posix => {
            let shell = search_only(ShellFlavor::Posix).ok_or_else(|| {
                ArchiveError::BackendUnavailable("bash not found in PATH".to_string())
            })?;
            if find("zip").is_none() {
                return Err(ArchiveError::BackendUnavailable(
                    "zip not found in PATH".to_string(),
                ));
            }
            Ok(Toolset::Posix(PosixEmitter::new(shell)))
        }
        ToolsetChoice::PowerShell => {
            let shell = search_only(ShellFlavor::PowerShell).ok_or_else(|| {
                ArchiveError::BackendUnavailable("PowerShell not found in PATH".to_string())
            })?;
            Ok(Toolset::PowerShell(PowerShellEmitter::new(shell)))
        }
        ToolsetChoice::Auto if windows => Ok(search_only(ShellFlavor::PowerShell)
            .map(|s| Toolset::PowerShell(PowerShellEmitter::new(s)))
            .unwrap_or(Toolset::Native)),
        ToolsetChoice::Auto => {
            match (search_only(ShellFlavor::Posix), find("zip")) {
                (Some(shell), Some(_)) => Ok(Toolset::Posix(PosixEmitter::new(shell))),
                _ => Ok(Toolset::Native),
            }
        }
    }
}

pub fn select_toolset(
    choice: ToolsetChoice,
    configured_shell: Option<&Path>,
) -> Result<Toolset, ArchiveError> {
    let toolset = select_toolset_with(choice, configured_shell, cfg!(windows), &which_ok)?;
    tracing::debug!(?choice, toolset = toolset.name(), "toolset selected");
    Ok(toolset)
}

/// Fail with InvalidInput when a value cannot be embedded on one script line.
pub(crate) fn embeddable<'a>(value: &'a str, what: &str) -> io::Result<&'a str> {
    crate::reject_newlines(value, what)
        .map(|_| value)
        .map_err(|m| io::Error::new(io::ErrorKind::InvalidInput, m))
}

pub(crate) fn path_str<'a>(p: &'a Path, what: &str) -> io::Result<&'a str> {
    let s = p.to_str().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("refusing to embed {what}: not valid UTF-8"),
        )
    })?;
    embeddable(s, what)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn none(_: &str) -> Option<PathBuf> {
        None
    }

    fn all(bin: &str) -> Option<PathBuf> {
        Some(PathBuf::from(format!("/usr/bin/{bin}")))
    }

    fn no_zip(bin: &str) -> Option<PathBuf> {
        (bin != "zip").then(|| PathBuf::from(format!("/usr/bin/{bin}")))
    }

    #[test]
    fn test_auto_prefers_posix_when_bash_and_zip_found() {
        let t = select_toolset_with(ToolsetChoice::Auto, None, false, &all).unwrap();
        match t {
            Toolset::Posix(e) => assert_eq!(e.interpreter(), Path::new("/usr/bin/bash")),
            other => panic!("expected posix, got {}", other.name()),
        }
    }

    #[test]
    fn test_auto_falls_back_to_native_without_zip() {
        let t = select_toolset_with(ToolsetChoice::Auto, None, false, &no_zip).unwrap();
        assert_eq!(t.name(), "native");
        assert!(t.emitter().is_none());
    }

    #[test]
    fn test_auto_on_windows_uses_powershell_when_found() {
        let t = select_toolset_with(ToolsetChoice::Auto, None, true, &all).unwrap();
        assert_eq!(t.name(), "powershell");
        let t = select_toolset_with(ToolsetChoice::Auto, None, true, &none).unwrap();
        assert_eq!(t.name(), "native");
    }

    #[test]
    fn test_explicit_posix_without_zip_is_unavailable() {
        let e = select_toolset_with(ToolsetChoice::Posix, None, false, &no_zip).unwrap_err();
        assert!(matches!(e, ArchiveError::BackendUnavailable(ref m) if m.contains("zip")));
        assert_eq!(e.exit_code(), 127);
    }

    #[test]
    fn test_resolve_shell_ignores_missing_override() {
        let got = resolve_shell_with(
            ShellFlavor::PowerShell,
            Some(Path::new("/definitely/not/here/pwsh")),
            &all,
        );
        assert_eq!(got, Some(PathBuf::from("/usr/bin/pwsh")));
        assert_eq!(resolve_shell_with(ShellFlavor::PowerShell, None, &none), None);
    }

    #[test]
    fn test_resolve_shell_uses_existing_override() {
        let dir = tempfile::tempdir().unwrap();
        let sh = dir.path().join("mysh");
        std::fs::write(&sh, "").unwrap();
        let got = resolve_shell_with(ShellFlavor::Posix, Some(&sh), &all);
        assert_eq!(got, Some(sh));
    }

    #[test]
    fn test_checkout_invocation_separates_paths() {
        let inv = checkout_invocation(Path::new("/repo"), "feature/x");
        assert_eq!(inv.argv(), vec!["git", "checkout", "-q", "feature/x", "--"]);
        assert_eq!(inv.working_dir(), Some(Path::new("/repo")));
    }
}
