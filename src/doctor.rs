use std::path::{Path, PathBuf};

use zip2commit::{
    color_enabled_stderr, paint, select_toolset, CommandRunner, Invocation, Settings,
};

fn yes_no(use_err: bool, found: bool) -> String {
    if found {
        paint(use_err, "\x1b[32;1m", "yes")
    } else {
        paint(use_err, "\x1b[33m", "no")
    }
}

fn tool_version(runner: &dyn CommandRunner, program: &Path, args: &[&str]) -> Option<String> {
    let out = runner.run(&Invocation::new(program.as_os_str()).args(args)).ok()?;
    if !out.success() {
        return None;
    }
    out.stdout.lines().next().map(|l| l.trim().to_string())
}

/// Print environment diagnostics to stderr. Never mutates the repository.
pub(crate) fn run_doctor(
    runner: &dyn CommandRunner,
    settings: &Settings,
    repo: Result<PathBuf, String>,
    verbose: bool,
) {
    let use_err = color_enabled_stderr();
    eprintln!("zip2commit doctor");
    eprintln!();
    eprintln!("  version: v{}", env!("CARGO_PKG_VERSION"));
    eprintln!(
        "  host:    {} / {}",
        std::env::consts::OS,
        std::env::consts::ARCH
    );
    if verbose {
        eprintln!("  build date:   {}", env!("ZIP2COMMIT_BUILD_DATE"));
        eprintln!("  build target: {}", env!("ZIP2COMMIT_BUILD_TARGET"));
        eprintln!("  build profile: {}", env!("ZIP2COMMIT_BUILD_PROFILE"));
        eprintln!("  rustc:        {}", env!("ZIP2COMMIT_BUILD_RUSTC"));
    }
    eprintln!();

    match which::which("git") {
        Ok(p) => {
            let v = tool_version(runner, &p, &["--version"]).unwrap_or_default();
            eprintln!("  git:  {} {}", yes_no(use_err, true), v);
            if verbose {
                eprintln!("        {}", p.display());
            }
        }
        Err(_) => eprintln!("  git:  {} (required)", yes_no(use_err, false)),
    }
    for bin in ["bash", "zip", "pwsh", "powershell"] {
        let found = which::which(bin);
        eprintln!("  {bin:<5} {}", yes_no(use_err, found.is_ok()));
        if verbose {
            if let Ok(p) = found {
                eprintln!("        {}", p.display());
            }
        }
    }
    eprintln!();

    match repo {
        Ok(p) => eprintln!("  repository: {}", p.display()),
        Err(e) => eprintln!(
            "  repository: {}",
            paint(use_err, "\x1b[33m", &format!("not found ({e})"))
        ),
    }
    eprintln!(
        "  config file: {}",
        settings
            .config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none)".to_string())
    );
    eprintln!(
        "  shell override: {}",
        settings
            .shell
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none)".to_string())
    );
    eprintln!("  toolset setting: {:?}", settings.toolset);
    match select_toolset(settings.toolset, settings.shell.as_deref()) {
        Ok(t) => {
            let interp = t
                .emitter()
                .map(|e| format!(" via {}", e.interpreter().display()))
                .unwrap_or_default();
            eprintln!("  toolset selected: {}{}", t.name(), interp);
        }
        Err(e) => eprintln!(
            "  toolset selected: {}",
            paint(use_err, "\x1b[31;1m", &e.to_string())
        ),
    }
    eprintln!();
    eprintln!("doctor: completed diagnostics.");
}
