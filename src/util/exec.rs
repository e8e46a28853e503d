use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

/// One external-process invocation: program, arguments, working directory and extra env.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
    program: OsString,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
    env: Vec<(OsString, OsString)>,
}

impl Invocation {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn program(&self) -> &OsString {
        &self.program
    }

    pub fn arg_list(&self) -> &[OsString] {
        &self.args
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    /// Lossy argv as strings (program first), for matching in tests and logs.
    pub fn argv(&self) -> Vec<String> {
        let mut v = vec![self.program.to_string_lossy().to_string()];
        v.extend(self.args.iter().map(|a| a.to_string_lossy().to_string()));
        v
    }

    /// Human-readable POSIX-quoted command line.
    pub fn preview(&self) -> String {
        crate::shell_join(&self.argv())
    }
}

/// Captured result of a finished process.
#[derive(Debug, Clone, Default)]
pub struct ExecOutput {
    pub code: Option<i32>,
    pub duration: Duration,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Trimmed stderr, falling back to stdout, for error messages.
    pub fn diagnostic(&self) -> String {
        let err = self.stderr.trim();
        if err.is_empty() {
            self.stdout.trim().to_string()
        } else {
            err.to_string()
        }
    }
}

/// Runs invocations to completion. Blocking; no timeout is imposed.
///
/// Implementations must be shareable across the scoped copy workers.
pub trait CommandRunner: Send + Sync {
    fn run(&self, inv: &Invocation) -> Result<ExecOutput>;
}

/// Runner backed by `std::process::Command` with captured stdout/stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, inv: &Invocation) -> Result<ExecOutput> {
        let mut cmd = Command::new(&inv.program);
        cmd.args(&inv.args);
        if let Some(ref cwd) = inv.cwd {
            cmd.current_dir(cwd);
        }
        for (key, value) in &inv.env {
            cmd.env(key, value);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        tracing::debug!(command = %inv.preview(), "exec");
        let started = Instant::now();
        let out = cmd
            .output()
            .with_context(|| format!("failed to spawn {:?} with args {:?}", inv.program, inv.args))?;
        let duration = started.elapsed();
        tracing::debug!(
            code = ?out.status.code(),
            elapsed_ms = duration.as_millis() as u64,
            "exec finished"
        );

        Ok(ExecOutput {
            code: out.status.code(),
            duration,
            stdout: String::from_utf8_lossy(&out.stdout).to_string(),
            stderr: String::from_utf8_lossy(&out.stderr).to_string(),
        })
    }
}

/// True when the error chain bottoms out in a spawn NotFound (program missing).
pub fn is_not_found(err: &anyhow::Error) -> bool {
    err.chain().any(|c| {
        c.downcast_ref::<std::io::Error>()
            .map(|e| e.kind() == std::io::ErrorKind::NotFound)
            .unwrap_or(false)
    })
}
