//! Branch-name sanitizing for file names, and shell-flavor escaping for generated scripts.
//!
//! The two are unrelated: `sanitize_branch_name` targets filesystem legality of
//! the archive name, while `ShellFlavor::quote` targets safe interpolation of any value into a
//! script consumed by that flavor's interpreter.

use serde::Serialize;

/// Characters that are illegal or troublesome in file names on common platforms.
pub const UNSAFE_FILENAME_CHARS: [char; 9] = ['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Replace every character in `UNSAFE_FILENAME_CHARS` with `_`.
///
/// Total and idempotent; empty input yields empty output (callers decide what that means).
pub fn sanitize_branch_name(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if UNSAFE_FILENAME_CHARS.contains(&c) {
                '_'
            } else {
                c
            }
        })
        .collect()
}

/// Interpreter family a generated script targets.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ShellFlavor {
    Posix,
    PowerShell,
}

impl ShellFlavor {
    /// Flavor native to the host this binary was built for.
    pub fn host() -> Self {
        if cfg!(windows) {
            ShellFlavor::PowerShell
        } else {
            ShellFlavor::Posix
        }
    }

    /// Quote `s` as a complete literal for this flavor.
    ///
    /// Posix: single-quoted, `'` becomes `'\''`. PowerShell: single-quoted, `'` becomes `''`.
    pub fn quote(self, s: &str) -> String {
        match self {
            ShellFlavor::Posix => crate::shell_quote(s),
            ShellFlavor::PowerShell => crate::ps_quote(s),
        }
    }

    /// Escape `s` for interpolation inside this flavor's double-quoted strings.
    ///
    /// Posix: `"` becomes `\"` (plus `\`, `$`, backtick). PowerShell: backtick is the escape
    /// character, and `"` is doubled.
    pub fn escape_double_quoted(self, s: &str) -> String {
        match self {
            ShellFlavor::Posix => crate::shell_escape_double_quoted(s),
            ShellFlavor::PowerShell => {
                let mut out = String::with_capacity(s.len() + 8);
                for ch in s.chars() {
                    match ch {
                        '`' | '$' => {
                            out.push('`');
                            out.push(ch);
                        }
                        '"' => out.push_str("\"\""),
                        c => out.push(c),
                    }
                }
                out
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ShellFlavor::Posix => "posix",
            ShellFlavor::PowerShell => "powershell",
        }
    }

    /// File extension for a script body of this flavor.
    pub fn script_suffix(self) -> &'static str {
        match self {
            ShellFlavor::Posix => ".sh",
            ShellFlavor::PowerShell => ".ps1",
        }
    }
}
