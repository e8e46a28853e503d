#![allow(clippy::module_name_repetitions)]
//! Small utilities: process execution, shell quoting for POSIX shells and PowerShell, script builders.

pub mod exec;
pub mod shell_file;

pub use exec::{CommandRunner, ExecOutput, Invocation, SystemRunner};
pub use shell_file::ShellFile;

/// Reject strings containing newline, carriage return, or NUL before embedding into a script.
///
/// Keep error text stable (tests/UX depend on it).
pub fn reject_newlines(s: &str, what: &str) -> Result<(), String> {
    if s.contains('\n') || s.contains('\r') || s.contains('\0') {
        Err(format!("refusing to embed {what}: contains newline"))
    } else {
        Ok(())
    }
}

/// Join words into a single POSIX command line for previews and logs.
pub fn shell_join(args: &[String]) -> String {
    args.iter()
        .map(|a| shell_escape(a))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Quote a word for a POSIX shell only when it contains characters outside a plain set.
pub fn shell_escape(s: &str) -> String {
    if s.is_empty() {
        "''".to_string()
    } else if s
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "-_=./:@".contains(c))
    {
        s.to_string()
    } else {
        shell_quote(s)
    }
}

/// Always wrap in single quotes; an embedded `'` becomes `'\''`.
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\\''"))
}

/// Escape for interpolation inside a POSIX double-quoted string: `"` becomes `\"`,
/// and `\`, `$` and backtick are escaped so they stay literal.
pub fn shell_escape_double_quoted(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 8);
    for ch in s.chars() {
        match ch {
            '"' | '\\' | '$' | '`' => {
                out.push('\\');
                out.push(ch);
            }
            c => out.push(c),
        }
    }
    out
}

/// PowerShell single-quoted literal; an embedded `'` is doubled.
pub fn ps_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_escape_simple() {
        assert_eq!(shell_escape("abc-123_./:@"), "abc-123_./:@");
    }

    #[test]
    fn test_shell_escape_with_spaces_and_quotes() {
        assert_eq!(shell_escape("a b c"), "'a b c'");
        assert_eq!(shell_escape("O'Reilly"), "'O'\\''Reilly'");
        assert_eq!(shell_escape(""), "''");
    }

    #[test]
    fn test_shell_join() {
        let args = vec!["git".to_string(), "checkout".to_string(), "my branch".to_string()];
        assert_eq!(shell_join(&args), "git checkout 'my branch'");
    }

    #[test]
    fn test_double_quoted_escape_keeps_specials_literal() {
        assert_eq!(shell_escape_double_quoted(r#"say "hi""#), r#"say \"hi\""#);
        assert_eq!(shell_escape_double_quoted("$HOME`id`"), "\\$HOME\\`id\\`");
        assert_eq!(shell_escape_double_quoted("it's"), "it's");
    }

    #[test]
    fn test_ps_quote_doubles_single_quotes() {
        assert_eq!(ps_quote("feature/it's"), "'feature/it''s'");
        assert_eq!(ps_quote("$env:PATH"), "'$env:PATH'");
    }

    #[test]
    fn test_reject_newlines() {
        assert!(reject_newlines("main", "branch").is_ok());
        let e = reject_newlines("a\nb", "branch").unwrap_err();
        assert_eq!(e, "refusing to embed branch: contains newline");
        assert!(reject_newlines("a\0b", "branch").is_err());
    }
}
