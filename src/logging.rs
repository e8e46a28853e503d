//! Diagnostic logging setup (tracing + tracing-subscriber fmt on stderr).

use std::env;

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;

pub const ENV_LOG: &str = "ZIP2COMMIT_LOG";

static INIT: OnceCell<()> = OnceCell::new();

/// Filter directive: `--verbose` forces debug; else `ZIP2COMMIT_LOG`, then `RUST_LOG`, then warn.
pub fn filter_directive(verbose: bool, lookup: &dyn Fn(&str) -> Option<String>) -> String {
    if verbose {
        return "zip2commit=debug,warn".to_string();
    }
    lookup(ENV_LOG)
        .or_else(|| lookup("RUST_LOG"))
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| "warn".to_string())
}

/// Install the global subscriber once. Later calls are no-ops.
pub fn init_tracing(verbose: bool) {
    INIT.get_or_init(|| {
        let directive = filter_directive(verbose, &|k| env::var(k).ok());
        let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("warn"));
        let res = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
        if res.is_err() {
            eprintln!("zip2commit: logging init skipped (global subscriber already set)");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_directive_precedence() {
        let none = |_: &str| None;
        assert_eq!(filter_directive(false, &none), "warn");
        assert_eq!(filter_directive(true, &none), "zip2commit=debug,warn");

        let both = |k: &str| match k {
            ENV_LOG => Some("info".to_string()),
            "RUST_LOG" => Some("trace".to_string()),
            _ => None,
        };
        assert_eq!(filter_directive(false, &both), "info");

        let rust_only = |k: &str| (k == "RUST_LOG").then(|| "debug".to_string());
        assert_eq!(filter_directive(false, &rust_only), "debug");
    }
}
