//! Notification sink: color-aware stderr lines for the end of a run.

/// Print a standardized warning line to stderr (color-aware).
pub fn warn_print(msg: &str) {
    let use_err = crate::color_enabled_stderr();
    crate::log_warn_stderr(use_err, &format!("warning: {msg}"));
}

pub fn notify_info(msg: &str) {
    let use_err = crate::color_enabled_stderr();
    crate::log_info_stderr(use_err, msg);
}

pub fn notify_success(msg: &str) {
    let use_err = crate::color_enabled_stderr();
    crate::log_success_stderr(use_err, msg);
}

/// Error line followed by indented guidance lines.
pub fn notify_error(msg: &str, guidance: &[String]) {
    let use_err = crate::color_enabled_stderr();
    crate::log_error_stderr(use_err, &format!("zip2commit: {msg}"));
    for g in guidance {
        crate::log_warn_stderr(use_err, &format!("  {g}"));
    }
}
