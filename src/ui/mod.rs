//! Terminal interaction: commit prompt and one-line notifications.

pub mod prompt;
pub mod warn;

pub use prompt::{prompt_commit, prompt_commit_with};
pub use warn::{notify_error, notify_info, notify_success, warn_print};
