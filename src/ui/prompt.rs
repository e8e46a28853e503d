use std::io::{self, BufRead, Write};

use crate::errors::ArchiveError;

pub const COMMIT_PROMPT: &str = "Enter the commit hash: ";

/// Read one commit id from `input`, writing the prompt to `output`.
///
/// EOF, a read error or a blank line is `InputMissing`.
pub fn prompt_commit_with<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
) -> Result<String, ArchiveError> {
    let _ = write!(output, "{COMMIT_PROMPT}");
    let _ = output.flush();
    let mut line = String::new();
    match input.read_line(&mut line) {
        Ok(0) | Err(_) => Err(ArchiveError::InputMissing),
        Ok(_) => {
            let commit = line.trim();
            if commit.is_empty() {
                Err(ArchiveError::InputMissing)
            } else {
                Ok(commit.to_string())
            }
        }
    }
}

/// Prompt on the terminal; a non-interactive stdin is treated as a cancelled prompt.
pub fn prompt_commit() -> Result<String, ArchiveError> {
    if !atty::is(atty::Stream::Stdin) {
        return Err(ArchiveError::InputMissing);
    }
    let stdin = io::stdin();
    let mut lock = stdin.lock();
    prompt_commit_with(&mut lock, &mut io::stderr())
}
