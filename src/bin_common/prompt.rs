//! Prompt rendering for the interactive shell
//!
//! Owns the raw escape sequences, so the connection core never touches
//! terminal state.

use std::io::{self, Write};

/// Renders and clears the input prompt on stdout
#[derive(Debug, Clone, Copy, Default)]
pub struct Prompt;

impl Prompt {
    /// Print the prompt and leave the cursor after it
    pub fn show(self) {
        print!("> ");
        let _ = io::stdout().flush();
    }

    /// Move the cursor to column 0 and erase the current line
    pub fn clear(self) {
        print!("\x1b[G\x1b[K");
        let _ = io::stdout().flush();
    }
}
