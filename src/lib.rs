//! wstalk - interactive WebSocket line client
//!
//! Type lines at a prompt, each line goes out as a text frame; frames from
//! the remote endpoint are printed concurrently with input.
//!
//! ## Architecture
//!
//! - **wsduplex**: the connection core (re-exported from the workspace)
//! - **bin_common**: terminal glue for the binary (CLI parsing, prompt)
//!
//! The binary owns all terminal state; the core only ever sees the three
//! channels it exposes.

// Re-export the workspace library for convenience
pub use wsduplex;

// Binary common utilities
pub mod bin_common {
    //! Common utilities for the binary executable
    //!
    //! Thin I/O glue around the connection core: argument parsing and
    //! prompt rendering.

    pub mod cli;
    pub mod prompt;

    pub use cli::{parse_args, parse_endpoint};
    pub use prompt::Prompt;
}
