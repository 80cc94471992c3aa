//! Command-line interface for scriptex.
//!
//! Loads the script configuration from a directory, then evaluates one script,
//! ad-hoc code, or a stream of console commands read from stdin.
//!
//! ```bash
//! scriptex --dir ./scripts list
//! scriptex --dir ./scripts eval greeting world --player Alex
//! scriptex --set server_name=Lobby parse 'return "%server_name%";'
//! echo "scriptex parse anon 1 + 1" | scriptex console
//! ```
pub mod cli;
pub mod config;

pub use cli::Cli;
