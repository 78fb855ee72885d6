//! # Command-Line Interface
//!
//! User-facing CLI commands and output formatting.
//!
//! ## Commands
//!
//! | Group | Purpose | Examples |
//! |-------|---------|----------|
//! | Entries | Inspect and edit the config file | `list`, `show`, `set`, `sections`, `check` |
//! | Metadata | Versions and backings | `versions`, `use`, `convert` |
//!
//! ## Output Formats
//!
//! All commands support `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! ## Verbose Mode
//!
//! Use `--verbose` (or `-v`) for debug logs on stderr, or set `RUST_LOG`:
//! ```bash
//! confedit --verbose -c server.conf list
//! ```
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod output;
mod logging;
mod session;
mod entry_cmd;
mod meta_cmd;

pub use app::{Cli, Commands, run};
pub use output::{Output, OutputFormat};
pub use session::{Session, DEFAULT_METADATA_FILE};
