//! Main CLI application structure

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use super::output::{Output, OutputFormat};
use super::session::Session;
use super::{entry_cmd, logging, meta_cmd};

#[derive(Parser)]
#[command(name = "confedit")]
#[command(author, version, about = "Layout-preserving KEY=VALUE editor with versioned key metadata")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file to edit (defaults to the last opened one)
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Metadata file; .db/.sqlite/.sqlite3 use SQLite, anything else the text format
    #[arg(long, short = 'm', global = true)]
    pub metadata: Option<PathBuf>,

    /// Settings file (last opened config, preferred version)
    #[arg(long, global = true, env = "CONFEDIT_SETTINGS")]
    pub settings: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Enable debug logging on stderr
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List config entries joined with their metadata
    List {
        /// Only entries in this metadata section
        #[arg(long, conflicts_with = "uncategorized")]
        section: Option<String>,

        /// Only entries without a metadata section
        #[arg(long)]
        uncategorized: bool,

        /// Case-insensitive search over key, name and description
        #[arg(long, short = 's')]
        search: Option<String>,
    },

    /// Show one entry with its description
    Show {
        /// Config key (last occurrence wins)
        key: String,
    },

    /// Change an entry's value and/or metadata, then save
    Set {
        /// Config key
        key: String,

        /// New value written into the config file
        #[arg(long)]
        value: Option<String>,

        /// Display name
        #[arg(long)]
        name: Option<String>,

        /// Metadata section
        #[arg(long)]
        section: Option<String>,

        /// Description (may contain newlines)
        #[arg(long)]
        description: Option<String>,

        /// Row to edit when the key occurs more than once
        #[arg(long)]
        row: Option<usize>,
    },

    /// List metadata sections of the loaded entries
    Sections,

    /// List metadata versions
    Versions,

    /// Make a metadata version current and remember it
    Use {
        /// Version name
        #[arg(id = "version_name", value_name = "VERSION")]
        version: String,
    },

    /// Re-save a metadata file through the backing chosen by the destination name
    Convert {
        /// Source metadata file
        src: PathBuf,

        /// Destination metadata file
        dst: PathBuf,
    },

    /// Verify the config file round-trips byte-for-byte and the metadata parses cleanly
    Check,
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose)?;

    let mut session = Session::new(
        cli.settings.as_deref(),
        cli.metadata,
        cli.config,
        cli.format,
    )?;
    let output = Output::new(session.format());

    tracing::debug!(metadata = %session.metadata_path().display(), "confedit starting");

    match cli.command {
        Commands::List {
            section,
            uncategorized,
            search,
        } => entry_cmd::list(&mut session, &output, section, uncategorized, search.as_deref())?,
        Commands::Show { key } => entry_cmd::show(&mut session, &output, &key)?,
        Commands::Set {
            key,
            value,
            name,
            section,
            description,
            row,
        } => {
            let edit = crate::domain::EntryEdit {
                value,
                name,
                section,
                description,
            };
            entry_cmd::set(&mut session, &output, &key, row, edit)?
        }
        Commands::Sections => entry_cmd::sections(&mut session, &output)?,
        Commands::Check => entry_cmd::check(&mut session, &output)?,

        Commands::Versions => meta_cmd::versions(&mut session, &output)?,
        Commands::Use { version } => meta_cmd::use_version(&mut session, &output, &version)?,
        Commands::Convert { src, dst } => meta_cmd::convert(&output, &src, &dst)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn section_and_uncategorized_conflict() {
        let result = Cli::try_parse_from(["confedit", "list", "--section", "A", "--uncategorized"]);
        assert!(result.is_err());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "confedit", "set", "port", "--value", "81", "-c", "a.conf", "--format", "json",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("a.conf")));
        assert_eq!(cli.format, Some(OutputFormat::Json));
        assert!(matches!(cli.command, Commands::Set { ref key, .. } if key == "port"));
    }
}
