//! Command-line argument parsing for txt2sql.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Ask questions about a PostgreSQL database in plain language.
#[derive(Parser, Debug)]
#[command(name = "txt2sql")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Use a seeded in-memory database instead of PostgreSQL
    #[arg(long, global = true)]
    pub mock_db: bool,

    #[command(subcommand)]
    pub mode: Option<Mode>,
}

/// Which front-end to run.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Interactive terminal session (default)
    Repl,
    /// Browser dashboard
    Dashboard {
        /// Address to listen on (overrides `dashboard.bind`)
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,
    },
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    ///
    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(crate::config::Config::default_path)
    }

    /// The selected front-end; the REPL when no subcommand is given.
    pub fn mode(&self) -> Mode {
        self.mode.clone().unwrap_or(Mode::Repl)
    }
}
