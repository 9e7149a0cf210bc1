//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgGroup, Args, Parser, Subcommand, ValueHint};

use crate::config::OutputFormat;
use crate::domain::{BaselineLookup, ZeroBaselinePolicy};

/// Hierarchical ledger: proportional allocation, roll-up sums and baseline variance
#[derive(Parser, Debug)]
#[command(name = "ledgertree")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Debug output (repeat for more: -d info, -dd debug, -ddd trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub debug: u8,

    /// Directory holding the local .ledgertree.toml (default: cwd)
    #[arg(short = 'C', long, global = true, value_hint = ValueHint::DirPath)]
    pub config_dir: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: Overrides,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Per-invocation overrides of the merged configuration.
#[derive(Args, Debug, Default, Clone)]
pub struct Overrides {
    /// Output format: tree, table, json, toml
    #[arg(short, long, global = true)]
    pub format: Option<OutputFormat>,

    /// Baseline lookup for edits: recursive, top-level
    #[arg(long, global = true)]
    pub baseline_lookup: Option<BaselineLookup>,

    /// Zero-baseline variance policy: sentinel, clamp, propagate
    #[arg(long, global = true)]
    pub zero_baseline: Option<ZeroBaselinePolicy>,

    /// Disable coloured output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show a ledger with roll-up sums
    Show {
        /// Ledger document (.toml/.json); default: configured ledger or sample
        #[arg(value_hint = ValueHint::FilePath)]
        file: Option<PathBuf>,
    },

    /// Apply a single edit
    #[command(group(ArgGroup::new("amount").required(true).args(["percent", "value"])))]
    Edit {
        /// Ledger document (.toml/.json); default: configured ledger or sample
        #[arg(value_hint = ValueHint::FilePath)]
        file: Option<PathBuf>,
        /// Node id to edit
        #[arg(short, long)]
        id: String,
        /// Change by this percentage of the baseline value
        #[arg(short, long, allow_negative_numbers = true)]
        percent: Option<f64>,
        /// Replace with this value
        #[arg(short, long, allow_negative_numbers = true)]
        value: Option<f64>,
    },

    /// Apply every edit of a script in order
    Apply {
        /// Ledger document (.toml/.json); default: configured ledger or sample
        #[arg(value_hint = ValueHint::FilePath)]
        file: Option<PathBuf>,
        /// Edit script (.toml with [[edit]] or .json array)
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        script: PathBuf,
        /// Render the ledger after every edit
        #[arg(long)]
        steps: bool,
    },

    /// Interactive session: set pending inputs and submit edits
    Repl {
        /// Ledger document (.toml/.json); default: configured ledger or sample
        #[arg(value_hint = ValueHint::FilePath)]
        file: Option<PathBuf>,
    },

    /// Print the built-in sample ledger as TOML
    Sample,

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Create config template
    Init {
        /// Create global config
        #[arg(short, long)]
        global: bool,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show config paths
    Path,
}
