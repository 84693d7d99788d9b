//! Command-line interface.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use listwright::target::Target;

/// Fills marketplace listing forms and tracks which targets hold each item.
#[derive(Debug, Parser)]
#[command(name = "listwright", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to the configuration file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Attempts per unit operation, overriding the configuration.
    #[arg(long, global = true)]
    pub max_attempts: Option<u32>,

    /// Enables debug logging.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TargetArg {
    Meesho,
    Flipkart,
    Myntra,
    /// Every target in catalog order.
    All,
}

impl TargetArg {
    pub fn targets(self) -> Vec<Target> {
        match self {
            TargetArg::Meesho => vec![Target::Meesho],
            TargetArg::Flipkart => vec![Target::Flipkart],
            TargetArg::Myntra => vec![Target::Myntra],
            TargetArg::All => Target::ALL.to_vec(),
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Lists a work-item on one or all targets through WebDriver.
    Run {
        /// JSON file describing the work-item.
        item: PathBuf,

        #[arg(long, value_enum, default_value_t = TargetArg::All)]
        target: TargetArg,

        /// Prints each run outcome as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Shows the ledger entry for an item key.
    Status { key: String },

    /// Adds an item key to the ledger with every target pending.
    Register { key: String },

    /// Records a target as done for an item key without filling any form.
    Mark {
        key: String,

        #[arg(long, value_enum)]
        target: TargetArg,
    },

    /// Resolves a value against a list of options.
    Resolve {
        value: String,

        /// A candidate option. Repeat for each one, in display order.
        #[arg(long = "option", required = true)]
        options: Vec<String>,

        #[arg(long)]
        fallback: Option<String>,
    },

    /// Runs the sample item against a scripted surface for every target.
    Demo,
}
