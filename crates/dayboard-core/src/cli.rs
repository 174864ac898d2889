use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::task::Section;

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "board",
    version,
    about = "Dayboard: morning, midday and after-work task board",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append,
        global = true
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "rc-file", global = true)]
    pub rc_file: Option<PathBuf>,

    #[arg(long = "data", global = true)]
    pub data: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Add a task to a section
    Add {
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,
        #[arg(short = 's', long = "section", default_value = "morning")]
        section: Section,
        #[arg(short = 'c', long = "category")]
        category: Option<String>,
        #[arg(short = 'm', long = "comment")]
        comment: Option<String>,
    },
    /// Change fields of a task
    Edit {
        id: String,
        #[arg(short = 't', long = "title")]
        title: Option<String>,
        #[arg(short = 's', long = "section")]
        section: Option<Section>,
        #[arg(short = 'c', long = "category", conflicts_with = "no_category")]
        category: Option<String>,
        #[arg(long = "no-category")]
        no_category: bool,
        #[arg(short = 'm', long = "comment", conflicts_with = "no_comment")]
        comment: Option<String>,
        #[arg(long = "no-comment")]
        no_comment: bool,
    },
    /// Toggle a task between open and done
    Done { id: String },
    /// Delete a task
    #[command(alias = "delete")]
    Rm { id: String },
    /// Delete every task
    Clear {
        #[arg(long = "yes")]
        yes: bool,
    },
    /// Mark every task as open again
    Reset,
    /// Show the board
    #[command(alias = "ls")]
    List {
        #[arg(short = 'c', long = "category")]
        category: Option<String>,
        #[arg(short = 'o', long = "incomplete", conflicts_with = "all")]
        incomplete: bool,
        #[arg(short = 'a', long = "all")]
        all: bool,
    },
    /// List known categories
    Categories,
    /// Drop one task onto another task's slot in the same section
    Move { moved: String, target: String },
    /// Move a task to the top of its section
    Top { id: String },
    /// Move a task to the bottom of its section
    Bottom { id: String },
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}
