use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

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
    name = "slate",
    version,
    about = "Slate: task-management client for the Slate API",
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

    #[arg(long = "slaterc", global = true)]
    pub slaterc: Option<PathBuf>,

    #[arg(long = "data", global = true)]
    pub data: Option<PathBuf>,

    #[arg(long = "api-url", global = true)]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create an account on the server.
    Signup {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long = "full-name")]
        full_name: Option<String>,
    },

    /// Exchange credentials for a token and persist it.
    Login {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },

    /// Drop the persisted token.
    Logout,

    /// Show the currently authenticated user.
    Whoami,

    /// List tasks; terms narrow the set (`+label`, `pending`, `completed`, `all`).
    List {
        #[arg(trailing_var_arg = true)]
        terms: Vec<String>,
    },

    /// Create a task.
    Add {
        title: String,
        #[arg(long)]
        description: Option<String>,
        /// high, medium or low.
        #[arg(long, default_value = "medium")]
        priority: String,
        /// Local time, YYYY-MM-DDTHH:MM; defaults to 24h from now.
        #[arg(long)]
        deadline: Option<String>,
        #[arg(long = "label", action = ArgAction::Append)]
        labels: Vec<String>,
    },

    /// Edit an existing task's draft fields.
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        priority: Option<String>,
        #[arg(long)]
        deadline: Option<String>,
        /// Toggle a label on or off the task; repeatable.
        #[arg(long = "toggle-label", action = ArgAction::Append)]
        toggle_labels: Vec<String>,
    },

    /// Mark a task completed.
    Done { id: String },

    /// Mark a task pending again.
    Undone { id: String },

    /// Delete a task.
    Rm { id: String },

    /// Manage the label vocabulary.
    Labels {
        #[command(subcommand)]
        command: LabelCommand,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum LabelCommand {
    List,
    Add {
        name: String,
        /// Hex color like #3B82F6.
        #[arg(long, default_value = "#3B82F6")]
        color: String,
    },
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        color: Option<String>,
    },
    Rm {
        id: String,
    },
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
