use clap::{Parser, Subcommand};
use profsync::config::{Config, RemoteKind};
use profsync::Strategy;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "profsync")]
#[command(about = "Synchronize profiles between a local and a remote replica", long_about = None)]
#[command(version)]
#[command(after_help = "EXAMPLES:
    # Reconcile one profile (newest copy wins a conflict)
    profsync sync hero

    # Keep the local copy whenever the replicas disagree
    profsync sync hero --strategy local

    # Reconcile every local profile, 8 at a time
    profsync sync-all -j 8

    # Machine-readable output plus the last 20 log entries
    profsync sync-all --json --show-log 20

    # Content hash of the remote copy
    profsync digest hero --remote

Configuration is read from $PROFSYNC_CONFIG or ~/.config/profsync/config.toml")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Local replica directory (overrides config)
    #[arg(long, global = true, env = "PROFSYNC_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Directory of the shadow remote replica (overrides config)
    #[arg(long, global = true)]
    pub remote_dir: Option<PathBuf>,

    /// Run without a remote replica (nothing is fetched, uploads fail)
    #[arg(long, global = true)]
    pub offline: bool,

    /// Number of profiles reconciled concurrently by sync-all
    #[arg(short = 'j', long, global = true)]
    pub workers: Option<usize>,

    /// Emit newline-delimited JSON events instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (only show errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Print the last N operation log entries when done
    #[arg(long, global = true, value_name = "N")]
    pub show_log: Option<usize>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Reconcile one profile between the replicas
    Sync {
        /// Profile id
        id: String,

        /// Conflict resolution strategy (default from config: newest)
        #[arg(short, long, value_enum)]
        strategy: Option<Strategy>,
    },

    /// Reconcile every profile held by the local replica
    SyncAll {
        /// Conflict resolution strategy (default from config: newest)
        #[arg(short, long, value_enum)]
        strategy: Option<Strategy>,
    },

    /// List profile ids held by a replica
    List {
        /// List the remote replica instead of the local one
        #[arg(long)]
        remote: bool,
    },

    /// Show the content hash of a stored profile
    Digest {
        /// Profile id
        id: String,

        /// Hash the remote copy instead of the local one
        #[arg(long)]
        remote: bool,
    },
}

impl Cli {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.workers == Some(0) {
            anyhow::bail!("--workers must be at least 1");
        }

        if self.quiet && self.verbose > 0 {
            anyhow::bail!("--quiet and --verbose are mutually exclusive");
        }

        if self.offline && self.remote_dir.is_some() {
            anyhow::bail!("--offline cannot be combined with --remote-dir");
        }

        Ok(())
    }

    pub fn log_level(&self) -> tracing::Level {
        if self.quiet || self.json {
            return tracing::Level::ERROR;
        }

        match self.verbose {
            0 => tracing::Level::INFO,
            1 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }

    /// Apply command-line overrides on top of the config file
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(ref data_dir) = self.data_dir {
            config.data_dir = data_dir.clone();
        }
        if let Some(ref remote_dir) = self.remote_dir {
            config.remote_dir = Some(remote_dir.clone());
        }
        if self.offline {
            config.remote = RemoteKind::Detached;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
    }

    /// Strategy requested on the command line, if any
    pub fn strategy(&self) -> Option<Strategy> {
        match &self.command {
            Command::Sync { strategy, .. } | Command::SyncAll { strategy } => *strategy,
            Command::List { .. } | Command::Digest { .. } => None,
        }
    }
}
