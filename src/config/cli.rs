use clap::{Parser, Subcommand, ValueEnum};
use std::{
    fs,
    path::{Path, PathBuf},
};

// -----------------------------------------------------------------------------
// ----- Cli -------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "etcrab", version, about = "etcd cluster administration")]
pub struct Cli {
    // Must exist; no default.
    #[arg(long = "registry", short = 'r', env = "ETCRAB_REGISTRY")]
    pub registry_file: PathBuf,

    // Not required via CLI or ENV (defaults to info).
    #[arg(long = "log", default_value = "info")]
    pub log_level: LogLevel,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn load() -> Self {
        let cli = Self::parse();
        cli.validate();
        cli
    }

    fn validate(&self) {
        must_exist_file(&self.registry_file, "--registry / connections.toml");
    }
}

// -----------------------------------------------------------------------------
// ----- Command ---------------------------------------------------------------

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List keys on a connection.
    List {
        conn: i64,
        #[arg(long, default_value = "")]
        prefix: String,
    },

    /// Fetch a single value.
    Get { conn: i64, key: String },

    /// Write a single value.
    Set {
        conn: i64,
        key: String,
        value: String,
    },

    /// Delete a single key.
    Del { conn: i64, key: String },

    /// Validate endpoints and credentials for a connection.
    Test { conn: i64 },

    /// Bulk-copy keys between two connections.
    Transfer {
        source: i64,
        target: i64,
        /// Explicit keys to move (comma separated). Overrides --prefix.
        #[arg(long, value_delimiter = ',')]
        keys: Vec<String>,
        #[arg(long, default_value = "")]
        prefix: String,
        /// Overwrite keys that already exist on the target.
        #[arg(long)]
        overwrite: bool,
        /// Rewrite leading key prefixes while copying.
        #[arg(long = "map")]
        key_mapping: bool,
        #[arg(long, default_value = "")]
        source_prefix: String,
        #[arg(long, default_value = "")]
        target_prefix: String,
    },

    /// Copy one key between connections.
    Copy {
        source: i64,
        target: i64,
        key: String,
        /// Target key name (defaults to the source key).
        #[arg(long)]
        target_key: Option<String>,
        #[arg(long)]
        overwrite: bool,
    },

    /// Export a snapshot of a connection's key space.
    Export {
        conn: i64,
        #[arg(long, default_value = "")]
        prefix: String,
        /// Output file (defaults to etcd-backup-<name>-<timestamp>.json).
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Import a snapshot file into a connection.
    Import {
        conn: i64,
        file: PathBuf,
        #[arg(long)]
        overwrite: bool,
    },
}

// -----------------------------------------------------------------------------
// ----- LogLevel --------------------------------------------------------------

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive string fed to the `tracing` env filter.
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Private Utils ---------------------------------------------------------

fn must_exist_file(path: &Path, hint: &str) {
    let md = fs::metadata(path).unwrap_or_else(|_| {
        panic!("required file missing: {} (from {hint})", path.display());
    });

    if !md.is_file() {
        panic!("path is not a file: {} (from {hint})", path.display());
    }
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
