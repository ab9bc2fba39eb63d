//! Clap derive structures for the `calsync` CLI.
//!
//! Defines the command tree, global flags, and shared value enums.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// calsync -- follow a calendar server's live event stream
#[derive(Debug, Parser)]
#[command(
    name = "calsync",
    version,
    about = "Follow a calendar server's live event stream from the command line",
    long_about = "Connects to the server's server-sent event stream, folds every\n\
        update into a local event store and prints what changed.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Server profile to use
    #[arg(long, short = 'p', env = "CALSYNC_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Server base URL (overrides profile)
    #[arg(long, short = 's', env = "CALSYNC_SERVER", global = true)]
    pub server: Option<String>,

    /// Bearer token (overrides profile, env and keyring)
    #[arg(long, env = "CALSYNC_TOKEN", global = true, hide_env = true)]
    pub token: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "CALSYNC_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log line format on stderr
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "CALSYNC_INSECURE", global = true)]
    pub insecure: bool,

    /// Connect timeout in seconds (overrides profile)
    #[arg(long, env = "CALSYNC_CONNECT_TIMEOUT", global = true)]
    pub connect_timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table / colored feed (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON (one object per line for `watch`)
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, tab separated (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per line
    Json,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Follow the live event stream and print every change
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// Print the event list once the stream has connected
    #[command(alias = "snap")]
    Snapshot(SnapshotArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Stream commands ──────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Exit after this many event changes
    #[arg(long, short = 'n')]
    pub count: Option<usize>,

    /// Open a new connection whenever the stream ends
    #[arg(long, short = 'r')]
    pub reconnect: bool,

    /// Seconds to wait before reconnecting
    #[arg(long, default_value = "5", requires = "reconnect")]
    pub reconnect_delay: u64,

    /// Treat a malformed message as fatal instead of skipping it
    #[arg(long)]
    pub fatal_decode_errors: bool,

    /// Hide toast notifications
    #[arg(long)]
    pub no_notifications: bool,
}

#[derive(Debug, Args)]
pub struct SnapshotArgs {
    /// Seconds to wait for the connected handshake
    #[arg(long, short = 't', default_value = "10")]
    pub timeout: u64,

    /// Seconds to keep collecting updates after the handshake
    #[arg(long, short = 'w', default_value = "0")]
    pub wait: u64,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file location
    Path,

    /// Create or extend the config file with guided setup
    Init,

    /// Display current configuration (tokens masked)
    Show,

    /// Set a value on the active profile
    Set {
        /// Profile key (server, stream_path, token_env, ca_cert, insecure,
        /// connect_timeout, fatal_decode_errors)
        key: String,

        /// Value to set
        value: String,
    },

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store a bearer token in the system keyring
    SetToken {
        /// Profile to store the token for (defaults to the active one)
        #[arg(long)]
        profile: Option<String>,
    },
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_tree_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn reconnect_delay_requires_reconnect() {
        let err = Cli::try_parse_from(["calsync", "watch", "--reconnect-delay", "1"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);

        let cli =
            Cli::try_parse_from(["calsync", "watch", "-r", "--reconnect-delay", "1", "-n", "3"])
                .unwrap();
        let Command::Watch(args) = cli.command else {
            panic!("expected watch");
        };
        assert!(args.reconnect);
        assert_eq!(args.reconnect_delay, 1);
        assert_eq!(args.count, Some(3));
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "calsync",
            "snapshot",
            "-o",
            "json-compact",
            "--server",
            "http://localhost:8000",
            "-k",
        ])
        .unwrap();
        assert_eq!(cli.global.output, OutputFormat::JsonCompact);
        assert_eq!(cli.global.server.as_deref(), Some("http://localhost:8000"));
        assert!(cli.global.insecure);
    }
}
