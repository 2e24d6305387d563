//! Clap derive structures for the `sstation` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use sstation_core::HomeMode;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// sstation -- Synology Surveillance Station from the command line
#[derive(Debug, Parser)]
#[command(
    name = "sstation",
    version,
    about = "Control Synology Surveillance Station cameras and home mode",
    long_about = "Lists cameras, fetches snapshots and switches home mode on one or more\n\
        Surveillance Station appliances. `serve` runs a small HTTP host that polls\n\
        every entity and relays live MJPEG streams.",
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
    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "SSTATION_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Only talk to the host with this name
    #[arg(long, short = 'H', env = "SSTATION_HOST", global = true)]
    pub host: Option<String>,

    /// Output format (defaults to `[defaults] output` in the config)
    #[arg(long, short = 'o', env = "SSTATION_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    Auto,
    Always,
    Never,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP host: poll entities, serve images and streams
    Serve(ServeArgs),

    /// List cameras on every configured host
    #[command(alias = "cam")]
    Cameras,

    /// Save a still image from a camera
    Snapshot(SnapshotArgs),

    /// Show or change home mode
    #[command(alias = "hm")]
    HomeMode(HomeModeArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Address to listen on (overrides `defaults.listen`)
    #[arg(long, short = 'l')]
    pub listen: Option<String>,

    /// Seconds between polls (overrides `defaults.poll_interval`)
    #[arg(long)]
    pub poll_interval: Option<u64>,
}

#[derive(Debug, Args)]
pub struct SnapshotArgs {
    /// Camera name or numeric id
    pub camera: String,

    /// Write the JPEG here instead of stdout
    #[arg(long, short = 'f')]
    pub file: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct HomeModeArgs {
    #[command(subcommand)]
    pub command: HomeModeCommand,
}

#[derive(Debug, Subcommand)]
pub enum HomeModeCommand {
    /// Show the current mode of each host
    Status,

    /// Switch mode on the selected hosts (all unless --host is given)
    Set {
        #[arg(value_parser = parse_home_mode)]
        mode: HomeMode,
    },
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}

fn parse_home_mode(value: &str) -> Result<HomeMode, String> {
    value
        .parse()
        .map_err(|_| format!("expected 'home' or 'away', got '{value}'"))
}
