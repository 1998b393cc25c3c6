//! CLI entry point for gatehouse.

pub mod commands;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Gatehouse CLI
#[derive(Parser, Debug)]
#[command(name = "gatehouse", version, about = "Gatehouse: resumable approval gates")]
pub struct Cli {
    /// Session whose pending requests to use
    #[arg(short, long, global = true, default_value = "default")]
    pub session: String,

    /// TOML config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding session snapshots (overrides config)
    #[arg(long, global = true)]
    pub store_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Place a shipping order
    Ship(ShipArgs),
    /// Request generated images
    Images(ImagesArgs),
    /// Approve or reject a paused request
    Resume(ResumeArgs),
    /// Show the phase of a token
    Status(TokenArgs),
    /// List every request in the session
    List,
    /// Remove expired pending requests
    Reclaim,
}

/// Arguments for `gatehouse ship`.
#[derive(Args, Debug)]
pub struct ShipArgs {
    /// Number of containers
    #[arg(allow_negative_numbers = true)]
    pub containers: i64,
    /// Shipping destination
    pub destination: String,
    /// Correlation token (generated when omitted)
    #[arg(short, long)]
    pub token: Option<String>,
}

/// Arguments for `gatehouse images`.
#[derive(Args, Debug)]
pub struct ImagesArgs {
    /// Number of images
    #[arg(allow_negative_numbers = true)]
    pub count: i64,
    /// Prompt describing the images
    pub prompt: String,
    #[arg(short, long)]
    pub token: Option<String>,
}

/// Arguments for `gatehouse resume`.
#[derive(Args, Debug)]
pub struct ResumeArgs {
    /// Token returned by the paused call
    pub token: String,
    /// Approve the request
    #[arg(long, conflicts_with = "reject", required_unless_present = "reject")]
    pub approve: bool,
    /// Reject the request
    #[arg(long)]
    pub reject: bool,
    /// Note recorded with the decision
    #[arg(short, long)]
    pub note: Option<String>,
}

#[derive(Args, Debug)]
pub struct TokenArgs {
    pub token: String,
}
