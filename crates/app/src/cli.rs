use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "khatt",
    about = "Extract names and national IDs from handwritten Arabic documents",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Process images, review the extracted rows, then export them.
    Run(RunArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// JPEG or PNG images, at most 40.
    #[arg(value_name = "FILES", required = true)]
    pub files: Vec<PathBuf>,

    /// Base URL of the khatt server.
    #[arg(long)]
    pub server: Option<String>,

    /// Config file (defaults to khatt.toml in the platform config directory).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Per-image timeout in seconds.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Call Gemini and Google Sheets directly instead of going through the server.
    #[arg(long)]
    pub local: bool,
}
