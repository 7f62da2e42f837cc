//! # gitpost
//!
//! **gitpost** keeps a wiki/blog as Markdown files in a GitHub repository.
//!
//! Features:
//! - `gitpost list` lists posts in the configured posts directory
//! - `gitpost read <slug>` prints one post
//! - `gitpost write --title <T>` creates or replaces a post and commits it
//! - `gitpost config` opens `$(gitpost home)/config.toml` in `$EDITOR`
//! - `gitpost home` prints the configuration directory
//!
//! Logging goes to stderr and is controlled with `RUST_LOG` (default `warn`).

use anyhow::Result;
use clap::{Parser, Subcommand};
use gitpost::{cmd_config, cmd_list, cmd_read, cmd_write, gitpost_home};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "gitpost",
    version,
    about = "gitpost - a wiki/blog stored in a GitHub repository",
    arg_required_else_help = true
)]
struct Cli {
    /// Print results and errors as JSON on stdout
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    cmd: Option<Cmd>,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// List posts
    List,
    /// Print a post
    Read {
        slug: String,
        /// Print a heading and the body instead of the stored text
        #[arg(long)]
        render: bool,
    },
    /// Create or replace a post (body from --body, --file, or stdin)
    Write {
        #[arg(long)]
        title: String,
        #[arg(long, conflicts_with = "file")]
        body: Option<String>,
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Open config.toml in $EDITOR
    Config,
    /// Print the configuration directory
    Home,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let Some(cmd) = cli.cmd else {
        return Ok(());
    };

    match cmd {
        Cmd::List => cmd_list(cli.json),
        Cmd::Read { slug, render } => cmd_read(&slug, render, cli.json),
        Cmd::Write { title, body, file } => cmd_write(&title, body, file.as_deref(), cli.json),
        Cmd::Config => cmd_config(),
        Cmd::Home => {
            println!("{}", gitpost_home().display());
            Ok(())
        }
    }
}
