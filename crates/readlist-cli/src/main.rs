//! Readlist CLI - track reading progress from the terminal
//!
//! Local edits are stored immediately; `readlist sync` reconciles them with
//! the remote store and parks divergent edits as conflicts.

mod cli;
mod commands;
mod error;


use clap::{CommandFactory, Parser};
use readlist_core::config::ClientConfig;

use crate::cli::{chosen_side, Cli, Commands};
use crate::commands::completions::run_completions;
use crate::commands::edit::{run_mark, run_rate, run_status};
use crate::commands::list::run_list;
use crate::commands::observe::run_observe;
use crate::commands::remove::run_remove;
use crate::commands::show::run_show;
use crate::commands::sync::{run_conflicts, run_resolve, run_sync};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("readlist_core=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let mut config = ClientConfig::load()?;
    if let Some(db_path) = cli.db_path {
        config.db_path = Some(db_path);
    }

    match cli.command {
        Some(Commands::List { status, json }) => run_list(status, json, &config).await?,
        Some(Commands::Show { id, json }) => run_show(id, json, &config).await?,
        Some(Commands::Observe {
            id,
            title,
            authors,
            chapters,
        }) => run_observe(id, &title, &authors, &chapters, &config).await?,
        Some(Commands::Mark { id, index }) => run_mark(id, index, &config).await?,
        Some(Commands::Status { id, status }) => run_status(id, status, &config).await?,
        Some(Commands::Rate { id, rating }) => run_rate(id, rating, &config).await?,
        Some(Commands::Remove { id }) => run_remove(id, &config).await?,
        Some(Commands::Sync) => run_sync(&config).await?,
        Some(Commands::Conflicts { json }) => run_conflicts(json, &config).await?,
        Some(Commands::Resolve { id, remote, .. }) => {
            run_resolve(id, chosen_side(remote), &config).await?;
        }
        Some(Commands::Completions { shell, output }) => {
            run_completions(shell, output.as_deref())?;
        }
        None => {
            Cli::command().print_help().map_err(CliError::Io)?;
            println!();
        }
    }

    Ok(())
}
