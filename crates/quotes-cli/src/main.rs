//! Quote Explorer CLI - browse, add and share quotes from the terminal

mod auth;
mod cli;
mod commands;
mod config_profiles;
mod error;


use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::commands::auth_cmd::run_auth;
use crate::commands::common::Backend;
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::profile::run_profile;
use crate::commands::quotes::{
    run_add, run_categories, run_delete, run_edit, run_list, run_show, ListArgs,
};
use crate::commands::search::run_search;
use crate::commands::share::{run_image, run_og, run_share};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {}", error.user_message());
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    #[cfg(debug_assertions)]
    dotenvy::dotenv().ok();

    let directive = "quotes=warn"
        .parse::<tracing_subscriber::filter::Directive>()
        .map_err(|error| CliError::Config(format!("Invalid log directive: {error}")))?;
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(directive))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let profile = cli.profile.as_deref();

    match cli.command {
        Commands::Config { command } => run_config(command, profile)?,
        Commands::Auth { command } => run_auth(command, profile).await?,
        Commands::Completions { shell, output } => run_completions(shell, output.as_deref())?,
        Commands::Og {
            quote,
            author,
            output,
        } => run_og(quote.as_deref(), author.as_deref(), &output).await?,
        command => run_remote(command, profile).await?,
    }

    Ok(())
}

/// Commands that need the configured project and the stored session.
async fn run_remote(command: Commands, profile: Option<&str>) -> Result<(), CliError> {
    let backend = Backend::connect(profile).await?;
    tracing::debug!(profile = %backend.profile_name, "Connected");

    match command {
        Commands::List {
            search,
            category,
            mine,
            page,
            json,
        } => {
            let args = ListArgs {
                search,
                category,
                mine,
                page,
            };
            run_list(&backend, &args, json).await
        }
        Commands::Search {
            category,
            mine,
            debounce_ms,
        } => run_search(&backend, category, mine, debounce_ms).await,
        Commands::Show { id, json } => run_show(&backend, &id, json).await,
        Commands::Add {
            content,
            author,
            category,
        } => run_add(&backend, &content, &author, category.as_deref()).await,
        Commands::Edit {
            id,
            content,
            author,
            category,
        } => {
            run_edit(
                &backend,
                &id,
                content.as_deref(),
                author.as_deref(),
                category.as_deref(),
            )
            .await
        }
        Commands::Delete { id } => run_delete(&backend, &id).await,
        Commands::Categories { json } => run_categories(&backend, json).await,
        Commands::Share { id } => run_share(&backend, &id).await,
        Commands::Image { id, output } => run_image(&backend, &id, output.as_deref()).await,
        Commands::Profile { command } => run_profile(&backend, command).await,
        Commands::Config { .. }
        | Commands::Auth { .. }
        | Commands::Completions { .. }
        | Commands::Og { .. } => Ok(()),
    }
}
