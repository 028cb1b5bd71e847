// src/main.rs

mod cli;
mod commands;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use cli::{Cli, Commands};

fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let repo = commands::open_repository(&cli.repo)?;
    let actor = commands::actor(&cli.actor);
    let actor = actor.as_ref();

    match command {
        // =====================================================================
        // Record Commands
        // =====================================================================
        Commands::List { kind } => commands::cmd_list(&repo, kind),
        Commands::Show { kind, path, json } => commands::cmd_show(&repo, kind, &path, json),
        Commands::Create { kind, path, from } => {
            commands::cmd_create(&repo, actor, kind, &path, from.as_deref())
        }
        Commands::Put {
            kind,
            path,
            file,
            json,
        } => commands::cmd_put(&repo, actor, kind, &path, &file, json),
        Commands::Patch { kind, path, file } => {
            commands::cmd_patch(&repo, actor, kind, &path, &file)
        }
        Commands::Delete { kind, path } => commands::cmd_delete(&repo, actor, kind, &path),
        Commands::Query { kind, terms } => commands::cmd_query(&repo, kind, &terms),

        // =====================================================================
        // Catalog Commands
        // =====================================================================
        Commands::Catalogs => commands::cmd_catalogs(&repo),
        Commands::CatalogInfo => commands::cmd_catalog_info(&repo),
        Commands::RefCount { pkg_path } => commands::cmd_ref_count(&repo, &pkg_path),
        Commands::InstallItems { manifest } => commands::cmd_install_items(&repo, &manifest),

        // =====================================================================
        // Pkginfo Commands
        // =====================================================================
        Commands::Pkgsinfo { json } => commands::cmd_pkgsinfo(&repo, json),
        Commands::MassDelete { paths, delete_pkgs } => {
            commands::cmd_mass_delete(&repo, actor, &paths, delete_pkgs)
        }
        Commands::EditCatalogs { paths, add, remove } => {
            commands::cmd_edit_catalogs(&repo, actor, &paths, &add, &remove)
        }
    }
}
