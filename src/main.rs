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
    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Some(Commands::Show {
            recipe_dir,
            package,
            json,
        }) => commands::cmd_show(&recipe_dir, &package, json, config),

        Some(Commands::Check {
            recipe_dir,
            warnings,
        }) => commands::cmd_check(&recipe_dir, warnings, config),

        Some(Commands::Layers { recipe_dir }) => commands::cmd_layers(&recipe_dir, config),

        Some(Commands::Deptype { types }) => commands::cmd_deptype(&types, &config),

        Some(Commands::Spec { expr, owner }) => commands::cmd_spec(&expr, owner.as_deref()),

        Some(Commands::Completions { shell }) => {
            clap_complete::generate(shell, &mut Cli::command(), "pkgmeta", &mut std::io::stdout());
            Ok(())
        }

        None => {
            Cli::command().print_help()?;
            println!();
            Ok(())
        }
    }
}
