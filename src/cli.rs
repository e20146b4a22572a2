// src/cli.rs

//! CLI definitions for pkgmeta
//!
//! This module contains all command-line interface definitions using clap.
//! The actual command implementations are in the `commands` module.

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pkgmeta")]
#[command(author = "Pkgmeta Contributors")]
#[command(version)]
#[command(about = "Inspect and check package recipes and their merged metadata", long_about = None)]
pub struct Cli {
    /// Engine configuration file (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build a package from a recipe directory and print its descriptor
    Show {
        /// Directory containing recipe files
        recipe_dir: PathBuf,

        /// Package to build
        package: String,

        /// Print the descriptor as JSON
        #[arg(long)]
        json: bool,
    },

    /// Build every recipe in a directory and report failures
    Check {
        /// Directory containing recipe files
        recipe_dir: PathBuf,

        /// Also print recipe warnings
        #[arg(short, long)]
        warnings: bool,
    },

    /// List the recipes in a directory in inheritance order
    Layers {
        /// Directory containing recipe files
        recipe_dir: PathBuf,
    },

    /// Print the canonical form of dependency types
    ///
    /// With no names, prints the configured default deptypes (`build, link`
    /// unless the config says otherwise). Pass `all` for every type.
    Deptype {
        /// Type names (build, link, run, all); none means the configured default
        types: Vec<String>,
    },

    /// Parse a constraint expression and print its normalized form
    Spec {
        /// The expression, e.g. "mpich@3: +verbs %gcc"
        expr: String,

        /// Anchor the expression on this package as a `when` condition
        #[arg(long)]
        owner: Option<String>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}
