// build.rs

use clap::{Arg, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Common argument: recipe directory
fn recipe_dir_arg() -> Arg {
    Arg::new("recipe_dir")
        .required(true)
        .value_name("RECIPE_DIR")
        .help("Directory containing recipe files")
}

fn build_cli() -> Command {
    Command::new("pkgmeta")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Pkgmeta Contributors")
        .about("Inspect and check package recipes and their merged metadata")
        .subcommand_required(false)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("PATH")
                .global(true)
                .help("Engine configuration file (TOML)"),
        )
        .subcommand(
            Command::new("show")
                .about("Build a package from a recipe directory and print its descriptor")
                .arg(recipe_dir_arg())
                .arg(Arg::new("package").required(true).help("Package to build"))
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(clap::ArgAction::SetTrue)
                        .help("Print the descriptor as JSON"),
                ),
        )
        .subcommand(
            Command::new("check")
                .about("Build every recipe in a directory and report failures")
                .arg(recipe_dir_arg())
                .arg(
                    Arg::new("warnings")
                        .short('w')
                        .long("warnings")
                        .action(clap::ArgAction::SetTrue)
                        .help("Also print recipe warnings"),
                ),
        )
        .subcommand(
            Command::new("layers")
                .about("List the recipes in a directory in inheritance order")
                .arg(recipe_dir_arg()),
        )
        .subcommand(
            Command::new("deptype")
                .about("Print the canonical form of dependency types")
                .arg(
                    Arg::new("types")
                        .num_args(0..)
                        .help("Type names (build, link, run)"),
                ),
        )
        .subcommand(
            Command::new("spec")
                .about("Parse a constraint expression and print its normalized form")
                .arg(Arg::new("expr").required(true).help("Constraint expression"))
                .arg(
                    Arg::new("owner")
                        .long("owner")
                        .help("Anchor the expression on this package"),
                ),
        )
        .subcommand(
            Command::new("completions")
                .about("Generate shell completion scripts")
                .arg(
                    Arg::new("shell")
                        .required(true)
                        .value_parser(["bash", "zsh", "fish", "powershell", "elvish"])
                        .help("Shell type"),
                ),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    let man = Man::new(build_cli());
    let mut buffer = Vec::new();

    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = man_dir.join("pkgmeta.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
    }
}
