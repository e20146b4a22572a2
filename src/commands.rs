// src/commands.rs

//! Command handlers for the pkgmeta CLI

use anyhow::{Context, Result};
use pkgmeta::deptype::{DepTypeSpec, canonical_deptype};
use pkgmeta::descriptor::PackageDescriptor;
use pkgmeta::recipe::{RecipeSet, parse_recipe_file, validate_recipe};
use pkgmeta::spec::Spec;
use pkgmeta::config::DEFAULT_CONFIG_FILE;
use pkgmeta::EngineConfig;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use walkdir::WalkDir;

/// Load the engine configuration
///
/// An explicit path must exist. Without one, `pkgmeta.toml` in the working
/// directory is used when present, the defaults otherwise.
pub fn load_config(path: Option<&Path>) -> Result<Arc<EngineConfig>> {
    let config = match path {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => EngineConfig::load_or_default(DEFAULT_CONFIG_FILE)
            .with_context(|| format!("Failed to load {}", DEFAULT_CONFIG_FILE))?,
    };
    Ok(Arc::new(config))
}

fn print_descriptor(desc: &PackageDescriptor) {
    println!("Package: {}", desc.name());

    if !desc.versions().is_empty() {
        println!("\nVersions:");
        for (version, meta) in desc.versions().iter().rev() {
            let details: Vec<String> = meta.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
            println!("  {:<16} {}", version, details.join(" "));
        }
    }

    if !desc.variants().is_empty() {
        println!("\nVariants:");
        for (name, variant) in desc.variants() {
            let multi = if variant.multi { " (multi)" } else { "" };
            println!(
                "  {:<16} [{}] {}{}",
                name,
                variant.default,
                variant.allowed_values(),
                multi
            );
            if !variant.description.is_empty() {
                println!("  {:<16} {}", "", variant.description);
            }
        }
    }

    if !desc.dependencies().is_empty() {
        println!("\nDependencies:");
        for (name, by_condition) in desc.dependencies() {
            for (condition, dep) in by_condition {
                println!("  {:<16} {} {} when {}", name, dep.target, dep.types, condition);
                for (when, patches) in &dep.patches {
                    for patch in patches {
                        println!("  {:<16}   patch {} when {}", "", patch.locator(), when);
                    }
                }
            }
        }
    }

    if !desc.extendees().is_empty() {
        println!("\nExtends:");
        for (name, (spec, options)) in desc.extendees() {
            let opts: Vec<String> = options.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
            println!("  {:<16} {} {}", name, spec, opts.join(" "));
        }
    }

    if !desc.provided().is_empty() {
        println!("\nProvides:");
        for (virtual_spec, conditions) in desc.provided() {
            for condition in conditions {
                println!("  {:<16} when {}", virtual_spec, condition);
            }
        }
    }

    if !desc.conflicts().is_empty() {
        println!("\nConflicts:");
        for (spec, conflicts) in desc.conflicts() {
            for conflict in conflicts {
                let msg = conflict.msg.as_deref().unwrap_or("");
                println!("  {:<16} when {} {}", spec, conflict.when, msg);
            }
        }
    }

    if !desc.patches().is_empty() {
        println!("\nPatches:");
        for (condition, patches) in desc.patches() {
            for patch in patches {
                println!("  {} -p{} when {}", patch.locator(), patch.level, condition);
            }
        }
    }

    if !desc.resources().is_empty() {
        println!("\nResources:");
        for (condition, resources) in desc.resources() {
            for resource in resources {
                let name = resource.name.as_deref().unwrap_or("(unnamed)");
                let dest = if resource.destination.is_empty() {
                    "."
                } else {
                    resource.destination.as_str()
                };
                println!("  {:<16} -> {} when {}", name, dest, condition);
            }
        }
    }
}

/// Build one package and print its descriptor
pub fn cmd_show(recipe_dir: &Path, package: &str, json: bool, config: Arc<EngineConfig>) -> Result<()> {
    let set = RecipeSet::load_dir(recipe_dir, config)?;
    let pkg = set.build(package)?;

    if json {
        println!("{}", serde_json::to_string_pretty(pkg.descriptor())?);
    } else {
        print_descriptor(pkg.descriptor());
    }
    Ok(())
}

/// Build every recipe in a directory, failing if any package fails
pub fn cmd_check(recipe_dir: &Path, show_warnings: bool, config: Arc<EngineConfig>) -> Result<()> {
    if show_warnings {
        for entry in WalkDir::new(recipe_dir).into_iter().filter_map(|e| e.ok()) {
            let path = entry.path();
            if !entry.file_type().is_file() || path.extension().is_none_or(|e| e != "toml") {
                continue;
            }
            let recipe = parse_recipe_file(path)?;
            for warning in validate_recipe(&recipe)? {
                println!("warning: {}: {}", path.display(), warning);
            }
        }
    }

    let set = RecipeSet::load_dir(recipe_dir, config)?;
    let mut built = 0usize;
    let mut failed = 0usize;

    for report in set.build_each()? {
        match report.result {
            Ok(Some(_)) => {
                built += 1;
                println!("ok      {}", report.name);
            }
            Ok(None) => println!("layer   {}", report.name),
            Err(e) => {
                failed += 1;
                warn!("{} failed: {}", report.name, e);
                println!("FAILED  {}: {}", report.name, e);
            }
        }
    }

    println!("\n{} package(s) built, {} failed", built, failed);
    if failed > 0 {
        anyhow::bail!("{} recipe(s) failed to build", failed);
    }
    Ok(())
}

/// List layers in the order they are finished
pub fn cmd_layers(recipe_dir: &Path, config: Arc<EngineConfig>) -> Result<()> {
    let set = RecipeSet::load_dir(recipe_dir, config)?;
    let graph = set.graph()?;

    for name in graph.topological_sort()? {
        let Some(recipe) = set.get(&name) else {
            continue;
        };
        let kind = if recipe.is_abstract() { "abstract" } else { "package" };
        let bases: Vec<&str> = recipe.bases().collect();
        if bases.is_empty() {
            println!("{:<24} {}", name, kind);
        } else {
            println!("{:<24} {} <- {}", name, kind, bases.join(", "));
        }
    }
    Ok(())
}

/// Print canonical dependency types
///
/// No names means the configured default deptypes; `all` means every type.
pub fn cmd_deptype(types: &[String], config: &EngineConfig) -> Result<()> {
    let canonical = match types {
        [] => config.default_deptypes()?,
        [one] => canonical_deptype(Some(&DepTypeSpec::One(one.clone())))?,
        many => canonical_deptype(Some(&DepTypeSpec::Many(many.to_vec())))?,
    };
    info!("Canonical dependency types: {}", canonical);
    println!("{}", canonical);
    Ok(())
}

/// Parse and print a constraint expression
pub fn cmd_spec(expr: &str, owner: Option<&str>) -> Result<()> {
    let spec = match owner {
        Some(owner) => Spec::anonymous(expr, owner)?,
        None => Spec::parse(expr)?,
    };
    println!("{}", spec);
    Ok(())
}
