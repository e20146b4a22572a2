// src/recipe/parser.rs

//! Recipe file parsing

use crate::error::{Error, Result};
use crate::recipe::format::Recipe;
use crate::variant::is_valid_identifier;
use std::collections::BTreeSet;
use std::path::Path;

/// Parse a recipe from a TOML string
pub fn parse_recipe(content: &str) -> Result<Recipe> {
    toml::from_str(content).map_err(|e| Error::RecipeParse(format!("Invalid recipe: {}", e)))
}

/// Parse a recipe from a file
pub fn parse_recipe_file(path: &Path) -> Result<Recipe> {
    let content = std::fs::read_to_string(path)?;

    parse_recipe(&content)
        .map_err(|e| Error::RecipeParse(format!("{}: {}", path.display(), e)))
}

/// Validate a recipe for completeness and correctness
///
/// Hard problems are errors; anything merely suspicious is returned as a
/// list of warnings.
pub fn validate_recipe(recipe: &Recipe) -> Result<Vec<String>> {
    let mut warnings = Vec::new();
    let name = recipe.name();

    if name.is_empty() {
        return Err(Error::RecipeParse("Recipe package name cannot be empty".to_string()));
    }
    if !is_valid_identifier(name) {
        return Err(Error::RecipeParse(format!("Invalid package name: {}", name)));
    }

    let mut seen = BTreeSet::new();
    for base in recipe.bases() {
        if base == name {
            return Err(Error::CircularInheritance(format!("{} lists itself as a base", name)));
        }
        if !seen.insert(base) {
            return Err(Error::RecipeParse(format!("{} lists base {} twice", name, base)));
        }
    }

    if !recipe.is_abstract() && recipe.versions.is_empty() {
        warnings.push("Concrete package declares no versions".to_string());
    }
    if recipe.package.description.is_none() {
        warnings.push("Missing package description".to_string());
    }

    // Remote patches should be pinned
    let nested = recipe.depends_on.iter().flat_map(|d| d.patches.iter());
    for patch in recipe.patches.iter().chain(nested) {
        if patch.is_remote() && patch.sha256.is_none() {
            warnings.push(format!("Remote patch {} has no sha256", patch.file));
        }
    }

    Ok(warnings)
}
