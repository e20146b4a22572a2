// src/recipe/set.rs

//! A collection of recipes that can be built together
//!
//! Recipes refer to their bases by name, so building one package means
//! finishing every layer it inherits from first.

use crate::builder::{Layer, Package, PackageBuilder};
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::recipe::format::Recipe;
use crate::recipe::graph::LayerGraph;
use crate::recipe::parser::{parse_recipe_file, validate_recipe};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

#[derive(Debug, Clone)]
struct Entry {
    recipe: Recipe,
    /// Directory file patches are resolved against
    dir: Option<PathBuf>,
}

/// Outcome of building one recipe as part of a whole set
#[derive(Debug)]
pub struct BuildReport {
    pub name: String,
    pub is_abstract: bool,
    pub result: Result<Option<Package>>,
}

/// Recipes indexed by package name
#[derive(Debug, Clone)]
pub struct RecipeSet {
    recipes: BTreeMap<String, Entry>,
    config: Arc<EngineConfig>,
}

impl Default for RecipeSet {
    fn default() -> Self {
        Self::new(EngineConfig::shared_default())
    }
}

impl RecipeSet {
    pub fn new(config: Arc<EngineConfig>) -> Self {
        Self {
            recipes: BTreeMap::new(),
            config,
        }
    }

    /// Load every `*.toml` recipe under `dir`, recursively
    pub fn load_dir(dir: impl AsRef<Path>, config: Arc<EngineConfig>) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(Error::RecipeNotFound(format!(
                "{} is not a directory",
                dir.display()
            )));
        }

        let mut set = Self::new(config);
        let mut paths: Vec<PathBuf> = WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "toml"))
            .collect();
        paths.sort();

        for path in paths {
            let recipe = parse_recipe_file(&path)?;
            for warning in validate_recipe(&recipe)? {
                debug!("{}: {}", path.display(), warning);
            }
            set.insert(recipe, path.parent())?;
        }

        info!("Loaded {} recipe(s) from {}", set.len(), dir.display());
        Ok(set)
    }

    /// Add a recipe; `dir` is where its file patches live
    pub fn insert(&mut self, recipe: Recipe, dir: Option<&Path>) -> Result<()> {
        let name = recipe.name().to_string();
        if self.recipes.contains_key(&name) {
            return Err(Error::RecipeParse(format!("Duplicate recipe for {}", name)));
        }
        self.recipes.insert(
            name,
            Entry {
                recipe,
                dir: dir.map(Path::to_path_buf),
            },
        );
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Recipe> {
        self.recipes.get(name).map(|e| &e.recipe)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.recipes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    pub fn config(&self) -> &Arc<EngineConfig> {
        &self.config
    }

    /// The inheritance graph of every recipe in the set
    pub fn graph(&self) -> Result<LayerGraph> {
        let mut graph = LayerGraph::new();
        for (name, entry) in &self.recipes {
            let bases: Vec<&str> = entry.recipe.bases().collect();
            for base in &bases {
                if !self.recipes.contains_key(*base) {
                    return Err(Error::RecipeNotFound(format!(
                        "{} (base of {})",
                        base, name
                    )));
                }
            }
            graph.add_layer(name, &bases);
        }
        Ok(graph)
    }

    /// A builder with every directive of `name` declared on it
    fn declare(&self, name: &str, layers: &BTreeMap<String, Arc<Layer>>) -> Result<PackageBuilder> {
        let entry = self
            .recipes
            .get(name)
            .ok_or_else(|| Error::RecipeNotFound(name.to_string()))?;

        let mut builder = PackageBuilder::with_config(name, Arc::clone(&self.config));
        if let Some(dir) = &entry.dir {
            builder.recipe_dir(dir);
        }
        for base in entry.recipe.bases() {
            let layer = layers
                .get(base)
                .ok_or_else(|| Error::RecipeNotFound(format!("{} (base of {})", base, name)))?;
            builder.base(layer);
        }
        entry.recipe.declare(&mut builder)?;
        Ok(builder)
    }

    /// Build the concrete package `name`
    pub fn build(&self, name: &str) -> Result<Package> {
        let entry = self
            .recipes
            .get(name)
            .ok_or_else(|| Error::RecipeNotFound(name.to_string()))?;
        if entry.recipe.is_abstract() {
            return Err(Error::RecipeParse(format!(
                "{} is an abstract layer and cannot be built",
                name
            )));
        }

        let graph = self.graph()?;
        let ancestors = graph.ancestors(name);
        let mut layers = BTreeMap::new();
        for layer in graph.topological_sort()? {
            if ancestors.contains(&layer) {
                let finished = self.declare(&layer, &layers)?.finish_layer();
                layers.insert(layer, finished);
            }
        }

        self.declare(name, &layers)?.build()
    }

    /// Build every recipe, reporting each outcome separately
    ///
    /// Abstract layers report `Ok(None)` once their actions are recorded. A
    /// layer whose base failed is not attempted.
    pub fn build_each(&self) -> Result<Vec<BuildReport>> {
        let graph = self.graph()?;
        let mut layers: BTreeMap<String, Arc<Layer>> = BTreeMap::new();
        let mut reports = Vec::with_capacity(self.recipes.len());

        for name in graph.topological_sort()? {
            let Some(entry) = self.recipes.get(&name) else {
                continue;
            };
            let is_abstract = entry.recipe.is_abstract();

            let missing_base = entry.recipe.bases().find(|b| !layers.contains_key(*b));
            let result = match missing_base {
                Some(base) => {
                    warn!("Skipping {}: base {} failed", name, base);
                    Err(Error::RecipeNotFound(format!("{} (base of {} failed)", base, name)))
                }
                None => self.declare(&name, &layers).and_then(|builder| {
                    layers.insert(name.clone(), builder.clone().finish_layer());
                    if is_abstract {
                        Ok(None)
                    } else {
                        builder.build().map(Some)
                    }
                }),
            };

            reports.push(BuildReport {
                name,
                is_abstract,
                result,
            });
        }

        Ok(reports)
    }

    /// Build every concrete package, stopping at the first failure
    pub fn build_all(&self) -> Result<Vec<Package>> {
        let mut packages = Vec::new();
        for report in self.build_each()? {
            if let Some(package) = report.result? {
                packages.push(package);
            }
        }
        Ok(packages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::parser::parse_recipe;

    fn set(recipes: &[&str]) -> RecipeSet {
        let mut set = RecipeSet::default();
        for content in recipes {
            set.insert(parse_recipe(content).unwrap(), None).unwrap();
        }
        set
    }

    const BASE: &str = r#"
[package]
name = "CMakePackage"
abstract = true

[[depends_on]]
spec = "cmake"
type = "build"
"#;

    const LEAF: &str = r#"
[package]
name = "hdf5"
bases = ["CMakePackage"]

[[version]]
id = "1.10.1"
"#;

    #[test]
    fn test_build_with_base() {
        let set = set(&[BASE, LEAF]);
        let pkg = set.build("hdf5").unwrap();
        assert!(pkg.dependencies().contains_key("cmake"));
        assert_eq!(pkg.layer().bases(), &["CMakePackage".to_string()]);
    }

    #[test]
    fn test_abstract_layer_not_buildable() {
        let set = set(&[BASE, LEAF]);
        assert!(set.build("CMakePackage").is_err());
        assert!(matches!(set.build("nope"), Err(Error::RecipeNotFound(_))));
    }

    #[test]
    fn test_unknown_base() {
        let set = set(&[LEAF]);
        assert!(matches!(set.build("hdf5"), Err(Error::RecipeNotFound(_))));
    }

    #[test]
    fn test_duplicate_recipe_rejected() {
        let mut set = set(&[LEAF]);
        assert!(set.insert(parse_recipe(LEAF).unwrap(), None).is_err());
    }

    #[test]
    fn test_build_each_reports_per_recipe() {
        let broken = r#"
[package]
name = "broken"

[[depends_on]]
spec = "broken"
"#;
        let set = set(&[BASE, LEAF, broken]);
        let reports = set.build_each().unwrap();
        assert_eq!(reports.len(), 3);

        let by_name: BTreeMap<&str, &BuildReport> =
            reports.iter().map(|r| (r.name.as_str(), r)).collect();
        assert!(matches!(by_name["CMakePackage"].result, Ok(None)));
        assert!(matches!(by_name["hdf5"].result, Ok(Some(_))));
        let err = by_name["broken"].result.as_ref().unwrap_err();
        assert!(matches!(err.root(), Error::CircularReference(_)));

        assert!(set.build_all().is_err());
    }
}
