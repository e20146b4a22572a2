// tests/recipes.rs

//! Loading and building recipe directories.

mod common;

use common::{mock_repo, recipe_dir, write_recipe};
use pkgmeta::deptype::DependencyType::{Build, Link, Run};
use pkgmeta::fetch::FetchStrategy;
use pkgmeta::patch::PatchSource;
use pkgmeta::{EngineConfig, Error, RecipeSet, Spec};

fn load(dir: &std::path::Path) -> RecipeSet {
    RecipeSet::load_dir(dir, EngineConfig::shared_default()).unwrap()
}

#[test]
fn test_load_nested_directories() {
    let repo = mock_repo();
    let set = load(repo.path());
    assert_eq!(set.len(), 7);
    assert!(set.get("PackageBase").unwrap().is_abstract());
    assert!(!set.get("libelf").unwrap().is_abstract());
}

#[test]
fn test_inheritance_chain_is_applied() {
    let repo = mock_repo();
    let set = load(repo.path());
    let libelf = set.build("libelf").unwrap();

    // From AutotoolsPackage
    let always = Spec::named("libelf");
    assert_eq!(
        libelf.dependency("autoconf", &always).unwrap().types.to_vec(),
        vec![Build]
    );
    assert!(libelf.dependencies().contains_key("automake"));
    // From PackageBase, through AutotoolsPackage
    assert!(libelf.variants().contains_key("debug"));
    assert_eq!(libelf.versions().len(), 2);
    assert!(libelf.provides("elf"));
}

#[test]
fn test_merged_dependency_from_recipe() {
    let repo = mock_repo();
    let set = load(repo.path());
    let libdwarf = set.build("libdwarf").unwrap();

    let dep = libdwarf
        .dependency("libelf", &Spec::named("libdwarf"))
        .unwrap();
    assert_eq!(dep.types.to_vec(), vec![Build, Link, Run]);
    assert_eq!(dep.target, Spec::parse("libelf@0.8:").unwrap());
}

#[test]
fn test_file_patches_resolve_against_recipe_dir() {
    let repo = mock_repo();
    let set = load(repo.path());
    let libdwarf = set.build("libdwarf").unwrap();

    let condition = Spec::anonymous("@:20120410", "libdwarf").unwrap();
    let patch = &libdwarf.patches()[&condition][0];
    let expected = repo.path().join("packages/libdwarf/fix-install.patch");
    assert_eq!(patch.source, PatchSource::File { path: expected });
    assert_eq!(patch.owner, "libdwarf");
}

#[test]
fn test_extends_and_resources_from_recipe() {
    let repo = mock_repo();
    let set = load(repo.path());
    let numpy = set.build("py-numpy").unwrap();

    assert_eq!(numpy.extendees()["python"].1["ignore"], "bin/f2py");
    let resources = &numpy.resources()[&Spec::named("py-numpy")];
    assert_eq!(resources[0].destination, "tests/data");
    assert!(matches!(resources[0].fetcher, FetchStrategy::Url { .. }));
    // PackageBase only, no autotools dependencies
    assert!(!numpy.dependencies().contains_key("autoconf"));
}

#[test]
fn test_build_all() {
    let repo = mock_repo();
    let set = load(repo.path());
    let packages = set.build_all().unwrap();
    let names: Vec<&str> = packages.iter().map(|p| p.name()).collect();
    assert_eq!(names.len(), 5);
    assert!(names.contains(&"mpich"));
    assert!(!names.contains(&"AutotoolsPackage"));
}

#[test]
fn test_inheritance_cycle_rejected() {
    let dir = recipe_dir(&[
        ("a.toml", "[package]\nname = \"a\"\nbases = [\"b\"]\n"),
        ("b.toml", "[package]\nname = \"b\"\nbases = [\"a\"]\n"),
    ]);
    let set = load(dir.path());
    assert!(matches!(set.build("a"), Err(Error::CircularInheritance(_))));
    assert!(matches!(set.build_each(), Err(Error::CircularInheritance(_))));
}

#[test]
fn test_unknown_base_rejected() {
    let dir = recipe_dir(&[("a.toml", "[package]\nname = \"a\"\nbases = [\"Missing\"]\n")]);
    let set = load(dir.path());
    assert!(matches!(set.build("a"), Err(Error::RecipeNotFound(_))));
}

#[test]
fn test_failure_in_one_recipe_is_reported_alone() {
    let repo = mock_repo();
    write_recipe(
        repo.path(),
        "packages/broken/package.toml",
        r#"
[package]
name = "broken"

[[depends_on]]
spec = "zlib@1.2"

[[depends_on]]
spec = "zlib@1.3"
"#,
    );
    let set = load(repo.path());
    let reports = set.build_each().unwrap();

    let broken = reports.iter().find(|r| r.name == "broken").unwrap();
    let err = broken.result.as_ref().unwrap_err();
    assert!(matches!(err.root(), Error::IncompatibleConstraint(_)));
    let ok = reports
        .iter()
        .filter(|r| matches!(r.result, Ok(Some(_))))
        .count();
    assert_eq!(ok, 5);
}

#[test]
fn test_invalid_recipe_file() {
    let dir = recipe_dir(&[("bad.toml", "[package]\nname = \"x\"\n[[depends_on]]\nspek = \"y\"\n")]);
    let err = RecipeSet::load_dir(dir.path(), EngineConfig::shared_default()).unwrap_err();
    assert!(matches!(err, Error::RecipeParse(_)));
}

#[test]
fn test_config_file_changes_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("pkgmeta.toml");
    std::fs::write(
        &config_path,
        "[directives]\ndefault_deptypes = [\"build\", \"link\", \"run\"]\n",
    )
    .unwrap();
    let config = std::sync::Arc::new(EngineConfig::load(&config_path).unwrap());

    let repo = recipe_dir(&[(
        "app.toml",
        "[package]\nname = \"app\"\n[[depends_on]]\nspec = \"zlib\"\n",
    )]);
    let set = RecipeSet::load_dir(repo.path(), config).unwrap();
    let app = set.build("app").unwrap();
    let dep = app.dependency("zlib", &Spec::named("app")).unwrap();
    assert_eq!(dep.types.to_vec(), vec![Build, Link, Run]);
}

#[test]
fn test_string_false_condition_in_recipe() {
    let dir = recipe_dir(&[(
        "app.toml",
        r#"
[package]
name = "app"

[[depends_on]]
spec = "zlib"
when = "False"

[[depends_on]]
spec = "bzip2"
when = "true"

[[patch]]
file = "skip.patch"
when = "false"
"#,
    )]);
    let set = load(dir.path());
    let app = set.build("app").unwrap();

    assert!(!app.dependencies().contains_key("zlib"));
    assert!(app.dependency("bzip2", &Spec::named("app")).is_some());
    assert!(app.patches().is_empty());
}
