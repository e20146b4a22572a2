// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use std::path::Path;
use tempfile::TempDir;

/// Write `content` to `rel` under `root`, creating parent directories.
pub fn write_recipe(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

/// Create a recipe directory from `(relative path, content)` pairs.
///
/// Keep the TempDir alive to prevent cleanup.
pub fn recipe_dir(files: &[(&str, &str)]) -> TempDir {
    let temp_dir = tempfile::tempdir().unwrap();
    for (rel, content) in files {
        write_recipe(temp_dir.path(), rel, content);
    }
    temp_dir
}

pub const PACKAGE_BASE: &str = r#"
[package]
name = "PackageBase"
abstract = true
description = "Root of every build system"

[[variant]]
name = "debug"
default = false
description = "Build with debug symbols"
"#;

pub const AUTOTOOLS: &str = r#"
[package]
name = "AutotoolsPackage"
abstract = true
bases = ["PackageBase"]

[[depends_on]]
spec = "autoconf"
type = "build"

[[depends_on]]
spec = "automake"
type = "build"
"#;

pub const LIBELF: &str = r#"
[package]
name = "libelf"
bases = ["AutotoolsPackage"]
description = "ELF object file access library"

[[version]]
id = "0.8.13"
checksum = "4136d7b4c04df68b686570afa26988ac"

[[version]]
id = "0.8.12"
checksum = "e21f8273d9f5f6d43a59878dc274fec7"

[[provides]]
virtuals = ["elf@0"]
"#;

pub const LIBDWARF: &str = r#"
[package]
name = "libdwarf"
bases = ["AutotoolsPackage"]
description = "DWARF debugging information library"

[[version]]
id = "20130729"
checksum = "64b42692e947d5180e162e46c689dfbf"

[[depends_on]]
spec = "libelf@0.8:"

[[depends_on]]
spec = "libelf"
type = "run"

[[patch]]
file = "fix-install.patch"
when = "@:20120410"
"#;

pub const MPICH: &str = r#"
[package]
name = "mpich"
bases = ["AutotoolsPackage"]
description = "MPI implementation"

[[version]]
id = "3.0.4"
checksum = "9c5d5d4fe1e17dd12153f40bc5b6dbc0"

[[variant]]
name = "pmi"
values = ["pmi", "pmi2", "pmix"]
default = "pmi"

[[provides]]
virtuals = ["mpi@:3"]
when = "@3:"

[[conflicts]]
spec = "%intel"
msg = "mpich does not build with icc"
"#;

pub const PYTHON: &str = r#"
[package]
name = "python"
bases = ["AutotoolsPackage"]
description = "Python interpreter"

[[version]]
id = "3.6.2"
checksum = "e1a36bfffdd1d3a780b1825daf16e56c"
"#;

pub const PY_NUMPY: &str = r#"
[package]
name = "py-numpy"
bases = ["PackageBase"]
description = "Array processing for numbers, strings, records, and objects"

[[version]]
id = "1.13.1"
checksum = "2c3c0f4edf720c3a7b525dacc825b9ae"

[[extends]]
spec = "python"
options = { ignore = "bin/f2py" }

[[resource]]
name = "testdata"
destination = "tests/data"
fetch = { url = "https://example.com/numpy-testdata.tar.gz", sha256 = "0000" }
"#;

/// A small repository with two abstract layers and several packages.
pub fn mock_repo() -> TempDir {
    recipe_dir(&[
        ("build_systems/package_base.toml", PACKAGE_BASE),
        ("build_systems/autotools.toml", AUTOTOOLS),
        ("packages/libelf/package.toml", LIBELF),
        ("packages/libdwarf/package.toml", LIBDWARF),
        ("packages/mpich/package.toml", MPICH),
        ("packages/python/package.toml", PYTHON),
        ("packages/py-numpy/package.toml", PY_NUMPY),
    ])
}
