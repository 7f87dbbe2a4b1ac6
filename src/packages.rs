//! Package discovery and the legacy stack descriptor.

use crate::{
    constants::{PACKAGE_FILE_NAME, PACKAGE_IGNORE_MARKER},
    errors::{BranchError, BranchResult},
};
use ignore::WalkBuilder;
use itertools::Itertools;
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::debug;

/// A package discovered in a source tree.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Package {
    /// The name of the package.
    pub name: String,
    /// The version of the package.
    pub version: String,
    /// The directory of the package, relative to the discovery root. The root itself is `.`.
    pub path: PathBuf,
}

/// The fields of a `package.xml` or `stack.xml` this crate cares about.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize)]
pub struct Manifest {
    /// The name of the package or stack.
    pub name: String,
    /// The version of the package or stack.
    pub version: String,
}

/// Parses a `package.xml` or legacy `stack.xml` file.
pub fn parse_manifest(path: &Path) -> BranchResult<Manifest> {
    let contents = fs::read_to_string(path)?;
    let manifest: Manifest =
        quick_xml::de::from_str(&contents).map_err(|e| BranchError::Manifest {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

    Ok(Manifest {
        name: manifest.name.trim().to_string(),
        version: manifest.version.trim().to_string(),
    })
}

/// Finds every package below `root`, in walk order.
///
/// A directory holding a `package.xml` is a package and is not searched further. Hidden
/// directories and directories containing a `CATKIN_IGNORE` marker are skipped.
pub fn find_packages(root: &Path) -> BranchResult<Vec<Package>> {
    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .hidden(true)
        .parents(false)
        .follow_links(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(|entry| {
            if entry.depth() == 0 {
                return true;
            }
            if !entry.file_type().is_some_and(|t| t.is_dir()) {
                return false;
            }
            let inside_package = entry
                .path()
                .parent()
                .is_some_and(|parent| parent.join(PACKAGE_FILE_NAME).is_file());
            !inside_package && !entry.path().join(PACKAGE_IGNORE_MARKER).exists()
        })
        .build();

    let mut packages = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|e| anyhow::anyhow!(e))?;
        let manifest_path = entry.path().join(PACKAGE_FILE_NAME);
        if !manifest_path.is_file() {
            continue;
        }

        let manifest = parse_manifest(&manifest_path)?;
        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        let path = if relative.as_os_str().is_empty() {
            PathBuf::from(".")
        } else {
            relative.to_path_buf()
        };
        debug!(name = %manifest.name, path = %path.display(), "found package");

        packages.push(Package {
            name: manifest.name,
            version: manifest.version,
            path,
        });
    }

    Ok(packages)
}

/// Checks that all packages share one version, and returns it.
pub fn verify_equal_versions<'a, I>(packages: I) -> BranchResult<String>
where
    I: IntoIterator<Item = &'a Package>,
{
    let packages = packages.into_iter().collect::<Vec<_>>();
    let first = packages
        .first()
        .ok_or_else(|| BranchError::NoPackages("an empty package set".to_string()))?;

    if let Some(other) = packages.iter().find(|p| p.version != first.version) {
        return Err(BranchError::VersionMismatch(format!(
            "{} is {}, but {} is {} ({})",
            first.name,
            first.version,
            other.name,
            other.version,
            packages
                .iter()
                .map(|p| format!("{}={}", p.name, p.version))
                .join(", ")
        )));
    }

    Ok(first.version.clone())
}
