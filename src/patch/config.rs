//! The patch config record stored on a patches branch.

use crate::{
    constants::{PATCHES_CONFIG_FILE_NAME, PATCHES_CONFIG_SECTION},
    errors::{BranchError, BranchResult},
    git::RepositoryExt,
};
use git2::Repository;
use itertools::Itertools;
use std::{collections::BTreeMap, path::Path};
use tracing::{debug, info};

/// The keys of a patch config record, in sorted order.
pub const PATCH_CONFIG_KEYS: [&str; 4] = ["base", "parent", "trim", "trimbase"];

/// The persisted relationship between a destination branch and its upstream parent.
#[derive(Default, Debug, Clone, Eq, PartialEq)]
pub struct PatchConfig {
    /// The branch the destination branch was last branched or rebased from.
    pub parent: String,
    /// Commit hash of the destination branch when `parent` was last recorded.
    pub base: String,
    /// Sub directory promoted to the branch root. Empty means no trim.
    pub trim: String,
    /// Commit the trim operation was based on.
    pub trimbase: String,
}

impl PatchConfig {
    /// Creates a fresh [PatchConfig] for `parent` at `base`, without a trim.
    pub fn new(parent: impl Into<String>, base: impl Into<String>) -> Self {
        Self {
            parent: parent.into(),
            base: base.into(),
            ..Default::default()
        }
    }

    /// Builds a [PatchConfig] from raw key/value pairs.
    ///
    /// The key set must be exactly `{parent, base, trim, trimbase}`. Anything else is a
    /// [BranchError::ConfigValidation] error.
    pub fn from_entries<I, K, V>(entries: I) -> BranchResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut map = BTreeMap::new();
        for (key, value) in entries {
            let key = key.into();
            if map.insert(key.clone(), value.into()).is_some() {
                return Err(BranchError::ConfigValidation(format!(
                    "duplicate key `{}`",
                    key
                )));
            }
        }

        if !map.keys().map(String::as_str).eq(PATCH_CONFIG_KEYS) {
            return Err(BranchError::ConfigValidation(format!(
                "expected keys [{}], found [{}]",
                PATCH_CONFIG_KEYS.iter().join(", "),
                map.keys().join(", ")
            )));
        }

        let mut take = |key: &str| map.remove(key).unwrap_or_default();
        Ok(Self {
            parent: take("parent"),
            base: take("base"),
            trim: take("trim"),
            trimbase: take("trimbase"),
        })
    }

    /// Returns the key/value pairs of the record, in sorted key order.
    pub fn entries(&self) -> [(&'static str, &str); 4] {
        [
            ("base", self.base.as_str()),
            ("parent", self.parent.as_str()),
            ("trim", self.trim.as_str()),
            ("trimbase", self.trimbase.as_str()),
        ]
    }
}

/// Reads the [PatchConfig] of `patches_branch`.
///
/// ## Returns
/// - `Ok(Some(PatchConfig))` - The stored config.
/// - `Ok(None)` - The branch does not carry a config file yet.
/// - `Err(_)` - The config file exists but could not be read or validated.
pub fn get_patch_config(
    repository: &Repository,
    patches_branch: &str,
) -> BranchResult<Option<PatchConfig>> {
    repository.in_branch(patches_branch, |repo| {
        let conf_path = config_path(repo)?;
        if !conf_path.exists() {
            debug!(branch = patches_branch, "no patch config present");
            return Ok(None);
        }

        read_config_file(&conf_path)
            .map(Some)
            .map_err(|e| match e {
                BranchError::ConfigValidation(_) => e,
                other => BranchError::ConfigRetrieval {
                    branch: patches_branch.to_string(),
                    reason: other.to_string(),
                },
            })
    })
}

/// Writes `config` onto `patches_branch`, committing only if the file actually changed.
///
/// ## Returns
/// - `Ok(true)` - A commit was made.
/// - `Ok(false)` - The stored config was already identical.
pub fn set_patch_config(
    repository: &Repository,
    patches_branch: &str,
    config: &PatchConfig,
) -> BranchResult<bool> {
    repository.in_branch(patches_branch, |repo| {
        let conf_path = config_path(repo)?;
        write_config_file(&conf_path, config)?;

        repo.stage_path(Path::new(PATCHES_CONFIG_FILE_NAME))?;
        if !repo.has_staged_changes()? {
            debug!(branch = patches_branch, "patch config unchanged");
            return Ok(false);
        }

        repo.commit_staged(format!("Updated {}", PATCHES_CONFIG_FILE_NAME).as_str())?;
        info!("Updated patch config on {}", patches_branch);
        Ok(true)
    })
}

fn config_path(repository: &Repository) -> BranchResult<std::path::PathBuf> {
    repository
        .workdir()
        .map(|p| p.join(PATCHES_CONFIG_FILE_NAME))
        .ok_or_else(|| anyhow::anyhow!("Repository has no working directory").into())
}

fn read_config_file(path: &Path) -> BranchResult<PatchConfig> {
    let file = git2::Config::open(path)?;
    let glob = format!("{}\\..*", PATCHES_CONFIG_SECTION);

    let mut entries = Vec::new();
    let mut iter = file.entries(Some(glob.as_str()))?;
    while let Some(entry) = iter.next() {
        let entry = entry?;
        let name = entry
            .name()
            .ok_or_else(|| anyhow::anyhow!("Config key is not valid utf-8"))?;
        let key = name
            .strip_prefix(PATCHES_CONFIG_SECTION)
            .and_then(|k| k.strip_prefix('.'))
            .unwrap_or(name)
            .to_string();
        let value = entry.value().unwrap_or_default().to_string();
        entries.push((key, value));
    }

    PatchConfig::from_entries(entries)
}

fn write_config_file(path: &Path, config: &PatchConfig) -> BranchResult<()> {
    let mut file = git2::Config::open(path)?;
    for (key, value) in config.entries() {
        file.set_str(format!("{}.{}", PATCHES_CONFIG_SECTION, key).as_str(), value)?;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn sample() -> PatchConfig {
        PatchConfig {
            parent: "master".into(),
            base: "0123abcd".into(),
            trim: "pkg".into(),
            trimbase: "".into(),
        }
    }

    #[test]
    fn from_entries_accepts_exact_keys() {
        let config = PatchConfig::from_entries([
            ("trimbase", ""),
            ("parent", "master"),
            ("base", "0123abcd"),
            ("trim", "pkg"),
        ])
        .unwrap();
        assert_eq!(config, sample());
    }

    #[test]
    fn from_entries_rejects_missing_key() {
        let err = PatchConfig::from_entries([("parent", "master"), ("base", "x"), ("trim", "")])
            .unwrap_err();
        assert!(matches!(err, BranchError::ConfigValidation(_)));
    }

    #[test]
    fn from_entries_rejects_extra_key() {
        let err = PatchConfig::from_entries([
            ("parent", "master"),
            ("base", "x"),
            ("trim", ""),
            ("trimbase", ""),
            ("extra", "y"),
        ])
        .unwrap_err();
        assert!(matches!(err, BranchError::ConfigValidation(_)));
    }

    #[test]
    fn from_entries_rejects_duplicate_key() {
        let err = PatchConfig::from_entries([
            ("parent", "master"),
            ("parent", "other"),
            ("base", "x"),
            ("trim", ""),
            ("trimbase", ""),
        ])
        .unwrap_err();
        assert!(matches!(err, BranchError::ConfigValidation(_)));
    }

    #[test]
    fn config_file_round_trip_keeps_empty_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(PATCHES_CONFIG_FILE_NAME);

        write_config_file(&path, &sample()).unwrap();
        assert_eq!(read_config_file(&path).unwrap(), sample());

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("[patches]"));
    }

    #[test]
    fn config_file_with_foreign_key_is_invalid() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(PATCHES_CONFIG_FILE_NAME);
        write_config_file(&path, &sample()).unwrap();
        git2::Config::open(&path)
            .unwrap()
            .set_str("patches.extra", "1")
            .unwrap();

        let err = read_config_file(&path).unwrap_err();
        assert!(matches!(err, BranchError::ConfigValidation(_)));
    }
}
