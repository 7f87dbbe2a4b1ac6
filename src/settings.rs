//! User settings for `relbranch`, read from `~/.relbranch.toml`.

use crate::{
    constants::SETTINGS_FILE_NAME,
    errors::{BranchError, BranchResult},
};
use serde::Deserialize;
use std::{env, fs, path::PathBuf};

/// What to do when a significant change needs confirmation and nobody can be asked.
#[derive(Default, Debug, Clone, Copy, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unattended {
    /// Refuse the change.
    #[default]
    Abort,
    /// Apply the change, with a warning.
    Proceed,
}

/// The user settings file.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// The branch prefix used when none is given on the command line.
    pub prefix: String,
    /// Policy for confirmations that cannot be prompted.
    pub unattended: Unattended,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            prefix: "release".to_string(),
            unattended: Unattended::Abort,
        }
    }
}

impl Settings {
    /// Loads the settings file, falling back to defaults if there is none.
    pub fn load() -> BranchResult<Self> {
        match settings_path() {
            Some(path) if path.exists() => Self::from_toml(&fs::read_to_string(path)?),
            _ => Ok(Self::default()),
        }
    }

    /// Parses settings from a TOML document.
    pub fn from_toml(contents: &str) -> BranchResult<Self> {
        toml::from_str::<Self>(contents).map_err(|e| BranchError::Other(e.into()))
    }
}

/// Returns the path to the settings file, if a home directory is known.
pub fn settings_path() -> Option<PathBuf> {
    env::var_os("HOME").map(|home| PathBuf::from(home).join(SETTINGS_FILE_NAME))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_document_is_default() {
        assert_eq!(Settings::from_toml("").unwrap(), Settings::default());
    }

    #[test]
    fn parses_unattended_policy() {
        let settings = Settings::from_toml("unattended = \"proceed\"\n").unwrap();
        assert_eq!(settings.unattended, Unattended::Proceed);
        assert_eq!(settings.prefix, "release");
    }

    #[test]
    fn rejects_unknown_policy() {
        assert!(Settings::from_toml("unattended = \"maybe\"\n").is_err());
    }
}
