//! Constants for the `relbranch` application.

/// Prefix of the companion patches branch for every destination branch.
pub const PATCHES_BRANCH_PREFIX: &str = "patches/";

/// Name of the config record file committed on a patches branch.
pub const PATCHES_CONFIG_FILE_NAME: &str = "patches.conf";

/// Git config section holding the patch config keys.
pub(crate) const PATCHES_CONFIG_SECTION: &str = "patches";

/// Name of the legacy single-stack descriptor.
pub const STACK_FILE_NAME: &str = "stack.xml";

/// Name of a package manifest.
pub const PACKAGE_FILE_NAME: &str = "package.xml";

/// Marker file that excludes a directory from package discovery.
pub(crate) const PACKAGE_IGNORE_MARKER: &str = "CATKIN_IGNORE";

/// Name of the user settings file, relative to `$HOME`.
pub const SETTINGS_FILE_NAME: &str = ".relbranch.toml";

/// A trim directory equal to this refers to the repository root.
pub(crate) const CURRENT_DIR: &str = ".";

/// Returns the name of the patches branch for `branch`.
pub fn patches_branch(branch: &str) -> String {
    format!("{}{}", PATCHES_BRANCH_PREFIX, branch)
}
