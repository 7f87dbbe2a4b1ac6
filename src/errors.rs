//! Error types for the `relbranch` application.

use nu_ansi_term::Color;
use thiserror::Error;

/// The error type for branch, patch config, and package operations.
#[derive(Error, Debug)]
pub enum BranchError {
    /// The source branch does not exist locally or on any remote.
    #[error("Specified source branch does not exist: `{}`", Color::Blue.paint(.0))]
    MissingSourceBranch(String),
    /// The patches branch for the current branch does not exist.
    #[error("No patches branch `{}` found.", Color::Blue.paint(.0))]
    MissingPatchesBranch(String),
    /// A patch config record does not have exactly the expected keys.
    #[error("Invalid patch config: {0}")]
    ConfigValidation(String),
    /// A patch config file exists but could not be read.
    #[error("Failed to retrieve patch config from `{}`: {}", Color::Blue.paint(.branch), .reason)]
    ConfigRetrieval {
        /// The patches branch the config was read from.
        branch: String,
        /// Why the read failed.
        reason: String,
    },
    /// Packages within one directory disagree on their version.
    #[error("Releasing multiple packages with different versions is not supported: {0}")]
    VersionMismatch(String),
    /// No package manifests were found.
    #[error("No {} found in `{}`", crate::constants::PACKAGE_FILE_NAME, .0)]
    NoPackages(String),
    /// The user (or the unattended policy) declined to continue.
    #[error("Answered no to continue: {0}")]
    Declined(String),
    /// `HEAD` does not point at a branch.
    #[error("Could not determine the current branch, HEAD is detached.")]
    DetachedHead,
    /// The trim operation refused to run.
    #[error("Trim failed: {0}")]
    Trim(String),
    /// Replaying stored patches failed.
    #[error("Patch rebase failed: {0}")]
    Rebase(String),
    /// A package manifest or stack descriptor could not be parsed.
    #[error("Failed to parse `{path}`: {reason}")]
    Manifest {
        /// Path of the manifest.
        path: String,
        /// Parser message.
        reason: String,
    },
    /// A [git2::Error] occurred.
    #[error("libgit2 error: {}", .0)]
    Git2(#[from] git2::Error),
    /// A [std::io::Error] occurred.
    #[error("io error: {}", .0)]
    Io(#[from] std::io::Error),
    /// An [inquire::InquireError] occurred.
    #[error("inquire error: {}", .0)]
    Inquire(#[from] inquire::InquireError),
    /// An [anyhow::Error] occurred.
    #[error("{}", .0)]
    Other(#[from] anyhow::Error),
}

impl BranchError {
    /// The process exit code reported for this error.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::MissingSourceBranch(_) | Self::MissingPatchesBranch(_) => 2,
            Self::ConfigValidation(_) => 3,
            Self::ConfigRetrieval { .. } => 4,
            Self::VersionMismatch(_) | Self::NoPackages(_) | Self::Manifest { .. } => 5,
            Self::Declined(_) => 6,
            Self::Trim(_) | Self::Rebase(_) => 7,
            _ => 1,
        }
    }
}

/// Result alias for [BranchError].
pub type BranchResult<T> = Result<T, BranchError>;

#[cfg(test)]
mod test {
    use super::BranchError;

    #[test]
    fn exit_codes_are_never_zero() {
        let errors = [
            BranchError::MissingSourceBranch("master".into()),
            BranchError::ConfigValidation("extra key".into()),
            BranchError::ConfigRetrieval {
                branch: "patches/release/foo".into(),
                reason: "missing key".into(),
            },
            BranchError::VersionMismatch("0.1.0 != 0.2.0".into()),
            BranchError::Declined("parent change".into()),
            BranchError::DetachedHead,
            BranchError::Rebase("conflict".into()),
        ];
        assert!(errors.iter().all(|e| e.exit_code() != 0));
    }
}
