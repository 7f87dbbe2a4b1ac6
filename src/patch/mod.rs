//! Patch branch management: the stored config record and the operations that consume it.

use crate::{errors::BranchResult, git::RepositoryExt};
use git2::Repository;
use std::{fs, path::Path};
use tracing::debug;

pub mod config;
pub use config::{get_patch_config, set_patch_config, PatchConfig, PATCH_CONFIG_KEYS};

mod rebase;
pub use rebase::rebase_patches;

mod trim;
pub use trim::{normalize_sub_dir, trim};

/// Operations run on a destination branch after its config has been persisted.
///
/// These are collaborators of the branch orchestrator. Their failures are reported
/// against the branch, but never undo the branch creation or update itself.
pub trait PatchOps {
    /// Promotes `sub_dir` to the root of the current branch.
    fn trim(&self, repository: &Repository, sub_dir: &str) -> BranchResult<()>;

    /// Replays the stored patches onto the current branch.
    fn rebase(&self, repository: &Repository) -> BranchResult<()>;
}

/// [PatchOps] backed by git itself.
#[derive(Default, Debug, Clone, Copy)]
pub struct GitPatchOps;

impl PatchOps for GitPatchOps {
    fn trim(&self, repository: &Repository, sub_dir: &str) -> BranchResult<()> {
        trim(repository, Some(sub_dir), false, false)
    }

    fn rebase(&self, repository: &Repository) -> BranchResult<()> {
        rebase_patches(repository)
    }
}

/// Lists the `*.patch` files in `directory`, sorted by name.
pub fn list_patches(directory: &Path) -> BranchResult<Vec<String>> {
    let mut patches = fs::read_dir(directory)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.ends_with(".patch"))
        .collect::<Vec<_>>();
    patches.sort();
    Ok(patches)
}

/// Points the tag `<current branch>/<version>` at `HEAD`.
pub fn update_tag(repository: &Repository, version: &str, force: bool) -> BranchResult<String> {
    let tag_name = format!("{}/{}", repository.current_branch_name()?, version);
    let head = repository.head()?.peel_to_commit()?;

    debug!("Updating tag {} to point to {}", tag_name, head.id());
    repository.tag_lightweight(&tag_name, head.as_object(), force)?;
    Ok(tag_name)
}
