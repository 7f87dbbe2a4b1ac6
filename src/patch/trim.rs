//! Promotes a sub directory of a branch to its root.

use super::{get_patch_config, set_patch_config, update_tag, PatchConfig};
use crate::{
    constants::patches_branch,
    errors::{BranchError, BranchResult},
    git::{CursorGuard, RepositoryExt},
    packages::{find_packages, verify_equal_versions},
};
use git2::{build::CheckoutBuilder, ObjectType, Repository};
use std::path::Path;
use tracing::{debug, info, warn};

/// Trims the current branch down to a sub directory, or undoes a previous trim.
///
/// The sub directory and the commit the trim was based on are recorded in the config of
/// the branch's patches branch, and the release tag is moved to the result.
///
/// ## Takes
/// - `sub_dir` - The sub directory to promote. [None] keeps the one already recorded.
/// - `force` - Allow changing the recorded sub directory, or trimming twice.
/// - `undo` - Reset the branch to the commit it had before the trim.
pub fn trim(
    repository: &Repository,
    sub_dir: Option<&str>,
    force: bool,
    undo: bool,
) -> BranchResult<()> {
    let current = repository.current_branch_name()?;
    let patches = patches_branch(&current);
    let _guard = CursorGuard::acquire(repository)?;

    if !repository.ensure_local_branch(&patches)? {
        return Err(BranchError::MissingPatchesBranch(patches));
    }
    let mut config =
        get_patch_config(repository, &patches)?.ok_or_else(|| BranchError::ConfigRetrieval {
            branch: patches.clone(),
            reason: "no patch config found".to_string(),
        })?;

    if let Some(sub_dir) = sub_dir {
        set_trim_sub_dir(repository, &mut config, sub_dir, force)?;
    }

    if undo {
        undo_trim(repository, &mut config)?;
    } else {
        trim_to_sub_dir(repository, &mut config, force)?;
    }

    set_patch_config(repository, &patches, &config)?;
    tag_release(repository)
}

fn set_trim_sub_dir(
    repository: &Repository,
    config: &mut PatchConfig,
    sub_dir: &str,
    force: bool,
) -> BranchResult<()> {
    let sub_dir = normalize_sub_dir(sub_dir);
    if !config.trim.is_empty() && config.trim != sub_dir {
        warn!(
            "You are trying to set the trim sub directory to {}, but it is already set to {}.",
            sub_dir, config.trim
        );
        if !force {
            return Err(BranchError::Trim(format!(
                "the sub directory is already set to `{}`, use `--force` to change it",
                config.trim
            )));
        }
        warn!("Forcing the change of the sub directory.");
    }

    let head_tree = repository.head()?.peel_to_tree()?;
    let is_dir = head_tree
        .get_path(Path::new(sub_dir))
        .map(|entry| entry.kind() == Some(ObjectType::Tree))
        .unwrap_or(false);
    if !is_dir {
        return Err(BranchError::Trim(format!(
            "the sub directory `{}` does not exist on `{}`",
            sub_dir,
            repository.current_branch_name()?
        )));
    }

    config.trim = sub_dir.to_string();
    Ok(())
}

fn trim_to_sub_dir(
    repository: &Repository,
    config: &mut PatchConfig,
    force: bool,
) -> BranchResult<()> {
    if !config.trimbase.is_empty() {
        warn!("It looks like the trim operation has already been done, nested trimming is not supported.");
        if !force {
            return Err(BranchError::Trim(
                "branch is already trimmed, use `--force` to trim again".to_string(),
            ));
        }
        warn!("Proceeding anyways because of `--force`.");
    }
    if config.trim.is_empty() {
        return Err(BranchError::Trim("no sub directory to trim to".to_string()));
    }

    let head = repository.head()?.peel_to_commit()?;
    config.trimbase = head.id().to_string();

    let sub_tree = head
        .tree()?
        .get_path(Path::new(&config.trim))?
        .to_object(repository)?
        .peel_to_tree()?;

    // The checkout also resets the index to the sub tree, which is what gets committed.
    repository.checkout_tree(sub_tree.as_object(), Some(CheckoutBuilder::new().safe()))?;
    repository.commit_staged(
        format!(
            "Trimmed the branch to only the {} sub directory",
            config.trim
        )
        .as_str(),
    )?;

    config.base = repository.head_hash()?;
    info!("Trimmed {} to {}", repository.current_branch_name()?, config.trim);
    Ok(())
}

fn undo_trim(repository: &Repository, config: &mut PatchConfig) -> BranchResult<()> {
    if config.trimbase.is_empty() {
        return Err(BranchError::Trim(
            "it does not look like this branch has been trimmed".to_string(),
        ));
    }

    repository.reset_hard(&config.trimbase)?;
    config.trimbase.clear();
    Ok(())
}

fn tag_release(repository: &Repository) -> BranchResult<()> {
    let workdir = repository
        .workdir()
        .ok_or_else(|| anyhow::anyhow!("Repository has no working directory"))?;
    let packages = find_packages(workdir)?;
    if packages.is_empty() {
        debug!("no packages at the branch root, not tagging");
        return Ok(());
    }

    let version = verify_equal_versions(packages.iter())?;
    let tag = update_tag(repository, &version, true)?;
    info!("Tagged {}", tag);
    Ok(())
}

/// Strips a leading `./` and trailing `/` from a sub directory.
pub fn normalize_sub_dir(sub_dir: &str) -> &str {
    let sub_dir = sub_dir.strip_prefix("./").unwrap_or(sub_dir);
    sub_dir.trim_end_matches('/')
}
