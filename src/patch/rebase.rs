//! Moves a destination branch onto the tip of its parent and replays the stored patches.

use super::{get_patch_config, list_patches, set_patch_config};
use crate::{
    constants::patches_branch,
    errors::{BranchError, BranchResult},
    git::RepositoryExt,
};
use git2::{build::CheckoutBuilder, BranchType, ObjectType, Repository};
use std::{
    fs,
    path::Path,
    process::{Command, Stdio},
};
use tempfile::TempDir;
use tracing::{debug, info};

/// Rebases the stored patches of the current branch onto the tip of its parent.
///
/// The branch gets a single new commit holding the parent's tree (or its trimmed sub
/// directory), which becomes the new `base`. Every `*.patch` file on the patches branch is
/// then applied on top with `git am`.
pub fn rebase_patches(repository: &Repository) -> BranchResult<()> {
    let current = repository.current_branch_name()?;
    let patches = patches_branch(&current);

    if repository.has_changes()? {
        return Err(BranchError::Rebase(format!(
            "`{}` has uncommitted changes",
            current
        )));
    }
    if !repository.ensure_local_branch(&patches)? {
        return Err(BranchError::MissingPatchesBranch(patches));
    }
    let mut config =
        get_patch_config(repository, &patches)?.ok_or_else(|| BranchError::ConfigRetrieval {
            branch: patches.clone(),
            reason: "no patch config found".to_string(),
        })?;
    if !repository.ensure_local_branch(&config.parent)? {
        return Err(BranchError::MissingSourceBranch(config.parent));
    }

    let parent_commit = repository
        .find_branch(&config.parent, BranchType::Local)?
        .get()
        .peel_to_commit()?;
    let mut parent_tree = parent_commit.tree()?;
    if !config.trim.is_empty() {
        parent_tree = parent_tree
            .get_path(Path::new(&config.trim))?
            .to_object(repository)?
            .peel_to_tree()?;
    }

    if parent_tree.id() != repository.head()?.peel_to_tree()?.id() {
        repository.checkout_tree(parent_tree.as_object(), Some(CheckoutBuilder::new().safe()))?;
        repository.commit_staged(
            format!(
                "Rebase from {} ({})",
                config.parent,
                &parent_commit.id().to_string()[..7]
            )
            .as_str(),
        )?;
        info!("Moved {} onto {}", current, config.parent);
    }

    config.base = repository.head_hash()?;
    set_patch_config(repository, &patches, &config)?;

    import_patches(repository, &patches)
}

/// Applies every `*.patch` file stored at the root of `patches` to the current branch.
fn import_patches(repository: &Repository, patches: &str) -> BranchResult<()> {
    let workdir = repository
        .workdir()
        .ok_or_else(|| anyhow::anyhow!("Repository has no working directory"))?;

    let staging = TempDir::new()?;
    let tree = repository
        .find_branch(patches, BranchType::Local)?
        .get()
        .peel_to_tree()?;
    for entry in tree.iter() {
        let Some(name) = entry.name() else { continue };
        if entry.kind() != Some(ObjectType::Blob) || !name.ends_with(".patch") {
            continue;
        }
        let blob = entry.to_object(repository)?.peel_to_blob()?;
        fs::write(staging.path().join(name), blob.content())?;
    }

    let files = list_patches(staging.path())?;
    if files.is_empty() {
        info!("No patches to apply from {}", patches);
        return Ok(());
    }
    debug!(count = files.len(), "applying patches");

    let output = Command::new("git")
        .arg("am")
        .arg("--3way")
        .args(files.iter().map(|f| staging.path().join(f)))
        .current_dir(workdir)
        .stdin(Stdio::null())
        .output()?;

    if !output.status.success() {
        let mut reason = String::from_utf8_lossy(&output.stderr).trim().to_string();

        // Leave the branch as it was before `git am` started.
        let abort = Command::new("git")
            .args(["am", "--abort"])
            .current_dir(workdir)
            .stdin(Stdio::null())
            .output();
        match abort {
            Ok(abort) if abort.status.success() => {}
            Ok(abort) => reason.push_str(&format!(
                "\n`git am --abort` failed ({}): {}",
                abort.status,
                String::from_utf8_lossy(&abort.stderr).trim()
            )),
            Err(e) => reason.push_str(&format!("\n`git am --abort` could not run: {}", e)),
        }
        return Err(BranchError::Rebase(reason));
    }

    info!("Applied {} patch(es) from {}", files.len(), patches);
    Ok(())
}
