//! Utilities for interacting with `git` repositories for the `relbranch` application.

use crate::errors::{BranchError, BranchResult};
use git2::{
    build::CheckoutBuilder, BranchType, ErrorCode, Oid, Repository, ResetType, Signature,
    StatusOptions,
};
use std::path::Path;
use tracing::{debug, warn};

/// Returns the [Signature] used for commits made by `relbranch`.
///
/// The repository's own configuration is consulted first, falling back to the global
/// `user.name` and `user.email`.
pub fn committer_signature(repository: &Repository) -> BranchResult<Signature<'static>> {
    match repository.signature() {
        Ok(signature) => Ok(signature),
        Err(_) => {
            let config = git2::Config::open_default()?;
            let name = config.get_string("user.name")?;
            let email = config.get_string("user.email")?;
            Signature::now(name.as_str(), email.as_str()).map_err(Into::into)
        }
    }
}

/// The checked out position of a working directory.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Cursor {
    /// `HEAD` points at a local branch.
    Branch(String),
    /// `HEAD` is detached at a commit.
    Detached(Oid),
}

impl Cursor {
    /// Returns the branch name, if the cursor is on a branch.
    pub fn branch_name(&self) -> Option<&str> {
        match self {
            Self::Branch(name) => Some(name.as_str()),
            Self::Detached(_) => None,
        }
    }
}

impl std::fmt::Display for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Branch(name) => write!(f, "{}", name),
            Self::Detached(oid) => write!(f, "{} (detached)", oid),
        }
    }
}

/// Extension trait for the [Repository] type to expose helper functions related to
/// branch management.
pub trait RepositoryExt {
    /// Returns the current checkout position.
    fn current_cursor(&self) -> BranchResult<Cursor>;

    /// Returns the name of the current branch, failing on a detached `HEAD`.
    fn current_branch_name(&self) -> BranchResult<String>;

    /// Checks out the local branch with the given `branch_name`.
    ///
    /// ## Takes
    /// - `branch_name` - The name of the branch to checkout.
    ///
    /// ## Returns
    /// - `Result<()>` - The result of the operation.
    fn checkout_branch(&self, branch_name: &str) -> BranchResult<()>;

    /// Moves the working directory back to a previously recorded [Cursor].
    fn restore_cursor(&self, cursor: &Cursor) -> BranchResult<()>;

    /// Checks if a branch exists.
    ///
    /// ## Takes
    /// - `branch_name` - The name of the branch.
    /// - `local_only` - If `false`, a branch of the same name on any remote also counts.
    fn branch_exists(&self, branch_name: &str, local_only: bool) -> BranchResult<bool>;

    /// Creates a local branch tracking the remote branch of the same name.
    fn track_branch(&self, branch_name: &str) -> BranchResult<()>;

    /// Makes sure a local branch exists for `branch_name`, tracking the remote one if needed.
    ///
    /// ## Returns
    /// - `Ok(true)` - The branch exists locally (possibly after tracking).
    /// - `Ok(false)` - The branch does not exist anywhere.
    fn ensure_local_branch(&self, branch_name: &str) -> BranchResult<bool>;

    /// Creates a branch off the commit currently checked out.
    ///
    /// ## Takes
    /// - `branch_name` - The name of the new branch.
    /// - `change_to` - Whether to check out the new branch afterwards.
    fn create_branch(&self, branch_name: &str, change_to: bool) -> BranchResult<()>;

    /// Creates a branch with no history shared with any other branch. The working tree
    /// and `HEAD` are left untouched.
    fn create_orphan_branch(&self, branch_name: &str) -> BranchResult<Oid>;

    /// Returns the full hex commit hash at the tip of a local branch.
    fn commit_hash(&self, branch_name: &str) -> BranchResult<String>;

    /// Returns the full hex commit hash of `HEAD`.
    fn head_hash(&self) -> BranchResult<String>;

    /// Adds a path (relative to the working directory) to the index.
    fn stage_path(&self, path: &Path) -> BranchResult<()>;

    /// Checks if the index differs from the tree of `HEAD`.
    fn has_staged_changes(&self) -> BranchResult<bool>;

    /// Checks if the working tree has any modified, staged, or untracked files.
    fn has_changes(&self) -> BranchResult<bool>;

    /// Commits the index on top of `HEAD`.
    fn commit_staged(&self, message: &str) -> BranchResult<Oid>;

    /// Hard-resets the current branch to the given commit.
    fn reset_hard(&self, commit: &str) -> BranchResult<()>;

    /// Runs `op` with `branch_name` checked out, returning to the prior position on every
    /// exit path.
    fn in_branch<T, F>(&self, branch_name: &str, op: F) -> BranchResult<T>
    where
        F: FnOnce(&Repository) -> BranchResult<T>;
}

impl RepositoryExt for Repository {
    fn current_cursor(&self) -> BranchResult<Cursor> {
        let head = self.head()?;
        if head.is_branch() {
            let name = head
                .shorthand()
                .ok_or_else(|| anyhow::anyhow!("HEAD ref does not have a name"))?;
            Ok(Cursor::Branch(name.to_string()))
        } else {
            let oid = head
                .target()
                .ok_or_else(|| anyhow::anyhow!("HEAD does not point at a commit"))?;
            Ok(Cursor::Detached(oid))
        }
    }

    fn current_branch_name(&self) -> BranchResult<String> {
        match self.current_cursor()? {
            Cursor::Branch(name) => Ok(name),
            Cursor::Detached(_) => Err(BranchError::DetachedHead),
        }
    }

    fn checkout_branch(&self, branch_name: &str) -> BranchResult<()> {
        let ref_name = format!("refs/heads/{}", branch_name);
        let target = self.revparse_single(&ref_name)?;

        // Update the tree against the old `HEAD` first, so files that only exist on the
        // previous branch are removed.
        self.checkout_tree(&target, Some(CheckoutBuilder::new().safe()))?;
        self.set_head(&ref_name)?;

        debug!(branch = branch_name, "checked out branch");
        Ok(())
    }

    fn restore_cursor(&self, cursor: &Cursor) -> BranchResult<()> {
        match cursor {
            Cursor::Branch(name) => self.checkout_branch(name),
            Cursor::Detached(oid) => {
                let target = self.find_object(*oid, None)?;
                self.checkout_tree(&target, Some(CheckoutBuilder::new().safe()))?;
                self.set_head_detached(*oid)?;
                Ok(())
            }
        }
    }

    fn branch_exists(&self, branch_name: &str, local_only: bool) -> BranchResult<bool> {
        if self.find_branch(branch_name, BranchType::Local).is_ok() {
            return Ok(true);
        }
        if local_only {
            return Ok(false);
        }

        Ok(remote_branch_name(self, branch_name)?.is_some())
    }

    fn track_branch(&self, branch_name: &str) -> BranchResult<()> {
        let remote_name = remote_branch_name(self, branch_name)?.ok_or_else(|| {
            anyhow::anyhow!("No remote branch found for `{}`", branch_name)
        })?;
        let remote_commit = self
            .find_branch(&remote_name, BranchType::Remote)?
            .get()
            .peel_to_commit()?;

        let mut local = self.branch(branch_name, &remote_commit, false)?;
        local.set_upstream(Some(&remote_name))?;

        debug!(branch = branch_name, upstream = %remote_name, "created tracking branch");
        Ok(())
    }

    fn ensure_local_branch(&self, branch_name: &str) -> BranchResult<bool> {
        if !self.branch_exists(branch_name, false)? {
            return Ok(false);
        }
        if !self.branch_exists(branch_name, true)? {
            tracing::info!("Tracking branch: {}", branch_name);
            self.track_branch(branch_name)?;
        }
        Ok(true)
    }

    fn create_branch(&self, branch_name: &str, change_to: bool) -> BranchResult<()> {
        let head_commit = self.head()?.peel_to_commit()?;
        self.branch(branch_name, &head_commit, false)?;
        if change_to {
            self.checkout_branch(branch_name)?;
        }
        Ok(())
    }

    fn create_orphan_branch(&self, branch_name: &str) -> BranchResult<Oid> {
        let empty_tree = self.find_tree(self.treebuilder(None)?.write()?)?;
        let signature = committer_signature(self)?;
        let oid = self.commit(
            Some(format!("refs/heads/{}", branch_name).as_str()),
            &signature,
            &signature,
            format!("Created orphan branch {}", branch_name).as_str(),
            &empty_tree,
            &[],
        )?;
        Ok(oid)
    }

    fn commit_hash(&self, branch_name: &str) -> BranchResult<String> {
        let commit = self
            .find_branch(branch_name, BranchType::Local)?
            .get()
            .peel_to_commit()?;
        Ok(commit.id().to_string())
    }

    fn head_hash(&self) -> BranchResult<String> {
        Ok(self.head()?.peel_to_commit()?.id().to_string())
    }

    fn stage_path(&self, path: &Path) -> BranchResult<()> {
        let mut index = self.index()?;
        index.add_path(path)?;
        index.write()?;
        Ok(())
    }

    fn has_staged_changes(&self) -> BranchResult<bool> {
        let head_tree = match self.head() {
            Ok(head) => Some(head.peel_to_tree()?),
            Err(e) if e.code() == ErrorCode::UnbornBranch => None,
            Err(e) => return Err(e.into()),
        };
        let index = self.index()?;
        let diff = self.diff_tree_to_index(head_tree.as_ref(), Some(&index), None)?;
        Ok(diff.deltas().len() > 0)
    }

    fn has_changes(&self) -> BranchResult<bool> {
        let mut opts = StatusOptions::new();
        opts.include_untracked(true).include_ignored(false);
        Ok(!self.statuses(Some(&mut opts))?.is_empty())
    }

    fn commit_staged(&self, message: &str) -> BranchResult<Oid> {
        let mut index = self.index()?;
        let tree = self.find_tree(index.write_tree()?)?;
        let parent = self.head()?.peel_to_commit()?;
        let signature = committer_signature(self)?;
        let oid = self.commit(
            Some("HEAD"),
            &signature,
            &signature,
            message,
            &tree,
            &[&parent],
        )?;
        Ok(oid)
    }

    fn reset_hard(&self, commit: &str) -> BranchResult<()> {
        let target = self.revparse_single(commit)?;
        self.reset(&target, ResetType::Hard, None)?;
        Ok(())
    }

    fn in_branch<T, F>(&self, branch_name: &str, op: F) -> BranchResult<T>
    where
        F: FnOnce(&Repository) -> BranchResult<T>,
    {
        let previous = self.current_cursor()?;
        let switch = previous.branch_name() != Some(branch_name);
        if switch {
            self.checkout_branch(branch_name)?;
        }

        let result = op(self);

        if switch {
            if let Err(e) = self.restore_cursor(&previous) {
                // Don't mask the operation's own error with the restore failure.
                if result.is_ok() {
                    return Err(e);
                }
                warn!("Failed to return to `{}`: {}", previous, e);
            }
        }
        result
    }
}

/// Finds `<remote>/<branch_name>` on the first remote that has it.
fn remote_branch_name(repository: &Repository, branch_name: &str) -> BranchResult<Option<String>> {
    let remotes = repository.remotes()?;
    for remote in remotes.iter().flatten() {
        let candidate = format!("{}/{}", remote, branch_name);
        if repository.find_branch(&candidate, BranchType::Remote).is_ok() {
            return Ok(Some(candidate));
        }
    }
    Ok(None)
}

/// Restores a recorded [Cursor] when dropped, unless released first.
///
/// This is how orchestration steps guarantee that a failure before their terminal checkout
/// leaves the working directory on the branch it started from.
pub struct CursorGuard<'a> {
    repository: &'a Repository,
    cursor: Option<Cursor>,
}

impl<'a> CursorGuard<'a> {
    /// Records the current position of `repository`.
    pub fn acquire(repository: &'a Repository) -> BranchResult<Self> {
        Ok(Self {
            repository,
            cursor: Some(repository.current_cursor()?),
        })
    }

    /// Disarms the guard; the working directory is left where it is.
    pub fn release(mut self) {
        self.cursor = None;
    }
}

impl<'a> Drop for CursorGuard<'a> {
    fn drop(&mut self) {
        if let Some(cursor) = self.cursor.take() {
            debug!(%cursor, "restoring working branch");
            if let Err(e) = self.repository.restore_cursor(&cursor) {
                tracing::error!("Failed to restore working branch `{}`: {}", cursor, e);
            }
        }
    }
}
