//! Branching a source branch into a destination branch and its patches branch.

use super::{BranchContext, BranchOutcome, BranchPlan, BranchRequest};
use crate::{
    constants::{patches_branch, CURRENT_DIR},
    errors::{BranchError, BranchResult},
    git::{CursorGuard, RepositoryExt},
    patch::{get_patch_config, normalize_sub_dir, set_patch_config, PatchConfig},
    settings::Unattended,
};
use tracing::{debug, info, warn};

impl<'a> BranchContext<'a> {
    /// Works out which of the destination branch and its patches branch must be created,
    /// tracking any that only exist on a remote.
    ///
    /// ## Returns
    /// - `Ok(BranchPlan)` - What has to be created.
    /// - `Err(BranchError::MissingSourceBranch)` - `src` does not exist anywhere.
    pub fn plan_branch(&self, src: &str, dst: &str) -> BranchResult<BranchPlan> {
        if !self.repository.ensure_local_branch(src)? {
            return Err(BranchError::MissingSourceBranch(src.to_string()));
        }

        let create_dst = !self.repository.ensure_local_branch(dst)?;
        let create_patches = !self.repository.ensure_local_branch(&patches_branch(dst))?;

        Ok(BranchPlan {
            create_dst,
            create_patches,
        })
    }

    /// Branches `src` into `dst`, creating `dst` and `patches/<dst>` as needed and
    /// recording the new parent and base on the patches branch.
    ///
    /// If the call fails before the config is written, the working branch is left where it
    /// was. On success `dst` is checked out. Trim (for a fresh `dst`) and patch rebase (for
    /// an existing pair) run afterwards; their failures are kept in
    /// [BranchOutcome::followup_error] instead of failing the call.
    pub fn execute_branch(&self, request: &BranchRequest<'_>) -> BranchResult<BranchOutcome> {
        let BranchRequest {
            src,
            dst,
            apply_patches,
            interactive,
            trim_dir,
        } = *request;
        let trim_dir = normalize_sub_dir(trim_dir);
        let dst_patches = patches_branch(dst);

        let plan = self.plan_branch(src, dst)?;

        if interactive {
            self.print_plan(src, dst, &plan)?;
            if !self.confirm.confirm("Continue?")? {
                return Err(BranchError::Declined("branch summary".to_string()));
            }
        }

        let guard = CursorGuard::acquire(self.repository)?;

        // Change to the src branch, then to a fresh or existing dst branch.
        self.repository.checkout_branch(src)?;
        if plan.create_dst {
            info!("Creating {} from {}", dst, src);
            self.repository.create_branch(dst, true)?;
        } else {
            self.repository.checkout_branch(dst)?;
        }

        let previous = if plan.create_patches {
            info!("Creating {}", dst_patches);
            self.repository.create_orphan_branch(&dst_patches)?;
            None
        } else {
            let config = get_patch_config(self.repository, &dst_patches)?.ok_or_else(|| {
                BranchError::ConfigRetrieval {
                    branch: dst_patches.clone(),
                    reason: "no patch config found".to_string(),
                }
            })?;
            self.check_config_change(&config, src, trim_dir, interactive)?;
            Some(config)
        };

        // The current commit of dst is the baseline for future rebases.
        let base = self.repository.commit_hash(dst)?;
        let config = match previous {
            Some(previous) => PatchConfig {
                parent: src.to_string(),
                base,
                ..previous
            },
            None => PatchConfig::new(src, base),
        };
        set_patch_config(self.repository, &dst_patches, &config)?;

        // The branch operation has succeeded, whatever happens to trim and rebase.
        guard.release();
        self.repository.checkout_branch(dst)?;

        let followup_error = self
            .run_followups(&plan, apply_patches, trim_dir)
            .err()
            .inspect(|e| warn!("Branching {} succeeded, but: {}", dst, e));

        Ok(BranchOutcome {
            dst: dst.to_string(),
            plan,
            config,
            followup_error,
        })
    }

    /// Asks before changing the parent or the trim directory of an existing branch pair.
    fn check_config_change(
        &self,
        config: &PatchConfig,
        src: &str,
        trim_dir: &str,
        interactive: bool,
    ) -> BranchResult<()> {
        if config.parent != src {
            self.confirm_significant_change(
                format!(
                    "You are changing the parent branch to {} from {}.",
                    src, config.parent
                ),
                interactive,
            )?;
        }

        let requested_trim = if trim_dir == CURRENT_DIR { "" } else { trim_dir };
        if !trim_dir.is_empty() && config.trim != requested_trim {
            self.confirm_significant_change(
                format!(
                    "You are changing the sub directory for the destination branch to {} from {}.",
                    trim_dir, config.trim
                ),
                interactive,
            )?;
        }

        Ok(())
    }

    fn confirm_significant_change(&self, change: String, interactive: bool) -> BranchResult<()> {
        warn!("{}", change);

        let proceed = if interactive {
            self.confirm
                .confirm(format!("{} Are you sure you want to do this?", change).as_str())?
        } else {
            match self.unattended {
                Unattended::Proceed => {
                    warn!("Proceeding without confirmation.");
                    true
                }
                Unattended::Abort => false,
            }
        };

        if proceed {
            Ok(())
        } else {
            Err(BranchError::Declined(change))
        }
    }

    /// Trims a fresh destination branch, or rebases the patches of an existing pair.
    fn run_followups(
        &self,
        plan: &BranchPlan,
        apply_patches: bool,
        trim_dir: &str,
    ) -> BranchResult<()> {
        if !trim_dir.is_empty() && trim_dir != CURRENT_DIR && plan.create_dst {
            debug!(trim_dir, "trimming fresh destination branch");
            self.patch_ops.trim(self.repository, trim_dir)?;
        }

        if !plan.create_dst && !plan.create_patches {
            if apply_patches {
                debug!("rebasing stored patches");
                self.patch_ops.rebase(self.repository)?;
            } else {
                info!("Skipping the patch rebase because `--no-patch` was passed.");
            }
        }

        Ok(())
    }
}
