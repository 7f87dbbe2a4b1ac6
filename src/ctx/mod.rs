//! The in-memory context of the `relbranch` application.

use crate::{
    errors::BranchError,
    packages::Package,
    patch::{GitPatchOps, PatchConfig, PatchOps},
    prompt::{Confirm, InquireConfirm},
    settings::Unattended,
};
use git2::Repository;

mod branch;
mod fmt;
mod packages;

pub use packages::derive_branch_name;

/// Everything an orchestration call needs: the repository whose working branch it moves,
/// and the collaborators it consults.
pub struct BranchContext<'a> {
    /// The repository being branched.
    pub repository: &'a Repository,
    /// Asks the user to continue.
    pub confirm: &'a dyn Confirm,
    /// Trim and patch rebase.
    pub patch_ops: &'a dyn PatchOps,
    /// Policy for significant changes when nobody can be asked.
    pub unattended: Unattended,
}

impl<'a> BranchContext<'a> {
    /// Creates a [BranchContext] with the terminal prompt and git-backed patch operations.
    pub fn new(repository: &'a Repository, unattended: Unattended) -> Self {
        Self {
            repository,
            confirm: &InquireConfirm,
            patch_ops: &GitPatchOps,
            unattended,
        }
    }

    /// Replaces the [Confirm] implementation.
    pub fn with_confirm(mut self, confirm: &'a dyn Confirm) -> Self {
        self.confirm = confirm;
        self
    }

    /// Replaces the [PatchOps] implementation.
    pub fn with_patch_ops(mut self, patch_ops: &'a dyn PatchOps) -> Self {
        self.patch_ops = patch_ops;
        self
    }
}

impl std::fmt::Debug for BranchContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BranchContext")
            .field("repository", &self.repository.path())
            .field("unattended", &self.unattended)
            .finish_non_exhaustive()
    }
}

/// A request to branch `src` into `dst`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct BranchRequest<'r> {
    /// The branch to copy from.
    pub src: &'r str,
    /// The destination branch.
    pub dst: &'r str,
    /// Replay stored patches when updating an existing branch pair.
    pub apply_patches: bool,
    /// Summarize and confirm before changing anything.
    pub interactive: bool,
    /// Sub directory to promote to the root of a freshly created `dst`. May be empty.
    pub trim_dir: &'r str,
}

/// Which branches an orchestration call has to create.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct BranchPlan {
    /// The destination branch does not exist anywhere.
    pub create_dst: bool,
    /// The patches branch does not exist anywhere.
    pub create_patches: bool,
}

/// The result of a successful [BranchContext::execute_branch] call.
#[derive(Debug)]
pub struct BranchOutcome {
    /// The destination branch, which is now checked out.
    pub dst: String,
    /// What had to be created.
    pub plan: BranchPlan,
    /// The config persisted on the patches branch.
    pub config: PatchConfig,
    /// Failure of the trim or patch rebase that followed the config update.
    pub followup_error: Option<BranchError>,
}

impl BranchOutcome {
    /// `0`, or the exit code of the trim/rebase failure.
    pub fn exit_code(&self) -> i32 {
        self.followup_error.as_ref().map_or(0, BranchError::exit_code)
    }
}

/// The result of branching a single package.
#[derive(Debug)]
pub struct PackageReport {
    /// The package.
    pub package: Package,
    /// The destination branch derived for it.
    pub branch: String,
    /// What [BranchContext::execute_branch] returned.
    pub result: Result<BranchOutcome, BranchError>,
}

impl PackageReport {
    /// The return code for this package.
    pub fn exit_code(&self) -> i32 {
        match &self.result {
            Ok(outcome) => outcome.exit_code(),
            Err(e) => e.exit_code(),
        }
    }

    /// Records a failure that happened after the package was branched. A package that has
    /// already failed keeps its first error.
    pub(crate) fn record_failure(&mut self, error: BranchError) {
        if let Ok(outcome) = &mut self.result {
            if outcome.followup_error.is_none() {
                outcome.followup_error = Some(error);
            }
        }
    }
}

/// The result of [BranchContext::branch_packages].
#[derive(Debug)]
pub struct PackagesReport {
    /// The version shared by every package.
    pub version: String,
    /// One report per package, in discovery order.
    pub packages: Vec<PackageReport>,
}

impl PackagesReport {
    /// The aggregate return code. The last failing package decides it.
    pub fn exit_code(&self) -> i32 {
        self.packages
            .iter()
            .map(PackageReport::exit_code)
            .filter(|code| *code != 0)
            .last()
            .unwrap_or(0)
    }
}

/// The result of [BranchContext::branch].
#[derive(Debug)]
pub enum BranchReport {
    /// A legacy `stack.xml` was branched as a single unit.
    Stack(BranchOutcome),
    /// Every package in the directory was branched.
    Packages(PackagesReport),
}

impl BranchReport {
    /// The aggregate return code.
    ///
    /// A single branch succeeds once its config is written, even if trim or rebase failed
    /// afterwards. Packages report those failures per package.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Stack(_) => 0,
            Self::Packages(report) => report.exit_code(),
        }
    }
}
