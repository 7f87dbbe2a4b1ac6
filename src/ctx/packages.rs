//! Branching every package of a source tree, and choosing between that and a legacy stack.

use super::{BranchContext, BranchReport, BranchRequest, PackageReport, PackagesReport};
use crate::{
    constants::{CURRENT_DIR, STACK_FILE_NAME},
    errors::{BranchError, BranchResult},
    git::{CursorGuard, RepositoryExt},
    packages::{find_packages, parse_manifest, verify_equal_versions, Package},
};
use itertools::Itertools;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{error, info, warn};

/// Returns the destination branch for `package_name` under `prefix`, with exactly one `/`
/// between them. An empty prefix yields the bare package name.
pub fn derive_branch_name(prefix: &str, package_name: &str) -> String {
    if prefix.is_empty() {
        return package_name.to_string();
    }
    format!("{}/{}", prefix.trim_end_matches('/'), package_name)
}

impl<'a> BranchContext<'a> {
    /// Branches `src` for the source tree in `directory`.
    ///
    /// A legacy `stack.xml` at the root of `directory` is branched as a single branch named
    /// after the stack, unless `ignore_stack` is set. Otherwise every package is branched
    /// under `prefix`.
    pub fn branch(
        &self,
        src: &str,
        prefix: &str,
        apply_patches: bool,
        interactive: bool,
        ignore_stack: bool,
        directory: &Path,
    ) -> BranchResult<BranchReport> {
        let stack_path = directory.join(STACK_FILE_NAME);
        info!("Checking for {} in {}", STACK_FILE_NAME, directory.display());

        if !ignore_stack && stack_path.is_file() {
            let stack = parse_manifest(&stack_path)?;
            let outcome = self.execute_branch(&BranchRequest {
                src,
                dst: &stack.name,
                apply_patches,
                interactive,
                trim_dir: "",
            })?;
            return Ok(BranchReport::Stack(outcome));
        }

        info!("{} not found, searching for packages", STACK_FILE_NAME);
        self.branch_packages(src, prefix, apply_patches, interactive, directory)
            .map(BranchReport::Packages)
    }

    /// Branches every package found in `directory` into `<prefix>/<package name>`.
    ///
    /// A failing package does not stop the others; its failure is recorded in its
    /// [PackageReport]. The working branch is restored when the call returns.
    pub fn branch_packages(
        &self,
        src: &str,
        prefix: &str,
        apply_patches: bool,
        interactive: bool,
        directory: &Path,
    ) -> BranchResult<PackagesReport> {
        let _guard = CursorGuard::acquire(self.repository)?;

        if !self.repository.ensure_local_branch(src)? {
            return Err(BranchError::MissingSourceBranch(src.to_string()));
        }
        if self.repository.current_cursor()?.branch_name() != Some(src) {
            info!("Changing to specified source branch {}", src);
            self.repository.checkout_branch(src)?;
        }

        let packages = find_packages(directory)?;
        if packages.is_empty() {
            return Err(BranchError::NoPackages(directory.display().to_string()));
        }
        let version = verify_equal_versions(&packages)?;

        let branches = packages
            .iter()
            .map(|p| derive_branch_name(prefix, &p.name))
            .collect::<Vec<_>>();
        info!(
            "Branching these packages: [{}]",
            packages.iter().map(|p| p.name.as_str()).join(", ")
        );
        if interactive {
            self.print_package_branches(
                packages
                    .iter()
                    .map(|p| p.name.as_str())
                    .zip(branches.iter().map(String::as_str)),
            )?;
            if !self.confirm.confirm("Continue?")? {
                return Err(BranchError::Declined("package branches".to_string()));
            }
        }

        let trim_root = self.trim_root(directory)?;
        let mut reports = Vec::with_capacity(packages.len());
        for (package, branch) in packages.into_iter().zip(branches) {
            let mut report =
                self.branch_package(src, package, branch, &version, apply_patches, &trim_root);
            if let Err(e) = self.repository.checkout_branch(src) {
                error!(
                    "Failed to return to {} after branching {}: {}",
                    src, report.package.name, e
                );
                report.record_failure(e);
            }
            reports.push(report);
        }

        Ok(PackagesReport {
            version,
            packages: reports,
        })
    }

    fn branch_package(
        &self,
        src: &str,
        package: Package,
        branch: String,
        version: &str,
        apply_patches: bool,
        trim_root: &Path,
    ) -> PackageReport {
        let trim_dir = package_trim_dir(trim_root, &package.path);
        info!(
            "Branching {}_{} to {}",
            package.name, version, branch
        );

        let result = self.execute_branch(&BranchRequest {
            src,
            dst: &branch,
            apply_patches,
            interactive: false,
            trim_dir: &trim_dir,
        });

        let report = PackageReport {
            package,
            branch,
            result,
        };
        let code = report.exit_code();
        match &report.result {
            Ok(_) if code == 0 => info!(
                "Branching {}_{} to {} returned 0",
                report.package.name, version, report.branch
            ),
            Ok(outcome) => warn!(
                "Branching {}_{} to {} returned {}: {}",
                report.package.name,
                version,
                report.branch,
                code,
                outcome
                    .followup_error
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_default()
            ),
            Err(e) => error!(
                "Error branching {} to {} (returned {}): {}",
                report.package.name, report.branch, code, e
            ),
        }
        report
    }

    /// Location of `directory` within the repository, which prefixes every package path to
    /// form its trim directory.
    fn trim_root(&self, directory: &Path) -> BranchResult<PathBuf> {
        let Some(workdir) = self.repository.workdir() else {
            return Ok(PathBuf::new());
        };
        let workdir = fs::canonicalize(workdir)?;
        let directory = fs::canonicalize(directory)?;
        Ok(directory
            .strip_prefix(&workdir)
            .map(Path::to_path_buf)
            .unwrap_or_default())
    }
}

/// Joins the trim root and a package path, using `.` for the repository root.
fn package_trim_dir(trim_root: &Path, package_path: &Path) -> String {
    let path = if package_path == Path::new(CURRENT_DIR) {
        trim_root.to_path_buf()
    } else {
        trim_root.join(package_path)
    };

    if path.as_os_str().is_empty() {
        CURRENT_DIR.to_string()
    } else {
        path.to_string_lossy().replace('\\', "/")
    }
}
