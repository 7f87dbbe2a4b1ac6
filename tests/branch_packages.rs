mod common;

use common::TestRepo;
use pretty_assertions::assert_eq;
use git2::{BranchType, Repository};
use relbranch::{
    ctx::{BranchContext, BranchReport},
    errors::BranchError,
    errors::BranchResult,
    git::RepositoryExt,
    patch::{get_patch_config, GitPatchOps, PatchOps},
    prompt::ScriptedConfirm,
    settings::Unattended,
};

/// A repository with three packages under `src/`, checked out on `dev`.
fn workspace(versions: [&str; 3]) -> TestRepo {
    let t = TestRepo::with_commit();
    for (name, version) in ["alpha", "beta", "gamma"].into_iter().zip(versions) {
        t.commit_package(&format!("src/{}", name), name, version);
    }
    t.repo.create_branch("dev", true).unwrap();
    t
}

/// Gives `release/<name>` an existing branch pair whose recorded parent is `other`.
fn pin_to_other_parent(t: &TestRepo, name: &str) {
    let start = t.current();
    t.repo.checkout_branch("master").unwrap();
    if !t.exists("other") {
        t.repo.create_branch("other", false).unwrap();
    }
    let dst = format!("release/{}", name);
    t.repo.create_branch(&dst, false).unwrap();
    t.write_config(&format!("patches/{}", dst), "other", &t.tip(&dst));
    t.repo.checkout_branch(&start).unwrap();
}

#[test]
fn failing_package_does_not_stop_the_batch() {
    let t = workspace(["1.0.0", "1.0.0", "1.0.0"]);
    pin_to_other_parent(&t, "beta");
    let beta_tip = t.tip("release/beta");
    let ctx = BranchContext::new(&t.repo, Unattended::Abort).with_patch_ops(&GitPatchOps);

    let report = ctx
        .branch_packages("master", "release/", false, false, t.path())
        .unwrap();

    assert_eq!(report.version, "1.0.0");
    let branches = report
        .packages
        .iter()
        .map(|p| p.branch.as_str())
        .collect::<Vec<_>>();
    assert_eq!(branches, vec!["release/alpha", "release/beta", "release/gamma"]);
    assert!(report.packages[0].result.is_ok());
    assert!(matches!(
        report.packages[1].result,
        Err(BranchError::Declined(_))
    ));
    assert!(report.packages[2].result.is_ok());
    assert_eq!(report.exit_code(), BranchError::Declined(String::new()).exit_code());

    assert_eq!(t.current(), "dev");
    assert_eq!(t.tip("release/beta"), beta_tip);
    for name in ["alpha", "gamma"] {
        let dst = format!("release/{}", name);
        let config = get_patch_config(&t.repo, &format!("patches/{}", dst))
            .unwrap()
            .unwrap();
        assert_eq!(config.parent, "master");
        assert_eq!(config.trim, format!("src/{}", name));
        assert_eq!(config.base, t.tip(&dst));
        assert!(t.read_at(&dst, "package.xml").unwrap().contains(name));
    }
}

#[test]
fn last_failure_decides_the_exit_code() {
    let t = workspace(["1.0.0", "1.0.0", "1.0.0"]);
    pin_to_other_parent(&t, "alpha");
    t.write_raw_config(
        "patches/release/gamma",
        &[("parent", "master"), ("base", ""), ("trim", ""), ("trimbase", ""), ("extra", "1")],
    );
    let ctx = BranchContext::new(&t.repo, Unattended::Abort).with_patch_ops(&GitPatchOps);

    let report = ctx
        .branch_packages("master", "release", false, false, t.path())
        .unwrap();

    assert!(report.packages[1].result.is_ok());
    assert_eq!(
        report.exit_code(),
        BranchError::ConfigValidation(String::new()).exit_code()
    );
    assert_eq!(t.current(), "dev");
}

/// Deletes the source branch while trimming, so nothing can return to it afterwards.
struct DeletesSource<'s>(&'s str);

impl PatchOps for DeletesSource<'_> {
    fn trim(&self, repository: &Repository, _sub_dir: &str) -> BranchResult<()> {
        if let Ok(mut branch) = repository.find_branch(self.0, BranchType::Local) {
            branch.delete()?;
        }
        Ok(())
    }

    fn rebase(&self, _repository: &Repository) -> BranchResult<()> {
        Ok(())
    }
}

#[test]
fn failing_to_return_to_the_source_keeps_the_batch_going() {
    let t = workspace(["1.0.0", "1.0.0", "1.0.0"]);
    let ops = DeletesSource("master");
    let ctx = BranchContext::new(&t.repo, Unattended::Abort).with_patch_ops(&ops);

    let report = ctx
        .branch_packages("master", "release", false, false, t.path())
        .unwrap();

    assert_eq!(report.packages.len(), 3);
    let alpha = report.packages[0].result.as_ref().unwrap();
    assert!(matches!(alpha.followup_error, Some(BranchError::Git2(_))));
    assert_ne!(report.packages[0].exit_code(), 0);
    for package in &report.packages[1..] {
        assert!(matches!(
            package.result,
            Err(BranchError::MissingSourceBranch(_))
        ));
    }
    assert_eq!(
        report.exit_code(),
        BranchError::MissingSourceBranch(String::new()).exit_code()
    );
    assert!(t.exists("release/alpha"));
    assert_eq!(t.current(), "dev");
}

#[test]
fn version_mismatch_stops_before_branching() {
    let t = workspace(["1.0.0", "1.1.0", "1.0.0"]);
    let ctx = BranchContext::new(&t.repo, Unattended::Abort).with_patch_ops(&GitPatchOps);

    let err = ctx
        .branch_packages("master", "release", true, false, t.path())
        .unwrap_err();

    assert!(matches!(err, BranchError::VersionMismatch(_)));
    assert!(!t.exists("release/alpha"));
    assert_eq!(t.current(), "dev");
}

#[test]
fn no_packages_is_an_error() {
    let t = TestRepo::with_commit();
    let ctx = BranchContext::new(&t.repo, Unattended::Abort).with_patch_ops(&GitPatchOps);

    let err = ctx
        .branch_packages("master", "release", true, false, t.path())
        .unwrap_err();

    assert!(matches!(err, BranchError::NoPackages(_)));
    assert_eq!(t.current(), "master");
}

#[test]
fn declining_the_package_list_branches_nothing() {
    let t = workspace(["1.0.0", "1.0.0", "1.0.0"]);
    let confirm = ScriptedConfirm::new([false]);
    let ctx = BranchContext::new(&t.repo, Unattended::Abort)
        .with_confirm(&confirm)
        .with_patch_ops(&GitPatchOps);

    let err = ctx
        .branch_packages("master", "release", true, true, t.path())
        .unwrap_err();

    assert!(matches!(err, BranchError::Declined(_)));
    assert_eq!(confirm.asked().len(), 1);
    assert!(!t.exists("release/alpha"));
    assert_eq!(t.current(), "dev");
}

#[test]
fn legacy_stack_is_branched_by_name() {
    let t = TestRepo::with_commit();
    t.commit_file(
        "stack.xml",
        "<stack>\n  <name>langs</name>\n  <version>0.3.5</version>\n</stack>\n",
        "Add stack",
    );
    t.commit_package(".", "langs_pkg", "0.3.5");
    let ctx = BranchContext::new(&t.repo, Unattended::Abort).with_patch_ops(&GitPatchOps);

    let report = ctx
        .branch("master", "release", true, false, false, t.path())
        .unwrap();
    let BranchReport::Stack(outcome) = &report else {
        panic!("expected the stack to be branched");
    };
    assert_eq!(outcome.dst, "langs");
    assert_eq!(report.exit_code(), 0);
    assert_eq!(t.current(), "langs");

    t.repo.checkout_branch("master").unwrap();
    let report = ctx
        .branch("master", "release", true, false, true, t.path())
        .unwrap();
    let BranchReport::Packages(packages) = &report else {
        panic!("expected packages to be branched");
    };
    assert_eq!(packages.packages.len(), 1);
    assert_eq!(packages.packages[0].branch, "release/langs_pkg");
    // The package sits at the repository root, so nothing is trimmed.
    assert!(t.read_at("release/langs_pkg", "stack.xml").is_some());
    assert_eq!(t.current(), "master");
}
