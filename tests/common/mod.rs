//! Helpers for building throw-away git repositories.

#![allow(dead_code)]

use git2::{BranchType, Repository, RepositoryInitOptions, Signature};
use relbranch::{
    git::RepositoryExt,
    patch::{PatchOps, PATCH_CONFIG_KEYS},
};
use std::{
    cell::RefCell,
    fs,
    path::{Path, PathBuf},
};
use tempfile::TempDir;

/// A git repository in a temporary directory, removed on drop.
pub struct TestRepo {
    pub dir: TempDir,
    pub repo: Repository,
}

impl TestRepo {
    /// Creates a repository whose first branch is `master`, with a test identity.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temporary directory");
        let repo = Repository::init_opts(
            dir.path(),
            RepositoryInitOptions::new().initial_head("master"),
        )
        .expect("Failed to initialize git repository");

        {
            let mut config = repo.config().expect("Failed to get repository config");
            config.set_str("user.name", "Relbranch Test").unwrap();
            config.set_str("user.email", "relbranch-test@example.com").unwrap();
        }

        Self { dir, repo }
    }

    /// Creates a repository with one commit on `master`.
    pub fn with_commit() -> Self {
        let repo = Self::new();
        repo.commit_file("README.md", "# test\n", "Initial commit");
        repo
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Writes `content` to `path` and commits it on the current branch.
    pub fn commit_file(&self, path: &str, content: &str, message: &str) -> String {
        let full = self.path().join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&full, content).unwrap();

        let mut index = self.repo.index().unwrap();
        index.add_path(Path::new(path)).unwrap();
        index.write().unwrap();
        let tree = self.repo.find_tree(index.write_tree().unwrap()).unwrap();
        let signature = Signature::now("Relbranch Test", "relbranch-test@example.com").unwrap();

        let parents = match self.repo.head() {
            Ok(head) => vec![head.peel_to_commit().unwrap()],
            Err(_) => vec![],
        };
        let parents = parents.iter().collect::<Vec<_>>();
        self.repo
            .commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)
            .unwrap()
            .to_string()
    }

    /// Commits a `package.xml` for `name` at `version` in `dir`.
    pub fn commit_package(&self, dir: &str, name: &str, version: &str) {
        let path = if dir == "." {
            PathBuf::from("package.xml")
        } else {
            Path::new(dir).join("package.xml")
        };
        self.commit_file(
            path.to_str().unwrap(),
            &package_xml(name, version),
            &format!("Add {}", name),
        );
    }

    pub fn current(&self) -> String {
        self.repo.current_branch_name().unwrap()
    }

    pub fn tip(&self, branch: &str) -> String {
        self.repo.commit_hash(branch).unwrap()
    }

    pub fn exists(&self, branch: &str) -> bool {
        self.repo.find_branch(branch, BranchType::Local).is_ok()
    }

    /// Reads a file from the tree at the tip of `branch`.
    pub fn read_at(&self, branch: &str, path: &str) -> Option<String> {
        let tree = self
            .repo
            .find_branch(branch, BranchType::Local)
            .ok()?
            .get()
            .peel_to_tree()
            .ok()?;
        let entry = tree.get_path(Path::new(path)).ok()?;
        let blob = entry.to_object(&self.repo).ok()?.peel_to_blob().ok()?;
        Some(String::from_utf8_lossy(blob.content()).into_owned())
    }

    /// Writes a raw `patches.conf` with the given keys onto an orphan patches branch.
    pub fn write_raw_config(&self, patches_branch: &str, entries: &[(&str, &str)]) {
        if !self.exists(patches_branch) {
            self.repo.create_orphan_branch(patches_branch).unwrap();
        }
        let start = self.current();
        self.repo.checkout_branch(patches_branch).unwrap();

        let mut contents = String::from("[patches]\n");
        for (key, value) in entries {
            contents.push_str(&format!("\t{} = {}\n", key, value));
        }
        self.commit_file("patches.conf", &contents, "Raw config");

        self.repo.checkout_branch(&start).unwrap();
    }

    /// Writes a valid `patches.conf` onto an orphan patches branch.
    pub fn write_config(&self, patches_branch: &str, parent: &str, base: &str) {
        let values = [base, parent, "", ""];
        let entries = PATCH_CONFIG_KEYS
            .iter()
            .copied()
            .zip(values)
            .collect::<Vec<_>>();
        self.write_raw_config(patches_branch, &entries);
    }
}

pub fn package_xml(name: &str, version: &str) -> String {
    format!(
        r#"<?xml version="1.0"?>
<package format="2">
  <name>{}</name>
  <version>{}</version>
  <description>The {} package</description>
  <maintainer email="dev@example.com">Dev</maintainer>
  <license>BSD</license>
</package>
"#,
        name, version, name
    )
}

/// [PatchOps] that records calls and fails when told to.
#[derive(Default)]
pub struct RecordingOps {
    pub fail_trim: bool,
    pub fail_rebase: bool,
    pub calls: RefCell<Vec<String>>,
}

impl PatchOps for RecordingOps {
    fn trim(&self, _repository: &Repository, sub_dir: &str) -> relbranch::errors::BranchResult<()> {
        self.calls.borrow_mut().push(format!("trim {}", sub_dir));
        if self.fail_trim {
            return Err(relbranch::errors::BranchError::Trim("scripted".into()));
        }
        Ok(())
    }

    fn rebase(&self, _repository: &Repository) -> relbranch::errors::BranchResult<()> {
        self.calls.borrow_mut().push("rebase".to_string());
        if self.fail_rebase {
            return Err(relbranch::errors::BranchError::Rebase("scripted".into()));
        }
        Ok(())
    }
}
