//! `trim` subcommand.

use anyhow::anyhow;
use clap::Args;
use git2::Repository;
use nu_ansi_term::Color::Blue;
use relbranch::{errors::BranchResult, git::RepositoryExt, patch};
use std::{env, path::PathBuf};

/// CLI arguments for the `trim` subcommand.
#[derive(Debug, Clone, Eq, PartialEq, Args)]
pub struct TrimCmd {
    /// The sub directory to move to the root of the branch.
    #[arg(short, long, value_name = "SUB_DIRECTORY")]
    pub sub_directory: Option<String>,
    /// Change an already recorded sub directory, or trim an already trimmed branch.
    #[arg(short, long)]
    pub force: bool,
    /// Reverse a previous trim with a hard reset.
    #[arg(short, long)]
    pub undo: bool,
    /// Directory to run in, instead of the current one.
    #[arg(short = 'C', long, value_name = "DIR")]
    pub directory: Option<PathBuf>,
}

impl TrimCmd {
    /// Run the `trim` subcommand.
    pub fn run(self) -> BranchResult<i32> {
        let directory = match self.directory {
            Some(directory) => directory,
            None => env::current_dir()?,
        };
        let repo =
            Repository::discover(&directory).map_err(|_| anyhow!("Not in a git repository."))?;

        patch::trim(&repo, self.sub_directory.as_deref(), self.force, self.undo)?;

        println!(
            "Successfully {} `{}`.",
            if self.undo { "untrimmed" } else { "trimmed" },
            Blue.paint(repo.current_branch_name()?)
        );
        Ok(0)
    }
}
