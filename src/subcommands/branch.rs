//! `branch` subcommand.

use anyhow::anyhow;
use clap::Args;
use git2::Repository;
use nu_ansi_term::Color;
use relbranch::{
    ctx::{BranchContext, BranchReport, PackagesReport},
    errors::BranchResult,
    settings::{Settings, Unattended},
};
use std::{env, path::PathBuf};

/// CLI arguments for the `branch` subcommand.
#[derive(Debug, Clone, Eq, PartialEq, Args)]
pub struct BranchCmd {
    /// The source branch to branch from.
    pub src: String,
    /// Prefix of the destination branches; each package is branched to `<prefix>/<name>`.
    #[arg(short, long)]
    pub prefix: Option<String>,
    /// Don't rebase the stored patches onto existing destination branches.
    #[arg(long)]
    pub no_patch: bool,
    /// Summarize the changes and ask before making them.
    #[arg(short, long)]
    pub interactive: bool,
    /// Ignore a legacy `stack.xml` and branch packages instead.
    #[arg(long)]
    pub no_stack: bool,
    /// Proceed with parent or trim changes without asking.
    #[arg(short, long)]
    pub yes: bool,
    /// Directory to run in, instead of the current one.
    #[arg(short = 'C', long, value_name = "DIR")]
    pub directory: Option<PathBuf>,
}

impl BranchCmd {
    /// Run the `branch` subcommand.
    pub fn run(self) -> BranchResult<i32> {
        let directory = match self.directory {
            Some(directory) => directory,
            None => env::current_dir()?,
        };
        let repo =
            Repository::discover(&directory).map_err(|_| anyhow!("Not in a git repository."))?;

        let settings = Settings::load()?;
        let unattended = if self.yes {
            Unattended::Proceed
        } else {
            settings.unattended
        };
        let prefix = self.prefix.unwrap_or(settings.prefix);

        let ctx = BranchContext::new(&repo, unattended);
        let report = ctx.branch(
            &self.src,
            &prefix,
            !self.no_patch,
            self.interactive,
            self.no_stack,
            &directory,
        )?;

        match &report {
            BranchReport::Stack(outcome) => {
                if let Some(e) = &outcome.followup_error {
                    println!("{}", Color::Yellow.paint(format!("Warning: {}", e)));
                }
                println!(
                    "Successfully branched `{}` to `{}`.",
                    Color::Blue.paint(&self.src),
                    Color::Blue.paint(&outcome.dst)
                );
            }
            BranchReport::Packages(packages) => print_packages(packages),
        }

        Ok(report.exit_code())
    }
}

/// Prints one line per branched package.
fn print_packages(report: &PackagesReport) {
    for package in &report.packages {
        let code = package.exit_code();
        let status = if code == 0 {
            Color::Green.paint("ok")
        } else {
            Color::Red.paint(format!("failed ({})", code))
        };
        println!(
            "{}_{} -> `{}`: {}",
            package.package.name,
            report.version,
            Color::Blue.paint(&package.branch),
            status
        );
    }
}
