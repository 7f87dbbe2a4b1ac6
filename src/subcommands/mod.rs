//! The subcommands for the `relbranch` application.

use clap::Subcommand;
use relbranch::errors::BranchResult;

mod branch;
pub use branch::BranchCmd;

mod trim;
pub use trim::TrimCmd;

#[derive(Debug, Clone, Eq, PartialEq, Subcommand)]
pub enum Subcommands {
    /// Branch a source branch into release branches, one per package (or one for a legacy
    /// `stack.xml`), creating their patches branches as needed.
    #[clap(alias = "b")]
    Branch(BranchCmd),
    /// Move a sub directory of the current branch to its root, or undo a previous trim.
    Trim(TrimCmd),
}

impl Subcommands {
    /// Run the subcommand, returning the process exit code.
    pub fn run(self) -> BranchResult<i32> {
        match self {
            Self::Branch(args) => args.run(),
            Self::Trim(args) => args.run(),
        }
    }
}
