//! Contains the formatting logic for the [BranchContext] struct.

use super::{BranchContext, BranchPlan};
use crate::{constants::patches_branch, errors::BranchResult};
use nu_ansi_term::Color;
use std::fmt::Write;

impl<'a> BranchContext<'a> {
    /// Prints the summary of what branching `src` into `dst` is going to do.
    pub fn print_plan(&self, src: &str, dst: &str, plan: &BranchPlan) -> BranchResult<()> {
        let mut buf = String::new();
        write_plan(&mut buf, src, dst, plan).map_err(|e| anyhow::anyhow!(e))?;
        print!("{}", buf);
        Ok(())
    }

    /// Prints the destination branch each package is going to be branched into.
    pub fn print_package_branches<'p, I>(&self, mappings: I) -> BranchResult<()>
    where
        I: IntoIterator<Item = (&'p str, &'p str)>,
    {
        let mut buf = String::new();
        write_package_branches(&mut buf, mappings).map_err(|e| anyhow::anyhow!(e))?;
        print!("{}", buf);
        Ok(())
    }
}

/// Writes the summary of a [BranchPlan].
pub(crate) fn write_plan<W: Write>(
    w: &mut W,
    src: &str,
    dst: &str,
    plan: &BranchPlan,
) -> std::fmt::Result {
    writeln!(w, "Summary of changes:")?;
    if plan.create_dst {
        writeln!(
            w,
            "- The specified destination branch, {}, does not exist, it will be created from the source branch {}",
            Color::Blue.bold().paint(dst),
            Color::Blue.bold().paint(src)
        )?;
    }
    if plan.create_patches {
        writeln!(
            w,
            "- The destination patches branch, {}, does not exist, it will be created",
            Color::Blue.bold().paint(patches_branch(dst))
        )?;
    }
    writeln!(
        w,
        "- The working branch will be set to {}",
        Color::Green.bold().paint(dst)
    )
}

/// Writes one `package -> branch` line per mapping.
pub(crate) fn write_package_branches<'p, W, I>(w: &mut W, mappings: I) -> std::fmt::Result
where
    W: Write,
    I: IntoIterator<Item = (&'p str, &'p str)>,
{
    writeln!(w, "Branching these packages:")?;
    for (package, branch) in mappings {
        writeln!(
            w,
            "- {} -> {}",
            Color::Yellow.paint(package),
            Color::Blue.bold().paint(branch)
        )?;
    }
    Ok(())
}
