//! Release branch management for `relbranch`.
//!
//! Each released package lives on a destination branch, paired with an orphaned
//! `patches/<branch>` branch. The patches branch stores the patch files applied to the
//! release and a `patches.conf` record linking the destination branch back to the branch
//! it was cut from.

pub mod constants;
pub mod ctx;
pub mod errors;
pub mod git;
pub mod packages;
pub mod patch;
pub mod prompt;
pub mod settings;
