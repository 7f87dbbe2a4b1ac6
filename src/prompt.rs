//! Interactive confirmation.

use crate::errors::BranchResult;
use std::{cell::RefCell, collections::VecDeque};

/// Asks the user whether to continue.
pub trait Confirm {
    /// Returns `true` if the user agreed to `message`.
    fn confirm(&self, message: &str) -> BranchResult<bool>;
}

/// [Confirm] on the terminal, with `inquire`.
#[derive(Default, Debug, Clone, Copy)]
pub struct InquireConfirm;

impl Confirm for InquireConfirm {
    fn confirm(&self, message: &str) -> BranchResult<bool> {
        Ok(inquire::Confirm::new(message)
            .with_default(false)
            .prompt()?)
    }
}

/// [Confirm] that replays a fixed list of answers, answering `false` once exhausted.
///
/// Used where no terminal is available, and in tests.
#[derive(Default, Debug)]
pub struct ScriptedConfirm {
    answers: RefCell<VecDeque<bool>>,
    asked: RefCell<Vec<String>>,
}

impl ScriptedConfirm {
    /// Creates a [ScriptedConfirm] with the given answers.
    pub fn new(answers: impl IntoIterator<Item = bool>) -> Self {
        Self {
            answers: RefCell::new(answers.into_iter().collect()),
            asked: RefCell::default(),
        }
    }

    /// Returns every message that was asked so far.
    pub fn asked(&self) -> Vec<String> {
        self.asked.borrow().clone()
    }
}

impl Confirm for ScriptedConfirm {
    fn confirm(&self, message: &str) -> BranchResult<bool> {
        self.asked.borrow_mut().push(message.to_string());
        Ok(self.answers.borrow_mut().pop_front().unwrap_or(false))
    }
}
