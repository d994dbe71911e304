//! Operator confirmation

use std::io::{self, BufRead, IsTerminal, Write};

use crate::error::PipelineError;

/// Asks the operator a yes/no question
pub trait Confirm {
    /// `Ok(true)` when the operator agreed
    fn confirm(&self, question: &str) -> Result<bool, PipelineError>;
}

/// Whether an answer counts as "yes"
pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim(), "y" | "Y")
}

/// Prompt on stdout, answer on stdin
///
/// A non-interactive stdin counts as "no".
#[derive(Debug, Clone, Copy, Default)]
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, question: &str) -> Result<bool, PipelineError> {
        let stdin = io::stdin();
        if !stdin.is_terminal() {
            tracing::debug!("stdin is not a terminal, not asking");
            return Ok(false);
        }

        print!("{question} ");
        io::stdout().flush().map_err(|e| PipelineError::Prompt {
            error: e.to_string(),
        })?;

        let mut answer = String::new();
        stdin
            .lock()
            .read_line(&mut answer)
            .map_err(|e| PipelineError::Prompt {
                error: e.to_string(),
            })?;
        Ok(is_affirmative(&answer))
    }
}

/// Fixed answer, for tests and unattended runs
#[derive(Debug, Clone, Copy)]
pub struct FixedAnswer(pub bool);

impl Confirm for FixedAnswer {
    fn confirm(&self, _question: &str) -> Result<bool, PipelineError> {
        Ok(self.0)
    }
}
