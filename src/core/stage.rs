//! Pipeline stages
//!
//! A stage is plain data: a label, the invocation to run, and whether a
//! non-zero exit may be tolerated. [`run_stage`] interprets it against a
//! [`ToolGateway`] the same way for every flow.

use std::path::{Path, PathBuf};

use crate::error::{PipelineError, ToolError};
use crate::infra::filesystem;
use crate::infra::process::{Invocation, ToolGateway, ToolOutput};

/// One external step of a pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    /// Human-readable label for logging
    pub description: String,
    /// Command to run
    pub invocation: Invocation,
    /// Continue the pipeline when the command fails
    pub tolerant: bool,
    /// Write captured stdout to this file on success
    pub capture: Option<PathBuf>,
}

impl Stage {
    /// A fatal-on-failure stage
    pub fn new(description: impl Into<String>, invocation: Invocation) -> Self {
        Self {
            description: description.into(),
            invocation,
            tolerant: false,
            capture: None,
        }
    }

    /// Mark the stage as tolerant of failure
    #[must_use]
    pub fn tolerant(mut self) -> Self {
        self.tolerant = true;
        self
    }

    /// Save stdout to `path`
    #[must_use]
    pub fn capture_to(mut self, path: &Path) -> Self {
        self.capture = Some(path.to_path_buf());
        self
    }
}

/// A failure that was logged and skipped
#[derive(Debug, Clone, PartialEq)]
pub struct ToleratedFailure {
    /// Command that failed
    pub command: String,
    /// What went wrong
    pub error: ToolError,
}

/// Result of a stage that did not abort the pipeline
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome {
    /// Command succeeded
    Completed(ToolOutput),
    /// Command failed but the stage is tolerant
    Tolerated(ToleratedFailure),
}

impl StageOutcome {
    /// Whether the command succeeded
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

/// Run one stage through `gateway`
pub fn run_stage(gateway: &dyn ToolGateway, stage: &Stage) -> Result<StageOutcome, PipelineError> {
    if stage.tolerant {
        tracing::debug!("{}", stage.description);
    } else {
        tracing::info!("{}", stage.description);
    }

    match gateway.run(&stage.invocation) {
        Ok(output) => {
            if let Some(path) = &stage.capture {
                filesystem::write_file(path, &output.stdout)?;
            }
            Ok(StageOutcome::Completed(output))
        }
        Err(error) if stage.tolerant => {
            tracing::warn!("{} (continuing)", error);
            Ok(StageOutcome::Tolerated(ToleratedFailure {
                command: stage.invocation.to_string(),
                error,
            }))
        }
        Err(error) => Err(PipelineError::Tool {
            stage: stage.description.clone(),
            source: error,
        }),
    }
}

/// Run stages in order, stopping at the first fatal failure
pub fn run_stages(
    gateway: &dyn ToolGateway,
    stages: &[Stage],
) -> Result<Vec<ToleratedFailure>, PipelineError> {
    let mut tolerated = Vec::new();
    for stage in stages {
        if let StageOutcome::Tolerated(failure) = run_stage(gateway, stage)? {
            tolerated.push(failure);
        }
    }
    Ok(tolerated)
}
