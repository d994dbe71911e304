//! Error types for sunstorm
//!
//! Domain-specific error types using thiserror. The CLI layer wraps these in
//! `anyhow` and renders the chain as a single line.

use std::path::PathBuf;
use thiserror::Error;

/// Build manifest errors
#[derive(Error, Debug)]
pub enum ManifestError {
    /// Not a property list, or missing the identity list
    #[error("Failed to parse build manifest: {error}")]
    Parse { error: String },

    /// A global field the caller asked for is absent
    #[error("Build manifest is missing field '{field}'")]
    FieldMissing { field: String },

    /// Manifest file could not be read
    #[error("Failed to read build manifest '{path}': {error}")]
    Io { path: PathBuf, error: String },
}

/// External tool invocation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    /// The program could not be started at all
    #[error("Failed to execute '{program}': {error}")]
    Spawn { program: String, error: String },

    /// The program ran and exited non-zero
    #[error("Command \"{command}\" returned non-zero (exit code {code}){}", format_stderr(.stderr))]
    NonZeroExit {
        command: String,
        code: i32,
        stderr: String,
    },
}

fn format_stderr(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {trimmed}")
    }
}

/// Image synthesis preconditions
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SynthesisError {
    /// Staging tree to replicate does not exist
    #[error("Missing staging tree '{path}' (this is a bug)")]
    MissingStagingTree { path: PathBuf },

    /// Target image does not exist
    #[error("Missing target image '{path}' (this is a bug)")]
    MissingTargetImage { path: PathBuf },
}

/// Key provider errors
#[derive(Error, Debug)]
pub enum KeyError {
    /// Transport-level failure talking to the key service
    #[error("Key request to '{url}' failed: {error}")]
    Request { url: String, error: String },

    /// Response body was not the expected document
    #[error("Failed to decode key response from '{url}': {error}")]
    Decode { url: String, error: String },
}

/// Fatal preconditions checked before any pipeline runs
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PreflightError {
    /// An input file given on the command line does not exist
    #[error("{kind} \"{path}\" doesn't exist")]
    MissingInput { kind: String, path: PathBuf },

    /// Boot mode without a device identifier
    #[error("You need to specify an identifier (--identifier)")]
    MissingIdentifier,

    /// Auxiliary ramdisk archive is absent or misnamed
    #[error("Extra ramdisk must be in the $file.tar.gz format")]
    BadExtraRamdisk { path: PathBuf },

    /// A required external program is not installed
    #[error("\"{program}\" not found, please install it.")]
    MissingProgram { program: String },
}

/// Filesystem errors
#[derive(Error, Debug)]
pub enum FilesystemError {
    /// Failed to create directory
    #[error("Failed to create directory '{path}': {error}")]
    CreateDir { path: PathBuf, error: String },

    /// Failed to remove a file or directory
    #[error("Failed to remove '{path}': {error}")]
    Remove { path: PathBuf, error: String },

    /// Failed to write file
    #[error("Failed to write file '{path}': {error}")]
    WriteFile { path: PathBuf, error: String },

    /// Failed to move a directory
    #[error("Failed to move '{from}' to '{to}': {error}")]
    Move {
        from: PathBuf,
        to: PathBuf,
        error: String,
    },
}

/// Configuration file errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file '{path}': {error}")]
    Read { path: String, error: String },

    /// Failed to parse config file
    #[error("Failed to parse config file '{path}': {error}")]
    Parse { path: String, error: String },
}

/// Errors that abort a restore or boot pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    /// No build identity matches the requested board
    #[error("BoardConfig was not recognized")]
    BoardNotRecognized { board: String },

    /// The board resolved but a component needed to progress did not
    #[error("Component '{component}' not found for board '{board}'")]
    ComponentMissing { board: String, component: String },

    /// Manifest could not be loaded or lacks a required field
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// A non-tolerant stage failed
    #[error("{stage} failed: {source}")]
    Tool {
        stage: String,
        #[source]
        source: ToolError,
    },

    /// Decryption key for a loader stage is unknown
    #[error("No decryption key available for {image} (possible incorrect identifier or boardconfig)")]
    MissingLoaderKey { image: String },

    /// Image synthesis precondition violated
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),

    /// Bundle archive could not be expanded
    #[error("Failed to extract bundle '{path}': {error}")]
    Archive { path: PathBuf, error: String },

    /// Filesystem operation on the working directory failed
    #[error(transparent)]
    Filesystem(#[from] FilesystemError),

    /// Reading the operator's answer failed
    #[error("Failed to read confirmation: {error}")]
    Prompt { error: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_board_not_recognized_message() {
        let err = PipelineError::BoardNotRecognized {
            board: "d999ap".to_string(),
        };
        assert_eq!(err.to_string(), "BoardConfig was not recognized");
    }

    #[test]
    fn test_non_zero_exit_includes_stderr() {
        let err = ToolError::NonZeroExit {
            command: "img4 -i a -o b".to_string(),
            code: 2,
            stderr: "bad input\n".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Command \"img4 -i a -o b\" returned non-zero (exit code 2): bad input"
        );
    }

    #[test]
    fn test_non_zero_exit_without_stderr() {
        let err = ToolError::NonZeroExit {
            command: "false".to_string(),
            code: 1,
            stderr: "  ".to_string(),
        };
        assert_eq!(err.to_string(), "Command \"false\" returned non-zero (exit code 1)");
    }
}
