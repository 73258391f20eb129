//! # Error Handling
//!
//! This module defines the centralized error type of `subpatch`. It uses the
//! `thiserror` library to create an `Error` enum with one variant per error
//! kind the tool distinguishes, so the single top-level handler in the binary
//! can print a one-line message and map every failure to the same exit code.
//!
//! ## Error kinds
//!
//! - **Invalid argument**: bad user input, e.g. an unresolvable revision or a
//!   patch filename that does not sort latest.
//! - **Invalid state**: the on-disk ledger is inconsistent or a file that must
//!   exist is missing.
//! - **Not implemented yet**: a recognised but unsupported combination, e.g.
//!   a superproject without git.
//! - **Superproject not found / not configured**: environment preconditions.
//! - **Custom**: message-only errors.
//! - **Unknown**: the origin has already reported the problem.
//!
//! Failures of the external `git` binary are wrapped in `GitCommand`, and
//! I/O errors are converted automatically.
//!
//! Errors are raised where they are detected and propagated unmodified with
//! `?`. Nothing in the library retries.

use thiserror::Error;

/// Main error type for subpatch operations
#[derive(Error, Debug)]
pub enum Error {
    /// The user has given an invalid argument on the command line.
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// The metadata of a subproject or the superproject is inconsistent.
    ///
    /// This must not happen under normal operation.
    #[error("Invalid state: {message}")]
    InvalidState { message: String },

    /// A recognised feature or combination that is not supported yet.
    #[error("Feature not implemented yet: {feature}")]
    NotImplementedYet { feature: String },

    /// Neither a `.subpatch` file nor a supported SCM was found.
    #[error("No superproject found!")]
    SuperprojectNotFound,

    /// The superproject exists but has no `.subpatch` file yet.
    #[error("subpatch not yet configured for superproject!")]
    SuperprojectNotConfigured,

    /// A message-only error.
    #[error("{message}")]
    Custom { message: String },

    /// The failure was already reported where it happened.
    #[error("")]
    Unknown,

    /// The external `git` binary exited with a failure.
    #[error("Git command failed: git {command}{}", if stderr.is_empty() { String::new() } else { format!(" - {}", stderr) })]
    GitCommand { command: String, stderr: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Error::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Error::InvalidState {
            message: message.into(),
        }
    }

    pub fn not_implemented_yet(feature: impl Into<String>) -> Self {
        Error::NotImplementedYet {
            feature: feature.into(),
        }
    }

    pub fn custom(message: impl Into<String>) -> Self {
        Error::Custom {
            message: message.into(),
        }
    }

    /// Whether the top-level handler should stay silent for this error.
    pub fn is_already_reported(&self) -> bool {
        matches!(self, Error::Unknown)
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_invalid_argument() {
        let error = Error::invalid_argument("There is no patch to pop!");
        assert_eq!(
            error.to_string(),
            "Invalid argument: There is no patch to pop!"
        );
    }

    #[test]
    fn test_error_display_invalid_state() {
        let error = Error::invalid_state("Metadata is inconsistent!");
        assert_eq!(error.to_string(), "Invalid state: Metadata is inconsistent!");
    }

    #[test]
    fn test_error_display_not_implemented_yet() {
        let error = Error::not_implemented_yet("subproject has patches applied. Please pop first!");
        assert_eq!(
            error.to_string(),
            "Feature not implemented yet: subproject has patches applied. Please pop first!"
        );
    }

    #[test]
    fn test_error_display_superproject() {
        assert_eq!(
            Error::SuperprojectNotFound.to_string(),
            "No superproject found!"
        );
        assert_eq!(
            Error::SuperprojectNotConfigured.to_string(),
            "subpatch not yet configured for superproject!"
        );
    }

    #[test]
    fn test_error_display_custom() {
        let error = Error::custom("Directory 'sub' already exists. Cannot add subproject!");
        assert_eq!(
            error.to_string(),
            "Directory 'sub' already exists. Cannot add subproject!"
        );
    }

    #[test]
    fn test_error_display_git_command() {
        let error = Error::GitCommand {
            command: "ls-remote ../sub".to_string(),
            stderr: "fatal: not a repository".to_string(),
        };
        let display = error.to_string();
        assert!(display.contains("Git command failed"));
        assert!(display.contains("ls-remote ../sub"));
        assert!(display.contains("fatal: not a repository"));
    }

    #[test]
    fn test_error_git_command_without_stderr() {
        let error = Error::GitCommand {
            command: "reset -q --hard".to_string(),
            stderr: String::new(),
        };
        assert_eq!(error.to_string(), "Git command failed: git reset -q --hard");
    }

    #[test]
    fn test_error_unknown_is_already_reported() {
        assert!(Error::Unknown.is_already_reported());
        assert!(!Error::SuperprojectNotFound.is_already_reported());
    }

    #[test]
    fn test_error_from_io_error() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let error: Error = io_error.into();
        let display = format!("{}", error);
        assert!(display.contains("I/O error"));
        assert!(display.contains("File not found"));
    }
}
