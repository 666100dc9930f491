//! Error taxonomy for the study engine.
//!
//! Load failures are fatal and surface once at startup. Everything raised
//! while a participant acts (`StudyError`) leaves the session untouched and
//! can be retried.

use std::path::PathBuf;

use thiserror::Error;

use crate::session::Page;

pub type StudyResult<T> = std::result::Result<T, StudyError>;

#[derive(Error, Debug)]
pub enum ContentError {
    #[error("required file not found at '{}'", .0.display())]
    MissingFile(PathBuf),

    #[error("failed to read '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A submission the participant has to correct before anything happens.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("please confirm you are over 18 and agree to participate")]
    ConsentRequired,

    #[error("please fill in all fields to continue")]
    MissingFields,

    #[error("please enter a valid email address")]
    InvalidEmail,

    #[error("please select an option")]
    SelectionRequired,

    #[error("please select exactly {expected} options (got {actual})")]
    WrongSelectionCount { expected: usize, actual: usize },

    #[error("'{0}' is not one of the offered options")]
    UnknownOption(String),

    #[error("please answer question(s): {}", join_numbers(.0))]
    UnansweredQuestions(Vec<usize>),

    #[error("question '{0}' is not visible yet")]
    QuestionHidden(String),
}

fn join_numbers(numbers: &[usize]) -> String {
    numbers
        .iter()
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Both response channels failed; the submission may be retried as-is.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("failed to save response: {0}")]
pub struct PersistenceError(pub String);

#[derive(Error, Debug)]
pub enum StudyError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("'{action}' is not available on page {page:?}: {reason}")]
    InvalidTransition {
        action: &'static str,
        page: Page,
        reason: String,
    },

    #[error("content error: {0}")]
    Content(String),
}

impl StudyError {
    pub fn invalid(action: &'static str, page: Page, reason: impl Into<String>) -> Self {
        StudyError::InvalidTransition {
            action,
            page,
            reason: reason.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, StudyError::Validation(_) | StudyError::Persistence(_))
    }
}
