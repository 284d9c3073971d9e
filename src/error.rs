//! Error types for survey analysis.
//!
//! Public functions return [`anyhow::Result`]; the errors they raise are [`SurveyError`]
//! values, so callers that need to branch on the failure can `downcast_ref::<SurveyError>()`.

use crate::catalog::block::BlockMismatch;
use crate::catalog::RespValue;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SurveyError {
    #[error("Required input missing: {0}")]
    MissingInput(&'static str),

    #[error("Question '{0}' not found")]
    QuestionNotFound(String),

    #[error("Response {value} not found in question '{question}'")]
    ResponseNotFound { question: String, value: RespValue },

    #[error("Question '{question}' points at column {column} but the data has {width} columns")]
    ColumnOutOfRange {
        question: String,
        column: usize,
        width: usize,
    },

    #[error("Row {row} has {found} fields, expected {expected}")]
    RowLength {
        row: usize,
        found: usize,
        expected: usize,
    },

    #[error("Question '{question}' declares {count} missing-value codes (at most 3 allowed)")]
    TooManyMissingCodes { question: String, count: usize },

    #[error("Question '{question}' has more than one response with value {value}")]
    DuplicateResponseValue { question: String, value: RespValue },

    #[error("Question code '{0}' appears more than once in the catalog")]
    DuplicateQuestionCode(String),

    #[error(transparent)]
    Block(#[from] BlockMismatch),

    #[error("Question '{question}' is not part of a block")]
    NotInBlock { question: String },

    #[error("Preference block for '{question}' has {size} questions; expected 6, 10 or 15")]
    InvalidBlockSize { question: String, size: usize },

    #[error("Question '{question}' must be {expected} data")]
    InvalidDataType {
        question: String,
        expected: &'static str,
    },

    #[error("Survey '{survey}' has {dv_cases} cases for '{dv}' but {iv_cases} cases for '{iv}'")]
    CaseCountMismatch {
        survey: String,
        dv: String,
        iv: String,
        dv_cases: usize,
        iv_cases: usize,
    },

    #[error("{0}")]
    StructureMismatch(String),

    #[error("{inconsistent} of {total} surveys have {filter} enabled; it must be enabled on all or none")]
    FilterInconsistent {
        filter: &'static str,
        inconsistent: usize,
        total: usize,
    },

    #[error("No '{0}' column is present in the data")]
    NoStaticWeightColumn(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
