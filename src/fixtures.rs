//! Builders shared by the unit tests.

use crate::catalog::{BlockStatus, Classification, Question, RespValue, Response};
use crate::store::TabularResponseStore;

pub fn store(header: &[&str], rows: &[Vec<RespValue>]) -> TabularResponseStore {
    TabularResponseStore::new(
        header.iter().map(|h| h.to_string()).collect(),
        rows.iter()
            .map(|row| row.iter().map(|v| v.to_string()).collect())
            .collect(),
        Vec::new(),
    )
    .unwrap()
}

pub fn question(code: &str, column: usize, scale: &[(RespValue, &str, Classification)]) -> Question {
    Question::new(
        code,
        column,
        scale
            .iter()
            .map(|&(value, label, class)| Response::new(value, label, class))
            .collect(),
    )
}

/// Agree / Neutral / Disagree coded 1..=3.
pub fn agreement(code: &str, column: usize) -> Question {
    question(
        code,
        column,
        &[
            (1, "Agree", Classification::Positive),
            (2, "Neutral", Classification::Neutral),
            (3, "Disagree", Classification::Negative),
        ],
    )
}

pub fn in_block(question: Question, status: BlockStatus) -> Question {
    question.with_block_status(status)
}

/// `count` copies of `row`.
pub fn repeat(row: Vec<RespValue>, count: usize) -> Vec<Vec<RespValue>> {
    std::iter::repeat_n(row, count).collect()
}
