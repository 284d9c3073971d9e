//! Block membership and structural consistency.
//!
//! A block is not stored anywhere: it is the maximal run of questions that starts at a
//! `FirstQuestionInBlock` and continues until the next `FirstQuestionInBlock` or
//! `DiscreetQuestion`. Analyses that treat a block as one grid refuse to run unless every
//! member shares the first member's response count and per-position classification.

use crate::catalog::{BlockStatus, Question};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MismatchKind {
    ResponseCount,
    Classification,
}

/// First structural difference found between a question and its reference.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{message}")]
pub struct BlockMismatch {
    pub kind: MismatchKind,
    /// Code of the question everything is compared against.
    pub reference: String,
    /// Code of the offending question.
    pub question: String,
    pub message: String,
}

/// Returns the block containing `all[position]`.
///
/// Discreet questions, and questions with no `FirstQuestionInBlock` before them (the
/// backward scan also stops at a discreet question), belong to no block and yield an
/// empty slice.
pub fn questions_in_block(position: usize, all: &[Question]) -> &[Question] {
    let Some(question) = all.get(position) else {
        return &[];
    };
    if question.block_status == BlockStatus::DiscreetQuestion {
        return &[];
    }

    let mut start = None;
    for index in (0..=position).rev() {
        match all[index].block_status {
            BlockStatus::FirstQuestionInBlock => {
                start = Some(index);
                break;
            }
            BlockStatus::DiscreetQuestion => break,
            _ => {}
        }
    }
    let Some(start) = start else {
        return &[];
    };

    let end = all[start + 1..]
        .iter()
        .position(|q| {
            matches!(
                q.block_status,
                BlockStatus::FirstQuestionInBlock | BlockStatus::DiscreetQuestion
            )
        })
        .map(|offset| start + 1 + offset)
        .unwrap_or(all.len());

    &all[start..end]
}

/// Like [`questions_in_block`], looked up by question code.
pub fn block_of<'a>(code: &str, all: &'a [Question]) -> &'a [Question] {
    match all.iter().position(|q| q.code == code) {
        Some(position) => questions_in_block(position, all),
        None => &[],
    }
}

/// Compares `candidate` to `reference`: same number of responses and the same
/// classification at every position.
pub fn compare_structure(reference: &Question, candidate: &Question) -> Result<(), BlockMismatch> {
    if reference.responses.len() != candidate.responses.len() {
        return Err(BlockMismatch {
            kind: MismatchKind::ResponseCount,
            reference: reference.code.clone(),
            question: candidate.code.clone(),
            message: format!(
                "Question '{}' has {} responses but '{}' has {}",
                candidate.code,
                candidate.responses.len(),
                reference.code,
                reference.responses.len()
            ),
        });
    }

    for (expected, actual) in reference.responses.iter().zip(&candidate.responses) {
        if expected.classification != actual.classification {
            return Err(BlockMismatch {
                kind: MismatchKind::Classification,
                reference: reference.code.clone(),
                question: candidate.code.clone(),
                message: format!(
                    "Response '{}' of question '{}' is classified {:?} but response '{}' of '{}' is {:?}",
                    actual.label,
                    candidate.code,
                    actual.classification,
                    expected.label,
                    reference.code,
                    expected.classification
                ),
            });
        }
    }
    Ok(())
}

/// Validates every question of a block against the first one. Blocks of one question or
/// fewer are trivially valid.
pub fn validate_block(questions: &[Question]) -> Result<(), BlockMismatch> {
    let Some((first, rest)) = questions.split_first() else {
        return Ok(());
    };
    rest.iter()
        .try_for_each(|question| compare_structure(first, question))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Classification, Response};

    fn question(code: &str, status: BlockStatus) -> Question {
        Question::new(
            code,
            0,
            vec![
                Response::new(1, "Agree", Classification::Positive),
                Response::new(2, "Neutral", Classification::Neutral),
                Response::new(3, "Disagree", Classification::Negative),
            ],
        )
        .with_block_status(status)
    }

    fn survey() -> Vec<Question> {
        use BlockStatus::*;
        vec![
            question("D1", DiscreetQuestion),
            question("A1", FirstQuestionInBlock),
            question("A2", ContinuationQuestion),
            question("A3", ContinuationQuestion),
            question("B1", FirstQuestionInBlock),
            question("B2", ContinuationQuestion),
            question("D2", DiscreetQuestion),
            question("C1", FirstQuestionInBlock),
            question("C2", ContinuationQuestion),
        ]
    }

    fn codes(block: &[Question]) -> Vec<&str> {
        block.iter().map(|q| q.code.as_str()).collect()
    }

    #[test]
    fn test_block_from_any_member() {
        let all = survey();
        for position in 1..=3 {
            assert_eq!(codes(questions_in_block(position, &all)), ["A1", "A2", "A3"]);
        }
    }

    #[test]
    fn test_block_stops_at_next_first_and_discreet() {
        let all = survey();
        assert_eq!(codes(questions_in_block(5, &all)), ["B1", "B2"]);
        assert_eq!(codes(questions_in_block(7, &all)), ["C1", "C2"]);
    }

    #[test]
    fn test_discreet_question_has_no_block() {
        let all = survey();
        assert!(questions_in_block(0, &all).is_empty());
        assert!(questions_in_block(6, &all).is_empty());
        assert!(questions_in_block(99, &all).is_empty());
    }

    #[test]
    fn test_orphan_continuation_has_no_block() {
        let all = vec![
            question("D1", BlockStatus::DiscreetQuestion),
            question("X2", BlockStatus::ContinuationQuestion),
        ];
        assert!(questions_in_block(1, &all).is_empty());
    }

    #[test]
    fn test_block_of_by_code() {
        let all = survey();
        assert_eq!(codes(block_of("B2", &all)), ["B1", "B2"]);
        assert!(block_of("nope", &all).is_empty());
    }

    #[test]
    fn test_validate_block_ok_and_trivial() {
        let all = survey();
        assert!(validate_block(&all[1..4]).is_ok());
        assert!(validate_block(&all[..1]).is_ok());
        assert!(validate_block(&[]).is_ok());
    }

    #[test]
    fn test_validate_block_response_count_mismatch() {
        let mut all = survey();
        all[2].responses.pop();
        let mismatch = validate_block(&all[1..4]).unwrap_err();
        assert_eq!(mismatch.kind, MismatchKind::ResponseCount);
        assert_eq!(mismatch.question, "A2");
        assert_eq!(mismatch.reference, "A1");
        assert!(mismatch.message.contains("A2"));
    }

    #[test]
    fn test_validate_block_classification_mismatch() {
        let mut all = survey();
        all[3].responses[1].classification = Classification::Positive;
        let mismatch = validate_block(&all[1..4]).unwrap_err();
        assert_eq!(mismatch.kind, MismatchKind::Classification);
        assert_eq!(mismatch.question, "A3");
    }
}
