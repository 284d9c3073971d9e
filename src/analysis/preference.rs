//! Forced-choice preference scoring.
//!
//! A preference block of 4, 5 or 6 items asks one question per pair of items, so the block
//! holds 6, 10 or 15 comparison questions. Question `k` of the block compares the item pair
//! at position `k` of the matching pair table. Answer 1 means the row item wins, 2 the
//! column item wins, 3 a tie, which gives half a win to each side.

use crate::catalog::block::{questions_in_block, validate_block};
use crate::catalog::{Question, RespValue};
use crate::error::SurveyError;
use crate::store::TabularResponseStore;
use ndarray::Array2;
use serde::Serialize;
use std::cmp::Ordering;
use tracing::{debug, warn};

pub const ROW_ITEM_WINS: RespValue = 1;
pub const COLUMN_ITEM_WINS: RespValue = 2;
pub const TIE: RespValue = 3;

const PAIRS_4: [(usize, usize); 6] = [(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)];

const PAIRS_5: [(usize, usize); 10] = [
    (0, 1), (0, 2), (0, 3), (0, 4),
    (1, 2), (1, 3), (1, 4),
    (2, 3), (2, 4),
    (3, 4),
];

const PAIRS_6: [(usize, usize); 15] = [
    (0, 1), (0, 2), (0, 3), (0, 4), (0, 5),
    (1, 2), (1, 3), (1, 4), (1, 5),
    (2, 3), (2, 4), (2, 5),
    (3, 4), (3, 5),
    (4, 5),
];

/// Number of items and the (row item, column item) pair of each comparison question for a
/// block of `block_size` questions.
pub fn comparison_pairs(block_size: usize) -> Option<(usize, &'static [(usize, usize)])> {
    match block_size {
        6 => Some((4, &PAIRS_4)),
        10 => Some((5, &PAIRS_5)),
        15 => Some((6, &PAIRS_6)),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreferenceScore {
    pub item: usize,
    pub label: String,
    pub actual_wins: f64,
    pub possible_wins: f64,
    pub score: f64,
}

/// Share of head-to-head wins of the row item over the column item. The diagonal is empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreferenceMatrix {
    pub labels: Vec<String>,
    pub cells: Vec<Vec<Option<f64>>>,
}

impl PreferenceMatrix {
    pub fn cell_text(&self, row: usize, col: usize) -> String {
        match self.cells.get(row).and_then(|r| r.get(col)).copied().flatten() {
            Some(share) => format!("{:.1}%", share * 100.0),
            None => "***".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreferenceBreakdown {
    pub iv_value: RespValue,
    pub label: String,
    pub respondents: usize,
    /// Scores in item order.
    pub scores: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct PreferenceEngine {
    dv_code: String,
    labels: Vec<String>,
    wins: Array2<f64>,
    comparison_totals: Vec<f64>,
    scores: Vec<PreferenceScore>,
    breakdown: Vec<PreferenceBreakdown>,
}

struct Tally {
    wins: Array2<f64>,
    comparison_totals: Vec<f64>,
}

fn tally(
    store: &TabularResponseStore,
    rows: &[usize],
    block: &[Question],
    pairs: &[(usize, usize)],
    items: usize,
) -> Tally {
    let mut wins = Array2::<f64>::zeros((items, items));
    let mut comparison_totals = vec![0.0; block.len()];

    for (k, (question, &(a, b))) in block.iter().zip(pairs).enumerate() {
        for &row in rows {
            let Some(value) = store.value(row, question.column) else {
                continue;
            };
            if question.is_missing(value) {
                continue;
            }
            let weight = store.weight(row);
            match value {
                ROW_ITEM_WINS => wins[[a, b]] += weight,
                COLUMN_ITEM_WINS => wins[[b, a]] += weight,
                TIE => {
                    wins[[a, b]] += weight / 2.0;
                    wins[[b, a]] += weight / 2.0;
                }
                _ => continue,
            }
            comparison_totals[k] += weight;
        }
    }
    Tally {
        wins,
        comparison_totals,
    }
}

/// (actual wins, possible wins, score) per item.
fn score_items(tally: &Tally, pairs: &[(usize, usize)], items: usize) -> Vec<(f64, f64, f64)> {
    (0..items)
        .map(|item| {
            let actual = tally.wins.row(item).sum();
            let possible: f64 = pairs
                .iter()
                .zip(&tally.comparison_totals)
                .filter(|((a, b), _)| *a == item || *b == item)
                .map(|(_, total)| total)
                .sum();
            let score = if possible > 0.0 { actual / possible } else { 0.0 };
            (actual, possible, score)
        })
        .collect()
}

fn item_label(block: &[Question], pairs: &[(usize, usize)], item: usize) -> String {
    let as_row = pairs
        .iter()
        .zip(block)
        .find(|((a, _), _)| *a == item)
        .and_then(|(_, q)| q.response(ROW_ITEM_WINS));
    let as_col = pairs
        .iter()
        .zip(block)
        .find(|((_, b), _)| *b == item)
        .and_then(|(_, q)| q.response(COLUMN_ITEM_WINS));
    as_row
        .or(as_col)
        .map(|r| r.label.clone())
        .unwrap_or_else(|| format!("Item {}", item + 1))
}

impl PreferenceEngine {
    /// Scores the preference block containing `dv_code`. When `iv` is given, scores are
    /// also recomputed for each of its categories.
    pub fn new(
        store: &TabularResponseStore,
        questions: &[Question],
        dv_code: &str,
        iv: Option<&Question>,
    ) -> anyhow::Result<Self> {
        let position = questions
            .iter()
            .position(|q| q.code == dv_code)
            .ok_or_else(|| SurveyError::QuestionNotFound(dv_code.to_string()))?;
        let dv = &questions[position];
        let block = questions_in_block(position, questions);
        if block.is_empty() {
            return Err(SurveyError::NotInBlock {
                question: dv.code.clone(),
            }
            .into());
        }
        let (items, pairs) = comparison_pairs(block.len()).ok_or_else(|| SurveyError::InvalidBlockSize {
            question: dv.code.clone(),
            size: block.len(),
        })?;
        if dv.preference_block && dv.preference_items != items {
            return Err(SurveyError::InvalidBlockSize {
                question: dv.code.clone(),
                size: block.len(),
            }
            .into());
        }
        validate_block(block).map_err(SurveyError::from)?;
        for question in block {
            store.check_column(question)?;
        }

        let overall = tally(store, store.active_rows(), block, pairs, items);
        let labels: Vec<String> = (0..items).map(|i| item_label(block, pairs, i)).collect();
        let scores: Vec<PreferenceScore> = score_items(&overall, pairs, items)
            .into_iter()
            .enumerate()
            .map(|(item, (actual_wins, possible_wins, score))| PreferenceScore {
                item,
                label: labels[item].clone(),
                actual_wins,
                possible_wins,
                score,
            })
            .collect();
        if scores.iter().all(|s| s.possible_wins <= 0.0) {
            warn!(dv = %dv.code, "preference block has no valid comparisons");
        }

        let mut breakdown = Vec::new();
        if let Some(iv) = iv {
            store.check_column(iv)?;
            for response in iv.valid_responses() {
                let rows = store.restricted_rows(iv.column, &[response.value]);
                let category = tally(store, &rows, block, pairs, items);
                breakdown.push(PreferenceBreakdown {
                    iv_value: response.value,
                    label: response.label.clone(),
                    respondents: rows.len(),
                    scores: score_items(&category, pairs, items)
                        .into_iter()
                        .map(|(_, _, score)| score)
                        .collect(),
                });
            }
        }

        debug!(dv = %dv.code, items, breakdown = breakdown.len(), "preference scores computed");
        Ok(PreferenceEngine {
            dv_code: dv.code.clone(),
            labels,
            wins: overall.wins,
            comparison_totals: overall.comparison_totals,
            scores,
            breakdown,
        })
    }

    pub fn dv_code(&self) -> &str {
        &self.dv_code
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// `wins[[i, j]]`: weighted wins of item `i` over item `j`.
    pub fn wins(&self) -> &Array2<f64> {
        &self.wins
    }

    /// Valid respondents per comparison question, in block order.
    pub fn comparison_totals(&self) -> &[f64] {
        &self.comparison_totals
    }

    /// Scores in item order.
    pub fn scores(&self) -> &[PreferenceScore] {
        &self.scores
    }

    /// Scores sorted from most to least preferred; ties keep item order.
    pub fn summary(&self) -> Vec<PreferenceScore> {
        let mut sorted = self.scores.clone();
        sorted.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        sorted
    }

    pub fn percentage_matrix(&self) -> PreferenceMatrix {
        let items = self.labels.len();
        let cells = (0..items)
            .map(|i| {
                (0..items)
                    .map(|j| {
                        if i == j {
                            return None;
                        }
                        let contested = self.wins[[i, j]] + self.wins[[j, i]];
                        Some(if contested > 0.0 {
                            self.wins[[i, j]] / contested
                        } else {
                            0.0
                        })
                    })
                    .collect()
            })
            .collect();
        PreferenceMatrix {
            labels: self.labels.clone(),
            cells,
        }
    }

    pub fn breakdown(&self) -> &[PreferenceBreakdown] {
        &self.breakdown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{BlockStatus, Classification};
    use crate::fixtures;
    use approx::assert_abs_diff_eq;

    const ITEMS: [&str; 4] = ["Price", "Quality", "Service", "Speed"];

    fn block() -> Vec<Question> {
        let mut questions: Vec<Question> = PAIRS_4
            .iter()
            .enumerate()
            .map(|(k, &(a, b))| {
                let status = if k == 0 {
                    BlockStatus::FirstQuestionInBlock
                } else {
                    BlockStatus::ContinuationQuestion
                };
                fixtures::question(
                    &format!("P{}", k + 1),
                    k,
                    &[
                        (1, ITEMS[a], Classification::Neutral),
                        (2, ITEMS[b], Classification::Neutral),
                        (3, "No preference", Classification::Neutral),
                    ],
                )
                .with_block_status(status)
            })
            .collect();
        questions.push(
            fixtures::question(
                "GENDER",
                6,
                &[(1, "Male", Classification::Neutral), (2, "Female", Classification::Neutral)],
            )
            .with_block_status(BlockStatus::DiscreetQuestion),
        );
        questions
    }

    fn store() -> TabularResponseStore {
        fixtures::store(
            &["P1", "P2", "P3", "P4", "P5", "P6", "GENDER"],
            &[
                vec![1, 1, 1, 1, 1, 1, 1],
                vec![2, 2, 2, 2, 2, 2, 2],
                vec![3, 3, 3, 3, 3, 3, 1],
                vec![1, 1, 1, 3, 3, 3, 2],
            ],
        )
    }

    #[test]
    fn test_pair_tables_cover_every_pair_once() {
        for (size, items) in [(6, 4), (10, 5), (15, 6)] {
            let (n, pairs) = comparison_pairs(size).unwrap();
            assert_eq!(n, items);
            assert_eq!(pairs.len(), items * (items - 1) / 2);
            let mut seen = std::collections::HashSet::new();
            for &(a, b) in pairs {
                assert!(a < b && b < items);
                assert!(seen.insert((a, b)));
            }
        }
        assert!(comparison_pairs(7).is_none());
    }

    #[test]
    fn test_scores() {
        let questions = block();
        let engine = PreferenceEngine::new(&store(), &questions, "P3", None).unwrap();
        assert_eq!(engine.labels(), &["Price", "Quality", "Service", "Speed"]);
        let scores = engine.scores();
        assert_abs_diff_eq!(scores[0].actual_wins, 7.5, epsilon = 1e-12);
        assert_abs_diff_eq!(scores[0].possible_wins, 12.0, epsilon = 1e-12);
        assert_abs_diff_eq!(scores[0].score, 0.625, epsilon = 1e-12);
        for score in &scores[1..] {
            assert_abs_diff_eq!(score.score, 5.5 / 12.0, epsilon = 1e-12);
        }
        let summary = engine.summary();
        assert_eq!(summary[0].label, "Price");
        assert_eq!(summary[1].item, 1);
    }

    #[test]
    fn test_pairwise_wins_add_up_to_respondents() {
        let questions = block();
        let engine = PreferenceEngine::new(&store(), &questions, "P1", None).unwrap();
        for (k, &(a, b)) in PAIRS_4.iter().enumerate() {
            let contested = engine.wins()[[a, b]] + engine.wins()[[b, a]];
            assert_abs_diff_eq!(contested, engine.comparison_totals()[k], epsilon = 1e-12);
            assert_abs_diff_eq!(contested, 4.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_unanswered_comparisons_not_counted() {
        let mut questions = block();
        // "No preference" is declared missing on the first comparison only
        questions[0] = questions[0].clone().with_missing_values(&[3]).unwrap();
        let text = |row: &[&str]| row.iter().map(|v| v.to_string()).collect::<Vec<String>>();
        let store = TabularResponseStore::new(
            text(&["P1", "P2", "P3", "P4", "P5", "P6", "GENDER"]),
            vec![
                text(&["", "1", "1", "1", "1", "1", "1"]),
                text(&["3", "1", "1", "1", "1", "1", "1"]),
                text(&["1", "1", "1", "1", "1", "1", "2"]),
                text(&["7", "2", "2", "2", "2", "2", "2"]),
            ],
            Vec::new(),
        )
        .unwrap();
        let engine = PreferenceEngine::new(&store, &questions, "P2", None).unwrap();

        assert_abs_diff_eq!(engine.comparison_totals()[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(engine.wins()[[0, 1]] + engine.wins()[[1, 0]], 1.0, epsilon = 1e-12);
        assert_eq!(engine.wins()[[1, 0]], 0.0);
        for (k, &(a, b)) in PAIRS_4.iter().enumerate().skip(1) {
            assert_abs_diff_eq!(engine.comparison_totals()[k], 4.0, epsilon = 1e-12);
            assert_abs_diff_eq!(engine.wins()[[a, b]] + engine.wins()[[b, a]], 4.0, epsilon = 1e-12);
        }
        let price = &engine.scores()[0];
        assert_abs_diff_eq!(price.actual_wins, 7.0, epsilon = 1e-12);
        assert_abs_diff_eq!(price.possible_wins, 9.0, epsilon = 1e-12);
    }

    #[test]
    fn test_percentage_matrix() {
        let questions = block();
        let engine = PreferenceEngine::new(&store(), &questions, "P1", None).unwrap();
        let matrix = engine.percentage_matrix();
        assert_eq!(matrix.cells[0][0], None);
        assert_eq!(matrix.cell_text(2, 2), "***");
        assert_abs_diff_eq!(matrix.cells[0][1].unwrap(), 0.625, epsilon = 1e-12);
        assert_abs_diff_eq!(matrix.cells[1][0].unwrap(), 0.375, epsilon = 1e-12);
        assert_eq!(matrix.cell_text(0, 1), "62.5%");
    }

    #[test]
    fn test_breakdown_by_category() {
        let questions = block();
        let gender = questions[6].clone();
        let engine = PreferenceEngine::new(&store(), &questions, "P1", Some(&gender)).unwrap();
        let breakdown = engine.breakdown();
        assert_eq!(breakdown.len(), 2);
        assert_eq!(breakdown[0].label, "Male");
        assert_eq!(breakdown[0].respondents, 2);
        assert_abs_diff_eq!(breakdown[0].scores[0], 0.75, epsilon = 1e-12);
        assert_abs_diff_eq!(breakdown[1].scores[0], 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_rejects_wrong_block_size() {
        let mut questions = block();
        questions.remove(5);
        let err = PreferenceEngine::new(&store(), &questions, "P1", None).unwrap_err();
        assert_eq!(
            err.downcast_ref::<SurveyError>(),
            Some(&SurveyError::InvalidBlockSize {
                question: "P1".to_string(),
                size: 5
            })
        );
    }

    #[test]
    fn test_rejects_inconsistent_block() {
        let mut questions = block();
        questions[4].responses[2].classification = Classification::Positive;
        let err = PreferenceEngine::new(&store(), &questions, "P1", None).unwrap_err();
        assert!(matches!(err.downcast_ref::<SurveyError>(), Some(SurveyError::Block(_))));
    }

    #[test]
    fn test_rejects_discreet_question() {
        let questions = block();
        let err = PreferenceEngine::new(&store(), &questions, "GENDER", None).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SurveyError>(),
            Some(SurveyError::NotInBlock { .. })
        ));
    }

    #[test]
    fn test_no_valid_comparisons_scores_zero() {
        let questions = block();
        let store = fixtures::store(&["P1", "P2", "P3", "P4", "P5", "P6", "GENDER"], &[]);
        let engine = PreferenceEngine::new(&store, &questions, "P1", None).unwrap();
        assert!(engine.scores().iter().all(|s| s.score == 0.0));
        assert_eq!(engine.percentage_matrix().cells[0][1], Some(0.0));
    }
}
