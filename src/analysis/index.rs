//! Index summaries over the questions of a block.

use crate::analysis::crosstab::CrosstabEngine;
use crate::catalog::block::{questions_in_block, validate_block};
use crate::catalog::{Classification, Question};
use crate::config::AnalysisConfig;
use crate::error::SurveyError;
use crate::stats::compute_question_statistics_with;
use crate::store::TabularResponseStore;
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexItem {
    pub code: String,
    pub label: String,
    pub total_index: i64,
    pub n: f64,
    /// Index per IV column; empty without an IV.
    pub column_indexes: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexPlusItem {
    pub code: String,
    pub label: String,
    pub total_index: i64,
    pub positive_percent: f64,
    pub neutral_percent: f64,
    pub negative_percent: f64,
    pub n: f64,
}

/// Resolves the block holding `dv_code` and checks that its members share one scale.
pub(crate) fn resolve_block<'a>(questions: &'a [Question], dv_code: &str) -> anyhow::Result<&'a [Question]> {
    let position = questions
        .iter()
        .position(|q| q.code == dv_code)
        .ok_or_else(|| SurveyError::QuestionNotFound(dv_code.to_string()))?;
    let block = questions_in_block(position, questions);
    if block.is_empty() {
        return Err(SurveyError::NotInBlock {
            question: dv_code.to_string(),
        }
        .into());
    }
    validate_block(block).map_err(SurveyError::from)?;
    Ok(block)
}

/// Computes fresh statistics for a copy of `question` against the store's active view.
pub(crate) fn with_statistics(
    question: &Question,
    store: &TabularResponseStore,
    config: &AnalysisConfig,
) -> anyhow::Result<Question> {
    let mut question = question.clone();
    compute_question_statistics_with(&mut question, store, config)?;
    Ok(question)
}

fn by_index_descending<T>(items: &mut [T], index: impl Fn(&T) -> i64) {
    items.sort_by_key(|item| std::cmp::Reverse(index(item)));
}

/// Total index of every question in a block, optionally broken down by the columns of an IV,
/// ranked from highest to lowest index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexEngine {
    iv_code: Option<String>,
    column_labels: Vec<String>,
    items: Vec<IndexItem>,
}

impl IndexEngine {
    pub fn new(
        store: &TabularResponseStore,
        questions: &[Question],
        dv_code: &str,
        iv: Option<&Question>,
    ) -> anyhow::Result<Self> {
        Self::with_config(store, questions, dv_code, iv, &AnalysisConfig::default())
    }

    pub fn with_config(
        store: &TabularResponseStore,
        questions: &[Question],
        dv_code: &str,
        iv: Option<&Question>,
        config: &AnalysisConfig,
    ) -> anyhow::Result<Self> {
        let block = resolve_block(questions, dv_code)?;
        let column_labels = iv
            .map(|iv| iv.valid_responses().map(|r| r.label.clone()).collect())
            .unwrap_or_default();

        let mut items = Vec::with_capacity(block.len());
        for question in block {
            let computed = with_statistics(question, store, config)?;
            let column_indexes = match iv {
                Some(iv) => CrosstabEngine::with_config(store, question, iv, config)?
                    .index_row()
                    .to_vec(),
                None => Vec::new(),
            };
            items.push(IndexItem {
                code: computed.code,
                label: computed.label,
                total_index: computed.total_index,
                n: computed.total_n,
                column_indexes,
            });
        }
        by_index_descending(&mut items, |item| item.total_index);

        debug!(dv = dv_code, questions = items.len(), iv = ?iv.map(|q| &q.code), "index computed");
        Ok(IndexEngine {
            iv_code: iv.map(|q| q.code.clone()),
            column_labels,
            items,
        })
    }

    pub fn iv_code(&self) -> Option<&str> {
        self.iv_code.as_deref()
    }

    pub fn column_labels(&self) -> &[String] {
        &self.column_labels
    }

    pub fn items(&self) -> &[IndexItem] {
        &self.items
    }
}

/// Block index together with the positive, neutral and negative shares behind it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexPlusEngine {
    items: Vec<IndexPlusItem>,
}

impl IndexPlusEngine {
    pub fn new(
        store: &TabularResponseStore,
        questions: &[Question],
        dv_code: &str,
    ) -> anyhow::Result<Self> {
        Self::with_config(store, questions, dv_code, &AnalysisConfig::default())
    }

    pub fn with_config(
        store: &TabularResponseStore,
        questions: &[Question],
        dv_code: &str,
        config: &AnalysisConfig,
    ) -> anyhow::Result<Self> {
        let block = resolve_block(questions, dv_code)?;
        let mut items = Vec::with_capacity(block.len());
        for question in block {
            let computed = with_statistics(question, store, config)?;
            let share = |class: Classification| -> f64 {
                computed
                    .valid_responses()
                    .filter(|r| r.classification == class)
                    .map(|r| r.percent * 100.0)
                    .sum()
            };
            items.push(IndexPlusItem {
                positive_percent: share(Classification::Positive),
                neutral_percent: share(Classification::Neutral),
                negative_percent: share(Classification::Negative),
                total_index: computed.total_index,
                n: computed.total_n,
                code: computed.code.clone(),
                label: computed.label.clone(),
            });
        }
        by_index_descending(&mut items, |item| item.total_index);

        debug!(dv = dv_code, questions = items.len(), "index plus computed");
        Ok(IndexPlusEngine { items })
    }

    pub fn items(&self) -> &[IndexPlusItem] {
        &self.items
    }
}
