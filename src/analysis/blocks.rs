//! Block-level analyses: comparing two parallel blocks, screening a block against an IV,
//! and ranking a block by the share of one response.

use crate::analysis::crosstab::CrosstabEngine;
use crate::analysis::index::{resolve_block, with_statistics};
use crate::catalog::{Question, RespValue};
use crate::config::AnalysisConfig;
use crate::error::SurveyError;
use crate::significance::Significance;
use crate::store::TabularResponseStore;
use serde::Serialize;
use std::cmp::Ordering;
use tracing::debug;

/// One pair of matching questions from two blocks, e.g. importance vs. performance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TwoBlockIndex {
    pub label: String,
    pub first_code: String,
    pub second_code: String,
    pub first_index: i64,
    pub second_index: i64,
    /// `first_index - second_index`.
    pub gap: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TwoBlockEngine {
    items: Vec<TwoBlockIndex>,
}

impl TwoBlockEngine {
    /// Pairs the i-th question of the block holding `first_code` with the i-th question of
    /// the block holding `second_code`.
    pub fn new(
        store: &TabularResponseStore,
        questions: &[Question],
        first_code: &str,
        second_code: &str,
    ) -> anyhow::Result<Self> {
        Self::with_config(store, questions, first_code, second_code, &AnalysisConfig::default())
    }

    pub fn with_config(
        store: &TabularResponseStore,
        questions: &[Question],
        first_code: &str,
        second_code: &str,
        config: &AnalysisConfig,
    ) -> anyhow::Result<Self> {
        let first = resolve_block(questions, first_code)?;
        let second = resolve_block(questions, second_code)?;
        if first.len() != second.len() {
            return Err(SurveyError::StructureMismatch(format!(
                "Block of '{}' has {} questions but block of '{}' has {}",
                first_code,
                first.len(),
                second_code,
                second.len()
            ))
            .into());
        }

        let mut items = Vec::with_capacity(first.len());
        for (a, b) in first.iter().zip(second) {
            let a = with_statistics(a, store, config)?;
            let b = with_statistics(b, store, config)?;
            items.push(TwoBlockIndex {
                label: a.label.clone(),
                gap: a.total_index - b.total_index,
                first_index: a.total_index,
                second_index: b.total_index,
                first_code: a.code,
                second_code: b.code,
            });
        }

        debug!(first = first_code, second = second_code, pairs = items.len(), "two-block index computed");
        Ok(TwoBlockEngine { items })
    }

    /// Pairs in block order.
    pub fn items(&self) -> &[TwoBlockIndex] {
        &self.items
    }

    /// Pairs sorted by gap, largest first.
    pub fn by_gap(&self) -> Vec<TwoBlockIndex> {
        let mut sorted = self.items.clone();
        sorted.sort_by_key(|item| std::cmp::Reverse(item.gap));
        sorted
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatSigItem {
    pub code: String,
    pub label: String,
    pub chi_square: f64,
    pub degrees_of_freedom: usize,
    pub significance: Significance,
    pub p_value: f64,
    pub cramers_v: f64,
    pub column_indexes: Vec<i64>,
}

/// Crosstabs every question of a block against one IV and ranks them by chi-square.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetBlockEngine {
    iv_code: String,
    items: Vec<StatSigItem>,
}

impl TargetBlockEngine {
    pub fn new(
        store: &TabularResponseStore,
        questions: &[Question],
        dv_code: &str,
        iv: &Question,
    ) -> anyhow::Result<Self> {
        Self::with_config(store, questions, dv_code, iv, &AnalysisConfig::default())
    }

    pub fn with_config(
        store: &TabularResponseStore,
        questions: &[Question],
        dv_code: &str,
        iv: &Question,
        config: &AnalysisConfig,
    ) -> anyhow::Result<Self> {
        let block = resolve_block(questions, dv_code)?;
        let mut items = Vec::with_capacity(block.len());
        for question in block {
            let crosstab = CrosstabEngine::with_config(store, question, iv, config)?;
            let chi = crosstab.chi_square();
            items.push(StatSigItem {
                code: question.code.clone(),
                label: question.label.clone(),
                chi_square: chi.chi_square,
                degrees_of_freedom: chi.degrees_of_freedom,
                significance: chi.significance,
                p_value: chi.p_value,
                cramers_v: chi.cramers_v,
                column_indexes: crosstab.index_row().to_vec(),
            });
        }
        items.sort_by(|a, b| b.chi_square.partial_cmp(&a.chi_square).unwrap_or(Ordering::Equal));

        debug!(
            dv = dv_code,
            iv = %iv.code,
            significant = items.iter().filter(|i| i.significance.is_significant()).count(),
            "target block screened"
        );
        Ok(TargetBlockEngine {
            iv_code: iv.code.clone(),
            items,
        })
    }

    pub fn iv_code(&self) -> &str {
        &self.iv_code
    }

    /// Highest chi-square first.
    pub fn items(&self) -> &[StatSigItem] {
        &self.items
    }

    pub fn significant(&self) -> impl Iterator<Item = &StatSigItem> {
        self.items.iter().filter(|i| i.significance.is_significant())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OneResponseItem {
    pub code: String,
    pub label: String,
    pub response_label: String,
    pub frequency: f64,
    pub percent: f64,
}

/// Ranks the questions of a block by the share of respondents giving one particular answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SingleResponseEngine {
    value: RespValue,
    items: Vec<OneResponseItem>,
}

impl SingleResponseEngine {
    pub fn new(
        store: &TabularResponseStore,
        questions: &[Question],
        dv_code: &str,
        value: RespValue,
    ) -> anyhow::Result<Self> {
        Self::with_config(store, questions, dv_code, value, &AnalysisConfig::default())
    }

    pub fn with_config(
        store: &TabularResponseStore,
        questions: &[Question],
        dv_code: &str,
        value: RespValue,
        config: &AnalysisConfig,
    ) -> anyhow::Result<Self> {
        let block = resolve_block(questions, dv_code)?;
        let mut items = Vec::with_capacity(block.len());
        for question in block {
            let computed = with_statistics(question, store, config)?;
            let response = computed.response_or_err(value)?;
            items.push(OneResponseItem {
                code: computed.code.clone(),
                label: computed.label.clone(),
                response_label: response.label.clone(),
                frequency: response.frequency,
                percent: response.percent,
            });
        }
        items.sort_by(|a, b| b.percent.partial_cmp(&a.percent).unwrap_or(Ordering::Equal));

        debug!(dv = dv_code, value, questions = items.len(), "single response ranked");
        Ok(SingleResponseEngine { value, items })
    }

    pub fn value(&self) -> RespValue {
        self.value
    }

    pub fn items(&self) -> &[OneResponseItem] {
        &self.items
    }
}
