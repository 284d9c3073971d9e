//! Combining several surveys into one synthetic dataset.
//!
//! Pooling stacks the selected DV and IV columns of every survey; trending stacks the DV
//! column only and adds a synthesized IV whose categories are the surveys themselves.
//! Both read each source through its active view, so a filter must be applied to all
//! sources or to none.

use crate::analysis::crosstab::CrosstabEngine;
use crate::catalog::{
    BlockStatus, Classification, DataType, Question, Response, RespValue, VariableType,
};
use crate::config::AnalysisConfig;
use crate::error::SurveyError;
use crate::store::TabularResponseStore;
use tracing::{info, warn};

pub mod validation;

pub use validation::{validate_filter_consistency, validate_structures};

/// Columns of the synthetic dataset; the case number is column 0.
const DV_COLUMN: usize = 1;
const IV_COLUMN: usize = 2;

/// One survey's contribution: its data and the questions selected from it.
#[derive(Debug, Clone, Copy)]
pub struct SurveySelection<'a> {
    pub name: &'a str,
    pub store: &'a TabularResponseStore,
    pub dv: &'a Question,
    pub iv: Option<&'a Question>,
}

impl<'a> SurveySelection<'a> {
    pub fn new(name: &'a str, store: &'a TabularResponseStore, dv: &'a Question) -> Self {
        SurveySelection {
            name,
            store,
            dv,
            iv: None,
        }
    }

    pub fn with_iv(mut self, iv: &'a Question) -> Self {
        self.iv = Some(iv);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PoolSource {
    pub name: String,
    /// Respondents copied from this survey.
    pub cases: usize,
}

/// The merged dataset: a case-number column, the DV column and the IV column.
#[derive(Debug, Clone)]
pub struct PooledSurvey {
    store: TabularResponseStore,
    dv: Question,
    iv: Question,
    sources: Vec<PoolSource>,
}

impl PooledSurvey {
    pub fn store(&self) -> &TabularResponseStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut TabularResponseStore {
        &mut self.store
    }

    pub fn dv(&self) -> &Question {
        &self.dv
    }

    pub fn iv(&self) -> &Question {
        &self.iv
    }

    pub fn sources(&self) -> &[PoolSource] {
        &self.sources
    }

    pub fn respondent_count(&self) -> usize {
        self.store.respondent_count()
    }

    /// Pooled DV by pooled IV.
    pub fn crosstab(&self, config: &AnalysisConfig) -> anyhow::Result<CrosstabEngine> {
        CrosstabEngine::with_config(&self.store, &self.dv, &self.iv, config)
    }
}

fn require_surveys(selections: &[SurveySelection<'_>]) -> anyhow::Result<()> {
    if selections.is_empty() {
        return Err(SurveyError::MissingInput("surveys to combine").into());
    }
    Ok(())
}

fn field(store: &TabularResponseStore, row: usize, column: usize) -> String {
    store.field(row, column).unwrap_or("").trim().to_string()
}

/// Union of every source's missing tokens, in first-seen order.
fn merged_missing_values(selections: &[SurveySelection<'_>]) -> Vec<String> {
    let mut merged: Vec<String> = Vec::new();
    for selection in selections {
        for token in selection.store.missing_values() {
            if !merged.contains(token) {
                merged.push(token.clone());
            }
        }
    }
    merged
}

/// Names of the sources read with simulation or static weighting on. The synthetic dataset
/// carries no weight column, so their respondents count once each.
fn weighted_sources<'a>(selections: &[SurveySelection<'a>]) -> Vec<&'a str> {
    selections
        .iter()
        .filter(|s| s.store.is_weighted())
        .map(|s| s.name)
        .collect()
}

fn warn_dropped_weights(selections: &[SurveySelection<'_>]) {
    let weighted = weighted_sources(selections);
    if !weighted.is_empty() {
        warn!(surveys = ?weighted, "source weights are not carried into the combined dataset");
    }
}

/// Copy of a source question re-pointed at a column of the synthetic dataset, with its
/// computed statistics cleared.
fn rebased(question: &Question, column: usize) -> Question {
    let mut question = question.clone();
    question.column = column;
    question.total_n = 0.0;
    question.total_index = 0;
    question.responses.iter_mut().for_each(|r| r.reset_statistics());
    question
}

/// Stacks the DV and IV columns of every survey into one dataset. The last survey's
/// question definitions become the schema of the result.
pub fn pool(selections: &[SurveySelection<'_>], config: &AnalysisConfig) -> anyhow::Result<PooledSurvey> {
    config.validate()?;
    require_surveys(selections)?;
    validate_filter_consistency(selections)?;

    let mut pairs = Vec::with_capacity(selections.len());
    for selection in selections {
        let iv = selection
            .iv
            .ok_or(SurveyError::MissingInput("independent question for pooling"))?;
        selection.store.check_column(selection.dv)?;
        selection.store.check_column(iv)?;
        pairs.push((selection, iv));
    }
    validate_structures(selections)?;

    for (selection, iv) in &pairs {
        let dv_cases = selection.store.case_count(selection.dv.column);
        let iv_cases = selection.store.case_count(iv.column);
        if dv_cases != iv_cases {
            return Err(SurveyError::CaseCountMismatch {
                survey: selection.name.to_string(),
                dv: selection.dv.code.clone(),
                iv: iv.code.clone(),
                dv_cases,
                iv_cases,
            }
            .into());
        }
    }

    warn_dropped_weights(selections);
    let mut rows = Vec::new();
    let mut sources = Vec::with_capacity(pairs.len());
    for (selection, iv) in &pairs {
        let store = selection.store;
        for &row in store.active_rows() {
            rows.push(vec![
                (rows.len() + 1).to_string(),
                field(store, row, selection.dv.column),
                field(store, row, iv.column),
            ]);
        }
        sources.push(PoolSource {
            name: selection.name.to_string(),
            cases: store.active_rows().len(),
        });
    }

    let Some(&(last, last_iv)) = pairs.last() else {
        return Err(SurveyError::MissingInput("surveys to combine").into());
    };
    let dv = rebased(last.dv, DV_COLUMN);
    let iv = rebased(last_iv, IV_COLUMN);
    let header = vec![config.pool_case_header.clone(), dv.code.clone(), iv.code.clone()];
    let store = TabularResponseStore::with_config(header, rows, merged_missing_values(selections), config)?;

    info!(
        surveys = sources.len(),
        respondents = store.respondent_count(),
        dv = %dv.code,
        iv = %iv.code,
        "surveys pooled"
    );
    Ok(PooledSurvey {
        store,
        dv,
        iv,
        sources,
    })
}

/// The synthesized wave question: one Neutral response per survey, valued 1..=N in order.
pub fn trend_question(names: &[&str], config: &AnalysisConfig) -> Question {
    let responses = names
        .iter()
        .enumerate()
        .map(|(i, name)| Response::new((i + 1) as RespValue, *name, Classification::Neutral))
        .collect();
    Question::new(config.trend_question_code.clone(), IV_COLUMN, responses)
        .with_label(config.trend_question_label.clone())
        .with_variable_type(VariableType::Independent)
        .with_data_type(DataType::Nominal)
        .with_block_status(BlockStatus::DiscreetQuestion)
}

/// Stacks the DV column of every survey and tags each respondent with the wave (1-based
/// survey position) it came from. Selected IVs are ignored.
pub fn trend(selections: &[SurveySelection<'_>], config: &AnalysisConfig) -> anyhow::Result<PooledSurvey> {
    config.validate()?;
    require_surveys(selections)?;
    validate_filter_consistency(selections)?;
    for selection in selections {
        selection.store.check_column(selection.dv)?;
    }
    let dv_only: Vec<SurveySelection<'_>> = selections
        .iter()
        .map(|s| SurveySelection { iv: None, ..*s })
        .collect();
    validate_structures(&dv_only)?;
    warn_dropped_weights(selections);

    let mut rows = Vec::new();
    let mut sources = Vec::with_capacity(selections.len());
    for (wave, selection) in selections.iter().enumerate() {
        let store = selection.store;
        for &row in store.active_rows() {
            rows.push(vec![
                (rows.len() + 1).to_string(),
                field(store, row, selection.dv.column),
                (wave + 1).to_string(),
            ]);
        }
        sources.push(PoolSource {
            name: selection.name.to_string(),
            cases: store.active_rows().len(),
        });
    }

    let names: Vec<&str> = selections.iter().map(|s| s.name).collect();
    let iv = trend_question(&names, config);
    let Some(last) = selections.last() else {
        return Err(SurveyError::MissingInput("surveys to combine").into());
    };
    let dv = rebased(last.dv, DV_COLUMN);
    let header = vec![config.pool_case_header.clone(), dv.code.clone(), iv.code.clone()];
    let store = TabularResponseStore::with_config(header, rows, merged_missing_values(selections), config)?;

    info!(
        waves = sources.len(),
        respondents = store.respondent_count(),
        dv = %dv.code,
        "surveys trended"
    );
    Ok(PooledSurvey {
        store,
        dv,
        iv,
        sources,
    })
}
