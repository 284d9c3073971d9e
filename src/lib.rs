//! # survey-statistics
//!
//! Statistical core of a survey-analysis application: descriptive statistics per question,
//! contingency tables with chi-square testing, weighted correlation, one-way ANOVA,
//! forced-choice preference scoring and pooling of several surveys into one dataset.
//!
//! The crate performs no I/O. Callers hand it a [`TabularResponseStore`] (header plus one
//! row of answer fields per respondent) and a [`QuestionCatalog`] describing the response
//! scales, and get immutable result objects back.
//!
//! ## Core Features
//!
//! - **Question statistics**: frequencies, percents, cumulative and inverse cumulative
//!   percents, sampling error and the positive/negative index
//! - **Crosstabs**: column percentages, per-column index, marginal percentages, chi-square,
//!   phi, contingency coefficient and Cramér's V
//! - **Correlation and ANOVA**: weighted variance, covariance, Pearson r and F with
//!   table-driven significance plus exact p-values
//! - **Preference blocks**: pairwise win matrices and preference scores for 4, 5 or 6 items
//! - **Block analyses**: index rankings, index-plus breakdowns, two-block gaps, target-block
//!   screening and single-response rankings
//! - **Pool and trend**: merging the same questions from several surveys
//!
//! ## Quick Start
//!
//! Build a store and catalog, optionally narrow the store with Select On / Select Plus or
//! enable weighting, then construct an engine such as [`CrosstabEngine`] and read its
//! results. Engines never recompute after construction.
//!
//! ## Module Organization
//!
//! - **[`catalog`]**: questions, responses and block resolution
//! - **[`store`]**: respondent data, weighting and row filters
//! - **[`stats`]**: per-question descriptive statistics
//! - **[`significance`]**: critical-value tables and p-values
//! - **[`analysis`]**: crosstab, correlation, ANOVA, preference and block engines
//! - **[`pool`]**: pooling and trending across surveys

pub mod analysis;
pub mod catalog;
pub mod config;
pub mod error;
pub mod pool;
pub mod significance;
pub mod stats;
pub mod store;

#[cfg(test)]
mod fixtures;

pub use analysis::{AnovaEngine, CorrelationEngine, CrosstabEngine, PreferenceEngine};
pub use catalog::{Classification, Question, QuestionCatalog, RespValue, Response};
pub use config::AnalysisConfig;
pub use error::SurveyError;
pub use significance::Significance;
pub use store::{Movement, TabularResponseStore};
