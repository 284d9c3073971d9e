//! One-way analysis of variance of an interval DV across the categories of a nominal IV.
//!
//! The sample and every IV category get their own [`CorrelationEngine`]; the decomposition
//! into between- and within-group variation is built from their sums of squared deviations.

use crate::analysis::correlation::{CorrelationEngine, VariableSummary};
use crate::catalog::{Question, RespValue};
use crate::config::AnalysisConfig;
use crate::error::SurveyError;
use crate::significance::{self, Significance};
use crate::store::TabularResponseStore;
use serde::Serialize;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnovaGroup {
    pub value: RespValue,
    pub label: String,
    pub unweighted_n: usize,
    pub summary: VariableSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnovaEngine {
    dv_code: String,
    iv_code: String,
    total: VariableSummary,
    groups: Vec<AnovaGroup>,
    between_variation: f64,
    within_variation: f64,
    df_between: usize,
    df_within: usize,
    f: f64,
    eta_squared: f64,
    eta: f64,
    significance: Significance,
    p_value: f64,
}

impl AnovaEngine {
    pub fn new(store: &TabularResponseStore, dv: &Question, iv: &Question) -> anyhow::Result<Self> {
        Self::with_config(store, dv, iv, &AnalysisConfig::default())
    }

    pub fn with_config(
        store: &TabularResponseStore,
        dv: &Question,
        iv: &Question,
        config: &AnalysisConfig,
    ) -> anyhow::Result<Self> {
        if !dv.data_type.is_interval() {
            return Err(SurveyError::InvalidDataType {
                question: dv.code.clone(),
                expected: "interval",
            }
            .into());
        }
        if !iv.data_type.is_nominal() {
            return Err(SurveyError::InvalidDataType {
                question: iv.code.clone(),
                expected: "nominal",
            }
            .into());
        }
        store.check_column(iv)?;

        let categories: Vec<RespValue> = iv.valid_responses().map(|r| r.value).collect();
        let sample_rows = store.restricted_rows(iv.column, &categories);
        let total = CorrelationEngine::over_rows(store, &sample_rows, dv, None, config)?;

        let mut groups = Vec::with_capacity(categories.len());
        for response in iv.valid_responses() {
            let rows = store.restricted_rows(iv.column, &[response.value]);
            let engine = CorrelationEngine::over_rows(store, &rows, dv, None, config)?;
            groups.push(AnovaGroup {
                value: response.value,
                label: response.label.clone(),
                unweighted_n: engine.unweighted_n(),
                summary: *engine.dv(),
            });
        }

        let total = *total.dv();
        let within_variation: f64 = groups.iter().map(|g| g.summary.variation).sum();
        let between_variation = (total.variation - within_variation).max(0.0);

        let k = groups.iter().filter(|g| g.summary.n > 0.0).count();
        let n = total.n.round() as usize;
        let df_between = k.saturating_sub(1);
        let df_within = n.saturating_sub(k);

        let f = if df_between > 0 && df_within > 0 && within_variation > 0.0 {
            (between_variation / df_between as f64) / (within_variation / df_within as f64)
        } else {
            0.0
        };
        if k < 2 {
            warn!(dv = %dv.code, iv = %iv.code, groups = k, "anova needs at least two non-empty groups");
        }

        let eta_squared = if total.variation > 0.0 {
            between_variation / total.variation
        } else {
            0.0
        };

        let significance = significance::f_significance(f, df_between, df_within);
        debug!(dv = %dv.code, iv = %iv.code, f, eta_squared, %significance, "anova computed");

        Ok(AnovaEngine {
            dv_code: dv.code.clone(),
            iv_code: iv.code.clone(),
            total,
            groups,
            between_variation,
            within_variation,
            df_between,
            df_within,
            f,
            eta_squared,
            eta: eta_squared.sqrt(),
            significance,
            p_value: significance::f_p_value(f, df_between, df_within),
        })
    }

    pub fn dv_code(&self) -> &str {
        &self.dv_code
    }

    pub fn iv_code(&self) -> &str {
        &self.iv_code
    }

    pub fn total(&self) -> &VariableSummary {
        &self.total
    }

    pub fn groups(&self) -> &[AnovaGroup] {
        &self.groups
    }

    pub fn total_variation(&self) -> f64 {
        self.total.variation
    }

    pub fn between_variation(&self) -> f64 {
        self.between_variation
    }

    pub fn within_variation(&self) -> f64 {
        self.within_variation
    }

    pub fn degrees_of_freedom(&self) -> (usize, usize) {
        (self.df_between, self.df_within)
    }

    pub fn f(&self) -> f64 {
        self.f
    }

    pub fn eta_squared(&self) -> f64 {
        self.eta_squared
    }

    pub fn eta(&self) -> f64 {
        self.eta
    }

    pub fn significance(&self) -> Significance {
        self.significance
    }

    pub fn p_value(&self) -> f64 {
        self.p_value
    }
}
