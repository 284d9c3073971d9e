//! Weighted variance, covariance and Pearson correlation over respondent answers.
//!
//! A respondent contributes when its DV answer (and, in bivariate mode, its IV answer) is a
//! non-missing code of the question's scale. With simulation or static weighting enabled
//! every sum is weighted; otherwise raw counts are used.

use crate::catalog::{Question, RespValue};
use crate::config::AnalysisConfig;
use crate::significance::{self, Significance};
use crate::store::TabularResponseStore;
use serde::Serialize;
use tracing::debug;

/// Descriptive statistics of one variable.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct VariableSummary {
    pub n: f64,
    pub sum: f64,
    pub mean: f64,
    /// Sum of (weighted) squared deviations from the mean.
    pub variation: f64,
    pub variance: f64,
    pub std_dev: f64,
    pub std_error: f64,
    pub confidence_low: f64,
    pub confidence_high: f64,
}

impl VariableSummary {
    fn from_observations(values: &[f64], weights: &[f64], z: f64) -> Self {
        let n: f64 = weights.iter().sum();
        if n <= 0.0 {
            return VariableSummary::default();
        }
        let sum: f64 = values.iter().zip(weights).map(|(x, w)| x * w).sum();
        let mean = sum / n;
        let variation: f64 = values
            .iter()
            .zip(weights)
            .map(|(x, w)| w * (x - mean).powi(2))
            .sum();
        let variance = if n > 1.0 { variation / (n - 1.0) } else { 0.0 };
        let std_dev = variance.sqrt();
        let std_error = std_dev / n.sqrt();
        VariableSummary {
            n,
            sum,
            mean,
            variation,
            variance,
            std_dev,
            std_error,
            confidence_low: mean - z * std_error,
            confidence_high: mean + z * std_error,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CorrelationSummary {
    pub covariation: f64,
    pub r: f64,
    pub r_squared: f64,
    pub degrees_of_freedom: i64,
    pub significance: Significance,
    pub p_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationEngine {
    dv_code: String,
    iv_code: Option<String>,
    weighted: bool,
    unweighted_n: usize,
    dv: VariableSummary,
    iv: Option<VariableSummary>,
    correlation: Option<CorrelationSummary>,
}

fn valid_value(store: &TabularResponseStore, row: usize, question: &Question) -> Option<RespValue> {
    let value = store.value(row, question.column)?;
    if question.is_missing(value) || question.response(value).is_none() {
        return None;
    }
    Some(value)
}

impl CorrelationEngine {
    /// Summary statistics of a single interval question.
    pub fn univariate(store: &TabularResponseStore, dv: &Question) -> anyhow::Result<Self> {
        Self::over_rows(store, store.active_rows(), dv, None, &AnalysisConfig::default())
    }

    pub fn bivariate(
        store: &TabularResponseStore,
        dv: &Question,
        iv: &Question,
    ) -> anyhow::Result<Self> {
        Self::over_rows(store, store.active_rows(), dv, Some(iv), &AnalysisConfig::default())
    }

    pub fn with_config(
        store: &TabularResponseStore,
        dv: &Question,
        iv: Option<&Question>,
        config: &AnalysisConfig,
    ) -> anyhow::Result<Self> {
        Self::over_rows(store, store.active_rows(), dv, iv, config)
    }

    pub fn over_rows(
        store: &TabularResponseStore,
        rows: &[usize],
        dv: &Question,
        iv: Option<&Question>,
        config: &AnalysisConfig,
    ) -> anyhow::Result<Self> {
        config.validate()?;
        store.check_column(dv)?;
        if let Some(iv) = iv {
            store.check_column(iv)?;
        }

        let weighted = store.is_weighted();
        let mut xs = Vec::with_capacity(rows.len());
        let mut ys = Vec::with_capacity(rows.len());
        let mut weights = Vec::with_capacity(rows.len());

        for &row in rows {
            let Some(x) = valid_value(store, row, dv) else {
                continue;
            };
            if let Some(iv) = iv {
                let Some(y) = valid_value(store, row, iv) else {
                    continue;
                };
                ys.push(y as f64);
            }
            xs.push(x as f64);
            weights.push(if weighted { store.weight(row) } else { 1.0 });
        }

        let z = config.confidence_z;
        let dv_summary = VariableSummary::from_observations(&xs, &weights, z);
        let iv_summary = iv.map(|_| VariableSummary::from_observations(&ys, &weights, z));

        let correlation = iv_summary.map(|iv_summary| {
            let covariation: f64 = xs
                .iter()
                .zip(&ys)
                .zip(&weights)
                .map(|((x, y), w)| w * (x - dv_summary.mean) * (y - iv_summary.mean))
                .sum();
            let denominator = (dv_summary.variation * iv_summary.variation).sqrt();
            let r = if denominator > 0.0 {
                covariation / denominator
            } else {
                0.0
            };
            let degrees_of_freedom = dv_summary.n.round() as i64 - 2;
            CorrelationSummary {
                covariation,
                r,
                r_squared: r * r,
                degrees_of_freedom,
                significance: significance::correlation_significance(r, degrees_of_freedom),
                p_value: significance::correlation_p_value(r, degrees_of_freedom),
            }
        });

        debug!(
            dv = %dv.code,
            iv = iv.map(|q| q.code.as_str()).unwrap_or("-"),
            n = dv_summary.n,
            weighted,
            r = ?correlation.map(|c| c.r),
            "correlation computed"
        );

        Ok(CorrelationEngine {
            dv_code: dv.code.clone(),
            iv_code: iv.map(|q| q.code.clone()),
            weighted,
            unweighted_n: xs.len(),
            dv: dv_summary,
            iv: iv_summary,
            correlation,
        })
    }

    pub fn dv_code(&self) -> &str {
        &self.dv_code
    }

    pub fn iv_code(&self) -> Option<&str> {
        self.iv_code.as_deref()
    }

    pub fn is_weighted(&self) -> bool {
        self.weighted
    }

    /// Respondents that contributed, regardless of weight.
    pub fn unweighted_n(&self) -> usize {
        self.unweighted_n
    }

    pub fn dv(&self) -> &VariableSummary {
        &self.dv
    }

    pub fn iv(&self) -> Option<&VariableSummary> {
        self.iv.as_ref()
    }

    pub fn correlation(&self) -> Option<&CorrelationSummary> {
        self.correlation.as_ref()
    }
}
