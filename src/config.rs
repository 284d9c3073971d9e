//! Analysis constants that engines read at construction time.

use crate::error::SurveyError;
use crate::significance::CHI_SQUARE_TABLE_LEN;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// z multiplier for sampling error and confidence intervals (95% two-sided).
    pub confidence_z: f64,
    /// Chi-square degrees of freedom are clamped to this before the table lookup.
    pub chi_square_df_cap: usize,
    /// Header literal identifying the static weight column.
    pub static_weight_header: String,
    /// Code of the independent question synthesized for trending.
    pub trend_question_code: String,
    pub trend_question_label: String,
    /// Header of the case-number column in pooled datasets.
    pub pool_case_header: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            confidence_z: 1.96,
            chi_square_df_cap: CHI_SQUARE_TABLE_LEN,
            static_weight_header: "WEIGHT".to_string(),
            trend_question_code: "WAVE".to_string(),
            trend_question_label: "Survey".to_string(),
            pool_case_header: "CASE".to_string(),
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(self.confidence_z.is_finite() && self.confidence_z > 0.0) {
            return Err(SurveyError::InvalidConfig(format!(
                "confidence_z must be positive, got {}",
                self.confidence_z
            ))
            .into());
        }
        if self.chi_square_df_cap == 0 || self.chi_square_df_cap > CHI_SQUARE_TABLE_LEN {
            return Err(SurveyError::InvalidConfig(format!(
                "chi_square_df_cap must be between 1 and {}, got {}",
                CHI_SQUARE_TABLE_LEN, self.chi_square_df_cap
            ))
            .into());
        }
        let headers = [
            ("static_weight_header", &self.static_weight_header),
            ("trend_question_code", &self.trend_question_code),
            ("pool_case_header", &self.pool_case_header),
        ];
        for (name, value) in headers {
            if value.trim().is_empty() {
                return Err(SurveyError::InvalidConfig(format!("{name} cannot be empty")).into());
            }
        }
        Ok(())
    }
}
