//! Which IV categories over-represent a chosen DV answer.

use crate::analysis::crosstab::CrosstabEngine;
use crate::catalog::{Question, RespValue};
use crate::config::AnalysisConfig;
use crate::store::TabularResponseStore;
use serde::Serialize;
use std::cmp::Ordering;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileItem {
    pub iv_code: String,
    pub iv_value: RespValue,
    pub iv_label: String,
    /// Share of the DV answer's respondents that fall in this IV category.
    pub row_percent: f64,
    /// Share of the whole crosstab that falls in this IV category.
    pub marginal_percent: f64,
    /// `row_percent - marginal_percent`.
    pub lift: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileEngine {
    dv_code: String,
    dv_value: RespValue,
    items: Vec<ProfileItem>,
}

impl ProfileEngine {
    /// Profiles respondents giving `dv_value` to `dv` against every question in `ivs`.
    pub fn new(
        store: &TabularResponseStore,
        dv: &Question,
        dv_value: RespValue,
        ivs: &[Question],
    ) -> anyhow::Result<Self> {
        Self::with_config(store, dv, dv_value, ivs, &AnalysisConfig::default())
    }

    pub fn with_config(
        store: &TabularResponseStore,
        dv: &Question,
        dv_value: RespValue,
        ivs: &[Question],
        config: &AnalysisConfig,
    ) -> anyhow::Result<Self> {
        dv.response_or_err(dv_value)?;

        let mut items = Vec::new();
        for iv in ivs {
            let crosstab = CrosstabEngine::with_config(store, dv, iv, config)?;
            let lifts = crosstab.profile_percentages(dv_value)?;
            for (col, lift) in lifts.into_iter().enumerate() {
                let marginal_percent = crosstab.marginal_percentages()[col];
                items.push(ProfileItem {
                    iv_code: iv.code.clone(),
                    iv_value: crosstab.column_values()[col],
                    iv_label: crosstab.column_labels()[col].clone(),
                    row_percent: lift + marginal_percent,
                    marginal_percent,
                    lift,
                });
            }
        }
        items.sort_by(|a, b| b.lift.partial_cmp(&a.lift).unwrap_or(Ordering::Equal));

        debug!(dv = %dv.code, dv_value, ivs = ivs.len(), items = items.len(), "profile computed");
        Ok(ProfileEngine {
            dv_code: dv.code.clone(),
            dv_value,
            items,
        })
    }

    pub fn dv_code(&self) -> &str {
        &self.dv_code
    }

    pub fn dv_value(&self) -> RespValue {
        self.dv_value
    }

    /// Every IV category, highest lift first.
    pub fn items(&self) -> &[ProfileItem] {
        &self.items
    }

    /// Categories where the DV answer is over-represented.
    pub fn over_represented(&self) -> impl Iterator<Item = &ProfileItem> {
        self.items.iter().filter(|item| item.lift > 0.0)
    }
}
