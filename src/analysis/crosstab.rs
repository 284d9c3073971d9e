//! Bivariate contingency tables.
//!
//! Rows are the DV's responses and columns the IV's responses, both restricted to
//! non-missing codes. Every active respondent whose DV and IV answers both land on a row
//! and a column adds its weight to that cell; everyone else is silently left out.

use crate::catalog::{Classification, Question, RespValue};
use crate::config::AnalysisConfig;
use crate::error::SurveyError;
use crate::significance::{self, Significance};
use crate::store::TabularResponseStore;
use ndarray::Array2;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, warn};

/// One respondent's paired answers: the atomic input of a contingency matrix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CrosstabItem {
    pub dv_value: RespValue,
    pub iv_value: RespValue,
    pub simulation_weight: f64,
    pub static_weight: f64,
}

impl CrosstabItem {
    pub fn new(dv_value: RespValue, iv_value: RespValue) -> Self {
        CrosstabItem {
            dv_value,
            iv_value,
            simulation_weight: 1.0,
            static_weight: 1.0,
        }
    }

    pub fn weight(&self) -> f64 {
        self.simulation_weight * self.static_weight
    }
}

/// Collects paired items for the given rows. Rows with an absent answer on either side
/// are skipped; membership in the response scales is checked later by the engine.
pub fn collect_items(
    store: &TabularResponseStore,
    rows: &[usize],
    dv: &Question,
    iv: &Question,
) -> anyhow::Result<Vec<CrosstabItem>> {
    store.check_column(dv)?;
    store.check_column(iv)?;
    Ok(rows
        .iter()
        .filter_map(|&row| {
            let dv_value = store.value(row, dv.column)?;
            let iv_value = store.value(row, iv.column)?;
            Some(CrosstabItem {
                dv_value,
                iv_value,
                simulation_weight: store.simulation_weight(row),
                static_weight: store.static_weight(row),
            })
        })
        .collect())
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChiSquareSummary {
    pub chi_square: f64,
    /// `(rows - 1) × (cols - 1)` over the table's dimensions, empty rows and columns included.
    pub degrees_of_freedom: usize,
    pub significance: Significance,
    pub p_value: f64,
    pub phi: f64,
    pub contingency_coefficient: f64,
    pub cramers_v: f64,
}

/// Labeled, display-ready version of a crosstab.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrosstabTable {
    pub dv: String,
    pub iv: String,
    pub column_labels: Vec<String>,
    /// One row per DV response: column percentages (0..=100).
    pub rows: Vec<CrosstabRow>,
    pub totals: Vec<f64>,
    pub index: Vec<i64>,
    pub marginal_percentages: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrosstabRow {
    pub label: String,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct CrosstabEngine {
    dv_code: String,
    iv_code: String,
    row_values: Vec<RespValue>,
    row_labels: Vec<String>,
    row_classes: Vec<Classification>,
    col_values: Vec<RespValue>,
    col_labels: Vec<String>,
    counts: Array2<f64>,
    row_sums: Vec<f64>,
    col_sums: Vec<f64>,
    grand_total: f64,
    unweighted_n: usize,
    column_percentages: Array2<f64>,
    index_row: Vec<i64>,
    marginal_percentages: Vec<f64>,
    chi_square: ChiSquareSummary,
}

/// Non-missing responses with distinct values, in scale order.
fn axis(question: &Question) -> Vec<(RespValue, String, Classification)> {
    let mut seen = HashSet::new();
    question
        .valid_responses()
        .filter(|r| seen.insert(r.value))
        .map(|r| (r.value, r.label.clone(), r.classification))
        .collect()
}

impl CrosstabEngine {
    pub fn new(store: &TabularResponseStore, dv: &Question, iv: &Question) -> anyhow::Result<Self> {
        Self::with_config(store, dv, iv, &AnalysisConfig::default())
    }

    pub fn with_config(
        store: &TabularResponseStore,
        dv: &Question,
        iv: &Question,
        config: &AnalysisConfig,
    ) -> anyhow::Result<Self> {
        Self::over_rows(store, store.active_rows(), dv, iv, config)
    }

    /// Crosstab restricted to an explicit subset of rows.
    pub fn over_rows(
        store: &TabularResponseStore,
        rows: &[usize],
        dv: &Question,
        iv: &Question,
        config: &AnalysisConfig,
    ) -> anyhow::Result<Self> {
        let items = collect_items(store, rows, dv, iv)?;
        Self::from_items(dv, iv, &items, config)
    }

    pub fn from_items(
        dv: &Question,
        iv: &Question,
        items: &[CrosstabItem],
        config: &AnalysisConfig,
    ) -> anyhow::Result<Self> {
        config.validate()?;
        if dv.responses.is_empty() {
            return Err(SurveyError::MissingInput("dependent question responses").into());
        }
        if iv.responses.is_empty() {
            return Err(SurveyError::MissingInput("independent question responses").into());
        }

        let rows = axis(dv);
        let cols = axis(iv);
        let mut counts = Array2::<f64>::zeros((rows.len(), cols.len()));
        let mut unweighted_n = 0;

        for item in items {
            let row = rows.iter().position(|(v, _, _)| *v == item.dv_value);
            let col = cols.iter().position(|(v, _, _)| *v == item.iv_value);
            if let (Some(row), Some(col)) = (row, col) {
                counts[[row, col]] += item.weight();
                unweighted_n += 1;
            }
        }

        let row_sums: Vec<f64> = counts.rows().into_iter().map(|r| r.sum()).collect();
        let col_sums: Vec<f64> = counts.columns().into_iter().map(|c| c.sum()).collect();
        let grand_total: f64 = row_sums.iter().sum();

        let mut column_percentages = Array2::<f64>::zeros(counts.dim());
        for ((row, col), pct) in column_percentages.indexed_iter_mut() {
            if col_sums[col] > 0.0 {
                *pct = counts[[row, col]] / col_sums[col] * 100.0;
            }
        }

        let row_classes: Vec<Classification> = rows.iter().map(|(_, _, c)| *c).collect();
        let index_row = (0..cols.len())
            .map(|col| {
                let mut positive = 0.0;
                let mut negative = 0.0;
                for (row, class) in row_classes.iter().enumerate() {
                    match class {
                        Classification::Positive => positive += column_percentages[[row, col]],
                        Classification::Negative => negative += column_percentages[[row, col]],
                        _ => {}
                    }
                }
                (positive - negative + 100.0).round() as i64
            })
            .collect();

        let marginal_percentages = col_sums
            .iter()
            .map(|&sum| if grand_total > 0.0 { sum / grand_total } else { 0.0 })
            .collect();

        let chi_square = chi_square_summary(&counts, &row_sums, &col_sums, grand_total, config);
        if grand_total <= 0.0 {
            warn!(dv = %dv.code, iv = %iv.code, "crosstab has no cases");
        }
        debug!(
            dv = %dv.code,
            iv = %iv.code,
            n = grand_total,
            chi_square = chi_square.chi_square,
            df = chi_square.degrees_of_freedom,
            "crosstab computed"
        );

        Ok(CrosstabEngine {
            dv_code: dv.code.clone(),
            iv_code: iv.code.clone(),
            row_values: rows.iter().map(|(v, _, _)| *v).collect(),
            row_labels: rows.into_iter().map(|(_, l, _)| l).collect(),
            row_classes,
            col_values: cols.iter().map(|(v, _, _)| *v).collect(),
            col_labels: cols.into_iter().map(|(_, l, _)| l).collect(),
            counts,
            row_sums,
            col_sums,
            grand_total,
            unweighted_n,
            column_percentages,
            index_row,
            marginal_percentages,
            chi_square,
        })
    }

    pub fn dv_code(&self) -> &str {
        &self.dv_code
    }

    pub fn iv_code(&self) -> &str {
        &self.iv_code
    }

    pub fn row_values(&self) -> &[RespValue] {
        &self.row_values
    }

    pub fn row_labels(&self) -> &[String] {
        &self.row_labels
    }

    pub fn row_classifications(&self) -> &[Classification] {
        &self.row_classes
    }

    pub fn column_values(&self) -> &[RespValue] {
        &self.col_values
    }

    pub fn column_labels(&self) -> &[String] {
        &self.col_labels
    }

    /// Weighted cell counts, `[dv row, iv column]`.
    pub fn counts(&self) -> &Array2<f64> {
        &self.counts
    }

    pub fn row_sums(&self) -> &[f64] {
        &self.row_sums
    }

    pub fn column_sums(&self) -> &[f64] {
        &self.col_sums
    }

    pub fn total(&self) -> f64 {
        self.grand_total
    }

    pub fn unweighted_n(&self) -> usize {
        self.unweighted_n
    }

    /// `cell / column sum × 100`; zero for empty columns.
    pub fn column_percentages(&self) -> &Array2<f64> {
        &self.column_percentages
    }

    pub fn index_row(&self) -> &[i64] {
        &self.index_row
    }

    /// Share of the grand total in each IV column (0..=1).
    pub fn marginal_percentages(&self) -> &[f64] {
        &self.marginal_percentages
    }

    pub fn chi_square(&self) -> &ChiSquareSummary {
        &self.chi_square
    }

    /// For the DV row holding `dv_value`: per IV column, the row's share in that column minus
    /// the column's marginal percentage.
    pub fn profile_percentages(&self, dv_value: RespValue) -> anyhow::Result<Vec<f64>> {
        let row = self
            .row_values
            .iter()
            .position(|&v| v == dv_value)
            .ok_or_else(|| SurveyError::ResponseNotFound {
                question: self.dv_code.clone(),
                value: dv_value,
            })?;
        let row_total = self.row_sums[row];
        Ok((0..self.col_values.len())
            .map(|col| {
                let share = if row_total > 0.0 {
                    self.counts[[row, col]] / row_total
                } else {
                    0.0
                };
                share - self.marginal_percentages[col]
            })
            .collect())
    }

    pub fn table(&self) -> CrosstabTable {
        CrosstabTable {
            dv: self.dv_code.clone(),
            iv: self.iv_code.clone(),
            column_labels: self.col_labels.clone(),
            rows: self
                .row_labels
                .iter()
                .zip(self.column_percentages.rows())
                .map(|(label, values)| CrosstabRow {
                    label: label.clone(),
                    values: values.to_vec(),
                })
                .collect(),
            totals: self.col_sums.clone(),
            index: self.index_row.clone(),
            marginal_percentages: self.marginal_percentages.clone(),
        }
    }
}

fn chi_square_summary(
    counts: &Array2<f64>,
    row_sums: &[f64],
    col_sums: &[f64],
    n: f64,
    config: &AnalysisConfig,
) -> ChiSquareSummary {
    let mut chi_square = 0.0;
    if n > 0.0 {
        for ((row, col), &observed) in counts.indexed_iter() {
            let expected = row_sums[row] * col_sums[col] / n;
            if expected > 0.0 {
                chi_square += (observed - expected).powi(2) / expected;
            }
        }
    }

    let (rows, cols) = counts.dim();
    let degrees_of_freedom = rows.saturating_sub(1) * cols.saturating_sub(1);
    let min_dim = rows.min(cols);

    let phi = if n > 0.0 { (chi_square / n).sqrt() } else { 0.0 };
    let contingency_coefficient = if n + chi_square > 0.0 {
        (chi_square / (n + chi_square)).sqrt()
    } else {
        0.0
    };
    let cramers_v = if n > 0.0 && min_dim > 1 {
        (chi_square / (n * (min_dim - 1) as f64)).sqrt()
    } else {
        0.0
    };

    ChiSquareSummary {
        chi_square,
        degrees_of_freedom,
        significance: significance::chi_square_significance(
            chi_square,
            degrees_of_freedom,
            config.chi_square_df_cap,
        ),
        p_value: significance::chi_square_p_value(chi_square, degrees_of_freedom),
        phi,
        contingency_coefficient,
        cramers_v,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Classification::*;
    use crate::fixtures;
    use approx::assert_abs_diff_eq;

    fn gender(column: usize) -> Question {
        fixtures::question("GENDER", column, &[(1, "Male", Neutral), (2, "Female", Neutral)])
    }

    /// 2×2 table: males 30 agree / 10 disagree, females 10 agree / 30 disagree.
    fn opinion_by_gender() -> TabularResponseStore {
        let mut rows = fixtures::repeat(vec![1, 1], 30);
        rows.extend(fixtures::repeat(vec![3, 1], 10));
        rows.extend(fixtures::repeat(vec![1, 2], 10));
        rows.extend(fixtures::repeat(vec![3, 2], 30));
        fixtures::store(&["OPINION", "GENDER"], &rows)
    }

    #[test]
    fn test_counts_and_column_percentages() {
        let store = opinion_by_gender();
        let engine = CrosstabEngine::new(&store, &fixtures::agreement("OPINION", 0), &gender(1)).unwrap();

        assert_eq!(engine.counts().dim(), (3, 2));
        assert_eq!(engine.counts()[[0, 0]], 30.0);
        assert_eq!(engine.counts()[[2, 1]], 30.0);
        assert_eq!(engine.total(), 80.0);
        assert_eq!(engine.unweighted_n(), 80);
        assert_abs_diff_eq!(engine.column_percentages()[[0, 0]], 75.0, epsilon = 1e-12);
        assert_abs_diff_eq!(engine.column_percentages()[[2, 0]], 25.0, epsilon = 1e-12);
        assert_eq!(engine.column_percentages()[[1, 1]], 0.0);
    }

    #[test]
    fn test_column_percentages_sum_to_hundred() {
        let store = opinion_by_gender();
        let engine = CrosstabEngine::new(&store, &fixtures::agreement("OPINION", 0), &gender(1)).unwrap();
        for column in engine.column_percentages().columns() {
            assert_abs_diff_eq!(column.sum(), 100.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_index_and_marginal_rows() {
        let store = opinion_by_gender();
        let engine = CrosstabEngine::new(&store, &fixtures::agreement("OPINION", 0), &gender(1)).unwrap();
        assert_eq!(engine.index_row(), &[150, 50]);
        assert_eq!(engine.marginal_percentages(), &[0.5, 0.5]);
    }

    #[test]
    fn test_chi_square_statistics() {
        let store = opinion_by_gender();
        let engine = CrosstabEngine::new(&store, &fixtures::agreement("OPINION", 0), &gender(1)).unwrap();
        let chi = engine.chi_square();
        // expected 20 in every filled cell: 4 × 10² / 20
        assert_abs_diff_eq!(chi.chi_square, 20.0, epsilon = 1e-9);
        // the empty Neutral row still counts toward the dimensions
        assert_eq!(chi.degrees_of_freedom, 2);
        assert_eq!(chi.significance, Significance::Significant01);
        assert!(chi.p_value < 0.01);
        assert_abs_diff_eq!(chi.phi, 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(chi.contingency_coefficient, (20.0_f64 / 100.0).sqrt(), epsilon = 1e-12);
        assert_abs_diff_eq!(chi.cramers_v, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_empty_row_keeps_table_dimensions() {
        // North all agree, South all disagree, West split; nobody answers Neutral
        let mut rows = fixtures::repeat(vec![1, 1], 20);
        rows.extend(fixtures::repeat(vec![3, 2], 20));
        rows.extend(fixtures::repeat(vec![1, 3], 10));
        rows.extend(fixtures::repeat(vec![3, 3], 10));
        let store = fixtures::store(&["OPINION", "REGION"], &rows);
        let region = fixtures::question(
            "REGION",
            1,
            &[(1, "North", Neutral), (2, "South", Neutral), (3, "West", Neutral)],
        );
        let engine = CrosstabEngine::new(&store, &fixtures::agreement("OPINION", 0), &region).unwrap();
        assert_eq!(engine.row_sums()[1], 0.0);

        let chi = engine.chi_square();
        // expected 10 in every filled cell: 4 × 10² / 10
        assert_abs_diff_eq!(chi.chi_square, 40.0, epsilon = 1e-9);
        assert_eq!(chi.degrees_of_freedom, 4);
        assert_eq!(chi.significance, Significance::Significant01);
        assert_abs_diff_eq!(chi.phi, (40.0_f64 / 60.0).sqrt(), epsilon = 1e-12);
        assert_abs_diff_eq!(chi.cramers_v, (40.0_f64 / 120.0).sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_from_items() {
        let items = [
            CrosstabItem::new(1, 1),
            CrosstabItem::new(3, 2),
            CrosstabItem {
                simulation_weight: 2.0,
                ..CrosstabItem::new(1, 2)
            },
            CrosstabItem::new(9, 1),
        ];
        assert_eq!(items[2].weight(), 2.0);
        let engine = CrosstabEngine::from_items(
            &fixtures::agreement("OPINION", 0),
            &gender(1),
            &items,
            &AnalysisConfig::default(),
        )
        .unwrap();
        assert_eq!(engine.counts()[[0, 0]], 1.0);
        assert_eq!(engine.counts()[[0, 1]], 2.0);
        assert_eq!(engine.counts()[[2, 1]], 1.0);
        assert_eq!(engine.total(), 4.0);
        // the out-of-scale answer is not counted
        assert_eq!(engine.unweighted_n(), 3);
        assert_eq!(engine.index_row(), &[200, 133]);
    }

    #[test]
    fn test_independent_table_not_significant() {
        let mut rows = fixtures::repeat(vec![1, 1], 10);
        rows.extend(fixtures::repeat(vec![3, 1], 10));
        rows.extend(fixtures::repeat(vec![1, 2], 10));
        rows.extend(fixtures::repeat(vec![3, 2], 10));
        let store = fixtures::store(&["OPINION", "GENDER"], &rows);
        let engine = CrosstabEngine::new(&store, &fixtures::agreement("OPINION", 0), &gender(1)).unwrap();
        assert_abs_diff_eq!(engine.chi_square().chi_square, 0.0, epsilon = 1e-12);
        assert_eq!(engine.chi_square().significance, Significance::NotSignificant);
    }

    #[test]
    fn test_profile_percentages_are_lift_over_marginal() {
        let store = opinion_by_gender();
        let engine = CrosstabEngine::new(&store, &fixtures::agreement("OPINION", 0), &gender(1)).unwrap();
        let lift = engine.profile_percentages(1).unwrap();
        assert_abs_diff_eq!(lift[0], 0.25, epsilon = 1e-12);
        assert_abs_diff_eq!(lift[1], -0.25, epsilon = 1e-12);
        // empty row: share is 0
        let lift = engine.profile_percentages(2).unwrap();
        assert_abs_diff_eq!(lift[0], -0.5, epsilon = 1e-12);
        assert!(engine.profile_percentages(7).is_err());
    }

    #[test]
    fn test_unknown_and_missing_values_excluded() {
        let store = fixtures::store(
            &["OPINION", "GENDER"],
            &[vec![1, 1], vec![9, 1], vec![1, 5], vec![2, 2]],
        );
        let dv = fixtures::agreement("OPINION", 0).with_missing_values(&[2]).unwrap();
        let engine = CrosstabEngine::new(&store, &dv, &gender(1)).unwrap();
        assert_eq!(engine.row_values(), &[1, 3]);
        assert_eq!(engine.total(), 1.0);
    }

    #[test]
    fn test_weights_flow_into_cells() {
        let mut store = opinion_by_gender();
        let mut weighting = gender(1);
        weighting.responses[1].weight = 2.0;
        store.apply_simulation_weights(&weighting).unwrap();
        let engine = CrosstabEngine::new(&store, &fixtures::agreement("OPINION", 0), &gender(1)).unwrap();
        assert_eq!(engine.total(), 120.0);
        assert_eq!(engine.unweighted_n(), 80);
        assert_abs_diff_eq!(engine.marginal_percentages()[1], 80.0 / 120.0, epsilon = 1e-12);
    }

    #[test]
    fn test_empty_data_resolves_to_zero() {
        let store = fixtures::store(&["OPINION", "GENDER"], &[]);
        let engine = CrosstabEngine::new(&store, &fixtures::agreement("OPINION", 0), &gender(1)).unwrap();
        assert_eq!(engine.total(), 0.0);
        assert_eq!(engine.marginal_percentages(), &[0.0, 0.0]);
        assert_eq!(engine.chi_square().cramers_v, 0.0);
        assert_eq!(engine.index_row(), &[100, 100]);
    }

    #[test]
    fn test_table_object() {
        let store = opinion_by_gender();
        let engine = CrosstabEngine::new(&store, &fixtures::agreement("OPINION", 0), &gender(1)).unwrap();
        let table = engine.table();
        assert_eq!(table.column_labels, vec!["Male", "Female"]);
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.rows[0].label, "Agree");
        assert_eq!(table.totals, vec![40.0, 40.0]);
    }
}
