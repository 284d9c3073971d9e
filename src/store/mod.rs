//! Respondent-level answer data.
//!
//! The store keeps the raw rows as text, exactly as the import collaborator delivered them,
//! plus two derived per-row columns: the simulation weight and (while Select Plus is
//! configured) the movement classification. The set of rows that analyses see is cached in
//! an active view that is recomputed eagerly whenever a filter changes.

use crate::catalog::{Question, RespValue};
use crate::config::AnalysisConfig;
use crate::error::SurveyError;
use tracing::debug;

pub mod movement;

pub use movement::{Movement, classify_movement};

/// Value-set filter: keep respondents whose answer to `question` is one of `values`.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectOn {
    pub question: String,
    pub column: usize,
    pub values: Vec<RespValue>,
}

/// Transition filter: keep respondents whose movement between two questions equals `condition`.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectPlus {
    pub first: String,
    pub second: String,
    pub condition: Movement,
}

#[derive(Debug, Clone)]
pub struct TabularResponseStore {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
    missing_values: Vec<String>,
    simulation_weights: Vec<f64>,
    simulation_weighting: bool,
    static_weight_column: Option<usize>,
    static_weight_header: String,
    static_weighting: bool,
    movements: Vec<Movement>,
    select_on: Option<SelectOn>,
    select_on_enabled: bool,
    select_plus: Option<SelectPlus>,
    select_plus_enabled: bool,
    active: Vec<usize>,
}

impl TabularResponseStore {
    /// Builds a store from a header of question codes and one row of fields per respondent.
    /// `missing_values` lists field texts that mean "no answer".
    pub fn new(
        header: Vec<String>,
        rows: Vec<Vec<String>>,
        missing_values: Vec<String>,
    ) -> anyhow::Result<Self> {
        Self::with_config(header, rows, missing_values, &AnalysisConfig::default())
    }

    pub fn with_config(
        header: Vec<String>,
        rows: Vec<Vec<String>>,
        missing_values: Vec<String>,
        config: &AnalysisConfig,
    ) -> anyhow::Result<Self> {
        config.validate()?;
        for (index, row) in rows.iter().enumerate() {
            if row.len() != header.len() {
                return Err(SurveyError::RowLength {
                    row: index,
                    found: row.len(),
                    expected: header.len(),
                }
                .into());
            }
        }

        let static_weight_column = header
            .iter()
            .position(|h| h.trim() == config.static_weight_header);
        let n_rows = rows.len();

        let mut store = TabularResponseStore {
            header,
            rows,
            missing_values: missing_values.into_iter().map(|m| m.trim().to_string()).collect(),
            simulation_weights: vec![1.0; n_rows],
            simulation_weighting: false,
            static_weight_column,
            static_weight_header: config.static_weight_header.clone(),
            static_weighting: false,
            movements: Vec::new(),
            select_on: None,
            select_on_enabled: false,
            select_plus: None,
            select_plus_enabled: false,
            active: Vec::new(),
        };
        store.refresh_active();
        Ok(store)
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn missing_values(&self) -> &[String] {
        &self.missing_values
    }

    pub fn width(&self) -> usize {
        self.header.len()
    }

    /// Number of respondents, ignoring filters.
    pub fn respondent_count(&self) -> usize {
        self.rows.len()
    }

    /// Row indices currently passing every enabled filter, in data order.
    pub fn active_rows(&self) -> &[usize] {
        &self.active
    }

    pub fn column_of(&self, code: &str) -> Option<usize> {
        self.header.iter().position(|h| h == code)
    }

    pub fn field(&self, row: usize, column: usize) -> Option<&str> {
        self.rows.get(row)?.get(column).map(String::as_str)
    }

    /// True when the field holds an answer, i.e. is neither blank nor a store-level missing token.
    pub fn is_present(&self, row: usize, column: usize) -> bool {
        match self.field(row, column) {
            Some(text) => {
                let text = text.trim();
                !text.is_empty() && !self.missing_values.iter().any(|m| m == text)
            }
            None => false,
        }
    }

    /// Parsed answer of respondent `row` in `column`, or `None` when absent or non-numeric.
    pub fn value(&self, row: usize, column: usize) -> Option<RespValue> {
        if !self.is_present(row, column) {
            return None;
        }
        let text = self.field(row, column)?.trim();
        if let Ok(value) = text.parse::<RespValue>() {
            return Some(value);
        }
        match text.parse::<f64>() {
            Ok(value) if value.fract() == 0.0 && value.abs() <= RespValue::MAX as f64 => {
                Some(value as RespValue)
            }
            _ => None,
        }
    }

    pub fn check_column(&self, question: &Question) -> anyhow::Result<()> {
        if question.column >= self.width() {
            return Err(SurveyError::ColumnOutOfRange {
                question: question.code.clone(),
                column: question.column,
                width: self.width(),
            }
            .into());
        }
        Ok(())
    }

    /// Active respondents who answered `column`.
    pub fn case_count(&self, column: usize) -> usize {
        self.active
            .iter()
            .filter(|&&row| self.is_present(row, column))
            .count()
    }

    /// Active rows further narrowed to respondents whose answer in `column` is in `values`.
    pub fn restricted_rows(&self, column: usize, values: &[RespValue]) -> Vec<usize> {
        self.active
            .iter()
            .copied()
            .filter(|&row| self.value(row, column).is_some_and(|v| values.contains(&v)))
            .collect()
    }

    // ---- weighting ----

    pub fn has_static_weight_column(&self) -> bool {
        self.static_weight_column.is_some()
    }

    pub fn set_static_weighting(&mut self, enabled: bool) -> anyhow::Result<()> {
        if enabled && self.static_weight_column.is_none() {
            return Err(SurveyError::NoStaticWeightColumn(self.static_weight_header.clone()).into());
        }
        self.static_weighting = enabled;
        Ok(())
    }

    /// Recomputes the simulation weight column from the per-response weights of `question`.
    /// Respondents without a recognised answer keep weight 1.
    pub fn apply_simulation_weights(&mut self, question: &Question) -> anyhow::Result<()> {
        self.check_column(question)?;
        let weights: Vec<f64> = (0..self.rows.len())
            .map(|row| {
                self.value(row, question.column)
                    .and_then(|value| question.response(value))
                    .map(|response| response.weight)
                    .unwrap_or(1.0)
            })
            .collect();
        self.simulation_weights = weights;
        self.simulation_weighting = true;
        debug!(question = %question.code, rows = self.rows.len(), "simulation weights applied");
        Ok(())
    }

    pub fn clear_simulation_weights(&mut self) {
        self.simulation_weights.iter_mut().for_each(|w| *w = 1.0);
        self.simulation_weighting = false;
    }

    pub fn is_simulation_weighted(&self) -> bool {
        self.simulation_weighting
    }

    pub fn is_static_weighted(&self) -> bool {
        self.static_weighting
    }

    pub fn is_weighted(&self) -> bool {
        self.simulation_weighting || self.static_weighting
    }

    pub fn simulation_weight(&self, row: usize) -> f64 {
        if !self.simulation_weighting {
            return 1.0;
        }
        self.simulation_weights.get(row).copied().unwrap_or(1.0)
    }

    /// Value of the static weight column; unparsable fields count as 1.
    pub fn static_weight(&self, row: usize) -> f64 {
        if !self.static_weighting {
            return 1.0;
        }
        self.static_weight_column
            .and_then(|column| self.field(row, column))
            .and_then(|text| text.trim().parse::<f64>().ok())
            .unwrap_or(1.0)
    }

    /// Effective weight of a respondent: simulation weight times static weight.
    pub fn weight(&self, row: usize) -> f64 {
        self.simulation_weight(row) * self.static_weight(row)
    }

    // ---- filters ----

    /// Configures and enables the Select On filter.
    pub fn set_select_on(&mut self, question: &Question, values: &[RespValue]) -> anyhow::Result<()> {
        self.check_column(question)?;
        if values.is_empty() {
            return Err(SurveyError::MissingInput("select-on response values").into());
        }
        for &value in values {
            question.response_or_err(value)?;
        }
        self.select_on = Some(SelectOn {
            question: question.code.clone(),
            column: question.column,
            values: values.to_vec(),
        });
        self.select_on_enabled = true;
        self.refresh_active();
        Ok(())
    }

    pub fn set_select_on_enabled(&mut self, enabled: bool) -> anyhow::Result<()> {
        if enabled && self.select_on.is_none() {
            return Err(SurveyError::MissingInput("select-on question").into());
        }
        self.select_on_enabled = enabled;
        self.refresh_active();
        Ok(())
    }

    pub fn clear_select_on(&mut self) {
        self.select_on = None;
        self.select_on_enabled = false;
        self.refresh_active();
    }

    pub fn select_on(&self) -> Option<&SelectOn> {
        self.select_on.as_ref()
    }

    pub fn is_select_on_active(&self) -> bool {
        self.select_on_enabled && self.select_on.is_some()
    }

    /// Configures and enables the Select Plus filter, deriving the movement column from the
    /// index classification of each respondent's answers to `first` and `second`.
    pub fn set_select_plus(
        &mut self,
        first: &Question,
        second: &Question,
        condition: Movement,
    ) -> anyhow::Result<()> {
        self.check_column(first)?;
        self.check_column(second)?;
        self.movements = self.compute_movements(first, second);
        self.select_plus = Some(SelectPlus {
            first: first.code.clone(),
            second: second.code.clone(),
            condition,
        });
        self.select_plus_enabled = true;
        self.refresh_active();
        Ok(())
    }

    pub fn set_select_plus_enabled(&mut self, enabled: bool) -> anyhow::Result<()> {
        if enabled && self.select_plus.is_none() {
            return Err(SurveyError::MissingInput("select-plus questions").into());
        }
        self.select_plus_enabled = enabled;
        self.refresh_active();
        Ok(())
    }

    pub fn clear_select_plus(&mut self) {
        self.select_plus = None;
        self.select_plus_enabled = false;
        self.movements.clear();
        self.refresh_active();
    }

    pub fn select_plus(&self) -> Option<&SelectPlus> {
        self.select_plus.as_ref()
    }

    pub fn is_select_plus_active(&self) -> bool {
        self.select_plus_enabled && self.select_plus.is_some()
    }

    /// Movement column, present only while Select Plus is configured.
    pub fn movements(&self) -> &[Movement] {
        &self.movements
    }

    pub fn compute_movements(&self, first: &Question, second: &Question) -> Vec<Movement> {
        (0..self.rows.len())
            .map(|row| {
                let from = self
                    .value(row, first.column)
                    .map(|v| first.classify(v))
                    .unwrap_or_default();
                let to = self
                    .value(row, second.column)
                    .map(|v| second.classify(v))
                    .unwrap_or_default();
                classify_movement(from, to)
            })
            .collect()
    }

    fn row_passes(&self, row: usize) -> bool {
        if self.select_on_enabled {
            if let Some(select) = &self.select_on {
                let selected = self
                    .value(row, select.column)
                    .is_some_and(|v| select.values.contains(&v));
                if !selected {
                    return false;
                }
            }
        }
        if self.select_plus_enabled {
            if let Some(select) = &self.select_plus {
                let movement = self.movements.get(row).copied().unwrap_or_default();
                if movement != select.condition {
                    return false;
                }
            }
        }
        true
    }

    fn refresh_active(&mut self) {
        self.active = (0..self.rows.len()).filter(|&row| self.row_passes(row)).collect();
        debug!(
            active = self.active.len(),
            total = self.rows.len(),
            select_on = self.is_select_on_active(),
            select_plus = self.is_select_plus_active(),
            "active view recomputed"
        );
    }
}
