//! Question and response metadata.
//!
//! A [`Question`] owns its ordered response scale and points at a column of the
//! [`TabularResponseStore`](crate::store::TabularResponseStore). Computed fields
//! (frequencies, percents, `total_n`, `total_index`) are filled in by [`crate::stats`].

use crate::error::SurveyError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub mod block;

/// Ordinal code of a response as it appears in the data.
pub type RespValue = i32;

/// Maximum number of missing-value codes a question may declare.
pub const MAX_MISSING_CODES: usize = 3;

/// Index classification of a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Classification {
    #[default]
    None,
    Neutral,
    Positive,
    Negative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VariableType {
    Independent,
    Dependent,
    #[default]
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DataType {
    #[default]
    Nominal,
    Interval,
    Both,
}

impl DataType {
    pub fn is_interval(self) -> bool {
        matches!(self, DataType::Interval | DataType::Both)
    }

    pub fn is_nominal(self) -> bool {
        matches!(self, DataType::Nominal | DataType::Both)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BlockStatus {
    FirstQuestionInBlock,
    ContinuationQuestion,
    DiscreetQuestion,
    #[default]
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub value: RespValue,
    pub label: String,
    pub classification: Classification,
    /// Simulation weight applied to respondents giving this answer.
    pub weight: f64,
    pub frequency: f64,
    pub percent: f64,
    pub cum_percent: f64,
    pub inverse_cum_percent: f64,
    pub sampling_error: f64,
}

impl Response {
    pub fn new(value: RespValue, label: impl Into<String>, classification: Classification) -> Self {
        Response {
            value,
            label: label.into(),
            classification,
            weight: 1.0,
            frequency: 0.0,
            percent: 0.0,
            cum_percent: 0.0,
            inverse_cum_percent: 0.0,
            sampling_error: 0.0,
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub(crate) fn reset_statistics(&mut self) {
        self.frequency = 0.0;
        self.percent = 0.0;
        self.cum_percent = 0.0;
        self.inverse_cum_percent = 0.0;
        self.sampling_error = 0.0;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub code: String,
    pub label: String,
    /// Column of this question in the tabular store.
    pub column: usize,
    pub responses: Vec<Response>,
    pub missing_values: Vec<RespValue>,
    pub variable_type: VariableType,
    pub data_type: DataType,
    pub block_status: BlockStatus,
    pub block_label: Option<String>,
    pub block_stem: Option<String>,
    pub preference_block: bool,
    pub preference_items: usize,
    pub total_n: f64,
    pub total_index: i64,
}

impl Question {
    pub fn new(code: impl Into<String>, column: usize, responses: Vec<Response>) -> Self {
        let code = code.into();
        Question {
            label: code.clone(),
            code,
            column,
            responses,
            missing_values: Vec::new(),
            variable_type: VariableType::None,
            data_type: DataType::Nominal,
            block_status: BlockStatus::None,
            block_label: None,
            block_stem: None,
            preference_block: false,
            preference_items: 0,
            total_n: 0.0,
            total_index: 0,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_block_status(mut self, status: BlockStatus) -> Self {
        self.block_status = status;
        self
    }

    pub fn with_block_label(mut self, label: impl Into<String>, stem: impl Into<String>) -> Self {
        self.block_label = Some(label.into());
        self.block_stem = Some(stem.into());
        self
    }

    pub fn with_data_type(mut self, data_type: DataType) -> Self {
        self.data_type = data_type;
        self
    }

    pub fn with_variable_type(mut self, variable_type: VariableType) -> Self {
        self.set_variable_type(variable_type);
        self
    }

    pub fn with_preference_items(mut self, items: usize) -> Self {
        self.preference_block = items > 0;
        self.preference_items = items;
        self
    }

    pub fn with_missing_values(mut self, codes: &[RespValue]) -> anyhow::Result<Self> {
        self.set_missing_values(codes)?;
        Ok(self)
    }

    pub fn set_missing_values(&mut self, codes: &[RespValue]) -> anyhow::Result<()> {
        if codes.len() > MAX_MISSING_CODES {
            return Err(SurveyError::TooManyMissingCodes {
                question: self.code.clone(),
                count: codes.len(),
            }
            .into());
        }
        self.missing_values = codes.to_vec();
        Ok(())
    }

    /// Sets the role of the question. Independent questions cannot carry unclassified
    /// responses, so any `None` classification is promoted to `Neutral`.
    pub fn set_variable_type(&mut self, variable_type: VariableType) {
        self.variable_type = variable_type;
        if variable_type == VariableType::Independent {
            for response in &mut self.responses {
                if response.classification == Classification::None {
                    response.classification = Classification::Neutral;
                }
            }
        }
    }

    pub fn is_missing(&self, value: RespValue) -> bool {
        self.missing_values.contains(&value)
    }

    pub fn response(&self, value: RespValue) -> Option<&Response> {
        self.responses.iter().find(|r| r.value == value)
    }

    pub fn response_position(&self, value: RespValue) -> Option<usize> {
        self.responses.iter().position(|r| r.value == value)
    }

    pub fn response_or_err(&self, value: RespValue) -> anyhow::Result<&Response> {
        self.response(value).ok_or_else(|| {
            SurveyError::ResponseNotFound {
                question: self.code.clone(),
                value,
            }
            .into()
        })
    }

    /// Responses that take part in percent and index math, in scale order.
    pub fn valid_responses(&self) -> impl Iterator<Item = &Response> {
        self.responses.iter().filter(|r| !self.is_missing(r.value))
    }

    /// Classification of the answer `value`, or `None` when it is missing or unknown.
    pub fn classify(&self, value: RespValue) -> Classification {
        if self.is_missing(value) {
            return Classification::None;
        }
        self.response(value)
            .map(|r| r.classification)
            .unwrap_or(Classification::None)
    }

    fn check_unique_values(&self) -> anyhow::Result<()> {
        let mut seen = HashSet::with_capacity(self.responses.len());
        for response in &self.responses {
            if !seen.insert(response.value) {
                return Err(SurveyError::DuplicateResponseValue {
                    question: self.code.clone(),
                    value: response.value,
                }
                .into());
            }
        }
        Ok(())
    }
}

/// Ordered list of questions in a survey.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestionCatalog {
    questions: Vec<Question>,
}

impl QuestionCatalog {
    pub fn new(mut questions: Vec<Question>) -> anyhow::Result<Self> {
        let mut codes = HashSet::with_capacity(questions.len());
        for question in &mut questions {
            if !codes.insert(question.code.clone()) {
                return Err(SurveyError::DuplicateQuestionCode(question.code.clone()).into());
            }
            question.check_unique_values()?;
            if question.missing_values.len() > MAX_MISSING_CODES {
                return Err(SurveyError::TooManyMissingCodes {
                    question: question.code.clone(),
                    count: question.missing_values.len(),
                }
                .into());
            }
            let variable_type = question.variable_type;
            question.set_variable_type(variable_type);
        }
        Ok(QuestionCatalog { questions })
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn questions_mut(&mut self) -> &mut [Question] {
        &mut self.questions
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn position(&self, code: &str) -> Option<usize> {
        self.questions.iter().position(|q| q.code == code)
    }

    pub fn get(&self, code: &str) -> anyhow::Result<&Question> {
        self.questions
            .iter()
            .find(|q| q.code == code)
            .ok_or_else(|| SurveyError::QuestionNotFound(code.to_string()).into())
    }

    /// The contiguous block containing `code`; empty for discreet questions.
    pub fn block_of(&self, code: &str) -> anyhow::Result<&[Question]> {
        let position = self
            .position(code)
            .ok_or_else(|| SurveyError::QuestionNotFound(code.to_string()))?;
        Ok(block::questions_in_block(position, &self.questions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scale() -> Vec<Response> {
        vec![
            Response::new(1, "Yes", Classification::Positive),
            Response::new(2, "No", Classification::Negative),
            Response::new(9, "Unsure", Classification::None),
        ]
    }

    #[test]
    fn test_independent_promotes_unclassified_responses() {
        let question = Question::new("Q1", 0, scale()).with_variable_type(VariableType::Independent);
        assert_eq!(question.responses[2].classification, Classification::Neutral);
        assert_eq!(question.responses[0].classification, Classification::Positive);
    }

    #[test]
    fn test_catalog_promotes_on_construction() {
        let mut question = Question::new("Q1", 0, scale());
        question.variable_type = VariableType::Independent;
        let catalog = QuestionCatalog::new(vec![question]).unwrap();
        assert!(
            catalog.questions()[0]
                .responses
                .iter()
                .all(|r| r.classification != Classification::None)
        );
    }

    #[test]
    fn test_duplicate_response_value_rejected() {
        let mut responses = scale();
        responses.push(Response::new(1, "Again", Classification::Neutral));
        let err = QuestionCatalog::new(vec![Question::new("Q1", 0, responses)]).unwrap_err();
        assert_eq!(
            err.downcast_ref::<SurveyError>(),
            Some(&SurveyError::DuplicateResponseValue {
                question: "Q1".to_string(),
                value: 1
            })
        );
    }

    #[test]
    fn test_duplicate_question_code_rejected() {
        let result = QuestionCatalog::new(vec![
            Question::new("Q1", 0, scale()),
            Question::new("Q1", 1, scale()),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_too_many_missing_codes() {
        let result = Question::new("Q1", 0, scale()).with_missing_values(&[7, 8, 9, 10]);
        assert!(result.is_err());
        let question = Question::new("Q1", 0, scale())
            .with_missing_values(&[9])
            .unwrap();
        assert!(question.is_missing(9));
        assert_eq!(question.valid_responses().count(), 2);
    }

    #[test]
    fn test_classify_missing_and_unknown() {
        let question = Question::new("Q1", 0, scale())
            .with_missing_values(&[2])
            .unwrap();
        assert_eq!(question.classify(1), Classification::Positive);
        assert_eq!(question.classify(2), Classification::None);
        assert_eq!(question.classify(42), Classification::None);
    }

    #[test]
    fn test_lookup_by_code() {
        let catalog = QuestionCatalog::new(vec![
            Question::new("A", 0, scale()),
            Question::new("B", 1, scale()),
        ])
        .unwrap();
        assert_eq!(catalog.get("B").unwrap().column, 1);
        assert_eq!(catalog.position("A"), Some(0));
        assert!(catalog.get("Z").is_err());
    }
}
