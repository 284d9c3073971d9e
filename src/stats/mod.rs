//! Per-question descriptive statistics: frequencies, percents, cumulative percents,
//! sampling error and the total index.

use crate::catalog::{Classification, Question, QuestionCatalog};
use crate::config::AnalysisConfig;
use crate::store::TabularResponseStore;
use rayon::prelude::*;
use tracing::debug;

/// Tallies the weighted frequency of every response over the store's active rows and sets
/// `total_n`. Returns the unweighted number of respondents with a non-missing answer.
///
/// Every respondent contributes `simulation weight × static weight` to the response they
/// chose. Missing-coded responses still receive their frequency but do not count toward
/// `total_n`, which is the rounded weighted sum when any weighting is enabled and the raw
/// respondent count otherwise.
pub fn compute_frequencies(
    question: &mut Question,
    store: &TabularResponseStore,
) -> anyhow::Result<usize> {
    store.check_column(question)?;
    question.responses.iter_mut().for_each(|r| r.reset_statistics());

    let mut weighted_n = 0.0;
    let mut unweighted_n = 0usize;
    for &row in store.active_rows() {
        let Some(value) = store.value(row, question.column) else {
            continue;
        };
        let Some(position) = question.response_position(value) else {
            continue;
        };
        let weight = store.weight(row);
        question.responses[position].frequency += weight;
        if !question.is_missing(value) {
            weighted_n += weight;
            unweighted_n += 1;
        }
    }

    question.total_n = if store.is_weighted() {
        weighted_n.round()
    } else {
        unweighted_n as f64
    };
    Ok(unweighted_n)
}

pub fn compute_derived_stats(question: &mut Question, unweighted_n: usize) {
    compute_derived_stats_with(question, unweighted_n, &AnalysisConfig::default());
}

/// Fills percent, cumulative percent, inverse cumulative percent and sampling error for
/// every non-missing response, then `total_index`.
///
/// The inverse cumulative percent of a response is the running total before that
/// response's own percent is subtracted, so the first valid response always gets 1.
pub fn compute_derived_stats_with(
    question: &mut Question,
    unweighted_n: usize,
    config: &AnalysisConfig,
) {
    let total_n = question.total_n;
    let n = unweighted_n as f64;
    let missing = &question.missing_values;

    let mut cumulative = 0.0;
    let mut inverse = 1.0;
    let mut positive = 0.0;
    let mut negative = 0.0;

    for response in question.responses.iter_mut() {
        if missing.contains(&response.value) {
            continue;
        }
        response.percent = if total_n > 0.0 {
            response.frequency / total_n
        } else {
            0.0
        };
        cumulative += response.percent;
        response.cum_percent = cumulative;
        response.inverse_cum_percent = inverse;
        inverse -= response.percent;

        response.sampling_error = if unweighted_n > 0 {
            let unweighted_percent = response.frequency / n * 100.0;
            let variance = unweighted_percent * (100.0 - unweighted_percent) / n;
            variance.max(0.0).sqrt() * config.confidence_z
        } else {
            0.0
        };

        match response.classification {
            Classification::Positive => positive += response.percent * 100.0,
            Classification::Negative => negative += response.percent * 100.0,
            _ => {}
        }
    }

    question.total_index = (positive - negative + 100.0).round() as i64;
}

/// Frequencies followed by derived statistics. Returns the unweighted N.
pub fn compute_question_statistics(
    question: &mut Question,
    store: &TabularResponseStore,
) -> anyhow::Result<usize> {
    compute_question_statistics_with(question, store, &AnalysisConfig::default())
}

pub fn compute_question_statistics_with(
    question: &mut Question,
    store: &TabularResponseStore,
    config: &AnalysisConfig,
) -> anyhow::Result<usize> {
    let unweighted_n = compute_frequencies(question, store)?;
    compute_derived_stats_with(question, unweighted_n, config);
    Ok(unweighted_n)
}

/// Computes statistics for every question of the catalog. Questions are independent, so
/// they are processed in parallel against the shared read-only store.
pub fn compute_catalog_statistics(
    catalog: &mut QuestionCatalog,
    store: &TabularResponseStore,
    config: &AnalysisConfig,
) -> anyhow::Result<()> {
    let questions = catalog.questions_mut();
    let count = questions.len();
    questions
        .par_iter_mut()
        .try_for_each(|question| {
            compute_question_statistics_with(question, store, config).map(|_| ())
        })?;
    debug!(questions = count, active = store.active_rows().len(), "catalog statistics computed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Classification::*, QuestionCatalog};
    use crate::fixtures;
    use approx::assert_abs_diff_eq;

    fn three_point() -> Question {
        fixtures::question(
            "Q1",
            0,
            &[(5, "Great", Positive), (4, "Good", Positive), (3, "Fair", Neutral)],
        )
    }

    fn hundred_respondents() -> TabularResponseStore {
        let mut rows = fixtures::repeat(vec![5], 40);
        rows.extend(fixtures::repeat(vec![4], 35));
        rows.extend(fixtures::repeat(vec![3], 25));
        fixtures::store(&["Q1"], &rows)
    }

    #[test]
    fn test_frequencies_percents_and_index() {
        let store = hundred_respondents();
        let mut question = three_point();
        let n = compute_question_statistics(&mut question, &store).unwrap();

        assert_eq!(n, 100);
        assert_eq!(question.total_n, 100.0);
        let percents: Vec<f64> = question.responses.iter().map(|r| r.percent).collect();
        let cumulative: Vec<f64> = question.responses.iter().map(|r| r.cum_percent).collect();
        for (actual, expected) in percents.iter().zip([0.40, 0.35, 0.25]) {
            assert_abs_diff_eq!(*actual, expected, epsilon = 1e-12);
        }
        for (actual, expected) in cumulative.iter().zip([0.40, 0.75, 1.00]) {
            assert_abs_diff_eq!(*actual, expected, epsilon = 1e-12);
        }
        assert_eq!(question.total_index, 175);
    }

    #[test]
    fn test_inverse_cumulative_stored_before_subtraction() {
        let store = hundred_respondents();
        let mut question = three_point();
        compute_question_statistics(&mut question, &store).unwrap();
        let inverse: Vec<f64> = question
            .responses
            .iter()
            .map(|r| r.inverse_cum_percent)
            .collect();
        for (actual, expected) in inverse.iter().zip([1.0, 0.60, 0.25]) {
            assert_abs_diff_eq!(*actual, expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_sampling_error_uses_unweighted_percent() {
        let store = hundred_respondents();
        let mut question = three_point();
        compute_question_statistics(&mut question, &store).unwrap();
        let expected = (40.0_f64 * 60.0 / 100.0).sqrt() * 1.96;
        assert_abs_diff_eq!(question.responses[0].sampling_error, expected, epsilon = 1e-12);
    }

    #[test]
    fn test_balanced_index_is_one_hundred() {
        let store = fixtures::store(&["Q1"], &[vec![1], vec![2], vec![3]]);
        let mut question = fixtures::agreement("Q1", 0);
        compute_question_statistics(&mut question, &store).unwrap();
        for response in &question.responses {
            assert_abs_diff_eq!(response.percent, 1.0 / 3.0, epsilon = 1e-12);
        }
        assert_eq!(question.total_index, 100);
    }

    #[test]
    fn test_index_extremes() {
        let mut question = fixtures::agreement("Q1", 0);
        compute_question_statistics(&mut question, &fixtures::store(&["Q1"], &[vec![1], vec![1]]))
            .unwrap();
        assert_eq!(question.total_index, 200);
        compute_question_statistics(&mut question, &fixtures::store(&["Q1"], &[vec![3], vec![3]]))
            .unwrap();
        assert_eq!(question.total_index, 0);
    }

    #[test]
    fn test_missing_codes_keep_frequency_but_not_percent() {
        let store = fixtures::store(&["Q1"], &[vec![1], vec![1], vec![3], vec![9]]);
        let mut question = fixtures::question(
            "Q1",
            0,
            &[(1, "Yes", Positive), (3, "No", Negative), (9, "Refused", None)],
        )
        .with_missing_values(&[9])
        .unwrap();
        compute_question_statistics(&mut question, &store).unwrap();

        assert_eq!(question.total_n, 3.0);
        assert_eq!(question.responses[2].frequency, 1.0);
        assert_eq!(question.responses[2].percent, 0.0);
        assert_abs_diff_eq!(question.responses[1].cum_percent, 1.0, epsilon = 1e-12);
        assert_eq!(question.total_index, 133);
    }

    #[test]
    fn test_zero_n_guards() {
        let store = fixtures::store(&["Q1"], &[]);
        let mut question = fixtures::agreement("Q1", 0);
        let n = compute_question_statistics(&mut question, &store).unwrap();
        assert_eq!(n, 0);
        assert!(question.responses.iter().all(|r| r.percent == 0.0 && r.sampling_error == 0.0));
        assert_eq!(question.total_index, 100);
    }

    #[test]
    fn test_weighted_total_n_is_rounded_sum() {
        let mut store = fixtures::store(&["Q1"], &[vec![1], vec![2], vec![3]]);
        let mut weighting = fixtures::agreement("Q1", 0);
        weighting.responses[0].weight = 2.4;
        store.apply_simulation_weights(&weighting).unwrap();

        let mut question = fixtures::agreement("Q1", 0);
        let n = compute_question_statistics(&mut question, &store).unwrap();
        assert_eq!(n, 3);
        assert_eq!(question.total_n, 4.0);
        assert_abs_diff_eq!(question.responses[0].frequency, 2.4, epsilon = 1e-12);
        assert_abs_diff_eq!(question.responses[0].percent, 0.6, epsilon = 1e-12);
    }

    #[test]
    fn test_active_view_respected() {
        let mut store = fixtures::store(&["Q1", "Q2"], &[vec![1, 1], vec![2, 1], vec![3, 2]]);
        store.set_select_on(&fixtures::agreement("Q2", 1), &[1]).unwrap();
        let mut question = fixtures::agreement("Q1", 0);
        assert_eq!(compute_question_statistics(&mut question, &store).unwrap(), 2);
        assert_eq!(question.responses[2].frequency, 0.0);
    }

    #[test]
    fn test_column_out_of_range() {
        let store = fixtures::store(&["Q1"], &[vec![1]]);
        let mut question = fixtures::agreement("Q9", 4);
        assert!(compute_frequencies(&mut question, &store).is_err());
    }

    #[test]
    fn test_catalog_statistics_in_parallel() {
        let store = fixtures::store(&["A", "B"], &[vec![1, 3], vec![1, 3], vec![2, 3]]);
        let mut catalog =
            QuestionCatalog::new(vec![fixtures::agreement("A", 0), fixtures::agreement("B", 1)])
                .unwrap();
        compute_catalog_statistics(&mut catalog, &store, &AnalysisConfig::default()).unwrap();
        assert_eq!(catalog.get("A").unwrap().total_index, 167);
        assert_eq!(catalog.get("B").unwrap().total_index, 0);
    }
}
