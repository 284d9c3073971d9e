//! Checks that surveys can be combined before any data is copied.

use crate::catalog::Question;
use crate::catalog::block::compare_structure;
use crate::error::SurveyError;
use crate::pool::SurveySelection;

/// Select On and Select Plus must each be active on every survey or on none.
pub fn validate_filter_consistency(selections: &[SurveySelection<'_>]) -> anyhow::Result<()> {
    let total = selections.len();
    let select_on = selections
        .iter()
        .filter(|s| s.store.is_select_on_active())
        .count();
    let select_plus = selections
        .iter()
        .filter(|s| s.store.is_select_plus_active())
        .count();
    for (filter, active) in [("Select On", select_on), ("Select Plus", select_plus)] {
        if active != 0 && active != total {
            return Err(SurveyError::FilterInconsistent {
                filter,
                inconsistent: active,
                total,
            }
            .into());
        }
    }
    Ok(())
}

fn compare_role<'a>(
    role: &str,
    selections: &'a [SurveySelection<'a>],
    pick: impl Fn(&SurveySelection<'a>) -> Option<&'a Question>,
) -> anyhow::Result<()> {
    let mut reference: Option<(&str, &Question)> = None;
    for selection in selections {
        let Some(question) = pick(selection) else {
            continue;
        };
        match reference {
            None => reference = Some((selection.name, question)),
            Some((reference_survey, reference_question)) => {
                compare_structure(reference_question, question).map_err(|mismatch| {
                    SurveyError::StructureMismatch(format!(
                        "{role} '{}' in survey '{}' does not match {role} '{}' in survey '{}': {}",
                        question.code,
                        selection.name,
                        reference_question.code,
                        reference_survey,
                        mismatch.message
                    ))
                })?;
            }
        }
    }
    Ok(())
}

/// Every selected DV must share the first survey's response count and per-position
/// classifications, and likewise every selected IV.
pub fn validate_structures(selections: &[SurveySelection<'_>]) -> anyhow::Result<()> {
    compare_role("DV", selections, |s| Some(s.dv))?;
    compare_role("IV", selections, |s| s.iv)
}
