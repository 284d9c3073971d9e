use crate::catalog::Classification;
use serde::{Deserialize, Serialize};

/// Change in index classification between a respondent's answers to two questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Movement {
    #[default]
    None,
    StaysPositive,
    StaysNeutral,
    StaysNegative,
    GoesPositive,
    GoesNegative,
}

fn rank(classification: Classification) -> Option<i8> {
    match classification {
        Classification::Negative => Some(-1),
        Classification::Neutral => Some(0),
        Classification::Positive => Some(1),
        Classification::None => None,
    }
}

pub fn classify_movement(first: Classification, second: Classification) -> Movement {
    let (Some(from), Some(to)) = (rank(first), rank(second)) else {
        return Movement::None;
    };
    match (from, to) {
        (1, 1) => Movement::StaysPositive,
        (0, 0) => Movement::StaysNeutral,
        (-1, -1) => Movement::StaysNegative,
        (from, to) if to > from => Movement::GoesPositive,
        _ => Movement::GoesNegative,
    }
}
