//! Analysis engines.
//!
//! Every engine computes its results in its constructor from a read-only store and the
//! question definitions it is given, and exposes them through accessors afterwards.

pub mod anova;
pub mod blocks;
pub mod correlation;
pub mod crosstab;
pub mod index;
pub mod preference;
pub mod profile;

pub use anova::{AnovaEngine, AnovaGroup};
pub use blocks::{
    OneResponseItem, SingleResponseEngine, StatSigItem, TargetBlockEngine, TwoBlockEngine,
    TwoBlockIndex,
};
pub use correlation::{CorrelationEngine, CorrelationSummary, VariableSummary};
pub use crosstab::{ChiSquareSummary, CrosstabEngine, CrosstabItem, CrosstabRow, CrosstabTable};
pub use index::{IndexEngine, IndexItem, IndexPlusEngine, IndexPlusItem};
pub use preference::{PreferenceBreakdown, PreferenceEngine, PreferenceMatrix, PreferenceScore};
pub use profile::{ProfileEngine, ProfileItem};
