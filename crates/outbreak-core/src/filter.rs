//! Non-infectious-cause filtering of candidate clusters.
//!
//! Eosinophilia also follows allergy, drug reactions and some malignancies.
//! A filter removes cases explained by such causes before a cluster is
//! validated; the engine re-checks the minimum cluster size afterwards.

use crate::model::PositiveCase;

/// Removes cases whose eosinophilia has a known non-parasitic explanation
pub trait CaseFilter: Send + Sync {
    fn filter(&self, cluster: Vec<PositiveCase>) -> Vec<PositiveCase>;

    /// Short label used in logs
    fn name(&self) -> &'static str {
        "custom"
    }
}

/// Keeps every case. No exclusion criteria are defined yet.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThroughFilter;

impl CaseFilter for PassThroughFilter {
    fn filter(&self, cluster: Vec<PositiveCase>) -> Vec<PositiveCase> {
        cluster
    }

    fn name(&self) -> &'static str {
        "pass-through"
    }
}
