//! Statistical validation of municipality partitions.
//!
//! A partition is promoted to an outbreak candidate when the number of
//! positive cases per 1000 tests performed around its centroid exceeds
//! the regional baseline by more than `sigma_multiplier` standard
//! deviations:
//!
//! ```text
//! observed  = case_count / total_tests × 1000
//! threshold = expected_rate + sigma × rate_standard_deviation
//! promote   ⇔ observed > threshold
//! ```
//!
//! All arithmetic is f64 and nothing is rounded before the comparison.

use chrono::{DateTime, Datelike, Utc};
use std::time::Duration;
use tracing::{debug, warn};

use crate::aggregate::MunicipalityGroup;
use crate::config::ValidationConfig;
use crate::error::{with_timeout, OutbreakError};
use crate::geo::centroid;
use crate::model::{AnalysisWindow, RegionOutbreakCandidate, RegionalBaseline};
use crate::repository::CaseRepository;

/// Outbreak threshold for a baseline
pub fn outbreak_threshold(baseline: &RegionalBaseline, sigma_multiplier: f64) -> f64 {
    baseline.expected_rate_per_1000_tests + sigma_multiplier * baseline.rate_standard_deviation
}

/// Cases per 1000 tests, `None` when no tests were performed
pub fn observed_rate(case_count: usize, total_tests: u64) -> Option<f64> {
    if total_tests == 0 {
        return None;
    }
    Some((case_count as f64 / total_tests as f64) * 1000.0)
}

/// Strictly greater; a rate equal to the threshold is not an outbreak
pub fn exceeds_threshold(observed: f64, threshold: f64) -> bool {
    observed > threshold
}

/// Baseline period key ("YYYY-MM") for an analysis ending at `end`
pub fn baseline_month(end: DateTime<Utc>, lag_years: u32) -> String {
    let year = end.year() - lag_years as i32;
    format!("{:04}-{:02}", year, end.month())
}

/// Outcome of validating one municipality partition
#[derive(Debug, Clone)]
pub enum Assessment {
    /// No tests recorded around the centroid
    NoTests,
    /// No baseline for the municipality and month
    NoBaseline { month_year: String },
    /// Rate at or under the threshold
    WithinBaseline { observed_rate: f64, threshold: f64 },
    Promoted(RegionOutbreakCandidate),
    /// A repository call failed or timed out
    Failed(String),
}

/// Compares each municipality partition against its regional baseline
pub struct StatisticalValidator<'a> {
    repository: &'a dyn CaseRepository,
    settings: &'a ValidationConfig,
    query_timeout: Duration,
}

impl<'a> StatisticalValidator<'a> {
    pub fn new(
        repository: &'a dyn CaseRepository,
        settings: &'a ValidationConfig,
        query_timeout: Duration,
    ) -> Self {
        StatisticalValidator {
            repository,
            settings,
            query_timeout,
        }
    }

    /// Validate one partition. Repository failures never escape: they are
    /// logged and reported as [`Assessment::Failed`].
    pub async fn assess(&self, group: MunicipalityGroup, window: &AnalysisWindow) -> Assessment {
        let municipality_id = group.municipality_id.as_str();
        let case_count = group.cases.len();
        let center = match centroid(&group.cases) {
            Some(c) => c,
            None => return Assessment::NoTests,
        };
        debug!(
            municipality = municipality_id,
            case_count,
            lat = center.lat,
            lon = center.lon,
            "Assessing municipality partition"
        );

        let total_tests = match with_timeout(
            "total_tests_in_area",
            self.query_timeout,
            self.repository.total_tests_in_area(
                center.lat,
                center.lon,
                self.settings.search_radius_km,
                window.start,
                window.end,
            ),
        )
        .await
        {
            Ok(n) => n,
            Err(e) => return self.failed(municipality_id, e),
        };

        let observed = match observed_rate(case_count, total_tests) {
            Some(rate) => rate,
            None => {
                debug!(municipality = municipality_id, "No tests in area, skipping");
                return Assessment::NoTests;
            }
        };

        let month_year = baseline_month(window.end, self.settings.baseline_lag_years);
        let baseline = match with_timeout(
            "baseline_for_region",
            self.query_timeout,
            self.repository.baseline_for_region(municipality_id, &month_year),
        )
        .await
        {
            Ok(Some(b)) => b,
            Ok(None) => {
                warn!(
                    municipality = municipality_id,
                    month_year = month_year.as_str(),
                    "No baseline found for region, cannot validate"
                );
                return Assessment::NoBaseline { month_year };
            }
            Err(e) => return self.failed(municipality_id, e),
        };

        let threshold = outbreak_threshold(&baseline, self.settings.sigma_multiplier);
        debug!(
            municipality = municipality_id,
            case_count,
            total_tests,
            observed_rate = observed,
            expected_rate = baseline.expected_rate_per_1000_tests,
            rate_sd = baseline.rate_standard_deviation,
            threshold,
            "Rate comparison"
        );

        if !exceeds_threshold(observed, threshold) {
            return Assessment::WithinBaseline {
                observed_rate: observed,
                threshold,
            };
        }

        Assessment::Promoted(RegionOutbreakCandidate {
            municipality_id: group.municipality_id,
            case_count,
            observed_rate: observed,
            expected_rate: baseline.expected_rate_per_1000_tests,
            threshold,
            cases: group.cases,
        })
    }

    fn failed(&self, municipality_id: &str, error: OutbreakError) -> Assessment {
        warn!(
            municipality = municipality_id,
            error = %error,
            "Repository query failed, skipping municipality"
        );
        Assessment::Failed(error.to_string())
    }
}
