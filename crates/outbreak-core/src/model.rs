//! Domain types shared by every stage of the outbreak pipeline.
//!
//! `PositiveCase` and `RegionalBaseline` arrive from the case repository and
//! are never mutated. `RegionOutbreakCandidate` lives for one analysis run.
//! `CollectiveAlert` is the only record handed to a collaborator.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{OutbreakError, OutbreakResult};

/// Alert type tag carried by every collective alert and notification payload
pub const PARASITOSIS_OUTBREAK: &str = "PARASITOSIS_OUTBREAK";

/// Closed time interval `[start, end]` covered by one analysis run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl AnalysisWindow {
    /// The `days` days ending at `end`
    pub fn trailing(end: DateTime<Utc>, days: u32) -> Self {
        AnalysisWindow {
            start: end - Duration::days(i64::from(days)),
            end,
        }
    }

    /// Inclusive at both ends
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant <= self.end
    }
}

/// Biological sex as recorded on the lab request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sex {
    M,
    F,
}

/// A lab record with elevated eosinophil count, geolocated to the patient's address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositiveCase {
    pub id: String,
    pub test_date: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub age: u32,
    pub sex: Sex,
    /// Administrative region (IBGE municipality code)
    pub municipality_id: String,
}

impl PositiveCase {
    /// Reject records the clustering and rate math cannot use
    pub fn validate(&self) -> OutbreakResult<()> {
        if self.id.is_empty() {
            return Err(OutbreakError::InvalidData("Case ID is required".to_string()));
        }
        if self.municipality_id.is_empty() {
            return Err(OutbreakError::InvalidData(format!(
                "Case {} has no municipality",
                self.id
            )));
        }
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(OutbreakError::InvalidData(format!(
                "Case {} latitude out of range: {}",
                self.id, self.latitude
            )));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(OutbreakError::InvalidData(format!(
                "Case {} longitude out of range: {}",
                self.id, self.longitude
            )));
        }
        Ok(())
    }
}

/// Historical incidence for one region in one calendar month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionalBaseline {
    pub region_id: String,
    /// "YYYY-MM"
    pub month_year: String,
    pub expected_rate_per_1000_tests: f64,
    pub rate_standard_deviation: f64,
}

/// A municipality partition of a cluster whose observed rate beat its threshold
#[derive(Debug, Clone, PartialEq)]
pub struct RegionOutbreakCandidate {
    pub municipality_id: String,
    pub case_count: usize,
    /// Cases per 1000 tests around the partition centroid
    pub observed_rate: f64,
    pub expected_rate: f64,
    pub threshold: f64,
    pub cases: Vec<PositiveCase>,
}

/// Kind of collective alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertType {
    #[serde(rename = "PARASITOSIS_OUTBREAK")]
    ParasitosisOutbreak,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::ParasitosisOutbreak => PARASITOSIS_OUTBREAK,
        }
    }
}

/// Headline location of an outbreak
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertLocation {
    /// Combined centroid over every promoted case
    pub centroid_lat: f64,
    pub centroid_lon: f64,
    pub radius_meters: u32,
    /// First promoted municipality
    pub municipality_id: String,
    pub municipality_name: String,
}

/// Rate figures reported on the alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutbreakStatistics {
    /// Combined across all promoted municipalities
    pub case_count: usize,
    pub observed_rate_per_1000: f64,
    pub expected_rate_per_1000: f64,
    pub outbreak_threshold_per_1000: f64,
}

/// Case counts by sex
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SexDistribution {
    #[serde(rename = "M")]
    pub male: usize,
    #[serde(rename = "F")]
    pub female: usize,
}

impl SexDistribution {
    pub fn record(&mut self, sex: Sex) {
        match sex {
            Sex::M => self.male += 1,
            Sex::F => self.female += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.male + self.female
    }
}

/// One municipality taking part in a combined alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvolvedMunicipality {
    pub municipality_id: String,
    pub municipality_name: String,
    pub case_count: usize,
}

/// Demographic summary of the promoted cases
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterInfo {
    pub average_age: f64,
    pub sex_distribution: SexDistribution,
    pub involved_municipalities: Vec<InvolvedMunicipality>,
}

/// Confirmed parasitosis outbreak for one spatial cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectiveAlert {
    /// "outbreak-cluster-" followed by the involved municipality IDs
    pub id: String,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub alert_date: DateTime<Utc>,
    pub location: AlertLocation,
    pub statistics: OutbreakStatistics,
    pub cluster_info: ClusterInfo,
    pub case_ids: Vec<String>,
}

impl CollectiveAlert {
    /// Structural checks applied before an alert leaves the engine
    pub fn validate(&self) -> OutbreakResult<()> {
        if self.id.is_empty() {
            return Err(OutbreakError::InvalidData("Alert ID is required".to_string()));
        }
        if self.case_ids.is_empty() {
            return Err(OutbreakError::InvalidData(format!(
                "Alert {} lists no cases",
                self.id
            )));
        }
        if self.statistics.case_count != self.case_ids.len() {
            return Err(OutbreakError::InvalidData(format!(
                "Alert {} case_count {} does not match {} case IDs",
                self.id,
                self.statistics.case_count,
                self.case_ids.len()
            )));
        }
        let by_sex = self.cluster_info.sex_distribution.total();
        if by_sex != self.case_ids.len() {
            return Err(OutbreakError::InvalidData(format!(
                "Alert {} sex distribution covers {} cases, expected {}",
                self.id,
                by_sex,
                self.case_ids.len()
            )));
        }
        Ok(())
    }
}
