//! Case repository port and an in-memory implementation.
//!
//! The engine only reads through [`CaseRepository`]. [`InMemoryRepository`]
//! serves a [`Dataset`] loaded from JSON and backs the CLI and the tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::error::{OutbreakError, OutbreakResult};
use crate::geo::{BoundingBox, GeoPoint};
use crate::model::{AnalysisWindow, PositiveCase, RegionalBaseline};

/// Read-only queries the outbreak engine issues
#[async_trait]
pub trait CaseRepository: Send + Sync {
    /// Positive eosinophilia cases with `start <= test_date <= end`
    async fn cases_in_window(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> OutbreakResult<Vec<PositiveCase>>;

    /// Number of tests (positive or not) performed within `radius_km` of a
    /// point during `[start, end]`
    async fn total_tests_in_area(
        &self,
        lat: f64,
        lon: f64,
        radius_km: f64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> OutbreakResult<u64>;

    /// Baseline for a region and "YYYY-MM" month, if one is maintained
    async fn baseline_for_region(
        &self,
        municipality_id: &str,
        month_year: &str,
    ) -> OutbreakResult<Option<RegionalBaseline>>;

    /// Display name of a municipality
    async fn municipality_name(&self, municipality_id: &str) -> OutbreakResult<Option<String>>;
}

// ==================== DATASET ====================

/// Any geolocated lab test, used as the rate denominator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeolocatedTest {
    pub id: String,
    pub test_date: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub municipality_id: String,
}

/// Municipality code and display name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Municipality {
    pub id: String,
    pub name: String,
}

/// Everything the engine reads, in one serializable bundle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub cases: Vec<PositiveCase>,
    #[serde(default)]
    pub tests: Vec<GeolocatedTest>,
    #[serde(default)]
    pub baselines: Vec<RegionalBaseline>,
    #[serde(default)]
    pub municipalities: Vec<Municipality>,
}

impl Dataset {
    /// Parse a JSON dataset and validate every record
    pub fn from_json_str(content: &str) -> OutbreakResult<Self> {
        let dataset: Dataset = serde_json::from_str(content)?;
        dataset.validate()?;
        Ok(dataset)
    }

    pub fn from_json_file(path: &Path) -> OutbreakResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn to_json_pretty(&self) -> OutbreakResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> OutbreakResult<()> {
        for case in &self.cases {
            case.validate()?;
        }
        for baseline in &self.baselines {
            if !is_month_year(&baseline.month_year) {
                return Err(OutbreakError::InvalidData(format!(
                    "Baseline for region {} has malformed month_year '{}'",
                    baseline.region_id, baseline.month_year
                )));
            }
            if baseline.rate_standard_deviation < 0.0 {
                return Err(OutbreakError::InvalidData(format!(
                    "Baseline for region {} has negative standard deviation",
                    baseline.region_id
                )));
            }
        }
        Ok(())
    }
}

/// "YYYY-MM" with a month between 01 and 12
fn is_month_year(value: &str) -> bool {
    let bytes = value.as_bytes();
    if bytes.len() != 7 || bytes[4] != b'-' {
        return false;
    }
    if !bytes[..4].iter().chain(&bytes[5..]).all(u8::is_ascii_digit) {
        return false;
    }
    matches!(value[5..].parse::<u8>(), Ok(1..=12))
}

// ==================== IN-MEMORY REPOSITORY ====================

/// Serves queries from a [`Dataset`] held in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    dataset: Dataset,
    names: HashMap<String, String>,
}

impl InMemoryRepository {
    pub fn new(dataset: Dataset) -> Self {
        let names = dataset
            .municipalities
            .iter()
            .map(|m| (m.id.clone(), m.name.clone()))
            .collect();
        InMemoryRepository { dataset, names }
    }
}

#[async_trait]
impl CaseRepository for InMemoryRepository {
    async fn cases_in_window(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> OutbreakResult<Vec<PositiveCase>> {
        let window = AnalysisWindow { start, end };
        Ok(self
            .dataset
            .cases
            .iter()
            .filter(|c| window.contains(c.test_date))
            .cloned()
            .collect())
    }

    async fn total_tests_in_area(
        &self,
        lat: f64,
        lon: f64,
        radius_km: f64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> OutbreakResult<u64> {
        let window = AnalysisWindow { start, end };
        let area = BoundingBox::around(GeoPoint::new(lat, lon), radius_km);
        let count = self
            .dataset
            .tests
            .iter()
            .filter(|t| window.contains(t.test_date))
            .filter(|t| area.contains(GeoPoint::new(t.latitude, t.longitude)))
            .count();
        Ok(count as u64)
    }

    async fn baseline_for_region(
        &self,
        municipality_id: &str,
        month_year: &str,
    ) -> OutbreakResult<Option<RegionalBaseline>> {
        Ok(self
            .dataset
            .baselines
            .iter()
            .find(|b| b.region_id == municipality_id && b.month_year == month_year)
            .cloned())
    }

    async fn municipality_name(&self, municipality_id: &str) -> OutbreakResult<Option<String>> {
        Ok(self.names.get(municipality_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Sex;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 20, 12, 0, 0).unwrap()
    }

    fn test_at(id: &str, lat: f64, lon: f64, days_ago: i64) -> GeolocatedTest {
        GeolocatedTest {
            id: id.to_string(),
            test_date: now() - Duration::days(days_ago),
            latitude: lat,
            longitude: lon,
            municipality_id: "5208707".to_string(),
        }
    }

    fn sample_dataset() -> Dataset {
        Dataset {
            cases: vec![
                PositiveCase {
                    id: "recent".to_string(),
                    test_date: now() - Duration::days(3),
                    latitude: -16.68,
                    longitude: -49.25,
                    age: 33,
                    sex: Sex::M,
                    municipality_id: "5208707".to_string(),
                },
                PositiveCase {
                    id: "old".to_string(),
                    test_date: now() - Duration::days(45),
                    latitude: -16.68,
                    longitude: -49.25,
                    age: 51,
                    sex: Sex::F,
                    municipality_id: "5208707".to_string(),
                },
            ],
            tests: vec![
                test_at("inside", -16.68, -49.25, 1),
                test_at("edge-lat", -16.68 + 0.0179, -49.25, 1),
                test_at("outside", -16.70, -49.25, 1),
                test_at("too-old", -16.68, -49.25, 31),
            ],
            baselines: vec![RegionalBaseline {
                region_id: "5208707".to_string(),
                month_year: "2026-05".to_string(),
                expected_rate_per_1000_tests: 5.0,
                rate_standard_deviation: 1.5,
            }],
            municipalities: vec![Municipality {
                id: "5208707".to_string(),
                name: "Goiânia".to_string(),
            }],
        }
    }

    #[tokio::test]
    async fn test_cases_in_window_filters_by_date() {
        let repo = InMemoryRepository::new(sample_dataset());
        let cases = repo
            .cases_in_window(now() - Duration::days(30), now())
            .await
            .unwrap();
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].id, "recent");
    }

    #[tokio::test]
    async fn test_total_tests_in_area_uses_bounding_box_and_window() {
        let repo = InMemoryRepository::new(sample_dataset());
        let count = repo
            .total_tests_in_area(-16.68, -49.25, 2.0, now() - Duration::days(30), now())
            .await
            .unwrap();
        // "inside" and "edge-lat" (0.0179° < 2/111°); "outside" is 0.02° away
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn test_baseline_and_name_lookup() {
        let repo = InMemoryRepository::new(sample_dataset());
        let baseline = repo.baseline_for_region("5208707", "2026-05").await.unwrap();
        assert_eq!(baseline.unwrap().expected_rate_per_1000_tests, 5.0);
        assert!(repo.baseline_for_region("5208707", "2026-04").await.unwrap().is_none());

        assert_eq!(
            repo.municipality_name("5208707").await.unwrap().as_deref(),
            Some("Goiânia")
        );
        assert!(repo.municipality_name("0000000").await.unwrap().is_none());
    }

    #[test]
    fn test_dataset_json_roundtrip_and_validation() {
        let json = sample_dataset().to_json_pretty().unwrap();
        let parsed = Dataset::from_json_str(&json).unwrap();
        assert_eq!(parsed, sample_dataset());
    }

    #[test]
    fn test_dataset_rejects_malformed_month() {
        let mut dataset = sample_dataset();
        dataset.baselines[0].month_year = "2026-13".to_string();
        assert!(dataset.validate().is_err());

        dataset.baselines[0].month_year = "May 2026".to_string();
        assert!(dataset.validate().is_err());
    }

    #[test]
    fn test_dataset_rejects_invalid_case() {
        let mut dataset = sample_dataset();
        dataset.cases[0].latitude = -120.0;
        assert!(matches!(dataset.validate(), Err(OutbreakError::InvalidData(_))));
    }

    #[test]
    fn test_missing_sections_default_to_empty() {
        let dataset = Dataset::from_json_str("{}").unwrap();
        assert!(dataset.cases.is_empty());
        assert!(dataset.tests.is_empty());
    }
}
