//! Seeded synthetic datasets for demos and tests.
//!
//! A scenario places a dense cluster of positive cases around one city
//! centre, scatters background cases and geolocated tests over a wider
//! area, and adds a baseline for the analysis month. The same seed always
//! yields the same [`Dataset`].

use chrono::{DateTime, Duration, Utc};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::geo::GeoPoint;
use crate::model::{PositiveCase, RegionalBaseline, Sex};
use crate::repository::{Dataset, GeolocatedTest, Municipality};
use crate::validation::baseline_month;

/// Parameters of a generated dataset
#[derive(Debug, Clone)]
pub struct SyntheticScenario {
    pub seed: u64,
    /// Cases within `cluster_spread` degrees of the centre
    pub cluster_cases: usize,
    /// Cases within `background_spread` degrees of the centre
    pub scattered_cases: usize,
    /// Geolocated tests within `background_spread` degrees of the centre
    pub tests: usize,
    /// End of the generated period; every record falls in the `window_days` before it
    pub now: DateTime<Utc>,
    pub window_days: u32,
    pub center: GeoPoint,
    pub municipality_id: String,
    pub municipality_name: String,
    pub cluster_spread: f64,
    pub background_spread: f64,
    pub expected_rate_per_1000_tests: f64,
    pub rate_standard_deviation: f64,
    pub baseline_lag_years: u32,
}

impl Default for SyntheticScenario {
    fn default() -> Self {
        SyntheticScenario {
            seed: 42,
            cluster_cases: 10,
            scattered_cases: 50,
            tests: 1000,
            now: Utc::now(),
            window_days: 30,
            center: GeoPoint::new(-16.68, -49.25),
            municipality_id: "5208707".to_string(),
            municipality_name: "Goiânia".to_string(),
            cluster_spread: 0.01,
            background_spread: 0.1,
            expected_rate_per_1000_tests: 5.0,
            rate_standard_deviation: 1.5,
            baseline_lag_years: 0,
        }
    }
}

impl SyntheticScenario {
    pub fn generate(&self) -> Dataset {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);

        let mut cases = Vec::with_capacity(self.cluster_cases + self.scattered_cases);
        for i in 0..self.cluster_cases {
            cases.push(self.case(format!("case_{}", i), self.cluster_spread, 15..35, &mut rng));
        }
        for i in 0..self.scattered_cases {
            cases.push(self.case(
                format!("scattered_{}", i),
                self.background_spread,
                20..50,
                &mut rng,
            ));
        }

        let tests = (0..self.tests)
            .map(|i| {
                let location = self.jitter(self.background_spread, &mut rng);
                GeolocatedTest {
                    id: format!("test_{}", i),
                    test_date: self.recent_date(&mut rng),
                    latitude: location.lat,
                    longitude: location.lon,
                    municipality_id: self.municipality_id.clone(),
                }
            })
            .collect();

        Dataset {
            cases,
            tests,
            baselines: vec![RegionalBaseline {
                region_id: self.municipality_id.clone(),
                month_year: baseline_month(self.now, self.baseline_lag_years),
                expected_rate_per_1000_tests: self.expected_rate_per_1000_tests,
                rate_standard_deviation: self.rate_standard_deviation,
            }],
            municipalities: vec![Municipality {
                id: self.municipality_id.clone(),
                name: self.municipality_name.clone(),
            }],
        }
    }

    fn case(
        &self,
        id: String,
        spread: f64,
        ages: std::ops::Range<u32>,
        rng: &mut ChaCha8Rng,
    ) -> PositiveCase {
        let location = self.jitter(spread, rng);
        PositiveCase {
            id,
            test_date: self.recent_date(rng),
            latitude: location.lat,
            longitude: location.lon,
            age: rng.gen_range(ages),
            sex: if rng.gen_bool(0.5) { Sex::M } else { Sex::F },
            municipality_id: self.municipality_id.clone(),
        }
    }

    fn jitter(&self, spread: f64, rng: &mut ChaCha8Rng) -> GeoPoint {
        GeoPoint::new(
            self.center.lat + rng.gen_range(-spread..=spread),
            self.center.lon + rng.gen_range(-spread..=spread),
        )
    }

    fn recent_date(&self, rng: &mut ChaCha8Rng) -> DateTime<Utc> {
        let span = i64::from(self.window_days) * 24 * 60 * 60;
        if span == 0 {
            return self.now;
        }
        self.now - Duration::seconds(rng.gen_range(0..span))
    }
}
