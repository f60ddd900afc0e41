//! Outbreak detection pipeline.
//!
//! [`OutbreakDetector`] runs clustering, filtering, aggregation, statistical
//! validation and alert composition, issuing only repository reads.
//! [`OutbreakEngine`] wraps it and hands every composed alert to the
//! notification dispatcher.
//!
//! No stage raises to the caller. Collaborator failures are logged and
//! confined to the municipality or cluster being processed; the worst
//! outcome of a run is an empty alert list.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::aggregate::group_by_municipality;
use crate::clustering::Dbscan;
use crate::compose::{compose_alert, resolve_names, AlertMessage, ComposedAlert};
use crate::config::EngineConfig;
use crate::dispatch::{NotificationDispatcher, NotificationPayload};
use crate::error::with_timeout;
use crate::filter::{CaseFilter, PassThroughFilter};
use crate::geo::GeoPoint;
use crate::model::{AnalysisWindow, CollectiveAlert, PositiveCase, RegionOutbreakCandidate};
use crate::repository::CaseRepository;
use crate::validation::{Assessment, StatisticalValidator};

// ==================== DETECTOR ====================

/// Side-effect free detection over an injected repository
pub struct OutbreakDetector {
    repository: Arc<dyn CaseRepository>,
    filter: Arc<dyn CaseFilter>,
    config: EngineConfig,
}

impl OutbreakDetector {
    pub fn new(repository: Arc<dyn CaseRepository>, config: EngineConfig) -> Self {
        OutbreakDetector {
            repository,
            filter: Arc::new(PassThroughFilter),
            config,
        }
    }

    /// Replace the non-infectious-cause filter
    pub fn with_filter(mut self, filter: Arc<dyn CaseFilter>) -> Self {
        self.filter = filter;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Analyze the trailing window ending at `now` and return every
    /// confirmed outbreak, one per cluster, in clustering order.
    pub async fn detect(&self, now: DateTime<Utc>) -> Vec<ComposedAlert> {
        let window = AnalysisWindow::trailing(now, self.config.validation.window_days);
        let query_timeout = self.config.timeouts.query_timeout();

        let cases = match with_timeout(
            "cases_in_window",
            query_timeout,
            self.repository.cases_in_window(window.start, window.end),
        )
        .await
        {
            Ok(cases) => cases,
            Err(e) => {
                error!(error = %e, "Failed to load positive cases, aborting run");
                return Vec::new();
            }
        };

        if cases.is_empty() {
            info!(
                start = %window.start,
                end = %window.end,
                "No positive cases in window"
            );
            return Vec::new();
        }

        let points: Vec<GeoPoint> = cases.iter().map(GeoPoint::from).collect();
        let dbscan = Dbscan::new(
            self.config.clustering.epsilon_degrees,
            self.config.clustering.min_points,
        );
        let clustering = dbscan.run(&points);
        info!(
            cases = cases.len(),
            clusters = clustering.clusters.len(),
            noise = clustering.noise.len(),
            "Spatial clustering complete"
        );

        let mut alerts = Vec::new();
        for (index, members) in clustering.clusters.iter().enumerate() {
            let cluster: Vec<PositiveCase> = members.iter().map(|&i| cases[i].clone()).collect();
            if let Some(composed) = self.process_cluster(index, cluster, &window).await {
                alerts.push(composed);
            }
        }
        alerts
    }

    async fn process_cluster(
        &self,
        index: usize,
        cluster: Vec<PositiveCase>,
        window: &AnalysisWindow,
    ) -> Option<ComposedAlert> {
        let min_points = self.config.clustering.min_points;
        let query_timeout = self.config.timeouts.query_timeout();

        let before = cluster.len();
        let filtered = self.filter.filter(cluster);
        if filtered.len() < min_points {
            debug!(
                cluster = index,
                filter = self.filter.name(),
                before,
                after = filtered.len(),
                min_points,
                "Cluster below minimum size after filtering, discarded"
            );
            return None;
        }

        let groups = group_by_municipality(filtered);
        debug!(cluster = index, municipalities = groups.len(), "Validating cluster");

        let validator = StatisticalValidator::new(
            self.repository.as_ref(),
            &self.config.validation,
            query_timeout,
        );
        let mut candidates: Vec<RegionOutbreakCandidate> = Vec::new();
        for group in groups {
            match validator.assess(group, window).await {
                Assessment::Promoted(candidate) => {
                    info!(
                        cluster = index,
                        municipality = candidate.municipality_id.as_str(),
                        case_count = candidate.case_count,
                        observed_rate = candidate.observed_rate,
                        threshold = candidate.threshold,
                        "Municipality above outbreak threshold"
                    );
                    candidates.push(candidate);
                }
                Assessment::WithinBaseline {
                    observed_rate,
                    threshold,
                } => {
                    debug!(cluster = index, observed_rate, threshold, "Within baseline");
                }
                _ => {}
            }
        }

        if candidates.is_empty() {
            debug!(cluster = index, "No municipality exceeded its threshold");
            return None;
        }

        // A failed lookup drops this cluster's alert; a lookup that returns
        // no name is not a failure and yields "" in the record.
        let names = match resolve_names(self.repository.as_ref(), &candidates, query_timeout).await
        {
            Ok(names) => names,
            Err(e) => {
                error!(
                    cluster = index,
                    error = %e,
                    "Municipality name lookup failed, alert not generated"
                );
                return None;
            }
        };

        let composed = compose_alert(
            candidates,
            names,
            window.end,
            self.config.alert.radius_meters,
        )?;
        if let Err(e) = composed.alert.validate() {
            warn!(cluster = index, error = %e, "Composed alert rejected");
            return None;
        }

        info!(
            alert_id = composed.alert.id.as_str(),
            case_count = composed.alert.statistics.case_count,
            "Parasitosis outbreak confirmed"
        );
        Some(composed)
    }
}

// ==================== ENGINE ====================

/// Detection plus notification dispatch
pub struct OutbreakEngine {
    detector: OutbreakDetector,
    dispatcher: Arc<dyn NotificationDispatcher>,
}

impl OutbreakEngine {
    pub fn new(
        repository: Arc<dyn CaseRepository>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        config: EngineConfig,
    ) -> Self {
        OutbreakEngine {
            detector: OutbreakDetector::new(repository, config),
            dispatcher,
        }
    }

    pub fn with_filter(mut self, filter: Arc<dyn CaseFilter>) -> Self {
        self.detector = self.detector.with_filter(filter);
        self
    }

    pub fn detector(&self) -> &OutbreakDetector {
        &self.detector
    }

    /// Analyze the window ending now
    pub async fn run_outbreak_analysis(&self) -> Vec<CollectiveAlert> {
        self.run_outbreak_analysis_at(Utc::now()).await
    }

    /// Analyze the window ending at `now`, dispatch each alert and return
    /// all of them. An alert whose dispatch fails is still returned.
    pub async fn run_outbreak_analysis_at(&self, now: DateTime<Utc>) -> Vec<CollectiveAlert> {
        info!(now = %now, "Starting outbreak analysis");
        let composed = self.detector.detect(now).await;

        let mut alerts = Vec::with_capacity(composed.len());
        for ComposedAlert { alert, message } in composed {
            self.notify(&alert, &message).await;
            alerts.push(alert);
        }

        info!(alerts = alerts.len(), "Outbreak analysis finished");
        alerts
    }

    async fn notify(&self, alert: &CollectiveAlert, message: &AlertMessage) {
        let config = self.detector.config();
        let target = config.dispatch.target.as_str();
        let payload = NotificationPayload::for_alert(alert);

        match with_timeout(
            "dispatch",
            config.timeouts.query_timeout(),
            self.dispatcher.dispatch(target, &payload, message, alert),
        )
        .await
        {
            Ok(()) => debug!(alert_id = alert.id.as_str(), target, "Alert dispatched"),
            Err(e) => error!(
                alert_id = alert.id.as_str(),
                target,
                error = %e,
                "Failed to dispatch outbreak alert"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::LogDispatcher;
    use crate::model::{RegionalBaseline, Sex};
    use crate::repository::{Dataset, GeolocatedTest, InMemoryRepository, Municipality};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 20, 12, 0, 0).unwrap()
    }

    fn dataset(test_count: usize) -> Dataset {
        let cases = (0..5)
            .map(|i| PositiveCase {
                id: format!("case_{}", i),
                test_date: now() - Duration::days(2),
                latitude: -16.68,
                longitude: -49.25 + i as f64 * 0.001,
                age: 20 + i as u32 * 10,
                sex: if i % 2 == 0 { Sex::F } else { Sex::M },
                municipality_id: "5208707".to_string(),
            })
            .collect();
        let tests = (0..test_count)
            .map(|i| GeolocatedTest {
                id: format!("test_{}", i),
                test_date: now() - Duration::days(1),
                latitude: -16.68,
                longitude: -49.248,
                municipality_id: "5208707".to_string(),
            })
            .collect();
        Dataset {
            cases,
            tests,
            baselines: vec![RegionalBaseline {
                region_id: "5208707".to_string(),
                month_year: "2026-05".to_string(),
                expected_rate_per_1000_tests: 10.0,
                rate_standard_deviation: 2.0,
            }],
            municipalities: vec![Municipality {
                id: "5208707".to_string(),
                name: "Goiânia".to_string(),
            }],
        }
    }

    fn detector(test_count: usize) -> OutbreakDetector {
        OutbreakDetector::new(
            Arc::new(InMemoryRepository::new(dataset(test_count))),
            EngineConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_detect_confirms_dense_cluster() {
        let alerts = detector(100).detect(now()).await;
        assert_eq!(alerts.len(), 1);

        let alert = &alerts[0].alert;
        assert_eq!(alert.id, "outbreak-cluster-5208707");
        assert_eq!(alert.statistics.case_count, 5);
        assert_eq!(alert.statistics.observed_rate_per_1000, 50.0);
        assert_eq!(alert.statistics.outbreak_threshold_per_1000, 14.0);
        assert_eq!(alert.location.municipality_name, "Goiânia");
        assert_eq!(alert.alert_date, now());
        assert_eq!(alert.cluster_info.average_age, 40.0);
    }

    #[tokio::test]
    async fn test_detect_within_baseline() {
        // 5 / 500 × 1000 = 10.0, under the 14.0 threshold
        assert!(detector(500).detect(now()).await.is_empty());
    }

    #[tokio::test]
    async fn test_window_excludes_old_cases() {
        let later = now() + Duration::days(40);
        assert!(detector(100).detect(later).await.is_empty());
    }

    #[tokio::test]
    async fn test_engine_returns_dispatched_alerts() {
        let engine = OutbreakEngine::new(
            Arc::new(InMemoryRepository::new(dataset(100))),
            Arc::new(LogDispatcher),
            EngineConfig::default(),
        );
        let alerts = engine.run_outbreak_analysis_at(now()).await;
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].case_ids.len(), 5);
    }
}
