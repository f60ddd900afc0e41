//! Alert composition: merges the promoted municipalities of one cluster
//! into a single [`CollectiveAlert`] and renders its notification text.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{with_timeout, OutbreakResult};
use crate::geo::{centroid, GeoPoint};
use crate::model::{
    AlertLocation, AlertType, ClusterInfo, CollectiveAlert, InvolvedMunicipality,
    OutbreakStatistics, PositiveCase, RegionOutbreakCandidate, SexDistribution,
};
use crate::repository::CaseRepository;

/// Prefix of every collective alert ID
pub const ALERT_ID_PREFIX: &str = "outbreak-cluster-";

/// Notification severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
}

/// Human-readable notification text for one alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertMessage {
    pub title: String,
    pub body: String,
    /// Longer text stored with the notification record
    pub description: String,
    pub severity: AlertSeverity,
}

/// An alert together with its rendered message, ready for dispatch
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedAlert {
    pub alert: CollectiveAlert,
    pub message: AlertMessage,
}

/// Mean age and sex counts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Demographics {
    pub average_age: f64,
    pub sex_distribution: SexDistribution,
}

/// Demographics over `cases`, `None` for an empty slice
pub fn demographics(cases: &[PositiveCase]) -> Option<Demographics> {
    if cases.is_empty() {
        return None;
    }
    let mut sex_distribution = SexDistribution::default();
    let mut total_age = 0.0;
    for case in cases {
        total_age += f64::from(case.age);
        sex_distribution.record(case.sex);
    }
    Some(Demographics {
        average_age: total_age / cases.len() as f64,
        sex_distribution,
    })
}

/// `outbreak-cluster-<id1>-<id2>...` in candidate order
pub fn alert_id<'a, I>(municipality_ids: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let joined: Vec<&str> = municipality_ids.into_iter().collect();
    format!("{}{}", ALERT_ID_PREFIX, joined.join("-"))
}

/// Look up every candidate's municipality name concurrently.
///
/// Results keep candidate order. A municipality without a name maps to an
/// empty string; any failed or timed-out lookup fails the whole batch.
pub async fn resolve_names(
    repository: &dyn CaseRepository,
    candidates: &[RegionOutbreakCandidate],
    query_timeout: Duration,
) -> OutbreakResult<Vec<String>> {
    let lookups = candidates.iter().map(|c| {
        with_timeout(
            "municipality_name",
            query_timeout,
            repository.municipality_name(&c.municipality_id),
        )
    });

    join_all(lookups)
        .await
        .into_iter()
        .map(|r| r.map(Option::unwrap_or_default))
        .collect()
}

/// Build the combined alert for one cluster.
///
/// `names` must be parallel to `candidates`. Returns `None` when there are
/// no candidates.
pub fn compose_alert(
    candidates: Vec<RegionOutbreakCandidate>,
    names: Vec<String>,
    alert_date: DateTime<Utc>,
    radius_meters: u32,
) -> Option<ComposedAlert> {
    let headline = candidates.first()?;

    let involved: Vec<InvolvedMunicipality> = candidates
        .iter()
        .zip(names.into_iter().chain(std::iter::repeat(String::new())))
        .map(|(c, name)| InvolvedMunicipality {
            municipality_id: c.municipality_id.clone(),
            municipality_name: name,
            case_count: c.case_count,
        })
        .collect();

    let combined_case_count: usize = candidates.iter().map(|c| c.case_count).sum();
    let all_cases: Vec<PositiveCase> = candidates
        .iter()
        .flat_map(|c| c.cases.iter().cloned())
        .collect();
    let center = centroid(&all_cases)?;
    let demo = demographics(&all_cases)?;

    let alert = CollectiveAlert {
        id: alert_id(involved.iter().map(|m| m.municipality_id.as_str())),
        alert_type: AlertType::ParasitosisOutbreak,
        alert_date,
        location: AlertLocation {
            centroid_lat: center.lat,
            centroid_lon: center.lon,
            radius_meters,
            municipality_id: headline.municipality_id.clone(),
            municipality_name: involved[0].municipality_name.clone(),
        },
        statistics: OutbreakStatistics {
            case_count: combined_case_count,
            observed_rate_per_1000: headline.observed_rate,
            expected_rate_per_1000: headline.expected_rate,
            outbreak_threshold_per_1000: headline.threshold,
        },
        cluster_info: ClusterInfo {
            average_age: demo.average_age,
            sex_distribution: demo.sex_distribution,
            involved_municipalities: involved,
        },
        case_ids: all_cases.into_iter().map(|c| c.id).collect(),
    };

    let message = render_message(
        &alert.cluster_info.involved_municipalities,
        center,
        combined_case_count,
    );
    Some(ComposedAlert { alert, message })
}

/// Title, body and description naming each municipality with its case
/// count, the combined centroid (4 decimal places) and the total.
pub fn render_message(
    involved: &[InvolvedMunicipality],
    center: GeoPoint,
    combined_case_count: usize,
) -> AlertMessage {
    let places = involved
        .iter()
        .map(|m| {
            let label = if m.municipality_name.is_empty() {
                m.municipality_id.as_str()
            } else {
                m.municipality_name.as_str()
            };
            format!("{} ({} cases)", label, m.case_count)
        })
        .collect::<Vec<_>>()
        .join(", ");

    AlertMessage {
        title: "Parasitosis Outbreak Alert".to_string(),
        body: format!(
            "Outbreak confirmed in {} (Lat: {:.4}, Lon: {:.4}). Total of {} cases.",
            places, center.lat, center.lon, combined_case_count
        ),
        description: format!(
            "A parasitosis outbreak was detected in the region of {}. Total of {} confirmed cases. \
             Please review the details and take appropriate action.",
            places, combined_case_count
        ),
        severity: AlertSeverity::High,
    }
}
