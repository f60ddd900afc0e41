//! Engine configuration.
//!
//! Every field has a default matching the production parameters, so an
//! empty TOML file (or no file at all) yields a working configuration.
//!
//! ```toml
//! [clustering]
//! epsilon_degrees = 0.02
//! min_points = 5
//!
//! [validation]
//! window_days = 30
//! search_radius_km = 2.0
//! sigma_multiplier = 2.0
//! baseline_lag_years = 0
//!
//! [alert]
//! radius_meters = 2000
//!
//! [dispatch]
//! target = "public-health-manager"
//!
//! [timeouts]
//! query_timeout_ms = 30000
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{OutbreakError, OutbreakResult};

/// DBSCAN parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    /// Neighbourhood radius in decimal degrees (0.02 ≈ 2 km at the equator)
    pub epsilon_degrees: f64,
    /// Minimum cluster size, enforced again after filtering
    pub min_points: usize,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            epsilon_degrees: 0.02,
            min_points: 5,
        }
    }
}

/// Rate comparison parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Trailing analysis window ending at "now"
    pub window_days: u32,
    /// Radius of the test-count search area around a municipality centroid
    pub search_radius_km: f64,
    /// Standard deviations above the expected rate
    pub sigma_multiplier: f64,
    /// Compare against the same month this many years before the analysis date
    pub baseline_lag_years: u32,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            window_days: 30,
            search_radius_km: 2.0,
            sigma_multiplier: 2.0,
            baseline_lag_years: 0,
        }
    }
}

/// Alert presentation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    pub radius_meters: u32,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self { radius_meters: 2000 }
    }
}

/// Notification destination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub target: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            target: "public-health-manager".to_string(),
        }
    }
}

/// Limits on external calls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub query_timeout_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            query_timeout_ms: 30_000,
        }
    }
}

impl TimeoutConfig {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub clustering: ClusteringConfig,
    pub validation: ValidationConfig,
    pub alert: AlertConfig,
    pub dispatch: DispatchConfig,
    pub timeouts: TimeoutConfig,
}

impl EngineConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> OutbreakResult<Self> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn from_file(path: &Path) -> OutbreakResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            OutbreakError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Render as TOML
    pub fn to_toml_string(&self) -> OutbreakResult<String> {
        toml::to_string_pretty(self).map_err(|e| OutbreakError::Config(e.to_string()))
    }

    pub fn validate(&self) -> OutbreakResult<()> {
        if !(self.clustering.epsilon_degrees > 0.0) {
            return Err(OutbreakError::Config(
                "clustering.epsilon_degrees must be greater than 0".into(),
            ));
        }
        if self.clustering.min_points == 0 {
            return Err(OutbreakError::Config(
                "clustering.min_points must be at least 1".into(),
            ));
        }
        if self.validation.window_days == 0 {
            return Err(OutbreakError::Config(
                "validation.window_days must be at least 1".into(),
            ));
        }
        if !(self.validation.search_radius_km > 0.0) {
            return Err(OutbreakError::Config(
                "validation.search_radius_km must be greater than 0".into(),
            ));
        }
        if !(self.validation.sigma_multiplier >= 0.0) {
            return Err(OutbreakError::Config(
                "validation.sigma_multiplier must not be negative".into(),
            ));
        }
        if self.dispatch.target.trim().is_empty() {
            return Err(OutbreakError::Config("dispatch.target is required".into()));
        }
        if self.timeouts.query_timeout_ms == 0 {
            return Err(OutbreakError::Config(
                "timeouts.query_timeout_ms must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_production_parameters() {
        let config = EngineConfig::default();
        assert_eq!(config.clustering.epsilon_degrees, 0.02);
        assert_eq!(config.clustering.min_points, 5);
        assert_eq!(config.validation.window_days, 30);
        assert_eq!(config.validation.search_radius_km, 2.0);
        assert_eq!(config.validation.sigma_multiplier, 2.0);
        assert_eq!(config.validation.baseline_lag_years, 0);
        assert_eq!(config.alert.radius_meters, 2000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_partial_toml_overrides() {
        let config = EngineConfig::from_toml_str(
            r#"
            [clustering]
            min_points = 8

            [dispatch]
            target = "regional-office"
            "#,
        )
        .unwrap();
        assert_eq!(config.clustering.min_points, 8);
        assert_eq!(config.clustering.epsilon_degrees, 0.02);
        assert_eq!(config.dispatch.target, "regional-office");
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = EngineConfig::default();
        config.clustering.epsilon_degrees = 0.0;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.clustering.min_points = 0;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.validation.search_radius_km = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.dispatch.target = "  ".to_string();
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.timeouts.query_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_roundtrip_of_defaults() {
        let text = EngineConfig::default().to_toml_string().unwrap();
        let parsed = EngineConfig::from_toml_str(&text).unwrap();
        assert_eq!(parsed, EngineConfig::default());
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = EngineConfig::from_toml_str("[clustering\nmin_points = 1").unwrap_err();
        assert!(matches!(err, OutbreakError::Config(_)));
    }
}
