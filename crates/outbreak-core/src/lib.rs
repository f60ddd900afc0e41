//! Outbreak Core - Parasitosis Outbreak Detection
//!
//! Finds unusual spatial concentrations of positive eosinophilia cases and
//! confirms them against region-specific epidemiological baselines.
//!
//! # Pipeline
//!
//! - DBSCAN clustering of case coordinates over a trailing window
//! - Pluggable non-infectious-cause filter with a minimum-size re-check
//! - Partition of each cluster by municipality
//! - Rate per 1000 tests compared against `expected + 2σ`
//! - One combined alert per cluster, handed to a notification dispatcher
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use outbreak_core::{Dataset, EngineConfig, InMemoryRepository, LogDispatcher, OutbreakEngine};
//!
//! # async fn run() {
//! let repository = Arc::new(InMemoryRepository::new(Dataset::default()));
//! let engine = OutbreakEngine::new(repository, Arc::new(LogDispatcher), EngineConfig::default());
//!
//! let alerts = engine.run_outbreak_analysis().await;
//! assert!(alerts.is_empty());
//! # }
//! ```

pub mod aggregate;
pub mod clustering;
pub mod compose;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod filter;
pub mod geo;
pub mod model;
pub mod repository;
#[cfg(feature = "synth")]
pub mod synth;
pub mod validation;

// Re-export commonly used types for convenience
pub use compose::{AlertMessage, AlertSeverity, ComposedAlert};
pub use config::EngineConfig;
pub use dispatch::{LogDispatcher, NotificationDispatcher, NotificationPayload, OutboxDispatcher};
pub use engine::{OutbreakDetector, OutbreakEngine};
pub use error::{OutbreakError, OutbreakResult};
pub use filter::{CaseFilter, PassThroughFilter};
pub use model::{
    AnalysisWindow, CollectiveAlert, PositiveCase, RegionOutbreakCandidate, RegionalBaseline, Sex,
};
pub use repository::{CaseRepository, Dataset, InMemoryRepository};
#[cfg(feature = "synth")]
pub use synth::SyntheticScenario;
