//! Command implementations
//!
//! - `analyze`: dataset + config → alerts, dispatched to the log or an outbox
//! - `synth`: seeded synthetic dataset
//! - `check-config`: effective configuration after defaults and validation

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use colored::*;
use outbreak_core::{
    CollectiveAlert, Dataset, EngineConfig, InMemoryRepository, LogDispatcher,
    NotificationDispatcher, OutboxDispatcher, OutbreakEngine, SyntheticScenario,
};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::OutputFormat;

// =============================================================================
// Analyze
// =============================================================================

pub async fn analyze(
    dataset_path: &Path,
    config_path: Option<&Path>,
    now: Option<&str>,
    outbox: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let config = load_config(config_path)?;
    let now = parse_now(now)?;
    let dataset = Dataset::from_json_file(dataset_path)
        .with_context(|| format!("Failed to load dataset {}", dataset_path.display()))?;
    info!(
        dataset = %dataset_path.display(),
        cases = dataset.cases.len(),
        tests = dataset.tests.len(),
        "Dataset loaded"
    );

    if format == OutputFormat::Text {
        println!("{}", "─".repeat(60));
        println!("{}", "OUTBREAK ANALYSIS".green().bold());
        println!("{}", "─".repeat(60));
        println!("  Dataset: {}", dataset_path.display());
        println!(
            "  Records: {} cases, {} tests, {} baselines",
            dataset.cases.len().to_string().cyan(),
            dataset.tests.len().to_string().cyan(),
            dataset.baselines.len().to_string().cyan()
        );
        println!("  Window:  {} days ending {}", config.validation.window_days, now.to_rfc3339());
        println!();
    }

    let dispatcher: Arc<dyn NotificationDispatcher> = match outbox {
        Some(path) => Arc::new(OutboxDispatcher::new(path)),
        None => Arc::new(LogDispatcher),
    };
    let engine = OutbreakEngine::new(Arc::new(InMemoryRepository::new(dataset)), dispatcher, config);
    let alerts = engine.run_outbreak_analysis_at(now).await;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&alerts)?);
        }
        OutputFormat::Text => {
            if alerts.is_empty() {
                println!("{}", "No outbreak detected.".green());
            } else {
                println!(
                    "{} {}",
                    alerts.len().to_string().red().bold(),
                    "outbreak alert(s) generated".red().bold()
                );
                for alert in &alerts {
                    println!();
                    print_alert(alert);
                }
            }
            if let Some(path) = outbox {
                println!();
                println!("Notifications appended to: {}", path.display());
            }
        }
    }

    Ok(())
}

fn print_alert(alert: &CollectiveAlert) {
    let stats = &alert.statistics;
    let cluster = &alert.cluster_info;

    println!("  {} {}", "Alert:".bold(), alert.id.yellow());
    println!(
        "    Centroid:  ({:.4}, {:.4}), radius {} m",
        alert.location.centroid_lat, alert.location.centroid_lon, alert.location.radius_meters
    );
    println!("    Cases:     {}", stats.case_count.to_string().cyan());
    println!(
        "    Rate:      {:.2} per 1000 tests (expected {:.2}, threshold {:.2})",
        stats.observed_rate_per_1000, stats.expected_rate_per_1000, stats.outbreak_threshold_per_1000
    );
    println!(
        "    Patients:  mean age {:.1}, {} M / {} F",
        cluster.average_age, cluster.sex_distribution.male, cluster.sex_distribution.female
    );
    for m in &cluster.involved_municipalities {
        let name = if m.municipality_name.is_empty() {
            m.municipality_id.as_str()
        } else {
            m.municipality_name.as_str()
        };
        println!("    - {} [{}]: {} cases", name, m.municipality_id, m.case_count);
    }
}

// =============================================================================
// Synth
// =============================================================================

pub fn synth(
    output: &Path,
    seed: u64,
    cluster_cases: usize,
    scattered_cases: usize,
    tests: usize,
    now: Option<&str>,
    baseline_lag_years: u32,
) -> Result<()> {
    println!("{}", "─".repeat(60));
    println!("{}", "SYNTHETIC DATASET".green().bold());
    println!("{}", "─".repeat(60));

    let scenario = SyntheticScenario {
        seed,
        cluster_cases,
        scattered_cases,
        tests,
        now: parse_now(now)?,
        baseline_lag_years,
        ..SyntheticScenario::default()
    };
    let dataset = scenario.generate();
    std::fs::write(output, dataset.to_json_pretty()?)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!("  Seed:        {}", seed.to_string().cyan());
    println!("  Cases:       {} clustered, {} scattered", cluster_cases, scattered_cases);
    println!("  Tests:       {}", tests);
    println!("  Baseline:    {}", dataset.baselines[0].month_year);
    println!("\nDataset saved to: {}", output.display());
    Ok(())
}

// =============================================================================
// Check config
// =============================================================================

pub fn check_config(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    match config_path {
        Some(path) => println!("{} {}", "Valid configuration:".green().bold(), path.display()),
        None => println!("{}", "No file given, showing defaults".yellow()),
    }
    println!();
    print!("{}", config.to_toml_string()?);
    Ok(())
}

// =============================================================================
// Helpers
// =============================================================================

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(p) => EngineConfig::from_file(p)
            .with_context(|| format!("Invalid configuration {}", p.display())),
        None => Ok(EngineConfig::default()),
    }
}

fn parse_now(value: Option<&str>) -> Result<DateTime<Utc>> {
    match value {
        Some(s) => Ok(DateTime::parse_from_rfc3339(s)
            .with_context(|| format!("--now must be RFC 3339, got '{}'", s))?
            .with_timezone(&Utc)),
        None => Ok(Utc::now()),
    }
}
