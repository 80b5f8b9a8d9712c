//! `run`: plan and apply against a file inventory, once or on a schedule

use std::path::Path;

use rotator_engine::{RotationConfig, RotationEngine, RotationOutcome};
use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::inventory::FileFilterService;
use crate::output::{print_outcome, OutputFormat};

pub async fn execute(
    config: &CliConfig,
    inventory: &Path,
    now: Option<&str>,
    every: Option<u64>,
    format: OutputFormat,
) -> CliResult<()> {
    let rotation = config.rotation()?;

    match every {
        None => {
            let now = super::resolve_now(now)?;
            let outcome = pass(&rotation, inventory, now).await?;
            print_outcome(&outcome, format)?;
            match failure_count(&outcome) {
                0 => Ok(()),
                n => Err(CliError::PassFailed(n)),
            }
        }
        Some(0) => Err(CliError::InvalidArgument("--every must be at least 1".into())),
        Some(_) if now.is_some() => Err(CliError::InvalidArgument(
            "--now cannot be combined with --every".into(),
        )),
        Some(secs) => schedule(&rotation, inventory, secs, format).await,
    }
}

/// Fire a pass every `secs` seconds until interrupted
async fn schedule(
    rotation: &RotationConfig,
    inventory: &Path,
    secs: u64,
    format: OutputFormat,
) -> CliResult<()> {
    let mut ticker = interval(Duration::from_secs(secs));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tracing::info!(every_secs = secs, "Rotation scheduler started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                // Each tick is an independent invocation; failures wait for the next one
                match pass(rotation, inventory, chrono::Utc::now()).await {
                    Ok(outcome) => {
                        if let Err(e) = print_outcome(&outcome, format) {
                            tracing::error!(error = %e, "Failed to print outcome");
                        }
                    }
                    Err(e) => tracing::error!(error = %e, "Rotation pass failed"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted; stopping rotation scheduler");
                return Ok(());
            }
        }
    }
}

/// One pass over a fresh read of the inventory file
async fn pass(
    rotation: &RotationConfig,
    inventory: &Path,
    now: chrono::DateTime<chrono::Utc>,
) -> CliResult<RotationOutcome> {
    let service = FileFilterService::open(inventory).await?;
    let engine = RotationEngine::new(rotation.clone(), service)?;

    let outcome = engine.run_at(now).await?;
    if !outcome.dry_run {
        engine.service().save().await?;
    }
    Ok(outcome)
}

fn failure_count(outcome: &RotationOutcome) -> usize {
    outcome.delete_errors.len()
        + outcome.plan.match_failures.len()
        + usize::from(outcome.create_error.is_some())
        + usize::from(outcome.plan.expression_error.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rotator_engine::FilterSummary;

    const DSG: &str = "arn:aws:personalize:us-east-1:123456789012:dataset-group/retail";

    fn rotation() -> RotationConfig {
        RotationConfig::new(
            DSG,
            "f-{{datetime_format(now,'%Y%m%d')}}",
            "EXCLUDE ItemID WHERE Items.added < {{unixtime(now)}}",
        )
    }

    fn read(path: &Path) -> Vec<FilterSummary> {
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_each_pass_rereads_inventory() {
        let path = std::env::temp_dir().join(format!("rotator-rerun-{}.json", std::process::id()));
        std::fs::write(&path, "[]").unwrap();
        let now = Utc.with_ymd_and_hms(2021, 11, 2, 6, 30, 0).unwrap();

        let first = pass(&rotation(), &path, now).await.unwrap();
        assert!(first.created.is_some());

        // Another writer adds a filter between passes
        let mut filters = read(&path);
        let mut manual = filters[0].clone();
        manual.name = "ops-manual".into();
        manual.filter_arn = format!("{}-manual", manual.filter_arn);
        filters.push(manual);
        std::fs::write(&path, serde_json::to_string(&filters).unwrap()).unwrap();

        let second = pass(&rotation(), &path, now).await.unwrap();
        assert_eq!(second.plan.inventory_size, 2);
        assert!(!second.plan.create_requested);

        let names: Vec<String> = read(&path).into_iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["f-20211102", "ops-manual"]);

        let _ = std::fs::remove_file(&path);
    }
}
