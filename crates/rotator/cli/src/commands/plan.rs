//! `plan`: decide against a file inventory without changing it

use std::path::Path;

use rotator_engine::RotationEngine;

use crate::config::CliConfig;
use crate::error::CliResult;
use crate::inventory::FileFilterService;
use crate::output::{print_plan, OutputFormat};

pub async fn execute(
    config: &CliConfig,
    inventory: &Path,
    now: Option<&str>,
    format: OutputFormat,
) -> CliResult<()> {
    let now = super::resolve_now(now)?;
    let service = FileFilterService::open(inventory).await?;
    let engine = RotationEngine::new(config.rotation()?, service)?;

    let plan = engine.plan(now).await?;
    print_plan(&plan, format)
}
