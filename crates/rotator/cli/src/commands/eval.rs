//! `eval`: evaluate one expression, optionally against a filter record

use std::path::Path;

use rotator_engine::context::{creation_context, match_context};
use rotator_engine::FilterSummary;
use rotator_expr::Expression;

use crate::error::{CliError, CliResult};
use crate::output::{print_single, OutputFormat};

pub async fn execute(
    expression: &str,
    now: Option<&str>,
    filter: Option<&Path>,
    format: OutputFormat,
) -> CliResult<()> {
    let now = super::resolve_now(now)?;

    let context = match filter {
        Some(path) => {
            let text = tokio::fs::read_to_string(path)
                .await
                .map_err(|e| CliError::io(path, e))?;
            let summary: FilterSummary = serde_json::from_str(&text)?;
            match_context(&summary, now)
        }
        None => creation_context(now),
    };

    let value = Expression::parse(expression)?.evaluate(&context)?;

    match format {
        OutputFormat::Text => println!("{}", value),
        _ => print_single(
            &serde_json::json!({
                "expression": expression,
                "type": value.type_name(),
                "value": value,
            }),
            format,
        )?,
    }
    Ok(())
}
