//! Output formatting utilities

use colored::*;
use rotator_engine::{RotationOutcome, RotationPlan};
use serde::Serialize;

use crate::error::CliResult;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
}

/// Print a structured value; text falls back to pretty JSON
pub fn print_single<T: Serialize>(data: &T, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Text | OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(data)?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yaml::to_string(data)?);
        }
    }
    Ok(())
}

pub fn print_plan(plan: &RotationPlan, format: OutputFormat) -> CliResult<()> {
    if format != OutputFormat::Text {
        return print_single(plan, format);
    }

    println!("Dataset group: {}", plan.dataset_group_arn);
    println!("Now:           {}", plan.now.to_rfc3339());
    println!("Current name:  {}", plan.name_to_create.bold());
    println!("Inventory:     {} filter(s)", plan.inventory_size);
    println!();

    if !plan.create_requested {
        println!("{} {} already exists", "=".dimmed(), plan.name_to_create);
    } else if let Some(expression) = &plan.expression_to_create {
        println!("{} create {}", "+".green(), plan.name_to_create);
        println!("    {}", expression.dimmed());
    } else if let Some(error) = &plan.expression_error {
        print_error(&format!("cannot create {}: {}", plan.name_to_create, error));
    }

    for filter in &plan.delete_candidates {
        println!("{} delete {} ({})", "-".red(), filter.name, filter.status);
    }

    for failure in &plan.match_failures {
        print_warning(&format!(
            "{}: {} ({})",
            failure.filter_name,
            failure.error,
            failure.error.kind()
        ));
    }

    if !plan.create_requested && plan.delete_candidates.is_empty() && plan.match_failures.is_empty()
    {
        print_info("Nothing to do");
    }

    Ok(())
}

pub fn print_outcome(outcome: &RotationOutcome, format: OutputFormat) -> CliResult<()> {
    if format != OutputFormat::Text {
        return print_single(outcome, format);
    }

    if outcome.dry_run {
        print_plan(&outcome.plan, format)?;
        print_info("Dry run: no changes made");
        return Ok(());
    }

    println!("Current name: {}", outcome.plan.name_to_create.bold());
    if let Some(arn) = &outcome.created {
        print_success(&format!("Created {}", arn));
    }
    if let Some(error) = &outcome.create_error {
        print_error(&format!("Create failed: {}", error));
    }
    if let Some(error) = &outcome.plan.expression_error {
        print_error(&format!("Expression template failed: {}", error));
    }
    for arn in &outcome.deleted {
        print_success(&format!("Deleted {}", arn));
    }
    for failure in &outcome.delete_errors {
        print_error(&format!("Delete of {} failed: {}", failure.filter_arn, failure.error));
    }
    for failure in &outcome.plan.match_failures {
        print_warning(&format!("Kept {}: {}", failure.filter_name, failure.error));
    }
    if !outcome.plan.create_requested && outcome.deleted.is_empty() && outcome.is_success() {
        print_info("Nothing to do");
    }

    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue(), message);
}
