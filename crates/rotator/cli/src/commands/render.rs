//! `render`: resolve a template against the creation context

use rotator_engine::context::creation_context;
use rotator_expr::Template;

use crate::error::CliResult;
use crate::output::{print_single, OutputFormat};

pub fn execute(template: &str, now: Option<&str>, format: OutputFormat) -> CliResult<()> {
    let now = super::resolve_now(now)?;
    let rendered = Template::parse(template)?.render(&creation_context(now))?;
    tracing::debug!(template = %template, rendered = %rendered, "Rendered template");

    match format {
        OutputFormat::Text => println!("{}", rendered),
        _ => print_single(
            &serde_json::json!({
                "template": template,
                "now": now,
                "rendered": rendered,
            }),
            format,
        )?,
    }
    Ok(())
}
