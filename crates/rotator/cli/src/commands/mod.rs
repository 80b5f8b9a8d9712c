//! CLI command implementations

pub mod eval;
pub mod plan;
pub mod render;
pub mod run;

use chrono::{DateTime, Utc};
use rotator_expr::functions::parse_datetime;

use crate::error::{CliError, CliResult};

/// The instant to render against: `--now` if given, else the clock
pub fn resolve_now(now: Option<&str>) -> CliResult<DateTime<Utc>> {
    match now {
        Some(text) => parse_datetime(text)
            .map_err(|_| CliError::InvalidArgument(format!("--now: cannot parse '{}'", text))),
        None => Ok(Utc::now()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_resolve_now() {
        assert_eq!(
            resolve_now(Some("2021-11-02T10:00:00Z")).unwrap(),
            Utc.with_ymd_and_hms(2021, 11, 2, 10, 0, 0).unwrap()
        );
        assert_eq!(
            resolve_now(Some("2021-11-02")).unwrap(),
            Utc.with_ymd_and_hms(2021, 11, 2, 0, 0, 0).unwrap()
        );
        assert!(matches!(
            resolve_now(Some("yesterday")),
            Err(CliError::InvalidArgument(_))
        ));
    }
}
