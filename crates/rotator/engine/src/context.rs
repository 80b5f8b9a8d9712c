//! Evaluation contexts for the two kinds of render

use chrono::{DateTime, Utc};
use rotator_expr::{Context, Value};

use crate::filter::FilterSummary;

/// Prefix under which a filter's fields are bound
pub const FILTER_PREFIX: &str = "filter";

/// Context for the name and expression templates: only `now`
pub fn creation_context(now: DateTime<Utc>) -> Context {
    Context::new(now)
}

/// Context for the delete-match expression over one inventory entry
pub fn match_context(filter: &FilterSummary, now: DateTime<Utc>) -> Context {
    let fields: [(&str, Value); 9] = [
        ("name", filter.name.as_str().into()),
        ("arn", filter.filter_arn.as_str().into()),
        ("filterArn", filter.filter_arn.as_str().into()),
        ("datasetGroupArn", filter.dataset_group_arn.as_str().into()),
        ("status", filter.status.as_str().into()),
        ("creationDateTime", filter.creation_date_time.into()),
        ("lastUpdatedDateTime", filter.last_updated_date_time.into()),
        ("filterExpression", filter.filter_expression.clone().into()),
        ("failureReason", filter.failure_reason.clone().into()),
    ];
    Context::new(now).with_record(FILTER_PREFIX, fields)
}
