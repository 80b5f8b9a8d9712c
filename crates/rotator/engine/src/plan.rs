//! Rotation decisions and their outcomes

use chrono::{DateTime, Utc};
use rotator_expr::ExprError;
use serde::Serialize;

use crate::error::ServiceError;
use crate::filter::FilterSummary;

/// A delete-match evaluation that failed for one inventory entry
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchFailure {
    pub filter_name: String,
    pub filter_arn: String,
    pub error: ExprError,
}

/// A delete call that failed for one candidate
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteFailure {
    pub filter_arn: String,
    pub error: ServiceError,
}

/// Output of one decision pass
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RotationPlan {
    /// Instant every template in this pass was rendered against
    pub now: DateTime<Utc>,
    pub dataset_group_arn: String,
    /// The resolved current filter name
    pub name_to_create: String,
    /// False when a filter with exactly that name already exists
    pub create_requested: bool,
    pub expression_to_create: Option<String>,
    pub expression_error: Option<ExprError>,
    /// Number of filters in the inventory snapshot
    pub inventory_size: usize,
    /// In inventory order
    pub delete_candidates: Vec<FilterSummary>,
    pub match_failures: Vec<MatchFailure>,
}

impl RotationPlan {
    /// A create call will be made when applied
    pub fn will_create(&self) -> bool {
        self.create_requested && self.expression_to_create.is_some()
    }
}

/// What happened when a plan was applied
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RotationOutcome {
    pub plan: RotationPlan,
    /// True when no create or delete call was attempted
    pub dry_run: bool,
    /// ARN of the filter created in this pass
    pub created: Option<String>,
    pub create_error: Option<ServiceError>,
    /// ARNs deleted in this pass, in candidate order
    pub deleted: Vec<String>,
    pub delete_errors: Vec<DeleteFailure>,
}

impl RotationOutcome {
    /// Outcome of a plan whose actions were not applied
    pub fn planned(plan: RotationPlan) -> Self {
        Self {
            plan,
            dry_run: true,
            created: None,
            create_error: None,
            deleted: Vec::new(),
            delete_errors: Vec::new(),
        }
    }

    /// No failure of any kind was recorded
    pub fn is_success(&self) -> bool {
        self.create_error.is_none()
            && self.delete_errors.is_empty()
            && self.plan.match_failures.is_empty()
            && self.plan.expression_error.is_none()
    }
}
