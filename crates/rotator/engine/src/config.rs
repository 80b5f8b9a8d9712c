//! Rotation configuration

use serde::{Deserialize, Serialize};

use crate::error::{RotationError, RotationResult};
use crate::filter::MAX_PAGE_SIZE;

/// Templates and switches for one rotation target.
///
/// Field names follow the scheduler event payload (`datasetGroupArn`,
/// `currentFilterNameTemplate`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RotationConfig {
    /// Dataset group owning the rotated filters
    pub dataset_group_arn: String,

    /// Template for the name of the filter that should exist right now
    pub current_filter_name_template: String,

    /// Template for that filter's expression, rendered only when creating
    pub current_filter_expression_template: String,

    /// Boolean expression selecting filters to delete; empty disables deletion
    #[serde(default)]
    pub delete_filter_match_template: Option<String>,

    /// Never select the filter named by the current name for deletion
    #[serde(default)]
    pub protect_current_filter: bool,

    /// Inventory page size
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Plan only, emit no create or delete calls
    #[serde(default)]
    pub dry_run: bool,
}

fn default_page_size() -> usize {
    MAX_PAGE_SIZE
}

impl RotationConfig {
    pub fn new(
        dataset_group_arn: impl Into<String>,
        name_template: impl Into<String>,
        expression_template: impl Into<String>,
    ) -> Self {
        Self {
            dataset_group_arn: dataset_group_arn.into(),
            current_filter_name_template: name_template.into(),
            current_filter_expression_template: expression_template.into(),
            delete_filter_match_template: None,
            protect_current_filter: false,
            page_size: default_page_size(),
            dry_run: false,
        }
    }

    pub fn with_delete_template(mut self, template: impl Into<String>) -> Self {
        self.delete_filter_match_template = Some(template.into());
        self
    }

    pub fn with_protect_current_filter(mut self, protect: bool) -> Self {
        self.protect_current_filter = protect;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// The delete-match expression, if deletion is enabled
    pub fn delete_match_template(&self) -> Option<&str> {
        self.delete_filter_match_template
            .as_deref()
            .filter(|t| !t.trim().is_empty())
    }

    pub fn validate(&self) -> RotationResult<()> {
        let required = [
            ("datasetGroupArn", &self.dataset_group_arn),
            ("currentFilterNameTemplate", &self.current_filter_name_template),
            (
                "currentFilterExpressionTemplate",
                &self.current_filter_expression_template,
            ),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(RotationError::Config(format!("{} must not be empty", field)));
            }
        }

        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(RotationError::Config(format!(
                "pageSize must be between 1 and {}, got {}",
                MAX_PAGE_SIZE, self.page_size
            )));
        }

        Ok(())
    }
}
