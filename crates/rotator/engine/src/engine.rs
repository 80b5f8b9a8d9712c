//! The rotation decision engine

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rotator_expr::{render, Expression};
use tracing::Instrument;

use crate::config::RotationConfig;
use crate::context::{creation_context, match_context};
use crate::error::{RotationError, RotationResult, ServiceError};
use crate::filter::{CreateFilterRequest, FilterSummary, PageRequest};
use crate::plan::{DeleteFailure, MatchFailure, RotationOutcome, RotationPlan};
use crate::service::FilterService;

/// Decides and applies filter rotation for one dataset group.
///
/// Holds no state between passes: every pass derives its decisions from
/// a fresh inventory snapshot, so running it more often than needed is
/// harmless.
pub struct RotationEngine<S> {
    config: RotationConfig,
    service: S,
}

impl<S: FilterService> RotationEngine<S> {
    /// Create an engine; fails if the configuration is invalid
    pub fn new(config: RotationConfig, service: S) -> RotationResult<Self> {
        config.validate()?;
        Ok(Self { config, service })
    }

    pub fn config(&self) -> &RotationConfig {
        &self.config
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// Decide what to create and delete at `now`, without acting
    pub async fn plan(&self, now: DateTime<Utc>) -> RotationResult<RotationPlan> {
        let span = self.span(now);
        self.decide(now).instrument(span).await
    }

    /// Apply a plan: create first, then delete every candidate.
    ///
    /// Each call stands alone; a failure is recorded and the remaining
    /// calls still run.
    pub async fn apply(&self, plan: &RotationPlan) -> RotationOutcome {
        let span = self.span(plan.now);
        self.act(plan).instrument(span).await
    }

    /// Plan and, unless configured as a dry run, apply
    pub async fn run_at(&self, now: DateTime<Utc>) -> RotationResult<RotationOutcome> {
        let span = self.span(now);
        async {
            let plan = self.decide(now).await?;
            if self.config.dry_run {
                tracing::info!("Dry run; no filters created or deleted");
                return Ok(RotationOutcome::planned(plan));
            }
            Ok(self.act(&plan).await)
        }
        .instrument(span)
        .await
    }

    /// Run a pass at the current instant, read once
    pub async fn run(&self) -> RotationResult<RotationOutcome> {
        self.run_at(Utc::now()).await
    }

    fn span(&self, now: DateTime<Utc>) -> tracing::Span {
        tracing::info_span!(
            "rotation",
            dataset_group = %self.config.dataset_group_arn,
            now = %now.to_rfc3339(),
        )
    }

    async fn decide(&self, now: DateTime<Utc>) -> RotationResult<RotationPlan> {
        let creation = creation_context(now);

        let name = render(&self.config.current_filter_name_template, &creation)
            .map_err(RotationError::CurrentName)?;
        tracing::info!(name = %name, "Resolved current filter name");

        let inventory = self.inventory().await?;

        // Exact, case-sensitive match only
        let exists = inventory.iter().any(|f| f.name == name);

        let mut expression_to_create = None;
        let mut expression_error = None;
        if exists {
            tracing::info!(name = %name, "Current filter already exists; skipping creation");
        } else {
            match render(&self.config.current_filter_expression_template, &creation) {
                Ok(expression) => {
                    tracing::info!(name = %name, expression = %expression, "Current filter does not exist; will create");
                    expression_to_create = Some(expression);
                }
                Err(e) => {
                    tracing::warn!(name = %name, error = %e, "Failed to resolve current filter expression");
                    expression_error = Some(e);
                }
            }
        }

        let (delete_candidates, match_failures) = match self.config.delete_match_template() {
            Some(template) => self.select_deletions(template, &inventory, &name, now),
            None => {
                tracing::debug!("No delete match template configured; skipping delete pass");
                (Vec::new(), Vec::new())
            }
        };

        Ok(RotationPlan {
            now,
            dataset_group_arn: self.config.dataset_group_arn.clone(),
            name_to_create: name,
            create_requested: !exists,
            expression_to_create,
            expression_error,
            inventory_size: inventory.len(),
            delete_candidates,
            match_failures,
        })
    }

    /// Read every page of the dataset group's filters
    async fn inventory(&self) -> RotationResult<Vec<FilterSummary>> {
        let mut filters = Vec::new();
        let mut seen = HashSet::new();
        let mut page = PageRequest::first(self.config.page_size);

        loop {
            let result = self
                .service
                .list_filters(&self.config.dataset_group_arn, page)
                .await
                .map_err(RotationError::Inventory)?;
            tracing::debug!(count = result.filters.len(), "Fetched inventory page");
            filters.extend(result.filters);

            match result.next_token {
                Some(token) if !seen.insert(token.clone()) => {
                    return Err(RotationError::Inventory(ServiceError::Unavailable(format!(
                        "Filter listing repeated page token '{}'",
                        token
                    ))));
                }
                Some(token) => page = PageRequest::next(self.config.page_size, token),
                None => break,
            }
        }

        tracing::info!(count = filters.len(), "Loaded filter inventory");
        Ok(filters)
    }

    fn select_deletions(
        &self,
        template: &str,
        inventory: &[FilterSummary],
        current_name: &str,
        now: DateTime<Utc>,
    ) -> (Vec<FilterSummary>, Vec<MatchFailure>) {
        let mut candidates = Vec::new();
        let mut failures = Vec::new();

        // A malformed template fails every entry alike
        let expression = Expression::parse(template);

        for filter in inventory {
            if self.config.protect_current_filter && filter.name == current_name {
                tracing::debug!(filter = %filter.name, "Current filter is protected from deletion");
                continue;
            }

            let matched = expression
                .as_ref()
                .map_err(|e| e.clone())
                .and_then(|expr| expr.evaluate_bool(&match_context(filter, now)));

            match matched {
                Ok(true) => {
                    tracing::info!(filter = %filter.filter_arn, "Filter matched the delete template");
                    candidates.push(filter.clone());
                }
                Ok(false) => {
                    tracing::debug!(filter = %filter.name, "Filter did not match the delete template");
                }
                Err(error) => {
                    tracing::warn!(filter = %filter.name, error = %error, "Delete match evaluation failed; keeping filter");
                    failures.push(MatchFailure {
                        filter_name: filter.name.clone(),
                        filter_arn: filter.filter_arn.clone(),
                        error,
                    });
                }
            }
        }

        (candidates, failures)
    }

    async fn act(&self, plan: &RotationPlan) -> RotationOutcome {
        let mut outcome = RotationOutcome::planned(plan.clone());
        outcome.dry_run = false;

        if plan.create_requested {
            if let Some(expression) = &plan.expression_to_create {
                let request = CreateFilterRequest {
                    name: plan.name_to_create.clone(),
                    dataset_group_arn: plan.dataset_group_arn.clone(),
                    filter_expression: expression.clone(),
                };
                match self.service.create_filter(request).await {
                    Ok(arn) => {
                        tracing::info!(filter = %arn, "Created filter");
                        outcome.created = Some(arn);
                    }
                    Err(e) => {
                        tracing::warn!(name = %plan.name_to_create, error = %e, "Failed to create filter");
                        outcome.create_error = Some(e);
                    }
                }
            }
        }

        for filter in &plan.delete_candidates {
            match self.service.delete_filter(&filter.filter_arn).await {
                Ok(()) => {
                    tracing::info!(filter = %filter.filter_arn, "Deleted filter");
                    outcome.deleted.push(filter.filter_arn.clone());
                }
                Err(e) => {
                    tracing::warn!(filter = %filter.filter_arn, error = %e, "Failed to delete filter");
                    outcome.delete_errors.push(DeleteFailure {
                        filter_arn: filter.filter_arn.clone(),
                        error: e,
                    });
                }
            }
        }

        outcome
    }
}
