//! End-to-end rotation passes against the in-memory filter service.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use rotator_engine::*;
use rotator_expr::ExprError;

const DSG: &str = "arn:aws:personalize:us-east-1:123456789012:dataset-group/retail";
const NAME_TEMPLATE: &str = "f-{{datetime_format(now,'%Y%m%d')}}";
const EXPRESSION_TEMPLATE: &str =
    "INCLUDE ItemID WHERE Items.creation_timestamp > {{unixtime(now - timedelta_days(1))}}";
const P_DELETE_TEMPLATE: &str = "starts_with(filter.name,'P-') and int(end(filter.name,8)) < int(datetime_format(now - timedelta_days(1),'%Y%m%d'))";

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 6, 30, 0).unwrap()
}

fn summary(name: &str, status: FilterStatus) -> FilterSummary {
    let created = Utc.with_ymd_and_hms(2021, 10, 1, 0, 0, 0).unwrap();
    FilterSummary {
        name: name.into(),
        filter_arn: format!("arn:aws:personalize:us-east-1:123456789012:filter/{}", name),
        dataset_group_arn: DSG.into(),
        status,
        creation_date_time: created,
        last_updated_date_time: created,
        filter_expression: Some("EXCLUDE ItemID WHERE Items.stock = 0".into()),
        failure_reason: None,
    }
}

fn active(name: &str) -> FilterSummary {
    summary(name, FilterStatus::Active)
}

fn config() -> RotationConfig {
    RotationConfig::new(DSG, NAME_TEMPLATE, EXPRESSION_TEMPLATE)
}

fn engine(
    config: RotationConfig,
    service: &Arc<InMemoryFilterService>,
) -> RotationEngine<Arc<InMemoryFilterService>> {
    RotationEngine::new(config, Arc::clone(service)).unwrap()
}

async fn names(service: &InMemoryFilterService) -> Vec<String> {
    service.snapshot().await.into_iter().map(|f| f.name).collect()
}

// ---------------------------------------------------------------------------
// Creation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn creates_missing_filter_then_is_idempotent() {
    let service = Arc::new(InMemoryFilterService::new());
    let engine = engine(config(), &service);

    let first = engine.run_at(at(2021, 11, 2)).await.unwrap();
    assert!(first.is_success());
    assert_eq!(first.plan.name_to_create, "f-20211102");
    assert_eq!(
        first.created.as_deref(),
        Some("arn:aws:personalize:us-east-1:123456789012:filter/f-20211102")
    );

    let created = service.snapshot().await;
    assert_eq!(created.len(), 1);
    assert_eq!(
        created[0].filter_expression.as_deref(),
        Some("INCLUDE ItemID WHERE Items.creation_timestamp > 1635748200")
    );

    // Later the same day: the filter exists, whatever its status
    let second = engine
        .run_at(Utc.with_ymd_and_hms(2021, 11, 2, 23, 59, 59).unwrap())
        .await
        .unwrap();
    assert!(!second.plan.create_requested);
    assert_eq!(second.plan.expression_to_create, None);
    assert_eq!(second.created, None);
    assert_eq!(names(&service).await, vec!["f-20211102"]);
}

#[tokio::test]
async fn existence_check_is_exact_and_case_sensitive() {
    let service = Arc::new(InMemoryFilterService::with_filters(vec![
        active("Filter-X-20211102"),
        active("f-20211102x"),
        active("f-2021110"),
    ]));
    let engine = engine(config(), &service);

    let plan = engine.plan(at(2021, 11, 2)).await.unwrap();
    assert!(plan.create_requested);
    assert_eq!(plan.inventory_size, 3);
}

#[tokio::test]
async fn create_failure_is_reported() {
    let service = Arc::new(
        InMemoryFilterService::with_filters(vec![summary("g-1", FilterStatus::CreatePending)])
            .with_pending_limit(1),
    );
    let engine = engine(config(), &service);

    let outcome = engine.run_at(at(2021, 11, 2)).await.unwrap();
    assert!(matches!(
        outcome.create_error,
        Some(ServiceError::LimitExceeded(_))
    ));
    assert!(!outcome.is_success());
}

#[tokio::test]
async fn expression_failure_does_not_block_deletes() {
    let service = Arc::new(InMemoryFilterService::with_filters(vec![active("P-20211001")]));
    let mut config = config().with_delete_template(P_DELETE_TEMPLATE);
    config.current_filter_expression_template = "x > {{undefined_name}}".into();
    let engine = engine(config, &service);

    let outcome = engine.run_at(at(2021, 11, 3)).await.unwrap();
    assert_eq!(
        outcome.plan.expression_error,
        Some(ExprError::Name {
            name: "undefined_name".into()
        })
    );
    assert!(outcome.plan.create_requested);
    assert!(!outcome.plan.will_create());
    assert_eq!(outcome.created, None);
    assert_eq!(outcome.deleted.len(), 1);
    assert!(service.snapshot().await.is_empty());
}

// ---------------------------------------------------------------------------
// Deletion
// ---------------------------------------------------------------------------

#[tokio::test]
async fn deletes_only_stale_filters() {
    let service = Arc::new(InMemoryFilterService::with_filters(vec![
        active("P-20211001"),
        active("P-20211103"),
        active("unrelated"),
    ]));
    let config = RotationConfig::new(DSG, "P-{{datetime_format(now,'%Y%m%d')}}", EXPRESSION_TEMPLATE)
        .with_delete_template(P_DELETE_TEMPLATE);
    let engine = engine(config, &service);

    let outcome = engine.run_at(at(2021, 11, 3)).await.unwrap();
    assert!(outcome.is_success());
    assert!(!outcome.plan.create_requested);
    let candidates: Vec<&str> = outcome
        .plan
        .delete_candidates
        .iter()
        .map(|f| f.name.as_str())
        .collect();
    assert_eq!(candidates, vec!["P-20211001"]);
    assert_eq!(names(&service).await, vec!["P-20211103", "unrelated"]);
}

#[tokio::test]
async fn unbound_name_fails_only_that_entry() {
    let mut failed = summary("old-broken", FilterStatus::CreateFailed);
    failed.failure_reason = Some("Invalid expression".into());
    let service = Arc::new(InMemoryFilterService::with_filters(vec![
        active("old-1"),
        failed,
        active("old-2"),
        active("new-1"),
    ]));
    let template = "(filter.status == 'CREATE FAILED' and filter.nonexistent_field == 'x') or starts_with(filter.name, 'old-')";
    let engine = engine(config().with_delete_template(template), &service);

    let plan = engine.plan(at(2021, 11, 2)).await.unwrap();
    let candidates: Vec<&str> = plan.delete_candidates.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(candidates, vec!["old-1", "old-2"]);
    assert_eq!(plan.match_failures.len(), 1);
    assert_eq!(plan.match_failures[0].filter_name, "old-broken");
    assert_eq!(
        plan.match_failures[0].error,
        ExprError::Name {
            name: "filter.nonexistent_field".into()
        }
    );
}

#[tokio::test]
async fn non_boolean_match_is_a_per_entry_failure() {
    let service = Arc::new(InMemoryFilterService::with_filters(vec![active("a"), active("b")]));
    let engine = engine(config().with_delete_template("filter.name"), &service);

    let plan = engine.plan(at(2021, 11, 2)).await.unwrap();
    assert!(plan.delete_candidates.is_empty());
    assert_eq!(plan.match_failures.len(), 2);
    assert!(matches!(
        &plan.match_failures[0].error,
        ExprError::Evaluation { message, .. } if message.starts_with("expected a boolean")
    ));
}

#[tokio::test]
async fn malformed_delete_template_keeps_every_filter() {
    let service = Arc::new(InMemoryFilterService::with_filters(vec![active("a"), active("b")]));
    let engine = engine(config().with_delete_template("starts_with(filter.name,"), &service);

    let outcome = engine.run_at(at(2021, 11, 2)).await.unwrap();
    assert_eq!(outcome.plan.match_failures.len(), 2);
    assert!(outcome.deleted.is_empty());
    assert!(!outcome.is_success());
    // Creation is independent of the delete pass
    assert!(outcome.created.is_some());
}

#[tokio::test]
async fn overly_deep_delete_template_fails_each_entry() {
    let deep = format!("filter.name == 'a'{}", " or False".repeat(400));
    let service = Arc::new(InMemoryFilterService::with_filters(vec![active("a"), active("b")]));
    let engine = engine(config().with_delete_template(deep), &service);

    let plan = engine.plan(at(2021, 11, 2)).await.unwrap();
    assert!(plan.delete_candidates.is_empty());
    assert_eq!(plan.match_failures.len(), 2);
    assert!(matches!(
        &plan.match_failures[0].error,
        ExprError::Syntax { message, .. } if message.contains("nested deeper")
    ));
}

#[tokio::test]
async fn newly_created_filter_is_not_a_delete_candidate() {
    let service = Arc::new(InMemoryFilterService::with_filters(vec![active("f-20211101")]));
    let engine = engine(
        config().with_delete_template("starts_with(filter.name, 'f-')"),
        &service,
    );

    let outcome = engine.run_at(at(2021, 11, 2)).await.unwrap();
    assert_eq!(outcome.plan.delete_candidates.len(), 1);
    assert_eq!(names(&service).await, vec!["f-20211102"]);
}

#[tokio::test]
async fn current_filter_is_a_candidate_unless_protected() {
    let inventory = vec![active("f-20211101"), active("f-20211102")];
    let template = "starts_with(filter.name, 'f-')";

    let service = Arc::new(InMemoryFilterService::with_filters(inventory.clone()));
    let plan = engine(config().with_delete_template(template), &service)
        .plan(at(2021, 11, 2))
        .await
        .unwrap();
    assert_eq!(plan.delete_candidates.len(), 2);

    let service = Arc::new(InMemoryFilterService::with_filters(inventory));
    let plan = engine(
        config()
            .with_delete_template(template)
            .with_protect_current_filter(true),
        &service,
    )
    .plan(at(2021, 11, 2))
    .await
    .unwrap();
    let candidates: Vec<&str> = plan.delete_candidates.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(candidates, vec!["f-20211101"]);
}

#[tokio::test]
async fn delete_failure_does_not_stop_remaining_deletes() {
    let service = Arc::new(InMemoryFilterService::with_filters(vec![
        active("old-1"),
        active("old-2"),
        active("old-3"),
    ]));
    let engine = engine(
        config().with_delete_template("starts_with(filter.name, 'old-')"),
        &service,
    );

    let plan = engine.plan(at(2021, 11, 2)).await.unwrap();
    // A concurrent pass removes one candidate first
    service
        .delete_filter(&plan.delete_candidates[1].filter_arn)
        .await
        .unwrap();

    let outcome = engine.apply(&plan).await;
    assert_eq!(outcome.deleted.len(), 2);
    assert_eq!(outcome.delete_errors.len(), 1);
    assert!(matches!(
        outcome.delete_errors[0].error,
        ServiceError::NotFound(_)
    ));
    assert!(outcome.created.is_some());
    assert_eq!(names(&service).await, vec!["f-20211102"]);
}

#[tokio::test]
async fn deletion_can_use_timestamps() {
    let mut recent = active("g-recent");
    recent.creation_date_time = at(2021, 11, 1);
    let service = Arc::new(InMemoryFilterService::with_filters(vec![
        active("g-old"),
        recent,
    ]));
    let template = "starts_with(filter.name, 'g-') and filter.creationDateTime < now - timedelta_days(7)";
    let engine = engine(config().with_delete_template(template), &service);

    let plan = engine.plan(at(2021, 11, 2)).await.unwrap();
    let candidates: Vec<&str> = plan.delete_candidates.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(candidates, vec!["g-old"]);
}

// ---------------------------------------------------------------------------
// Whole-pass behaviour
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unterminated_placeholder_aborts_the_pass() {
    let service = Arc::new(InMemoryFilterService::with_filters(vec![active("old-1")]));
    let config = RotationConfig::new(DSG, "f-{{foo", EXPRESSION_TEMPLATE)
        .with_delete_template("True");
    let engine = engine(config, &service);

    let err = engine.run_at(at(2021, 11, 2)).await.unwrap_err();
    assert!(matches!(
        err,
        RotationError::CurrentName(ExprError::Template { .. })
    ));
    assert_eq!(names(&service).await, vec!["old-1"]);
}

#[tokio::test]
async fn inventory_is_read_to_exhaustion() {
    let filters: Vec<FilterSummary> = (1..=7).map(|i| active(&format!("old-{}", i))).collect();
    let service = Arc::new(InMemoryFilterService::with_filters(filters));
    let engine = engine(
        config()
            .with_page_size(2)
            .with_delete_template("starts_with(filter.name, 'old-')"),
        &service,
    );

    let plan = engine.plan(at(2021, 11, 2)).await.unwrap();
    assert_eq!(plan.inventory_size, 7);
    assert_eq!(plan.delete_candidates.len(), 7);
}

/// Lists one page forever, always pointing at the same next page
struct LoopingService;

#[async_trait::async_trait]
impl FilterService for LoopingService {
    async fn list_filters(
        &self,
        _dataset_group_arn: &str,
        _page: PageRequest,
    ) -> ServiceResult<FilterPage> {
        Ok(FilterPage {
            filters: vec![active("old-1")],
            next_token: Some("again".into()),
        })
    }

    async fn create_filter(&self, _request: CreateFilterRequest) -> ServiceResult<String> {
        Err(ServiceError::Unavailable("read-only".into()))
    }

    async fn delete_filter(&self, _filter_arn: &str) -> ServiceResult<()> {
        Err(ServiceError::Unavailable("read-only".into()))
    }
}

#[tokio::test]
async fn repeated_page_token_stops_the_pass() {
    let engine = RotationEngine::new(config(), LoopingService).unwrap();

    match engine.plan(at(2021, 11, 2)).await {
        Err(RotationError::Inventory(ServiceError::Unavailable(message))) => {
            assert!(message.contains("again"))
        }
        other => panic!("unexpected {:?}", other.map(|plan| plan.inventory_size)),
    }
}

#[tokio::test]
async fn dry_run_changes_nothing() {
    let service = Arc::new(InMemoryFilterService::with_filters(vec![active("old-1")]));
    let engine = engine(
        config()
            .with_delete_template("True")
            .with_dry_run(true),
        &service,
    );

    let outcome = engine.run_at(at(2021, 11, 2)).await.unwrap();
    assert!(outcome.dry_run);
    assert!(outcome.plan.will_create());
    assert_eq!(outcome.plan.delete_candidates.len(), 1);
    assert_eq!(outcome.created, None);
    assert_eq!(names(&service).await, vec!["old-1"]);
}

#[tokio::test]
async fn invalid_config_is_rejected() {
    let service = Arc::new(InMemoryFilterService::new());
    let result = RotationEngine::new(RotationConfig::new("", NAME_TEMPLATE, "x"), service);
    assert!(matches!(result, Err(RotationError::Config(_))));
}

#[tokio::test]
async fn other_dataset_groups_are_ignored() {
    let mut foreign = active("old-foreign");
    foreign.dataset_group_arn = "arn:aws:personalize:us-east-1:123456789012:dataset-group/other".into();
    let service = Arc::new(InMemoryFilterService::with_filters(vec![foreign]));
    let engine = engine(config().with_delete_template("True"), &service);

    let outcome = engine.run_at(at(2021, 11, 2)).await.unwrap();
    assert_eq!(outcome.plan.inventory_size, 0);
    assert!(outcome.deleted.is_empty());
    assert_eq!(service.snapshot().await.len(), 2);
}
