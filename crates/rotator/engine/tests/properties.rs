//! Property tests for rotation decisions.

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use rotator_engine::*;

const DSG: &str = "arn:aws:personalize:us-east-1:123456789012:dataset-group/retail";

fn active(name: &str) -> FilterSummary {
    let created = Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap();
    FilterSummary {
        name: name.into(),
        filter_arn: format!("arn:aws:personalize:us-east-1:123456789012:filter/{}", name),
        dataset_group_arn: DSG.into(),
        status: FilterStatus::Active,
        creation_date_time: created,
        last_updated_date_time: created,
        filter_expression: None,
        failure_reason: None,
    }
}

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
        .block_on(future)
}

proptest! {
    #[test]
    fn prop_create_requested_iff_no_exact_name(
        names in proptest::collection::vec("[fF]-2021110[0-9]x?", 0..6),
    ) {
        let inventory: Vec<FilterSummary> = {
            let mut unique = names.clone();
            unique.sort();
            unique.dedup();
            unique.iter().map(|n| active(n)).collect()
        };
        let expected = !inventory.iter().any(|f| f.name == "f-20211102");

        let service = InMemoryFilterService::with_filters(inventory);
        let config = RotationConfig::new(
            DSG,
            "f-{{datetime_format(now,'%Y%m%d')}}",
            "EXCLUDE ItemID WHERE Items.stock = 0",
        );
        let engine = RotationEngine::new(config, service).unwrap();
        let now = Utc.with_ymd_and_hms(2021, 11, 2, 12, 0, 0).unwrap();

        let plan = block_on(engine.plan(now)).unwrap();
        prop_assert_eq!(plan.create_requested, expected);
    }

    #[test]
    fn prop_same_day_passes_agree(first in 0i64..86_400, second in 0i64..86_400) {
        let midnight = Utc.with_ymd_and_hms(2021, 11, 2, 0, 0, 0).unwrap();
        let service = InMemoryFilterService::with_filters(vec![active("f-20211101")]);
        let config = RotationConfig::new(
            DSG,
            "f-{{datetime_format(now,'%Y%m%d')}}",
            "EXCLUDE ItemID WHERE Items.stock = 0",
        )
        .with_delete_template("filter.name < 'f-' + datetime_format(now,'%Y%m%d')");
        let engine = RotationEngine::new(config, service).unwrap();

        let a = block_on(engine.plan(midnight + Duration::seconds(first))).unwrap();
        let b = block_on(engine.plan(midnight + Duration::seconds(second))).unwrap();
        prop_assert_eq!(&a.name_to_create, &b.name_to_create);
        prop_assert_eq!(a.delete_candidates, b.delete_candidates);
    }
}
