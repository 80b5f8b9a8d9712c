//! In-memory filter service for development and testing

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::error::{ServiceError, ServiceResult};
use crate::filter::{
    CreateFilterRequest, FilterPage, FilterStatus, FilterSummary, PageRequest, MAX_PAGE_SIZE,
};
use crate::service::FilterService;

/// Filters kept in insertion order, behind a shared lock
#[derive(Debug, Clone, Default)]
pub struct InMemoryFilterService {
    filters: Arc<RwLock<Vec<FilterSummary>>>,
    pending_limit: Option<usize>,
}

impl InMemoryFilterService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing inventory
    pub fn with_filters(filters: Vec<FilterSummary>) -> Self {
        Self {
            filters: Arc::new(RwLock::new(filters)),
            pending_limit: None,
        }
    }

    /// Cap the number of filters per dataset group that may be pending
    /// creation at once
    pub fn with_pending_limit(mut self, limit: usize) -> Self {
        self.pending_limit = Some(limit);
        self
    }

    /// Current inventory, all dataset groups
    pub async fn snapshot(&self) -> Vec<FilterSummary> {
        self.filters.read().await.clone()
    }

    /// Overwrite a filter's status, e.g. to simulate provisioning finishing
    pub async fn set_status(&self, filter_arn: &str, status: FilterStatus) -> ServiceResult<()> {
        let mut filters = self.filters.write().await;
        let filter = filters
            .iter_mut()
            .find(|f| f.filter_arn == filter_arn)
            .ok_or_else(|| ServiceError::NotFound(filter_arn.to_string()))?;
        filter.status = status;
        filter.last_updated_date_time = Utc::now();
        Ok(())
    }
}

/// ARN of a filter named `name` in the given dataset group
pub fn filter_arn(dataset_group_arn: &str, name: &str) -> String {
    match dataset_group_arn.split_once(":dataset-group/") {
        Some((prefix, _)) => format!("{}:filter/{}", prefix, name),
        None => format!("{}/filter/{}", dataset_group_arn, name),
    }
}

#[async_trait]
impl FilterService for InMemoryFilterService {
    async fn list_filters(
        &self,
        dataset_group_arn: &str,
        page: PageRequest,
    ) -> ServiceResult<FilterPage> {
        if page.max_results == 0 || page.max_results > MAX_PAGE_SIZE {
            return Err(ServiceError::InvalidInput(format!(
                "maxResults must be between 1 and {}, got {}",
                MAX_PAGE_SIZE, page.max_results
            )));
        }

        let offset = match &page.next_token {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| ServiceError::InvalidInput(format!("Invalid nextToken: {}", token)))?,
            None => 0,
        };

        let filters = self.filters.read().await;
        let owned: Vec<&FilterSummary> = filters
            .iter()
            .filter(|f| f.dataset_group_arn == dataset_group_arn)
            .collect();

        let end = offset.saturating_add(page.max_results).min(owned.len());
        let page_filters = owned
            .get(offset..end)
            .map(|s| s.iter().map(|f| (*f).clone()).collect())
            .unwrap_or_default();
        let next_token = (end < owned.len()).then(|| end.to_string());

        Ok(FilterPage {
            filters: page_filters,
            next_token,
        })
    }

    async fn create_filter(&self, request: CreateFilterRequest) -> ServiceResult<String> {
        if request.name.is_empty() {
            return Err(ServiceError::InvalidInput("Filter name must not be empty".into()));
        }
        if request.filter_expression.trim().is_empty() {
            return Err(ServiceError::InvalidInput(
                "Filter expression must not be empty".into(),
            ));
        }

        let mut filters = self.filters.write().await;

        if filters
            .iter()
            .any(|f| f.dataset_group_arn == request.dataset_group_arn && f.name == request.name)
        {
            return Err(ServiceError::InvalidInput(format!(
                "Filter already exists: {}",
                request.name
            )));
        }

        if let Some(limit) = self.pending_limit {
            let pending = filters
                .iter()
                .filter(|f| {
                    f.dataset_group_arn == request.dataset_group_arn
                        && f.status.is_pending_creation()
                })
                .count();
            if pending >= limit {
                return Err(ServiceError::LimitExceeded(format!(
                    "{} filters are already pending creation",
                    pending
                )));
            }
        }

        let now = Utc::now();
        let arn = filter_arn(&request.dataset_group_arn, &request.name);
        filters.push(FilterSummary {
            name: request.name,
            filter_arn: arn.clone(),
            dataset_group_arn: request.dataset_group_arn,
            status: FilterStatus::CreatePending,
            creation_date_time: now,
            last_updated_date_time: now,
            filter_expression: Some(request.filter_expression),
            failure_reason: None,
        });

        Ok(arn)
    }

    async fn delete_filter(&self, filter_arn: &str) -> ServiceResult<()> {
        let mut filters = self.filters.write().await;
        let before = filters.len();
        filters.retain(|f| f.filter_arn != filter_arn);
        if filters.len() == before {
            return Err(ServiceError::NotFound(filter_arn.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DSG: &str = "arn:aws:personalize:us-east-1:123456789012:dataset-group/retail";

    fn request(name: &str) -> CreateFilterRequest {
        CreateFilterRequest {
            name: name.into(),
            dataset_group_arn: DSG.into(),
            filter_expression: "EXCLUDE ItemID WHERE Items.stock = 0".into(),
        }
    }

    #[test]
    fn test_filter_arn() {
        assert_eq!(
            filter_arn(DSG, "f-20211102"),
            "arn:aws:personalize:us-east-1:123456789012:filter/f-20211102"
        );
        assert_eq!(filter_arn("local", "x"), "local/filter/x");
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let service = InMemoryFilterService::new();
        let arn = service.create_filter(request("a")).await.unwrap();

        let page = service.list_filters(DSG, PageRequest::first(10)).await.unwrap();
        assert_eq!(page.filters.len(), 1);
        assert_eq!(page.filters[0].filter_arn, arn);
        assert_eq!(page.filters[0].status, FilterStatus::CreatePending);
        assert_eq!(page.next_token, None);

        let other = service
            .list_filters("arn:other", PageRequest::first(10))
            .await
            .unwrap();
        assert!(other.filters.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_name_rejected() {
        let service = InMemoryFilterService::new();
        service.create_filter(request("a")).await.unwrap();
        assert!(matches!(
            service.create_filter(request("a")).await,
            Err(ServiceError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_pending_limit() {
        let service = InMemoryFilterService::new().with_pending_limit(1);
        let first = service.create_filter(request("a")).await.unwrap();
        assert!(matches!(
            service.create_filter(request("b")).await,
            Err(ServiceError::LimitExceeded(_))
        ));

        service.set_status(&first, FilterStatus::Active).await.unwrap();
        assert!(service.create_filter(request("b")).await.is_ok());
    }

    #[tokio::test]
    async fn test_pending_limit_is_per_dataset_group() {
        let service = InMemoryFilterService::new().with_pending_limit(1);
        service.create_filter(request("a")).await.unwrap();

        let other = CreateFilterRequest {
            dataset_group_arn: "arn:aws:personalize:us-east-1:123456789012:dataset-group/media"
                .into(),
            ..request("a")
        };
        assert!(service.create_filter(other).await.is_ok());
        assert!(matches!(
            service.create_filter(request("b")).await,
            Err(ServiceError::LimitExceeded(_))
        ));
    }

    #[tokio::test]
    async fn test_paging() {
        let service = InMemoryFilterService::new();
        for i in 0..5 {
            service.create_filter(request(&format!("f-{}", i))).await.unwrap();
        }

        let mut names = Vec::new();
        let mut page = PageRequest::first(2);
        loop {
            let result = service.list_filters(DSG, page).await.unwrap();
            names.extend(result.filters.into_iter().map(|f| f.name));
            match result.next_token {
                Some(token) => page = PageRequest::next(2, token),
                None => break,
            }
        }
        assert_eq!(names, vec!["f-0", "f-1", "f-2", "f-3", "f-4"]);
    }

    #[tokio::test]
    async fn test_invalid_page_size() {
        let service = InMemoryFilterService::new();
        assert!(service.list_filters(DSG, PageRequest::first(0)).await.is_err());
        assert!(service.list_filters(DSG, PageRequest::first(101)).await.is_err());
    }

    #[tokio::test]
    async fn test_delete() {
        let service = InMemoryFilterService::new();
        let arn = service.create_filter(request("a")).await.unwrap();
        service.delete_filter(&arn).await.unwrap();
        assert!(service.snapshot().await.is_empty());
        assert_eq!(
            service.delete_filter(&arn).await,
            Err(ServiceError::NotFound(arn))
        );
    }
}
