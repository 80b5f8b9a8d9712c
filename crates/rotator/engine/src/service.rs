//! Filter service boundary

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ServiceResult;
use crate::filter::{CreateFilterRequest, FilterPage, PageRequest};

/// The recommendation service's filter API
#[async_trait]
pub trait FilterService: Send + Sync {
    /// List one page of filters owned by a dataset group
    async fn list_filters(
        &self,
        dataset_group_arn: &str,
        page: PageRequest,
    ) -> ServiceResult<FilterPage>;

    /// Request a new filter; returns its ARN. Provisioning is asynchronous.
    async fn create_filter(&self, request: CreateFilterRequest) -> ServiceResult<String>;

    /// Delete a filter by ARN
    async fn delete_filter(&self, filter_arn: &str) -> ServiceResult<()>;
}

#[async_trait]
impl<T: FilterService + ?Sized> FilterService for Arc<T> {
    async fn list_filters(
        &self,
        dataset_group_arn: &str,
        page: PageRequest,
    ) -> ServiceResult<FilterPage> {
        (**self).list_filters(dataset_group_arn, page).await
    }

    async fn create_filter(&self, request: CreateFilterRequest) -> ServiceResult<String> {
        (**self).create_filter(request).await
    }

    async fn delete_filter(&self, filter_arn: &str) -> ServiceResult<()> {
        (**self).delete_filter(filter_arn).await
    }
}
