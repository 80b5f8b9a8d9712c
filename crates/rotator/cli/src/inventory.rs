//! Filter inventory backed by a local JSON file

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use rotator_engine::{
    CreateFilterRequest, FilterPage, FilterService, FilterSummary, InMemoryFilterService,
    PageRequest, ServiceResult,
};

use crate::error::{CliError, CliResult};

/// An in-memory service loaded from, and saved back to, a JSON array of
/// filter summaries in the service's wire shape
pub struct FileFilterService {
    path: PathBuf,
    inner: InMemoryFilterService,
}

impl FileFilterService {
    /// Load the inventory; a missing file is an empty inventory
    pub async fn open(path: impl AsRef<Path>) -> CliResult<Self> {
        let path = path.as_ref().to_path_buf();
        let filters: Vec<FilterSummary> = match tokio::fs::read_to_string(&path).await {
            Ok(text) if text.trim().is_empty() => Vec::new(),
            Ok(text) => serde_json::from_str(&text)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "Inventory file not found; starting empty");
                Vec::new()
            }
            Err(e) => return Err(CliError::io(&path, e)),
        };
        tracing::debug!(path = %path.display(), count = filters.len(), "Loaded inventory file");

        Ok(Self {
            path,
            inner: InMemoryFilterService::with_filters(filters),
        })
    }

    /// Write the current inventory back to the file
    pub async fn save(&self) -> CliResult<()> {
        let filters = self.inner.snapshot().await;
        let json = serde_json::to_string_pretty(&filters)?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| CliError::io(&self.path, e))?;
        tracing::debug!(path = %self.path.display(), count = filters.len(), "Saved inventory file");
        Ok(())
    }
}

#[async_trait]
impl FilterService for FileFilterService {
    async fn list_filters(
        &self,
        dataset_group_arn: &str,
        page: PageRequest,
    ) -> ServiceResult<FilterPage> {
        self.inner.list_filters(dataset_group_arn, page).await
    }

    async fn create_filter(&self, request: CreateFilterRequest) -> ServiceResult<String> {
        self.inner.create_filter(request).await
    }

    async fn delete_filter(&self, filter_arn: &str) -> ServiceResult<()> {
        self.inner.delete_filter(filter_arn).await
    }
}
