//! Filter inventory records and service request/response shapes.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Largest page the service will return
pub const MAX_PAGE_SIZE: usize = 100;

/// Lifecycle status of a filter, as reported by the service
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FilterStatus {
    CreatePending,
    CreateInProgress,
    Active,
    CreateFailed,
    DeletePending,
    DeleteInProgress,
    /// A status this crate does not know, kept verbatim
    Other(String),
}

impl FilterStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::CreatePending => "CREATE PENDING",
            Self::CreateInProgress => "CREATE IN_PROGRESS",
            Self::Active => "ACTIVE",
            Self::CreateFailed => "CREATE FAILED",
            Self::DeletePending => "DELETE PENDING",
            Self::DeleteInProgress => "DELETE IN_PROGRESS",
            Self::Other(s) => s,
        }
    }

    /// Still being provisioned; counts against the pending-filter limit
    pub fn is_pending_creation(&self) -> bool {
        matches!(self, Self::CreatePending | Self::CreateInProgress)
    }
}

impl From<String> for FilterStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "CREATE PENDING" => Self::CreatePending,
            "CREATE IN_PROGRESS" => Self::CreateInProgress,
            "ACTIVE" => Self::Active,
            "CREATE FAILED" => Self::CreateFailed,
            "DELETE PENDING" => Self::DeletePending,
            "DELETE IN_PROGRESS" => Self::DeleteInProgress,
            _ => Self::Other(s),
        }
    }
}

impl From<FilterStatus> for String {
    fn from(status: FilterStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for FilterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of one existing filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSummary {
    pub name: String,
    pub filter_arn: String,
    pub dataset_group_arn: String,
    pub status: FilterStatus,
    pub creation_date_time: DateTime<Utc>,
    pub last_updated_date_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_expression: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

/// One page of an inventory listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub max_results: usize,
    pub next_token: Option<String>,
}

impl PageRequest {
    pub fn first(max_results: usize) -> Self {
        Self {
            max_results,
            next_token: None,
        }
    }

    pub fn next(max_results: usize, token: String) -> Self {
        Self {
            max_results,
            next_token: Some(token),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterPage {
    pub filters: Vec<FilterSummary>,
    /// Present when more filters remain
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFilterRequest {
    pub name: String,
    pub dataset_group_arn: String,
    pub filter_expression: String,
}
