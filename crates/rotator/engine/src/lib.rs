//! Filter rotation decision engine.
//!
//! One pass resolves the current filter name from a template, takes a
//! snapshot of the dataset group's filters, creates the current filter if
//! no filter has exactly that name, and selects stale filters for deletion
//! by evaluating a boolean match expression against each snapshot entry.
//!
//! The backing service is reached through [`FilterService`];
//! [`InMemoryFilterService`] is provided for local runs and tests.

pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod filter;
pub mod memory;
pub mod plan;
pub mod service;

pub use config::RotationConfig;
pub use engine::RotationEngine;
pub use error::{RotationError, RotationResult, ServiceError, ServiceResult};
pub use filter::{CreateFilterRequest, FilterPage, FilterStatus, FilterSummary, PageRequest};
pub use memory::InMemoryFilterService;
pub use plan::{DeleteFailure, MatchFailure, RotationOutcome, RotationPlan};
pub use service::FilterService;
