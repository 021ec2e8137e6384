use crate::domain::flow::Flow;
use crate::domain::ids::{FlowId, StepId};
use crate::domain::record::ExecutionRecord;
use crate::CoreError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Zero-based page request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// Page index, starting at 0
    pub page: usize,
    /// Items per page, must be positive
    pub size: usize,
}

impl Pagination {
    /// Create a page request
    pub fn new(page: usize, size: usize) -> Self {
        Self { page, size }
    }

    /// Reject a zero page size
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.size == 0 {
            return Err(CoreError::ValidationError(
                "page size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Number of items to skip
    pub fn offset(&self) -> usize {
        self.page.saturating_mul(self.size)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self { page: 0, size: 20 }
    }
}

/// One page of results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Items on this page
    pub items: Vec<T>,
    /// Items across all pages
    pub total_items: usize,
    /// Number of pages of `size` needed to hold every item
    pub total_pages: usize,
}

/// Read side of flow storage
#[async_trait]
pub trait FlowReaderRepository: Send + Sync {
    /// Find a flow by ID
    async fn get_by_id(&self, id: &FlowId) -> Result<Option<Flow>, CoreError>;

    /// List one page of flows
    async fn get_all(&self, pagination: &Pagination) -> Result<Vec<Flow>, CoreError>;

    /// Total number of stored flows
    async fn count(&self) -> Result<usize, CoreError>;
}

/// Write side of flow storage
#[async_trait]
pub trait FlowWriterRepository: Send + Sync {
    /// Store a flow
    async fn save(&self, flow: &Flow) -> Result<(), CoreError>;
}

/// Storage for per-step execution records.
///
/// Records are superseded per step id: `get_by_step_id` returns the latest one.
#[async_trait]
pub trait StatusRepository: Send + Sync {
    /// Store a record
    async fn save(&self, record: ExecutionRecord) -> Result<(), CoreError>;

    /// Latest record for a step
    async fn get_by_step_id(&self, step_id: &StepId) -> Result<Option<ExecutionRecord>, CoreError>;

    /// Latest record of every step
    async fn get_all(&self) -> Result<Vec<ExecutionRecord>, CoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_offset() {
        assert_eq!(Pagination::new(0, 10).offset(), 0);
        assert_eq!(Pagination::new(3, 10).offset(), 30);
    }

    #[test]
    fn test_zero_size_rejected() {
        assert!(Pagination::new(0, 0).validate().is_err());
        assert!(Pagination::default().validate().is_ok());
    }
}
