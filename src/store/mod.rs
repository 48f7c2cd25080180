use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::order::{NewOrder, OrderRecord};

pub mod memory;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    Backend(String),
}

/// The persistence seam: single-record reads and writes plus skip/limit
/// pagination. Nothing here assumes multi-record transactions; atomicity
/// stops at one record.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists a draft and returns the record with its assigned id.
    async fn create(&self, order: NewOrder) -> Result<OrderRecord, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<OrderRecord>, StoreError>;

    /// Overwrites the record with the same id; an unknown id is a backend fault.
    async fn save(&self, order: &OrderRecord) -> Result<(), StoreError>;

    /// Returns up to `limit` records after skipping `skip`, in creation
    /// order, together with the total record count.
    async fn find_and_count(
        &self,
        skip: usize,
        limit: usize,
    ) -> Result<(Vec<OrderRecord>, usize), StoreError>;
}
