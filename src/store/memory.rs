use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::order::{NewOrder, OrderRecord};
use crate::store::{OrderStore, StoreError};

/// Single-process in-memory store. Records live in a DashMap; a separate
/// creation log keeps `find_and_count` pages in creation order, which the
/// map's own iteration would not guarantee.
pub struct MemoryOrderStore {
    records: DashMap<Uuid, OrderRecord>,
    creation_log: RwLock<Vec<Uuid>>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            creation_log: RwLock::new(Vec::new()),
        }
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn create(&self, order: NewOrder) -> Result<OrderRecord, StoreError> {
        let record = OrderRecord {
            id: Uuid::new_v4(),
            origin: order.origin,
            destination: order.destination,
            distance: order.distance,
            status: order.status,
            created_at: order.created_at,
            updated_at: order.updated_at,
        };

        // Insert into the map before logging the id, so any reader holding
        // the log can resolve every logged id.
        let mut log = self.creation_log.write().await;
        self.records.insert(record.id, record.clone());
        log.push(record.id);

        Ok(record)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<OrderRecord>, StoreError> {
        Ok(self.records.get(&id).map(|entry| entry.value().clone()))
    }

    async fn save(&self, order: &OrderRecord) -> Result<(), StoreError> {
        match self.records.get_mut(&order.id) {
            Some(mut existing) => {
                *existing = order.clone();
                Ok(())
            }
            None => Err(StoreError::Backend(format!(
                "order {} does not exist",
                order.id
            ))),
        }
    }

    async fn find_and_count(
        &self,
        skip: usize,
        limit: usize,
    ) -> Result<(Vec<OrderRecord>, usize), StoreError> {
        let log = self.creation_log.read().await;
        let total = log.len();

        let page = log
            .iter()
            .skip(skip)
            .take(limit)
            .filter_map(|id| self.records.get(id).map(|entry| entry.value().clone()))
            .collect();

        Ok((page, total))
    }
}
