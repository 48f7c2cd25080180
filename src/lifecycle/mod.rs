use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::distance::DistanceProvider;
use crate::error::AppError;
use crate::lock::KeyedLock;
use crate::models::order::{Coordinates, NewOrder, OrderStatus, OrderSummary, TakeReceipt};
use crate::store::OrderStore;

/// Orchestrates the order lifecycle over injected collaborators. The store
/// is the sole source of truth; nothing is cached across calls.
pub struct OrderLifecycle {
    store: Arc<dyn OrderStore>,
    distance: Arc<dyn DistanceProvider>,
    take_locks: KeyedLock<Uuid>,
}

impl OrderLifecycle {
    pub fn new(store: Arc<dyn OrderStore>, distance: Arc<dyn DistanceProvider>) -> Self {
        Self {
            store,
            distance,
            take_locks: KeyedLock::new(),
        }
    }

    pub async fn place_order(
        &self,
        origin: Coordinates,
        destination: Coordinates,
    ) -> Result<OrderSummary, AppError> {
        let distance = self
            .distance
            .distance_meters(&origin, &destination)
            .await
            .map_err(|err| {
                error!(error = %err, "distance lookup failed");
                AppError::Upstream(err.to_string())
            })?;

        let now = Utc::now();
        let record = self
            .store
            .create(NewOrder {
                origin,
                destination,
                distance,
                status: OrderStatus::Unassigned,
                created_at: now,
                updated_at: now,
            })
            .await
            .map_err(|err| AppError::Internal(err.to_string()))?;

        info!(order_id = %record.id, distance = record.distance, "order placed");
        Ok(OrderSummary::from(&record))
    }

    /// The one legal transition, serialized per order id: of N concurrent
    /// takes on an unassigned order exactly one succeeds, the rest observe
    /// the already-taken record.
    pub async fn take_order(
        &self,
        id: Uuid,
        requested_status: &str,
    ) -> Result<TakeReceipt, AppError> {
        if requested_status != "TAKEN" {
            return Err(AppError::InvalidTransition(
                "{status} must be 'TAKEN'".to_string(),
            ));
        }

        self.take_locks
            .acquire(id, move || async move {
                let mut order = self
                    .store
                    .find_by_id(id)
                    .await
                    .map_err(|err| AppError::Internal(err.to_string()))?
                    .ok_or_else(|| AppError::NotFound(format!("order (id:{id}) not found")))?;

                if order.status == OrderStatus::Taken {
                    warn!(order_id = %id, "rejected take of an already taken order");
                    return Err(AppError::Conflict(format!(
                        "fail to take order (id:{id}), which had been taken already"
                    )));
                }

                order.status = OrderStatus::Taken;
                order.updated_at = Utc::now();
                self.store
                    .save(&order)
                    .await
                    .map_err(|err| AppError::Internal(err.to_string()))?;

                info!(order_id = %id, "order taken");
                Ok(TakeReceipt::success())
            })
            .await
    }

    /// `page` and `limit` arrive validated as positive by the HTTP layer.
    pub async fn list_orders(
        &self,
        page: usize,
        limit: usize,
    ) -> Result<Vec<OrderSummary>, AppError> {
        let skip = page.saturating_sub(1).saturating_mul(limit);

        let (records, total) = self
            .store
            .find_and_count(skip, limit)
            .await
            .map_err(|err| AppError::Internal(err.to_string()))?;

        if total == 0 || records.is_empty() {
            return Ok(Vec::new());
        }

        Ok(records.iter().map(OrderSummary::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use uuid::Uuid;

    use super::OrderLifecycle;
    use crate::distance::{DistanceError, DistanceProvider};
    use crate::error::AppError;
    use crate::models::order::{Coordinates, NewOrder, OrderRecord, OrderStatus};
    use crate::store::memory::MemoryOrderStore;
    use crate::store::{OrderStore, StoreError};

    struct FixedDistance(u32);

    #[async_trait]
    impl DistanceProvider for FixedDistance {
        async fn distance_meters(
            &self,
            _origin: &Coordinates,
            _destination: &Coordinates,
        ) -> Result<u32, DistanceError> {
            Ok(self.0)
        }
    }

    struct FailingDistance;

    #[async_trait]
    impl DistanceProvider for FailingDistance {
        async fn distance_meters(
            &self,
            _origin: &Coordinates,
            _destination: &Coordinates,
        ) -> Result<u32, DistanceError> {
            Err(DistanceError::Transport("distance api down".to_string()))
        }
    }

    /// Any call is a test failure.
    struct UnusedStore;

    #[async_trait]
    impl OrderStore for UnusedStore {
        async fn create(&self, _order: NewOrder) -> Result<OrderRecord, StoreError> {
            panic!("store must not be touched");
        }

        async fn find_by_id(&self, _id: Uuid) -> Result<Option<OrderRecord>, StoreError> {
            panic!("store must not be touched");
        }

        async fn save(&self, _order: &OrderRecord) -> Result<(), StoreError> {
            panic!("store must not be touched");
        }

        async fn find_and_count(
            &self,
            _skip: usize,
            _limit: usize,
        ) -> Result<(Vec<OrderRecord>, usize), StoreError> {
            panic!("store must not be touched");
        }
    }

    struct FailingStore;

    #[async_trait]
    impl OrderStore for FailingStore {
        async fn create(&self, _order: NewOrder) -> Result<OrderRecord, StoreError> {
            Err(StoreError::Backend("store offline".to_string()))
        }

        async fn find_by_id(&self, _id: Uuid) -> Result<Option<OrderRecord>, StoreError> {
            Err(StoreError::Backend("store offline".to_string()))
        }

        async fn save(&self, _order: &OrderRecord) -> Result<(), StoreError> {
            Err(StoreError::Backend("store offline".to_string()))
        }

        async fn find_and_count(
            &self,
            _skip: usize,
            _limit: usize,
        ) -> Result<(Vec<OrderRecord>, usize), StoreError> {
            Err(StoreError::Backend("store offline".to_string()))
        }
    }

    /// Creates and reads succeed; saves fail.
    struct SaveFailingStore {
        inner: MemoryOrderStore,
    }

    #[async_trait]
    impl OrderStore for SaveFailingStore {
        async fn create(&self, order: NewOrder) -> Result<OrderRecord, StoreError> {
            self.inner.create(order).await
        }

        async fn find_by_id(&self, id: Uuid) -> Result<Option<OrderRecord>, StoreError> {
            self.inner.find_by_id(id).await
        }

        async fn save(&self, _order: &OrderRecord) -> Result<(), StoreError> {
            Err(StoreError::Backend("write refused".to_string()))
        }

        async fn find_and_count(
            &self,
            skip: usize,
            limit: usize,
        ) -> Result<(Vec<OrderRecord>, usize), StoreError> {
            self.inner.find_and_count(skip, limit).await
        }
    }

    fn coordinates() -> (Coordinates, Coordinates) {
        (
            Coordinates::new("40.66".to_string(), "-73.89".to_string()),
            Coordinates::new("40.66".to_string(), "-73.99".to_string()),
        )
    }

    fn lifecycle_over(store: Arc<dyn OrderStore>, meters: u32) -> OrderLifecycle {
        OrderLifecycle::new(store, Arc::new(FixedDistance(meters)))
    }

    #[tokio::test]
    async fn place_order_persists_unassigned_with_distance() {
        let store = Arc::new(MemoryOrderStore::new());
        let lifecycle = lifecycle_over(store.clone(), 9790);
        let (origin, destination) = coordinates();

        let summary = lifecycle.place_order(origin, destination).await.unwrap();
        assert_eq!(summary.distance, 9790);
        assert_eq!(summary.status, OrderStatus::Unassigned);

        let record = store.find_by_id(summary.id).await.unwrap().unwrap();
        assert_eq!(record.status, OrderStatus::Unassigned);
        assert_eq!(record.created_at, record.updated_at);
    }

    #[tokio::test]
    async fn placed_order_shows_up_in_listing_unchanged() {
        let lifecycle = lifecycle_over(Arc::new(MemoryOrderStore::new()), 9790);
        let (origin, destination) = coordinates();

        let placed = lifecycle.place_order(origin, destination).await.unwrap();
        let listed = lifecycle.list_orders(1, 10).await.unwrap();

        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, placed.id);
        assert_eq!(listed[0].distance, 9790);
        assert_eq!(listed[0].status, OrderStatus::Unassigned);
    }

    #[tokio::test]
    async fn place_order_propagates_upstream_failure() {
        let lifecycle = OrderLifecycle::new(Arc::new(UnusedStore), Arc::new(FailingDistance));
        let (origin, destination) = coordinates();

        let err = lifecycle.place_order(origin, destination).await.unwrap_err();
        match err {
            AppError::Upstream(msg) => assert_eq!(msg, "distance api down"),
            other => panic!("expected upstream error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn place_order_maps_store_failure_to_internal() {
        let lifecycle = OrderLifecycle::new(Arc::new(FailingStore), Arc::new(FixedDistance(1)));
        let (origin, destination) = coordinates();

        let err = lifecycle.place_order(origin, destination).await.unwrap_err();
        match err {
            AppError::Internal(msg) => assert_eq!(msg, "store offline"),
            other => panic!("expected internal error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn take_order_rejects_other_statuses_without_touching_store() {
        let lifecycle = OrderLifecycle::new(Arc::new(UnusedStore), Arc::new(FixedDistance(1)));

        let err = lifecycle
            .take_order(Uuid::new_v4(), "NOT TAKEN")
            .await
            .unwrap_err();
        match err {
            AppError::InvalidTransition(msg) => assert_eq!(msg, "{status} must be 'TAKEN'"),
            other => panic!("expected invalid transition, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn take_order_maps_find_failure_to_internal() {
        let lifecycle = OrderLifecycle::new(Arc::new(FailingStore), Arc::new(FixedDistance(1)));

        let err = lifecycle
            .take_order(Uuid::new_v4(), "TAKEN")
            .await
            .unwrap_err();
        match err {
            AppError::Internal(msg) => assert_eq!(msg, "store offline"),
            other => panic!("expected internal error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn take_order_maps_save_failure_to_internal() {
        let store = Arc::new(SaveFailingStore {
            inner: MemoryOrderStore::new(),
        });
        let lifecycle = OrderLifecycle::new(store, Arc::new(FixedDistance(9790)));
        let (origin, destination) = coordinates();
        let placed = lifecycle.place_order(origin, destination).await.unwrap();

        let err = lifecycle.take_order(placed.id, "TAKEN").await.unwrap_err();
        match err {
            AppError::Internal(msg) => assert_eq!(msg, "write refused"),
            other => panic!("expected internal error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn take_order_unknown_id_is_not_found() {
        let lifecycle = lifecycle_over(Arc::new(MemoryOrderStore::new()), 1);
        let id = Uuid::new_v4();

        let err = lifecycle.take_order(id, "TAKEN").await.unwrap_err();
        match err {
            AppError::NotFound(msg) => assert_eq!(msg, format!("order (id:{id}) not found")),
            other => panic!("expected not found, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn take_order_transitions_exactly_once() {
        let store = Arc::new(MemoryOrderStore::new());
        let lifecycle = lifecycle_over(store.clone(), 9790);
        let (origin, destination) = coordinates();
        let placed = lifecycle.place_order(origin, destination).await.unwrap();

        tokio::time::sleep(Duration::from_millis(5)).await;
        let receipt = lifecycle.take_order(placed.id, "TAKEN").await.unwrap();
        assert_eq!(receipt.status, "SUCCESS");

        let record = store.find_by_id(placed.id).await.unwrap().unwrap();
        assert_eq!(record.status, OrderStatus::Taken);
        assert!(record.updated_at > record.created_at);

        let err = lifecycle.take_order(placed.id, "TAKEN").await.unwrap_err();
        match err {
            AppError::Conflict(msg) => assert_eq!(
                msg,
                format!(
                    "fail to take order (id:{}), which had been taken already",
                    placed.id
                )
            ),
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn concurrent_takes_yield_exactly_one_success() {
        let lifecycle = Arc::new(lifecycle_over(Arc::new(MemoryOrderStore::new()), 9790));
        let (origin, destination) = coordinates();
        let placed = lifecycle.place_order(origin, destination).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..5 {
            let lifecycle = lifecycle.clone();
            let id = placed.id;
            handles.push(tokio::spawn(
                async move { lifecycle.take_order(id, "TAKEN").await },
            ));
        }

        let mut successes = 0;
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(receipt) => {
                    assert_eq!(receipt.status, "SUCCESS");
                    successes += 1;
                }
                Err(AppError::Conflict(_)) => conflicts += 1,
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(conflicts, 4);
    }

    #[tokio::test]
    async fn list_orders_pages_in_creation_order() {
        let lifecycle = lifecycle_over(Arc::new(MemoryOrderStore::new()), 100);
        let mut placed = Vec::new();
        for _ in 0..5 {
            let (origin, destination) = coordinates();
            placed.push(lifecycle.place_order(origin, destination).await.unwrap().id);
        }

        let first_page = lifecycle.list_orders(1, 2).await.unwrap();
        assert_eq!(first_page.len(), 2);
        assert_eq!(first_page[0].id, placed[0]);
        assert_eq!(first_page[1].id, placed[1]);

        let last_page = lifecycle.list_orders(3, 2).await.unwrap();
        assert_eq!(last_page.len(), 1);
        assert_eq!(last_page[0].id, placed[4]);
    }

    #[tokio::test]
    async fn list_orders_beyond_range_is_empty_not_an_error() {
        let lifecycle = lifecycle_over(Arc::new(MemoryOrderStore::new()), 100);
        assert!(lifecycle.list_orders(1, 10).await.unwrap().is_empty());

        let (origin, destination) = coordinates();
        lifecycle.place_order(origin, destination).await.unwrap();
        assert!(lifecycle.list_orders(9999, 9999).await.unwrap().is_empty());
    }
}
