use std::sync::Arc;

use crate::distance::DistanceProvider;
use crate::lifecycle::OrderLifecycle;
use crate::observability::metrics::Metrics;
use crate::store::OrderStore;

pub struct AppState {
    pub store: Arc<dyn OrderStore>,
    pub lifecycle: OrderLifecycle,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(store: Arc<dyn OrderStore>, distance: Arc<dyn DistanceProvider>) -> Self {
        Self {
            store: store.clone(),
            lifecycle: OrderLifecycle::new(store, distance),
            metrics: Metrics::new(),
        }
    }
}
