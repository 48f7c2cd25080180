use prometheus::{Encoder, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub orders_placed_total: IntCounterVec,
    pub orders_taken_total: IntCounterVec,
    pub unassigned_orders: IntGauge,
    pub place_order_latency_seconds: HistogramVec,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let orders_placed_total = IntCounterVec::new(
            Opts::new("orders_placed_total", "Total placed orders by outcome"),
            &["outcome"],
        )
        .expect("valid orders_placed_total metric");

        let orders_taken_total = IntCounterVec::new(
            Opts::new("orders_taken_total", "Total take attempts by outcome"),
            &["outcome"],
        )
        .expect("valid orders_taken_total metric");

        let unassigned_orders =
            IntGauge::new("unassigned_orders", "Current number of unassigned orders")
                .expect("valid unassigned_orders metric");

        let place_order_latency_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "place_order_latency_seconds",
                "Latency of order placement in seconds",
            ),
            &["outcome"],
        )
        .expect("valid place_order_latency_seconds metric");

        registry
            .register(Box::new(orders_placed_total.clone()))
            .expect("register orders_placed_total");
        registry
            .register(Box::new(orders_taken_total.clone()))
            .expect("register orders_taken_total");
        registry
            .register(Box::new(unassigned_orders.clone()))
            .expect("register unassigned_orders");
        registry
            .register(Box::new(place_order_latency_seconds.clone()))
            .expect("register place_order_latency_seconds");

        Self {
            registry,
            orders_placed_total,
            orders_taken_total,
            unassigned_orders,
            place_order_latency_seconds,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}
