use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, patch};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::order::{Coordinates, OrderSummary, TakeReceipt};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", get(list_orders).post(place_order))
        .route("/orders/:id", patch(take_order))
}

/// Body fields stay untyped so the handlers own every validation message
/// instead of leaking serde rejections to callers.
#[derive(Deserialize)]
pub struct PlaceOrderRequest {
    pub origin: Option<Value>,
    pub destination: Option<Value>,
}

#[derive(Deserialize)]
pub struct TakeOrderRequest {
    pub status: Option<Value>,
}

#[derive(Deserialize)]
pub struct ListOrdersQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

async fn place_order(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<OrderSummary>), AppError> {
    let origin = parse_coordinates(payload.origin, "origin")?;
    let destination = parse_coordinates(payload.destination, "destination")?;

    let started = Instant::now();
    let result = state.lifecycle.place_order(origin, destination).await;

    let outcome = if result.is_ok() { "success" } else { "error" };
    state
        .metrics
        .place_order_latency_seconds
        .with_label_values(&[outcome])
        .observe(started.elapsed().as_secs_f64());
    state
        .metrics
        .orders_placed_total
        .with_label_values(&[outcome])
        .inc();

    let summary = result?;
    state.metrics.unassigned_orders.inc();

    Ok((StatusCode::CREATED, Json(summary)))
}

async fn take_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TakeOrderRequest>,
) -> Result<Json<TakeReceipt>, AppError> {
    let status = parse_status(payload.status)?;

    let result = state.lifecycle.take_order(id, &status).await;

    let outcome = match &result {
        Ok(_) => "success",
        Err(AppError::Conflict(_)) => "conflict",
        Err(_) => "error",
    };
    state
        .metrics
        .orders_taken_total
        .with_label_values(&[outcome])
        .inc();

    let receipt = result?;
    state.metrics.unassigned_orders.dec();

    Ok(Json(receipt))
}

async fn list_orders(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListOrdersQuery>,
) -> Result<Json<Vec<OrderSummary>>, AppError> {
    let page = parse_positive(params.page, "page")?;
    let limit = parse_positive(params.limit, "limit")?;

    let orders = state.lifecycle.list_orders(page, limit).await?;
    Ok(Json(orders))
}

fn parse_coordinates(field: Option<Value>, name: &str) -> Result<Coordinates, AppError> {
    let raw = field.ok_or_else(|| {
        AppError::BadRequest(format!("{name} is a mandatory field in the request body"))
    })?;

    let elements = raw
        .as_array()
        .filter(|elements| elements.len() == 2)
        .ok_or_else(|| coordinate_shape_error(name))?;
    let latitude = elements[0]
        .as_str()
        .ok_or_else(|| coordinate_shape_error(name))?;
    let longitude = elements[1]
        .as_str()
        .ok_or_else(|| coordinate_shape_error(name))?;

    if !valid_latitude(latitude) || !valid_longitude(longitude) {
        return Err(AppError::BadRequest(format!(
            "invalid latitude or longitude for {name} in the request body"
        )));
    }

    Ok(Coordinates::new(latitude.to_string(), longitude.to_string()))
}

fn coordinate_shape_error(name: &str) -> AppError {
    AppError::BadRequest(format!(
        "{name} should be an array of 2 string elements in the request body"
    ))
}

fn valid_latitude(raw: &str) -> bool {
    matches!(raw.parse::<f64>(), Ok(value) if (-90.0..=90.0).contains(&value))
}

fn valid_longitude(raw: &str) -> bool {
    matches!(raw.parse::<f64>(), Ok(value) if (-180.0..=180.0).contains(&value))
}

fn parse_status(field: Option<Value>) -> Result<String, AppError> {
    let raw = field.ok_or_else(|| {
        AppError::BadRequest("status is a mandatory field in the request body".to_string())
    })?;

    match raw {
        Value::String(status) => Ok(status),
        _ => Err(AppError::BadRequest(
            "status in the request body should be string".to_string(),
        )),
    }
}

fn parse_positive(raw: Option<String>, name: &str) -> Result<usize, AppError> {
    let raw = raw.ok_or_else(|| {
        AppError::BadRequest(format!(
            "{name} is a mandatory query parameter in the request"
        ))
    })?;

    let mut digits = raw.bytes();
    let well_formed =
        matches!(digits.next(), Some(b'1'..=b'9')) && digits.all(|byte| byte.is_ascii_digit());
    if !well_formed {
        return Err(positive_integer_error(name));
    }

    raw.parse::<usize>()
        .map_err(|_| positive_integer_error(name))
}

fn positive_integer_error(name: &str) -> AppError {
    AppError::BadRequest(format!(
        "{name} should be a positive integer (and without leading zero) in the request"
    ))
}
