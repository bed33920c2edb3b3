//! Order intake endpoints.
//!
//! Requests reach these handlers through the auth gateway, which injects the
//! caller's identity as `x-user-uuid`.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use common::{OrderId, PartId, UserId};
use domain::{Money, Order, PaymentMethod};
use gateway::HEADER_USER_UUID;
use saga::OrderSaga;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub saga: OrderSaga,
}

// -- Request types --

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub part_uuids: Vec<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
}

#[derive(Deserialize)]
pub struct PayOrderRequest {
    pub payment_method: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderCreatedResponse {
    pub order_uuid: String,
    /// In cents.
    pub total_price: Money,
}

#[derive(Serialize)]
pub struct OrderPaidResponse {
    pub transaction_uuid: String,
}

#[derive(Serialize)]
pub struct OrderResponse {
    pub order_uuid: String,
    pub user_uuid: String,
    pub part_uuids: Vec<String>,
    pub total_price: Money,
    pub transaction_uuid: Option<String>,
    pub payment_method: Option<String>,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            order_uuid: order.id.to_string(),
            user_uuid: order.user_id.to_string(),
            part_uuids: order.part_ids.iter().map(ToString::to_string).collect(),
            total_price: order.total_price,
            transaction_uuid: order.transaction_id.map(|id| id.to_string()),
            payment_method: order.payment_method.map(|m| m.as_str().to_string()),
            status: order.status.as_str().to_string(),
            created_at: order.created_at.to_rfc3339(),
            updated_at: order.updated_at.to_rfc3339(),
        }
    }
}

// -- Helpers --

fn authenticated_user(headers: &HeaderMap) -> Result<UserId, ApiError> {
    headers
        .get(HEADER_USER_UUID)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(UserId::from)
        .ok_or_else(|| ApiError::Unauthorized("Missing user identity".to_string()))
}

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    OrderId::parse(id).map_err(|e| ApiError::BadRequest(format!("Invalid order id: {e}")))
}

fn parse_payment_method(method: &str) -> Result<PaymentMethod, ApiError> {
    method
        .parse()
        .map_err(|e: domain::OrderError| ApiError::BadRequest(e.to_string()))
}

// -- Handlers --

/// POST /orders — price the parts and create an order awaiting payment.
#[tracing::instrument(skip(state, headers, req))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderCreatedResponse>), ApiError> {
    let user_id = authenticated_user(&headers)?;
    let payment_method = req
        .payment_method
        .as_deref()
        .map(parse_payment_method)
        .transpose()?;
    let part_ids = req.part_uuids.into_iter().map(PartId::from).collect();

    let order = state
        .saga
        .create_order(user_id, part_ids, payment_method)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(OrderCreatedResponse {
            order_uuid: order.id.to_string(),
            total_price: order.total_price,
        }),
    ))
}

/// POST /orders/{id}/pay — charge the order.
#[tracing::instrument(skip(state, headers, req))]
pub async fn pay(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<PayOrderRequest>,
) -> Result<Json<OrderPaidResponse>, ApiError> {
    authenticated_user(&headers)?;
    let order_id = parse_order_id(&id)?;
    let payment_method = parse_payment_method(&req.payment_method)?;

    let transaction_id = state.saga.pay_order(order_id, payment_method).await?;

    Ok(Json(OrderPaidResponse {
        transaction_uuid: transaction_id.to_string(),
    }))
}

/// POST /orders/{id}/cancel — cancel an order awaiting payment.
#[tracing::instrument(skip(state, headers))]
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    authenticated_user(&headers)?;
    let order_id = parse_order_id(&id)?;
    state.saga.cancel_order(order_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /orders/{id} — fetch an order.
#[tracing::instrument(skip(state, headers))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    authenticated_user(&headers)?;
    let order_id = parse_order_id(&id)?;
    let order = state.saga.get_order(order_id).await?;
    Ok(Json(order.into()))
}
