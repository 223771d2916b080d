use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::orders::{
        CancellationOutcome, CheckoutRequest, CheckoutResponse, GuestCancelRequest,
        GuestCheckoutRequest, OrderList, OrderWithItems, PayOrderRequest, TrackOrderQuery,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, CartOwner},
    response::ApiResponse,
    routes::params::OrderListQuery,
    services::order_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders))
        .route("/checkout", post(checkout))
        .route("/guest-checkout", post(guest_checkout))
        .route("/track", get(track_order))
        .route("/track/cancel", post(guest_cancel))
        .route("/{id}", get(get_order))
        .route("/{id}/cancel", post(cancel_order))
        .route("/{id}/pay", post(pay_order))
}

#[utoipa::path(
    get,
    path = "/api/orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("status" = Option<String>, Query, description = "Filter by status"),
        ("sort_order" = Option<String>, Query, description = "asc, desc")
    ),
    responses(
        (status = 200, description = "List the caller's orders", body = ApiResponse<OrderList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = order_service::list_orders(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/orders/checkout",
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "Place an order from the current cart", body = ApiResponse<CheckoutResponse>),
        (status = 400, description = "Empty cart, stock or coupon problem"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn checkout(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CheckoutRequest>,
) -> AppResult<Json<ApiResponse<CheckoutResponse>>> {
    let resp = order_service::checkout(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/orders/guest-checkout",
    request_body = GuestCheckoutRequest,
    responses(
        (status = 200, description = "Place a guest order from the session cart", body = ApiResponse<CheckoutResponse>),
        (status = 400, description = "Empty cart, stock or coupon problem"),
    ),
    tag = "Orders"
)]
pub async fn guest_checkout(
    State(state): State<AppState>,
    owner: CartOwner,
    Json(payload): Json<GuestCheckoutRequest>,
) -> AppResult<Json<ApiResponse<CheckoutResponse>>> {
    let session_id = match owner {
        CartOwner::Guest(session_id) => session_id,
        CartOwner::Customer(_) => {
            return Err(AppError::Validation(
                "signed-in customers use /orders/checkout".into(),
            ));
        }
    };
    let resp = order_service::guest_checkout(&state, session_id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders/track",
    params(
        ("confirmation_number" = String, Query, description = "Order confirmation number"),
        ("email" = String, Query, description = "Contact email on the order")
    ),
    responses(
        (status = 200, description = "Track an order without signing in", body = ApiResponse<OrderWithItems>),
        (status = 403, description = "Email does not match"),
        (status = 404, description = "Not Found"),
    ),
    tag = "Orders"
)]
pub async fn track_order(
    State(state): State<AppState>,
    Query(query): Query<TrackOrderQuery>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    let resp = order_service::track_order(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/orders/track/cancel",
    request_body = GuestCancelRequest,
    responses(
        (status = 200, description = "Cancel a guest order", body = ApiResponse<CancellationOutcome>),
        (status = 400, description = "No longer cancellable"),
        (status = 403, description = "Credentials do not match"),
    ),
    tag = "Orders"
)]
pub async fn guest_cancel(
    State(state): State<AppState>,
    Json(payload): Json<GuestCancelRequest>,
) -> AppResult<Json<ApiResponse<CancellationOutcome>>> {
    let resp = order_service::guest_cancel(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(get, path = "/api/orders/{id}", tag = "Orders")]
pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    let resp = order_service::get_order(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/orders/{id}/cancel",
    responses(
        (status = 200, description = "Cancel own order", body = ApiResponse<CancellationOutcome>),
        (status = 400, description = "No longer cancellable"),
        (status = 403, description = "Not your order"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn cancel_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<CancellationOutcome>>> {
    let resp = order_service::cancel_order(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/orders/{id}/pay",
    request_body = PayOrderRequest,
    responses(
        (status = 200, description = "Record a gateway-verified payment", body = ApiResponse<OrderWithItems>),
        (status = 400, description = "Verification failed or already paid"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn pay_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<PayOrderRequest>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    let resp = order_service::pay_order(&state, &user, id, payload).await?;
    Ok(Json(resp))
}
