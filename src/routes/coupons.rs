use axum::{Json, Router, extract::State, routing::post};

use crate::{
    dto::coupons::{CouponPreview, ValidateCouponRequest},
    error::AppResult,
    middleware::auth::CartOwner,
    response::ApiResponse,
    services::coupon_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/validate", post(validate_coupon))
}

#[utoipa::path(
    post,
    path = "/api/coupons/validate",
    request_body = ValidateCouponRequest,
    responses(
        (status = 200, description = "Coupon applies to the current cart", body = ApiResponse<CouponPreview>),
        (status = 400, description = "Coupon rejected, with the exact reason"),
        (status = 404, description = "Unknown code"),
    ),
    tag = "Coupons"
)]
pub async fn validate_coupon(
    State(state): State<AppState>,
    owner: CartOwner,
    Json(payload): Json<ValidateCouponRequest>,
) -> AppResult<Json<ApiResponse<CouponPreview>>> {
    let resp = coupon_service::validate_for_cart(&state, &owner, &payload.code).await?;
    Ok(Json(resp))
}
