use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::orders::{
        CancellationOutcome, CheckoutRequest, CheckoutResponse, GuestCancelRequest,
        GuestCheckoutRequest, OrderList, OrderWithItems, PayOrderRequest, TrackOrderQuery,
    },
    email::OrderStatusEmail,
    entity::{
        cart_items::{Column as CartCol, Entity as CartItems},
        coupons::{Column as CouponCol, Entity as Coupons},
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
            Model as OrderItemModel,
        },
        orders::{
            ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel,
            OrderStatus, PaymentMethod, PaymentStatus, ShippingMethod,
        },
        products::{Column as ProdCol, Entity as Products},
        users::Entity as Users,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, CartOwner},
    models::{Address, Order, OrderItem},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    rules::{
        cancellation::{CancelRequester, CancellationView, check_cancellable},
        coupons::check_coupon,
        pricing::{self, CartLine},
        status::{Actor, TransitionRequest, estimate_delivery, is_remote_region, validate_transition},
    },
    services::coupon_service,
    state::AppState,
};

struct CheckoutContext {
    owner: CartOwner,
    customer_id: Option<Uuid>,
    is_guest: bool,
    email: String,
    phone: String,
    shipping_address: Address,
    billing_address: Option<Address>,
    payment_method: PaymentMethod,
    shipping_method: ShippingMethod,
    coupon_code: Option<String>,
}

pub async fn checkout(
    state: &AppState,
    user: &AuthUser,
    payload: CheckoutRequest,
) -> AppResult<ApiResponse<CheckoutResponse>> {
    let account = Users::find_by_id(user.user_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    place_order(
        state,
        CheckoutContext {
            owner: CartOwner::Customer(user.user_id),
            customer_id: Some(user.user_id),
            is_guest: false,
            email: account.email,
            phone: payload.phone,
            shipping_address: payload.shipping_address,
            billing_address: payload.billing_address,
            payment_method: payload.payment_method,
            shipping_method: payload.shipping_method,
            coupon_code: payload.coupon_code,
        },
    )
    .await
}

pub async fn guest_checkout(
    state: &AppState,
    session_id: Uuid,
    payload: GuestCheckoutRequest,
) -> AppResult<ApiResponse<CheckoutResponse>> {
    if !payload.email.contains('@') {
        return Err(AppError::Validation("a valid email is required".into()));
    }

    place_order(
        state,
        CheckoutContext {
            owner: CartOwner::Guest(session_id),
            customer_id: None,
            is_guest: true,
            email: payload.email.trim().to_lowercase(),
            phone: payload.phone,
            shipping_address: payload.shipping_address,
            billing_address: payload.billing_address,
            payment_method: payload.payment_method,
            shipping_method: payload.shipping_method,
            coupon_code: payload.coupon_code,
        },
    )
    .await
}

async fn place_order(
    state: &AppState,
    ctx: CheckoutContext,
) -> AppResult<ApiResponse<CheckoutResponse>> {
    if ctx.phone.trim().is_empty() {
        return Err(AppError::Validation("a contact phone is required".into()));
    }
    let billing = ctx
        .billing_address
        .clone()
        .unwrap_or_else(|| ctx.shipping_address.clone());

    let txn = state.orm.begin().await?;

    let cart_rows = CartItems::find()
        .filter(
            Condition::all()
                .add(CartCol::OwnerId.eq(ctx.owner.owner_id()))
                .add(CartCol::IsGuest.eq(ctx.owner.is_guest())),
        )
        .lock(LockType::Update)
        .all(&txn)
        .await?;
    if cart_rows.is_empty() {
        return Err(AppError::Validation("Cart is empty".into()));
    }

    let product_ids: Vec<Uuid> = cart_rows.iter().map(|r| r.product_id).collect();
    let products = Products::find()
        .filter(ProdCol::Id.is_in(product_ids.clone()))
        .lock(LockType::Update)
        .all(&txn)
        .await?;
    let by_id: HashMap<Uuid, _> = products.into_iter().map(|p| (p.id, p)).collect();

    let mut lines = Vec::with_capacity(cart_rows.len());
    for row in &cart_rows {
        if row.quantity <= 0 {
            return Err(AppError::Validation("Cart has invalid quantity".into()));
        }
        let product = by_id.get(&row.product_id).ok_or_else(|| {
            AppError::Validation("a cart item is no longer available".into())
        })?;
        if !product.is_active {
            return Err(AppError::Validation(format!(
                "{} is no longer available",
                product.name
            )));
        }
        if product.stock < row.quantity {
            return Err(AppError::Validation(format!(
                "Insufficient stock for {}",
                product.name
            )));
        }
        lines.push(CartLine {
            quantity: row.quantity,
            unit_price: product.price,
        });
    }
    let subtotal = pricing::cart_totals(&lines, 0).subtotal;

    // Lock the coupon row before checking it; the conditional increment in
    // apply_redemption is what actually guards the global limit.
    let mut coupon = None;
    let mut discount = 0;
    if let Some(code) = ctx.coupon_code.as_ref() {
        let normalized = code.trim().to_uppercase();
        let model = Coupons::find()
            .filter(CouponCol::Code.eq(normalized))
            .lock(LockType::Update)
            .one(&txn)
            .await?
            .ok_or(AppError::NotFound)?;
        let usage = match ctx.customer_id {
            Some(user_id) => coupon_service::user_usage(&txn, model.id, user_id).await?,
            None => 0,
        };
        discount = check_coupon(
            &coupon_service::rules_from_entity(&model),
            ctx.customer_id,
            subtotal,
            &product_ids,
            usage,
            Utc::now(),
        )?;
        coupon = Some(model);
    }

    let totals = pricing::cart_totals(&lines, discount);

    let order_id = Uuid::new_v4();
    let order = OrderActive {
        id: Set(order_id),
        confirmation_number: Set(build_confirmation_number(order_id)),
        customer_id: Set(ctx.customer_id),
        is_guest: Set(ctx.is_guest),
        email: Set(ctx.email.clone()),
        phone: Set(ctx.phone.clone()),
        subtotal: Set(totals.subtotal),
        tax: Set(totals.tax),
        shipping_fee: Set(totals.shipping),
        discount: Set(totals.discount),
        total: Set(totals.total),
        status: Set(OrderStatus::Pending),
        payment_method: Set(ctx.payment_method),
        payment_status: Set(PaymentStatus::Unpaid),
        coupon_id: Set(coupon.as_ref().map(|c| c.id)),
        coupon_code: Set(coupon.as_ref().map(|c| c.code.clone())),
        shipping_address: Set(serde_json::json!(ctx.shipping_address)),
        billing_address: Set(serde_json::json!(billing)),
        shipping_method: Set(ctx.shipping_method),
        tracking_number: Set(None),
        estimated_delivery: Set(None),
        paid_at: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let mut items: Vec<OrderItem> = Vec::with_capacity(cart_rows.len());
    for row in &cart_rows {
        let product = by_id.get(&row.product_id).ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!("product disappeared during checkout"))
        })?;
        let item = OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_id: Set(row.product_id),
            product_name: Set(product.name.clone()),
            quantity: Set(row.quantity),
            unit_price: Set(product.price),
            total_price: Set(product.price * i64::from(row.quantity)),
            created_at: NotSet,
        }
        .insert(&txn)
        .await?;
        items.push(order_item_from_entity(item));

        // reduce stock
        Products::update_many()
            .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).sub(row.quantity))
            .filter(ProdCol::Id.eq(row.product_id))
            .exec(&txn)
            .await?;
    }

    if let Some(model) = coupon.as_ref() {
        if coupon_service::record_redemption(&txn, order.id, model.id, ctx.customer_id).await? {
            coupon_service::apply_redemption(&txn, model.id, ctx.customer_id).await?;
        }
    }

    CartItems::delete_many()
        .filter(
            Condition::all()
                .add(CartCol::OwnerId.eq(ctx.owner.owner_id()))
                .add(CartCol::IsGuest.eq(ctx.owner.is_guest())),
        )
        .exec(&txn)
        .await?;

    txn.commit().await?;

    // Online orders stay pending until payment is verified; cash on delivery
    // is confirmed straight away by the system.
    let order = if order.payment_method == PaymentMethod::CashOnDelivery {
        match transition_order(state, &order, OrderStatus::Processing, Actor::System, None, None)
            .await
        {
            Ok(updated) => updated,
            Err(err) => {
                tracing::warn!(order_id = %order.id, error = %err, "auto-confirm failed");
                order
            }
        }
    } else {
        order
    };

    let gateway_order_id = if order.payment_method == PaymentMethod::Online {
        match state.gateway.create_gateway_order(order.id, order.total).await {
            Ok(reference) => Some(reference),
            Err(err) => {
                tracing::warn!(order_id = %order.id, error = %err, "gateway order creation failed");
                None
            }
        }
    } else {
        None
    };

    if let Err(err) = log_audit(
        &state.pool,
        ctx.customer_id,
        "checkout",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id, "total": order.total })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Checkout success",
        CheckoutResponse {
            order: order_from_entity(order)?,
            items,
            gateway_order_id,
        },
        Some(Meta::empty()),
    ))
}

pub async fn pay_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: PayOrderRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let txn = state.orm.begin().await?;

    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::CustomerId.eq(user.user_id))
                .add(OrderCol::Id.eq(id)),
        )
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    if order.payment_method != PaymentMethod::Online {
        return Err(AppError::Validation(
            "cash on delivery orders are settled at the door".into(),
        ));
    }
    if order.payment_status == PaymentStatus::Paid {
        return Err(AppError::Validation("Order already paid".into()));
    }

    let verified = state
        .gateway
        .verify_payment(
            &payload.gateway_order_id,
            &payload.payment_id,
            &payload.signature,
        )
        .await?;
    if !verified {
        return Err(AppError::Validation("payment verification failed".into()));
    }

    let mut active: OrderActive = order.into();
    active.payment_status = Set(PaymentStatus::Paid);
    active.paid_at = Set(Some(Utc::now().into()));
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;

    let item_models = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .all(&txn)
        .await?;

    txn.commit().await?;

    // Payment confirmed: the system moves the order into processing.
    let order =
        match transition_order(state, &order, OrderStatus::Processing, Actor::System, None, None)
            .await
        {
            Ok(updated) => updated,
            Err(err) => {
                tracing::warn!(order_id = %order.id, error = %err, "post-payment transition failed");
                order
            }
        };

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "order_paid",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Payment recorded",
        OrderWithItems {
            order: order_from_entity(order)?,
            items: item_models.into_iter().map(order_item_from_entity).collect(),
        },
        Some(Meta::empty()),
    ))
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination.normalize();
    let mut condition = Condition::all().add(OrderCol::CustomerId.eq(user.user_id));
    if let Some(status) = query.status {
        condition = condition.add(OrderCol::Status.eq(status));
    }

    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);

    let mut finder = Orders::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_from_entity)
        .collect::<AppResult<Vec<Order>>>()?;

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Ok",
        OrderList { items: orders },
        Some(meta),
    ))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::CustomerId.eq(user.user_id))
                .add(OrderCol::Id.eq(id)),
        )
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_item_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "OK",
        OrderWithItems {
            order: order_from_entity(order)?,
            items,
        },
        Some(Meta::empty()),
    ))
}

/// Guest order lookup by confirmation number; the contact email must match.
pub async fn track_order(
    state: &AppState,
    query: TrackOrderQuery,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = Orders::find()
        .filter(OrderCol::ConfirmationNumber.eq(query.confirmation_number.trim()))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    if !order.email.eq_ignore_ascii_case(query.email.trim()) {
        return Err(AppError::Ownership(
            "the email does not match this order".into(),
        ));
    }

    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_item_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "OK",
        OrderWithItems {
            order: order_from_entity(order)?,
            items,
        },
        Some(Meta::empty()),
    ))
}

pub async fn cancel_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<CancellationOutcome>> {
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    check_cancellable(
        &cancellation_view(&order),
        &CancelRequester::Customer(user.user_id),
    )?;

    finish_cancellation(state, order, Some(user.user_id)).await
}

pub async fn guest_cancel(
    state: &AppState,
    payload: GuestCancelRequest,
) -> AppResult<ApiResponse<CancellationOutcome>> {
    let order = Orders::find()
        .filter(OrderCol::ConfirmationNumber.eq(payload.confirmation_number.trim()))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    check_cancellable(
        &cancellation_view(&order),
        &CancelRequester::Guest {
            email: &payload.email,
            phone: &payload.phone,
        },
    )?;

    finish_cancellation(state, order, None).await
}

fn cancellation_view(order: &OrderModel) -> CancellationView<'_> {
    CancellationView {
        status: order.status,
        customer_id: order.customer_id,
        is_guest: order.is_guest,
        email: &order.email,
        phone: &order.phone,
    }
}

/// Cancellation bypasses the admin transition table on purpose: the policy in
/// `rules::cancellation` has already authorized the requester.
async fn finish_cancellation(
    state: &AppState,
    order: OrderModel,
    actor_id: Option<Uuid>,
) -> AppResult<ApiResponse<CancellationOutcome>> {
    let refund_note = (order.payment_method == PaymentMethod::Online
        && order.payment_status == PaymentStatus::Paid)
        .then(|| {
            "Refunds for prepaid orders are processed by the payment gateway and take 5-7 business days."
                .to_string()
        });

    let mut active: OrderActive = order.into();
    active.status = Set(OrderStatus::Cancelled);
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(&state.orm).await?;

    notify_status_change(state, &updated).await;

    if let Err(err) = log_audit(
        &state.pool,
        actor_id,
        "order_cancel",
        Some("orders"),
        Some(serde_json::json!({ "order_id": updated.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Order cancelled",
        CancellationOutcome {
            order: order_from_entity(updated)?,
            refund_note,
        },
        Some(Meta::empty()),
    ))
}

/// Validate and apply a status change, filling in tracking and the delivery
/// estimate when the order ships, then notify the customer. A failed email
/// never rolls the transition back.
pub(crate) async fn transition_order(
    state: &AppState,
    order: &OrderModel,
    to: OrderStatus,
    actor: Actor,
    tracking_number: Option<String>,
    estimated_delivery: Option<NaiveDate>,
) -> AppResult<OrderModel> {
    let today = Utc::now().date_naive();
    let tracking = tracking_number.or_else(|| order.tracking_number.clone());
    let estimate = estimated_delivery.or(order.estimated_delivery);

    validate_transition(&TransitionRequest {
        from: order.status,
        to,
        actor,
        tracking_number: tracking.as_deref(),
        estimated_delivery: estimate,
        today,
    })?;

    let mut active: OrderActive = order.clone().into();
    active.status = Set(to);
    if to == OrderStatus::Shipped {
        active.tracking_number = Set(tracking);
        let estimate = estimate.unwrap_or_else(|| {
            let remote = shipping_state(order)
                .map(|s| is_remote_region(&s))
                .unwrap_or(false);
            estimate_delivery(today, order.shipping_method, remote)
        });
        active.estimated_delivery = Set(Some(estimate));
    }
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(&state.orm).await?;

    notify_status_change(state, &updated).await;
    Ok(updated)
}

/// Move shipped orders whose estimate has passed to delivered. Runs on an
/// interval from `main`; per-order failures are logged and skipped.
pub async fn auto_mark_delivered(state: &AppState) -> AppResult<u64> {
    let today = Utc::now().date_naive();
    let due = Orders::find()
        .filter(OrderCol::Status.eq(OrderStatus::Shipped))
        .filter(OrderCol::EstimatedDelivery.lte(today))
        .all(&state.orm)
        .await?;

    let mut delivered = 0u64;
    for order in due {
        match transition_order(state, &order, OrderStatus::Delivered, Actor::System, None, None)
            .await
        {
            Ok(_) => delivered += 1,
            Err(err) => {
                tracing::warn!(order_id = %order.id, error = %err, "delivered sweep skipped order");
            }
        }
    }
    Ok(delivered)
}

async fn notify_status_change(state: &AppState, order: &OrderModel) {
    let message = OrderStatusEmail {
        to: order.email.clone(),
        order_id: order.id,
        confirmation_number: order.confirmation_number.clone(),
        status: order.status,
        tracking_number: order.tracking_number.clone(),
    };
    if let Err(err) = state.mailer.send_order_status_update(message).await {
        tracing::warn!(order_id = %order.id, error = %err, "status update email failed");
    }
}

fn shipping_state(order: &OrderModel) -> Option<String> {
    order
        .shipping_address
        .get("state")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

pub(crate) fn order_from_entity(model: OrderModel) -> AppResult<Order> {
    let shipping_address: Address = serde_json::from_value(model.shipping_address)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("bad shipping address snapshot: {e}")))?;
    let billing_address: Address = serde_json::from_value(model.billing_address)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("bad billing address snapshot: {e}")))?;
    Ok(Order {
        id: model.id,
        confirmation_number: model.confirmation_number,
        customer_id: model.customer_id,
        is_guest: model.is_guest,
        email: model.email,
        phone: model.phone,
        subtotal: model.subtotal,
        tax: model.tax,
        shipping_fee: model.shipping_fee,
        discount: model.discount,
        total: model.total,
        status: model.status,
        payment_method: model.payment_method,
        payment_status: model.payment_status,
        coupon_code: model.coupon_code,
        shipping_address,
        billing_address,
        shipping_method: model.shipping_method,
        tracking_number: model.tracking_number,
        estimated_delivery: model.estimated_delivery,
        paid_at: model.paid_at.map(|dt| dt.with_timezone(&Utc)),
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}

pub(crate) fn order_item_from_entity(model: OrderItemModel) -> OrderItem {
    OrderItem {
        id: model.id,
        order_id: model.order_id,
        product_id: model.product_id,
        product_name: model.product_name,
        quantity: model.quantity,
        unit_price: model.unit_price,
        total_price: model.total_price,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

fn build_confirmation_number(order_id: Uuid) -> String {
    let date = Utc::now().format("%Y%m%d");
    let suffix = order_id.to_string();
    let short = &suffix[..8];
    format!("JW-{}-{}", date, short)
}
