use std::sync::Arc;

use chrono::{Duration, Utc};
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, Set, Statement};
use uuid::Uuid;

use jewelry_store_api::{
    db::{create_orm_conn, create_pool, run_migrations},
    dto::{
        cart::AddToCartRequest,
        coupons::CreateCouponRequest,
        orders::{CheckoutRequest, PayOrderRequest, UpdateOrderStatusRequest},
    },
    email::RecordingMailer,
    entity::{
        Coupons,
        products::ActiveModel as ProductActive,
        users::ActiveModel as UserActive,
    },
    error::AppError,
    middleware::auth::{AuthUser, CartOwner, Role},
    models::{Address, DiscountType, OrderStatus, PaymentMethod, PaymentStatus, ShippingMethod},
    payment::DevGateway,
    services::{admin_service, cart_service, coupon_service, order_service},
    state::AppState,
};

// Integration flow: customer adds to cart, checks out with a coupon, pays,
// admin ships with tracking, and the coupon counters stay exactly-once.
#[tokio::test]
async fn checkout_with_coupon_pay_and_ship_flow() -> anyhow::Result<()> {
    // Allow skipping when no DB is configured in the environment.
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(());
        }
    };

    let mailer = Arc::new(RecordingMailer::default());
    let state = setup_state(&database_url, mailer.clone()).await?;

    // Seed users and a product
    let customer_id = create_user(&state, "customer", "customer@example.com").await?;
    let admin_id = create_user(&state, "admin", "admin@example.com").await?;

    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        name: Set("Gold Rope Chain".into()),
        description: Set(Some("22k rope chain for testing".into())),
        category: Set("chains".into()),
        metal: Set(Some("gold".into())),
        price: Set(1_000_00),
        stock: Set(10),
        is_active: Set(true),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    let customer = AuthUser {
        user_id: customer_id,
        role: Role::Customer,
    };
    let admin = AuthUser {
        user_id: admin_id,
        role: Role::Admin,
    };

    // Admin creates a single-use 10% coupon capped at 500.00
    let coupon_resp = coupon_service::create_coupon(
        &state,
        &admin,
        CreateCouponRequest {
            code: "festive10".into(),
            discount_type: DiscountType::Percentage,
            value: 10,
            minimum_order_amount: None,
            maximum_discount_amount: Some(500_00),
            usage_limit: Some(1),
            user_usage_limit: None,
            valid_from: Utc::now() - Duration::days(1),
            valid_until: Utc::now() + Duration::days(30),
            allowed_users: None,
            excluded_users: None,
            applicable_products: None,
            excluded_products: None,
            is_active: None,
        },
    )
    .await?;
    let coupon = coupon_resp.data.expect("coupon data");
    assert_eq!(coupon.code, "FESTIVE10");

    // Add to cart: 2 x 1000.00
    let owner = CartOwner::Customer(customer_id);
    cart_service::add_to_cart(
        &state.pool,
        &owner,
        AddToCartRequest {
            product_id: product.id,
            quantity: 2,
        },
    )
    .await?;

    // Checkout online with the coupon
    let checkout_resp = order_service::checkout(
        &state,
        &customer,
        CheckoutRequest {
            payment_method: PaymentMethod::Online,
            shipping_method: ShippingMethod::Express,
            phone: "9876543210".into(),
            shipping_address: test_address(),
            billing_address: None,
            coupon_code: Some("FESTIVE10".into()),
        },
    )
    .await?;
    let checkout = checkout_resp.data.expect("checkout data");
    let order = checkout.order;

    // 2000.00 subtotal, 18% tax, flat shipping (subtotal not above threshold),
    // 10% coupon.
    assert_eq!(order.subtotal, 2_000_00);
    assert_eq!(order.tax, 360_00);
    assert_eq!(order.shipping_fee, 100_00);
    assert_eq!(order.discount, 200_00);
    assert_eq!(order.total, 2_260_00);
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.payment_status, PaymentStatus::Unpaid);
    let gateway_order_id = checkout.gateway_order_id.expect("gateway order id");

    // The coupon counter moved exactly once...
    let stored = Coupons::find_by_id(coupon.id)
        .one(&state.orm)
        .await?
        .expect("coupon row");
    assert_eq!(stored.usage_count, 1);

    // ...and re-recording the same order's redemption is a no-op.
    let recorded =
        coupon_service::record_redemption(&state.orm, order.id, coupon.id, Some(customer_id))
            .await?;
    assert!(!recorded, "second redemption for the same order must not land");
    let stored = Coupons::find_by_id(coupon.id)
        .one(&state.orm)
        .await?
        .expect("coupon row");
    assert_eq!(stored.usage_count, 1);

    // A second checkout with the exhausted coupon is rejected with the exact
    // usage-limit reason.
    cart_service::add_to_cart(
        &state.pool,
        &owner,
        AddToCartRequest {
            product_id: product.id,
            quantity: 1,
        },
    )
    .await?;
    let rejected = order_service::checkout(
        &state,
        &customer,
        CheckoutRequest {
            payment_method: PaymentMethod::CashOnDelivery,
            shipping_method: ShippingMethod::Standard,
            phone: "9876543210".into(),
            shipping_address: test_address(),
            billing_address: None,
            coupon_code: Some("FESTIVE10".into()),
        },
    )
    .await;
    match rejected {
        Err(AppError::Validation(reason)) => {
            assert!(reason.contains("usage limit"), "unexpected reason: {reason}")
        }
        other => panic!("expected a validation error, got {other:?}"),
    }
    cart_service::remove_from_cart(&state.pool, &owner, product.id).await?;

    // Pay: payment recorded, system confirms the order.
    let pay_resp = order_service::pay_order(
        &state,
        &customer,
        order.id,
        PayOrderRequest {
            gateway_order_id,
            payment_id: "pay_123".into(),
            signature: "sig_abc".into(),
        },
    )
    .await?;
    let paid = pay_resp.data.expect("pay data").order;
    assert_eq!(paid.payment_status, PaymentStatus::Paid);
    assert_eq!(paid.status, OrderStatus::Processing);

    // Admin ships with a tracking number; the estimate gets filled in.
    let shipped_resp = admin_service::update_order_status(
        &state,
        &admin,
        order.id,
        UpdateOrderStatusRequest {
            status: OrderStatus::Shipped,
            tracking_number: Some("TRK-98765".into()),
            estimated_delivery: None,
        },
    )
    .await?;
    let shipped = shipped_resp.data.expect("shipped order");
    assert_eq!(shipped.status, OrderStatus::Shipped);
    assert_eq!(shipped.tracking_number.as_deref(), Some("TRK-98765"));
    assert!(shipped.estimated_delivery.is_some());

    // Shipped orders are no longer cancellable by the customer.
    let cancel = order_service::cancel_order(&state, &customer, order.id).await;
    assert!(matches!(cancel, Err(AppError::Validation(_))));

    // Every successful transition notified the customer.
    let sent = mailer.sent.lock().expect("mailer lock");
    let statuses: Vec<OrderStatus> = sent.iter().map(|m| m.status).collect();
    assert!(statuses.contains(&OrderStatus::Processing));
    assert!(statuses.contains(&OrderStatus::Shipped));

    Ok(())
}

fn test_address() -> Address {
    Address {
        name: "Test Customer".into(),
        line1: "12 Marine Drive".into(),
        line2: None,
        city: "Mumbai".into(),
        state: "Maharashtra".into(),
        postal_code: "400001".into(),
        country: "IN".into(),
    }
}

async fn setup_state(database_url: &str, mailer: Arc<RecordingMailer>) -> anyhow::Result<AppState> {
    let pool = create_pool(database_url).await?;
    let orm = create_orm_conn(database_url).await?;
    run_migrations(&orm).await?;

    // Clean tables between runs
    let backend = orm.get_database_backend();
    orm.execute(Statement::from_string(
        backend,
        "TRUNCATE TABLE order_items, orders, cart_items, coupon_redemptions, user_coupons, coupons, reviews, audit_logs, products, users RESTART IDENTITY CASCADE",
    ))
    .await?;

    Ok(AppState::with_collaborators(
        pool,
        orm,
        mailer,
        Arc::new(DevGateway),
    ))
}

async fn create_user(state: &AppState, role: &str, email: &str) -> anyhow::Result<Uuid> {
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        password_hash: Set("dummy".into()),
        role: Set(role.into()),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(user.id)
}
