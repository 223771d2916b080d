use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        cart::{CartItemDto, CartView},
        coupons::{CouponList, CouponPreview, CreateCouponRequest, UpdateCouponRequest, ValidateCouponRequest},
        orders::{
            CancellationOutcome, CheckoutRequest, CheckoutResponse, GuestCancelRequest,
            GuestCheckoutRequest, OrderList, OrderWithItems, PayOrderRequest,
            UpdateOrderStatusRequest,
        },
        products::{self, CreateProductRequest, UpdateProductRequest},
        reviews::{CreateReviewRequest, ReviewApprovalRequest, ReviewList},
    },
    models::{
        Address, CartItem, Coupon, DiscountType, Order, OrderItem, OrderStatus, PaymentMethod,
        PaymentStatus, Product, Review, ShippingMethod, User,
    },
    response::{ApiResponse, Meta},
    routes::{admin, auth, cart, coupons, health, orders, params, products as product_routes, reviews},
    rules::pricing::CartTotals,
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::login,
        auth::register,
        cart::cart_view,
        cart::add_to_cart,
        cart::remove_from_cart,
        product_routes::list_products,
        product_routes::create_product,
        product_routes::get_product,
        product_routes::update_product,
        product_routes::delete_product,
        product_routes::list_product_reviews,
        coupons::validate_coupon,
        reviews::create_review,
        orders::list_orders,
        orders::checkout,
        orders::guest_checkout,
        orders::track_order,
        orders::guest_cancel,
        orders::get_order,
        orders::cancel_order,
        orders::pay_order,
        admin::list_all_orders,
        admin::get_order_admin,
        admin::update_order_status,
        admin::list_low_stock,
        admin::adjust_inventory,
        admin::list_coupons,
        admin::create_coupon,
        admin::get_coupon,
        admin::update_coupon,
        admin::delete_coupon,
        admin::set_review_approval
    ),
    components(
        schemas(
            User,
            Product,
            CartItem,
            Order,
            OrderItem,
            Coupon,
            Review,
            Address,
            OrderStatus,
            PaymentMethod,
            PaymentStatus,
            ShippingMethod,
            DiscountType,
            CartTotals,
            CartItemDto,
            CartView,
            CouponList,
            CouponPreview,
            CreateCouponRequest,
            UpdateCouponRequest,
            ValidateCouponRequest,
            CheckoutRequest,
            CheckoutResponse,
            GuestCheckoutRequest,
            GuestCancelRequest,
            CancellationOutcome,
            OrderList,
            OrderWithItems,
            PayOrderRequest,
            UpdateOrderStatusRequest,
            CreateProductRequest,
            UpdateProductRequest,
            CreateReviewRequest,
            ReviewApprovalRequest,
            ReviewList,
            admin::InventoryAdjustRequest,
            params::Pagination,
            params::ProductQuery,
            params::OrderListQuery,
            params::LowStockQuery,
            products::ProductList,
            Meta,
            ApiResponse<Product>,
            ApiResponse<products::ProductList>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>,
            ApiResponse<CartView>,
            ApiResponse<CouponPreview>,
            ApiResponse<ReviewList>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Products", description = "Catalog endpoints"),
        (name = "Cart", description = "Cart endpoints"),
        (name = "Coupons", description = "Coupon validation"),
        (name = "Orders", description = "Checkout, tracking and lifecycle endpoints"),
        (name = "Reviews", description = "Product review endpoints"),
        (name = "Admin", description = "Back-office endpoints"),
        (name = "Auth", description = "Authentication endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
