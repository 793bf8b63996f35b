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
        auth::{LoginRequest, LoginResponse, RegisterRequest},
        cart::{AddToCartRequest, CartDto, ClearCartResponse, UpdateCartItemRequest},
        foods::{CategoryList, CreateFoodRequest, FoodList, UpdateFoodRequest},
        orders::{
            CheckoutRequest, CheckoutSessionResponse, CreateOrderRequest, DeliveryAddress,
            OrderList, OrderWithItems, UpdateOrderStatusRequest,
        },
    },
    models::{CartItem, Food, Order, OrderItem, User},
    response::{ApiResponse, Meta},
    routes::{admin, auth, cart, checkout, foods, health, health::HealthData, orders, params, webhooks},
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
        foods::list_foods,
        foods::list_categories,
        foods::get_food,
        foods::create_food,
        foods::update_food,
        cart::get_cart,
        cart::add_to_cart,
        cart::update_cart_item,
        cart::clear_cart,
        checkout::create_checkout_session,
        orders::list_orders,
        orders::create_order,
        orders::get_order,
        admin::list_all_orders,
        admin::update_order_status,
        webhooks::payment_webhook
    ),
    components(
        schemas(
            User,
            Food,
            CartItem,
            Order,
            OrderItem,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            CreateFoodRequest,
            UpdateFoodRequest,
            FoodList,
            CategoryList,
            AddToCartRequest,
            UpdateCartItemRequest,
            CartDto,
            ClearCartResponse,
            DeliveryAddress,
            CheckoutRequest,
            CreateOrderRequest,
            CheckoutSessionResponse,
            OrderWithItems,
            OrderList,
            UpdateOrderStatusRequest,
            params::Pagination,
            params::FoodQuery,
            params::OrderListQuery,
            Meta,
            HealthData,
            ApiResponse<HealthData>,
            ApiResponse<User>,
            ApiResponse<LoginResponse>,
            ApiResponse<Food>,
            ApiResponse<FoodList>,
            ApiResponse<CategoryList>,
            ApiResponse<CartDto>,
            ApiResponse<ClearCartResponse>,
            ApiResponse<Order>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>,
            ApiResponse<CheckoutSessionResponse>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Foods", description = "Menu endpoints"),
        (name = "Cart", description = "Cart endpoints"),
        (name = "Checkout", description = "Checkout session endpoint"),
        (name = "Orders", description = "Order endpoints"),
        (name = "Admin", description = "Admin endpoints"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Webhooks", description = "Payment webhook endpoint"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
