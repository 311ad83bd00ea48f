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
        auth::{
            AvailabilityResponse, CustomerAuthResponse, CustomerList, CustomerRegisterRequest,
            LoginRequest, OwnerAuthResponse, OwnerRegisterRequest,
        },
        cart::{AddToCartItem, AddToCartRequest, CartList},
        orders::{
            CancelProductRequest, CreateOrderRequest, OrderList, OrderProductInput,
            UpdateOrderStatusRequest, VerifyOtpRequest,
        },
        products::{CreateProductRequest, ProductList, UpdateProductRequest},
        shops::ShopList,
    },
    models::{
        Cart, CartItem, CartLineView, CartWithProducts, Customer, CustomerSummary, Order,
        OrderDetails, OrderLine, OrderLineView, OrderStatus, Product, ProductSummary, Shop,
        ShopOwner, ShopSummary,
    },
    response::{ApiResponse, Meta},
    routes::{cart, customers, health, orders, owners, products, shops},
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
        customers::register,
        customers::login,
        customers::check_mobile,
        customers::check_email,
        customers::list_customers,
        owners::register,
        owners::login,
        products::list_products,
        products::create_product,
        products::get_product,
        products::update_product,
        products::delete_product,
        shops::list_shops,
        shops::get_shop,
        cart::add_to_cart,
        cart::carts_by_customer,
        orders::create_order,
        orders::orders_by_customer,
        orders::orders_by_shop,
        orders::get_order,
        orders::update_order_status,
        orders::verify_otp,
        orders::cancel_product
    ),
    components(
        schemas(
            Customer,
            ShopOwner,
            Shop,
            Product,
            ProductSummary,
            CustomerSummary,
            ShopSummary,
            Cart,
            CartItem,
            CartLineView,
            CartWithProducts,
            Order,
            OrderLine,
            OrderLineView,
            OrderDetails,
            OrderStatus,
            CustomerRegisterRequest,
            OwnerRegisterRequest,
            LoginRequest,
            CustomerAuthResponse,
            OwnerAuthResponse,
            AvailabilityResponse,
            CustomerList,
            AddToCartRequest,
            AddToCartItem,
            CartList,
            CreateOrderRequest,
            OrderProductInput,
            UpdateOrderStatusRequest,
            VerifyOtpRequest,
            CancelProductRequest,
            OrderList,
            CreateProductRequest,
            UpdateProductRequest,
            ProductList,
            ShopList,
            Meta,
            ApiResponse<Cart>,
            ApiResponse<Order>,
            ApiResponse<OrderDetails>,
            ApiResponse<OrderList>,
            ApiResponse<CartList>
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Customers", description = "Customer registration and login"),
        (name = "Owners", description = "Shop owner registration and login"),
        (name = "Products", description = "Product catalog endpoints"),
        (name = "Shops", description = "Shop directory endpoints"),
        (name = "Cart", description = "Per-shop cart aggregation"),
        (name = "Orders", description = "Order lifecycle endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
