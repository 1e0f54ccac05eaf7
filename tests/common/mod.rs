#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use chrono::{DateTime, Duration, Utc};
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use serde_json::Value;
use sweetshop_api::{
    config::AppConfig,
    db,
    entities::{cart_item, coupon, product, CouponModel, DiscountType, IdSet},
    errors::ServiceError,
    handlers::AppServices,
    services::{carts::CartStore, catalog::SeaOrmCatalog},
    AppState,
};
use tower::ServiceExt;
use uuid::Uuid;

pub fn test_config() -> AppConfig {
    let mut cfg = AppConfig::new(
        "sqlite::memory:".to_string(),
        "127.0.0.1".to_string(),
        18_080,
        "test".to_string(),
    );
    // every pooled connection to sqlite::memory: is its own database
    cfg.db_max_connections = 1;
    cfg.db_min_connections = 1;
    cfg
}

/// Application state over a fresh, migrated in-memory SQLite database.
pub struct TestApp {
    pub state: Arc<AppState>,
    router: Router,
}

impl TestApp {
    pub async fn new() -> Self {
        let cfg = test_config();
        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        Self::from_state(Arc::new(AppState::new(Arc::new(pool), cfg)))
    }

    pub fn from_state(state: Arc<AppState>) -> Self {
        let router = sweetshop_api::app_router(state.clone());
        Self { state, router }
    }

    /// Same database, but cart clearing always fails.
    pub async fn with_failing_cart_store() -> Self {
        let app = Self::new().await;
        let db = app.state.db.clone();
        let services = AppServices::with_ports(
            db.clone(),
            &app.state.config,
            Arc::new(SeaOrmCatalog::new(db.clone())),
            Arc::new(FailingCartStore),
        );
        Self::from_state(Arc::new(AppState {
            db,
            config: app.state.config.clone(),
            services,
        }))
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.state.db
    }

    pub fn services(&self) -> &AppServices {
        &self.state.services
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router response");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("response body")
            .to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, value)
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(body)).await
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, None).await
    }

    pub async fn seed_product(&self, price: Decimal, category_id: Uuid) -> product::Model {
        let now = Utc::now();
        product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set("Gulab jamun".to_string()),
            price: Set(price),
            category_id: Set(category_id),
            stock: Set(100),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.db())
        .await
        .expect("seed product")
    }

    pub async fn seed_coupon(&self, seed: CouponSeed) -> CouponModel {
        let now = Utc::now();
        coupon::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(seed.code.to_string()),
            description: Set(None),
            discount_type: Set(seed.discount_type),
            discount_value: Set(seed.value),
            min_cart_value: Set(seed.min_cart_value),
            max_discount_cap: Set(seed.cap),
            start_date: Set(seed.start_date.unwrap_or(now - Duration::days(1))),
            expiry_date: Set(seed.expiry_date.unwrap_or(now + Duration::days(30))),
            usage_limit: Set(seed.usage_limit),
            used_count: Set(seed.used_count),
            user_limit: Set(seed.user_limit),
            is_active: Set(seed.is_active),
            applicable_products: Set(seed.products.into_iter().collect::<IdSet>()),
            applicable_categories: Set(seed.categories.into_iter().collect::<IdSet>()),
            eligible_users: Set(seed.eligible_users.into_iter().collect::<IdSet>()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.db())
        .await
        .expect("seed coupon")
    }

    pub async fn seed_cart_item(&self, user_id: Uuid, product_id: Uuid, quantity: i32) {
        cart_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            product_id: Set(product_id),
            quantity: Set(quantity),
            created_at: Set(Utc::now()),
        }
        .insert(self.db())
        .await
        .expect("seed cart item");
    }

    pub async fn reload_coupon(&self, id: Uuid) -> CouponModel {
        coupon::Entity::find_by_id(id)
            .one(self.db())
            .await
            .expect("load coupon")
            .expect("coupon exists")
    }
}

/// Coupon row to seed; `Default` is an active, unrestricted 10% coupon.
#[derive(Debug, Clone)]
pub struct CouponSeed {
    pub code: &'static str,
    pub discount_type: DiscountType,
    pub value: Decimal,
    pub min_cart_value: Decimal,
    pub cap: Option<Decimal>,
    pub start_date: Option<DateTime<Utc>>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub usage_limit: Option<i32>,
    pub used_count: i32,
    pub user_limit: i32,
    pub is_active: bool,
    pub products: Vec<Uuid>,
    pub categories: Vec<Uuid>,
    pub eligible_users: Vec<Uuid>,
}

impl Default for CouponSeed {
    fn default() -> Self {
        Self {
            code: "SAVE10",
            discount_type: DiscountType::Percentage,
            value: Decimal::from(10),
            min_cart_value: Decimal::ZERO,
            cap: None,
            start_date: None,
            expiry_date: None,
            usage_limit: None,
            used_count: 0,
            user_limit: 1,
            is_active: true,
            products: Vec::new(),
            categories: Vec::new(),
            eligible_users: Vec::new(),
        }
    }
}

pub struct FailingCartStore;

#[async_trait]
impl CartStore for FailingCartStore {
    async fn clear(&self, _user_id: Uuid) -> Result<(), ServiceError> {
        Err(ServiceError::InternalError("cart store unavailable".into()))
    }
}
