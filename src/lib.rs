//! Sweetshop API Library
//!
//! Coupon validation and order settlement for the sweets storefront.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod middleware_helpers;
pub mod openapi;
pub mod services;
pub mod tracing;

use axum::{extract::DefaultBodyLimit, routing::get, Router};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub services: handlers::AppServices,
}

impl AppState {
    pub fn new(db: Arc<DatabaseConnection>, config: config::AppConfig) -> Self {
        let services = handlers::AppServices::new(db.clone(), &config);
        Self {
            db,
            config,
            services,
        }
    }
}

/// Routes mounted under `/api/v1`
pub fn api_v1_routes() -> Router<Arc<AppState>> {
    Router::new()
        .nest("/coupons", handlers::coupons::coupons_routes())
        .nest("/orders", handlers::orders::orders_routes())
        .nest(
            "/admin/coupons",
            handlers::admin_coupons::admin_coupons_routes(),
        )
}

/// Full application router without transport-level layers.
///
/// Request ids and the body limit are applied here so tests exercise them too.
pub fn app_router(state: Arc<AppState>) -> Router {
    let max_body_size = state.config.max_body_size;
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .nest("/api/v1", api_v1_routes())
        .merge(openapi::openapi_routes())
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ))
        .with_state(state)
}

pub mod prelude {
    pub use crate::config::AppConfig;
    pub use crate::errors::*;
    pub use crate::services::{
        coupon_admin::{CouponAdminService, CouponDraft, CouponPatch},
        coupons::{CartLine, CouponEvaluator, CouponQuote},
        settlement::{CustomerInfo, OrderSettlementService, PlaceOrderInput},
    };
    pub use crate::{app_router, AppState};
}
