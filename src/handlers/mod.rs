use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::{
    config::AppConfig,
    services::{
        carts::{CartStore, SeaOrmCartStore},
        catalog::{CatalogReader, SeaOrmCatalog},
        coupon_admin::CouponAdminService,
        coupons::CouponEvaluator,
        order_numbers::OrderNumberAllocator,
        order_status::OrderStatusService,
        settlement::OrderSettlementService,
    },
};

pub mod admin_coupons;
pub mod common;
pub mod coupons;
pub mod health;
pub mod orders;

/// Services shared by every HTTP handler
#[derive(Clone)]
pub struct AppServices {
    pub coupons: Arc<CouponEvaluator>,
    pub settlement: Arc<OrderSettlementService>,
    pub coupon_admin: Arc<CouponAdminService>,
    pub order_status: Arc<OrderStatusService>,
}

impl AppServices {
    /// Wires the services against the database-backed catalog and cart store.
    pub fn new(db: Arc<DatabaseConnection>, config: &AppConfig) -> Self {
        let catalog: Arc<dyn CatalogReader> = Arc::new(SeaOrmCatalog::new(db.clone()));
        let carts: Arc<dyn CartStore> = Arc::new(SeaOrmCartStore::new(db.clone()));
        Self::with_ports(db, config, catalog, carts)
    }

    /// Same as [`AppServices::new`] with caller-supplied catalog and cart store.
    pub fn with_ports(
        db: Arc<DatabaseConnection>,
        config: &AppConfig,
        catalog: Arc<dyn CatalogReader>,
        carts: Arc<dyn CartStore>,
    ) -> Self {
        let evaluator = CouponEvaluator::new(db.clone(), catalog.clone());
        let numbers = OrderNumberAllocator::new(
            config.order_number_prefix.clone(),
            config.order_number_width,
        );
        let settlement = OrderSettlementService::new(
            db.clone(),
            catalog,
            carts,
            evaluator.clone(),
            numbers,
        );

        Self {
            coupons: Arc::new(evaluator),
            settlement: Arc::new(settlement),
            coupon_admin: Arc::new(CouponAdminService::new(db.clone())),
            order_status: Arc::new(OrderStatusService::new(db)),
        }
    }
}
