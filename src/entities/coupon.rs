use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::services::discounts::DiscountKind;

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    #[sea_orm(string_value = "percentage")]
    Percentage,
    #[sea_orm(string_value = "fixed")]
    Fixed,
}

/// Set of foreign keys stored as a JSON array. Empty means "no restriction".
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
#[serde(transparent)]
pub struct IdSet(pub BTreeSet<Uuid>);

impl IdSet {
    pub fn is_unrestricted(&self) -> bool {
        self.0.is_empty()
    }

    /// Empty sets admit everything.
    pub fn admits(&self, id: &Uuid) -> bool {
        self.0.is_empty() || self.0.contains(id)
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.0.contains(id)
    }

    pub fn to_vec(&self) -> Vec<Uuid> {
        self.0.iter().copied().collect()
    }
}

impl FromIterator<Uuid> for IdSet {
    fn from_iter<I: IntoIterator<Item = Uuid>>(iter: I) -> Self {
        IdSet(iter.into_iter().collect())
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "coupons")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub code: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub min_cart_value: Decimal,
    pub max_discount_cap: Option<Decimal>,
    pub start_date: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
    pub usage_limit: Option<i32>,
    pub used_count: i32,
    pub user_limit: i32,
    pub is_active: bool,
    #[sea_orm(column_type = "Json")]
    pub applicable_products: IdSet,
    #[sea_orm(column_type = "Json")]
    pub applicable_categories: IdSet,
    #[sea_orm(column_type = "Json")]
    pub eligible_users: IdSet,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    /// The typed discount rule this definition describes.
    pub fn discount_kind(&self) -> DiscountKind {
        match self.discount_type {
            DiscountType::Percentage => DiscountKind::Percentage {
                rate: self.discount_value,
                cap: self.max_discount_cap,
            },
            DiscountType::Fixed => DiscountKind::Fixed {
                amount: self.discount_value,
            },
        }
    }

    pub fn usage_exhausted(&self) -> bool {
        self.usage_limit
            .map(|limit| self.used_count >= limit)
            .unwrap_or(false)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order::Entity")]
    Orders,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Canonical stored form of a coupon code.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}
