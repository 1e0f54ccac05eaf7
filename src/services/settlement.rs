use std::sync::Arc;

use chrono::{DateTime, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::{Condition, Expr},
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set, TransactionTrait,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    entities::{
        coupon::{self, Entity as CouponEntity},
        order::{self, OrderStatus},
        order_item, order_status_history,
    },
    errors::{CouponRejection, ServiceError},
    services::{
        carts::CartStore,
        catalog::CatalogReader,
        coupons::{record_outcome, CartLine, CouponEvaluator, CouponQuote, PricedCart},
        discounts::PricedLine,
        order_numbers::OrderNumberAllocator,
        order_status::OrderDetails,
    },
};

/// Who the order is for and where it goes.
#[derive(Debug, Clone, Default)]
pub struct CustomerInfo {
    pub user_id: Option<Uuid>,
    pub name: Option<String>,
    pub phone: String,
    pub address: String,
    pub email: Option<String>,
    pub notes: Option<String>,
    pub store_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct PlaceOrderInput {
    pub customer: CustomerInfo,
    pub items: Vec<CartLine>,
    pub coupon_id: Option<Uuid>,
}

/// Turns a cart into a persisted order, redeeming its coupon in the same transaction.
#[derive(Clone)]
pub struct OrderSettlementService {
    db: Arc<DatabaseConnection>,
    catalog: Arc<dyn CatalogReader>,
    carts: Arc<dyn CartStore>,
    evaluator: CouponEvaluator,
    numbers: OrderNumberAllocator,
}

impl OrderSettlementService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        catalog: Arc<dyn CatalogReader>,
        carts: Arc<dyn CartStore>,
        evaluator: CouponEvaluator,
        numbers: OrderNumberAllocator,
    ) -> Self {
        Self {
            db,
            catalog,
            carts,
            evaluator,
            numbers,
        }
    }

    /// Places an order.
    ///
    /// A coupon that no longer applies is dropped and the order proceeds at
    /// full price. Nothing is written unless the whole transaction commits.
    #[instrument(
        skip(self, input),
        fields(user_id = ?input.customer.user_id, lines = input.items.len(), coupon_id = ?input.coupon_id)
    )]
    pub async fn place_order(&self, input: PlaceOrderInput) -> Result<OrderDetails, ServiceError> {
        self.place_order_at(input, Utc::now()).await
    }

    pub async fn place_order_at(
        &self,
        input: PlaceOrderInput,
        now: DateTime<Utc>,
    ) -> Result<OrderDetails, ServiceError> {
        check_preconditions(&input)?;

        let cart = self.price_lines(&input.items).await?;
        let subtotal = cart.subtotal();

        let quote = match input.coupon_id {
            Some(coupon_id) => {
                self.requote(coupon_id, input.customer.user_id, &cart, now)
                    .await?
            }
            None => None,
        };

        let txn = self.db.begin().await?;

        let order_number = self.numbers.next(&txn).await?;

        let quote = match quote {
            Some(quote) if redeem(&txn, quote.coupon.id).await? => Some(quote),
            Some(quote) => {
                info!(
                    coupon = %quote.coupon.code,
                    "coupon usage limit reached during settlement; discount dropped"
                );
                counter!("coupons.redemptions.lost_race", 1);
                None
            }
            None => None,
        };

        let discount_amount = quote
            .as_ref()
            .map(|q| q.discount_amount)
            .unwrap_or(Decimal::ZERO);
        let total = (subtotal - discount_amount).max(Decimal::ZERO);

        let customer = input.customer;
        let order_id = Uuid::new_v4();
        let order = order::ActiveModel {
            id: Set(order_id),
            order_number: Set(order_number),
            user_id: Set(customer.user_id),
            status: Set(OrderStatus::Pending),
            subtotal: Set(subtotal),
            discount_amount: Set(discount_amount),
            total: Set(total),
            coupon_id: Set(quote.as_ref().map(|q| q.coupon.id)),
            coupon_code: Set(quote.as_ref().map(|q| q.coupon.code.clone())),
            customer_name: Set(trimmed(customer.name)),
            phone: Set(customer.phone.trim().to_string()),
            address: Set(customer.address.trim().to_string()),
            email: Set(trimmed(customer.email)),
            notes: Set(trimmed(customer.notes)),
            store_id: Set(customer.store_id),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        let mut items = Vec::with_capacity(cart.lines.len());
        for (position, line) in cart.lines.iter().enumerate() {
            let item = order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                position: Set(position as i32),
                product_id: Set(line.product_id),
                quantity: Set(line.quantity),
                price: Set(line.unit_price),
                line_total: Set(line.line_total()),
            }
            .insert(&txn)
            .await?;
            items.push(item);
        }

        let history = order_status_history::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            status: Set(OrderStatus::Pending),
            note: Set(Some("Order placed".to_string())),
            created_at: Set(now),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        counter!("orders.settled", 1);
        if quote.is_some() {
            counter!("coupons.redemptions", 1);
        }
        info!(
            order_id = %order.id,
            order_number = %order.order_number,
            total = %order.total,
            discount = %order.discount_amount,
            "order placed"
        );

        if let Some(user_id) = order.user_id {
            if let Err(e) = self.carts.clear(user_id).await {
                warn!(user_id = %user_id, error = %e, "failed to clear cart after checkout");
            }
        }

        Ok(OrderDetails {
            order,
            items,
            status_history: vec![history],
        })
    }

    /// Prices every line from the catalog; any product it cannot sell aborts the order.
    async fn price_lines(&self, items: &[CartLine]) -> Result<PricedCart, ServiceError> {
        let ids: Vec<Uuid> = items.iter().map(|line| line.product_id).collect();
        let products = self.catalog.products(&ids).await?;

        let lines = items
            .iter()
            .map(|line| match products.get(&line.product_id) {
                Some(product) if product.is_active => Ok(PricedLine {
                    product_id: product.id,
                    category_id: product.category_id,
                    unit_price: product.price,
                    quantity: line.quantity,
                }),
                _ => Err(ServiceError::UnknownProduct(line.product_id)),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(PricedCart {
            lines,
            submitted: items.len(),
        })
    }

    /// Re-runs the evaluator against the live coupon. Rejections yield `None`.
    async fn requote(
        &self,
        coupon_id: Uuid,
        user_id: Option<Uuid>,
        cart: &PricedCart,
        now: DateTime<Utc>,
    ) -> Result<Option<CouponQuote>, ServiceError> {
        let result = match CouponEntity::find_by_id(coupon_id).one(&*self.db).await? {
            Some(coupon) => {
                self.evaluator
                    .evaluate(&*self.db, coupon, user_id, cart, now)
                    .await
            }
            None => Err(CouponRejection::NotFound.into()),
        };
        record_outcome("settlement", &result);

        match result {
            Ok(quote) => Ok(Some(quote)),
            Err(ServiceError::CouponRejected(rejection)) => {
                info!(
                    coupon_id = %coupon_id,
                    reason = rejection.code(),
                    "coupon no longer applies; settling without discount"
                );
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

fn check_preconditions(input: &PlaceOrderInput) -> Result<(), ServiceError> {
    if input.items.is_empty() {
        return Err(ServiceError::MissingField("items"));
    }
    if let Some(line) = input.items.iter().find(|line| line.quantity < 1) {
        return Err(ServiceError::InvalidInput(format!(
            "quantity for product {} must be at least 1",
            line.product_id
        )));
    }

    let customer = &input.customer;
    if customer.phone.trim().is_empty() {
        return Err(ServiceError::MissingField("phone"));
    }
    if customer.address.trim().is_empty() {
        return Err(ServiceError::MissingField("address"));
    }
    let has_name = customer
        .name
        .as_deref()
        .map(|name| !name.trim().is_empty())
        .unwrap_or(false);
    if customer.user_id.is_none() && !has_name {
        return Err(ServiceError::MissingField("name"));
    }
    Ok(())
}

/// Takes one unit of the coupon's global allowance. `false` if none is left.
async fn redeem<C: ConnectionTrait>(conn: &C, coupon_id: Uuid) -> Result<bool, ServiceError> {
    let result = CouponEntity::update_many()
        .col_expr(
            coupon::Column::UsedCount,
            Expr::col(coupon::Column::UsedCount).add(1),
        )
        .col_expr(coupon::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(coupon::Column::Id.eq(coupon_id))
        .filter(
            Condition::any()
                .add(coupon::Column::UsageLimit.is_null())
                .add(
                    Expr::col(coupon::Column::UsedCount)
                        .lt(Expr::col(coupon::Column::UsageLimit)),
                ),
        )
        .exec(conn)
        .await?;
    Ok(result.rows_affected == 1)
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn input(customer: CustomerInfo) -> PlaceOrderInput {
        PlaceOrderInput {
            customer,
            items: vec![CartLine {
                product_id: Uuid::new_v4(),
                quantity: 1,
                unit_price: None,
            }],
            coupon_id: None,
        }
    }

    fn guest() -> CustomerInfo {
        CustomerInfo {
            name: Some("Asha".into()),
            phone: "555-0100".into(),
            address: "12 Baker Street".into(),
            ..Default::default()
        }
    }

    #[test]
    fn empty_cart_is_rejected() {
        let mut order = input(guest());
        order.items.clear();
        assert_matches!(
            check_preconditions(&order),
            Err(ServiceError::MissingField("items"))
        );
    }

    #[test]
    fn blank_phone_and_address_are_missing_fields() {
        let mut customer = guest();
        customer.phone = "   ".into();
        assert_matches!(
            check_preconditions(&input(customer)),
            Err(ServiceError::MissingField("phone"))
        );

        let mut customer = guest();
        customer.address = String::new();
        assert_matches!(
            check_preconditions(&input(customer)),
            Err(ServiceError::MissingField("address"))
        );
    }

    #[test]
    fn guests_need_a_name_but_signed_in_users_do_not() {
        let mut customer = guest();
        customer.name = Some(" ".into());
        assert_matches!(
            check_preconditions(&input(customer.clone())),
            Err(ServiceError::MissingField("name"))
        );

        customer.user_id = Some(Uuid::new_v4());
        assert_matches!(check_preconditions(&input(customer)), Ok(()));
    }

    #[test]
    fn zero_quantity_is_invalid() {
        let mut order = input(guest());
        order.items[0].quantity = 0;
        assert_matches!(
            check_preconditions(&order),
            Err(ServiceError::InvalidInput(_))
        );
    }

    #[test]
    fn trimmed_drops_blank_values() {
        assert_eq!(trimmed(Some("  ".into())), None);
        assert_eq!(trimmed(Some(" a ".into())), Some("a".to_string()));
        assert_eq!(trimmed(None), None);
    }
}
