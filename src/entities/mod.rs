pub mod cart_item;
pub mod coupon;
pub mod order;
pub mod order_item;
pub mod order_sequence;
pub mod order_status_history;
pub mod product; // Read-only catalog view

pub use cart_item::{Entity as CartItem, Model as CartItemModel};
pub use coupon::{DiscountType, Entity as Coupon, IdSet, Model as CouponModel};
pub use order::{Entity as Order, Model as OrderModel, OrderStatus};
pub use order_item::{Entity as OrderItem, Model as OrderItemModel};
pub use order_sequence::{Entity as OrderSequence, Model as OrderSequenceModel};
pub use order_status_history::{Entity as OrderStatusHistory, Model as OrderStatusHistoryModel};
pub use product::{Entity as Product, Model as ProductModel};
