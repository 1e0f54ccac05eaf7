// Pure pricing rules
pub mod discounts;

// Ports onto collaborators owned elsewhere in the storefront
pub mod carts;
pub mod catalog;

// Coupon evaluation and checkout
pub mod coupons;
pub mod order_numbers;
pub mod settlement;

// Back-office operations
pub mod coupon_admin;
pub mod order_status;
