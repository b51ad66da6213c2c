pub mod cart_item;
pub mod factory_purchase;
pub mod order;
pub mod order_item;
pub mod payment;
pub mod purchase_history;
