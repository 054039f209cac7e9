//! Business logic for the storefront core.

pub mod carts;
pub mod checkout;
pub mod orders;
pub mod products;
pub mod sweeper;

// Re-export services for convenience
pub use carts::{AddItemInput, CartOwner, CartService, CartValidation, CartWithItems};
pub use checkout::{CheckoutInput, CheckoutService};
pub use orders::OrderService;
pub use products::ProductService;
