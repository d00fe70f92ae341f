//! Domain models mirrored from the backend.

pub mod order;
pub mod product;
pub mod session;

pub use order::{Order, OrderItem, ProductSummary};
pub use product::Product;
pub use session::{Identity, Session, SessionToken};
