//! Shopfront core types and client-side state

pub mod error;
pub mod pc_build;
pub mod session;
pub mod storage;
pub mod types;

pub use error::{CoreError, CoreResult};
pub use pc_build::{BuildSlot, CompatibilityRule, PcBuild};
pub use session::{ACCESS_TOKEN_KEY, Session, SessionStore, USER_KEY};
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use types::{
    Category, DeliveryService, Discount, DiscountKind, Order, OrderItem, OrderStatus, Product,
    Role, SalesPoint, SalesSummary, SpecHighlight, UserProfile,
};
