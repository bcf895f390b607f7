//! Database repository layer

pub mod grant_repo;
pub mod resource_repo;
pub mod store;
pub mod user_repo;

pub use grant_repo::*;
pub use resource_repo::*;
pub use store::*;
pub use user_repo::*;
