//! Business logic services layer

pub mod permission_resolver;
pub mod policy_gate;
pub mod projector;
pub mod request_cache;

pub use permission_resolver::PermissionResolver;
pub use policy_gate::{authorize, Action};
pub use projector::{project, Projectable, Projected, ResourceView};
pub use request_cache::RequestCache;
