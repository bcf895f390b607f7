//! 数据模型模块
//! 操作者、受保护资源与授权

pub mod grant;
pub mod principal;
pub mod resource;

pub use grant::*;
pub use principal::*;
pub use resource::*;
