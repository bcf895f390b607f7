//! HTTP 处理器模块

pub mod grant;
pub mod health;
pub mod resource;
