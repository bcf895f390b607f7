//! 健身房管理系统的授权引擎
//! 多租户权限解析、可见性投影与操作闸门

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod routes;
pub mod services;
pub mod telemetry;
