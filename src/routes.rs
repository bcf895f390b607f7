//! 路由注册
//! 创建所有 API 路由并应用中间件

use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;

use crate::{handlers, middleware::AppState};

/// 创建应用路由
pub fn create_router(state: Arc<AppState>) -> Router {
    // 公开端点（健康检查）
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check));

    // 需要认证的路由
    let authenticated_routes = Router::new()
        // 饮食
        .route("/api/v1/diets", get(handlers::resource::list_diets))
        .route(
            "/api/v1/diets/{id}",
            get(handlers::resource::get_diet).delete(handlers::resource::delete_diet),
        )
        .route("/api/v1/diets/{id}/clone", post(handlers::resource::clone_diet))

        // 训练
        .route("/api/v1/trainings", get(handlers::resource::list_trainings))
        .route(
            "/api/v1/trainings/{id}",
            get(handlers::resource::get_training).delete(handlers::resource::delete_training),
        )
        .route(
            "/api/v1/trainings/{id}/clone",
            post(handlers::resource::clone_training),
        )

        // 动作库与商品
        .route("/api/v1/exercises", get(handlers::resource::list_exercises))
        .route("/api/v1/exercises/{id}", get(handlers::resource::get_exercise))
        .route("/api/v1/products", get(handlers::resource::list_products))
        .route("/api/v1/products/{id}", get(handlers::resource::get_product))

        // 健身房授权
        .route(
            "/api/v1/gym-permissions",
            get(handlers::grant::list_tenant_grants).post(handlers::grant::create_tenant_grant),
        )
        .route(
            "/api/v1/gym-permissions/{id}",
            get(handlers::grant::get_tenant_grant)
                .put(handlers::grant::update_tenant_grant)
                .delete(handlers::grant::delete_tenant_grant),
        )
        .route(
            "/api/v1/gym-permissions/{id}/active",
            put(handlers::grant::set_tenant_grant_active),
        )

        // 个人授权
        .route(
            "/api/v1/user-permissions",
            get(handlers::grant::list_individual_grants)
                .post(handlers::grant::create_individual_grant),
        )
        .route(
            "/api/v1/user-permissions/{id}",
            get(handlers::grant::get_individual_grant)
                .put(handlers::grant::update_individual_grant)
                .delete(handlers::grant::delete_individual_grant),
        )
        .route(
            "/api/v1/user-permissions/{id}/active",
            put(handlers::grant::set_individual_grant_active),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::auth::middleware::jwt_auth_middleware,
        ));

    // 组合所有路由
    Router::new()
        .merge(public_routes)
        .merge(authenticated_routes)
        .layer(RequestBodyLimitLayer::new(state.config.server.body_limit_bytes))
        .layer(axum::middleware::from_fn(crate::middleware::request_tracking_middleware))
        .with_state(state)
}
