//! HTTP 中间件
//! 应用状态与请求追踪

use crate::{auth::JwtService, config::AppConfig, repository::{GrantRepository, ResourceRepository}};
use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

/// 应用状态
///
/// 只保存跨请求共享的只读依赖。权限缓存按请求创建，不放在这里。
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub db: PgPool,
    pub jwt_service: Arc<JwtService>,
}

impl AppState {
    pub fn new(config: AppConfig, db: PgPool) -> Result<Self, crate::error::AppError> {
        let jwt_service = Arc::new(JwtService::from_config(&config)?);
        Ok(Self {
            config,
            db,
            jwt_service,
        })
    }

    pub fn grant_repo(&self) -> GrantRepository {
        GrantRepository::new(self.db.clone())
    }

    pub fn resource_repo(&self) -> ResourceRepository {
        ResourceRepository::new(self.db.clone())
    }
}

/// 请求追踪中间件
/// 为每个请求生成 trace_id 和 request_id，并记录指标
pub async fn request_tracking_middleware(req: Request, next: Next) -> Response {
    let trace_id = extract_or_generate_trace_id(req.headers());
    let request_id = Uuid::new_v4().to_string();

    let method = req.method().to_string();
    let uri = req.uri().path().to_string();

    let span = tracing::info_span!(
        "http_request",
        trace_id = %trace_id,
        request_id = %request_id,
        method = %method,
        uri = %uri,
    );

    async move {
        let start = Instant::now();

        let mut response = next.run(req).await;

        let elapsed = start.elapsed();
        let status = response.status().as_u16();

        // 指标标签使用静态字符串
        let method_name = match method.as_str() {
            "GET" => "GET",
            "POST" => "POST",
            "PUT" => "PUT",
            "DELETE" => "DELETE",
            "PATCH" => "PATCH",
            _ => "UNKNOWN",
        };
        let status_code = match status {
            200 => "200",
            201 => "201",
            204 => "204",
            400 => "400",
            401 => "401",
            403 => "403",
            404 => "404",
            409 => "409",
            500 => "500",
            _ => "other",
        };

        metrics::counter!("http_requests_total", "method" => method_name, "status" => status_code)
            .increment(1);
        metrics::histogram!("http_request_duration_seconds").record(elapsed.as_secs_f64());

        tracing::info!(
            method = %method,
            uri = %uri,
            status = status,
            elapsed_ms = elapsed.as_millis(),
            "Request completed"
        );

        if let Ok(value) = HeaderValue::from_str(&trace_id) {
            response.headers_mut().insert("x-trace-id", value);
        }
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            response.headers_mut().insert("x-request-id", value);
        }

        response
    }
    .instrument(span)
    .await
}

/// 从请求头中提取或生成 trace_id
fn extract_or_generate_trace_id(headers: &HeaderMap) -> String {
    headers
        .get("x-trace-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}
