//! 统一错误模型
//! 定义所有错误类型和错误响应格式

use crate::models::grant::Grant;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use thiserror::Error;

/// 应用错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 存储层错误，原样向上传播，不在核心内重试
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication failed")]
    Unauthorized,

    /// 授权被拒绝
    #[error("Access denied")]
    Forbidden,

    #[error("Resource not found")]
    NotFound,

    /// 授权已存在，携带已有的授权以便调用方幂等处理
    #[error("Grant already exists")]
    GrantConflict(Box<Grant>),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Internal server error")]
    Internal,
}

impl AppError {
    /// 获取 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::GrantConflict(_) => StatusCode::CONFLICT,
            AppError::BadRequest(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Database(_) | AppError::Config(_) | AppError::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// 获取用户友好的错误消息（不包含敏感信息）
    pub fn user_message(&self) -> String {
        match self {
            AppError::Unauthorized => "Authentication failed".to_string(),
            AppError::Forbidden => "Access denied".to_string(),
            AppError::NotFound => "Resource not found".to_string(),
            AppError::GrantConflict(_) => "Grant already exists".to_string(),
            AppError::BadRequest(msg) => msg.clone(),
            AppError::Validation(errors) => format!("Validation failed: {}", errors),
            AppError::Database(_) => "Database error occurred".to_string(),
            AppError::Config(_) => "Configuration error".to_string(),
            AppError::Internal => "Internal server error".to_string(),
        }
    }

    /// 获取错误码
    pub fn code(&self) -> u16 {
        self.status_code().as_u16()
    }
}

/// 错误响应 DTO
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: u16,
    pub message: String,
    pub request_id: String,
    /// 冲突时返回已存在的授权
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing: Option<Grant>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let request_id = uuid::Uuid::new_v4().to_string();

        // 4xx 为预期内的业务结果，5xx 才按错误记录
        if status.is_server_error() {
            tracing::error!(
                code = self.code(),
                message = %self,
                request_id = %request_id,
                "Application error"
            );
        } else {
            tracing::info!(
                code = self.code(),
                message = %self,
                request_id = %request_id,
                "Request rejected"
            );
        }

        let message = self.user_message();
        let code = self.code();
        let existing = match self {
            AppError::GrantConflict(grant) => Some(*grant),
            _ => None,
        };

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code,
                message,
                request_id,
                existing,
            },
        };

        (status, Json(error_response)).into_response()
    }
}

/// 从 config::ConfigError 转换
impl From<config::ConfigError> for AppError {
    fn from(e: config::ConfigError) -> Self {
        AppError::Config(e.to_string())
    }
}
