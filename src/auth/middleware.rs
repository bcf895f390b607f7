//! JWT 认证中间件
//! 校验令牌后加载操作者，附加到请求扩展

use crate::{error::AppError, middleware::AppState, models::Principal, repository::UserRepository};
use axum::{
    extract::{FromRequestParts, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

// 实现 FromRequestParts 以便在 handler 中直接提取 Principal
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}

/// 从 Authorization 头提取令牌
pub fn extract_token(headers: &HeaderMap) -> Result<String, AppError> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .ok_or(AppError::Unauthorized)
}

/// JWT 认证中间件 - 必须认证
///
/// 令牌有效但用户不存在或未审核通过时同样返回 401。
pub async fn jwt_auth_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_token(req.headers())?;
    let claims = state.jwt_service.validate_access_token(&token)?;
    let user_id = claims.user_id()?;

    let principal = UserRepository::new(state.db.clone())
        .find_principal(user_id)
        .await?
        .ok_or(AppError::Unauthorized)?;

    if !principal.approved {
        tracing::debug!(user_id = %user_id, "User not approved");
        return Err(AppError::Unauthorized);
    }

    req.extensions_mut().insert(principal);

    Ok(next.run(req).await)
}
