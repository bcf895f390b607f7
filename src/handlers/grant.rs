//! 授权管理的 HTTP 处理器
//!
//! gym-permissions: 健身房授予教练编辑本健身房资源的能力
//! user-permissions: 客户授予教练或健身房编辑自己资源的能力

use crate::{
    error::AppError,
    middleware::AppState,
    models::{grant::*, Principal, Role},
    repository::UserRepository,
    services::policy_gate::{
        authorize_individual_grant_creation, authorize_individual_grant_management,
        authorize_individual_grant_view, authorize_tenant_grant_management,
        authorize_tenant_grant_view,
    },
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Default, Deserialize)]
pub struct TenantGrantQuery {
    /// super 必须指定
    pub gym_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct IndividualGrantQuery {
    /// super 必须指定
    pub user_id: Option<Uuid>,
}

// ==================== Gym permissions ====================

/// 列出健身房授权
///
/// admin 看本健身房发出的授权，教练看自己收到的授权。
pub async fn list_tenant_grants(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Query(query): Query<TenantGrantQuery>,
) -> Result<impl IntoResponse, AppError> {
    let repo = state.grant_repo();

    let grants = match principal.role {
        Role::Super => {
            let gym_id = query
                .gym_id
                .ok_or_else(|| AppError::BadRequest("gym_id is required".to_string()))?;
            repo.list_tenant_grants_by_gym(gym_id).await?
        }
        Role::Admin => {
            let gym_id = query.gym_id.unwrap_or(principal.gym_id);
            authorize_tenant_grant_management(&principal, gym_id)?;
            repo.list_tenant_grants_by_gym(gym_id).await?
        }
        Role::Personal => repo.list_tenant_grants_for_coach(principal.id).await?,
        Role::Client => return Err(AppError::Forbidden),
    };

    Ok(Json(json!({
        "grants": grants,
        "count": grants.len()
    })))
}

/// 创建健身房授权
pub async fn create_tenant_grant(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Json(req): Json<CreateTenantGrantRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let gym_id = req.gym_id.unwrap_or(principal.gym_id);
    authorize_tenant_grant_management(&principal, gym_id)?;

    let repo = state.grant_repo();
    if !repo.gym_exists(gym_id).await? {
        return Err(AppError::NotFound);
    }

    let coach = UserRepository::new(state.db.clone())
        .find_principal(req.coach_id)
        .await?;
    if !coach.is_some_and(|c| c.is_coach()) {
        return Err(AppError::BadRequest(
            "coach_id must reference a personal trainer".to_string(),
        ));
    }

    let grant = repo.create_tenant_grant(gym_id, &req).await?;

    tracing::info!(
        grant_id = %grant.id,
        gym_id = %gym_id,
        coach_id = %grant.coach_id,
        "Tenant grant created"
    );

    Ok((StatusCode::CREATED, Json(grant)))
}

/// 获取健身房授权
pub async fn get_tenant_grant(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let grant = state
        .grant_repo()
        .find_tenant_grant(id)
        .await?
        .ok_or(AppError::NotFound)?;
    authorize_tenant_grant_view(&principal, &grant)?;

    Ok(Json(grant))
}

/// 更新健身房授权的能力
pub async fn update_tenant_grant(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateTenantGrantRequest>,
) -> Result<impl IntoResponse, AppError> {
    let repo = state.grant_repo();
    let grant = repo.find_tenant_grant(id).await?.ok_or(AppError::NotFound)?;
    authorize_tenant_grant_management(&principal, grant.gym_id)?;

    let grant = repo
        .update_tenant_grant(id, &req)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(Json(grant))
}

/// 启用/停用健身房授权
pub async fn set_tenant_grant_active(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(req): Json<SetGrantActiveRequest>,
) -> Result<impl IntoResponse, AppError> {
    let repo = state.grant_repo();
    let grant = repo.find_tenant_grant(id).await?.ok_or(AppError::NotFound)?;
    authorize_tenant_grant_management(&principal, grant.gym_id)?;

    let grant = repo
        .set_tenant_grant_active(id, req.active)
        .await?
        .ok_or(AppError::NotFound)?;

    tracing::info!(grant_id = %id, active = req.active, "Tenant grant toggled");

    Ok(Json(grant))
}

/// 删除健身房授权
pub async fn delete_tenant_grant(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let repo = state.grant_repo();
    let grant = repo.find_tenant_grant(id).await?.ok_or(AppError::NotFound)?;
    authorize_tenant_grant_management(&principal, grant.gym_id)?;

    if !repo.delete_tenant_grant(id).await? {
        return Err(AppError::NotFound);
    }

    tracing::info!(grant_id = %id, "Tenant grant deleted");

    Ok(StatusCode::NO_CONTENT)
}

// ==================== User permissions ====================

/// 列出个人授权
///
/// 客户看自己发出的，教练和 admin 看自己（或本健身房）收到的。
pub async fn list_individual_grants(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Query(query): Query<IndividualGrantQuery>,
) -> Result<impl IntoResponse, AppError> {
    let repo = state.grant_repo();

    let grants = match principal.role {
        Role::Super => {
            let user_id = query
                .user_id
                .ok_or_else(|| AppError::BadRequest("user_id is required".to_string()))?;
            repo.list_individual_grants_by_user(user_id).await?
        }
        Role::Admin => {
            repo.list_individual_grants_for_grantee(GranteeType::Gym, principal.gym_id)
                .await?
        }
        Role::Personal => {
            repo.list_individual_grants_for_grantee(GranteeType::Coach, principal.id)
                .await?
        }
        Role::Client => repo.list_individual_grants_by_user(principal.id).await?,
    };

    Ok(Json(json!({
        "grants": grants,
        "count": grants.len()
    })))
}

/// 客户创建个人授权
pub async fn create_individual_grant(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Json(req): Json<CreateIndividualGrantRequest>,
) -> Result<impl IntoResponse, AppError> {
    authorize_individual_grant_creation(&principal)?;
    req.validate()?;

    let repo = state.grant_repo();
    let grantee_exists = match req.grantee_type {
        GranteeType::Coach => UserRepository::new(state.db.clone())
            .find_principal(req.grantee_id)
            .await?
            .is_some_and(|c| c.is_coach()),
        GranteeType::Gym => repo.gym_exists(req.grantee_id).await?,
    };
    if !grantee_exists {
        return Err(AppError::BadRequest(format!(
            "grantee_id does not reference an existing {}",
            req.grantee_type
        )));
    }

    let grant = repo.create_individual_grant(principal.id, &req).await?;

    tracing::info!(
        grant_id = %grant.id,
        grantee_type = %grant.grantee_type,
        grantee_id = %grant.grantee_id,
        "Individual grant created"
    );

    Ok((StatusCode::CREATED, Json(grant)))
}

pub async fn get_individual_grant(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let grant = state
        .grant_repo()
        .find_individual_grant(id)
        .await?
        .ok_or(AppError::NotFound)?;
    authorize_individual_grant_view(&principal, &grant)?;

    Ok(Json(grant))
}

pub async fn update_individual_grant(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateIndividualGrantRequest>,
) -> Result<impl IntoResponse, AppError> {
    let repo = state.grant_repo();
    let grant = repo
        .find_individual_grant(id)
        .await?
        .ok_or(AppError::NotFound)?;
    authorize_individual_grant_management(&principal, &grant)?;

    let grant = repo
        .update_individual_grant(id, &req)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(Json(grant))
}

pub async fn set_individual_grant_active(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(req): Json<SetGrantActiveRequest>,
) -> Result<impl IntoResponse, AppError> {
    let repo = state.grant_repo();
    let grant = repo
        .find_individual_grant(id)
        .await?
        .ok_or(AppError::NotFound)?;
    authorize_individual_grant_management(&principal, &grant)?;

    let grant = repo
        .set_individual_grant_active(id, req.active)
        .await?
        .ok_or(AppError::NotFound)?;

    tracing::info!(grant_id = %id, active = req.active, "Individual grant toggled");

    Ok(Json(grant))
}

pub async fn delete_individual_grant(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let repo = state.grant_repo();
    let grant = repo
        .find_individual_grant(id)
        .await?
        .ok_or(AppError::NotFound)?;
    authorize_individual_grant_management(&principal, &grant)?;

    if !repo.delete_individual_grant(id).await? {
        return Err(AppError::NotFound);
    }

    tracing::info!(grant_id = %id, "Individual grant deleted");

    Ok(StatusCode::NO_CONTENT)
}
