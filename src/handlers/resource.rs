//! 饮食、训练、动作、商品的 HTTP 处理器
//!
//! 每个请求创建自己的 [`PermissionResolver`]，先经过权限闸门，再按完整/受限视图输出。

use crate::{
    config::PaginationConfig,
    error::AppError,
    middleware::AppState,
    models::{Principal, ProtectedResource, ResourceKind, ResourceSummary},
    repository::{GrantStore, ResourceLookup},
    services::{authorize, project, Action, PermissionResolver, Projectable},
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

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    /// 列表的完整视图也考虑客户个人授权
    #[serde(default)]
    pub individual_grants: bool,
}

impl ListQuery {
    /// 返回 (limit, offset)，limit 限制在 1..=max_limit
    pub fn page(&self, config: &PaginationConfig) -> (i64, i64) {
        let limit = self
            .limit
            .unwrap_or(config.default_limit)
            .clamp(1, config.max_limit);
        let offset = self.offset.unwrap_or(0).max(0);
        (limit, offset)
    }
}

/// 逐个投影列表中的资源
async fn project_list<T, G, R>(
    resolver: &mut PermissionResolver<'_, G, R>,
    principal: &Principal,
    items: Vec<T>,
    individual_grants: bool,
) -> Result<Json<serde_json::Value>, AppError>
where
    T: ProtectedResource + Projectable,
    G: GrantStore,
    R: ResourceLookup,
{
    let summaries: Vec<ResourceSummary> = items.iter().map(|item| item.summary()).collect();
    let full = if individual_grants {
        resolver
            .full_access_ids_with_individual_grants(principal, T::KIND, &summaries)
            .await?
    } else {
        resolver.full_access_ids(principal, T::KIND, &summaries).await?
    };

    let items: Vec<_> = items
        .into_iter()
        .zip(&summaries)
        .map(|(item, summary)| project(item, full.contains(&summary.id)))
        .collect();

    Ok(Json(json!({
        "count": items.len(),
        "items": items,
    })))
}

/// 闸门检查后按可见性输出单个资源
async fn show_resource<T, G, R>(
    resolver: &mut PermissionResolver<'_, G, R>,
    principal: &Principal,
    resource: Option<T>,
) -> Result<Json<serde_json::Value>, AppError>
where
    T: ProtectedResource + Projectable,
    G: GrantStore,
    R: ResourceLookup,
{
    let resource = resource.ok_or(AppError::NotFound)?;
    let summary = resource.summary();

    authorize(resolver, Action::Show, principal, T::KIND, Some(&summary)).await?;
    let full_access = resolver
        .has_full_access(principal, T::KIND, summary.id, summary.gym_id)
        .await?;

    Ok(Json(serde_json::to_value(project(resource, full_access)).map_err(|e| {
        tracing::error!("Failed to serialize {}: {}", T::KIND, e);
        AppError::Internal
    })?))
}

// ==================== Diets ====================

/// 列出饮食
pub async fn list_diets(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let grants = state.grant_repo();
    let resources = state.resource_repo();
    let mut resolver = PermissionResolver::new(&grants, &resources);

    authorize(&mut resolver, Action::Index, &principal, ResourceKind::Diet, None).await?;
    let scope = resolver
        .list_scope(&principal, ResourceKind::Diet, query.individual_grants)
        .await?;
    let (limit, offset) = query.page(&state.config.pagination);
    let diets = resources.list_diets(&scope, limit, offset).await?;

    project_list(&mut resolver, &principal, diets, query.individual_grants).await
}

/// 获取饮食详情
pub async fn get_diet(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let grants = state.grant_repo();
    let resources = state.resource_repo();
    let mut resolver = PermissionResolver::new(&grants, &resources);

    let diet = resources.get_diet(id).await?;
    show_resource(&mut resolver, &principal, diet).await
}

/// 删除饮食
pub async fn delete_diet(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let grants = state.grant_repo();
    let resources = state.resource_repo();
    let mut resolver = PermissionResolver::new(&grants, &resources);

    let summary = resources.get_diet(id).await?.map(|d| d.summary());
    authorize(&mut resolver, Action::Delete, &principal, ResourceKind::Diet, summary.as_ref()).await?;

    if !resources.delete_diet(id).await? {
        return Err(AppError::NotFound);
    }

    Ok(StatusCode::NO_CONTENT)
}

/// 复制饮食到操作者所在健身房
pub async fn clone_diet(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let grants = state.grant_repo();
    let resources = state.resource_repo();
    let mut resolver = PermissionResolver::new(&grants, &resources);

    let summary = resources.get_diet(id).await?.map(|d| d.summary());
    authorize(&mut resolver, Action::Clone, &principal, ResourceKind::Diet, summary.as_ref()).await?;

    let diet = resources
        .clone_diet(id, principal.gym_id, principal.id)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok((StatusCode::CREATED, Json(project(diet, true))))
}

// ==================== Trainings ====================

/// 列出训练
pub async fn list_trainings(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let grants = state.grant_repo();
    let resources = state.resource_repo();
    let mut resolver = PermissionResolver::new(&grants, &resources);

    authorize(&mut resolver, Action::Index, &principal, ResourceKind::Training, None).await?;
    let scope = resolver
        .list_scope(&principal, ResourceKind::Training, query.individual_grants)
        .await?;
    let (limit, offset) = query.page(&state.config.pagination);
    let trainings = resources.list_trainings(&scope, limit, offset).await?;

    project_list(&mut resolver, &principal, trainings, query.individual_grants).await
}

/// 获取训练详情
pub async fn get_training(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let grants = state.grant_repo();
    let resources = state.resource_repo();
    let mut resolver = PermissionResolver::new(&grants, &resources);

    let training = resources.get_training(id).await?;
    show_resource(&mut resolver, &principal, training).await
}

/// 删除训练
pub async fn delete_training(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let grants = state.grant_repo();
    let resources = state.resource_repo();
    let mut resolver = PermissionResolver::new(&grants, &resources);

    let summary = resources.get_training(id).await?.map(|t| t.summary());
    authorize(&mut resolver, Action::Delete, &principal, ResourceKind::Training, summary.as_ref())
        .await?;

    if !resources.delete_training(id).await? {
        return Err(AppError::NotFound);
    }

    Ok(StatusCode::NO_CONTENT)
}

/// 复制训练，副本由操作者负责
pub async fn clone_training(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let grants = state.grant_repo();
    let resources = state.resource_repo();
    let mut resolver = PermissionResolver::new(&grants, &resources);

    let summary = resources.get_training(id).await?.map(|t| t.summary());
    authorize(&mut resolver, Action::Clone, &principal, ResourceKind::Training, summary.as_ref())
        .await?;

    let training = resources
        .clone_training(id, principal.gym_id, principal.id)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok((StatusCode::CREATED, Json(project(training, true))))
}

// ==================== Exercises ====================

pub async fn list_exercises(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let grants = state.grant_repo();
    let resources = state.resource_repo();
    let mut resolver = PermissionResolver::new(&grants, &resources);

    authorize(&mut resolver, Action::Index, &principal, ResourceKind::Exercise, None).await?;
    let (limit, offset) = query.page(&state.config.pagination);
    let exercises = resources.list_exercises(limit, offset).await?;

    project_list(&mut resolver, &principal, exercises, false).await
}

pub async fn get_exercise(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let grants = state.grant_repo();
    let resources = state.resource_repo();
    let mut resolver = PermissionResolver::new(&grants, &resources);

    let exercise = resources.get_exercise(id).await?;
    show_resource(&mut resolver, &principal, exercise).await
}

// ==================== Products ====================

pub async fn list_products(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let grants = state.grant_repo();
    let resources = state.resource_repo();
    let mut resolver = PermissionResolver::new(&grants, &resources);

    authorize(&mut resolver, Action::Index, &principal, ResourceKind::Product, None).await?;
    let scope = resolver
        .list_scope(&principal, ResourceKind::Product, false)
        .await?;
    let (limit, offset) = query.page(&state.config.pagination);
    let products = resources.list_products(&scope, limit, offset).await?;

    project_list(&mut resolver, &principal, products, false).await
}

pub async fn get_product(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let grants = state.grant_repo();
    let resources = state.resource_repo();
    let mut resolver = PermissionResolver::new(&grants, &resources);

    let product = resources.get_product(id).await?;
    show_resource(&mut resolver, &principal, product).await
}
