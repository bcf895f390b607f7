//! 操作级权限闸门
//!
//! 处理器在执行操作前调用，拒绝时返回 [`AppError::Forbidden`]。

use super::permission_resolver::PermissionResolver;
use crate::{
    error::AppError,
    models::{GranteeType, IndividualGrant, Principal, ResourceKind, ResourceSummary, Role, TenantGrant},
    repository::{GrantStore, ResourceLookup},
};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Index,
    Show,
    Create,
    Update,
    Delete,
    /// 复制可复用模板
    Clone,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Index => "index",
            Action::Show => "show",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Clone => "clone",
        };
        f.write_str(name)
    }
}

/// 只看角色：client 不能创建资源
pub fn can_create(principal: &Principal) -> bool {
    match principal.role {
        Role::Super | Role::Admin | Role::Personal => true,
        Role::Client => false,
    }
}

/// 检查操作权限
///
/// `show`、`update`、`delete`、`clone` 需要目标资源，缺失时返回 [`AppError::NotFound`]。
pub async fn authorize<G, R>(
    resolver: &mut PermissionResolver<'_, G, R>,
    action: Action,
    principal: &Principal,
    kind: ResourceKind,
    resource: Option<&ResourceSummary>,
) -> Result<(), AppError>
where
    G: GrantStore,
    R: ResourceLookup,
{
    let allowed = match action {
        Action::Index => true,
        Action::Create => can_create(principal),
        Action::Show => {
            let resource = resource.ok_or(AppError::NotFound)?;
            kind == ResourceKind::Exercise
                || resource.reusable
                || principal.is_home_gym(resource.gym_id)
                || resolver
                    .has_full_access(principal, kind, resource.id, resource.gym_id)
                    .await?
        }
        Action::Update => {
            let resource = resource.ok_or(AppError::NotFound)?;
            resolver.can_edit(principal, kind, resource).await?
        }
        Action::Delete => {
            let resource = resource.ok_or(AppError::NotFound)?;
            resolver.can_delete(principal, kind, resource).await?
        }
        Action::Clone => {
            let resource = resource.ok_or(AppError::NotFound)?;
            can_create(principal)
                && (resource.reusable
                    || resolver
                        .has_full_access(principal, kind, resource.id, resource.gym_id)
                        .await?)
        }
    };

    if allowed {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

/// 管理某个健身房发出的授权：super 或该健身房的 admin
pub fn authorize_tenant_grant_management(
    principal: &Principal,
    gym_id: Uuid,
) -> Result<(), AppError> {
    let allowed = match principal.role {
        Role::Super => true,
        Role::Admin => principal.gym_id == gym_id,
        Role::Personal | Role::Client => false,
    };

    if allowed {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

/// 管理个人授权：只有授权方本人或 super
pub fn authorize_individual_grant_management(
    principal: &Principal,
    grant: &IndividualGrant,
) -> Result<(), AppError> {
    let allowed = match principal.role {
        Role::Super => true,
        Role::Admin | Role::Personal | Role::Client => grant.user_id == principal.id,
    };

    if allowed {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

/// 查看健身房授权：管理者或被授权的教练本人
pub fn authorize_tenant_grant_view(principal: &Principal, grant: &TenantGrant) -> Result<(), AppError> {
    if grant.coach_id == principal.id {
        return Ok(());
    }
    authorize_tenant_grant_management(principal, grant.gym_id)
}

/// 只有客户本人能发出个人授权
pub fn authorize_individual_grant_creation(principal: &Principal) -> Result<(), AppError> {
    match principal.role {
        Role::Client => Ok(()),
        Role::Super | Role::Admin | Role::Personal => Err(AppError::Forbidden),
    }
}

/// 查看个人授权：授权方、super，或被授权的教练/健身房管理员
pub fn authorize_individual_grant_view(
    principal: &Principal,
    grant: &IndividualGrant,
) -> Result<(), AppError> {
    let is_grantee = match grant.grantee_type {
        GranteeType::Coach => grant.grantee_id == principal.id,
        GranteeType::Gym => principal.role == Role::Admin && grant.grantee_id == principal.gym_id,
    };
    if is_grantee {
        return Ok(());
    }
    authorize_individual_grant_management(principal, grant)
}
