//! 权限解析器
//!
//! 所有"操作者能否编辑/完整查看资源"的判断都从这里得出。
//! 解析器按请求创建，持有该请求独占的 [`RequestCache`]。

use super::request_cache::{CacheKey, Operation, RequestCache};
use crate::{
    error::AppError,
    models::{
        Capability, GranteeScope, GranteeType, ListScope, Principal, ResourceKind,
        ResourceSummary, Role,
    },
    repository::{GrantStore, ResourceLookup},
};
use std::collections::HashSet;
use uuid::Uuid;

pub struct PermissionResolver<'a, G, R> {
    grants: &'a G,
    resources: &'a R,
    cache: RequestCache,
}

impl<'a, G, R> PermissionResolver<'a, G, R>
where
    G: GrantStore,
    R: ResourceLookup,
{
    pub fn new(grants: &'a G, resources: &'a R) -> Self {
        Self::with_cache(grants, resources, RequestCache::new())
    }

    pub fn with_cache(grants: &'a G, resources: &'a R, cache: RequestCache) -> Self {
        Self {
            grants,
            resources,
            cache,
        }
    }

    pub fn cache(&self) -> &RequestCache {
        &self.cache
    }

    pub fn into_cache(self) -> RequestCache {
        self.cache
    }

    /// 操作者能否编辑资源
    ///
    /// 判断顺序：super → admin（仅本健身房，授权无效）→ client（拒绝）→ 教练：
    /// 创建者、本健身房、健身房授权、任一客户的个人授权。各条件是"或"关系，顺序只影响查询次数。
    pub async fn can_edit(
        &mut self,
        principal: &Principal,
        kind: ResourceKind,
        resource: &ResourceSummary,
    ) -> Result<bool, AppError> {
        match principal.role {
            Role::Super => Ok(true),
            Role::Admin => Ok(principal.is_home_gym(resource.gym_id)),
            Role::Client => Ok(false),
            Role::Personal => {
                let key = CacheKey::Decision {
                    operation: Operation::CanEdit,
                    principal_id: principal.id,
                    kind,
                    resource_id: resource.id,
                };
                if let Some(allowed) = self.cache.get(&key) {
                    return Ok(allowed);
                }

                let allowed = self.coach_can_edit(principal, kind, resource).await?;
                self.cache.insert(key, allowed);
                Ok(allowed)
            }
        }
    }

    /// 删除与编辑使用同一套规则
    pub async fn can_delete(
        &mut self,
        principal: &Principal,
        kind: ResourceKind,
        resource: &ResourceSummary,
    ) -> Result<bool, AppError> {
        self.can_edit(principal, kind, resource).await
    }

    async fn coach_can_edit(
        &mut self,
        principal: &Principal,
        kind: ResourceKind,
        resource: &ResourceSummary,
    ) -> Result<bool, AppError> {
        if resource.owner_id == Some(principal.id) {
            return Ok(true);
        }

        if principal.is_home_gym(resource.gym_id) {
            return Ok(true);
        }

        let Some(capability) = kind.capability() else {
            return Ok(false);
        };

        if let Some(gym_id) = resource.gym_id {
            if self.tenant_grant(principal.id, gym_id, capability).await? {
                return Ok(true);
            }
        }

        for &assignee_id in &resource.assignee_ids {
            if self
                .individual_grant(assignee_id, GranteeType::Coach, principal.id, capability)
                .await?
            {
                return Ok(true);
            }

            if self
                .individual_grant(assignee_id, GranteeType::Gym, principal.gym_id, capability)
                .await?
            {
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// 查看时使用完整视图还是受限视图
    ///
    /// `gym_id` 为调用方已知的资源所属健身房，缺省时按需从存储加载。资源不存在时返回 `false`。
    pub async fn has_full_access(
        &mut self,
        principal: &Principal,
        kind: ResourceKind,
        resource_id: Uuid,
        gym_id: Option<Uuid>,
    ) -> Result<bool, AppError> {
        if kind == ResourceKind::Exercise {
            return Ok(match principal.role {
                Role::Super | Role::Admin | Role::Personal => true,
                Role::Client => false,
            });
        }

        match principal.role {
            Role::Super => Ok(true),
            Role::Admin => {
                let gym_id = match gym_id {
                    Some(gym_id) => Some(gym_id),
                    None => self
                        .resources
                        .summary(kind, resource_id)
                        .await?
                        .and_then(|summary| summary.gym_id),
                };
                Ok(principal.is_home_gym(gym_id))
            }
            Role::Personal => {
                if principal.is_home_gym(gym_id) {
                    return Ok(true);
                }

                let key = CacheKey::Decision {
                    operation: Operation::FullAccess,
                    principal_id: principal.id,
                    kind,
                    resource_id,
                };
                if let Some(allowed) = self.cache.get(&key) {
                    return Ok(allowed);
                }

                let allowed = match self.resources.summary(kind, resource_id).await? {
                    Some(summary) => self.can_edit(principal, kind, &summary).await?,
                    None => false,
                };
                self.cache.insert(key, allowed);
                Ok(allowed)
            }
            Role::Client => match kind {
                ResourceKind::Diet => Ok(principal.diet_id == Some(resource_id)),
                ResourceKind::Training => {
                    let key = CacheKey::Decision {
                        operation: Operation::FullAccess,
                        principal_id: principal.id,
                        kind,
                        resource_id,
                    };
                    if let Some(allowed) = self.cache.get(&key) {
                        return Ok(allowed);
                    }

                    let allowed = self
                        .resources
                        .summary(kind, resource_id)
                        .await?
                        .is_some_and(|summary| summary.assignee_ids.contains(&principal.id));
                    self.cache.insert(key, allowed);
                    Ok(allowed)
                }
                ResourceKind::Product | ResourceKind::Exercise => Ok(false),
            },
        }
    }

    /// 批量计算可以完整查看的资源 ID
    ///
    /// 结果与逐个调用 [`has_full_access`](Self::has_full_access) 在角色、创建者、本健身房和健身房授权
    /// 这几条路径上一致，但至多发出一次授权查询。个人授权不在这里检查，列表中仅通过个人授权可编辑的资源
    /// 会以受限视图出现；需要完整结果时使用
    /// [`full_access_ids_with_individual_grants`](Self::full_access_ids_with_individual_grants)。
    pub async fn full_access_ids(
        &mut self,
        principal: &Principal,
        kind: ResourceKind,
        resources: &[ResourceSummary],
    ) -> Result<HashSet<Uuid>, AppError> {
        if kind == ResourceKind::Exercise {
            return Ok(match principal.role {
                Role::Super | Role::Admin | Role::Personal => ids_where(resources, |_| true),
                Role::Client => HashSet::new(),
            });
        }

        match principal.role {
            Role::Super => Ok(ids_where(resources, |_| true)),
            Role::Admin => Ok(ids_where(resources, |r| principal.is_home_gym(r.gym_id))),
            Role::Personal => {
                let direct = |r: &ResourceSummary| {
                    r.owner_id == Some(principal.id) || principal.is_home_gym(r.gym_id)
                };

                let needs_grants = resources.iter().any(|r| !direct(r));
                let granted = match kind.capability() {
                    Some(capability) if needs_grants => {
                        self.granted_gyms(principal.id, capability).await?
                    }
                    _ => HashSet::new(),
                };

                Ok(ids_where(resources, |r| {
                    direct(r) || r.gym_id.is_some_and(|gym_id| granted.contains(&gym_id))
                }))
            }
            Role::Client => Ok(match kind {
                ResourceKind::Diet => ids_where(resources, |r| principal.diet_id == Some(r.id)),
                ResourceKind::Training => ids_where(resources, |r| r.assignee_ids.contains(&principal.id)),
                ResourceKind::Product | ResourceKind::Exercise => HashSet::new(),
            }),
        }
    }

    /// 与 [`full_access_ids`](Self::full_access_ids) 相同，另外检查个人授权
    ///
    /// 对剩余资源的所有客户按被授权方类型各做一次批量查询，结果与逐个调用
    /// [`has_full_access`](Self::has_full_access) 完全一致。
    pub async fn full_access_ids_with_individual_grants(
        &mut self,
        principal: &Principal,
        kind: ResourceKind,
        resources: &[ResourceSummary],
    ) -> Result<HashSet<Uuid>, AppError> {
        let mut ids = self.full_access_ids(principal, kind, resources).await?;

        if principal.role != Role::Personal {
            return Ok(ids);
        }
        let Some(capability) = kind.capability() else {
            return Ok(ids);
        };

        let pending: Vec<&ResourceSummary> =
            resources.iter().filter(|r| !ids.contains(&r.id)).collect();
        let assignees: Vec<Uuid> = pending
            .iter()
            .flat_map(|r| r.assignee_ids.iter().copied())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        if assignees.is_empty() {
            return Ok(ids);
        }

        let by_coach = self
            .grants
            .list_individual_grants_for_assignees(
                &assignees,
                GranteeType::Coach,
                principal.id,
                capability,
            )
            .await?;
        let by_gym = self
            .grants
            .list_individual_grants_for_assignees(
                &assignees,
                GranteeType::Gym,
                principal.gym_id,
                capability,
            )
            .await?;

        for &assignee_id in &assignees {
            self.cache.insert(
                CacheKey::IndividualGrant {
                    assignee_id,
                    grantee_type: GranteeType::Coach,
                    grantee_id: principal.id,
                    capability,
                },
                by_coach.contains(&assignee_id),
            );
            self.cache.insert(
                CacheKey::IndividualGrant {
                    assignee_id,
                    grantee_type: GranteeType::Gym,
                    grantee_id: principal.gym_id,
                    capability,
                },
                by_gym.contains(&assignee_id),
            );
        }

        for resource in pending {
            let granted = resource
                .assignee_ids
                .iter()
                .any(|a| by_coach.contains(a) || by_gym.contains(a));
            if granted {
                ids.insert(resource.id);
            }
        }

        Ok(ids)
    }

    /// 教练可以行使某项能力的健身房（同一请求内只查询一次）
    pub async fn granted_gyms(
        &mut self,
        coach_id: Uuid,
        capability: Capability,
    ) -> Result<HashSet<Uuid>, AppError> {
        if let Some(gyms) = self.cache.granted_gyms(coach_id, capability) {
            return Ok(gyms.clone());
        }

        let gyms = self.grants.list_tenants_granted_to(coach_id, capability).await?;
        self.cache
            .insert_granted_gyms(coach_id, capability, gyms.clone());
        Ok(gyms)
    }

    /// 列表查询的可见范围
    ///
    /// 覆盖 [`has_full_access`](Self::has_full_access) 可能放行的所有行：本健身房、被授权的健身房、
    /// 自己创建或分配给自己的资源。`individual_grants` 为真时，再加上分配对象向教练授予了个人授权的资源。
    pub async fn list_scope(
        &mut self,
        principal: &Principal,
        kind: ResourceKind,
        individual_grants: bool,
    ) -> Result<ListScope, AppError> {
        if kind == ResourceKind::Exercise {
            return Ok(ListScope::All);
        }

        match principal.role {
            Role::Super => Ok(ListScope::All),
            Role::Admin => Ok(ListScope::gyms(vec![principal.gym_id])),
            Role::Client => Ok(ListScope::Restricted {
                gym_ids: vec![principal.gym_id],
                owner_id: None,
                assignee_id: Some(principal.id),
                grantee: None,
            }),
            Role::Personal => {
                let mut gym_ids = vec![principal.gym_id];
                let capability = kind.capability();
                if let Some(capability) = capability {
                    let granted = self.granted_gyms(principal.id, capability).await?;
                    gym_ids.extend(granted.into_iter().filter(|g| *g != principal.gym_id));
                }

                let grantee = (individual_grants && capability.is_some()).then(|| GranteeScope {
                    coach_id: principal.id,
                    gym_id: principal.gym_id,
                });

                Ok(ListScope::Restricted {
                    gym_ids,
                    owner_id: Some(principal.id),
                    assignee_id: None,
                    grantee,
                })
            }
        }
    }

    async fn tenant_grant(
        &mut self,
        coach_id: Uuid,
        gym_id: Uuid,
        capability: Capability,
    ) -> Result<bool, AppError> {
        if let Some(gyms) = self.cache.granted_gyms(coach_id, capability) {
            return Ok(gyms.contains(&gym_id));
        }

        let key = CacheKey::TenantGrant {
            coach_id,
            gym_id,
            capability,
        };
        if let Some(granted) = self.cache.get(&key) {
            return Ok(granted);
        }

        let granted = self
            .grants
            .has_tenant_grant(coach_id, gym_id, capability)
            .await?;
        self.cache.insert(key, granted);
        Ok(granted)
    }

    async fn individual_grant(
        &mut self,
        assignee_id: Uuid,
        grantee_type: GranteeType,
        grantee_id: Uuid,
        capability: Capability,
    ) -> Result<bool, AppError> {
        let key = CacheKey::IndividualGrant {
            assignee_id,
            grantee_type,
            grantee_id,
            capability,
        };
        if let Some(granted) = self.cache.get(&key) {
            return Ok(granted);
        }

        let granted = self
            .grants
            .has_individual_grant(assignee_id, grantee_type, grantee_id, capability)
            .await?;
        self.cache.insert(key, granted);
        Ok(granted)
    }
}

fn ids_where(
    resources: &[ResourceSummary],
    keep: impl Fn(&ResourceSummary) -> bool,
) -> HashSet<Uuid> {
    resources.iter().filter(|r| keep(r)).map(|r| r.id).collect()
}
