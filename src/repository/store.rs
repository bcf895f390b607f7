//! 权限解析器依赖的只读存储接口
//!
//! 解析器只通过这两个 trait 访问存储，生产环境由 PostgreSQL 仓库实现，测试中可以换成内存实现。

use crate::{
    error::AppError,
    models::{Capability, GranteeType, ResourceKind, ResourceSummary},
};
use std::{collections::HashSet, future::Future};
use uuid::Uuid;

/// 授权查询
///
/// 只有 `active` 且对应能力标记为 true 的授权才算匹配。
/// 没有匹配返回 `false` / 空集合，只有存储层错误才返回 `Err`。
pub trait GrantStore: Send + Sync {
    /// 健身房是否授予教练该能力
    fn has_tenant_grant(
        &self,
        coach_id: Uuid,
        gym_id: Uuid,
        capability: Capability,
    ) -> impl Future<Output = Result<bool, AppError>> + Send;

    /// 客户是否授予被授权方该能力
    fn has_individual_grant(
        &self,
        assignee_id: Uuid,
        grantee_type: GranteeType,
        grantee_id: Uuid,
        capability: Capability,
    ) -> impl Future<Output = Result<bool, AppError>> + Send;

    /// 批量版本：返回给定客户中授予了该能力的客户 ID（单次查询）
    fn list_individual_grants_for_assignees(
        &self,
        assignee_ids: &[Uuid],
        grantee_type: GranteeType,
        grantee_id: Uuid,
        capability: Capability,
    ) -> impl Future<Output = Result<HashSet<Uuid>, AppError>> + Send;

    /// 教练可以行使该能力的所有健身房
    fn list_tenants_granted_to(
        &self,
        coach_id: Uuid,
        capability: Capability,
    ) -> impl Future<Output = Result<HashSet<Uuid>, AppError>> + Send;
}

/// 按 ID 加载资源摘要
pub trait ResourceLookup: Send + Sync {
    fn summary(
        &self,
        kind: ResourceKind,
        id: Uuid,
    ) -> impl Future<Output = Result<Option<ResourceSummary>, AppError>> + Send;
}
