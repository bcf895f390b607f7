//! 请求级权限缓存
//!
//! 每个入站请求创建一个新的 [`RequestCache`]，请求结束时随解析器一起丢弃。
//! 缓存的结果依赖于当前操作者，跨请求或跨操作者共享会泄露权限。

use crate::models::{Capability, GranteeType, ResourceKind};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// 被缓存的判断
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CanEdit,
    FullAccess,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Decision {
        operation: Operation,
        principal_id: Uuid,
        kind: ResourceKind,
        resource_id: Uuid,
    },
    TenantGrant {
        coach_id: Uuid,
        gym_id: Uuid,
        capability: Capability,
    },
    IndividualGrant {
        assignee_id: Uuid,
        grantee_type: GranteeType,
        grantee_id: Uuid,
        capability: Capability,
    },
}

#[derive(Debug, Default)]
pub struct RequestCache {
    decisions: HashMap<CacheKey, bool>,
    granted_gyms: HashMap<(Uuid, Capability), HashSet<Uuid>>,
    hits: u64,
}

impl RequestCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, key: &CacheKey) -> Option<bool> {
        let value = self.decisions.get(key).copied();
        if value.is_some() {
            self.hits += 1;
        }
        value
    }

    pub fn insert(&mut self, key: CacheKey, value: bool) {
        self.decisions.insert(key, value);
    }

    /// 教练被授权的健身房集合
    pub fn granted_gyms(&mut self, coach_id: Uuid, capability: Capability) -> Option<&HashSet<Uuid>> {
        let value = self.granted_gyms.get(&(coach_id, capability));
        if value.is_some() {
            self.hits += 1;
        }
        value
    }

    pub fn insert_granted_gyms(&mut self, coach_id: Uuid, capability: Capability, gyms: HashSet<Uuid>) {
        self.granted_gyms.insert((coach_id, capability), gyms);
    }

    /// 命中次数
    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn len(&self) -> usize {
        self.decisions.len() + self.granted_gyms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
