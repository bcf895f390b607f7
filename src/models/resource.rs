//! Protected resource models (饮食、训练、动作、商品)

use super::grant::Capability;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// 受保护资源的类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Diet,
    Training,
    /// 全局动作库，不属于任何健身房
    Exercise,
    Product,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Diet => "diet",
            ResourceKind::Training => "training",
            ResourceKind::Exercise => "exercise",
            ResourceKind::Product => "product",
        }
    }

    /// 授权可以覆盖的能力；没有对应能力的资源不参与授权判断
    pub fn capability(&self) -> Option<Capability> {
        match self {
            ResourceKind::Diet => Some(Capability::Diets),
            ResourceKind::Training => Some(Capability::Trainings),
            ResourceKind::Exercise | ResourceKind::Product => None,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 权限判断所需的最小资源投影
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct ResourceSummary {
    pub id: Uuid,
    pub gym_id: Option<Uuid>,
    /// 创建者或教练
    pub owner_id: Option<Uuid>,
    /// 资源所属的客户（饮食可以被多个客户使用）
    pub assignee_ids: Vec<Uuid>,
    pub reusable: bool,
}

/// 可以映射到 [`ResourceSummary`] 的具体资源
pub trait ProtectedResource {
    const KIND: ResourceKind;

    fn summary(&self) -> ResourceSummary;
}

/// Diet
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Diet {
    pub id: Uuid,
    pub gym_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub calories: i32,
    pub protein_g: i32,
    pub carbs_g: i32,
    pub fat_g: i32,
    pub reusable: bool,
    pub created_by: Option<Uuid>,
    /// Joined from users.diet_id
    pub user_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProtectedResource for Diet {
    const KIND: ResourceKind = ResourceKind::Diet;

    fn summary(&self) -> ResourceSummary {
        ResourceSummary {
            id: self.id,
            gym_id: Some(self.gym_id),
            owner_id: self.created_by,
            assignee_ids: self.user_ids.clone(),
            reusable: self.reusable,
        }
    }
}

/// Training
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Training {
    pub id: Uuid,
    pub gym_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub coach_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub reusable: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProtectedResource for Training {
    const KIND: ResourceKind = ResourceKind::Training;

    fn summary(&self) -> ResourceSummary {
        ResourceSummary {
            id: self.id,
            gym_id: Some(self.gym_id),
            owner_id: self.coach_id,
            assignee_ids: self.user_id.into_iter().collect(),
            reusable: self.reusable,
        }
    }
}

/// Exercise (global catalog)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Exercise {
    pub id: Uuid,
    pub name: String,
    pub exercise_type: String,
    pub muscle_group: Option<String>,
    pub description: Option<String>,
    pub video_url: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl ProtectedResource for Exercise {
    const KIND: ResourceKind = ResourceKind::Exercise;

    fn summary(&self) -> ResourceSummary {
        ResourceSummary {
            id: self.id,
            gym_id: None,
            owner_id: self.created_by,
            assignee_ids: Vec::new(),
            reusable: false,
        }
    }
}

/// Product
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: Uuid,
    pub gym_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub stock: i32,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl ProtectedResource for Product {
    const KIND: ResourceKind = ResourceKind::Product;

    fn summary(&self) -> ResourceSummary {
        ResourceSummary {
            id: self.id,
            gym_id: Some(self.gym_id),
            owner_id: self.created_by,
            assignee_ids: Vec::new(),
            reusable: false,
        }
    }
}

/// 列表查询的可见范围
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListScope {
    /// 不过滤（super）
    All,
    /// 受限范围：下列任一条件成立的行，以及任意健身房的可复用模板
    Restricted {
        /// 所属健身房在此列表内
        gym_ids: Vec<Uuid>,
        /// 由该用户创建（饮食 created_by、训练 coach_id）
        owner_id: Option<Uuid>,
        /// 分配给该用户
        assignee_id: Option<Uuid>,
        /// 分配对象向该教练（或其健身房）授予了个人授权
        grantee: Option<GranteeScope>,
    },
}

/// 个人授权的被授权方：教练本人及其所属健身房
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GranteeScope {
    pub coach_id: Uuid,
    pub gym_id: Uuid,
}

impl ListScope {
    /// 仅按健身房过滤
    pub fn gyms(gym_ids: Vec<Uuid>) -> Self {
        ListScope::Restricted {
            gym_ids,
            owner_id: None,
            assignee_id: None,
            grantee: None,
        }
    }

    /// 绑定到 SQL 的健身房数组，`None` 表示不过滤
    pub(crate) fn gym_filter(&self) -> Option<Vec<Uuid>> {
        match self {
            ListScope::All => None,
            ListScope::Restricted { gym_ids, .. } => Some(gym_ids.clone()),
        }
    }

    pub(crate) fn owner_filter(&self) -> Option<Uuid> {
        match self {
            ListScope::All => None,
            ListScope::Restricted { owner_id, .. } => *owner_id,
        }
    }

    pub(crate) fn assignee_filter(&self) -> Option<Uuid> {
        match self {
            ListScope::All => None,
            ListScope::Restricted { assignee_id, .. } => *assignee_id,
        }
    }

    /// (教练, 健身房)，未启用个人授权时均为 `None`
    pub(crate) fn grantee_filter(&self) -> (Option<Uuid>, Option<Uuid>) {
        match self {
            ListScope::Restricted {
                grantee: Some(grantee),
                ..
            } => (Some(grantee.coach_id), Some(grantee.gym_id)),
            _ => (None, None),
        }
    }
}
