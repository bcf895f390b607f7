//! Principal domain model (当前请求的操作者)

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

/// 用户角色
///
/// 角色集合是封闭的，所有决策点都通过穷尽 match 处理，新增角色时编译器会提示每一处需要更新的地方。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Super,
    Admin,
    /// 教练
    Personal,
    Client,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Super => "super",
            Role::Admin => "admin",
            Role::Personal => "personal",
            Role::Client => "client",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct ParseRoleError(pub String);

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "super" => Ok(Role::Super),
            "admin" => Ok(Role::Admin),
            "personal" => Ok(Role::Personal),
            "client" => Ok(Role::Client),
            other => Err(ParseRoleError(other.to_string())),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = ParseRoleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// 已认证的操作者
///
/// `approved` 只在认证阶段检查，权限解析器不读取它。
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Principal {
    pub id: Uuid,
    pub gym_id: Uuid,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub approved: bool,
    /// 客户当前分配的饮食计划
    pub diet_id: Option<Uuid>,
}

impl Principal {
    pub fn is_coach(&self) -> bool {
        self.role == Role::Personal
    }

    /// 资源是否属于操作者所在的健身房
    pub fn is_home_gym(&self, gym_id: Option<Uuid>) -> bool {
        gym_id == Some(self.gym_id)
    }
}
