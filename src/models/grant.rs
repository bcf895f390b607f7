//! Grant domain models (授权)
//!
//! 两种授权在存储上是两张表，在领域层统一为 [`Grant`]。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// 授权可以扩展的编辑能力
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Diets,
    Trainings,
}

impl Capability {
    /// gym_permissions 表中对应的列
    pub(crate) fn tenant_column(&self) -> &'static str {
        match self {
            Capability::Diets => "can_edit_diets",
            Capability::Trainings => "can_edit_trainings",
        }
    }

    /// user_permissions 表中对应的列
    pub(crate) fn individual_column(&self) -> &'static str {
        match self {
            Capability::Diets => "can_edit_diet",
            Capability::Trainings => "can_edit_training",
        }
    }
}

/// 个人授权的被授权方类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GranteeType {
    Coach,
    Gym,
}

impl GranteeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GranteeType::Coach => "coach",
            GranteeType::Gym => "gym",
        }
    }
}

impl fmt::Display for GranteeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown grantee type: {0}")]
pub struct ParseGranteeTypeError(pub String);

impl FromStr for GranteeType {
    type Err = ParseGranteeTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "coach" => Ok(GranteeType::Coach),
            "gym" => Ok(GranteeType::Gym),
            other => Err(ParseGranteeTypeError(other.to_string())),
        }
    }
}

impl TryFrom<String> for GranteeType {
    type Error = ParseGranteeTypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// 健身房授权：健身房允许外部教练编辑其所有饮食/训练
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TenantGrant {
    pub id: Uuid,
    pub gym_id: Uuid,
    pub coach_id: Uuid,
    pub can_edit_diets: bool,
    pub can_edit_trainings: bool,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TenantGrant {
    pub fn allows(&self, capability: Capability) -> bool {
        self.active
            && match capability {
                Capability::Diets => self.can_edit_diets,
                Capability::Trainings => self.can_edit_trainings,
            }
    }
}

/// 个人授权：客户允许某个教练或整个健身房编辑自己的饮食/训练
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct IndividualGrant {
    pub id: Uuid,
    /// 授权方（客户）
    pub user_id: Uuid,
    #[sqlx(try_from = "String")]
    pub grantee_type: GranteeType,
    pub grantee_id: Uuid,
    pub can_edit_diet: bool,
    pub can_edit_training: bool,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IndividualGrant {
    pub fn allows(&self, capability: Capability) -> bool {
        self.active
            && match capability {
                Capability::Diets => self.can_edit_diet,
                Capability::Trainings => self.can_edit_training,
            }
    }
}

/// 统一的授权类型
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Grant {
    Tenant(TenantGrant),
    Individual(IndividualGrant),
}

impl Grant {
    pub fn id(&self) -> Uuid {
        match self {
            Grant::Tenant(g) => g.id,
            Grant::Individual(g) => g.id,
        }
    }

    pub fn is_active(&self) -> bool {
        match self {
            Grant::Tenant(g) => g.active,
            Grant::Individual(g) => g.active,
        }
    }

    pub fn allows(&self, capability: Capability) -> bool {
        match self {
            Grant::Tenant(g) => g.allows(capability),
            Grant::Individual(g) => g.allows(capability),
        }
    }
}

/// Create tenant grant request
#[derive(Debug, Deserialize, Validate)]
#[validate(schema(function = "validate_tenant_capabilities"))]
pub struct CreateTenantGrantRequest {
    /// 仅 super 需要指定；admin 总是代表自己的健身房
    pub gym_id: Option<Uuid>,
    pub coach_id: Uuid,
    #[serde(default)]
    pub can_edit_diets: bool,
    #[serde(default)]
    pub can_edit_trainings: bool,
}

fn validate_tenant_capabilities(req: &CreateTenantGrantRequest) -> Result<(), ValidationError> {
    if !req.can_edit_diets && !req.can_edit_trainings {
        return Err(ValidationError::new("no_capability")
            .with_message("at least one capability must be granted".into()));
    }
    Ok(())
}

/// Update tenant grant capabilities request
#[derive(Debug, Deserialize)]
pub struct UpdateTenantGrantRequest {
    pub can_edit_diets: Option<bool>,
    pub can_edit_trainings: Option<bool>,
}

/// Create individual grant request
#[derive(Debug, Deserialize, Validate)]
#[validate(schema(function = "validate_individual_capabilities"))]
pub struct CreateIndividualGrantRequest {
    pub grantee_type: GranteeType,
    pub grantee_id: Uuid,
    #[serde(default)]
    pub can_edit_diet: bool,
    #[serde(default)]
    pub can_edit_training: bool,
}

fn validate_individual_capabilities(
    req: &CreateIndividualGrantRequest,
) -> Result<(), ValidationError> {
    if !req.can_edit_diet && !req.can_edit_training {
        return Err(ValidationError::new("no_capability")
            .with_message("at least one capability must be granted".into()));
    }
    Ok(())
}

/// Update individual grant capabilities request
#[derive(Debug, Deserialize)]
pub struct UpdateIndividualGrantRequest {
    pub can_edit_diet: Option<bool>,
    pub can_edit_training: Option<bool>,
}

/// Enable / disable a grant
#[derive(Debug, Deserialize)]
pub struct SetGrantActiveRequest {
    pub active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tenant_grant(active: bool, diets: bool, trainings: bool) -> TenantGrant {
        TenantGrant {
            id: Uuid::new_v4(),
            gym_id: Uuid::new_v4(),
            coach_id: Uuid::new_v4(),
            can_edit_diets: diets,
            can_edit_trainings: trainings,
            active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_inactive_grant_allows_nothing() {
        let grant = tenant_grant(false, true, true);
        assert!(!grant.allows(Capability::Diets));
        assert!(!grant.allows(Capability::Trainings));
    }

    #[test]
    fn test_grant_allows_only_flagged_capability() {
        let grant = Grant::Tenant(tenant_grant(true, true, false));
        assert!(grant.allows(Capability::Diets));
        assert!(!grant.allows(Capability::Trainings));
    }

    #[test]
    fn test_grant_serializes_with_kind_tag() {
        let grant = Grant::Tenant(tenant_grant(true, true, false));
        let json = serde_json::to_value(&grant).unwrap();
        assert_eq!(json["kind"], "tenant");
        assert_eq!(json["can_edit_diets"], true);
    }

    #[test]
    fn test_create_request_requires_a_capability() {
        let req = CreateTenantGrantRequest {
            gym_id: None,
            coach_id: Uuid::new_v4(),
            can_edit_diets: false,
            can_edit_trainings: false,
        };
        assert!(req.validate().is_err());

        let req = CreateIndividualGrantRequest {
            grantee_type: GranteeType::Gym,
            grantee_id: Uuid::new_v4(),
            can_edit_diet: false,
            can_edit_training: true,
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_grantee_type_parse() {
        assert_eq!("gym".parse::<GranteeType>().unwrap(), GranteeType::Gym);
        assert!("tenant".parse::<GranteeType>().is_err());
    }
}
