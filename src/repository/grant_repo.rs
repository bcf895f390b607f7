//! Grant repository (授权数据访问)

use super::store::GrantStore;
use crate::{error::AppError, models::grant::*};
use sqlx::PgPool;
use std::collections::HashSet;
use uuid::Uuid;

/// 冲突行被并发删除时，创建授权的最大尝试次数
const UPSERT_ATTEMPTS: u32 = 3;

pub struct GrantRepository {
    db: PgPool,
}

impl GrantRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// 健身房是否存在
    pub async fn gym_exists(&self, gym_id: Uuid) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM gyms WHERE id = $1)")
            .bind(gym_id)
            .fetch_one(&self.db)
            .await?;

        Ok(exists)
    }

    // ==================== Tenant grants ====================

    /// 创建健身房授权
    ///
    /// 同一 (健身房, 教练) 已有启用的授权时返回 [`AppError::GrantConflict`]；
    /// 已有但被停用的授权会以新的能力重新启用。
    pub async fn create_tenant_grant(
        &self,
        gym_id: Uuid,
        req: &CreateTenantGrantRequest,
    ) -> Result<TenantGrant, AppError> {
        for attempt in 1..=UPSERT_ATTEMPTS {
            let created = sqlx::query_as::<_, TenantGrant>(
                r#"
                INSERT INTO gym_permissions (gym_id, coach_id, can_edit_diets, can_edit_trainings)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (gym_id, coach_id) DO UPDATE
                SET
                    can_edit_diets = EXCLUDED.can_edit_diets,
                    can_edit_trainings = EXCLUDED.can_edit_trainings,
                    active = TRUE,
                    updated_at = NOW()
                WHERE gym_permissions.active = FALSE
                RETURNING *
                "#,
            )
            .bind(gym_id)
            .bind(req.coach_id)
            .bind(req.can_edit_diets)
            .bind(req.can_edit_trainings)
            .fetch_optional(&self.db)
            .await?;

            if let Some(grant) = created {
                return Ok(grant);
            }

            let existing = sqlx::query_as::<_, TenantGrant>(
                "SELECT * FROM gym_permissions WHERE gym_id = $1 AND coach_id = $2",
            )
            .bind(gym_id)
            .bind(req.coach_id)
            .fetch_optional(&self.db)
            .await?;

            match existing {
                Some(existing) => {
                    return Err(AppError::GrantConflict(Box::new(Grant::Tenant(existing))))
                }
                // 冲突行在两条语句之间被删除
                None => tracing::debug!(
                    attempt,
                    %gym_id,
                    coach_id = %req.coach_id,
                    "Tenant grant vanished, retrying"
                ),
            }
        }

        tracing::warn!(
            %gym_id,
            coach_id = %req.coach_id,
            "Tenant grant upsert kept racing with deletes"
        );
        Err(AppError::Internal)
    }

    pub async fn find_tenant_grant(&self, id: Uuid) -> Result<Option<TenantGrant>, AppError> {
        let grant = sqlx::query_as::<_, TenantGrant>("SELECT * FROM gym_permissions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        Ok(grant)
    }

    /// 列出健身房发出的授权
    pub async fn list_tenant_grants_by_gym(&self, gym_id: Uuid) -> Result<Vec<TenantGrant>, AppError> {
        let grants = sqlx::query_as::<_, TenantGrant>(
            "SELECT * FROM gym_permissions WHERE gym_id = $1 ORDER BY created_at",
        )
        .bind(gym_id)
        .fetch_all(&self.db)
        .await?;

        Ok(grants)
    }

    /// 列出教练收到的授权
    pub async fn list_tenant_grants_for_coach(
        &self,
        coach_id: Uuid,
    ) -> Result<Vec<TenantGrant>, AppError> {
        let grants = sqlx::query_as::<_, TenantGrant>(
            "SELECT * FROM gym_permissions WHERE coach_id = $1 ORDER BY created_at",
        )
        .bind(coach_id)
        .fetch_all(&self.db)
        .await?;

        Ok(grants)
    }

    /// 更新能力
    pub async fn update_tenant_grant(
        &self,
        id: Uuid,
        req: &UpdateTenantGrantRequest,
    ) -> Result<Option<TenantGrant>, AppError> {
        let grant = sqlx::query_as::<_, TenantGrant>(
            r#"
            UPDATE gym_permissions
            SET
                can_edit_diets = COALESCE($2, can_edit_diets),
                can_edit_trainings = COALESCE($3, can_edit_trainings),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(req.can_edit_diets)
        .bind(req.can_edit_trainings)
        .fetch_optional(&self.db)
        .await?;

        Ok(grant)
    }

    /// 启用/停用（保留记录）
    pub async fn set_tenant_grant_active(
        &self,
        id: Uuid,
        active: bool,
    ) -> Result<Option<TenantGrant>, AppError> {
        let grant = sqlx::query_as::<_, TenantGrant>(
            "UPDATE gym_permissions SET active = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(active)
        .fetch_optional(&self.db)
        .await?;

        Ok(grant)
    }

    pub async fn delete_tenant_grant(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM gym_permissions WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // ==================== Individual grants ====================

    /// 创建个人授权，冲突语义与健身房授权相同
    pub async fn create_individual_grant(
        &self,
        user_id: Uuid,
        req: &CreateIndividualGrantRequest,
    ) -> Result<IndividualGrant, AppError> {
        for attempt in 1..=UPSERT_ATTEMPTS {
            let created = sqlx::query_as::<_, IndividualGrant>(
                r#"
                INSERT INTO user_permissions (user_id, grantee_type, grantee_id, can_edit_diet, can_edit_training)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (user_id, grantee_type, grantee_id) DO UPDATE
                SET
                    can_edit_diet = EXCLUDED.can_edit_diet,
                    can_edit_training = EXCLUDED.can_edit_training,
                    active = TRUE,
                    updated_at = NOW()
                WHERE user_permissions.active = FALSE
                RETURNING *
                "#,
            )
            .bind(user_id)
            .bind(req.grantee_type.as_str())
            .bind(req.grantee_id)
            .bind(req.can_edit_diet)
            .bind(req.can_edit_training)
            .fetch_optional(&self.db)
            .await?;

            if let Some(grant) = created {
                return Ok(grant);
            }

            let existing = sqlx::query_as::<_, IndividualGrant>(
                r#"
                SELECT * FROM user_permissions
                WHERE user_id = $1 AND grantee_type = $2 AND grantee_id = $3
                "#,
            )
            .bind(user_id)
            .bind(req.grantee_type.as_str())
            .bind(req.grantee_id)
            .fetch_optional(&self.db)
            .await?;

            match existing {
                Some(existing) => {
                    return Err(AppError::GrantConflict(Box::new(Grant::Individual(existing))))
                }
                None => tracing::debug!(attempt, %user_id, "Individual grant vanished, retrying"),
            }
        }

        tracing::warn!(
            %user_id,
            grantee_id = %req.grantee_id,
            "Individual grant upsert kept racing with deletes"
        );
        Err(AppError::Internal)
    }

    pub async fn find_individual_grant(&self, id: Uuid) -> Result<Option<IndividualGrant>, AppError> {
        let grant =
            sqlx::query_as::<_, IndividualGrant>("SELECT * FROM user_permissions WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.db)
                .await?;

        Ok(grant)
    }

    /// 列出客户发出的授权
    pub async fn list_individual_grants_by_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<IndividualGrant>, AppError> {
        let grants = sqlx::query_as::<_, IndividualGrant>(
            "SELECT * FROM user_permissions WHERE user_id = $1 ORDER BY created_at",
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(grants)
    }

    /// 列出被授权方收到的授权
    pub async fn list_individual_grants_for_grantee(
        &self,
        grantee_type: GranteeType,
        grantee_id: Uuid,
    ) -> Result<Vec<IndividualGrant>, AppError> {
        let grants = sqlx::query_as::<_, IndividualGrant>(
            r#"
            SELECT * FROM user_permissions
            WHERE grantee_type = $1 AND grantee_id = $2
            ORDER BY created_at
            "#,
        )
        .bind(grantee_type.as_str())
        .bind(grantee_id)
        .fetch_all(&self.db)
        .await?;

        Ok(grants)
    }

    pub async fn update_individual_grant(
        &self,
        id: Uuid,
        req: &UpdateIndividualGrantRequest,
    ) -> Result<Option<IndividualGrant>, AppError> {
        let grant = sqlx::query_as::<_, IndividualGrant>(
            r#"
            UPDATE user_permissions
            SET
                can_edit_diet = COALESCE($2, can_edit_diet),
                can_edit_training = COALESCE($3, can_edit_training),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(req.can_edit_diet)
        .bind(req.can_edit_training)
        .fetch_optional(&self.db)
        .await?;

        Ok(grant)
    }

    pub async fn set_individual_grant_active(
        &self,
        id: Uuid,
        active: bool,
    ) -> Result<Option<IndividualGrant>, AppError> {
        let grant = sqlx::query_as::<_, IndividualGrant>(
            "UPDATE user_permissions SET active = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(active)
        .fetch_optional(&self.db)
        .await?;

        Ok(grant)
    }

    pub async fn delete_individual_grant(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM user_permissions WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

impl GrantStore for GrantRepository {
    async fn has_tenant_grant(
        &self,
        coach_id: Uuid,
        gym_id: Uuid,
        capability: Capability,
    ) -> Result<bool, AppError> {
        let sql = format!(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM gym_permissions
                WHERE coach_id = $1 AND gym_id = $2 AND active AND {}
            )
            "#,
            capability.tenant_column()
        );

        let granted = sqlx::query_scalar::<_, bool>(&sql)
            .bind(coach_id)
            .bind(gym_id)
            .fetch_one(&self.db)
            .await?;

        Ok(granted)
    }

    async fn has_individual_grant(
        &self,
        assignee_id: Uuid,
        grantee_type: GranteeType,
        grantee_id: Uuid,
        capability: Capability,
    ) -> Result<bool, AppError> {
        let sql = format!(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM user_permissions
                WHERE user_id = $1 AND grantee_type = $2 AND grantee_id = $3 AND active AND {}
            )
            "#,
            capability.individual_column()
        );

        let granted = sqlx::query_scalar::<_, bool>(&sql)
            .bind(assignee_id)
            .bind(grantee_type.as_str())
            .bind(grantee_id)
            .fetch_one(&self.db)
            .await?;

        Ok(granted)
    }

    async fn list_individual_grants_for_assignees(
        &self,
        assignee_ids: &[Uuid],
        grantee_type: GranteeType,
        grantee_id: Uuid,
        capability: Capability,
    ) -> Result<HashSet<Uuid>, AppError> {
        if assignee_ids.is_empty() {
            return Ok(HashSet::new());
        }

        let sql = format!(
            r#"
            SELECT DISTINCT user_id FROM user_permissions
            WHERE user_id = ANY($1) AND grantee_type = $2 AND grantee_id = $3 AND active AND {}
            "#,
            capability.individual_column()
        );

        let ids = sqlx::query_scalar::<_, Uuid>(&sql)
            .bind(assignee_ids)
            .bind(grantee_type.as_str())
            .bind(grantee_id)
            .fetch_all(&self.db)
            .await?;

        Ok(ids.into_iter().collect())
    }

    async fn list_tenants_granted_to(
        &self,
        coach_id: Uuid,
        capability: Capability,
    ) -> Result<HashSet<Uuid>, AppError> {
        let sql = format!(
            "SELECT gym_id FROM gym_permissions WHERE coach_id = $1 AND active AND {}",
            capability.tenant_column()
        );

        let ids = sqlx::query_scalar::<_, Uuid>(&sql)
            .bind(coach_id)
            .fetch_all(&self.db)
            .await?;

        Ok(ids.into_iter().collect())
    }
}
