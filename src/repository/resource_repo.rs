//! Resource repository (饮食、训练、动作、商品数据访问)

use super::store::ResourceLookup;
use crate::{error::AppError, models::resource::*};
use sqlx::PgPool;
use uuid::Uuid;

/// 饮食查询的公共部分，user_ids 来自 users.diet_id
const DIET_SELECT: &str = r#"
    SELECT
        d.*,
        COALESCE(array_agg(u.id) FILTER (WHERE u.id IS NOT NULL), '{}'::uuid[]) AS user_ids
    FROM diets d
    LEFT JOIN users u ON u.diet_id = d.id
"#;

/// 向 $6（教练）或 $7（健身房）授予了有效个人授权的客户，调用方追加能力条件。
/// $6、$7 为 NULL 时不匹配任何行。
const GRANTED_ASSIGNEES: &str = r#"
    SELECT p.user_id FROM user_permissions p
    WHERE p.active
      AND ((p.grantee_type = 'coach' AND p.grantee_id = $6)
        OR (p.grantee_type = 'gym' AND p.grantee_id = $7))
"#;

pub struct ResourceRepository {
    db: PgPool,
}

impl ResourceRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    // ==================== Diets ====================

    /// 列出可见范围内的饮食（含任意健身房的可复用模板）
    pub async fn list_diets(
        &self,
        scope: &ListScope,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Diet>, AppError> {
        let sql = format!(
            r#"
            {DIET_SELECT}
            WHERE $1::uuid[] IS NULL
               OR d.gym_id = ANY($1)
               OR d.reusable
               OR d.created_by = $4
               OR EXISTS (
                   SELECT 1 FROM users a
                   WHERE a.diet_id = d.id
                     AND (a.id = $5 OR a.id IN ({GRANTED_ASSIGNEES} AND p.can_edit_diet))
               )
            GROUP BY d.id
            ORDER BY d.name
            LIMIT $2 OFFSET $3
            "#
        );

        let (grantee_coach, grantee_gym) = scope.grantee_filter();
        let diets = sqlx::query_as::<_, Diet>(&sql)
            .bind(scope.gym_filter())
            .bind(limit)
            .bind(offset)
            .bind(scope.owner_filter())
            .bind(scope.assignee_filter())
            .bind(grantee_coach)
            .bind(grantee_gym)
            .fetch_all(&self.db)
            .await?;

        Ok(diets)
    }

    pub async fn get_diet(&self, id: Uuid) -> Result<Option<Diet>, AppError> {
        let sql = format!("{DIET_SELECT} WHERE d.id = $1 GROUP BY d.id");

        let diet = sqlx::query_as::<_, Diet>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        Ok(diet)
    }

    pub async fn delete_diet(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM diets WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// 复制饮食到目标健身房，新副本不可复用且归复制者所有
    pub async fn clone_diet(
        &self,
        source_id: Uuid,
        gym_id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<Diet>, AppError> {
        let diet = sqlx::query_as::<_, Diet>(
            r#"
            INSERT INTO diets (gym_id, name, description, calories, protein_g, carbs_g, fat_g, reusable, created_by)
            SELECT $2, name, description, calories, protein_g, carbs_g, fat_g, FALSE, $3
            FROM diets
            WHERE id = $1
            RETURNING *, '{}'::uuid[] AS user_ids
            "#,
        )
        .bind(source_id)
        .bind(gym_id)
        .bind(owner_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(diet)
    }

    // ==================== Trainings ====================

    pub async fn list_trainings(
        &self,
        scope: &ListScope,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Training>, AppError> {
        let sql = format!(
            r#"
            SELECT * FROM trainings
            WHERE $1::uuid[] IS NULL
               OR gym_id = ANY($1)
               OR reusable
               OR coach_id = $4
               OR user_id = $5
               OR user_id IN ({GRANTED_ASSIGNEES} AND p.can_edit_training)
            ORDER BY name
            LIMIT $2 OFFSET $3
            "#
        );

        let (grantee_coach, grantee_gym) = scope.grantee_filter();
        let trainings = sqlx::query_as::<_, Training>(&sql)
            .bind(scope.gym_filter())
            .bind(limit)
            .bind(offset)
            .bind(scope.owner_filter())
            .bind(scope.assignee_filter())
            .bind(grantee_coach)
            .bind(grantee_gym)
            .fetch_all(&self.db)
        .await?;

        Ok(trainings)
    }

    pub async fn get_training(&self, id: Uuid) -> Result<Option<Training>, AppError> {
        let training = sqlx::query_as::<_, Training>("SELECT * FROM trainings WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        Ok(training)
    }

    pub async fn delete_training(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM trainings WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// 复制训练，新副本不分配给任何客户
    pub async fn clone_training(
        &self,
        source_id: Uuid,
        gym_id: Uuid,
        coach_id: Uuid,
    ) -> Result<Option<Training>, AppError> {
        let training = sqlx::query_as::<_, Training>(
            r#"
            INSERT INTO trainings (gym_id, name, description, coach_id, user_id, reusable)
            SELECT $2, name, description, $3, NULL, FALSE
            FROM trainings
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(source_id)
        .bind(gym_id)
        .bind(coach_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(training)
    }

    // ==================== Exercises ====================

    pub async fn list_exercises(&self, limit: i64, offset: i64) -> Result<Vec<Exercise>, AppError> {
        let exercises = sqlx::query_as::<_, Exercise>(
            "SELECT * FROM exercises ORDER BY name LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;

        Ok(exercises)
    }

    pub async fn get_exercise(&self, id: Uuid) -> Result<Option<Exercise>, AppError> {
        let exercise = sqlx::query_as::<_, Exercise>("SELECT * FROM exercises WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        Ok(exercise)
    }

    // ==================== Products ====================

    pub async fn list_products(
        &self,
        scope: &ListScope,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Product>, AppError> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT * FROM products
            WHERE $1::uuid[] IS NULL OR gym_id = ANY($1) OR created_by = $4
            ORDER BY name
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(scope.gym_filter())
        .bind(limit)
        .bind(offset)
        .bind(scope.owner_filter())
        .fetch_all(&self.db)
        .await?;

        Ok(products)
    }

    pub async fn get_product(&self, id: Uuid) -> Result<Option<Product>, AppError> {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        Ok(product)
    }
}

impl ResourceLookup for ResourceRepository {
    async fn summary(
        &self,
        kind: ResourceKind,
        id: Uuid,
    ) -> Result<Option<ResourceSummary>, AppError> {
        let sql = match kind {
            ResourceKind::Diet => {
                r#"
                SELECT
                    d.id,
                    d.gym_id,
                    d.created_by AS owner_id,
                    COALESCE(array_agg(u.id) FILTER (WHERE u.id IS NOT NULL), '{}'::uuid[]) AS assignee_ids,
                    d.reusable
                FROM diets d
                LEFT JOIN users u ON u.diet_id = d.id
                WHERE d.id = $1
                GROUP BY d.id
                "#
            }
            ResourceKind::Training => {
                r#"
                SELECT
                    id,
                    gym_id,
                    coach_id AS owner_id,
                    CASE WHEN user_id IS NULL THEN '{}'::uuid[] ELSE ARRAY[user_id] END AS assignee_ids,
                    reusable
                FROM trainings
                WHERE id = $1
                "#
            }
            ResourceKind::Exercise => {
                r#"
                SELECT
                    id,
                    NULL::uuid AS gym_id,
                    created_by AS owner_id,
                    '{}'::uuid[] AS assignee_ids,
                    FALSE AS reusable
                FROM exercises
                WHERE id = $1
                "#
            }
            ResourceKind::Product => {
                r#"
                SELECT
                    id,
                    gym_id,
                    created_by AS owner_id,
                    '{}'::uuid[] AS assignee_ids,
                    FALSE AS reusable
                FROM products
                WHERE id = $1
                "#
            }
        };

        let summary = sqlx::query_as::<_, ResourceSummary>(sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        Ok(summary)
    }
}
