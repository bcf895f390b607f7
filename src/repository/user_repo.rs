//! User repository (数据库访问层)

use crate::{error::AppError, models::principal::Principal};
use sqlx::PgPool;
use uuid::Uuid;

pub struct UserRepository {
    db: PgPool,
}

impl UserRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// 加载操作者
    pub async fn find_principal(&self, id: Uuid) -> Result<Option<Principal>, AppError> {
        let principal = sqlx::query_as::<_, Principal>(
            "SELECT id, gym_id, role, approved, diet_id FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(principal)
    }
}
