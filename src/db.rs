//! 数据库连接池与迁移管理
//! 健身房数据库的连接池、迁移执行和健康检查

use crate::config::DatabaseConfig;
use secrecy::ExposeSecret;
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    PgPool,
};
use std::{str::FromStr, time::Duration, time::Instant};

/// 连接在 pg_stat_activity 中显示的名称
const APPLICATION_NAME: &str = "gym-system";

/// 授权判断依赖的表，迁移未完成时就绪探针失败
const REQUIRED_TABLES: [&str; 3] = ["users", "gym_permissions", "user_permissions"];

/// 创建数据库连接池
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, DbError> {
    let options = PgConnectOptions::from_str(config.url.expose_secret())
        .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
        .application_name(APPLICATION_NAME);

    tracing::debug!(
        host = options.get_host(),
        database = options.get_database(),
        "Creating database connection pool..."
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
        .test_before_acquire(true)
        .connect_with(options)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create database pool: {}", e);
            DbError::ConnectionFailed(e.to_string())
        })?;

    tracing::info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Database pool created"
    );

    Ok(pool)
}

/// 运行数据库迁移
pub async fn run_migrations(pool: &PgPool) -> Result<(), DbError> {
    let migrator = sqlx::migrate!("./migrations");
    tracing::info!(
        migrations = migrator.iter().count(),
        "Running database migrations..."
    );

    migrator.run(pool).await.map_err(|e| {
        tracing::error!("Migration failed: {}", e);
        DbError::MigrationFailed(e.to_string())
    })?;

    tracing::info!("Migrations completed");
    Ok(())
}

/// 数据库健康检查
///
/// 除连通性外还确认授权相关的表已存在，并记录往返耗时。
pub async fn health_check(pool: &PgPool) -> HealthStatus {
    let started = Instant::now();
    let missing = sqlx::query_scalar::<_, String>(
        "SELECT t FROM UNNEST($1::text[]) AS t WHERE to_regclass('public.' || t) IS NULL",
    )
    .bind(REQUIRED_TABLES.map(String::from).to_vec())
    .fetch_all(pool)
    .await;
    let latency_ms = started.elapsed().as_millis() as u64;

    match missing {
        Ok(missing) if missing.is_empty() => {
            tracing::debug!(latency_ms, "Database health check: OK");
            HealthStatus::Healthy { latency_ms }
        }
        Ok(missing) => {
            tracing::warn!(?missing, "Database schema incomplete");
            HealthStatus::Unhealthy(format!("missing tables: {}", missing.join(", ")))
        }
        Err(e) => {
            tracing::warn!("Database health check failed: {}", e);
            HealthStatus::Unhealthy(e.to_string())
        }
    }
}

/// 记录数据库连接池指标
pub fn record_pool_metrics(pool: &PgPool) {
    metrics::gauge!("gym_db_pool_size").set(pool.size() as f64);
    metrics::gauge!("gym_db_pool_idle").set(pool.num_idle() as f64);
}

/// 数据库错误类型
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}

/// 健康状态
#[derive(Debug, Clone)]
pub enum HealthStatus {
    Healthy { latency_ms: u64 },
    Unhealthy(String),
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy { .. })
    }
}
