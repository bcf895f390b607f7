//! 配置系统
//! 从环境变量加载所有配置，使用 Secret 包装敏感信息

use config::{Config, ConfigError, Environment};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// 监听地址，例如 "0.0.0.0:3000"
    pub addr: String,
    /// 优雅关闭超时时间（秒）
    pub graceful_shutdown_timeout_secs: u64,
    /// 请求体大小上限（字节）
    pub body_limit_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// 数据库连接 URL（使用 Secret 包装，防止日志泄露）
    pub url: Secret<String>,
    /// 最大连接数
    pub max_connections: u32,
    /// 最小连接数
    pub min_connections: u32,
    /// 获取连接超时时间（秒）
    pub acquire_timeout_secs: u64,
    /// 空闲连接超时时间（秒）
    pub idle_timeout_secs: u64,
    /// 连接最大生命周期（秒）
    pub max_lifetime_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别: trace, debug, info, warn, error
    pub level: String,
    /// 日志格式: json, pretty
    pub format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    /// JWT 密钥，与签发令牌的认证服务共享
    pub jwt_secret: Secret<String>,
    /// 访问令牌过期时间（秒）
    pub access_token_exp_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaginationConfig {
    pub default_limit: i64,
    pub max_limit: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub security: SecurityConfig,
    pub pagination: PaginationConfig,
}

impl AppConfig {
    /// 从环境变量加载配置
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut settings = Config::builder();

        // 添加默认配置
        settings = settings
            .set_default("server.addr", "0.0.0.0:3000")?
            .set_default("server.graceful_shutdown_timeout_secs", 30)?
            .set_default("server.body_limit_bytes", 1024 * 1024)?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("database.acquire_timeout_secs", 30)?
            .set_default("database.idle_timeout_secs", 600)?
            .set_default("database.max_lifetime_secs", 1800)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "json")?
            .set_default("security.jwt_secret", "change-this-secret-in-production-min-32-chars!")?
            .set_default("security.access_token_exp_secs", 900)?
            .set_default("pagination.default_limit", 50)?
            .set_default("pagination.max_limit", 200)?;

        // 从环境变量加载配置（前缀为 GYM_）
        settings = settings.add_source(
            Environment::with_prefix("GYM")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = settings.build()?.try_deserialize()?;

        config.validate()?;

        Ok(config)
    }

    /// 验证配置合法性
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(port_str) = self.server.addr.split(':').next_back() {
            if let Ok(port) = port_str.parse::<u16>() {
                if port != 0 && port < 1024 {
                    return Err(ConfigError::Message("Server port should be >= 1024".to_string()));
                }
            }
        }

        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::Message(format!(
                    "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                    self.logging.level
                )))
            }
        }

        match self.logging.format.to_lowercase().as_str() {
            "json" | "pretty" => {}
            _ => {
                return Err(ConfigError::Message(format!(
                    "Invalid log format: {}. Must be one of: json, pretty",
                    self.logging.format
                )))
            }
        }

        if self.database.max_connections < self.database.min_connections {
            return Err(ConfigError::Message(
                "max_connections must be >= min_connections".to_string(),
            ));
        }

        // HS256 要求密钥至少 32 字符
        if self.security.jwt_secret.expose_secret().len() < 32 {
            return Err(ConfigError::Message(
                "JWT secret must be at least 32 characters long".to_string(),
            ));
        }

        if self.security.access_token_exp_secs < 60 || self.security.access_token_exp_secs > 86400 {
            return Err(ConfigError::Message(
                "access_token_exp_secs must be between 60 and 86400 (1 minute to 24 hours)"
                    .to_string(),
            ));
        }

        if self.pagination.default_limit < 1 || self.pagination.default_limit > self.pagination.max_limit {
            return Err(ConfigError::Message(
                "pagination.default_limit must be between 1 and pagination.max_limit".to_string(),
            ));
        }

        Ok(())
    }
}
