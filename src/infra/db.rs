use crate::types::{ConfigError, ConfigResult};
use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::env;
use std::time::Duration;

/// プール接続数のデフォルト
const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// 接続取得を待つ秒数のデフォルト
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 5;

/// データベース接続の設定
///
/// `DATABASE_URL` は必須。`BLOGCORE_DB_MAX_CONNECTIONS` と
/// `BLOGCORE_DB_ACQUIRE_TIMEOUT_SECS` は任意。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl DatabaseSettings {
    /// 環境変数から読み込む
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// 名前から値を引く関数を使って読み込む
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::missing_env_var("DATABASE_URL"))?;

        let max_connections = match lookup("BLOGCORE_DB_MAX_CONNECTIONS") {
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::invalid_value(format!(
                        "BLOGCORE_DB_MAX_CONNECTIONSは1以上の整数で指定してください: {}",
                        raw
                    )))
                }
            },
            None => DEFAULT_MAX_CONNECTIONS,
        };

        let timeout_secs = match lookup("BLOGCORE_DB_ACQUIRE_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                ConfigError::invalid_value(format!(
                    "BLOGCORE_DB_ACQUIRE_TIMEOUT_SECSは整数で指定してください: {}",
                    raw
                ))
            })?,
            None => DEFAULT_ACQUIRE_TIMEOUT_SECS,
        };

        Ok(Self {
            url,
            max_connections,
            acquire_timeout: Duration::from_secs(timeout_secs.max(1)),
        })
    }
}

/// 設定に従って接続プールを作成
pub async fn create_pool(settings: &DatabaseSettings) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(settings.acquire_timeout)
        .connect(&settings.url)
        .await
        .context("データベースへの接続に失敗しました")
}

/// マイグレーションを実行
pub async fn initialize_database(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("データベースマイグレーションの実行に失敗しました")
}

/// 環境変数から設定を読み、プール作成とマイグレーションまで行う
pub async fn setup_database() -> Result<PgPool> {
    let settings = DatabaseSettings::from_env().context("データベース設定の読み込みに失敗")?;
    let pool = create_pool(&settings).await?;
    initialize_database(&pool).await?;
    Ok(pool)
}
