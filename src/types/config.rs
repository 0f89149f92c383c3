use crate::infra::storage::file::load_yaml_from_file;
use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

/// 設定関連のエラー型
/// 環境変数、設定ファイル、設定値の検証など設定に関するエラーを定義
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 環境変数が見つからない
    #[error("環境変数が見つかりません: {name}")]
    MissingEnvironmentVariable { name: String },

    /// 設定値が不正
    #[error("設定値が不正です: {reason}")]
    InvalidValue { reason: String },

    /// 設定ファイルが読めない
    #[error("設定ファイルを読み込めません: {path} - {message}")]
    UnreadableConfigFile { path: String, message: String },
}

impl ConfigError {
    /// 環境変数不足エラーを作成
    pub fn missing_env_var<N: Into<String>>(name: N) -> Self {
        Self::MissingEnvironmentVariable { name: name.into() }
    }

    /// 不正な設定値エラーを作成
    pub fn invalid_value<R: Into<String>>(reason: R) -> Self {
        Self::InvalidValue {
            reason: reason.into(),
        }
    }

    /// 設定ファイル読み込みエラーを作成
    pub fn unreadable_config_file<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::UnreadableConfigFile {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// 設定エラーのResult型エイリアス
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// 設定ファイルのデフォルトパス
pub const DEFAULT_CONFIG_PATH: &str = "config/site.yaml";

/// 検索バックエンドの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SearchBackend {
    /// SQLの部分一致のみで検索する
    #[default]
    None,
    /// 全文検索インデックスを優先し、失敗時は部分一致に降格する
    Indexed,
}

impl SearchBackend {
    fn parse(value: &str) -> ConfigResult<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "none" | "null" => Ok(Self::None),
            "indexed" => Ok(Self::Indexed),
            other => Err(ConfigError::invalid_value(format!(
                "検索バックエンドはnoneかindexedで指定してください: {}",
                other
            ))),
        }
    }
}

/// コア（検索・一覧・詳細・コメント）が参照する設定値
/// 各コンポーネントの生成時に明示的に渡す
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CoreConfig {
    pub search_backend: SearchBackend,
    pub use_slug_urls: bool,
    pub comment_audit_required: bool,
}

/// サイト情報（フィードや記事URLの組み立てに使用）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteInfo {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub base_url: String,
    /// アップロード画像を配信するCDNのベースURL（空ならそのまま）
    #[serde(default)]
    pub cdn_base: String,
}

impl Default for SiteInfo {
    fn default() -> Self {
        Self {
            name: "blogcore".to_string(),
            description: String::new(),
            base_url: "http://127.0.0.1:8080".to_string(),
            cdn_base: String::new(),
        }
    }
}

/// 全文検索インデックスの接続設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSettings {
    #[serde(default)]
    pub backend: SearchBackend,
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_index_name")]
    pub index: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_index_name() -> String {
    "articles".to_string()
}

fn default_timeout_secs() -> u64 {
    3
}

fn default_bind_addr() -> String {
    "127.0.0.1:8080".to_string()
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            backend: SearchBackend::None,
            url: String::new(),
            index: default_index_name(),
            api_key: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// アプリケーション全体の設定（config/site.yaml に対応）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(default)]
    pub site: SiteInfo,
    #[serde(default)]
    pub search: SearchSettings,
    #[serde(default)]
    pub use_slug_urls: bool,
    #[serde(default)]
    pub comment_audit_required: bool,
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            site: SiteInfo::default(),
            search: SearchSettings::default(),
            use_slug_urls: false,
            comment_audit_required: false,
            bind_addr: default_bind_addr(),
        }
    }
}

impl SiteConfig {
    /// YAMLファイルから設定を読み込み、環境変数で上書きして検証する
    pub fn load(path: &str) -> ConfigResult<Self> {
        let mut config: SiteConfig = load_yaml_from_file(path)
            .map_err(|e| ConfigError::unreadable_config_file(path, format!("{:#}", e)))?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// BLOGCORE_CONFIG（未設定ならデフォルトパス）から設定を読み込む
    pub fn from_env() -> ConfigResult<Self> {
        let path = env::var("BLOGCORE_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load(&path)
    }

    /// 環境変数による上書き
    pub fn apply_env_overrides(&mut self) -> ConfigResult<()> {
        if let Ok(value) = env::var("BLOGCORE_SEARCH_BACKEND") {
            self.search.backend = SearchBackend::parse(&value)?;
        }
        if let Ok(value) = env::var("BLOGCORE_COMMENT_AUDIT") {
            self.comment_audit_required = parse_bool("BLOGCORE_COMMENT_AUDIT", &value)?;
        }
        if let Ok(value) = env::var("BLOGCORE_USE_SLUG") {
            self.use_slug_urls = parse_bool("BLOGCORE_USE_SLUG", &value)?;
        }
        Ok(())
    }

    /// 設定値の整合性を検証する
    pub fn validate(&self) -> ConfigResult<()> {
        if self.search.backend == SearchBackend::Indexed && self.search.url.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "search.backendがindexedの場合はsearch.urlが必要です",
            ));
        }
        if self.site.base_url.trim().is_empty() {
            return Err(ConfigError::invalid_value("site.base_urlが空です"));
        }
        Ok(())
    }

    /// コアに渡す設定値を取り出す
    pub fn core(&self) -> CoreConfig {
        CoreConfig {
            search_backend: self.search.backend,
            use_slug_urls: self.use_slug_urls,
            comment_audit_required: self.comment_audit_required,
        }
    }
}

/// "true"/"1"/"yes" などを真偽値に変換する
fn parse_bool(name: &str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(ConfigError::invalid_value(format!(
            "{}は真偽値で指定してください: {}",
            name, other
        ))),
    }
}
