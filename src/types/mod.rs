//! 型定義モジュール
//!
//! アプリケーション全体で使用される共通的な型定義を管理します。
//! - エラー型: ドメインエラーと設定エラー
//! - 設定: config/site.yaml と環境変数から読み込むサイト設定

pub mod config;
pub mod error;

// 便利な再エクスポート
pub use config::{ConfigError, ConfigResult, CoreConfig, SearchBackend, SiteConfig, SiteInfo};
pub use error::{DomainError, DomainResult};
