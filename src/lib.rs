//! blogcore: ブログのコンテンツ配信コア
//!
//! - app: HTTPルーティングとハンドラ
//! - domain: 一覧・詳細・検索・コメントなどのドメインロジック
//! - infra: Postgres・メモリストア・外部検索インデックス
//! - types: 設定とエラー型

pub mod app;
pub mod domain;
pub mod infra;
pub mod types;
