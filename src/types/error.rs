use thiserror::Error;

/// ドメイン層の共通エラー型
/// 一覧・詳細・コメント投稿などのコア操作が返すエラーを定義
#[derive(Error, Debug)]
pub enum DomainError {
    /// 指定されたエンティティが存在しない
    #[error("{entity}が見つかりません: id={id}")]
    NotFound { entity: &'static str, id: i64 },

    /// ログインが必要な操作を未ログインで実行した
    #[error("ログインが必要です")]
    Unauthorized,

    /// 入力値が不正
    #[error("入力値が不正です: {reason}")]
    InvalidInput { reason: String },

    /// データベース関連のエラー
    #[error("データベースエラー: {operation} - {source}")]
    Database {
        operation: String,
        #[source]
        source: sqlx::Error,
    },
}

impl DomainError {
    /// 存在しないエンティティのエラーを作成
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound { entity, id }
    }

    /// 不正な入力値エラーを作成
    pub fn invalid_input<R: Into<String>>(reason: R) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    /// データベースエラーを作成
    pub fn database<O: Into<String>>(operation: O, source: sqlx::Error) -> Self {
        Self::Database {
            operation: operation.into(),
            source,
        }
    }
}

/// ドメインエラーのResult型エイリアス
pub type DomainResult<T> = std::result::Result<T, DomainError>;
