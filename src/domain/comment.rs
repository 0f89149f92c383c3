use crate::domain::identity::{is_valid_email, SocialiteUser};
use crate::domain::store::ContentStore;
use crate::types::{CoreConfig, DomainError, DomainResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::sync::Arc;
use tracing::{debug, info};

/// 閲覧者が投稿するコメントの種別
pub const COMMENT_TYPE_ARTICLE: i16 = 1;

// コメントエンティティ（commentsテーブルと一致）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Comment {
    pub id: i64,
    pub article_id: i64,
    pub socialite_user_id: i64,
    pub content: String,
    /// 返信先のコメント
    pub pid: Option<i64>,
    pub is_audited: bool,
    pub comment_type: i16,
    pub created_at: DateTime<Utc>,
}

// 表示用のコメント（投稿者情報をJOIN済み）
// 階層の組み立ては表示側でpidを使って行う
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct CommentView {
    pub id: i64,
    pub article_id: i64,
    pub socialite_user_id: i64,
    pub user_name: String,
    pub avatar: String,
    pub content: String,
    pub pid: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// 保存するコメント
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub article_id: i64,
    pub socialite_user_id: i64,
    pub content: String,
    pub pid: Option<i64>,
    pub is_audited: bool,
    pub comment_type: i16,
}

/// コメント投稿の入力値
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentInput {
    pub article_id: i64,
    pub content: String,
    #[serde(default)]
    pub pid: Option<i64>,
    #[serde(default)]
    pub email: Option<String>,
}

/// コメント投稿サービス
#[derive(Clone)]
pub struct CommentService {
    store: Arc<dyn ContentStore>,
    config: CoreConfig,
}

impl CommentService {
    pub fn new(store: Arc<dyn ContentStore>, config: CoreConfig) -> Self {
        Self { store, config }
    }

    /// コメントを投稿し、新しいコメントのIDを返す
    ///
    /// - 未ログインなら `Unauthorized`（何も書き込まない）
    /// - 保存できたら、正しい形式のメールアドレスを閲覧者の情報に保存する（不正な形式は黙って無視）
    /// - 承認制が有効なら非表示で保存する
    pub async fn submit(
        &self,
        viewer: Option<&SocialiteUser>,
        input: CommentInput,
    ) -> DomainResult<i64> {
        let viewer = viewer.ok_or(DomainError::Unauthorized)?;

        let content = input.content.trim();
        if content.is_empty() {
            return Err(DomainError::invalid_input("コメント内容が空です"));
        }

        if self.store.find_article(input.article_id).await?.is_none() {
            return Err(DomainError::not_found("記事", input.article_id));
        }

        // 返信先は同じ記事のコメントでなければならない
        if let Some(pid) = input.pid {
            match self.store.find_comment(pid).await? {
                Some(parent) if parent.article_id == input.article_id => {}
                Some(_) => {
                    return Err(DomainError::invalid_input(
                        "返信先のコメントが別の記事のものです",
                    ))
                }
                None => return Err(DomainError::not_found("コメント", pid)),
            }
        }

        let comment = NewComment {
            article_id: input.article_id,
            socialite_user_id: viewer.id,
            content: content.to_string(),
            pid: input.pid,
            is_audited: !self.config.comment_audit_required,
            comment_type: COMMENT_TYPE_ARTICLE,
        };
        let id = self.store.insert_comment(&comment).await?;

        // メールアドレスはコメントが保存できたときだけ更新する
        if let Some(email) = input.email.as_deref() {
            if is_valid_email(email) {
                self.store
                    .update_identity_email(viewer.id, email.trim())
                    .await?;
            } else {
                debug!(user_id = viewer.id, "メールアドレスの形式が不正なため保存しません");
            }
        }

        info!(
            comment_id = id,
            article_id = comment.article_id,
            audited = comment.is_audited,
            "コメントを保存しました"
        );
        Ok(id)
    }
}
