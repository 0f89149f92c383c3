//! コンテンツストアの抽象化
//!
//! 一覧・検索・詳細・コメント投稿はこのトレイトを通してデータを読み書きする。
//! 本番はPostgres実装（`infra::storage::postgres`）、テストはメモリ実装
//! （`infra::storage::memory`）を注入する。

use crate::domain::article::{Article, ArticleLink, ArticleSummaryRow, ArticleTag, Category, NewArticle, Tag};
use crate::domain::comment::{Comment, CommentView, NewComment};
use crate::domain::identity::SocialiteUser;
use crate::domain::note::Note;
use crate::types::DomainResult;
use async_trait::async_trait;

/// 記事一覧の絞り込み条件
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ArticleFilter {
    /// 絞り込みなし
    #[default]
    All,
    /// カテゴリに属する記事
    Category(i64),
    /// タグが付いた記事
    Tag(i64),
    /// 検索結果などのID集合
    Ids(Vec<i64>),
}

/// LIKE検索用に `%` `_` `\` をエスケープする
pub fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn find_article(&self, id: i64) -> DomainResult<Option<Article>>;

    async fn find_category(&self, id: i64) -> DomainResult<Option<Category>>;

    async fn find_tag(&self, id: i64) -> DomainResult<Option<Tag>>;

    async fn find_identity(&self, id: i64) -> DomainResult<Option<SocialiteUser>>;

    /// 条件に合う記事の要約を作成日時の降順で1ページ分取得し、総件数と一緒に返す
    async fn page_summaries(
        &self,
        filter: &ArticleFilter,
        limit: i64,
        offset: i64,
    ) -> DomainResult<(Vec<ArticleSummaryRow>, i64)>;

    async fn categories_by_ids(&self, ids: &[i64]) -> DomainResult<Vec<Category>>;

    /// 指定した記事に付いたタグ（記事IDとの組）
    async fn tags_for_articles(&self, article_ids: &[i64]) -> DomainResult<Vec<ArticleTag>>;

    /// タイトル・説明文・markdownのいずれかに大文字小文字を無視して部分一致する記事ID
    /// 空文字はすべての記事に一致する
    async fn match_article_ids(&self, term: &str) -> DomainResult<Vec<i64>>;

    /// 渡したIDのうち実在するもの
    async fn existing_article_ids(&self, ids: &[i64]) -> DomainResult<Vec<i64>>;

    /// 閲覧数を1増やす。記事がなければNotFound
    async fn increment_visits(&self, article_id: i64) -> DomainResult<()>;

    /// IDが直前の記事
    async fn previous_article(&self, article_id: i64) -> DomainResult<Option<ArticleLink>>;

    /// IDが直後の記事
    async fn next_article(&self, article_id: i64) -> DomainResult<Option<ArticleLink>>;

    async fn comments_for_article(
        &self,
        article_id: i64,
        audited_only: bool,
    ) -> DomainResult<Vec<CommentView>>;

    async fn find_comment(&self, id: i64) -> DomainResult<Option<Comment>>;

    async fn insert_comment(&self, comment: &NewComment) -> DomainResult<i64>;

    async fn update_identity_email(&self, user_id: i64, email: &str) -> DomainResult<()>;

    async fn has_liked(&self, user_id: i64, article_id: i64) -> DomainResult<bool>;

    async fn likers_of(&self, article_id: i64) -> DomainResult<Vec<SocialiteUser>>;

    /// 随筆を新しい順で全件
    async fn list_notes(&self) -> DomainResult<Vec<Note>>;

    /// フィード用に新しい記事から取得
    async fn recent_articles(&self, limit: i64) -> DomainResult<Vec<Article>>;

    /// 記事を作成する（htmlはmarkdownから生成）
    async fn create_article(&self, article: &NewArticle) -> DomainResult<i64>;
}
