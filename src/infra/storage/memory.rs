//! メモリ上のコンテンツストア
//!
//! テストやデモでPostgresの代わりに注入する。検索・並び順の意味は
//! Postgres実装と同じにしてある。

use crate::domain::article::{
    render_markdown, Article, ArticleLink, ArticleSummaryRow, ArticleTag, Category, NewArticle, Tag,
};
use crate::domain::comment::{Comment, CommentView, NewComment};
use crate::domain::identity::SocialiteUser;
use crate::domain::note::Note;
use crate::domain::store::{ArticleFilter, ContentStore};
use crate::types::{DomainError, DomainResult};
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::{BTreeMap, BTreeSet};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct MemoryData {
    categories: BTreeMap<i64, Category>,
    tags: BTreeMap<i64, Tag>,
    articles: BTreeMap<i64, Article>,
    article_tags: BTreeSet<(i64, i64)>,
    identities: BTreeMap<i64, SocialiteUser>,
    comments: BTreeMap<i64, Comment>,
    likes: BTreeSet<(i64, i64)>,
    notes: BTreeMap<i64, Note>,
    /// 設定されているとコメント保存がこのメッセージで失敗する
    comment_insert_error: Option<String>,
}

impl MemoryData {
    fn next_id<V>(map: &BTreeMap<i64, V>) -> i64 {
        map.keys().next_back().copied().unwrap_or(0) + 1
    }

    fn matches_filter(&self, article: &Article, filter: &ArticleFilter) -> bool {
        match filter {
            ArticleFilter::All => true,
            ArticleFilter::Category(id) => article.category_id == *id,
            ArticleFilter::Tag(id) => self.article_tags.contains(&(article.id, *id)),
            ArticleFilter::Ids(ids) => ids.contains(&article.id),
        }
    }

    fn link(article: &Article) -> ArticleLink {
        ArticleLink {
            id: article.id,
            title: article.title.clone(),
            slug: article.slug.clone(),
            url: String::new(),
        }
    }
}

/// メモリ上のContentStore実装
#[derive(Debug, Default)]
pub struct MemoryContentStore {
    data: RwLock<MemoryData>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// テストデータの基準時刻
    pub fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0)
            .single()
            .unwrap_or_else(Utc::now)
    }

    pub async fn add_category(&self, name: &str) -> Category {
        let mut data = self.data.write().await;
        let category = Category {
            id: MemoryData::next_id(&data.categories),
            name: name.to_string(),
            keywords: name.to_lowercase(),
            description: format!("{}の記事", name),
            seo_title: name.to_string(),
        };
        data.categories.insert(category.id, category.clone());
        category
    }

    pub async fn add_tag(&self, name: &str) -> Tag {
        let mut data = self.data.write().await;
        let tag = Tag {
            id: MemoryData::next_id(&data.tags),
            name: name.to_string(),
            keywords: name.to_lowercase(),
            description: String::new(),
        };
        data.tags.insert(tag.id, tag.clone());
        tag
    }

    /// 作成日時がIDの順になる記事を追加する（ID n は基準時刻 + n 時間）
    pub async fn add_simple_article(&self, category_id: i64, title: &str) -> i64 {
        let next = MemoryData::next_id(&self.data.read().await.articles);
        let article = NewArticle {
            category_id,
            title: title.to_string(),
            slug: format!("article-{}", next),
            author: "admin".to_string(),
            markdown: format!("{}の本文", title),
            description: format!("{}の説明", title),
            created_at: Some(Self::base_time() + Duration::hours(next)),
            ..Default::default()
        };
        // 存在しないカテゴリでもテストデータとしては許容する
        self.insert_article(&article).await
    }

    pub async fn attach_tag(&self, article_id: i64, tag_id: i64) {
        self.data
            .write()
            .await
            .article_tags
            .insert((article_id, tag_id));
    }

    pub async fn add_identity(&self, name: &str, email: Option<&str>) -> SocialiteUser {
        let mut data = self.data.write().await;
        let user = SocialiteUser {
            id: MemoryData::next_id(&data.identities),
            name: name.to_string(),
            avatar: String::new(),
            email: email.map(str::to_string),
        };
        data.identities.insert(user.id, user.clone());
        user
    }

    pub async fn add_like(&self, user_id: i64, article_id: i64) {
        self.data.write().await.likes.insert((user_id, article_id));
    }

    pub async fn add_note(&self, content: &str, created_at: DateTime<Utc>) -> Note {
        let mut data = self.data.write().await;
        let note = Note {
            id: MemoryData::next_id(&data.notes),
            content: content.to_string(),
            created_at,
        };
        data.notes.insert(note.id, note.clone());
        note
    }

    /// コメント保存を失敗させる（Noneで解除）
    pub async fn fail_comment_inserts(&self, message: Option<&str>) {
        self.data.write().await.comment_insert_error = message.map(str::to_string);
    }

    /// 保存済みコメントをID順で返す
    pub async fn comments(&self) -> Vec<Comment> {
        self.data.read().await.comments.values().cloned().collect()
    }

    /// 記事の閲覧数
    pub async fn visits(&self, article_id: i64) -> Option<i64> {
        self.data
            .read()
            .await
            .articles
            .get(&article_id)
            .map(|a| a.visits)
    }

    async fn insert_article(&self, article: &NewArticle) -> i64 {
        let mut data = self.data.write().await;
        let id = MemoryData::next_id(&data.articles);
        data.articles.insert(
            id,
            Article {
                id,
                category_id: article.category_id,
                title: article.title.clone(),
                slug: article.slug.clone(),
                author: article.author.clone(),
                markdown: article.markdown.clone(),
                html: render_markdown(&article.markdown),
                description: article.description.clone(),
                keywords: article.keywords.clone(),
                cover: article.cover.clone(),
                is_top: article.is_top,
                visits: 0,
                created_at: article.created_at.unwrap_or_else(Utc::now),
            },
        );
        for tag_id in &article.tag_ids {
            data.article_tags.insert((id, *tag_id));
        }
        id
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn find_article(&self, id: i64) -> DomainResult<Option<Article>> {
        Ok(self.data.read().await.articles.get(&id).cloned())
    }

    async fn find_category(&self, id: i64) -> DomainResult<Option<Category>> {
        Ok(self.data.read().await.categories.get(&id).cloned())
    }

    async fn find_tag(&self, id: i64) -> DomainResult<Option<Tag>> {
        Ok(self.data.read().await.tags.get(&id).cloned())
    }

    async fn find_identity(&self, id: i64) -> DomainResult<Option<SocialiteUser>> {
        Ok(self.data.read().await.identities.get(&id).cloned())
    }

    async fn page_summaries(
        &self,
        filter: &ArticleFilter,
        limit: i64,
        offset: i64,
    ) -> DomainResult<(Vec<ArticleSummaryRow>, i64)> {
        let data = self.data.read().await;
        let mut matched: Vec<&Article> = data
            .articles
            .values()
            .filter(|a| data.matches_filter(a, filter))
            .collect();
        // 作成日時の降順（同時刻はIDの降順）
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = matched.len() as i64;
        let rows = matched
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .map(|a| ArticleSummaryRow {
                id: a.id,
                category_id: a.category_id,
                title: a.title.clone(),
                slug: a.slug.clone(),
                author: a.author.clone(),
                description: a.description.clone(),
                cover: a.cover.clone(),
                is_top: a.is_top,
                created_at: a.created_at,
            })
            .collect();
        Ok((rows, total))
    }

    async fn categories_by_ids(&self, ids: &[i64]) -> DomainResult<Vec<Category>> {
        let data = self.data.read().await;
        Ok(ids
            .iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .filter_map(|id| data.categories.get(id).cloned())
            .collect())
    }

    async fn tags_for_articles(&self, article_ids: &[i64]) -> DomainResult<Vec<ArticleTag>> {
        let data = self.data.read().await;
        let mut result: Vec<ArticleTag> = data
            .article_tags
            .iter()
            .filter(|(article_id, _)| article_ids.contains(article_id))
            .filter_map(|(article_id, tag_id)| {
                data.tags.get(tag_id).map(|tag| ArticleTag {
                    article_id: *article_id,
                    tag: tag.clone(),
                })
            })
            .collect();
        result.sort_by_key(|t| (t.article_id, t.tag.id));
        Ok(result)
    }

    async fn match_article_ids(&self, term: &str) -> DomainResult<Vec<i64>> {
        let needle = term.to_lowercase();
        let data = self.data.read().await;
        Ok(data
            .articles
            .values()
            .filter(|a| {
                a.title.to_lowercase().contains(&needle)
                    || a.description.to_lowercase().contains(&needle)
                    || a.markdown.to_lowercase().contains(&needle)
            })
            .map(|a| a.id)
            .collect())
    }

    async fn existing_article_ids(&self, ids: &[i64]) -> DomainResult<Vec<i64>> {
        let data = self.data.read().await;
        Ok(ids
            .iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .filter(|id| data.articles.contains_key(*id))
            .copied()
            .collect())
    }

    async fn increment_visits(&self, article_id: i64) -> DomainResult<()> {
        let mut data = self.data.write().await;
        let article = data
            .articles
            .get_mut(&article_id)
            .ok_or_else(|| DomainError::not_found("記事", article_id))?;
        article.visits += 1;
        Ok(())
    }

    async fn previous_article(&self, article_id: i64) -> DomainResult<Option<ArticleLink>> {
        let data = self.data.read().await;
        Ok(data
            .articles
            .range(..article_id)
            .next_back()
            .map(|(_, a)| MemoryData::link(a)))
    }

    async fn next_article(&self, article_id: i64) -> DomainResult<Option<ArticleLink>> {
        let data = self.data.read().await;
        Ok(data
            .articles
            .range(article_id.saturating_add(1)..)
            .next()
            .map(|(_, a)| MemoryData::link(a)))
    }

    async fn comments_for_article(
        &self,
        article_id: i64,
        audited_only: bool,
    ) -> DomainResult<Vec<CommentView>> {
        let data = self.data.read().await;
        Ok(data
            .comments
            .values()
            .filter(|c| c.article_id == article_id && (!audited_only || c.is_audited))
            .map(|c| {
                let user = data.identities.get(&c.socialite_user_id);
                CommentView {
                    id: c.id,
                    article_id: c.article_id,
                    socialite_user_id: c.socialite_user_id,
                    user_name: user.map(|u| u.name.clone()).unwrap_or_default(),
                    avatar: user.map(|u| u.avatar.clone()).unwrap_or_default(),
                    content: c.content.clone(),
                    pid: c.pid,
                    created_at: c.created_at,
                }
            })
            .collect())
    }

    async fn find_comment(&self, id: i64) -> DomainResult<Option<Comment>> {
        Ok(self.data.read().await.comments.get(&id).cloned())
    }

    async fn insert_comment(&self, comment: &NewComment) -> DomainResult<i64> {
        let mut data = self.data.write().await;
        if let Some(message) = data.comment_insert_error.clone() {
            return Err(DomainError::database(
                "コメントの保存",
                sqlx::Error::Protocol(message),
            ));
        }
        if !data.articles.contains_key(&comment.article_id) {
            return Err(DomainError::not_found("記事", comment.article_id));
        }
        let id = MemoryData::next_id(&data.comments);
        data.comments.insert(
            id,
            Comment {
                id,
                article_id: comment.article_id,
                socialite_user_id: comment.socialite_user_id,
                content: comment.content.clone(),
                pid: comment.pid,
                is_audited: comment.is_audited,
                comment_type: comment.comment_type,
                created_at: Utc::now(),
            },
        );
        Ok(id)
    }

    async fn update_identity_email(&self, user_id: i64, email: &str) -> DomainResult<()> {
        let mut data = self.data.write().await;
        let user = data
            .identities
            .get_mut(&user_id)
            .ok_or_else(|| DomainError::not_found("ユーザー", user_id))?;
        user.email = Some(email.to_string());
        Ok(())
    }

    async fn has_liked(&self, user_id: i64, article_id: i64) -> DomainResult<bool> {
        Ok(self.data.read().await.likes.contains(&(user_id, article_id)))
    }

    async fn likers_of(&self, article_id: i64) -> DomainResult<Vec<SocialiteUser>> {
        let data = self.data.read().await;
        Ok(data
            .likes
            .iter()
            .filter(|(_, liked)| *liked == article_id)
            .filter_map(|(user_id, _)| data.identities.get(user_id).cloned())
            .collect())
    }

    async fn list_notes(&self) -> DomainResult<Vec<Note>> {
        let mut notes: Vec<Note> = self.data.read().await.notes.values().cloned().collect();
        notes.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(notes)
    }

    async fn recent_articles(&self, limit: i64) -> DomainResult<Vec<Article>> {
        let mut articles: Vec<Article> =
            self.data.read().await.articles.values().cloned().collect();
        articles.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        articles.truncate(limit.max(0) as usize);
        Ok(articles)
    }

    async fn create_article(&self, article: &NewArticle) -> DomainResult<i64> {
        if self.find_category(article.category_id).await?.is_none() {
            return Err(DomainError::not_found("カテゴリ", article.category_id));
        }
        Ok(self.insert_article(article).await)
    }
}
