use crate::domain::article::{
    render_markdown, Article, ArticleLink, ArticleSummaryRow, ArticleTag, Category, NewArticle, Tag,
};
use crate::domain::comment::{Comment, CommentView, NewComment};
use crate::domain::identity::SocialiteUser;
use crate::domain::note::Note;
use crate::domain::store::{escape_like, ArticleFilter, ContentStore};
use crate::types::{DomainError, DomainResult};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};

const ARTICLE_COLUMNS: &str = "id, category_id, title, slug, author, markdown, html, \
     description, keywords, cover, is_top, visits, created_at";

const SUMMARY_COLUMNS: &str =
    "id, category_id, title, slug, author, description, cover, is_top, created_at";

/// Postgres上のContentStore実装
#[derive(Debug, Clone)]
pub struct PgContentStore {
    pool: PgPool,
}

impl PgContentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// 絞り込み条件をWHERE句として追加する
fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &ArticleFilter) {
    match filter {
        ArticleFilter::All => {}
        ArticleFilter::Category(id) => {
            qb.push(" WHERE category_id = ").push_bind(*id);
        }
        ArticleFilter::Tag(id) => {
            qb.push(" WHERE id IN (SELECT article_id FROM article_tags WHERE tag_id = ")
                .push_bind(*id)
                .push(")");
        }
        ArticleFilter::Ids(ids) => {
            qb.push(" WHERE id = ANY(").push_bind(ids.clone()).push(")");
        }
    }
}

#[async_trait]
impl ContentStore for PgContentStore {
    async fn find_article(&self, id: i64) -> DomainResult<Option<Article>> {
        sqlx::query_as::<_, Article>(&format!(
            "SELECT {} FROM articles WHERE id = $1",
            ARTICLE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("記事の取得", e))
    }

    async fn find_category(&self, id: i64) -> DomainResult<Option<Category>> {
        sqlx::query_as::<_, Category>(
            "SELECT id, name, keywords, description, seo_title FROM categories WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("カテゴリの取得", e))
    }

    async fn find_tag(&self, id: i64) -> DomainResult<Option<Tag>> {
        sqlx::query_as::<_, Tag>("SELECT id, name, keywords, description FROM tags WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::database("タグの取得", e))
    }

    async fn find_identity(&self, id: i64) -> DomainResult<Option<SocialiteUser>> {
        sqlx::query_as::<_, SocialiteUser>(
            "SELECT id, name, avatar, email FROM socialite_users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("ユーザーの取得", e))
    }

    async fn page_summaries(
        &self,
        filter: &ArticleFilter,
        limit: i64,
        offset: i64,
    ) -> DomainResult<(Vec<ArticleSummaryRow>, i64)> {
        // 総件数
        let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM articles");
        push_filter(&mut count_qb, filter);
        let total: i64 = count_qb
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::database("記事件数の取得", e))?;

        // ページ本体
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM articles", SUMMARY_COLUMNS));
        push_filter(&mut qb, filter);
        qb.push(" ORDER BY created_at DESC, id DESC");
        qb.push(" LIMIT ").push_bind(limit);
        qb.push(" OFFSET ").push_bind(offset);

        let rows = qb
            .build_query_as::<ArticleSummaryRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::database("記事一覧の取得", e))?;

        Ok((rows, total))
    }

    async fn categories_by_ids(&self, ids: &[i64]) -> DomainResult<Vec<Category>> {
        sqlx::query_as::<_, Category>(
            "SELECT id, name, keywords, description, seo_title FROM categories WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database("カテゴリ一覧の取得", e))
    }

    async fn tags_for_articles(&self, article_ids: &[i64]) -> DomainResult<Vec<ArticleTag>> {
        sqlx::query_as::<_, ArticleTag>(
            r#"
            SELECT at.article_id, t.id, t.name, t.keywords, t.description
            FROM article_tags at
            JOIN tags t ON t.id = at.tag_id
            WHERE at.article_id = ANY($1)
            ORDER BY at.article_id, t.id
            "#,
        )
        .bind(article_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database("記事タグの取得", e))
    }

    async fn match_article_ids(&self, term: &str) -> DomainResult<Vec<i64>> {
        let pattern = format!("%{}%", escape_like(term));
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT id FROM articles
            WHERE title ILIKE $1 ESCAPE '\'
               OR description ILIKE $1 ESCAPE '\'
               OR markdown ILIKE $1 ESCAPE '\'
            ORDER BY id
            "#,
        )
        .bind(pattern)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database("記事の部分一致検索", e))
    }

    async fn existing_article_ids(&self, ids: &[i64]) -> DomainResult<Vec<i64>> {
        sqlx::query_scalar::<_, i64>("SELECT id FROM articles WHERE id = ANY($1) ORDER BY id")
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::database("記事IDの確認", e))
    }

    async fn increment_visits(&self, article_id: i64) -> DomainResult<()> {
        let result = sqlx::query("UPDATE articles SET visits = visits + 1 WHERE id = $1")
            .bind(article_id)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::database("閲覧数の更新", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("記事", article_id));
        }
        Ok(())
    }

    async fn previous_article(&self, article_id: i64) -> DomainResult<Option<ArticleLink>> {
        sqlx::query_as::<_, ArticleLink>(
            "SELECT id, title, slug FROM articles WHERE id < $1 ORDER BY id DESC LIMIT 1",
        )
        .bind(article_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("前の記事の取得", e))
    }

    async fn next_article(&self, article_id: i64) -> DomainResult<Option<ArticleLink>> {
        sqlx::query_as::<_, ArticleLink>(
            "SELECT id, title, slug FROM articles WHERE id > $1 ORDER BY id ASC LIMIT 1",
        )
        .bind(article_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("次の記事の取得", e))
    }

    async fn comments_for_article(
        &self,
        article_id: i64,
        audited_only: bool,
    ) -> DomainResult<Vec<CommentView>> {
        let mut qb = QueryBuilder::<Postgres>::new(
            r#"
            SELECT
                c.id,
                c.article_id,
                c.socialite_user_id,
                u.name AS user_name,
                u.avatar,
                c.content,
                c.pid,
                c.created_at
            FROM comments c
            JOIN socialite_users u ON u.id = c.socialite_user_id
            WHERE c.article_id = "#,
        );
        qb.push_bind(article_id);
        if audited_only {
            qb.push(" AND c.is_audited = TRUE");
        }
        qb.push(" ORDER BY c.id ASC");

        qb.build_query_as::<CommentView>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::database("コメントの取得", e))
    }

    async fn find_comment(&self, id: i64) -> DomainResult<Option<Comment>> {
        sqlx::query_as::<_, Comment>(
            r#"
            SELECT id, article_id, socialite_user_id, content, pid, is_audited, comment_type, created_at
            FROM comments WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("コメントの取得", e))
    }

    async fn insert_comment(&self, comment: &NewComment) -> DomainResult<i64> {
        sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO comments (article_id, socialite_user_id, content, pid, is_audited, comment_type)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(comment.article_id)
        .bind(comment.socialite_user_id)
        .bind(&comment.content)
        .bind(comment.pid)
        .bind(comment.is_audited)
        .bind(comment.comment_type)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::database("コメントの保存", e))
    }

    async fn update_identity_email(&self, user_id: i64, email: &str) -> DomainResult<()> {
        sqlx::query("UPDATE socialite_users SET email = $1 WHERE id = $2")
            .bind(email)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::database("メールアドレスの更新", e))?;
        Ok(())
    }

    async fn has_liked(&self, user_id: i64, article_id: i64) -> DomainResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM likes WHERE socialite_user_id = $1 AND article_id = $2)",
        )
        .bind(user_id)
        .bind(article_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::database("いいね状態の確認", e))
    }

    async fn likers_of(&self, article_id: i64) -> DomainResult<Vec<SocialiteUser>> {
        sqlx::query_as::<_, SocialiteUser>(
            r#"
            SELECT u.id, u.name, u.avatar, u.email
            FROM likes l
            JOIN socialite_users u ON u.id = l.socialite_user_id
            WHERE l.article_id = $1
            ORDER BY l.created_at, u.id
            "#,
        )
        .bind(article_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database("いいねしたユーザーの取得", e))
    }

    async fn list_notes(&self) -> DomainResult<Vec<Note>> {
        sqlx::query_as::<_, Note>(
            "SELECT id, content, created_at FROM notes ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database("随筆の取得", e))
    }

    async fn recent_articles(&self, limit: i64) -> DomainResult<Vec<Article>> {
        sqlx::query_as::<_, Article>(&format!(
            "SELECT {} FROM articles ORDER BY created_at DESC, id DESC LIMIT $1",
            ARTICLE_COLUMNS
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database("最新記事の取得", e))
    }

    async fn create_article(&self, article: &NewArticle) -> DomainResult<i64> {
        if self.find_category(article.category_id).await?.is_none() {
            return Err(DomainError::not_found("カテゴリ", article.category_id));
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::database("トランザクション開始", e))?;

        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO articles
                (category_id, title, slug, author, markdown, html, description, keywords, cover, is_top, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, COALESCE($11, CURRENT_TIMESTAMP))
            RETURNING id
            "#,
        )
        .bind(article.category_id)
        .bind(&article.title)
        .bind(&article.slug)
        .bind(&article.author)
        .bind(&article.markdown)
        .bind(render_markdown(&article.markdown))
        .bind(&article.description)
        .bind(&article.keywords)
        .bind(&article.cover)
        .bind(article.is_top)
        .bind(article.created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| DomainError::database("記事の保存", e))?;

        for tag_id in &article.tag_ids {
            sqlx::query(
                "INSERT INTO article_tags (article_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(id)
            .bind(tag_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| DomainError::database("記事タグの保存", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| DomainError::database("トランザクションのコミット", e))?;
        Ok(id)
    }
}
