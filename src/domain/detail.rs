use crate::domain::article::{Article, ArticleLink, Category, Tag};
use crate::domain::comment::CommentView;
use crate::domain::identity::SocialiteUser;
use crate::domain::store::ContentStore;
use crate::types::{CoreConfig, DomainError, DomainResult};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// 記事詳細ページの表示データ
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArticleDetail {
    /// 読み出し時変換済みの記事
    pub article: Article,
    pub url: String,
    pub category: Option<Category>,
    pub tags: Vec<Tag>,
    /// IDが直前の記事（先頭ならNone）
    pub prev: Option<ArticleLink>,
    /// IDが直後の記事（末尾ならNone）
    pub next: Option<ArticleLink>,
    /// 承認済みコメント（フラット、pidで階層を表す）
    pub comments: Vec<CommentView>,
    pub is_liked: bool,
    pub likers: Vec<SocialiteUser>,
}

/// 記事詳細の組み立て
#[derive(Clone)]
pub struct DetailAssembler {
    store: Arc<dyn ContentStore>,
    config: CoreConfig,
    cdn_base: String,
}

impl DetailAssembler {
    pub fn new(store: Arc<dyn ContentStore>, config: CoreConfig, cdn_base: impl Into<String>) -> Self {
        Self {
            store,
            config,
            cdn_base: cdn_base.into(),
        }
    }

    /// 記事詳細を組み立てる
    ///
    /// 呼ぶたびに閲覧数を1増やす（閲覧者ごとの重複排除はしない）。
    /// 前後の記事はカテゴリやタグに関係なくIDの隣接で決める。
    pub async fn detail(
        &self,
        article_id: i64,
        viewer: Option<&SocialiteUser>,
    ) -> DomainResult<ArticleDetail> {
        // 存在しない記事はここでNotFoundになる
        self.store.increment_visits(article_id).await?;

        let article = self
            .store
            .find_article(article_id)
            .await?
            .ok_or_else(|| DomainError::not_found("記事", article_id))?
            .rendered(&self.cdn_base);

        let use_slug = self.config.use_slug_urls;
        let prev = self
            .store
            .previous_article(article_id)
            .await?
            .map(|link| link.with_url(use_slug));
        let next = self
            .store
            .next_article(article_id)
            .await?
            .map(|link| link.with_url(use_slug));

        let category = self.store.find_category(article.category_id).await?;
        let tags = self
            .store
            .tags_for_articles(&[article_id])
            .await?
            .into_iter()
            .map(|t| t.tag)
            .collect();

        let comments = self.store.comments_for_article(article_id, true).await?;

        let is_liked = match viewer {
            Some(user) => self.store.has_liked(user.id, article_id).await?,
            None => false,
        };
        let likers = self.store.likers_of(article_id).await?;

        debug!(
            article_id,
            visits = article.visits,
            comments = comments.len(),
            "記事詳細を組み立てました"
        );

        Ok(ArticleDetail {
            url: article.url(use_slug),
            article,
            category,
            tags,
            prev,
            next,
            comments,
            is_liked,
            likers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::comment::{CommentInput, CommentService};
    use crate::infra::storage::memory::MemoryContentStore;

    async fn setup() -> (Arc<MemoryContentStore>, DetailAssembler) {
        let store = Arc::new(MemoryContentStore::new());
        let category = store.add_category("Rust").await;
        for title in ["一つ目", "二つ目", "三つ目"] {
            store.add_simple_article(category.id, title).await;
        }
        let assembler = DetailAssembler::new(store.clone(), CoreConfig::default(), "");
        (store, assembler)
    }

    mod domain {
        use super::*;

        #[tokio::test]
        async fn test_neighbours_by_id() -> Result<(), anyhow::Error> {
            let (_, assembler) = setup().await;

            let middle = assembler.detail(2, None).await?;
            let prev = middle.prev.expect("前の記事があるはず");
            let next = middle.next.expect("次の記事があるはず");
            assert!(prev.id < 2 && 2 < next.id);
            assert_eq!((prev.id, next.id), (1, 3));
            assert_eq!(prev.url, "/article/1");

            let first = assembler.detail(1, None).await?;
            assert!(first.prev.is_none(), "先頭に前の記事はない");
            let last = assembler.detail(3, None).await?;
            assert!(last.next.is_none(), "末尾に次の記事はない");

            println!("✅ 前後記事テスト成功");
            Ok(())
        }

        #[tokio::test]
        async fn test_visits_increment_every_call() -> Result<(), anyhow::Error> {
            let (store, assembler) = setup().await;

            assembler.detail(2, None).await?;
            let detail = assembler.detail(2, None).await?;
            assert_eq!(store.visits(2).await, Some(2), "2回呼んだら+2");
            assert_eq!(detail.article.visits, 2);
            assert_eq!(store.visits(1).await, Some(0));
            Ok(())
        }

        #[tokio::test]
        async fn test_unknown_article_is_not_found() -> Result<(), anyhow::Error> {
            let (_, assembler) = setup().await;
            let result = assembler.detail(404, None).await;
            assert!(matches!(result, Err(DomainError::NotFound { entity: "記事", id: 404 })));
            Ok(())
        }

        #[tokio::test]
        async fn test_rendered_fields() -> Result<(), anyhow::Error> {
            let store = Arc::new(MemoryContentStore::new());
            let category = store.add_category("Rust").await;
            let id = store
                .create_article(&crate::domain::article::NewArticle {
                    category_id: category.id,
                    title: "画像つき".to_string(),
                    markdown: "![図](/uploads/article/a.png)".to_string(),
                    description: "一行目\n二行目".to_string(),
                    ..Default::default()
                })
                .await?;
            let assembler = DetailAssembler::new(
                store,
                CoreConfig::default(),
                "https://cdn.example.com",
            );

            let detail = assembler.detail(id, None).await?;
            assert!(detail
                .article
                .html
                .contains(r#"<img src="https://cdn.example.com/uploads/article/a.png""#));
            assert_eq!(detail.article.description, "一行目二行目");
            assert_eq!(detail.category.map(|c| c.id), Some(category.id));
            Ok(())
        }
    }

    // いいね・コメント系テスト
    mod social {
        use super::*;

        #[tokio::test]
        async fn test_like_state_and_likers() -> Result<(), anyhow::Error> {
            let (store, assembler) = setup().await;
            let alice = store.add_identity("alice", None).await;
            let bob = store.add_identity("bob", None).await;
            store.add_like(alice.id, 2).await;

            let anonymous = assembler.detail(2, None).await?;
            assert!(!anonymous.is_liked, "未ログインは常にfalse");
            assert_eq!(anonymous.likers, vec![alice.clone()]);

            assert!(assembler.detail(2, Some(&alice)).await?.is_liked);
            assert!(!assembler.detail(2, Some(&bob)).await?.is_liked);
            assert!(!assembler.detail(1, Some(&alice)).await?.is_liked);
            Ok(())
        }

        #[tokio::test]
        async fn test_only_audited_comments_are_attached() -> Result<(), anyhow::Error> {
            let (store, assembler) = setup().await;
            let alice = store.add_identity("alice", None).await;

            let open = CommentService::new(store.clone(), CoreConfig::default());
            let parent = open
                .submit(
                    Some(&alice),
                    CommentInput {
                        article_id: 2,
                        content: "公開".to_string(),
                        ..Default::default()
                    },
                )
                .await?;
            open.submit(
                Some(&alice),
                CommentInput {
                    article_id: 2,
                    content: "返信".to_string(),
                    pid: Some(parent),
                    ..Default::default()
                },
            )
            .await?;

            let audited = CommentService::new(
                store.clone(),
                CoreConfig {
                    comment_audit_required: true,
                    ..Default::default()
                },
            );
            audited
                .submit(
                    Some(&alice),
                    CommentInput {
                        article_id: 2,
                        content: "承認待ち".to_string(),
                        ..Default::default()
                    },
                )
                .await?;

            let detail = assembler.detail(2, None).await?;
            assert_eq!(detail.comments.len(), 2);
            assert_eq!(detail.comments[1].pid, Some(parent));
            assert_eq!(detail.comments[0].user_name, "alice");
            assert!(detail.comments.iter().all(|c| c.content != "承認待ち"));
            Ok(())
        }
    }
}
