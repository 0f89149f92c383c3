use crate::domain::article::{normalize_page, ArticleSummary, Category, Page, Tag, PAGE_SIZE};
use crate::domain::store::{ArticleFilter, ContentStore};
use crate::types::{CoreConfig, DomainError, DomainResult};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// 記事一覧の組み立て
///
/// 絞り込み（なし・カテゴリ・タグ・ID集合）ごとに作成日時の降順で1ページ分の
/// 要約を作り、カテゴリとタグを付ける。読み取り専用。
#[derive(Clone)]
pub struct ListingAssembler {
    store: Arc<dyn ContentStore>,
    config: CoreConfig,
}

impl ListingAssembler {
    pub fn new(store: Arc<dyn ContentStore>, config: CoreConfig) -> Self {
        Self { store, config }
    }

    /// 一覧を1ページ分取得する
    ///
    /// - ページは1始まり。範囲外のページは空の結果になる
    /// - 存在しないカテゴリ・タグはNotFound
    /// - ID集合（検索結果）の場合はタグを付けない
    pub async fn list(&self, filter: &ArticleFilter, page: i64) -> DomainResult<Page<ArticleSummary>> {
        match filter {
            ArticleFilter::Category(id) => Ok(self.list_category(*id, page).await?.1),
            ArticleFilter::Tag(id) => Ok(self.list_tag(*id, page).await?.1),
            _ => self.assemble(filter, page, None).await,
        }
    }

    /// カテゴリ一覧（見出し用にカテゴリも返す）
    pub async fn list_category(
        &self,
        category_id: i64,
        page: i64,
    ) -> DomainResult<(Category, Page<ArticleSummary>)> {
        let category = self
            .store
            .find_category(category_id)
            .await?
            .ok_or_else(|| DomainError::not_found("カテゴリ", category_id))?;
        // カテゴリ一覧はカテゴリ自体を全要約に付ける
        let items = self
            .assemble(&ArticleFilter::Category(category_id), page, Some(category.clone()))
            .await?;
        Ok((category, items))
    }

    /// タグ一覧（見出し用にタグも返す）
    pub async fn list_tag(&self, tag_id: i64, page: i64) -> DomainResult<(Tag, Page<ArticleSummary>)> {
        let tag = self
            .store
            .find_tag(tag_id)
            .await?
            .ok_or_else(|| DomainError::not_found("タグ", tag_id))?;
        let items = self.assemble(&ArticleFilter::Tag(tag_id), page, None).await?;
        Ok((tag, items))
    }

    async fn assemble(
        &self,
        filter: &ArticleFilter,
        page: i64,
        scoped_category: Option<Category>,
    ) -> DomainResult<Page<ArticleSummary>> {
        let (page, offset) = normalize_page(page);
        if matches!(filter, ArticleFilter::Ids(ids) if ids.is_empty()) {
            return Ok(Page::empty(page, PAGE_SIZE, 0));
        }

        let (rows, total) = self.store.page_summaries(filter, PAGE_SIZE, offset).await?;
        debug!(?filter, page, total, rows = rows.len(), "記事一覧を取得しました");
        if rows.is_empty() {
            return Ok(Page::empty(page, PAGE_SIZE, total));
        }

        let use_slug = self.config.use_slug_urls;
        let mut items: Vec<ArticleSummary> = rows
            .into_iter()
            .map(|row| ArticleSummary::from_row(row, use_slug))
            .collect();

        self.attach_categories(&mut items, scoped_category).await?;
        if !matches!(filter, ArticleFilter::Ids(_)) {
            self.attach_tags(&mut items).await?;
        }

        Ok(Page {
            items,
            page,
            per_page: PAGE_SIZE,
            total,
        })
    }

    async fn attach_categories(
        &self,
        items: &mut [ArticleSummary],
        scoped: Option<Category>,
    ) -> DomainResult<()> {
        if let Some(category) = scoped {
            for item in items.iter_mut() {
                item.category = Some(category.clone());
            }
            return Ok(());
        }

        let mut ids: Vec<i64> = items.iter().map(|i| i.category_id).collect();
        ids.sort_unstable();
        ids.dedup();
        let categories: HashMap<i64, Category> = self
            .store
            .categories_by_ids(&ids)
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();

        for item in items.iter_mut() {
            item.category = categories.get(&item.category_id).cloned();
        }
        Ok(())
    }

    async fn attach_tags(&self, items: &mut [ArticleSummary]) -> DomainResult<()> {
        let ids: Vec<i64> = items.iter().map(|i| i.id).collect();
        let mut by_article: HashMap<i64, Vec<_>> = HashMap::new();
        for article_tag in self.store.tags_for_articles(&ids).await? {
            by_article
                .entry(article_tag.article_id)
                .or_default()
                .push(article_tag.tag);
        }

        for item in items.iter_mut() {
            item.tags = by_article.remove(&item.id).unwrap_or_default();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::article::NewArticle;
    use crate::infra::storage::memory::MemoryContentStore;
    use chrono::Duration;

    async fn assembler_with(store: Arc<MemoryContentStore>, use_slug: bool) -> ListingAssembler {
        let config = CoreConfig {
            use_slug_urls: use_slug,
            ..Default::default()
        };
        ListingAssembler::new(store, config)
    }

    // ページネーション系テスト
    mod pagination {
        use super::*;

        async fn store_with_articles(count: usize) -> Arc<MemoryContentStore> {
            let store = Arc::new(MemoryContentStore::new());
            let category = store.add_category("Rust").await;
            for i in 1..=count {
                store.add_simple_article(category.id, &format!("記事{}", i)).await;
            }
            store
        }

        #[tokio::test]
        async fn test_pages_hold_at_most_ten() -> Result<(), anyhow::Error> {
            let store = store_with_articles(23).await;
            let listing = assembler_with(store, false).await;

            let first = listing.list(&ArticleFilter::All, 1).await?;
            assert_eq!(first.items.len(), 10);
            assert_eq!(first.total, 23);
            assert_eq!(first.last_page(), 3);
            assert_eq!(first.items[0].id, 23, "新しい記事が先頭");

            let third = listing.list(&ArticleFilter::All, 3).await?;
            assert_eq!(third.items.len(), 3);
            assert_eq!(third.items.last().map(|i| i.id), Some(1));

            let beyond = listing.list(&ArticleFilter::All, 4).await?;
            assert!(beyond.items.is_empty(), "範囲外のページは空");
            assert_eq!(beyond.total, 23);

            println!("✅ ページネーションテスト成功");
            Ok(())
        }

        #[tokio::test]
        async fn test_page_zero_is_first_page() -> Result<(), anyhow::Error> {
            let store = store_with_articles(3).await;
            let listing = assembler_with(store, false).await;

            let page = listing.list(&ArticleFilter::All, 0).await?;
            assert_eq!(page.page, 1);
            assert_eq!(page.items.len(), 3);
            Ok(())
        }
    }

    // 絞り込み系テスト
    mod filter {
        use super::*;

        #[tokio::test]
        async fn test_category_listing_attaches_category() -> Result<(), anyhow::Error> {
            let store = Arc::new(MemoryContentStore::new());
            let rust = store.add_category("Rust").await;
            let life = store.add_category("Life").await;
            store.add_simple_article(rust.id, "所有権").await;
            store.add_simple_article(life.id, "散歩").await;
            store.add_simple_article(rust.id, "ライフタイム").await;
            let listing = assembler_with(store, false).await;

            let page = listing.list(&ArticleFilter::Category(rust.id), 1).await?;
            assert_eq!(page.items.len(), 2);
            assert!(page
                .items
                .iter()
                .all(|item| item.category.as_ref() == Some(&rust) && item.category_id == rust.id));

            let missing = listing.list(&ArticleFilter::Category(99), 1).await;
            assert!(matches!(missing, Err(DomainError::NotFound { entity: "カテゴリ", .. })));
            Ok(())
        }

        #[tokio::test]
        async fn test_tag_listing_returns_tagged_articles() -> Result<(), anyhow::Error> {
            let store = Arc::new(MemoryContentStore::new());
            let category = store.add_category("Rust").await;
            let tag = store.add_tag("async").await;
            for title in ["1", "2", "3"] {
                store.add_simple_article(category.id, title).await;
            }
            store.attach_tag(1, tag.id).await;
            store.attach_tag(3, tag.id).await;
            let listing = assembler_with(store, false).await;

            let page = listing.list(&ArticleFilter::Tag(tag.id), 1).await?;
            let ids: Vec<i64> = page.items.iter().map(|i| i.id).collect();
            assert_eq!(ids, vec![3, 1], "作成日時の降順で3,1");
            assert!(page.items.iter().all(|i| i.tags.contains(&tag)));
            assert!(page.items.iter().all(|i| i.category.is_some()));

            let missing = listing.list(&ArticleFilter::Tag(42), 1).await;
            assert!(matches!(missing, Err(DomainError::NotFound { entity: "タグ", .. })));
            Ok(())
        }

        #[tokio::test]
        async fn test_scoped_listings_return_heading_entity() -> Result<(), anyhow::Error> {
            let store = Arc::new(MemoryContentStore::new());
            let rust = store.add_category("Rust").await;
            let tag = store.add_tag("async").await;
            store.add_simple_article(rust.id, "所有権").await;
            store.attach_tag(1, tag.id).await;
            let listing = assembler_with(store, false).await;

            let (category, page) = listing.list_category(rust.id, 1).await?;
            assert_eq!(category, rust);
            assert_eq!(page.items.len(), 1);

            // 範囲外のページでも見出し用のカテゴリは返る
            let (category, page) = listing.list_category(rust.id, 9).await?;
            assert_eq!(category.name, "Rust");
            assert!(page.items.is_empty());

            let (found, page) = listing.list_tag(tag.id, 1).await?;
            assert_eq!(found, tag);
            assert_eq!(page.items[0].tags, vec![tag.clone()]);

            assert!(matches!(
                listing.list_tag(99, 1).await,
                Err(DomainError::NotFound { entity: "タグ", id: 99 })
            ));
            Ok(())
        }

        #[tokio::test]
        async fn test_id_set_listing_has_no_tags() -> Result<(), anyhow::Error> {
            let store = Arc::new(MemoryContentStore::new());
            let category = store.add_category("Rust").await;
            let tag = store.add_tag("async").await;
            for title in ["1", "2", "3"] {
                store.add_simple_article(category.id, title).await;
            }
            store.attach_tag(2, tag.id).await;
            let listing = assembler_with(store, false).await;

            let page = listing.list(&ArticleFilter::Ids(vec![1, 2]), 1).await?;
            assert_eq!(page.items.iter().map(|i| i.id).collect::<Vec<_>>(), vec![2, 1]);
            assert!(page.items.iter().all(|i| i.tags.is_empty()));
            assert!(page.items.iter().all(|i| i.category.is_some()));

            let empty = listing.list(&ArticleFilter::Ids(vec![]), 1).await?;
            assert!(empty.items.is_empty());
            assert_eq!(empty.total, 0);
            Ok(())
        }

        #[tokio::test]
        async fn test_ordering_follows_created_at_not_id() -> Result<(), anyhow::Error> {
            let store = Arc::new(MemoryContentStore::new());
            let category = store.add_category("Rust").await;
            let base = MemoryContentStore::base_time();
            // IDが小さいほうを新しくする
            for (title, hours) in [("新しい", 10), ("古い", 1)] {
                store
                    .create_article(&NewArticle {
                        category_id: category.id,
                        title: title.to_string(),
                        created_at: Some(base + Duration::hours(hours)),
                        ..Default::default()
                    })
                    .await?;
            }
            let listing = assembler_with(store, false).await;

            let page = listing.list(&ArticleFilter::All, 1).await?;
            assert_eq!(page.items[0].title, "新しい");
            assert_eq!(page.items[1].title, "古い");
            Ok(())
        }
    }

    // 表示形式系テスト
    mod shape {
        use super::*;

        #[tokio::test]
        async fn test_slug_only_when_enabled() -> Result<(), anyhow::Error> {
            let store = Arc::new(MemoryContentStore::new());
            let category = store.add_category("Rust").await;
            store.add_simple_article(category.id, "記事").await;

            let without = assembler_with(store.clone(), false).await;
            let page = without.list(&ArticleFilter::All, 1).await?;
            assert_eq!(page.items[0].slug, None);
            assert_eq!(page.items[0].url, "/article/1");

            let with = assembler_with(store, true).await;
            let page = with.list(&ArticleFilter::All, 1).await?;
            assert_eq!(page.items[0].slug.as_deref(), Some("article-1"));
            assert_eq!(page.items[0].url, "/article/1/article-1");
            Ok(())
        }
    }
}
