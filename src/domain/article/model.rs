use super::render::{article_url, render_description, rewrite_asset_urls};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 一覧の1ページあたりの件数
pub const PAGE_SIZE: i64 = 10;

// 記事エンティティ（articlesテーブルと一致）
// html と description は保存時の生の値。読み出し時は rendered() を通す
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Article {
    pub id: i64,
    pub category_id: i64,
    pub title: String,
    pub slug: String,
    pub author: String,
    pub markdown: String,
    pub html: String,
    pub description: String,
    pub keywords: String,
    pub cover: String,
    pub is_top: bool,
    pub visits: i64,
    pub created_at: DateTime<Utc>,
}

impl Article {
    /// 読み出し時の変換（画像URLの書き換えと説明文の改行除去）を適用する
    pub fn rendered(mut self, cdn_base: &str) -> Self {
        self.html = rewrite_asset_urls(&self.html, cdn_base);
        self.description = render_description(&self.description);
        self
    }

    /// 記事のURLを組み立てる
    pub fn url(&self, use_slug: bool) -> String {
        article_url(self.id, &self.slug, use_slug)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub keywords: String,
    pub description: String,
    pub seo_title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub keywords: String,
    pub description: String,
}

// 記事とタグの対応（一覧にタグを付けるためのJOIN結果）
#[derive(Debug, Clone, FromRow)]
pub struct ArticleTag {
    pub article_id: i64,
    #[sqlx(flatten)]
    pub tag: Tag,
}

// 一覧用の軽量な行（本文を除外）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ArticleSummaryRow {
    pub id: i64,
    pub category_id: i64,
    pub title: String,
    pub slug: String,
    pub author: String,
    pub description: String,
    pub cover: String,
    pub is_top: bool,
    pub created_at: DateTime<Utc>,
}

/// 一覧に表示する記事の要約
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArticleSummary {
    pub id: i64,
    pub category_id: i64,
    pub category: Option<Category>,
    pub title: String,
    /// slug付きURLが有効な場合のみ
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    pub author: String,
    pub description: String,
    pub cover: String,
    pub is_top: bool,
    pub created_at: DateTime<Utc>,
    pub url: String,
    pub tags: Vec<Tag>,
}

impl ArticleSummary {
    pub fn from_row(row: ArticleSummaryRow, use_slug: bool) -> Self {
        let url = article_url(row.id, &row.slug, use_slug);
        Self {
            id: row.id,
            category_id: row.category_id,
            category: None,
            title: row.title,
            slug: use_slug.then_some(row.slug),
            author: row.author,
            description: render_description(&row.description),
            cover: row.cover,
            is_top: row.is_top,
            created_at: row.created_at,
            url,
            tags: Vec::new(),
        }
    }
}

// 前後の記事へのリンク
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ArticleLink {
    pub id: i64,
    pub title: String,
    pub slug: String,
    #[sqlx(skip)]
    pub url: String,
}

impl ArticleLink {
    pub fn with_url(mut self, use_slug: bool) -> Self {
        self.url = article_url(self.id, &self.slug, use_slug);
        self
    }
}

/// 新規記事の入力値（htmlはmarkdownから生成する）
#[derive(Debug, Clone, Default)]
pub struct NewArticle {
    pub category_id: i64,
    pub title: String,
    pub slug: String,
    pub author: String,
    pub markdown: String,
    pub description: String,
    pub keywords: String,
    pub cover: String,
    pub is_top: bool,
    pub tag_ids: Vec<i64>,
    /// 未指定なら現在時刻
    pub created_at: Option<DateTime<Utc>>,
}

/// ページネーション結果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
}

impl<T> Page<T> {
    pub fn empty(page: i64, per_page: i64, total: i64) -> Self {
        Self {
            items: Vec::new(),
            page,
            per_page,
            total,
        }
    }

    /// 最終ページ番号（0件でも1を返す）
    pub fn last_page(&self) -> i64 {
        if self.total <= 0 || self.per_page <= 0 {
            return 1;
        }
        (self.total + self.per_page - 1) / self.per_page
    }
}

/// 1始まりのページ番号をOFFSETに変換する（0以下は1ページ目として扱う）
pub fn normalize_page(page: i64) -> (i64, i64) {
    let page = page.max(1);
    (page, (page - 1).saturating_mul(PAGE_SIZE))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row() -> ArticleSummaryRow {
        ArticleSummaryRow {
            id: 7,
            category_id: 1,
            title: "テスト記事".to_string(),
            slug: "test-article".to_string(),
            author: "admin".to_string(),
            description: "一行目\r\n二行目".to_string(),
            cover: String::new(),
            is_top: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_summary_from_row_without_slug() {
        let summary = ArticleSummary::from_row(sample_row(), false);
        assert_eq!(summary.slug, None);
        assert_eq!(summary.url, "/article/7");
        assert_eq!(summary.description, "一行目二行目");
        assert!(summary.tags.is_empty());
    }

    #[test]
    fn test_summary_from_row_with_slug() {
        let summary = ArticleSummary::from_row(sample_row(), true);
        assert_eq!(summary.slug.as_deref(), Some("test-article"));
        assert_eq!(summary.url, "/article/7/test-article");

        // slugを使わない場合はJSONにslugキー自体が出ない
        let json = serde_json::to_value(ArticleSummary::from_row(sample_row(), false))
            .expect("シリアライズに失敗");
        assert!(json.get("slug").is_none());
    }

    #[test]
    fn test_page_math() {
        let page: Page<i64> = Page::empty(3, PAGE_SIZE, 23);
        assert_eq!(page.last_page(), 3);

        let page: Page<i64> = Page::empty(1, PAGE_SIZE, 0);
        assert_eq!(page.last_page(), 1);

        assert_eq!(normalize_page(0), (1, 0));
        assert_eq!(normalize_page(-5), (1, 0));
        assert_eq!(normalize_page(3), (3, 20));
    }
}
