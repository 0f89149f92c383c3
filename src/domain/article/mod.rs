pub mod model;
pub mod render;

// 公開APIの再エクスポート

// model.rsから
pub use model::{
    normalize_page, Article, ArticleLink, ArticleSummary, ArticleSummaryRow, ArticleTag, Category,
    NewArticle, Page, Tag, PAGE_SIZE,
};

// render.rsから
pub use render::{article_url, render_description, render_markdown, rewrite_asset_urls};
