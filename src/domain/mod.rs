//! ドメイン層
//!
//! - article: 記事・カテゴリ・タグのモデルと読み出し時変換
//! - store: コンテンツストアのトレイトと絞り込み条件
//! - search / listing / detail: 検索・一覧・詳細の組み立て
//! - comment / identity / note / feed: コメント投稿、閲覧者、随筆、Atomフィード

pub mod article;
pub mod comment;
pub mod detail;
pub mod feed;
pub mod identity;
pub mod listing;
pub mod note;
pub mod search;
pub mod store;

// 便利な再エクスポート
pub use comment::{CommentInput, CommentService};
pub use detail::{ArticleDetail, DetailAssembler};
pub use listing::ListingAssembler;
pub use search::{sanitize_query, SearchOutcome, SearchResolver};
pub use store::{ArticleFilter, ContentStore};
