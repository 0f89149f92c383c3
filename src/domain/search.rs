//! 記事検索
//!
//! 全文検索インデックスが設定されていればそれを1回だけ試し、失敗したら
//! タイトル・説明文・markdownの部分一致検索に降格する。呼び出し側に
//! インデックスのエラーは見せない。

use crate::domain::store::ContentStore;
use crate::infra::api::search_index::SearchIndex;
use crate::types::{CoreConfig, DomainResult, SearchBackend};
use regex::Regex;
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

/// どの経路で検索したかを含む検索結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// インデックスが応答した
    Indexed(Vec<i64>),
    /// 部分一致検索で求めた（インデックス失敗・未設定・空クエリ）
    Fallback(Vec<i64>),
}

impl SearchOutcome {
    pub fn into_ids(self) -> Vec<i64> {
        match self {
            Self::Indexed(ids) | Self::Fallback(ids) => ids,
        }
    }
}

fn block_regex() -> Option<&'static Regex> {
    static BLOCK_RE: OnceLock<Option<Regex>> = OnceLock::new();
    BLOCK_RE
        .get_or_init(|| {
            Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>|<style\b[^>]*>.*?</style\s*>").ok()
        })
        .as_ref()
}

fn tag_regex() -> Option<&'static Regex> {
    static TAG_RE: OnceLock<Option<Regex>> = OnceLock::new();
    TAG_RE.get_or_init(|| Regex::new(r"(?s)<[^>]*>").ok()).as_ref()
}

/// 検索語からscript/styleブロックとタグを取り除く
///
/// 検索結果ページに検索語がそのまま埋め込まれるため、マークアップは残さない。
pub fn sanitize_query(raw: &str) -> String {
    let mut cleaned = raw.to_string();
    if let Some(re) = block_regex() {
        cleaned = re.replace_all(&cleaned, "").into_owned();
    }
    if let Some(re) = tag_regex() {
        cleaned = re.replace_all(&cleaned, "").into_owned();
    }
    cleaned.retain(|c| c != '<' && c != '>');
    cleaned.trim().to_string()
}

/// 検索語から記事IDの集合を求める
#[derive(Clone)]
pub struct SearchResolver {
    store: Arc<dyn ContentStore>,
    index: Option<Arc<dyn SearchIndex>>,
    config: CoreConfig,
}

impl SearchResolver {
    pub fn new(
        store: Arc<dyn ContentStore>,
        index: Option<Arc<dyn SearchIndex>>,
        config: CoreConfig,
    ) -> Self {
        Self {
            store,
            index,
            config,
        }
    }

    /// 検索して記事IDを返す
    pub async fn resolve(&self, query: &str) -> DomainResult<Vec<i64>> {
        Ok(self.resolve_outcome(query).await?.into_ids())
    }

    /// 検索して、どの経路を通ったかも含めて返す
    ///
    /// 空の検索語はインデックスに送らず部分一致ですべての記事に一致させる。
    pub async fn resolve_outcome(&self, query: &str) -> DomainResult<SearchOutcome> {
        self.resolve_sanitized(&sanitize_query(query)).await
    }

    /// `sanitize_query` 済みの検索語で検索する
    pub async fn resolve_sanitized(&self, term: &str) -> DomainResult<SearchOutcome> {
        let index = match (self.config.search_backend, &self.index) {
            (SearchBackend::Indexed, Some(index)) if !term.is_empty() => index,
            (SearchBackend::Indexed, None) => {
                warn!("検索バックエンドがindexedですがインデックスが未設定のため部分一致で検索します");
                return Ok(SearchOutcome::Fallback(self.substring(term).await?));
            }
            _ => return Ok(SearchOutcome::Fallback(self.substring(term).await?)),
        };

        match index.search_ids(term).await {
            Ok(hits) => {
                // インデックスに残った削除済み記事を除く
                let ids = if hits.is_empty() {
                    hits
                } else {
                    self.store.existing_article_ids(&hits).await?
                };
                debug!(query = %term, hits = ids.len(), "全文検索で検索しました");
                Ok(SearchOutcome::Indexed(ids))
            }
            Err(e) => {
                warn!(query = %term, error = %format!("{:#}", e), "全文検索に失敗したため部分一致検索に降格します");
                Ok(SearchOutcome::Fallback(self.substring(term).await?))
            }
        }
    }

    async fn substring(&self, term: &str) -> DomainResult<Vec<i64>> {
        let ids = self.store.match_article_ids(term).await?;
        debug!(query = %term, hits = ids.len(), "部分一致で検索しました");
        Ok(ids)
    }
}
