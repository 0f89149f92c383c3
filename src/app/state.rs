use crate::domain::{CommentService, ContentStore, DetailAssembler, ListingAssembler, SearchResolver};
use crate::infra::api::search_index::SearchIndex;
use crate::types::{SiteConfig, SiteInfo};
use std::sync::Arc;

/// ハンドラ間で共有する状態
///
/// 各コンポーネントには生成時に同じストアと設定を渡す。
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ContentStore>,
    pub site: Arc<SiteInfo>,
    pub listing: ListingAssembler,
    pub detail: DetailAssembler,
    pub search: SearchResolver,
    pub comments: CommentService,
}

impl AppState {
    pub fn new(
        store: Arc<dyn ContentStore>,
        index: Option<Arc<dyn SearchIndex>>,
        config: &SiteConfig,
    ) -> Self {
        let core = config.core();
        Self {
            listing: ListingAssembler::new(store.clone(), core),
            detail: DetailAssembler::new(store.clone(), core, config.site.cdn_base.clone()),
            search: SearchResolver::new(store.clone(), index, core),
            comments: CommentService::new(store.clone(), core),
            site: Arc::new(config.site.clone()),
            store,
        }
    }
}
