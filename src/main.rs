use anyhow::{Context, Result};
use blogcore::app::{build_router, AppState};
use blogcore::infra::api::search_index::{HttpSearchIndex, SearchIndex};
use blogcore::infra::db::setup_database;
use blogcore::infra::storage::postgres::PgContentStore;
use blogcore::types::{SearchBackend, SiteConfig};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 環境変数を読み込み（.envファイルがあれば使用）
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("blogcore=info,tower_http=info")),
        )
        .init();

    let config = SiteConfig::from_env().context("サイト設定の読み込みに失敗")?;
    let pool = setup_database().await?;
    let store = Arc::new(PgContentStore::new(pool));

    let index: Option<Arc<dyn SearchIndex>> = match config.search.backend {
        SearchBackend::Indexed => {
            let client = HttpSearchIndex::new(
                &config.search.url,
                &config.search.index,
                Some(config.search.api_key.clone()),
                config.search.timeout_secs,
            );
            Some(Arc::new(client))
        }
        SearchBackend::None => None,
    };

    let state = AppState::new(store, index, &config);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("{} での待ち受けに失敗", config.bind_addr))?;
    info!(addr = %config.bind_addr, search = ?config.search.backend, "サーバーを起動しました");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("サーバーが異常終了しました")?;

    info!("サーバーを停止しました");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "シグナル待機に失敗しました");
    }
}
