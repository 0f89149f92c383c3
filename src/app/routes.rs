use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// 公開ルートをすべて登録したルーターを作る
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/category/:id", get(handlers::category))
        .route("/tag/:id", get(handlers::tag))
        .route("/search", get(handlers::search))
        .route("/article/:id", get(handlers::article))
        .route("/article/:id/:slug", get(handlers::article_with_slug))
        .route("/note", get(handlers::note))
        .route("/feed", get(handlers::feed))
        .route("/comment", post(handlers::comment))
        .route("/check-login", get(handlers::check_login))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
