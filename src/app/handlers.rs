use super::state::AppState;
use crate::domain::article::{ArticleSummary, Page};
use crate::domain::feed::latest_feed;
use crate::domain::identity::SocialiteUser;
use crate::domain::note::{list_notes, Note};
use crate::domain::{sanitize_query, ArticleDetail, ArticleFilter, CommentInput};
use crate::types::DomainError;
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::OnceLock;
use tracing::{error, info};

/// 外部の認証プロバイダが付与する閲覧者IDのヘッダ
pub const VIEWER_HEADER: &str = "x-socialite-user-id";

/// 検索結果ページを検索エンジンに載せないためのヘッダ
pub const ROBOTS_HEADER: &str = "x-robots-tag";

/// ドメインエラーをHTTPレスポンスに変換するラッパー
#[derive(Debug)]
pub struct ApiError(pub DomainError);

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            DomainError::NotFound { .. } => StatusCode::NOT_FOUND,
            DomainError::Unauthorized => StatusCode::UNAUTHORIZED,
            DomainError::InvalidInput { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            DomainError::Database { .. } => {
                error!(error = %self.0, "リクエスト処理中にエラーが発生しました");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub wd: Option<String>,
    pub page: Option<i64>,
}

/// ページの<head>に入る情報
#[derive(Debug, Serialize)]
pub struct Head {
    pub title: String,
    pub keywords: String,
    pub description: String,
}

#[derive(Debug, Serialize)]
pub struct ListingResponse {
    pub head: Head,
    pub tag_name: String,
    pub articles: Page<ArticleSummary>,
}

#[derive(Debug, Serialize)]
pub struct NotesResponse {
    pub notes: Vec<Note>,
}

/// ヘッダから閲覧者を解決する（不明なIDは未ログイン扱い）
async fn current_viewer(state: &AppState, headers: &HeaderMap) -> ApiResult<Option<SocialiteUser>> {
    let id = headers
        .get(VIEWER_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<i64>().ok());

    match id {
        Some(id) => Ok(state.store.find_identity(id).await?),
        None => Ok(None),
    }
}

fn robot_regex() -> Option<&'static Regex> {
    static ROBOT_RE: OnceLock<Option<Regex>> = OnceLock::new();
    ROBOT_RE
        .get_or_init(|| Regex::new(r"(?i)bot|spider|crawl|slurp|bingpreview").ok())
        .as_ref()
}

/// User-Agentがクローラーらしいかどうか
pub fn is_robot(headers: &HeaderMap) -> bool {
    let ua = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    robot_regex().map(|re| re.is_match(ua)).unwrap_or(false)
}

/// GET / トップページの記事一覧
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<ListingResponse>> {
    let articles = state
        .listing
        .list(&ArticleFilter::All, query.page.unwrap_or(1))
        .await?;
    Ok(Json(ListingResponse {
        head: Head {
            title: state.site.name.clone(),
            keywords: String::new(),
            description: state.site.description.clone(),
        },
        tag_name: String::new(),
        articles,
    }))
}

/// GET /category/:id カテゴリの記事一覧
pub async fn category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<ListingResponse>> {
    let (category, articles) = state
        .listing
        .list_category(id, query.page.unwrap_or(1))
        .await?;
    Ok(Json(ListingResponse {
        head: Head {
            title: category.name,
            keywords: category.keywords,
            description: category.description,
        },
        tag_name: String::new(),
        articles,
    }))
}

/// GET /tag/:id タグの記事一覧
pub async fn tag(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<ListingResponse>> {
    let (tag, articles) = state
        .listing
        .list_tag(id, query.page.unwrap_or(1))
        .await?;
    Ok(Json(ListingResponse {
        head: Head {
            title: tag.name.clone(),
            keywords: tag.keywords,
            description: tag.description,
        },
        tag_name: tag.name,
        articles,
    }))
}

/// GET /search?wd= 検索結果一覧（検索エンジンには載せない）
pub async fn search(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Response> {
    if is_robot(&headers) {
        return Ok((StatusCode::NOT_FOUND, [(ROBOTS_HEADER, "noindex")]).into_response());
    }

    let wd = sanitize_query(query.wd.as_deref().unwrap_or(""));
    let ids = state.search.resolve_sanitized(&wd).await?.into_ids();
    let articles = state
        .listing
        .list(&ArticleFilter::Ids(ids), query.page.unwrap_or(1))
        .await?;
    info!(query = %wd, total = articles.total, "検索しました");

    let body = ListingResponse {
        head: Head {
            title: wd,
            keywords: String::new(),
            description: String::new(),
        },
        tag_name: String::new(),
        articles,
    };
    Ok(([(ROBOTS_HEADER, "noindex")], Json(body)).into_response())
}

/// GET /article/:id 記事詳細
pub async fn article(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> ApiResult<Json<ArticleDetail>> {
    let viewer = current_viewer(&state, &headers).await?;
    let detail = state.detail.detail(id, viewer.as_ref()).await?;
    Ok(Json(detail))
}

/// GET /article/:id/:slug slug付きURLの記事詳細（slugは表示用で照合しない）
pub async fn article_with_slug(
    State(state): State<AppState>,
    Path((id, _slug)): Path<(i64, String)>,
    headers: HeaderMap,
) -> ApiResult<Json<ArticleDetail>> {
    let viewer = current_viewer(&state, &headers).await?;
    let detail = state.detail.detail(id, viewer.as_ref()).await?;
    Ok(Json(detail))
}

/// GET /note 随筆一覧
pub async fn note(State(state): State<AppState>) -> ApiResult<Json<NotesResponse>> {
    let notes = list_notes(state.store.as_ref()).await?;
    Ok(Json(NotesResponse { notes }))
}

/// GET /feed Atomフィード
pub async fn feed(State(state): State<AppState>) -> ApiResult<Response> {
    let xml = latest_feed(state.store.as_ref(), &state.site).await?;
    Ok((
        [(header::CONTENT_TYPE, "application/atom+xml; charset=utf-8")],
        xml,
    )
        .into_response())
}

/// POST /comment コメント投稿（ログイン必須）
pub async fn comment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<CommentInput>,
) -> ApiResult<Json<serde_json::Value>> {
    let viewer = current_viewer(&state, &headers).await?;
    let id = state.comments.submit(viewer.as_ref(), input).await?;
    Ok(Json(json!({ "id": id })))
}

/// GET /check-login ログイン状態（1: ログイン済み, 0: 未ログイン）
pub async fn check_login(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<serde_json::Value>> {
    let viewer = current_viewer(&state, &headers).await?;
    Ok(Json(json!({ "status": i32::from(viewer.is_some()) })))
}
