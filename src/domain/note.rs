use crate::domain::store::ContentStore;
use crate::types::DomainResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// 随筆（関連を持たない短い投稿）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Note {
    pub id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// 随筆を新しい順で取得する
pub async fn list_notes(store: &dyn ContentStore) -> DomainResult<Vec<Note>> {
    store.list_notes().await
}
