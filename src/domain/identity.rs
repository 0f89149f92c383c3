use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::sync::OnceLock;

// 外部ログイン（ソーシャルログイン）で作られた閲覧者
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct SocialiteUser {
    pub id: i64,
    pub name: String,
    pub avatar: String,
    pub email: Option<String>,
}

const EMAIL_PATTERN: &str = r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$";

fn email_regex() -> Option<&'static Regex> {
    static EMAIL_RE: OnceLock<Option<Regex>> = OnceLock::new();
    EMAIL_RE.get_or_init(|| Regex::new(EMAIL_PATTERN).ok()).as_ref()
}

/// メールアドレスの形式を検証する
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    if email.is_empty() || email.len() > 254 {
        return false;
    }
    email_regex().map(|re| re.is_match(email)).unwrap_or(false)
}
