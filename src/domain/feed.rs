use crate::domain::article::{render_description, Article};
use crate::domain::store::ContentStore;
use crate::types::{DomainResult, SiteInfo};
use chrono::{SecondsFormat, Utc};

/// フィードに載せる記事数
pub const FEED_LIMIT: i64 = 20;

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// 記事一覧からAtomフィードを組み立てる（記事は新しい順で渡す）
pub fn build_atom_feed(site: &SiteInfo, articles: &[Article]) -> String {
    let base = site.base_url.trim_end_matches('/');
    let updated = articles
        .iter()
        .map(|a| a.created_at)
        .max()
        .unwrap_or_else(Utc::now)
        .to_rfc3339_opts(SecondsFormat::Secs, true);

    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str("<feed xmlns=\"http://www.w3.org/2005/Atom\">\n");
    xml.push_str(&format!("  <title>{}</title>\n", xml_escape(&site.name)));
    if !site.description.is_empty() {
        xml.push_str(&format!(
            "  <subtitle>{}</subtitle>\n",
            xml_escape(&site.description)
        ));
    }
    xml.push_str(&format!(
        "  <link rel=\"self\" href=\"{}/feed\"/>\n",
        xml_escape(base)
    ));
    xml.push_str(&format!("  <link href=\"{}/\"/>\n", xml_escape(base)));
    xml.push_str(&format!("  <id>{}/</id>\n", xml_escape(base)));
    xml.push_str(&format!("  <updated>{}</updated>\n", updated));

    for article in articles {
        let link = format!("{}/article/{}", base, article.id);
        let published = article
            .created_at
            .to_rfc3339_opts(SecondsFormat::Secs, true);
        xml.push_str("  <entry>\n");
        xml.push_str(&format!("    <title>{}</title>\n", xml_escape(&article.title)));
        xml.push_str(&format!(
            "    <author><name>{}</name></author>\n",
            xml_escape(&article.author)
        ));
        xml.push_str(&format!("    <link href=\"{}\"/>\n", xml_escape(&link)));
        xml.push_str(&format!("    <id>{}</id>\n", xml_escape(&link)));
        xml.push_str(&format!("    <published>{}</published>\n", published));
        xml.push_str(&format!("    <updated>{}</updated>\n", published));
        xml.push_str(&format!(
            "    <summary>{}</summary>\n",
            xml_escape(&render_description(&article.description))
        ));
        xml.push_str("  </entry>\n");
    }

    xml.push_str("</feed>\n");
    xml
}

/// 最新記事のAtomフィードを生成する
pub async fn latest_feed(store: &dyn ContentStore, site: &SiteInfo) -> DomainResult<String> {
    let articles = store.recent_articles(FEED_LIMIT).await?;
    Ok(build_atom_feed(site, &articles))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::storage::memory::MemoryContentStore;

    fn site() -> SiteInfo {
        SiteInfo {
            name: "テスト & ブログ".to_string(),
            description: "説明".to_string(),
            base_url: "https://blog.example.com/".to_string(),
            cdn_base: String::new(),
        }
    }

    #[tokio::test]
    async fn test_feed_lists_newest_first() -> Result<(), anyhow::Error> {
        let store = MemoryContentStore::new();
        let category = store.add_category("Rust").await;
        store.add_simple_article(category.id, "古い記事").await;
        store.add_simple_article(category.id, "<新しい>記事").await;

        let xml = latest_feed(&store, &site()).await?;

        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("<title>テスト &amp; ブログ</title>"));
        assert!(xml.contains("<link rel=\"self\" href=\"https://blog.example.com/feed\"/>"));
        assert!(xml.contains("<link href=\"https://blog.example.com/article/2\"/>"));
        assert!(xml.contains("<title>&lt;新しい&gt;記事</title>"));
        assert!(xml.contains("<name>admin</name>"));
        assert!(xml.contains("<published>2025-01-01T02:00:00Z</published>"));

        let newer = xml.find("article/2").expect("記事2がない");
        let older = xml.find("article/1\"").expect("記事1がない");
        assert!(newer < older, "新しい記事が先");
        assert_eq!(xml.matches("<entry>").count(), 2);

        println!("✅ Atomフィード生成テスト成功");
        Ok(())
    }

    #[test]
    fn test_empty_feed_is_valid() {
        let xml = build_atom_feed(&site(), &[]);
        assert!(xml.contains("<updated>"));
        assert!(!xml.contains("<entry>"));
        assert!(xml.trim_end().ends_with("</feed>"));
    }
}
