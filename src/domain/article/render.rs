//! 記事の読み出し時変換
//!
//! DBには生のmarkdown/html/descriptionを保存し、表示用の値はここで組み立てる。

use pulldown_cmark::{html, Options, Parser};

/// アップロード画像のパス（CDN配信時に書き換える対象）
const UPLOAD_IMG_PREFIX: &str = "<img src=\"/uploads/article";

/// 説明文から改行を取り除く
pub fn render_description(raw: &str) -> String {
    raw.replace(['\r', '\n'], "")
}

/// 記事HTML中のアップロード画像をCDNのURLへ書き換える
///
/// `cdn_base` が空なら何もしない。末尾のスラッシュは無視する。
pub fn rewrite_asset_urls(html: &str, cdn_base: &str) -> String {
    let base = cdn_base.trim().trim_end_matches('/');
    if base.is_empty() {
        return html.to_string();
    }
    html.replace(
        UPLOAD_IMG_PREFIX,
        &format!("<img src=\"{}/uploads/article", base),
    )
}

/// markdownをHTMLに変換する
pub fn render_markdown(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let parser = Parser::new_ext(markdown, options);
    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

/// 記事URL（slug付きURLが有効ならslugを末尾に付ける）
pub fn article_url(id: i64, slug: &str, use_slug: bool) -> String {
    if use_slug && !slug.is_empty() {
        format!("/article/{}/{}", id, slug)
    } else {
        format!("/article/{}", id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_description_strips_newlines() {
        assert_eq!(render_description("a\r\nb\nc\rd"), "abcd");
        assert_eq!(render_description("改行なし"), "改行なし");
    }

    #[test]
    fn test_rewrite_asset_urls() {
        let html = r#"<p>x</p><img src="/uploads/article/1.png"><img src="https://other/a.png">"#;

        let rewritten = rewrite_asset_urls(html, "https://cdn.example.com/");
        assert!(rewritten.contains(r#"<img src="https://cdn.example.com/uploads/article/1.png">"#));
        assert!(rewritten.contains(r#"<img src="https://other/a.png">"#));

        // CDN未設定ならそのまま
        assert_eq!(rewrite_asset_urls(html, ""), html);
    }

    #[test]
    fn test_render_markdown() {
        let out = render_markdown("# 見出し\n\n本文 **強調**");
        assert!(out.contains("<h1>見出し</h1>"));
        assert!(out.contains("<strong>強調</strong>"));
    }

    #[test]
    fn test_article_url() {
        assert_eq!(article_url(3, "hello", false), "/article/3");
        assert_eq!(article_url(3, "hello", true), "/article/3/hello");
        assert_eq!(article_url(3, "", true), "/article/3");
    }
}
