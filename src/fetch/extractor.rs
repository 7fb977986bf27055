use dom_smoothie::{Config, Readability};
use scraper::{Html, Selector};
use tracing::warn;

pub(super) struct ExtractedArticle {
    pub title: Option<String>,
    pub text: String,
    /// True when readability rejected the page and paragraphs were taken from the raw HTML.
    pub used_raw_fallback: bool,
}

pub(super) fn extract_article(html: &str, url: Option<&str>) -> ExtractedArticle {
    let mut readability = match Readability::new(html, url, Some(Config::default())) {
        Ok(r) => r,
        Err(e) => {
            warn!(%e, "readability init failed, using raw fallback");
            return raw_fallback(html, None);
        }
    };

    let readable = readability.is_probably_readable();

    match readability.parse() {
        Ok(article) => {
            let title = non_empty(article.title.to_string());
            if !readable {
                return raw_fallback(html, title);
            }

            let mut text = paragraphs(&article.content);
            if text.is_empty() {
                text = normalize_block(&article.text_content);
            }
            ExtractedArticle {
                title,
                text,
                used_raw_fallback: false,
            }
        }
        Err(e) => {
            warn!(%e, "readability parse failed, using raw fallback");
            raw_fallback(html, None)
        }
    }
}

fn raw_fallback(html: &str, title: Option<String>) -> ExtractedArticle {
    ExtractedArticle {
        title: title.or_else(|| extract_title_from_html(html)),
        text: paragraphs(html),
        used_raw_fallback: true,
    }
}

/// Text of every `<p>`, whitespace-collapsed, one paragraph per block.
fn paragraphs(html: &str) -> String {
    let Ok(selector) = Selector::parse("p") else {
        return String::new();
    };
    let document = Html::parse_document(html);
    document
        .select(&selector)
        .map(|p| collapse_whitespace(&p.text().collect::<String>()))
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn normalize_block(text: &str) -> String {
    text.lines()
        .map(collapse_whitespace)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn non_empty(s: String) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// `<title>` lookup for pages readability could not handle.
fn extract_title_from_html(html: &str) -> Option<String> {
    // ASCII lowercasing keeps byte offsets aligned with the original.
    let lower = html.to_ascii_lowercase();
    let tag_start = lower.find("<title")?;
    let content_start = tag_start + lower[tag_start..].find('>')? + 1;
    let content_end = content_start + lower[content_start..].find("</title>")?;
    non_empty(html[content_start..content_end].to_string())
}
