//! HTML to text, and DuckDuckGo result parsing.

use regex_lite::Regex;
use serde::Serialize;

/// Compiled patterns for turning pages into readable text.
pub struct HtmlCleaner {
    blocks: Regex,
    breaks: Regex,
    tags: Regex,
    result_link: Regex,
    href: Regex,
    snippet: Regex,
}

/// One search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

impl HtmlCleaner {
    pub fn new() -> Result<Self, regex_lite::Error> {
        Ok(Self {
            blocks: Regex::new(r"(?is)<(script|style|noscript|svg|head)\b[^>]*>.*?</(script|style|noscript|svg|head)>")?,
            breaks: Regex::new(r"(?i)<(br|/p|/div|/li|/h[1-6]|/tr)\b[^>]*>")?,
            tags: Regex::new(r"(?s)<[^>]*>")?,
            result_link: Regex::new(r#"(?s)<a([^>]*class="result__a"[^>]*)>(.*?)</a>"#)?,
            href: Regex::new(r#"href="([^"]*)""#)?,
            snippet: Regex::new(r#"(?s)<[a-z]+[^>]*class="result__snippet"[^>]*>(.*?)</[a-z]+>"#)?,
        })
    }

    /// Strip markup and collapse whitespace, keeping line structure.
    pub fn to_text(&self, html: &str) -> String {
        let without_blocks = self.blocks.replace_all(html, " ");
        let with_breaks = self.breaks.replace_all(&without_blocks, "\n");
        let bare = self.tags.replace_all(&with_breaks, " ");
        let decoded = decode_entities(&bare);

        decoded
            .lines()
            .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Inline text of a fragment (no line breaks).
    fn inline_text(&self, fragment: &str) -> String {
        let bare = self.tags.replace_all(fragment, "");
        decode_entities(&bare).split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Parse a DuckDuckGo HTML results page, in page order, ads skipped.
    pub fn parse_search_results(&self, html: &str, limit: usize) -> Vec<SearchHit> {
        let links: Vec<_> = self.result_link.captures_iter(html).collect();
        let mut hits = Vec::new();

        for (i, caps) in links.iter().enumerate() {
            if hits.len() >= limit {
                break;
            }
            let (Some(whole), Some(attrs), Some(title)) = (caps.get(0), caps.get(1), caps.get(2)) else {
                continue;
            };
            let Some(raw_href) = self.href.captures(attrs.as_str()).and_then(|c| c.get(1)) else {
                continue;
            };
            let url = resolve_result_url(&decode_entities(raw_href.as_str()));
            if url.is_empty() || url.contains("duckduckgo.com/y.js") {
                continue;
            }

            let section_end = links
                .get(i + 1)
                .and_then(|next| next.get(0))
                .map(|m| m.start())
                .unwrap_or(html.len());
            let snippet = self
                .snippet
                .captures(&html[whole.end()..section_end])
                .and_then(|c| c.get(1))
                .map(|m| self.inline_text(m.as_str()))
                .unwrap_or_default();

            hits.push(SearchHit {
                title: self.inline_text(title.as_str()),
                url,
                snippet,
            });
        }
        hits
    }
}

/// DuckDuckGo wraps targets as `//duckduckgo.com/l/?uddg=<encoded>`.
fn resolve_result_url(href: &str) -> String {
    let absolute = if href.starts_with("//") {
        format!("https:{href}")
    } else {
        href.to_string()
    };
    match reqwest::Url::parse(&absolute) {
        Ok(url) => url
            .query_pairs()
            .find(|(k, _)| k == "uddg")
            .map(|(_, v)| v.into_owned())
            .unwrap_or(absolute),
        Err(_) => String::new(),
    }
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&#x2F;", "/")
        .replace("&amp;", "&")
}

/// Cap text at `max` characters, noting how much was dropped.
pub fn clip(text: &str, max: usize) -> String {
    let total = text.chars().count();
    if total <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max).collect();
    format!("{kept}\n\n[truncated: {} more chars]", total - max)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DDG_PAGE: &str = r##"
<div class="result results_links results_links_deep result--ad">
  <h2 class="result__title"><a rel="nofollow" class="result__a" href="https://duckduckgo.com/y.js?ad_domain=x">Sponsored</a></h2>
  <a class="result__snippet" href="#">Buy now</a>
</div>
<div class="result results_links results_links_deep web-result">
  <h2 class="result__title">
    <a rel="nofollow" class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.rust-lang.org%2F&amp;rut=abc">Rust Programming <b>Language</b></a>
  </h2>
  <a class="result__snippet" href="//duckduckgo.com/l/?uddg=x">A language empowering everyone to build reliable &amp; efficient software.</a>
</div>
<div class="result results_links results_links_deep web-result">
  <h2 class="result__title">
    <a rel="nofollow" class="result__a" href="https://tokio.rs/">Tokio</a>
  </h2>
  <a class="result__snippet" href="https://tokio.rs/">An asynchronous runtime for Rust.</a>
</div>
<div class="result web-result">
  <h2 class="result__title"><a rel="nofollow" class="result__a" href="https://docs.rs/">Docs.rs</a></h2>
</div>
"##;

    fn cleaner() -> HtmlCleaner {
        HtmlCleaner::new().unwrap()
    }

    #[test]
    fn parses_results_in_order_skipping_ads() {
        let hits = cleaner().parse_search_results(DDG_PAGE, 10);
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].title, "Rust Programming Language");
        assert_eq!(hits[0].url, "https://www.rust-lang.org/");
        assert_eq!(
            hits[0].snippet,
            "A language empowering everyone to build reliable & efficient software."
        );
        assert_eq!(hits[1].url, "https://tokio.rs/");
        assert_eq!(hits[1].snippet, "An asynchronous runtime for Rust.");
        assert_eq!(hits[2].title, "Docs.rs");
        assert_eq!(hits[2].snippet, "");
    }

    #[test]
    fn result_limit_respected() {
        let hits = cleaner().parse_search_results(DDG_PAGE, 1);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Rust Programming Language");
    }

    #[test]
    fn empty_page_yields_nothing() {
        assert!(cleaner().parse_search_results("<html></html>", 5).is_empty());
    }

    #[test]
    fn to_text_drops_scripts_and_tags() {
        let html = "<html><head><title>x</title></head><body><script>var a = 1;</script>\
                    <style>p { color: red }</style><h1>Title</h1><p>Hello&nbsp;<b>world</b> &amp; friends</p>\
                    <div>Second   line</div></body></html>";
        let text = cleaner().to_text(html);
        assert!(!text.contains("var a"));
        assert!(!text.contains("color"));
        assert!(text.contains("Title"));
        assert!(text.contains("Hello world & friends"));
        assert!(text.contains("Second line"));
        assert!(!text.contains('<'));
    }

    #[test]
    fn clip_marks_truncation() {
        assert_eq!(clip("short", 10), "short");
        let clipped = clip(&"x".repeat(7000), 6000);
        assert!(clipped.starts_with(&"x".repeat(6000)));
        assert!(clipped.ends_with("[truncated: 1000 more chars]"));
    }
}
