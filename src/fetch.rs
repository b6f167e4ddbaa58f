//! HTTP fetch adapter: one webpage in, one block of text out.
//!
//! The fetcher only accepts `http`/`https` URLs and 2xx HTML responses whose
//! body fits `fetch.max_body_bytes`. The HTML is reduced to its readable
//! text: boilerplate subtrees (`script style nav footer iframe noscript
//! header aside`) and the document head are dropped, and every block-level
//! element becomes its own paragraph.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use thiserror::Error;

use crate::config::FetchConfig;
use crate::normalize::BOUNDARY;
use crate::traits::{FetchedPage, PageFetcher};

/// Elements whose whole subtree never contributes text.
const SKIPPED_ELEMENTS: &[&str] = &[
    "script", "style", "nav", "footer", "iframe", "noscript", "header", "aside", "head",
    "template", "svg",
];

/// Elements that start a new paragraph.
const BLOCK_ELEMENTS: &[&str] = &[
    "address",
    "article",
    "blockquote",
    "body",
    "dd",
    "div",
    "dl",
    "dt",
    "figcaption",
    "figure",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "li",
    "main",
    "ol",
    "p",
    "pre",
    "section",
    "table",
    "td",
    "th",
    "tr",
    "ul",
];

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("invalid url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    #[error("request to {0} timed out")]
    Timeout(String),

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("{url} is not an HTML page (content-type: {content_type})")]
    ContentType { url: String, content_type: String },

    #[error("{url} body exceeds {limit} bytes")]
    TooLarge { url: String, limit: usize },
}

pub struct HttpFetcher {
    client: reqwest::Client,
    max_body_bytes: usize,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .redirect(reqwest::redirect::Policy::limited(10))
            .connect_timeout(Duration::from_secs(config.timeout_secs))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            max_body_bytes: config.max_body_bytes,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let parsed = reqwest::Url::parse(url).map_err(|e| FetchError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FetchError::InvalidUrl {
                url: url.to_string(),
                reason: format!("unsupported scheme {}", parsed.scheme()),
            });
        }

        let mut resp = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| transport_error(url, e))?;

        let final_url = resp.url().to_string();
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: final_url,
                status: status.as_u16(),
            });
        }

        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();
        if !is_html(&content_type) {
            return Err(FetchError::ContentType {
                url: final_url,
                content_type,
            });
        }

        let mut body: Vec<u8> = Vec::new();
        while let Some(chunk) = resp.chunk().await.map_err(|e| transport_error(url, e))? {
            if body.len().saturating_add(chunk.len()) > self.max_body_bytes {
                return Err(FetchError::TooLarge {
                    url: final_url,
                    limit: self.max_body_bytes,
                });
            }
            body.extend_from_slice(&chunk);
        }

        let text = html_to_text(&String::from_utf8_lossy(&body));
        tracing::debug!(url = %final_url, bytes = body.len(), chars = text.len(), "page fetched");

        Ok(FetchedPage {
            final_url,
            text,
            body_bytes: body.len() as u64,
        })
    }
}

fn transport_error(url: &str, e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout(url.to_string())
    } else {
        FetchError::Transport {
            url: url.to_string(),
            reason: e.to_string(),
        }
    }
}

/// A missing content type is accepted and parsed as HTML.
fn is_html(content_type: &str) -> bool {
    content_type.is_empty()
        || content_type.starts_with("text/html")
        || content_type.starts_with("application/xhtml+xml")
}

/// Reduces an HTML document to paragraphs of readable text.
pub fn html_to_text(html: &str) -> String {
    let doc = scraper::Html::parse_document(html);

    let mut blocks: Vec<String> = Vec::new();
    let mut current_block = None;
    let mut buffer = String::new();

    for node in doc.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };

        let mut block = None;
        let mut skipped = false;
        for ancestor in node.ancestors() {
            let Some(element) = ancestor.value().as_element() else {
                continue;
            };
            let name = element.name();
            if SKIPPED_ELEMENTS.contains(&name) {
                skipped = true;
                break;
            }
            if block.is_none() && BLOCK_ELEMENTS.contains(&name) {
                block = Some(ancestor.id());
            }
        }
        if skipped {
            continue;
        }

        if block != current_block {
            flush_block(&mut buffer, &mut blocks);
            current_block = block;
        }
        buffer.push_str(text);
    }
    flush_block(&mut buffer, &mut blocks);

    blocks.join(BOUNDARY)
}

fn flush_block(buffer: &mut String, blocks: &mut Vec<String>) {
    let collapsed = buffer.split_whitespace().collect::<Vec<_>>().join(" ");
    if !collapsed.is_empty() {
        blocks.push(collapsed);
    }
    buffer.clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_boilerplate_and_keeps_paragraphs() {
        let html = r#"<html><head><title>Ignored title</title><style>p{}</style></head>
            <body>
              <header>Site header</header>
              <nav><a href="/">Home</a></nav>
              <article>
                <h1>Release notes</h1>
                <p>Version <b>2.0</b> ships   today.</p>
                <p>It fixes
                   three bugs.</p>
              </article>
              <script>var x = 1;</script>
              <footer>Copyright</footer>
            </body></html>"#;
        assert_eq!(
            html_to_text(html),
            "Release notes\n\nVersion 2.0 ships today.\n\nIt fixes three bugs."
        );
    }

    #[test]
    fn text_around_nested_blocks_is_split() {
        let html = "<div>intro<p>inner</p>outro</div>";
        assert_eq!(html_to_text(html), "intro\n\ninner\n\noutro");
    }

    #[test]
    fn list_items_are_separate_paragraphs() {
        let html = "<ul><li>one</li><li>two</li></ul>";
        assert_eq!(html_to_text(html), "one\n\ntwo");
    }

    #[test]
    fn empty_and_boilerplate_only_pages_are_empty() {
        assert_eq!(html_to_text(""), "");
        assert_eq!(html_to_text("<nav>menu</nav><aside>ads</aside>"), "");
    }

    #[test]
    fn content_type_check() {
        assert!(is_html("text/html; charset=utf-8"));
        assert!(is_html("application/xhtml+xml"));
        assert!(is_html(""));
        assert!(!is_html("application/pdf"));
        assert!(!is_html("application/json"));
    }

    #[tokio::test]
    async fn rejects_non_http_schemes() {
        let fetcher = HttpFetcher::new(&FetchConfig::default()).unwrap();
        let err = fetcher.fetch("file:///etc/passwd").await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl { .. }));
    }
}
