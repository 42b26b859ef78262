//! Page text lookup against the content backend.
//!
//! Used to ground explanations in the actual pages a topic spans. Every
//! failure here degrades to missing text; it never fails a command.

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use serde::Deserialize;

use crate::error::EngineError;

#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Plain text of one page. Empty when the page has no text.
    async fn page_text(&self, content_id: &str, page: u32) -> Result<String, EngineError>;
}

#[derive(Deserialize)]
struct PageResponse {
    #[serde(default)]
    data: Option<PageData>,
}

#[derive(Deserialize)]
struct PageData {
    #[serde(default)]
    text: Option<String>,
}

/// Reads `GET {base_url}/content/{id}/page/{n}` → `{success, data: {text}}`.
pub struct HttpContentSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpContentSource {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ContentSource for HttpContentSource {
    async fn page_text(&self, content_id: &str, page: u32) -> Result<String, EngineError> {
        let url = format!("{}/content/{content_id}/page/{page}", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| EngineError::Content {
                message: format!("request for page {page} failed: {e}"),
            })?;

        if !response.status().is_success() {
            return Err(EngineError::Content {
                message: format!("page {page} returned {}", response.status()),
            });
        }

        let body: PageResponse = response.json().await.map_err(|e| EngineError::Content {
            message: format!("page {page} body: {e}"),
        })?;
        Ok(body.data.and_then(|d| d.text).unwrap_or_default())
    }
}

/// Most pages read for one request; longer spans are truncated.
pub const MAX_FETCHED_PAGES: usize = 50;

/// Page requests in flight at once.
const FETCH_CONCURRENCY: usize = 8;

/// Fetch a page range with bounded concurrency and join the non-empty pages
/// as `[Page n]\n<text>` blocks separated by blank lines, in page order.
pub async fn fetch_pages(
    source: &dyn ContentSource,
    content_id: &str,
    pages: std::ops::RangeInclusive<u32>,
) -> String {
    let span = u64::from(*pages.end()).saturating_sub(u64::from(*pages.start())) + 1;
    if !pages.is_empty() && span > MAX_FETCHED_PAGES as u64 {
        tracing::warn!(
            content_id,
            first = *pages.start(),
            last = *pages.end(),
            limit = MAX_FETCHED_PAGES,
            "page span truncated"
        );
    }

    let fetched: Vec<(u32, String)> = stream::iter(pages.take(MAX_FETCHED_PAGES))
        .map(|page| async move {
            match source.page_text(content_id, page).await {
                Ok(text) => (page, text),
                Err(e) => {
                    tracing::warn!(content_id, page, error = %e, "page fetch failed");
                    (page, String::new())
                }
            }
        })
        .buffered(FETCH_CONCURRENCY)
        .collect()
        .await;

    fetched
        .into_iter()
        .filter(|(_, text)| !text.trim().is_empty())
        .map(|(page, text)| format!("[Page {page}]\n{text}"))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Serves `page N text` for odd pages, nothing for even pages, and errors on page 13.
    pub(crate) struct FakePages;

    #[async_trait]
    impl ContentSource for FakePages {
        async fn page_text(&self, _content_id: &str, page: u32) -> Result<String, EngineError> {
            if page == 13 {
                return Err(EngineError::Content {
                    message: "unlucky".to_string(),
                });
            }
            Ok(if page % 2 == 1 {
                format!("page {page} text")
            } else {
                String::new()
            })
        }
    }

    #[tokio::test]
    async fn skips_empty_and_failed_pages() {
        let joined = fetch_pages(&FakePages, "doc", 11..=14).await;
        assert_eq!(joined, "[Page 11]\npage 11 text");
    }

    #[tokio::test]
    async fn single_page_range() {
        let joined = fetch_pages(&FakePages, "doc", 3..=3).await;
        assert_eq!(joined, "[Page 3]\npage 3 text");
        assert_eq!(fetch_pages(&FakePages, "doc", 2..=2).await, "");
    }

    /// Tracks how many requests overlap; every page has text.
    #[derive(Default)]
    struct CountingPages {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        served: AtomicUsize,
    }

    #[async_trait]
    impl ContentSource for CountingPages {
        async fn page_text(&self, _content_id: &str, page: u32) -> Result<String, EngineError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::task::yield_now().await;
            tokio::task::yield_now().await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.served.fetch_add(1, Ordering::SeqCst);
            Ok(format!("p{page}"))
        }
    }

    #[tokio::test]
    async fn huge_span_is_truncated_and_throttled() {
        let source = CountingPages::default();
        let joined = fetch_pages(&source, "doc", 1..=u32::MAX).await;

        assert_eq!(source.served.load(Ordering::SeqCst), MAX_FETCHED_PAGES);
        assert!(source.peak.load(Ordering::SeqCst) <= FETCH_CONCURRENCY);
        assert!(joined.starts_with("[Page 1]\np1\n\n[Page 2]\np2"));
        assert!(joined.ends_with(&format!("[Page {MAX_FETCHED_PAGES}]\np{MAX_FETCHED_PAGES}")));
    }
}
