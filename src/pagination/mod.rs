//! Cursor pagination.
//!
//! Collection endpoints return one page per call together with an opaque
//! continuation token. [`CursorPaginator`] walks every page and returns the
//! concatenated collection as a single result.
//!
//! # Protocol
//!
//! ```text
//! GET /followers/ids.json?cursor=-1       -> {"ids":[a,b], "next_cursor_str":"100"}
//! GET /followers/ids.json?cursor=100      -> {"ids":[c],   "next_cursor_str":"50"}
//! GET /followers/ids.json?cursor=50       -> {"ids":[d,e], "next_cursor_str":"0"}
//!                                            => [a,b,c,d,e]
//! ```
//!
//! Pages are fetched one at a time, so elements keep page order. The walk
//! either returns every element or fails with the first error; partial
//! results are never returned.
//!
//! # Termination
//!
//! The walk stops only when the platform returns cursor `"0"`. A server
//! that never does keeps the walk going; a repeated cursor is logged as a
//! warning, and a hard page cap is available through
//! [`CursorPaginator::with_max_pages`]. There is no built-in deadline: wrap
//! the call in `tokio::time::timeout` to bound latency.

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;

use serde_json::Value;

use crate::config::PaginationConfig;
use crate::error::{ChirpError, Result};
use crate::params::Params;

/// Request parameter carrying the cursor
pub const CURSOR_PARAM: &str = "cursor";

/// Cursor requesting the first page
pub const FIRST_CURSOR: &str = "-1";

/// Cursor signalling that no pages remain
pub const LAST_CURSOR: &str = "0";

/// Response field holding the next cursor
pub const NEXT_CURSOR_FIELD: &str = "next_cursor_str";

/// Source of single pages.
///
/// Receives the URL and the full parameter set (including [`CURSOR_PARAM`])
/// and resolves with the decoded page body.
pub trait PageFetcher: Send + Sync {
    /// Fetch one page.
    fn fetch_page<'a>(
        &'a self,
        url: &'a str,
        params: &'a Params,
    ) -> Pin<Box<dyn Future<Output = Result<Value>> + Send + 'a>>;
}

/// Walks cursor-paginated collections.
#[derive(Debug, Clone, Copy, Default)]
pub struct CursorPaginator {
    max_pages: Option<u32>,
}

impl CursorPaginator {
    /// Create a paginator with no page cap
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail once more than `max_pages` pages would be needed
    pub fn with_max_pages(max_pages: u32) -> Self {
        Self {
            max_pages: Some(max_pages),
        }
    }

    /// Create a paginator from configuration
    pub fn from_config(config: &PaginationConfig) -> Self {
        Self {
            max_pages: config.max_pages,
        }
    }

    /// Fetch every page of `url` and concatenate the `collection_key` arrays.
    ///
    /// An empty `collection_key` fails with [`ChirpError::Config`] before
    /// any request is made. Pages whose collection field is missing or not
    /// an array contribute nothing. A page without [`NEXT_CURSOR_FIELD`]
    /// fails with [`ChirpError::Pagination`].
    pub async fn fetch_all<F>(
        &self,
        fetcher: &F,
        url: &str,
        collection_key: &str,
        params: &Params,
    ) -> Result<Vec<Value>>
    where
        F: PageFetcher + ?Sized,
    {
        if collection_key.is_empty() {
            return Err(ChirpError::Config(
                "A results key must be provided for cursor pagination".to_string(),
            ));
        }

        let mut request = params.clone();
        request.insert(CURSOR_PARAM.to_string(), FIRST_CURSOR.to_string());
        let mut results = Vec::new();
        let mut seen = HashSet::new();
        let mut pages: u32 = 0;

        loop {
            if let Some(max) = self.max_pages {
                if pages >= max {
                    return Err(ChirpError::Pagination(format!(
                        "{url}: no final cursor after {max} pages"
                    )));
                }
            }

            let mut page = fetcher.fetch_page(url, &request).await?;
            pages += 1;

            let next = page
                .get(NEXT_CURSOR_FIELD)
                .and_then(Value::as_str)
                .map(str::to_owned);

            let added = match page.get_mut(collection_key).map(Value::take) {
                Some(Value::Array(items)) => {
                    let n = items.len();
                    results.extend(items);
                    n
                },
                _ => 0,
            };

            tracing::debug!(
                url,
                page = pages,
                added,
                total = results.len(),
                next = next.as_deref().unwrap_or("<none>"),
                "Fetched page"
            );

            let next = next.ok_or_else(|| {
                ChirpError::Pagination(format!(
                    "{url}: page {pages} has no {NEXT_CURSOR_FIELD} field"
                ))
            })?;

            if next == LAST_CURSOR {
                return Ok(results);
            }

            if !seen.insert(next.clone()) {
                tracing::warn!(url, cursor = %next, page = pages, "Cursor repeated, server may be cycling");
            }

            request.insert(CURSOR_PARAM.to_string(), next);
        }
    }
}

/// Walk `url` with an uncapped [`CursorPaginator`]
pub async fn fetch_all<F>(
    fetcher: &F,
    url: &str,
    collection_key: &str,
    params: &Params,
) -> Result<Vec<Value>>
where
    F: PageFetcher + ?Sized,
{
    CursorPaginator::new()
        .fetch_all(fetcher, url, collection_key, params)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::params;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Serves canned pages and records every request
    struct ScriptedPages {
        pages: Mutex<VecDeque<Result<Value>>>,
        calls: Mutex<Vec<Params>>,
    }

    impl ScriptedPages {
        fn new(pages: Vec<Result<Value>>) -> Self {
            Self {
                pages: Mutex::new(pages.into()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn cursors(&self) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|p| p[CURSOR_PARAM].clone())
                .collect()
        }
    }

    impl PageFetcher for ScriptedPages {
        fn fetch_page<'a>(
            &'a self,
            _url: &'a str,
            params: &'a Params,
        ) -> Pin<Box<dyn Future<Output = Result<Value>> + Send + 'a>> {
            self.calls.lock().unwrap().push(params.clone());
            let page = self
                .pages
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ChirpError::Network("no more pages".to_string())));
            Box::pin(async move { page })
        }
    }

    #[tokio::test]
    async fn test_three_pages_concatenate_in_order() {
        let fetcher = ScriptedPages::new(vec![
            Ok(json!({"ids": ["a", "b"], "next_cursor_str": "100"})),
            Ok(json!({"ids": ["c"], "next_cursor_str": "50"})),
            Ok(json!({"ids": ["d", "e"], "next_cursor_str": "0"})),
        ]);

        let ids = fetch_all(&fetcher, "/followers/ids.json", "ids", &Params::new())
            .await
            .unwrap();

        assert_eq!(ids, vec![json!("a"), json!("b"), json!("c"), json!("d"), json!("e")]);
        assert_eq!(fetcher.cursors(), vec!["-1", "100", "50"]);
    }

    #[tokio::test]
    async fn test_missing_key_makes_no_calls() {
        let fetcher = ScriptedPages::new(vec![]);

        let result = fetch_all(&fetcher, "/followers/ids.json", "", &Params::new()).await;

        assert!(matches!(result, Err(ChirpError::Config(_))));
        assert!(fetcher.cursors().is_empty());
    }

    #[tokio::test]
    async fn test_caller_params_are_kept() {
        let fetcher = ScriptedPages::new(vec![
            Ok(json!({"users": [], "next_cursor_str": "7"})),
            Ok(json!({"users": [], "next_cursor_str": "0"})),
        ]);

        let params = params([("screen_name", "rustlang"), ("cursor", "999")]);
        fetch_all(&fetcher, "/friends/list.json", "users", &params)
            .await
            .unwrap();

        let calls = fetcher.calls.lock().unwrap();
        assert_eq!(calls[0]["screen_name"], "rustlang");
        assert_eq!(calls[0][CURSOR_PARAM], "-1");
        assert_eq!(calls[1]["screen_name"], "rustlang");
        assert_eq!(calls[1][CURSOR_PARAM], "7");
    }

    #[tokio::test]
    async fn test_absent_or_non_array_collection_contributes_nothing() {
        let fetcher = ScriptedPages::new(vec![
            Ok(json!({"ids": [1], "next_cursor_str": "3"})),
            Ok(json!({"next_cursor_str": "2"})),
            Ok(json!({"ids": {"not": "a list"}, "next_cursor_str": "1"})),
            Ok(json!({"ids": [2, 3], "next_cursor_str": "0"})),
        ]);

        let ids = fetch_all(&fetcher, "/x.json", "ids", &Params::new())
            .await
            .unwrap();
        assert_eq!(ids, vec![json!(1), json!(2), json!(3)]);
        assert_eq!(fetcher.cursors().len(), 4);
    }

    #[tokio::test]
    async fn test_page_error_discards_partial_results() {
        let fetcher = ScriptedPages::new(vec![
            Ok(json!({"ids": [1, 2], "next_cursor_str": "5"})),
            Err(ChirpError::Http {
                status: 503,
                body: "Over capacity".to_string(),
            }),
            Ok(json!({"ids": [3], "next_cursor_str": "0"})),
        ]);

        let result = fetch_all(&fetcher, "/x.json", "ids", &Params::new()).await;
        assert!(matches!(result, Err(ChirpError::Http { status: 503, .. })));
        assert_eq!(fetcher.cursors().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_next_cursor_fails() {
        let fetcher = ScriptedPages::new(vec![Ok(json!({"ids": [1]}))]);

        let result = fetch_all(&fetcher, "/x.json", "ids", &Params::new()).await;
        assert!(matches!(result, Err(ChirpError::Pagination(_))));
    }

    #[tokio::test]
    async fn test_max_pages_stops_cycling_server() {
        let pages = (0..10)
            .map(|_| Ok(json!({"ids": [1], "next_cursor_str": "42"})))
            .collect();
        let fetcher = ScriptedPages::new(pages);

        let result = CursorPaginator::with_max_pages(3)
            .fetch_all(&fetcher, "/x.json", "ids", &Params::new())
            .await;

        assert!(matches!(result, Err(ChirpError::Pagination(_))));
        assert_eq!(fetcher.cursors(), vec!["-1", "42", "42"]);
    }

    #[tokio::test]
    async fn test_single_final_page() {
        let fetcher = ScriptedPages::new(vec![Ok(json!({"ids": [], "next_cursor_str": "0"}))]);

        let paginator = CursorPaginator::from_config(&PaginationConfig::default());
        let ids = paginator
            .fetch_all(&fetcher, "/x.json", "ids", &Params::new())
            .await
            .unwrap();
        assert!(ids.is_empty());
    }
}
