//! REST forwarding layer.
//!
//! Thin GET/POST plumbing that the endpoint wrappers and the cursor
//! paginator are built on. Paths starting with `/` are resolved against the
//! configured REST base; absolute URLs are used as given.
//!
//! Responses are decoded as JSON. A non-success status fails with
//! [`ChirpError::Http`] carrying the platform's error body.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::{Client, Response};
use serde_json::Value;

use crate::config::{Config, EndpointConfig, PaginationConfig};
use crate::error::{ChirpError, Result};
use crate::pagination::{CursorPaginator, PageFetcher};
use crate::params::{merge, Params};
use crate::transport::build_client;

/// JSON client for the request/response API.
#[derive(Debug, Clone)]
pub struct RestClient {
    client: Client,
    endpoints: EndpointConfig,
    pagination: PaginationConfig,
}

impl RestClient {
    /// Create a client from configuration
    pub fn new(config: &Config) -> Result<Self> {
        let timeout = Duration::from_secs(config.http.timeout_secs);
        Ok(Self {
            client: build_client(&config.http, Some(timeout))?,
            endpoints: config.endpoints.clone(),
            pagination: config.pagination.clone(),
        })
    }

    /// Resolve a `/`-relative path against the REST base
    pub fn resolve_url(&self, url: &str) -> String {
        if url.starts_with('/') {
            format!("{}{}", self.endpoints.rest_base.trim_end_matches('/'), url)
        } else {
            url.to_string()
        }
    }

    /// GET `url` with `params` in the query string
    pub async fn get(&self, url: &str, params: &Params) -> Result<Value> {
        let url = self.resolve_url(url);
        tracing::debug!(url = %url, "GET");

        let response = self.client.get(&url).query(params).send().await?;
        decode_response(response).await
    }

    /// POST `form` to `url`
    pub async fn post(&self, url: &str, form: &Params) -> Result<Value> {
        let url = self.resolve_url(url);
        tracing::debug!(url = %url, "POST");

        let response = self.client.post(&url).form(form).send().await?;
        decode_response(response).await
    }

    /// Query the search API for `q`
    pub async fn search(&self, q: &str, params: &Params) -> Result<Value> {
        let url = format!(
            "{}/search.json",
            self.endpoints.search_base.trim_end_matches('/')
        );
        let query = merge(
            params.clone(),
            &Params::from([("q".to_string(), q.to_string())]),
        );
        self.get(&url, &query).await
    }

    /// Fetch every page of a cursored collection, concatenating `key`
    pub async fn get_using_cursor(
        &self,
        url: &str,
        key: &str,
        params: &Params,
    ) -> Result<Vec<Value>> {
        CursorPaginator::from_config(&self.pagination)
            .fetch_all(self, url, key, params)
            .await
    }
}

impl PageFetcher for RestClient {
    fn fetch_page<'a>(
        &'a self,
        url: &'a str,
        params: &'a Params,
    ) -> Pin<Box<dyn Future<Output = Result<Value>> + Send + 'a>> {
        Box::pin(self.get(url, params))
    }
}

/// Map status and body of a REST response
async fn decode_response(response: Response) -> Result<Value> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        tracing::debug!(status = status.as_u16(), "REST call failed");
        return Err(ChirpError::Http {
            status: status.as_u16(),
            body,
        });
    }

    Ok(serde_json::from_str(&body)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(rest_base: &str) -> RestClient {
        let config = Config {
            endpoints: EndpointConfig {
                rest_base: rest_base.to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        RestClient::new(&config).unwrap()
    }

    #[test]
    fn test_resolve_relative_url() {
        let client = client("https://api.twitter.com/1");
        assert_eq!(
            client.resolve_url("/followers/ids.json"),
            "https://api.twitter.com/1/followers/ids.json"
        );
    }

    #[test]
    fn test_resolve_trailing_slash_base() {
        let client = client("http://localhost:8080/1/");
        assert_eq!(
            client.resolve_url("/statuses/show.json"),
            "http://localhost:8080/1/statuses/show.json"
        );
    }

    #[test]
    fn test_absolute_url_untouched() {
        let client = client("https://api.twitter.com/1");
        assert_eq!(
            client.resolve_url("https://search.twitter.com/search.json"),
            "https://search.twitter.com/search.json"
        );
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        let client = client("http://127.0.0.1:9/1");
        let result = client.get("/account/verify_credentials.json", &Params::new()).await;
        assert!(matches!(result, Err(ChirpError::Network(_))));
    }

    #[tokio::test]
    async fn test_cursor_without_key_fails_before_request() {
        // Unroutable base: a request would fail with Network instead
        let client = client("http://127.0.0.1:9/1");
        let result = client
            .get_using_cursor("/followers/ids.json", "", &Params::new())
            .await;
        assert!(matches!(result, Err(ChirpError::Config(_))));
    }
}
