//! HTTP client for the catalog listing endpoint using wreq.

use crate::catalog::error::FetchError;
use crate::catalog::models::{CatalogItem, CountResponse, PageTask};
use crate::config::Config;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use wreq::Client;
use wreq_util::Emulation;

/// Trait for catalog access - enables mocking for tests.
///
/// Each call is a single attempt; retrying is the caller's concern.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// Returns the total number of items matching the filter.
    async fn count(&self) -> Result<u64, FetchError>;

    /// Fetches one page of raw, unfiltered items.
    async fn page(&self, task: PageTask) -> Result<Vec<CatalogItem>, FetchError>;
}

/// Catalog HTTP client with browser impersonation.
pub struct CatalogClient {
    client: Client,
    base_url: String,
    filter: String,
    timeout: Duration,
}

impl CatalogClient {
    /// Creates a new catalog client with the given configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let mut builder = Client::builder()
            .gzip(true)
            .brotli(true)
            .connect_timeout(config.connect_timeout());

        if let Some(proxy_url) = &config.proxy {
            debug!("Configuring proxy: {}", proxy_url);
            let proxy = wreq::Proxy::all(proxy_url).context("Failed to configure proxy")?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            filter: config.filter.clone(),
            timeout: config.timeout(),
        })
    }

    fn count_url(&self) -> String {
        format!(
            "{}?filter={}&meta=*&limit=1&offset=0",
            self.base_url,
            urlencoding::encode(&self.filter)
        )
    }

    fn page_url(&self, task: PageTask) -> String {
        format!(
            "{}?filter={}&limit={}&offset={}",
            self.base_url,
            urlencoding::encode(&self.filter),
            task.limit,
            task.offset
        )
    }

    /// Performs a GET and decodes the JSON body, bounded by the request timeout.
    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        let body = tokio::time::timeout(self.timeout, self.get(url))
            .await
            .map_err(|_| FetchError::Timeout(self.timeout))??;

        serde_json::from_str(&body).map_err(|e| FetchError::Schema(e.to_string()))
    }

    async fn get(&self, url: &str) -> Result<String, FetchError> {
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .emulation(Emulation::Chrome131)
            .header("Accept", "application/json")
            .header("Accept-Encoding", "gzip, deflate, br")
            .header("Cache-Control", "no-cache")
            .send()
            .await
            .map_err(|e| FetchError::Connection(e.to_string()))?;

        let status = response.status();
        debug!("Response status: {}", status);

        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        response.text().await.map_err(|e| FetchError::Connection(e.to_string()))
    }
}

#[async_trait]
impl CatalogApi for CatalogClient {
    async fn count(&self) -> Result<u64, FetchError> {
        let response: CountResponse = self.get_json(&self.count_url()).await?;
        Ok(response.meta.length)
    }

    async fn page(&self, task: PageTask) -> Result<Vec<CatalogItem>, FetchError> {
        let values: Vec<serde_json::Value> = self.get_json(&self.page_url(task)).await?;
        Ok(CatalogItem::decode_page(values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn make_test_config(server: &MockServer) -> Config {
        Config {
            base_url: format!("{}/v2/products", server.uri()),
            timeout_ms: 1000,
            ..Config::default()
        }
    }

    fn item_json(id: u64) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "title": format!("Set {}", id),
            "price": {"price": 1000},
            "old_price": null,
            "link": {"web_url": format!("https://example.com/{}", id)},
            "available": {"offline": {"region_iso_codes": ["RU-MOW"]}}
        })
    }

    #[test]
    fn test_page_url_encoding() {
        let config = Config::default();
        let client = CatalogClient::new(&config).unwrap();

        let url = client.page_url(PageTask { offset: 200, limit: 100 });
        assert_eq!(
            url,
            "https://api.detmir.ru/v2/products?filter=categories%5B%5D.alias%3Alego%3Bpromo%3Afalse&limit=100&offset=200"
        );
    }

    #[test]
    fn test_count_url() {
        let config = Config::default();
        let client = CatalogClient::new(&config).unwrap();

        let url = client.count_url();
        assert!(url.contains("meta=*"));
        assert!(url.ends_with("&limit=1&offset=0"));
    }

    #[tokio::test]
    async fn test_count_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v2/products"))
            .and(query_param("filter", "categories[].alias:lego;promo:false"))
            .and(query_param("meta", "*"))
            .and(query_param("limit", "1"))
            .and(query_param("offset", "0"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "items": [],
                    "meta": {"length": 342}
                })),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = CatalogClient::new(&make_test_config(&mock_server)).unwrap();
        assert_eq!(client.count().await.unwrap(), 342);
    }

    #[tokio::test]
    async fn test_page_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v2/products"))
            .and(query_param("limit", "100"))
            .and(query_param("offset", "100"))
            .and(query_param_is_missing("meta"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([item_json(7), item_json(8)])),
            )
            .mount(&mock_server)
            .await;

        let client = CatalogClient::new(&make_test_config(&mock_server)).unwrap();
        let items = client.page(PageTask { offset: 100, limit: 100 }).await.unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, 7);
        assert_eq!(items[1].title, "Set 8");
    }

    #[tokio::test]
    async fn test_page_skips_malformed_item() {
        let mock_server = MockServer::start().await;

        let mut broken = item_json(9);
        broken["old_price"] = serde_json::json!({"price": null});
        broken["price"] = serde_json::json!({"price": null});

        Mock::given(method("GET"))
            .and(path("/v2/products"))
            .and(query_param_is_missing("meta"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([item_json(7), broken, item_json(8)])),
            )
            .mount(&mock_server)
            .await;

        let client = CatalogClient::new(&make_test_config(&mock_server)).unwrap();
        let items = client.page(PageTask { offset: 0, limit: 100 }).await.unwrap();

        let ids: Vec<u64> = items.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![7, 8]);
    }

    #[tokio::test]
    async fn test_http_error_500() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v2/products"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let client = CatalogClient::new(&make_test_config(&mock_server)).unwrap();
        let err = client.page(PageTask { offset: 0, limit: 100 }).await.unwrap_err();
        assert_eq!(err, FetchError::Status(500));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_malformed_body_is_schema_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v2/products"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .mount(&mock_server)
            .await;

        let client = CatalogClient::new(&make_test_config(&mock_server)).unwrap();
        let err = client.count().await.unwrap_err();
        assert!(matches!(err, FetchError::Schema(_)));
    }

    #[tokio::test]
    async fn test_slow_response_times_out() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v2/products"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([]))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&mock_server)
            .await;

        let mut config = make_test_config(&mock_server);
        config.timeout_ms = 50;

        let client = CatalogClient::new(&config).unwrap();
        let err = client.page(PageTask { offset: 0, limit: 100 }).await.unwrap_err();
        assert_eq!(err, FetchError::Timeout(Duration::from_millis(50)));
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let config = Config {
            // Port 9 (discard) is not expected to be listening
            base_url: "http://127.0.0.1:9/v2/products".to_string(),
            ..Config::default()
        };

        let client = CatalogClient::new(&config).unwrap();
        let err = client.count().await.unwrap_err();
        assert!(matches!(err, FetchError::Connection(_) | FetchError::Timeout(_)));
    }
}
