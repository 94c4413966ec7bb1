//! USDA FoodData Central client
//!
//! Async HTTP client for `/foods/search` and `/food/{id}` with retry on
//! rate-limit and gateway errors, and an injected response cache.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::cache::ResponseCache;
use super::payload::{parse_food, parse_search};
use super::{FoodSearchHit, FoodSource, SearchRequest};
use crate::nutrition::RawFood;

/// Public FoodData Central endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.nal.usda.gov/fdc/v1";

/// Provider errors
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("USDA_API_KEY is not set")]
    MissingApiKey,

    #[error("HTTP error calling USDA API: {0}")]
    Http(#[from] reqwest::Error),

    #[error("USDA API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("USDA API rate limit persisted after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },

    #[error("Food {0} not found")]
    NotFound(i64),

    #[error("Unexpected USDA payload: {0}")]
    InvalidPayload(String),
}

/// Result type for provider calls
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Retry schedule: `max_attempts` tries, sleeping `backoff * 2^(n-1)` after
/// the n-th failed try
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            backoff: Duration::from_secs(1),
        }
    }
}

fn is_retryable(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

/// Detail format of `/food/{id}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DetailFormat {
    Abridged,
    Full,
}

impl DetailFormat {
    fn as_str(&self) -> &'static str {
        match self {
            DetailFormat::Abridged => "abridged",
            DetailFormat::Full => "full",
        }
    }
}

/// FoodData Central client
#[derive(Clone)]
pub struct UsdaClient {
    http: Client,
    base_url: String,
    api_key: String,
    cache: Arc<dyn ResponseCache>,
    retry: RetryPolicy,
}

impl UsdaClient {
    /// Build a client; fails without an API key
    pub fn new(
        api_key: Option<String>,
        base_url: impl Into<String>,
        timeout: Duration,
        cache: Arc<dyn ResponseCache>,
    ) -> ProviderResult<Self> {
        let api_key = api_key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or(ProviderError::MissingApiKey)?;

        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            cache,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn cache(&self) -> &Arc<dyn ResponseCache> {
        &self.cache
    }

    fn search_key(request: &SearchRequest) -> String {
        format!(
            "search:{}:{}:{}:{}",
            request.query.trim().to_lowercase(),
            request.page_size,
            request.data_types.join(","),
            request.page_number
        )
    }

    fn food_key(fdc_id: i64, format: DetailFormat) -> String {
        format!("food:{}:{}", fdc_id, format.as_str())
    }

    /// GET (or POST with `body`) with retries on 429/5xx gateway errors
    async fn request(&self, url: &str, query: &[(&str, String)], body: Option<&Value>) -> ProviderResult<Value> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let builder = match body {
                Some(body) => self.http.post(url).json(body),
                None => self.http.get(url),
            };
            let result = builder
                .query(&[("api_key", self.api_key.as_str())])
                .query(query)
                .send()
                .await;

            let retry_reason = match result {
                Ok(response) if response.status().is_success() => return Ok(response.json().await?),
                Ok(response) if is_retryable(response.status()) => response.status().to_string(),
                Ok(response) => {
                    let status = response.status().as_u16();
                    let body = response.text().await.unwrap_or_default();
                    return Err(ProviderError::Status { status, body });
                }
                Err(e) if e.is_timeout() || e.is_connect() => e.to_string(),
                Err(e) => return Err(e.into()),
            };

            if attempt >= self.retry.max_attempts {
                warn!(url, attempts = attempt, reason = %retry_reason, "USDA request failed after retries");
                return Err(ProviderError::RetriesExhausted { attempts: attempt });
            }

            let delay = self.retry.backoff * 2u32.pow(attempt - 1);
            warn!(
                url,
                attempt,
                max_attempts = self.retry.max_attempts,
                reason = %retry_reason,
                delay_ms = delay.as_millis() as u64,
                "Retrying USDA request"
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn fetch_food(&self, fdc_id: i64, format: DetailFormat) -> ProviderResult<Value> {
        let key = Self::food_key(fdc_id, format);
        if let Some(cached) = self.cache.get(&key) {
            debug!(fdc_id, format = format.as_str(), "USDA food cache hit");
            return Ok(cached);
        }

        let url = format!("{}/food/{}", self.base_url, fdc_id);
        let query: Vec<(&str, String)> = match format {
            DetailFormat::Abridged => vec![("format", "abridged".to_string())],
            DetailFormat::Full => Vec::new(),
        };
        let value = self.request(&url, &query, None).await?;
        self.cache.set(&key, value.clone(), None);
        Ok(value)
    }
}

#[async_trait]
impl FoodSource for UsdaClient {
    async fn search(&self, request: &SearchRequest) -> ProviderResult<Vec<FoodSearchHit>> {
        let query = request.query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let key = Self::search_key(request);
        let response = match self.cache.get(&key) {
            Some(cached) => cached,
            None => {
                let url = format!("{}/foods/search", self.base_url);
                let mut params = vec![
                    ("query", query.to_string()),
                    ("pageSize", request.page_size.to_string()),
                    ("pageNumber", request.page_number.to_string()),
                ];
                params.extend(request.data_types.iter().map(|t| ("dataType", t.clone())));

                let response = match self.request(&url, &params, None).await {
                    // some queries are only accepted as a JSON body
                    Err(ProviderError::Status { status: 400, .. }) => {
                        let mut body = json!({
                            "query": query,
                            "pageSize": request.page_size,
                            "pageNumber": request.page_number,
                        });
                        if !request.data_types.is_empty() {
                            body["dataType"] = json!(request.data_types);
                        }
                        self.request(&url, &[], Some(&body)).await?
                    }
                    other => other?,
                };
                self.cache.set(&key, response.clone(), None);
                response
            }
        };

        let hits = parse_search(&response);
        info!(query, hits = hits.len(), "USDA search");
        Ok(hits)
    }

    async fn get_food(&self, fdc_id: i64) -> ProviderResult<RawFood> {
        let value = match self.fetch_food(fdc_id, DetailFormat::Abridged).await {
            Err(ProviderError::Status { status: 404, .. }) => {
                debug!(fdc_id, "Abridged format unavailable, fetching full record");
                match self.fetch_food(fdc_id, DetailFormat::Full).await {
                    Err(ProviderError::Status { status: 404, .. }) => return Err(ProviderError::NotFound(fdc_id)),
                    other => other?,
                }
            }
            other => other?,
        };

        parse_food(&value).ok_or_else(|| ProviderError::InvalidPayload(format!("food {fdc_id} has no fdcId")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::cache::InMemoryCache;

    fn client(cache: Arc<dyn ResponseCache>) -> UsdaClient {
        // unroutable address: any request that escapes the cache fails fast
        UsdaClient::new(Some("test-key".into()), "http://127.0.0.1:9/fdc/v1/", Duration::from_millis(200), cache)
            .unwrap()
            .with_retry(RetryPolicy {
                max_attempts: 1,
                backoff: Duration::ZERO,
            })
    }

    #[test]
    fn test_missing_api_key() {
        let cache: Arc<dyn ResponseCache> = Arc::new(InMemoryCache::default());
        let err = UsdaClient::new(Some("  ".into()), DEFAULT_BASE_URL, Duration::from_secs(1), cache)
            .err()
            .unwrap();
        assert!(matches!(err, ProviderError::MissingApiKey));
    }

    #[test]
    fn test_cache_keys() {
        let mut request = SearchRequest::new(" Cheddar ");
        request.data_types = vec!["Foundation".into(), "SR Legacy".into()];
        assert_eq!(UsdaClient::search_key(&request), "search:cheddar:25:Foundation,SR Legacy:1");
        assert_eq!(UsdaClient::food_key(42, DetailFormat::Full), "food:42:full");
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable(StatusCode::GATEWAY_TIMEOUT));
        assert!(!is_retryable(StatusCode::NOT_FOUND));
        assert!(!is_retryable(StatusCode::BAD_REQUEST));
    }

    #[tokio::test]
    async fn test_get_food_served_from_cache() {
        let cache: Arc<dyn ResponseCache> = Arc::new(InMemoryCache::default());
        cache.set(
            "food:171287:abridged",
            json!({
                "fdcId": 171287,
                "description": "Egg, whole, raw, fresh",
                "dataType": "SR Legacy",
                "foodNutrients": [{"name": "Protein", "amount": 12.56, "unitName": "G"}]
            }),
            None,
        );

        let raw = client(cache).get_food(171287).await.unwrap();
        assert_eq!(raw.description, "Egg, whole, raw, fresh");
        assert_eq!(raw.nutrient_records.len(), 1);
    }

    #[tokio::test]
    async fn test_search_served_from_cache() {
        let cache: Arc<dyn ResponseCache> = Arc::new(InMemoryCache::default());
        cache.set(
            "search:egg:25::1",
            json!({"foods": [{"fdcId": 1, "description": "Egg", "dataType": "Foundation"}]}),
            None,
        );

        let hits = client(cache).search(&SearchRequest::new("Egg")).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].fdc_id, 1);
    }

    #[tokio::test]
    async fn test_blank_search_skips_network() {
        let cache: Arc<dyn ResponseCache> = Arc::new(InMemoryCache::default());
        let hits = client(cache).search(&SearchRequest::new("   ")).await.unwrap();
        assert!(hits.is_empty());
    }
}
