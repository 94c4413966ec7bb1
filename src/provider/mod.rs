//! Food-data provider
//!
//! Fetches raw food records from an external database and hands them to the
//! normalizer. Transport, retries and caching live here, outside the core.

pub mod cache;
pub mod payload;
pub mod usda;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::DataType;
use crate::nutrition::RawFood;

pub use cache::{InMemoryCache, NullCache, ResponseCache};
pub use usda::{ProviderError, ProviderResult, UsdaClient};

/// Default number of search hits per page
pub const DEFAULT_PAGE_SIZE: u32 = 25;

/// Food search parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub page_size: u32,
    /// Restrict to these upstream data-type labels; empty means all
    pub data_types: Vec<String>,
    /// 1-based
    pub page_number: u32,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            page_size: DEFAULT_PAGE_SIZE,
            data_types: Vec::new(),
            page_number: 1,
        }
    }
}

/// One search result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FoodSearchHit {
    pub fdc_id: i64,
    pub description: String,
    pub data_type: DataType,
    pub brand: Option<String>,
}

/// Source of raw food records
#[async_trait]
pub trait FoodSource: Send + Sync {
    /// Search foods; hits sorted by data-type priority
    async fn search(&self, request: &SearchRequest) -> ProviderResult<Vec<FoodSearchHit>>;

    /// Fetch one food's detail record
    async fn get_food(&self, fdc_id: i64) -> ProviderResult<RawFood>;
}
