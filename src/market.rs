//! Market data gateway: thin pass-through to Finnhub for quotes and symbol
//! search. No retries, no caching; every call hits the provider fresh.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://finnhub.io/api/v1";

/// Cap on search results returned to callers.
const SEARCH_RESULT_LIMIT: usize = 10;

#[derive(Debug, Error)]
pub enum MarketError {
    #[error("market data provider unavailable: {0}")]
    Upstream(String),
    #[error("no quote data for symbol {0}")]
    SymbolNotFound(String),
}

/// Quote snapshot, normalized from Finnhub's terse field names.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quote {
    pub current_price: f64,
    pub change: f64,
    pub percent_change: f64,
    pub high: f64,
    pub low: f64,
    pub open: f64,
    pub previous_close: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SymbolMatch {
    pub symbol: String,
    pub description: String,
}

/// Response from /quote.
#[derive(Debug, Deserialize)]
struct QuoteResponse {
    /// Current price
    c: Option<f64>,
    /// Change
    d: Option<f64>,
    /// Percent change
    dp: Option<f64>,
    /// High of the day
    h: Option<f64>,
    /// Low of the day
    l: Option<f64>,
    /// Open of the day
    o: Option<f64>,
    /// Previous close
    pc: Option<f64>,
}

/// Response from /search.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    result: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    symbol: String,
    description: String,
}

pub struct MarketDataClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl MarketDataClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    async fn fetch(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<String, MarketError> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!("finnhub request: {}", endpoint);

        let response = self
            .http
            .get(&url)
            .header("X-Finnhub-Token", &self.api_key)
            .query(params)
            .send()
            .await
            .map_err(|e| MarketError::Upstream(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MarketError::Upstream(format!("HTTP {status}")));
        }

        response
            .text()
            .await
            .map_err(|e| MarketError::Upstream(format!("failed to read response: {e}")))
    }

    /// Current quote for one symbol, normalized to full field names. The
    /// symbol is uppercased before querying.
    pub async fn get_quote(&self, symbol: &str) -> Result<Quote, MarketError> {
        let symbol = symbol.to_uppercase();
        let body = self.fetch("/quote", &[("symbol", symbol.as_str())]).await?;
        parse_quote(&body, &symbol)
    }

    /// Symbols matching `query`, filtered and capped. An empty query returns
    /// an empty list without touching the provider.
    pub async fn search_symbols(&self, query: &str) -> Result<Vec<SymbolMatch>, MarketError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let body = self.fetch("/search", &[("q", query)]).await?;
        let matches = parse_search(&body)?;
        Ok(filter_symbol_matches(matches, query))
    }
}

/// Parse a /quote body. Finnhub answers all-zero instead of erroring for
/// unknown symbols; that case surfaces as `SymbolNotFound`.
pub fn parse_quote(body: &str, symbol: &str) -> Result<Quote, MarketError> {
    let response: QuoteResponse = serde_json::from_str(body)
        .map_err(|e| MarketError::Upstream(format!("malformed quote response: {e}")))?;

    let current_price = response
        .c
        .ok_or_else(|| MarketError::Upstream("quote missing current price".to_string()))?;
    if current_price == 0.0 && response.o.unwrap_or(0.0) == 0.0 {
        return Err(MarketError::SymbolNotFound(symbol.to_string()));
    }

    Ok(Quote {
        current_price,
        change: response.d.unwrap_or(0.0),
        percent_change: response.dp.unwrap_or(0.0),
        high: response.h.unwrap_or(0.0),
        low: response.l.unwrap_or(0.0),
        open: response.o.unwrap_or(0.0),
        previous_close: response.pc.unwrap_or(0.0),
    })
}

/// Parse a /search body down to symbol + description pairs.
pub fn parse_search(body: &str) -> Result<Vec<SymbolMatch>, MarketError> {
    let response: SearchResponse = serde_json::from_str(body)
        .map_err(|e| MarketError::Upstream(format!("malformed search response: {e}")))?;
    Ok(response
        .result
        .into_iter()
        .map(|item| SymbolMatch {
            symbol: item.symbol,
            description: item.description,
        })
        .collect())
}

/// Keep matches whose symbol or description contains the query,
/// case-insensitive, capped at the result limit.
pub fn filter_symbol_matches(matches: Vec<SymbolMatch>, query: &str) -> Vec<SymbolMatch> {
    let needle = query.to_lowercase();
    matches
        .into_iter()
        .filter(|m| {
            m.symbol.to_lowercase().contains(&needle)
                || m.description.to_lowercase().contains(&needle)
        })
        .take(SEARCH_RESULT_LIMIT)
        .collect()
}
