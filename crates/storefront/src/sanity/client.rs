//! Sanity HTTP API client implementation.
//!
//! Reads go through the query endpoint (optionally the API CDN) and are
//! cached using `moka` (5-minute TTL). Writes go through the mutate endpoint
//! with the write token and are never cached.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use medpro_core::{
    OrderConfirmation, OrderId, OrderRecord, OrderSink, PricingSettings, Product, ProductQuery,
    ProductRef, ProductSource, SettingsSource, SettingsUnavailable, SinkError, SourceError,
};

use crate::config::SanityConfig;

use super::SanityError;
use super::cache::{CacheKey, CacheValue};
use super::conversions::{convert_order, convert_product, convert_settings, generate_order_number};
use super::queries;
use super::types::{
    ErrorResponse, Mutation, MutationRequest, MutationResponse, QueryResponse, SanityProduct,
    SanityStoreSettings,
};

const CACHE_CAPACITY: u64 = 1000;
const CACHE_TTL: Duration = Duration::from_secs(300);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const ERROR_BODY_PREVIEW: usize = 500;

/// Client for the Sanity HTTP API.
///
/// Cheap to clone; all clones share the HTTP connection pool and cache.
#[derive(Clone)]
pub struct SanityClient {
    inner: Arc<SanityClientInner>,
}

struct SanityClientInner {
    client: reqwest::Client,
    query_url: Url,
    mutate_url: Url,
    write_token: SecretString,
    cache: Cache<CacheKey, CacheValue>,
}

impl std::fmt::Debug for SanityClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SanityClient")
            .field("query_url", &self.inner.query_url.as_str())
            .field("mutate_url", &self.inner.mutate_url.as_str())
            .finish_non_exhaustive()
    }
}

/// Build the query and mutate endpoint URLs for a project.
///
/// # Errors
///
/// Returns an error if the configured values do not form a valid URL.
pub fn endpoint_urls(config: &SanityConfig) -> Result<(Url, Url), url::ParseError> {
    let version = config.api_version.trim_start_matches('v');
    let read_host = if config.use_cdn {
        "apicdn.sanity.io"
    } else {
        "api.sanity.io"
    };

    let query_url = Url::parse(&format!(
        "https://{}.{read_host}/v{version}/data/query/{}",
        config.project_id, config.dataset
    ))?;
    // Mutations are never served by the CDN.
    let mutate_url = Url::parse(&format!(
        "https://{}.api.sanity.io/v{version}/data/mutate/{}?returnIds=true",
        config.project_id, config.dataset
    ))?;

    Ok((query_url, mutate_url))
}

impl SanityClient {
    /// Create a new Sanity API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint URLs are invalid or the HTTP client
    /// cannot be built.
    pub fn new(config: &SanityConfig) -> Result<Self, SanityError> {
        let (query_url, mutate_url) = endpoint_urls(config)?;

        let cache = Cache::builder()
            .max_capacity(CACHE_CAPACITY)
            .time_to_live(CACHE_TTL)
            .build();

        let client = reqwest::Client::builder()
            .user_agent(concat!("medpro-storefront/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            inner: Arc::new(SanityClientInner {
                client,
                query_url,
                mutate_url,
                write_token: config.write_token.clone(),
                cache,
            }),
        })
    }

    /// Run a GROQ query and decode its `result`.
    async fn query<T: DeserializeOwned>(
        &self,
        groq: &str,
        params: &[(&str, String)],
    ) -> Result<T, SanityError> {
        let mut pairs: Vec<(String, String)> = Vec::with_capacity(params.len() + 1);
        pairs.push(("query".to_string(), groq.to_string()));
        for (name, value) in params {
            // Parameter values are JSON literals.
            pairs.push((
                format!("${name}"),
                serde_json::Value::String(value.clone()).to_string(),
            ));
        }

        let response = self
            .inner
            .client
            .get(self.inner.query_url.clone())
            .query(&pairs)
            .send()
            .await?;
        let body = read_body(response).await?;

        match serde_json::from_str::<QueryResponse<T>>(&body) {
            Ok(parsed) => Ok(parsed.result),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    body = %preview(&body),
                    "Failed to parse Sanity query response"
                );
                Err(SanityError::Parse(e))
            }
        }
    }

    /// Create a document and return its generated ID.
    async fn create<T: Serialize + Sync>(&self, document: &T) -> Result<String, SanityError> {
        let request = MutationRequest {
            mutations: vec![Mutation::Create(document)],
        };

        let response = self
            .inner
            .client
            .post(self.inner.mutate_url.clone())
            .bearer_auth(self.inner.write_token.expose_secret())
            .json(&request)
            .send()
            .await?;
        let body = read_body(response).await?;

        let parsed: MutationResponse = serde_json::from_str(&body)?;
        debug!(transaction_id = ?parsed.transaction_id, "Mutation committed");
        parsed
            .results
            .into_iter()
            .next()
            .map(|r| r.id)
            .ok_or(SanityError::MissingDocumentId)
    }

    /// Get a product by document ID or slug.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get_product(&self, id: &ProductRef) -> Result<Option<Product>, SanityError> {
        if id.is_blank() {
            return Ok(None);
        }

        let cache_key = CacheKey::Product(id.clone());
        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(product.map(|p| *p));
        }

        let raw: Option<SanityProduct> = self
            .query(&queries::product_by_id(), &[("id", id.to_string())])
            .await?;

        let product = raw.and_then(|raw| {
            let doc_id = raw.id.clone();
            convert_product(raw)
                .inspect_err(|reason| {
                    tracing::warn!(doc_id = %doc_id, reason = %reason, "Skipping unusable product");
                })
                .ok()
        });

        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(product.clone().map(Box::new)))
            .await;

        Ok(product)
    }

    /// List products matching `query`.
    ///
    /// Documents that cannot be converted (no title or price) are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn get_products(&self, query: &ProductQuery) -> Result<Vec<Product>, SanityError> {
        let cache_key = CacheKey::Products(query.clone());
        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product listing");
            return Ok(products);
        }

        let listing = queries::product_listing(query);
        let raw: Vec<SanityProduct> = self.query(&listing.groq, &listing.params).await?;

        let products: Vec<Product> = raw
            .into_iter()
            .filter_map(|raw| {
                let doc_id = raw.id.clone();
                match convert_product(raw) {
                    Ok(product) => Some(product),
                    Err(reason) => {
                        tracing::warn!(doc_id = %doc_id, reason = %reason, "Skipping unusable product");
                        None
                    }
                }
            })
            .collect();

        self.inner
            .cache
            .insert(cache_key, CacheValue::Products(products.clone()))
            .await;

        Ok(products)
    }

    /// Fetch the `storeSettings` document as effective pricing settings.
    ///
    /// Returns `Ok(None)` when no settings document exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn get_pricing_settings(&self) -> Result<Option<PricingSettings>, SanityError> {
        if let Some(CacheValue::Settings(settings)) =
            self.inner.cache.get(&CacheKey::Settings).await
        {
            debug!("Cache hit for store settings");
            return Ok(Some(settings));
        }

        let raw: Option<SanityStoreSettings> = self.query(queries::STORE_SETTINGS, &[]).await?;
        let Some(raw) = raw else {
            return Ok(None);
        };

        let settings = convert_settings(raw);
        self.inner
            .cache
            .insert(CacheKey::Settings, CacheValue::Settings(settings.clone()))
            .await;

        Ok(Some(settings))
    }

    /// Create an `order` document.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or the mutation is refused.
    #[instrument(skip(self, order), fields(items = order.items().len()))]
    pub async fn create_order(
        &self,
        order: &OrderRecord,
    ) -> Result<OrderConfirmation, SanityError> {
        let order_number = generate_order_number(order.order_date());
        let document = convert_order(order, &order_number);

        let id = self.create(&document).await?;
        tracing::info!(order_id = %id, order_number = %order_number, "Order created");

        Ok(OrderConfirmation {
            order_id: OrderId::new(id),
            order_number,
        })
    }

    /// Cheap round trip used by the readiness check.
    ///
    /// # Errors
    ///
    /// Returns an error if the API cannot be reached.
    pub async fn ping(&self) -> Result<(), SanityError> {
        self.query::<serde_json::Value>(queries::PING, &[])
            .await
            .map(|_| ())
    }
}

/// Turn a response into its body text, mapping failure statuses to errors.
async fn read_body(response: reqwest::Response) -> Result<String, SanityError> {
    let status = response.status();

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(1);
        return Err(SanityError::RateLimited(retry_after));
    }

    let body = response.text().await?;

    if !status.is_success() {
        tracing::error!(
            status = %status,
            body = %preview(&body),
            "Sanity API returned non-success status"
        );
        return Err(SanityError::Api {
            status: status.as_u16(),
            message: error_message(&body),
        });
    }

    Ok(body)
}

/// Best-effort extraction of the `{error}` message from a failure body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorResponse>(body).map_or_else(
        |_| preview(body),
        |parsed| parsed.error.message(),
    )
}

fn preview(body: &str) -> String {
    body.chars().take(ERROR_BODY_PREVIEW).collect()
}

#[async_trait]
impl ProductSource for SanityClient {
    async fn product(&self, id: &ProductRef) -> Result<Option<Product>, SourceError> {
        self.get_product(id)
            .await
            .map_err(|e| SourceError(e.to_string()))
    }

    async fn products(&self, query: &ProductQuery) -> Result<Vec<Product>, SourceError> {
        self.get_products(query)
            .await
            .map_err(|e| SourceError(e.to_string()))
    }
}

#[async_trait]
impl SettingsSource for SanityClient {
    async fn pricing_settings(&self) -> Result<PricingSettings, SettingsUnavailable> {
        match self.get_pricing_settings().await {
            Ok(Some(settings)) => Ok(settings),
            Ok(None) => Err(SettingsUnavailable(
                "no storeSettings document".to_string(),
            )),
            Err(e) => Err(SettingsUnavailable(e.to_string())),
        }
    }

    async fn ping(&self) -> Result<(), SettingsUnavailable> {
        SanityClient::ping(self)
            .await
            .map_err(|e| SettingsUnavailable(e.to_string()))
    }
}

#[async_trait]
impl OrderSink for SanityClient {
    async fn submit(&self, order: &OrderRecord) -> Result<OrderConfirmation, SinkError> {
        self.create_order(order).await.map_err(|e| {
            let rejected = e.is_rejection();
            match e {
                SanityError::Api { message, .. } if rejected => SinkError::Rejected(message),
                other => SinkError::Unavailable(other.to_string()),
            }
        })
    }
}
