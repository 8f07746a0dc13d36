//! HTTP client for the Metricool REST API.
//!
//! Wraps `reqwest` with Metricool-specific auth (the `X-Auth` header plus a
//! `userId` query parameter), URL construction, and typed response
//! deserialization. All failure modes the upstream exhibits — non-2xx
//! status, network error, non-JSON body — surface as [`MetricoolError`].

use std::time::Duration;

use reqwest::{Client, Url};
use serde_json::Value;

use crate::error::MetricoolError;
use crate::types::{DataEnvelope, DateWindow, PostSummary, ProfileRecord};

const DEFAULT_BASE_URL: &str = "https://app.metricool.com/";

const PROFILES_PATH: &str = "admin/simpleProfiles";
const POSTS_PATH: &str = "v2/analytics/brand-summary/posts";
const FACEBOOK_REELS_PATH: &str = "v2/analytics/reels/facebook";
const INSTAGRAM_REELS_PATH: &str = "v2/analytics/reels/instagram";
const TIKTOK_POSTS_PATH: &str = "v2/analytics/posts/tiktok";
const LINKEDIN_POSTS_PATH: &str = "v2/analytics/posts/linkedin";

/// Client for the Metricool REST API.
///
/// Holds the HTTP client plus the credential pair (access token and numeric
/// account id) loaded from the credentials store. Use [`MetricoolClient::new`]
/// for production or [`MetricoolClient::with_base_url`] to point at a mock
/// server in tests.
pub struct MetricoolClient {
    client: Client,
    access_token: String,
    account_id: String,
    base_url: Url,
}

impl MetricoolClient {
    /// Creates a new client pointed at the production Metricool API.
    ///
    /// # Errors
    ///
    /// Returns [`MetricoolError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        access_token: &str,
        account_id: &str,
        timeout_secs: u64,
    ) -> Result<Self, MetricoolError> {
        Self::with_base_url(access_token, account_id, timeout_secs, DEFAULT_BASE_URL)
    }

    /// Creates a new client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`MetricoolError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`MetricoolError::ApiError`] if `base_url`
    /// is not a valid URL.
    pub fn with_base_url(
        access_token: &str,
        account_id: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, MetricoolError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("pulse/0.1 (analytics-sync)")
            .build()?;

        // Normalise: ensure the base URL ends with exactly one slash so that
        // Url::join treats it as a directory rather than replacing the last
        // path segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised)
            .map_err(|e| MetricoolError::ApiError(format!("invalid base URL '{base_url}': {e}")))?;

        Ok(Self {
            client,
            access_token: access_token.to_owned(),
            account_id: account_id.to_owned(),
            base_url,
        })
    }

    /// Fetches the full brand profile list for the account.
    ///
    /// The endpoint returns a bare JSON array. Each entry is parsed into the
    /// typed [`BrandProfile`](crate::types::BrandProfile) subset while the
    /// original JSON is kept verbatim; entries that fail the typed parse
    /// (e.g. missing `id`) are skipped with a warning rather than failing
    /// the whole list.
    ///
    /// # Errors
    ///
    /// - [`MetricoolError::Http`] on network failure or non-2xx HTTP status.
    /// - [`MetricoolError::Deserialize`] if the body is not valid JSON.
    /// - [`MetricoolError::ApiError`] if the body is JSON but not an array.
    pub async fn list_brand_profiles(&self) -> Result<Vec<ProfileRecord>, MetricoolError> {
        let url = self.build_url(PROFILES_PATH, &[]);
        let body = self.request_json(&url).await?;

        let Value::Array(entries) = body else {
            return Err(MetricoolError::ApiError(
                "simpleProfiles response is not a JSON array".to_string(),
            ));
        };

        let mut records = Vec::with_capacity(entries.len());
        for entry in entries {
            match serde_json::from_value(entry.clone()) {
                Ok(profile) => records.push(ProfileRecord { profile, raw: entry }),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unparseable brand profile entry");
                }
            }
        }

        Ok(records)
    }

    /// Fetches the base post list for a brand over a date window.
    ///
    /// # Errors
    ///
    /// - [`MetricoolError::Http`] on network failure or non-2xx HTTP status.
    /// - [`MetricoolError::Deserialize`] if the response does not match the
    ///   `{"data": [...]}` envelope.
    pub async fn list_posts(
        &self,
        brand_id: i64,
        window: &DateWindow,
        timezone: &str,
    ) -> Result<Vec<PostSummary>, MetricoolError> {
        let envelope: DataEnvelope<PostSummary> = self
            .fetch_windowed(POSTS_PATH, brand_id, window, timezone)
            .await?;
        Ok(envelope.data)
    }

    /// Fetches Facebook reel detail records for a brand over a date window.
    /// Records are returned as raw JSON; the caller joins them by `reelId`.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Self::list_posts`].
    pub async fn facebook_reels(
        &self,
        brand_id: i64,
        window: &DateWindow,
        timezone: &str,
    ) -> Result<Vec<Value>, MetricoolError> {
        self.fetch_detail(FACEBOOK_REELS_PATH, brand_id, window, timezone)
            .await
    }

    /// Fetches Instagram reel detail records, joined downstream by `businessId`.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Self::list_posts`].
    pub async fn instagram_reels(
        &self,
        brand_id: i64,
        window: &DateWindow,
        timezone: &str,
    ) -> Result<Vec<Value>, MetricoolError> {
        self.fetch_detail(INSTAGRAM_REELS_PATH, brand_id, window, timezone)
            .await
    }

    /// Fetches TikTok post detail records, joined downstream by `videoId`.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Self::list_posts`].
    pub async fn tiktok_posts(
        &self,
        brand_id: i64,
        window: &DateWindow,
        timezone: &str,
    ) -> Result<Vec<Value>, MetricoolError> {
        self.fetch_detail(TIKTOK_POSTS_PATH, brand_id, window, timezone)
            .await
    }

    /// Fetches LinkedIn post detail records, joined downstream by `postId`.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Self::list_posts`].
    pub async fn linkedin_posts(
        &self,
        brand_id: i64,
        window: &DateWindow,
        timezone: &str,
    ) -> Result<Vec<Value>, MetricoolError> {
        self.fetch_detail(LINKEDIN_POSTS_PATH, brand_id, window, timezone)
            .await
    }

    async fn fetch_detail(
        &self,
        path: &str,
        brand_id: i64,
        window: &DateWindow,
        timezone: &str,
    ) -> Result<Vec<Value>, MetricoolError> {
        let envelope: DataEnvelope<Value> =
            self.fetch_windowed(path, brand_id, window, timezone).await?;
        Ok(envelope.data)
    }

    async fn fetch_windowed<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        brand_id: i64,
        window: &DateWindow,
        timezone: &str,
    ) -> Result<DataEnvelope<T>, MetricoolError> {
        let url = self.build_url(
            path,
            &[
                ("from", &window.from_param()),
                ("to", &window.to_param()),
                ("timezone", timezone),
                ("blogId", &brand_id.to_string()),
            ],
        );
        let body = self.request_json(&url).await?;
        serde_json::from_value(body).map_err(|e| MetricoolError::Deserialize {
            context: format!("{path}(blogId={brand_id})"),
            source: e,
        })
    }

    /// Builds the full request URL with properly percent-encoded query
    /// parameters. The `userId` account parameter is appended to every call.
    fn build_url(&self, path: &str, extra: &[(&str, &str)]) -> Url {
        let mut url = self
            .base_url
            .join(path)
            .unwrap_or_else(|_| self.base_url.clone());
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("userId", &self.account_id);
            for (k, v) in extra {
                pairs.append_pair(k, v);
            }
        }
        url
    }

    /// Sends a GET request with the `X-Auth` header, asserts a 2xx HTTP
    /// status, and parses the response body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`MetricoolError::Http`] on network failure or a non-2xx status.
    /// Returns [`MetricoolError::Deserialize`] if the body is not valid JSON.
    async fn request_json(&self, url: &Url) -> Result<Value, MetricoolError> {
        let response = self
            .client
            .get(url.clone())
            .header("X-Auth", &self.access_token)
            .send()
            .await?;
        let response = response.error_for_status()?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| MetricoolError::Deserialize {
            context: url.to_string(),
            source: e,
        })
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
