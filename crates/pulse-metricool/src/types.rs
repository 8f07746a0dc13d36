//! Metricool API response types.
//!
//! Brand profiles arrive as a bare JSON array with ~60 optional camelCase
//! fields whose types are not stable across networks (ids may be strings
//! or numbers). [`BrandProfile`] types only the fields the sync pipeline
//! reads; [`ProfileRecord`] pairs that typed view with the untouched
//! original JSON so nothing is lost.

use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Social networks the pipeline knows how to join detail data for, plus
/// the remaining networks brand profiles can be connected to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Facebook,
    Instagram,
    Tiktok,
    Linkedin,
    Youtube,
    Pinterest,
    Twitter,
}

impl Platform {
    /// Parses the `network` field of a post record. Unknown networks map to
    /// `None`; their posts are still stored, just never enriched.
    #[must_use]
    pub fn from_network(network: &str) -> Option<Self> {
        match network.to_ascii_lowercase().as_str() {
            "facebook" => Some(Self::Facebook),
            "instagram" => Some(Self::Instagram),
            "tiktok" => Some(Self::Tiktok),
            "linkedin" => Some(Self::Linkedin),
            "youtube" => Some(Self::Youtube),
            "pinterest" => Some(Self::Pinterest),
            "twitter" | "x" => Some(Self::Twitter),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Facebook => "facebook",
            Self::Instagram => "instagram",
            Self::Tiktok => "tiktok",
            Self::Linkedin => "linkedin",
            Self::Youtube => "youtube",
            Self::Pinterest => "pinterest",
            Self::Twitter => "twitter",
        }
    }

    /// The natural-key field name in this platform's detail records, for the
    /// four platforms that have a detail endpoint.
    #[must_use]
    pub fn detail_key(self) -> Option<&'static str> {
        match self {
            Self::Facebook => Some("reelId"),
            Self::Instagram => Some("businessId"),
            Self::Tiktok => Some("videoId"),
            Self::Linkedin => Some("postId"),
            _ => None,
        }
    }
}

/// A brand profile record: the typed subset plus the full original JSON.
#[derive(Debug, Clone)]
pub struct ProfileRecord {
    pub profile: BrandProfile,
    pub raw: Value,
}

/// The typed subset of a Metricool brand profile.
///
/// Upstream ids arrive inconsistently as strings or numbers depending on
/// the network; every optional field goes through the lenient string
/// deserializer so a numeric `instagramBusinessId` does not fail the
/// whole brand list.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandProfile {
    pub id: i64,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub picture: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub timezone: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub facebook_page_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub facebook: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub facebook_group_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub facebook_ads: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub instagram: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub instagram_business_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub tiktok: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub tiktok_business_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub tiktok_ads: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub linkedin: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub linkedin_company: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub youtube: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub youtube_channel_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub pinterest: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub pinterest_business_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub twitter: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub threads: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub bluesky: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub twitch: Option<String>,
}

impl BrandProfile {
    /// Derives which networks this brand is connected to by presence-testing
    /// the network-specific fields. Not persisted as a column; display logic
    /// consumes it (or re-derives it from the raw snapshot).
    #[must_use]
    pub fn connected_platforms(&self) -> Vec<Platform> {
        let mut connected = Vec::new();

        let any = |fields: &[&Option<String>]| fields.iter().any(|f| f.is_some());

        if any(&[
            &self.facebook_page_id,
            &self.facebook,
            &self.facebook_group_id,
            &self.facebook_ads,
        ]) {
            connected.push(Platform::Facebook);
        }
        if any(&[&self.instagram, &self.instagram_business_id]) {
            connected.push(Platform::Instagram);
        }
        if any(&[&self.tiktok, &self.tiktok_business_id, &self.tiktok_ads]) {
            connected.push(Platform::Tiktok);
        }
        if any(&[&self.linkedin, &self.linkedin_company]) {
            connected.push(Platform::Linkedin);
        }
        if any(&[&self.youtube, &self.youtube_channel_id]) {
            connected.push(Platform::Youtube);
        }
        if any(&[&self.pinterest, &self.pinterest_business_id]) {
            connected.push(Platform::Pinterest);
        }
        if self.twitter.is_some() {
            connected.push(Platform::Twitter);
        }

        connected
    }
}

/// Envelope used by the post endpoints: `{"data": [...]}`.
#[derive(Debug, Deserialize)]
pub struct DataEnvelope<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

/// A base post record from the brand-summary endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostSummary {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default)]
    pub network: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub picture: Option<String>,
    #[serde(default)]
    pub publication_date: Option<PublicationDate>,
    #[serde(default)]
    pub metrics: PostMetrics,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicationDate {
    #[serde(default)]
    pub date_time: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
}

/// Engagement metrics on a base post. Absent metrics default to zero,
/// never null — the dashboards do arithmetic on these.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostMetrics {
    #[serde(rename = "INTERACTIONS", default)]
    pub interactions: Option<f64>,
    #[serde(rename = "IMPRESSIONS", default)]
    pub impressions: Option<f64>,
    #[serde(rename = "ENGAGEMENT", default)]
    pub engagement: Option<f64>,
}

impl PostMetrics {
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn interactions_or_zero(&self) -> i32 {
        self.interactions.unwrap_or(0.0) as i32
    }

    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn impressions_or_zero(&self) -> i32 {
        self.impressions.unwrap_or(0.0) as i32
    }

    #[must_use]
    pub fn engagement_or_zero(&self) -> f64 {
        self.engagement.unwrap_or(0.0)
    }
}

/// An inclusive date range passed to the post endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateWindow {
    /// The fixed trailing window ending today (UTC).
    #[must_use]
    pub fn trailing_days(days: i64) -> Self {
        let to = Utc::now().date_naive();
        Self {
            from: to - Duration::days(days),
            to,
        }
    }

    #[must_use]
    pub fn from_param(&self) -> String {
        format!("{}T00:00:00", self.from.format("%Y-%m-%d"))
    }

    #[must_use]
    pub fn to_param(&self) -> String {
        format!("{}T23:59:59", self.to.format("%Y-%m-%d"))
    }
}

/// Accepts a string, number, or bool where the schema nominally says string.
fn lenient_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(coerce_string))
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    coerce_string(value).ok_or_else(|| serde::de::Error::custom("expected string or number"))
}

fn coerce_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_with_only_instagram_business_id_is_connected_to_instagram() {
        let profile: BrandProfile = serde_json::from_value(serde_json::json!({
            "id": 7,
            "label": "Acme",
            "instagramBusinessId": 17_841_400_000_000_i64
        }))
        .expect("profile should parse");

        assert_eq!(profile.instagram_business_id.as_deref(), Some("17841400000000"));
        assert_eq!(profile.connected_platforms(), vec![Platform::Instagram]);
    }

    #[test]
    fn profile_facebook_connection_is_any_of_four_fields() {
        let profile: BrandProfile = serde_json::from_value(serde_json::json!({
            "id": 1,
            "facebookAds": "act_123"
        }))
        .expect("profile should parse");

        assert_eq!(profile.connected_platforms(), vec![Platform::Facebook]);
    }

    #[test]
    fn profile_with_no_network_fields_has_no_connections() {
        let profile: BrandProfile =
            serde_json::from_value(serde_json::json!({ "id": 2, "label": "Empty" }))
                .expect("profile should parse");

        assert!(profile.connected_platforms().is_empty());
    }

    #[test]
    fn post_metrics_default_to_zero_when_absent() {
        let post: PostSummary = serde_json::from_value(serde_json::json!({
            "id": 42,
            "network": "instagram"
        }))
        .expect("post should parse");

        assert_eq!(post.id, "42");
        assert_eq!(post.metrics.interactions_or_zero(), 0);
        assert_eq!(post.metrics.impressions_or_zero(), 0);
        assert!(post.metrics.engagement_or_zero().abs() < f64::EPSILON);
    }

    #[test]
    fn post_metrics_parse_uppercase_keys() {
        let post: PostSummary = serde_json::from_value(serde_json::json!({
            "id": "p-1",
            "network": "facebook",
            "metrics": { "INTERACTIONS": 12.0, "IMPRESSIONS": 340.0, "ENGAGEMENT": 3.5 }
        }))
        .expect("post should parse");

        assert_eq!(post.metrics.interactions_or_zero(), 12);
        assert_eq!(post.metrics.impressions_or_zero(), 340);
        assert!((post.metrics.engagement_or_zero() - 3.5).abs() < f64::EPSILON);
    }

    #[test]
    fn detail_keys_match_platform_natural_ids() {
        assert_eq!(Platform::Facebook.detail_key(), Some("reelId"));
        assert_eq!(Platform::Instagram.detail_key(), Some("businessId"));
        assert_eq!(Platform::Tiktok.detail_key(), Some("videoId"));
        assert_eq!(Platform::Linkedin.detail_key(), Some("postId"));
        assert_eq!(Platform::Youtube.detail_key(), None);
    }

    #[test]
    fn date_window_params_are_iso8601_day_bounds() {
        let window = DateWindow {
            from: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            to: NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
        };
        assert_eq!(window.from_param(), "2025-01-01T00:00:00");
        assert_eq!(window.to_param(), "2025-01-31T23:59:59");
    }

    #[test]
    fn trailing_window_spans_requested_days() {
        let window = DateWindow::trailing_days(30);
        assert_eq!(window.to - window.from, Duration::days(30));
    }
}
