//! Normalization from upstream response shapes into storage rows.
//!
//! Keeps the mapping logic out of the job loops so it can be unit tested
//! without a server or a database.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use pulse_db::{NewBrand, NewPost};
use pulse_metricool::{Platform, PostSummary, ProfileRecord, PublicationDate};
use serde_json::Value;

/// Maps an upstream brand profile onto the writable brand columns.
/// The full original JSON rides along as the raw snapshot.
pub(crate) fn brand_from_profile(record: &ProfileRecord) -> NewBrand {
    let profile = &record.profile;
    NewBrand {
        id: profile.id,
        label: profile
            .label
            .clone()
            .unwrap_or_else(|| format!("Brand {}", profile.id)),
        picture: profile.picture.clone(),
        timezone: profile.timezone.clone(),
        facebook_page_id: profile.facebook_page_id.clone(),
        facebook: profile.facebook.clone(),
        facebook_group_id: profile.facebook_group_id.clone(),
        facebook_ads: profile.facebook_ads.clone(),
        instagram: profile.instagram.clone(),
        instagram_business_id: profile.instagram_business_id.clone(),
        tiktok: profile.tiktok.clone(),
        tiktok_business_id: profile.tiktok_business_id.clone(),
        tiktok_ads: profile.tiktok_ads.clone(),
        linkedin: profile.linkedin.clone(),
        linkedin_company: profile.linkedin_company.clone(),
        youtube: profile.youtube.clone(),
        youtube_channel_id: profile.youtube_channel_id.clone(),
        pinterest: profile.pinterest.clone(),
        pinterest_business_id: profile.pinterest_business_id.clone(),
        twitter: profile.twitter.clone(),
        threads: profile.threads.clone(),
        bluesky: profile.bluesky.clone(),
        twitch: profile.twitch.clone(),
        raw_snapshot: record.raw.clone(),
    }
}

/// Maps a base post record (plus its matched detail record, if any) onto
/// the writable post columns.
pub(crate) fn post_from_summary(
    summary: &PostSummary,
    brand_id: i64,
    detail: Option<&Value>,
) -> NewPost {
    let platform = summary
        .network
        .as_deref()
        .map(|n| match Platform::from_network(n) {
            Some(p) => p.as_str().to_string(),
            None => n.to_ascii_lowercase(),
        })
        .unwrap_or_else(|| "unknown".to_string());

    let (published_at, timezone) = parse_publication(summary.publication_date.as_ref());

    NewPost {
        metricool_id: summary.id.clone(),
        brand_id,
        platform,
        content: summary.text.clone(),
        link: summary.link.clone(),
        picture: summary.picture.clone(),
        published_at,
        timezone,
        interactions: summary.metrics.interactions_or_zero(),
        impressions: summary.metrics.impressions_or_zero(),
        engagement_rate: summary.metrics.engagement_or_zero(),
        platform_detail: detail.cloned(),
    }
}

/// Parses the upstream publication timestamp. Accepts RFC 3339 or the bare
/// `YYYY-MM-DDTHH:MM:SS` form the API usually sends (taken as UTC).
/// Unparseable timestamps become `None`; the post is still stored.
fn parse_publication(date: Option<&PublicationDate>) -> (Option<DateTime<Utc>>, Option<String>) {
    let Some(date) = date else {
        return (None, None);
    };
    let parsed = date.date_time.as_deref().and_then(parse_timestamp);
    (parsed, date.timezone.clone())
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Indexes a platform's detail records by their natural-key field
/// (`reelId`, `businessId`, `videoId`, or `postId`), coercing numeric ids
/// to strings so they join against the base post ids. Records without the
/// key are dropped. Platforms without a detail endpoint index to empty.
pub(crate) fn detail_index(records: Vec<Value>, platform: Platform) -> HashMap<String, Value> {
    let Some(key) = platform.detail_key() else {
        return HashMap::new();
    };

    records
        .into_iter()
        .filter_map(|record| {
            let id = match record.get(key) {
                Some(Value::String(s)) => Some(s.clone()),
                Some(Value::Number(n)) => Some(n.to_string()),
                _ => None,
            };
            id.map(|id| (id, record))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(raw: Value) -> ProfileRecord {
        let profile = serde_json::from_value(raw.clone()).expect("profile should parse");
        ProfileRecord { profile, raw }
    }

    #[test]
    fn brand_label_falls_back_to_id() {
        let brand = brand_from_profile(&record(json!({ "id": 99 })));
        assert_eq!(brand.label, "Brand 99");
    }

    #[test]
    fn brand_keeps_raw_snapshot_verbatim() {
        let raw = json!({ "id": 5, "label": "Acme", "someFutureField": { "x": 1 } });
        let brand = brand_from_profile(&record(raw.clone()));
        assert_eq!(brand.raw_snapshot, raw);
        assert_eq!(brand.label, "Acme");
    }

    #[test]
    fn post_platform_normalizes_x_to_twitter() {
        let summary: PostSummary =
            serde_json::from_value(json!({ "id": "p-1", "network": "X" })).expect("post");
        let post = post_from_summary(&summary, 7, None);
        assert_eq!(post.platform, "twitter");
    }

    #[test]
    fn post_keeps_unknown_network_lowercased() {
        let summary: PostSummary =
            serde_json::from_value(json!({ "id": "p-2", "network": "Mastodon" })).expect("post");
        let post = post_from_summary(&summary, 7, None);
        assert_eq!(post.platform, "mastodon");
    }

    #[test]
    fn publication_parses_bare_and_rfc3339_timestamps() {
        let bare: PostSummary = serde_json::from_value(json!({
            "id": "a",
            "publicationDate": { "dateTime": "2025-06-01T12:30:00", "timezone": "Europe/Madrid" }
        }))
        .expect("post");
        let post = post_from_summary(&bare, 1, None);
        assert_eq!(
            post.published_at.map(|t| t.to_rfc3339()),
            Some("2025-06-01T12:30:00+00:00".to_string())
        );
        assert_eq!(post.timezone.as_deref(), Some("Europe/Madrid"));

        let rfc: PostSummary = serde_json::from_value(json!({
            "id": "b",
            "publicationDate": { "dateTime": "2025-06-01T12:30:00+02:00" }
        }))
        .expect("post");
        let post = post_from_summary(&rfc, 1, None);
        assert_eq!(
            post.published_at.map(|t| t.to_rfc3339()),
            Some("2025-06-01T10:30:00+00:00".to_string())
        );
    }

    #[test]
    fn garbled_timestamp_stores_post_without_date() {
        let summary: PostSummary = serde_json::from_value(json!({
            "id": "c",
            "publicationDate": { "dateTime": "yesterday-ish" }
        }))
        .expect("post");
        let post = post_from_summary(&summary, 1, None);
        assert!(post.published_at.is_none());
    }

    #[test]
    fn detail_index_coerces_numeric_keys_and_drops_keyless_records() {
        let index = detail_index(
            vec![
                json!({ "videoId": 123, "views": 9 }),
                json!({ "videoId": "456", "views": 2 }),
                json!({ "unrelated": true }),
            ],
            Platform::Tiktok,
        );
        assert_eq!(index.len(), 2);
        assert_eq!(index["123"]["views"], 9);
        assert_eq!(index["456"]["views"], 2);
    }

    #[test]
    fn detail_index_is_empty_for_platforms_without_detail_endpoint() {
        let index = detail_index(vec![json!({ "postId": "1" })], Platform::Youtube);
        assert!(index.is_empty());
    }
}
