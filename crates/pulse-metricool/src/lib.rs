//! HTTP client for the Metricool analytics API.
//!
//! The upstream API is an opaque HTTP data source with inconsistent,
//! network-specific schemas: the brand list is a bare JSON array of
//! camelCase profile objects with dozens of optional fields, while the
//! post endpoints wrap their payloads in a `{"data": [...]}` envelope.
//! Only the fields this system actively reads are typed; every record's
//! full original JSON is preserved alongside the typed view.

mod client;
mod error;
mod types;

pub use client::MetricoolClient;
pub use error::MetricoolError;
pub use types::{
    BrandProfile, DateWindow, Platform, PostMetrics, PostSummary, ProfileRecord, PublicationDate,
};
