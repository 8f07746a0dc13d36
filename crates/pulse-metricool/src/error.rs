use thiserror::Error;

/// Errors returned by the Metricool API client.
#[derive(Debug, Error)]
pub enum MetricoolError {
    /// Network or TLS failure, or a non-2xx HTTP status.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The request could not be built or the response had an unexpected shape.
    #[error("Metricool API error: {0}")]
    ApiError(String),

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}
