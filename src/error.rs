use thiserror::Error;

/// Failures of the remote package-metadata layer.
///
/// None of these abort a refresh: callers log them and carry on without the
/// affected batch or identifier.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("batch of {size} identifiers exceeds the maximum of {max}")]
    BatchTooLarge { size: usize, max: usize },

    #[error("malformed dependency coordinate `{0}`, expected groupId:artifactId")]
    MalformedCoordinate(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("invalid XML: {0}")]
    Xml(#[from] quick_xml::Error),
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("cannot read model file: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot parse model file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("model shape mismatch: {0}")]
    Shape(String),
}
