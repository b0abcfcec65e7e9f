use std::path::PathBuf;

/// Every way a texture generation can fail. None of these are retried.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("an API key is required to generate textures (set --api-key or GEMINI_API_KEY)")]
    MissingCredential,
    #[error("generation prompt must not be empty")]
    EmptyPrompt,
    #[error("invalid generation endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
    #[error("invalid proxy address '{proxy}': {source}")]
    InvalidProxy {
        proxy: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to construct HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("failed to read reference image {path}: {source}")]
    ReadReference {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("generation request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("generation API returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("failed to decode generation response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("no image content generated{}", finish_reason_suffix(.reason))]
    NoContent { reason: Option<String> },
    #[error("generated image payload is not valid base64: {0}")]
    InvalidPayload(#[from] base64::DecodeError),
    #[error("failed to write generated texture to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn finish_reason_suffix(reason: &Option<String>) -> String {
    match reason {
        Some(reason) => format!(" (finish reason: {reason})"),
        None => String::new(),
    }
}
