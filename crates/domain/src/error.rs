/// Shared error type used across all DataForge crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP: {0}")]
    Http(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("provider {provider}: {message}")]
    Provider { provider: String, message: String },

    /// Model output contained no recoverable JSON object, even after the
    /// lenient repair pass. The display text is the exact string relayed
    /// to the client.
    #[error("AI response could not be parsed.")]
    Extraction,

    #[error("config: {0}")]
    Config(String),

    #[error("auth: {0}")]
    Auth(String),

    #[error("cluster: {0}")]
    Cluster(String),

    #[error("metrics: {0}")]
    Metrics(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
