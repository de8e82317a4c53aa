use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShopError {
    /// Non-2xx upstream status. The body is echoed for diagnostics.
    #[error("http {status}: {body}")]
    Http { status: u16, body: String },
    #[error("network: {0}")]
    Net(#[from] reqwest::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    /// Missing/invalid credentials or shop domain. Raised before any network
    /// call is made.
    #[error("config: {0}")]
    Config(String),
    /// The walker's throttle policy ran out of attempts while the upstream
    /// kept answering 429.
    #[error("throttled: gave up after {attempts} attempts")]
    ThrottleExhausted { attempts: u32 },
    #[error("upstream: {0}")]
    Other(String),
}
