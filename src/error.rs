use thiserror::Error;

#[derive(Debug, Error)]
pub enum WxError {
    /// The request never completed.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// The provider answered but had nothing for the query.
    #[error("no match for '{0}'")]
    NoMatch(String),

    #[error("malformed response: {0}")]
    Decode(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("city '{0}' has no location key")]
    MissingKey(String),

    #[error("no AccuWeather API key configured (use --api-key or ACCUWEATHER_API_KEY)")]
    MissingApiKey,
}

impl From<std::io::Error> for WxError {
    fn from(err: std::io::Error) -> Self {
        WxError::Storage(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, WxError>;
