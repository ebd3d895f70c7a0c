use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReindexError>;

#[derive(Debug, Error)]
pub enum ReindexError {
    #[error("missing config items: {}", .missing.join(", "))]
    ConfigInvalid { missing: Vec<&'static str> },

    #[error("token exchange failed: {0}")]
    Auth(String),

    #[error("action \"{action}\" failed with status {status}")]
    Api { action: &'static str, status: u16 },

    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected response body: {0}")]
    Decode(String),
}
