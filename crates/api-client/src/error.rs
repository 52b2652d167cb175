use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Failed to send the HTTP request: {0}")]
    RequestBuild(#[from] reqwest::Error),

    #[error("The collector returned HTTP {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Invalid collector URL '{0}'")]
    InvalidUrl(String),

    #[error("The sink rejected the delivery: {0}")]
    Rejected(String),
}
