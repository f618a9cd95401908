use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Backend returned status {status}: {details}")]
    Status { status: u16, details: String },

    #[error("Failed to decode response: {details}")]
    Decode { details: String },

    #[error("Invalid backend URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Stream error: {details}")]
    Stream { details: String },
}

impl ApiError {
    pub fn status(status: reqwest::StatusCode, details: impl Into<String>) -> Self {
        Self::Status {
            status: status.as_u16(),
            details: details.into(),
        }
    }
}
