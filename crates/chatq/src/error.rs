use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize configuration: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error(transparent)]
    Api(#[from] chatq_core::api::ApiError),

    #[error(transparent)]
    Store(#[from] chatq_core::session::StoreError),

    #[error(transparent)]
    Core(#[from] chatq_core::error::Error),
}
