use maillog_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid nonce secret: {0}")]
    InvalidSecret(String),
}
