use thiserror::Error;

#[derive(Error, Debug)]
pub enum MagpieError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid hunt request: {0}")]
    InvalidRequest(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Hunt {0} not found")]
    HuntNotFound(i64),

    #[error("Item {item_id} not found in hunt {hunt_id}")]
    ItemNotFound { hunt_id: i64, item_id: u32 },

    #[error("Item serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
