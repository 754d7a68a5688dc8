use thiserror::Error;

/// Infrastructure failures. Rejected operations are not errors; see `Outcome`.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("storage failure: {0:#}")]
    Storage(anyhow::Error),

    #[error("failed to serialize directory: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl From<anyhow::Error> for DirectoryError {
    fn from(err: anyhow::Error) -> Self {
        Self::Storage(err)
    }
}
