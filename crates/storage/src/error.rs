use reorder_core::RenamePlan;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    /// `plan` is the stored plan when it decoded but failed validation.
    #[error("stored plan for {collection} is corrupt: {reason}")]
    CorruptPlan {
        collection: String,
        reason: String,
        plan: Option<Box<RenamePlan>>,
    },

    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("core error: {0}")]
    Core(#[from] reorder_core::CoreError),
}
