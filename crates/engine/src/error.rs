use reorder_core::{CoreError, RenamePlan};
use reorder_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// The operation referenced something not in the current view. Nothing
    /// changed.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// The collection cannot be edited until its plan is discarded. `plan` is
    /// the offending plan when it could be decoded.
    #[error("corrupt plan for {collection}: {reason}")]
    CorruptPlan {
        collection: String,
        reason: String,
        plan: Option<Box<RenamePlan>>,
    },

    /// Renumbering found images it would not rename. Nothing was touched.
    #[error("{collection} holds files that cannot be renumbered: {}", files.join(", "))]
    UnsupportedFiles { collection: String, files: Vec<String> },

    /// The plan store rejected a write. The in-memory plan is still current.
    #[error("failed to persist plan: {0}")]
    PersistenceFailure(#[source] StorageError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("config error: {0}")]
    Config(String),

    #[error("core error: {0}")]
    Core(CoreError),
}

impl From<CoreError> for EngineError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidOperation(msg) => Self::InvalidOperation(msg),
            other => Self::Core(other),
        }
    }
}

impl EngineError {
    pub(crate) fn corrupt(collection: &impl ToString, reason: impl Into<String>, plan: &RenamePlan) -> Self {
        Self::CorruptPlan {
            collection: collection.to_string(),
            reason: reason.into(),
            plan: Some(Box::new(plan.clone())),
        }
    }

    pub fn is_invalid_operation(&self) -> bool {
        matches!(self, Self::InvalidOperation(_))
    }
}
