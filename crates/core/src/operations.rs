use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::name::PositionalName;

/// A user manipulation of the effective view, addressed by 1-based position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    Swap { a: usize, b: usize },
    Move { from: usize, to: usize },
    DeleteAt { position: usize },
}

impl Operation {
    pub fn op_type_name(&self) -> &'static str {
        match self {
            Self::Swap { .. } => "swap",
            Self::Move { .. } => "move",
            Self::DeleteAt { .. } => "delete_at",
        }
    }
}

/// Renames compiled from one operation, keyed by *current effective* name.
///
/// `removed` is the current name of an item the operation deleted from the
/// view. Its rename entry (if any) sends it to the vacated tail slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instructions {
    pub renames: BTreeMap<PositionalName, PositionalName>,
    pub removed: Option<PositionalName>,
}

impl Instructions {
    pub fn is_empty(&self) -> bool {
        self.renames.is_empty() && self.removed.is_none()
    }
}
