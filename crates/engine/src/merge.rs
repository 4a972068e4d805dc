use std::collections::BTreeMap;

use reorder_core::{Instructions, PositionalName, RenamePlan};

use crate::error::EngineError;

/// Fold newly compiled instructions into the plan accumulated so far.
///
/// `existing` maps original names to the names the user currently sees;
/// `new` maps those current names onward. The result maps originals straight
/// to their final names. Keys of `new` are traced back through the inverse
/// of `existing` to find which original file currently holds them, so a name
/// that has already been reassigned once is never confused with the file
/// that held it originally. Entries that end where they started are pruned.
pub fn merge(existing: &RenamePlan, new: &Instructions) -> Result<RenamePlan, EngineError> {
    let holders = existing.inverse();
    let holder_of = |current: &PositionalName| -> Result<PositionalName, EngineError> {
        match holders.get(current) {
            Some(original) => Ok((*original).clone()),
            // Moved away and nobody moved in.
            None if existing.renames.contains_key(current) => Err(EngineError::InvalidOperation(
                format!("no item is currently named {current}"),
            )),
            None => Ok(current.clone()),
        }
    };

    let mut staged = BTreeMap::new();
    for (current, next) in &new.renames {
        staged.insert(holder_of(current)?, next.clone());
    }

    let mut renames = existing.renames.clone();
    for (original, next) in staged {
        if original == next {
            renames.remove(&original);
        } else {
            renames.insert(original, next);
        }
    }

    let mut deleted = existing.deleted.clone();
    if let Some(current) = &new.removed {
        deleted.insert(holder_of(current)?);
    }

    let merged = RenamePlan { renames, deleted };
    merged
        .validate()
        .map_err(|e| EngineError::InvalidOperation(format!("merge rejected: {e}")))?;
    Ok(merged)
}
