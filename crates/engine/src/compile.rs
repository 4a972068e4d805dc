use std::collections::{BTreeMap, HashMap};

use reorder_core::{Instructions, Item, ItemId, Operation, PositionalName, Sequence};

use crate::error::EngineError;

/// Derive the renames that realize `op` on `before`.
///
/// Returns the sequence as the user now sees it together with the mapping
/// from current names to new names. Unchanged items produce no entry. A
/// deleted item is not dropped from the mapping: it is sent to the slot of
/// the old last position (`N_after + 1`) so the physical delete can happen
/// later, and its current name is reported in `removed`.
pub fn compile(before: &Sequence, op: Operation) -> Result<(Sequence, Instructions), EngineError> {
    let (after, removed) = match op {
        Operation::Swap { a, b } => {
            let first = item_at(before, a)?;
            let second = item_at(before, b)?;
            (before.swap(first.id, second.id)?, None)
        }
        Operation::Move { from, to } => {
            let item = item_at(before, from)?;
            (before.move_item(item.id, to)?, None)
        }
        Operation::DeleteAt { position } => {
            let item = item_at(before, position)?;
            (before.remove_and_compact(item.id)?, Some(item))
        }
    };

    let previous: HashMap<ItemId, &PositionalName> = before
        .items()
        .iter()
        .map(|item| (item.id, &item.name))
        .collect();

    let mut renames = BTreeMap::new();
    for item in after.items() {
        if let Some(&old) = previous.get(&item.id) {
            if *old != item.name {
                renames.insert(old.clone(), item.name.clone());
            }
        }
    }

    if let Some(item) = removed {
        if let Some(tail) = before.slot_name(before.len(), item) {
            if tail != item.name {
                renames.insert(item.name.clone(), tail);
            }
        }
    }

    let instructions = Instructions {
        renames,
        removed: removed.map(|item| item.name.clone()),
    };
    Ok((after, instructions))
}

fn item_at(sequence: &Sequence, position: usize) -> Result<&Item, EngineError> {
    sequence.item_at(position).ok_or_else(|| {
        EngineError::InvalidOperation(format!(
            "no item at position {position} (collection has {})",
            sequence.len()
        ))
    })
}
