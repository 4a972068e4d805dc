use std::collections::{BTreeSet, HashMap};

use reorder_core::{CollectionId, PositionalName, RenamePlan, Sequence};

use crate::error::EngineError;

/// A listed file and the name it ends up with once the plan is executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    pub original: PositionalName,
    pub effective: PositionalName,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Visible items, in effective order.
    pub live: Vec<ResolvedFile>,
    /// Still present in storage but deleted by the user.
    pub pending_deletion: Vec<ResolvedFile>,
    /// Listed names that are not positional.
    pub ignored: Vec<String>,
}

impl Reconciliation {
    pub fn effective_names(&self) -> Vec<PositionalName> {
        self.live.iter().map(|file| file.effective.clone()).collect()
    }

    pub fn to_sequence(&self) -> Result<Sequence, EngineError> {
        Ok(Sequence::from_names(self.effective_names())?)
    }
}

/// Replay `plan` over a raw, unordered listing.
///
/// Plan entries already map originals to final names, so each file resolves
/// with a single lookup. Fails with `CorruptPlan` when the plan is not a
/// valid permutation or when two listed files would end up in the same slot.
pub fn reconcile(
    collection: &CollectionId,
    listing: &[String],
    plan: &RenamePlan,
) -> Result<Reconciliation, EngineError> {
    plan.validate()
        .map_err(|e| EngineError::corrupt(collection, e.to_string(), plan))?;

    let mut originals = BTreeSet::new();
    let mut ignored = Vec::new();
    for raw in listing {
        match raw.parse::<PositionalName>() {
            Ok(name) => {
                originals.insert(name);
            }
            Err(_) => ignored.push(raw.clone()),
        }
    }
    ignored.sort();
    ignored.dedup();

    let mut slots: HashMap<u32, &PositionalName> = HashMap::new();
    let mut resolved = Vec::with_capacity(originals.len());
    for original in &originals {
        let effective = plan.resolve(original);
        if let Some(other) = slots.insert(effective.number(), original) {
            return Err(EngineError::corrupt(
                collection,
                format!("{other} and {original} both resolve to slot {}", effective.number()),
                plan,
            ));
        }
        resolved.push(ResolvedFile {
            original: original.clone(),
            effective: effective.clone(),
        });
    }
    resolved.sort_by(|a, b| a.effective.cmp(&b.effective));

    let missing = plan
        .renames
        .keys()
        .filter(|name| !originals.contains(*name))
        .count();
    if missing > 0 {
        tracing::debug!(%collection, missing, "plan entries without a listed file");
    }

    let (pending_deletion, live): (Vec<_>, Vec<_>) = resolved
        .into_iter()
        .partition(|file| plan.deleted.contains(&file.original));

    Ok(Reconciliation {
        live,
        pending_deletion,
        ignored,
    })
}
