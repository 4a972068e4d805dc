use std::collections::{BTreeMap, BTreeSet};

use reorder_core::{CollectionId, PositionalName, RenameStep};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::linearize::{TempNames, order_moves, simulate};

/// Steps that renumber a collection to `1..N` under one extension.
///
/// Picks up every file whose extension is in `normalize_extensions`,
/// positional names first in slot order, then the rest by name. Each lands
/// on `<k>.<normalized_extension>`. An allowed file that renumbering would
/// not pick up refuses the whole run, since leaving it in place could clash
/// with the new numbers.
pub fn normalize(
    collection: &CollectionId,
    listing: &[String],
    config: &EngineConfig,
) -> Result<Vec<RenameStep>, EngineError> {
    let unsupported: Vec<String> = listing
        .iter()
        .filter(|name| config.accepts(name) && !config.normalizes(name))
        .cloned()
        .collect();
    if !unsupported.is_empty() {
        return Err(EngineError::UnsupportedFiles {
            collection: collection.to_string(),
            files: unsupported,
        });
    }

    let mut sources: Vec<&String> = listing.iter().filter(|name| config.normalizes(name)).collect();
    sources.sort_by(|a, b| order_key(a).cmp(&order_key(b)));

    let moves: BTreeMap<String, String> = sources
        .iter()
        .enumerate()
        .map(|(idx, from)| (from.to_string(), format!("{}.{}", idx + 1, config.normalized_extension)))
        .filter(|(from, to)| from != to)
        .collect();

    let present: BTreeSet<&str> = listing.iter().map(String::as_str).collect();
    let mut temps = TempNames::new(&config.temp_prefix, &present);
    for to in moves.values() {
        temps.reserve(to.clone());
    }
    let steps = order_moves(&moves, &mut temps);

    simulate(listing, &steps)
        .map_err(|e| EngineError::InvalidOperation(format!("cannot renumber {collection}: {e}")))?;
    tracing::debug!(%collection, files = sources.len(), steps = steps.len(), "renumbering planned");
    Ok(steps)
}

fn order_key(name: &str) -> (u8, u32, &str) {
    match name.parse::<PositionalName>() {
        Ok(positional) => (0, positional.number(), name),
        Err(_) => (1, 0, name),
    }
}
