use std::collections::{BTreeMap, BTreeSet};

use reorder_core::{CollectionId, RenamePlan, RenameStep};
use thiserror::Error;

use crate::error::EngineError;

/// Order the plan into atomic steps that never make two files share a name.
///
/// Pending deletions go first, which frees their names. The remaining
/// renames split into chains and cycles. A chain runs tail first so each
/// target is already vacant; a cycle parks one member under a temporary name,
/// shifts the rest, then moves the parked file into the last vacated name.
/// Entries whose source is not in `listing` are skipped. The result is
/// replayed against `listing` before it is returned.
pub fn linearize(
    collection: &CollectionId,
    listing: &[String],
    plan: &RenamePlan,
    temp_prefix: &str,
) -> Result<Vec<RenameStep>, EngineError> {
    plan.validate()
        .map_err(|e| EngineError::corrupt(collection, e.to_string(), plan))?;

    let present: BTreeSet<&str> = listing.iter().map(String::as_str).collect();

    let mut steps: Vec<RenameStep> = plan
        .deleted
        .iter()
        .map(|name| name.to_string())
        .filter(|name| present.contains(name.as_str()))
        .map(|name| RenameStep::Delete { name })
        .collect();

    let moves: BTreeMap<String, String> = plan
        .renames
        .iter()
        .filter(|(from, _)| !plan.deleted.contains(*from))
        .map(|(from, to)| (from.to_string(), to.to_string()))
        .filter(|(from, _)| present.contains(from.as_str()))
        .collect();

    let mut temps = TempNames::new(temp_prefix, &present);
    for (from, to) in &plan.renames {
        temps.reserve(from.to_string());
        temps.reserve(to.to_string());
    }
    steps.extend(order_moves(&moves, &mut temps));

    simulate(listing, &steps).map_err(|e| EngineError::corrupt(collection, e.to_string(), plan))?;
    Ok(steps)
}

/// Rename steps for an injective `source -> target` mapping of raw names.
///
/// Chains start at a source nothing moves into and run tail first. What is
/// left after the chains are cut is a set of cycles, each broken through one
/// name drawn from `temps`.
pub(crate) fn order_moves(moves: &BTreeMap<String, String>, temps: &mut TempNames<'_>) -> Vec<RenameStep> {
    let targets: BTreeSet<&String> = moves.values().collect();
    let mut placed: BTreeSet<&String> = BTreeSet::new();
    let mut steps = Vec::new();

    for start in moves.keys().filter(|from| !targets.contains(from)) {
        let mut path = vec![start];
        let mut cursor = start;
        while let Some(next) = moves.get(cursor) {
            path.push(next);
            if !moves.contains_key(next) {
                break;
            }
            cursor = next;
        }
        for pair in path.windows(2).rev() {
            steps.push(rename(pair[0], pair[1]));
            placed.insert(pair[0]);
        }
    }

    for start in moves.keys() {
        if placed.contains(start) {
            continue;
        }
        let mut cycle = vec![start];
        let mut cursor = &moves[start];
        while cursor != start {
            cycle.push(cursor);
            cursor = &moves[cursor];
        }
        placed.extend(cycle.iter().copied());

        let temp = temps.next_for(start);
        steps.push(rename(start, &temp));
        for idx in (1..cycle.len()).rev() {
            steps.push(rename(cycle[idx], cycle[(idx + 1) % cycle.len()]));
        }
        steps.push(rename(&temp, cycle[1]));
    }
    steps
}

fn rename(from: &str, to: &str) -> RenameStep {
    RenameStep::Rename {
        from: from.to_string(),
        to: to.to_string(),
    }
}

/// Temporary holder names that clash with nothing reserved.
pub(crate) struct TempNames<'a> {
    prefix: &'a str,
    taken: BTreeSet<String>,
    counter: u32,
}

impl<'a> TempNames<'a> {
    pub(crate) fn new(prefix: &'a str, present: &BTreeSet<&str>) -> Self {
        Self {
            prefix,
            taken: present.iter().map(|s| s.to_string()).collect(),
            counter: 0,
        }
    }

    pub(crate) fn reserve(&mut self, name: String) {
        self.taken.insert(name);
    }

    fn next_for(&mut self, holder: &str) -> String {
        let ext = holder.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
        loop {
            self.counter += 1;
            let candidate = if ext.is_empty() {
                format!("{}{}", self.prefix, self.counter)
            } else {
                format!("{}{}.{ext}", self.prefix, self.counter)
            };
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimulationError {
    #[error("step {step}: {name} does not exist")]
    Missing { step: usize, name: String },

    #[error("step {step}: {name} is already taken")]
    Occupied { step: usize, name: String },
}

/// Replay steps against a set of names, returning the names left at the end.
pub fn simulate(listing: &[String], steps: &[RenameStep]) -> Result<BTreeSet<String>, SimulationError> {
    let mut names: BTreeSet<String> = listing.iter().cloned().collect();
    for (step, op) in steps.iter().enumerate() {
        match op {
            RenameStep::Rename { from, to } => {
                if !names.remove(from) {
                    return Err(SimulationError::Missing {
                        step,
                        name: from.clone(),
                    });
                }
                if !names.insert(to.clone()) {
                    return Err(SimulationError::Occupied {
                        step,
                        name: to.clone(),
                    });
                }
            }
            RenameStep::Delete { name } => {
                if !names.remove(name) {
                    return Err(SimulationError::Missing {
                        step,
                        name: name.clone(),
                    });
                }
            }
        }
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PREFIX: &str = "__tmp_";

    fn sku() -> CollectionId {
        CollectionId::new("sku-1").unwrap()
    }

    fn listing(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn plan(entries: &[(&str, &str)]) -> RenamePlan {
        let mut plan = RenamePlan::new();
        for (from, to) in entries {
            plan.renames.insert(from.parse().unwrap(), to.parse().unwrap());
        }
        plan
    }

    fn printed(steps: &[RenameStep]) -> Vec<String> {
        steps.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn swap_uses_one_temporary() {
        let files = listing(&["1.jpg", "2.jpg", "3.jpg"]);
        let steps = linearize(&sku(), &files, &plan(&[("1.jpg", "3.jpg"), ("3.jpg", "1.jpg")]), PREFIX).unwrap();
        assert_eq!(
            printed(&steps),
            vec![
                "rename 1.jpg -> __tmp_1.jpg",
                "rename 3.jpg -> 1.jpg",
                "rename __tmp_1.jpg -> 3.jpg",
            ]
        );
    }

    #[test]
    fn chain_runs_tail_first() {
        let files = listing(&["1.jpg", "2.jpg"]);
        let steps = linearize(&sku(), &files, &plan(&[("1.jpg", "2.jpg"), ("2.jpg", "3.jpg")]), PREFIX).unwrap();
        assert_eq!(printed(&steps), vec!["rename 2.jpg -> 3.jpg", "rename 1.jpg -> 2.jpg"]);
    }

    #[test]
    fn three_cycle_ends_in_place() {
        let files = listing(&["1.jpg", "2.jpg", "3.jpg"]);
        let p = plan(&[("1.jpg", "2.jpg"), ("2.jpg", "3.jpg"), ("3.jpg", "1.jpg")]);
        let steps = linearize(&sku(), &files, &p, PREFIX).unwrap();
        assert_eq!(steps.len(), 4);
        let finals = simulate(&files, &steps).unwrap();
        assert_eq!(finals, files.iter().cloned().collect::<BTreeSet<_>>());
    }

    #[test]
    fn deletions_run_first_and_skip_their_renames() {
        let files = listing(&["1.jpg", "2.jpg", "3.jpg"]);
        let mut p = plan(&[("2.jpg", "3.jpg"), ("3.jpg", "2.jpg")]);
        p.deleted.insert("2.jpg".parse().unwrap());
        let steps = linearize(&sku(), &files, &p, PREFIX).unwrap();
        assert_eq!(printed(&steps), vec!["delete 2.jpg", "rename 3.jpg -> 2.jpg"]);
    }

    #[test]
    fn temporary_avoids_listed_names() {
        let files = listing(&["1.jpg", "2.jpg", "__tmp_1.jpg"]);
        let steps = linearize(&sku(), &files, &plan(&[("1.jpg", "2.jpg"), ("2.jpg", "1.jpg")]), PREFIX).unwrap();
        assert_eq!(printed(&steps)[0], "rename 1.jpg -> __tmp_2.jpg");
    }

    #[test]
    fn missing_sources_are_skipped() {
        let files = listing(&["1.jpg"]);
        let steps = linearize(&sku(), &files, &plan(&[("1.jpg", "2.jpg"), ("2.jpg", "1.jpg")]), PREFIX).unwrap();
        assert_eq!(printed(&steps), vec!["rename 1.jpg -> 2.jpg"]);
    }

    #[test]
    fn blocked_chain_tail_is_corrupt() {
        let files = listing(&["1.jpg", "2.jpg"]);
        let err = linearize(&sku(), &files, &plan(&[("1.jpg", "2.jpg")]), PREFIX).unwrap_err();
        assert!(matches!(err, EngineError::CorruptPlan { .. }));
    }

    #[test]
    fn simulation_errors_name_the_step() {
        let err = SimulationError::Missing {
            step: 2,
            name: "4.jpg".into(),
        };
        assert_eq!(err.to_string(), "step 2: 4.jpg does not exist");
    }

    #[test]
    fn simulate_reports_collisions() {
        let files = listing(&["1.jpg", "2.jpg"]);
        let steps = vec![RenameStep::Rename {
            from: "1.jpg".into(),
            to: "2.jpg".into(),
        }];
        assert_eq!(
            simulate(&files, &steps),
            Err(SimulationError::Occupied {
                step: 0,
                name: "2.jpg".into()
            })
        );
    }
}
