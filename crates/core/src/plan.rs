use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use crate::error::CoreError;
use crate::ids::CollectionId;
use crate::name::PositionalName;

/// Accumulated, not yet executed renames for one collection.
///
/// `renames` maps *original on-disk* names straight to their final names;
/// entries never map a name onto itself. `deleted` lists originals that are
/// pending physical deletion: they still resolve through `renames` (to the
/// tail) but are hidden from the effective view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenamePlan {
    #[serde(default)]
    pub renames: BTreeMap<PositionalName, PositionalName>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub deleted: BTreeSet<PositionalName>,
}

impl RenamePlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.renames.is_empty() && self.deleted.is_empty()
    }

    /// Final name of an original, following the single composed entry.
    pub fn resolve<'a>(&'a self, original: &'a PositionalName) -> &'a PositionalName {
        self.renames.get(original).unwrap_or(original)
    }

    /// Final name -> original, for every entry.
    pub fn inverse(&self) -> HashMap<&PositionalName, &PositionalName> {
        self.renames.iter().map(|(from, to)| (to, from)).collect()
    }

    /// Reject plans that no sequence of renames could realize.
    pub fn validate(&self) -> Result<(), CoreError> {
        let mut targets: HashMap<&PositionalName, &PositionalName> = HashMap::new();
        for (from, to) in &self.renames {
            if from == to {
                return Err(CoreError::InvalidData(format!("no-op entry {from} -> {to}")));
            }
            if let Some(other) = targets.insert(to, from) {
                return Err(CoreError::InvalidData(format!(
                    "{other} and {from} both rename to {to}"
                )));
            }
        }
        Ok(())
    }

    pub fn to_msgpack(&self) -> Result<Vec<u8>, CoreError> {
        rmp_serde::to_vec_named(self).map_err(|e| CoreError::Serialization(e.to_string()))
    }

    pub fn from_msgpack(bytes: &[u8]) -> Result<Self, CoreError> {
        rmp_serde::from_slice(bytes).map_err(|e| CoreError::Serialization(e.to_string()))
    }
}

/// Every collection's plan; the unit of persistence and export.
pub type PlanSnapshot = BTreeMap<CollectionId, RenamePlan>;

/// One atomic step for a storage executor. Names are raw filenames because
/// temporary holders are not positional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RenameStep {
    Rename { from: String, to: String },
    Delete { name: String },
}

impl fmt::Display for RenameStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rename { from, to } => write!(f, "rename {from} -> {to}"),
            Self::Delete { name } => write!(f, "delete {name}"),
        }
    }
}

/// Per-step report sent back by a storage executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepOutcome {
    Done,
    Failed(String),
    /// Not attempted because an earlier step failed.
    Skipped,
}

impl StepOutcome {
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(raw: &str) -> PositionalName {
        raw.parse().unwrap()
    }

    #[test]
    fn validate_rejects_merging_targets() {
        let mut plan = RenamePlan::new();
        plan.renames.insert(name("1.jpg"), name("3.jpg"));
        plan.renames.insert(name("2.jpg"), name("3.jpg"));
        assert!(plan.validate().is_err());
    }

    #[test]
    fn validate_rejects_self_entries() {
        let mut plan = RenamePlan::new();
        plan.renames.insert(name("1.jpg"), name("1.jpg"));
        assert!(plan.validate().is_err());
    }

    #[test]
    fn swap_plan_is_valid_and_resolves_in_one_step() {
        let mut plan = RenamePlan::new();
        plan.renames.insert(name("1.jpg"), name("3.jpg"));
        plan.renames.insert(name("3.jpg"), name("1.jpg"));
        plan.validate().unwrap();
        assert_eq!(plan.resolve(&name("1.jpg")), &name("3.jpg"));
        assert_eq!(plan.resolve(&name("2.jpg")), &name("2.jpg"));
    }

    #[test]
    fn json_shape_matches_export_document() {
        let mut plan = RenamePlan::new();
        plan.renames.insert(name("2.jpg"), name("1.jpg"));
        let json = serde_json::to_string(&plan).unwrap();
        assert_eq!(json, r#"{"renames":{"2.jpg":"1.jpg"}}"#);

        plan.deleted.insert(name("1.jpg"));
        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json["deleted"][0], "1.jpg");
    }

    #[test]
    fn msgpack_roundtrip() {
        let mut plan = RenamePlan::new();
        plan.renames.insert(name("1.png"), name("2.png"));
        plan.deleted.insert(name("3.jpg"));
        let bytes = plan.to_msgpack().unwrap();
        assert_eq!(RenamePlan::from_msgpack(&bytes).unwrap(), plan);
    }

    #[test]
    fn steps_serialize_tagged() {
        let step = RenameStep::Rename {
            from: "1.jpg".into(),
            to: "2.jpg".into(),
        };
        let json = serde_json::to_string(&step).unwrap();
        assert_eq!(json, r#"{"kind":"rename","from":"1.jpg","to":"2.jpg"}"#);
        assert_eq!(step.to_string(), "rename 1.jpg -> 2.jpg");
    }
}
