use std::collections::{BTreeMap, BTreeSet};

use reorder_core::{PositionalName, RenamePlan, RenameStep, StepOutcome};

/// Which original file sits under which name after some steps ran.
///
/// Built from the listing a plan was linearized against, then advanced by
/// the steps a storage executor reported as done. Files parked under a
/// temporary name are still tracked, so nothing drops out of the
/// collection when execution stops half way.
#[derive(Debug, Clone, Default)]
pub struct Holdings {
    held: BTreeMap<String, PositionalName>,
    present: BTreeSet<String>,
}

/// A plan rewritten against the names storage holds now.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rebased {
    pub plan: RenamePlan,
    /// Files still under a non-positional name, left out of `plan`.
    pub stranded: Vec<String>,
}

impl Holdings {
    pub fn from_listing(listing: &[String]) -> Self {
        let held = listing
            .iter()
            .filter_map(|raw| Some((raw.clone(), raw.parse::<PositionalName>().ok()?)))
            .collect();
        Self {
            held,
            present: listing.iter().cloned().collect(),
        }
    }

    /// Advance past every step whose outcome is `Done`.
    pub fn record(&mut self, steps: &[RenameStep], outcomes: &[StepOutcome]) {
        for (step, outcome) in steps.iter().zip(outcomes) {
            if !outcome.is_done() {
                continue;
            }
            match step {
                RenameStep::Rename { from, to } => {
                    self.present.remove(from);
                    self.present.insert(to.clone());
                    if let Some(original) = self.held.remove(from) {
                        self.held.insert(to.clone(), original);
                    }
                }
                RenameStep::Delete { name } => {
                    self.present.remove(name);
                    self.held.remove(name);
                }
            }
        }
    }

    /// Files held under names that do not parse as positional.
    pub fn parked(&self) -> Vec<(&str, &PositionalName)> {
        self.held
            .iter()
            .filter(|(name, _)| name.parse::<PositionalName>().is_err())
            .map(|(name, original)| (name.as_str(), original))
            .collect()
    }

    /// Renames that move each parked file back under a free positional name.
    ///
    /// Prefers the file's final name, then its original name, then any other
    /// slot the plan touches. A slot is free when no present file holds its
    /// number. A cycle that stopped half way always leaves one free.
    pub fn repairs(&self, plan: &RenamePlan) -> Vec<RenameStep> {
        let mut taken: BTreeSet<u32> = self
            .present
            .iter()
            .filter_map(|name| name.parse::<PositionalName>().ok())
            .map(|name| name.number())
            .collect();
        let spare: BTreeSet<u32> = plan
            .renames
            .iter()
            .flat_map(|(from, to)| [from.number(), to.number()])
            .collect();

        let mut steps = Vec::new();
        for (parked, original) in self.parked() {
            let free = [plan.resolve(original).clone(), original.clone()]
                .into_iter()
                .chain(spare.iter().map(|number| original.with_number(*number)))
                .find(|candidate| !taken.contains(&candidate.number()));
            if let Some(name) = free {
                taken.insert(name.number());
                steps.push(RenameStep::Rename {
                    from: parked.to_string(),
                    to: name.to_string(),
                });
            }
        }
        steps
    }

    /// Re-key `plan` by current name. Files that already reached their final
    /// name drop out; completed deletions disappear from `deleted`.
    pub fn rebase(&self, plan: &RenamePlan) -> Rebased {
        let mut rebased = Rebased::default();
        for (name, original) in &self.held {
            let Ok(current) = name.parse::<PositionalName>() else {
                rebased.stranded.push(name.clone());
                continue;
            };
            let target = plan.resolve(original);
            if plan.deleted.contains(original) {
                rebased.plan.deleted.insert(current.clone());
            }
            if current != *target {
                rebased.plan.renames.insert(current, target.clone());
            }
        }
        rebased
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn rename(from: &str, to: &str) -> RenameStep {
        RenameStep::Rename {
            from: from.into(),
            to: to.into(),
        }
    }

    fn swap_plan() -> RenamePlan {
        let mut plan = RenamePlan::new();
        plan.renames.insert("1.jpg".parse().unwrap(), "2.jpg".parse().unwrap());
        plan.renames.insert("2.jpg".parse().unwrap(), "1.jpg".parse().unwrap());
        plan
    }

    #[test]
    fn parked_file_returns_to_its_original_name() {
        let mut holdings = Holdings::from_listing(&listing(&["1.jpg", "2.jpg"]));
        holdings.record(
            &[rename("1.jpg", "~t1.jpg"), rename("2.jpg", "1.jpg")],
            &[StepOutcome::Done, StepOutcome::Failed("io".into())],
        );
        assert_eq!(holdings.parked().len(), 1);

        let repairs = holdings.repairs(&swap_plan());
        assert_eq!(repairs, vec![rename("~t1.jpg", "1.jpg")]);

        holdings.record(&repairs, &[StepOutcome::Done]);
        let rebased = holdings.rebase(&swap_plan());
        assert_eq!(rebased.plan, swap_plan());
        assert!(rebased.stranded.is_empty());
    }

    #[test]
    fn parked_file_finishes_when_its_target_is_free() {
        let mut holdings = Holdings::from_listing(&listing(&["1.jpg", "2.jpg"]));
        holdings.record(
            &[rename("1.jpg", "~t1.jpg"), rename("2.jpg", "1.jpg")],
            &[StepOutcome::Done, StepOutcome::Done],
        );
        let repairs = holdings.repairs(&swap_plan());
        assert_eq!(repairs, vec![rename("~t1.jpg", "2.jpg")]);
        holdings.record(&repairs, &[StepOutcome::Done]);
        assert!(holdings.rebase(&swap_plan()).plan.is_empty());
    }

    #[test]
    fn spare_slot_keeps_the_parked_extension() {
        let mut plan = RenamePlan::new();
        plan.renames.insert("1.png".parse().unwrap(), "3.png".parse().unwrap());
        plan.renames.insert("2.jpg".parse().unwrap(), "1.jpg".parse().unwrap());
        plan.renames.insert("3.jpg".parse().unwrap(), "2.jpg".parse().unwrap());

        let mut holdings = Holdings::from_listing(&listing(&["1.png", "2.jpg", "3.jpg"]));
        holdings.record(
            &[rename("1.png", "~t1.png"), rename("2.jpg", "1.jpg")],
            &[StepOutcome::Done, StepOutcome::Done],
        );
        let repairs = holdings.repairs(&plan);
        assert_eq!(repairs, vec![rename("~t1.png", "2.png")]);

        holdings.record(&repairs, &[StepOutcome::Done]);
        let rebased = holdings.rebase(&plan);
        let entries: Vec<String> = rebased.plan.renames.iter().map(|(f, t)| format!("{f}->{t}")).collect();
        assert_eq!(entries, vec!["2.png->3.png", "3.jpg->2.jpg"]);
    }

    #[test]
    fn unrepaired_file_is_reported_stranded() {
        let mut holdings = Holdings::from_listing(&listing(&["1.jpg", "2.jpg", "notes.txt"]));
        holdings.record(&[rename("1.jpg", "~t1.jpg")], &[StepOutcome::Done]);
        let rebased = holdings.rebase(&swap_plan());
        assert_eq!(rebased.stranded, vec!["~t1.jpg"]);
        let entries: Vec<(String, String)> = rebased
            .plan
            .renames
            .iter()
            .map(|(f, t)| (f.to_string(), t.to_string()))
            .collect();
        assert_eq!(entries, vec![("2.jpg".to_string(), "1.jpg".to_string())]);
    }

    #[test]
    fn completed_deletions_leave_the_plan() {
        let mut plan = RenamePlan::new();
        plan.renames.insert("1.jpg".parse().unwrap(), "3.jpg".parse().unwrap());
        plan.renames.insert("2.jpg".parse().unwrap(), "1.jpg".parse().unwrap());
        plan.renames.insert("3.jpg".parse().unwrap(), "2.jpg".parse().unwrap());
        plan.deleted.insert("1.jpg".parse().unwrap());

        let mut holdings = Holdings::from_listing(&listing(&["1.jpg", "2.jpg", "3.jpg"]));
        holdings.record(
            &[RenameStep::Delete { name: "1.jpg".into() }, rename("2.jpg", "1.jpg")],
            &[StepOutcome::Done, StepOutcome::Done],
        );
        let rebased = holdings.rebase(&plan);
        assert!(rebased.plan.deleted.is_empty());
        assert_eq!(rebased.plan.renames.len(), 1);
        assert_eq!(rebased.plan.resolve(&"3.jpg".parse().unwrap()).to_string(), "2.jpg");
    }
}
