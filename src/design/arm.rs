use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::design::cell::StudyCell;
use crate::design::element::{Element, NonTreatmentType, Treatment};
use crate::design::plan::SampleAndAssayPlan;
use crate::error::IsaError;
use crate::model::{Characteristic, OntologyAnnotation};

static DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());

pub const COMPLETE_ARM_ERROR: &str =
    "StudyArm complete. No more cells can be added after a FOLLOW-UP cell.";
pub const SCREEN_ERROR: &str = "A SCREEN cell can only be inserted into an empty arm_map.";
pub const RUN_IN_ERROR: &str =
    "A RUN-IN cell can only be inserted into an arm_map containing a SCREEN.";
pub const WASHOUT_ERROR: &str =
    "A WASHOUT cell cannot be put next to a cell ending with a non-treatment element.";
pub const FOLLOW_UP_EMPTY_ARM_ERROR: &str = "A FOLLOW-UP cell cannot be put into an empty StudyArm.";
pub const FOLLOW_UP_ERROR: &str = "A FOLLOW-UP cell cannot be put next to a SCREEN or a RUN-IN cell.";

/// Subjects default to human study subjects.
pub fn default_source_type() -> Characteristic {
    Characteristic::new(
        OntologyAnnotation::sourced(
            "Study Subject",
            "NCIT",
            "http://purl.obolibrary.org/obo/NCIT_C41189",
        ),
        OntologyAnnotation::sourced("Human", "NCIT", "http://purl.obolibrary.org/obo/NCIT_C14225"),
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArmEntry {
    pub cell: StudyCell,
    pub plan: Option<SampleAndAssayPlan>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudyArm {
    pub name: String,
    pub group_size: usize,
    pub source_type: Characteristic,
    source_characteristics: BTreeSet<Characteristic>,
    arm_map: Vec<ArmEntry>,
}

impl StudyArm {
    pub fn new(name: impl Into<String>, group_size: usize) -> Self {
        Self {
            name: name.into(),
            group_size,
            source_type: default_source_type(),
            source_characteristics: BTreeSet::new(),
            arm_map: Vec::new(),
        }
    }

    pub fn with_source_type(mut self, source_type: Characteristic) -> Self {
        self.source_type = source_type;
        self
    }

    pub fn with_source_characteristics(
        mut self,
        characteristics: impl IntoIterator<Item = Characteristic>,
    ) -> Self {
        self.source_characteristics = characteristics.into_iter().collect();
        self
    }

    pub fn source_characteristics(&self) -> &BTreeSet<Characteristic> {
        &self.source_characteristics
    }

    pub fn arm_map(&self) -> &[ArmEntry] {
        &self.arm_map
    }

    pub fn cells(&self) -> impl Iterator<Item = &StudyCell> + '_ {
        self.arm_map.iter().map(|entry| &entry.cell)
    }

    /// Distinct plans in first-use order.
    pub fn sample_assay_plans(&self) -> Vec<&SampleAndAssayPlan> {
        let mut plans: Vec<&SampleAndAssayPlan> = Vec::new();
        for plan in self.arm_map.iter().filter_map(|entry| entry.plan.as_ref()) {
            if !plans.iter().any(|known| known.name == plan.name) {
                plans.push(plan);
            }
        }
        plans
    }

    /// First run of digits in the arm name, or -1 when there is none.
    pub fn numeric_id(&self) -> i64 {
        DIGITS
            .find(&self.name)
            .and_then(|found| found.as_str().parse().ok())
            .unwrap_or(-1)
    }

    pub fn is_completed(&self) -> bool {
        self.cells()
            .any(|cell| cell.contains_non_treatment(NonTreatmentType::FollowUp))
    }

    pub fn add_item_to_arm_map(
        &mut self,
        cell: StudyCell,
        plan: Option<SampleAndAssayPlan>,
    ) -> Result<(), IsaError> {
        if self.is_completed() {
            return Err(IsaError::arm(&self.name, COMPLETE_ARM_ERROR));
        }
        if self.cells().any(|existing| existing.name == cell.name) {
            return Err(IsaError::arm(
                &self.name,
                format!("a cell named {} is already part of the arm", cell.name),
            ));
        }
        let latest = self.arm_map.last().map(|entry| &entry.cell);
        if cell.contains_non_treatment(NonTreatmentType::Screen) {
            if !self.arm_map.is_empty() {
                return Err(IsaError::arm(&self.name, SCREEN_ERROR));
            }
        } else if cell.contains_non_treatment(NonTreatmentType::RunIn) {
            let follows_screen = self.arm_map.len() == 1
                && latest.is_some_and(|prev| prev.contains_non_treatment(NonTreatmentType::Screen));
            if !follows_screen {
                return Err(IsaError::arm(&self.name, RUN_IN_ERROR));
            }
        } else if cell.first_non_treatment() == Some(NonTreatmentType::Washout) {
            if latest.is_some_and(|prev| prev.last_non_treatment().is_some()) {
                return Err(IsaError::arm(&self.name, WASHOUT_ERROR));
            }
        } else if cell.contains_non_treatment(NonTreatmentType::FollowUp) {
            let Some(prev) = latest else {
                return Err(IsaError::arm(&self.name, FOLLOW_UP_EMPTY_ARM_ERROR));
            };
            if prev.contains_non_treatment(NonTreatmentType::Screen)
                || prev.contains_non_treatment(NonTreatmentType::RunIn)
            {
                return Err(IsaError::arm(&self.name, FOLLOW_UP_ERROR));
            }
        }
        self.arm_map.push(ArmEntry { cell, plan });
        Ok(())
    }

    pub fn treatments(&self) -> BTreeSet<Treatment> {
        self.cells()
            .flat_map(StudyCell::get_all_elements)
            .filter_map(|element| match element {
                Element::Treatment(treatment) => Some(treatment),
                Element::NonTreatment(_) => None,
            })
            .collect()
    }
}
