use std::collections::BTreeSet;

use tracing::debug;

use crate::design::arm::StudyArm;
use crate::design::cell::StudyCell;
use crate::design::element::{
    CellItem, InterventionType, NonTreatment, NonTreatmentType, Treatment, agent_factor,
    duration_factor, intensity_factor,
};
use crate::design::plan::SampleAndAssayPlan;
use crate::design::study_design::StudyDesign;
use crate::error::IsaError;
use crate::model::{FactorValue, StudyFactor, Value};

/// Builds every treatment of a full factorial design over a set of factors.
#[derive(Debug, Clone, PartialEq)]
pub struct TreatmentFactory {
    intervention_type: InterventionType,
    factors: Vec<(StudyFactor, BTreeSet<Value>)>,
}

impl Default for TreatmentFactory {
    fn default() -> Self {
        Self::new(
            InterventionType::Chemical,
            [agent_factor(), intensity_factor(), duration_factor()],
        )
    }
}

impl TreatmentFactory {
    pub fn new(
        intervention_type: InterventionType,
        factors: impl IntoIterator<Item = StudyFactor>,
    ) -> Self {
        Self {
            intervention_type,
            factors: factors.into_iter().map(|factor| (factor, BTreeSet::new())).collect(),
        }
    }

    pub fn intervention_type(&self) -> InterventionType {
        self.intervention_type
    }

    pub fn factors(&self) -> &[(StudyFactor, BTreeSet<Value>)] {
        &self.factors
    }

    pub fn add_factor_value(&mut self, factor: &str, value: impl Into<Value>) -> Result<(), IsaError> {
        self.add_factor_values(factor, [value.into()])
    }

    pub fn add_factor_values<I, V>(&mut self, factor: &str, values: I) -> Result<(), IsaError>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let (_, known) = self
            .factors
            .iter_mut()
            .find(|(candidate, _)| candidate.name == factor)
            .ok_or_else(|| IsaError::missing("study factor", factor))?;
        known.extend(values.into_iter().map(Into::into));
        Ok(())
    }

    /// Cartesian product of the factor values; empty as soon as one factor has no value.
    pub fn compute_full_factorial_design(&self) -> BTreeSet<Treatment> {
        if self.factors.iter().any(|(_, values)| values.is_empty()) {
            return BTreeSet::new();
        }
        let combinations = self.factors.iter().fold(vec![Vec::new()], |acc, (factor, values)| {
            acc.into_iter()
                .flat_map(|prefix: Vec<FactorValue>| {
                    values.iter().map(move |value| {
                        let mut next = prefix.clone();
                        next.push(FactorValue::new(factor.clone(), value.clone()));
                        next
                    })
                })
                .collect()
        });
        combinations
            .into_iter()
            .map(|factor_values| Treatment::new(self.intervention_type, factor_values))
            .collect()
    }
}

/// Either one size shared by every arm or one size per arm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupSizes {
    Uniform(usize),
    PerArm(Vec<usize>),
}

impl GroupSizes {
    fn check(&self, arms: usize) -> Result<(), IsaError> {
        match self {
            GroupSizes::PerArm(sizes) if sizes.len() != arms => Err(IsaError::GroupSizeMismatch {
                expected: arms,
                actual: sizes.len(),
            }),
            _ => Ok(()),
        }
    }

    fn size(&self, arm: usize) -> usize {
        match self {
            GroupSizes::Uniform(size) => *size,
            GroupSizes::PerArm(sizes) => sizes.get(arm).copied().unwrap_or_default(),
        }
    }
}

impl From<usize> for GroupSizes {
    fn from(value: usize) -> Self {
        GroupSizes::Uniform(value)
    }
}

impl From<Vec<usize>> for GroupSizes {
    fn from(value: Vec<usize>) -> Self {
        GroupSizes::PerArm(value)
    }
}

pub type NonTreatmentEntry = (NonTreatment, Option<SampleAndAssayPlan>);
pub type TreatmentEntry = (Treatment, Option<SampleAndAssayPlan>);

/// Optional non-treatment cells wrapped around the treatment cells of every arm.
#[derive(Debug, Clone, Default)]
pub struct NonTreatmentMaps {
    pub screen: Option<NonTreatmentEntry>,
    pub run_in: Option<NonTreatmentEntry>,
    pub washout: Option<NonTreatmentEntry>,
    pub follow_up: Option<NonTreatmentEntry>,
}

impl NonTreatmentMaps {
    fn validate(&self) -> Result<(), IsaError> {
        for (entry, expected, attribute) in [
            (&self.screen, NonTreatmentType::Screen, "screen_map"),
            (&self.run_in, NonTreatmentType::RunIn, "run_in_map"),
            (&self.washout, NonTreatmentType::Washout, "washout_map"),
            (&self.follow_up, NonTreatmentType::FollowUp, "follow_up_map"),
        ] {
            if let Some((element, _)) = entry {
                check_type(&element.element_type, expected, attribute)?;
            }
        }
        Ok(())
    }
}

fn check_type(
    actual: &NonTreatmentType,
    expected: NonTreatmentType,
    attribute: &str,
) -> Result<(), IsaError> {
    if *actual != expected {
        return Err(IsaError::type_violation(
            "StudyDesignFactory",
            attribute,
            actual.as_str(),
            expected.as_str(),
        ));
    }
    Ok(())
}

/// Accumulates the cells of one arm, naming them `ARM_<i>_CELL_<j>`.
struct ArmBuilder {
    arm: StudyArm,
    arm_index: usize,
    counter: usize,
}

impl ArmBuilder {
    fn new(arm_index: usize, group_size: usize) -> Self {
        Self {
            arm: StudyArm::new(arm_name(arm_index), group_size),
            arm_index,
            counter: 0,
        }
    }

    fn push<I, T>(&mut self, items: I, plan: Option<SampleAndAssayPlan>) -> Result<(), IsaError>
    where
        I: IntoIterator<Item = T>,
        T: Into<CellItem>,
    {
        let name = format!("{}_CELL_{:02}", arm_name(self.arm_index), self.counter);
        let cell = StudyCell::with_elements(name, items)?;
        self.arm.add_item_to_arm_map(cell, plan)?;
        self.counter += 1;
        Ok(())
    }

    fn push_entry(&mut self, entry: &Option<NonTreatmentEntry>) -> Result<(), IsaError> {
        if let Some((element, plan)) = entry {
            self.push([element.clone()], plan.clone())?;
        }
        Ok(())
    }

    fn open(&mut self, maps: &NonTreatmentMaps) -> Result<(), IsaError> {
        self.push_entry(&maps.screen)?;
        self.push_entry(&maps.run_in)
    }

    fn close(mut self, maps: &NonTreatmentMaps) -> Result<StudyArm, IsaError> {
        self.push_entry(&maps.follow_up)?;
        Ok(self.arm)
    }
}

fn arm_name(index: usize) -> String {
    format!("ARM_{index:02}")
}

/// Index permutations of `0..n` in lexicographic order.
fn permutations(n: usize) -> Vec<Vec<usize>> {
    fn extend(prefix: &mut Vec<usize>, used: &mut [bool], out: &mut Vec<Vec<usize>>) {
        if prefix.len() == used.len() {
            out.push(prefix.clone());
            return;
        }
        for i in 0..used.len() {
            if !used[i] {
                used[i] = true;
                prefix.push(i);
                extend(prefix, used, out);
                prefix.pop();
                used[i] = false;
            }
        }
    }
    let mut out = Vec::new();
    extend(&mut Vec::with_capacity(n), &mut vec![false; n], &mut out);
    out
}

pub struct StudyDesignFactory;

impl StudyDesignFactory {
    /// One arm per treatment, in input order.
    pub fn compute_parallel_design(
        treatments: &[TreatmentEntry],
        group_sizes: impl Into<GroupSizes>,
        maps: &NonTreatmentMaps,
    ) -> Result<StudyDesign, IsaError> {
        let group_sizes = group_sizes.into();
        group_sizes.check(treatments.len())?;
        maps.validate()?;
        let mut design = StudyDesign::default();
        for (i, (treatment, plan)) in treatments.iter().enumerate() {
            let mut arm = ArmBuilder::new(i, group_sizes.size(i));
            arm.open(maps)?;
            arm.push([treatment.clone()], plan.clone())?;
            design.add_study_arm(arm.close(maps)?)?;
        }
        debug!(arms = design.study_arms().len(), "parallel design");
        Ok(design)
    }

    /// One arm per permutation of the treatments, with washouts between consecutive treatments.
    pub fn compute_crossover_design(
        treatments: &[TreatmentEntry],
        group_sizes: impl Into<GroupSizes>,
        maps: &NonTreatmentMaps,
    ) -> Result<StudyDesign, IsaError> {
        let orders = permutations(treatments.len());
        let group_sizes = group_sizes.into();
        group_sizes.check(orders.len())?;
        maps.validate()?;
        let mut design = StudyDesign::default();
        for (i, order) in orders.iter().enumerate() {
            let mut arm = ArmBuilder::new(i, group_sizes.size(i));
            arm.open(maps)?;
            for (j, ix) in order.iter().enumerate() {
                let (treatment, plan) = &treatments[*ix];
                arm.push([treatment.clone()], plan.clone())?;
                if j + 1 < order.len() {
                    arm.push_entry(&maps.washout)?;
                }
            }
            design.add_study_arm(arm.close(maps)?)?;
        }
        debug!(arms = design.study_arms().len(), "crossover design");
        Ok(design)
    }

    /// A single arm running the treatments in input order.
    pub fn compute_single_arm_design(
        treatments: &[TreatmentEntry],
        group_size: usize,
        maps: &NonTreatmentMaps,
    ) -> Result<StudyDesign, IsaError> {
        maps.validate()?;
        let mut arm = ArmBuilder::new(0, group_size);
        arm.open(maps)?;
        for (j, (treatment, plan)) in treatments.iter().enumerate() {
            arm.push([treatment.clone()], plan.clone())?;
            if j + 1 < treatments.len() {
                arm.push_entry(&maps.washout)?;
            }
        }
        let mut design = StudyDesign::default();
        design.add_study_arm(arm.close(maps)?)?;
        Ok(design)
    }

    /// A single arm whose treatment cell holds every treatment as one concomitant set.
    pub fn compute_concomitant_treatments_design(
        treatments: &[Treatment],
        plan: Option<SampleAndAssayPlan>,
        group_size: usize,
        maps: &NonTreatmentMaps,
    ) -> Result<StudyDesign, IsaError> {
        maps.validate()?;
        let mut arm = ArmBuilder::new(0, group_size);
        arm.open(maps)?;
        let concomitant: BTreeSet<Treatment> = treatments.iter().cloned().collect();
        arm.push([concomitant], plan)?;
        let mut design = StudyDesign::default();
        design.add_study_arm(arm.close(maps)?)?;
        Ok(design)
    }

    /// One arm per permutation; each arm has a single cell running the treatments
    /// in that order, separated by `washout` when given.
    pub fn compute_crossover_design_multi_element_cell(
        treatments: &[Treatment],
        plan: Option<SampleAndAssayPlan>,
        group_sizes: impl Into<GroupSizes>,
        washout: Option<NonTreatment>,
        maps: &NonTreatmentMaps,
    ) -> Result<StudyDesign, IsaError> {
        let orders = permutations(treatments.len());
        let group_sizes = group_sizes.into();
        group_sizes.check(orders.len())?;
        maps.validate()?;
        if let Some(washout) = &washout {
            check_type(&washout.element_type, NonTreatmentType::Washout, "washout")?;
        }
        let mut design = StudyDesign::default();
        for (i, order) in orders.iter().enumerate() {
            let mut items: Vec<CellItem> = Vec::new();
            for (j, ix) in order.iter().enumerate() {
                items.push(treatments[*ix].clone().into());
                if let (Some(washout), true) = (&washout, j + 1 < order.len()) {
                    items.push(washout.clone().into());
                }
            }
            let mut arm = ArmBuilder::new(i, group_sizes.size(i));
            arm.open(maps)?;
            arm.push(items, plan.clone())?;
            design.add_study_arm(arm.close(maps)?)?;
        }
        Ok(design)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permutations_are_lexicographic() {
        assert_eq!(
            permutations(3),
            vec![
                vec![0, 1, 2],
                vec![0, 2, 1],
                vec![1, 0, 2],
                vec![1, 2, 0],
                vec![2, 0, 1],
                vec![2, 1, 0],
            ]
        );
        assert_eq!(permutations(0), vec![Vec::<usize>::new()]);
    }
}
