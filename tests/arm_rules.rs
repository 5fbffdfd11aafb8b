use assert_matches::assert_matches;

use isa_study_designer::design::arm::WASHOUT_ERROR;
use isa_study_designer::design::element::{agent_factor, duration_factor};
use isa_study_designer::design::{
    InterventionType, NonTreatment, NonTreatmentType, StudyArm, StudyCell, StudyDesign, Treatment,
};
use isa_study_designer::error::IsaError;
use isa_study_designer::model::FactorValue;

fn single(name: &str, kind: NonTreatmentType) -> StudyCell {
    StudyCell::with_elements(name, [NonTreatment::new(kind, 7.0, None)]).unwrap()
}

fn treated(name: &str, agent: &str) -> StudyCell {
    let treatment = Treatment::new(
        InterventionType::Chemical,
        [
            FactorValue::new(agent_factor(), agent),
            FactorValue::new(duration_factor(), 14.0),
        ],
    );
    StudyCell::with_elements(name, [treatment]).unwrap()
}

fn treated_then_washout(name: &str, agent: &str) -> StudyCell {
    let mut cell = treated(name, agent);
    cell.insert_element(NonTreatment::new(NonTreatmentType::Washout, 7.0, None), None)
        .unwrap();
    cell
}

#[test]
fn full_arm_accepts_canonical_sequence() {
    let mut arm = StudyArm::new("ARM_00", 5);
    arm.add_item_to_arm_map(single("screen", NonTreatmentType::Screen), None)
        .unwrap();
    arm.add_item_to_arm_map(single("run-in", NonTreatmentType::RunIn), None)
        .unwrap();
    arm.add_item_to_arm_map(treated_then_washout("first", "aspirin"), None)
        .unwrap();
    arm.add_item_to_arm_map(treated("second", "ibuprofen"), None)
        .unwrap();
    arm.add_item_to_arm_map(single("follow-up", NonTreatmentType::FollowUp), None)
        .unwrap();
    assert!(arm.is_completed());
    assert_eq!(arm.treatments().len(), 2);
    assert_matches!(
        arm.add_item_to_arm_map(treated("late", "aspirin"), None),
        Err(IsaError::ArmOrderViolation { .. })
    );
}

#[test]
fn screen_only_opens_an_arm() {
    let mut arm = StudyArm::new("ARM_00", 5);
    arm.add_item_to_arm_map(treated("first", "aspirin"), None)
        .unwrap();
    assert_matches!(
        arm.add_item_to_arm_map(single("screen", NonTreatmentType::Screen), None),
        Err(IsaError::ArmOrderViolation { .. })
    );
}

#[test]
fn run_in_needs_a_preceding_screen() {
    let mut arm = StudyArm::new("ARM_00", 5);
    assert_matches!(
        arm.add_item_to_arm_map(single("run-in", NonTreatmentType::RunIn), None),
        Err(IsaError::ArmOrderViolation { .. })
    );
    assert!(arm.arm_map().is_empty());
}

#[test]
fn washout_cannot_follow_a_non_treatment_ending() {
    let mut arm = StudyArm::new("ARM_00", 5);
    arm.add_item_to_arm_map(treated_then_washout("first", "aspirin"), None)
        .unwrap();
    assert_matches!(
        arm.add_item_to_arm_map(single("washout", NonTreatmentType::Washout), None),
        Err(IsaError::ArmOrderViolation { .. })
    );

    let mut screened = StudyArm::new("ARM_01", 5);
    screened
        .add_item_to_arm_map(single("screen", NonTreatmentType::Screen), None)
        .unwrap();
    assert_matches!(
        screened.add_item_to_arm_map(single("washout", NonTreatmentType::Washout), None),
        Err(IsaError::ArmOrderViolation { ref message, .. }) if message == WASHOUT_ERROR
    );
    assert!(WASHOUT_ERROR.contains("non-treatment"));
}

#[test]
fn follow_up_needs_a_treated_predecessor() {
    let mut empty = StudyArm::new("ARM_00", 5);
    assert_matches!(
        empty.add_item_to_arm_map(single("follow-up", NonTreatmentType::FollowUp), None),
        Err(IsaError::ArmOrderViolation { .. })
    );

    let mut screened = StudyArm::new("ARM_01", 5);
    screened
        .add_item_to_arm_map(single("screen", NonTreatmentType::Screen), None)
        .unwrap();
    assert_matches!(
        screened.add_item_to_arm_map(single("follow-up", NonTreatmentType::FollowUp), None),
        Err(IsaError::ArmOrderViolation { .. })
    );
}

#[test]
fn duplicate_cell_names_are_rejected() {
    let mut arm = StudyArm::new("ARM_00", 5);
    arm.add_item_to_arm_map(treated("cell", "aspirin"), None)
        .unwrap();
    assert_matches!(
        arm.add_item_to_arm_map(treated("cell", "ibuprofen"), None),
        Err(IsaError::ArmOrderViolation { .. })
    );
}

#[test]
fn design_keeps_arms_sorted_and_sliceable() {
    let mut design = StudyDesign::new("trial");
    let mut second = StudyArm::new("ARM_01", 3);
    second
        .add_item_to_arm_map(treated("b0", "ibuprofen"), None)
        .unwrap();
    let mut first = StudyArm::new("ARM_00", 3);
    first
        .add_item_to_arm_map(treated("a0", "aspirin"), None)
        .unwrap();
    first
        .add_item_to_arm_map(single("a1", NonTreatmentType::FollowUp), None)
        .unwrap();
    design.add_study_arm(second).unwrap();
    design.add_study_arm(first).unwrap();

    let names: Vec<&str> = design.study_arms().iter().map(|arm| arm.name.as_str()).collect();
    assert_eq!(names, ["ARM_00", "ARM_01"]);
    assert_matches!(
        design.add_study_arm(StudyArm::new("ARM_00", 1)),
        Err(IsaError::DuplicateName { .. })
    );

    let epoch = design.get_epoch(1).unwrap();
    assert_eq!(epoch[0].map(|cell| cell.name.as_str()), Some("a1"));
    assert!(epoch[1].is_none());
    assert_matches!(design.get_epoch(2), Err(IsaError::InvalidValue(_)));
    assert_eq!(design.treatments().len(), 2);
}
