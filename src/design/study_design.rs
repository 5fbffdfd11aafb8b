use std::collections::BTreeSet;

use crate::design::arm::{StudyArm, default_source_type};
use crate::design::cell::StudyCell;
use crate::design::element::Treatment;
use crate::design::materialize::{MaterializeOptions, Materializer};
use crate::error::IsaError;
use crate::model::{
    Characteristic, IdGenerator, Investigation, OntologyAnnotation, Study, UuidGenerator,
};

pub const EPOCH_OUT_OF_BOUNDS_ERROR: &str =
    "The Epoch you asked for is out of the bounds of the StudyDesign.";

/// Builder for a whole study: named arms, each an ordered sequence of cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudyDesign {
    pub identifier: Option<String>,
    pub name: String,
    pub design_type: Option<OntologyAnnotation>,
    pub description: String,
    pub source_type: Characteristic,
    study_arms: Vec<StudyArm>,
}

impl Default for StudyDesign {
    fn default() -> Self {
        Self::new("Study Design")
    }
}

impl StudyDesign {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            identifier: None,
            name: name.into(),
            design_type: None,
            description: String::new(),
            source_type: default_source_type(),
            study_arms: Vec::new(),
        }
    }

    /// Arms sorted by name.
    pub fn study_arms(&self) -> &[StudyArm] {
        &self.study_arms
    }

    pub fn add_study_arm(&mut self, arm: StudyArm) -> Result<(), IsaError> {
        match self
            .study_arms
            .binary_search_by(|known| known.name.as_str().cmp(&arm.name))
        {
            Ok(_) => Err(IsaError::DuplicateName {
                kind: "StudyArm".to_string(),
                name: arm.name,
            }),
            Err(position) => {
                self.study_arms.insert(position, arm);
                Ok(())
            }
        }
    }

    pub fn get_study_arm_by_name(&self, name: &str) -> Option<&StudyArm> {
        self.study_arms.iter().find(|arm| arm.name == name)
    }

    pub fn treatments(&self) -> BTreeSet<Treatment> {
        self.study_arms
            .iter()
            .flat_map(StudyArm::treatments)
            .collect()
    }

    /// One optional cell per arm at position `index`.
    pub fn get_epoch(&self, index: usize) -> Result<Vec<Option<&StudyCell>>, IsaError> {
        let cells: Vec<Option<&StudyCell>> = self
            .study_arms
            .iter()
            .map(|arm| arm.cells().nth(index))
            .collect();
        if cells.iter().all(Option::is_none) {
            return Err(IsaError::InvalidValue(EPOCH_OUT_OF_BOUNDS_ERROR.to_string()));
        }
        Ok(cells)
    }

    pub fn generate_isa_study(&self, options: &MaterializeOptions) -> Result<Study, IsaError> {
        if options.use_uuids {
            let mut generator = UuidGenerator;
            let ids: &mut dyn IdGenerator = &mut generator;
            Materializer::new(self, options, Some(ids)).run()
        } else {
            Materializer::new(self, options, None).run()
        }
    }

    /// Same as `generate_isa_study`, drawing generated ids from `ids`.
    pub fn generate_isa_study_with_ids(
        &self,
        options: &MaterializeOptions,
        ids: &mut dyn IdGenerator,
    ) -> Result<Study, IsaError> {
        Materializer::new(self, options, Some(ids)).run()
    }

    /// Wraps the materialized study in an investigation carrying the configured ontology sources
    /// plus any other source the study's annotations refer to.
    pub fn generate_isa_investigation(
        &self,
        options: &MaterializeOptions,
    ) -> Result<Investigation, IsaError> {
        let study = self.generate_isa_study(options)?;
        let mut investigation = Investigation::new(format!("i_{}", study.identifier));
        investigation.filename = "i_investigation.txt".to_string();
        investigation.title = self.name.clone();
        investigation.description = self.description.clone();
        for source in options.config.ontology_sources() {
            investigation.add_ontology_source(source);
        }
        investigation.studies.push(study);
        investigation.declare_referenced_sources();
        Ok(investigation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn arms_stay_sorted_and_unique() {
        let mut design = StudyDesign::new("design");
        design.add_study_arm(StudyArm::new("ARM_01", 2)).unwrap();
        design.add_study_arm(StudyArm::new("ARM_00", 2)).unwrap();
        let names: Vec<_> = design.study_arms().iter().map(|arm| arm.name.as_str()).collect();
        assert_eq!(names, ["ARM_00", "ARM_01"]);
        assert_matches!(
            design.add_study_arm(StudyArm::new("ARM_00", 5)),
            Err(IsaError::DuplicateName { .. })
        );
    }

    #[test]
    fn epoch_out_of_bounds() {
        let mut design = StudyDesign::new("design");
        design.add_study_arm(StudyArm::new("ARM_00", 2)).unwrap();
        assert_matches!(design.get_epoch(0), Err(IsaError::InvalidValue(_)));
    }
}
