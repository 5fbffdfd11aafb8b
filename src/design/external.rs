//! Translation of the declarative study configuration produced by external design
//! editors into a [`StudyDesign`].

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value as Json;
use tracing::{debug, info};

use crate::design::arm::StudyArm;
use crate::design::cell::StudyCell;
use crate::design::declaration::{
    AssayDeclaration, ProductDeclaration, TermDeclaration, TermObject, declared_value,
};
use crate::design::element::{
    CellItem, Element, InterventionType, NonTreatment, NonTreatmentType, Treatment, agent_factor, duration_factor,
    intensity_factor,
};
use crate::design::plan::SampleAndAssayPlan;
use crate::design::study_design::StudyDesign;
use crate::error::IsaError;
use crate::model::{Characteristic, FactorValue, OntologyAnnotation, Value};

pub const SAMPLE_TYPE_CATEGORY: &str = "organism part";
const TREATMENT: &str = "treatment";

#[derive(Debug, Clone, Deserialize)]
pub struct ExternalStudyConfig {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub design: ExternalDesign,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalDesign {
    #[serde(default)]
    pub design_type: Option<ExternalTerm>,
    #[serde(default)]
    pub subject_type: Option<ExternalTerm>,
    #[serde(default)]
    pub observational_factors: Vec<ObservationalFactor>,
    pub elements: Vec<ExternalElement>,
    pub arms: ExternalArms,
    #[serde(default)]
    pub sample_plan: Vec<ExternalSampleType>,
    #[serde(default)]
    pub assay_plan: Vec<ExternalAssay>,
}

/// Terms arrive either bare or as `{term, iri, source}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ExternalTerm {
    Bare(String),
    Annotated {
        term: String,
        #[serde(default)]
        iri: String,
        #[serde(default)]
        source: Option<String>,
    },
}

impl ExternalTerm {
    pub fn to_annotation(&self) -> OntologyAnnotation {
        self.to_declaration().to_annotation()
    }

    fn to_declaration(&self) -> TermDeclaration {
        match self {
            ExternalTerm::Bare(term) => TermDeclaration::Shorthand(term.clone()),
            ExternalTerm::Annotated { term, iri, source } => TermDeclaration::Detailed(TermObject {
                term: term.clone(),
                term_source: source.clone().filter(|source| !source.is_empty()),
                term_accession: iri.clone(),
            }),
        }
    }

    fn term(&self) -> &str {
        match self {
            ExternalTerm::Bare(term) => term,
            ExternalTerm::Annotated { term, .. } => term,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObservationalFactor {
    pub name: String,
    pub value: Json,
    #[serde(default)]
    pub unit: Option<ExternalTerm>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalElement {
    pub id: String,
    #[serde(rename = "type")]
    pub element_type: String,
    #[serde(default)]
    pub intervention_type: Option<String>,
    #[serde(default)]
    pub agent: Option<Json>,
    #[serde(default)]
    pub intensity: Option<Json>,
    #[serde(default)]
    pub intensity_unit: Option<ExternalTerm>,
    #[serde(default)]
    pub duration: Option<Json>,
    #[serde(default)]
    pub duration_unit: Option<ExternalTerm>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExternalArms {
    pub selected: Vec<ExternalArm>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExternalArm {
    pub name: String,
    pub size: usize,
    pub epochs: Vec<ExternalEpoch>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExternalEpoch {
    /// Ids of entries in the design's element list.
    pub elements: Vec<String>,
}

/// One entry of a per-arm selection mask: a flag, or a sample count where zero deselects.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
pub enum CellSelection {
    Flag(bool),
    Count(usize),
}

impl CellSelection {
    fn count(self, default: usize) -> usize {
        match self {
            CellSelection::Flag(true) => default,
            CellSelection::Flag(false) => 0,
            CellSelection::Count(count) => count,
        }
    }
}

type SelectionMask = IndexMap<String, Vec<CellSelection>>;

fn selected(mask: &SelectionMask, arm: &str, epoch: usize, default: usize) -> usize {
    mask.get(arm)
        .and_then(|cells| cells.get(epoch))
        .map(|selection| selection.count(default))
        .unwrap_or(0)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalSampleType {
    pub sample_type: ExternalTerm,
    #[serde(default = "one")]
    pub size: usize,
    #[serde(default)]
    pub selected_cells: SelectionMask,
}

fn one() -> usize {
    1
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalAssay {
    pub name: String,
    #[serde(alias = "measurement_type")]
    pub measurement_type: ExternalTerm,
    #[serde(alias = "technology_type")]
    pub technology_type: ExternalTerm,
    pub workflow: Vec<(String, Json)>,
    #[serde(default)]
    pub selected_cells: SelectionMask,
    #[serde(default)]
    pub selected_sample_types: Vec<ExternalTerm>,
}

impl ExternalAssay {
    fn declaration(&self, index: usize) -> AssayDeclaration {
        let sample_types = (!self.selected_sample_types.is_empty()).then(|| {
            self.selected_sample_types
                .iter()
                .map(|term| term.term().to_string())
                .collect()
        });
        AssayDeclaration {
            id: Some(index.to_string()),
            name: self.name.clone(),
            measurement_type: self.measurement_type.to_declaration(),
            technology_type: self.technology_type.to_declaration(),
            selected_sample_types: sample_types,
            workflow: self.workflow.clone(),
        }
    }
}

impl ExternalStudyConfig {
    pub fn parse(content: &str) -> Result<Self, IsaError> {
        serde_json::from_str(content).map_err(|err| IsaError::ConfigParse(err.to_string()))
    }

    /// Builds the design: one cell per epoch, holding the epoch's elements, and one
    /// sample and assay plan for every epoch that samples at least one material.
    pub fn to_study_design(&self) -> Result<StudyDesign, IsaError> {
        let design_config = &self.design;
        let elements = design_config
            .elements
            .iter()
            .map(|element| Ok((element.id.as_str(), translate_element(element)?)))
            .collect::<Result<IndexMap<_, _>, IsaError>>()?;
        let source_characteristics = design_config
            .observational_factors
            .iter()
            .map(observational_characteristic)
            .collect::<Result<Vec<_>, _>>()?;

        let mut design = StudyDesign::new(self.name.as_str());
        design.identifier = Some(self.id.clone()).filter(|id| !id.is_empty());
        design.description = self.description.clone();
        design.design_type = design_config.design_type.as_ref().map(ExternalTerm::to_annotation);
        if let Some(subject) = &design_config.subject_type {
            design.source_type = Characteristic::new(design.source_type.category.clone(), subject.to_annotation());
        }

        for arm_config in &design_config.arms.selected {
            let mut arm = StudyArm::new(arm_config.name.as_str(), arm_config.size)
                .with_source_type(design.source_type.clone())
                .with_source_characteristics(source_characteristics.iter().cloned());
            for (epoch_index, epoch) in arm_config.epochs.iter().enumerate() {
                let cell = epoch_cell(&arm_config.name, epoch_index, epoch, &elements)?;
                let plan = epoch_plan(design_config, &arm_config.name, epoch_index)?;
                arm.add_item_to_arm_map(cell, plan)?;
            }
            design.add_study_arm(arm)?;
        }
        info!(
            design = %design.name,
            arms = design.study_arms().len(),
            "study design translated from external configuration"
        );
        Ok(design)
    }
}

fn optional_value(value: &Option<Json>, attribute: &str) -> Result<Option<Value>, IsaError> {
    value
        .as_ref()
        .filter(|value| !value.is_null())
        .map(|value| declared_value(value, attribute))
        .transpose()
}

fn translate_element(element: &ExternalElement) -> Result<Element, IsaError> {
    let duration = optional_value(&element.duration, "duration")?;
    let duration_unit = element.duration_unit.as_ref().map(ExternalTerm::to_annotation);
    if let Ok(kind) = element.element_type.parse::<NonTreatmentType>() {
        return Ok(Element::NonTreatment(NonTreatment::new(
            kind,
            duration.unwrap_or(Value::Float(0.0)),
            duration_unit,
        )));
    }
    let intervention = if element.element_type.trim().eq_ignore_ascii_case(TREATMENT) {
        element
            .intervention_type
            .as_deref()
            .map(str::parse::<InterventionType>)
            .transpose()?
            .unwrap_or_default()
    } else {
        element.element_type.parse()?
    };

    let mut factor_values = Vec::new();
    if let Some(agent) = optional_value(&element.agent, "agent")? {
        factor_values.push(FactorValue::new(agent_factor(), agent));
    }
    if let Some(intensity) = optional_value(&element.intensity, "intensity")? {
        let mut value = FactorValue::new(intensity_factor(), intensity);
        value.unit = element.intensity_unit.as_ref().map(ExternalTerm::to_annotation);
        factor_values.push(value);
    }
    if let Some(duration) = duration {
        let mut value = FactorValue::new(duration_factor(), duration);
        value.unit = duration_unit;
        factor_values.push(value);
    }
    Ok(Element::Treatment(Treatment::new(intervention, factor_values)))
}

fn observational_characteristic(factor: &ObservationalFactor) -> Result<Characteristic, IsaError> {
    let mut characteristic = Characteristic::new(
        OntologyAnnotation::new(factor.name.as_str()),
        declared_value(&factor.value, &factor.name)?,
    );
    characteristic.unit = factor.unit.as_ref().map(ExternalTerm::to_annotation);
    Ok(characteristic)
}

/// Non-treatments stay single items; several treatments in one epoch run concomitantly.
fn epoch_cell(
    arm: &str,
    epoch_index: usize,
    epoch: &ExternalEpoch,
    elements: &IndexMap<&str, Element>,
) -> Result<StudyCell, IsaError> {
    let mut items = Vec::new();
    let mut treatments = Vec::new();
    for id in &epoch.elements {
        match elements.get(id.as_str()) {
            Some(Element::Treatment(treatment)) => treatments.push(treatment.clone()),
            Some(other) => items.push(CellItem::Single(other.clone())),
            None => return Err(IsaError::missing("element", id.as_str())),
        }
    }
    match treatments.len() {
        0 => {}
        1 => items.extend(treatments.into_iter().map(CellItem::from)),
        _ => items.push(CellItem::Concomitant(treatments.into_iter().collect())),
    }
    StudyCell::with_elements(format!("{arm}_CELL_{epoch_index:02}"), items)
}

fn epoch_plan(
    design: &ExternalDesign,
    arm: &str,
    epoch_index: usize,
) -> Result<Option<SampleAndAssayPlan>, IsaError> {
    let sample_types: Vec<ProductDeclaration> = design
        .sample_plan
        .iter()
        .filter_map(|sample_type| {
            let size = selected(&sample_type.selected_cells, arm, epoch_index, sample_type.size);
            (size > 0).then(|| ProductDeclaration {
                characteristics_category: Some(SAMPLE_TYPE_CATEGORY.into()),
                characteristics_value: Some(sample_type.sample_type.to_declaration()),
                ..ProductDeclaration::new("sample", size)
            })
        })
        .collect();
    if sample_types.is_empty() {
        return Ok(None);
    }
    let assays: Vec<AssayDeclaration> = design
        .assay_plan
        .iter()
        .enumerate()
        .filter(|(_, assay)| selected(&assay.selected_cells, arm, epoch_index, 1) > 0)
        .map(|(i, assay)| assay.declaration(i))
        .collect();
    debug!(
        arm,
        epoch = epoch_index,
        samples = sample_types.len(),
        assays = assays.len(),
        "epoch sampled"
    );
    SampleAndAssayPlan::from_declaration(
        format!("{arm}_CELL_{epoch_index:02}_PLAN"),
        &sample_types,
        &assays,
        &[],
        None,
    )
    .map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn treatment_elements_carry_base_factors() {
        let element: ExternalElement = serde_json::from_value(json!({
            "id": "el-1",
            "type": "treatment",
            "agent": "sucrose",
            "intensity": 10,
            "intensityUnit": "mg",
            "duration": 2,
            "durationUnit": {"term": "day", "iri": "http://purl.obolibrary.org/obo/UO_0000033", "source": "UO"}
        }))
        .unwrap();
        let Element::Treatment(treatment) = translate_element(&element).unwrap() else {
            panic!("expected a treatment");
        };
        assert_eq!(treatment.factor_values().len(), 3);
        let duration = treatment.duration().unwrap();
        assert_eq!(duration.unit.as_ref().map(|unit| unit.term.as_str()), Some("day"));
    }

    #[test]
    fn masks_shorter_than_the_arm_deselect() {
        let mut mask = SelectionMask::new();
        mask.insert("Arm_0".to_string(), vec![CellSelection::Flag(true), CellSelection::Count(3)]);
        assert_eq!(selected(&mask, "Arm_0", 0, 2), 2);
        assert_eq!(selected(&mask, "Arm_0", 1, 2), 3);
        assert_eq!(selected(&mask, "Arm_0", 2, 2), 0);
        assert_eq!(selected(&mask, "Arm_1", 0, 2), 0);
    }
}
