use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::IsaError;
use crate::model::{FactorValue, OntologyAnnotation, StudyFactor, Value};

pub const SCREEN: &str = "screen";
pub const RUN_IN: &str = "run in";
pub const WASHOUT: &str = "washout";
pub const FOLLOW_UP: &str = "follow-up";
pub const OBSERVATION_PERIOD: &str = "observation period";

pub const AGENT: &str = "AGENT";
pub const INTENSITY: &str = "INTENSITY";
pub const DURATION: &str = "DURATION";

pub const SEQUENCE_ORDER: &str = "Sequence Order";
pub const IS_TREATMENT_EPOCH: &str = "study step with treatment";

pub fn agent_factor() -> StudyFactor {
    StudyFactor::new(AGENT, "perturbation agent")
}

pub fn intensity_factor() -> StudyFactor {
    StudyFactor::new(INTENSITY, "intensity")
}

pub fn duration_factor() -> StudyFactor {
    StudyFactor::new(DURATION, "time")
}

pub fn sequence_order_factor() -> StudyFactor {
    StudyFactor::new(SEQUENCE_ORDER, "sequence order")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NonTreatmentType {
    Screen,
    RunIn,
    Washout,
    FollowUp,
    ObservationPeriod,
}

impl NonTreatmentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NonTreatmentType::Screen => SCREEN,
            NonTreatmentType::RunIn => RUN_IN,
            NonTreatmentType::Washout => WASHOUT,
            NonTreatmentType::FollowUp => FOLLOW_UP,
            NonTreatmentType::ObservationPeriod => OBSERVATION_PERIOD,
        }
    }
}

impl fmt::Display for NonTreatmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for NonTreatmentType {
    type Err = IsaError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            SCREEN => Ok(NonTreatmentType::Screen),
            RUN_IN | "run-in" => Ok(NonTreatmentType::RunIn),
            WASHOUT => Ok(NonTreatmentType::Washout),
            FOLLOW_UP | "follow up" => Ok(NonTreatmentType::FollowUp),
            OBSERVATION_PERIOD => Ok(NonTreatmentType::ObservationPeriod),
            _ => Err(IsaError::type_violation(
                "NonTreatment",
                "type",
                value,
                "str",
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum InterventionType {
    #[default]
    Chemical,
    Behavioural,
    Surgical,
    Biological,
    Radiological,
    Dietary,
    Unspecified,
}

impl InterventionType {
    pub const ALL: [InterventionType; 7] = [
        InterventionType::Chemical,
        InterventionType::Behavioural,
        InterventionType::Surgical,
        InterventionType::Biological,
        InterventionType::Radiological,
        InterventionType::Dietary,
        InterventionType::Unspecified,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InterventionType::Chemical => "chemical intervention",
            InterventionType::Behavioural => "behavioural intervention",
            InterventionType::Surgical => "surgical intervention",
            InterventionType::Biological => "biological intervention",
            InterventionType::Radiological => "radiological intervention",
            InterventionType::Dietary => "dietary intervention",
            InterventionType::Unspecified => "unspecified intervention",
        }
    }
}

impl fmt::Display for InterventionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for InterventionType {
    type Err = IsaError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_lowercase();
        InterventionType::ALL
            .into_iter()
            .find(|kind| {
                kind.as_str() == normalized
                    || kind.as_str().trim_end_matches(" intervention") == normalized
            })
            .ok_or_else(|| IsaError::type_violation("Treatment", "type", value, "str"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NonTreatment {
    pub element_type: NonTreatmentType,
    pub duration: FactorValue,
}

impl NonTreatment {
    pub fn new(
        element_type: NonTreatmentType,
        duration: impl Into<Value>,
        unit: Option<OntologyAnnotation>,
    ) -> Self {
        let mut duration = FactorValue::new(duration_factor(), duration);
        duration.unit = unit;
        Self {
            element_type,
            duration,
        }
    }

    /// Zero-length element of the given type.
    pub fn bare(element_type: NonTreatmentType) -> Self {
        Self::new(element_type, 0.0, None)
    }
}

/// A treatment keeps its factor values sorted and free of duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Treatment {
    pub treatment_type: InterventionType,
    factor_values: Vec<FactorValue>,
}

impl Treatment {
    pub fn new(
        treatment_type: InterventionType,
        factor_values: impl IntoIterator<Item = FactorValue>,
    ) -> Self {
        let factor_values = factor_values
            .into_iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        Self {
            treatment_type,
            factor_values,
        }
    }

    pub fn factor_values(&self) -> &[FactorValue] {
        &self.factor_values
    }

    /// Factor value acting as the treatment's duration: the DURATION factor, or any factor typed `time`.
    pub fn duration(&self) -> Option<&FactorValue> {
        self.factor_values
            .iter()
            .find(|value| value.factor_name.name == DURATION)
            .or_else(|| {
                self.factor_values
                    .iter()
                    .find(|value| value.factor_name.factor_type.term == "time")
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Element {
    NonTreatment(NonTreatment),
    Treatment(Treatment),
}

impl Element {
    pub fn type_label(&self) -> &'static str {
        match self {
            Element::NonTreatment(element) => element.element_type.as_str(),
            Element::Treatment(element) => element.treatment_type.as_str(),
        }
    }

    pub fn is_treatment(&self) -> bool {
        matches!(self, Element::Treatment(_))
    }

    pub fn non_treatment_type(&self) -> Option<NonTreatmentType> {
        match self {
            Element::NonTreatment(element) => Some(element.element_type),
            Element::Treatment(_) => None,
        }
    }

    pub fn duration(&self) -> Option<&FactorValue> {
        match self {
            Element::NonTreatment(element) => Some(&element.duration),
            Element::Treatment(element) => element.duration(),
        }
    }

    pub fn factor_values(&self) -> Vec<&FactorValue> {
        match self {
            Element::NonTreatment(element) => vec![&element.duration],
            Element::Treatment(element) => element.factor_values.iter().collect(),
        }
    }
}

impl From<NonTreatment> for Element {
    fn from(value: NonTreatment) -> Self {
        Element::NonTreatment(value)
    }
}

impl From<Treatment> for Element {
    fn from(value: Treatment) -> Self {
        Element::Treatment(value)
    }
}

/// One slot of a study cell: a single element or a set of concomitant treatments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CellItem {
    Single(Element),
    Concomitant(BTreeSet<Treatment>),
}

impl CellItem {
    pub fn elements(&self) -> Vec<Element> {
        match self {
            CellItem::Single(element) => vec![element.clone()],
            CellItem::Concomitant(treatments) => treatments
                .iter()
                .cloned()
                .map(Element::Treatment)
                .collect(),
        }
    }

    pub fn non_treatment_type(&self) -> Option<NonTreatmentType> {
        match self {
            CellItem::Single(element) => element.non_treatment_type(),
            CellItem::Concomitant(_) => None,
        }
    }
}

impl From<Element> for CellItem {
    fn from(value: Element) -> Self {
        CellItem::Single(value)
    }
}

impl From<NonTreatment> for CellItem {
    fn from(value: NonTreatment) -> Self {
        CellItem::Single(Element::NonTreatment(value))
    }
}

impl From<Treatment> for CellItem {
    fn from(value: Treatment) -> Self {
        CellItem::Single(Element::Treatment(value))
    }
}

impl From<BTreeSet<Treatment>> for CellItem {
    fn from(value: BTreeSet<Treatment>) -> Self {
        CellItem::Concomitant(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_type_tags_are_stable() {
        assert_eq!(NonTreatmentType::RunIn.as_str(), "run in");
        assert_eq!("run-in".parse::<NonTreatmentType>().unwrap(), NonTreatmentType::RunIn);
        assert_eq!("follow-up".parse::<NonTreatmentType>().unwrap(), NonTreatmentType::FollowUp);
        assert_eq!(
            "radiological".parse::<InterventionType>().unwrap(),
            InterventionType::Radiological
        );
    }

    #[test]
    fn treatment_factor_values_are_deduplicated() {
        let agent = FactorValue::new(agent_factor(), "cisplatin");
        let treatment = Treatment::new(
            InterventionType::Chemical,
            [agent.clone(), agent, FactorValue::new(duration_factor(), 2.0)],
        );
        assert_eq!(treatment.factor_values().len(), 2);
        assert_eq!(treatment.duration().unwrap().value, Value::Float(2.0));
    }
}
