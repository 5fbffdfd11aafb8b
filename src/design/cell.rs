use std::collections::BTreeSet;

use crate::design::element::{CellItem, Element, NonTreatmentType, Treatment};
use crate::error::IsaError;
use crate::model::FactorValue;

/// One phase of an arm. Items are kept in insertion order and every insertion is validated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct StudyCell {
    pub name: String,
    elements: Vec<CellItem>,
}

impl StudyCell {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            elements: Vec::new(),
        }
    }

    /// Builds a cell by inserting each item in turn.
    pub fn with_elements<I, T>(name: impl Into<String>, items: I) -> Result<Self, IsaError>
    where
        I: IntoIterator<Item = T>,
        T: Into<CellItem>,
    {
        let mut cell = Self::new(name);
        for item in items {
            cell.insert_element(item, None)?;
        }
        Ok(cell)
    }

    pub fn elements(&self) -> &[CellItem] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Inserts `item` at `index` the way `list.insert` does: negative counts from the end and
    /// out-of-range indices clamp to either end. `None` appends.
    pub fn insert_element(
        &mut self,
        item: impl Into<CellItem>,
        index: Option<isize>,
    ) -> Result<(), IsaError> {
        let item = item.into();
        let index = self.normalize_index(index);
        match &item {
            CellItem::Single(Element::NonTreatment(element)) => {
                self.check_non_treatment(element.element_type, index)?
            }
            CellItem::Single(Element::Treatment(_)) => self.check_treatment()?,
            CellItem::Concomitant(treatments) => self.check_concomitant(treatments)?,
        }
        self.elements.insert(index, item);
        Ok(())
    }

    fn normalize_index(&self, index: Option<isize>) -> usize {
        let len = self.elements.len();
        match index {
            None => len,
            Some(index) if index < 0 => len.saturating_sub(index.unsigned_abs()),
            Some(index) => (index as usize).min(len),
        }
    }

    fn check_non_treatment(&self, kind: NonTreatmentType, index: usize) -> Result<(), IsaError> {
        let elements = &self.elements;
        match kind {
            NonTreatmentType::Screen => {
                let ok = match elements.as_slice() {
                    [] => true,
                    [only] => only.non_treatment_type() == Some(NonTreatmentType::RunIn) && index == 0,
                    _ => false,
                };
                if !ok {
                    return Err(IsaError::cell(
                        &self.name,
                        "a SCREEN must be alone in its cell or directly precede a RUN-IN",
                    ));
                }
            }
            NonTreatmentType::RunIn => {
                let ok = match elements.as_slice() {
                    [] => true,
                    [only] => only.non_treatment_type() == Some(NonTreatmentType::Screen) && index == 1,
                    _ => false,
                };
                if !ok {
                    return Err(IsaError::cell(
                        &self.name,
                        "a RUN-IN must be alone in its cell or directly follow a SCREEN",
                    ));
                }
            }
            NonTreatmentType::Washout => {
                let next = elements.get(index);
                let previous = index.checked_sub(1).and_then(|i| elements.get(i));
                if [next, previous]
                    .into_iter()
                    .flatten()
                    .any(|item| item.non_treatment_type().is_some())
                {
                    return Err(IsaError::cell(
                        &self.name,
                        "a WASHOUT cannot be adjacent to another non-treatment element",
                    ));
                }
            }
            NonTreatmentType::FollowUp => {
                if !elements.is_empty() {
                    return Err(IsaError::cell(
                        &self.name,
                        "a FOLLOW-UP must be the only element of its cell",
                    ));
                }
            }
            NonTreatmentType::ObservationPeriod => {}
        }
        Ok(())
    }

    fn check_treatment(&self) -> Result<(), IsaError> {
        let blocked = self.elements.iter().filter_map(CellItem::non_treatment_type).find(|kind| {
            matches!(
                kind,
                NonTreatmentType::Screen | NonTreatmentType::RunIn | NonTreatmentType::FollowUp
            )
        });
        match blocked {
            Some(kind) => Err(IsaError::cell(
                &self.name,
                format!("a treatment cannot share a cell with a {}", kind.as_str().to_uppercase()),
            )),
            None => Ok(()),
        }
    }

    fn check_concomitant(&self, treatments: &BTreeSet<Treatment>) -> Result<(), IsaError> {
        if treatments.is_empty() {
            return Err(IsaError::cell(
                &self.name,
                "a concomitant set needs at least one treatment",
            ));
        }
        self.check_treatment()?;
        let durations: BTreeSet<Option<&FactorValue>> =
            treatments.iter().map(Treatment::duration).collect();
        if durations.len() > 1 {
            return Err(IsaError::cell(
                &self.name,
                "concomitant treatments must share the same duration",
            ));
        }
        Ok(())
    }

    pub fn contains_non_treatment(&self, kind: NonTreatmentType) -> bool {
        self.elements
            .iter()
            .any(|item| item.non_treatment_type() == Some(kind))
    }

    /// Flattens concomitant sets into their treatments.
    pub fn get_all_elements(&self) -> Vec<Element> {
        self.elements.iter().flat_map(CellItem::elements).collect()
    }

    pub fn has_treatments(&self) -> bool {
        self.get_all_elements().iter().any(Element::is_treatment)
    }

    pub fn first_non_treatment(&self) -> Option<NonTreatmentType> {
        self.elements.first().and_then(CellItem::non_treatment_type)
    }

    pub fn last_non_treatment(&self) -> Option<NonTreatmentType> {
        self.elements.last().and_then(CellItem::non_treatment_type)
    }

    /// Factor values of every element, in element order.
    pub fn factor_values(&self) -> Vec<FactorValue> {
        self.get_all_elements()
            .iter()
            .flat_map(|element| element.factor_values().into_iter().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design::element::NonTreatment;

    #[test]
    fn negative_index_counts_from_the_end() {
        let mut cell = StudyCell::new("cell");
        cell.insert_element(NonTreatment::bare(NonTreatmentType::ObservationPeriod), None)
            .unwrap();
        cell.insert_element(NonTreatment::bare(NonTreatmentType::ObservationPeriod), None)
            .unwrap();
        assert_eq!(cell.normalize_index(Some(-1)), 1);
        assert_eq!(cell.normalize_index(Some(-2)), 0);
        assert_eq!(cell.normalize_index(Some(-7)), 0);
        assert_eq!(cell.normalize_index(Some(5)), 2);
        assert_eq!(cell.normalize_index(None), 2);
    }
}
