use serde_json::{Map, Number, Value as Json, json};

use crate::design::arm::StudyArm;
use crate::design::assay_graph::{AssayGraph, ProductNode, ProtocolNode, QualityControl, SequenceNode};
use crate::design::cell::StudyCell;
use crate::design::element::{CellItem, Element, NonTreatment, Treatment};
use crate::design::plan::SampleAndAssayPlan;
use crate::design::study_design::StudyDesign;
use crate::error::IsaError;
use crate::model::dict::{array_field, as_object, json_type, opt_str_field, str_field};
use crate::model::{
    Characteristic, FactorValue, OntologyAnnotation, ParameterValue, ProtocolParameter, StudyFactor,
    Value,
};

/// Conversion of design entities to and from their JSON description.
pub trait DesignJson: Sized {
    fn to_json(&self) -> Json;

    fn from_json(value: &Json) -> Result<Self, IsaError>;
}

pub fn dump_design(design: &StudyDesign) -> Result<String, IsaError> {
    serde_json::to_string_pretty(&design.to_json()).map_err(|err| IsaError::Json(err.to_string()))
}

pub fn load_design(content: &str) -> Result<StudyDesign, IsaError> {
    let value: Json = serde_json::from_str(content).map_err(|err| IsaError::Json(err.to_string()))?;
    StudyDesign::from_json(&value)
}

fn annotation_to_json(annotation: &OntologyAnnotation) -> Json {
    if annotation.term_source.is_none() && annotation.term_accession.is_empty() {
        return Json::String(annotation.term.clone());
    }
    let mut map = Map::new();
    map.insert("term".to_string(), Json::String(annotation.term.clone()));
    if !annotation.term_accession.is_empty() {
        map.insert(
            "termAccession".to_string(),
            Json::String(annotation.term_accession.clone()),
        );
    }
    if let Some(source) = &annotation.term_source {
        map.insert("termSource".to_string(), Json::String(source.clone()));
    }
    Json::Object(map)
}

fn annotation_from_json(value: &Json, class: &str, attribute: &str) -> Result<OntologyAnnotation, IsaError> {
    match value {
        Json::String(term) => Ok(OntologyAnnotation::new(term.as_str())),
        Json::Object(map) => {
            let term = str_field(map, class, "term")?;
            let accession = str_field(map, class, "termAccession")?;
            let source = match map.get("termSource") {
                None | Some(Json::Null) => String::new(),
                Some(Json::String(name)) => name.clone(),
                Some(Json::Object(source)) => str_field(source, class, "name")?,
                Some(other) => {
                    return Err(IsaError::type_violation(
                        class,
                        "termSource",
                        other.to_string(),
                        json_type(other),
                    ));
                }
            };
            if source.is_empty() {
                Ok(OntologyAnnotation {
                    term_accession: accession,
                    ..OntologyAnnotation::new(term)
                })
            } else {
                Ok(OntologyAnnotation::sourced(term, source, accession))
            }
        }
        other => Err(IsaError::type_violation(
            class,
            attribute,
            other.to_string(),
            json_type(other),
        )),
    }
}

fn opt_annotation(map: &Map<String, Json>, class: &str, key: &str) -> Result<Option<OntologyAnnotation>, IsaError> {
    match map.get(key) {
        None | Some(Json::Null) => Ok(None),
        Some(value) => annotation_from_json(value, class, key).map(Some),
    }
}

fn required<'a>(map: &'a Map<String, Json>, class: &str, key: &str) -> Result<&'a Json, IsaError> {
    map.get(key)
        .ok_or_else(|| IsaError::type_violation(class, key, "<absent>", "null"))
}

fn value_to_json(value: &Value) -> Json {
    match value {
        Value::Int(int) => Json::Number(Number::from(*int)),
        Value::Float(float) => Number::from_f64(*float).map(Json::Number).unwrap_or(Json::Null),
        Value::Text(text) => Json::String(text.clone()),
        Value::Term(term) => {
            let mut map = Map::new();
            map.insert("term".to_string(), Json::String(term.term.clone()));
            if !term.term_accession.is_empty() {
                map.insert("termAccession".to_string(), Json::String(term.term_accession.clone()));
            }
            if let Some(source) = &term.term_source {
                map.insert("termSource".to_string(), Json::String(source.clone()));
            }
            Json::Object(map)
        }
    }
}

fn value_from_json(value: &Json, class: &str) -> Result<Value, IsaError> {
    match value {
        Json::Number(number) => match number.as_i64() {
            Some(int) => Ok(Value::Int(int)),
            None => number
                .as_f64()
                .map(Value::Float)
                .ok_or_else(|| IsaError::type_violation(class, "value", number.to_string(), "number")),
        },
        Json::String(text) => Ok(Value::Text(text.clone())),
        Json::Object(_) => annotation_from_json(value, class, "value").map(Value::Term),
        other => Err(IsaError::type_violation(
            class,
            "value",
            other.to_string(),
            json_type(other),
        )),
    }
}

fn usize_field(map: &Map<String, Json>, class: &str, key: &str, default: usize) -> Result<usize, IsaError> {
    match map.get(key) {
        None | Some(Json::Null) => Ok(default),
        Some(Json::Number(number)) => number
            .as_u64()
            .map(|value| value as usize)
            .ok_or_else(|| IsaError::type_violation(class, key, number.to_string(), "number")),
        Some(other) => Err(IsaError::type_violation(
            class,
            key,
            other.to_string(),
            json_type(other),
        )),
    }
}

fn characteristic_to_json(characteristic: &Characteristic) -> Json {
    let mut map = Map::new();
    map.insert("category".to_string(), annotation_to_json(&characteristic.category));
    map.insert("value".to_string(), value_to_json(&characteristic.value));
    if let Some(unit) = &characteristic.unit {
        map.insert("unit".to_string(), annotation_to_json(unit));
    }
    Json::Object(map)
}

fn characteristic_from_json(value: &Json) -> Result<Characteristic, IsaError> {
    let map = as_object(value, "Characteristic")?;
    let category = annotation_from_json(required(map, "Characteristic", "category")?, "Characteristic", "category")?;
    let mut characteristic = Characteristic::new(
        category,
        value_from_json(required(map, "Characteristic", "value")?, "Characteristic")?,
    );
    characteristic.unit = opt_annotation(map, "Characteristic", "unit")?;
    Ok(characteristic)
}

fn characteristics_from_json(map: &Map<String, Json>, class: &str, key: &str) -> Result<Vec<Characteristic>, IsaError> {
    array_field(map, class, key)?
        .iter()
        .map(characteristic_from_json)
        .collect()
}

fn factor_value_to_json(value: &FactorValue) -> Json {
    let mut map = Map::new();
    map.insert(
        "factor".to_string(),
        json!({
            "name": value.factor_name.name,
            "type": annotation_to_json(&value.factor_name.factor_type),
        }),
    );
    map.insert("value".to_string(), value_to_json(&value.value));
    if let Some(unit) = &value.unit {
        map.insert("unit".to_string(), annotation_to_json(unit));
    }
    Json::Object(map)
}

fn factor_value_from_json(value: &Json) -> Result<FactorValue, IsaError> {
    let map = as_object(value, "FactorValue")?;
    let factor = as_object(required(map, "FactorValue", "factor")?, "StudyFactor")?;
    let factor_type = annotation_from_json(required(factor, "StudyFactor", "type")?, "StudyFactor", "type")?;
    let mut factor_value = FactorValue::new(
        StudyFactor::new(str_field(factor, "StudyFactor", "name")?, factor_type),
        value_from_json(required(map, "FactorValue", "value")?, "FactorValue")?,
    );
    factor_value.unit = opt_annotation(map, "FactorValue", "unit")?;
    Ok(factor_value)
}

fn element_to_json(element: &Element) -> Json {
    match element {
        Element::Treatment(treatment) => json!({
            "isTreatment": true,
            "type": treatment.treatment_type.as_str(),
            "factorValues": treatment.factor_values().iter().map(factor_value_to_json).collect::<Vec<_>>(),
        }),
        Element::NonTreatment(non_treatment) => json!({
            "isTreatment": false,
            "type": non_treatment.element_type.as_str(),
            "factorValues": [factor_value_to_json(&non_treatment.duration)],
        }),
    }
}

fn element_from_json(value: &Json) -> Result<Element, IsaError> {
    let map = as_object(value, "Element")?;
    let is_treatment = match required(map, "Element", "isTreatment")? {
        Json::Bool(flag) => *flag,
        other => {
            return Err(IsaError::type_violation(
                "Element",
                "isTreatment",
                other.to_string(),
                json_type(other),
            ));
        }
    };
    let factor_values = array_field(map, "Element", "factorValues")?
        .iter()
        .map(factor_value_from_json)
        .collect::<Result<Vec<_>, _>>()?;
    let element_type = str_field(map, "Element", "type")?;
    if is_treatment {
        return Ok(Element::Treatment(Treatment::new(element_type.parse()?, factor_values)));
    }
    let duration = factor_values.into_iter().next();
    let non_treatment = match duration {
        Some(duration) => NonTreatment::new(element_type.parse()?, duration.value, duration.unit),
        None => NonTreatment::bare(element_type.parse()?),
    };
    Ok(Element::NonTreatment(non_treatment))
}

impl DesignJson for CellItem {
    fn to_json(&self) -> Json {
        match self {
            CellItem::Single(element) => element_to_json(element),
            CellItem::Concomitant(treatments) => Json::Array(
                treatments
                    .iter()
                    .map(|treatment| element_to_json(&Element::Treatment(treatment.clone())))
                    .collect(),
            ),
        }
    }

    fn from_json(value: &Json) -> Result<Self, IsaError> {
        match value {
            Json::Array(items) => {
                let treatments = items
                    .iter()
                    .map(|item| match element_from_json(item)? {
                        Element::Treatment(treatment) => Ok(treatment),
                        Element::NonTreatment(other) => Err(IsaError::type_violation(
                            "StudyCell",
                            "elements",
                            other.element_type.as_str(),
                            "NonTreatment",
                        )),
                    })
                    .collect::<Result<_, _>>()?;
                Ok(CellItem::Concomitant(treatments))
            }
            other => element_from_json(other).map(CellItem::Single),
        }
    }
}

impl DesignJson for StudyCell {
    fn to_json(&self) -> Json {
        json!({
            "name": self.name,
            "elements": self.elements().iter().map(CellItem::to_json).collect::<Vec<_>>(),
        })
    }

    fn from_json(value: &Json) -> Result<Self, IsaError> {
        let map = as_object(value, "StudyCell")?;
        let mut cell = StudyCell::new(str_field(map, "StudyCell", "name")?);
        for item in array_field(map, "StudyCell", "elements")? {
            cell.insert_element(CellItem::from_json(item)?, None)?;
        }
        Ok(cell)
    }
}

impl DesignJson for ProductNode {
    fn to_json(&self) -> Json {
        let mut map = Map::new();
        map.insert("@id".to_string(), Json::String(self.id.clone()));
        map.insert("name".to_string(), Json::String(self.name.clone()));
        map.insert("productType".to_string(), Json::String(self.node_type.as_str().to_string()));
        map.insert("size".to_string(), json!(self.size));
        map.insert(
            "characteristics".to_string(),
            Json::Array(self.characteristics.iter().map(characteristic_to_json).collect()),
        );
        if let Some(extension) = &self.extension {
            map.insert("extension".to_string(), Json::String(extension.clone()));
        }
        Json::Object(map)
    }

    fn from_json(value: &Json) -> Result<Self, IsaError> {
        let map = as_object(value, "ProductNode")?;
        let mut node = ProductNode::new(
            str_field(map, "ProductNode", "@id")?,
            str_field(map, "ProductNode", "productType")?.parse()?,
            str_field(map, "ProductNode", "name")?,
            usize_field(map, "ProductNode", "size", 0)?,
        )
        .with_characteristics(characteristics_from_json(map, "ProductNode", "characteristics")?);
        node.extension = opt_str_field(map, "ProductNode", "extension")?;
        Ok(node)
    }
}

impl DesignJson for ProtocolNode {
    fn to_json(&self) -> Json {
        let parameter_values: Vec<Json> = self
            .parameter_values
            .iter()
            .map(|value| {
                json!({
                    "name": annotation_to_json(&value.category.parameter_name),
                    "value": value_to_json(&value.value),
                    "unit": value.unit.as_ref().map(annotation_to_json),
                })
            })
            .collect();
        json!({
            "@id": self.id,
            "name": self.name,
            "protocolType": annotation_to_json(&self.protocol_type),
            "description": self.description,
            "uri": self.uri,
            "version": self.version,
            "parameterValues": parameter_values,
            "replicates": self.replicates(),
        })
    }

    fn from_json(value: &Json) -> Result<Self, IsaError> {
        let map = as_object(value, "ProtocolNode")?;
        let protocol_type = annotation_from_json(
            required(map, "ProtocolNode", "protocolType")?,
            "ProtocolNode",
            "protocolType",
        )?;
        let mut node = ProtocolNode::new(
            str_field(map, "ProtocolNode", "@id")?,
            str_field(map, "ProtocolNode", "name")?,
            protocol_type,
        );
        node.description = str_field(map, "ProtocolNode", "description")?;
        node.uri = str_field(map, "ProtocolNode", "uri")?;
        node.version = str_field(map, "ProtocolNode", "version")?;
        node.set_replicates(usize_field(map, "ProtocolNode", "replicates", 1)?)?;
        for item in array_field(map, "ProtocolNode", "parameterValues")? {
            let item = as_object(item, "ParameterValue")?;
            let name = annotation_from_json(required(item, "ParameterValue", "name")?, "ParameterValue", "name")?;
            node.parameter_values.push(ParameterValue::new(
                ProtocolParameter::new(name),
                value_from_json(required(item, "ParameterValue", "value")?, "ParameterValue")?,
                opt_annotation(item, "ParameterValue", "unit")?,
            )?);
        }
        Ok(node)
    }
}

fn sequence_node_to_json(node: &SequenceNode) -> Json {
    match node {
        SequenceNode::Product(product) => product.to_json(),
        SequenceNode::Protocol(protocol) => protocol.to_json(),
    }
}

fn sequence_node_from_json(value: &Json) -> Result<SequenceNode, IsaError> {
    let map = as_object(value, "AssayGraph")?;
    if map.contains_key("protocolType") {
        ProtocolNode::from_json(value).map(SequenceNode::Protocol)
    } else if map.contains_key("productType") {
        ProductNode::from_json(value).map(SequenceNode::Product)
    } else {
        Err(IsaError::type_violation(
            "AssayGraph",
            "nodes",
            value.to_string(),
            "neither a protocol nor a product node",
        ))
    }
}

fn opt_node_to_json(node: &Option<ProductNode>) -> Json {
    node.as_ref().map(ProductNode::to_json).unwrap_or(Json::Null)
}

fn opt_node_from_json(map: &Map<String, Json>, key: &str) -> Result<Option<ProductNode>, IsaError> {
    match map.get(key) {
        None | Some(Json::Null) => Ok(None),
        Some(value) => ProductNode::from_json(value).map(Some),
    }
}

impl DesignJson for QualityControl {
    fn to_json(&self) -> Json {
        let interspersed: Vec<Json> = self
            .interspersed_sample_types()
            .iter()
            .map(|(node, interval)| json!([node.to_json(), interval]))
            .collect();
        json!({
            "preRunSampleType": opt_node_to_json(&self.pre_run_sample_type),
            "postRunSampleType": opt_node_to_json(&self.post_run_sample_type),
            "interspersedSampleTypes": interspersed,
        })
    }

    fn from_json(value: &Json) -> Result<Self, IsaError> {
        let map = as_object(value, "QualityControl")?;
        let mut quality_control = QualityControl::new(
            opt_node_from_json(map, "preRunSampleType")?,
            opt_node_from_json(map, "postRunSampleType")?,
        );
        for item in array_field(map, "QualityControl", "interspersedSampleTypes")? {
            let pair = item.as_array().filter(|pair| pair.len() == 2).ok_or_else(|| {
                IsaError::type_violation(
                    "QualityControl",
                    "interspersedSampleTypes",
                    item.to_string(),
                    json_type(item),
                )
            })?;
            let interval = pair[1].as_u64().ok_or_else(|| {
                IsaError::type_violation(
                    "QualityControl",
                    "interspersing_interval",
                    pair[1].to_string(),
                    json_type(&pair[1]),
                )
            })?;
            quality_control.add_interspersed_sample_type(ProductNode::from_json(&pair[0])?, interval as usize)?;
        }
        Ok(quality_control)
    }
}

impl DesignJson for AssayGraph {
    fn to_json(&self) -> Json {
        let mut map = Map::new();
        map.insert("@id".to_string(), Json::String(self.id.clone()));
        map.insert("measurementType".to_string(), annotation_to_json(&self.measurement_type));
        map.insert("technologyType".to_string(), annotation_to_json(&self.technology_type));
        map.insert(
            "nodes".to_string(),
            Json::Array(self.nodes().map(sequence_node_to_json).collect()),
        );
        map.insert(
            "links".to_string(),
            Json::Array(
                self.links()
                    .into_iter()
                    .map(|(start, target)| json!([start, target]))
                    .collect(),
            ),
        );
        if let Some(quality_control) = &self.quality_control {
            map.insert("qualityControl".to_string(), quality_control.to_json());
        }
        Json::Object(map)
    }

    fn from_json(value: &Json) -> Result<Self, IsaError> {
        let map = as_object(value, "AssayGraph")?;
        let mut graph = AssayGraph::new(
            str_field(map, "AssayGraph", "@id")?,
            annotation_from_json(required(map, "AssayGraph", "measurementType")?, "AssayGraph", "measurementType")?,
            annotation_from_json(required(map, "AssayGraph", "technologyType")?, "AssayGraph", "technologyType")?,
        );
        for node in array_field(map, "AssayGraph", "nodes")? {
            graph.add_node(sequence_node_from_json(node)?)?;
        }
        for link in array_field(map, "AssayGraph", "links")? {
            let ends: Vec<&str> = link
                .as_array()
                .map(|pair| pair.iter().filter_map(Json::as_str).collect())
                .unwrap_or_default();
            let [start, target] = ends.as_slice() else {
                return Err(IsaError::type_violation("AssayGraph", "links", link.to_string(), json_type(link)));
            };
            graph.add_link(start, target)?;
        }
        if let Some(quality_control) = map.get("qualityControl").filter(|value| !value.is_null()) {
            graph.quality_control = Some(QualityControl::from_json(quality_control)?);
        }
        Ok(graph)
    }
}

impl DesignJson for SampleAndAssayPlan {
    fn to_json(&self) -> Json {
        let map: Map<String, Json> = self
            .sample_to_assay_map()
            .iter()
            .map(|(sample, graphs)| (sample.clone(), json!(graphs)))
            .collect();
        json!({
            "name": self.name,
            "samplePlan": self.sample_plan().iter().map(ProductNode::to_json).collect::<Vec<_>>(),
            "assayPlan": self.assay_plan().iter().map(AssayGraph::to_json).collect::<Vec<_>>(),
            "sampleToAssayMap": map,
        })
    }

    fn from_json(value: &Json) -> Result<Self, IsaError> {
        let map = as_object(value, "SampleAndAssayPlan")?;
        let mut plan = SampleAndAssayPlan::new(str_field(map, "SampleAndAssayPlan", "name")?);
        for node in array_field(map, "SampleAndAssayPlan", "samplePlan")? {
            plan.add_sample_type_to_plan(ProductNode::from_json(node)?)?;
        }
        for graph in array_field(map, "SampleAndAssayPlan", "assayPlan")? {
            plan.add_assay_graph_to_plan(AssayGraph::from_json(graph)?);
        }
        if let Some(mapping) = map.get("sampleToAssayMap").filter(|value| !value.is_null()) {
            let mapping = as_object(mapping, "SampleAndAssayPlan")?;
            for (sample, graphs) in mapping {
                for graph in graphs.as_array().map(Vec::as_slice).unwrap_or(&[]) {
                    let graph = graph.as_str().ok_or_else(|| {
                        IsaError::type_violation(
                            "SampleAndAssayPlan",
                            "sampleToAssayMap",
                            graph.to_string(),
                            json_type(graph),
                        )
                    })?;
                    plan.add_element_to_map(sample, graph)?;
                }
            }
        }
        Ok(plan)
    }
}

fn arm_body(arm: &StudyArm) -> Map<String, Json> {
    let mut plans: Vec<Json> = Vec::new();
    for plan in arm.sample_assay_plans() {
        plans.push(plan.to_json());
    }
    let mappings: Vec<Json> = arm
        .arm_map()
        .iter()
        .map(|entry| json!([entry.cell.name, entry.plan.as_ref().map(|plan| plan.name.clone())]))
        .collect();
    let mut map = Map::new();
    map.insert("groupSize".to_string(), json!(arm.group_size));
    map.insert("sourceType".to_string(), characteristic_to_json(&arm.source_type));
    map.insert(
        "sourceCharacteristics".to_string(),
        Json::Array(arm.source_characteristics().iter().map(characteristic_to_json).collect()),
    );
    map.insert(
        "cells".to_string(),
        Json::Array(arm.cells().map(StudyCell::to_json).collect()),
    );
    map.insert("sampleAndAssayPlans".to_string(), Json::Array(plans));
    map.insert("mappings".to_string(), Json::Array(mappings));
    map
}

fn arm_from_body(name: &str, map: &Map<String, Json>) -> Result<StudyArm, IsaError> {
    let mut arm = StudyArm::new(name, usize_field(map, "StudyArm", "groupSize", 0)?);
    if let Some(source_type) = map.get("sourceType").filter(|value| !value.is_null()) {
        arm.source_type = characteristic_from_json(source_type)?;
    }
    arm = arm.with_source_characteristics(characteristics_from_json(map, "StudyArm", "sourceCharacteristics")?);
    let plans = array_field(map, "StudyArm", "sampleAndAssayPlans")?
        .iter()
        .map(SampleAndAssayPlan::from_json)
        .collect::<Result<Vec<_>, _>>()?;
    let cells = array_field(map, "StudyArm", "cells")?;
    for (i, mapping) in array_field(map, "StudyArm", "mappings")?.iter().enumerate() {
        let (cell_name, plan_name) = match mapping.as_array().map(Vec::as_slice) {
            Some([cell, plan]) => (cell.as_str().unwrap_or_default(), plan.as_str()),
            _ => {
                return Err(IsaError::type_violation(
                    "StudyArm",
                    "mappings",
                    mapping.to_string(),
                    json_type(mapping),
                ));
            }
        };
        let cell = cells
            .get(i)
            .map(StudyCell::from_json)
            .transpose()?
            .filter(|cell| cell.name == cell_name)
            .ok_or_else(|| IsaError::missing("study cell", cell_name))?;
        let plan = match plan_name {
            Some(plan_name) => Some(
                plans
                    .iter()
                    .find(|plan| plan.name == plan_name)
                    .cloned()
                    .ok_or_else(|| IsaError::missing("sample and assay plan", plan_name))?,
            ),
            None => None,
        };
        arm.add_item_to_arm_map(cell, plan)?;
    }
    Ok(arm)
}

impl DesignJson for StudyArm {
    fn to_json(&self) -> Json {
        let mut map = arm_body(self);
        map.insert("name".to_string(), Json::String(self.name.clone()));
        Json::Object(map)
    }

    fn from_json(value: &Json) -> Result<Self, IsaError> {
        let map = as_object(value, "StudyArm")?;
        arm_from_body(&str_field(map, "StudyArm", "name")?, map)
    }
}

impl DesignJson for StudyDesign {
    fn to_json(&self) -> Json {
        let arms: Map<String, Json> = self
            .study_arms()
            .iter()
            .map(|arm| (arm.name.clone(), Json::Object(arm_body(arm))))
            .collect();
        let mut map = Map::new();
        if let Some(identifier) = &self.identifier {
            map.insert("identifier".to_string(), Json::String(identifier.clone()));
        }
        map.insert("name".to_string(), Json::String(self.name.clone()));
        map.insert(
            "designType".to_string(),
            self.design_type.as_ref().map(annotation_to_json).unwrap_or(Json::Null),
        );
        map.insert("description".to_string(), Json::String(self.description.clone()));
        map.insert("sourceType".to_string(), characteristic_to_json(&self.source_type));
        map.insert("studyArms".to_string(), Json::Object(arms));
        Json::Object(map)
    }

    fn from_json(value: &Json) -> Result<Self, IsaError> {
        let map = as_object(value, "StudyDesign")?;
        let mut design = StudyDesign::new(str_field(map, "StudyDesign", "name")?);
        design.identifier = map
            .get("identifier")
            .and_then(Json::as_str)
            .map(str::to_string);
        design.design_type = opt_annotation(map, "StudyDesign", "designType")?;
        design.description = str_field(map, "StudyDesign", "description")?;
        if let Some(source_type) = map.get("sourceType").filter(|value| !value.is_null()) {
            design.source_type = characteristic_from_json(source_type)?;
        }
        if let Some(arms) = map.get("studyArms").filter(|value| !value.is_null()) {
            for (name, body) in as_object(arms, "StudyDesign")? {
                design.add_study_arm(arm_from_body(name, as_object(body, "StudyArm")?)?)?;
            }
        }
        Ok(design)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_annotations_encode_as_strings() {
        assert_eq!(annotation_to_json(&OntologyAnnotation::new("blood")), json!("blood"));
        let sourced = OntologyAnnotation::sourced("blood", "UBERON", "UBERON:0000178");
        let encoded = annotation_to_json(&sourced);
        assert_eq!(encoded["termSource"], json!("UBERON"));
        assert_eq!(annotation_from_json(&encoded, "Characteristic", "value").unwrap(), sourced);
    }

    #[test]
    fn term_values_survive_as_terms() {
        let value = Value::Term(OntologyAnnotation::new("liver"));
        assert_eq!(value_from_json(&value_to_json(&value), "Characteristic").unwrap(), value);
    }
}
