use indexmap::IndexMap;

use crate::design::assay_graph::{AssayGraph, ProductNode, ProductType, QualityControl};
use crate::design::declaration::{AssayDeclaration, ProductDeclaration};
use crate::error::IsaError;
use crate::model::IdGenerator;
use crate::model::identifiers::n_digits;

pub const ASSAY_GRAPH_PREFIX: &str = "AT";

/// Sample types to collect in a cell and the assay workflows each of them feeds.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SampleAndAssayPlan {
    pub name: String,
    sample_plan: Vec<ProductNode>,
    assay_plan: Vec<AssayGraph>,
    sample_to_assay_map: IndexMap<String, Vec<String>>,
}

impl SampleAndAssayPlan {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn sample_plan(&self) -> &[ProductNode] {
        &self.sample_plan
    }

    pub fn assay_plan(&self) -> &[AssayGraph] {
        &self.assay_plan
    }

    /// Sample node id to the ids of the assay graphs it is sent to.
    pub fn sample_to_assay_map(&self) -> &IndexMap<String, Vec<String>> {
        &self.sample_to_assay_map
    }

    pub fn add_sample_type_to_plan(&mut self, sample_type: ProductNode) -> Result<(), IsaError> {
        if sample_type.node_type != ProductType::Sample {
            return Err(IsaError::type_violation(
                "SampleAndAssayPlan",
                "sample_plan",
                sample_type.node_type.as_str(),
                "ProductNode",
            ));
        }
        if !self.sample_plan.iter().any(|known| known.id == sample_type.id) {
            self.sample_plan.push(sample_type);
        }
        Ok(())
    }

    pub fn add_assay_graph_to_plan(&mut self, assay_graph: AssayGraph) {
        if !self.assay_plan.iter().any(|known| known.id == assay_graph.id) {
            self.assay_plan.push(assay_graph);
        }
    }

    pub fn add_element_to_map(&mut self, sample_node: &str, assay_graph: &str) -> Result<(), IsaError> {
        if !self.sample_plan.iter().any(|node| node.id == sample_node) {
            return Err(IsaError::missing("sample type", sample_node));
        }
        if !self.assay_plan.iter().any(|graph| graph.id == assay_graph) {
            return Err(IsaError::missing("assay graph", assay_graph));
        }
        let graphs = self
            .sample_to_assay_map
            .entry(sample_node.to_string())
            .or_default();
        if !graphs.iter().any(|known| known == assay_graph) {
            graphs.push(assay_graph.to_string());
        }
        Ok(())
    }

    pub fn get_assay_graph(&self, id: &str) -> Option<&AssayGraph> {
        self.assay_plan.iter().find(|graph| graph.id == id)
    }

    /// Assay graphs fed by the given sample node, in assay plan order.
    pub fn graphs_for_sample(&self, sample_node: &str) -> Vec<&AssayGraph> {
        let Some(ids) = self.sample_to_assay_map.get(sample_node) else {
            return Vec::new();
        };
        self.assay_plan
            .iter()
            .filter(|graph| ids.contains(&graph.id))
            .collect()
    }

    /// Builds sample nodes and assay graphs from declarations and maps every sample type
    /// to the graphs whose `selected_sample_types` admit it (all graphs when unset).
    pub fn from_declaration(
        name: impl Into<String>,
        sample_types: &[ProductDeclaration],
        assays: &[AssayDeclaration],
        quality_controls: &[QualityControl],
        mut ids: Option<&mut (dyn IdGenerator + '_)>,
    ) -> Result<Self, IsaError> {
        let mut plan = Self::new(name);
        for (i, sample_type) in sample_types.iter().enumerate() {
            let id = match ids.as_deref_mut() {
                Some(ids) => ids.next_uuid(),
                None => format!("{}_{i:03}", ProductType::Sample.as_str()),
            };
            let node = ProductNode::new(
                id,
                sample_type.node_type.parse()?,
                ProductType::Sample.as_str(),
                sample_type.size,
            )
            .with_characteristics(sample_type.characteristics());
            plan.add_sample_type_to_plan(node)?;
        }
        let width = n_digits(assays.len());
        for (i, declaration) in assays.iter().enumerate() {
            let graph_id = match (ids.as_deref_mut(), &declaration.id) {
                (Some(ids), _) => ids.next_uuid(),
                (None, Some(id)) => format!("{ASSAY_GRAPH_PREFIX}{id}"),
                (None, None) => format!("{ASSAY_GRAPH_PREFIX}{i:0width$}"),
            };
            let graph = AssayGraph::from_declaration(
                declaration,
                graph_id.clone(),
                quality_controls.get(i).cloned(),
                ids.as_deref_mut(),
            )?;
            plan.add_assay_graph_to_plan(graph);
            let selected: Vec<String> = plan
                .sample_plan
                .iter()
                .filter(|node| match &declaration.selected_sample_types {
                    None => true,
                    Some(selected) => node
                        .characteristics
                        .iter()
                        .any(|characteristic| selected.contains(&characteristic.value.to_string())),
                })
                .map(|node| node.id.clone())
                .collect();
            for sample_node in selected {
                plan.add_element_to_map(&sample_node, &graph_id)?;
            }
        }
        Ok(plan)
    }
}
