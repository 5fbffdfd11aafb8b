use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use tracing::debug;

use crate::design::declaration::{AssayDeclaration, WorkflowStep};
use crate::error::IsaError;
use crate::model::identifiers::{Identifier, WHITESPACE};
use crate::model::{
    Characteristic, IdGenerator, OntologyAnnotation, ParameterValue, Protocol, ProtocolParameter,
    Value,
};

pub const INVALID_LINK_ERROR: &str =
    "ProductNode->ProductNode links are not allowed in an assay workflow.";
pub const MISSING_NODE_ERROR: &str = "Start or target node have not been added to the AssayGraph yet";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProductType {
    Source,
    Sample,
    Extract,
    LabeledExtract,
    DataFile,
}

impl ProductType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductType::Source => "source",
            ProductType::Sample => "sample",
            ProductType::Extract => "extract",
            ProductType::LabeledExtract => "labeled extract",
            ProductType::DataFile => "data file",
        }
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProductType {
    type Err = IsaError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "source" => Ok(ProductType::Source),
            "sample" => Ok(ProductType::Sample),
            "extract" => Ok(ProductType::Extract),
            "labeled extract" | "labeled_extract" => Ok(ProductType::LabeledExtract),
            "data file" | "data_file" => Ok(ProductType::DataFile),
            _ => Err(IsaError::type_violation("ProductNode", "type", value, "str")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProductNode {
    pub id: String,
    pub node_type: ProductType,
    pub name: String,
    pub characteristics: Vec<Characteristic>,
    pub size: usize,
    pub extension: Option<String>,
}

impl ProductNode {
    pub fn new(id: impl Into<String>, node_type: ProductType, name: impl Into<String>, size: usize) -> Self {
        Self {
            id: id.into(),
            node_type,
            name: name.into(),
            characteristics: Vec::new(),
            size,
            extension: None,
        }
    }

    pub fn with_characteristics(mut self, characteristics: Vec<Characteristic>) -> Self {
        self.characteristics = characteristics;
        self
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = Some(extension.into());
        self
    }

    /// Term of the first characteristic value, used when naming materialized samples.
    pub fn sample_term(&self) -> String {
        self.characteristics
            .first()
            .map(|characteristic| match &characteristic.value {
                Value::Term(term) => term.term.clone(),
                other => other.to_string(),
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProtocolNode {
    pub id: String,
    pub name: String,
    pub protocol_type: OntologyAnnotation,
    pub description: String,
    pub uri: String,
    pub version: String,
    pub parameter_values: Vec<ParameterValue>,
    replicates: usize,
}

impl ProtocolNode {
    pub fn new(id: impl Into<String>, name: impl Into<String>, protocol_type: impl Into<OntologyAnnotation>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            protocol_type: protocol_type.into(),
            description: String::new(),
            uri: String::new(),
            version: String::new(),
            parameter_values: Vec::new(),
            replicates: 1,
        }
    }

    pub fn replicates(&self) -> usize {
        self.replicates
    }

    pub fn set_replicates(&mut self, replicates: usize) -> Result<(), IsaError> {
        if replicates < 1 {
            return Err(IsaError::type_violation(
                "ProtocolNode",
                "replicates",
                replicates.to_string(),
                "int < 1",
            ));
        }
        self.replicates = replicates;
        Ok(())
    }

    pub fn add_parameter_value(
        &mut self,
        parameter: &str,
        value: impl Into<Value>,
        unit: Option<OntologyAnnotation>,
    ) -> Result<(), IsaError> {
        let value = ParameterValue::new(ProtocolParameter::new(parameter), value, unit)?;
        self.parameter_values.push(value);
        Ok(())
    }

    pub fn parameters(&self) -> Vec<ProtocolParameter> {
        self.parameter_values
            .iter()
            .map(|value| value.category.clone())
            .collect()
    }

    /// Study-level protocol executed by the processes materialized from this node of `graph_id`.
    pub fn to_protocol(&self, graph_id: &str) -> Protocol {
        Protocol {
            id: self.protocol_id(graph_id),
            name: self.name.clone(),
            protocol_type: self.protocol_type.clone(),
            description: self.description.clone(),
            uri: self.uri.clone(),
            version: self.version.clone(),
            parameters: self.parameters(),
            ..Protocol::default()
        }
    }

    /// Node ids repeat across graphs declared from the same template, so the graph id is part of the key.
    pub fn protocol_id(&self, graph_id: &str) -> String {
        Identifier::namespaced("protocol", &format!("{graph_id}-{}", self.id))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SequenceNode {
    Product(ProductNode),
    Protocol(ProtocolNode),
}

impl SequenceNode {
    pub fn id(&self) -> &str {
        match self {
            SequenceNode::Product(node) => &node.id,
            SequenceNode::Protocol(node) => &node.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            SequenceNode::Product(node) => &node.name,
            SequenceNode::Protocol(node) => &node.name,
        }
    }

    /// How many times the walk repeats this node for each incoming item.
    pub fn multiplicity(&self) -> usize {
        match self {
            SequenceNode::Product(node) => node.size,
            SequenceNode::Protocol(node) => node.replicates,
        }
    }

    pub fn as_protocol(&self) -> Option<&ProtocolNode> {
        match self {
            SequenceNode::Protocol(node) => Some(node),
            SequenceNode::Product(_) => None,
        }
    }

    pub fn as_product(&self) -> Option<&ProductNode> {
        match self {
            SequenceNode::Product(node) => Some(node),
            SequenceNode::Protocol(_) => None,
        }
    }
}

impl From<ProductNode> for SequenceNode {
    fn from(value: ProductNode) -> Self {
        SequenceNode::Product(value)
    }
}

impl From<ProtocolNode> for SequenceNode {
    fn from(value: ProtocolNode) -> Self {
        SequenceNode::Protocol(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QualityControl {
    pub pre_run_sample_type: Option<ProductNode>,
    pub post_run_sample_type: Option<ProductNode>,
    interspersed_sample_types: Vec<(ProductNode, usize)>,
}

impl QualityControl {
    pub fn new(pre_run_sample_type: Option<ProductNode>, post_run_sample_type: Option<ProductNode>) -> Self {
        Self {
            pre_run_sample_type,
            post_run_sample_type,
            interspersed_sample_types: Vec::new(),
        }
    }

    pub fn interspersed_sample_types(&self) -> &[(ProductNode, usize)] {
        &self.interspersed_sample_types
    }

    pub fn add_interspersed_sample_type(
        &mut self,
        sample_type: ProductNode,
        interval: usize,
    ) -> Result<(), IsaError> {
        if interval < 1 {
            return Err(IsaError::type_violation(
                "QualityControl",
                "interspersing_interval",
                interval.to_string(),
                "int < 1",
            ));
        }
        self.interspersed_sample_types.push((sample_type, interval));
        Ok(())
    }
}

/// Directed assay workflow of protocol and product nodes, kept in insertion order.
#[derive(Debug, Clone)]
pub struct AssayGraph {
    pub id: String,
    pub measurement_type: OntologyAnnotation,
    pub technology_type: OntologyAnnotation,
    pub quality_control: Option<QualityControl>,
    graph: DiGraph<SequenceNode, ()>,
    index: IndexMap<String, NodeIndex>,
}

impl AssayGraph {
    pub fn new(
        id: impl Into<String>,
        measurement_type: impl Into<OntologyAnnotation>,
        technology_type: impl Into<OntologyAnnotation>,
    ) -> Self {
        Self {
            id: id.into(),
            measurement_type: measurement_type.into(),
            technology_type: technology_type.into(),
            quality_control: None,
            graph: DiGraph::new(),
            index: IndexMap::new(),
        }
    }

    pub fn name(&self) -> String {
        format!("{}-{}", self.measurement_type.term, self.technology_type.term)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &SequenceNode> + '_ {
        self.index.values().map(|ix| &self.graph[*ix])
    }

    pub fn node(&self, id: &str) -> Option<&SequenceNode> {
        self.index.get(id).map(|ix| &self.graph[*ix])
    }

    pub fn node_count(&self) -> usize {
        self.index.len()
    }

    pub fn add_node(&mut self, node: impl Into<SequenceNode>) -> Result<(), IsaError> {
        let node = node.into();
        if self.index.contains_key(node.id()) {
            return Err(IsaError::topology(
                &self.id,
                format!("node {} is already present", node.id()),
            ));
        }
        let id = node.id().to_string();
        let ix = self.graph.add_node(node);
        self.index.insert(id, ix);
        Ok(())
    }

    pub fn add_link(&mut self, start: &str, target: &str) -> Result<(), IsaError> {
        let (Some(&from), Some(&to)) = (self.index.get(start), self.index.get(target)) else {
            return Err(IsaError::topology(&self.id, MISSING_NODE_ERROR));
        };
        if matches!(
            (&self.graph[from], &self.graph[to]),
            (SequenceNode::Product(_), SequenceNode::Product(_))
        ) {
            return Err(IsaError::topology(&self.id, INVALID_LINK_ERROR));
        }
        self.graph.add_edge(from, to, ());
        Ok(())
    }

    /// Links as `(start id, target id)` in insertion order.
    pub fn links(&self) -> Vec<(&str, &str)> {
        self.graph
            .edge_references()
            .map(|edge| (self.graph[edge.source()].id(), self.graph[edge.target()].id()))
            .collect()
    }

    fn lookup(&self, id: &str) -> Result<NodeIndex, IsaError> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| IsaError::topology(&self.id, MISSING_NODE_ERROR))
    }

    fn neighbours(&self, ix: NodeIndex, direction: Direction) -> Vec<&SequenceNode> {
        let mut edges: Vec<_> = self.graph.edges_directed(ix, direction).collect();
        edges.sort_by_key(|edge| edge.id());
        edges
            .into_iter()
            .map(|edge| match direction {
                Direction::Outgoing => &self.graph[edge.target()],
                Direction::Incoming => &self.graph[edge.source()],
            })
            .collect()
    }

    pub fn start_nodes(&self) -> Vec<&SequenceNode> {
        self.index
            .values()
            .filter(|ix| {
                self.graph
                    .neighbors_directed(**ix, Direction::Incoming)
                    .next()
                    .is_none()
            })
            .map(|ix| &self.graph[*ix])
            .collect()
    }

    pub fn end_nodes(&self) -> Vec<&SequenceNode> {
        self.index
            .values()
            .filter(|ix| {
                self.graph
                    .neighbors_directed(**ix, Direction::Outgoing)
                    .next()
                    .is_none()
            })
            .map(|ix| &self.graph[*ix])
            .collect()
    }

    pub fn next_nodes(&self, id: &str) -> Result<Vec<&SequenceNode>, IsaError> {
        Ok(self.neighbours(self.lookup(id)?, Direction::Outgoing))
    }

    pub fn previous_nodes(&self, id: &str) -> Result<Vec<&SequenceNode>, IsaError> {
        Ok(self.neighbours(self.lookup(id)?, Direction::Incoming))
    }

    /// Nearest protocol ancestors, found by walking back one layer at a time.
    pub fn previous_protocol_nodes(&self, id: &str) -> Result<Vec<&ProtocolNode>, IsaError> {
        let mut current: BTreeSet<NodeIndex> = BTreeSet::from([self.lookup(id)?]);
        let mut visited = current.clone();
        while !current.is_empty() {
            let previous: BTreeSet<NodeIndex> = current
                .iter()
                .flat_map(|ix| self.graph.neighbors_directed(*ix, Direction::Incoming))
                .filter(|ix| !visited.contains(ix))
                .collect();
            let protocols: Vec<&ProtocolNode> = previous
                .iter()
                .filter_map(|ix| self.graph[*ix].as_protocol())
                .collect();
            if !protocols.is_empty() {
                return Ok(protocols);
            }
            visited.extend(previous.iter().copied());
            current = previous;
        }
        Ok(Vec::new())
    }

    pub fn find_paths(&self, start: &str, end: &str) -> Result<Vec<Vec<String>>, IsaError> {
        let start = self.lookup(start)?;
        let end = self.lookup(end)?;
        let mut paths = Vec::new();
        let mut path = vec![start];
        self.extend_paths(end, &mut path, &mut paths);
        Ok(paths)
    }

    fn extend_paths(&self, end: NodeIndex, path: &mut Vec<NodeIndex>, paths: &mut Vec<Vec<String>>) {
        let Some(&last) = path.last() else {
            return;
        };
        if last == end {
            paths.push(path.iter().map(|ix| self.graph[*ix].id().to_string()).collect());
            return;
        }
        for next in self.neighbours(last, Direction::Outgoing) {
            let next = self.index[next.id()];
            if !path.contains(&next) {
                path.push(next);
                self.extend_paths(end, path, paths);
                path.pop();
            }
        }
    }

    pub fn find_all_paths(&self) -> Result<Vec<Vec<String>>, IsaError> {
        let mut paths = Vec::new();
        for start in self.start_nodes() {
            for end in self.end_nodes() {
                paths.extend(self.find_paths(start.id(), end.id())?);
            }
        }
        Ok(paths)
    }

    pub fn as_petgraph(&self) -> &DiGraph<SequenceNode, ()> {
        &self.graph
    }

    pub fn protocol_nodes(&self) -> impl Iterator<Item = &ProtocolNode> + '_ {
        self.nodes().filter_map(SequenceNode::as_protocol)
    }

    /// Builds the graph layer by layer from an ordered workflow declaration.
    pub fn from_declaration(
        declaration: &AssayDeclaration,
        graph_id: impl Into<String>,
        quality_control: Option<QualityControl>,
        mut ids: Option<&mut (dyn IdGenerator + '_)>,
    ) -> Result<Self, IsaError> {
        let mut graph = Self::new(
            graph_id,
            declaration.measurement_type.to_annotation(),
            declaration.technology_type.to_annotation(),
        );
        let prefix = format!("assay{}", declaration.id.as_deref().unwrap_or("0"));
        let mut previous: Vec<String> = Vec::new();
        for (name, step) in declaration.steps()? {
            let slug = WHITESPACE.replace_all(name, "_").into_owned();
            let mut current = Vec::new();
            match step {
                WorkflowStep::Products(products) => {
                    if previous.is_empty() {
                        return Err(IsaError::topology(
                            &graph.id,
                            format!("product layer {name} must follow a protocol step"),
                        ));
                    }
                    for (i, product) in products.iter().enumerate() {
                        let node_type: ProductType = product.node_type.parse()?;
                        for (j, prev) in previous.iter().enumerate() {
                            let id = node_id(&mut ids, &slug, i, Some(j));
                            let mut node = ProductNode::new(id.clone(), node_type, name, product.size)
                                .with_characteristics(product.characteristics());
                            node.extension = product.extension.clone();
                            graph.add_node(node)?;
                            graph.add_link(prev, &id)?;
                            current.push(id);
                        }
                    }
                }
                WorkflowStep::Protocol { parameters, replicates } => {
                    let names: Vec<&str> = parameters.iter().map(|(key, _)| key.as_str()).collect();
                    let value_lists: Vec<&[Value]> =
                        parameters.iter().map(|(_, values)| values.as_slice()).collect();
                    let label = format!("{prefix} - {name}");
                    for (i, combination) in cartesian_product(&value_lists).into_iter().enumerate() {
                        let template = protocol_node(&label, &names, &combination, replicates)?;
                        if previous.is_empty() {
                            let id = node_id(&mut ids, &slug, i, None);
                            graph.add_node(ProtocolNode { id: id.clone(), ..template })?;
                            current.push(id);
                        } else {
                            for (j, prev) in previous.iter().enumerate() {
                                let id = node_id(&mut ids, &slug, i, Some(j));
                                graph.add_node(ProtocolNode {
                                    id: id.clone(),
                                    ..template.clone()
                                })?;
                                graph.add_link(prev, &id)?;
                                current.push(id);
                            }
                        }
                    }
                }
            }
            previous = current;
        }
        graph.quality_control = quality_control;
        debug!(graph = %graph.id, nodes = graph.node_count(), "assay graph declared");
        Ok(graph)
    }
}

fn node_id(ids: &mut Option<&mut (dyn IdGenerator + '_)>, slug: &str, i: usize, j: Option<usize>) -> String {
    if let Some(ids) = ids.as_deref_mut() {
        return ids.next_uuid();
    }
    match j {
        Some(j) => format!("{slug}_{i:03}_{j:03}"),
        None => format!("{slug}_{i:03}"),
    }
}

fn protocol_node(
    label: &str,
    names: &[&str],
    combination: &[Value],
    replicates: usize,
) -> Result<ProtocolNode, IsaError> {
    let mut node = ProtocolNode::new(String::new(), label, label);
    node.set_replicates(replicates)?;
    for (name, value) in names.iter().zip(combination) {
        node.add_parameter_value(name, value.clone(), None)?;
    }
    Ok(node)
}

impl PartialEq for AssayGraph {
    fn eq(&self, other: &Self) -> bool {
        let nodes = |graph: &AssayGraph| graph.nodes().cloned().collect::<BTreeSet<_>>();
        let links = |graph: &AssayGraph| {
            graph
                .links()
                .into_iter()
                .map(|(a, b)| (a.to_string(), b.to_string()))
                .collect::<BTreeSet<_>>()
        };
        self.measurement_type == other.measurement_type
            && self.technology_type == other.technology_type
            && self.quality_control == other.quality_control
            && nodes(self) == nodes(other)
            && links(self) == links(other)
    }
}

impl Eq for AssayGraph {}

/// Every combination picking one value per list, first list varying slowest.
fn cartesian_product(lists: &[&[Value]]) -> Vec<Vec<Value>> {
    lists.iter().fold(vec![Vec::new()], |acc, values| {
        acc.into_iter()
            .flat_map(|prefix| {
                values.iter().map(move |value| {
                    let mut next = prefix.clone();
                    next.push(value.clone());
                    next
                })
            })
            .collect()
    })
}
