use std::collections::HashSet;

use indexmap::IndexMap;
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::model::process::{Process, ProcessIo, plink_at};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GraphNode {
    Process(String),
    Io(ProcessIo),
}

/// Directed view over a process sequence: input -> process -> output.
#[derive(Debug, Default)]
pub struct ProcessGraph {
    graph: DiGraph<GraphNode, ()>,
    index: IndexMap<GraphNode, NodeIndex>,
}

impl ProcessGraph {
    pub fn build(processes: &[Process]) -> Self {
        let mut graph = Self::default();
        for process in processes {
            let node = graph.intern(GraphNode::Process(process.id.clone()));
            for input in &process.inputs {
                let input = graph.intern(GraphNode::Io(input.clone()));
                graph.link(input, node);
            }
            for output in &process.outputs {
                let output = graph.intern(GraphNode::Io(output.clone()));
                graph.link(node, output);
            }
        }
        graph
    }

    fn intern(&mut self, node: GraphNode) -> NodeIndex {
        if let Some(ix) = self.index.get(&node) {
            return *ix;
        }
        let ix = self.graph.add_node(node.clone());
        self.index.insert(node, ix);
        ix
    }

    fn link(&mut self, from: NodeIndex, to: NodeIndex) {
        if self.graph.find_edge(from, to).is_none() {
            self.graph.add_edge(from, to, ());
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains(&self, node: &GraphNode) -> bool {
        self.index.contains_key(node)
    }

    pub fn start_nodes(&self) -> Vec<&GraphNode> {
        self.filtered(Direction::Incoming)
    }

    pub fn end_nodes(&self) -> Vec<&GraphNode> {
        self.filtered(Direction::Outgoing)
    }

    fn filtered(&self, direction: Direction) -> Vec<&GraphNode> {
        self.index
            .iter()
            .filter(|(_, ix)| {
                self.graph
                    .neighbors_directed(**ix, direction)
                    .next()
                    .is_none()
            })
            .map(|(node, _)| node)
            .collect()
    }

    pub fn successors(&self, node: &GraphNode) -> Vec<&GraphNode> {
        self.neighbours(node, Direction::Outgoing)
    }

    pub fn predecessors(&self, node: &GraphNode) -> Vec<&GraphNode> {
        self.neighbours(node, Direction::Incoming)
    }

    fn neighbours(&self, node: &GraphNode, direction: Direction) -> Vec<&GraphNode> {
        let Some(ix) = self.index.get(node) else {
            return Vec::new();
        };
        let mut found = self
            .graph
            .neighbors_directed(*ix, direction)
            .collect::<Vec<_>>();
        found.sort();
        found.into_iter().map(|ix| &self.graph[ix]).collect()
    }

    /// Processes consuming any output of `process_id`.
    pub fn downstream_processes(&self, process_id: &str) -> Vec<&str> {
        let mut seen = HashSet::new();
        let mut found = Vec::new();
        for output in self.successors(&GraphNode::Process(process_id.to_string())) {
            for next in self.successors(output) {
                if let GraphNode::Process(id) = next {
                    if seen.insert(id.as_str()) {
                        found.push(id.as_str());
                    }
                }
            }
        }
        found
    }
}

/// Fills unset prev/next links from input/output overlap, first match in sequence order.
pub fn infer_process_links(processes: &mut [Process]) -> usize {
    let mut linked = 0;
    for prev in 0..processes.len() {
        if processes[prev].next_process.is_some() {
            continue;
        }
        let outputs = processes[prev]
            .outputs
            .iter()
            .cloned()
            .collect::<HashSet<_>>();
        let candidate = (0..processes.len()).find(|next| {
            *next != prev
                && processes[*next].prev_process.is_none()
                && processes[*next]
                    .inputs
                    .iter()
                    .any(|input| outputs.contains(input))
        });
        if let Some(next) = candidate {
            if plink_at(processes, prev, next).is_ok() {
                linked += 1;
            }
        }
    }
    linked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> Vec<Process> {
        let mut sampling = Process::new("sampling", "#protocol/sampling");
        sampling.inputs = vec![ProcessIo::Source("#source/s1".to_string())];
        sampling.outputs = vec![ProcessIo::Sample("#sample/x1".to_string())];
        let mut extraction = Process::new("extraction", "#protocol/extraction");
        extraction.inputs = vec![ProcessIo::Sample("#sample/x1".to_string())];
        extraction.outputs = vec![ProcessIo::Material("#material/e1".to_string())];
        vec![sampling, extraction]
    }

    #[test]
    fn graph_connects_inputs_processes_and_outputs() {
        let processes = chain();
        let graph = ProcessGraph::build(&processes);
        assert_eq!(graph.node_count(), 5);
        assert_eq!(graph.edge_count(), 4);
        assert_eq!(
            graph.start_nodes(),
            vec![&GraphNode::Io(ProcessIo::Source("#source/s1".to_string()))]
        );
        assert_eq!(graph.downstream_processes("#process/sampling"), vec!["#process/extraction"]);
    }

    #[test]
    fn links_are_inferred_from_shared_materials() {
        let mut processes = chain();
        assert_eq!(infer_process_links(&mut processes), 1);
        assert_eq!(
            processes[0].next_process.as_deref(),
            Some("#process/extraction")
        );
        assert_eq!(infer_process_links(&mut processes), 0);
    }
}
