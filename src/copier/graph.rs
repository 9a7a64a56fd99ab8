//! Type graph of a model.
//!
//! Uses `petgraph::DiGraph` with:
//! - Nodes: the key of every type definition in the model
//! - Edges: "refers to", one per edge type that resolves to a definition

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use std::collections::{HashMap, HashSet};

use crate::model::{Binary, TypeDefinitionKey};

/// Directed "refers to" graph over the type definitions of one model.
///
/// The graph is a snapshot: later edits to the model are not reflected.
pub struct TypeGraph {
    graph: DiGraph<TypeDefinitionKey, ()>,

    /// Reverse index: key -> node.
    nodes: HashMap<TypeDefinitionKey, NodeIndex>,
}

impl TypeGraph {
    /// Build the graph of `model`.
    ///
    /// Edge types that are primitives, or whose reference does not resolve
    /// in `model`, contribute no edge.
    pub fn build(model: &Binary) -> Self {
        let mut graph = DiGraph::with_capacity(model.type_definitions.len(), 0);
        let mut nodes = HashMap::with_capacity(model.type_definitions.len());
        for key in model.type_definitions.keys() {
            nodes.insert(*key, graph.add_node(*key));
        }

        for (key, definition) in &model.type_definitions {
            let from = nodes[key];
            for edge in definition.edges() {
                if let Some(to) = edge.definition().and_then(|target| nodes.get(&target)) {
                    graph.add_edge(from, *to, ());
                }
            }
        }

        Self { graph, nodes }
    }

    pub fn contains(&self, key: &TypeDefinitionKey) -> bool {
        self.nodes.contains_key(key)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Definitions `key` refers to directly.
    pub fn successors(&self, key: &TypeDefinitionKey) -> Vec<TypeDefinitionKey> {
        match self.nodes.get(key) {
            Some(node) => self
                .graph
                .neighbors(*node)
                .map(|n| self.graph[n])
                .collect(),
            None => Vec::new(),
        }
    }

    /// `root` plus every definition transitively reachable from it.
    ///
    /// Empty if `root` is not part of the graph.
    pub fn closure(&self, root: &TypeDefinitionKey) -> HashSet<TypeDefinitionKey> {
        let mut visited = HashSet::new();
        if let Some(start) = self.nodes.get(root) {
            let mut dfs = Dfs::new(&self.graph, *start);
            while let Some(node) = dfs.next(&self.graph) {
                visited.insert(self.graph[node]);
            }
        }
        visited
    }
}
