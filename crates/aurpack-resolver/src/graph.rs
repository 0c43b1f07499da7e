use std::collections::BTreeMap;

use aurpack_core::PackageNode;

/// Packages keyed by name, with ordered direct-dependency lists stored as node indices.
///
/// Nodes keep their discovery order; the first inserted node is the root.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: Vec<PackageNode>,
    edges: Vec<Vec<usize>>,
    index: BTreeMap<String, usize>,
}

impl DependencyGraph {
    /// Adds `node`, or replaces the node already stored under the same name.
    pub fn insert(&mut self, node: PackageNode) -> usize {
        if let Some(&existing) = self.index.get(&node.name) {
            self.nodes[existing] = node;
            return existing;
        }
        let position = self.nodes.len();
        self.index.insert(node.name.clone(), position);
        self.nodes.push(node);
        self.edges.push(Vec::new());
        position
    }

    /// Records that `package` depends on `dependency`. Repeated edges are ignored.
    pub fn add_dependency(&mut self, package: usize, dependency: usize) {
        debug_assert!(dependency < self.nodes.len());
        let edges = &mut self.edges[package];
        if !edges.contains(&dependency) {
            edges.push(dependency);
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root(&self) -> Option<&PackageNode> {
        self.nodes.first()
    }

    pub fn nodes(&self) -> &[PackageNode] {
        &self.nodes
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn node(&self, name: &str) -> Option<&PackageNode> {
        self.index_of(name).map(|position| &self.nodes[position])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn edges_of(&self, position: usize) -> &[usize] {
        &self.edges[position]
    }

    /// Direct dependencies of `name` in declared order.
    pub fn dependencies_of(&self, name: &str) -> Vec<&PackageNode> {
        self.index_of(name)
            .map(|position| {
                self.edges[position]
                    .iter()
                    .map(|&dependency| &self.nodes[dependency])
                    .collect()
            })
            .unwrap_or_default()
    }
}
