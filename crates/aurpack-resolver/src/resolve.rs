use std::collections::{BTreeMap, VecDeque};

use anyhow::Result;
use aurpack_core::{AurError, Origin, PackageNode, ProbeStatus};
use tracing::debug;

use crate::graph::DependencyGraph;
use crate::info::{query_failure, PackageInfoSource};
use crate::order::topo_order_indices;

/// A resolved graph together with its dependency-first order.
#[derive(Debug, Clone)]
pub struct InstallPlan {
    pub graph: DependencyGraph,
    pub order: Vec<usize>,
}

impl InstallPlan {
    pub fn root(&self) -> Option<&PackageNode> {
        self.graph.root()
    }

    pub fn ordered(&self) -> impl Iterator<Item = &PackageNode> {
        self.order
            .iter()
            .map(|&position| &self.graph.nodes()[position])
    }
}

/// Resolves `name` from the recipe host, expands its dependencies and orders them.
pub fn resolve_install_plan(source: &PackageInfoSource<'_>, name: &str) -> Result<InstallPlan> {
    let root = source.node(name, Origin::SourceBuild)?;
    plan_from_root(source, root)
}

/// Expands and orders an already resolved root node.
pub fn plan_from_root(source: &PackageInfoSource<'_>, root: PackageNode) -> Result<InstallPlan> {
    let graph = build_dependency_graph(source, root)?;
    let order = topo_order_indices(&graph)?;
    Ok(InstallPlan { graph, order })
}

/// Breadth-first expansion of `root`'s declared dependencies.
///
/// A dependency name seen before, either as declared or as resolved, reuses the
/// existing node instead of fetching it again.
pub fn build_dependency_graph(
    source: &PackageInfoSource<'_>,
    root: PackageNode,
) -> Result<DependencyGraph> {
    let mut graph = DependencyGraph::default();
    let mut aliases: BTreeMap<String, usize> = BTreeMap::new();
    let mut queue = VecDeque::from([graph.insert(root)]);

    while let Some(current) = queue.pop_front() {
        let (parent, declared) = {
            let node = &graph.nodes()[current];
            (node.name.clone(), node.dependencies.clone())
        };

        for dependency in declared {
            let known = aliases
                .get(&dependency)
                .copied()
                .or_else(|| graph.index_of(&dependency));
            if let Some(existing) = known {
                graph.add_dependency(current, existing);
                continue;
            }

            let (resolved, origin) = classify_dependency(source, &parent, &dependency)?;
            let position = match graph.index_of(&resolved) {
                Some(existing) => existing,
                None => {
                    let node = source.node(&resolved, origin)?;
                    let position = graph.insert(node);
                    queue.push_back(position);
                    position
                }
            };
            aliases.insert(dependency, position);
            graph.add_dependency(current, position);
        }
    }

    Ok(graph)
}

/// Anchored pacman search pattern matching exactly `dependency`.
///
/// Only POSIX extended regex metacharacters are escaped; `-` stays literal.
pub fn provider_pattern(dependency: &str) -> String {
    let mut pattern = String::with_capacity(dependency.len() + 2);
    pattern.push('^');
    for ch in dependency.chars() {
        if matches!(
            ch,
            '.' | '[' | ']' | '(' | ')' | '{' | '}' | '*' | '+' | '?' | '|' | '^' | '$' | '\\'
        ) {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('$');
    pattern
}

/// Decides which subsystem satisfies `dependency`, returning the name to install.
///
/// The package manager wins when it has the exact name or a provider of it;
/// otherwise the recipe host must confirm the package exists.
pub fn classify_dependency(
    source: &PackageInfoSource<'_>,
    parent: &str,
    dependency: &str,
) -> Result<(String, Origin)> {
    let database = source.database();
    if database
        .query_remote(dependency)
        .map_err(|err| query_failure(dependency, err))?
        .is_some()
    {
        return Ok((dependency.to_string(), Origin::PackageManager));
    }

    let pattern = provider_pattern(dependency);
    let providers = database
        .search_providers(&pattern)
        .map_err(|err| query_failure(dependency, err))?;
    if let Some(provider) = providers.into_iter().next() {
        debug!("{dependency} is provided by {provider}");
        return Ok((provider, Origin::PackageManager));
    }

    match source.host().probe(dependency)? {
        ProbeStatus::Found => Ok((dependency.to_string(), Origin::SourceBuild)),
        ProbeStatus::NotFound => Err(AurError::Resolution {
            name: dependency.to_string(),
            reason: format!(
                "dependency of '{parent}' not found in either the package manager or the recipe host"
            ),
        }
        .into()),
        ProbeStatus::Unexpected(status) => Err(AurError::UnexpectedUpstreamResponse {
            name: dependency.to_string(),
            status,
        }
        .into()),
    }
}
