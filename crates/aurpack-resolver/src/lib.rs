mod graph;
mod info;
mod order;
mod resolve;

pub use graph::DependencyGraph;
pub use info::PackageInfoSource;
pub use order::topo_order;
pub use resolve::{
    build_dependency_graph, classify_dependency, plan_from_root, provider_pattern,
    resolve_install_plan, InstallPlan,
};
