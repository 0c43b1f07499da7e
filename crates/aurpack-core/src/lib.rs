mod archive;
mod error;
mod node;
mod options;
mod query;
mod recipe;

pub use archive::PackageExtension;
pub use error::AurError;
pub use node::{Origin, PackageInfo, PackageNode, PackageRelease};
pub use options::{
    RunAs, SyncOptions, DEFAULT_BUILD_DIR, DEFAULT_EVAL_GROUP, DEFAULT_EVAL_TIMEOUT_SECS,
    DEFAULT_EVAL_USER, DEFAULT_RECIPE_HOST,
};
pub use query::{PackageDatabase, PackageGroups, ProbeStatus, RecipeEvaluator, RecipeHost};
pub use recipe::{
    default_arch, parse_package_release, parse_recipe_probe_output, recipe_probe_script,
    strip_dependency_constraint, ANY_ARCH,
};
