mod actions;
mod groups;
mod keys;
mod layout;
mod orchestrator;

pub use actions::{ActionExecutor, BuildRequest, ShellActionExecutor};
pub use groups::{install_group, remove_group};
pub use keys::{GpgKeyImporter, KeyImporter};
pub use layout::{BuildLayout, RECIPE_FILE_NAME};
pub use orchestrator::{BuildOrchestrator, SyncOutcome};

#[cfg(test)]
mod tests;
