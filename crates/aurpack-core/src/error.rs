use thiserror::Error;

/// Fatal failure classes of a sync request. Carried inside `anyhow::Error`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AurError {
    #[error("failed to resolve package '{name}': {reason}")]
    Resolution { name: String, reason: String },
    #[error("recipe host returned unexpected status {status} for package '{name}'")]
    UnexpectedUpstreamResponse { name: String, status: u16 },
    #[error("failed to evaluate recipe for package '{name}': {reason}")]
    RecipeEvaluation { name: String, reason: String },
    #[error("dependency cycle detected: {}", .cycle.join(" -> "))]
    CycleDetected { cycle: Vec<String> },
    #[error("failed to build package '{name}': {reason}")]
    Build { name: String, reason: String },
    #[error("failed to install package '{name}': {reason}")]
    Install { name: String, reason: String },
}
