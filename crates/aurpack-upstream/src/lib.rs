mod aur_host;
mod evaluator;
mod pacman;
mod process;

pub use aur_host::{classify_status, recipe_url, snapshot_url, AurHost};
pub use evaluator::ShellRecipeEvaluator;
pub use pacman::Pacman;
pub use process::{apply_identity, chown_to, resolve_identity, run_command, ResolvedIdentity};
