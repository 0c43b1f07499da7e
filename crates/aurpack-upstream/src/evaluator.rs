use std::io;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use aurpack_core::{recipe_probe_script, AurError, RecipeEvaluator, RunAs};
use duct::Expression;
use nix::unistd::Uid;
use tracing::debug;

use crate::process::apply_identity;

const POLL_INTERVAL: Duration = Duration::from_millis(10);
const PROBE_PATH: &str = "/usr/local/sbin:/usr/local/bin:/usr/bin:/bin";

/// Sources a recipe in a throwaway `bash` with a scrubbed environment and a deadline.
#[derive(Debug, Clone)]
pub struct ShellRecipeEvaluator {
    shell: PathBuf,
    timeout: Duration,
    identity: RunAs,
}

impl ShellRecipeEvaluator {
    pub fn new(timeout: Duration, identity: RunAs) -> Self {
        Self {
            shell: PathBuf::from("bash"),
            timeout,
            identity,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub(crate) fn probe_expression(&self, recipe: &str) -> Expression {
        let work_dir = std::env::temp_dir();
        let mut expression = duct::cmd(&self.shell, ["-s"])
            .stdin_bytes(recipe_probe_script(recipe))
            .stdout_capture()
            .stderr_null()
            .dir(&work_dir)
            .full_env([
                ("PATH", PROBE_PATH.to_string()),
                ("HOME", work_dir.display().to_string()),
                ("LC_ALL", "C".to_string()),
            ])
            .unchecked();
        if let Some(identity) = spawn_identity(&self.identity, Uid::effective().is_root()) {
            expression = expression.before_spawn(move |command| {
                apply_identity(command, &identity).map_err(io::Error::other)
            });
        }
        expression
    }
}

/// Identity to switch to before sourcing a recipe. Only root can drop to another user.
pub(crate) fn spawn_identity(identity: &RunAs, is_root: bool) -> Option<RunAs> {
    if identity.is_inherited() {
        return None;
    }
    if !is_root {
        debug!("not running as root, evaluating recipes as the current user");
        return None;
    }
    Some(identity.clone())
}

impl RecipeEvaluator for ShellRecipeEvaluator {
    fn evaluate(&self, name: &str, recipe: &str) -> Result<String> {
        let evaluation_error = |reason: String| AurError::RecipeEvaluation {
            name: name.to_string(),
            reason,
        };

        debug!("evaluating recipe for {name}");
        let handle = self
            .probe_expression(recipe)
            .start()
            .map_err(|err| evaluation_error(format!("failed to start shell: {err}")))?;

        let deadline = Instant::now() + self.timeout;
        loop {
            let finished = handle
                .try_wait()
                .map_err(|err| evaluation_error(format!("failed waiting on shell: {err}")))?;
            if let Some(output) = finished {
                if !output.status.success() {
                    let reason = format!("shell exited with {}", output.status);
                    return Err(evaluation_error(reason).into());
                }
                return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
            }
            if Instant::now() >= deadline {
                let _ = handle.kill();
                return Err(evaluation_error(format!(
                    "timed out after {}ms",
                    self.timeout.as_millis()
                ))
                .into());
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}
