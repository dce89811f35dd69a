//! Production executor: runs compiled toolchain scripts with `node`.
//!
//! Layout expected under [`ExecutorConfig::root_path`]:
//!
//! ```text
//! <root_path>/                 working directory of every run
//! <root_path>/<build_path>/    compiled *.js scripts, one per operation family
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use super::args::build_args;
use super::catalog;
use super::outcome;
use super::subprocess::{run_command, ProcessInput};
use super::{ExecutorError, ExecutorHealth, ToolExecution, ToolExecutor, DEFAULT_TIMEOUT};

/// Where the toolchain lives and how to run it.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Toolchain checkout; also the working directory of every run.
    pub root_path: PathBuf,
    /// Compiled script directory, relative to `root_path`.
    pub build_path: PathBuf,
    /// Ceiling for one invocation.
    pub timeout: Duration,
    /// Interpreter used to run compiled scripts.
    pub node_bin: String,
    /// Run `build_command` once when a compiled script is missing.
    pub auto_build: bool,
    /// Program and arguments that compile the toolchain.
    pub build_command: Vec<String>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            root_path: PathBuf::from("./zk-pret"),
            build_path: PathBuf::from("./build/tests/with-sign"),
            timeout: DEFAULT_TIMEOUT,
            node_bin: "node".to_string(),
            auto_build: false,
            build_command: vec!["npm".to_string(), "run".to_string(), "build".to_string()],
        }
    }
}

/// Runs catalog operations as `node <script> <args...>`.
pub struct NodeToolExecutor {
    config: ExecutorConfig,
    /// Serializes toolchain builds so concurrent jobs don't race `npm`.
    build_lock: Mutex<()>,
}

impl NodeToolExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self {
            config,
            build_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    fn build_dir(&self) -> PathBuf {
        self.config.root_path.join(&self.config.build_path)
    }

    /// Make sure the compiled script exists, building the toolchain if allowed.
    async fn ensure_script(&self, script: &Path) -> Result<(), ExecutorError> {
        if exists(script).await {
            return Ok(());
        }
        if !self.config.auto_build {
            return Err(ExecutorError::ScriptNotFound(script.display().to_string()));
        }

        let _guard = self.build_lock.lock().await;
        // Another job may have finished the build while we waited.
        if exists(script).await {
            return Ok(());
        }

        self.build_toolchain().await?;

        if exists(script).await {
            Ok(())
        } else {
            Err(ExecutorError::ScriptNotFound(script.display().to_string()))
        }
    }

    async fn build_toolchain(&self) -> Result<(), ExecutorError> {
        let Some((program, args)) = self.config.build_command.split_first() else {
            return Err(ExecutorError::ScriptNotFound(
                "no build command configured".to_string(),
            ));
        };

        tracing::info!(
            root = %self.config.root_path.display(),
            command = ?self.config.build_command,
            "Compiled script missing, building toolchain",
        );

        let output = run_command(ProcessInput {
            program: program.clone(),
            args: args.to_vec(),
            working_directory: Some(self.config.root_path.clone()),
            env_vars: vec![],
            timeout: self.config.timeout,
        })
        .await?;

        if output.success() {
            tracing::info!(duration_ms = output.duration_ms, "Toolchain build completed");
            Ok(())
        } else {
            tracing::error!(
                exit_code = output.exit_code,
                stderr = %output.stderr,
                "Toolchain build failed",
            );
            Err(ExecutorError::ExternalProcessFailure {
                exit_code: output.exit_code,
                detail: format!("toolchain build failed: {}", output.stderr.trim()),
            })
        }
    }
}

#[async_trait]
impl ToolExecutor for NodeToolExecutor {
    fn operations(&self) -> Vec<String> {
        catalog::operation_names()
    }

    fn timeout(&self) -> Duration {
        self.config.timeout
    }

    async fn execute(
        &self,
        operation: &str,
        parameters: &Value,
    ) -> Result<ToolExecution, ExecutorError> {
        let op = catalog::find(operation).ok_or_else(|| ExecutorError::UnknownOperation {
            name: operation.to_string(),
            available: catalog::operation_names(),
        })?;

        let script = self.build_dir().join(op.script);
        self.ensure_script(&script).await?;

        let mut args = vec![script.display().to_string()];
        args.extend(build_args(op.family, parameters));

        tracing::debug!(operation, script = op.script, ?args, "Running toolchain script");

        let output = run_command(ProcessInput {
            program: self.config.node_bin.clone(),
            args,
            working_directory: Some(self.config.root_path.clone()),
            env_vars: vec![("NODE_ENV".to_string(), "production".to_string())],
            timeout: self.config.timeout,
        })
        .await?;

        let result = outcome::classify(&output)?;

        Ok(ToolExecution {
            result,
            elapsed: Duration::from_millis(output.duration_ms),
        })
    }

    async fn health_check(&self) -> ExecutorHealth {
        let root = &self.config.root_path;
        let build_dir = self.build_dir();

        let mut missing_scripts = Vec::new();
        for script in catalog::required_scripts() {
            if !exists(&build_dir.join(script)).await {
                missing_scripts.push(script);
            }
        }

        let detail = json!({
            "path": root.display().to_string(),
            "buildPath": build_dir.display().to_string(),
            "missingScripts": missing_scripts,
        });

        if exists(root).await && exists(&build_dir).await {
            ExecutorHealth::connected(detail)
        } else {
            ExecutorHealth::disconnected(detail)
        }
    }
}

async fn exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
