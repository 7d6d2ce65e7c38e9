//! Workflow execution engine.

use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, info};

use crate::context::{FirstStep, StepContext};
use crate::error::{BuildError, Result};
use crate::presets;
use crate::registry::{normalize_name, Registry};
use crate::step::Preset;
use crate::toolchain::Toolchain;
use crate::workdir::WorkDir;

/// Runs workflows from a registry against one entrypoint.
///
/// # Example
///
/// ```rust,no_run
/// use std::path::Path;
/// use frida_builder::{Executor, Registry, Step, SystemToolchain, Workflow};
///
/// let mut registry = Registry::new();
/// registry.insert(Workflow::new("qjsc-only").add(Step::compile()));
///
/// let toolchain = SystemToolchain::default();
/// let executor = Executor::new(&registry, &toolchain, "agent.js")?;
/// let workdir = executor.run("qjsc-only")?;
/// workdir.finish(Path::new("bundle"))?;
/// # Ok::<(), frida_builder::BuildError>(())
/// ```
pub struct Executor<'a> {
    registry: &'a Registry,
    toolchain: &'a dyn Toolchain,
    entrypoint: PathBuf,
    scratch_root: PathBuf,
}

impl<'a> Executor<'a> {
    /// Create an executor for `entrypoint`.
    ///
    /// Tools run inside the working directory, so a relative entrypoint is
    /// resolved against the current directory here. Working directories are
    /// created in the current directory unless [`Executor::scratch_root`]
    /// says otherwise.
    pub fn new(
        registry: &'a Registry,
        toolchain: &'a dyn Toolchain,
        entrypoint: impl AsRef<Path>,
    ) -> Result<Self> {
        let cwd = std::env::current_dir()
            .map_err(|e| BuildError::io("failed to get working directory", e))?;

        Ok(Self {
            registry,
            toolchain,
            entrypoint: cwd.join(entrypoint.as_ref()),
            scratch_root: cwd,
        })
    }

    /// Create working directories inside `root`.
    pub fn scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = root.into();
        self
    }

    pub fn entrypoint(&self) -> &Path {
        &self.entrypoint
    }

    /// Run a workflow in a fresh working directory.
    ///
    /// The returned [`WorkDir`] holds the final artifact. The directory is
    /// removed when it is dropped or finished; if the run fails it is
    /// removed before this returns.
    pub fn run(&self, workflow: &str) -> Result<WorkDir> {
        let start = Instant::now();
        let workdir = WorkDir::create_in(&self.scratch_root)?;

        let mut chain = Vec::new();
        self.run_in(workflow, workdir.path(), FirstStep::Positional, &mut chain)?;

        info!(
            workflow = %normalize_name(workflow),
            total_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Workflow completed"
        );
        Ok(workdir)
    }

    /// Run a workflow inside an existing working directory.
    ///
    /// `first` carries the parent's decision for a reused workflow. `chain`
    /// holds the workflows currently being expanded.
    fn run_in(
        &self,
        workflow: &str,
        dir: &Path,
        mut first: FirstStep,
        chain: &mut Vec<String>,
    ) -> Result<()> {
        let name = normalize_name(workflow);
        let steps = self.registry.get(&name)?;
        if steps.is_empty() {
            return Err(BuildError::EmptyWorkflow(name));
        }

        if chain.contains(&name) {
            let mut cycle = chain.clone();
            cycle.push(name);
            return Err(BuildError::ReuseCycle { chain: cycle });
        }
        chain.push(name.clone());

        info!(workflow = %name, steps = steps.len(), "Running workflow");

        for (index, step) in steps.iter().enumerate() {
            let is_first = first.take(index);
            let preset = step.preset(&name, index)?;
            debug!(workflow = %name, step = index, first = is_first, ?preset, "Executing step");

            let ctx = StepContext::new(dir, &self.entrypoint, is_first);
            match preset {
                Preset::ReuseWorkflow(inner) => {
                    self.run_in(&inner, dir, FirstStep::Pending(is_first), chain)?;
                }
                Preset::Bundle(options) => {
                    info!(workflow = %name, step = index, "running esbuild preset...");
                    presets::esbuild(&ctx, self.toolchain, &options)?;
                }
                Preset::Minify(options) => {
                    info!(workflow = %name, step = index, "running terser preset...");
                    presets::terser(&ctx, self.toolchain, &options)?;
                }
                Preset::Compile => {
                    info!(workflow = %name, step = index, "running qjsc preset...");
                    presets::qjsc(&ctx, self.toolchain)?;
                }
            }
        }

        chain.pop();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Step, Workflow};
    use serde_json::Value;
    use std::ffi::OsString;

    /// Fails on any tool call.
    struct NoTools;

    impl Toolchain for NoTools {
        fn bundle(&self, _: &Path, _: &Value) -> Result<Vec<u8>> {
            panic!("unexpected bundle")
        }
        fn minify(&self, _: &Path, _: &[OsString]) -> Result<()> {
            panic!("unexpected minify")
        }
        fn compile(&self, _: &Path, _: &[OsString]) -> Result<()> {
            panic!("unexpected compile")
        }
    }

    fn run(registry: &Registry, workflow: &str) -> Result<WorkDir> {
        let root = std::env::temp_dir();
        Executor::new(registry, &NoTools, "entry.js")?
            .scratch_root(root)
            .run(workflow)
    }

    #[test]
    fn test_unknown_workflow() {
        let err = run(&Registry::new(), "ghost").unwrap_err();
        assert!(matches!(err, BuildError::UnknownWorkflow(_)));
    }

    #[test]
    fn test_empty_workflow() {
        let mut registry = Registry::new();
        registry.insert(Workflow::empty("nothing"));

        let err = run(&registry, "nothing").unwrap_err();
        assert!(matches!(err, BuildError::EmptyWorkflow(ref n) if n == "nothing"));
    }

    #[test]
    fn test_empty_reused_workflow() {
        let mut registry = Registry::new();
        registry.insert(Workflow::new("outer").add(Step::reuse("nothing")));
        registry.insert(Workflow::empty("nothing"));

        let err = run(&registry, "outer").unwrap_err();
        assert!(matches!(err, BuildError::EmptyWorkflow(ref n) if n == "nothing"));
    }

    #[test]
    fn test_unknown_util_names_step() {
        let mut registry = Registry::new();
        registry.insert(
            Workflow::new("web")
                .add(Step::reuse("inner"))
                .add(Step::default()),
        );
        registry.insert(Workflow::new("inner").add(Step::reuse("leaf")));
        registry.insert(Workflow::new("leaf").add(Step {
            util: Some("rollup".to_string()),
            ..Step::default()
        }));

        let err = run(&registry, "web").unwrap_err();
        match err {
            BuildError::UnknownUtil {
                util,
                workflow,
                index,
            } => {
                assert_eq!(util, "rollup");
                assert_eq!(workflow, "leaf");
                assert_eq!(index, 0);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_reuse_cycle_detected() {
        let mut registry = Registry::new();
        registry.insert(Workflow::new("a").add(Step::reuse("b")));
        registry.insert(Workflow::new("b").add(Step::reuse("A")));

        let err = run(&registry, "a").unwrap_err();
        assert_eq!(err.to_string(), "workflow reuse cycle: a -> b -> a");
    }

    #[test]
    fn test_failed_run_removes_workdir() {
        let root = tempfile::tempdir().unwrap();
        let mut registry = Registry::new();
        registry.insert(Workflow::new("broken").add(Step::default()));

        let result = Executor::new(&registry, &NoTools, "entry.js")
            .unwrap()
            .scratch_root(root.path())
            .run("broken");

        assert!(result.is_err());
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_entrypoint_made_absolute() {
        let registry = Registry::new();
        let executor = Executor::new(&registry, &NoTools, "agent/index.js").unwrap();
        assert!(executor.entrypoint().is_absolute());
        assert!(executor.entrypoint().ends_with("agent/index.js"));
    }
}
