//! Workflow step definitions.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{BuildError, Result};
use crate::toolchain::Tool;

/// A single step as written in a workflow document.
///
/// The document shape is loose on purpose: any combination of fields
/// deserializes, and [`Step::preset`] decides at run time what the step
/// means. A bad step therefore only fails the workflows that reach it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Step {
    /// Name of another workflow whose steps run in place of this one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reuse_workflow: Option<String>,

    /// Tool to run (`esbuild`, `terser` or `qjsc`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub util: Option<String>,

    /// Extra command-line flags for terser
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,

    /// Build options handed to esbuild
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub esbuild_options: Option<Value>,
}

/// What a step does, once resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum Preset {
    /// Run another workflow's steps in the same working directory.
    ReuseWorkflow(String),
    /// Bundle the input with esbuild.
    Bundle(Value),
    /// Minify the input with terser.
    Minify(Vec<String>),
    /// Compile the input to QuickJS bytecode.
    Compile,
}

impl Step {
    /// A step that expands to another workflow.
    pub fn reuse(workflow: &str) -> Self {
        Self {
            reuse_workflow: Some(workflow.to_string()),
            ..Self::default()
        }
    }

    /// An esbuild step with the given build options.
    pub fn bundle(options: Value) -> Self {
        Self {
            util: Some(Tool::Esbuild.to_string()),
            esbuild_options: Some(options),
            ..Self::default()
        }
    }

    /// A terser step with extra flags.
    pub fn minify<I, S>(options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            util: Some(Tool::Terser.to_string()),
            options: Some(options.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    /// A qjsc step.
    pub fn compile() -> Self {
        Self {
            util: Some(Tool::Qjsc.to_string()),
            ..Self::default()
        }
    }

    /// Resolve this step into a [`Preset`].
    ///
    /// `workflow` and `index` locate the step in error messages.
    pub fn preset(&self, workflow: &str, index: usize) -> Result<Preset> {
        if let Some(name) = self.reuse_workflow.as_deref().filter(|n| !n.is_empty()) {
            return Ok(Preset::ReuseWorkflow(name.to_string()));
        }

        let util = self.util.as_deref().unwrap_or_default();
        let tool: Tool = util.parse().map_err(|_| BuildError::UnknownUtil {
            util: util.to_string(),
            workflow: workflow.to_string(),
            index,
        })?;

        match tool {
            Tool::Esbuild => {
                let options = self
                    .esbuild_options
                    .clone()
                    .ok_or_else(|| BuildError::MissingOptions {
                        tool,
                        field: "EsbuildOptions",
                        workflow: workflow.to_string(),
                        index,
                    })?;
                Ok(Preset::Bundle(options))
            }
            Tool::Terser => Ok(Preset::Minify(self.options.clone().unwrap_or_default())),
            Tool::Qjsc => Ok(Preset::Compile),
        }
    }
}
