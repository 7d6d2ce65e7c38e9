//! Error types for workflow loading and execution.

use std::path::PathBuf;

use thiserror::Error;

use crate::extract::ExtractError;
use crate::toolchain::Tool;

/// Result type for build operations.
pub type Result<T> = std::result::Result<T, BuildError>;

/// Errors that abort a workflow run.
#[derive(Debug, Error)]
pub enum BuildError {
    /// No workflow with this name is registered.
    #[error("workflow {0} not found")]
    UnknownWorkflow(String),

    /// The workflow exists but has no steps.
    #[error("workflow {0} is empty")]
    EmptyWorkflow(String),

    /// A step names a tool the runner does not know.
    #[error("encountered unknown util {util:?} (workflow {workflow}, preset {index})")]
    UnknownUtil {
        util: String,
        workflow: String,
        index: usize,
    },

    /// A step is missing options its tool requires.
    #[error("error in workflow {workflow}: preset {index} uses {tool} but provides no {field}")]
    MissingOptions {
        tool: Tool,
        field: &'static str,
        workflow: String,
        index: usize,
    },

    /// A tool option has a value the tool cannot be given.
    #[error("[{tool}] invalid option {option}: {message}")]
    InvalidOption {
        tool: Tool,
        option: String,
        message: String,
    },

    /// A workflow reuses itself, directly or through other workflows.
    #[error("workflow reuse cycle: {}", chain.join(" -> "))]
    ReuseCycle { chain: Vec<String> },

    /// An external tool failed or reported errors.
    #[error("[{tool}] {message}")]
    Tool { tool: Tool, message: String },

    /// The compiler output could not be turned into bytecode.
    #[error("[qjsc] failed to parse compiled script: {0}")]
    MalformedScript(#[from] ExtractError),

    /// Filesystem failure.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl BuildError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        BuildError::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn tool(tool: Tool, message: impl Into<String>) -> Self {
        BuildError::Tool {
            tool,
            message: message.into(),
        }
    }
}

/// Errors reading a workflow source. These never abort a run: the registry
/// logs them and skips the source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to unmarshal {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },
}
