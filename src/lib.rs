//! # frida-builder
//!
//! Workflow-driven bundling and bytecode compilation for Frida scripts.
//!
//! A workflow is a named chain of steps. Each step runs one tool (esbuild,
//! terser or qjsc) over a single artifact file in a scratch directory, or
//! expands another workflow in place.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use frida_builder::{Executor, Registry, Step, SystemToolchain, Workflow};
//!
//! let mut registry = Registry::new();
//! registry.insert(
//!     Workflow::new("bundle")
//!         .add(Step::bundle(serde_json::json!({ "Bundle": true, "Format": "iife" }))),
//! );
//! registry.insert(
//!     Workflow::new("release")
//!         .add(Step::reuse("bundle"))
//!         .add(Step::minify(["--compress", "--mangle"]))
//!         .add(Step::compile()),
//! );
//!
//! let toolchain = SystemToolchain::default();
//! let workdir = Executor::new(&registry, &toolchain, "agent/index.ts")?.run("release")?;
//! workdir.finish(Path::new("bundle"))?;
//! # Ok::<(), frida_builder::BuildError>(())
//! ```
//!
//! ## Workflow files
//!
//! ```json
//! {
//!   "release": [
//!     { "ReuseWorkflow": "bundle" },
//!     { "Util": "terser", "Options": ["--compress", "--mangle"] },
//!     { "Util": "qjsc" }
//!   ]
//! }
//! ```

pub mod config;
mod context;
mod error;
mod executor;
pub mod extract;
pub mod presets;
mod registry;
pub mod source;
mod step;
pub mod toolchain;
mod workdir;
mod workflow;

pub use context::{FirstStep, StepContext, ARTIFACT};
pub use error::{BuildError, Result, SourceError};
pub use executor::Executor;
pub use extract::{extract, ExtractError};
pub use registry::{normalize_name, Registry};
pub use step::{Preset, Step};
pub use toolchain::{SystemToolchain, Tool, ToolPaths, Toolchain};
pub use workdir::WorkDir;
pub use workflow::{Workflow, WorkflowBuilder};
