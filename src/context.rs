//! Per-step execution context.

use std::path::{Path, PathBuf};

/// Name of the artifact file inside the working directory.
pub const ARTIFACT: &str = "script";

/// Which step of a workflow call reads the entrypoint.
///
/// A top-level run starts [`FirstStep::Positional`]: step 0 is first. A
/// reused workflow starts [`FirstStep::Pending`] with the decision made for
/// the reuse step in its parent; that value applies to exactly one step and
/// is then consumed, after which positions decide again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirstStep {
    /// A forced value from the parent workflow, not yet consumed.
    Pending(bool),
    /// No override left; the step at index 0 is first.
    Positional,
}

impl FirstStep {
    /// Decide whether the step at `index` is first, consuming any override.
    pub fn take(&mut self, index: usize) -> bool {
        match std::mem::replace(self, FirstStep::Positional) {
            FirstStep::Pending(first) => first,
            FirstStep::Positional => index == 0,
        }
    }
}

/// Everything a preset needs to run one step.
#[derive(Debug, Clone, Copy)]
pub struct StepContext<'a> {
    /// Working directory shared by every step of the run
    pub dir: &'a Path,

    /// The caller's original input file
    pub entrypoint: &'a Path,

    /// Whether this step reads the entrypoint instead of the artifact
    pub first: bool,
}

impl<'a> StepContext<'a> {
    pub fn new(dir: &'a Path, entrypoint: &'a Path, first: bool) -> Self {
        Self {
            dir,
            entrypoint,
            first,
        }
    }

    /// The file this step reads.
    pub fn input(&self) -> PathBuf {
        if self.first {
            self.entrypoint.to_path_buf()
        } else {
            self.artifact()
        }
    }

    /// The artifact this step writes.
    pub fn artifact(&self) -> PathBuf {
        self.dir.join(ARTIFACT)
    }
}
