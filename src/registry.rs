//! Named workflow registry.
//!
//! Workflows are merged from any number of sources. A later source replaces
//! an earlier workflow of the same name. Sources that cannot be read or
//! parsed are logged and skipped, so a missing optional config file never
//! stops the program.

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::{BuildError, Result};
use crate::source;
use crate::step::Step;
use crate::Workflow;

/// Workflow definitions keyed by normalized name.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    workflows: HashMap<String, Vec<Step>>,
}

/// Names are matched case-insensitively, ignoring surrounding spaces.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from files, in priority order.
    pub fn from_sources<P: AsRef<Path>>(paths: &[P]) -> Self {
        let mut registry = Self::new();
        for path in paths {
            registry.load_file(path);
        }
        registry
    }

    /// Merge one workflow file into the registry.
    ///
    /// Returns the number of workflows the file defined. Empty paths are
    /// ignored; unreadable or malformed files are skipped with a warning.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> usize {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return 0;
        }

        match source::load_file(path) {
            Ok(workflows) => {
                let count = workflows.len();
                debug!(path = %path.display(), count, "Loaded workflow source");
                self.extend(workflows);
                count
            }
            Err(e) => {
                warn!("{}", e);
                0
            }
        }
    }

    /// Insert a workflow, replacing any existing one with the same name.
    pub fn insert(&mut self, workflow: impl Into<Workflow>) {
        let workflow = workflow.into();
        self.workflows
            .insert(normalize_name(&workflow.name), workflow.steps);
    }

    /// Look up a workflow's steps.
    pub fn get(&self, name: &str) -> Result<&[Step]> {
        self.workflows
            .get(&normalize_name(name))
            .map(Vec::as_slice)
            .ok_or_else(|| BuildError::UnknownWorkflow(name.trim().to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.workflows.contains_key(&normalize_name(name))
    }

    /// Loaded workflow names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.workflows.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.workflows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workflows.is_empty()
    }
}

impl Extend<Workflow> for Registry {
    fn extend<I: IntoIterator<Item = Workflow>>(&mut self, iter: I) {
        for workflow in iter {
            self.insert(workflow);
        }
    }
}
