//! Workflow definition and builder.

use crate::step::Step;

/// A named chain of steps.
#[derive(Debug, Clone, PartialEq)]
pub struct Workflow {
    /// Workflow name
    pub name: String,

    /// Steps to execute, in order
    pub steps: Vec<Step>,
}

impl Workflow {
    /// Create a new workflow with a name.
    pub fn new(name: &str) -> WorkflowBuilder {
        WorkflowBuilder::new(name)
    }

    /// Create an empty workflow.
    pub fn empty(name: &str) -> Self {
        Self {
            name: name.to_string(),
            steps: Vec::new(),
        }
    }
}

/// Builder for creating workflows.
#[derive(Debug, Clone)]
pub struct WorkflowBuilder {
    workflow: Workflow,
}

impl WorkflowBuilder {
    /// Create a new workflow builder.
    pub fn new(name: &str) -> Self {
        Self {
            workflow: Workflow::empty(name),
        }
    }

    /// Add a step to the workflow.
    pub fn add(mut self, step: Step) -> Self {
        self.workflow.steps.push(step);
        self
    }

    /// Build the workflow.
    pub fn build(self) -> Workflow {
        self.workflow
    }
}

impl From<WorkflowBuilder> for Workflow {
    fn from(builder: WorkflowBuilder) -> Self {
        builder.build()
    }
}
