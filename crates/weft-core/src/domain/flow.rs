use crate::domain::ids::{FlowId, StepId};
use crate::domain::reachability;
use crate::CoreError;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// A workflow graph: named steps wired together by successor edges
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flow {
    /// Unique identifier
    pub id: FlowId,

    /// Human-readable name
    pub name: String,

    /// Optional description
    #[serde(default)]
    pub description: String,

    /// Owning tenant
    #[serde(default)]
    pub tenant: String,

    /// Definition version
    #[serde(default)]
    pub version: u32,

    /// Entry point of the graph
    pub first_step_id: StepId,

    /// Steps in declaration order
    pub steps: Vec<Step>,
}

/// One node of the workflow graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Unique identifier within the flow
    pub id: StepId,

    /// Selects the executor that performs the step
    pub executor_slug: String,

    /// Human-readable name
    #[serde(default)]
    pub name: String,

    /// Optional description
    #[serde(default)]
    pub description: String,

    /// Template rendered by the executor against upstream data
    #[serde(default)]
    pub input_template: String,

    /// A failure of this step does not stop its successors
    #[serde(default)]
    pub continue_on_error: bool,

    /// Kept for stored flows; successful outputs are always published to shared state
    #[serde(default = "default_share_output")]
    pub share_output_with_all: bool,

    /// Successor step ids. Repeats and diamonds are allowed.
    #[serde(default)]
    pub next_step_ids: Vec<StepId>,
}

fn default_share_output() -> bool {
    true
}

impl Step {
    /// Create a step bound to an executor slug, with no successors
    pub fn new(id: impl Into<StepId>, executor_slug: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.0.clone(),
            id,
            executor_slug: executor_slug.into(),
            description: String::new(),
            input_template: String::new(),
            continue_on_error: false,
            share_output_with_all: true,
            next_step_ids: Vec::new(),
        }
    }

    /// Set the input template
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.input_template = template.into();
        self
    }

    /// Append successors
    pub fn with_next<I, S>(mut self, next: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<StepId>,
    {
        self.next_step_ids.extend(next.into_iter().map(Into::into));
        self
    }

    /// Set the failure policy
    pub fn with_continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }

    /// Successor ids in declaration order
    pub fn successors(&self) -> &[StepId] {
        &self.next_step_ids
    }
}

/// Read access to a set of steps keyed by id
pub trait StepGraph {
    /// Look up a step
    fn step(&self, id: &StepId) -> Option<&Step>;

    /// Successors of a step, `None` if the step is unknown
    fn successors(&self, id: &StepId) -> Option<&[StepId]> {
        self.step(id).map(Step::successors)
    }
}

impl StepGraph for HashMap<StepId, Step> {
    fn step(&self, id: &StepId) -> Option<&Step> {
        self.get(id)
    }
}

impl StepGraph for Flow {
    fn step(&self, id: &StepId) -> Option<&Step> {
        self.steps.iter().find(|s| &s.id == id)
    }
}

impl Flow {
    /// Create an empty flow starting at `first_step_id`
    pub fn new(id: impl Into<FlowId>, name: impl Into<String>, first_step_id: impl Into<StepId>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            tenant: String::new(),
            version: 1,
            first_step_id: first_step_id.into(),
            steps: Vec::new(),
        }
    }

    /// Append a step
    pub fn with_step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// The designated start step, if it exists
    pub fn start_step(&self) -> Option<&Step> {
        self.step(&self.first_step_id)
    }

    /// Validate the structure of the flow
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.steps.is_empty() {
            return Err(CoreError::InvalidFlow(format!(
                "flow {} must have at least one step",
                self.id
            )));
        }

        let mut step_ids = HashSet::new();
        for step in &self.steps {
            if step.id.as_str().is_empty() {
                return Err(CoreError::InvalidFlow(format!(
                    "flow {} has a step with an empty id",
                    self.id
                )));
            }
            if !step_ids.insert(&step.id) {
                return Err(CoreError::DuplicateStep(step.id.to_string()));
            }
        }

        if !step_ids.contains(&self.first_step_id) {
            return Err(CoreError::StartStepNotFound(self.first_step_id.to_string()));
        }

        // Every step, reachable or not, must have resolvable successors and no cycles
        let index: HashMap<StepId, Step> = self
            .steps
            .iter()
            .map(|s| (s.id.clone(), s.clone()))
            .collect();
        reachability::check_graph(&index, self.steps.iter().map(|s| &s.id))
    }
}
