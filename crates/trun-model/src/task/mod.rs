mod param;
pub use param::{ParamSpec, ParamType, ParamValue};

mod step;
pub use step::{EnvVar, Step, Volume, VolumeMount};

mod template;
pub use template::{StepTemplate, merge_steps_with_template};

use serde::{Deserialize, Serialize};

/// Declarative description of an ordered sequence of containerized steps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSpec {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<ParamSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<Step>,
    /// Defaults applied to every step before validation and execution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_template: Option<StepTemplate>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<Volume>,
}

impl TaskSpec {
    /// Returns `true` if no field carries any content.
    pub fn is_empty(&self) -> bool {
        self == &TaskSpec::default()
    }

    pub fn with_param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    pub fn with_step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn with_volume(mut self, volume: Volume) -> Self {
        self.volumes.push(volume);
        self
    }

    pub fn with_step_template(mut self, template: StepTemplate) -> Self {
        self.step_template = Some(template);
        self
    }
}
