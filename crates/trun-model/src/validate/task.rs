use std::collections::HashSet;

use crate::{
    FieldError, ParamSpec, Step, TaskSpec, Volume, merge_steps_with_template,
    validate::{dns::is_dns1123_label, variables::validate_parameter_variables},
};

const STEP_NAME_DETAILS: &str = "Task step name must be a valid DNS Label: lowercase alphanumeric \
characters or '-', starting and ending with an alphanumeric character, at most 63 characters";

impl TaskSpec {
    /// Shorthand for [`validate_task_spec`].
    pub fn validate(&self) -> Result<(), FieldError> {
        validate_task_spec(self)
    }
}

/// Validate a task specification, returning the first problem found.
///
/// Checks run in order and later checks assume earlier ones passed: non-empty spec, steps
/// present, unique volume names, step template merge, per-step checks on the merged steps,
/// parameter types and defaults, and finally parameter variable usage.
pub fn validate_task_spec(spec: &TaskSpec) -> Result<(), FieldError> {
    if spec.is_empty() {
        return Err(FieldError::missing_field([""]));
    }
    if spec.steps.is_empty() {
        return Err(FieldError::missing_field(["steps"]));
    }
    validate_volumes(&spec.volumes).map_err(|e| e.via_field("volumes"))?;

    let merged = merge_steps_with_template(spec.step_template.as_ref(), &spec.steps).map_err(|e| {
        FieldError::new(
            format!("error merging step template and steps: {e}"),
            ["stepTemplate"],
        )
    })?;

    validate_steps(&merged)?;
    validate_parameter_types(&spec.params)?;
    validate_parameter_variables(&merged, &spec.params)
}

fn validate_volumes(volumes: &[Volume]) -> Result<(), FieldError> {
    let mut seen = HashSet::new();
    for v in volumes {
        if !seen.insert(v.name.as_str()) {
            return Err(FieldError::new(
                format!("multiple volumes with same name {:?}", v.name),
                ["name"],
            ));
        }
    }
    Ok(())
}

fn validate_steps(steps: &[Step]) -> Result<(), FieldError> {
    let mut names = HashSet::new();
    for (i, step) in steps.iter().enumerate() {
        validate_step(step, &mut names).map_err(|e| e.via_index("steps", i))?;
    }
    Ok(())
}

fn validate_step<'a>(step: &'a Step, names: &mut HashSet<&'a str>) -> Result<(), FieldError> {
    if step.image.is_empty() {
        return Err(FieldError::missing_field(["image"]));
    }

    if !step.script.is_empty() {
        if !step.command.is_empty() || !step.args.is_empty() {
            return Err(FieldError::new(
                "script cannot be used with args or command",
                ["script"],
            ));
        }
        if !step.script.trim().starts_with("#!") {
            return Err(FieldError::new(
                "script must start with a shebang (#!)",
                ["script"],
            ));
        }
    }

    if step.name.is_empty() {
        return Ok(());
    }
    if !is_dns1123_label(&step.name) {
        return Err(
            FieldError::new(format!("invalid value {:?}", step.name), ["name"])
                .with_details(STEP_NAME_DETAILS),
        );
    }
    if !names.insert(step.name.as_str()) {
        return Err(FieldError::invalid_value(&step.name, "name"));
    }
    Ok(())
}

fn validate_parameter_types(params: &[ParamSpec]) -> Result<(), FieldError> {
    for p in params {
        let type_path = format!("params.{}.type", p.name);
        if !p.param_type.is_recognized() {
            return Err(FieldError::invalid_value(&p.param_type, type_path));
        }

        if let Some(default) = &p.default
            && default.param_type() != p.param_type
        {
            return Err(FieldError::new(
                format!(
                    "{:?} type does not match default value's type: {:?}",
                    p.param_type.as_str(),
                    default.param_type().as_str()
                ),
                [type_path, format!("params.{}.default.type", p.name)],
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{ParamType, ParamValue, StepTemplate};

    fn step() -> Step {
        Step::new("alpine")
    }

    fn spec() -> TaskSpec {
        TaskSpec::default().with_step(step())
    }

    #[test]
    fn minimal_spec_is_valid() {
        assert!(validate_task_spec(&spec()).is_ok());
        assert!(spec().validate().is_ok());
    }

    #[test]
    fn empty_spec_is_rejected() {
        let err = validate_task_spec(&TaskSpec::default()).unwrap_err();
        assert_eq!(err.message, "missing field(s)");
        assert_eq!(err.paths, vec![""]);
    }

    #[test]
    fn spec_without_steps_is_rejected() {
        let spec = TaskSpec::default().with_param(ParamSpec::string("p"));
        let err = validate_task_spec(&spec).unwrap_err();
        assert_eq!(err.to_string(), "missing field(s): steps");
    }

    #[test]
    fn duplicate_volume_names_are_rejected() {
        let spec = spec()
            .with_volume(Volume::new("cache"))
            .with_volume(Volume::new("ws"))
            .with_volume(Volume::new("cache"));
        let err = validate_task_spec(&spec).unwrap_err();
        assert_eq!(err.message, "multiple volumes with same name \"cache\"");
        assert_eq!(err.paths, vec!["volumes.name"]);
    }

    #[test]
    fn template_merge_failure_is_reported() {
        let spec = spec().with_step_template(StepTemplate::new().with("command", json!("echo")));
        let err = validate_task_spec(&spec).unwrap_err();
        assert!(err.message.starts_with("error merging step template and steps: "));
        assert_eq!(err.paths, vec!["stepTemplate"]);
    }

    #[test]
    fn image_may_come_from_template() {
        let spec = TaskSpec::default()
            .with_step(Step::default().with_name("no-image"))
            .with_step_template(StepTemplate::new().with("image", json!("busybox")));
        assert!(validate_task_spec(&spec).is_ok());
    }

    #[test]
    fn missing_image_is_rejected() {
        let spec = spec().with_step(Step::default());
        let err = validate_task_spec(&spec).unwrap_err();
        assert_eq!(err.to_string(), "missing field(s): steps[1].image");
    }

    #[test]
    fn script_with_command_or_args_is_rejected() {
        for s in [
            step().with_script("#!/bin/sh\necho hi").with_command(["sh"]),
            step().with_script("#!/bin/sh\necho hi").with_args(["-c"]),
        ] {
            let err = validate_task_spec(&TaskSpec::default().with_step(s)).unwrap_err();
            assert_eq!(err.message, "script cannot be used with args or command");
            assert_eq!(err.paths, vec!["steps[0].script"]);
        }
    }

    #[test]
    fn script_requires_shebang() {
        let ok = TaskSpec::default().with_step(step().with_script("\n  #!/usr/bin/env python\nprint(1)"));
        assert!(validate_task_spec(&ok).is_ok());

        let bad = TaskSpec::default().with_step(step().with_script("echo hi"));
        let err = validate_task_spec(&bad).unwrap_err();
        assert_eq!(err.message, "script must start with a shebang (#!)");
    }

    #[test]
    fn step_name_must_be_dns_label() {
        let spec = TaskSpec::default().with_step(step().with_name("Not_A_Label"));
        let err = validate_task_spec(&spec).unwrap_err();
        assert_eq!(err.message, "invalid value \"Not_A_Label\"");
        assert_eq!(err.paths, vec!["steps[0].name"]);
        assert!(err.details.is_some());
    }

    #[test]
    fn duplicate_step_names_are_rejected() {
        let spec = TaskSpec::default()
            .with_step(step().with_name("build"))
            .with_step(step())
            .with_step(step().with_name("build"));
        let err = validate_task_spec(&spec).unwrap_err();
        assert_eq!(err.message, "invalid value: build");
        assert_eq!(err.paths, vec!["steps[2].name"]);
    }

    #[test]
    fn unnamed_steps_do_not_collide() {
        let spec = TaskSpec::default().with_step(step()).with_step(step());
        assert!(validate_task_spec(&spec).is_ok());
    }

    #[test]
    fn unrecognized_param_type_is_rejected() {
        let spec = spec().with_param(ParamSpec::new("p", "object"));
        let err = validate_task_spec(&spec).unwrap_err();
        assert_eq!(err.message, "invalid value: object");
        assert_eq!(err.paths, vec!["params.p.type"]);
    }

    #[test]
    fn default_type_must_match_declared_type() {
        let spec = spec().with_param(
            ParamSpec::new("p", ParamType::Array).with_default(ParamValue::String("x".into())),
        );
        let err = validate_task_spec(&spec).unwrap_err();
        assert_eq!(
            err.message,
            "\"array\" type does not match default value's type: \"string\""
        );
        assert_eq!(err.paths, vec!["params.p.type", "params.p.default.type"]);

        let ok = self::spec().with_param(
            ParamSpec::array("p").with_default(ParamValue::Array(vec!["a".into()])),
        );
        assert!(validate_task_spec(&ok).is_ok());
    }

    #[test]
    fn isolated_array_argument_scenario() {
        let ok = TaskSpec::default()
            .with_param(ParamSpec::array("list"))
            .with_step(step().with_args(["$(params.list)"]));
        assert!(validate_task_spec(&ok).is_ok());

        let bad = TaskSpec::default()
            .with_param(ParamSpec::array("list"))
            .with_step(step().with_args(["prefix-$(params.list)"]));
        let err = validate_task_spec(&bad).unwrap_err();
        assert!(err.message.contains("not properly isolated"));
        assert_eq!(err.paths, vec!["steps[0].arg[0]"]);
    }

    #[test]
    fn variables_are_checked_on_merged_steps() {
        let spec = TaskSpec::default()
            .with_param(ParamSpec::array("list"))
            .with_step(step())
            .with_step_template(StepTemplate::new().with("workingDir", json!("$(params.list)")));
        let err = validate_task_spec(&spec).unwrap_err();
        assert_eq!(err.paths, vec!["steps[0].workingDir"]);
    }

    #[test]
    fn earlier_checks_win() {
        let spec = TaskSpec::default()
            .with_param(ParamSpec::new("p", "bogus"))
            .with_step(Step::default())
            .with_volume(Volume::new("v"))
            .with_volume(Volume::new("v"));
        let err = validate_task_spec(&spec).unwrap_err();
        assert_eq!(err.paths, vec!["volumes.name"]);
    }

    #[test]
    fn decodes_from_json() {
        let spec: TaskSpec = serde_json::from_value(json!({
            "params": [{"name": "list", "type": "array"}],
            "steps": [{"name": "run", "image": "alpine", "args": ["$(params.list)"]}],
            "volumes": [{"name": "ws", "emptyDir": {}}]
        }))
        .unwrap();
        assert!(validate_task_spec(&spec).is_ok());
        assert!(spec.volumes[0].source.contains_key("emptyDir"));
    }
}
