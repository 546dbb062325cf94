use std::collections::HashSet;

use crate::{
    FieldError, ParamSpec, ParamType, Step,
    validate::substitution::{extract_references, is_isolated},
};

const PARAMS_PREFIX: &str = "params";

/// How a templated field may use a parameter reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    /// Only scalar substitution is allowed.
    Scalar,
    /// A whole-token array expansion is allowed (command and argument tokens).
    ArrayEligible,
}

/// One string field of a step that can carry template text.
struct TemplatedField<'a> {
    step: usize,
    label: String,
    value: &'a str,
    context: Context,
}

impl<'a> TemplatedField<'a> {
    fn new(step: usize, label: String, value: &'a str, context: Context) -> Self {
        Self {
            step,
            label,
            value,
            context,
        }
    }

    fn error(&self, message: String) -> FieldError {
        FieldError::new(message, [self.label.as_str()]).via_index("steps", self.step)
    }
}

/// Check every parameter reference in `steps` against the declared `params`.
///
/// Two passes over the same field order: first undeclared references, then array
/// parameters used outside an isolated command/argument token.
pub fn validate_parameter_variables(steps: &[Step], params: &[ParamSpec]) -> Result<(), FieldError> {
    let declared: HashSet<&str> = params.iter().map(|p| p.name.as_str()).collect();
    let arrays: HashSet<&str> = params
        .iter()
        .filter(|p| p.param_type == ParamType::Array)
        .map(|p| p.name.as_str())
        .collect();

    let fields = templated_fields(steps);
    for field in &fields {
        check_declared(field, &declared)?;
    }
    for field in &fields {
        check_array_usage(field, &arrays)?;
    }
    Ok(())
}

fn check_declared(field: &TemplatedField<'_>, declared: &HashSet<&str>) -> Result<(), FieldError> {
    let undeclared = extract_references(field.value, PARAMS_PREFIX)
        .iter()
        .any(|r| !declared.contains(r.name));
    if undeclared {
        return Err(field.error(format!(
            "non-existent variable in {:?} for step {}",
            field.value, field.label
        )));
    }
    Ok(())
}

fn check_array_usage(field: &TemplatedField<'_>, arrays: &HashSet<&str>) -> Result<(), FieldError> {
    let refs = extract_references(field.value, PARAMS_PREFIX);
    if !refs.iter().any(|r| arrays.contains(r.name)) {
        return Ok(());
    }

    match field.context {
        Context::Scalar => Err(field.error(format!(
            "variable type invalid in {:?} for step {}",
            field.value, field.label
        ))),
        Context::ArrayEligible if !is_isolated(field.value, &refs) => Err(field.error(format!(
            "variable is not properly isolated in {:?} for step {}",
            field.value, field.label
        ))),
        Context::ArrayEligible => Ok(()),
    }
}

/// All templated fields in a fixed order: steps in declaration order; within a step name,
/// image, workingDir, commands, args, env, volume mounts.
fn templated_fields(steps: &[Step]) -> Vec<TemplatedField<'_>> {
    let mut fields = Vec::new();
    for (step, s) in steps.iter().enumerate() {
        let scalar = |label: String, value| TemplatedField::new(step, label, value, Context::Scalar);
        let token =
            |label: String, value| TemplatedField::new(step, label, value, Context::ArrayEligible);

        fields.push(scalar("name".into(), s.name.as_str()));
        fields.push(scalar("image".into(), s.image.as_str()));
        fields.push(scalar("workingDir".into(), s.working_dir.as_str()));
        for (i, cmd) in s.command.iter().enumerate() {
            fields.push(token(format!("command[{i}]"), cmd.as_str()));
        }
        for (i, arg) in s.args.iter().enumerate() {
            fields.push(token(format!("arg[{i}]"), arg.as_str()));
        }
        for env in &s.env {
            fields.push(scalar(format!("env[{}]", env.name), env.value.as_str()));
        }
        for (i, mount) in s.volume_mounts.iter().enumerate() {
            fields.push(scalar(format!("volumeMount[{i}].name"), mount.name.as_str()));
            fields.push(scalar(format!("volumeMount[{i}].mountPath"), mount.mount_path.as_str()));
            fields.push(scalar(format!("volumeMount[{i}].subPath"), mount.sub_path.as_str()));
        }
    }
    fields
}
