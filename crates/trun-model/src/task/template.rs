use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{MergeError, Step};

/// Partial container definition applied to every step as defaults.
///
/// Kept as raw JSON so that fields the step type does not model survive, and so that
/// shape conflicts surface at merge time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepTemplate(pub Map<String, Value>);

impl StepTemplate {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn with(mut self, field: impl Into<String>, value: Value) -> Self {
        self.0.insert(field.into(), value);
        self
    }
}

/// Apply `template` to each step; explicit step fields win.
///
/// Lists merge like a strategic merge patch: `env` by `name`, `volumeMounts` by `mountPath`;
/// other lists and scalars are replaced by a non-empty step value.
pub fn merge_steps_with_template(
    template: Option<&StepTemplate>,
    steps: &[Step],
) -> Result<Vec<Step>, MergeError> {
    let Some(template) = template else {
        return Ok(steps.to_vec());
    };
    steps.iter().map(|step| merge_step(template, step)).collect()
}

fn merge_step(template: &StepTemplate, step: &Step) -> Result<Step, MergeError> {
    let mut merged = template.0.clone();
    let overlay = match serde_json::to_value(step)? {
        Value::Object(map) => map,
        _ => Map::new(),
    };

    for (field, value) in overlay {
        let value = match (field.as_str(), merged.remove(&field)) {
            ("env", Some(base)) => merge_keyed(&field, base, value, "name")?,
            ("volumeMounts", Some(base)) => merge_keyed(&field, base, value, "mountPath")?,
            _ => value,
        };
        merged.insert(field, value);
    }

    Ok(serde_json::from_value(Value::Object(merged))?)
}

fn merge_keyed(field: &str, base: Value, overlay: Value, key: &str) -> Result<Value, MergeError> {
    let (Value::Array(base), Value::Array(overlay)) = (base, overlay) else {
        return Err(MergeError::Shape {
            field: field.to_string(),
        });
    };

    let key_of = |item: &Value| item.get(key).cloned();
    let mut out = Vec::with_capacity(base.len() + overlay.len());
    let mut used = vec![false; overlay.len()];

    for item in base {
        let pos = overlay
            .iter()
            .position(|o| key_of(o).is_some() && key_of(o) == key_of(&item));
        match pos {
            Some(i) => {
                used[i] = true;
                out.push(merge_object(item, overlay[i].clone()));
            }
            None => out.push(item),
        }
    }
    out.extend(
        overlay
            .into_iter()
            .zip(used)
            .filter(|(_, used)| !used)
            .map(|(item, _)| item),
    );
    Ok(Value::Array(out))
}

fn merge_object(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base), Value::Object(overlay)) => {
            base.extend(overlay);
            Value::Object(base)
        }
        (_, overlay) => overlay,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{EnvVar, VolumeMount};

    fn template(value: Value) -> StepTemplate {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn no_template_returns_steps_unchanged() {
        let steps = vec![Step::new("alpine").with_name("a")];
        assert_eq!(merge_steps_with_template(None, &steps).unwrap(), steps);
    }

    #[test]
    fn template_fills_missing_scalars_and_step_wins() {
        let tpl = template(json!({"image": "busybox", "workingDir": "/src"}));
        let steps = vec![
            Step::default().with_name("uses-template"),
            Step::new("alpine").with_name("overrides"),
        ];

        let merged = merge_steps_with_template(Some(&tpl), &steps).unwrap();
        assert_eq!(merged[0].image, "busybox");
        assert_eq!(merged[0].working_dir, "/src");
        assert_eq!(merged[1].image, "alpine");
        assert_eq!(merged[1].working_dir, "/src");
    }

    #[test]
    fn env_merges_by_name() {
        let tpl = template(json!({"env": [
            {"name": "A", "value": "tpl"},
            {"name": "B", "value": "tpl"}
        ]}));
        let steps = vec![Step::new("alpine").with_env("B", "step").with_env("C", "step")];

        let merged = merge_steps_with_template(Some(&tpl), &steps).unwrap();
        assert_eq!(
            merged[0].env,
            vec![
                EnvVar::new("A", "tpl"),
                EnvVar::new("B", "step"),
                EnvVar::new("C", "step"),
            ]
        );
    }

    #[test]
    fn volume_mounts_merge_by_mount_path() {
        let tpl = template(json!({"volumeMounts": [
            {"name": "cache", "mountPath": "/cache"}
        ]}));
        let steps = vec![
            Step::new("alpine")
                .with_volume_mount(VolumeMount::new("other-cache", "/cache"))
                .with_volume_mount(VolumeMount::new("ws", "/workspace")),
        ];

        let merged = merge_steps_with_template(Some(&tpl), &steps).unwrap();
        assert_eq!(
            merged[0].volume_mounts,
            vec![
                VolumeMount::new("other-cache", "/cache"),
                VolumeMount::new("ws", "/workspace"),
            ]
        );
    }

    #[test]
    fn step_command_replaces_template_command() {
        let tpl = template(json!({"command": ["sh", "-c"]}));
        let steps = vec![Step::new("alpine").with_command(["echo"]), Step::new("alpine")];

        let merged = merge_steps_with_template(Some(&tpl), &steps).unwrap();
        assert_eq!(merged[0].command, vec!["echo"]);
        assert_eq!(merged[1].command, vec!["sh", "-c"]);
    }

    #[test]
    fn incompatible_shapes_fail() {
        let tpl = template(json!({"command": "echo"}));
        let err = merge_steps_with_template(Some(&tpl), &[Step::new("alpine")]).unwrap_err();
        assert!(matches!(err, MergeError::Decode(_)));

        let tpl = template(json!({"env": "A=1"}));
        let err =
            merge_steps_with_template(Some(&tpl), &[Step::new("alpine").with_env("B", "2")])
                .unwrap_err();
        assert!(matches!(err, MergeError::Shape { .. }));
    }

    #[test]
    fn unmodelled_template_fields_are_ignored() {
        let tpl = template(json!({"resources": {"limits": {"cpu": "1"}}}));
        let merged = merge_steps_with_template(Some(&tpl), &[Step::new("alpine")]).unwrap();
        assert_eq!(merged[0], Step::new("alpine"));
    }
}
