//! Container creation templates.
//!
//! A [`GroupSpec`] is the immutable template a group stamps new containers
//! from. Besides the mandatory image and an optional shell-style command it
//! carries an open-ended map of Docker Engine API `ContainerConfig` fields
//! (`Env`, `Labels`, `HostConfig`, …) that is forwarded to the daemon
//! verbatim. Per-creation overrides win key by key.

use crate::pool::{PoolError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Creation template shared by every container of a group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSpec {
    /// Image to create containers from. Stripped from the creation payload
    /// and passed to the daemon separately.
    pub image: String,

    /// Command to run, parsed shell-style into an argv vector.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    /// Additional Engine API creation fields, passed through untouched.
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

/// Per-creation override of a [`GroupSpec`]; every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpecOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

impl GroupSpec {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            command: None,
            options: Map::new(),
        }
    }

    /// Resolve this spec against optional overrides into the `(image,
    /// payload)` pair a create call needs.
    ///
    /// The override wins key by key; an empty command string is treated as
    /// absent, matching a template that sets `command: ""` as a placeholder.
    ///
    /// # Errors
    ///
    /// Fails with [`PoolError::InvalidRequest`] when the command string does
    /// not parse as shell words.
    pub fn creation_payload(
        &self,
        overrides: Option<&SpecOverrides>,
    ) -> Result<(String, Map<String, Value>)> {
        let mut image = self.image.clone();
        let mut command = self.command.clone();
        let mut options = self.options.clone();

        if let Some(over) = overrides {
            if let Some(i) = &over.image {
                image = i.clone();
            }
            if let Some(c) = &over.command {
                command = Some(c.clone());
            }
            for (key, value) in &over.options {
                options.insert(key.clone(), value.clone());
            }
        }

        if let Some(cmd) = command {
            let argv = shell_words::split(&cmd)
                .map_err(|e| PoolError::InvalidRequest(format!("command: {e}")))?;
            if !argv.is_empty() {
                options.insert(
                    "Cmd".to_string(),
                    Value::Array(argv.into_iter().map(Value::String).collect()),
                );
            }
        }

        Ok((image, options))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec_with(options: Value) -> GroupSpec {
        serde_json::from_value(options).unwrap()
    }

    #[test]
    fn image_is_stripped_from_payload() {
        let spec = GroupSpec::new("redis");
        let (image, payload) = spec.creation_payload(None).unwrap();
        assert_eq!(image, "redis");
        assert!(!payload.contains_key("Image"));
        assert!(!payload.contains_key("image"));
    }

    #[test]
    fn command_becomes_cmd_argv() {
        let spec = spec_with(json!({"image": "redis", "command": "redis-server --port 6380"}));
        let (_, payload) = spec.creation_payload(None).unwrap();
        assert_eq!(
            payload.get("Cmd").unwrap(),
            &json!(["redis-server", "--port", "6380"])
        );
    }

    #[test]
    fn quoted_command_words_stay_together() {
        let spec = spec_with(json!({"image": "alpine", "command": "sh -c 'echo hi'"}));
        let (_, payload) = spec.creation_payload(None).unwrap();
        assert_eq!(payload.get("Cmd").unwrap(), &json!(["sh", "-c", "echo hi"]));
    }

    #[test]
    fn empty_command_is_absent() {
        let spec = spec_with(json!({"image": "redis", "command": ""}));
        let (_, payload) = spec.creation_payload(None).unwrap();
        assert!(!payload.contains_key("Cmd"));
    }

    #[test]
    fn unbalanced_quotes_are_rejected() {
        let spec = spec_with(json!({"image": "redis", "command": "echo 'oops"}));
        let err = spec.creation_payload(None).unwrap_err();
        assert!(matches!(err, PoolError::InvalidRequest(_)));
    }

    #[test]
    fn extra_options_pass_through() {
        let spec = spec_with(json!({
            "image": "redis",
            "Env": ["FOO=bar"],
            "Labels": {"team": "infra"}
        }));
        let (_, payload) = spec.creation_payload(None).unwrap();
        assert_eq!(payload.get("Env").unwrap(), &json!(["FOO=bar"]));
        assert_eq!(payload.get("Labels").unwrap(), &json!({"team": "infra"}));
    }

    #[test]
    fn overrides_win_key_by_key() {
        let spec = spec_with(json!({
            "image": "redis",
            "command": "redis-server",
            "Env": ["FOO=bar"],
            "Labels": {"team": "infra"}
        }));
        let overrides: SpecOverrides = serde_json::from_value(json!({
            "command": "redis-server --appendonly yes",
            "Env": ["FOO=baz"]
        }))
        .unwrap();

        let (image, payload) = spec.creation_payload(Some(&overrides)).unwrap();
        assert_eq!(image, "redis");
        assert_eq!(payload.get("Env").unwrap(), &json!(["FOO=baz"]));
        // Untouched keys survive the merge.
        assert_eq!(payload.get("Labels").unwrap(), &json!({"team": "infra"}));
        assert_eq!(
            payload.get("Cmd").unwrap(),
            &json!(["redis-server", "--appendonly", "yes"])
        );
    }

    #[test]
    fn override_can_swap_the_image() {
        let spec = GroupSpec::new("redis:7");
        let overrides: SpecOverrides =
            serde_json::from_value(json!({"image": "redis:8"})).unwrap();
        let (image, _) = spec.creation_payload(Some(&overrides)).unwrap();
        assert_eq!(image, "redis:8");
    }

    #[test]
    fn merge_does_not_mutate_the_template() {
        let spec = spec_with(json!({"image": "redis", "Env": ["FOO=bar"]}));
        let overrides: SpecOverrides =
            serde_json::from_value(json!({"Env": ["FOO=baz"]})).unwrap();
        spec.creation_payload(Some(&overrides)).unwrap();
        assert_eq!(spec.options.get("Env").unwrap(), &json!(["FOO=bar"]));
    }
}
