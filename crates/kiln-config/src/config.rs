//! Top-level configuration and profile merging.
//!
//! For file discovery, see the `discovery` module.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::bundle::BundleOptions;
use crate::error::{ConfigError, Result as ConfigResult};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KilnConfig {
    #[serde(default)]
    pub build: BundleOptions,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub profiles: HashMap<String, ProfileConfig>,
}

/// Overrides applied on top of `[build]` when a profile is selected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileConfig {
    #[serde(default)]
    pub build: Value,
}

impl KilnConfig {
    /// Create from a JSON value, e.g. a `package.json` field or generated config.
    ///
    /// ```
    /// use kiln_config::KilnConfig;
    /// use serde_json::json;
    ///
    /// let config = KilnConfig::from_value(json!({
    ///     "build": { "entries": { "index": "index.html" } }
    /// }))
    /// .unwrap();
    /// assert_eq!(config.build.entries["index"].to_str(), Some("index.html"));
    /// ```
    pub fn from_value(value: Value) -> ConfigResult<Self> {
        serde_json::from_value(value).map_err(|e| ConfigError::InvalidValue {
            field: "config".to_string(),
            hint: Some(e.to_string()),
        })
    }

    pub fn to_value(&self) -> ConfigResult<Value> {
        serde_json::to_value(self).map_err(|e| ConfigError::InvalidValue {
            field: "config".to_string(),
            hint: Some(e.to_string()),
        })
    }

    /// Fold the named profile's overrides into `build`.
    ///
    /// Tables merge key by key; scalars and arrays replace. Naming a profile
    /// that does not exist is an error.
    pub fn materialize_profile(mut self, profile: Option<&str>) -> ConfigResult<Self> {
        let Some(name) = profile else {
            return Ok(self);
        };
        let overrides = self
            .profiles
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProfile(name.to_string()))?;

        if !overrides.build.is_null() {
            let mut base = serde_json::to_value(&self.build).map_err(|err| {
                ConfigError::InvalidProfileOverride {
                    message: err.to_string(),
                }
            })?;
            merge_values(&mut base, &overrides.build);
            self.build = serde_json::from_value(base).map_err(|err| {
                ConfigError::InvalidProfileOverride {
                    message: format!("profile '{}': {}", name, err),
                }
            })?;
        }

        tracing::debug!(profile = name, "applied profile");
        Ok(self)
    }
}

/// Deep-merge `update` into `target`.
pub fn merge_values(target: &mut Value, update: &Value) {
    match (target, update) {
        (Value::Object(target_map), Value::Object(update_map)) => {
            for (key, value) in update_map {
                merge_values(target_map.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
        (target_slot, _) => {
            *target_slot = update.clone();
        }
    }
}
