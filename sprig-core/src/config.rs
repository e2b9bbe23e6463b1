//! Runtime Configuration
//!
//! All names the runtime reads from markup or puts on the wire derive from
//! a [`RuntimeConfig`]. The defaults match the documented `sp-` vocabulary;
//! hosts embedding the runtime next to another library can pick a different
//! prefix.

use serde::Deserialize;

use crate::error::ConfigError;

/// Runtime settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Prefix for every declarative attribute (`sp-data`, `sp-bind`, ...).
    pub prefix: String,

    /// Header marking requests as framework-originated.
    pub request_header: String,

    /// Base URL that relative request URLs are resolved against.
    ///
    /// Without one, only absolute URLs can be requested: `$get('/items')`
    /// fails with [`FetchError::RelativeUrl`](crate::error::FetchError::RelativeUrl) and
    /// surfaces as an error event.
    pub base_url: Option<String>,

    /// Attributes carried across a swap by the settle pass.
    pub settle_attributes: Vec<String>,

    /// Delay used by a bare `debounce` modifier.
    pub default_debounce_ms: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            prefix: "sp-".to_string(),
            request_header: "sp-request".to_string(),
            base_url: None,
            settle_attributes: ["style", "class", "height", "width"]
                .into_iter()
                .map(String::from)
                .collect(),
            default_debounce_ms: 300,
        }
    }
}

impl RuntimeConfig {
    /// Parse a configuration from JSON. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Full attribute name for a directive, e.g. `attr("data")` is `sp-data`.
    pub fn attr(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    /// Name of an event emitted by the runtime, e.g. `event("init")` is
    /// `spinit`.
    pub fn event(&self, name: &str) -> String {
        format!("{}{}", self.prefix.trim_end_matches('-'), name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_names() {
        let config = RuntimeConfig::default();
        assert_eq!(config.attr("bind"), "sp-bind");
        assert_eq!(config.event("destroy"), "spdestroy");
        assert_eq!(config.settle_attributes.len(), 4);
    }

    #[test]
    fn json_overrides_selected_fields() {
        let config = RuntimeConfig::from_json(r#"{"prefix": "x-", "default_debounce_ms": 50}"#).unwrap();
        assert_eq!(config.attr("data"), "x-data");
        assert_eq!(config.event("error"), "xerror");
        assert_eq!(config.default_debounce_ms, 50);
        assert_eq!(config.request_header, "sp-request");
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(RuntimeConfig::from_json("{prefix").is_err());
    }
}
