//! Engine options.
use serde::{Deserialize, Serialize};

/// Name of the environment variable read by [`Options::from_env`].
pub const OPTIONS_ENV_VAR: &str = "ARBOR_OPTIONS";

/// What the update queue keeps when trees arrive faster than they are applied.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueuePolicy {
    /// Keep every tree, in arrival order.
    Unbounded,
    /// Keep only the newest pending tree.
    #[default]
    Latest,
}

/// Options of `render`, `update` and the update driver.
///
/// Can be read from JSON; missing fields take their default value:
/// ```
/// use arbor::{Options, QueuePolicy};
/// let options = Options::from_json(r#"{ "strict_properties": false }"#).unwrap();
/// assert!(!options.strict_properties);
/// assert_eq!(options.queue_policy, QueuePolicy::Latest);
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Whether unsupported properties are an error. Otherwise they are skipped with a warning.
    pub strict_properties: bool,
    /// Whether children that all carry keys are matched by key instead of by position.
    pub keyed_children: bool,
    pub queue_policy: QueuePolicy,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            strict_properties: true,
            keyed_children: true,
            queue_policy: QueuePolicy::default(),
        }
    }
}

impl Options {
    pub fn from_json(json: &str) -> Result<Options, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Reads options from the `ARBOR_OPTIONS` environment variable, as a JSON document.
    ///
    /// Returns the default options if the variable is not set.
    pub fn from_env() -> Result<Options, serde_json::Error> {
        match std::env::var(OPTIONS_ENV_VAR) {
            Ok(json) => Options::from_json(&json),
            Err(_) => Ok(Options::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Options, QueuePolicy, OPTIONS_ENV_VAR};

    #[test]
    fn defaults() {
        let options = Options::from_json("{}").unwrap();
        assert_eq!(options, Options::default());
        assert!(options.strict_properties);
        assert!(options.keyed_children);
        assert_eq!(options.queue_policy, QueuePolicy::Latest);
    }

    #[test]
    fn parse() {
        let options = Options::from_json(r#"{"keyed_children": false, "queue_policy": "unbounded"}"#).unwrap();
        assert!(!options.keyed_children);
        assert_eq!(options.queue_policy, QueuePolicy::Unbounded);
        assert!(Options::from_json(r#"{"queue_policy": "sometimes"}"#).is_err());
    }

    #[test]
    fn from_env() {
        std::env::set_var(OPTIONS_ENV_VAR, r#"{"strict_properties": false, "queue_policy": "unbounded"}"#);
        let options = Options::from_env().unwrap();
        assert!(!options.strict_properties);
        assert_eq!(options.queue_policy, QueuePolicy::Unbounded);

        std::env::set_var(OPTIONS_ENV_VAR, "not json");
        assert!(Options::from_env().is_err());

        std::env::remove_var(OPTIONS_ENV_VAR);
        assert_eq!(Options::from_env().unwrap(), Options::default());
    }

    #[test]
    fn round_trip_through_json() {
        let options = Options {
            strict_properties: false,
            ..Options::default()
        };
        let json = serde_json::to_string(&options).unwrap();
        assert_eq!(Options::from_json(&json).unwrap(), options);
    }
}
