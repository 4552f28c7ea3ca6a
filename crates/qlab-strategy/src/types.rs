use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::StrategyBase;

/// Free-form parameter set: name -> arbitrary value.
///
/// Sorted map so debug output and serialization are deterministic. Callers
/// must not rely on iteration order.
pub type Parameters = BTreeMap<String, Value>;

/// Construction-time options for a strategy.
///
/// Mirrors keyword-style construction: two flags plus an open-ended mapping
/// of named values. When deserialized, every key other than the two flags is
/// captured into `parameters` without validation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StrategyOptions {
    #[serde(default = "default_verbose")]
    pub verbose: bool,
    #[serde(default)]
    pub parameter_verbose: bool,
    #[serde(flatten)]
    pub parameters: Parameters,
}

fn default_verbose() -> bool {
    true
}

impl Default for StrategyOptions {
    fn default() -> Self {
        Self {
            verbose: default_verbose(),
            parameter_verbose: false,
            parameters: Parameters::new(),
        }
    }
}

impl StrategyOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn parameter_verbose(mut self, parameter_verbose: bool) -> Self {
        self.parameter_verbose = parameter_verbose;
        self
    }

    /// Add one named value. A repeated name overwrites the earlier value.
    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    /// Read the `/strategy` section of a loaded config document.
    ///
    /// A missing section yields the defaults. A section that is present but
    /// is not a mapping, or whose flags are not booleans, is rejected.
    pub fn from_config_json(cfg: &Value) -> Result<Self, OptionsError> {
        let Some(section) = cfg.pointer("/strategy") else {
            return Ok(Self::default());
        };

        if section.is_null() {
            return Ok(Self::default());
        }
        if !section.is_object() {
            return Err(OptionsError::NotAMapping {
                found: json_kind(section),
            });
        }

        for flag in ["verbose", "parameter_verbose"] {
            if let Some(v) = section.get(flag) {
                if !v.is_boolean() {
                    return Err(OptionsError::FlagNotBool {
                        flag,
                        found: json_kind(v),
                    });
                }
            }
        }

        serde_json::from_value(section.clone()).map_err(|e| OptionsError::Malformed {
            reason: e.to_string(),
        })
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "mapping",
    }
}

/// Errors returned by [`StrategyOptions::from_config_json`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OptionsError {
    /// `/strategy` exists but is not a mapping.
    NotAMapping { found: &'static str },
    /// One of the two flags holds a non-boolean value.
    FlagNotBool {
        flag: &'static str,
        found: &'static str,
    },
    /// Deserialization failed for any other reason.
    Malformed { reason: String },
}

impl std::fmt::Display for OptionsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotAMapping { found } => {
                write!(f, "strategy section must be a mapping (got {found})")
            }
            Self::FlagNotBool { flag, found } => {
                write!(f, "strategy.{flag} must be a bool (got {found})")
            }
            Self::Malformed { reason } => write!(f, "strategy section malformed: {reason}"),
        }
    }
}

impl std::error::Error for OptionsError {}

/// Strategy contract.
///
/// Implementors embed a [`StrategyBase`] and supply the two extension points.
/// Parameter access is provided on top of the embedded base.
///
/// `simulate` and `eval` carry no default behavior; their output types are
/// chosen by each implementor.
pub trait Strategy: Send + Sync {
    type Simulation;
    type Evaluation;

    fn base(&self) -> &StrategyBase;

    fn base_mut(&mut self) -> &mut StrategyBase;

    fn simulate(&mut self) -> Self::Simulation;

    fn eval(&self) -> Self::Evaluation;

    fn parameters(&self) -> &Parameters {
        self.base().parameters()
    }

    fn add_parameter(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.base_mut().add_parameter(name, value);
    }

    fn remove_parameter(&mut self, name: &str) -> Option<Value> {
        self.base_mut().remove_parameter(name)
    }
}
