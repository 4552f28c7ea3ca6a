use serde_json::Value;
use tracing::debug;

use crate::{Parameters, StrategyOptions};

/// Parameter-holding base embedded by every strategy.
///
/// Single owner, no interior mutability. The stored map is `params`; read it
/// through [`StrategyBase::parameters`].
#[derive(Clone, Debug, PartialEq)]
pub struct StrategyBase {
    params: Parameters,
    verbose: bool,
    parameter_verbose: bool,
}

impl Default for StrategyBase {
    fn default() -> Self {
        Self::new(StrategyOptions::default())
    }
}

impl From<StrategyOptions> for StrategyBase {
    fn from(options: StrategyOptions) -> Self {
        Self::new(options)
    }
}

impl StrategyBase {
    pub fn new(options: StrategyOptions) -> Self {
        Self {
            params: options.parameters,
            verbose: options.verbose,
            parameter_verbose: options.parameter_verbose,
        }
    }

    /// Keyword-style construction with default flags.
    ///
    /// ```ignore
    /// let base = StrategyBase::with_parameters([("hi", true), ("hello", true)]);
    /// ```
    pub fn with_parameters<I, K, V>(params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let options = params
            .into_iter()
            .fold(StrategyOptions::default(), |o, (k, v)| o.with_parameter(k, v));
        Self::new(options)
    }

    pub fn parameters(&self) -> &Parameters {
        &self.params
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    pub fn is_parameter_verbose(&self) -> bool {
        self.parameter_verbose
    }

    /// Insert or overwrite a parameter. Never fails.
    pub fn add_parameter(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        if self.parameter_verbose {
            debug!(parameter = %name, value = %value, "parameter set");
        }
        self.params.insert(name, value);
    }

    /// Remove a parameter if present. Absent names are a silent no-op.
    pub fn remove_parameter(&mut self, name: &str) -> Option<Value> {
        let removed = self.params.remove(name);
        if self.parameter_verbose {
            debug!(parameter = %name, present = removed.is_some(), "parameter removed");
        }
        removed
    }

    pub fn into_options(self) -> StrategyOptions {
        StrategyOptions {
            verbose: self.verbose,
            parameter_verbose: self.parameter_verbose,
            parameters: self.params,
        }
    }
}
