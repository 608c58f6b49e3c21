use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Serialize, Deserialize};

use crate::activation::activation::ActivationFunction;
use crate::error::{BrainError, Result};
use crate::optim::praxis::Praxis;
use crate::train::state::TrainingState;

/// A log or progress hook. Receives its own copy of the training state.
#[derive(Clone)]
pub struct StateHook(Arc<dyn Fn(TrainingState) + Send + Sync>);

impl StateHook {
    pub fn new<F>(hook: F) -> StateHook
    where
        F: Fn(TrainingState) + Send + Sync + 'static,
    {
        StateHook(Arc::new(hook))
    }

    pub fn call(&self, state: TrainingState) {
        (self.0)(state)
    }
}

/// Two hooks are equal when they share the same closure.
impl PartialEq for StateHook {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for StateHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StateHook")
    }
}

/// Hyperparameters for a training run.
///
/// # Fields
/// - `praxis`: weight-update rule (momentum SGD or Adam)
/// - `activation`: node activation; only `Sigmoid` trains
/// - `iterations`: cap on full passes over the training data
/// - `error_thresh`: training stops once the mean error is at or below this
/// - `log` / `log_period`: periodic logging; `log_hook` replaces the default `log::info!` sink
/// - `callback` / `callback_period`: periodic progress hook
/// - `timeout`: optional wall-clock budget, checked once per iteration
/// - `error_check_interval`: iterations between exact error recomputations
///
/// Hooks are not serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingOptions {
    pub praxis: Praxis,
    pub activation: ActivationFunction,
    pub iterations: usize,
    pub error_thresh: f64,
    pub log: bool,
    pub log_period: usize,
    pub leaky_relu_alpha: f64,
    pub learning_rate: f64,
    pub momentum: f64,
    pub callback_period: usize,
    #[serde(with = "timeout_ms")]
    pub timeout: Option<Duration>,
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
    pub error_check_interval: usize,
    #[serde(skip)]
    pub log_hook: Option<StateHook>,
    #[serde(skip)]
    pub callback: Option<StateHook>,
}

impl Default for TrainingOptions {
    fn default() -> Self {
        TrainingOptions {
            praxis: Praxis::Momentum,
            activation: ActivationFunction::Sigmoid,
            iterations: 20_000,
            error_thresh: 0.005,
            log: false,
            log_period: 10,
            leaky_relu_alpha: 0.01,
            learning_rate: 0.3,
            momentum: 0.1,
            callback_period: 10,
            timeout: None,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            error_check_interval: 1,
            log_hook: None,
            callback: None,
        }
    }
}

impl TrainingOptions {
    /// Checks every hyperparameter before any training work happens.
    pub fn validate(&self) -> Result<()> {
        self.activation.ensure_supported()?;
        strictly_positive("iterations", self.iterations)?;
        open_unit("error_thresh", self.error_thresh)?;
        strictly_positive("log_period", self.log_period)?;
        open_unit("leaky_relu_alpha", self.leaky_relu_alpha)?;
        open_unit("learning_rate", self.learning_rate)?;
        open_unit("momentum", self.momentum)?;
        if self.callback.is_some() {
            strictly_positive("callback_period", self.callback_period)?;
        }
        if let Some(timeout) = self.timeout {
            if timeout.is_zero() {
                return Err(BrainError::config("timeout", format!("{timeout:?}"), "must be greater than zero"));
            }
        }
        open_unit("beta1", self.beta1)?;
        open_unit("beta2", self.beta2)?;
        open_unit("epsilon", self.epsilon)?;
        strictly_positive("error_check_interval", self.error_check_interval)?;
        Ok(())
    }

    /// Whether the periodic log tick has anywhere to go.
    pub fn logs(&self) -> bool {
        self.log || self.log_hook.is_some()
    }

    /// Copy suitable for a `NetworkExport`: same hyperparameters, no hooks.
    pub fn without_hooks(&self) -> TrainingOptions {
        TrainingOptions {
            log_hook: None,
            callback: None,
            ..self.clone()
        }
    }
}

fn strictly_positive(field: &'static str, value: usize) -> Result<()> {
    if value == 0 {
        return Err(BrainError::config(field, value, "must be greater than 0"));
    }
    Ok(())
}

fn open_unit(field: &'static str, value: f64) -> Result<()> {
    if !(value > 0.0 && value < 1.0) {
        return Err(BrainError::config(field, value, "must be in range (0..1)"));
    }
    Ok(())
}

/// A partial set of training options.
///
/// Every field left `None` is taken from the base options passed to
/// [`TrainingOptionsPatch::apply`]; every `Some` field wins.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingOptionsPatch {
    pub praxis: Option<Praxis>,
    pub activation: Option<ActivationFunction>,
    pub iterations: Option<usize>,
    pub error_thresh: Option<f64>,
    pub log: Option<bool>,
    pub log_period: Option<usize>,
    pub leaky_relu_alpha: Option<f64>,
    pub learning_rate: Option<f64>,
    pub momentum: Option<f64>,
    pub callback_period: Option<usize>,
    #[serde(with = "timeout_ms")]
    pub timeout: Option<Duration>,
    pub beta1: Option<f64>,
    pub beta2: Option<f64>,
    pub epsilon: Option<f64>,
    pub error_check_interval: Option<usize>,
    #[serde(skip)]
    pub log_hook: Option<StateHook>,
    #[serde(skip)]
    pub callback: Option<StateHook>,
}

impl TrainingOptionsPatch {
    pub fn apply(self, base: &TrainingOptions) -> TrainingOptions {
        TrainingOptions {
            praxis: self.praxis.unwrap_or(base.praxis),
            activation: self.activation.unwrap_or(base.activation),
            iterations: self.iterations.unwrap_or(base.iterations),
            error_thresh: self.error_thresh.unwrap_or(base.error_thresh),
            log: self.log.unwrap_or(base.log),
            log_period: self.log_period.unwrap_or(base.log_period),
            leaky_relu_alpha: self.leaky_relu_alpha.unwrap_or(base.leaky_relu_alpha),
            learning_rate: self.learning_rate.unwrap_or(base.learning_rate),
            momentum: self.momentum.unwrap_or(base.momentum),
            callback_period: self.callback_period.unwrap_or(base.callback_period),
            timeout: self.timeout.or(base.timeout),
            beta1: self.beta1.unwrap_or(base.beta1),
            beta2: self.beta2.unwrap_or(base.beta2),
            epsilon: self.epsilon.unwrap_or(base.epsilon),
            error_check_interval: self.error_check_interval.unwrap_or(base.error_check_interval),
            log_hook: self.log_hook.or_else(|| base.log_hook.clone()),
            callback: self.callback.or_else(|| base.callback.clone()),
        }
    }
}

/// Serializes an optional timeout as fractional milliseconds, exact to the
/// nanosecond for budgets under roughly a hundred days.
mod timeout_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    const NANOS_PER_MILLI: f64 = 1e6;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_some(&(d.as_nanos() as f64 / NANOS_PER_MILLI)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?
            .map(|ms| Duration::from_nanos((ms * NANOS_PER_MILLI).round() as u64)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        TrainingOptions::default().validate().unwrap();
    }

    #[test]
    fn rejects_rates_outside_open_unit_interval() {
        for rate in [0.0, 1.0, -0.5, f64::NAN] {
            let options = TrainingOptions { learning_rate: rate, ..Default::default() };
            match options.validate() {
                Err(BrainError::Configuration { field, .. }) => assert_eq!(field, "learning_rate"),
                other => panic!("expected configuration error, got {other:?}"),
            }
        }
    }

    #[test]
    fn rejects_zero_counts_and_timeout() {
        let options = TrainingOptions { iterations: 0, ..Default::default() };
        assert!(matches!(options.validate(), Err(BrainError::Configuration { field: "iterations", .. })));

        let options = TrainingOptions { timeout: Some(Duration::ZERO), ..Default::default() };
        assert!(matches!(options.validate(), Err(BrainError::Configuration { field: "timeout", .. })));

        let options = TrainingOptions {
            callback_period: 0,
            callback: Some(StateHook::new(|_| {})),
            ..Default::default()
        };
        assert!(matches!(options.validate(), Err(BrainError::Configuration { field: "callback_period", .. })));
    }

    #[test]
    fn callback_period_is_ignored_without_callback() {
        let options = TrainingOptions { callback_period: 0, ..Default::default() };
        options.validate().unwrap();
    }

    #[test]
    fn rejects_unimplemented_activation() {
        let options = TrainingOptions { activation: ActivationFunction::Tanh, ..Default::default() };
        assert!(matches!(options.validate(), Err(BrainError::UnsupportedActivation(ActivationFunction::Tanh))));
    }

    #[test]
    fn patch_overrides_only_set_fields() {
        let base = TrainingOptions { learning_rate: 0.2, log_period: 50, ..Default::default() };
        let patch = TrainingOptionsPatch {
            praxis: Some(Praxis::Adam),
            log_period: Some(100),
            ..Default::default()
        };
        let merged = patch.apply(&base);
        assert_eq!(merged.praxis, Praxis::Adam);
        assert_eq!(merged.log_period, 100);
        assert_eq!(merged.learning_rate, 0.2);
        assert_eq!(merged.iterations, 20_000);
    }

    #[test]
    fn timeout_serializes_as_millis() {
        let options = TrainingOptions { timeout: Some(Duration::from_millis(1500)), ..Default::default() };
        let json = serde_json::to_value(&options).unwrap();
        assert_eq!(json["timeout"].as_f64(), Some(1500.0));
        assert_eq!(json["praxis"], "momentum");

        let back: TrainingOptions = serde_json::from_value(json).unwrap();
        assert_eq!(back.timeout, Some(Duration::from_millis(1500)));
    }

    #[test]
    fn sub_millisecond_timeout_survives_json() {
        for timeout in [Duration::from_micros(1500), Duration::from_micros(500), Duration::from_nanos(123_456_789)] {
            let options = TrainingOptions { timeout: Some(timeout), ..Default::default() };
            let json = serde_json::to_string(&options).unwrap();
            let back: TrainingOptions = serde_json::from_str(&json).unwrap();
            assert_eq!(back.timeout, Some(timeout));
            back.validate().unwrap();
        }
    }

    #[test]
    fn whole_millisecond_timeout_reads_from_integer() {
        let back: TrainingOptions = serde_json::from_str(r#"{"timeout": 250}"#).unwrap();
        assert_eq!(back.timeout, Some(Duration::from_millis(250)));
    }
}
