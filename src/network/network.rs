use std::time::Instant;

use log::{debug, info};
use rand::{rngs::StdRng, SeedableRng};

use crate::{
    activation::activation::ActivationFunction,
    error::{BrainError, Result},
    eval::test_result::{approx_eq, ConfusionMatrix, Misclassification, TestResult},
    layers::dense::Layer,
    loss::mse::MseLoss,
    network::options::{validate_sizes, NetworkOptions},
    optim::{adam::Adam, praxis::Praxis, sgd::Sgd},
    train::{
        state::{TrainingDatum, TrainingState, TrainingStatus},
        train_config::{TrainingOptions, TrainingOptionsPatch},
    },
};

/// A feedforward multi-layer perceptron.
///
/// Layer 0 is the input buffer; `layers[i]` holds the parameters and
/// buffers of layer `i + 1`. Nothing is allocated until the topology is
/// known, either from `NetworkOptions`, from the first training call, or
/// from an import.
#[derive(Debug)]
pub struct Network {
    pub(crate) id: Option<usize>,
    pub(crate) options: NetworkOptions,
    pub(crate) train_options: TrainingOptions,
    pub(crate) sizes: Vec<usize>,
    pub(crate) layers: Vec<Layer>,
    pub(crate) input: Vec<f64>,
    /// Adam update counter `t`.
    pub(crate) adam_step: u64,
    pub(crate) rng: StdRng,
}

impl Default for Network {
    fn default() -> Self {
        Network::new(NetworkOptions::default())
    }
}

impl Network {
    pub fn new(options: NetworkOptions) -> Network {
        Network {
            id: None,
            options,
            train_options: TrainingOptions::default(),
            sizes: Vec::new(),
            layers: Vec::new(),
            input: Vec::new(),
            adam_step: 0,
            rng: StdRng::from_entropy(),
        }
    }

    /// Network tagged with `id`, which shows up in every training state.
    pub fn with_id(options: NetworkOptions, id: usize) -> Network {
        Network { id: Some(id), ..Network::new(options) }
    }

    /// Replaces the random source with a seeded one.
    pub fn with_seed(mut self, seed: u64) -> Network {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Sets the options used by `train_default` and `train_with`.
    pub fn with_training_options(mut self, train_options: TrainingOptions) -> Network {
        self.train_options = train_options;
        self
    }

    pub fn id(&self) -> Option<usize> {
        self.id
    }

    pub fn options(&self) -> &NetworkOptions {
        &self.options
    }

    pub fn training_options(&self) -> &TrainingOptions {
        &self.train_options
    }

    /// Layer widths, empty until initialized.
    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn is_initialized(&self) -> bool {
        !self.layers.is_empty()
    }

    fn activation(&self) -> ActivationFunction {
        self.train_options.activation
    }

    // -----------------------------------------------------------------------
    // Topology
    // -----------------------------------------------------------------------

    /// Allocates weights, biases and buffers for the configured sizes.
    ///
    /// Uses the sizes already set on the network, or else the ones from
    /// `NetworkOptions`; fails when neither is available.
    pub fn initialize(&mut self) -> Result<()> {
        if self.sizes.is_empty() {
            self.sizes = self.options.sizes().unwrap_or_default();
        }
        validate_sizes(&self.sizes)?;
        self.allocate();
        debug!("initialized network {:?} with sizes {:?}", self.id, self.sizes);
        Ok(())
    }

    pub(crate) fn allocate(&mut self) {
        let rng = &mut self.rng;
        self.layers = self.sizes.windows(2)
            .map(|pair| Layer::new(pair[1], pair[0], &mut *rng))
            .collect();
        self.input = vec![0.0; self.sizes[0]];
        self.adam_step = 0;
    }

    /// Freezes the topology on first use: explicit sizes win, otherwise
    /// they are read off the first example.
    fn ensure_initialized(&mut self, first: &TrainingDatum) -> Result<()> {
        if self.is_initialized() {
            return Ok(());
        }
        if self.sizes.is_empty() && self.options.sizes().is_none() {
            self.sizes = self.options.infer_sizes(first.input.len(), first.output.len());
        }
        self.initialize()
    }

    fn validate_data(&self, data: &[TrainingDatum]) -> Result<()> {
        let input_size = self.sizes[0];
        let output_size = self.sizes[self.sizes.len() - 1];
        for datum in data {
            if datum.input.len() != input_size {
                return Err(BrainError::ShapeMismatch {
                    what: "training input",
                    expected: input_size,
                    actual: datum.input.len(),
                });
            }
            if datum.output.len() != output_size {
                return Err(BrainError::ShapeMismatch {
                    what: "training output",
                    expected: output_size,
                    actual: datum.output.len(),
                });
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Forward / backward / update primitives
    // -----------------------------------------------------------------------

    /// Runs `input` through the network and returns a copy of the output.
    ///
    /// Never initializes the network on its own.
    pub fn run(&mut self, input: &[f64]) -> Result<Vec<f64>> {
        self.forward(input)?;
        Ok(self.output().to_vec())
    }

    fn output(&self) -> &[f64] {
        self.layers.last().map(|layer| layer.outputs.as_slice()).unwrap_or_default()
    }

    /// Forward pass into the per-layer output buffers.
    pub fn forward(&mut self, input: &[f64]) -> Result<()> {
        if !self.is_initialized() {
            return Err(BrainError::Uninitialized);
        }
        if input.len() != self.input.len() {
            return Err(BrainError::ShapeMismatch {
                what: "input",
                expected: self.input.len(),
                actual: input.len(),
            });
        }
        let activation = self.activation();
        self.input.copy_from_slice(input);
        for i in 0..self.layers.len() {
            let (before, rest) = self.layers.split_at_mut(i);
            let incoming = before.last().map_or(&self.input[..], |layer| &layer.outputs[..]);
            rest[0].feed_from(incoming, activation)?;
        }
        Ok(())
    }

    /// Computes errors and deltas from the output layer down to the first
    /// hidden layer. Must follow a `forward` for the same example.
    pub fn backward(&mut self, target: &[f64]) -> Result<()> {
        let activation = self.activation();
        let Some(last) = self.layers.len().checked_sub(1) else {
            return Err(BrainError::Uninitialized);
        };
        if target.len() != self.layers[last].size {
            return Err(BrainError::ShapeMismatch {
                what: "target",
                expected: self.layers[last].size,
                actual: target.len(),
            });
        }
        self.layers[last].output_deltas(target, activation)?;
        for i in (0..last).rev() {
            let (head, tail) = self.layers.split_at_mut(i + 1);
            head[i].hidden_deltas(&tail[0], activation)?;
        }
        Ok(())
    }

    /// Applies the configured weight-update rule using the current deltas.
    pub fn adjust_weights(&mut self) {
        let options = &self.train_options;
        match options.praxis {
            Praxis::Momentum => {
                let sgd = Sgd::new(options.learning_rate, options.momentum);
                for i in 0..self.layers.len() {
                    let (before, rest) = self.layers.split_at_mut(i);
                    let incoming = before.last().map_or(&self.input[..], |layer| &layer.outputs[..]);
                    sgd.step(&mut rest[0], incoming);
                }
            }
            Praxis::Adam => {
                let adam = Adam::new(options.learning_rate, options.beta1, options.beta2, options.epsilon);
                self.adam_step += 1;
                for i in 0..self.layers.len() {
                    let (before, rest) = self.layers.split_at_mut(i);
                    let incoming = before.last().map_or(&self.input[..], |layer| &layer.outputs[..]);
                    adam.step(&mut rest[0], incoming, self.adam_step);
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Training loop
    // -----------------------------------------------------------------------

    /// Trains with the options the network was configured with.
    pub fn train_default(&mut self, data: &[TrainingDatum]) -> Result<TrainingState> {
        let options = self.train_options.clone();
        self.train(data, options)
    }

    /// Trains with the network's options, overridden by every field set in `patch`.
    pub fn train_with(&mut self, data: &[TrainingDatum], patch: TrainingOptionsPatch) -> Result<TrainingState> {
        let options = patch.apply(&self.train_options);
        self.train(data, options)
    }

    /// Trains until the error threshold, the iteration cap or the timeout
    /// is reached, and returns the final state.
    ///
    /// Options and data shapes are validated before any weight changes.
    /// The first call fixes the topology; later calls keep it.
    pub fn train(&mut self, data: &[TrainingDatum], options: TrainingOptions) -> Result<TrainingState> {
        options.validate()?;
        let Some(first) = data.first() else {
            return Err(BrainError::InsufficientData { available: 0, required: 1 });
        };
        self.ensure_initialized(first)?;
        self.validate_data(data)?;

        if options.praxis == Praxis::Adam {
            self.layers.iter_mut().for_each(Layer::ensure_moments);
        }
        self.train_options = options.clone();

        let started = Instant::now();
        let mut state = TrainingState::new(self.id);

        loop {
            if let Some(status) = stop_reason(&state, &options, started) {
                state.status = status;
                break;
            }

            state.iterations += 1;
            let log_due = options.logs() && state.iterations % options.log_period == 0;

            if log_due || state.iterations % options.error_check_interval == 0 {
                state.error = self.train_epoch(data, true)?;
            } else {
                self.train_epoch(data, false)?;
            }

            if log_due {
                match &options.log_hook {
                    Some(hook) => hook.call(state.clone()),
                    None => info!("{state}"),
                }
            }
            if let Some(callback) = &options.callback {
                if state.iterations % options.callback_period == 0 {
                    callback.call(state.clone());
                }
            }
        }

        info!(
            "training {:?} stopped: {:?} after {} iterations, error {}",
            self.id, state.status, state.iterations, state.error
        );
        Ok(state)
    }

    /// One forward/backward/update pass over every example. With
    /// `track_error`, returns the mean of the per-example mean squared
    /// output errors; otherwise returns 0.
    fn train_epoch(&mut self, data: &[TrainingDatum], track_error: bool) -> Result<f64> {
        let mut error_sum = 0.0;
        for datum in data {
            self.forward(&datum.input)?;
            self.backward(&datum.output)?;
            self.adjust_weights();
            if track_error {
                if let Some(last) = self.layers.last() {
                    error_sum += MseLoss::from_errors(&last.errors);
                }
            }
        }
        Ok(error_sum / data.len() as f64)
    }

    // -----------------------------------------------------------------------
    // Evaluation
    // -----------------------------------------------------------------------

    /// Evaluates a held-out set.
    ///
    /// Single-output networks are scored as binary classifiers against
    /// `binary_thresh`; wider outputs are scored by argmax against a
    /// one-hot target.
    pub fn test(&mut self, data: &[TrainingDatum]) -> Result<TestResult> {
        if !self.is_initialized() {
            return Err(BrainError::Uninitialized);
        }
        self.validate_data(data)?;

        let binary = self.sizes[self.sizes.len() - 1] == 1;
        let threshold = self.options.binary_thresh;
        let mut result = TestResult { binary, total: data.len(), ..Default::default() };
        let mut confusion = ConfusionMatrix::default();
        let mut error_sum = 0.0;

        for datum in data {
            let output = self.run(&datum.input)?;
            error_sum += MseLoss::loss(&output, &datum.output);

            let (predicted, expected) = if binary {
                let predicted = output[0] > threshold;
                let expected = approx_eq(datum.output[0], 1.0);
                confusion.record(predicted, expected);
                (usize::from(predicted), usize::from(expected))
            } else {
                (argmax(&output), argmax(&datum.output))
            };

            if predicted != expected {
                result.misclassifications.push(Misclassification {
                    input: datum.input.clone(),
                    target: datum.output.clone(),
                    predicted,
                    expected,
                });
            }
        }

        if !data.is_empty() {
            result.error = error_sum / data.len() as f64;
        }
        if binary {
            result.precision = confusion.precision();
            result.recall = confusion.recall();
            result.accuracy = confusion.accuracy();
            result.confusion = confusion;
        }
        Ok(result)
    }
}

fn stop_reason(state: &TrainingState, options: &TrainingOptions, started: Instant) -> Option<TrainingStatus> {
    if state.error <= options.error_thresh {
        Some(TrainingStatus::Converged)
    } else if state.iterations >= options.iterations {
        Some(TrainingStatus::IterationCapped)
    } else if options.timeout.is_some_and(|timeout| started.elapsed() >= timeout) {
        Some(TrainingStatus::TimedOut)
    } else {
        None
    }
}

/// Index of the maximum element in a slice.
fn argmax(v: &[f64]) -> usize {
    v.iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, _)| i)
        .unwrap_or(0)
}
