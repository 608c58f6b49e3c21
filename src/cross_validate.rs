use std::time::{Duration, Instant};

use log::info;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use rayon::prelude::*;
use serde::{Serialize, Deserialize};

use crate::{
    error::{BrainError, Result},
    eval::test_result::{ConfusionMatrix, TestResult},
    network::{export::NetworkExport, network::Network},
    train::{state::TrainingDatum, train_config::TrainingOptions},
};

pub const DEFAULT_FOLDS: usize = 4;

/// Outcome of training and testing one fold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionResult {
    pub train_time: Duration,
    pub test_time: Duration,
    pub iterations: usize,
    /// Final training error, used for model selection.
    pub error: f64,
    /// Evaluation on the fold's held-out slice.
    pub test: TestResult,
    pub network: NetworkExport,
}

/// Fold means.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrossValidateAverages {
    pub train_time: Duration,
    pub test_time: Duration,
    pub iterations: usize,
    pub error: f64,
}

/// Classification stats pooled over every fold.
///
/// The confusion matrix and its ratios are only filled in when every fold
/// was scored as a binary classifier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrossValidateResultStats {
    pub binary: bool,
    pub total: usize,
    pub test_size: usize,
    pub train_size: usize,
    pub confusion: ConfusionMatrix,
    pub precision: f64,
    pub recall: f64,
    pub accuracy: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrossValidateStats {
    pub averages: CrossValidateAverages,
    pub stats: CrossValidateResultStats,
    pub sets: Vec<PartitionResult>,
}

/// k-fold cross-validation over networks built by `init`.
///
/// `init` receives the fold index and must return a fresh network; each
/// fold trains its own instance with its own random source.
pub struct CrossValidate<F> {
    init: F,
    stats: CrossValidateStats,
    rng: StdRng,
    parallel: bool,
}

impl<F> CrossValidate<F>
where
    F: Fn(usize) -> Network + Sync,
{
    pub fn new(init: F) -> CrossValidate<F> {
        CrossValidate {
            init,
            stats: CrossValidateStats::default(),
            rng: StdRng::from_entropy(),
            parallel: false,
        }
    }

    /// Seeds the shuffle.
    pub fn with_seed(mut self, seed: u64) -> CrossValidate<F> {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Trains the folds on the rayon thread pool instead of one after another.
    pub fn parallel(mut self, parallel: bool) -> CrossValidate<F> {
        self.parallel = parallel;
        self
    }

    /// Results of the last completed `train` call.
    pub fn stats(&self) -> &CrossValidateStats {
        &self.stats
    }

    /// Shuffles `data`, splits it into `k` test slices of `len / k`
    /// examples and trains one network per slice.
    ///
    /// Every fold trains on the whole shuffled set; the slice is only used
    /// for its evaluation. Fails without touching previous results when
    /// there are fewer examples than folds or any fold fails.
    pub fn train(&mut self, data: &[TrainingDatum], options: &TrainingOptions, k: usize) -> Result<&CrossValidateStats> {
        if k == 0 {
            return Err(BrainError::config("k", k, "must be greater than 0"));
        }
        if data.len() < k {
            return Err(BrainError::InsufficientData { available: data.len(), required: k });
        }

        let mut shuffled = data.to_vec();
        shuffled.shuffle(&mut self.rng);
        let size = shuffled.len() / k;

        let run_fold = |i: usize| {
            let test_set = &shuffled[i * size..(i + 1) * size];
            self.test_partition(i, options, &shuffled, test_set)
        };
        let sets = if self.parallel {
            (0..k).into_par_iter().map(run_fold).collect::<Result<Vec<_>>>()?
        } else {
            (0..k).map(run_fold).collect::<Result<Vec<_>>>()?
        };

        self.stats = aggregate(sets, size, shuffled.len());
        Ok(&self.stats)
    }

    fn test_partition(
        &self,
        fold: usize,
        options: &TrainingOptions,
        train_set: &[TrainingDatum],
        test_set: &[TrainingDatum],
    ) -> Result<PartitionResult> {
        let mut network = (self.init)(fold);

        let begin_train = Instant::now();
        let state = network.train(train_set, options.clone())?;
        let begin_test = Instant::now();
        let test = network.test(test_set)?;
        let end_test = Instant::now();

        info!(
            "fold {fold}: {} iterations, training error {}, test error {}",
            state.iterations, state.error, test.error
        );

        Ok(PartitionResult {
            train_time: begin_test - begin_train,
            test_time: end_test - begin_test,
            iterations: state.iterations,
            error: state.error,
            test,
            network: network.export()?,
        })
    }

    /// Network rebuilt from the fold with the lowest training error.
    pub fn to_network(&self) -> Result<Network> {
        let winner = self.stats.sets.iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.error.partial_cmp(&b.error).unwrap_or(std::cmp::Ordering::Equal))
            .ok_or(BrainError::NoModelSelected)?;

        info!("selected fold {} with training error {}", winner.0, winner.1.error);
        Network::from_export(&winner.1.network)
    }
}

fn aggregate(sets: Vec<PartitionResult>, test_size: usize, len: usize) -> CrossValidateStats {
    let k = sets.len();
    let mut averages = CrossValidateAverages::default();
    let mut stats = CrossValidateResultStats {
        binary: sets.iter().all(|set| set.test.binary),
        test_size,
        train_size: len - test_size,
        ..Default::default()
    };

    for set in &sets {
        averages.train_time += set.train_time;
        averages.test_time += set.test_time;
        averages.iterations += set.iterations;
        averages.error += set.error;
        stats.total += set.test.total;
        if stats.binary {
            stats.confusion.merge(&set.test.confusion);
        }
    }

    if k > 0 {
        let folds = u32::try_from(k).unwrap_or(u32::MAX);
        averages.train_time /= folds;
        averages.test_time /= folds;
        averages.iterations /= k;
        averages.error /= k as f64;
    }
    if stats.binary {
        stats.precision = stats.confusion.precision();
        stats.recall = stats.confusion.recall();
        stats.accuracy = stats.confusion.accuracy();
    }

    CrossValidateStats { averages, stats, sets }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::options::NetworkOptions;
    use approx::assert_abs_diff_eq;

    fn options() -> NetworkOptions {
        NetworkOptions::hidden(vec![3])
    }

    fn init(fold: usize) -> Network {
        Network::with_id(options(), fold).with_seed(fold as u64)
    }

    fn or_data() -> Vec<TrainingDatum> {
        (0..8)
            .map(|i| {
                let (a, b) = ((i & 1) as f64, ((i >> 1) & 1) as f64);
                TrainingDatum::new(vec![a, b], vec![if a + b > 0.0 { 1.0 } else { 0.0 }])
            })
            .collect()
    }

    fn partition(error: f64, seed: u64) -> PartitionResult {
        let mut network = Network::new(options().with_sizes(2, 1)).with_seed(seed);
        PartitionResult {
            train_time: Duration::from_millis(10),
            test_time: Duration::from_millis(2),
            iterations: 100,
            error,
            test: TestResult::default(),
            network: network.export().unwrap(),
        }
    }

    #[test]
    fn fewer_examples_than_folds_fails_cleanly() {
        let mut cv = CrossValidate::new(init);
        let data = &or_data()[..3];
        let result = cv.train(data, &TrainingOptions::default(), 4);
        assert!(matches!(result, Err(BrainError::InsufficientData { available: 3, required: 4 })));
        assert!(cv.stats().sets.is_empty());
        assert!(matches!(cv.to_network(), Err(BrainError::NoModelSelected)));
    }

    #[test]
    fn selects_lowest_training_error() {
        let mut cv = CrossValidate::new(init);
        cv.stats = aggregate(vec![partition(0.2, 1), partition(0.05, 2), partition(0.3, 3)], 1, 4);
        let expected = cv.stats.sets[1].network.clone();

        let mut network = cv.to_network().unwrap();
        assert_eq!(network.export().unwrap(), expected);
    }

    #[test]
    fn aggregates_fold_results() {
        let stats = aggregate(vec![partition(0.2, 1), partition(0.4, 2)], 3, 7);
        assert_abs_diff_eq!(stats.averages.error, 0.3, epsilon = 1e-12);
        assert_eq!(stats.averages.iterations, 100);
        assert_eq!(stats.averages.train_time, Duration::from_millis(10));
        assert_eq!((stats.stats.test_size, stats.stats.train_size), (3, 4));
        assert!(!stats.stats.binary);
    }

    #[test]
    fn trains_one_network_per_fold() {
        let training = TrainingOptions { iterations: 200, ..Default::default() };
        let mut cv = CrossValidate::new(init).with_seed(5);
        let stats = cv.train(&or_data(), &training, 2).unwrap().clone();

        assert_eq!(stats.sets.len(), 2);
        assert_eq!((stats.stats.test_size, stats.stats.train_size), (4, 4));
        assert!(stats.stats.binary);
        assert_eq!(stats.stats.total, 8);
        assert_eq!(stats.stats.confusion.total(), 8);
        assert!(stats.sets.iter().all(|set| set.iterations <= 200 && set.test.total == 4));
        assert!(stats.sets.iter().all(|set| set.network.sizes == vec![2, 3, 1]));

        let mut network = cv.to_network().unwrap();
        assert_eq!(network.run(&[1.0, 1.0]).unwrap().len(), 1);
    }

    #[test]
    fn every_fold_trains_on_the_whole_shuffled_set() {
        let training = TrainingOptions { iterations: 30, ..Default::default() };
        let mut cv = CrossValidate::new(init).with_seed(21);
        let stats = cv.train(&or_data(), &training, 4).unwrap().clone();

        let mut shuffled = or_data();
        shuffled.shuffle(&mut StdRng::seed_from_u64(21));

        for (fold, set) in stats.sets.iter().enumerate() {
            let mut full = init(fold);
            full.train(&shuffled, training.clone()).unwrap();
            assert_eq!(set.network.layers, full.export().unwrap().layers);

            let test_slice = &shuffled[fold * 2..(fold + 1) * 2];
            let held_out: Vec<TrainingDatum> = shuffled.iter()
                .filter(|datum| !test_slice.contains(datum))
                .cloned()
                .collect();
            let mut without_slice = init(fold);
            without_slice.train(&held_out, training.clone()).unwrap();
            assert_ne!(set.network.layers, without_slice.export().unwrap().layers);
        }
    }

    #[test]
    fn parallel_folds_match_sequential_folds() {
        let training = TrainingOptions { iterations: 50, ..Default::default() };
        let mut sequential = CrossValidate::new(init).with_seed(9);
        let mut parallel = CrossValidate::new(init).with_seed(9).parallel(true);

        let a = sequential.train(&or_data(), &training, 4).unwrap();
        let b = parallel.train(&or_data(), &training, 4).unwrap();

        let errors = |stats: &CrossValidateStats| stats.sets.iter().map(|s| s.error).collect::<Vec<_>>();
        let exports = |stats: &CrossValidateStats| stats.sets.iter().map(|s| s.network.clone()).collect::<Vec<_>>();
        assert_eq!(errors(a), errors(b));
        assert_eq!(exports(a), exports(b));
    }
}
