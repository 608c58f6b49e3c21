use std::path::Path;

use log::debug;
use serde::{Serialize, Deserialize};

use crate::{
    error::{BrainError, Result},
    math::matrix::Matrix,
    network::{network::Network, options::{validate_sizes, NetworkOptions}},
    train::train_config::TrainingOptions,
};

/// Parameters of one non-input layer: a weight row per node and a bias per node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerExport {
    pub weights: Vec<Vec<f64>>,
    pub biases: Vec<f64>,
}

/// Portable snapshot of a trained network.
///
/// `layers[i]` belongs to layer `i + 1`; the input layer has no parameters
/// and is not listed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkExport {
    pub sizes: Vec<usize>,
    pub layers: Vec<LayerExport>,
    pub options: NetworkOptions,
    #[serde(rename = "trainOptions")]
    pub train_options: TrainingOptions,
}

impl NetworkExport {
    /// Checks that every layer matches `sizes`.
    pub fn validate(&self) -> Result<()> {
        validate_sizes(&self.sizes)?;
        if self.layers.len() != self.sizes.len() - 1 {
            return Err(BrainError::ShapeMismatch {
                what: "exported layer count",
                expected: self.sizes.len() - 1,
                actual: self.layers.len(),
            });
        }
        for (l, layer) in self.layers.iter().enumerate() {
            let (input_size, size) = (self.sizes[l], self.sizes[l + 1]);
            if layer.weights.len() != size {
                return Err(BrainError::ShapeMismatch { what: "exported weight rows", expected: size, actual: layer.weights.len() });
            }
            if layer.biases.len() != size {
                return Err(BrainError::ShapeMismatch { what: "exported biases", expected: size, actual: layer.biases.len() });
            }
            if let Some(row) = layer.weights.iter().find(|row| row.len() != input_size) {
                return Err(BrainError::ShapeMismatch { what: "exported weight row", expected: input_size, actual: row.len() });
            }
        }
        Ok(())
    }

    /// Serializes the export to a pretty-printed JSON file.
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Deserializes an export from a JSON file previously written by `save_json`.
    pub fn load_json(path: impl AsRef<Path>) -> Result<NetworkExport> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}

impl Network {
    /// Snapshot of the current parameters, topology and training options.
    /// Initializes the network first if it was never trained or imported.
    pub fn export(&mut self) -> Result<NetworkExport> {
        if !self.is_initialized() {
            self.initialize()?;
        }
        Ok(NetworkExport {
            sizes: self.sizes.clone(),
            layers: self.layers.iter()
                .map(|layer| LayerExport {
                    weights: layer.weights.data.clone(),
                    biases: layer.biases.clone(),
                })
                .collect(),
            options: self.options.clone(),
            train_options: self.train_options.without_hooks(),
        })
    }

    /// Replaces topology, parameters and training options with the ones in
    /// `export`. Optimizer state starts over. The network is left untouched
    /// when the export is malformed.
    pub fn import(&mut self, export: &NetworkExport) -> Result<()> {
        export.validate()?;
        self.options = export.options.clone();
        self.train_options = export.train_options.clone();
        self.sizes = export.sizes.clone();
        self.allocate();
        for (layer, imported) in self.layers.iter_mut().zip(&export.layers) {
            layer.weights = Matrix::from_data(imported.weights.clone());
            layer.biases = imported.biases.clone();
        }
        debug!("imported network {:?} with sizes {:?}", self.id, self.sizes);
        Ok(())
    }

    pub fn from_export(export: &NetworkExport) -> Result<Network> {
        let mut network = Network::default();
        network.import(export)?;
        Ok(network)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::optim::praxis::Praxis;
    use crate::train::state::TrainingDatum;

    fn trained() -> Network {
        let data = vec![
            TrainingDatum::new(vec![0.0, 0.0], vec![0.0]),
            TrainingDatum::new(vec![1.0, 1.0], vec![1.0]),
        ];
        let mut network = Network::new(NetworkOptions::hidden(vec![3])).with_seed(11);
        network.train(&data, TrainingOptions { iterations: 20, ..Default::default() }).unwrap();
        network
    }

    #[test]
    fn export_lists_non_input_layers() {
        let export = trained().export().unwrap();
        assert_eq!(export.sizes, vec![2, 3, 1]);
        assert_eq!(export.layers.len(), 2);
        assert_eq!(export.layers[0].weights.len(), 3);
        assert_eq!(export.layers[0].weights[0].len(), 2);
        assert_eq!(export.layers[1].biases.len(), 1);
        export.validate().unwrap();
    }

    #[test]
    fn export_forces_initialization() {
        let mut network = Network::new(NetworkOptions::default().with_sizes(3, 2));
        let export = network.export().unwrap();
        assert!(network.is_initialized());
        assert_eq!(export.sizes, vec![3, 2]);

        assert!(Network::default().export().is_err());
    }

    #[test]
    fn import_replaces_parameters_verbatim() {
        let mut original = trained();
        let export = original.export().unwrap();
        let mut imported = Network::from_export(&export).unwrap();

        assert_eq!(imported.export().unwrap(), export);
        assert_eq!(imported.run(&[1.0, 0.0]).unwrap(), original.run(&[1.0, 0.0]).unwrap());
        assert_eq!(imported.adam_step, 0);
    }

    #[test]
    fn import_resets_optimizer_state() {
        let data = vec![
            TrainingDatum::new(vec![0.0, 1.0], vec![1.0]),
            TrainingDatum::new(vec![1.0, 0.0], vec![0.0]),
        ];
        let mut network = Network::new(NetworkOptions::hidden(vec![3])).with_seed(12);
        let adam = TrainingOptions { praxis: Praxis::Adam, iterations: 20, ..Default::default() };
        network.train(&data, adam).unwrap();
        assert!(network.adam_step > 0);
        assert!(network.layers().iter().all(|layer| layer.moments.is_some()));

        let export = trained().export().unwrap();
        network.import(&export).unwrap();

        assert_eq!(network.adam_step, 0);
        for layer in network.layers() {
            assert!(layer.moments.is_none());
            assert!(layer.changes.data.iter().flatten().all(|&change| change == 0.0));
        }
        assert_eq!(network.export().unwrap(), export);
    }

    #[test]
    fn sub_millisecond_timeout_round_trips_through_json() {
        let mut network = trained();
        network.train_options.timeout = Some(Duration::from_micros(1500));
        let export = network.export().unwrap();

        let back: NetworkExport = serde_json::from_str(&serde_json::to_string(&export).unwrap()).unwrap();
        assert_eq!(back, export);
        assert_eq!(back.train_options.timeout, Some(Duration::from_micros(1500)));
        back.train_options.validate().unwrap();
    }

    #[test]
    fn malformed_export_is_rejected_without_side_effects() {
        let mut export = trained().export().unwrap();
        export.layers[1].weights[0].push(0.5);

        let mut network = Network::new(NetworkOptions::default().with_sizes(4, 4));
        assert!(matches!(
            network.import(&export),
            Err(BrainError::ShapeMismatch { what: "exported weight row", expected: 3, actual: 4 })
        ));
        assert!(!network.is_initialized());
        assert_eq!(network.options().input_size, Some(4));
    }

    #[test]
    fn json_keeps_full_precision() {
        let export = trained().export().unwrap();
        let json = serde_json::to_string(&export).unwrap();
        assert!(json.contains("\"trainOptions\""));
        let back: NetworkExport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, export);
    }
}
