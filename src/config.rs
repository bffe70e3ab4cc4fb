//! Run settings, persisted as JSON.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, UnlearnError};
use crate::unlearn::UnlearningRequest;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingSettings {
    pub batch_size: usize,
    pub learning_rate: f64,
    pub epochs: usize,
    pub seed: u64,
    /// Mini-batches between voluntary thread yields.
    pub yield_every: usize,
}

impl Default for TrainingSettings {
    fn default() -> Self {
        TrainingSettings { batch_size: 256, learning_rate: 0.02, epochs: 30, seed: 1111, yield_every: 10 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualizationSettings {
    /// Training samples drawn for the embedding plot.
    pub sample_size: usize,
    pub batch_size: usize,
    pub random_state: u64,
    pub output_dir: PathBuf,
}

impl Default for VisualizationSettings {
    fn default() -> Self {
        VisualizationSettings {
            sample_size: 2000,
            batch_size: 64,
            random_state: 42,
            output_dir: PathBuf::from("viz"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    /// Unlearned models are written here and listed from here.
    pub model_dir: PathBuf,
    /// Root of the per-class JSON data store.
    pub data_dir: PathBuf,
    pub cifar_dir: PathBuf,
}

impl Default for PathSettings {
    fn default() -> Self {
        PathSettings {
            model_dir: PathBuf::from("unlearned_models"),
            data_dir: PathBuf::from("data"),
            cifar_dir: PathBuf::from("cifar-10-batches-bin"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub training: TrainingSettings,
    pub visualization: VisualizationSettings,
    pub paths: PathSettings,
    pub num_classes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            training: TrainingSettings::default(),
            visualization: VisualizationSettings::default(),
            paths: PathSettings::default(),
            num_classes: 10,
        }
    }
}

impl Settings {
    /// Reads settings from `path`, or writes the defaults there if the file
    /// does not exist yet. Missing keys take their default values.
    pub fn load_or_init(path: &Path) -> Result<Settings> {
        if path.exists() {
            let contents = std::fs::read_to_string(path).map_err(|e| UnlearnError::io(path, e))?;
            return serde_json::from_str(&contents).map_err(|e| UnlearnError::json(path, e));
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| UnlearnError::io(parent, e))?;
        }
        let settings = Settings::default();
        let serialized = serde_json::to_string_pretty(&settings).map_err(|e| UnlearnError::json(path, e))?;
        std::fs::write(path, serialized).map_err(|e| UnlearnError::io(path, e))?;
        Ok(settings)
    }

    /// A request for `forget_class` using the configured hyperparameters.
    pub fn request(&self, forget_class: usize) -> UnlearningRequest {
        UnlearningRequest {
            forget_class,
            epochs: self.training.epochs,
            batch_size: self.training.batch_size,
            learning_rate: self.training.learning_rate,
            seed: self.training.seed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_load_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf").join("settings.json");

        let settings = Settings::load_or_init(&path).unwrap();
        assert_eq!(settings, Settings::default());
        assert!(path.is_file());
        assert_eq!(Settings::load_or_init(&path).unwrap(), settings);
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"training": {"epochs": 2}, "num_classes": 3}"#).unwrap();

        let settings = Settings::load_or_init(&path).unwrap();
        assert_eq!(settings.training.epochs, 2);
        assert_eq!(settings.training.batch_size, 256);
        assert_eq!(settings.num_classes, 3);
        assert_eq!(settings.visualization.sample_size, 2000);
    }

    #[test]
    fn malformed_file_is_a_json_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{").unwrap();
        assert!(matches!(Settings::load_or_init(&path), Err(UnlearnError::Json { .. })));
    }

    #[test]
    fn request_uses_training_defaults() {
        let r = Settings::default().request(4);
        assert_eq!((r.forget_class, r.epochs, r.batch_size, r.seed), (4, 30, 256, 1111));
        assert_eq!(r.learning_rate, 0.02);
    }
}
