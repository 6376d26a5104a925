//! Settings for a `pgd-sweep` run, read from a JSON file.
use crate::attack::{AttackParams, DEFAULT_ITERATIONS, DEFAULT_PIXEL_RANGE, DEFAULT_STEP_SIZE};
use crate::dataset::SampleOrder;
use crate::error::{PgdError, Result};
use crate::sweep::DEFAULT_SAMPLE_CAP;
use crate::PgdFloat;
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

pub const DEFAULT_EPSILONS: [PgdFloat; 7] = [0., 0.05, 0.1, 0.15, 0.2, 0.25, 0.3];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SweepConfig {
    /// Network weights in JSON
    pub model_path: PathBuf,
    /// IDX image file, `[n, rows, cols]` unsigned bytes
    pub images_path: PathBuf,
    /// IDX label file, `[n]` unsigned bytes
    pub labels_path: PathBuf,
    #[serde(default = "default_epsilons")]
    pub epsilons: Vec<PgdFloat>,
    #[serde(default = "default_step_size")]
    pub step_size: PgdFloat,
    #[serde(default = "default_iterations")]
    pub iterations: usize,
    #[serde(default = "default_pixel_range")]
    pub pixel_range: (PgdFloat, PgdFloat),
    #[serde(default)]
    pub early_stop: bool,
    /// Examples kept per epsilon
    #[serde(default = "default_samples_per_epsilon")]
    pub samples_per_epsilon: usize,
    /// Visit samples in a seeded random order instead of file order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shuffle_seed: Option<u64>,
    /// Only evaluate the first `n` samples
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_samples: Option<usize>,
    #[serde(default = "default_records_path")]
    pub records_path: PathBuf,
    /// Directory for the JSON summary and example images
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    /// log4rs YAML file; overrides `log_level`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_config: Option<PathBuf>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_epsilons() -> Vec<PgdFloat> {
    DEFAULT_EPSILONS.to_vec()
}

const fn default_step_size() -> PgdFloat {
    DEFAULT_STEP_SIZE
}

const fn default_iterations() -> usize {
    DEFAULT_ITERATIONS
}

const fn default_pixel_range() -> (PgdFloat, PgdFloat) {
    DEFAULT_PIXEL_RANGE
}

const fn default_samples_per_epsilon() -> usize {
    DEFAULT_SAMPLE_CAP
}

fn default_records_path() -> PathBuf {
    PathBuf::from("records.txt")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl SweepConfig {
    /// Config with every optional field at its default
    pub fn new<P: Into<PathBuf>>(model_path: P, images_path: P, labels_path: P) -> Self {
        Self {
            model_path: model_path.into(),
            images_path: images_path.into(),
            labels_path: labels_path.into(),
            epsilons: default_epsilons(),
            step_size: default_step_size(),
            iterations: default_iterations(),
            pixel_range: default_pixel_range(),
            early_stop: false,
            samples_per_epsilon: default_samples_per_epsilon(),
            shuffle_seed: None,
            max_samples: None,
            records_path: default_records_path(),
            output_dir: None,
            log_config: None,
            log_level: default_log_level(),
        }
    }

    /// Reads and validates a config file
    ///
    /// # Errors
    /// If the file is missing, is not valid JSON for this struct, or fails [`Self::validate`]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| PgdError::io(path, e))?;
        let config: Self =
            serde_json::from_reader(BufReader::new(file)).map_err(|e| PgdError::json(path, e))?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    /// If there are no epsilons, any epsilon is invalid, the attack settings
    /// are invalid, or the log level is unknown
    pub fn validate(&self) -> Result<()> {
        if self.epsilons.is_empty() {
            return Err(PgdError::invalid("epsilons", "[]", "must not be empty"));
        }
        for &eps in &self.epsilons {
            self.attack_params().with_epsilon(eps).validate()?;
        }
        self.level_filter()?;
        Ok(())
    }

    /// Attack settings shared by every epsilon; the epsilon itself is left at zero
    pub fn attack_params(&self) -> AttackParams {
        AttackParams {
            epsilon: 0.,
            step_size: self.step_size,
            iterations: self.iterations,
            pixel_range: self.pixel_range,
            early_stop: self.early_stop,
        }
    }

    pub fn sample_order(&self) -> SampleOrder {
        self.shuffle_seed
            .map_or(SampleOrder::Sequential, |seed| SampleOrder::Shuffled { seed })
    }

    /// # Errors
    /// If `log_level` is not a `log` level name
    pub fn level_filter(&self) -> Result<LevelFilter> {
        self.log_level
            .parse()
            .map_err(|_| PgdError::invalid("log_level", &self.log_level, "not a log level"))
    }

    pub fn summary_path(&self) -> Option<PathBuf> {
        self.output_dir.as_ref().map(|dir| dir.join("summary.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config: SweepConfig = serde_json::from_str(
            r#"{"model_path": "m.json", "images_path": "i", "labels_path": "l"}"#,
        )
        .unwrap();
        assert_eq!(config, SweepConfig::new("m.json", "i", "l"));
        assert_eq!(config.epsilons, DEFAULT_EPSILONS.to_vec());
        assert_eq!(config.iterations, 20);
        assert_eq!(config.samples_per_epsilon, 7);
        assert_eq!(config.records_path, PathBuf::from("records.txt"));
        assert_eq!(config.sample_order(), SampleOrder::Sequential);
        assert_eq!(config.level_filter().unwrap(), LevelFilter::Info);
        assert!(config.summary_path().is_none());
        config.validate().unwrap();
    }

    #[test]
    fn test_overrides() {
        let config: SweepConfig = serde_json::from_str(
            r#"{
                "model_path": "m.json", "images_path": "i", "labels_path": "l",
                "epsilons": [0.0, 0.3], "step_size": 0.01, "iterations": 40,
                "early_stop": true, "shuffle_seed": 3, "output_dir": "out",
                "log_level": "debug"
            }"#,
        )
        .unwrap();
        let params = config.attack_params();
        assert_eq!(params.step_size, 0.01);
        assert_eq!(params.iterations, 40);
        assert!(params.early_stop);
        assert_eq!(config.sample_order(), SampleOrder::Shuffled { seed: 3 });
        assert_eq!(config.summary_path(), Some(PathBuf::from("out/summary.json")));
        assert_eq!(config.level_filter().unwrap(), LevelFilter::Debug);
    }

    #[test]
    fn test_validation() {
        let mut config = SweepConfig::new("m", "i", "l");
        config.epsilons = vec![];
        assert!(config.validate().is_err());
        config.epsilons = vec![0., -0.1];
        assert!(config.validate().is_err());
        config.epsilons = vec![0.1];
        config.iterations = 0;
        assert!(config.validate().is_err());
        config.iterations = 5;
        config.log_level = "loud".to_string();
        assert!(matches!(
            config.validate(),
            Err(PgdError::InvalidParameter { name: "log_level", .. })
        ));
    }

    #[test]
    fn test_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"model_path": "m", "images_path": "i", "labels_path": "l", "step_size": 0}"#,
        )
        .unwrap();
        assert!(matches!(
            SweepConfig::load(&path),
            Err(PgdError::InvalidParameter { name: "step_size", .. })
        ));
        fs::write(&path, r#"{"model_path": "m", "typo": 1}"#).unwrap();
        assert!(matches!(SweepConfig::load(&path), Err(PgdError::Json { .. })));
        assert!(matches!(
            SweepConfig::load(dir.path().join("missing.json")),
            Err(PgdError::Io { .. })
        ));
    }
}
