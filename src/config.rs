//! JSON runtime configuration for the command-line tool.
use crate::driver::PatchMatchParams;
use crate::error::PatchMatchError;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Output locations; everything is optional.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct OutputConfig {
    /// Where to write the computed field (centers image).
    pub nnf_out: Option<PathBuf>,
    /// Where to write the JSON run report.
    pub report_out: Option<PathBuf>,
    /// Directory receiving per-pass snapshots.
    pub snapshot_dir: Option<PathBuf>,
}

/// A full run description as loaded from a JSON file.
#[derive(Clone, Debug, Deserialize)]
pub struct RuntimeConfig {
    pub image: PathBuf,
    pub source_mask: PathBuf,
    pub target_mask: PathBuf,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub params: PatchMatchParams,
}

pub fn load_config(path: &Path) -> Result<RuntimeConfig, PatchMatchError> {
    let contents = fs::read_to_string(path)
        .map_err(|e| PatchMatchError::io(path, format!("failed to read config: {e}")))?;
    let config: RuntimeConfig = serde_json::from_str(&contents)
        .map_err(|e| PatchMatchError::io(path, format!("failed to parse config: {e}")))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{DistanceKind, InitStrategy};

    #[test]
    fn minimal_config_falls_back_to_default_params() {
        let json = r#"{
            "image": "in.png",
            "source_mask": "src.png",
            "target_mask": "tgt.png"
        }"#;
        let config: RuntimeConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.params.patch_radius, 3);
        assert_eq!(config.params.init_strategy, InitStrategy::Random);
        assert!(config.output.nnf_out.is_none());
    }

    #[test]
    fn params_deserialize_from_snake_case_enums() {
        let json = r#"{
            "image": "in.png",
            "source_mask": "src.png",
            "target_mask": "tgt.png",
            "params": {
                "patch_radius": 4,
                "iterations": 8,
                "init_strategy": "boundary",
                "propagation_strategy": "inward",
                "random": true,
                "distance": "pca",
                "acceptance": "composite",
                "k": 3,
                "seed_known_region": false,
                "parallel_propagation": true,
                "pca": { "components": 16, "max_training_samples": 500 },
                "composite": { "histogram_bins": 10, "histogram_threshold": 0.4 }
            }
        }"#;
        let config: RuntimeConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.params.distance, DistanceKind::Pca);
        assert_eq!(config.params.k, 3);
        assert_eq!(config.params.pca.components, 16);
    }
}
