//! Training configuration and the sweep-index parameter derivation.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// All options recognized by the training entry point.
///
/// `device` names the compute context the embedding tables live on. Only
/// the CPU path is implemented; the field is accepted for compatibility
/// with existing sweep scripts and recorded as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub data_file: String,
    pub valid_data_file: String,
    pub out_classes_file: String,
    pub out_relations_file: String,
    pub loss_history_file: String,
    pub batch_size: usize,
    pub epochs: usize,
    pub device: String,
    pub embedding_size: usize,
    pub reg_norm: f32,
    pub margin: f32,
    pub learning_rate: f32,
    pub seed: u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_file: "data/data-train/yeast-classes-normalized.owl".into(),
            valid_data_file: "data/data-valid/4932.protein.actions.v10.5.txt".into(),
            out_classes_file: "data/cls_embeddings.json".into(),
            out_relations_file: "data/rel_embeddings.json".into(),
            loss_history_file: "data/loss_history.csv".into(),
            batch_size: 256,
            epochs: 1000,
            device: "gpu:0".into(),
            embedding_size: 100,
            reg_norm: 1.0,
            margin: 0.01,
            learning_rate: 0.01,
            seed: 0,
        }
    }
}

impl TrainConfig {
    pub fn with_embedding_size(mut self, embedding_size: usize) -> Self {
        self.embedding_size = embedding_size;
        self
    }

    pub fn with_margin(mut self, margin: f32) -> Self {
        self.margin = margin;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f32) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Bounds-check every numeric option before training starts.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::InvalidConfig("batch_size must be positive".into()));
        }
        if self.embedding_size == 0 {
            return Err(Error::InvalidConfig(
                "embedding_size must be positive".into(),
            ));
        }
        if !(self.learning_rate > 0.0) {
            return Err(Error::InvalidConfig(
                "learning_rate must be positive and finite".into(),
            ));
        }
        if !self.margin.is_finite() {
            return Err(Error::InvalidConfig("margin must be finite".into()));
        }
        if !(self.reg_norm >= 0.0) {
            return Err(Error::InvalidConfig(
                "reg_norm must be non-negative".into(),
            ));
        }
        Ok(())
    }
}

/// Fixed option lists for sweep-style batch submission.
pub const SWEEP_ORGS: [&str; 2] = ["human", "yeast"];
pub const SWEEP_SIZES: [usize; 4] = [50, 100, 200, 400];
pub const SWEEP_MARGINS: [f32; 5] = [-0.1, -0.01, 0.0, 0.01, 0.1];

/// NCBI taxon ids matching [`SWEEP_ORGS`], used in interaction file names.
const SWEEP_TAXA: [&str; 2] = ["9606", "4932"];

/// One point of the sweep grid.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepParams {
    pub organism: &'static str,
    pub embedding_size: usize,
    pub margin: f32,
    pub reg_norm: f32,
}

/// Mixed-radix decomposition of a sweep index into grid coordinates.
///
/// Margin varies fastest, then embedding size, then organism; reg_norm is
/// fixed at 1. The order must stay stable so that sweep indices keep
/// mapping to the same runs.
pub fn decompose_params_index(index: usize) -> Result<SweepParams> {
    let total = SWEEP_ORGS.len() * SWEEP_SIZES.len() * SWEEP_MARGINS.len();
    if index >= total {
        return Err(Error::InvalidConfig(format!(
            "params index {index} out of range (grid has {total} points)"
        )));
    }
    let margin = SWEEP_MARGINS[index % SWEEP_MARGINS.len()];
    let index = index / SWEEP_MARGINS.len();
    let embedding_size = SWEEP_SIZES[index % SWEEP_SIZES.len()];
    let index = index / SWEEP_SIZES.len();
    let organism = SWEEP_ORGS[index % SWEEP_ORGS.len()];
    Ok(SweepParams {
        organism,
        embedding_size,
        margin,
        reg_norm: 1.0,
    })
}

/// Rewrite a config in place for the grid point named by `index`: hyper
/// parameters plus the organism-specific data/output paths, tagged so
/// concurrent sweep jobs never collide.
pub fn apply_params_index(config: &mut TrainConfig, index: usize) -> Result<SweepParams> {
    let params = decompose_params_index(index)?;
    config.margin = params.margin;
    config.embedding_size = params.embedding_size;
    config.reg_norm = params.reg_norm;

    let org = params.organism;
    let taxon = SWEEP_TAXA[SWEEP_ORGS.iter().position(|&o| o == org).unwrap_or(0)];
    config.data_file = format!("data/data-train/{org}-classes-normalized.owl");
    config.valid_data_file = format!("data/data-valid/{taxon}.protein.actions.v10.5.txt");

    let tag = format!(
        "{org}_{index}_{}_{}_{}",
        params.embedding_size, params.margin, params.reg_norm
    );
    config.out_classes_file = format!("data/{tag}_cls.json");
    config.out_relations_file = format!("data/{tag}_rel.json");
    config.loss_history_file = format!("data/{tag}_loss.csv");
    Ok(params)
}
