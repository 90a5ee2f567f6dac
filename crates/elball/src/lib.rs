//! Geometric embeddings for EL ontologies.
//!
//! An EL ontology (after normalization) is a set of subsumption axioms in
//! a handful of normal forms. This crate learns an *n*-ball per class and
//! a translation vector per relation ([Kulmanov et al. 2019](https://arxiv.org/abs/1902.10499)),
//! so that set-theoretic statements become geometric ones:
//!
//! | Axiom | Normal form | Geometric reading |
//! |-------|-------------|-------------------|
//! | C ⊑ D | NF1 | ball(C) inside ball(D) |
//! | C ⊓ D ⊑ E | NF2 | intersection of balls inside ball(E) |
//! | C ⊑ ∃R.D | NF3 | ball(C) translated by R inside ball(D) |
//! | ∃R.C ⊑ D | NF4 | ball(C) translated by −R meets ball(D) |
//! | C ⊓ D ⊑ ⊥ | Disjoint | balls separated |
//!
//! Each violated reading contributes a relu-gated hinge to the loss, plus
//! a regularizer pulling every center norm toward a target. Training is
//! plain SGD over uniformly resampled minibatches, with the top concept
//! `owl:Thing` pinned to an effectively unbounded ball before every step.
//!
//! Validation ranks protein-protein interaction triples by a bounded
//! ball-overlap score; the checkpoint policy persists embeddings only
//! when the validation mean rank improves, after an unconditional
//! epoch-0 baseline.
//!
//! ## Quick start
//!
//! ```no_run
//! use elball::{TrainConfig, Trainer};
//!
//! # fn main() -> elball::Result<()> {
//! let config = TrainConfig::default()
//!     .with_embedding_size(50)
//!     .with_margin(-0.1)
//!     .with_epochs(100);
//! let mut trainer = Trainer::from_config(config)?;
//! let report = trainer.run()?;
//! eprintln!("best mean rank: {}", report.best_rank);
//! # Ok(())
//! # }
//! ```

pub mod checkpoint;
pub mod config;
pub mod error;
pub mod evaluation;
pub mod model;
pub mod ontology;
pub mod sampler;
pub mod trainer;

pub use checkpoint::{CheckpointPolicy, Decision, EmbeddingRecord, EpochOutcome, Snapshot};
pub use config::{apply_params_index, decompose_params_index, SweepParams, TrainConfig};
pub use error::{Error, Result};
pub use evaluation::{
    evaluate_interactions, InteractionMetrics, ProteinSpace, RankingEvaluator,
};
pub use model::{ElModel, StepLoss};
pub use ontology::{
    load_interactions_file, parse_normalized_file, NormalForms, Ontology,
};
pub use sampler::{BatchSampler, Minibatch};
pub use trainer::{load_known_pairs, TrainReport, Trainer};
