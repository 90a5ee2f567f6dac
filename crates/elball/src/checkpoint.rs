//! Embedding snapshots and the persist-if-improved checkpoint policy.
//!
//! The training loop never lets observers touch the live tables: after each
//! epoch it captures a read-only [`Snapshot`] and hands it out inside an
//! [`EpochOutcome`] event. The [`CheckpointPolicy`] consumes those events
//! and persists the snapshot whenever the monitored validation metric
//! improves. An epoch-0 baseline of the initial embeddings is always
//! written, whether or not any epoch completes.
//!
//! Snapshot files are JSON arrays of `{id, embedding}` records, one file
//! for classes and one for relations, keyed by the original string
//! identifiers. They are the public artifact consumed by downstream
//! evaluation.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::ElModel;
use crate::ontology::Ontology;

/// Sentinel larger than any real rank; initial value of the monitor.
pub const RANK_SENTINEL: f64 = 100_000.0;

/// One identifier with its embedding vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    /// Original string identifier.
    pub id: String,
    /// Embedding values; classes carry the radius slot as the last value.
    pub embedding: Vec<f32>,
}

/// Complete copy of both embedding tables, in index order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Class records, position = class index.
    pub classes: Vec<EmbeddingRecord>,
    /// Relation records, position = relation index.
    pub relations: Vec<EmbeddingRecord>,
}

impl Snapshot {
    /// Copy the model's current tables, keyed by the ontology's
    /// identifiers.
    pub fn capture(model: &ElModel, ontology: &Ontology) -> Self {
        let classes = ontology
            .class_ids()
            .iter()
            .enumerate()
            .map(|(i, id)| EmbeddingRecord {
                id: id.clone(),
                embedding: model.cls_embeddings().row(i).to_vec(),
            })
            .collect();
        let relations = ontology
            .relation_ids()
            .iter()
            .enumerate()
            .map(|(i, id)| EmbeddingRecord {
                id: id.clone(),
                embedding: model.rel_embeddings().row(i).to_vec(),
            })
            .collect();
        Self { classes, relations }
    }

    /// Write the class and relation tables to their two files.
    pub fn write(&self, cls_path: &Path, rel_path: &Path) -> Result<()> {
        serde_json::to_writer(BufWriter::new(File::create(cls_path)?), &self.classes)?;
        serde_json::to_writer(BufWriter::new(File::create(rel_path)?), &self.relations)?;
        Ok(())
    }

    /// Load a persisted snapshot back from its two files.
    pub fn load(cls_path: &Path, rel_path: &Path) -> Result<Self> {
        let classes = serde_json::from_reader(BufReader::new(File::open(cls_path)?))?;
        let relations = serde_json::from_reader(BufReader::new(File::open(rel_path)?))?;
        Ok(Self { classes, relations })
    }

    /// Rebuild the identifier index maps from this snapshot.
    pub fn ontology(&self) -> Ontology {
        Ontology::from_id_lists(
            self.classes.iter().map(|r| r.id.clone()).collect(),
            self.relations.iter().map(|r| r.id.clone()).collect(),
        )
    }
}

/// Event emitted by the training loop after every completed epoch.
#[derive(Debug, Clone)]
pub struct EpochOutcome {
    /// Zero-based epoch index.
    pub epoch: usize,
    /// Mean total loss over the epoch's steps.
    pub loss: f32,
    /// Read-only copy of the tables after the epoch's last update.
    pub snapshot: Snapshot,
}

/// Generic lower-is-better monitor.
#[derive(Debug, Clone)]
pub struct MonitoredBest {
    best: f64,
}

impl MonitoredBest {
    /// Start at the given sentinel.
    pub fn new(sentinel: f64) -> Self {
        Self { best: sentinel }
    }

    /// Record `value`; returns true (and keeps it) iff it strictly
    /// improves on the best seen so far.
    pub fn improves(&mut self, value: f64) -> bool {
        if value < self.best {
            self.best = value;
            true
        } else {
            false
        }
    }

    /// Best value seen so far.
    pub fn best(&self) -> f64 {
        self.best
    }
}

/// Outcome of offering one epoch to the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Metric improved; snapshot persisted.
    Improved,
    /// No improvement; nothing written.
    NotImproved,
    /// No validation metric available; nothing written.
    Skipped,
}

/// Persists best-so-far embeddings keyed on the validation mean rank.
#[derive(Debug)]
pub struct CheckpointPolicy {
    cls_path: PathBuf,
    rel_path: PathBuf,
    monitor: MonitoredBest,
}

impl CheckpointPolicy {
    /// Policy writing to the given class/relation table paths.
    pub fn new(cls_path: PathBuf, rel_path: PathBuf) -> Self {
        Self {
            cls_path,
            rel_path,
            monitor: MonitoredBest::new(RANK_SENTINEL),
        }
    }

    /// Best mean rank seen so far (the sentinel until the first scoring).
    pub fn best_rank(&self) -> f64 {
        self.monitor.best()
    }

    /// Write the unconditional epoch-0 baseline of the initial embeddings
    /// to sibling `*_0` paths.
    pub fn write_baseline(&self, snapshot: &Snapshot) -> Result<()> {
        snapshot.write(
            &baseline_path(&self.cls_path),
            &baseline_path(&self.rel_path),
        )
    }

    /// Offer an epoch's outcome together with its validation mean rank.
    pub fn observe(&mut self, outcome: &EpochOutcome, mean_rank: Option<f64>) -> Result<Decision> {
        let Some(rank) = mean_rank else {
            return Ok(Decision::Skipped);
        };
        if self.monitor.improves(rank) {
            outcome.snapshot.write(&self.cls_path, &self.rel_path)?;
            Ok(Decision::Improved)
        } else {
            Ok(Decision::NotImproved)
        }
    }
}

/// `data/cls.json` -> `data/cls_0.json`.
fn baseline_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem}_0.{}", ext.to_string_lossy()),
        None => format!("{stem}_0"),
    };
    path.with_file_name(name)
}
