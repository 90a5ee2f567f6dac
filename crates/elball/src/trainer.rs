//! The epoch loop: sampling, gradient steps, validation, checkpointing.

use std::fs::{File, OpenOptions};
use std::io::{BufReader, Write};
use std::path::PathBuf;

use crate::checkpoint::{CheckpointPolicy, Decision, EpochOutcome, Snapshot};
use crate::config::TrainConfig;
use crate::error::{Error, Result};
use crate::evaluation::RankingEvaluator;
use crate::model::ElModel;
use crate::ontology::{self, Ontology};
use crate::sampler::BatchSampler;

/// Summary handed back after a training run.
#[derive(Debug, Clone)]
pub struct TrainReport {
    /// Mean batch loss per completed epoch.
    pub loss_history: Vec<f32>,
    /// Best validation mean rank observed (the sentinel if never scored).
    pub best_rank: f64,
    /// Epochs completed before stopping.
    pub epochs_run: usize,
}

/// Owns the model and everything around it for one training run.
pub struct Trainer {
    config: TrainConfig,
    ontology: Ontology,
    model: ElModel,
    sampler: BatchSampler,
    evaluator: RankingEvaluator,
    policy: CheckpointPolicy,
}

impl Trainer {
    /// Load data files and assemble a trainer from a validated config.
    pub fn from_config(config: TrainConfig) -> Result<Self> {
        config.validate()?;

        let (ontology, forms) = ontology::parse_normalized_file(&config.data_file)?;
        if forms.max_len() == 0 {
            return Err(Error::EmptyOntology);
        }

        let valid = ontology::load_interactions_file(&config.valid_data_file, &ontology)?;
        let evaluator =
            RankingEvaluator::new(ontology.protein_indices(), valid, config.margin);

        let model = ElModel::new(
            ontology.num_classes(),
            ontology.num_relations(),
            config.embedding_size,
            config.margin,
            config.reg_norm,
            ontology.top_index(),
            config.seed,
        );
        let sampler = BatchSampler::new(forms, config.batch_size, config.seed);
        let policy = CheckpointPolicy::new(
            PathBuf::from(&config.out_classes_file),
            PathBuf::from(&config.out_relations_file),
        );
        Ok(Self {
            config,
            ontology,
            model,
            sampler,
            evaluator,
            policy,
        })
    }

    /// Gradient steps per epoch.
    pub fn steps_per_epoch(&self) -> usize {
        self.sampler.steps()
    }

    /// Configured epoch count.
    pub fn epochs(&self) -> usize {
        self.config.epochs
    }

    /// Number of validation triples in play.
    pub fn num_valid_triples(&self) -> usize {
        self.evaluator.num_triples()
    }

    /// Run the full training loop, logging progress to stderr.
    pub fn run(&mut self) -> Result<TrainReport> {
        self.run_with_callback(|epoch, loss, rank| {
            match rank {
                Some(r) => eprintln!("epoch {epoch}: loss {loss:.6}, mean rank {r:.1}"),
                None => eprintln!("epoch {epoch}: loss {loss:.6}"),
            }
        })
    }

    /// Run the training loop, invoking `on_epoch(epoch, loss, mean_rank)`
    /// after each epoch's validation.
    ///
    /// The epoch-0 baseline snapshot is written before any step. A
    /// non-finite epoch loss stops training with [`Error::Diverged`]; the
    /// best snapshot already on disk is left untouched.
    pub fn run_with_callback<F>(&mut self, mut on_epoch: F) -> Result<TrainReport>
    where
        F: FnMut(usize, f32, Option<f64>),
    {
        self.policy
            .write_baseline(&Snapshot::capture(&self.model, &self.ontology))?;

        let mut loss_log = self.open_loss_log()?;
        let mut loss_history = Vec::with_capacity(self.config.epochs);
        let lr = self.config.learning_rate;

        for epoch in 0..self.config.epochs {
            self.sampler.reset();
            let mut epoch_loss = 0.0f32;
            let mut steps = 0usize;
            while let Some(batch) = self.sampler.next_batch() {
                epoch_loss += self.model.train_step(&batch, lr).total();
                steps += 1;
            }
            let loss = epoch_loss / steps.max(1) as f32;
            if !loss.is_finite() {
                return Err(Error::Diverged { epoch, loss });
            }
            writeln!(loss_log, "{epoch},{loss}")?;
            loss_history.push(loss);

            let outcome = EpochOutcome {
                epoch,
                loss,
                snapshot: Snapshot::capture(&self.model, &self.ontology),
            };
            let rank = self.evaluator.mean_rank(&outcome.snapshot);
            let decision = self.policy.observe(&outcome, rank)?;
            if decision == Decision::Improved {
                eprintln!("epoch {epoch}: new best mean rank {:.1}", self.policy.best_rank());
            }
            on_epoch(epoch, loss, rank);
        }

        Ok(TrainReport {
            epochs_run: loss_history.len(),
            best_rank: self.policy.best_rank(),
            loss_history,
        })
    }

    fn open_loss_log(&self) -> Result<std::io::BufWriter<File>> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.config.loss_history_file)?;
        Ok(std::io::BufWriter::new(file))
    }
}

/// Load the test-set triples and every known train/valid pair needed for
/// filtered metrics, mapped into the snapshot's index space.
pub fn load_known_pairs(
    ontology: &Ontology,
    files: &[PathBuf],
) -> Result<std::collections::HashSet<(usize, usize, usize)>> {
    let prot_pos: std::collections::HashMap<usize, usize> = ontology
        .protein_indices()
        .into_iter()
        .enumerate()
        .map(|(pos, i)| (i, pos))
        .collect();
    let mut known = std::collections::HashSet::new();
    for path in files {
        let triples = ontology::load_interactions(BufReader::new(File::open(path)?), ontology)?;
        for [c, r, d] in triples {
            if let (Some(&cp), Some(&dp)) = (prot_pos.get(&c), prot_pos.get(&d)) {
                known.insert((r, cp, dp));
            }
        }
    }
    Ok(known)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    fn tmp_dir(name: &str) -> PathBuf {
        let dir = PathBuf::from("target/tmp/tests").join(name);
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_axioms(dir: &Path) -> PathBuf {
        let path = dir.join("axioms.owl");
        fs::write(
            &path,
            "SubClassOf(<http://a> <http://b>)\n\
             SubClassOf(<http://b> <http://c>)\n\
             SubClassOf(ObjectIntersectionOf(<http://a> <http://b>) <http://c>)\n\
             SubClassOf(<http://a> ObjectSomeValuesFrom(<http://r> <http://b>))\n\
             SubClassOf(ObjectSomeValuesFrom(<http://r> <http://a>) <http://c>)\n",
        )
        .unwrap();
        path
    }

    fn config_in(dir: &Path) -> TrainConfig {
        let valid = dir.join("valid.txt");
        fs::write(&valid, "a b r\n").unwrap();
        let mut cfg = TrainConfig::default()
            .with_embedding_size(4)
            .with_batch_size(2)
            .with_epochs(3)
            .with_learning_rate(0.01)
            .with_seed(7);
        cfg.data_file = write_axioms(dir).to_string_lossy().into_owned();
        cfg.valid_data_file = valid.to_string_lossy().into_owned();
        cfg.out_classes_file = dir.join("cls.json").to_string_lossy().into_owned();
        cfg.out_relations_file = dir.join("rel.json").to_string_lossy().into_owned();
        cfg.loss_history_file = dir.join("loss.csv").to_string_lossy().into_owned();
        cfg
    }

    #[test]
    fn test_baseline_snapshot_always_written() {
        let dir = tmp_dir("trainer_baseline");
        let mut trainer = Trainer::from_config(config_in(&dir)).unwrap();
        trainer.run_with_callback(|_, _, _| {}).unwrap();
        assert!(dir.join("cls_0.json").exists());
        assert!(dir.join("rel_0.json").exists());
    }

    #[test]
    fn test_loss_history_one_line_per_epoch() {
        let dir = tmp_dir("trainer_loss_log");
        let mut trainer = Trainer::from_config(config_in(&dir)).unwrap();
        let report = trainer.run_with_callback(|_, _, _| {}).unwrap();
        assert_eq!(report.epochs_run, 3);
        assert_eq!(report.loss_history.len(), 3);
        let log = fs::read_to_string(dir.join("loss.csv")).unwrap();
        assert_eq!(log.lines().count(), 3);
        assert!(log.lines().next().unwrap().starts_with("0,"));
    }

    #[test]
    fn test_finite_losses_throughout() {
        let dir = tmp_dir("trainer_finite");
        let mut trainer = Trainer::from_config(config_in(&dir)).unwrap();
        let report = trainer.run_with_callback(|_, _, _| {}).unwrap();
        assert!(report.loss_history.iter().all(|l| l.is_finite()));
    }

    #[test]
    fn test_persists_on_improvement() {
        let dir = tmp_dir("trainer_persist");
        // The valid file endpoints are classes in the axiom file, so the
        // evaluator scores every epoch and the first one always improves
        // on the sentinel.
        let mut trainer = Trainer::from_config(config_in(&dir)).unwrap();
        assert_eq!(trainer.num_valid_triples(), 1);
        trainer.run_with_callback(|_, _, _| {}).unwrap();
        assert!(dir.join("cls.json").exists());
        assert!(dir.join("rel.json").exists());
    }

    #[test]
    fn test_empty_axiom_file_rejected() {
        let dir = tmp_dir("trainer_empty");
        let cfg = config_in(&dir);
        fs::write(&cfg.data_file, "").unwrap();
        assert!(matches!(
            Trainer::from_config(cfg),
            Err(Error::EmptyOntology)
        ));
    }
}
