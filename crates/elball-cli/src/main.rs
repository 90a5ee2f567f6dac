//! elball CLI - train and evaluate EL ontology ball embeddings.
//!
//! # Usage
//!
//! ```bash
//! # Train on a normalized ontology, validating on interaction triples
//! elball train -d yeast-classes-normalized.owl -v 4932.protein.actions.v10.5.txt
//!
//! # One point of the sweep grid (margin x size x organism)
//! elball train --params-array-index 7
//!
//! # Rank test interactions against saved embeddings
//! elball evaluate -c cls.json -r rel.json -t test.txt -k train.txt -k valid.txt
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use elball::checkpoint::Snapshot;
use elball::config::{apply_params_index, TrainConfig};
use elball::evaluation::evaluate_interactions;
use elball::ontology;
use elball::trainer::{load_known_pairs, Trainer};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "elball")]
#[command(about = "EL ontology ball embeddings", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train ball embeddings on a normalized ontology
    Train {
        /// Normalized ontology file (one axiom per line)
        #[arg(long = "data-file", short = 'd', default_value = "data/data-train/yeast-classes-normalized.owl")]
        data_file: String,

        /// Validation interaction file (host1 host2 relation)
        #[arg(long = "valid-data-file", short = 'v', default_value = "data/data-valid/4932.protein.actions.v10.5.txt")]
        valid_data_file: String,

        /// Output file for class embeddings
        #[arg(long = "out-classes-file", default_value = "data/cls_embeddings.json")]
        out_classes_file: String,

        /// Output file for relation embeddings
        #[arg(long = "out-relations-file", default_value = "data/rel_embeddings.json")]
        out_relations_file: String,

        /// Per-epoch loss log (CSV, appended)
        #[arg(long = "loss-history-file", default_value = "data/loss_history.csv")]
        loss_history_file: String,

        /// Minibatch size per normal form
        #[arg(long, default_value = "256")]
        batch_size: usize,

        /// Training epochs
        #[arg(short, long, default_value = "1000")]
        epochs: usize,

        /// Compute device identifier (recorded; only CPU is implemented)
        #[arg(long, default_value = "gpu:0")]
        device: String,

        /// Ball center dimensionality
        #[arg(long, default_value = "100")]
        embedding_size: usize,

        /// Target center norm for regularization
        #[arg(long, default_value = "1.0")]
        reg_norm: f32,

        /// Loss margin (may be negative)
        #[arg(short, long, default_value = "0.01", allow_hyphen_values = true)]
        margin: f32,

        /// SGD learning rate
        #[arg(short, long, default_value = "0.01")]
        learning_rate: f32,

        /// Derive organism/size/margin and all paths from a sweep index
        #[arg(long, short = 'p')]
        params_array_index: Option<usize>,

        /// Random seed for initialization and sampling
        #[arg(long, default_value = "0")]
        seed: u64,
    },

    /// Rank test interactions against saved embeddings
    Evaluate {
        /// Class embeddings file
        #[arg(long = "classes-file", short = 'c')]
        classes_file: PathBuf,

        /// Relation embeddings file
        #[arg(long = "relations-file", short = 'r')]
        relations_file: PathBuf,

        /// Test interaction file (host1 host2 relation)
        #[arg(long = "test-file", short = 't')]
        test_file: PathBuf,

        /// Known interaction files to filter out (train/valid sets)
        #[arg(long = "known-file", short = 'k')]
        known_files: Vec<PathBuf>,

        /// Margin used during training
        #[arg(short, long, default_value = "0.01", allow_hyphen_values = true)]
        margin: f32,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Train {
            data_file,
            valid_data_file,
            out_classes_file,
            out_relations_file,
            loss_history_file,
            batch_size,
            epochs,
            device,
            embedding_size,
            reg_norm,
            margin,
            learning_rate,
            params_array_index,
            seed,
        } => {
            let mut config = TrainConfig {
                data_file,
                valid_data_file,
                out_classes_file,
                out_relations_file,
                loss_history_file,
                batch_size,
                epochs,
                device,
                embedding_size,
                reg_norm,
                margin,
                learning_rate,
                seed,
            };
            if let Some(index) = params_array_index {
                let params = apply_params_index(&mut config, index)?;
                eprintln!(
                    "Params: {} {} {} {}",
                    params.organism, params.embedding_size, params.margin, params.reg_norm
                );
            }
            cmd_train(config)
        }
        Commands::Evaluate {
            classes_file,
            relations_file,
            test_file,
            known_files,
            margin,
        } => cmd_evaluate(&classes_file, &relations_file, &test_file, &known_files, margin),
    }
}

fn cmd_train(config: TrainConfig) -> Result<()> {
    let start = Instant::now();
    let data_file = config.data_file.clone();
    let mut trainer = Trainer::from_config(config)
        .with_context(|| format!("Failed to set up training from {data_file}"))?;

    eprintln!(
        "{} steps/epoch, {} validation triples",
        trainer.steps_per_epoch(),
        trainer.num_valid_triples()
    );

    let pb = ProgressBar::new(trainer.epochs() as u64);
    pb.set_style(
        ProgressStyle::with_template("{bar:40} {pos}/{len} epochs {msg}")
            .context("bad progress template")?,
    );
    let report = trainer.run_with_callback(|_, loss, rank| {
        match rank {
            Some(r) => pb.set_message(format!("loss {loss:.4} rank {r:.1}")),
            None => pb.set_message(format!("loss {loss:.4}")),
        }
        pb.inc(1);
    })?;
    pb.finish_with_message(format!("done in {:.2?}", start.elapsed()));

    eprintln!(
        "{} epochs, best mean rank {}",
        report.epochs_run, report.best_rank
    );
    Ok(())
}

fn cmd_evaluate(
    classes_file: &Path,
    relations_file: &Path,
    test_file: &Path,
    known_files: &[PathBuf],
    margin: f32,
) -> Result<()> {
    let snapshot = Snapshot::load(classes_file, relations_file)
        .with_context(|| format!("Failed to load embeddings from {}", classes_file.display()))?;
    let ont = snapshot.ontology();

    let test = ontology::load_interactions_file(test_file, &ont)
        .with_context(|| format!("Failed to read {}", test_file.display()))?;
    let known = load_known_pairs(&ont, known_files).context("Failed to read known pairs")?;

    match evaluate_interactions(&snapshot, ont.protein_indices(), &test, &known, margin) {
        Some(metrics) => {
            println!("{}", metrics.summary());
            println!(
                "hits@1 {:.4}  hits@10 {:.4}  hits@100 {:.4}  mean rank {:.2}",
                metrics.hits1, metrics.hits10, metrics.hits100, metrics.mean_rank
            );
            println!(
                "filtered: hits@1 {:.4}  hits@10 {:.4}  hits@100 {:.4}  mean rank {:.2}",
                metrics.fhits1, metrics.fhits10, metrics.fhits100, metrics.fmean_rank
            );
        }
        None => println!("no scorable test triples"),
    }
    Ok(())
}
