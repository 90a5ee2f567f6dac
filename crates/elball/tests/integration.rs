//! End-to-end: parse axioms, train, checkpoint, evaluate.

use std::fs;
use std::path::PathBuf;

use elball::{
    parse_normalized_file, Error, Snapshot, TrainConfig, Trainer,
};

fn test_dir(name: &str) -> PathBuf {
    let dir = PathBuf::from("target/tmp/tests").join(name);
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

const AXIOMS: &str = "\
SubClassOf(A B)
SubClassOf(ObjectIntersectionOf(A B) C)
SubClassOf(A ObjectSomeValuesFrom(r B))
SubClassOf(ObjectSomeValuesFrom(r A) C)
SubClassOf(ObjectIntersectionOf(B C) owl:Nothing)
SubClassOf(B owl:Thing)
SubObjectPropertyOf(r s)
";

#[test]
fn test_parse_assigns_first_seen_indices() {
    let dir = test_dir("it_parse");
    let path = dir.join("axioms.owl");
    fs::write(&path, "SubClassOf(A B)\nSubClassOf(ObjectIntersectionOf(A B) C)\n").unwrap();

    let (ont, forms) = parse_normalized_file(&path).unwrap();
    assert_eq!(ont.class_index("A"), Some(0));
    assert_eq!(ont.class_index("B"), Some(1));
    assert_eq!(ont.class_index("C"), Some(2));
    assert_eq!(forms.nf1, vec![[0, 1]]);
    assert_eq!(forms.nf2, vec![[0, 1, 2]]);
}

#[test]
fn test_parse_covers_all_normal_forms() {
    let dir = test_dir("it_forms");
    let path = dir.join("axioms.owl");
    fs::write(&path, AXIOMS).unwrap();

    let (ont, forms) = parse_normalized_file(&path).unwrap();
    assert_eq!(forms.nf1.len(), 2); // A⊑B and B⊑owl:Thing
    assert_eq!(forms.nf2.len(), 1);
    assert_eq!(forms.nf3.len(), 1);
    assert_eq!(forms.nf4.len(), 1);
    assert_eq!(forms.disjoint.len(), 1);
    assert!(ont.top_index().is_some());
    // Property axioms are skipped, so s is never interned.
    assert!(ont.relation_index("s").is_none());
}

fn training_config(dir: &PathBuf) -> TrainConfig {
    let data = dir.join("axioms.owl");
    let valid = dir.join("valid.txt");
    fs::write(
        &data,
        "SubClassOf(<http://p1> <http://p2>)\n\
         SubClassOf(<http://p2> <http://p3>)\n\
         SubClassOf(<http://p1> ObjectSomeValuesFrom(<http://r> <http://p3>))\n\
         SubClassOf(ObjectIntersectionOf(<http://p1> <http://p2>) <http://p3>)\n",
    )
    .unwrap();
    fs::write(&valid, "p1 p3 r\n").unwrap();

    let mut cfg = TrainConfig::default()
        .with_embedding_size(8)
        .with_batch_size(2)
        .with_epochs(5)
        .with_seed(11);
    cfg.data_file = data.to_string_lossy().into_owned();
    cfg.valid_data_file = valid.to_string_lossy().into_owned();
    cfg.out_classes_file = dir.join("cls.json").to_string_lossy().into_owned();
    cfg.out_relations_file = dir.join("rel.json").to_string_lossy().into_owned();
    cfg.loss_history_file = dir.join("loss.csv").to_string_lossy().into_owned();
    cfg
}

#[test]
fn test_training_produces_loadable_snapshot() {
    let dir = test_dir("it_train");
    let mut trainer = Trainer::from_config(training_config(&dir)).unwrap();
    let report = trainer.run_with_callback(|_, _, _| {}).unwrap();
    assert_eq!(report.epochs_run, 5);
    assert!(report.best_rank < 100_000.0);

    let snap = Snapshot::load(&dir.join("cls.json"), &dir.join("rel.json")).unwrap();
    let ont = snap.ontology();
    assert_eq!(snap.classes.len(), ont.num_classes());
    assert_eq!(snap.relations.len(), 1);
    // Centers of 8 dims plus the radius slot.
    assert!(snap.classes.iter().all(|c| c.embedding.len() == 9));
}

#[test]
fn test_divergence_halts_and_keeps_baseline() {
    let dir = test_dir("it_diverge");
    let cfg = training_config(&dir).with_learning_rate(1.0e35);
    let mut trainer = Trainer::from_config(cfg).unwrap();
    let err = trainer.run_with_callback(|_, _, _| {}).unwrap_err();
    assert!(matches!(err, Error::Diverged { .. }));
    // The epoch-0 baseline was written before any step ran.
    assert!(dir.join("cls_0.json").exists());
    assert!(dir.join("rel_0.json").exists());
}

#[test]
fn test_loss_decreases_over_training() {
    let dir = test_dir("it_loss_trend");
    let mut cfg = training_config(&dir);
    cfg.epochs = 50;
    cfg.learning_rate = 0.05;
    let mut trainer = Trainer::from_config(cfg).unwrap();
    let report = trainer.run_with_callback(|_, _, _| {}).unwrap();
    let first = report.loss_history[0];
    let last = *report.loss_history.last().unwrap();
    assert!(
        last < first,
        "loss should drop over training: first {first}, last {last}"
    );
}
