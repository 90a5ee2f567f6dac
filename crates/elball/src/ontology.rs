//! Parser for normalized EL ontology axioms.
//!
//! Input is the output of an EL normalizer: one axiom per line, wrapped as
//! `SubClassOf(...)`. Four normal forms cover every subsumption the
//! normalizer emits, plus disjointness:
//!
//! | Form | Shape | Stored as |
//! |------|-------|-----------|
//! | NF1 | `C ⊑ D` | `[c, d]` |
//! | NF2 | `C ⊓ D ⊑ E` | `[c, d, e]` |
//! | NF3 | `C ⊑ ∃R.D` | `[c, r, d]` |
//! | NF4 | `∃R.C ⊑ D` | `[r, c, d]` |
//! | Disjoint | `C ⊓ D ⊑ ⊥` | `[c, d, ⊥]` |
//!
//! An NF2 axiom whose superclass is `owl:Nothing` is a disjointness
//! statement and is stored separately; only the first two indices of that
//! tuple are meaningful.
//!
//! Parsing is deliberately lenient: blank, malformed, or
//! `SubObjectPropertyOf` lines are skipped without error. Class and
//! relation identifiers are interned into two separate index spaces in
//! first-seen order.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_xorshift::XorShiftRng;

use crate::error::Result;

/// Identifier token for the top concept.
pub const TOP: &str = "owl:Thing";
/// Identifier token for the bottom concept.
pub const BOTTOM: &str = "owl:Nothing";
/// Ontology-namespace prefix; classes with this prefix are GO terms,
/// everything else is treated as a protein.
pub const GO_PREFIX: &str = "<http://purl.obolibrary.org/obo/GO_";

/// Seed for the one-time post-parse shuffle of each axiom array.
/// Fixed so experiment batch order is reproducible.
const SHUFFLE_SEED: u64 = 100;

/// Class and relation index maps built during parsing.
///
/// Indices are assigned sequentially in first-seen order and are immutable
/// once assigned. Classes and relations live in separate index spaces.
#[derive(Debug, Clone, Default)]
pub struct Ontology {
    classes: HashMap<String, usize>,
    relations: HashMap<String, usize>,
    class_ids: Vec<String>,
    relation_ids: Vec<String>,
}

impl Ontology {
    /// Number of classes.
    pub fn num_classes(&self) -> usize {
        self.class_ids.len()
    }

    /// Number of relations.
    pub fn num_relations(&self) -> usize {
        self.relation_ids.len()
    }

    /// Index of a class identifier, if known.
    pub fn class_index(&self, id: &str) -> Option<usize> {
        self.classes.get(id).copied()
    }

    /// Index of a relation identifier, if known.
    pub fn relation_index(&self, id: &str) -> Option<usize> {
        self.relations.get(id).copied()
    }

    /// Class identifiers in index order.
    pub fn class_ids(&self) -> &[String] {
        &self.class_ids
    }

    /// Relation identifiers in index order.
    pub fn relation_ids(&self) -> &[String] {
        &self.relation_ids
    }

    /// Index of the top concept, if it occurred in any axiom.
    pub fn top_index(&self) -> Option<usize> {
        self.class_index(TOP)
    }

    /// Indices of protein classes: every class whose identifier does not
    /// carry the GO namespace prefix.
    pub fn protein_indices(&self) -> Vec<usize> {
        self.class_ids
            .iter()
            .enumerate()
            .filter(|(_, id)| !id.starts_with(GO_PREFIX))
            .map(|(i, _)| i)
            .collect()
    }

    fn intern_class(&mut self, id: &str) -> usize {
        if let Some(&i) = self.classes.get(id) {
            i
        } else {
            let i = self.class_ids.len();
            self.classes.insert(id.to_string(), i);
            self.class_ids.push(id.to_string());
            i
        }
    }

    fn intern_relation(&mut self, id: &str) -> usize {
        if let Some(&i) = self.relations.get(id) {
            i
        } else {
            let i = self.relation_ids.len();
            self.relations.insert(id.to_string(), i);
            self.relation_ids.push(id.to_string());
            i
        }
    }

    /// Rebuild an ontology from identifier lists in index order.
    ///
    /// Used when loading persisted embedding snapshots for evaluation.
    pub fn from_id_lists(class_ids: Vec<String>, relation_ids: Vec<String>) -> Self {
        let classes = class_ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();
        let relations = relation_ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();
        Self {
            classes,
            relations,
            class_ids,
            relation_ids,
        }
    }
}

/// Indexed axiom tuples grouped by normal form.
#[derive(Debug, Clone, Default)]
pub struct NormalForms {
    /// `C ⊑ D` pairs.
    pub nf1: Vec<[usize; 2]>,
    /// `C ⊓ D ⊑ E` triples.
    pub nf2: Vec<[usize; 3]>,
    /// `C ⊑ ∃R.D` triples (class, relation, class).
    pub nf3: Vec<[usize; 3]>,
    /// `∃R.C ⊑ D` triples (relation, class, class).
    pub nf4: Vec<[usize; 3]>,
    /// `C ⊓ D ⊑ ⊥` triples; the last slot is the bottom concept's index.
    pub disjoint: Vec<[usize; 3]>,
}

impl NormalForms {
    /// Length of the largest axiom array; determines steps per epoch.
    pub fn max_len(&self) -> usize {
        self.nf1
            .len()
            .max(self.nf2.len())
            .max(self.nf3.len())
            .max(self.nf4.len())
            .max(self.disjoint.len())
    }

    /// Total number of stored axioms across all forms.
    pub fn total(&self) -> usize {
        self.nf1.len() + self.nf2.len() + self.nf3.len() + self.nf4.len() + self.disjoint.len()
    }

    /// Shuffle every axiom array in place with the fixed seed.
    ///
    /// Batch order reproducibility only; correctness does not depend on it.
    fn shuffle(&mut self) {
        self.nf1.shuffle(&mut XorShiftRng::seed_from_u64(SHUFFLE_SEED));
        self.nf2.shuffle(&mut XorShiftRng::seed_from_u64(SHUFFLE_SEED));
        self.nf3.shuffle(&mut XorShiftRng::seed_from_u64(SHUFFLE_SEED));
        self.nf4.shuffle(&mut XorShiftRng::seed_from_u64(SHUFFLE_SEED));
        self.disjoint
            .shuffle(&mut XorShiftRng::seed_from_u64(SHUFFLE_SEED));
    }
}

/// Parse normalized axioms from a reader.
///
/// Returns the interned identifier maps and the per-normal-form index
/// arrays, each shuffled once with a fixed seed.
pub fn parse_normalized<R: BufRead>(reader: R) -> Result<(Ontology, NormalForms)> {
    let mut ontology = Ontology::default();
    let mut forms = NormalForms::default();

    for line in reader.lines() {
        let line = line?;
        parse_line(line.trim(), &mut ontology, &mut forms);
    }

    forms.shuffle();
    Ok((ontology, forms))
}

/// Parse normalized axioms from a file path.
pub fn parse_normalized_file(path: impl AsRef<Path>) -> Result<(Ontology, NormalForms)> {
    parse_normalized(BufReader::new(File::open(path)?))
}

/// Classify and store one trimmed line. Anything that does not match a
/// known shape is skipped.
fn parse_line(line: &str, ontology: &mut Ontology, forms: &mut NormalForms) {
    if line.is_empty() || line.starts_with("SubObjectPropertyOf") {
        return;
    }
    // Strip the `SubClassOf(` wrapper and the closing paren.
    let Some(clause) = line
        .strip_prefix("SubClassOf(")
        .and_then(|s| s.strip_suffix(')'))
    else {
        return;
    };
    if clause.is_empty() {
        return;
    }

    let tokens: Vec<&str> = clause.split(' ').collect();

    if clause.starts_with("ObjectIntersectionOf(") {
        // ObjectIntersectionOf(C D) E
        let &[a, b, e] = tokens.as_slice() else { return };
        let Some(c) = a.get("ObjectIntersectionOf(".len()..) else {
            return;
        };
        let Some(d) = b.strip_suffix(')') else { return };
        let ci = ontology.intern_class(c);
        let di = ontology.intern_class(d);
        let ei = ontology.intern_class(e);
        if e == BOTTOM {
            forms.disjoint.push([ci, di, ei]);
        } else {
            forms.nf2.push([ci, di, ei]);
        }
    } else if clause.starts_with("ObjectSomeValuesFrom(") {
        // ObjectSomeValuesFrom(R C) D
        let &[a, b, d] = tokens.as_slice() else { return };
        let Some(r) = a.get("ObjectSomeValuesFrom(".len()..) else {
            return;
        };
        let Some(c) = b.strip_suffix(')') else { return };
        let ri = ontology.intern_relation(r);
        let ci = ontology.intern_class(c);
        let di = ontology.intern_class(d);
        forms.nf4.push([ri, ci, di]);
    } else if clause.contains("ObjectSomeValuesFrom") {
        // C ObjectSomeValuesFrom(R D)
        let &[c, b, t] = tokens.as_slice() else { return };
        let Some(r) = b.get("ObjectSomeValuesFrom(".len()..) else {
            return;
        };
        let Some(d) = t.strip_suffix(')') else { return };
        let ci = ontology.intern_class(c);
        let ri = ontology.intern_relation(r);
        let di = ontology.intern_class(d);
        forms.nf3.push([ci, ri, di]);
    } else {
        // C D
        let &[c, d] = tokens.as_slice() else { return };
        let ci = ontology.intern_class(c);
        let di = ontology.intern_class(d);
        forms.nf1.push([ci, di]);
    }
}

/// Load interaction triples for validation or testing.
///
/// Each non-blank line is `host1 host2 relation`; every token is wrapped
/// into a synthetic URI `<http://TOKEN>` before lookup. Triples whose
/// endpoints or relation are absent from the trained index are silently
/// dropped.
pub fn load_interactions<R: BufRead>(reader: R, ontology: &Ontology) -> Result<Vec<[usize; 3]>> {
    let mut data = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let mut it = line.split_whitespace();
        let (Some(a), Some(b), Some(rel)) = (it.next(), it.next(), it.next()) else {
            continue;
        };
        let id1 = format!("<http://{a}>");
        let id2 = format!("<http://{b}>");
        let idr = format!("<http://{rel}>");
        let (Some(c), Some(d), Some(r)) = (
            ontology.class_index(&id1),
            ontology.class_index(&id2),
            ontology.relation_index(&idr),
        ) else {
            continue;
        };
        data.push([c, r, d]);
    }
    Ok(data)
}

/// Load interaction triples from a file path.
pub fn load_interactions_file(
    path: impl AsRef<Path>,
    ontology: &Ontology,
) -> Result<Vec<[usize; 3]>> {
    load_interactions(BufReader::new(File::open(path)?), ontology)
}
