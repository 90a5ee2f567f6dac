//! Rank-based evaluation of ball embeddings on interaction triples.
//!
//! For a triple (c, r, d) the query point is c's center translated by r's
//! vector. Every candidate protein is scored by a bounded similarity in
//! (0, 1] combining two signals:
//!
//! - **overlap**: a normalized estimate of how much of c's ball (after
//!   translation) overlaps the candidate's ball;
//! - **separation**: `exp(−edst)` where `edst` is the excess distance
//!   beyond the balls touching.
//!
//! The true target's rank among all candidates uses average tie handling
//! (tied scores share the mean of their positions), and the mean rank over
//! the validation set is the monitored checkpoint metric. Lower is better.
//!
//! Test-set evaluation additionally reports hits@1/10/100 and the
//! *filtered* variants where candidate pairs already known from the
//! train/valid sets are zeroed out before ranking.

use std::collections::{HashMap, HashSet};

use crate::checkpoint::Snapshot;

/// Scoring over the protein subset of a snapshot's class table.
///
/// Rows are pre-split into centers and absolute radii once, so per-triple
/// scoring only walks the candidate list.
pub struct ProteinSpace {
    /// Class index of each protein, in candidate order.
    prot_index: Vec<usize>,
    /// Class index -> candidate position.
    prot_pos: HashMap<usize, usize>,
    /// Candidate centers, one per protein.
    centers: Vec<Vec<f32>>,
    /// Candidate absolute radii.
    radii: Vec<f32>,
    /// Relation translation vectors, by relation index.
    relations: Vec<Vec<f32>>,
    margin: f32,
}

impl ProteinSpace {
    /// Build the candidate space from a snapshot and the protein class
    /// indices.
    pub fn new(snapshot: &Snapshot, prot_index: Vec<usize>, margin: f32) -> Self {
        let mut centers = Vec::with_capacity(prot_index.len());
        let mut radii = Vec::with_capacity(prot_index.len());
        for &i in &prot_index {
            let emb = &snapshot.classes[i].embedding;
            let (center, radius) = split_ball(emb);
            centers.push(center.to_vec());
            radii.push(radius);
        }
        let prot_pos = prot_index
            .iter()
            .enumerate()
            .map(|(pos, &i)| (i, pos))
            .collect();
        let relations = snapshot
            .relations
            .iter()
            .map(|r| r.embedding.clone())
            .collect();
        Self {
            prot_index,
            prot_pos,
            centers,
            radii,
            relations,
            margin,
        }
    }

    /// Number of candidate proteins.
    pub fn len(&self) -> usize {
        self.prot_index.len()
    }

    /// True when no proteins exist.
    pub fn is_empty(&self) -> bool {
        self.prot_index.is_empty()
    }

    /// Candidate position of a class index, if it is a protein.
    pub fn position(&self, class_index: usize) -> Option<usize> {
        self.prot_pos.get(&class_index).copied()
    }

    /// Score every candidate against the translated query ball of the
    /// protein at candidate position `c_pos` under relation `r`.
    pub fn score_all(&self, c_pos: usize, r: usize) -> Vec<f64> {
        let rel = &self.relations[r];
        let rc = self.radii[c_pos];
        let query: Vec<f32> = self.centers[c_pos]
            .iter()
            .zip(rel)
            .map(|(c, t)| c + t)
            .collect();

        self.centers
            .iter()
            .zip(&self.radii)
            .map(|(center, &rp)| {
                let dst = dist(&query, center);
                overlap_score(dst, rc, rp, self.margin)
            })
            .collect()
    }
}

/// Bounded similarity between a query ball (radius `rc`, center at
/// distance `dst`) and a candidate ball of radius `rp`. In (0, 1].
pub fn overlap_score(dst: f32, rc: f32, rp: f32, margin: f32) -> f64 {
    let overlap = if rc > 0.0 {
        let blocked = (dst + rc - rp - margin).max(0.0);
        ((2.0 * rc - blocked) / (2.0 * rc)).max(0.0)
    } else {
        // Degenerate point query: inside the candidate's ball or not.
        if (dst - rp - margin).max(0.0) == 0.0 {
            1.0
        } else {
            0.0
        }
    };
    let edst = (dst - rc - rp - margin).max(0.0);
    (f64::from(overlap) + f64::from(-edst).exp()) / 2.0
}

/// Average rank of `target` when `scores` are ranked descending.
///
/// Competition tie handling: tied scores receive the mean of their rank
/// positions, so rank = #strictly-greater + (#tied + 1) / 2, the tie count
/// including the target itself.
pub fn average_rank(scores: &[f64], target: usize) -> f64 {
    let t = scores[target];
    let mut greater = 0usize;
    let mut tied = 0usize;
    for &s in scores {
        if s > t {
            greater += 1;
        } else if s == t {
            tied += 1;
        }
    }
    greater as f64 + (tied as f64 + 1.0) / 2.0
}

/// Validation-set evaluator producing the monitored mean rank.
pub struct RankingEvaluator {
    prot_index: Vec<usize>,
    valid: Vec<[usize; 3]>,
    margin: f32,
}

impl RankingEvaluator {
    /// Evaluator over the given protein class indices and validation
    /// triples `[c, r, d]`.
    pub fn new(prot_index: Vec<usize>, valid: Vec<[usize; 3]>, margin: f32) -> Self {
        Self {
            prot_index,
            valid,
            margin,
        }
    }

    /// Number of validation triples.
    pub fn num_triples(&self) -> usize {
        self.valid.len()
    }

    /// Mean rank of the true target over all validation triples, or
    /// `None` when the validation set is empty (scoring is a no-op then).
    pub fn mean_rank(&self, snapshot: &Snapshot) -> Option<f64> {
        if self.valid.is_empty() {
            return None;
        }
        let space = ProteinSpace::new(snapshot, self.prot_index.clone(), self.margin);
        let mut sum = 0.0;
        let mut n = 0usize;
        for &[c, r, d] in &self.valid {
            let (Some(cp), Some(dp)) = (space.position(c), space.position(d)) else {
                continue;
            };
            let scores = space.score_all(cp, r);
            sum += average_rank(&scores, dp);
            n += 1;
        }
        (n > 0).then(|| sum / n as f64)
    }
}

/// Test-set ranking metrics, raw and filtered.
#[derive(Debug, Clone, Default)]
pub struct InteractionMetrics {
    /// P(rank = 1).
    pub hits1: f64,
    /// P(rank <= 10).
    pub hits10: f64,
    /// P(rank <= 100).
    pub hits100: f64,
    /// Mean rank of the true target.
    pub mean_rank: f64,
    /// Filtered P(rank = 1): known train/valid pairs zeroed out.
    pub fhits1: f64,
    /// Filtered P(rank <= 10).
    pub fhits10: f64,
    /// Filtered P(rank <= 100).
    pub fhits100: f64,
    /// Filtered mean rank.
    pub fmean_rank: f64,
    /// Number of test triples evaluated.
    pub num_triples: usize,
}

impl InteractionMetrics {
    /// One-line summary for the CLI.
    pub fn summary(&self) -> String {
        format!(
            "raw: H@10 {:.2} H@100 {:.2} MR {:.2} | filtered: H@10 {:.2} H@100 {:.2} MR {:.2} (n={})",
            self.hits10,
            self.hits100,
            self.mean_rank,
            self.fhits10,
            self.fhits100,
            self.fmean_rank,
            self.num_triples
        )
    }
}

/// Evaluate test triples against a snapshot.
///
/// `known` holds (relation, query position, candidate position) pairs from
/// the train and validation sets; the filtered metrics zero their scores
/// before ranking so correct predictions of already-known interactions are
/// not penalized.
pub fn evaluate_interactions(
    snapshot: &Snapshot,
    prot_index: Vec<usize>,
    test: &[[usize; 3]],
    known: &HashSet<(usize, usize, usize)>,
    margin: f32,
) -> Option<InteractionMetrics> {
    if test.is_empty() {
        return None;
    }
    let space = ProteinSpace::new(snapshot, prot_index, margin);
    let mut m = InteractionMetrics::default();
    for &[c, r, d] in test {
        let (Some(cp), Some(dp)) = (space.position(c), space.position(d)) else {
            continue;
        };
        let scores = space.score_all(cp, r);

        let rank = average_rank(&scores, dp);
        if rank <= 1.0 {
            m.hits1 += 1.0;
        }
        if rank <= 10.0 {
            m.hits10 += 1.0;
        }
        if rank <= 100.0 {
            m.hits100 += 1.0;
        }
        m.mean_rank += rank;

        let filtered: Vec<f64> = scores
            .iter()
            .enumerate()
            .map(|(pos, &s)| {
                if pos != dp && known.contains(&(r, cp, pos)) {
                    0.0
                } else {
                    s
                }
            })
            .collect();
        let frank = average_rank(&filtered, dp);
        if frank <= 1.0 {
            m.fhits1 += 1.0;
        }
        if frank <= 10.0 {
            m.fhits10 += 1.0;
        }
        if frank <= 100.0 {
            m.fhits100 += 1.0;
        }
        m.fmean_rank += frank;
        m.num_triples += 1;
    }
    if m.num_triples == 0 {
        return None;
    }
    let n = m.num_triples as f64;
    m.hits1 /= n;
    m.hits10 /= n;
    m.hits100 /= n;
    m.mean_rank /= n;
    m.fhits1 /= n;
    m.fhits10 /= n;
    m.fhits100 /= n;
    m.fmean_rank /= n;
    Some(m)
}

/// True iff ball (ec, rc) lies entirely inside ball (ed, rd).
pub fn is_inside(ec: &[f32], rc: f32, ed: &[f32], rd: f32) -> bool {
    dist(ec, ed) + rc <= rd
}

/// True iff the two balls share at least one point.
pub fn is_intersect(ec: &[f32], rc: f32, ed: &[f32], rd: f32) -> bool {
    dist(ec, ed) <= rc + rd
}

/// Split a class record into its center and absolute radius.
pub fn split_ball(embedding: &[f32]) -> (&[f32], f32) {
    let e = embedding.len() - 1;
    (&embedding[..e], embedding[e].abs())
}

fn dist(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}
