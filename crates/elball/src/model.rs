//! Ball-embedding model for EL normal forms.
//!
//! Every class is a ball in R^E: a center plus a radius stored as one extra
//! trailing coordinate. Every relation is a translation vector in R^E.
//! Axiom semantics map onto ball geometry
//! ([Kulmanov et al. 2019](https://arxiv.org/abs/1902.10499)):
//!
//! | Form | Geometry | Violation |
//! |------|----------|-----------|
//! | NF1 `C ⊑ D` | ball(C) inside ball(D) | `relu(‖c−d‖ + rc − rd)` |
//! | NF2 `C⊓D ⊑ E` | C,D intersect; intersection inside E | four relu terms |
//! | NF3 `C ⊑ ∃R.D` | translated C inside D | NF1 on `c + r` |
//! | NF4 `∃R.C ⊑ D` | translated C intersects D | `relu(‖c−r−d‖ − rc − rd − γ)` |
//! | Disjoint | balls separated | `relu(rc + rd − ‖c−d‖ + γ)` |
//!
//! Each term also pulls the participating centers' norms toward a shared
//! target (`reg_norm`). The radius slot is stored signed and read through
//! `abs` everywhere, so the optimizer may drive the raw value negative
//! without changing any semantics.
//!
//! Gradients are derived by hand (relu gate, unit direction vector for the
//! norms, sign for the radius slots) and applied by plain SGD, one update
//! per step over the batch-mean loss.

use std::collections::HashMap;

use ndarray::Array2;
use rand::Rng;
use rand::SeedableRng;
use rand_xorshift::XorShiftRng;

use crate::sampler::Minibatch;

/// Radius assigned to the pinned top concept; effectively infinite.
pub const TOP_RADIUS: f32 = 1_000_000.0;

/// Per-batch loss values, one per normal form, plus their sum.
#[derive(Debug, Clone, Copy, Default)]
pub struct StepLoss {
    /// NF1 batch mean.
    pub nf1: f32,
    /// NF2 batch mean.
    pub nf2: f32,
    /// NF3 batch mean.
    pub nf3: f32,
    /// NF4 batch mean.
    pub nf4: f32,
    /// Disjointness batch mean.
    pub disjoint: f32,
}

impl StepLoss {
    /// Sum of the five per-normal-form means (unweighted).
    pub fn total(&self) -> f32 {
        self.nf1 + self.nf2 + self.nf3 + self.nf4 + self.disjoint
    }
}

/// Sparse per-row gradient accumulator for one training step.
#[derive(Debug, Default)]
struct Grads {
    cls: HashMap<usize, Vec<f32>>,
    rel: HashMap<usize, Vec<f32>>,
}

impl Grads {
    fn cls_row(&mut self, i: usize, width: usize) -> &mut Vec<f32> {
        self.cls.entry(i).or_insert_with(|| vec![0.0; width])
    }

    fn rel_row(&mut self, i: usize, width: usize) -> &mut Vec<f32> {
        self.rel.entry(i).or_insert_with(|| vec![0.0; width])
    }
}

/// Geometric embedding model: class balls and relation translations.
#[derive(Debug, Clone)]
pub struct ElModel {
    /// Class table, `num_classes x (dim + 1)`; last column is the signed
    /// radius slot.
    cls: Array2<f32>,
    /// Relation table, `num_relations x dim`.
    rel: Array2<f32>,
    dim: usize,
    margin: f32,
    reg_norm: f32,
    /// Index of the top concept, pinned to an unbounded ball each step.
    top: Option<usize>,
}

impl ElModel {
    /// Create a model with small uniform random embeddings.
    pub fn new(
        num_classes: usize,
        num_relations: usize,
        dim: usize,
        margin: f32,
        reg_norm: f32,
        top: Option<usize>,
        seed: u64,
    ) -> Self {
        let mut rng = XorShiftRng::seed_from_u64(seed);
        let mut cls = Array2::zeros((num_classes, dim + 1));
        for v in cls.iter_mut() {
            *v = rng.gen_range(-0.05..0.05);
        }
        let mut rel = Array2::zeros((num_relations, dim));
        for v in rel.iter_mut() {
            *v = rng.gen_range(-0.05..0.05);
        }
        let mut model = Self {
            cls,
            rel,
            dim,
            margin,
            reg_norm,
            top,
        };
        model.pin_top();
        model
    }

    /// Embedding dimension E (radius slot excluded).
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Loss margin.
    pub fn margin(&self) -> f32 {
        self.margin
    }

    /// Class embedding table.
    pub fn cls_embeddings(&self) -> &Array2<f32> {
        &self.cls
    }

    /// Relation embedding table.
    pub fn rel_embeddings(&self) -> &Array2<f32> {
        &self.rel
    }

    /// Overwrite the top concept's row with the frozen unbounded ball:
    /// center at the origin, radius slot [`TOP_RADIUS`].
    ///
    /// Called before the forward pass of every step so the loss already
    /// sees the pinned value.
    pub fn pin_top(&mut self) {
        if let Some(t) = self.top {
            for j in 0..self.dim {
                self.cls[[t, j]] = 0.0;
            }
            self.cls[[t, self.dim]] = TOP_RADIUS;
        }
    }

    /// One training step: pin the top concept, evaluate the batch loss,
    /// and apply one SGD update over the batch-mean gradients.
    pub fn train_step(&mut self, batch: &Minibatch, learning_rate: f32) -> StepLoss {
        self.pin_top();
        let (loss, grads) = self.forward_backward(batch);
        for (i, g) in grads.cls {
            for (j, gj) in g.iter().enumerate() {
                self.cls[[i, j]] -= learning_rate * gj;
            }
        }
        for (i, g) in grads.rel {
            for (j, gj) in g.iter().enumerate() {
                self.rel[[i, j]] -= learning_rate * gj;
            }
        }
        loss
    }

    /// Forward pass only; used for inspection and tests.
    pub fn batch_loss(&self, batch: &Minibatch) -> StepLoss {
        self.forward_backward(batch).0
    }

    fn forward_backward(&self, batch: &Minibatch) -> (StepLoss, Grads) {
        let mut grads = Grads::default();
        let loss = StepLoss {
            nf1: self.nf1_batch(&batch.nf1, &mut grads),
            nf2: self.nf2_batch(&batch.nf2, &mut grads),
            nf3: self.nf3_batch(&batch.nf3, &mut grads),
            nf4: self.nf4_batch(&batch.nf4, &mut grads),
            disjoint: self.dis_batch(&batch.disjoint, &mut grads),
        };
        (loss, grads)
    }

    fn cls_row(&self, i: usize) -> Vec<f32> {
        self.cls.row(i).to_vec()
    }

    fn rel_row(&self, i: usize) -> Vec<f32> {
        self.rel.row(i).to_vec()
    }

    // ------------------------------------------------------------------
    // NF1: C ⊑ D — ball containment.
    // ------------------------------------------------------------------

    fn nf1_batch(&self, batch: &[[usize; 2]], grads: &mut Grads) -> f32 {
        if batch.is_empty() {
            return 0.0;
        }
        let scale = 1.0 / batch.len() as f32;
        let mut sum = 0.0;
        for &[c, d] in batch {
            let ec = self.cls_row(c);
            let ed = self.cls_row(d);
            let mut gc = vec![0.0; self.dim + 1];
            let mut gd = vec![0.0; self.dim + 1];
            sum += self.containment(&ec, &ed, &mut gc, &mut gd);
            axpy(scale, &gc, grads.cls_row(c, self.dim + 1));
            axpy(scale, &gd, grads.cls_row(d, self.dim + 1));
        }
        sum * scale
    }

    /// Containment-violation primitive shared by NF1 and NF3:
    /// `relu(‖c−d‖ + rc − rd) + reg(c) + reg(d)`.
    ///
    /// `ec`/`ed` are full rows (center + radius slot); gradients land in
    /// the matching slots of `gc`/`gd`.
    fn containment(&self, ec: &[f32], ed: &[f32], gc: &mut [f32], gd: &mut [f32]) -> f32 {
        let e = self.dim;
        let rc = ec[e].abs();
        let rd = ed[e].abs();
        let euc = dist(&ec[..e], &ed[..e]);
        let viol = euc + rc - rd;
        let mut loss = relu(viol);
        if viol > 0.0 {
            if euc > 0.0 {
                for j in 0..e {
                    let u = (ec[j] - ed[j]) / euc;
                    gc[j] += u;
                    gd[j] -= u;
                }
            }
            gc[e] += sgn(ec[e]);
            gd[e] -= sgn(ed[e]);
        }
        loss += self.reg(&ec[..e], &mut gc[..e]);
        loss += self.reg(&ed[..e], &mut gd[..e]);
        loss
    }

    /// Center-norm regularization `|‖x‖ − reg_norm|` and its gradient.
    fn reg(&self, x: &[f32], gx: &mut [f32]) -> f32 {
        let n = norm(x);
        let dev = n - self.reg_norm;
        if n > 0.0 {
            let s = sgn(dev) / n;
            for j in 0..x.len() {
                gx[j] += s * x[j];
            }
        }
        dev.abs()
    }

    // ------------------------------------------------------------------
    // NF2: C ⊓ D ⊑ E — intersection must exist and lie inside E.
    // ------------------------------------------------------------------

    fn nf2_batch(&self, batch: &[[usize; 3]], grads: &mut Grads) -> f32 {
        if batch.is_empty() {
            return 0.0;
        }
        let e = self.dim;
        let scale = 1.0 / batch.len() as f32;
        let mut sum = 0.0;
        for &[ci, di, ei] in batch {
            let c = self.cls_row(ci);
            let d = self.cls_row(di);
            let f = self.cls_row(ei);
            let rc = c[e].abs();
            let rd = d[e].abs();
            // NOTE: re reads d's radius slot, not e's, matching the
            // published ELEmbeddings formulation; the rdst term is
            // consequently always zero. Kept for result compatibility,
            // see DESIGN.md.
            let re = d[e].abs();
            let sr = rc + rd;

            let mut gc = vec![0.0; e + 1];
            let mut gd = vec![0.0; e + 1];
            let mut gf = vec![0.0; e + 1];

            let dst = dist(&d[..e], &c[..e]);
            let dst2 = dist(&f[..e], &c[..e]);
            let dst3 = dist(&f[..e], &d[..e]);
            let rdst = relu(rc.min(rd) - re);

            // (a) the two balls must intersect
            if dst - sr > 0.0 && dst > 0.0 {
                for j in 0..e {
                    let u = (d[j] - c[j]) / dst;
                    gd[j] += u;
                    gc[j] -= u;
                }
                gc[e] -= sgn(c[e]);
                gd[e] -= sgn(d[e]);
            }
            // (b) E's center within C's radius
            if dst2 - rc > 0.0 && dst2 > 0.0 {
                for j in 0..e {
                    let u = (f[j] - c[j]) / dst2;
                    gf[j] += u;
                    gc[j] -= u;
                }
                gc[e] -= sgn(c[e]);
            }
            // (c) E's center within D's radius
            if dst3 - rd > 0.0 && dst3 > 0.0 {
                for j in 0..e {
                    let u = (f[j] - d[j]) / dst3;
                    gf[j] += u;
                    gd[j] -= u;
                }
                gd[e] -= sgn(d[e]);
            }

            let mut loss =
                relu(dst - sr) + relu(dst2 - rc) + relu(dst3 - rd) + rdst - self.margin;
            loss += self.reg(&c[..e], &mut gc[..e]);
            loss += self.reg(&d[..e], &mut gd[..e]);
            loss += self.reg(&f[..e], &mut gf[..e]);
            sum += loss;

            axpy(scale, &gc, grads.cls_row(ci, e + 1));
            axpy(scale, &gd, grads.cls_row(di, e + 1));
            axpy(scale, &gf, grads.cls_row(ei, e + 1));
        }
        sum * scale
    }

    // ------------------------------------------------------------------
    // NF3: C ⊑ ∃R.D — translate C, then containment.
    // ------------------------------------------------------------------

    fn nf3_batch(&self, batch: &[[usize; 3]], grads: &mut Grads) -> f32 {
        if batch.is_empty() {
            return 0.0;
        }
        let e = self.dim;
        let scale = 1.0 / batch.len() as f32;
        let mut sum = 0.0;
        for &[ci, ri, di] in batch {
            let mut c = self.cls_row(ci);
            let r = self.rel_row(ri);
            let d = self.cls_row(di);
            // Translate the center; the radius slot is unaffected.
            for j in 0..e {
                c[j] += r[j];
            }

            let mut gc = vec![0.0; e + 1];
            let mut gd = vec![0.0; e + 1];
            sum += self.containment(&c, &d, &mut gc, &mut gd);

            // The translated center is cc + r, so its center gradient
            // flows to the relation vector unchanged.
            axpy(scale, &gc[..e], grads.rel_row(ri, e));
            axpy(scale, &gc, grads.cls_row(ci, e + 1));
            axpy(scale, &gd, grads.cls_row(di, e + 1));
        }
        sum * scale
    }

    // ------------------------------------------------------------------
    // NF4: ∃R.C ⊑ D — back-translate C, require intersection with D.
    // ------------------------------------------------------------------

    fn nf4_batch(&self, batch: &[[usize; 3]], grads: &mut Grads) -> f32 {
        if batch.is_empty() {
            return 0.0;
        }
        let e = self.dim;
        let scale = 1.0 / batch.len() as f32;
        let mut sum = 0.0;
        for &[ri, ci, di] in batch {
            let mut c = self.cls_row(ci);
            let r = self.rel_row(ri);
            let d = self.cls_row(di);
            for j in 0..e {
                c[j] -= r[j];
            }
            let rc = c[e].abs();
            let rd = d[e].abs();

            let mut gc = vec![0.0; e + 1];
            let mut gd = vec![0.0; e + 1];

            let dst = dist(&d[..e], &c[..e]);
            let viol = dst - (rc + rd) - self.margin;
            let mut loss = relu(viol);
            if viol > 0.0 {
                if dst > 0.0 {
                    for j in 0..e {
                        let u = (c[j] - d[j]) / dst;
                        gc[j] += u;
                        gd[j] -= u;
                    }
                }
                gc[e] -= sgn(c[e]);
                gd[e] -= sgn(d[e]);
            }
            loss += self.reg(&c[..e], &mut gc[..e]);
            loss += self.reg(&d[..e], &mut gd[..e]);
            sum += loss;

            // gc is the gradient wrt the translated center cc − r.
            axpy(-scale, &gc[..e], grads.rel_row(ri, e));
            axpy(scale, &gc, grads.cls_row(ci, e + 1));
            axpy(scale, &gd, grads.cls_row(di, e + 1));
        }
        sum * scale
    }

    // ------------------------------------------------------------------
    // Disjointness: C ⊓ D ⊑ ⊥ — balls must not intersect.
    // ------------------------------------------------------------------

    fn dis_batch(&self, batch: &[[usize; 3]], grads: &mut Grads) -> f32 {
        if batch.is_empty() {
            return 0.0;
        }
        let e = self.dim;
        let scale = 1.0 / batch.len() as f32;
        let mut sum = 0.0;
        for &[ci, di, _] in batch {
            let c = self.cls_row(ci);
            let d = self.cls_row(di);
            let rc = c[e].abs();
            let rd = d[e].abs();

            let mut gc = vec![0.0; e + 1];
            let mut gd = vec![0.0; e + 1];

            let dst = dist(&d[..e], &c[..e]);
            let viol = (rc + rd) - dst + self.margin;
            let mut loss = relu(viol);
            if viol > 0.0 {
                if dst > 0.0 {
                    for j in 0..e {
                        let u = (d[j] - c[j]) / dst;
                        // Separation grows the distance, so the centers are
                        // pushed apart.
                        gd[j] -= u;
                        gc[j] += u;
                    }
                }
                gc[e] += sgn(c[e]);
                gd[e] += sgn(d[e]);
            }
            loss += self.reg(&c[..e], &mut gc[..e]);
            loss += self.reg(&d[..e], &mut gd[..e]);
            sum += loss;

            axpy(scale, &gc, grads.cls_row(ci, e + 1));
            axpy(scale, &gd, grads.cls_row(di, e + 1));
        }
        sum * scale
    }
}

fn relu(x: f32) -> f32 {
    x.max(0.0)
}

/// Subgradient-friendly sign: 0 at 0.
fn sgn(x: f32) -> f32 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

fn norm(x: &[f32]) -> f32 {
    x.iter().map(|v| v * v).sum::<f32>().sqrt()
}

fn dist(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

/// `out += alpha * x`.
fn axpy(alpha: f32, x: &[f32], out: &mut [f32]) {
    for (o, v) in out.iter_mut().zip(x) {
        *o += alpha * v;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::Minibatch;

    /// Model with hand-set embeddings: all zeros, dim 2.
    fn blank(num_classes: usize, num_relations: usize, margin: f32, reg_norm: f32) -> ElModel {
        let mut m = ElModel::new(num_classes, num_relations, 2, margin, reg_norm, None, 1);
        m.cls.fill(0.0);
        m.rel.fill(0.0);
        m
    }

    fn set_ball(m: &mut ElModel, i: usize, center: [f32; 2], radius: f32) {
        m.cls[[i, 0]] = center[0];
        m.cls[[i, 1]] = center[1];
        m.cls[[i, 2]] = radius;
    }

    #[test]
    fn test_zero_radius_loss_is_center_distance() {
        // reg_norm 0 so regularization vanishes for the second ball at the
        // origin; the first contributes |‖c‖ − 0| = ‖c‖ = 3+4 norm 5.
        let mut m = blank(2, 0, 0.0, 0.0);
        set_ball(&mut m, 0, [3.0, 4.0], 0.0);
        set_ball(&mut m, 1, [0.0, 0.0], 0.0);

        let batch = Minibatch {
            nf1: vec![[0, 1]],
            ..Default::default()
        };
        let loss = m.batch_loss(&batch);
        // ‖c−d‖ = 5, reg(c) = 5, reg(d) = 0
        assert!((loss.nf1 - 10.0).abs() < 1e-5);
    }

    #[test]
    fn test_containment_violation_zero_iff_inside() {
        let mut m = blank(2, 0, 0.0, 0.0);
        // Ball 0 (center (1,0), r=1) inside ball 1 (center (0,0), r=2):
        // dist + rc = 1 + 1 = 2 <= rd.
        set_ball(&mut m, 0, [1.0, 0.0], 1.0);
        set_ball(&mut m, 1, [0.0, 0.0], 2.0);
        let batch = Minibatch {
            nf1: vec![[0, 1]],
            ..Default::default()
        };
        let inside = m.batch_loss(&batch).nf1 - reg_of(&m, 0) - reg_of(&m, 1);
        assert!(inside.abs() < 1e-6);

        // Push ball 0 out: dist + rc = 2.5 > rd.
        set_ball(&mut m, 0, [1.5, 0.0], 1.0);
        let outside = m.batch_loss(&batch).nf1 - reg_of(&m, 0) - reg_of(&m, 1);
        assert!((outside - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_radius_sign_is_ignored() {
        let mut a = blank(2, 0, 0.0, 0.0);
        set_ball(&mut a, 0, [1.0, 0.0], 1.0);
        set_ball(&mut a, 1, [0.0, 0.0], -2.0);
        let mut b = blank(2, 0, 0.0, 0.0);
        set_ball(&mut b, 0, [1.0, 0.0], -1.0);
        set_ball(&mut b, 1, [0.0, 0.0], 2.0);

        let batch = Minibatch {
            nf1: vec![[0, 1]],
            ..Default::default()
        };
        assert!((a.batch_loss(&batch).nf1 - b.batch_loss(&batch).nf1).abs() < 1e-6);
    }

    #[test]
    fn test_disjointness_zero_iff_separated() {
        let margin = 0.1;
        let mut m = blank(2, 0, margin, 0.0);
        set_ball(&mut m, 0, [0.0, 0.0], 1.0);
        set_ball(&mut m, 1, [3.0, 0.0], 1.0);
        let batch = Minibatch {
            disjoint: vec![[0, 1, 0]],
            ..Default::default()
        };
        // dist 3 >= rc + rd - (-margin)? violation = 2 - 3 + 0.1 < 0 -> zero
        let sep = m.batch_loss(&batch).disjoint - reg_of(&m, 0) - reg_of(&m, 1);
        assert!(sep.abs() < 1e-6);

        // Overlapping balls violate.
        set_ball(&mut m, 1, [1.5, 0.0], 1.0);
        let overlap = m.batch_loss(&batch).disjoint - reg_of(&m, 0) - reg_of(&m, 1);
        assert!((overlap - (2.0 - 1.5 + margin)).abs() < 1e-6);
    }

    #[test]
    fn test_reg_zero_iff_norm_matches_and_symmetric() {
        let m = blank(1, 0, 0.0, 5.0);
        let mut g = vec![0.0; 2];
        assert!(m.reg(&[3.0, 4.0], &mut g).abs() < 1e-6);

        let mut g1 = vec![0.0; 2];
        let mut g2 = vec![0.0; 2];
        let a = m.reg(&[1.0, 2.0], &mut g1);
        let b = m.reg(&[-1.0, -2.0], &mut g2);
        assert!((a - b).abs() < 1e-6);
    }

    #[test]
    fn test_nf2_rdst_term_is_inert() {
        // With re read from d, min(rc, rd) - re <= 0 always, so NF2 reduces
        // to the three distance terms minus the margin (plus reg).
        let mut m = blank(3, 0, 0.0, 0.0);
        set_ball(&mut m, 0, [0.0, 0.0], 0.5);
        set_ball(&mut m, 1, [0.5, 0.0], 5.0);
        set_ball(&mut m, 2, [0.2, 0.0], 0.01);
        let batch = Minibatch {
            nf2: vec![[0, 1, 2]],
            ..Default::default()
        };
        let loss = m.batch_loss(&batch).nf2;
        let regs = reg_of(&m, 0) + reg_of(&m, 1) + reg_of(&m, 2);
        // dst = 0.5 <= 5.5, dst2 = 0.2 <= 0.5, dst3 = 0.3 <= 5 -> all relus 0
        assert!((loss - regs).abs() < 1e-6);
    }

    #[test]
    fn test_top_pin_overwrites_row() {
        let mut m = ElModel::new(3, 1, 4, 0.0, 1.0, Some(2), 7);
        m.cls[[2, 0]] = 9.0;
        m.cls[[2, 4]] = -3.0;
        m.pin_top();

        assert_eq!(m.cls[[2, 0]], 0.0);
        assert_eq!(m.cls[[2, 4]], TOP_RADIUS);
    }

    #[test]
    fn test_train_step_reduces_nf1_violation() {
        let mut m = blank(2, 0, 0.0, 0.0);
        set_ball(&mut m, 0, [2.0, 0.0], 0.5);
        set_ball(&mut m, 1, [0.0, 0.0], 0.5);
        let batch = Minibatch {
            nf1: vec![[0, 1]],
            ..Default::default()
        };

        let before = m.batch_loss(&batch).total();
        for _ in 0..20 {
            m.train_step(&batch, 0.05);
        }
        let after = m.batch_loss(&batch).total();
        assert!(after < before, "expected {after} < {before}");
    }

    #[test]
    fn test_gradients_match_finite_differences() {
        // Spot-check the hand-derived gradients for every normal form on a
        // small random model.
        let mut m = ElModel::new(4, 2, 3, 0.01, 1.0, None, 11);
        let batch = Minibatch {
            nf1: vec![[0, 1]],
            nf2: vec![[0, 1, 2]],
            nf3: vec![[0, 0, 3]],
            nf4: vec![[1, 2, 0]],
            disjoint: vec![[2, 3, 0]],
        };
        let (_, grads) = m.forward_backward(&batch);
        let h = 1e-3_f32;

        for (&row, g) in &grads.cls {
            for j in 0..4 {
                let orig = m.cls[[row, j]];
                m.cls[[row, j]] = orig + h;
                let up = m.batch_loss(&batch).total();
                m.cls[[row, j]] = orig - h;
                let down = m.batch_loss(&batch).total();
                m.cls[[row, j]] = orig;
                let numeric = (up - down) / (2.0 * h);
                assert!(
                    (numeric - g[j]).abs() < 1e-2,
                    "cls[{row},{j}]: numeric {numeric} vs analytic {}",
                    g[j]
                );
            }
        }
        for (&row, g) in &grads.rel {
            for j in 0..3 {
                let orig = m.rel[[row, j]];
                m.rel[[row, j]] = orig + h;
                let up = m.batch_loss(&batch).total();
                m.rel[[row, j]] = orig - h;
                let down = m.batch_loss(&batch).total();
                m.rel[[row, j]] = orig;
                let numeric = (up - down) / (2.0 * h);
                assert!(
                    (numeric - g[j]).abs() < 1e-2,
                    "rel[{row},{j}]: numeric {numeric} vs analytic {}",
                    g[j]
                );
            }
        }
    }

    /// Regularization value of one class ball (helper for expected-loss
    /// arithmetic in tests).
    fn reg_of(m: &ElModel, i: usize) -> f32 {
        let c = [m.cls[[i, 0]], m.cls[[i, 1]]];
        (norm(&c) - m.reg_norm).abs()
    }
}
