//! Minibatch sampling over the normal-form axiom arrays.
//!
//! Every training step draws one batch per normal form, each batch sampled
//! uniformly **with replacement** and independently of the others. Short
//! arrays simply get resampled heavily; the imbalance between normal forms
//! is left uncorrected on purpose, so every loss term sees a full batch at
//! every step.
//!
//! The sampler is a finite-then-restartable sequence: it yields
//! `steps = ceil(max_form_len / batch_size)` batches, then signals
//! exhaustion; [`BatchSampler::reset`] starts a fresh epoch.

use rand::Rng;
use rand::SeedableRng;
use rand_xorshift::XorShiftRng;

use crate::ontology::NormalForms;

/// One training step's worth of axiom tuples, one batch per normal form.
#[derive(Debug, Clone, Default)]
pub struct Minibatch {
    /// NF1 `[c, d]` pairs.
    pub nf1: Vec<[usize; 2]>,
    /// NF2 `[c, d, e]` triples.
    pub nf2: Vec<[usize; 3]>,
    /// NF3 `[c, r, d]` triples.
    pub nf3: Vec<[usize; 3]>,
    /// NF4 `[r, c, d]` triples.
    pub nf4: Vec<[usize; 3]>,
    /// Disjointness `[c, d, ⊥]` triples.
    pub disjoint: Vec<[usize; 3]>,
}

/// Uniform with-replacement minibatch sampler.
pub struct BatchSampler {
    forms: NormalForms,
    batch_size: usize,
    steps: usize,
    step: usize,
    rng: XorShiftRng,
}

impl BatchSampler {
    /// Create a sampler over the parsed axiom arrays.
    ///
    /// Steps per epoch is `ceil(max_form_len / batch_size)`, so one epoch
    /// covers the largest array once in expectation.
    pub fn new(forms: NormalForms, batch_size: usize, seed: u64) -> Self {
        let steps = forms.max_len().div_ceil(batch_size);
        Self {
            forms,
            batch_size,
            steps,
            step: 0,
            rng: XorShiftRng::seed_from_u64(seed),
        }
    }

    /// Steps per epoch.
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Restart the sequence for a new epoch.
    pub fn reset(&mut self) {
        self.step = 0;
    }

    /// Draw the next step's minibatch, or `None` when the epoch is done.
    pub fn next_batch(&mut self) -> Option<Minibatch> {
        if self.step >= self.steps {
            return None;
        }
        self.step += 1;

        let b = self.batch_size;
        Some(Minibatch {
            nf1: draw(&self.forms.nf1, b, &mut self.rng),
            nf2: draw(&self.forms.nf2, b, &mut self.rng),
            nf3: draw(&self.forms.nf3, b, &mut self.rng),
            nf4: draw(&self.forms.nf4, b, &mut self.rng),
            disjoint: draw(&self.forms.disjoint, b, &mut self.rng),
        })
    }

    /// Borrow the underlying axiom arrays.
    pub fn forms(&self) -> &NormalForms {
        &self.forms
    }
}

/// Sample `k` tuples uniformly with replacement. Empty arrays produce an
/// empty batch rather than panicking.
fn draw<const N: usize>(data: &[[usize; N]], k: usize, rng: &mut XorShiftRng) -> Vec<[usize; N]> {
    if data.is_empty() {
        return Vec::new();
    }
    (0..k).map(|_| data[rng.gen_range(0..data.len())]).collect()
}
