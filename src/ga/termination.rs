//! Stopping rules of a GA run.

use super::GaOptions;

/// Tracks the best score across generations.
///
/// A generation improves when it lowers the best score by more than `eps`
/// below the anchor, the score of the last improving generation. Small gains
/// accumulate against the anchor until together they exceed `eps`. The first
/// recorded generation always counts as an improvement.
#[derive(Debug, Clone)]
pub struct StopTracker {
    eps: f64,
    stuck_generations: usize,
    max_generations: Option<usize>,
    best: Option<f64>,
    anchor: Option<f64>,
    stagnant: usize,
    generations: usize,
}

impl StopTracker {
    pub fn new(eps: f64, stuck_generations: usize, max_generations: Option<usize>) -> Self {
        Self {
            eps,
            stuck_generations,
            max_generations,
            best: None,
            anchor: None,
            stagnant: 0,
            generations: 0,
        }
    }

    pub fn from_options(options: &GaOptions) -> Self {
        Self::new(
            options.get_eps(),
            options.get_stuck_generations(),
            options.get_max_generations(),
        )
    }

    /// Records the best score of a finished generation. Returns `true` when
    /// the generation improved.
    pub fn record(&mut self, best: f64) -> bool {
        self.generations += 1;
        let improved = match self.anchor {
            None => true,
            Some(anchor) => anchor - best > self.eps,
        };
        if improved {
            self.anchor = Some(best);
            self.stagnant = 0;
        } else {
            self.stagnant += 1;
        }
        if self.best.map_or(true, |previous| best < previous) {
            self.best = Some(best);
        }
        improved
    }

    pub fn generations(&self) -> usize {
        self.generations
    }

    /// Consecutive generations without improvement.
    pub fn stagnant(&self) -> usize {
        self.stagnant
    }

    /// Lowest score recorded so far.
    pub fn best(&self) -> Option<f64> {
        self.best
    }

    pub fn is_converged(&self) -> bool {
        self.generations > 0 && self.stagnant >= self.stuck_generations
    }

    pub fn generations_exhausted(&self) -> bool {
        self.max_generations
            .map_or(false, |max| self.generations >= max)
    }
}
