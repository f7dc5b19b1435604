use std::fmt::Debug;

use crate::error::Result;
use crate::rng::RandomNumberGenerator;

/// Trait for selection strategies of the genetic algorithm.
///
/// # Examples
///
/// ```
/// use demoga::selection::{ElitistSelection, SelectionStrategy};
/// use demoga::rng::RandomNumberGenerator;
///
/// let fitness = vec![0.5, 0.8, 0.3];
/// let mut rng = RandomNumberGenerator::from_seed(1);
///
/// let selected = ElitistSelection::default()
///     .select(&fitness, 2, &mut rng)
///     .unwrap();
/// assert_eq!(selected, vec![2, 0]);
/// ```
pub trait SelectionStrategy: Debug + Send + Sync {
    /// Selects `num_to_select` individuals and returns their indices into
    /// `fitness`.
    ///
    /// # Errors
    ///
    /// Returns `EmptyPopulation` when `fitness` is empty.
    fn select(
        &self,
        fitness: &[f64],
        num_to_select: usize,
        rng: &mut RandomNumberGenerator,
    ) -> Result<Vec<usize>>;
}
