use tracing::trace;

use crate::ga::GaOptions;
use crate::rng::RandomNumberGenerator;
use crate::variable::ParameterSpace;

/// Adaptive mutation strength.
///
/// After an improving generation the strength grows by `factor`, otherwise
/// it shrinks by `factor^(1/4)`, so that roughly one improving generation in
/// five keeps it steady. It always stays within `[min, max]`.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationSchedule {
    strength: f64,
    factor: f64,
    min: f64,
    max: f64,
}

impl MutationSchedule {
    pub fn new(strength: f64, factor: f64, min: f64, max: f64) -> Self {
        Self {
            strength: strength.clamp(min, max),
            factor,
            min,
            max,
        }
    }

    pub fn from_options(options: &GaOptions) -> Self {
        Self::new(
            options.get_mutation_strength(),
            options.get_strength_factor(),
            options.get_min_strength(),
            options.get_max_strength(),
        )
    }

    pub fn strength(&self) -> f64 {
        self.strength
    }

    pub fn update(&mut self, improved: bool) {
        let next = if improved {
            self.strength * self.factor
        } else {
            self.strength / self.factor.powf(0.25)
        };
        self.strength = next.clamp(self.min, self.max);
        trace!(strength = self.strength, improved, "Updated mutation strength");
    }
}

/// Mutates each component with probability `rate`, at least one component
/// always. Continuous components take a Gaussian step of `strength` times
/// the domain width, discrete ones are resampled.
pub fn mutate(
    values: &[f64],
    space: &ParameterSpace,
    rate: f64,
    strength: f64,
    rng: &mut RandomNumberGenerator,
) -> Vec<f64> {
    let mut child = values.to_vec();
    if child.is_empty() {
        return child;
    }
    let mut chosen: Vec<usize> = (0..child.len()).filter(|_| rng.chance(rate)).collect();
    if chosen.is_empty() {
        chosen.push(rng.index(child.len()));
    }
    for i in chosen {
        child[i] = space.variables()[i].mutate(child[i], strength, rng);
    }
    space.clamp(&mut child);
    child
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_stays_in_bounds() {
        let mut schedule = MutationSchedule::new(0.2, 2.0, 0.01, 0.5);
        for _ in 0..10 {
            schedule.update(true);
        }
        assert_eq!(schedule.strength(), 0.5);
        for _ in 0..100 {
            schedule.update(false);
        }
        assert_eq!(schedule.strength(), 0.01);
    }

    #[test]
    fn test_schedule_one_fifth_balance() {
        let mut schedule = MutationSchedule::new(0.1, 1.5, 1e-6, 10.0);
        schedule.update(true);
        for _ in 0..4 {
            schedule.update(false);
        }
        assert!((schedule.strength() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_mutation_changes_something_and_stays_in_bounds() {
        let space = ParameterSpace::from_bounds(&[0.0; 3], &[1.0; 3]).unwrap();
        let mut rng = RandomNumberGenerator::from_seed(4);
        let parent = vec![0.5, 0.5, 0.5];
        for _ in 0..50 {
            let child = mutate(&parent, &space, 0.0, 0.3, &mut rng);
            assert!(space.contains(&child));
            let changed = child.iter().zip(&parent).filter(|(a, b)| a != b).count();
            assert!(changed <= 1);
        }
        let child = mutate(&parent, &space, 1.0, 5.0, &mut rng);
        assert!(space.contains(&child));
    }
}
