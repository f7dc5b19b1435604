use crate::rng::RandomNumberGenerator;
use crate::variable::ParameterSpace;

/// Recombination of two parent vectors.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Crossover {
    /// Each component comes from either parent with equal probability.
    #[default]
    Uniform,
    /// The child is `alpha * a + (1 - alpha) * b` with `alpha ~ U(0, 1)`.
    /// Discrete components snap to the nearest admissible value.
    Arithmetic,
}

impl Crossover {
    /// Produces one child of `first` and `second`, clamped into `space`.
    pub fn apply(
        &self,
        first: &[f64],
        second: &[f64],
        space: &ParameterSpace,
        rng: &mut RandomNumberGenerator,
    ) -> Vec<f64> {
        let mut child: Vec<f64> = match self {
            Crossover::Uniform => first
                .iter()
                .zip(second)
                .map(|(&a, &b)| if rng.chance(0.5) { a } else { b })
                .collect(),
            Crossover::Arithmetic => {
                let alpha = rng.uniform(0.0, 1.0);
                first
                    .iter()
                    .zip(second)
                    .map(|(&a, &b)| alpha * a + (1.0 - alpha) * b)
                    .collect()
            }
        };
        space.clamp(&mut child);
        child
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variable::Variable;

    #[test]
    fn test_uniform_takes_components_from_parents() {
        let space = ParameterSpace::from_bounds(&[0.0; 4], &[10.0; 4]).unwrap();
        let mut rng = RandomNumberGenerator::from_seed(9);
        let a = [1.0, 2.0, 3.0, 4.0];
        let b = [5.0, 6.0, 7.0, 8.0];
        for _ in 0..20 {
            let child = Crossover::Uniform.apply(&a, &b, &space, &mut rng);
            for (i, v) in child.iter().enumerate() {
                assert!(*v == a[i] || *v == b[i]);
            }
        }
    }

    #[test]
    fn test_arithmetic_stays_between_parents_and_snaps() {
        let space = ParameterSpace::new(vec![
            Variable::continuous("x", 0.0, 10.0).unwrap(),
            Variable::dynamics("d"),
        ]);
        let mut rng = RandomNumberGenerator::from_seed(9);
        for _ in 0..20 {
            let child = Crossover::Arithmetic.apply(&[2.0, 0.0], &[4.0, 2.0], &space, &mut rng);
            assert!((2.0..=4.0).contains(&child[0]));
            assert!(space.contains(&child));
        }
    }
}
