//! Reaction records: stoichiometry and Arrhenius rate expressions.

use cinder_core::SpeciesId;
use smallvec::SmallVec;

/// Modified Arrhenius rate expression `k(T) = A · T^β · exp(−Ta/T)`.
///
/// `Ta` is the activation temperature (activation energy divided by the
/// gas constant), so no unit system leaks into the evaluation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Arrhenius {
    /// Pre-exponential factor `A`.
    pub a: f64,
    /// Temperature exponent `β`.
    pub beta: f64,
    /// Activation temperature `Ta`.
    pub ta: f64,
}

impl Arrhenius {
    /// A temperature-independent rate constant (`β = 0`, `Ta = 0`).
    pub fn constant(k: f64) -> Self {
        Self {
            a: k,
            beta: 0.0,
            ta: 0.0,
        }
    }

    /// Evaluate the rate constant at temperature `t`.
    pub fn rate(&self, t: f64) -> f64 {
        self.a * t.powf(self.beta) * (-self.ta / t).exp()
    }
}

/// A species participating in one side of a reaction.
///
/// The integer stoichiometric coefficient doubles as the mass-action
/// exponent (elementary reactions).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpeciesCoeff {
    /// The participating species.
    pub species: SpeciesId,
    /// Stoichiometric coefficient, ≥ 1.
    pub coeff: u32,
}

/// One elementary reaction: `lhs → rhs`, optionally with an explicit
/// reverse Arrhenius expression (`lhs ⇌ rhs`).
#[derive(Clone, Debug, PartialEq)]
pub struct Reaction {
    /// Reactant side.
    pub lhs: SmallVec<[SpeciesCoeff; 4]>,
    /// Product side.
    pub rhs: SmallVec<[SpeciesCoeff; 4]>,
    /// Forward rate expression.
    pub forward: Arrhenius,
    /// Explicit reverse rate expression, if the reaction is reversible.
    pub reverse: Option<Arrhenius>,
}

impl Reaction {
    /// Every species appearing on either side, duplicates included.
    pub fn participants(&self) -> impl Iterator<Item = SpeciesId> + '_ {
        self.lhs
            .iter()
            .chain(self.rhs.iter())
            .map(|sc| sc.species)
    }

    /// Net stoichiometric coefficient (products minus reactants) of
    /// `species` in this reaction.
    pub fn net_coeff(&self, species: SpeciesId) -> i64 {
        let produced: i64 = self
            .rhs
            .iter()
            .filter(|sc| sc.species == species)
            .map(|sc| sc.coeff as i64)
            .sum();
        let consumed: i64 = self
            .lhs
            .iter()
            .filter(|sc| sc.species == species)
            .map(|sc| sc.coeff as i64)
            .sum();
        produced - consumed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    #[test]
    fn constant_rate_ignores_temperature() {
        let k = Arrhenius::constant(2.5);
        assert_eq!(k.rate(300.0), 2.5);
        assert_eq!(k.rate(3000.0), 2.5);
    }

    #[test]
    fn arrhenius_evaluates_modified_form() {
        let k = Arrhenius {
            a: 1e4,
            beta: 0.5,
            ta: 1000.0,
        };
        let t: f64 = 2000.0;
        let expected = 1e4 * t.sqrt() * (-0.5_f64).exp();
        assert!((k.rate(t) - expected).abs() < expected * 1e-12);
    }

    #[test]
    fn net_coeff_balances_sides() {
        // 2A -> A + B: net(A) = -1, net(B) = +1
        let r = Reaction {
            lhs: smallvec![SpeciesCoeff {
                species: SpeciesId(0),
                coeff: 2
            }],
            rhs: smallvec![
                SpeciesCoeff {
                    species: SpeciesId(0),
                    coeff: 1
                },
                SpeciesCoeff {
                    species: SpeciesId(1),
                    coeff: 1
                }
            ],
            forward: Arrhenius::constant(1.0),
            reverse: None,
        };
        assert_eq!(r.net_coeff(SpeciesId(0)), -1);
        assert_eq!(r.net_coeff(SpeciesId(1)), 1);
        assert_eq!(r.net_coeff(SpeciesId(2)), 0);
    }
}
