//! Ranking of viable call candidates.
//!
//! Candidates are compared by their per-argument score vectors. One candidate
//! dominates another when it scores at least as well on every argument and
//! better on at least one. Equal vectors are broken in favour of a fixed-arity
//! candidate over a variadic one. The winner is the single candidate no other
//! candidate dominates.

use tracing::trace;

use super::CallResolution;
use crate::AmbiguityPolicy;

/// Whether `a` beats `b`.
pub fn dominates(a: &[u32], a_variadic: bool, b: &[u32], b_variadic: bool) -> bool {
    if a.len() != b.len() || a.iter().zip(b).any(|(x, y)| x < y) {
        return false;
    }
    a.iter().zip(b).any(|(x, y)| x > y) || (!a_variadic && b_variadic)
}

/// Index of the best viable candidate.
///
/// On a tie the error carries every undominated index, in candidate order.
/// Under [`AmbiguityPolicy::FirstDeclared`] the first of them is taken.
pub fn select_best(
    viable: &[CallResolution],
    variadic: &[bool],
    policy: AmbiguityPolicy,
) -> Result<usize, Vec<usize>> {
    if viable.len() == 1 {
        return Ok(0);
    }

    let undominated: Vec<usize> = (0..viable.len())
        .filter(|&i| {
            !(0..viable.len()).any(|j| {
                j != i
                    && dominates(&viable[j].scores, variadic[j], &viable[i].scores, variadic[i])
            })
        })
        .collect();

    match undominated.as_slice() {
        [single] => Ok(*single),
        [first, ..] if policy == AmbiguityPolicy::FirstDeclared => {
            trace!(tied = undominated.len(), "ambiguity resolved by declaration order");
            Ok(*first)
        }
        _ => Err(undominated),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viable(candidate: usize, scores: &[u32]) -> CallResolution {
        CallResolution {
            candidate,
            item: None,
            argument_map: (0..scores.len()).collect(),
            bindings: Vec::new(),
            scores: scores.to_vec(),
            narrowed: vec![None; scores.len()],
            casts: vec![None; scores.len()],
        }
    }

    #[test]
    fn dominance_needs_one_strict_improvement() {
        assert!(dominates(&[64, 40], false, &[40, 40], false));
        assert!(!dominates(&[64, 40], false, &[64, 40], false));
        assert!(!dominates(&[64, 30], false, &[40, 40], false));
        assert!(dominates(&[64], false, &[64], true));
        assert!(!dominates(&[64], true, &[64], false));
    }

    #[test]
    fn single_dominating_candidate_wins() {
        let candidates = [viable(0, &[40, 40]), viable(1, &[64, 40]), viable(2, &[40, 12])];
        assert_eq!(
            select_best(&candidates, &[false; 3], AmbiguityPolicy::Error),
            Ok(1)
        );
    }

    #[test]
    fn ties_report_every_undominated_candidate() {
        let candidates = [viable(0, &[64, 40]), viable(1, &[40, 64]), viable(2, &[12, 12])];
        assert_eq!(
            select_best(&candidates, &[false; 3], AmbiguityPolicy::Error),
            Err(vec![0, 1])
        );
        assert_eq!(
            select_best(&candidates, &[false; 3], AmbiguityPolicy::FirstDeclared),
            Ok(0)
        );
    }

    #[test]
    fn zero_arguments_prefer_fixed_arity() {
        let candidates = [viable(0, &[]), viable(1, &[])];
        assert_eq!(
            select_best(&candidates, &[true, false], AmbiguityPolicy::Error),
            Ok(1)
        );
    }
}
