//! Combination and projection of sets of tables.
//!
//! These components evaluate a commutative and associative combination over many tables, choosing
//! the evaluation order, and can interleave projections with the combinations so that a variable
//! is summed out as soon as every table mentioning it has been combined. Each component works
//! either eagerly on `Potential`s or by planning operations in a `Schedule`.

pub mod combine;
pub mod combine_and_project;
pub mod project;

pub use self::combine::MultiDimCombination;
pub use self::combine_and_project::MultiDimCombineAndProject;
pub use self::project::MultiDimProjection;

use crate::schedule::multidim::estimated_size;
use crate::variable::Variable;


/// Plan a greedy pairwise evaluation of a combination over operands ranging over `var_sets`.
///
/// At each step the two live operands whose combination is the smallest are merged; the merged
/// operand is appended to the list of operands. Ties go to the lowest indices.
///
/// # Returns
/// the sequence of merged pairs: step `k` merges operands `i` and `j` into operand
/// `var_sets.len() + k`
pub(crate) fn plan_pairs(var_sets: &[Vec<Variable>]) -> Vec<(usize, usize)> {
    let mut operands: Vec<Vec<Variable>> = var_sets.to_vec();
    let mut alive: Vec<bool> = vec![true; operands.len()];
    let mut steps = Vec::new();

    loop {
        let live: Vec<usize> = (0..operands.len()).filter(|&i| alive[i]).collect();
        if live.len() < 2 {
            break;
        }

        let mut best = (std::f64::INFINITY, live[0], live[1]);
        for (k, &i) in live.iter().enumerate() {
            for &j in live[k + 1..].iter() {
                let size = estimated_size(&union(&operands[i], &operands[j]));
                if size < best.0 {
                    best = (size, i, j);
                }
            }
        }

        let (_, i, j) = best;
        let merged = union(&operands[i], &operands[j]);
        alive[i] = false;
        alive[j] = false;
        operands.push(merged);
        alive.push(true);
        steps.push((i, j));
    }

    steps
}


/// The variables of `a` followed by those of `b` not in `a`
pub(crate) fn union(a: &[Variable], b: &[Variable]) -> Vec<Variable> {
    let mut vars = a.to_vec();
    vars.extend(b.iter().filter(|v| !a.contains(v)).cloned());
    vars
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smallest_pairs_first() {
        let a = Variable::discrete("A", 10);
        let b = Variable::discrete("B", 10);
        let c = Variable::binary("C");

        // {A,B} x {C} has 200 entries, {C} x {C} only 2
        let sets = vec![vec![a.clone(), b.clone()], vec![c.clone()], vec![c.clone()]];
        let steps = plan_pairs(&sets);
        assert_eq!(vec![(1, 2), (0, 3)], steps);

        assert!(plan_pairs(&sets[..1]).is_empty());
    }
}
