use std::ops::Index;

use itertools::Itertools;
use varisat::{CnfFormula, ExtendFormula, Lit};

/// Clauses stating exactly one of `lits` is true.
pub(crate) fn exactly_one(lits: &[Lit]) -> Vec<Vec<Lit>> {
    let mut clauses = Vec::with_capacity(lits.len() * (lits.len() + 1) / 2 + 1);

    // no two are true; (!A + !B) * (!A + !C) * ...
    clauses.extend(lits.iter()
        .combinations(2)
        .map(|pair| vec![!**pair.index(0), !**pair.index(1)])
    );
    // at least one is true; A + B + C + ...
    clauses.push(lits.to_vec());

    clauses
}

/// Totalizer merge of two unary numbers.
///
/// `a[k]` is true iff the first number is at least `k + 1`, likewise for `b`.
/// Returns fresh literals `c` of length `a.len() + b.len()` such that `c[k]` holds iff the sum is at least `k + 1`.
pub(crate) fn merge_unary(formula: &mut CnfFormula, a: &[Lit], b: &[Lit]) -> Vec<Lit> {
    if a.is_empty() {
        return b.to_vec();
    }
    if b.is_empty() {
        return a.to_vec();
    }

    let c = (0..a.len() + b.len()).map(|_| formula.new_lit()).collect_vec();
    // X >= k for 1-based k; None stands for a constant (true below the range, false above)
    let at_least = |x: &[Lit], k: usize| if k == 0 || k > x.len() { None } else { Some(x[k - 1]) };

    for i in 0..=a.len() {
        for j in 0..=b.len() {
            // A >= i and B >= j => C >= i + j
            if i + j >= 1 {
                let mut clause = Vec::with_capacity(3);
                clause.extend(at_least(a, i).map(|l| !l));
                clause.extend(at_least(b, j).map(|l| !l));
                clause.push(c[i + j - 1]);
                formula.add_clause(&clause);
            }

            // A < i + 1 and B < j + 1 => C < i + j + 1
            if i + j < c.len() {
                let mut clause = Vec::with_capacity(3);
                clause.extend(at_least(a, i + 1));
                clause.extend(at_least(b, j + 1));
                clause.push(!c[i + j]);
                formula.add_clause(&clause);
            }
        }
    }

    c
}
