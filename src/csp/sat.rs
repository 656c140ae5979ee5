//! A [`ConstraintEngine`] reducing integer constraints to CNF, solved by `varisat`.
//!
//! # Encoding
//! Every variable gets one literal per domain value, exactly one of which is true.
//! Integer expressions are translated to an order ("unary") encoding: an offset plus a monotone run of literals,
//! the `k`th of which is true iff the value is at least `offset + k + 1`.
//! Sums are merged with totalizers, comparisons of unary numbers become one implication per threshold,
//! and boolean connectives get Tseitin definitions.
//! Subexpressions are memoised, so a rule mentioning the same expression many times pays for it once.

use std::collections::{HashMap, HashSet};

use itertools::Itertools;
use log::{trace, warn};
use varisat::{CnfFormula, ExtendFormula, Lit, Solver};

use crate::csp::logic::{exactly_one, merge_unary};
use crate::csp::{Assignment, BoolExpr, CheckOutcome, ConstraintEngine, IntExpr, IntVar};

/// An integer in order encoding: `offset` plus the number of true literals in `bits`.
#[derive(Clone, Debug)]
struct Unary {
    offset: i64,
    // bits[k] <=> value >= offset + k + 1; bits[k + 1] => bits[k]
    bits: Vec<Lit>,
}

impl Unary {
    fn constant(value: i64) -> Self {
        Self { offset: value, bits: Vec::new() }
    }

    fn max(&self) -> i64 {
        self.offset + self.bits.len() as i64
    }
}

/// One declared variable: its values, ascending, each with the literal that is true iff the variable takes it.
#[derive(Clone, Debug)]
struct Domain {
    name: String,
    values: Vec<(i64, Lit)>,
}

impl Domain {
    fn lit_of(&self, value: i64) -> Option<Lit> {
        self.values.iter().find(|(v, _)| *v == value).map(|(_, lit)| *lit)
    }
}

/// A [`ConstraintEngine`] backed by the `varisat` SAT solver.
pub struct SatEngine {
    formula: CnfFormula,
    truth: Lit,
    domains: Vec<Domain>,
    bool_cache: HashMap<BoolExpr, Lit>,
    int_cache: HashMap<IntExpr, Unary>,
    constraints: usize,
}

impl Default for SatEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SatEngine {
    /// An engine with no variables and no constraints.
    pub fn new() -> Self {
        let mut formula = CnfFormula::new();
        let truth = formula.new_lit();
        formula.add_clause(&[truth]);

        Self {
            formula,
            truth,
            domains: Vec::new(),
            bool_cache: HashMap::new(),
            int_cache: HashMap::new(),
            constraints: 0,
        }
    }

    #[inline]
    fn falsity(&self) -> Lit {
        !self.truth
    }

    fn constant(&self, value: bool) -> Lit {
        if value { self.truth } else { self.falsity() }
    }

    /// Add a clause, dropping false literals and skipping it entirely if it contains a true one.
    fn add_clause(&mut self, lits: &[Lit]) {
        if lits.contains(&self.truth) {
            return;
        }

        let clause = lits.iter()
            .copied()
            .filter(|l| *l != self.falsity())
            .unique()
            .collect_vec();
        self.formula.add_clause(&clause);
    }

    /// A literal equivalent to the conjunction of `lits`.
    fn and_lit(&mut self, lits: &[Lit]) -> Lit {
        if lits.contains(&self.falsity()) {
            return self.falsity();
        }

        let lits = lits.iter().copied().filter(|l| *l != self.truth).unique().collect_vec();
        match lits.as_slice() {
            [] => self.truth,
            [single] => *single,
            _ => {
                let out = self.formula.new_lit();
                // out => every lit
                for lit in &lits {
                    self.formula.add_clause(&[!out, *lit]);
                }
                // every lit => out
                let mut clause = lits.iter().map(|l| !*l).collect_vec();
                clause.push(out);
                self.formula.add_clause(&clause);
                out
            }
        }
    }

    /// A literal equivalent to the disjunction of `lits`.
    fn or_lit(&mut self, lits: &[Lit]) -> Lit {
        let negated = lits.iter().map(|l| !*l).collect_vec();
        !self.and_lit(&negated)
    }

    /// `value >= k`, for any `k`.
    fn at_least(&self, value: &Unary, k: i64) -> Lit {
        if k <= value.offset {
            self.truth
        } else if k > value.max() {
            self.falsity()
        } else {
            value.bits[(k - value.offset - 1) as usize]
        }
    }

    fn unary(&mut self, expr: &IntExpr) -> Unary {
        if let Some(cached) = self.int_cache.get(expr) {
            return cached.clone();
        }

        let encoded = match expr {
            IntExpr::Const(value) => Unary::constant(*value),
            IntExpr::Var(var) => {
                let values = self.domains[var.0].values.clone();
                match (values.first(), values.last()) {
                    (Some((min, _)), Some((max, _))) => {
                        let bits = (min + 1..=*max)
                            .map(|k| {
                                let at_or_above = values.iter()
                                    .filter(|(v, _)| *v >= k)
                                    .map(|(_, lit)| *lit)
                                    .collect_vec();
                                self.or_lit(&at_or_above)
                            })
                            .collect_vec();
                        Unary { offset: *min, bits }
                    }
                    // empty domain; the variable is already unsatisfiable
                    _ => Unary::constant(0),
                }
            }
            IntExpr::Ite { cond, then, otherwise } => {
                let cond = self.literal(cond);
                let then = self.unary(then);
                let otherwise = self.unary(otherwise);

                let offset = then.offset.min(otherwise.offset);
                let top = then.max().max(otherwise.max());
                let bits = (offset + 1..=top)
                    .map(|k| {
                        let then_k = self.at_least(&then, k);
                        let otherwise_k = self.at_least(&otherwise, k);
                        let taken = self.and_lit(&[cond, then_k]);
                        let not_taken = self.and_lit(&[!cond, otherwise_k]);
                        self.or_lit(&[taken, not_taken])
                    })
                    .collect_vec();
                Unary { offset, bits }
            }
            IntExpr::Sum(terms) => {
                let mut parts = terms.iter().map(|t| self.unary(t)).collect_vec();
                let offset = parts.iter().map(|p| p.offset).sum();
                // merge pairwise to keep the totalizer tree balanced
                while parts.len() > 1 {
                    parts = parts.chunks(2)
                        .map(|pair| match pair {
                            [a, b] => Unary { offset: 0, bits: merge_unary(&mut self.formula, &a.bits, &b.bits) },
                            [a] => Unary { offset: 0, bits: a.bits.clone() },
                            _ => Unary::constant(0),
                        })
                        .collect_vec();
                }
                Unary {
                    offset,
                    bits: parts.pop().map(|p| p.bits).unwrap_or_default(),
                }
            }
        };

        self.int_cache.insert(expr.clone(), encoded.clone());
        encoded
    }

    /// Clauses, as lists of literals, equivalent to `lhs <= rhs`.
    fn le_clauses(&mut self, lhs: &IntExpr, rhs: &IntExpr) -> Vec<Vec<Lit>> {
        let a = self.unary(lhs);
        let b = self.unary(rhs);

        // lhs <= rhs iff for every k, lhs >= k implies rhs >= k
        (a.offset.min(b.offset) + 1..=a.max().max(b.max()))
            .map(|k| vec![!self.at_least(&a, k), self.at_least(&b, k)])
            .filter(|clause| !clause.contains(&self.truth))
            .collect_vec()
    }

    /// A literal equivalent to `expr`.
    fn literal(&mut self, expr: &BoolExpr) -> Lit {
        if let Some(cached) = self.bool_cache.get(expr) {
            return *cached;
        }

        let lit = match expr {
            BoolExpr::Const(value) => self.constant(*value),
            BoolExpr::Eq(IntExpr::Var(var), IntExpr::Const(value))
            | BoolExpr::Eq(IntExpr::Const(value), IntExpr::Var(var)) => {
                let lit = self.domains[var.0].lit_of(*value);
                lit.unwrap_or(self.falsity())
            }
            BoolExpr::Eq(IntExpr::Const(a), IntExpr::Const(b)) => self.constant(a == b),
            BoolExpr::Eq(IntExpr::Var(x), IntExpr::Var(y)) => {
                let shared = self.shared_values(*x, *y);
                let both = shared.into_iter()
                    .map(|(lx, ly)| self.and_lit(&[lx, ly]))
                    .collect_vec();
                self.or_lit(&both)
            }
            BoolExpr::Eq(lhs, rhs) => {
                let le = self.literal(&BoolExpr::Le(lhs.clone(), rhs.clone()));
                let ge = self.literal(&BoolExpr::Le(rhs.clone(), lhs.clone()));
                self.and_lit(&[le, ge])
            }
            BoolExpr::Le(lhs, rhs) => {
                let clauses = self.le_clauses(lhs, rhs);
                let holds = clauses.into_iter()
                    .map(|clause| self.or_lit(&clause))
                    .collect_vec();
                self.and_lit(&holds)
            }
            BoolExpr::Not(inner) => !self.literal(inner),
            BoolExpr::And(terms) => {
                let lits = terms.iter().map(|t| self.literal(t)).collect_vec();
                self.and_lit(&lits)
            }
            BoolExpr::Or(terms) => {
                let lits = terms.iter().map(|t| self.literal(t)).collect_vec();
                self.or_lit(&lits)
            }
            BoolExpr::Implies(premise, conclusion) => {
                let premise = self.literal(premise);
                let conclusion = self.literal(conclusion);
                self.or_lit(&[!premise, conclusion])
            }
        };

        self.bool_cache.insert(expr.clone(), lit);
        lit
    }

    /// Pairs of literals, one from each variable, for every value both domains contain.
    fn shared_values(&self, x: IntVar, y: IntVar) -> Vec<(Lit, Lit)> {
        let y_domain = &self.domains[y.0];
        self.domains[x.0].values.iter()
            .filter_map(|(value, lx)| y_domain.lit_of(*value).map(|ly| (*lx, ly)))
            .collect_vec()
    }

    /// Assert `expr`, emitting clauses directly where the top-level shape allows instead of defining a literal.
    fn assert(&mut self, expr: &BoolExpr) {
        match expr {
            BoolExpr::Const(true) => {}
            BoolExpr::And(terms) => terms.iter().for_each(|t| self.assert(t)),
            BoolExpr::Or(terms) => {
                let lits = terms.iter().map(|t| self.literal(t)).collect_vec();
                self.add_clause(&lits);
            }
            BoolExpr::Implies(premise, conclusion) => {
                let premise = self.literal(premise);
                let conclusion = self.literal(conclusion);
                self.add_clause(&[!premise, conclusion]);
            }
            BoolExpr::Le(lhs, rhs) => {
                for clause in self.le_clauses(lhs, rhs) {
                    self.add_clause(&clause);
                }
            }
            BoolExpr::Eq(lhs, rhs) if !matches!((lhs, rhs), (IntExpr::Var(_), _) | (_, IntExpr::Var(_))) => {
                for clause in self.le_clauses(lhs, rhs).into_iter().chain(self.le_clauses(rhs, lhs)) {
                    self.add_clause(&clause);
                }
            }
            BoolExpr::Not(inner) => match inner.as_ref() {
                // x != y: no value is shared
                BoolExpr::Eq(IntExpr::Var(x), IntExpr::Var(y)) => {
                    for (lx, ly) in self.shared_values(*x, *y) {
                        self.add_clause(&[!lx, !ly]);
                    }
                }
                BoolExpr::And(terms) => {
                    let lits = terms.iter().map(|t| !self.literal(t)).collect_vec();
                    self.add_clause(&lits);
                }
                other => {
                    let lit = !self.literal(other);
                    self.add_clause(&[lit]);
                }
            },
            other => {
                let lit = self.literal(other);
                self.add_clause(&[lit]);
            }
        }
    }
}

impl ConstraintEngine for SatEngine {
    fn new_int_var(&mut self, name: &str, domain: &[i64]) -> IntVar {
        let values = domain.iter()
            .copied()
            .sorted()
            .dedup()
            .map(|value| (value, self.formula.new_lit()))
            .collect_vec();

        let lits = values.iter().map(|(_, lit)| *lit).collect_vec();
        for clause in exactly_one(&lits) {
            self.formula.add_clause(&clause);
        }

        self.domains.push(Domain { name: name.to_string(), values });
        IntVar(self.domains.len() - 1)
    }

    fn add_constraint(&mut self, constraint: BoolExpr) {
        self.constraints += 1;
        self.assert(&constraint);
    }

    fn constraint_count(&self) -> usize {
        self.constraints
    }

    fn check(&mut self) -> CheckOutcome {
        trace!(
            "solving {} variables over {} SAT variables and {} clauses",
            self.domains.len(),
            self.formula.var_count(),
            self.formula.len()
        );

        let mut solver = Solver::new();
        solver.add_formula(&self.formula);

        match solver.solve() {
            Ok(true) => {}
            Ok(false) => return CheckOutcome::Unsat,
            Err(e) => {
                warn!("SAT solver gave up: {e:?}");
                return CheckOutcome::Unknown;
            }
        }

        let Some(model) = solver.model() else {
            return CheckOutcome::Unknown;
        };
        let model: HashSet<Lit> = model.into_iter().collect();

        let mut assignment = Assignment::default();
        for (index, domain) in self.domains.iter().enumerate() {
            match domain.values.iter().find(|(_, lit)| model.contains(lit)) {
                Some((value, _)) => assignment.insert(IntVar(index), *value),
                None => trace!("variable {} left unassigned", domain.name),
            }
        }

        CheckOutcome::Sat(assignment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sat(engine: &mut SatEngine) -> Assignment {
        match engine.check() {
            CheckOutcome::Sat(assignment) => assignment,
            other => panic!("expected a model, got {:?}", other),
        }
    }

    fn is_unsat(engine: &mut SatEngine) -> bool {
        matches!(engine.check(), CheckOutcome::Unsat)
    }

    #[test]
    fn variable_takes_a_domain_value() {
        let mut engine = SatEngine::new();
        let x = engine.new_int_var("x", &[3, 1, 4, 1, 5]);
        engine.add_constraint(x.is_not(1));
        engine.add_constraint(x.is_not(3));
        engine.add_constraint(x.is_not(5));

        assert_eq!(sat(&mut engine).value_of(x), Some(4));
    }

    #[test]
    fn empty_domain_is_unsat() {
        let mut engine = SatEngine::new();
        engine.new_int_var("x", &[]);
        assert!(is_unsat(&mut engine));
    }

    #[test]
    fn equality_outside_domain_is_unsat() {
        let mut engine = SatEngine::new();
        let x = engine.new_int_var("x", &[0, 1]);
        engine.add_constraint(x.is(7));
        assert!(is_unsat(&mut engine));
    }

    #[test]
    fn disequality_between_variables() {
        let mut engine = SatEngine::new();
        let x = engine.new_int_var("x", &[1, 2]);
        let y = engine.new_int_var("y", &[2, 3]);
        let z = engine.new_int_var("z", &[1, 3]);
        engine.add_constraint(x.differs_from(y));
        engine.add_constraint(y.differs_from(z));
        engine.add_constraint(x.differs_from(z));
        engine.add_constraint(z.is(3));

        let model = sat(&mut engine);
        assert_eq!(model.value_of(x), Some(1));
        assert_eq!(model.value_of(y), Some(2));

        engine.add_constraint(x.is(2));
        assert!(is_unsat(&mut engine));
    }

    #[test]
    fn counting_with_sums() {
        let mut engine = SatEngine::new();
        let vars = (0..6).map(|i| engine.new_int_var(&format!("v{i}"), &[0, 1, 2])).collect_vec();
        let count_of = |value: i64| IntExpr::sum(vars.iter().map(|v| IntExpr::indicator(v.is(value))));

        engine.add_constraint(count_of(2).equals(IntExpr::Const(4)));
        engine.add_constraint(count_of(0).equals(IntExpr::Const(2)));
        engine.add_constraint(vars[0].is(0));

        let model = sat(&mut engine);
        let values = vars.iter().map(|v| model.value_of(*v).unwrap()).collect_vec();
        assert_eq!(values[0], 0);
        assert_eq!(values.iter().filter(|v| **v == 2).count(), 4);
        assert_eq!(values.iter().filter(|v| **v == 0).count(), 2);
        assert_eq!(values.iter().filter(|v| **v == 1).count(), 0);
    }

    #[test]
    fn over_constrained_count_is_unsat() {
        let mut engine = SatEngine::new();
        let vars = (0..3).map(|i| engine.new_int_var(&format!("v{i}"), &[0, 1])).collect_vec();
        engine.add_constraint(IntExpr::sum(vars.iter().map(|v| IntExpr::Var(*v))).equals(IntExpr::Const(4)));
        assert!(is_unsat(&mut engine));
    }

    #[test]
    fn weighted_sums_and_bounds() {
        let mut engine = SatEngine::new();
        let table = [(2, 1), (6, 5), (8, 5), (9, 4)];
        let a = engine.new_int_var("a", &[0, 2, 6, 8, 9]);
        let b = engine.new_int_var("b", &[0, 2, 6, 8, 9]);
        let c = engine.new_int_var("c", &[0, 2, 6, 8, 9]);
        let weight = |v: IntVar| v.lookup(table, 0);

        // at least 10, at most 11 in total
        let total = IntExpr::sum([weight(a), weight(b), weight(c)]);
        engine.add_constraint(total.clone().le(IntExpr::Const(11)));
        engine.add_constraint(total.ge(IntExpr::Const(10)));
        engine.add_constraint(a.is(6));
        engine.add_constraint(b.is_not(0));

        let model = sat(&mut engine);
        let weigh = |v: IntVar| table.iter().find(|(k, _)| Some(*k) == model.value_of(v)).map_or(0, |(_, w)| *w);
        let sum = weigh(a) + weigh(b) + weigh(c);
        assert!((10..=11).contains(&sum), "sum was {sum}");
        assert_eq!(model.value_of(a), Some(6));

        engine.add_constraint(b.one_of([6, 8]));
        engine.add_constraint(c.is_not(0));
        engine.add_constraint(c.is_not(2));
        assert!(is_unsat(&mut engine));
    }

    #[test]
    fn difference_of_sums_is_bounded() {
        let mut engine = SatEngine::new();
        let x = engine.new_int_var("x", &[0, 1, 2, 3, 4, 5]);
        let y = engine.new_int_var("y", &[0, 1, 2, 3, 4, 5]);

        // |x - y| <= 1
        engine.add_constraint(IntExpr::Var(x).le(IntExpr::Var(y).plus(IntExpr::Const(1))));
        engine.add_constraint(IntExpr::Var(y).le(IntExpr::Var(x).plus(IntExpr::Const(1))));
        engine.add_constraint(x.is(5));
        engine.add_constraint(y.is_not(5));

        assert_eq!(sat(&mut engine).value_of(y), Some(4));

        engine.add_constraint(y.is_not(4));
        assert!(is_unsat(&mut engine));
    }

    #[test]
    fn implications_and_connectives() {
        let mut engine = SatEngine::new();
        let kind = engine.new_int_var("kind", &[0, 1]);
        let token = engine.new_int_var("token", &[0, 5, 6]);

        engine.add_constraint(kind.is(0).implies(token.is(0)));
        engine.add_constraint(kind.is(1).implies(token.one_of([5, 6])));
        engine.add_constraint(token.is(5).or(token.is(0)).not());

        let model = sat(&mut engine);
        assert_eq!(model.value_of(kind), Some(1));
        assert_eq!(model.value_of(token), Some(6));

        engine.add_constraint(kind.is(1).and(token.is(6)).not());
        assert!(is_unsat(&mut engine));
    }
}
