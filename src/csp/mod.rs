//! A small integer constraint language and the engine interface rules build models against.
//!
//! Rules only ever see [`ConstraintEngine`], never a concrete backend.
//! [`SatEngine`] is the built-in backend, reducing everything to CNF for `varisat`.

use std::collections::HashMap;

pub use sat::SatEngine;

pub(crate) mod logic;
pub mod sat;

/// Handle to an integer decision variable created by a [`ConstraintEngine`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct IntVar(pub(crate) usize);

impl IntVar {
    /// `self == value`
    pub fn is(self, value: i64) -> BoolExpr {
        BoolExpr::Eq(IntExpr::Var(self), IntExpr::Const(value))
    }

    /// `self != value`
    pub fn is_not(self, value: i64) -> BoolExpr {
        self.is(value).not()
    }

    /// `self == other`
    pub fn same_as(self, other: IntVar) -> BoolExpr {
        BoolExpr::Eq(IntExpr::Var(self), IntExpr::Var(other))
    }

    /// `self != other`
    pub fn differs_from(self, other: IntVar) -> BoolExpr {
        self.same_as(other).not()
    }

    /// `self` takes one of `values`. False if `values` is empty.
    pub fn one_of(self, values: impl IntoIterator<Item = i64>) -> BoolExpr {
        BoolExpr::Or(values.into_iter().map(|v| self.is(v)).collect())
    }

    /// The integer `table[value]` for whichever value `self` takes, or `default` for values not in `table`.
    pub fn lookup(self, table: impl IntoIterator<Item = (i64, i64)>, default: i64) -> IntExpr {
        table.into_iter()
            .fold(IntExpr::Const(default), |otherwise, (value, result)| {
                IntExpr::ite(self.is(value), IntExpr::Const(result), otherwise)
            })
    }
}

impl From<IntVar> for IntExpr {
    fn from(value: IntVar) -> Self {
        IntExpr::Var(value)
    }
}

/// Integer-valued expressions.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum IntExpr {
    /// A fixed value.
    Const(i64),
    /// Whatever value the variable takes.
    Var(IntVar),
    /// `then` if `cond` holds, `otherwise` if not.
    Ite {
        /// The condition.
        cond: Box<BoolExpr>,
        /// Value when `cond` holds.
        then: Box<IntExpr>,
        /// Value when `cond` does not hold.
        otherwise: Box<IntExpr>,
    },
    /// The sum of all terms; zero if there are none.
    Sum(Vec<IntExpr>),
}

impl IntExpr {
    /// [`Self::Ite`] without the boxing.
    pub fn ite(cond: BoolExpr, then: IntExpr, otherwise: IntExpr) -> Self {
        Self::Ite { cond: Box::new(cond), then: Box::new(then), otherwise: Box::new(otherwise) }
    }

    /// [`Self::Sum`] of `terms`.
    pub fn sum(terms: impl IntoIterator<Item = IntExpr>) -> Self {
        Self::Sum(terms.into_iter().collect())
    }

    /// `1` if `cond` holds, `0` otherwise.
    pub fn indicator(cond: BoolExpr) -> Self {
        Self::ite(cond, Self::Const(1), Self::Const(0))
    }

    /// `self <= rhs`
    pub fn le(self, rhs: IntExpr) -> BoolExpr {
        BoolExpr::Le(self, rhs)
    }

    /// `self >= rhs`
    pub fn ge(self, rhs: IntExpr) -> BoolExpr {
        BoolExpr::Le(rhs, self)
    }

    /// `self == rhs`
    pub fn equals(self, rhs: IntExpr) -> BoolExpr {
        BoolExpr::Eq(self, rhs)
    }

    /// `self + rhs`, flattening into an existing sum.
    pub fn plus(self, rhs: IntExpr) -> Self {
        match self {
            Self::Sum(mut terms) => {
                terms.push(rhs);
                Self::Sum(terms)
            }
            lhs => Self::Sum(vec![lhs, rhs]),
        }
    }
}

/// Boolean-valued expressions; every constraint is one of these.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum BoolExpr {
    /// Always true or always false.
    Const(bool),
    /// `lhs == rhs`
    Eq(IntExpr, IntExpr),
    /// `lhs <= rhs`
    Le(IntExpr, IntExpr),
    /// Negation.
    Not(Box<BoolExpr>),
    /// Every term holds; true if there are none.
    And(Vec<BoolExpr>),
    /// Some term holds; false if there are none.
    Or(Vec<BoolExpr>),
    /// If the first holds, so does the second.
    Implies(Box<BoolExpr>, Box<BoolExpr>),
}

impl BoolExpr {
    /// Negation, cancelling a double negation.
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        match self {
            Self::Not(inner) => *inner,
            Self::Const(b) => Self::Const(!b),
            other => Self::Not(Box::new(other)),
        }
    }

    /// `self && rhs`
    pub fn and(self, rhs: BoolExpr) -> Self {
        Self::And(vec![self, rhs])
    }

    /// `self || rhs`
    pub fn or(self, rhs: BoolExpr) -> Self {
        Self::Or(vec![self, rhs])
    }

    /// `!self || rhs`
    pub fn implies(self, rhs: BoolExpr) -> Self {
        Self::Implies(Box::new(self), Box::new(rhs))
    }
}

/// A satisfying assignment: one value per variable.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Assignment {
    values: HashMap<IntVar, i64>,
}

impl Assignment {
    pub(crate) fn insert(&mut self, var: IntVar, value: i64) {
        self.values.insert(var, value);
    }

    /// The value of `var`, or `None` if the engine did not assign it.
    pub fn value_of(&self, var: IntVar) -> Option<i64> {
        self.values.get(&var).copied()
    }
}

/// The result of [`ConstraintEngine::check`].
#[derive(Clone, Debug)]
pub enum CheckOutcome {
    /// The model is satisfiable; here is one witness.
    Sat(Assignment),
    /// No assignment satisfies the model.
    Unsat,
    /// The engine gave up without deciding.
    Unknown,
}

/// The minimal contract of a constraint-solving backend.
///
/// Variables range over explicit finite domains. Constraints accumulate until [`Self::check`] is called once.
pub trait ConstraintEngine {
    /// Create a variable that takes exactly one of the values in `domain`.
    fn new_int_var(&mut self, name: &str, domain: &[i64]) -> IntVar;
    /// Require `constraint` to hold in any assignment.
    fn add_constraint(&mut self, constraint: BoolExpr);
    /// Number of constraints added so far.
    fn constraint_count(&self) -> usize;
    /// Decide the accumulated model.
    fn check(&mut self) -> CheckOutcome;
}
