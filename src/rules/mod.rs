//! Rules translate board requirements into constraints.
//!
//! Each [`Rule`] sees the same [`RuleContext`]: the engine to add constraints to, the field and template being solved,
//! and one type variable and one token variable per tile, indexed like [`Field::tiles`].
//! Rules never read a solution back and never talk to each other except through the shared variables,
//! so adding a rule is a matter of appending it to the list a [`Generator`](crate::Generator) holds.

pub use counts::{TileTypeCountRule, TokenCountRule};
pub use neighbors::{NeighboringResourcesRule, NeighboringTokensRule, NoAdjacentHighProbabilityRule};
pub use probability::{BalancedResourceProbabilityRule, IntersectionPipsRule};

use itertools::Itertools;
use strum::VariantArray;

use crate::coord::Coordinate;
use crate::csp::{BoolExpr, ConstraintEngine, IntExpr, IntVar};
use crate::field::Field;
use crate::template::Template;
use crate::tile::{TileType, Token};

mod counts;
mod neighbors;
mod probability;

/// Reasons a rule may refuse to build its constraints.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RuleError {
    /// The tile at `position` cannot take any type the template asks for, so no board exists.
    #[error("no tile type allowed by the template fits the tile at {position}")]
    NoAllowedTypes {
        /// The offending tile.
        position: Coordinate,
    },
    /// A rule outside the default set failed for its own reasons.
    #[error("rule \"{rule}\" failed: {reason}")]
    Custom {
        /// [`Rule::name`] of the failing rule.
        rule: &'static str,
        /// What went wrong.
        reason: String,
    },
}

/// Everything a [`Rule`] may use while adding constraints.
pub struct RuleContext<'a> {
    /// Where constraints go.
    pub engine: &'a mut dyn ConstraintEngine,
    /// The field being solved, including pinned tiles.
    pub field: &'a Field,
    /// The counts the solution must match.
    pub template: &'a Template,
    /// Per tile, the [`TileType::encoding`] it resolves to.
    pub type_vars: &'a [IntVar],
    /// Per tile, the [`Token::encoding`] it resolves to, or [`Token::NONE_ENCODING`].
    pub token_vars: &'a [IntVar],
}

/// One requirement on generated boards.
///
/// Applying a rule only adds constraints; applying the same rule to the same inputs always adds the same ones.
pub trait Rule {
    /// Short, unique name, also used to remove a rule from a [`Generator`](crate::Generator).
    fn name(&self) -> &'static str;
    /// One sentence on what the rule ensures.
    fn description(&self) -> &'static str;
    /// Add this rule's constraints to `context.engine`.
    fn apply(&self, context: &mut RuleContext<'_>) -> Result<(), RuleError>;
}

/// The default rules, in the order they are applied.
pub fn default_rules() -> Vec<Box<dyn Rule>> {
    vec![
        Box::new(TileTypeCountRule),
        Box::new(TokenCountRule),
        Box::new(NeighboringResourcesRule),
        Box::new(NeighboringTokensRule),
        Box::new(NoAdjacentHighProbabilityRule),
        Box::new(BalancedResourceProbabilityRule),
        Box::new(IntersectionPipsRule::default()),
    ]
}

/// `var` encodes one of `types`.
pub(crate) fn is_any_of(var: IntVar, types: &[TileType]) -> BoolExpr {
    var.one_of(types.iter().map(TileType::encoding))
}

pub(crate) fn is_resource(type_var: IntVar) -> BoolExpr {
    is_any_of(type_var, TileType::RESOURCE)
}

/// The pips of whichever token `token_var` encodes; zero for no token.
pub(crate) fn pips_of(token_var: IntVar) -> IntExpr {
    token_var.lookup(
        Token::VARIANTS.iter().map(|t| (t.encoding(), i64::from(t.pips()))).collect_vec(),
        0,
    )
}

#[cfg(test)]
pub(crate) mod test_util {
    use crate::csp::SatEngine;
    use crate::field::Field;
    use crate::rules::Rule;
    use crate::solver::{SolverContext, SolverFailure};
    use crate::template::Template;

    /// Solve `field` under exactly `rules`.
    pub(crate) fn solve_with_rules(field: &Field, template: &Template, rules: &[&dyn Rule]) -> Result<Field, SolverFailure> {
        let mut context = SolverContext::new(SatEngine::new(), field, template);
        for rule in rules {
            context.apply(*rule)?;
        }
        context.solve()
    }

    pub(crate) fn is_unsat(result: &Result<Field, SolverFailure>) -> bool {
        matches!(result, Err(SolverFailure::Unsatisfiable))
    }
}
