use unordered_pair::UnorderedPair;

use crate::csp::BoolExpr;
use crate::rules::{is_resource, Rule, RuleContext, RuleError};
use crate::tile::Token;

/// Two neighboring resource tiles never share a type.
#[derive(Clone, Copy, Debug, Default)]
pub struct NeighboringResourcesRule;

impl Rule for NeighboringResourcesRule {
    fn name(&self) -> &'static str {
        "No same neighboring resources"
    }

    fn description(&self) -> &'static str {
        "Ensures that no two neighboring tiles have the same resource type."
    }

    fn apply(&self, context: &mut RuleContext<'_>) -> Result<(), RuleError> {
        for UnorderedPair(i, j) in context.field.neighbor_pairs() {
            let (a, b) = (context.type_vars[i], context.type_vars[j]);
            context.engine.add_constraint(
                is_resource(a).and(is_resource(b)).implies(a.differs_from(b))
            );
        }

        Ok(())
    }
}

/// Two neighboring tiles never carry the same token.
#[derive(Clone, Copy, Debug, Default)]
pub struct NeighboringTokensRule;

impl Rule for NeighboringTokensRule {
    fn name(&self) -> &'static str {
        "No same neighboring tokens"
    }

    fn description(&self) -> &'static str {
        "Ensures that no two neighboring tiles have the same token."
    }

    fn apply(&self, context: &mut RuleContext<'_>) -> Result<(), RuleError> {
        for UnorderedPair(i, j) in context.field.neighbor_pairs() {
            let (a, b) = (context.token_vars[i], context.token_vars[j]);
            // two tiles without a token are fine
            context.engine.add_constraint(
                a.same_as(b).implies(a.is(Token::NONE_ENCODING))
            );
        }

        Ok(())
    }
}

/// A six or an eight never sits next to another six or eight.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoAdjacentHighProbabilityRule;

impl Rule for NoAdjacentHighProbabilityRule {
    fn name(&self) -> &'static str {
        "No adjacent 6 and 8"
    }

    fn description(&self) -> &'static str {
        "Ensures that the two most likely tokens are never placed on neighboring tiles."
    }

    fn apply(&self, context: &mut RuleContext<'_>) -> Result<(), RuleError> {
        let high = Token::HIGH_PROBABILITY.iter().map(Token::encoding);

        for UnorderedPair(i, j) in context.field.neighbor_pairs() {
            let both_high = BoolExpr::And(vec![
                context.token_vars[i].one_of(high.clone()),
                context.token_vars[j].one_of(high.clone()),
            ]);
            context.engine.add_constraint(both_high.not());
        }

        Ok(())
    }
}
