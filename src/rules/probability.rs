use itertools::Itertools;
use log::trace;

use crate::csp::IntExpr;
use crate::rules::{pips_of, Rule, RuleContext, RuleError};

/// Keeps the total pips of every resource type within one of every other.
///
/// Only resource types the template asks for are compared.
#[derive(Clone, Copy, Debug, Default)]
pub struct BalancedResourceProbabilityRule;

impl Rule for BalancedResourceProbabilityRule {
    fn name(&self) -> &'static str {
        "Balanced resource probability"
    }

    fn description(&self) -> &'static str {
        "Ensures that the summed token probabilities of any two resource types differ by at most one pip."
    }

    fn apply(&self, context: &mut RuleContext<'_>) -> Result<(), RuleError> {
        let resource_types = context.template.allowed_resource_types();

        let pip_sums = resource_types.iter()
            .map(|resource_type| {
                IntExpr::sum(context.type_vars.iter()
                    .zip(context.token_vars)
                    .map(|(type_var, token_var)| {
                        IntExpr::ite(type_var.is(resource_type.encoding()), pips_of(*token_var), IntExpr::Const(0))
                    }))
            })
            .collect_vec();

        for ((a_type, a), (b_type, b)) in resource_types.iter().zip(&pip_sums).tuple_combinations() {
            trace!("balancing {} against {}", a_type, b_type);
            context.engine.add_constraint(a.clone().le(b.clone().plus(IntExpr::Const(1))));
            context.engine.add_constraint(b.clone().le(a.clone().plus(IntExpr::Const(1))));
        }

        Ok(())
    }
}

/// Caps the pips around every vertex where three tiles meet.
#[derive(Clone, Copy, Debug)]
pub struct IntersectionPipsRule {
    /// Largest allowed sum of pips over the three tiles of an intersection.
    pub limit: u32,
}

impl IntersectionPipsRule {
    /// The limit used by the default rule set.
    pub const DEFAULT_LIMIT: u32 = 11;
}

impl Default for IntersectionPipsRule {
    fn default() -> Self {
        Self { limit: Self::DEFAULT_LIMIT }
    }
}

impl Rule for IntersectionPipsRule {
    fn name(&self) -> &'static str {
        "Maximum intersection probability"
    }

    fn description(&self) -> &'static str {
        "Ensures that the tokens around any intersection add up to a bounded number of pips."
    }

    fn apply(&self, context: &mut RuleContext<'_>) -> Result<(), RuleError> {
        for triple in context.field.intersection_triples() {
            let pips = IntExpr::sum(triple.iter().map(|i| pips_of(context.token_vars[*i])));
            context.engine.add_constraint(pips.le(IntExpr::Const(i64::from(self.limit))));
        }

        Ok(())
    }
}
