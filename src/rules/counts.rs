use itertools::Itertools;
use log::trace;
use strum::VariantArray;

use crate::csp::IntExpr;
use crate::rules::{is_any_of, is_resource, Rule, RuleContext, RuleError};
use crate::tile::{TileType, Token};

/// Restricts every tile to the types it may become and fixes how many tiles of each type there are.
///
/// A resolved tile keeps its type, a placeholder becomes some land type and an empty tile any type,
/// in each case only among types the template asks for at least once.
#[derive(Clone, Copy, Debug, Default)]
pub struct TileTypeCountRule;

impl Rule for TileTypeCountRule {
    fn name(&self) -> &'static str {
        "Allowed tile types count"
    }

    fn description(&self) -> &'static str {
        "Ensures that the number of tiles of each tile type equals the number the template asks for."
    }

    fn apply(&self, context: &mut RuleContext<'_>) -> Result<(), RuleError> {
        for (tile, var) in context.field.tiles().iter().zip(context.type_vars) {
            let allowed = tile.allowed_substitutes_for_template(context.template);
            match allowed.as_slice() {
                [] => return Err(RuleError::NoAllowedTypes { position: tile.position() }),
                [only] => context.engine.add_constraint(var.is(only.encoding())),
                _ => context.engine.add_constraint(is_any_of(*var, &allowed)),
            }
        }

        for tile_type in TileType::VALID {
            let target = context.template.type_count(*tile_type);
            trace!("{} tiles of type {}", target, tile_type);

            let count = IntExpr::sum(context.type_vars.iter()
                .map(|var| IntExpr::indicator(var.is(tile_type.encoding()))));
            context.engine.add_constraint(count.equals(IntExpr::Const(target as i64)));
        }

        Ok(())
    }
}

/// Places tokens on exactly the resource tiles and fixes how many tokens of each value there are.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokenCountRule;

impl Rule for TokenCountRule {
    fn name(&self) -> &'static str {
        "Allowed tokens count"
    }

    fn description(&self) -> &'static str {
        "Ensures that the number of tokens equals the number in the template and that tokens are only placed on resource tiles."
    }

    fn apply(&self, context: &mut RuleContext<'_>) -> Result<(), RuleError> {
        let allowed_tokens = context.template.allowed_tokens()
            .iter()
            .map(Token::encoding)
            .collect_vec();

        let tiles = context.field.tiles().iter().zip(context.type_vars.iter().zip(context.token_vars));
        for (tile, (type_var, token_var)) in tiles {
            match (tile.is_valid(), tile.token()) {
                // resolved resource tile, keeps its token
                (true, Some(token)) => context.engine.add_constraint(token_var.is(token.encoding())),
                // resolved water or desert
                (true, None) => context.engine.add_constraint(token_var.is(Token::NONE_ENCODING)),
                _ => {
                    context.engine.add_constraint(
                        is_any_of(*type_var, TileType::NON_RESOURCE).implies(token_var.is(Token::NONE_ENCODING))
                    );
                    context.engine.add_constraint(
                        is_resource(*type_var).implies(token_var.one_of(allowed_tokens.iter().copied()))
                    );
                }
            }
        }

        for token in Token::VARIANTS {
            let target = context.template.token_count(*token);
            let count = IntExpr::sum(context.token_vars.iter()
                .map(|var| IntExpr::indicator(var.is(token.encoding()))));
            context.engine.add_constraint(count.equals(IntExpr::Const(target as i64)));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::coord::Coordinate;
    use crate::field::Field;
    use crate::rules::test_util::{is_unsat, solve_with_rules};
    use crate::solver::SolverFailure;
    use crate::template::Template;
    use crate::tile::Tile;

    use super::*;

    #[test]
    fn placeholder_without_land_quota_has_no_types() {
        let field = Field::from_tiles(vec![Tile::placeholder(Coordinate::ORIGIN)]).unwrap();
        let template = Template::new().with_type_count(TileType::Water, 1);

        assert_eq!(
            solve_with_rules(&field, &template, &[&TileTypeCountRule]),
            Err(SolverFailure::NoAllowedTypes { position: Coordinate::ORIGIN })
        );
    }

    #[test]
    fn types_follow_template_counts() {
        let field = Field::empty(1)
            .replace_at(Coordinate::ORIGIN, Tile::placeholder(Coordinate::ORIGIN))
            .unwrap();
        let template = Template::new()
            .with_type_count(TileType::Water, 6)
            .with_type_count(TileType::Desert, 1);

        let solved = solve_with_rules(&field, &template, &[&TileTypeCountRule, &TokenCountRule]).unwrap();
        // the placeholder cannot become water
        assert_eq!(solved.get(Coordinate::ORIGIN).unwrap().tile_type(), TileType::Desert);
        assert_eq!(solved.count_by_type(TileType::Water), 6);
        assert!(solved.is_resolved());
    }

    #[test]
    fn tokens_land_on_resources_only() {
        let field = Field::empty(1);
        let template = Template::new()
            .with_type_count(TileType::Water, 3)
            .with_type_count(TileType::Clay, 2)
            .with_type_count(TileType::Gold, 2)
            .with_token_count(Token::Three, 3)
            .with_token_count(Token::Eleven, 1);

        let solved = solve_with_rules(&field, &template, &[&TileTypeCountRule, &TokenCountRule]).unwrap();
        for tile in solved.tiles() {
            assert_eq!(tile.is_resource(), tile.token().is_some());
        }
        assert_eq!(solved.count_by_token(Token::Three), 3);
        assert_eq!(solved.count_by_token(Token::Eleven), 1);
    }

    #[test]
    fn too_few_tokens_is_unsat() {
        let field = Field::empty(1);
        let template = Template::new()
            .with_type_count(TileType::Sheep, 7)
            .with_token_count(Token::Four, 6);

        assert!(is_unsat(&solve_with_rules(&field, &template, &[&TileTypeCountRule, &TokenCountRule])));
    }

    #[test]
    fn fixed_tokens_are_kept() {
        let pos = Coordinate::new(1, 0);
        let field = Field::empty(1)
            .replace_at(pos, Tile::new(pos, TileType::Forest, Some(Token::Twelve)).unwrap())
            .unwrap();
        let template = Template::new()
            .with_type_count(TileType::Forest, 7)
            .with_token_count(Token::Twelve, 1)
            .with_token_count(Token::Two, 6);

        let solved = solve_with_rules(&field, &template, &[&TileTypeCountRule, &TokenCountRule]).unwrap();
        assert_eq!(solved.get(pos).unwrap().token(), Some(Token::Twelve));
        assert_eq!(solved.count_by_token(Token::Two), 6);
    }
}
