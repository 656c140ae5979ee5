use itertools::Itertools;
use log::{debug, info};
use strum::VariantArray;

use crate::coord::Coordinate;
use crate::csp::{Assignment, CheckOutcome, ConstraintEngine, IntVar, SatEngine};
use crate::field::{Field, FieldError};
use crate::rules::{default_rules, Rule, RuleContext, RuleError};
use crate::template::Template;
use crate::tile::{Tile, TileType, Token};

/// Reasons generating a board may fail.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SolverFailure {
    /// The template does not fit the field, see [`Template::is_compatible_with_field`].
    /// Nothing was handed to the constraint engine.
    #[error("template is not compatible with the field")]
    IncompatibleTemplate,
    /// The tile at `position` cannot take any type the template asks for.
    #[error("no tile type allowed by the template fits the tile at {position}")]
    NoAllowedTypes {
        /// The offending tile.
        position: Coordinate,
    },
    /// No board satisfies every rule.
    #[error("no board satisfies the template and rules")]
    Unsatisfiable,
    /// The constraint engine gave up before deciding.
    #[error("the constraint engine could not decide whether a board exists")]
    Indeterminate,
    /// The engine's assignment does not decode to a valid tile at `position`.
    /// This means some rule is missing or wrong and should never happen with the default rules.
    #[error("solution does not decode to a valid tile at {position}")]
    InconsistentModel {
        /// The first tile that failed to decode.
        position: Coordinate,
    },
    /// A custom rule refused to build its constraints.
    #[error("rule \"{rule}\" failed: {reason}")]
    RuleFailed {
        /// Name of the failing rule.
        rule: &'static str,
        /// What went wrong.
        reason: String,
    },
}

impl From<RuleError> for SolverFailure {
    fn from(value: RuleError) -> Self {
        match value {
            RuleError::NoAllowedTypes { position } => Self::NoAllowedTypes { position },
            RuleError::Custom { rule, reason } => Self::RuleFailed { rule, reason },
        }
    }
}

/// One board being built: the engine, its inputs and two variables per tile.
///
/// Created with every variable in place, then fed rules with [`Self::apply`], then consumed by [`Self::solve`].
pub(crate) struct SolverContext<'a, E: ConstraintEngine> {
    engine: E,
    field: &'a Field,
    template: &'a Template,
    type_vars: Vec<IntVar>,
    token_vars: Vec<IntVar>,
}

impl<'a, E: ConstraintEngine> SolverContext<'a, E> {
    pub(crate) fn new(mut engine: E, field: &'a Field, template: &'a Template) -> Self {
        let type_domain = TileType::VALID.iter().map(TileType::encoding).collect_vec();
        let token_domain = std::iter::once(Token::NONE_ENCODING)
            .chain(Token::VARIANTS.iter().map(Token::encoding))
            .collect_vec();

        let (type_vars, token_vars) = field.tiles().iter()
            .map(|tile| {
                let key = tile.position().key();
                (
                    engine.new_int_var(&format!("type_{key}"), &type_domain),
                    engine.new_int_var(&format!("token_{key}"), &token_domain),
                )
            })
            .unzip();

        Self { engine, field, template, type_vars, token_vars }
    }

    pub(crate) fn apply(&mut self, rule: &dyn Rule) -> Result<(), RuleError> {
        let before = self.engine.constraint_count();
        let mut context = RuleContext {
            engine: &mut self.engine,
            field: self.field,
            template: self.template,
            type_vars: &self.type_vars,
            token_vars: &self.token_vars,
        };
        rule.apply(&mut context)?;

        debug!("rule \"{}\" added {} constraints", rule.name(), self.engine.constraint_count() - before);
        Ok(())
    }

    /// Invoke the engine once and decode its answer into a field ordered like the input.
    pub(crate) fn solve(mut self) -> Result<Field, SolverFailure> {
        match self.engine.check() {
            CheckOutcome::Sat(assignment) => self.decode(&assignment),
            CheckOutcome::Unsat => Err(SolverFailure::Unsatisfiable),
            CheckOutcome::Unknown => Err(SolverFailure::Indeterminate),
        }
    }

    fn decode(&self, assignment: &Assignment) -> Result<Field, SolverFailure> {
        let tiles = self.field.tiles().iter()
            .zip(self.type_vars.iter().zip(&self.token_vars))
            .map(|(tile, (type_var, token_var))| {
                let position = tile.position();
                let inconsistent = || SolverFailure::InconsistentModel { position };

                let tile_type = assignment.value_of(*type_var)
                    .and_then(TileType::from_encoding)
                    .filter(TileType::is_valid)
                    .ok_or_else(inconsistent)?;
                let token = if tile_type.is_resource() {
                    Some(assignment.value_of(*token_var)
                        .and_then(Token::from_encoding)
                        .ok_or_else(inconsistent)?)
                } else {
                    None
                };

                Tile::new(position, tile_type, token).map_err(|_| inconsistent())
            })
            .collect::<Result<Vec<_>, _>>()?;

        Field::from_tiles(tiles).map_err(|e| {
            let position = match e {
                FieldError::TileNotFound(position) | FieldError::DuplicatePosition(position) => position,
                FieldError::PositionMismatch { actual, .. } => actual,
            };
            SolverFailure::InconsistentModel { position }
        })
    }
}

/// Generates boards from a field and a template under an ordered list of rules.
///
/// ```
/// use basalt::{Field, Generator, Template};
///
/// let field = Field::empty(2);
/// let template = Template::default_for_field(&field);
/// let board = Generator::default().solve(&field, &template).unwrap();
/// assert!(board.is_resolved());
/// ```
pub struct Generator {
    rules: Vec<Box<dyn Rule>>,
}

impl Default for Generator {
    /// A generator with [`default_rules`].
    fn default() -> Self {
        Self { rules: default_rules() }
    }
}

impl Generator {
    /// A generator without any rules. Every tile is then free to take any value in its domain.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Append `rule`, to be applied after every rule already present.
    pub fn with_rule(&mut self, rule: Box<dyn Rule>) -> &mut Self {
        self.rules.push(rule);
        self
    }

    /// Drop every rule called `name`.
    pub fn without_rule(&mut self, name: &str) -> &mut Self {
        self.rules.retain(|rule| rule.name() != name);
        self
    }

    /// The rules, in the order they are applied.
    pub fn rules(&self) -> &[Box<dyn Rule>] {
        &self.rules
    }

    /// Generate a board with the built-in SAT backend.
    pub fn solve(&self, field: &Field, template: &Template) -> Result<Field, SolverFailure> {
        self.solve_with(SatEngine::new(), field, template)
    }

    /// Generate a board with a caller-supplied constraint engine.
    ///
    /// Tiles already resolved in `field` are kept, every other tile is resolved so that the result matches `template` exactly.
    pub fn solve_with<E: ConstraintEngine>(&self, engine: E, field: &Field, template: &Template) -> Result<Field, SolverFailure> {
        if !template.is_compatible_with_field(field) {
            info!("template requires {} tiles, field has {}, or pins exceed the template", template.size(), field.len());
            return Err(SolverFailure::IncompatibleTemplate);
        }

        let mut context = SolverContext::new(engine, field, template);
        for rule in &self.rules {
            context.apply(rule.as_ref())?;
        }

        let result = context.solve();
        match &result {
            Ok(_) => info!("generated a board of {} tiles", field.len()),
            Err(e) => info!("board generation failed: {e}"),
        }
        result
    }
}
