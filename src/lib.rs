#![deny(missing_docs)]

//! # `basalt`
//!
//! A generator for balanced hexagonal board layouts in the style of [Catan](https://en.wikipedia.org/wiki/Catan).
//! Begin with a [`Field`], either all [`TileType::Empty`] from [`Field::empty`] or with some tiles pinned through [`Field::replace_at`],
//! and a [`Template`] saying how many tiles of each type and tokens of each value the board must hold.
//! Then call [`solve()`] (or [`Generator::solve`] for a custom rule set), yielding a field in which every tile is resolved.
//!
//! Tiles may be left unresolved in two ways: [`TileType::Empty`] may become any type, [`TileType::Placeholder`] any land type.
//! Resolved tiles are never changed.
//!
//! # Internals
//! Every tile gets two integer variables, one for its type and one for its token, each over a small explicit domain.
//! Every [`Rule`](rules::Rule) then adds constraints over those variables through the [`ConstraintEngine`](csp::ConstraintEngine) interface:
//! 1. Each tile takes one of the types it may become, and every type appears exactly as often as the template says.
//! 2. Exactly the resource tiles carry a token, and every token appears exactly as often as the template says.
//! 3. Neighboring resource tiles differ in type.
//! 4. Neighboring tokens differ.
//! 5. A 6 or 8 never neighbors another 6 or 8.
//! 6. For any two resource types, the summed pips of their tokens differ by at most one.
//! 7. The three tokens around any intersection sum to at most 11 pips.
//!
//! The built-in engine, [`SatEngine`](csp::SatEngine), expresses all of this as a Boolean satisfiability problem (a "SAT").
//! Each variable is one-hot over its domain; integer sums are built as sorted unary numbers so that comparisons become plain implications.
//! One call to the SAT solver decides the model, and its assignment is read back into tiles.

pub use coord::{Coordinate, CoordinateParseError, HexDirection};
pub use field::{Field, FieldError};
pub use solver::{Generator, SolverFailure};
pub use template::{Template, TemplateError};
pub use tile::{Tile, TileError, TileType, Token};

pub(crate) mod coord;
pub mod csp;
pub(crate) mod field;
pub mod rules;
pub(crate) mod solver;
pub(crate) mod template;
pub(crate) mod tile;

/// A field of radius `radius` with every tile [`TileType::Empty`].
pub fn generate_empty_field(radius: u32) -> Field {
    Field::empty(radius)
}

/// The balanced default template for a field of `field_size` tiles, see [`Template::default_for_size`].
pub fn default_template(field_size: usize) -> Template {
    Template::default_for_size(field_size)
}

/// An empty field of radius `radius` together with its default template.
pub fn default_setup(radius: u32) -> (Template, Field) {
    let field = Field::empty(radius);
    (Template::default_for_field(&field), field)
}

/// A copy of `field` holding `tile` at `position`.
pub fn replace_tile(field: &Field, position: Coordinate, tile: Tile) -> Result<Field, FieldError> {
    field.replace_at(position, tile)
}

/// Whether `template` can be satisfied by completing `field`.
pub fn is_compatible_with_field(template: &Template, field: &Field) -> bool {
    template.is_compatible_with_field(field)
}

/// Resolve every tile of `field` so that it matches `template` under the default rules.
pub fn solve(field: &Field, template: &Template) -> Result<Field, SolverFailure> {
    Generator::default().solve(field, template)
}
