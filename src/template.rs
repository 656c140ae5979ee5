use std::collections::BTreeMap;

use itertools::Itertools;
use log::warn;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use strum::VariantArray;

use crate::field::Field;
use crate::tile::{TileType, Token};

/// Token counts of the default template, independent of the field size.
const DEFAULT_TOKEN_COUNTS: [(Token, usize); 10] = [
    (Token::Two, 1),
    (Token::Three, 2),
    (Token::Four, 2),
    (Token::Five, 2),
    (Token::Six, 2),
    (Token::Eight, 2),
    (Token::Nine, 2),
    (Token::Ten, 2),
    (Token::Eleven, 2),
    (Token::Twelve, 1),
];

/// Reasons a [`Template`] operation may fail.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TemplateError {
    /// Counts can only be kept for valid tile types, never for unresolved markers.
    #[error("template cannot hold a count for unresolved tile type {0}")]
    UnresolvedType(TileType),
    /// The field has the wrong size, or already fixes more tiles of some type or token than the template allows.
    #[error("template is not compatible with the field")]
    IncompatibleField,
}

/// The exact number of tiles of each type and tokens of each value a generated board must contain.
///
/// Types and tokens absent from the template are required zero times.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(try_from = "TemplateRecord"))]
pub struct Template {
    type_counts: BTreeMap<TileType, usize>,
    token_counts: BTreeMap<Token, usize>,
}

/// The serialized shape of a [`Template`], checked by [`Template::set_type_count`] on the way in.
#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct TemplateRecord {
    #[serde(default)]
    type_counts: BTreeMap<TileType, usize>,
    #[serde(default)]
    token_counts: BTreeMap<Token, usize>,
}

#[cfg(feature = "serde")]
impl TryFrom<TemplateRecord> for Template {
    type Error = TemplateError;

    fn try_from(value: TemplateRecord) -> Result<Self, Self::Error> {
        let mut template = Self { type_counts: BTreeMap::new(), token_counts: value.token_counts };
        for (tile_type, count) in value.type_counts {
            template.set_type_count(tile_type, count)?;
        }
        Ok(template)
    }
}

impl Template {
    /// A template requiring nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume `self`, setting the count for `tile_type`.
    ///
    /// Unresolved types are ignored with a warning; use [`Self::set_type_count`] to observe the failure.
    pub fn with_type_count(mut self, tile_type: TileType, count: usize) -> Self {
        if let Err(e) = self.set_type_count(tile_type, count) {
            warn!("ignoring template count: {e}");
        }
        self
    }

    /// Consume `self`, setting the count for `token`.
    pub fn with_token_count(mut self, token: Token, count: usize) -> Self {
        self.set_token_count(token, count);
        self
    }

    /// Require `count` tiles of `tile_type`, failing for unresolved types.
    pub fn set_type_count(&mut self, tile_type: TileType, count: usize) -> Result<&mut Self, TemplateError> {
        if !tile_type.is_valid() {
            return Err(TemplateError::UnresolvedType(tile_type));
        }

        self.type_counts.insert(tile_type, count);
        Ok(self)
    }

    /// Require `count` tokens of `token`.
    pub fn set_token_count(&mut self, token: Token, count: usize) -> &mut Self {
        self.token_counts.insert(token, count);
        self
    }

    /// Total number of tiles required, which must equal the size of the field it is used with.
    pub fn size(&self) -> usize {
        self.type_counts.values().sum()
    }

    /// Required number of `tile_type` tiles; zero if never set.
    pub fn type_count(&self, tile_type: TileType) -> usize {
        self.type_counts.get(&tile_type).copied().unwrap_or_default()
    }

    /// Required number of `token` tokens; zero if never set.
    pub fn token_count(&self, token: Token) -> usize {
        self.token_counts.get(&token).copied().unwrap_or_default()
    }

    /// Tokens required at least once.
    pub fn allowed_tokens(&self) -> Vec<Token> {
        Token::VARIANTS.iter()
            .copied()
            .filter(|t| self.token_count(*t) > 0)
            .collect_vec()
    }

    /// Resource types required at least once. Types with no quota take no part in solving.
    pub fn allowed_resource_types(&self) -> Vec<TileType> {
        TileType::RESOURCE.iter()
            .copied()
            .filter(|t| self.type_count(*t) > 0)
            .collect_vec()
    }

    /// Whether `field` can be completed to satisfy this template: sizes must match
    /// and no type or token may already be fixed more often than required.
    pub fn is_compatible_with_field(&self, field: &Field) -> bool {
        if self.size() != field.len() {
            return false;
        }

        let types_fit = TileType::VALID.iter()
            .all(|t| field.count_by_type(*t) <= self.type_count(*t));
        let tokens_fit = Token::VARIANTS.iter()
            .all(|t| field.count_by_token(*t) <= self.token_count(*t));

        types_fit && tokens_fit
    }

    /// Valid types the field holds fewer of than required.
    pub fn unset_types(&self, field: &Field) -> Result<Vec<TileType>, TemplateError> {
        if !self.is_compatible_with_field(field) {
            return Err(TemplateError::IncompatibleField);
        }

        Ok(TileType::VALID.iter()
            .copied()
            .filter(|t| field.count_by_type(*t) < self.type_count(*t))
            .collect_vec())
    }

    /// Tokens the field holds fewer of than required.
    pub fn unset_tokens(&self, field: &Field) -> Result<Vec<Token>, TemplateError> {
        if !self.is_compatible_with_field(field) {
            return Err(TemplateError::IncompatibleField);
        }

        Ok(Token::VARIANTS.iter()
            .copied()
            .filter(|t| field.count_by_token(*t) < self.token_count(*t))
            .collect_vec())
    }

    /// The balanced default for a field of `field_size` cells.
    ///
    /// One desert; the remaining cells are split as evenly as possible over the resource types,
    /// with earlier types in [`TileType::RESOURCE`] taking the remainder.
    /// Token counts are fixed and sum to 18; callers must make sure the field has that many resource slots.
    pub fn default_for_size(field_size: usize) -> Self {
        let desert_count = 1;
        let land_slots = field_size.saturating_sub(desert_count);
        let per_type = land_slots / TileType::RESOURCE.len();
        let remainder = land_slots % TileType::RESOURCE.len();

        let mut type_counts = BTreeMap::from([(TileType::Water, 0), (TileType::Desert, desert_count)]);
        type_counts.extend(TileType::RESOURCE.iter()
            .enumerate()
            .map(|(i, t)| (*t, per_type + usize::from(i < remainder))));

        Self {
            type_counts,
            token_counts: BTreeMap::from(DEFAULT_TOKEN_COUNTS),
        }
    }

    /// [`Self::default_for_size`] for the size of `field`.
    pub fn default_for_field(field: &Field) -> Self {
        Self::default_for_size(field.len())
    }
}

#[cfg(test)]
mod tests {
    use crate::coord::Coordinate;
    use crate::tile::Tile;

    use super::*;

    fn resource_counts(template: &Template) -> Vec<usize> {
        TileType::RESOURCE.iter().map(|t| template.type_count(*t)).collect_vec()
    }

    #[test]
    fn default_for_standard_board() {
        let template = Template::default_for_size(19);
        assert_eq!(template.type_count(TileType::Desert), 1);
        assert_eq!(template.type_count(TileType::Water), 0);
        assert_eq!(resource_counts(&template), vec![3, 3, 3, 3, 3, 3]);
        assert_eq!(template.size(), 19);
        assert_eq!(Token::VARIANTS.iter().map(|t| template.token_count(*t)).sum::<usize>(), 18);
    }

    #[test]
    fn default_for_small_and_uneven_boards() {
        let template = Template::default_for_size(7);
        assert_eq!(template.type_count(TileType::Desert), 1);
        assert_eq!(resource_counts(&template), vec![1, 1, 1, 1, 1, 1]);

        let template = Template::default_for_size(37);
        assert_eq!(resource_counts(&template), vec![6, 6, 6, 6, 6, 6]);

        let template = Template::default_for_size(10);
        assert_eq!(resource_counts(&template), vec![2, 2, 2, 1, 1, 1]);
        assert_eq!(template.size(), 10);
    }

    #[test]
    fn missing_keys_count_zero() {
        let template = Template::new().with_type_count(TileType::Gold, 4);
        assert_eq!(template.type_count(TileType::Gold), 4);
        assert_eq!(template.type_count(TileType::Sheep), 0);
        assert_eq!(template.token_count(Token::Six), 0);
        assert_eq!(template.allowed_resource_types(), vec![TileType::Gold]);
        assert!(template.allowed_tokens().is_empty());
    }

    #[test]
    fn unresolved_types_are_rejected() {
        let mut template = Template::new();
        assert_eq!(
            template.set_type_count(TileType::Placeholder, 2).map(|_| ()),
            Err(TemplateError::UnresolvedType(TileType::Placeholder))
        );
        assert_eq!(Template::new().with_type_count(TileType::Empty, 3).size(), 0);
    }

    #[test]
    fn compatibility_requires_matching_size() {
        let field = Field::empty(1);
        assert!(Template::default_for_size(7).is_compatible_with_field(&field));
        assert!(!Template::default_for_size(8).is_compatible_with_field(&field));
        assert!(!Template::new().is_compatible_with_field(&field));
    }

    #[test]
    fn compatibility_bounds_fixed_tiles() {
        let field = Field::empty(1);
        let template = Template::new()
            .with_type_count(TileType::Water, 6)
            .with_type_count(TileType::Desert, 1);
        assert!(template.is_compatible_with_field(&field));

        let field = field.replace_at(Coordinate::new(0, 1), Tile::desert(Coordinate::new(0, 1))).unwrap();
        assert!(template.is_compatible_with_field(&field));
        let field = field.replace_at(Coordinate::new(1, 0), Tile::desert(Coordinate::new(1, 0))).unwrap();
        assert!(!template.is_compatible_with_field(&field));
        assert_eq!(template.unset_types(&field), Err(TemplateError::IncompatibleField));
    }

    #[test]
    fn unset_types_and_tokens() {
        let field = Field::empty(1)
            .replace_at(Coordinate::ORIGIN, Tile::new(Coordinate::ORIGIN, TileType::Sheep, Some(Token::Nine)).unwrap())
            .unwrap();
        let template = Template::new()
            .with_type_count(TileType::Sheep, 1)
            .with_type_count(TileType::Water, 6)
            .with_token_count(Token::Nine, 1)
            .with_token_count(Token::Ten, 0);

        assert_eq!(template.unset_types(&field), Ok(vec![TileType::Water]));
        assert_eq!(template.unset_tokens(&field), Ok(vec![]));
    }
}
