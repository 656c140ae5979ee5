use std::fmt::{Display, Formatter};

use itertools::Itertools;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use strum::{EnumString, IntoStaticStr, VariantArray};

use crate::coord::Coordinate;
use crate::template::Template;

/// The terrain of a cell.
///
/// [`Empty`](TileType::Empty) and [`Placeholder`](TileType::Placeholder) are unresolved markers:
/// they never count as valid and never appear on a solved board.
#[derive(Copy, Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd, VariantArray, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "lowercase"))]
pub enum TileType {
    /// Any valid type may be chosen.
    #[default]
    Empty,
    /// Any valid land type may be chosen (anything but water).
    Placeholder,
    /// Surrounds the island; not land.
    Water,
    /// Land without resource or token.
    Desert,
    /// Resource.
    Sheep,
    /// Resource.
    Forest,
    /// Resource, printed as `W` for wheat.
    Field,
    /// Resource.
    Mountain,
    /// Resource.
    Clay,
    /// Resource.
    Gold,
}

impl TileType {
    /// Every type a finished board may contain.
    pub const VALID: &'static [Self] = &[
        Self::Water, Self::Desert, Self::Sheep, Self::Forest, Self::Field, Self::Mountain, Self::Clay, Self::Gold,
    ];
    /// Valid types other than water.
    pub const LAND: &'static [Self] = &[
        Self::Desert, Self::Sheep, Self::Forest, Self::Field, Self::Mountain, Self::Clay, Self::Gold,
    ];
    /// Types producing resources; exactly these carry a token.
    pub const RESOURCE: &'static [Self] = &[
        Self::Sheep, Self::Forest, Self::Field, Self::Mountain, Self::Clay, Self::Gold,
    ];
    /// Valid types that never carry a token.
    pub const NON_RESOURCE: &'static [Self] = &[Self::Water, Self::Desert];

    /// Stable integer encoding, used as the value of type variables in the constraint model.
    pub const fn encoding(&self) -> i64 {
        match self {
            Self::Empty => 0,
            Self::Placeholder => 1,
            Self::Water => 2,
            Self::Desert => 3,
            Self::Sheep => 4,
            Self::Forest => 5,
            Self::Field => 6,
            Self::Mountain => 7,
            Self::Clay => 8,
            Self::Gold => 9,
        }
    }

    /// Inverse of [`Self::encoding`].
    pub fn from_encoding(encoding: i64) -> Option<Self> {
        Self::VARIANTS.iter().copied().find(|t| t.encoding() == encoding)
    }

    /// Member of [`Self::VALID`].
    pub fn is_valid(&self) -> bool {
        Self::VALID.contains(self)
    }

    /// Member of [`Self::LAND`].
    pub fn is_land(&self) -> bool {
        Self::LAND.contains(self)
    }

    /// Member of [`Self::RESOURCE`].
    pub fn is_resource(&self) -> bool {
        Self::RESOURCE.contains(self)
    }

    /// The lowercase name, e.g. `"mountain"`.
    pub fn display_name(&self) -> &'static str {
        self.into()
    }

    /// A single character used when printing a [`Field`](crate::Field).
    pub const fn glyph(&self) -> char {
        match self {
            Self::Empty => '.',
            Self::Placeholder => '?',
            Self::Water => '~',
            Self::Desert => 'D',
            Self::Sheep => 'S',
            Self::Forest => 'F',
            Self::Field => 'W',
            Self::Mountain => 'M',
            Self::Clay => 'C',
            Self::Gold => 'G',
        }
    }
}

impl Display for TileType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// A numbered token placed on a resource tile. There is no 7.
#[derive(Copy, Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, VariantArray, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "lowercase"))]
pub enum Token {
    /// 2, one pip.
    Two,
    /// 3, two pips.
    Three,
    /// 4, three pips.
    Four,
    /// 5, four pips.
    Five,
    /// 6, five pips.
    Six,
    /// 8, five pips.
    Eight,
    /// 9, four pips.
    Nine,
    /// 10, three pips.
    Ten,
    /// 11, two pips.
    Eleven,
    /// 12, one pip.
    Twelve,
}

impl Token {
    /// Encoding of "no token" in the constraint model. No [`Token`] encodes to this.
    pub const NONE_ENCODING: i64 = 0;
    /// The tokens whose pips are highest and which must never be neighbors.
    pub const HIGH_PROBABILITY: &'static [Self] = &[Self::Six, Self::Eight];

    /// The face value.
    pub const fn value(&self) -> u8 {
        match self {
            Self::Two => 2,
            Self::Three => 3,
            Self::Four => 4,
            Self::Five => 5,
            Self::Six => 6,
            Self::Eight => 8,
            Self::Nine => 9,
            Self::Ten => 10,
            Self::Eleven => 11,
            Self::Twelve => 12,
        }
    }

    /// Number of two-dice combinations rolling this token's value.
    pub const fn pips(&self) -> u8 {
        match self {
            Self::Two | Self::Twelve => 1,
            Self::Three | Self::Eleven => 2,
            Self::Four | Self::Ten => 3,
            Self::Five | Self::Nine => 4,
            Self::Six | Self::Eight => 5,
        }
    }

    /// Integer encoding in the constraint model; this is the face value.
    pub const fn encoding(&self) -> i64 {
        self.value() as i64
    }

    /// The token showing `value`, if there is one.
    pub fn from_value(value: u8) -> Option<Self> {
        Self::VARIANTS.iter().copied().find(|t| t.value() == value)
    }

    /// Inverse of [`Self::encoding`]; `None` for [`Self::NONE_ENCODING`].
    pub fn from_encoding(encoding: i64) -> Option<Self> {
        u8::try_from(encoding).ok().and_then(Self::from_value)
    }

    /// Capitalized name, e.g. `"Eleven"`.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Two => "Two",
            Self::Three => "Three",
            Self::Four => "Four",
            Self::Five => "Five",
            Self::Six => "Six",
            Self::Eight => "Eight",
            Self::Nine => "Nine",
            Self::Ten => "Ten",
            Self::Eleven => "Eleven",
            Self::Twelve => "Twelve",
        }
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// Reasons a [`Tile`] could not be constructed.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TileError {
    /// A resource tile was given no token.
    #[error("resource tile {tile_type} at {position} needs a token")]
    MissingToken {
        /// Where the tile sits.
        position: Coordinate,
        /// Its resource type.
        tile_type: TileType,
    },
    /// A non-resource tile was given a token.
    #[error("tile {tile_type} at {position} cannot carry token {token}")]
    UnexpectedToken {
        /// Where the tile sits.
        position: Coordinate,
        /// Its type, which is not a resource.
        tile_type: TileType,
        /// The token it was given.
        token: Token,
    },
}

/// One cell of a [`Field`](crate::Field).
///
/// A tile carries a token if and only if its type is a resource type.
/// Tiles are values: editing a board means replacing a tile, see [`Field::replace_tile`](crate::Field::replace_tile).
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(try_from = "TileRecord"))]
pub struct Tile {
    position: Coordinate,
    tile_type: TileType,
    token: Option<Token>,
}

/// The serialized shape of a [`Tile`], checked by [`Tile::new`] on the way in.
#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct TileRecord {
    position: Coordinate,
    tile_type: TileType,
    token: Option<Token>,
}

#[cfg(feature = "serde")]
impl TryFrom<TileRecord> for Tile {
    type Error = TileError;

    fn try_from(value: TileRecord) -> Result<Self, Self::Error> {
        Self::new(value.position, value.tile_type, value.token)
    }
}

impl Tile {
    /// A tile of any type, failing unless it carries a token exactly when `tile_type` is a resource.
    pub fn new(position: Coordinate, tile_type: TileType, token: Option<Token>) -> Result<Self, TileError> {
        match (tile_type.is_resource(), token) {
            (true, None) => Err(TileError::MissingToken { position, tile_type }),
            (false, Some(token)) => Err(TileError::UnexpectedToken { position, tile_type, token }),
            _ => Ok(Self { position, tile_type, token }),
        }
    }

    /// An unresolved tile that may become any valid type.
    pub const fn empty(position: Coordinate) -> Self {
        Self { position, tile_type: TileType::Empty, token: None }
    }

    /// An unresolved tile that may become any land type.
    pub const fn placeholder(position: Coordinate) -> Self {
        Self { position, tile_type: TileType::Placeholder, token: None }
    }

    /// A water tile.
    pub const fn water(position: Coordinate) -> Self {
        Self { position, tile_type: TileType::Water, token: None }
    }

    /// A desert tile.
    pub const fn desert(position: Coordinate) -> Self {
        Self { position, tile_type: TileType::Desert, token: None }
    }

    /// Where this tile sits.
    pub const fn position(&self) -> Coordinate {
        self.position
    }

    /// The tile's type, possibly unresolved.
    pub const fn tile_type(&self) -> TileType {
        self.tile_type
    }

    /// The token, present exactly on resource tiles.
    pub const fn token(&self) -> Option<Token> {
        self.token
    }

    /// Whether the type is resolved.
    pub fn is_valid(&self) -> bool {
        self.tile_type.is_valid()
    }

    /// Whether the type is a resource type.
    pub fn is_resource(&self) -> bool {
        self.tile_type.is_resource()
    }

    /// The valid types this tile may become, regardless of any template.
    pub fn allowed_substitutes(&self) -> &'static [TileType] {
        match self.tile_type {
            TileType::Empty => TileType::VALID,
            TileType::Placeholder => TileType::LAND,
            TileType::Water => &[TileType::Water],
            TileType::Desert => &[TileType::Desert],
            TileType::Sheep => &[TileType::Sheep],
            TileType::Forest => &[TileType::Forest],
            TileType::Field => &[TileType::Field],
            TileType::Mountain => &[TileType::Mountain],
            TileType::Clay => &[TileType::Clay],
            TileType::Gold => &[TileType::Gold],
        }
    }

    /// [`Self::allowed_substitutes`] restricted to types the template asks for at least once.
    pub fn allowed_substitutes_for_template(&self, template: &Template) -> Vec<TileType> {
        self.allowed_substitutes().iter()
            .copied()
            .filter(|t| template.type_count(*t) > 0)
            .collect_vec()
    }
}

impl Display for Tile {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.token {
            Some(token) => write!(f, "{}{:<2}", self.tile_type.glyph(), token.value()),
            None => write!(f, "{}  ", self.tile_type.glyph()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_sets_nest() {
        for t in TileType::RESOURCE {
            assert!(t.is_land());
        }
        for t in TileType::LAND {
            assert!(t.is_valid());
        }
        assert!(!TileType::Empty.is_valid());
        assert!(!TileType::Placeholder.is_valid());
        assert!(!TileType::Water.is_land());
        assert_eq!(TileType::NON_RESOURCE.len() + TileType::RESOURCE.len(), TileType::VALID.len());
    }

    #[test]
    fn encodings_are_distinct_and_reversible() {
        for t in TileType::VARIANTS {
            assert_eq!(TileType::from_encoding(t.encoding()), Some(*t));
        }
        for tk in Token::VARIANTS {
            assert_ne!(tk.encoding(), Token::NONE_ENCODING);
            assert_eq!(Token::from_encoding(tk.encoding()), Some(*tk));
        }
        assert_eq!(Token::from_value(7), None);
        assert_eq!(Token::from_encoding(Token::NONE_ENCODING), None);
    }

    #[test]
    fn pips_table() {
        let pips = Token::VARIANTS.iter().map(|t| (t.value(), t.pips())).collect_vec();
        assert_eq!(pips, vec![(2, 1), (3, 2), (4, 3), (5, 4), (6, 5), (8, 5), (9, 4), (10, 3), (11, 2), (12, 1)]);
    }

    #[test]
    fn names_parse() {
        assert_eq!("mountain".parse::<TileType>(), Ok(TileType::Mountain));
        assert_eq!("Ten".parse::<Token>(), Ok(Token::Ten));
        assert_eq!(TileType::Clay.display_name(), "clay");
        assert_eq!(Token::Eleven.display_name(), "Eleven");
    }

    #[test]
    fn token_iff_resource() {
        let pos = Coordinate::ORIGIN;
        assert!(Tile::new(pos, TileType::Forest, Some(Token::Ten)).is_ok());
        assert_eq!(
            Tile::new(pos, TileType::Forest, None),
            Err(TileError::MissingToken { position: pos, tile_type: TileType::Forest })
        );
        assert_eq!(
            Tile::new(pos, TileType::Desert, Some(Token::Two)),
            Err(TileError::UnexpectedToken { position: pos, tile_type: TileType::Desert, token: Token::Two })
        );
        assert!(Tile::new(pos, TileType::Empty, Some(Token::Two)).is_err());
    }

    #[test]
    fn substitutes() {
        let pos = Coordinate::ORIGIN;
        assert_eq!(Tile::empty(pos).allowed_substitutes(), TileType::VALID);
        assert_eq!(Tile::placeholder(pos).allowed_substitutes(), TileType::LAND);
        assert_eq!(Tile::water(pos).allowed_substitutes(), &[TileType::Water]);

        let template = Template::new()
            .with_type_count(TileType::Water, 2)
            .with_type_count(TileType::Clay, 1);
        assert_eq!(Tile::empty(pos).allowed_substitutes_for_template(&template), vec![TileType::Water, TileType::Clay]);
        assert_eq!(Tile::placeholder(pos).allowed_substitutes_for_template(&template), vec![TileType::Clay]);
        assert!(Tile::desert(pos).allowed_substitutes_for_template(&template).is_empty());
    }
}
