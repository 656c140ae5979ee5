use std::fmt::{Display, Formatter};
use std::num::ParseIntError;
use std::str::FromStr;

use itertools::Itertools;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use strum::VariantArray;

/// An axial `(q, r)` position of a hex cell.
///
/// No validation happens beyond integrality; a [`Coordinate`] is meaningful on an unbounded plane
/// and only a [`Field`](crate::Field) decides which positions exist.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Coordinate {
    /// Column axis.
    pub q: i32,
    /// Row axis.
    pub r: i32,
}

/// The six neighbor directions of a pointy-top hex, in canonical order.
///
/// The order matters: the corner shared by directions `k` and `k - 1` is how intersections are found,
/// see [`Coordinate::corner_pairs`].
#[derive(Copy, Clone, VariantArray, Eq, PartialEq, Hash, Debug, Ord, PartialOrd)]
pub enum HexDirection {
    /// `(1, 0)`
    East,
    /// `(1, -1)`
    NorthEast,
    /// `(0, -1)`
    NorthWest,
    /// `(-1, 0)`
    West,
    /// `(-1, 1)`
    SouthWest,
    /// `(0, 1)`
    SouthEast,
}

impl HexDirection {
    /// The axial offset of one step in this direction.
    pub const fn offset(&self) -> (i32, i32) {
        match self {
            Self::East => (1, 0),
            Self::NorthEast => (1, -1),
            Self::NorthWest => (0, -1),
            Self::West => (-1, 0),
            Self::SouthWest => (-1, 1),
            Self::SouthEast => (0, 1),
        }
    }

    /// The direction one step clockwise in canonical order, i.e. index `k - 1` with wraparound.
    pub const fn previous(&self) -> Self {
        match self {
            Self::East => Self::SouthEast,
            Self::NorthEast => Self::East,
            Self::NorthWest => Self::NorthEast,
            Self::West => Self::NorthWest,
            Self::SouthWest => Self::West,
            Self::SouthEast => Self::SouthWest,
        }
    }
}

impl Coordinate {
    /// The center cell of every field built by [`Field::empty`](crate::Field::empty).
    pub const ORIGIN: Self = Self::new(0, 0);

    /// The cell at `(q, r)`.
    pub const fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    /// The implied third cube coordinate.
    #[inline]
    pub const fn s(&self) -> i32 {
        -self.q - self.r
    }

    /// Which ring around the origin this position sits on, i.e. `max(|q|, |r|, |q + r|)`.
    pub fn distance_from_origin(&self) -> u32 {
        self.q.unsigned_abs()
            .max(self.r.unsigned_abs())
            .max(self.s().unsigned_abs())
    }

    /// The adjacent cell one step in `direction`.
    pub fn neighbor(&self, direction: HexDirection) -> Self {
        let (dq, dr) = direction.offset();
        Self::new(self.q + dq, self.r + dr)
    }

    /// All six neighbors, in the order of [`HexDirection::VARIANTS`].
    pub fn neighbors(&self) -> Vec<Self> {
        HexDirection::VARIANTS.iter()
            .map(|dir| self.neighbor(*dir))
            .collect_vec()
    }

    /// For each of the six corners of this hex, the two other cells touching that corner.
    ///
    /// Corner `k` lies between the neighbors in directions `k` and `k - 1`.
    pub fn corner_pairs(&self) -> Vec<(Self, Self)> {
        HexDirection::VARIANTS.iter()
            .map(|dir| (self.neighbor(*dir), self.neighbor(dir.previous())))
            .collect_vec()
    }

    /// A stable string key, `"q:r"`.
    pub fn key(&self) -> String {
        format!("{}:{}", self.q, self.r)
    }
}

impl Display for Coordinate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.q, self.r)
    }
}

/// Reasons a coordinate key could not be parsed.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CoordinateParseError {
    /// The key did not contain exactly one `:` separator.
    #[error("coordinate key \"{0}\" is not of the form q:r")]
    Malformed(String),
    /// One of the two components was not an integer.
    #[error("coordinate component is not an integer: {0}")]
    Component(#[from] ParseIntError),
}

impl FromStr for Coordinate {
    type Err = CoordinateParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (q, r) = s.split(':')
            .collect_tuple()
            .ok_or_else(|| CoordinateParseError::Malformed(s.to_string()))?;

        Ok(Self::new(q.trim().parse()?, r.trim().parse()?))
    }
}
