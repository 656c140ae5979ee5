use std::collections::HashMap;
use std::fmt::{Display, Formatter};

use itertools::Itertools;
use petgraph::graphmap::UnGraphMap;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use unordered_pair::UnorderedPair;

use crate::coord::Coordinate;
use crate::tile::{Tile, TileType, Token};

/// Reasons a [`Field`] operation may fail.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FieldError {
    /// No cell of the field sits at the given position.
    #[error("no tile at {0} in this field")]
    TileNotFound(Coordinate),
    /// Two tiles were given the same position.
    #[error("more than one tile at {0}")]
    DuplicatePosition(Coordinate),
    /// A replacement tile names a different position than the tile it replaces.
    #[error("replacement for {expected} is positioned at {actual}")]
    PositionMismatch {
        /// The position being replaced.
        expected: Coordinate,
        /// The position the replacement names.
        actual: Coordinate,
    },
}

/// A pair of tile indices `(i, j)` with `i < j` whose cells share an edge.
pub type NeighborPair = UnorderedPair<usize>;
/// Three tile indices, ascending, whose cells meet at one vertex.
pub type IntersectionTriple = [usize; 3];

/// An ordered, fixed-size collection of tiles, one per cell.
///
/// The order of [`Self::tiles`] is canonical: constraint variables, rendering and serialization all index by it.
/// A field is never edited in place; [`Self::replace_tile`] yields a new one.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(try_from = "FieldRecord"))]
pub struct Field {
    tiles: Vec<Tile>,
}

/// The serialized shape of a [`Field`], checked by [`Field::from_tiles`] on the way in.
#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct FieldRecord {
    tiles: Vec<Tile>,
}

#[cfg(feature = "serde")]
impl TryFrom<FieldRecord> for Field {
    type Error = FieldError;

    fn try_from(value: FieldRecord) -> Result<Self, Self::Error> {
        Self::from_tiles(value.tiles)
    }
}

impl Field {
    /// A field of [`TileType::Empty`] tiles covering every cell within `radius` steps of the origin.
    ///
    /// Cells are enumerated by ascending `q`, then ascending `r`; a field of radius `n` has `3n² + 3n + 1` cells.
    pub fn empty(radius: u32) -> Self {
        let n = radius as i32;
        let tiles = (-n..=n)
            .flat_map(|q| ((-n).max(-q - n)..=n.min(-q + n)).map(move |r| Coordinate::new(q, r)))
            .map(Tile::empty)
            .collect_vec();

        Self { tiles }
    }

    /// A field holding exactly `tiles`, in the given order.
    pub fn from_tiles(tiles: Vec<Tile>) -> Result<Self, FieldError> {
        if let Some(dupe) = tiles.iter().map(Tile::position).duplicates().next() {
            return Err(FieldError::DuplicatePosition(dupe));
        }

        Ok(Self { tiles })
    }

    /// Every tile, in canonical order.
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Whether the field has no cells at all. Unrelated to [`TileType::Empty`].
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Index into [`Self::tiles`] of the cell at `position`.
    pub fn index_of(&self, position: Coordinate) -> Option<usize> {
        self.tiles.iter().position(|t| t.position() == position)
    }

    /// The tile at `position`.
    pub fn get(&self, position: Coordinate) -> Option<&Tile> {
        self.tiles.iter().find(|t| t.position() == position)
    }

    /// Whether every tile has been resolved to a valid type.
    pub fn is_resolved(&self) -> bool {
        self.tiles.iter().all(Tile::is_valid)
    }

    /// A new field identical to this one except that the cell holding `tile` now holds `replacement`.
    pub fn replace_tile(&self, tile: &Tile, replacement: Tile) -> Result<Self, FieldError> {
        self.replace_at(tile.position(), replacement)
    }

    /// A new field identical to this one except that the cell at `position` now holds `replacement`.
    pub fn replace_at(&self, position: Coordinate, replacement: Tile) -> Result<Self, FieldError> {
        let existing = self.index_of(position).ok_or(FieldError::TileNotFound(position))?;
        if replacement.position() != position {
            return Err(FieldError::PositionMismatch { expected: position, actual: replacement.position() });
        }

        let mut tiles = self.tiles.clone();
        tiles[existing] = replacement;
        Ok(Self { tiles })
    }

    /// Number of tiles currently of `tile_type`.
    pub fn count_by_type(&self, tile_type: TileType) -> usize {
        self.tiles.iter().filter(|t| t.tile_type() == tile_type).count()
    }

    /// Number of tiles currently carrying `token`.
    pub fn count_by_token(&self, token: Token) -> usize {
        self.tiles.iter().filter(|t| t.token() == Some(token)).count()
    }

    fn index_by_position(&self) -> HashMap<Coordinate, usize> {
        self.tiles.iter()
            .enumerate()
            .map(|(i, t)| (t.position(), i))
            .collect()
    }

    /// The cell adjacency graph; nodes are tile indices.
    pub fn adjacency(&self) -> UnGraphMap<usize, ()> {
        let index_by_position = self.index_by_position();
        let mut graph = UnGraphMap::with_capacity(self.tiles.len(), self.tiles.len() * 3);

        for (i, tile) in self.tiles.iter().enumerate() {
            graph.add_node(i);
            for neighbor in tile.position().neighbors() {
                // add each edge from its lower indexed end only
                if let Some(&j) = index_by_position.get(&neighbor).filter(|j| **j > i) {
                    graph.add_edge(i, j, ());
                }
            }
        }

        graph
    }

    /// Every pair of neighboring cells, exactly once.
    pub fn neighbor_pairs(&self) -> Vec<NeighborPair> {
        self.adjacency()
            .all_edges()
            .map(|(a, b, _)| UnorderedPair(a.min(b), a.max(b)))
            .collect_vec()
    }

    /// Every vertex at which three cells of this field meet, exactly once.
    ///
    /// A triple is emitted only from its lowest indexed cell, so no global deduplication is necessary.
    /// Vertices on the border touch fewer than three cells and are skipped.
    pub fn intersection_triples(&self) -> Vec<IntersectionTriple> {
        let index_by_position = self.index_by_position();
        let mut out = Vec::new();

        for (i, tile) in self.tiles.iter().enumerate() {
            for (a, b) in tile.position().corner_pairs() {
                let (Some(&j), Some(&l)) = (index_by_position.get(&a), index_by_position.get(&b)) else {
                    continue;
                };

                if i < j && i < l {
                    out.push(if j < l { [i, j, l] } else { [i, l, j] });
                }
            }
        }

        out
    }
}

impl Display for Field {
    /// Lays out tiles by row `r`, staggered so that each row sits half a cell further right than the one above.
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // horizontal position in half-cell units
        let column = |c: Coordinate| 2 * c.q + c.r;
        let Some(min_column) = self.tiles.iter().map(|t| column(t.position())).min() else {
            return Ok(());
        };

        let rows = self.tiles.iter()
            .sorted_by_key(|t| (t.position().r, t.position().q))
            .chunk_by(|t| t.position().r);

        for (_, row) in &rows {
            let mut line = String::new();
            for tile in row {
                let start = ((column(tile.position()) - min_column) * 2) as usize;
                while line.len() < start {
                    line.push(' ');
                }
                line.push_str(&tile.to_string());
            }
            writeln!(f, "{}", line.trim_end())?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn empty_field_sizes() {
        for n in 0..6u32 {
            let field = Field::empty(n);
            let expected = (3 * n * n + 3 * n + 1) as usize;
            assert_eq!(field.len(), expected);
            assert_eq!(field.tiles().iter().map(Tile::position).collect::<HashSet<_>>().len(), expected);
            assert!(field.tiles().iter().all(|t| t.tile_type() == TileType::Empty && t.token().is_none()));
            assert!(field.tiles().iter().all(|t| t.position().distance_from_origin() <= n));
        }
    }

    #[test]
    fn empty_field_order() {
        let positions = Field::empty(1).tiles().iter().map(|t| (t.position().q, t.position().r)).collect_vec();
        assert_eq!(positions, vec![(-1, 0), (-1, 1), (0, -1), (0, 0), (0, 1), (1, -1), (1, 0)]);
    }

    #[test]
    fn replace_tile() {
        let field = Field::empty(1);
        let target = field.tiles()[3];
        let water = Tile::water(target.position());

        let replaced = field.replace_tile(&target, water).unwrap();
        assert_eq!(replaced.tiles()[3], water);
        assert_eq!(replaced.count_by_type(TileType::Water), 1);
        // `field` itself is unchanged
        assert_eq!(field.count_by_type(TileType::Water), 0);

        assert_eq!(field.replace_tile(&target, target).unwrap(), field);

        let outside = Tile::water(Coordinate::new(5, 5));
        assert_eq!(field.replace_tile(&outside, outside), Err(FieldError::TileNotFound(Coordinate::new(5, 5))));
        assert_eq!(
            field.replace_tile(&target, outside),
            Err(FieldError::PositionMismatch { expected: target.position(), actual: outside.position() })
        );
    }

    #[test]
    fn from_tiles_rejects_duplicates() {
        let pos = Coordinate::new(1, 1);
        assert_eq!(
            Field::from_tiles(vec![Tile::water(pos), Tile::desert(pos)]),
            Err(FieldError::DuplicatePosition(pos))
        );
        assert!(Field::from_tiles(vec![]).unwrap().is_empty());
    }

    #[test]
    fn neighbor_pairs_small() {
        let pairs = Field::empty(1).neighbor_pairs();
        assert_eq!(pairs.len(), 12);
        assert!(pairs.iter().all(|UnorderedPair(i, j)| i < j));
        assert_eq!(pairs.iter().map(|UnorderedPair(i, j)| (*i, *j)).collect::<HashSet<_>>().len(), 12);
    }

    #[test]
    fn neighbor_pairs_count_edges() {
        // a hexagon of radius n has 9n² + 3n internal edges
        for n in 0..5u32 {
            assert_eq!(Field::empty(n).neighbor_pairs().len(), (9 * n * n + 3 * n) as usize);
        }
    }

    #[test]
    fn intersection_triples_small() {
        let field = Field::empty(1);
        let center = field.index_of(Coordinate::ORIGIN).unwrap();
        let triples = field.intersection_triples();
        assert_eq!(triples.len(), 6);

        let adjacency = field.adjacency();
        for [a, b, c] in &triples {
            assert!(a < b && b < c);
            assert!([a, b, c].contains(&&center));
            assert!(adjacency.contains_edge(*a, *b));
            assert!(adjacency.contains_edge(*b, *c));
            assert!(adjacency.contains_edge(*a, *c));
        }
        assert_eq!(triples.iter().collect::<HashSet<_>>().len(), 6);
    }

    #[test]
    fn intersection_triples_count() {
        // interior vertices of a hexagon of radius n: 6n²
        for n in 0..5u32 {
            assert_eq!(Field::empty(n).intersection_triples().len(), (6 * n * n) as usize);
        }
    }

    #[test]
    fn display() {
        let field = Field::empty(1)
            .replace_at(Coordinate::ORIGIN, Tile::desert(Coordinate::ORIGIN))
            .unwrap()
            .replace_at(Coordinate::new(1, 0), Tile::new(Coordinate::new(1, 0), TileType::Mountain, Some(Token::Ten)).unwrap())
            .unwrap()
            .replace_at(Coordinate::new(0, -1), Tile::placeholder(Coordinate::new(0, -1)))
            .unwrap();

        assert_eq!(format!("{}", field), "  ?   .
.   D   M10
  .   .
");
    }
}
