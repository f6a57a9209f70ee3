use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Building type index as the server encodes it; `-1` is an unbuilt parcel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildingType(pub i32);

impl BuildingType {
    pub const EMPTY: Self = Self(-1);

    pub fn is_empty(self) -> bool {
        self.0 < 0
    }

    /// Taxonomy index, `None` for empty.
    pub fn index(self) -> Option<usize> {
        usize::try_from(self.0).ok()
    }
}

/// A seat at the table. Displayed one-based (`P1`, `P2`, ...), stored
/// zero-based as the server's builder index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerId(usize);

impl PlayerId {
    pub fn from_index(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0 + 1)
    }
}

impl std::str::FromStr for PlayerId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.strip_prefix('P')
            .and_then(|n| n.parse::<usize>().ok())
            .filter(|n| *n >= 1)
            .map(|n| Self(n - 1))
            .ok_or_else(|| format!("not a player id: {s:?}"))
    }
}

impl Serialize for PlayerId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PlayerId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub owner: Option<PlayerId>,
    #[serde(rename = "type")]
    pub building: BuildingType,
}

impl Cell {
    pub const EMPTY: Self = Self {
        owner: None,
        building: BuildingType::EMPTY,
    };

    pub fn is_empty(&self) -> bool {
        self.building.is_empty()
    }
}

/// Square row-major grid of cells. Serializes as `[[Cell; N]; N]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    size: usize,
    cells: Vec<Cell>,
}

impl Board {
    pub fn empty(size: usize) -> Self {
        Self {
            size,
            cells: vec![Cell::EMPTY; size * size],
        }
    }

    /// `cells` must hold exactly `size * size` entries in row-major order.
    pub(crate) fn from_cells(size: usize, cells: Vec<Cell>) -> Self {
        debug_assert_eq!(cells.len(), size * size);
        Self { size, cells }
    }

    /// Rows on the board (N).
    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&Cell> {
        if row >= self.size || col >= self.size {
            return None;
        }
        self.cells.get(row * self.size + col)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        // chunks(0) panics; a 0x0 board has no rows.
        self.cells.chunks(self.size.max(1))
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn is_all_empty(&self) -> bool {
        self.cells.iter().all(Cell::is_empty)
    }
}

impl Serialize for Board {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.size))?;
        for row in self.rows() {
            seq.serialize_element(row)?;
        }
        seq.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn player_ids_are_one_based_on_display() {
        assert_eq!(PlayerId::from_index(0).to_string(), "P1");
        assert_eq!(PlayerId::from_index(2).to_string(), "P3");
        assert_eq!("P3".parse::<PlayerId>().unwrap(), PlayerId::from_index(2));
        assert!("P0".parse::<PlayerId>().is_err());
        assert!("X1".parse::<PlayerId>().is_err());
    }

    #[test]
    fn empty_board_serializes_as_nested_rows() {
        let board = Board::empty(2);
        assert_eq!(
            serde_json::to_value(&board).unwrap(),
            json!([
                [{"owner": null, "type": -1}, {"owner": null, "type": -1}],
                [{"owner": null, "type": -1}, {"owner": null, "type": -1}],
            ])
        );
    }

    #[test]
    fn get_is_bounds_checked() {
        let board = Board::empty(4);
        assert!(board.get(3, 3).is_some());
        assert!(board.get(4, 0).is_none());
        assert!(board.get(0, 4).is_none());
        assert_eq!(board.rows().count(), 4);
        assert!(board.rows().all(|r| r.len() == 4));
    }
}
