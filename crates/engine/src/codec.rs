use crate::board::{Board, BuildingType, Cell, PlayerId};
use crate::config::ObservationLayout;
use crate::error::DecodeError;

/// Decode the board ranges of a flat observation into an N×N board.
///
/// Only the builder and building-type ranges are read. A vector shorter than
/// `layout.min_len()` is rejected as a whole.
pub fn decode(vector: &[f64], layout: &ObservationLayout) -> Result<Board, DecodeError> {
    let expected = layout.min_len();
    if vector.len() < expected {
        return Err(DecodeError::LengthMismatch {
            expected,
            actual: vector.len(),
        });
    }

    let n = layout.grid_size;
    let builders = &vector[layout.builder_offset..layout.builder_offset + n * n];
    let types = &vector[layout.type_offset..layout.type_offset + n * n];
    let cells = builders
        .iter()
        .zip(types)
        .map(|(&builder, &ty)| Cell {
            owner: owner_of(builder),
            building: building_of(ty),
        })
        .collect();
    Ok(Board::from_cells(n, cells))
}

/// Observations arrive as JSON numbers, so indices may come through as
/// `2.0`; round before use.
fn as_index(v: f64) -> i64 {
    v.round() as i64
}

/// Values outside `i32` cannot be a taxonomy index; show them as unbuilt.
fn building_of(ty: f64) -> BuildingType {
    i32::try_from(as_index(ty)).map_or(BuildingType::EMPTY, BuildingType)
}

fn owner_of(builder: f64) -> Option<PlayerId> {
    usize::try_from(as_index(builder))
        .ok()
        .map(PlayerId::from_index)
}

/// Stateless wrapper carrying the layout, with the empty-board fallback used
/// everywhere a board has to be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObservationCodec {
    layout: ObservationLayout,
}

impl ObservationCodec {
    pub fn new(layout: ObservationLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &ObservationLayout {
        &self.layout
    }

    pub fn decode(&self, vector: &[f64]) -> Result<Board, DecodeError> {
        decode(vector, &self.layout)
    }

    /// Decode, or an all-empty board of the configured size if the vector is
    /// too short. Never keeps a stale board around.
    pub fn decode_or_empty(&self, vector: &[f64]) -> Board {
        self.decode_checked(vector).0
    }

    /// Same as [`decode_or_empty`](Self::decode_or_empty), also handing back
    /// the error that forced the fallback.
    pub fn decode_checked(&self, vector: &[f64]) -> (Board, Option<DecodeError>) {
        match self.decode(vector) {
            Ok(board) => (board, None),
            Err(err) => {
                tracing::warn!(
                    expected = self.layout.min_len(),
                    actual = vector.len(),
                    "observation decode failed, showing empty board: {err}"
                );
                (Board::empty(self.layout.grid_size), Some(err))
            }
        }
    }
}
