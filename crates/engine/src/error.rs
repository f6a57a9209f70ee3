use serde::{Deserialize, Serialize};

/// User-facing error categories. Every engine error collapses into one of
/// these before it is shown; none of them ends the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    LengthMismatch,
    IllegalSelection,
    RpcFailure,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("observation too short: expected at least {expected} values but got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
}

impl DecodeError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::LengthMismatch
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("grid size must be at least 1")]
    EmptyGrid,
    #[error("building taxonomy is empty")]
    NoBuildings,
    #[error("player roster is empty")]
    NoPlayers,
    #[error("human player index {index} outside roster of {players}")]
    HumanOutsideRoster { index: usize, players: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EpisodeError {
    #[error("episode has no turns")]
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    #[error("action code {code} outside action space [0, {max}]")]
    OutOfRange { code: u32, max: u32 },
    #[error("building index {building} outside taxonomy of {count}")]
    UnknownBuilding { building: u32, count: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    #[error("cell ({row}, {col}) is off the {size}x{size} board")]
    OutOfBounds { row: usize, col: usize, size: usize },
    #[error("Only empty parcels can be selected.")]
    Occupied { row: usize, col: usize },
}

impl SelectionError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::IllegalSelection
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlayError {
    #[error("Please select an empty cell first.")]
    NoSelection,
}

impl PlayError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::IllegalSelection
    }
}
