//! Client core for the SimCity viewer.
//!
//! The server owns the game. This crate turns its flat observation vectors
//! into boards, turns UI selections into action codes, and walks recorded
//! episodes turn by turn and movement by movement.

pub mod action;
pub mod board;
pub mod codec;
pub mod config;
pub mod cursor;
pub mod episode;
pub mod error;
pub mod notice;
pub mod play;

pub use action::{ActionChoice, ActionCode, ActionEncoder, DecodedAction, Selection};
pub use board::{Board, BuildingType, Cell, PlayerId};
pub use codec::{decode, ObservationCodec};
pub use config::{BuildingSpec, GameConfig, ObservationLayout, PlayerSpec};
pub use cursor::{CursorPosition, EpisodeCursor};
pub use episode::{Episode, Turn};
pub use error::{
    ActionError, ConfigError, DecodeError, EpisodeError, ErrorKind, PlayError, SelectionError,
};
pub use notice::{Notice, NoticeBoard};
pub use play::{PlaySession, StepSummary};
