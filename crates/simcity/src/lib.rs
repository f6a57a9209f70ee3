//! One dependency for SimCity viewer clients.
//!
//! Re-exports the client core and the wire types, plus a prelude with what a
//! typical frontend needs to decode boards and submit actions.

pub use simcity_engine as engine;
pub use simcity_protocol as protocol;

pub mod prelude {
    pub use simcity_engine::{
        ActionChoice, ActionCode, ActionEncoder, Board, EpisodeCursor, GameConfig,
        ObservationCodec, PlaySession, PlayerId, Selection,
    };
    pub use simcity_protocol::{ObservationContainer, StepRequest, UiUpdate};
}
