//! Integer action codes for the server's action space.
//!
//! ```text
//! 0                         skip
//! 1 + b * N² + cell         build type b at cell (cell = row * N + col)
//! ```
//!
//! The ordering (skip, then building-major, cell-minor) is the server's
//! contract; if its building count or order changes this has to follow.

use crate::board::BuildingType;
use crate::config::GameConfig;
use crate::error::ActionError;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionCode(pub u32);

impl ActionCode {
    pub const SKIP: Self = Self(0);
}

impl fmt::Display for ActionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub row: usize,
    pub col: usize,
}

impl Selection {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    pub fn cell_id(&self, grid_size: usize) -> usize {
        self.row * grid_size + self.col
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionChoice {
    Skip,
    Build(u32),
}

impl std::str::FromStr for ActionChoice {
    type Err = String;

    /// `"skip"` or `""` is a skip; anything else must be a building index.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("skip") {
            return Ok(Self::Skip);
        }
        s.parse::<u32>()
            .map(Self::Build)
            .map_err(|_| format!("unknown action choice: {s:?}"))
    }
}

impl fmt::Display for ActionChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skip => f.write_str("skip"),
            Self::Build(b) => write!(f, "{b}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecodedAction {
    Skip,
    Build { building: BuildingType, cell: usize },
}

impl DecodedAction {
    pub fn describe(&self, config: &GameConfig) -> String {
        match *self {
            Self::Skip => "skip".to_string(),
            Self::Build { building, cell } => {
                let n = config.grid_size.max(1);
                format!(
                    "{} at ({}, {})",
                    config.building_name(building),
                    cell / n,
                    cell % n
                )
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionEncoder {
    grid_size: usize,
    building_count: usize,
}

impl ActionEncoder {
    pub fn new(grid_size: usize, building_count: usize) -> Self {
        Self {
            grid_size,
            building_count,
        }
    }

    pub fn from_config(config: &GameConfig) -> Self {
        Self::new(config.grid_size, config.buildings.len())
    }

    /// N², saturating at `u32::MAX` for grids no action code can address.
    fn cells(&self) -> u32 {
        self.grid_size
            .checked_mul(self.grid_size)
            .and_then(|c| u32::try_from(c).ok())
            .unwrap_or(u32::MAX)
    }

    /// Highest valid code.
    pub fn max_code(&self) -> u32 {
        u32::try_from(self.building_count)
            .unwrap_or(u32::MAX)
            .saturating_mul(self.cells())
    }

    /// Compute the code for a UI selection. Skip (or no choice, or no
    /// selection) is always `0`. Legality of the selection is not checked
    /// here; a build that does not fit in a `u32` code also comes out as
    /// skip.
    pub fn encode(&self, selection: Option<Selection>, choice: Option<ActionChoice>) -> ActionCode {
        let (Some(sel), Some(ActionChoice::Build(b))) = (selection, choice) else {
            return ActionCode::SKIP;
        };
        let code = sel
            .row
            .checked_mul(self.grid_size)
            .and_then(|r| r.checked_add(sel.col))
            .and_then(|cell| u32::try_from(cell).ok())
            .and_then(|cell| b.checked_mul(self.cells())?.checked_add(cell)?.checked_add(1));
        match code {
            Some(code) => ActionCode(code),
            None => {
                tracing::warn!(
                    building = b,
                    row = sel.row,
                    col = sel.col,
                    "action code overflows, sending skip"
                );
                ActionCode::SKIP
            }
        }
    }

    pub fn decode(&self, code: ActionCode) -> Result<DecodedAction, ActionError> {
        if code == ActionCode::SKIP {
            return Ok(DecodedAction::Skip);
        }
        let max = self.max_code();
        if code.0 > max || self.cells() == 0 {
            return Err(ActionError::OutOfRange { code: code.0, max });
        }
        let rest = code.0 - 1;
        Ok(DecodedAction::Build {
            building: BuildingType((rest / self.cells()) as i32),
            cell: (rest % self.cells()) as usize,
        })
    }

    /// Reject building indices the server's action space does not have.
    pub fn check_choice(&self, choice: ActionChoice) -> Result<ActionChoice, ActionError> {
        match choice {
            ActionChoice::Build(b) if b as usize >= self.building_count => {
                Err(ActionError::UnknownBuilding {
                    building: b,
                    count: self.building_count as u32,
                })
            }
            c => Ok(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoder() -> ActionEncoder {
        ActionEncoder::from_config(&GameConfig::default())
    }

    #[test]
    fn house_at_row2_col3_is_28() {
        let code = encoder().encode(Some(Selection::new(2, 3)), Some(ActionChoice::Build(1)));
        assert_eq!(code, ActionCode(28));
        assert_eq!(
            encoder().decode(code).unwrap(),
            DecodedAction::Build {
                building: BuildingType(1),
                cell: 11
            }
        );
    }

    #[test]
    fn skip_ignores_selection() {
        let e = encoder();
        assert_eq!(e.encode(Some(Selection::new(1, 1)), Some(ActionChoice::Skip)), ActionCode::SKIP);
        assert_eq!(e.encode(Some(Selection::new(1, 1)), None), ActionCode::SKIP);
        assert_eq!(e.encode(None, Some(ActionChoice::Build(2))), ActionCode::SKIP);
        assert_eq!(e.decode(ActionCode::SKIP).unwrap(), DecodedAction::Skip);
    }

    #[test]
    fn decode_rejects_codes_past_action_space() {
        let e = encoder();
        assert_eq!(e.max_code(), 48);
        assert!(e.decode(ActionCode(48)).is_ok());
        assert_eq!(
            e.decode(ActionCode(49)),
            Err(ActionError::OutOfRange { code: 49, max: 48 })
        );
    }

    #[test]
    fn oversized_build_encodes_as_skip() {
        let e = encoder();
        assert_eq!(
            e.encode(Some(Selection::new(0, 0)), Some(ActionChoice::Build(u32::MAX / 8))),
            ActionCode::SKIP
        );
        assert_eq!(
            e.encode(Some(Selection::new(usize::MAX, 1)), Some(ActionChoice::Build(0))),
            ActionCode::SKIP
        );

        let huge = ActionEncoder::new(usize::MAX, 3);
        assert_eq!(huge.max_code(), u32::MAX);
    }

    #[test]
    fn choices_parse_from_ui_values() {
        assert_eq!("skip".parse::<ActionChoice>().unwrap(), ActionChoice::Skip);
        assert_eq!("".parse::<ActionChoice>().unwrap(), ActionChoice::Skip);
        assert_eq!("2".parse::<ActionChoice>().unwrap(), ActionChoice::Build(2));
        assert!("mall".parse::<ActionChoice>().is_err());
        assert!(encoder().check_choice(ActionChoice::Build(3)).is_err());
        assert!(encoder().check_choice(ActionChoice::Build(2)).is_ok());
    }

    #[test]
    fn describe_names_building_and_cell() {
        let c = GameConfig::default();
        let d = encoder().decode(ActionCode(28)).unwrap();
        assert_eq!(d.describe(&c), "House at (2, 3)");
        assert_eq!(DecodedAction::Skip.describe(&c), "skip");
    }
}
