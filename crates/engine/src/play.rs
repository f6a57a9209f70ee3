use crate::action::{ActionChoice, ActionCode, ActionEncoder, DecodedAction, Selection};
use crate::board::Board;
use crate::codec::ObservationCodec;
use crate::config::GameConfig;
use crate::error::{ActionError, DecodeError, PlayError, SelectionError};
use serde::Serialize;
use simcity_protocol::{player_resources, ResourceRecord, StepResponse};
use std::collections::BTreeMap;
use std::sync::Arc;

/// What the server reported for the last submitted step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepSummary {
    pub t_env: i64,
    pub actions_taken: Vec<i64>,
    pub info: serde_json::Value,
    pub resources: BTreeMap<String, ResourceRecord>,
}

impl StepSummary {
    pub fn from_response(resp: &StepResponse) -> Self {
        Self {
            t_env: resp.t_env,
            actions_taken: resp.actions_taken.clone(),
            info: resp.info.clone(),
            resources: player_resources(&resp.info),
        }
    }

    /// Human-readable form of `actions_taken`; codes outside the action
    /// space are shown raw.
    pub fn describe_actions(&self, config: &GameConfig) -> Vec<String> {
        let encoder = ActionEncoder::from_config(config);
        self.actions_taken
            .iter()
            .map(|&code| {
                u32::try_from(code)
                    .ok()
                    .and_then(|c| encoder.decode(ActionCode(c)).ok())
                    .map(|d: DecodedAction| d.describe(config))
                    .unwrap_or_else(|| code.to_string())
            })
            .collect()
    }
}

/// Live game state for the human seat: the board, the pending selection and
/// action choice, and the last step result.
#[derive(Debug, Clone)]
pub struct PlaySession {
    config: Arc<GameConfig>,
    codec: ObservationCodec,
    encoder: ActionEncoder,
    board: Board,
    selection: Option<Selection>,
    choice: Option<ActionChoice>,
    last_step: Option<StepSummary>,
}

impl PlaySession {
    pub fn new(config: Arc<GameConfig>) -> Self {
        Self {
            codec: ObservationCodec::new(config.layout()),
            encoder: ActionEncoder::from_config(&config),
            board: Board::empty(config.grid_size),
            config,
            selection: None,
            choice: None,
            last_step: None,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn selection(&self) -> Option<Selection> {
        self.selection
    }

    pub fn choice(&self) -> Option<ActionChoice> {
        self.choice
    }

    pub fn last_step(&self) -> Option<&StepSummary> {
        self.last_step.as_ref()
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Only empty parcels on the board can be selected.
    pub fn select(&mut self, row: usize, col: usize) -> Result<Selection, SelectionError> {
        let size = self.board.size();
        let cell = self
            .board
            .get(row, col)
            .ok_or(SelectionError::OutOfBounds { row, col, size })?;
        if !cell.is_empty() {
            return Err(SelectionError::Occupied { row, col });
        }
        let sel = Selection::new(row, col);
        self.selection = Some(sel);
        Ok(sel)
    }

    pub fn choose(&mut self, choice: ActionChoice) -> Result<(), ActionError> {
        self.choice = Some(self.encoder.check_choice(choice)?);
        Ok(())
    }

    /// Code to submit for the current selection. Selection and choice stay
    /// in place until the step result comes back.
    pub fn commit(&self) -> Result<ActionCode, PlayError> {
        let Some(selection) = self.selection else {
            return Err(PlayError::NoSelection);
        };
        Ok(self.encoder.encode(Some(selection), self.choice))
    }

    /// Show the reset observation and drop any pending input. On `Err` the
    /// board is the empty fallback.
    pub fn apply_reset(&mut self, observation: &[f64]) -> Result<(), DecodeError> {
        self.selection = None;
        self.choice = None;
        self.last_step = None;
        self.load_board(observation)
    }

    /// `observation` is `None` when the server sent no vector; the board is
    /// then left as it was.
    pub fn apply_step(
        &mut self,
        observation: Option<&[f64]>,
        summary: StepSummary,
    ) -> Result<(), DecodeError> {
        self.last_step = Some(summary);
        self.selection = None;
        self.choice = None;
        match observation {
            Some(v) => self.load_board(v),
            None => Ok(()),
        }
    }

    fn load_board(&mut self, observation: &[f64]) -> Result<(), DecodeError> {
        let (board, err) = self.codec.decode_checked(observation);
        self.board = board;
        err.map_or(Ok(()), Err)
    }

    /// Resources for the roster, server values over configured defaults.
    pub fn resources(&self) -> BTreeMap<String, ResourceRecord> {
        merged_resources(&self.config, self.last_step.as_ref().map(|s| &s.resources))
    }
}

pub fn merged_resources(
    config: &GameConfig,
    live: Option<&BTreeMap<String, ResourceRecord>>,
) -> BTreeMap<String, ResourceRecord> {
    config
        .roster()
        .map(|(id, spec)| {
            let name = id.to_string();
            let r = live
                .and_then(|m| m.get(&name))
                .copied()
                .unwrap_or(spec.resources);
            (name, r)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn session() -> PlaySession {
        PlaySession::new(Arc::new(GameConfig::default()))
    }

    fn observation_with_house_at(cell: usize) -> Vec<f64> {
        let layout = GameConfig::default().layout();
        let mut v = vec![-1.0; layout.min_len()];
        v[layout.builder_offset + cell] = 1.0;
        v[layout.type_offset + cell] = 1.0;
        v
    }

    #[test]
    fn occupied_cells_cannot_be_selected() {
        let mut s = session();
        s.apply_reset(&observation_with_house_at(5)).unwrap();
        assert_eq!(
            s.select(1, 1),
            Err(SelectionError::Occupied { row: 1, col: 1 })
        );
        assert_eq!(s.selection(), None);
        assert!(s.select(2, 3).is_ok());
        assert!(matches!(
            s.select(4, 0),
            Err(SelectionError::OutOfBounds { .. })
        ));
        assert_eq!(s.selection(), Some(Selection::new(2, 3)));
    }

    #[test]
    fn commit_needs_a_selection() {
        let mut s = session();
        assert_eq!(s.commit(), Err(PlayError::NoSelection));
        s.select(2, 3).unwrap();
        assert_eq!(s.commit(), Ok(ActionCode::SKIP));
        s.choose(ActionChoice::Build(1)).unwrap();
        assert_eq!(s.commit(), Ok(ActionCode(28)));
        s.choose(ActionChoice::Skip).unwrap();
        assert_eq!(s.commit(), Ok(ActionCode::SKIP));
    }

    #[test]
    fn unknown_building_choice_is_rejected() {
        let mut s = session();
        assert!(s.choose(ActionChoice::Build(9)).is_err());
        assert_eq!(s.choice(), None);
    }

    #[test]
    fn step_clears_selection_and_records_summary() {
        let mut s = session();
        s.select(0, 0).unwrap();
        s.choose(ActionChoice::Build(0)).unwrap();
        let resp = StepResponse {
            next_observation: simcity_protocol::ObservationContainer::Batched(vec![vec![
                observation_with_house_at(0),
            ]]),
            t_env: 4,
            actions_taken: vec![1, 0, 28],
            info: json!({"player_resources": {"P2": {"money": 1, "reputation": 2}}}),
        };
        s.apply_step(resp.next_observation.first_vector(), StepSummary::from_response(&resp))
            .unwrap();

        assert_eq!(s.selection(), None);
        assert_eq!(s.choice(), None);
        assert!(!s.board().get(0, 0).unwrap().is_empty());
        let last = s.last_step().unwrap();
        assert_eq!(last.t_env, 4);
        assert_eq!(
            last.describe_actions(s.config()),
            vec!["Park at (0, 0)", "skip", "House at (2, 3)"]
        );

        let r = s.resources();
        assert_eq!(r["P1"], ResourceRecord::new(35.0, 40.0));
        assert_eq!(r["P2"], ResourceRecord::new(1.0, 2.0));
    }

    #[test]
    fn reset_clears_everything() {
        let mut s = session();
        s.select(0, 0).unwrap();
        s.apply_step(None, StepSummary::from_response(&StepResponse::default()))
            .unwrap();
        s.select(1, 0).unwrap();
        assert!(s.apply_reset(&[]).is_err());
        assert_eq!(s.selection(), None);
        assert!(s.last_step().is_none());
        assert_eq!(s.board(), &Board::empty(4));
    }
}
