use crate::client::RpcError;
use crate::render;
use simcity_engine::{
    ActionChoice, ActionCode, DecodeError, Episode, EpisodeCursor, ErrorKind, GameConfig,
    NoticeBoard, ObservationCodec, PlaySession, StepSummary,
};
use simcity_protocol::{ResetResponse, SimulateResponse, StepRequest, StepResponse, UiUpdate};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavOp {
    NextTurn,
    PreviousTurn,
    NextMovement,
    PreviousMovement,
}

/// Everything one open dashboard sees: the live game, the replayed episode
/// and the current notice.
#[derive(Debug)]
pub struct ViewerSession {
    config: Arc<GameConfig>,
    pub(crate) play: PlaySession,
    pub(crate) sim: Option<EpisodeCursor>,
    pub(crate) notices: NoticeBoard,
    pub(crate) show_builders: bool,
    pub(crate) episode_fetched_at: Option<OffsetDateTime>,
    board_publishes: Arc<AtomicU64>,
}

impl ViewerSession {
    pub fn new(config: Arc<GameConfig>) -> Self {
        Self {
            play: PlaySession::new(Arc::clone(&config)),
            notices: NoticeBoard::new(config.notice_ttl_ms),
            config,
            sim: None,
            show_builders: true,
            episode_fetched_at: None,
            board_publishes: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn play(&self) -> &PlaySession {
        &self.play
    }

    pub fn sim(&self) -> Option<&EpisodeCursor> {
        self.sim.as_ref()
    }

    /// Boards the episode cursor has published since the session started.
    pub fn board_publishes(&self) -> u64 {
        self.board_publishes.load(Ordering::Relaxed)
    }

    /// A new user action replaces whatever was being shown.
    pub fn user_action(&mut self) {
        self.notices.clear();
    }

    pub fn apply_reset(&mut self, resp: ResetResponse) -> Result<(), RpcError> {
        let Some(v) = resp.observation.first_vector() else {
            return Err(RpcError::MissingObservation { endpoint: "reset" });
        };
        let decoded = self.play.apply_reset(v);
        self.note_decode(decoded);
        Ok(())
    }

    pub fn apply_step(&mut self, resp: StepResponse) -> Result<(), RpcError> {
        let summary = StepSummary::from_response(&resp);
        let decoded = self
            .play
            .apply_step(resp.next_observation.first_vector(), summary);
        self.note_decode(decoded);
        Ok(())
    }

    /// Swap in a freshly simulated episode. An empty episode is refused and
    /// the current one stays.
    pub fn apply_simulation(&mut self, resp: SimulateResponse) -> Result<(), RpcError> {
        let episode = Episode::from_records(resp.episode_records)?;
        tracing::info!(turns = episode.len(), "episode loaded");
        match self.sim.as_mut() {
            Some(cursor) => cursor.load_episode(episode),
            None => {
                let codec = ObservationCodec::new(self.config.layout());
                let mut cursor = EpisodeCursor::new(episode, codec);
                self.board_publishes.fetch_add(1, Ordering::Relaxed);
                let publishes = Arc::clone(&self.board_publishes);
                cursor.subscribe(move |pos, _board| {
                    publishes.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(turn = pos.turn, movement = pos.movement, "board published");
                });
                self.sim = Some(cursor);
            }
        }
        self.episode_fetched_at = Some(OffsetDateTime::now_utc());
        let decoded = self
            .sim
            .as_ref()
            .and_then(|c| c.decode_error().cloned())
            .map_or(Ok(()), Err);
        self.note_decode(decoded);
        Ok(())
    }

    /// Returns whether the cursor moved. Without an episode this is a no-op.
    pub fn navigate(&mut self, op: NavOp) -> bool {
        let Some(cursor) = self.sim.as_mut() else {
            return false;
        };
        let moved = match op {
            NavOp::NextTurn => cursor.next_turn(),
            NavOp::PreviousTurn => cursor.previous_turn(),
            NavOp::NextMovement => cursor.next_movement(),
            NavOp::PreviousMovement => cursor.previous_movement(),
        };
        if moved {
            let decoded = cursor.decode_error().cloned().map_or(Ok(()), Err);
            self.note_decode(decoded);
        }
        moved
    }

    pub fn select(&mut self, row: usize, col: usize) {
        if let Err(err) = self.play.select(row, col) {
            self.notices.raise(err.kind(), err.to_string());
        }
    }

    /// `raw` is what the page sends: `"skip"` or a building index.
    pub fn choose_str(&mut self, raw: &str) {
        match raw.parse::<ActionChoice>() {
            Ok(choice) => self.choose(choice),
            Err(msg) => {
                self.notices.raise(ErrorKind::IllegalSelection, msg);
            }
        }
    }

    pub fn choose(&mut self, choice: ActionChoice) {
        if let Err(err) = self.play.choose(choice) {
            self.notices.raise(ErrorKind::IllegalSelection, err.to_string());
        }
    }

    /// Build the `/step` body for the human seat, or raise a notice if there
    /// is nothing to submit.
    pub fn step_request(&mut self) -> Option<StepRequest> {
        match self.play.commit() {
            Ok(ActionCode(code)) => Some(StepRequest::single(&self.config.human_agent_id, code)),
            Err(err) => {
                self.notices.raise(err.kind(), err.to_string());
                None
            }
        }
    }

    pub fn toggle_builders(&mut self) -> bool {
        self.show_builders = !self.show_builders;
        self.show_builders
    }

    pub fn rpc_failed(&mut self, err: &RpcError) {
        tracing::warn!("rpc failed: {err}");
        self.notices
            .raise(ErrorKind::RpcFailure, format!("Request failed: {err}. Please try again."));
    }

    pub fn busy(&mut self) {
        self.notices.raise(
            ErrorKind::RpcFailure,
            "A request is already in flight. Please wait.",
        );
    }

    pub fn render(&mut self, event: &str) -> UiUpdate {
        render::update(self, event)
    }

    fn note_decode(&mut self, decoded: Result<(), DecodeError>) {
        if let Err(err) = decoded {
            self.notices.raise(err.kind(), err.to_string());
        }
    }
}
