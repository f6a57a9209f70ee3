use crate::board::{Board, PlayerId};
use crate::codec::ObservationCodec;
use crate::episode::{Episode, Turn};
use crate::error::DecodeError;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CursorPosition {
    pub turn: usize,
    pub movement: usize,
}

type BoardObserver = Box<dyn FnMut(CursorPosition, &Board) + Send>;

/// Navigation over a fetched episode, `(turn, movement)` at a time.
///
/// Always holds `turn < episode.len()` and `movement < movements_in_turn(turn)`.
/// Moves saturate at the bounds. A move that lands somewhere new re-decodes
/// the board and notifies observers; a move that is blocked by a bound does
/// neither.
pub struct EpisodeCursor {
    codec: ObservationCodec,
    episode: Episode,
    position: CursorPosition,
    board: Board,
    decode_error: Option<DecodeError>,
    revision: u64,
    observers: Vec<BoardObserver>,
}

impl fmt::Debug for EpisodeCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EpisodeCursor")
            .field("turns", &self.episode.len())
            .field("position", &self.position)
            .field("revision", &self.revision)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl EpisodeCursor {
    pub fn new(episode: Episode, codec: ObservationCodec) -> Self {
        let mut cursor = Self {
            board: Board::empty(codec.layout().grid_size),
            decode_error: None,
            codec,
            episode,
            position: CursorPosition::default(),
            revision: 0,
            observers: Vec::new(),
        };
        cursor.publish();
        cursor
    }

    pub fn subscribe(&mut self, observer: impl FnMut(CursorPosition, &Board) + Send + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Replace the episode wholesale and go back to `(0, 0)`. Always publishes.
    pub fn load_episode(&mut self, episode: Episode) {
        self.episode = episode;
        self.position = CursorPosition::default();
        self.publish();
    }

    pub fn next_turn(&mut self) -> bool {
        if !self.can_next_turn() {
            return false;
        }
        self.move_to(self.position.turn + 1, 0)
    }

    pub fn previous_turn(&mut self) -> bool {
        if !self.can_previous_turn() {
            return false;
        }
        self.move_to(self.position.turn - 1, 0)
    }

    pub fn next_movement(&mut self) -> bool {
        if !self.can_next_movement() {
            return false;
        }
        self.move_to(self.position.turn, self.position.movement + 1)
    }

    pub fn previous_movement(&mut self) -> bool {
        if !self.can_previous_movement() {
            return false;
        }
        self.move_to(self.position.turn, self.position.movement - 1)
    }

    pub fn can_next_turn(&self) -> bool {
        self.position.turn + 1 < self.episode.len()
    }

    pub fn can_previous_turn(&self) -> bool {
        self.position.turn > 0
    }

    pub fn can_next_movement(&self) -> bool {
        self.position.movement + 1 < self.movements_in_turn(self.position.turn)
    }

    pub fn can_previous_movement(&self) -> bool {
        self.position.movement > 0
    }

    pub fn position(&self) -> CursorPosition {
        self.position
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Why the current board is the empty fallback, if it is.
    pub fn decode_error(&self) -> Option<&DecodeError> {
        self.decode_error.as_ref()
    }

    /// Bumped on every publish; lets a UI tell whether its copy is stale.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn episode(&self) -> &Episode {
        &self.episode
    }

    pub fn turn_count(&self) -> usize {
        self.episode.len()
    }

    pub fn movements_in_turn(&self, turn: usize) -> usize {
        self.episode.turn(turn).map_or(0, Turn::movement_count)
    }

    pub fn current_turn(&self) -> Option<&Turn> {
        self.episode.turn(self.position.turn)
    }

    /// Movements are one per acting agent, in seat order.
    pub fn current_player(&self) -> PlayerId {
        PlayerId::from_index(self.position.movement)
    }

    fn move_to(&mut self, turn: usize, movement: usize) -> bool {
        tracing::debug!(
            from_turn = self.position.turn,
            from_movement = self.position.movement,
            turn,
            movement,
            "cursor move"
        );
        self.position = CursorPosition { turn, movement };
        self.publish();
        true
    }

    fn publish(&mut self) {
        let vector = self
            .episode
            .turn(self.position.turn)
            .and_then(|t| t.movement(self.position.movement))
            .unwrap_or(&[]);
        (self.board, self.decode_error) = self.codec.decode_checked(vector);
        self.revision += 1;
        for observer in self.observers.iter_mut() {
            observer(self.position, &self.board);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use simcity_protocol::{ObservationContainer, TurnRecord};
    use std::sync::{Arc, Mutex};

    fn codec() -> ObservationCodec {
        ObservationCodec::new(GameConfig::default().layout())
    }

    /// Vector whose single claimed cell is `cell`, owned by builder `owner`.
    fn vector_with(cell: usize, owner: f64) -> Vec<f64> {
        let layout = GameConfig::default().layout();
        let mut v = vec![-1.0; layout.min_len()];
        v[layout.builder_offset + cell] = owner;
        v[layout.type_offset + cell] = 0.0;
        v
    }

    fn episode(shapes: &[usize]) -> Episode {
        let records = shapes
            .iter()
            .enumerate()
            .map(|(t, &movements)| TurnRecord {
                t_env: t as i64,
                observation: ObservationContainer::Batched(vec![(0..movements)
                    .map(|m| vector_with(t, m as f64))
                    .collect()]),
                ..TurnRecord::default()
            })
            .collect();
        Episode::from_records(records).unwrap()
    }

    fn flat_episode(turns: usize) -> Episode {
        let records = (0..turns)
            .map(|t| TurnRecord {
                t_env: t as i64,
                observation: ObservationContainer::Flat(vector_with(t, 0.0)),
                ..TurnRecord::default()
            })
            .collect();
        Episode::from_records(records).unwrap()
    }

    #[test]
    fn starts_at_origin_with_decoded_board() {
        let c = EpisodeCursor::new(episode(&[3, 3]), codec());
        assert_eq!(c.position(), CursorPosition::default());
        assert_eq!(c.revision(), 1);
        assert!(!c.board().get(0, 0).unwrap().is_empty());
        assert_eq!(c.current_player().to_string(), "P1");
    }

    #[test]
    fn next_turn_saturates_at_last_turn() {
        let mut c = EpisodeCursor::new(episode(&[1, 1, 1]), codec());
        assert!(c.next_turn());
        assert!(c.next_turn());
        assert_eq!(c.position().turn, 2);
        let rev = c.revision();
        assert!(!c.next_turn());
        assert_eq!(c.position().turn, 2);
        assert_eq!(c.revision(), rev);
    }

    #[test]
    fn previous_turn_saturates_at_zero() {
        let mut c = EpisodeCursor::new(episode(&[1, 1]), codec());
        assert!(!c.previous_turn());
        assert_eq!(c.revision(), 1);
    }

    #[test]
    fn turn_change_resets_movement() {
        let mut c = EpisodeCursor::new(episode(&[3, 3]), codec());
        assert!(c.next_movement());
        assert!(c.next_movement());
        assert_eq!(c.position(), CursorPosition { turn: 0, movement: 2 });
        assert_eq!(c.current_player().to_string(), "P3");
        assert!(c.next_turn());
        assert_eq!(c.position(), CursorPosition { turn: 1, movement: 0 });
        assert!(c.next_movement());
        assert!(c.previous_turn());
        assert_eq!(c.position(), CursorPosition { turn: 0, movement: 0 });
    }

    #[test]
    fn movement_navigation_stays_in_turn() {
        let mut c = EpisodeCursor::new(episode(&[2, 4]), codec());
        assert!(c.next_movement());
        assert!(!c.next_movement());
        assert_eq!(c.position(), CursorPosition { turn: 0, movement: 1 });
        assert!(c.previous_movement());
        assert!(!c.previous_movement());
        assert_eq!(c.position().turn, 0);
    }

    #[test]
    fn flat_turns_have_a_single_movement() {
        let mut c = EpisodeCursor::new(flat_episode(3), codec());
        for t in 0..3 {
            assert_eq!(c.movements_in_turn(t), 1);
        }
        assert!(!c.next_movement());
        assert!(c.next_turn());
        assert!(!c.next_movement());
        assert_eq!(c.position(), CursorPosition { turn: 1, movement: 0 });
    }

    #[test]
    fn board_follows_position() {
        let mut c = EpisodeCursor::new(episode(&[1, 3]), codec());
        c.next_turn();
        c.next_movement();
        // turn 1 claims cell 1 (row 0, col 1); movement 1 uses builder 1
        let cell = c.board().get(0, 1).unwrap();
        assert_eq!(cell.owner, Some(PlayerId::from_index(1)));
        assert!(c.board().get(0, 0).unwrap().is_empty());
    }

    #[test]
    fn observers_see_moves_but_not_blocked_moves() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut c = EpisodeCursor::new(episode(&[2, 1]), codec());
        let sink = Arc::clone(&seen);
        c.subscribe(move |pos, _board| sink.lock().unwrap().push(pos));

        c.previous_turn();
        c.next_movement();
        c.next_movement();
        c.next_turn();
        c.next_turn();

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                CursorPosition { turn: 0, movement: 1 },
                CursorPosition { turn: 1, movement: 0 },
            ]
        );
    }

    #[test]
    fn load_episode_resets_and_always_publishes() {
        let count = Arc::new(Mutex::new(0usize));
        let mut c = EpisodeCursor::new(episode(&[2, 2]), codec());
        let sink = Arc::clone(&count);
        c.subscribe(move |_, _| *sink.lock().unwrap() += 1);
        c.next_turn();
        c.next_movement();

        c.load_episode(flat_episode(1));
        assert_eq!(c.position(), CursorPosition::default());
        assert_eq!(c.turn_count(), 1);
        assert_eq!(*count.lock().unwrap(), 3);

        c.load_episode(flat_episode(1));
        assert_eq!(*count.lock().unwrap(), 4);
    }

    #[test]
    fn short_observation_shows_empty_board() {
        let records = vec![TurnRecord {
            observation: ObservationContainer::Flat(vec![0.0; 10]),
            ..TurnRecord::default()
        }];
        let c = EpisodeCursor::new(Episode::from_records(records).unwrap(), codec());
        assert_eq!(c.board(), &Board::empty(4));
        assert!(matches!(
            c.decode_error(),
            Some(DecodeError::LengthMismatch { actual: 10, .. })
        ));
    }
}
