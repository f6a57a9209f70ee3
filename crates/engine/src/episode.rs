use crate::error::EpisodeError;
use simcity_protocol::{player_resources, ObservationVector, ResourceRecord, TurnRecord};
use std::collections::BTreeMap;

/// One recorded server round, normalized so that every turn has at least one
/// movement.
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub t_env: i64,
    pub actions: Vec<i64>,
    pub rewards: Option<serde_json::Value>,
    pub info: serde_json::Value,
    pub resources: BTreeMap<String, ResourceRecord>,
    movements: Vec<ObservationVector>,
}

impl Turn {
    pub fn from_record(record: TurnRecord) -> Self {
        let mut movements = record.observation.into_movements();
        if movements.is_empty() {
            // Decodes to the empty-board fallback rather than breaking the
            // "at least one movement" rule.
            movements.push(Vec::new());
        }
        Self {
            t_env: record.t_env,
            resources: player_resources(&record.info),
            actions: record.actions,
            rewards: record.rewards,
            info: record.info,
            movements,
        }
    }

    pub fn movement_count(&self) -> usize {
        self.movements.len()
    }

    pub fn movement(&self, index: usize) -> Option<&[f64]> {
        self.movements.get(index).map(Vec::as_slice)
    }
}

/// An immutable, non-empty fetched episode.
#[derive(Debug, Clone, PartialEq)]
pub struct Episode {
    turns: Vec<Turn>,
}

impl Episode {
    pub fn from_records(records: Vec<TurnRecord>) -> Result<Self, EpisodeError> {
        if records.is_empty() {
            return Err(EpisodeError::Empty);
        }
        Ok(Self {
            turns: records.into_iter().map(Turn::from_record).collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn turn(&self, index: usize) -> Option<&Turn> {
        self.turns.get(index)
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }
}
