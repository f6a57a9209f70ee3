use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Swap {
    Replace,
    Merge,
}

impl Default for Swap {
    fn default() -> Self {
        Self::Replace
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patch {
    pub target: String,
    #[serde(default)]
    pub swap: Swap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<String>,
}

impl Patch {
    pub fn replace(target: &str, html: String, payload: serde_json::Value) -> Self {
        Self {
            target: target.to_string(),
            swap: Swap::Replace,
            html: Some(html),
            payload: Some(payload),
            trigger: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiUpdate {
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    pub patches: Vec<Patch>,
}

impl UiUpdate {
    pub fn new(event: impl Into<String>, patches: Vec<Patch>) -> Self {
        Self {
            event: event.into(),
            payload: None,
            patches,
        }
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn patch(&self, target: &str) -> Option<&Patch> {
        self.patches.iter().find(|p| p.target == target)
    }
}

pub mod targets {
    pub const PLAY_BOARD: &str = "play.board";
    pub const PLAY_PLAYERS: &str = "play.players";
    pub const PLAY_ACTION: &str = "play.action";
    pub const PLAY_STEP: &str = "play.step";
    pub const SIM_BOARD: &str = "sim.board";
    pub const SIM_PLAYERS: &str = "sim.players";
    pub const SIM_TURN: &str = "sim.turn";
    pub const NOTICE: &str = "notice";
}

/// One flat observation: `[grid features | resources | builders | building types]`.
pub type ObservationVector = Vec<f64>;

/// Observation payload as the simulation server emits it.
///
/// The server is not consistent about nesting: a turn may carry a bare vector,
/// a list of per-movement vectors, or the batched `[batch][movement][feature]`
/// form. All three collapse to a sequence of movements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ObservationContainer {
    Flat(ObservationVector),
    Movements(Vec<ObservationVector>),
    Batched(Vec<Vec<ObservationVector>>),
}

impl Default for ObservationContainer {
    fn default() -> Self {
        Self::Movements(Vec::new())
    }
}

impl ObservationContainer {
    /// Uniform per-movement view. A bare vector is a single movement; the
    /// batched form contributes its first batch entry.
    pub fn into_movements(self) -> Vec<ObservationVector> {
        match self {
            Self::Flat(v) => vec![v],
            Self::Movements(m) => m,
            Self::Batched(b) => b.into_iter().next().unwrap_or_default(),
        }
    }

    /// Movement 0, if the container holds any vector at all.
    pub fn first_vector(&self) -> Option<&[f64]> {
        match self {
            Self::Flat(v) => Some(v.as_slice()),
            Self::Movements(m) => m.first().map(Vec::as_slice),
            Self::Batched(b) => b.first().and_then(|m| m.first()).map(Vec::as_slice),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResetRequest {}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResetResponse {
    #[serde(default)]
    pub observation: ObservationContainer,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepRequest {
    pub user_actions: BTreeMap<String, u32>,
}

impl StepRequest {
    pub fn single(agent_id: &str, code: u32) -> Self {
        let mut user_actions = BTreeMap::new();
        user_actions.insert(agent_id.to_string(), code);
        Self { user_actions }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepResponse {
    #[serde(default)]
    pub next_observation: ObservationContainer,
    #[serde(default)]
    pub t_env: i64,
    #[serde(default)]
    pub actions_taken: Vec<i64>,
    #[serde(default)]
    pub info: serde_json::Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimulateRequest {}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimulateResponse {
    #[serde(default)]
    pub episode_records: Vec<TurnRecord>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TurnRecord {
    #[serde(default)]
    pub t_env: i64,
    #[serde(default)]
    pub actions: Vec<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rewards: Option<serde_json::Value>,
    #[serde(default)]
    pub info: serde_json::Value,
    #[serde(default)]
    pub observation: ObservationContainer,
}

/// Canonical per-player resources. The server has used both `money` and
/// `Money` (same for reputation); both spellings land here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceRecord {
    #[serde(default, alias = "Money")]
    pub money: f64,
    #[serde(default, alias = "Reputation")]
    pub reputation: f64,
}

impl ResourceRecord {
    pub fn new(money: f64, reputation: f64) -> Self {
        Self { money, reputation }
    }
}

/// Pull `info.player_resources` into canonical records keyed by player name
/// (`"P1"`, ...). Entries that do not parse are skipped.
pub fn player_resources(info: &serde_json::Value) -> BTreeMap<String, ResourceRecord> {
    let Some(map) = info.get("player_resources").and_then(|v| v.as_object()) else {
        return BTreeMap::new();
    };
    map.iter()
        .filter_map(|(player, raw)| {
            serde_json::from_value::<ResourceRecord>(raw.clone())
                .ok()
                .map(|r| (player.clone(), r))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn observation_shapes_normalize_to_movements() {
        let flat: ObservationContainer = serde_json::from_value(json!([1.0, 2.0])).unwrap();
        assert_eq!(flat.clone().into_movements(), vec![vec![1.0, 2.0]]);
        assert_eq!(flat.first_vector(), Some(&[1.0, 2.0][..]));

        let seq: ObservationContainer = serde_json::from_value(json!([[1], [2]])).unwrap();
        assert_eq!(seq.into_movements(), vec![vec![1.0], vec![2.0]]);

        let batched: ObservationContainer =
            serde_json::from_value(json!([[[1], [2], [3]]])).unwrap();
        assert_eq!(batched.first_vector(), Some(&[1.0][..]));
        assert_eq!(batched.into_movements().len(), 3);
    }

    #[test]
    fn empty_array_is_an_empty_flat_vector() {
        let c: ObservationContainer = serde_json::from_value(json!([])).unwrap();
        assert!(c.first_vector().is_some_and(|v| v.is_empty()));
        assert_eq!(ObservationContainer::default().first_vector(), None);
    }

    #[test]
    fn resources_accept_both_casings() {
        let info = json!({
            "player_resources": {
                "P1": { "money": 12, "reputation": 3 },
                "P2": { "Money": 7.5, "Reputation": 1 },
                "P3": "garbage"
            }
        });
        let r = player_resources(&info);
        assert_eq!(r.len(), 2);
        assert_eq!(r["P1"], ResourceRecord::new(12.0, 3.0));
        assert_eq!(r["P2"], ResourceRecord::new(7.5, 1.0));
    }

    #[test]
    fn step_request_uses_agent_key() {
        let req = StepRequest::single("2", 28);
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({ "user_actions": { "2": 28 } })
        );
    }

    #[test]
    fn turn_record_tolerates_missing_fields() {
        let t: TurnRecord = serde_json::from_value(json!({
            "t_env": 3,
            "observation": [[[-1.0]]]
        }))
        .unwrap();
        assert_eq!(t.t_env, 3);
        assert!(t.actions.is_empty());
        assert!(t.rewards.is_none());
        assert!(t.info.is_null());
    }
}
