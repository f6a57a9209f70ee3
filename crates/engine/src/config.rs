use crate::board::{BuildingType, PlayerId};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use simcity_protocol::ResourceRecord;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingSpec {
    pub name: String,
    pub color: String,
}

impl BuildingSpec {
    pub fn new(name: &str, color: &str) -> Self {
        Self {
            name: name.to_string(),
            color: color.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSpec {
    pub role: String,
    #[serde(default)]
    pub resources: ResourceRecord,
}

impl PlayerSpec {
    pub fn new(role: &str, money: f64, reputation: f64) -> Self {
        Self {
            role: role.to_string(),
            resources: ResourceRecord::new(money, reputation),
        }
    }
}

/// Everything the client core needs to know about the game it is showing.
///
/// Building index `i` in `buildings` is `BuildingType(i)`; roster index `i`
/// in `players` is `P{i+1}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub grid_size: usize,
    pub grid_features: usize,
    pub resource_scalars: usize,
    pub buildings: Vec<BuildingSpec>,
    pub empty_name: String,
    pub empty_color: String,
    pub players: Vec<PlayerSpec>,
    /// Key the human seat is submitted under in `/step`.
    pub human_agent_id: String,
    /// Zero-based roster index of the human seat.
    pub human_player: usize,
    pub notice_ttl_ms: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            grid_size: 4,
            grid_features: 48,
            resource_scalars: 2,
            buildings: vec![
                BuildingSpec::new("Park", "#bbf7d0"),
                BuildingSpec::new("House", "#fef08a"),
                BuildingSpec::new("Shop", "#fecaca"),
            ],
            empty_name: "Empty".to_string(),
            empty_color: "#f3f4f6".to_string(),
            players: vec![
                PlayerSpec::new("Altruistic Player", 35.0, 40.0),
                PlayerSpec::new("Balanced Player", 30.0, 35.0),
                PlayerSpec::new("Interest Driven Player", 25.0, 15.0),
            ],
            human_agent_id: "2".to_string(),
            human_player: 0,
            notice_ttl_ms: 2000,
        }
    }
}

impl GameConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grid_size == 0 {
            return Err(ConfigError::EmptyGrid);
        }
        if self.buildings.is_empty() {
            return Err(ConfigError::NoBuildings);
        }
        if self.players.is_empty() {
            return Err(ConfigError::NoPlayers);
        }
        if self.human_player >= self.players.len() {
            return Err(ConfigError::HumanOutsideRoster {
                index: self.human_player,
                players: self.players.len(),
            });
        }
        Ok(())
    }

    pub fn cell_count(&self) -> usize {
        self.grid_size * self.grid_size
    }

    pub fn layout(&self) -> ObservationLayout {
        ObservationLayout::new(self.grid_size, self.grid_features, self.resource_scalars)
    }

    pub fn building_name(&self, ty: BuildingType) -> String {
        match ty.index() {
            None => self.empty_name.clone(),
            Some(i) => self
                .buildings
                .get(i)
                .map(|b| b.name.clone())
                .unwrap_or_else(|| format!("Type {}", ty.0)),
        }
    }

    pub fn building_color(&self, ty: BuildingType) -> &str {
        ty.index()
            .and_then(|i| self.buildings.get(i))
            .map(|b| b.color.as_str())
            .unwrap_or(self.empty_color.as_str())
    }

    pub fn player(&self, id: PlayerId) -> Option<&PlayerSpec> {
        self.players.get(id.index())
    }

    pub fn roster(&self) -> impl Iterator<Item = (PlayerId, &PlayerSpec)> {
        self.players
            .iter()
            .enumerate()
            .map(|(i, p)| (PlayerId::from_index(i), p))
    }

    pub fn human(&self) -> PlayerId {
        PlayerId::from_index(self.human_player)
    }
}

/// Where the board ranges sit inside a flat observation vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationLayout {
    pub grid_size: usize,
    pub builder_offset: usize,
    pub type_offset: usize,
}

impl ObservationLayout {
    /// `[0, G)` grid features, `[G, G+R)` resources, then one builder index
    /// per cell, then one building type per cell.
    pub fn new(grid_size: usize, grid_features: usize, resource_scalars: usize) -> Self {
        let builder_offset = grid_features + resource_scalars;
        Self {
            grid_size,
            builder_offset,
            type_offset: builder_offset + grid_size * grid_size,
        }
    }

    pub fn cell_count(&self) -> usize {
        self.grid_size * self.grid_size
    }

    pub fn min_len(&self) -> usize {
        self.type_offset.max(self.builder_offset) + self.cell_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout_matches_observed_server() {
        let layout = GameConfig::default().layout();
        assert_eq!(layout.builder_offset, 50);
        assert_eq!(layout.type_offset, 66);
        assert_eq!(layout.min_len(), 82);
    }

    #[test]
    fn layout_follows_grid_size() {
        let layout = ObservationLayout::new(5, 10, 3);
        assert_eq!(layout.builder_offset, 13);
        assert_eq!(layout.type_offset, 38);
        assert_eq!(layout.min_len(), 63);
    }

    #[test]
    fn validate_rejects_degenerate_configs() {
        assert!(GameConfig::default().validate().is_ok());

        let mut c = GameConfig::default();
        c.grid_size = 0;
        assert_eq!(c.validate(), Err(ConfigError::EmptyGrid));

        let mut c = GameConfig::default();
        c.buildings.clear();
        assert_eq!(c.validate(), Err(ConfigError::NoBuildings));

        let mut c = GameConfig::default();
        c.human_player = 3;
        assert_eq!(
            c.validate(),
            Err(ConfigError::HumanOutsideRoster {
                index: 3,
                players: 3
            })
        );
    }

    #[test]
    fn names_and_colors_come_from_taxonomy() {
        let c = GameConfig::default();
        assert_eq!(c.building_name(BuildingType::EMPTY), "Empty");
        assert_eq!(c.building_name(BuildingType(1)), "House");
        assert_eq!(c.building_name(BuildingType(7)), "Type 7");
        assert_eq!(c.building_color(BuildingType(7)), c.empty_color);
        assert_eq!(c.human().to_string(), "P1");
    }
}
