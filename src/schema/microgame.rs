//! Microgame definitions and the catalog they are loaded into.

use rand::seq::SliceRandom;
use rand::Rng;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use super::player::{Layer, PlayerId};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("duplicate microgame id: {0}")]
    DuplicateId(String),
    #[error("microgame {id} has invalid initial duration {duration}")]
    InvalidDuration { id: String, duration: f64 },
    #[error("{player} layer {layer} is outside the 32-layer culling mask")]
    InvalidLayer { player: PlayerId, layer: u8 },
    #[error("both players are on layer {0}")]
    SharedLayer(u8),
}

fn default_initial_duration() -> f64 {
    10.0
}

fn default_display_name() -> String {
    "Do this!".to_string()
}

fn default_win_on_timeout() -> bool {
    true
}

/// Static description of one microgame, authored in RON.
///
/// ```text
/// (
///     id: "dodge",
///     initial_duration: 5.0,
///     display_name: "Dodge!",
///     win_on_timeout: true,
///     on_start: Some("dodge_music"),
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MicrogameDefinition {
    pub id: String,
    /// Seconds on the clock when the session starts.
    #[serde(default = "default_initial_duration")]
    pub initial_duration: f64,
    /// Title shown on the owner's HUD.
    #[serde(default = "default_display_name")]
    pub display_name: String,
    /// Outcome when the clock runs out. `true` for survive-the-timer games,
    /// `false` for games where running out means failure.
    #[serde(default = "default_win_on_timeout")]
    pub win_on_timeout: bool,
    /// Notification emitted when a session starts.
    #[serde(default)]
    pub on_start: Option<String>,
    /// Notification emitted when a session ends.
    #[serde(default)]
    pub on_end: Option<String>,
}

impl MicrogameDefinition {
    /// A definition with every option at its default.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            initial_duration: default_initial_duration(),
            display_name: default_display_name(),
            win_on_timeout: default_win_on_timeout(),
            on_start: None,
            on_end: None,
        }
    }

    /// The same microgame with a different clock length.
    pub fn with_duration(self, seconds: f64) -> Result<Self, CatalogError> {
        let definition = Self {
            initial_duration: seconds,
            ..self
        };
        definition.validate()?;
        Ok(definition)
    }

    fn validate(&self) -> Result<(), CatalogError> {
        if !self.initial_duration.is_finite() || self.initial_duration <= 0.0 {
            return Err(CatalogError::InvalidDuration {
                id: self.id.clone(),
                duration: self.initial_duration,
            });
        }
        Ok(())
    }
}

/// All microgames available to the director, in authoring order.
#[derive(Debug, Clone, Default)]
pub struct MicrogameCatalog {
    definitions: Vec<MicrogameDefinition>,
    by_id: FxHashMap<String, usize>,
}

impl MicrogameCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, definition: MicrogameDefinition) -> Result<(), CatalogError> {
        definition.validate()?;
        if self.by_id.contains_key(&definition.id) {
            return Err(CatalogError::DuplicateId(definition.id));
        }
        self.by_id
            .insert(definition.id.clone(), self.definitions.len());
        self.definitions.push(definition);
        Ok(())
    }

    /// Parse a catalog from a RON list of definitions.
    pub fn parse_ron(input: &str) -> Result<Self, CatalogError> {
        let definitions: Vec<MicrogameDefinition> = ron::from_str(input)?;
        let mut catalog = Self::new();
        for definition in definitions {
            catalog.insert(definition)?;
        }
        Ok(catalog)
    }

    pub fn load_from_ron(path: &Path) -> Result<Self, CatalogError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    pub fn get(&self, id: &str) -> Option<&MicrogameDefinition> {
        self.by_id.get(id).map(|&i| &self.definitions[i])
    }

    /// Pick a random microgame, or `None` if the catalog is empty.
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&MicrogameDefinition> {
        self.definitions.choose(rng)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MicrogameDefinition> {
        self.definitions.iter()
    }
}

fn default_pixel_depth() -> u8 {
    24
}

fn default_player_one_layer() -> u8 {
    8
}

fn default_player_two_layer() -> u8 {
    9
}

/// Engine-wide settings shared by every session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Depth-buffer bits for viewport targets.
    #[serde(default = "default_pixel_depth")]
    pub pixel_depth: u8,
    #[serde(default = "default_player_one_layer")]
    pub player_one_layer: u8,
    #[serde(default = "default_player_two_layer")]
    pub player_two_layer: u8,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            pixel_depth: default_pixel_depth(),
            player_one_layer: default_player_one_layer(),
            player_two_layer: default_player_two_layer(),
        }
    }
}

impl RuntimeConfig {
    pub fn parse_ron(input: &str) -> Result<Self, CatalogError> {
        let config: Self = ron::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_from_ron(path: &Path) -> Result<Self, CatalogError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Each player needs their own layer inside the culling mask.
    pub fn validate(&self) -> Result<(), CatalogError> {
        for player in PlayerId::ALL {
            let layer = self.layer_for(player);
            if !layer.is_valid() {
                return Err(CatalogError::InvalidLayer {
                    player,
                    layer: layer.0,
                });
            }
        }
        if self.player_one_layer == self.player_two_layer {
            return Err(CatalogError::SharedLayer(self.player_one_layer));
        }
        Ok(())
    }

    /// The simulation layer a player's microgames are partitioned onto.
    pub fn layer_for(&self, player: PlayerId) -> Layer {
        match player {
            PlayerId::One => Layer(self.player_one_layer),
            PlayerId::Two => Layer(self.player_two_layer),
        }
    }
}
