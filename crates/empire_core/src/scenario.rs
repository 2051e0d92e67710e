//! Scenario loading and generation.
//!
//! Scenarios define the initial game state: the galaxy, who plays, where the
//! planets are and which fleets exist at cycle 0. They are written in RON and
//! turned into a validated [`GameState`] by [`Scenario::build`].

use std::collections::BTreeMap;
use std::path::Path;

use ron::extensions::Extensions;
use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::hex::{Galaxy, HexCoord};
use crate::ids::{PlanetId, PlayerId};
use crate::planet::{Improvements, Planet, PlanetOptions};
use crate::player::Player;
use crate::research::{ResearchAllocation, ResearchCategory};
use crate::resources::ResourceStock;
use crate::rules::Rules;
use crate::ships::{ShipCounts, ShipType};
use crate::state::GameState;

/// Shape of the map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GalaxyShape {
    /// Every cell within `radius` steps of the origin.
    Hexagon {
        /// Radius in steps.
        radius: u32,
    },
    /// An explicit cell list.
    Cells(Vec<HexCoord>),
}

impl GalaxyShape {
    fn build(&self) -> Galaxy {
        match self {
            Self::Hexagon { radius } => Galaxy::hexagon(*radius),
            Self::Cells(cells) => Galaxy::new(cells.iter().copied()),
        }
    }
}

/// A starting player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSetup {
    /// Player id.
    pub id: PlayerId,
    /// Display name.
    pub name: String,
    /// Starting empire stock.
    #[serde(default)]
    pub stock: ResourceStock,
    /// Starting research split; the default split when absent.
    #[serde(default)]
    pub research: Option<BTreeMap<ResearchCategory, u32>>,
}

/// A starting planet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanetSetup {
    /// Planet id.
    pub id: PlanetId,
    /// Display name.
    pub name: String,
    /// Cell.
    pub hex: HexCoord,
    /// Owner; neutral when absent.
    #[serde(default)]
    pub owner: Option<PlayerId>,
    /// Population.
    #[serde(default)]
    pub population: u32,
    /// Growth cap.
    #[serde(default)]
    pub max_population: Option<u32>,
    /// Stock.
    #[serde(default)]
    pub stock: ResourceStock,
    /// Already built improvements.
    #[serde(default)]
    pub improvements: Improvements,
    /// Improvement slots.
    #[serde(default)]
    pub improvement_slots: Option<u32>,
    /// Worker split and auto-spend.
    #[serde(default)]
    pub options: Option<PlanetOptions>,
}

/// A starting fleet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetSetup {
    /// Owner.
    pub owner: PlayerId,
    /// Cell.
    pub hex: HexCoord,
    /// Ship counts per type.
    pub ships: BTreeMap<ShipType, u32>,
}

/// A complete scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Map.
    pub galaxy: GalaxyShape,
    /// Players.
    pub players: Vec<PlayerSetup>,
    /// Planets.
    pub planets: Vec<PlanetSetup>,
    /// Fleets.
    #[serde(default)]
    pub fleets: Vec<FleetSetup>,
    /// Rules; the defaults when absent.
    #[serde(default)]
    pub rules: Option<Rules>,
}

/// Scenario files may write ids and optional fields bare: `owner: 2`.
fn ron_options() -> ron::Options {
    ron::Options::default()
        .with_default_extension(Extensions::UNWRAP_NEWTYPES | Extensions::IMPLICIT_SOME)
}

impl Scenario {
    /// Parse a scenario from RON text.
    pub fn from_ron_str(source: &str) -> Result<Self> {
        ron_options().from_str(source).map_err(|e| GameError::DataParseError {
            path: "<scenario>".to_string(),
            message: e.to_string(),
        })
    }

    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        ron_options().from_str(&source).map_err(|e| GameError::DataParseError {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Serialize to pretty RON.
    pub fn to_ron_string(&self) -> Result<String> {
        ron_options()
            .to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| GameError::Serialization(e.to_string()))
    }

    /// Rules the scenario plays under.
    #[must_use]
    pub fn rules(&self) -> Rules {
        self.rules.clone().unwrap_or_default()
    }

    /// Build and validate the initial state.
    pub fn build(&self) -> Result<GameState> {
        let rules = self.rules();
        let mut state = GameState::new(self.galaxy.build());

        for setup in &self.players {
            let mut player = Player::new(setup.id, setup.name.clone());
            player.stock = setup.stock;
            if let Some(split) = &setup.research {
                let allocation = ResearchAllocation::from_pairs(split.iter().map(|(c, p)| (*c, *p)));
                player.research.set_allocation(allocation).map_err(|e| {
                    GameError::InvalidScenario(format!("player {}: {e}", setup.id))
                })?;
            }
            state.add_player(player)?;
        }

        for setup in &self.planets {
            let mut planet = Planet::new(setup.id, setup.name.clone(), setup.hex);
            planet.owner = setup.owner;
            planet.population = setup.population;
            planet.max_population = setup
                .max_population
                .unwrap_or(planet.max_population)
                .max(setup.population);
            planet.stock = setup.stock;
            planet.improvements = setup.improvements;
            if let Some(slots) = setup.improvement_slots {
                planet.improvement_slots = slots;
            }
            if let Some(options) = setup.options {
                options.validate().map_err(|e| {
                    GameError::InvalidScenario(format!("planet {}: {e}", setup.id))
                })?;
                planet.options = options;
            }
            state.add_planet(planet)?;
        }

        for setup in &self.fleets {
            if !state.players.contains_key(&setup.owner) {
                return Err(GameError::InvalidScenario(format!(
                    "fleet owned by unknown player {}",
                    setup.owner
                )));
            }
            let ships: ShipCounts = setup.ships.iter().map(|(s, n)| (*s, *n)).collect();
            if ships.is_empty() {
                return Err(GameError::InvalidScenario(format!(
                    "empty fleet for player {} at {:?}",
                    setup.owner, setup.hex
                )));
            }
            state.fleets.reinforce(setup.owner, setup.hex, &ships);
        }

        state.check_invariants(&rules).map_err(|e| match e {
            GameError::InvariantViolation { message, .. } => GameError::InvalidScenario(message),
            other => other,
        })?;
        tracing::debug!(
            scenario = %self.name,
            players = state.players.len(),
            planets = state.planets.len(),
            cells = state.galaxy.len(),
            "Scenario built"
        );
        Ok(state)
    }
}

/// Cells exactly `radius` steps from the origin, walking the ring in order.
#[must_use]
pub fn ring(radius: u32) -> Vec<HexCoord> {
    if radius == 0 {
        return vec![HexCoord::ORIGIN];
    }
    let r = i32::try_from(radius).unwrap_or(i32::MAX / 2);
    let mut cell = HexCoord::new(-r, r);
    let mut cells = Vec::new();
    for side in 0..6 {
        for _ in 0..radius {
            cells.push(cell);
            cell = cell.neighbors()[side];
        }
    }
    cells
}

/// A symmetric scenario on a hexagon galaxy.
///
/// Home worlds sit evenly spaced on the outer ring, each with a small
/// garrison and a colony ship. Every other cell of the middle ring holds a
/// neutral world and the origin holds a populated neutral core world.
#[must_use]
pub fn ring_galaxy(radius: u32, players: u32) -> Scenario {
    let radius = radius.max(2);
    let outer = ring(radius);
    let players = players.clamp(1, u32::try_from(outer.len()).unwrap_or(u32::MAX));
    let spacing = outer.len() / players as usize;

    let mut scenario = Scenario {
        name: format!("Ring galaxy r{radius} p{players}"),
        galaxy: GalaxyShape::Hexagon { radius },
        players: Vec::new(),
        planets: Vec::new(),
        fleets: Vec::new(),
        rules: None,
    };

    let mut next_planet = 1;
    for (index, &hex) in (1..=players).zip(outer.iter().step_by(spacing)) {
        let id = PlayerId(index);
        scenario.players.push(PlayerSetup {
            id,
            name: format!("Empire {index}"),
            stock: ResourceStock {
                food: 20,
                ..ResourceStock::ZERO
            },
            research: None,
        });
        scenario.planets.push(PlanetSetup {
            id: PlanetId(next_planet),
            name: format!("Home {index}"),
            hex,
            owner: Some(id),
            population: 20,
            max_population: Some(120),
            stock: ResourceStock {
                food: 30,
                energy: 10,
                ore: 10,
                ..ResourceStock::ZERO
            },
            improvements: Improvements {
                farm: 2,
                ..Improvements::default()
            },
            improvement_slots: None,
            options: Some(PlanetOptions {
                auto_spend: true,
                ..PlanetOptions::default()
            }),
        });
        next_planet += 1;
        scenario.fleets.push(FleetSetup {
            owner: id,
            hex,
            ships: [(ShipType::Frigate, 2), (ShipType::ColonyShip, 1)]
                .into_iter()
                .collect(),
        });
    }

    for (n, hex) in ring(radius / 2).into_iter().step_by(2).enumerate() {
        scenario.planets.push(PlanetSetup {
            id: PlanetId(next_planet),
            name: format!("Frontier {}", n + 1),
            hex,
            owner: None,
            population: 0,
            max_population: Some(60),
            stock: ResourceStock::ZERO,
            improvements: Improvements::default(),
            improvement_slots: None,
            options: None,
        });
        next_planet += 1;
    }

    if radius / 2 > 0 {
        scenario.planets.push(PlanetSetup {
            id: PlanetId(next_planet),
            name: "Core".to_string(),
            hex: HexCoord::ORIGIN,
            owner: None,
            population: 15,
            max_population: Some(150),
            stock: ResourceStock::ZERO,
            improvements: Improvements::default(),
            improvement_slots: None,
            options: None,
        });
    }
    scenario
}
