//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the engine produces identical
//! checksums given identical inputs.
//!
//! # Testing Strategy
//!
//! The session host and every client mirror must agree on the canonical
//! checksum after each cycle. Sources of divergence include:
//!
//! - **Floating-point math**: Different CPUs can produce different results.
//!   Distances use fixed-point arithmetic via [`empire_core::math::Fixed`].
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   State lives in ordered maps and every phase walks them in key order.
//!
//! - **Action arrival order**: Batches are sorted by sequence then player
//!   before they are applied, so delivery order does not matter.
//!
//! - **Serialization**: The canonical form sorts keys at every level, so two
//!   equal states hash the same no matter how they were built.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: Individual phase determinism (movement, combat, etc.)
//! 2. **Property tests**: Random action batches must still agree
//! 3. **Integration tests**: Full scenarios are reproducible
//! 4. **Parallel tests**: Running N sessions on threads all match

use std::thread;

use empire_core::action::PendingAction;
use empire_core::canonical::StateChecksum;
use empire_core::simulation::Simulation;
use empire_core::state::GameState;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Final checksum from each run.
    pub checksums: Vec<StateChecksum>,
    /// Number of cycles simulated.
    pub cycles: u64,
}

impl DeterminismResult {
    /// All distinct checksums (should be 1 for a deterministic engine).
    #[must_use]
    pub fn unique_checksums(&self) -> Vec<StateChecksum> {
        let mut unique: Vec<StateChecksum> = Vec::new();
        for sum in &self.checksums {
            if !unique.contains(sum) {
                unique.push(sum.clone());
            }
        }
        unique
    }

    /// Assert that the runs agreed, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different checksums.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_checksums();
            panic!(
                "Simulation is non-deterministic!\n\
                 Runs: {}\n\
                 Cycles: {}\n\
                 Unique checksums: {} (expected 1)\n\
                 All checksums: {:?}",
                self.checksums.len(),
                self.cycles,
                unique.len(),
                self.checksums
            );
        }
    }
}

/// Run a setup-and-step loop several times and compare the final checksums.
///
/// # Example
///
/// ```ignore
/// use empire_test_utils::determinism::verify_determinism;
/// use empire_test_utils::fixtures::duel_simulation;
///
/// let result = verify_determinism(
///     5,   // Run 5 times
///     40,  // 40 cycles each
///     duel_simulation,
///     |sim| { sim.advance(&[]).unwrap(); },
///     |sim| sim.checksum().unwrap(),
/// );
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<S, Setup, Step, Sum>(
    runs: usize,
    cycles: u64,
    setup: Setup,
    step: Step,
    checksum: Sum,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    Sum: Fn(&S) -> StateChecksum,
{
    let mut checksums = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();
        for _ in 0..cycles {
            step(&mut state);
        }
        checksums.push(checksum(&state));
    }

    let is_deterministic = checksums.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        checksums,
        cycles,
    }
}

/// Drive a simulation for `cycles` cycles, asking `orders` for each batch.
///
/// Stops early once the game is over. Returns the per-cycle checksums.
///
/// # Panics
///
/// Panics if a cycle fails; a fixture that breaks an invariant is a bug.
pub fn drive<F>(sim: &mut Simulation, cycles: u64, orders: F) -> Vec<StateChecksum>
where
    F: Fn(&GameState) -> Vec<PendingAction>,
{
    let mut sums = Vec::new();
    for _ in 0..cycles {
        if sim.is_game_over() {
            break;
        }
        let batch = orders(sim.state());
        let report = sim.advance(&batch).expect("cycle failed");
        sums.push(report.checksum);
    }
    sums
}

/// Simplified determinism verification for [`Simulation`].
///
/// Runs the setup twice with the same orders and compares every cycle.
pub fn verify_simulation_determinism<F, O>(setup_fn: F, orders: O, cycles: u64) -> bool
where
    F: Fn() -> Simulation,
    O: Fn(&GameState) -> Vec<PendingAction>,
{
    let mut first = setup_fn();
    let mut second = setup_fn();
    drive(&mut first, cycles, &orders) == drive(&mut second, cycles, &orders)
}

/// Result of parallel simulation runs.
#[derive(Debug, Clone)]
pub struct ParallelSimResult {
    /// Final checksum from each simulation.
    pub checksums: Vec<StateChecksum>,
    /// Number of cycles each simulation ran.
    pub cycles: u64,
    /// Number of simulations run.
    pub num_sims: usize,
}

impl ParallelSimResult {
    /// Check if all simulations produced identical results.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.checksums.windows(2).all(|w| w[0] == w[1])
    }

    /// Assert all simulations matched.
    ///
    /// # Panics
    ///
    /// Panics if simulations produced different checksums.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic() {
            panic!(
                "Parallel simulations diverged!\n\
                 Simulations: {}\n\
                 Cycles: {}\n\
                 All checksums: {:?}",
                self.num_sims, self.cycles, self.checksums
            );
        }
    }
}

/// Run N simulations on scoped threads and collect final checksums.
///
/// # Panics
///
/// Panics if a worker thread panics.
pub fn run_parallel_simulations_scoped<F, O>(
    setup_fn: F,
    orders: O,
    num_sims: usize,
    cycles: u64,
) -> ParallelSimResult
where
    F: Fn() -> Simulation + Sync,
    O: Fn(&GameState) -> Vec<PendingAction> + Sync,
{
    let checksums = thread::scope(|s| {
        let handles: Vec<_> = (0..num_sims)
            .map(|_| {
                s.spawn(|| {
                    let mut sim = setup_fn();
                    drive(&mut sim, cycles, &orders);
                    sim.checksum().expect("checksum")
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("simulation thread panicked"))
            .collect()
    });

    ParallelSimResult {
        checksums,
        cycles,
        num_sims,
    }
}

/// Compare two runs cycle by cycle, finding the first divergence.
///
/// `None` if the runs agree, `Some(cycle)` for the first cycle whose
/// checksum differs (0 means the initial states already differ).
///
/// # Panics
///
/// Panics if a cycle fails.
pub fn find_first_divergence<F, O>(setup_fn: F, orders: O, cycles: u64) -> Option<u64>
where
    F: Fn() -> Simulation,
    O: Fn(&GameState) -> Vec<PendingAction>,
{
    let mut first = setup_fn();
    let mut second = setup_fn();

    if first.checksum().ok() != second.checksum().ok() {
        return Some(0);
    }

    for cycle in 1..=cycles {
        let a = first.advance(&orders(first.state())).expect("cycle failed");
        let b = second.advance(&orders(second.state())).expect("cycle failed");
        if a.checksum != b.checksum {
            tracing::warn!(cycle, left = %a.checksum, right = %b.checksum, "Runs diverged");
            return Some(cycle);
        }
    }
    None
}

/// Verify that a bincode round trip preserves the state checksum exactly.
pub fn verify_serialization_determinism<F>(setup_fn: F, cycles: u64) -> bool
where
    F: Fn() -> Simulation,
{
    let mut sim = setup_fn();
    for _ in 0..cycles {
        if sim.advance(&[]).is_err() {
            return false;
        }
    }

    let Ok(before) = sim.checksum() else {
        return false;
    };
    let Ok(bytes) = sim.serialize_state() else {
        return false;
    };
    let mut restored = setup_fn();
    if restored.deserialize_state(&bytes).is_err() {
        return false;
    }
    restored.checksum().ok() == Some(before)
}

/// Proptest strategies for determinism testing.
///
/// These strategies generate random but reproducible action batches and
/// JSON documents for property-based tests.
pub mod strategies {
    use empire_core::action::{Action, PendingAction};
    use empire_core::hex::HexCoord;
    use empire_core::ids::{FleetId, PlanetId, PlayerId, TradeId};
    use empire_core::planet::{ImprovementType, PlanetOptions};
    use empire_core::production::{BuildKind, BuildQueueOp};
    use empire_core::research::{ResearchAllocation, ResearchCategory, ResearchItem};
    use empire_core::resources::Resource;
    use empire_core::ships::{ShipCounts, ShipType};
    use empire_core::trade::TradeAmount;
    use proptest::prelude::*;
    use serde_json::Value;

    /// Generate a hex within `radius` steps of the origin.
    pub fn arb_hex(radius: i32) -> impl Strategy<Value = HexCoord> {
        (-radius..=radius, -radius..=radius)
            .prop_filter("outside radius", move |(q, r)| (q + r).abs() <= radius)
            .prop_map(|(q, r)| HexCoord::new(q, r))
    }

    /// Generate a resource.
    pub fn arb_resource() -> impl Strategy<Value = Resource> {
        prop::sample::select(Resource::ALL.to_vec())
    }

    /// Generate a ship type.
    pub fn arb_ship_type() -> impl Strategy<Value = ShipType> {
        prop::sample::select(ShipType::ALL.to_vec())
    }

    /// Generate a research category.
    pub fn arb_category() -> impl Strategy<Value = ResearchCategory> {
        prop::sample::select(ResearchCategory::ALL.to_vec())
    }

    /// Generate a small ship composition (possibly empty).
    pub fn arb_ships() -> impl Strategy<Value = ShipCounts> {
        prop::collection::vec((arb_ship_type(), 0u32..4), 0..3)
            .prop_map(|pairs| pairs.into_iter().collect())
    }

    /// Generate a build kind.
    pub fn arb_build_kind() -> impl Strategy<Value = BuildKind> {
        prop_oneof![
            prop::sample::select(ImprovementType::ALL.to_vec()).prop_map(BuildKind::Improvement),
            arb_ship_type().prop_map(BuildKind::Starship),
        ]
    }

    /// Generate a build queue edit.
    pub fn arb_queue_op() -> impl Strategy<Value = BuildQueueOp> {
        prop_oneof![
            3 => arb_build_kind().prop_map(|kind| BuildQueueOp::Add { kind }),
            1 => (0usize..4).prop_map(|index| BuildQueueOp::Remove { index }),
            1 => (0usize..4).prop_map(|index| BuildQueueOp::MoveUp { index }),
            1 => (0usize..4).prop_map(|index| BuildQueueOp::MoveDown { index }),
            1 => prop::sample::select(ImprovementType::ALL.to_vec())
                .prop_map(|improvement| BuildQueueOp::Demolish { improvement }),
        ]
    }

    /// Generate a research split, valid or not.
    pub fn arb_allocation() -> impl Strategy<Value = ResearchAllocation> {
        prop::collection::vec((arb_category(), 0u32..60), 1..6)
            .prop_map(ResearchAllocation::from_pairs)
    }

    /// Generate any action against planets `1..=planets` in a galaxy of `radius`.
    pub fn arb_action(planets: u32, radius: i32) -> impl Strategy<Value = Action> {
        let planet = (1..=planets.max(1)).prop_map(PlanetId);
        prop_oneof![
            2 => arb_allocation().prop_map(|allocation| Action::SetResearchAllocation { allocation }),
            1 => (arb_category(), 1u32..4).prop_map(|(category, target_level)| {
                Action::QueueResearch {
                    item: ResearchItem {
                        category,
                        target_level,
                    },
                }
            }),
            1 => arb_category().prop_map(|category| Action::CancelResearch { category }),
            2 => (arb_resource(), 1u32..20, arb_resource(), 1u32..20).prop_map(|(o, a, r, b)| {
                Action::SubmitTrade {
                    offered: TradeAmount::new(o, a),
                    requested: TradeAmount::new(r, b),
                }
            }),
            1 => (1u32..5).prop_map(|id| Action::CancelTrade { trade: TradeId(id) }),
            4 => (planet.clone(), arb_queue_op()).prop_map(|(planet, op)| {
                Action::UpdateBuildQueue { planet, op }
            }),
            1 => (planet, 0u32..=100, 0u32..=100, any::<bool>()).prop_map(
                |(planet, food, ore, auto_spend)| {
                    let ore = ore.min(100 - food);
                    Action::SetPlanetOptions {
                        planet,
                        options: PlanetOptions {
                            food_percent: food,
                            ore_percent: ore,
                            industry_percent: 100 - food - ore,
                            auto_spend,
                        },
                    }
                }
            ),
            3 => (arb_hex(radius), arb_hex(radius), arb_ships())
                .prop_map(|(from, to, ships)| Action::SendShips { from, to, ships }),
            1 => (1u32..8).prop_map(|id| Action::ClearWaypoint { fleet: FleetId(id) }),
            2 => Just(Action::EndTurn),
        ]
    }

    /// Generate a batch of actions from players `1..=players`.
    ///
    /// Sequence numbers may repeat; ties are broken by player id.
    pub fn arb_batch(
        players: u32,
        planets: u32,
        radius: i32,
        max_len: usize,
    ) -> impl Strategy<Value = Vec<PendingAction>> {
        prop::collection::vec(
            (1..=players.max(1), 0u64..16, arb_action(planets, radius)),
            0..max_len,
        )
        .prop_map(|items| {
            items
                .into_iter()
                .map(|(player, sequence, action)| {
                    PendingAction::new(PlayerId(player), sequence, action)
                })
                .collect()
        })
    }

    /// Generate a JSON document with nested objects and arrays.
    pub fn arb_json() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::from),
            "[a-z]{0,6}".prop_map(Value::String),
        ];
        leaf.prop_recursive(3, 32, 6, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..5).prop_map(Value::Array),
                prop::collection::btree_map("[a-zA-Z_]{1,5}", inner, 0..5)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }
}
