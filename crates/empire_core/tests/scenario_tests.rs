//! End-to-end cycle scenarios for empire_core.
//!
//! Each test builds a small state, runs whole cycles through the public
//! simulation API and checks the observable outcome: state, notifications
//! and checksums.

use empire_core::action::Action;
use empire_core::error::GameError;
use empire_core::hex::HexCoord;
use empire_core::ids::{PlanetId, PlayerId, TradeId};
use empire_core::notification::{BattleResult, LossReason, NotificationKind, Phase};
use empire_core::planet::ImprovementType;
use empire_core::production::{BuildKind, BuildQueueOp};
use empire_core::resources::{Resource, ResourceStock};
use empire_core::rules::Rules;
use empire_core::ships::{ShipCounts, ShipStats, ShipType};
use empire_core::simulation::Simulation;
use empire_core::trade::TradeAmount;
use empire_test_utils::fixtures::{all_in, duel, hungry_world, pending, standoff};

// =============================================================================
// Economy
// =============================================================================

mod economy {
    use super::*;

    /// Population 10, no food in stock, 5 farmed against a need of 8.
    #[test]
    fn test_starvation_kills_the_shortfall() {
        let mut sim = Simulation::new(hungry_world(), Rules::default());
        let report = sim.advance(&[]).unwrap();

        let planet = &sim.state().planets[&PlanetId(1)];
        assert_eq!(planet.population, 7);
        assert_eq!(planet.stock.food, 0);
        assert!(report.notifications.iter().any(|n| {
            n.phase == Phase::Population
                && n.kind
                    == NotificationKind::Starvation {
                        planet: PlanetId(1),
                        owner: PlayerId(1),
                        shortfall: 3,
                        deaths: 3,
                        population: 7,
                    }
        }));
    }

    #[test]
    fn test_population_never_goes_negative() {
        let mut sim = Simulation::new(hungry_world(), Rules::default());
        for _ in 0..20 {
            sim.advance(&[]).unwrap();
        }
        let planet = &sim.state().planets[&PlanetId(1)];
        assert_eq!(planet.population, 0);
        assert!(planet.owner.is_none());
        assert!(sim.state().players[&PlayerId(1)].is_eliminated());
    }

    #[test]
    fn test_ledgers_balance_while_starving() {
        let mut sim = Simulation::new(hungry_world(), Rules::default());
        for _ in 0..6 {
            let report = sim.advance(&[]).unwrap();
            for ledger in report.ledgers.values() {
                assert!(ledger.is_balanced(), "{ledger:?}");
            }
        }
    }
}

// =============================================================================
// Build queue
// =============================================================================

mod production {
    use super::*;

    /// Items costing 10 and 20 at 4 points per cycle: the head finishes on
    /// the third cycle and the surplus is not carried to the next item.
    #[test]
    fn test_head_completes_after_ceil_cost_over_points() {
        let mut rules = Rules::default();
        rules.ships.insert(
            ShipType::Fighter,
            ShipStats {
                cost: 20,
                ..ShipStats::builtin(ShipType::Fighter)
            },
        );
        let mut state = hungry_world();
        {
            let home = state.planets.get_mut(&PlanetId(1)).unwrap();
            home.options = all_in(60, 0, 40);
            home.max_population = 10;
            home.stock.food = 200;
        }
        let mut sim = Simulation::new(state, rules);

        let orders = vec![
            pending(
                1,
                0,
                Action::UpdateBuildQueue {
                    planet: PlanetId(1),
                    op: BuildQueueOp::Add {
                        kind: BuildKind::Improvement(ImprovementType::Farm),
                    },
                },
            ),
            pending(
                1,
                1,
                Action::UpdateBuildQueue {
                    planet: PlanetId(1),
                    op: BuildQueueOp::Add {
                        kind: BuildKind::Starship(ShipType::Fighter),
                    },
                },
            ),
        ];

        let mut completed_at = None;
        for cycle in 0..3 {
            let batch = if cycle == 0 { orders.clone() } else { Vec::new() };
            let report = sim.advance(&batch).unwrap();
            assert!(report.rejected.is_empty());
            if report
                .notifications
                .iter()
                .any(|n| matches!(n.kind, NotificationKind::BuildCompleted { .. }))
            {
                completed_at = Some(cycle);
            }
        }
        assert_eq!(completed_at, Some(2));

        let home = &sim.state().planets[&PlanetId(1)];
        assert_eq!(home.improvements.farm, 1);
        let head = home.build_queue.head().unwrap();
        assert_eq!(head.kind, BuildKind::Starship(ShipType::Fighter));
        assert_eq!(head.remaining_cost, 20);
    }

    #[test]
    fn test_reordering_keeps_progress() {
        let mut state = hungry_world();
        {
            let home = state.planets.get_mut(&PlanetId(1)).unwrap();
            home.options = all_in(60, 0, 40);
            home.max_population = 10;
            home.stock.food = 200;
        }
        let mut sim = Simulation::new(state, Rules::default());
        let add = |seq, kind| {
            pending(
                1,
                seq,
                Action::UpdateBuildQueue {
                    planet: PlanetId(1),
                    op: BuildQueueOp::Add { kind },
                },
            )
        };
        sim.advance(&[
            add(0, BuildKind::Improvement(ImprovementType::Factory)),
            add(1, BuildKind::Improvement(ImprovementType::Mine)),
        ])
        .unwrap();
        sim.advance(&[pending(
            1,
            0,
            Action::UpdateBuildQueue {
                planet: PlanetId(1),
                op: BuildQueueOp::MoveUp { index: 1 },
            },
        )])
        .unwrap();

        let queue: Vec<(BuildKind, u32)> = sim.state().planets[&PlanetId(1)]
            .build_queue
            .iter()
            .map(|item| (item.kind, item.remaining_cost))
            .collect();
        // factory got 4 points before the move, the mine 4 after
        assert_eq!(
            queue,
            vec![
                (BuildKind::Improvement(ImprovementType::Mine), 8),
                (BuildKind::Improvement(ImprovementType::Factory), 11),
            ]
        );
    }
}

// =============================================================================
// Fleets and combat
// =============================================================================

mod fleets {
    use super::*;

    /// Distance from (-3, 0) to (0, 1) is sqrt(13) ≈ 3.61 and frigates fly
    /// 3 per cycle, so the fleet lands on the second cycle.
    #[test]
    fn test_arrival_after_ceil_distance_over_speed() {
        let mut sim = Simulation::new(duel(), Rules::default());
        let target = HexCoord::new(0, 1);
        let first = sim
            .advance(&[pending(
                1,
                0,
                Action::SendShips {
                    from: HexCoord::new(-3, 0),
                    to: target,
                    ships: ShipCounts::of(ShipType::Frigate, 1),
                },
            )])
            .unwrap();
        assert!(first.rejected.is_empty());
        assert!(!first
            .notifications
            .iter()
            .any(|n| matches!(n.kind, NotificationKind::FleetArrived { .. })));

        let second = sim.advance(&[]).unwrap();
        assert!(second.notifications.iter().any(|n| matches!(
            n.kind,
            NotificationKind::FleetArrived { owner: PlayerId(1), hex, .. } if hex == target
        )));
        let at_target = sim.state().fleets.stationary_at(target);
        assert_eq!(at_target.len(), 1);
    }

    /// Two equal fleets at an undefended planet destroy each other.
    #[test]
    fn test_equal_fleets_mutual_destruction() {
        let mut sim = Simulation::new(standoff(), Rules::default());
        let report = sim.advance(&[]).unwrap();

        let battles: Vec<_> = report
            .notifications
            .iter()
            .filter_map(|n| match &n.kind {
                NotificationKind::Battle(b) => Some(b),
                _ => None,
            })
            .collect();
        assert_eq!(battles.len(), 1);
        assert_eq!(battles[0].result, BattleResult::MutualDestruction);
        assert_eq!(battles[0].attacker_strength, battles[0].defender_strength);

        assert!(sim.state().fleets.stationary_at(HexCoord::ORIGIN).is_empty());
        assert!(sim.state().planets[&PlanetId(1)].owner.is_none());
        assert!(report.notifications.iter().any(|n| n.kind
            == NotificationKind::PlanetLost {
                planet: PlanetId(1),
                owner: PlayerId(2),
                reason: LossReason::MutualDestruction,
            }));
        // player 2 has nothing left
        assert!(report.game_over);
        assert!(report.notifications.iter().any(|n| n.kind
            == NotificationKind::GameOver {
                winner: Some(PlayerId(1))
            }));
    }

    /// The outcome of a battle does not depend on which side spawned first.
    #[test]
    fn test_combat_symmetry_under_id_order() {
        let survivors = |strong_first: bool| {
            let mut state = empire_test_utils::fixtures::empty_game(2, 2);
            state
                .add_planet(empire_test_utils::fixtures::owned_planet(
                    1,
                    "Aster Prime",
                    HexCoord::new(-2, 0),
                    1,
                    10,
                ))
                .unwrap();
            state
                .add_planet(empire_test_utils::fixtures::owned_planet(
                    2,
                    "Borealis Prime",
                    HexCoord::new(2, 0),
                    2,
                    10,
                ))
                .unwrap();
            let strong = ShipCounts::of(ShipType::Frigate, 5);
            let weak = ShipCounts::of(ShipType::Frigate, 3);
            if strong_first {
                state.fleets.spawn(PlayerId(1), strong, HexCoord::ORIGIN);
                state.fleets.spawn(PlayerId(2), weak, HexCoord::ORIGIN);
            } else {
                state.fleets.spawn(PlayerId(2), weak, HexCoord::ORIGIN);
                state.fleets.spawn(PlayerId(1), strong, HexCoord::ORIGIN);
            }
            let mut sim = Simulation::new(state, Rules::default());
            sim.advance(&[]).unwrap();
            sim.state()
                .fleets
                .iter()
                .filter(|f| f.position() == Some(HexCoord::ORIGIN))
                .map(|f| (f.owner, f.ships.clone()))
                .collect::<Vec<_>>()
        };

        let a = survivors(true);
        let b = survivors(false);
        assert_eq!(a, b);
        // 40 against 24: the winner loses floor(5 * 24 / 40) = 3 frigates
        assert_eq!(a, vec![(PlayerId(1), ShipCounts::of(ShipType::Frigate, 2))]);
    }
}

// =============================================================================
// Scheduling, trade and session integrity
// =============================================================================

mod scheduling {
    use super::*;

    fn fed_duel() -> Simulation {
        let mut state = duel();
        for planet in state.planets.values_mut() {
            planet.stock.food = 100;
        }
        Simulation::new(state, Rules::default())
    }

    /// Actions apply in arrival order regardless of which player sent them.
    #[test]
    fn test_actions_apply_in_arrival_order() {
        let mut sim = fed_duel();
        let mut state = sim.state().clone();
        state.players.get_mut(&PlayerId(1)).unwrap().stock.ore = 50;
        state.players.get_mut(&PlayerId(2)).unwrap().stock.energy = 50;
        sim = Simulation::new(state, Rules::default());

        sim.advance(&[
            pending(
                1,
                7,
                Action::SubmitTrade {
                    offered: TradeAmount::new(Resource::Ore, 10),
                    requested: TradeAmount::new(Resource::Iridium, 5),
                },
            ),
            pending(
                2,
                3,
                Action::SubmitTrade {
                    offered: TradeAmount::new(Resource::Energy, 10),
                    requested: TradeAmount::new(Resource::Iridium, 5),
                },
            ),
        ])
        .unwrap();

        let trades = &sim.state().trades;
        assert_eq!(trades.get(TradeId(1)).unwrap().player, PlayerId(2));
        assert_eq!(trades.get(TradeId(2)).unwrap().player, PlayerId(1));
    }

    #[test]
    fn test_mirrored_offers_settle() {
        let mut state = fed_duel().state().clone();
        state.players.get_mut(&PlayerId(1)).unwrap().stock = ResourceStock {
            ore: 50,
            ..ResourceStock::ZERO
        };
        state.players.get_mut(&PlayerId(2)).unwrap().stock = ResourceStock {
            food: 30,
            ..ResourceStock::ZERO
        };
        let mut sim = Simulation::new(state, Rules::default());
        let report = sim
            .advance(&[
                pending(
                    1,
                    0,
                    Action::SubmitTrade {
                        offered: TradeAmount::new(Resource::Ore, 20),
                        requested: TradeAmount::new(Resource::Food, 10),
                    },
                ),
                pending(
                    2,
                    1,
                    Action::SubmitTrade {
                        offered: TradeAmount::new(Resource::Food, 10),
                        requested: TradeAmount::new(Resource::Ore, 20),
                    },
                ),
            ])
            .unwrap();

        assert!(report
            .notifications
            .iter()
            .any(|n| matches!(n.kind, NotificationKind::TradeMatched { .. })));
        let players = &sim.state().players;
        assert_eq!(players[&PlayerId(1)].stock.ore, 30);
        assert_eq!(players[&PlayerId(1)].stock.food, 10);
        assert_eq!(players[&PlayerId(2)].stock.food, 20);
        assert_eq!(players[&PlayerId(2)].stock.ore, 20);
        assert!(sim.state().trades.is_empty());
    }

    #[test]
    fn test_broken_state_aborts_session() {
        let mut state = duel();
        // ownership changed behind the player's back
        state.planets.get_mut(&PlanetId(3)).unwrap().owner = Some(PlayerId(2));
        let mut sim = Simulation::new(state, Rules::default());

        assert!(matches!(
            sim.advance(&[]),
            Err(GameError::InvariantViolation { cycle: 0, .. })
        ));
        assert_eq!(sim.aborted_at(), Some(0));
        assert!(matches!(
            sim.advance(&[]),
            Err(GameError::SessionAborted { cycle: 0 })
        ));
    }

    #[test]
    fn test_checksum_is_reported_and_reproducible() {
        let mut a = fed_duel();
        let mut b = fed_duel();
        for _ in 0..10 {
            let ra = a.advance(&[]).unwrap();
            let rb = b.advance(&[]).unwrap();
            assert_eq!(ra.checksum, rb.checksum);
            assert_eq!(ra.checksum, a.checksum().unwrap());
        }
    }
}

// =============================================================================
// Malformed payloads
// =============================================================================

mod malformed {
    use super::*;
    use empire_core::research::{ResearchAllocation, ResearchCategory};

    fn action(json: &str) -> Action {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_wrapping_worker_split_is_dropped() {
        let mut sim = Simulation::new(duel(), Rules::default());
        let before = sim.state().planets[&PlanetId(1)].options;
        let options = action(
            r#"{"set_planet_options":{"planet":1,"options":{
                "food_percent":4294967295,"ore_percent":101,"industry_percent":0,"auto_spend":true}}}"#,
        );

        let report = sim.advance(&[pending(1, 0, options)]).unwrap();
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].code, "invalid_allocation");
        assert_eq!(sim.state().planets[&PlanetId(1)].options, before);
    }

    #[test]
    fn test_zero_ship_counts_never_make_a_fleet() {
        let mut sim = Simulation::new(duel(), Rules::default());
        let send = action(
            r#"{"send_ships":{"from":{"q":-3,"r":0},"to":{"q":0,"r":1},"ships":{"Frigate":0}}}"#,
        );

        let report = sim.advance(&[pending(1, 0, send)]).unwrap();
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].code, "empty_send_order");
        assert_eq!(sim.state().fleets.len(), 2);
        assert!(sim.state().fleets.iter().all(|f| f.ships.is_normalized()));
    }

    #[test]
    fn test_zero_entries_are_stripped_from_a_real_send() {
        let mut sim = Simulation::new(duel(), Rules::default());
        let send = action(
            r#"{"send_ships":{"from":{"q":-3,"r":0},"to":{"q":0,"r":1},"ships":{"Frigate":1,"Scout":0}}}"#,
        );

        let report = sim.advance(&[pending(1, 0, send)]).unwrap();
        assert!(report.rejected.is_empty());
        assert_eq!(sim.state().fleets.len(), 3);
        assert!(sim
            .state()
            .fleets
            .iter()
            .all(|f| f.ships.is_normalized() && !f.ships.is_empty()));
    }

    #[test]
    fn test_out_of_range_research_split_is_dropped() {
        let mut sim = Simulation::new(duel(), Rules::default());
        let split = action(
            r#"{"set_research_allocation":{"allocation":{"Weapons":4294967295,"Shields":101}}}"#,
        );

        let report = sim.advance(&[pending(1, 0, split)]).unwrap();
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].code, "invalid_allocation");
        assert_eq!(
            sim.state().players[&PlayerId(1)].research.allocation,
            ResearchAllocation::default()
        );
    }

    #[test]
    fn test_zero_research_shares_are_ignored() {
        let mut sim = Simulation::new(duel(), Rules::default());
        let split = action(
            r#"{"set_research_allocation":{"allocation":{"Weapons":100,"Shields":0}}}"#,
        );

        let report = sim.advance(&[pending(1, 0, split)]).unwrap();
        assert!(report.rejected.is_empty());
        let allocation = &sim.state().players[&PlayerId(1)].research.allocation;
        assert_eq!(allocation.get(ResearchCategory::Weapons), 100);
        assert_eq!(allocation.iter().count(), 1);
    }
}
