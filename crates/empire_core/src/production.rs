//! Build queues.
//!
//! Each planet has one ordered queue. Only the head item receives production
//! points; when its remaining cost reaches zero it completes and the next
//! item becomes head.
//!
//! # Item lifecycle
//!
//! ```text
//! Queued ──(becomes head)──> InProgress ──(remaining = 0)──> Completed
//!    │                           │
//!    └──────(remove / planet lost)┴──> Removed
//! ```
//!
//! Progress belongs to the item: moving a partially built item away from the
//! head keeps its remaining cost. Production points beyond what the head
//! needs are lost at the cycle boundary; nothing carries over to the next
//! item.

use serde::{Deserialize, Serialize};

use crate::error::ActionError;
use crate::planet::{ImprovementType, Planet};
use crate::rules::Rules;
use crate::ships::ShipType;

/// What a queue item produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildKind {
    /// A permanent planetary improvement.
    Improvement(ImprovementType),
    /// A starship, delivered to the planet's garrison.
    Starship(ShipType),
}

impl BuildKind {
    /// Production cost under a ruleset.
    #[must_use]
    pub fn cost(self, rules: &Rules) -> u32 {
        match self {
            Self::Improvement(improvement) => rules.improvement_cost(improvement),
            Self::Starship(ship) => rules.ship(ship).cost,
        }
    }

    /// Check if this is an improvement.
    #[must_use]
    pub const fn is_improvement(self) -> bool {
        matches!(self, Self::Improvement(_))
    }
}

/// Derived state of a queued item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildItemState {
    /// Waiting behind the head.
    Queued,
    /// Head of the queue, receiving production.
    InProgress,
}

/// One entry of a build queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildQueueItem {
    /// Insertion order within this queue.
    pub sequence: u32,
    /// What is being built.
    pub kind: BuildKind,
    /// Cost when queued.
    pub total_cost: u32,
    /// Production still needed.
    pub remaining_cost: u32,
}

impl BuildQueueItem {
    /// Progress as a percentage (0-100).
    #[must_use]
    pub fn percentage(&self) -> u32 {
        if self.total_cost == 0 {
            100
        } else {
            (self.total_cost - self.remaining_cost) * 100 / self.total_cost
        }
    }
}

/// Player edits to a build queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildQueueOp {
    /// Append an item.
    Add {
        /// What to build.
        kind: BuildKind,
    },
    /// Remove the item at `index`.
    Remove {
        /// Queue position.
        index: usize,
    },
    /// Swap the item at `index` with the one before it.
    MoveUp {
        /// Queue position.
        index: usize,
    },
    /// Swap the item at `index` with the one after it.
    MoveDown {
        /// Queue position.
        index: usize,
    },
    /// Tear down a built improvement. Refunds nothing, frees a slot.
    Demolish {
        /// Improvement to remove.
        improvement: ImprovementType,
    },
}

/// Ordered build queue of one planet.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BuildQueue {
    items: Vec<BuildQueueItem>,
    next_sequence: u32,
}

impl BuildQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an item without any validation.
    pub fn push(&mut self, kind: BuildKind, cost: u32) -> u32 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.items.push(BuildQueueItem {
            sequence,
            kind,
            total_cost: cost,
            remaining_cost: cost,
        });
        sequence
    }

    /// Remove the item at `index`.
    pub fn remove(&mut self, index: usize) -> Result<BuildQueueItem, ActionError> {
        if index < self.items.len() {
            Ok(self.items.remove(index))
        } else {
            Err(ActionError::InvalidQueueIndex(index))
        }
    }

    /// Swap the item at `index` with its predecessor.
    pub fn move_up(&mut self, index: usize) -> Result<(), ActionError> {
        if index >= self.items.len() {
            return Err(ActionError::InvalidQueueIndex(index));
        }
        if index == 0 {
            return Err(ActionError::CannotMove(index));
        }
        self.items.swap(index - 1, index);
        Ok(())
    }

    /// Swap the item at `index` with its successor.
    pub fn move_down(&mut self, index: usize) -> Result<(), ActionError> {
        if index >= self.items.len() {
            return Err(ActionError::InvalidQueueIndex(index));
        }
        if index + 1 == self.items.len() {
            return Err(ActionError::CannotMove(index));
        }
        self.items.swap(index, index + 1);
        Ok(())
    }

    /// The item receiving production.
    #[must_use]
    pub fn head(&self) -> Option<&BuildQueueItem> {
        self.items.first()
    }

    /// State of the item at `index`.
    #[must_use]
    pub fn state_of(&self, index: usize) -> Option<BuildItemState> {
        match index {
            i if i >= self.items.len() => None,
            0 => Some(BuildItemState::InProgress),
            _ => Some(BuildItemState::Queued),
        }
    }

    /// Apply production points to the head item.
    ///
    /// Returns the completed item, if the head finished. Points beyond the
    /// head's remaining cost are discarded.
    pub fn advance(&mut self, points: u32) -> Option<BuildQueueItem> {
        let head = self.items.first_mut()?;
        head.remaining_cost = head.remaining_cost.saturating_sub(points);
        if head.remaining_cost == 0 {
            Some(self.items.remove(0))
        } else {
            None
        }
    }

    /// Number of queued improvement items.
    #[must_use]
    pub fn queued_improvements(&self) -> u32 {
        let count = self.items.iter().filter(|i| i.kind.is_improvement()).count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    /// All items, head first.
    pub fn iter(&self) -> impl Iterator<Item = &BuildQueueItem> {
        self.items.iter()
    }

    /// Number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Remove every item.
    pub fn clear(&mut self) {
        self.items.clear();
    }
}

/// Apply a player's queue edit to a planet.
///
/// Caps are enforced here so client mirrors that call the same function
/// reject exactly what the server rejects.
pub fn apply_queue_op(planet: &mut Planet, op: &BuildQueueOp, rules: &Rules) -> Result<(), ActionError> {
    match *op {
        BuildQueueOp::Add { kind } => {
            if planet.build_queue.len() >= rules.max_queue_length {
                return Err(ActionError::QueueFull);
            }
            if kind.is_improvement() && planet.free_improvement_slots() == 0 {
                return Err(ActionError::NoImprovementSlot);
            }
            planet.build_queue.push(kind, kind.cost(rules));
            Ok(())
        }
        BuildQueueOp::Remove { index } => planet.build_queue.remove(index).map(|_| ()),
        BuildQueueOp::MoveUp { index } => planet.build_queue.move_up(index),
        BuildQueueOp::MoveDown { index } => planet.build_queue.move_down(index),
        BuildQueueOp::Demolish { improvement } => {
            if planet.improvements.decrement(improvement) {
                Ok(())
            } else {
                Err(ActionError::NothingToDemolish)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hex::HexCoord;
    use crate::ids::{PlanetId, PlayerId};

    fn planet() -> Planet {
        Planet::new(PlanetId(1), "Vega", HexCoord::ORIGIN)
            .with_owner(PlayerId(1))
            .with_population(10)
    }

    #[test]
    fn test_only_head_accrues() {
        let mut queue = BuildQueue::new();
        queue.push(BuildKind::Improvement(ImprovementType::Farm), 10);
        queue.push(BuildKind::Starship(ShipType::Fighter), 20);

        assert!(queue.advance(4).is_none());
        let remaining: Vec<u32> = queue.iter().map(|i| i.remaining_cost).collect();
        assert_eq!(remaining, vec![6, 20]);
    }

    #[test]
    fn test_head_completes_after_ceil_cycles_without_carry_over() {
        let mut queue = BuildQueue::new();
        queue.push(BuildKind::Improvement(ImprovementType::Farm), 10);
        queue.push(BuildKind::Starship(ShipType::Fighter), 20);

        assert!(queue.advance(4).is_none());
        assert!(queue.advance(4).is_none());
        let done = queue.advance(4).unwrap();
        assert_eq!(done.kind, BuildKind::Improvement(ImprovementType::Farm));

        let head = queue.head().unwrap();
        assert_eq!(head.kind, BuildKind::Starship(ShipType::Fighter));
        assert_eq!(head.remaining_cost, 20);
        assert_eq!(queue.state_of(0), Some(BuildItemState::InProgress));
    }

    #[test]
    fn test_reorder_keeps_progress() {
        let mut queue = BuildQueue::new();
        queue.push(BuildKind::Improvement(ImprovementType::Farm), 10);
        queue.push(BuildKind::Improvement(ImprovementType::Mine), 12);
        queue.advance(7);

        queue.move_down(0).unwrap();
        let items: Vec<(BuildKind, u32)> =
            queue.iter().map(|i| (i.kind, i.remaining_cost)).collect();
        assert_eq!(
            items,
            vec![
                (BuildKind::Improvement(ImprovementType::Mine), 12),
                (BuildKind::Improvement(ImprovementType::Farm), 3),
            ]
        );
        assert_eq!(queue.state_of(1), Some(BuildItemState::Queued));
    }

    #[test]
    fn test_move_bounds() {
        let mut queue = BuildQueue::new();
        queue.push(BuildKind::Starship(ShipType::Scout), 6);
        assert_eq!(queue.move_up(0), Err(ActionError::CannotMove(0)));
        assert_eq!(queue.move_down(0), Err(ActionError::CannotMove(0)));
        assert_eq!(queue.move_up(3), Err(ActionError::InvalidQueueIndex(3)));
        assert_eq!(
            queue.remove(1).unwrap_err(),
            ActionError::InvalidQueueIndex(1)
        );
    }

    #[test]
    fn test_add_enforces_caps() {
        let rules = Rules {
            max_queue_length: 2,
            ..Rules::default()
        };
        let mut planet = planet();
        planet.improvement_slots = 1;

        let add_farm = BuildQueueOp::Add {
            kind: BuildKind::Improvement(ImprovementType::Farm),
        };
        apply_queue_op(&mut planet, &add_farm, &rules).unwrap();
        assert_eq!(
            apply_queue_op(&mut planet, &add_farm, &rules),
            Err(ActionError::NoImprovementSlot)
        );

        let add_scout = BuildQueueOp::Add {
            kind: BuildKind::Starship(ShipType::Scout),
        };
        apply_queue_op(&mut planet, &add_scout, &rules).unwrap();
        assert_eq!(
            apply_queue_op(&mut planet, &add_scout, &rules),
            Err(ActionError::QueueFull)
        );
        assert_eq!(planet.build_queue.head().unwrap().total_cost, 10);
    }

    #[test]
    fn test_demolish_frees_slot_without_refund() {
        let rules = Rules::default();
        let mut planet = planet();
        planet.improvement_slots = 1;
        planet.improvements.increment(ImprovementType::Factory);
        let stock_before = planet.stock;

        let demolish = BuildQueueOp::Demolish {
            improvement: ImprovementType::Factory,
        };
        apply_queue_op(&mut planet, &demolish, &rules).unwrap();
        assert_eq!(planet.free_improvement_slots(), 1);
        assert_eq!(planet.stock, stock_before);
        assert_eq!(
            apply_queue_op(&mut planet, &demolish, &rules),
            Err(ActionError::NothingToDemolish)
        );
    }
}
