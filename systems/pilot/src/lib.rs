#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Per-ship decision state machine.
//!
//! Every live ship is flown by a [`Pilot`]. Each turn the fleet controller
//! hands the pilot the ship's snapshot together with a [`PilotContext`] that
//! exposes the shared map, depot registry, budget and endgame flag. The pilot
//! updates its own state and answers with exactly one [`Command`]; it never
//! fails, falling back to staying in place when no rule fires.

mod harvester;

use harvester_core::{
    Budget, Command, DepotRegistry, EndgameFlag, GameConstants, MapQuery, Position, Role, ShipId,
    ShipSnapshot, Status,
};
use rand::Rng;
use serde::{Deserialize, Serialize};

pub use harvester::Harvester;

/// Thresholds steering the pilot's decisions.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PilotTuning {
    /// Turns a depositing ship must sit still before it considers building a dropoff.
    pub stall_threshold: u32,
    /// Share of cargo capacity above which a searching ship settles down to harvest.
    pub search_fill_ratio: f64,
    /// Share of cargo capacity at which a harvesting ship heads for a depot.
    pub deposit_fill_ratio: f64,
}

impl Default for PilotTuning {
    fn default() -> Self {
        Self {
            stall_threshold: 5,
            search_fill_ratio: 0.75,
            deposit_fill_ratio: 2.0 / 3.0,
        }
    }
}

/// Shared state a pilot reads and mutates while deciding.
///
/// Pilots are stepped one after another, so a pilot observes every depot,
/// budget and endgame change made by the pilots stepped before it this turn.
pub struct PilotContext<'a, M: ?Sized, R: ?Sized> {
    /// Map with this turn's navigation reservations.
    pub map: &'a mut M,
    /// Known depots, the shipyard first.
    pub depots: &'a mut DepotRegistry,
    /// Halite still uncommitted this turn.
    pub budget: &'a mut Budget,
    /// Set once any ship can no longer return in time.
    pub endgame: &'a mut EndgameFlag,
    /// Rule constants of the game.
    pub constants: &'a GameConstants,
    /// Decision thresholds.
    pub tuning: &'a PilotTuning,
    /// Current turn number.
    pub turn_number: u32,
    /// Home bases of every opponent.
    pub opponent_shipyards: &'a [Position],
    /// Source of tie-breaks and random picks.
    pub rng: &'a mut R,
}

impl<M: ?Sized, R: ?Sized> PilotContext<'_, M, R> {
    /// Turns left before the game ends.
    #[must_use]
    pub const fn turns_remaining(&self) -> u32 {
        self.constants.max_turns.saturating_sub(self.turn_number)
    }
}

/// Reports whether a ship `depot_distance` cells from its nearest depot can
/// still get there with margin before the game ends.
#[must_use]
pub const fn is_on_time(depot_distance: u32, turns_remaining: u32) -> bool {
    depot_distance.saturating_mul(2) <= turns_remaining
}

/// Decides whether a ship should convert itself into a dropoff where it stands.
///
/// Building is only worthwhile for a depositing ship that has been stuck for
/// longer than the stall threshold, when the walk left to the nearest depot is
/// longer than the time already lost, the bank covers the cost, and the
/// endgame has not started.
#[must_use]
pub fn should_build(
    status: Status,
    static_turns: u32,
    depot_distance: u32,
    budget: &Budget,
    dropoff_cost: u32,
    endgame: &EndgameFlag,
    tuning: &PilotTuning,
) -> bool {
    status == Status::Deposit
        && static_turns > tuning.stall_threshold
        && budget.can_afford(dropoff_cost)
        && depot_distance > static_turns
        && !endgame.is_set()
}

/// Closed set of role behaviours a pilot can carry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Crew {
    /// Collects halite and returns it to the nearest depot.
    Harvester(Harvester),
}

/// Durable decision state attached to one ship for its lifetime.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pilot {
    ship: ShipId,
    last_position: Position,
    static_turns: u32,
    crew: Crew,
}

impl Pilot {
    /// Creates the pilot for a ship seen for the first time.
    #[must_use]
    pub fn new(ship: &ShipSnapshot, role: Role) -> Self {
        let crew = match role {
            Role::Harvester => Crew::Harvester(Harvester::new(ship)),
        };

        Self {
            ship: ship.id,
            last_position: ship.position,
            static_turns: 0,
            crew,
        }
    }

    /// Ship flown by this pilot.
    #[must_use]
    pub const fn ship(&self) -> ShipId {
        self.ship
    }

    /// Role assigned at creation.
    #[must_use]
    pub const fn role(&self) -> Role {
        match self.crew {
            Crew::Harvester(_) => Role::Harvester,
        }
    }

    /// Current state of the decision machine.
    #[must_use]
    pub const fn status(&self) -> Status {
        match &self.crew {
            Crew::Harvester(harvester) => harvester.status(),
        }
    }

    /// Cell the pilot is travelling toward, when its state has one.
    #[must_use]
    pub const fn target(&self) -> Position {
        match &self.crew {
            Crew::Harvester(harvester) => harvester.target(),
        }
    }

    /// Consecutive turns the ship has not changed cell.
    #[must_use]
    pub const fn static_turns(&self) -> u32 {
        self.static_turns
    }

    /// Decides this turn's command for the ship.
    pub fn step<M, R>(&mut self, ship: &ShipSnapshot, context: &mut PilotContext<'_, M, R>) -> Command
    where
        M: MapQuery + ?Sized,
        R: Rng + ?Sized,
    {
        debug_assert_eq!(ship.id, self.ship, "pilot stepped with another ship");
        self.track_stall(ship.position);

        match &mut self.crew {
            Crew::Harvester(harvester) => harvester.step(ship, self.static_turns, context),
        }
    }

    fn track_stall(&mut self, position: Position) {
        if position == self.last_position {
            self.static_turns += 1;
        } else {
            self.static_turns = 0;
            self.last_position = position;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn on_time_uses_a_round_trip_margin() {
        assert!(is_on_time(3, 6));
        assert!(!is_on_time(3, 4));
        assert!(is_on_time(0, 0));
    }

    #[test]
    fn on_time_is_monotonic_in_remaining_turns() {
        for distance in 0..40 {
            let mut previous = false;
            for remaining in 0..100 {
                let current = is_on_time(distance, remaining);
                assert!(
                    current || !previous,
                    "distance {distance}: on time at {} but late at {remaining}",
                    remaining - 1
                );
                previous = current;
            }
        }
    }

    #[test]
    fn build_requires_funds_regardless_of_stall() {
        let budget = Budget::new(400);
        let endgame = EndgameFlag::default();
        let tuning = PilotTuning::default();
        for static_turns in 0..50 {
            assert!(!should_build(
                Status::Deposit,
                static_turns,
                100,
                &budget,
                500,
                &endgame,
                &tuning
            ));
        }
    }

    #[test]
    fn build_when_stuck_far_from_depots() {
        let budget = Budget::new(4000);
        let endgame = EndgameFlag::default();
        let tuning = PilotTuning::default();
        assert!(should_build(Status::Deposit, 6, 20, &budget, 4000, &endgame, &tuning));
        assert!(!should_build(Status::Deposit, 5, 20, &budget, 4000, &endgame, &tuning));
        assert!(!should_build(Status::Deposit, 6, 6, &budget, 4000, &endgame, &tuning));
        assert!(!should_build(Status::Runback, 6, 20, &budget, 4000, &endgame, &tuning));
    }

    #[test]
    fn build_is_disabled_in_the_endgame() {
        let budget = Budget::new(10_000);
        let mut endgame = EndgameFlag::default();
        endgame.trigger();
        let tuning = PilotTuning::default();
        assert!(!should_build(Status::Deposit, 9, 30, &budget, 4000, &endgame, &tuning));
    }

    #[test]
    fn stall_counter_resets_on_movement() {
        let ship = ShipSnapshot {
            id: ShipId::new(1),
            position: Position::new(2, 2),
            halite: 0,
        };
        let mut pilot = Pilot::new(&ship, Role::Harvester);
        pilot.track_stall(Position::new(2, 2));
        pilot.track_stall(Position::new(2, 2));
        assert_eq!(pilot.static_turns(), 2);

        pilot.track_stall(Position::new(3, 2));
        assert_eq!(pilot.static_turns(), 0);
        pilot.track_stall(Position::new(3, 2));
        assert_eq!(pilot.static_turns(), 1);
    }

    #[test]
    fn new_pilot_starts_searching() {
        let ship = ShipSnapshot {
            id: ShipId::new(8),
            position: Position::new(0, 1),
            halite: 0,
        };
        let pilot = Pilot::new(&ship, Role::Harvester);
        assert_eq!(pilot.status(), Status::Search);
        assert_eq!(pilot.role(), Role::Harvester);
        assert_eq!(pilot.ship(), ShipId::new(8));
    }
}
