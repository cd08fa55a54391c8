//! Harvester role: search, harvest, deposit and the endgame run back.

use harvester_core::{Command, Direction, MapQuery, Position, Role, ShipId, ShipSnapshot, Status};
use rand::{seq::SliceRandom, Rng};
use tracing::{debug, info};

use crate::{is_on_time, should_build, PilotContext};

/// Statuses a single step may pass through before a command is forced.
///
/// The only re-entry is a harvester on a depleted cell dropping back to search.
const MAX_DISPATCH_HOPS: usize = 2;

enum Dispatch {
    Issue(Command),
    Reenter,
}

/// Collects halite around the map and brings it back to the nearest depot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Harvester {
    status: Status,
    target: Position,
    seen_revision: u64,
}

impl Harvester {
    pub(crate) fn new(ship: &ShipSnapshot) -> Self {
        let mut harvester = Self {
            status: Status::Inactive,
            target: ship.position,
            seen_revision: 0,
        };
        info!(ship = %ship.id, role = %Role::Harvester, "pilot assigned");
        harvester.enter(ship.id, Status::Search);
        harvester
    }

    /// Current state of the decision machine.
    #[must_use]
    pub const fn status(&self) -> Status {
        self.status
    }

    /// Depot or shipyard the harvester is heading for.
    ///
    /// Only meaningful while depositing, running back or leaving.
    #[must_use]
    pub const fn target(&self) -> Position {
        self.target
    }

    pub(crate) fn step<M, R>(
        &mut self,
        ship: &ShipSnapshot,
        static_turns: u32,
        context: &mut PilotContext<'_, M, R>,
    ) -> Command
    where
        M: MapQuery + ?Sized,
        R: Rng + ?Sized,
    {
        let (depot, distance) = context.depots.nearest(ship.position, &*context.map);
        let remaining = context.turns_remaining();
        if !self.status.is_endgame() && !is_on_time(distance, remaining) {
            info!(ship = %ship.id, distance, remaining, "out of time, running back");
            self.enter(ship.id, Status::Runback);
            context.endgame.trigger();
            self.aim_at(depot, context.depots.revision());
        }

        if should_build(
            self.status,
            static_turns,
            distance,
            &*context.budget,
            context.constants.dropoff_cost,
            &*context.endgame,
            context.tuning,
        ) && context.budget.try_spend(context.constants.dropoff_cost)
        {
            context.depots.register(ship.position);
            info!(
                ship = %ship.id,
                position = %ship.position,
                static_turns,
                distance,
                "converting to dropoff"
            );
            return Command::ConvertToDropoff { ship: ship.id };
        }

        let mut hops = 0;
        loop {
            let dispatch = match self.status {
                Status::Inactive | Status::Search => self.search(ship, context),
                Status::Harvest => self.harvest(ship, context),
                Status::Deposit => self.deposit(ship, context),
                Status::Runback => self.run_back(ship, context),
                Status::Leaving => self.leave(ship, context),
            };

            match dispatch {
                Dispatch::Issue(command) => return command,
                Dispatch::Reenter => {
                    hops += 1;
                    debug_assert!(hops < MAX_DISPATCH_HOPS, "status re-entered {hops} times");
                    if hops >= MAX_DISPATCH_HOPS {
                        return Command::stay(ship.id);
                    }
                }
            }
        }
    }

    fn search<M, R>(&mut self, ship: &ShipSnapshot, context: &mut PilotContext<'_, M, R>) -> Dispatch
    where
        M: MapQuery + ?Sized,
        R: Rng + ?Sized,
    {
        let here = context.map.halite_at(ship.position);
        let (richest, richest_halite) =
            richest_neighbor(ship.position, &*context.map, &mut *context.rng);

        let extracted = here.div_ceil(context.constants.extract_ratio.max(1));
        let projected = f64::from(ship.halite.saturating_add(extracted));
        let settle_limit =
            f64::from(context.constants.max_halite) * context.tuning.search_fill_ratio;

        if richest_halite <= here || projected > settle_limit {
            self.enter(ship.id, Status::Harvest);
            return Dispatch::Issue(Command::stay(ship.id));
        }

        let direction = context.map.navigate(ship.position, richest);
        Dispatch::Issue(Command::Move {
            ship: ship.id,
            direction,
        })
    }

    fn harvest<M, R>(&mut self, ship: &ShipSnapshot, context: &mut PilotContext<'_, M, R>) -> Dispatch
    where
        M: MapQuery + ?Sized,
        R: Rng + ?Sized,
    {
        let capacity = f64::from(context.constants.max_halite);
        let cargo = f64::from(ship.halite);

        // A depleted cell sends a ship with room to spare looking elsewhere
        // this very turn.
        if context.map.halite_at(ship.position) == 0
            && cargo < capacity * context.tuning.search_fill_ratio
        {
            self.enter(ship.id, Status::Search);
            return Dispatch::Reenter;
        }

        if cargo >= capacity * context.tuning.deposit_fill_ratio {
            let (depot, _) = context.depots.nearest(ship.position, &*context.map);
            self.enter(ship.id, Status::Deposit);
            self.aim_at(depot, context.depots.revision());
        }
        Dispatch::Issue(Command::stay(ship.id))
    }

    fn deposit<M, R>(&mut self, ship: &ShipSnapshot, context: &mut PilotContext<'_, M, R>) -> Dispatch
    where
        M: MapQuery + ?Sized,
        R: Rng + ?Sized,
    {
        if ship.position == self.target {
            self.enter(ship.id, Status::Search);
            return Dispatch::Issue(Command::stay(ship.id));
        }

        self.refresh_target(ship, context);
        let direction = context.map.navigate(ship.position, self.target);
        Dispatch::Issue(Command::Move {
            ship: ship.id,
            direction,
        })
    }

    fn run_back<M, R>(&mut self, ship: &ShipSnapshot, context: &mut PilotContext<'_, M, R>) -> Dispatch
    where
        M: MapQuery + ?Sized,
        R: Rng + ?Sized,
    {
        if ship.position == self.target {
            // With no opponent to head for the ship parks on the depot.
            self.target = context
                .opponent_shipyards
                .choose(&mut *context.rng)
                .map_or(ship.position, |&shipyard| context.map.normalize(shipyard));
            self.enter(ship.id, Status::Leaving);
            return Dispatch::Issue(Command::stay(ship.id));
        }

        self.refresh_target(ship, context);
        let direction = context.map.navigate(ship.position, self.target);
        Dispatch::Issue(Command::Move {
            ship: ship.id,
            direction,
        })
    }

    fn leave<M, R>(&mut self, ship: &ShipSnapshot, context: &mut PilotContext<'_, M, R>) -> Dispatch
    where
        M: MapQuery + ?Sized,
        R: Rng + ?Sized,
    {
        // Leaving ships neither check nor make reservations.
        let direction = context
            .map
            .unsafe_moves(ship.position, self.target)
            .first()
            .copied()
            .unwrap_or(Direction::Still);
        Dispatch::Issue(Command::Move {
            ship: ship.id,
            direction,
        })
    }

    fn refresh_target<M, R>(&mut self, ship: &ShipSnapshot, context: &PilotContext<'_, M, R>)
    where
        M: MapQuery + ?Sized,
        R: ?Sized,
    {
        let revision = context.depots.revision();
        if revision != self.seen_revision {
            let (depot, distance) = context.depots.nearest(ship.position, &*context.map);
            debug!(ship = %ship.id, depot = %depot, distance, "depot list changed, retargeting");
            self.aim_at(depot, revision);
        }
    }

    fn aim_at(&mut self, target: Position, revision: u64) {
        self.target = target;
        self.seen_revision = revision;
    }

    fn enter(&mut self, ship: ShipId, status: Status) {
        if self.status != status {
            debug!(
                ship = %ship,
                role = %Role::Harvester,
                from = %self.status,
                to = %status,
                "status change"
            );
            self.status = status;
        }
    }
}

/// Richest of the four neighbours; ties go to whichever the shuffle put first.
fn richest_neighbor<M, R>(position: Position, map: &M, rng: &mut R) -> (Position, u32)
where
    M: MapQuery + ?Sized,
    R: Rng + ?Sized,
{
    let mut neighbors = map.cardinals(position);
    neighbors.shuffle(rng);

    let first = (neighbors[0], map.halite_at(neighbors[0]));
    neighbors[1..].iter().fold(first, |best, &cell| {
        let halite = map.halite_at(cell);
        if halite > best.1 {
            (cell, halite)
        } else {
            best
        }
    })
}
