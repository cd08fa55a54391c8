#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Fleet controller coordinating every pilot for one turn.
//!
//! The [`Brain`] owns the state that outlives a turn at fleet level: the pilot
//! of every live ship, the depot registry, the spendable budget and the
//! endgame flag. Once per turn it pulls a frame, steps the pilots in ascending
//! ship-id order, decides whether to spawn and hands the batch back to the
//! transport.

use std::collections::{BTreeMap, BTreeSet};

use harvester_core::{
    Budget, Command, DepotRegistry, EndgameFlag, MapQuery, Position, Role, ShipId,
};
use harvester_system_pilot::{Pilot, PilotContext, PilotTuning};
use harvester_world::{Game, ProtocolError, TurnTransport};
use rand::{seq::SliceRandom, Rng};
use rand_distr::{Distribution, Exp};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Fleet-level policy parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrainConfig {
    /// Turns, counted from the first, on which an affordable spawn always happens.
    pub guaranteed_spawn_turns: u32,
    /// Divides the turn number to give the rate of the spawn threshold's
    /// exponential distribution; larger values keep spawning going longer.
    pub spawn_rate_divisor: f64,
    /// Thresholds handed to every pilot.
    pub pilot: PilotTuning,
}

impl Default for BrainConfig {
    fn default() -> Self {
        Self {
            guaranteed_spawn_turns: 2,
            spawn_rate_divisor: 20.0,
            pilot: PilotTuning::default(),
        }
    }
}

/// Summary of one planned turn.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TurnReport {
    /// Turn the commands were planned for.
    pub turn: u32,
    /// Batch submitted to the engine, ship commands first.
    pub commands: Vec<Command>,
    /// Whether the batch ends with a spawn.
    pub spawned: bool,
    /// Whether a pilot converted its ship into a dropoff this turn.
    pub depot_added: bool,
    /// Whether the endgame flag is set after the turn.
    pub endgame: bool,
}

/// Owner of all fleet-level state.
#[derive(Debug)]
pub struct Brain<R> {
    config: BrainConfig,
    pilots: BTreeMap<ShipId, Pilot>,
    depots: DepotRegistry,
    budget: Budget,
    endgame: EndgameFlag,
    rng: R,
}

impl<R: Rng> Brain<R> {
    /// Creates the controller for a freshly connected game.
    #[must_use]
    pub fn new(game: &Game, config: BrainConfig, rng: R) -> Self {
        Self {
            config,
            pilots: BTreeMap::new(),
            depots: DepotRegistry::new(game.me().shipyard),
            budget: Budget::new(game.me().halite),
            endgame: EndgameFlag::default(),
            rng,
        }
    }

    /// Depots known to the fleet.
    #[must_use]
    pub const fn depots(&self) -> &DepotRegistry {
        &self.depots
    }

    /// Budget left after the last planned turn.
    #[must_use]
    pub const fn budget(&self) -> Budget {
        self.budget
    }

    /// Whether the endgame has started.
    #[must_use]
    pub const fn endgame(&self) -> EndgameFlag {
        self.endgame
    }

    /// Pilot flying `ship`, if the ship was alive last turn.
    #[must_use]
    pub fn pilot(&self, ship: ShipId) -> Option<&Pilot> {
        self.pilots.get(&ship)
    }

    /// Number of pilots currently tracked.
    #[must_use]
    pub fn pilot_count(&self) -> usize {
        self.pilots.len()
    }

    /// Runs one full turn against the engine.
    ///
    /// Returns `Ok(None)` once the engine has ended the game.
    pub fn step<T>(
        &mut self,
        transport: &mut T,
        game: &mut Game,
    ) -> Result<Option<TurnReport>, ProtocolError>
    where
        T: TurnTransport + ?Sized,
    {
        self.depots.begin_turn();
        if !transport.update_frame(game)? {
            info!(turn = game.turn_number(), "engine ended the game");
            return Ok(None);
        }

        let report = self.decide(game);
        transport.end_turn(&report.commands)?;
        Ok(Some(report))
    }

    /// Plans a turn from a game that already holds the current frame.
    pub fn plan_turn(&mut self, game: &mut Game) -> TurnReport {
        self.depots.begin_turn();
        self.decide(game)
    }

    fn decide(&mut self, game: &mut Game) -> TurnReport {
        let turn = game.turn_number();
        let constants = *game.constants();
        let ships = game.my_ships();
        let opponent_shipyards: Vec<Position> =
            game.opponents().map(|player| player.shipyard).collect();
        self.budget.refresh(game.me().halite);

        let map = game.map_mut();
        let mut commands = Vec::with_capacity(ships.len() + 1);
        for ship in &ships {
            let pilot = self.pilots.entry(ship.id).or_insert_with(|| {
                let role = Role::ALL
                    .choose(&mut self.rng)
                    .copied()
                    .unwrap_or(Role::Harvester);
                Pilot::new(ship, role)
            });

            let mut context = PilotContext {
                map: &mut *map,
                depots: &mut self.depots,
                budget: &mut self.budget,
                endgame: &mut self.endgame,
                constants: &constants,
                tuning: &self.config.pilot,
                turn_number: turn,
                opponent_shipyards: &opponent_shipyards,
                rng: &mut self.rng,
            };
            commands.push(pilot.step(ship, &mut context));
        }

        self.reap(ships.iter().map(|ship| ship.id).collect());

        let home = self.depots.home();
        let spawned = !self.endgame.is_set()
            && self.budget.can_afford(constants.ship_cost)
            && !map.is_occupied(home)
            && spawn_roll(turn, &self.config, &mut self.rng)
            && self.budget.try_spend(constants.ship_cost);
        if spawned {
            info!(turn, bank = self.budget.available(), "spawning ship");
            commands.push(Command::Spawn);
        }

        let report = TurnReport {
            turn,
            commands,
            spawned,
            depot_added: self.depots.added_this_turn(),
            endgame: self.endgame.is_set(),
        };
        debug!(
            turn,
            ships = ships.len(),
            commands = report.commands.len(),
            depots = self.depots.len(),
            endgame = report.endgame,
            "turn planned"
        );
        report
    }

    fn reap(&mut self, live: BTreeSet<ShipId>) {
        let before = self.pilots.len();
        self.pilots.retain(|ship, _| live.contains(ship));
        let reaped = before - self.pilots.len();
        if reaped > 0 {
            debug!(reaped, "dropped pilots of lost ships");
        }
    }
}

/// Random part of the spawn policy.
///
/// The first `guaranteed_spawn_turns` turns always spawn. Afterwards a
/// threshold is drawn from an exponential distribution whose rate grows with
/// the turn number, and the roll succeeds when a uniform draw from `[0, 1)`
/// does not exceed it, so spawning tapers off as the game goes on.
pub fn spawn_roll<R: Rng + ?Sized>(turn: u32, config: &BrainConfig, rng: &mut R) -> bool {
    if turn <= config.guaranteed_spawn_turns {
        return true;
    }

    let rate = f64::from(turn) / config.spawn_rate_divisor;
    match Exp::new(rate) {
        Ok(distribution) => {
            let threshold = distribution.sample(rng);
            rng.gen::<f64>() <= threshold
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn spawn_rate(turn: u32, trials: u32) -> f64 {
        let config = BrainConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(u64::from(turn));
        let hits = (0..trials)
            .filter(|_| spawn_roll(turn, &config, &mut rng))
            .count();
        hits as f64 / f64::from(trials)
    }

    #[test]
    fn opening_turns_always_spawn() {
        let config = BrainConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..100 {
            assert!(spawn_roll(1, &config, &mut rng));
            assert!(spawn_roll(2, &config, &mut rng));
        }
    }

    #[test]
    fn spawning_tapers_off_late_in_the_game() {
        let early = spawn_rate(3, 2000);
        let late = spawn_rate(400, 2000);
        assert!(early > 0.8, "early spawn rate {early}");
        assert!(late < 0.15, "late spawn rate {late}");
    }

    #[test]
    fn invalid_rate_never_spawns() {
        let config = BrainConfig {
            spawn_rate_divisor: -20.0,
            ..BrainConfig::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        assert!(!spawn_roll(10, &config, &mut rng));
    }
}
