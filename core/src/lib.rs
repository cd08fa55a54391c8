#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the harvester bot.
//!
//! This crate defines the value types that connect the engine adapter, the
//! per-turn world snapshot, and the decision systems. The world crate fills a
//! snapshot from the engine, the fleet controller steps one pilot per live
//! ship against that snapshot, and every pilot answers with exactly one
//! [`Command`]. Map access goes through the [`MapQuery`] trait so systems never
//! depend on a concrete grid.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique identifier the engine assigns to a ship. Never reused within a game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShipId(u32);

impl ShipId {
    /// Creates a new ship identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ShipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Unique identifier the engine assigns to a player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(u32);

impl PlayerId {
    /// Creates a new player identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Location of a single grid cell.
///
/// Coordinates are signed so that offsets may step past the map edge; the
/// map's [`MapQuery::normalize`] wraps them back onto the torus.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    x: i32,
    y: i32,
}

impl Position {
    /// Creates a new grid position.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Column of the position.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Row of the position.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// Position reached by taking one step in `direction`, without wrapping.
    #[must_use]
    pub const fn directional_offset(self, direction: Direction) -> Self {
        let (dx, dy) = direction.offset();
        Self::new(self.x + dx, self.y + dy)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Single-step movement directions, including staying in place.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Movement toward decreasing row indices.
    North,
    /// Movement toward increasing row indices.
    South,
    /// Movement toward increasing column indices.
    East,
    /// Movement toward decreasing column indices.
    West,
    /// No movement.
    Still,
}

impl Direction {
    /// The four cardinal directions in a fixed order.
    pub const CARDINALS: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    /// Column and row delta applied by the direction.
    #[must_use]
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Self::North => (0, -1),
            Self::South => (0, 1),
            Self::East => (1, 0),
            Self::West => (-1, 0),
            Self::Still => (0, 0),
        }
    }

    /// Direction pointing the opposite way.
    #[must_use]
    pub const fn invert(self) -> Self {
        match self {
            Self::North => Self::South,
            Self::South => Self::North,
            Self::East => Self::West,
            Self::West => Self::East,
            Self::Still => Self::Still,
        }
    }
}

/// Orders that a turn may contain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Command {
    /// Moves a ship one cell, or keeps it in place with [`Direction::Still`].
    Move {
        /// Ship receiving the order.
        ship: ShipId,
        /// Direction of travel.
        direction: Direction,
    },
    /// Converts a ship into a dropoff on the cell it occupies.
    ConvertToDropoff {
        /// Ship that is consumed by the conversion.
        ship: ShipId,
    },
    /// Produces a new ship at the home shipyard.
    Spawn,
}

impl Command {
    /// Order that keeps `ship` where it is.
    #[must_use]
    pub const fn stay(ship: ShipId) -> Self {
        Self::Move {
            ship,
            direction: Direction::Still,
        }
    }

    /// Ship addressed by the command, if any.
    #[must_use]
    pub const fn ship(&self) -> Option<ShipId> {
        match self {
            Self::Move { ship, .. } | Self::ConvertToDropoff { ship } => Some(*ship),
            Self::Spawn => None,
        }
    }
}

/// Rule constants announced by the engine before the first turn.
///
/// Field names on the wire follow the engine's constants dictionary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConstants {
    /// Maximum cargo a ship may carry.
    #[serde(rename = "MAX_ENERGY")]
    pub max_halite: u32,
    /// Bank cost of producing a ship.
    #[serde(rename = "NEW_ENTITY_ENERGY_COST")]
    pub ship_cost: u32,
    /// Bank cost of converting a ship into a dropoff.
    #[serde(rename = "DROPOFF_COST")]
    pub dropoff_cost: u32,
    /// Turn number on which the game ends.
    #[serde(rename = "MAX_TURNS")]
    pub max_turns: u32,
    /// A ship staying on a cell collects one `extract_ratio`-th of its halite.
    #[serde(rename = "EXTRACT_RATIO")]
    pub extract_ratio: u32,
    /// Moving off a cell costs one `move_cost_ratio`-th of its halite.
    #[serde(rename = "MOVE_COST_RATIO")]
    pub move_cost_ratio: u32,
}

impl Default for GameConstants {
    fn default() -> Self {
        Self {
            max_halite: 1000,
            ship_cost: 1000,
            dropoff_cost: 4000,
            max_turns: 400,
            extract_ratio: 4,
            move_cost_ratio: 10,
        }
    }
}

/// Immutable representation of a single ship used for decisions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ShipSnapshot {
    /// Identifier assigned by the engine.
    pub id: ShipId,
    /// Cell currently occupied by the ship.
    pub position: Position,
    /// Cargo currently carried.
    pub halite: u32,
}

/// Immutable representation of a player's banked state and assets.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayerSnapshot {
    /// Identifier assigned by the engine.
    pub id: PlayerId,
    /// Home base where ships are produced and cargo may be deposited.
    pub shipyard: Position,
    /// Banked halite.
    pub halite: u32,
    /// Ships alive this turn, in the order the engine reported them.
    pub ships: Vec<ShipSnapshot>,
    /// Dropoffs built by the player, excluding the shipyard.
    pub dropoffs: Vec<Position>,
}

/// Behaviour assigned to a pilot when its ship is first seen.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    /// Collects halite and returns it to the nearest depot.
    Harvester,
}

impl Role {
    /// Every role a new pilot may be assigned.
    pub const ALL: [Role; 1] = [Role::Harvester];

    /// Upper-case tag used in logs.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Harvester => "HARVESTER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// State of a pilot's decision machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Status {
    /// Construction placeholder; left before the first decision.
    Inactive,
    /// Wandering toward richer cells.
    Search,
    /// Staying on a cell to collect its halite.
    Harvest,
    /// Returning cargo to the nearest depot.
    Deposit,
    /// Returning cargo before the game ends.
    Runback,
    /// Out of useful work; drifting toward an opponent's base.
    Leaving,
}

impl Status {
    /// Upper-case tag used in logs.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Inactive => "INACTIVE",
            Self::Search => "SEARCH",
            Self::Harvest => "HARVEST",
            Self::Deposit => "DEPOSIT",
            Self::Runback => "RUNBACK",
            Self::Leaving => "LEAVING",
        }
    }

    /// Reports whether the deadline pre-check already applies to this state.
    #[must_use]
    pub const fn is_endgame(self) -> bool {
        matches!(self, Self::Runback | Self::Leaving)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Append-only list of positions where cargo can be deposited.
///
/// The first entry is always the home shipyard, so the list is never empty
/// and [`DepotRegistry::nearest`] always has an answer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DepotRegistry {
    depots: Vec<Position>,
    added_this_turn: bool,
    revision: u64,
}

impl DepotRegistry {
    /// Creates a registry seeded with the home shipyard.
    #[must_use]
    pub fn new(home: Position) -> Self {
        Self {
            depots: vec![home],
            added_this_turn: false,
            revision: 0,
        }
    }

    /// Records a newly built depot.
    pub fn register(&mut self, position: Position) {
        self.depots.push(position);
        self.added_this_turn = true;
        self.revision += 1;
    }

    /// Clears the "added this turn" marker. Called once at the start of a turn.
    pub fn begin_turn(&mut self) {
        self.added_this_turn = false;
    }

    /// Reports whether a depot was registered since the last [`Self::begin_turn`].
    #[must_use]
    pub const fn added_this_turn(&self) -> bool {
        self.added_this_turn
    }

    /// Counter bumped by every registration.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Number of known depots, the shipyard included. Always at least one.
    #[must_use]
    pub fn len(&self) -> usize {
        self.depots.len()
    }

    /// Home shipyard that seeded the registry.
    #[must_use]
    pub fn home(&self) -> Position {
        self.depots[0]
    }

    /// Depots in registration order.
    #[must_use]
    pub fn as_slice(&self) -> &[Position] {
        &self.depots
    }

    /// Closest depot to `from` and its distance. Ties keep the older depot.
    #[must_use]
    pub fn nearest<M>(&self, from: Position, map: &M) -> (Position, u32)
    where
        M: MapQuery + ?Sized,
    {
        let home = self.home();
        self.depots
            .iter()
            .skip(1)
            .fold((home, map.distance(from, home)), |best, &depot| {
                let distance = map.distance(from, depot);
                if distance < best.1 {
                    (depot, distance)
                } else {
                    best
                }
            })
    }
}

/// Spendable halite for the current turn.
///
/// Refreshed from the bank at the start of every turn and debited locally as
/// the controller commits to spends the engine has not yet applied.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Budget {
    available: u32,
}

impl Budget {
    /// Creates a budget holding `available` halite.
    #[must_use]
    pub const fn new(available: u32) -> Self {
        Self { available }
    }

    /// Replaces the local figure with the authoritative bank balance.
    pub fn refresh(&mut self, banked: u32) {
        self.available = banked;
    }

    /// Halite still uncommitted this turn.
    #[must_use]
    pub const fn available(&self) -> u32 {
        self.available
    }

    /// Reports whether `cost` could be paid right now.
    #[must_use]
    pub const fn can_afford(&self, cost: u32) -> bool {
        self.available >= cost
    }

    /// Debits `cost` if affordable. Returns whether the spend was committed.
    #[must_use]
    pub fn try_spend(&mut self, cost: u32) -> bool {
        match self.available.checked_sub(cost) {
            Some(remaining) => {
                self.available = remaining;
                true
            }
            None => false,
        }
    }
}

/// One-way switch that disables further capital commitments.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EndgameFlag(bool);

impl EndgameFlag {
    /// Sets the flag. There is no way to clear it.
    pub fn trigger(&mut self) {
        self.0 = true;
    }

    /// Reports whether the endgame has started.
    #[must_use]
    pub const fn is_set(&self) -> bool {
        self.0
    }
}

/// Read access to the game map plus the navigation reservations of a turn.
pub trait MapQuery {
    /// Wraps `position` onto the map.
    fn normalize(&self, position: Position) -> Position;

    /// Shortest Manhattan distance between two cells on the wrapped grid.
    fn distance(&self, source: Position, target: Position) -> u32;

    /// Halite lying on the cell.
    fn halite_at(&self, position: Position) -> u32;

    /// Reports whether a ship occupies or has reserved the cell this turn.
    fn is_occupied(&self, position: Position) -> bool;

    /// Reserves the cell so later ships avoid moving onto it.
    fn mark_unsafe(&mut self, position: Position);

    /// Directions that shorten the distance to `destination`, ignoring other ships.
    fn unsafe_moves(&self, source: Position, destination: Position) -> Vec<Direction>;

    /// Normalized cardinal neighbours in [`Direction::CARDINALS`] order.
    fn cardinals(&self, position: Position) -> [Position; 4] {
        Direction::CARDINALS.map(|direction| self.normalize(position.directional_offset(direction)))
    }

    /// Picks the first shortening step whose cell is free and reserves it.
    ///
    /// Returns [`Direction::Still`] when every shortening step is blocked.
    fn navigate(&mut self, source: Position, destination: Position) -> Direction {
        for direction in self.unsafe_moves(source, destination) {
            let next = self.normalize(source.directional_offset(direction));
            if !self.is_occupied(next) {
                self.mark_unsafe(next);
                return direction;
            }
        }
        Direction::Still
    }
}

#[cfg(test)]
mod tests {
    use super::{
        Budget, Command, DepotRegistry, Direction, EndgameFlag, MapQuery, Position, ShipId,
    };
    use serde::{de::DeserializeOwned, Serialize};

    /// Unbounded plane with no halite, enough to exercise distance lookups.
    struct Plane;

    impl MapQuery for Plane {
        fn normalize(&self, position: Position) -> Position {
            position
        }

        fn distance(&self, source: Position, target: Position) -> u32 {
            source.x().abs_diff(target.x()) + source.y().abs_diff(target.y())
        }

        fn halite_at(&self, _position: Position) -> u32 {
            0
        }

        fn is_occupied(&self, _position: Position) -> bool {
            false
        }

        fn mark_unsafe(&mut self, _position: Position) {}

        fn unsafe_moves(&self, _source: Position, _destination: Position) -> Vec<Direction> {
            Vec::new()
        }
    }

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn command_round_trips_through_bincode() {
        assert_round_trip(&Command::Move {
            ship: ShipId::new(7),
            direction: Direction::West,
        });
        assert_round_trip(&Command::Spawn);
    }

    #[test]
    fn registry_starts_with_home() {
        let registry = DepotRegistry::new(Position::new(4, 4));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.home(), Position::new(4, 4));
        assert_eq!(registry.nearest(Position::new(0, 0), &Plane), (Position::new(4, 4), 8));
    }

    #[test]
    fn registry_tracks_additions_per_turn() {
        let mut registry = DepotRegistry::new(Position::new(0, 0));
        registry.register(Position::new(10, 0));
        assert!(registry.added_this_turn());
        assert_eq!(registry.revision(), 1);

        registry.begin_turn();
        assert!(!registry.added_this_turn());
        assert_eq!(registry.revision(), 1, "revision survives the turn boundary");
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn nearest_prefers_closer_depot_and_keeps_older_on_ties() {
        let mut registry = DepotRegistry::new(Position::new(0, 0));
        registry.register(Position::new(10, 0));
        registry.register(Position::new(0, 10));

        assert_eq!(registry.nearest(Position::new(8, 0), &Plane).0, Position::new(10, 0));
        assert_eq!(registry.nearest(Position::new(5, 5), &Plane).0, Position::new(0, 0));
    }

    #[test]
    fn budget_refuses_overdraft() {
        let mut budget = Budget::new(400);
        assert!(!budget.can_afford(500));
        assert!(!budget.try_spend(500));
        assert_eq!(budget.available(), 400);

        assert!(budget.try_spend(400));
        assert_eq!(budget.available(), 0);
        assert!(!budget.try_spend(1));
    }

    #[test]
    fn endgame_flag_is_one_way() {
        let mut flag = EndgameFlag::default();
        assert!(!flag.is_set());
        flag.trigger();
        flag.trigger();
        assert!(flag.is_set());
    }

    #[test]
    fn direction_invert_is_an_involution() {
        for direction in Direction::CARDINALS {
            assert_ne!(direction.invert(), direction);
            assert_eq!(direction.invert().invert(), direction);
        }
    }

    #[test]
    fn default_navigation_reserves_the_chosen_cell() {
        struct Corridor {
            reserved: Vec<Position>,
        }

        impl MapQuery for Corridor {
            fn normalize(&self, position: Position) -> Position {
                position
            }

            fn distance(&self, source: Position, target: Position) -> u32 {
                source.x().abs_diff(target.x()) + source.y().abs_diff(target.y())
            }

            fn halite_at(&self, _position: Position) -> u32 {
                0
            }

            fn is_occupied(&self, position: Position) -> bool {
                self.reserved.contains(&position)
            }

            fn mark_unsafe(&mut self, position: Position) {
                self.reserved.push(position);
            }

            fn unsafe_moves(&self, _source: Position, _destination: Position) -> Vec<Direction> {
                vec![Direction::East, Direction::South]
            }
        }

        let mut corridor = Corridor {
            reserved: vec![Position::new(1, 0)],
        };
        let origin = Position::new(0, 0);
        let direction = corridor.navigate(origin, Position::new(3, 3));

        assert_eq!(direction, Direction::South, "blocked east step falls through");
        assert!(corridor.is_occupied(Position::new(0, 1)));
    }
}
