#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative per-turn game state for the harvester bot.
//!
//! The engine owns the real game; this crate mirrors what it announces. A
//! [`Game`] is built once from the initialisation handshake and then patched
//! by every [`FrameUpdate`] the [`TurnTransport`] reads. Systems only ever see
//! the game through its accessors and the [`GameMap`]'s
//! [`MapQuery`](harvester_core::MapQuery) implementation.

mod map;
mod protocol;
mod transport;

use harvester_core::{GameConstants, MapQuery, PlayerId, PlayerSnapshot, ShipSnapshot};
use thiserror::Error;
use tracing::trace;

pub use map::GameMap;
pub use protocol::{encode_commands, FrameUpdate, PlayerFrame};
pub use transport::{StdioTransport, TurnTransport};

/// Errors raised while talking to the engine or applying what it sent.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Reading from or writing to the engine failed.
    #[error("engine I/O failed: {0}")]
    Io(#[from] std::io::Error),
    /// The engine closed the stream in the middle of a message.
    #[error("engine stream ended while reading the {expected}")]
    UnexpectedEof {
        /// Part of the message that was still outstanding.
        expected: &'static str,
    },
    /// A line held a token that is not a valid number for its field.
    #[error("line {line}: '{token}' is not a valid value")]
    InvalidNumber {
        /// One-based line number within the session.
        line: usize,
        /// Offending token.
        token: String,
    },
    /// A line held the wrong number of tokens.
    #[error("line {line}: expected {expected} fields, found {found}")]
    FieldCount {
        /// One-based line number within the session.
        line: usize,
        /// Number of tokens the message requires.
        expected: usize,
        /// Number of tokens present.
        found: usize,
    },
    /// The constants line was not valid JSON.
    #[error("could not parse game constants: {0}")]
    Constants(#[from] serde_json::Error),
    /// A frame referenced a player that was not announced at initialisation.
    #[error("player {0} is not part of this game")]
    UnknownPlayer(u32),
    /// The announced grid dimensions disagree with the halite values sent.
    #[error("a {width}x{height} map cannot hold {cells} cells")]
    GridSize {
        /// Announced number of columns.
        width: u32,
        /// Announced number of rows.
        height: u32,
        /// Number of halite values received.
        cells: usize,
    },
}

/// Mirror of the engine's game state as of the latest frame.
#[derive(Clone, Debug)]
pub struct Game {
    constants: GameConstants,
    my_id: PlayerId,
    me_index: usize,
    players: Vec<PlayerSnapshot>,
    turn_number: u32,
    map: GameMap,
}

impl Game {
    /// Creates a game from the initialisation handshake.
    ///
    /// Players are kept in ascending id order. Fails if `my_id` is not among
    /// them.
    pub fn new(
        constants: GameConstants,
        my_id: PlayerId,
        mut players: Vec<PlayerSnapshot>,
        map: GameMap,
    ) -> Result<Self, ProtocolError> {
        players.sort_by_key(|player| player.id);
        let me_index = players
            .iter()
            .position(|player| player.id == my_id)
            .ok_or(ProtocolError::UnknownPlayer(my_id.get()))?;

        Ok(Self {
            constants,
            my_id,
            me_index,
            players,
            turn_number: 0,
            map,
        })
    }

    /// Rule constants of this game.
    #[must_use]
    pub const fn constants(&self) -> &GameConstants {
        &self.constants
    }

    /// Identifier of the player this bot controls.
    #[must_use]
    pub const fn my_id(&self) -> PlayerId {
        self.my_id
    }

    /// Turn number of the latest frame; zero before the first frame.
    #[must_use]
    pub const fn turn_number(&self) -> u32 {
        self.turn_number
    }

    /// Turns left before the game ends.
    #[must_use]
    pub const fn turns_remaining(&self) -> u32 {
        self.constants.max_turns.saturating_sub(self.turn_number)
    }

    /// State of the player this bot controls.
    #[must_use]
    pub fn me(&self) -> &PlayerSnapshot {
        &self.players[self.me_index]
    }

    /// Every player, this bot included, in ascending id order.
    #[must_use]
    pub fn players(&self) -> &[PlayerSnapshot] {
        &self.players
    }

    /// Every player except this bot.
    pub fn opponents(&self) -> impl Iterator<Item = &PlayerSnapshot> {
        let my_id = self.my_id;
        self.players.iter().filter(move |player| player.id != my_id)
    }

    /// Own ships in ascending id order.
    #[must_use]
    pub fn my_ships(&self) -> Vec<ShipSnapshot> {
        let mut ships = self.me().ships.clone();
        ships.sort_by_key(|ship| ship.id);
        ships
    }

    /// Read access to the map.
    #[must_use]
    pub const fn map(&self) -> &GameMap {
        &self.map
    }

    /// Mutable access to the map, used for navigation reservations.
    pub fn map_mut(&mut self) -> &mut GameMap {
        &mut self.map
    }

    /// Applies a frame: new turn number, fresh player assets, halite deltas.
    ///
    /// Previous reservations are dropped and every ship's cell is marked as
    /// occupied so navigation avoids running into a ship that stays put.
    pub fn apply_frame(&mut self, frame: FrameUpdate) -> Result<(), ProtocolError> {
        for update in frame.players {
            let player = self
                .players
                .iter_mut()
                .find(|player| player.id == update.id)
                .ok_or(ProtocolError::UnknownPlayer(update.id.get()))?;
            player.halite = update.halite;
            player.ships = update.ships;
            player.dropoffs = update.dropoffs;
        }

        for (position, halite) in frame.cell_updates {
            self.map.set_halite(position, halite);
        }

        self.turn_number = frame.turn_number;
        self.map.clear_reservations();
        for player in &self.players {
            for ship in &player.ships {
                self.map.mark_unsafe(ship.position);
            }
        }

        trace!(turn = self.turn_number, "frame applied");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harvester_core::{Position, ShipId};

    fn player(id: u32, shipyard: Position) -> PlayerSnapshot {
        PlayerSnapshot {
            id: PlayerId::new(id),
            shipyard,
            halite: 5000,
            ships: Vec::new(),
            dropoffs: Vec::new(),
        }
    }

    fn two_player_game() -> Game {
        Game::new(
            GameConstants::default(),
            PlayerId::new(1),
            vec![player(1, Position::new(6, 2)), player(0, Position::new(2, 2))],
            GameMap::filled(8, 4, 10).expect("valid grid"),
        )
        .expect("player 1 is present")
    }

    #[test]
    fn rejects_missing_self() {
        let result = Game::new(
            GameConstants::default(),
            PlayerId::new(3),
            vec![player(0, Position::new(0, 0))],
            GameMap::filled(2, 2, 0).expect("valid grid"),
        );
        assert!(matches!(result, Err(ProtocolError::UnknownPlayer(3))));
    }

    #[test]
    fn players_are_sorted_and_opponents_exclude_self() {
        let game = two_player_game();
        assert_eq!(game.me().shipyard, Position::new(6, 2));
        assert_eq!(game.players()[0].id, PlayerId::new(0));
        let opponents: Vec<_> = game.opponents().map(|player| player.id).collect();
        assert_eq!(opponents, vec![PlayerId::new(0)]);
    }

    #[test]
    fn frame_replaces_assets_and_marks_ship_cells() {
        let mut game = two_player_game();
        let ship = ShipSnapshot {
            id: ShipId::new(4),
            position: Position::new(5, 2),
            halite: 120,
        };
        game.apply_frame(FrameUpdate {
            turn_number: 7,
            players: vec![PlayerFrame {
                id: PlayerId::new(1),
                halite: 4000,
                ships: vec![ship],
                dropoffs: Vec::new(),
            }],
            cell_updates: vec![(Position::new(5, 2), 0)],
        })
        .expect("frame applies");

        assert_eq!(game.turn_number(), 7);
        assert_eq!(game.turns_remaining(), 393);
        assert_eq!(game.me().halite, 4000);
        assert_eq!(game.my_ships(), vec![ship]);
        assert_eq!(game.map().halite_at(Position::new(5, 2)), 0);
        assert!(game.map().is_occupied(Position::new(5, 2)));
        assert!(!game.map().is_occupied(Position::new(4, 2)));
    }

    #[test]
    fn frame_for_unknown_player_is_rejected() {
        let mut game = two_player_game();
        let error = game
            .apply_frame(FrameUpdate {
                turn_number: 1,
                players: vec![PlayerFrame {
                    id: PlayerId::new(9),
                    halite: 0,
                    ships: Vec::new(),
                    dropoffs: Vec::new(),
                }],
                cell_updates: Vec::new(),
            })
            .expect_err("player 9 was never announced");
        assert!(matches!(error, ProtocolError::UnknownPlayer(9)));
    }
}
