//! Codec for the engine's newline-delimited text protocol.

use std::io::BufRead;

use harvester_core::{
    Command, Direction, GameConstants, PlayerId, PlayerSnapshot, Position, ShipId, ShipSnapshot,
};

use crate::{Game, GameMap, ProtocolError};

/// Per-turn delta announced by the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameUpdate {
    /// Turn the frame belongs to.
    pub turn_number: u32,
    /// Fresh state of every player.
    pub players: Vec<PlayerFrame>,
    /// Cells whose halite changed since the previous frame.
    pub cell_updates: Vec<(Position, u32)>,
}

/// One player's section of a [`FrameUpdate`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayerFrame {
    /// Player the section describes.
    pub id: PlayerId,
    /// Banked halite.
    pub halite: u32,
    /// Ships alive this turn.
    pub ships: Vec<ShipSnapshot>,
    /// Dropoffs owned by the player.
    pub dropoffs: Vec<Position>,
}

/// Encodes a command batch as the single line the engine expects.
#[must_use]
pub fn encode_commands(commands: &[Command]) -> String {
    commands
        .iter()
        .map(|command| match command {
            Command::Move { ship, direction } => {
                format!("m {} {}", ship.get(), direction_code(*direction))
            }
            Command::ConvertToDropoff { ship } => format!("c {}", ship.get()),
            Command::Spawn => "g".to_owned(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

const fn direction_code(direction: Direction) -> char {
    match direction {
        Direction::North => 'n',
        Direction::South => 's',
        Direction::East => 'e',
        Direction::West => 'w',
        Direction::Still => 'o',
    }
}

/// Line source that remembers where it is for error reporting.
#[derive(Debug)]
pub(crate) struct LineReader<R> {
    reader: R,
    buffer: String,
    line: usize,
}

impl<R: BufRead> LineReader<R> {
    pub(crate) fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: String::new(),
            line: 0,
        }
    }

    fn next_line(&mut self) -> Result<Option<&str>, ProtocolError> {
        self.buffer.clear();
        if self.reader.read_line(&mut self.buffer)? == 0 {
            return Ok(None);
        }
        self.line += 1;
        Ok(Some(self.buffer.trim_end()))
    }

    fn expect_line(&mut self, expected: &'static str) -> Result<&str, ProtocolError> {
        self.next_line()?
            .ok_or(ProtocolError::UnexpectedEof { expected })
    }

    fn expect_fields<const N: usize>(
        &mut self,
        expected: &'static str,
    ) -> Result<[i64; N], ProtocolError> {
        let line_number = self.line + 1;
        let line = self.expect_line(expected)?;
        fields(line, line_number)
    }
}

/// Reads the initialisation handshake: constants, players and the full map.
pub(crate) fn read_init<R: BufRead>(lines: &mut LineReader<R>) -> Result<Game, ProtocolError> {
    let constants: GameConstants = serde_json::from_str(lines.expect_line("game constants")?)?;

    let line = lines.line + 1;
    let [player_count, my_id] = lines.expect_fields::<2>("player count")?;
    let player_count = narrow::<u32>(player_count, line)?;
    let my_id = PlayerId::new(narrow(my_id, line)?);

    let mut players = Vec::new();
    for _ in 0..player_count {
        let line = lines.line + 1;
        let [id, x, y] = lines.expect_fields::<3>("player shipyard")?;
        players.push(PlayerSnapshot {
            id: PlayerId::new(narrow(id, line)?),
            shipyard: Position::new(narrow(x, line)?, narrow(y, line)?),
            halite: 0,
            ships: Vec::new(),
            dropoffs: Vec::new(),
        });
    }

    let line = lines.line + 1;
    let [width, height] = lines.expect_fields::<2>("map dimensions")?;
    let width = narrow::<u32>(width, line)?;
    let height = narrow::<u32>(height, line)?;

    let mut halite = Vec::new();
    for _ in 0..height {
        let line_number = lines.line + 1;
        let row = lines.expect_line("map row")?;
        let start = halite.len();
        for token in row.split_whitespace() {
            halite.push(parse_number::<u32>(token, line_number)?);
        }
        let found = halite.len() - start;
        if found != width as usize {
            return Err(ProtocolError::FieldCount {
                line: line_number,
                expected: width as usize,
                found,
            });
        }
    }

    let map = GameMap::new(width, height, halite)?;
    Game::new(constants, my_id, players, map)
}

/// Reads one frame. `Ok(None)` means the engine closed the stream between
/// frames, which is how a game ends.
pub(crate) fn read_frame<R: BufRead>(
    lines: &mut LineReader<R>,
    player_count: usize,
) -> Result<Option<FrameUpdate>, ProtocolError> {
    let line = lines.line + 1;
    let Some(turn_line) = lines.next_line()? else {
        return Ok(None);
    };
    let [turn_number] = fields::<1>(turn_line, line)?;
    let turn_number = narrow(turn_number, line)?;

    let mut players = Vec::with_capacity(player_count);
    for _ in 0..player_count {
        let line = lines.line + 1;
        let [id, ship_count, dropoff_count, halite] = lines.expect_fields::<4>("player header")?;
        let id = PlayerId::new(narrow(id, line)?);
        let halite = narrow(halite, line)?;

        let mut ships = Vec::new();
        for _ in 0..narrow::<u32>(ship_count, line)? {
            let line = lines.line + 1;
            let [ship, x, y, cargo] = lines.expect_fields::<4>("ship")?;
            ships.push(ShipSnapshot {
                id: ShipId::new(narrow(ship, line)?),
                position: Position::new(narrow(x, line)?, narrow(y, line)?),
                halite: narrow(cargo, line)?,
            });
        }

        let mut dropoffs = Vec::new();
        for _ in 0..narrow::<u32>(dropoff_count, line)? {
            let line = lines.line + 1;
            let [_id, x, y] = lines.expect_fields::<3>("dropoff")?;
            dropoffs.push(Position::new(narrow(x, line)?, narrow(y, line)?));
        }

        players.push(PlayerFrame {
            id,
            halite,
            ships,
            dropoffs,
        });
    }

    let line = lines.line + 1;
    let [change_count] = lines.expect_fields::<1>("cell update count")?;
    let mut cell_updates = Vec::new();
    for _ in 0..narrow::<u32>(change_count, line)? {
        let line = lines.line + 1;
        let [x, y, halite] = lines.expect_fields::<3>("cell update")?;
        cell_updates.push((
            Position::new(narrow(x, line)?, narrow(y, line)?),
            narrow(halite, line)?,
        ));
    }

    Ok(Some(FrameUpdate {
        turn_number,
        players,
        cell_updates,
    }))
}

fn fields<const N: usize>(line: &str, line_number: usize) -> Result<[i64; N], ProtocolError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() != N {
        return Err(ProtocolError::FieldCount {
            line: line_number,
            expected: N,
            found: tokens.len(),
        });
    }

    let mut values = [0; N];
    for (slot, token) in values.iter_mut().zip(tokens) {
        *slot = parse_number(token, line_number)?;
    }
    Ok(values)
}

fn parse_number<T: std::str::FromStr>(token: &str, line: usize) -> Result<T, ProtocolError> {
    token.parse().map_err(|_| ProtocolError::InvalidNumber {
        line,
        token: token.to_owned(),
    })
}

fn narrow<T: TryFrom<i64>>(value: i64, line: usize) -> Result<T, ProtocolError> {
    T::try_from(value).map_err(|_| ProtocolError::InvalidNumber {
        line,
        token: value.to_string(),
    })
}
