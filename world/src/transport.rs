//! Turn transport seam and its stdin/stdout implementation.

use std::io::{BufRead, Write};

use harvester_core::Command;
use tracing::debug;

use crate::protocol::{self, LineReader};
use crate::{Game, ProtocolError};

/// Request/response channel to the game engine.
pub trait TurnTransport {
    /// Completes the handshake by announcing the bot's display name.
    fn ready(&mut self, name: &str) -> Result<(), ProtocolError>;

    /// Blocks until the next frame arrives and applies it to `game`.
    ///
    /// Returns `false` once the engine has ended the game.
    fn update_frame(&mut self, game: &mut Game) -> Result<bool, ProtocolError>;

    /// Submits the command batch for the current turn.
    fn end_turn(&mut self, commands: &[Command]) -> Result<(), ProtocolError>;
}

/// Transport speaking the engine's line protocol over a reader/writer pair.
#[derive(Debug)]
pub struct StdioTransport<R, W> {
    lines: LineReader<R>,
    writer: W,
}

impl<R: BufRead, W: Write> StdioTransport<R, W> {
    /// Reads the initialisation handshake and returns the transport together
    /// with the initial game state.
    pub fn connect(reader: R, writer: W) -> Result<(Self, Game), ProtocolError> {
        let mut lines = LineReader::new(reader);
        let game = protocol::read_init(&mut lines)?;
        debug!(
            players = game.players().len(),
            width = game.map().width(),
            height = game.map().height(),
            "handshake received"
        );
        Ok((Self { lines, writer }, game))
    }

    fn send_line(&mut self, line: &str) -> Result<(), ProtocolError> {
        writeln!(self.writer, "{line}")?;
        self.writer.flush()?;
        Ok(())
    }
}

impl<R: BufRead, W: Write> TurnTransport for StdioTransport<R, W> {
    fn ready(&mut self, name: &str) -> Result<(), ProtocolError> {
        self.send_line(name)
    }

    fn update_frame(&mut self, game: &mut Game) -> Result<bool, ProtocolError> {
        match protocol::read_frame(&mut self.lines, game.players().len())? {
            Some(frame) => {
                game.apply_frame(frame)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn end_turn(&mut self, commands: &[Command]) -> Result<(), ProtocolError> {
        self.send_line(&protocol::encode_commands(commands))
    }
}
