//! Line-oriented command shell over a [`Controller`].
//!
//! The protocol follows the shape of GTP: one command per line, an optional
//! numeric id, and responses starting with `=` (success) or `?` (failure),
//! followed by an empty line. Vertices are written in the KGS frame (`D4`).
//!
//! ## Commands
//!
//! - `play [color] <vertex>` - Append a move at the end of the game
//! - `black <vertex>`, `white <vertex>` - Insert a move after the current one
//! - `pass` - Append a pass
//! - `back`, `forward`, `goto <n>` - Navigate the game
//! - `delete <vertex>` - Delete the move at `vertex` from the game
//! - `move <from> <to>` - Relocate a stone, keeping its move number
//! - `new`, `open <path>`, `save [path]` - Game files
//! - `showboard`, `sgf` - Print the board or the game record
//! - `name`, `version`, `protocol_version`, `list_commands`,
//!   `known_command <cmd>`, `quit`
//!
//! ## Example
//!
//! ```ignore
//! use golib_rust::config::GoConfig;
//! use golib_rust::controller::Controller;
//! use golib_rust::shell::Shell;
//!
//! let mut shell = Shell::new(Controller::new(GoConfig::default()));
//! shell.run(std::io::stdin().lock(), std::io::stdout())?;
//! ```

use std::io::{self, BufRead, Write};

use crate::board::{Color, Point};
use crate::controller::Controller;
use crate::error::MoveError;
use crate::moves::{Frame, Move};

/// The list of known commands.
const KNOWN_COMMANDS: &[&str] = &[
    "back",
    "black",
    "delete",
    "forward",
    "goto",
    "known_command",
    "list_commands",
    "move",
    "name",
    "new",
    "open",
    "pass",
    "play",
    "protocol_version",
    "quit",
    "save",
    "sgf",
    "showboard",
    "version",
    "white",
];

pub struct Shell {
    controller: Controller,
}

impl Shell {
    pub fn new(controller: Controller) -> Self {
        Self { controller }
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    /// Run the command loop until `quit` or the end of `input`.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> io::Result<()> {
        for line in input.lines() {
            let line = line?;

            // Skip empty lines and comments
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (id, command_line) = Self::parse_id(line);
            let parts: Vec<&str> = command_line.split_whitespace().collect();
            let Some((command, args)) = parts.split_first() else {
                continue;
            };
            let command = command.to_lowercase();

            let (success, message) = self.execute(&command, args);
            let prefix = if success { '=' } else { '?' };
            let id_str = id.map(|i| i.to_string()).unwrap_or_default();
            writeln!(output, "{prefix}{id_str} {message}\n")?;
            output.flush()?;

            if command == "quit" {
                break;
            }
        }
        Ok(())
    }

    /// Parse an optional numeric command ID from the beginning of the line.
    fn parse_id(line: &str) -> (Option<u32>, &str) {
        let trimmed = line.trim();
        let end = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(trimmed.len());
        match trimmed[..end].parse::<u32>() {
            Ok(id) => (Some(id), trimmed[end..].trim()),
            Err(_) => (None, trimmed),
        }
    }

    /// Read a vertex such as `D4`, or `pass`.
    fn parse_vertex(&self, vertex: &str) -> Result<Option<Point>, MoveError> {
        if vertex.eq_ignore_ascii_case("pass") {
            return Ok(None);
        }
        if !(2..=3).contains(&vertex.len()) || !vertex.is_ascii() {
            return Err(MoveError::Malformed(vertex.to_string()));
        }
        let (a, b) = vertex.split_at(1);
        let size = self.controller.kifu().size();
        Ok(Move::from_coords(Frame::Kgs, Color::Black, a, b, size, 0)?.point)
    }

    fn vertex_arg(&self, args: &[&str], i: usize) -> Result<Point, String> {
        let vertex = args.get(i).ok_or("missing argument")?;
        match self.parse_vertex(vertex) {
            Ok(Some(pt)) => Ok(pt),
            Ok(None) => Err("a stone is expected, not a pass".to_string()),
            Err(e) => Err(e.to_string()),
        }
    }

    fn label(&self, mv: &Move) -> String {
        mv.repr(Frame::Kgs, self.controller.kifu().size())
    }

    /// Execute a command and return (success, response).
    fn execute(&mut self, command: &str, args: &[&str]) -> (bool, String) {
        match self.dispatch(command, args) {
            Ok(response) => (true, response),
            Err(message) => (false, message),
        }
    }

    fn dispatch(&mut self, command: &str, args: &[&str]) -> Result<String, String> {
        let c = &mut self.controller;
        match command {
            "name" => Ok(crate::constants::APP_NAME.to_string()),

            "version" => Ok(env!("CARGO_PKG_VERSION").to_string()),

            "protocol_version" => Ok("2".to_string()),

            "list_commands" => Ok(KNOWN_COMMANDS.join("\n")),

            "known_command" => {
                let cmd = args.first().ok_or("missing argument")?;
                let known = KNOWN_COMMANDS.contains(&cmd.to_lowercase().as_str());
                Ok(known.to_string())
            }

            "quit" => Ok(String::new()),

            "play" => {
                let vertex = match args {
                    [vertex] => vertex,
                    [color, vertex] => {
                        let color: Color = color.parse().map_err(|e: MoveError| e.to_string())?;
                        let expected = self.controller.kifu().next_color();
                        if color != expected {
                            return Err(format!("{expected:?} to play"));
                        }
                        vertex
                    }
                    _ => return Err("missing argument".to_string()),
                };
                let point = self.parse_vertex(vertex).map_err(|e| e.to_string())?;
                let c = &mut self.controller;
                let played = match point {
                    Some(pt) => c.play(pt),
                    None => c.pass(),
                };
                played.map(|_| String::new()).map_err(|e| e.to_string())
            }

            "black" | "white" => {
                let point = self.vertex_arg(args, 0)?;
                let color = if command == "black" {
                    Color::Black
                } else {
                    Color::White
                };
                let mv = self
                    .controller
                    .insert(color, point)
                    .map_err(|e| e.to_string())?;
                Ok(self.label(&mv))
            }

            "pass" => c.pass().map(|_| String::new()).map_err(|e| e.to_string()),

            "back" => {
                let mv = c.backward().map_err(|e| e.to_string())?;
                Ok(mv.map(|m| self.label(&m)).unwrap_or_default())
            }

            "forward" => {
                let mv = c.forward().map_err(|e| e.to_string())?;
                Ok(mv.map(|m| self.label(&m)).unwrap_or_default())
            }

            "goto" => {
                let number = args
                    .first()
                    .ok_or("missing argument")?
                    .parse::<usize>()
                    .map_err(|_| "invalid move number".to_string())?;
                let reached = c.goto(number).map_err(|e| e.to_string())?;
                Ok(reached.to_string())
            }

            "delete" => {
                let point = self.vertex_arg(args, 0)?;
                let mv = self
                    .controller
                    .delete(point)
                    .map_err(|e| e.to_string())?;
                Ok(self.label(&mv))
            }

            "move" => {
                let from = self.vertex_arg(args, 0)?;
                let to = self.vertex_arg(args, 1)?;
                self.controller
                    .relocate(from, to)
                    .map(|_| String::new())
                    .map_err(|e| e.to_string())
            }

            "new" => {
                c.new_game();
                Ok(String::new())
            }

            "open" => {
                let path = args.first().ok_or("missing argument")?;
                c.load(path).map_err(|e| e.to_string())?;
                Ok(c.status())
            }

            "save" => {
                let saved = match args.first() {
                    Some(path) => c.save_as(*path),
                    None => c.save(),
                };
                saved.map(|_| String::new()).map_err(|e| e.to_string())
            }

            "showboard" => Ok(format!("\n{}{}", c.grid(), c.status())),

            "sgf" => Ok(c.kifu().to_string().trim_end().to_string()),

            _ => Err(format!("unknown command: {command}")),
        }
    }
}
