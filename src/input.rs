//! Line-oriented player input.
//!
//! Normalizes what the player types into [`InputEvent`]s. The binary maps
//! each event onto a worker command.

use thiserror::Error;

/// All possible input events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    Click,
    BuyBuilding(String),
    BuyUpgrade(String),
    Prestige,
    Status,
    Save,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("unknown command `{0}` (try `h`)")]
    UnknownCommand(String),

    #[error("`{0}` needs an id")]
    MissingId(&'static str),
}

pub const HELP: &str = "\
c            click
b <id>       buy a building
u <id>       buy an upgrade
p            prestige
s            status
w            save now
q            quit";

/// Parse one line. Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<InputEvent>, InputError> {
    let mut words = line.split_whitespace();
    let Some(cmd) = words.next() else {
        return Ok(None);
    };
    let id = words.next().map(str::to_string);

    let event = match cmd.to_ascii_lowercase().as_str() {
        "c" | "click" => InputEvent::Click,
        "b" | "buy" => InputEvent::BuyBuilding(id.ok_or(InputError::MissingId("b"))?),
        "u" | "upgrade" => InputEvent::BuyUpgrade(id.ok_or(InputError::MissingId("u"))?),
        "p" | "prestige" => InputEvent::Prestige,
        "s" | "status" => InputEvent::Status,
        "w" | "save" => InputEvent::Save,
        "h" | "help" | "?" => InputEvent::Help,
        "q" | "quit" | "exit" => InputEvent::Quit,
        other => return Err(InputError::UnknownCommand(other.to_string())),
    };
    Ok(Some(event))
}
