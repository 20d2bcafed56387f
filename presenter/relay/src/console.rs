//! Operator console
//!
//! One command per stdin line. Catalog positions are 1-based, matching the
//! numbering printed by `list`.

use std::str::FromStr;

use thiserror::Error;

use presenter_core::Slot;

/// A parsed console line
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    /// Go live with Preview (or Next-Up)
    Push,
    /// Put catalog entry N in Next-Up
    Stage(usize),
    /// Put catalog entry N in Preview
    Preview(usize),
    /// Empty a slot
    Clear(Slot),
    /// Go live with the entry after Program
    Next,
    /// Go live with the entry before Program
    Previous,
    /// Resume playback
    Play,
    /// Pause playback
    Pause,
    /// Blank the output
    Black,
    /// Lift blackout
    Unblack,
    /// Seek to seconds
    Seek(f64),
    /// Toggle repeat
    Repeat(bool),
    /// Set the background, or clear it with `bg none`
    Background(Option<String>),
    /// Resend the current background to the display (`bg` alone)
    RefreshBackground,
    /// Print the catalog and slots
    List,
    /// Print the command summary
    Help,
    /// Leave the console
    Quit,
}

/// Console parse failures
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConsoleError {
    /// First word is not a command
    #[error("Unknown command: {0} (try `help`)")]
    UnknownCommand(String),

    /// Command needs an argument
    #[error("`{0}` needs an argument")]
    MissingArgument(&'static str),

    /// Argument did not parse
    #[error("Invalid argument for `{command}`: {value}")]
    InvalidArgument {
        /// Command name
        command: &'static str,
        /// Offending text
        value: String,
    },
}

/// Text printed by `help`
pub const HELP: &str = "\
commands:
  push                go live with Preview (or Next-Up)
  stage N             put catalog entry N in Next-Up
  preview N           put catalog entry N in Preview
  clear next|preview  empty a slot
  next | prev         go live with the adjacent catalog entry
  play | pause        transport
  black | unblack     blank the output
  seek T              seek to T seconds
  repeat on|off       loop the item on air
  bg PATH | bg none   set or clear the background
  bg                  resend the background to the display
  list                show catalog and slots
  quit                exit";

impl FromStr for ConsoleCommand {
    type Err = ConsoleError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        match word.to_ascii_lowercase().as_str() {
            "push" | "go" => Ok(Self::Push),
            "stage" => position("stage", rest).map(Self::Stage),
            "preview" => position("preview", rest).map(Self::Preview),
            "clear" => match rest {
                "next" | "nextup" | "next-up" => Ok(Self::Clear(Slot::NextUp)),
                "preview" => Ok(Self::Clear(Slot::Preview)),
                "" => Err(ConsoleError::MissingArgument("clear")),
                other => Err(invalid("clear", other)),
            },
            "next" => Ok(Self::Next),
            "prev" | "previous" => Ok(Self::Previous),
            "play" => Ok(Self::Play),
            "pause" => Ok(Self::Pause),
            "black" => Ok(Self::Black),
            "unblack" => Ok(Self::Unblack),
            "seek" => {
                let time = require("seek", rest)?
                    .parse::<f64>()
                    .map_err(|_| invalid("seek", rest))?;
                if time.is_finite() {
                    Ok(Self::Seek(time))
                } else {
                    Err(invalid("seek", rest))
                }
            }
            "repeat" => match require("repeat", rest)? {
                "on" | "true" | "1" => Ok(Self::Repeat(true)),
                "off" | "false" | "0" => Ok(Self::Repeat(false)),
                other => Err(invalid("repeat", other)),
            },
            "bg" | "background" => match rest {
                "" => Ok(Self::RefreshBackground),
                "none" | "off" => Ok(Self::Background(None)),
                path => Ok(Self::Background(Some(path.to_string()))),
            },
            "list" | "ls" => Ok(Self::List),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" | "q" => Ok(Self::Quit),
            _ => Err(ConsoleError::UnknownCommand(word.to_string())),
        }
    }
}

fn require<'a>(command: &'static str, rest: &'a str) -> Result<&'a str, ConsoleError> {
    if rest.is_empty() {
        Err(ConsoleError::MissingArgument(command))
    } else {
        Ok(rest)
    }
}

fn invalid(command: &'static str, value: &str) -> ConsoleError {
    ConsoleError::InvalidArgument {
        command,
        value: value.to_string(),
    }
}

/// 1-based position to 0-based index
fn position(command: &'static str, rest: &str) -> Result<usize, ConsoleError> {
    match require(command, rest)?.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n - 1),
        _ => Err(invalid(command, rest)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(line: &str) -> Result<ConsoleCommand, ConsoleError> {
        line.parse()
    }

    #[test]
    fn test_simple_commands() {
        assert_eq!(parse("push"), Ok(ConsoleCommand::Push));
        assert_eq!(parse("  PLAY "), Ok(ConsoleCommand::Play));
        assert_eq!(parse("prev"), Ok(ConsoleCommand::Previous));
        assert_eq!(parse("quit"), Ok(ConsoleCommand::Quit));
    }

    #[test]
    fn test_positions_are_one_based() {
        assert_eq!(parse("stage 1"), Ok(ConsoleCommand::Stage(0)));
        assert_eq!(parse("preview 3"), Ok(ConsoleCommand::Preview(2)));
        assert_eq!(
            parse("stage 0"),
            Err(ConsoleError::InvalidArgument {
                command: "stage",
                value: "0".into()
            })
        );
        assert_eq!(parse("stage"), Err(ConsoleError::MissingArgument("stage")));
    }

    #[test]
    fn test_clear_slots() {
        assert_eq!(parse("clear next"), Ok(ConsoleCommand::Clear(Slot::NextUp)));
        assert_eq!(
            parse("clear preview"),
            Ok(ConsoleCommand::Clear(Slot::Preview))
        );
        assert!(parse("clear program").is_err());
    }

    #[test]
    fn test_seek_and_repeat() {
        assert_eq!(parse("seek 12.5"), Ok(ConsoleCommand::Seek(12.5)));
        assert!(parse("seek soon").is_err());
        assert!(parse("seek NaN").is_err());
        assert_eq!(parse("repeat on"), Ok(ConsoleCommand::Repeat(true)));
        assert_eq!(parse("repeat off"), Ok(ConsoleCommand::Repeat(false)));
    }

    #[test]
    fn test_background_keeps_spaces_in_path() {
        assert_eq!(
            parse("bg /media/stage backdrop.png"),
            Ok(ConsoleCommand::Background(Some(
                "/media/stage backdrop.png".into()
            )))
        );
        assert_eq!(parse("bg none"), Ok(ConsoleCommand::Background(None)));
        assert_eq!(parse("bg"), Ok(ConsoleCommand::RefreshBackground));
    }

    #[test]
    fn test_unknown_command() {
        assert_eq!(
            parse("launch"),
            Err(ConsoleError::UnknownCommand("launch".into()))
        );
    }
}
