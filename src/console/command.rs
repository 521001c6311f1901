use thiserror::Error;

pub const HELP: &str = "\
Commands:
  scan                 search for beverage notifiers
  stop                 stop searching
  list                 show the devices found by the last scan
  connect <n|id>       connect to a device from the list
  disconnect           disconnect from the current device
  notify               send a test notification
  status               show the session
  help                 show this text
  quit                 exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Scan,
    Stop,
    List,
    Connect(String),
    Disconnect,
    Notify,
    Status,
    Help,
    Quit,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CommandParseError {
    #[error("Type a command, or \"help\"")]
    Empty,

    #[error("Unknown command \"{0}\", type \"help\" for a list")]
    Unknown(String),

    #[error("\"{0}\" needs an argument")]
    MissingArgument(&'static str),

    #[error("\"{0}\" takes no argument")]
    UnexpectedArgument(&'static str),
}

pub fn parse_command(line: &str) -> Result<ConsoleCommand, CommandParseError> {
    let mut words = line.split_whitespace();
    let name = words.next().ok_or(CommandParseError::Empty)?.to_ascii_lowercase();
    let argument = words.next();

    if words.next().is_some() {
        return Err(CommandParseError::Unknown(line.trim().to_string()));
    }

    let command = match name.as_str() {
        "scan" => ConsoleCommand::Scan,
        "stop" => ConsoleCommand::Stop,
        "list" | "ls" => ConsoleCommand::List,
        "connect" => {
            let argument = argument.ok_or(CommandParseError::MissingArgument("connect"))?;
            return Ok(ConsoleCommand::Connect(argument.to_string()));
        },
        "disconnect" => ConsoleCommand::Disconnect,
        "notify" => ConsoleCommand::Notify,
        "status" => ConsoleCommand::Status,
        "help" | "?" => ConsoleCommand::Help,
        "quit" | "exit" => ConsoleCommand::Quit,
        _ => return Err(CommandParseError::Unknown(name)),
    };

    match argument {
        None => Ok(command),
        Some(_) => Err(CommandParseError::UnexpectedArgument(match command {
            ConsoleCommand::Scan => "scan",
            ConsoleCommand::Stop => "stop",
            ConsoleCommand::List => "list",
            ConsoleCommand::Disconnect => "disconnect",
            ConsoleCommand::Notify => "notify",
            ConsoleCommand::Status => "status",
            ConsoleCommand::Help => "help",
            _ => "quit",
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_commands() {
        assert_eq!(parse_command("scan"), Ok(ConsoleCommand::Scan));
        assert_eq!(parse_command("  STOP  "), Ok(ConsoleCommand::Stop));
        assert_eq!(parse_command("ls"), Ok(ConsoleCommand::List));
        assert_eq!(parse_command("exit"), Ok(ConsoleCommand::Quit));
    }

    #[test]
    fn connect_takes_an_argument() {
        assert_eq!(parse_command("connect 1"), Ok(ConsoleCommand::Connect("1".to_string())));
        assert_eq!(parse_command("connect"), Err(CommandParseError::MissingArgument("connect")));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_command(""), Err(CommandParseError::Empty));
        assert_eq!(parse_command("   "), Err(CommandParseError::Empty));
        assert_eq!(parse_command("brew"), Err(CommandParseError::Unknown("brew".to_string())));
        assert_eq!(parse_command("scan now"), Err(CommandParseError::UnexpectedArgument("scan")));
        assert!(parse_command("connect 1 2").is_err());
    }
}
