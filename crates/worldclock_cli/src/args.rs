//! Command-line argument parsing.
//!
//! Options may appear anywhere before or after the command word; the first
//! non-option word selects the command.

use std::path::PathBuf;

/// Global options shared by every command.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliOptions {
    pub db_path: Option<PathBuf>,
    pub log_dir: Option<String>,
    pub log_level: Option<String>,
}

/// One user request.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    List,
    Add(String),
    Remove(String),
    Move { from: usize, to: usize },
    Home(String),
    ClearHome,
    Zones(Option<String>),
    Widget(f32),
    Watch { aligned: bool },
}

/// What `main` should do.
#[derive(Debug, Clone, PartialEq)]
pub enum CliAction {
    Run { options: CliOptions, command: Command },
    ShowHelp,
    ShowVersion,
}

const DEFAULT_WIDGET_HEIGHT_DP: f32 = 220.0;

/// Parses arguments without the program name.
pub fn parse_args<I>(args: I) -> Result<CliAction, String>
where
    I: IntoIterator<Item = String>,
{
    let mut options = CliOptions::default();
    let mut words = Vec::new();
    let mut aligned = false;
    let mut clear = false;

    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(CliAction::ShowHelp),
            "-V" | "--version" => return Ok(CliAction::ShowVersion),
            "--db" => options.db_path = Some(PathBuf::from(option_value(&mut args, "--db")?)),
            "--log-dir" => options.log_dir = Some(option_value(&mut args, "--log-dir")?),
            "--log-level" => options.log_level = Some(option_value(&mut args, "--log-level")?),
            "--aligned" => aligned = true,
            "--clear" => clear = true,
            other if other.starts_with("--") => return Err(format!("unknown option `{other}`")),
            _ => words.push(arg),
        }
    }

    let Some((name, rest)) = words.split_first() else {
        return Ok(CliAction::ShowHelp);
    };

    let command = match (name.as_str(), rest) {
        ("list", []) => Command::List,
        ("add", [zone]) => Command::Add(zone.clone()),
        ("remove", [zone]) => Command::Remove(zone.clone()),
        ("move", [from, to]) => Command::Move {
            from: parse_index(from)?,
            to: parse_index(to)?,
        },
        ("home", []) if clear => Command::ClearHome,
        ("home", [zone]) if !clear => Command::Home(zone.clone()),
        ("zones", []) => Command::Zones(None),
        ("zones", [query]) => Command::Zones(Some(query.clone())),
        ("widget", []) => Command::Widget(DEFAULT_WIDGET_HEIGHT_DP),
        ("widget", [height]) => Command::Widget(
            height
                .parse::<f32>()
                .map_err(|_| format!("widget height must be a number, got `{height}`"))?,
        ),
        ("watch", []) => Command::Watch { aligned },
        ("version", []) => return Ok(CliAction::ShowVersion),
        (other, _) => return Err(format!("unknown or malformed command `{other}`")),
    };

    Ok(CliAction::Run { options, command })
}

pub fn usage() -> &'static str {
    "Usage: worldclock_cli [--db <path>] [--log-dir <dir>] [--log-level <level>] <command>

Commands:
  list                 show saved zones with their current time
  add <zone>           append a zone, e.g. Asia/Kolkata
  remove <zone>        remove a zone
  move <from> <to>     move the zone at index <from> to index <to>
  home <zone>          toggle the home zone
  home --clear         clear the home zone
  zones [query]        search the timezone catalogue
  widget [height_dp]   render the widget model for the given height
  watch [--aligned]    reprint the list on every tick (minute-aligned with --aligned)
  version              print the core version"
}

fn option_value(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String, String> {
    match args.next() {
        Some(value) if !value.starts_with("--") => Ok(value),
        _ => Err(format!("{flag} requires a value")),
    }
}

fn parse_index(raw: &str) -> Result<usize, String> {
    raw.parse::<usize>()
        .map_err(|_| format!("index must be a non-negative integer, got `{raw}`"))
}

#[cfg(test)]
mod tests {
    use super::{parse_args, CliAction, CliOptions, Command};
    use std::path::PathBuf;

    fn parse(args: &[&str]) -> Result<CliAction, String> {
        parse_args(args.iter().map(|arg| arg.to_string()))
    }

    #[test]
    fn no_arguments_shows_help() {
        assert_eq!(parse(&[]), Ok(CliAction::ShowHelp));
    }

    #[test]
    fn options_and_command_are_parsed() {
        let action = parse(&["--db", "/tmp/w.db", "move", "3", "0", "--log-level", "debug"]);
        assert_eq!(
            action,
            Ok(CliAction::Run {
                options: CliOptions {
                    db_path: Some(PathBuf::from("/tmp/w.db")),
                    log_dir: None,
                    log_level: Some("debug".to_string()),
                },
                command: Command::Move { from: 3, to: 0 },
            })
        );
    }

    #[test]
    fn home_clear_and_watch_flags() {
        assert!(matches!(
            parse(&["home", "--clear"]),
            Ok(CliAction::Run { command: Command::ClearHome, .. })
        ));
        assert!(matches!(
            parse(&["watch", "--aligned"]),
            Ok(CliAction::Run { command: Command::Watch { aligned: true }, .. })
        ));
    }

    #[test]
    fn malformed_input_is_rejected() {
        assert!(parse(&["move", "1"]).is_err());
        assert!(parse(&["move", "-1", "0"]).is_err());
        assert!(parse(&["--db"]).is_err());
        assert!(parse(&["--bogus", "list"]).is_err());
        assert!(parse(&["widget", "tall"]).is_err());
    }
}
