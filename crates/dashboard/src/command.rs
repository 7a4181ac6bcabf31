//! Interactive Commands

use std::collections::BTreeMap;
use std::fmt;

/// One line of user input
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Load(i64),
    Select(i64),
    Show,
    Compare(String),
    Vars,
    Predict,
    Simulate(BTreeMap<String, f64>),
    Explain,
    Raw,
    Help,
    Quit,
}

/// Input that is not a valid command
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError(pub String);

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (type `help` for commands)", self.0)
    }
}

impl std::error::Error for ParseError {}

pub const HELP: &str = "\
Commands:
  load <id>                 load a client and show its profile
  select <id>               select a client without loading it
  show                      show the loaded client's profile
  compare <VARIABLE>        compare the client with the population
  vars                      list comparison and modifiable variables
  predict                   score the selected client
  simulate VAR=value ...    re-score the loaded client with edited variables
  explain                   local feature importances of the selected client
  raw                       raw data of the loaded client
  help                      this message
  quit                      leave the dashboard";

fn client_id(arg: Option<&str>) -> Result<i64, ParseError> {
    let arg = arg.ok_or_else(|| ParseError("missing client id".to_string()))?;
    arg.parse()
        .map_err(|_| ParseError(format!("invalid client id: {}", arg)))
}

impl Command {
    /// Parse a line; `Ok(None)` for blank input
    pub fn parse(line: &str) -> Result<Option<Self>, ParseError> {
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            return Ok(None);
        };

        let command = match name.to_ascii_lowercase().as_str() {
            "load" => Command::Load(client_id(words.next())?),
            "select" => Command::Select(client_id(words.next())?),
            "show" => Command::Show,
            "compare" => {
                // Column names may contain spaces
                let rest: Vec<&str> = words.collect();
                if rest.is_empty() {
                    return Err(ParseError("missing variable name".to_string()));
                }
                return Ok(Some(Command::Compare(rest.join(" "))));
            }
            "vars" => Command::Vars,
            "predict" => Command::Predict,
            "simulate" => {
                let mut edits = BTreeMap::new();
                for edit in words.by_ref() {
                    let (var, value) = edit
                        .split_once('=')
                        .ok_or_else(|| ParseError(format!("expected VAR=value, got {}", edit)))?;
                    let value: f64 = value
                        .parse()
                        .ok()
                        .filter(|v: &f64| v.is_finite())
                        .ok_or_else(|| ParseError(format!("invalid value for {}: {}", var, value)))?;
                    edits.insert(var.to_string(), value);
                }
                if edits.is_empty() {
                    return Err(ParseError("nothing to simulate".to_string()));
                }
                Command::Simulate(edits)
            }
            "explain" => Command::Explain,
            "raw" => Command::Raw,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => return Err(ParseError(format!("unknown command: {}", other))),
        };

        if let Some(extra) = words.next() {
            return Err(ParseError(format!("unexpected argument: {}", extra)));
        }
        Ok(Some(command))
    }
}
