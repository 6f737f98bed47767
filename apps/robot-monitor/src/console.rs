//! Operator console commands read from stdin

use crate::session::UiEvent;
use std::io::{self, BufRead};
use std::thread;
use tokio::sync::mpsc::UnboundedSender;

pub const HELP: &str = "\
Commands:
  connect              connect to the robot controller
  disconnect           disconnect from the controller
  start                start real-time monitoring
  stop                 stop monitoring
  status               show robot status
  speech on|off        enable or disable text-to-speech
  rate <wpm>           set speech rate in words per minute
  say <text>           queue a narration message
  action <name> [target]  describe a robot action
  help                 show this help
  quit                 exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorCommand {
    Connect,
    Disconnect,
    Start,
    Stop,
    Status,
    Speech(bool),
    Rate(u32),
    Say(String),
    Action {
        name: String,
        target: Option<String>,
    },
    Help,
    Quit,
}

pub fn parse_command(line: &str) -> Result<OperatorCommand, String> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((w, r)) => (w, r.trim()),
        None => (line, ""),
    };
    match word.to_ascii_lowercase().as_str() {
        "connect" => Ok(OperatorCommand::Connect),
        "disconnect" => Ok(OperatorCommand::Disconnect),
        "start" => Ok(OperatorCommand::Start),
        "stop" => Ok(OperatorCommand::Stop),
        "status" => Ok(OperatorCommand::Status),
        "speech" => match rest.to_ascii_lowercase().as_str() {
            "on" => Ok(OperatorCommand::Speech(true)),
            "off" => Ok(OperatorCommand::Speech(false)),
            _ => Err("usage: speech on|off".into()),
        },
        "rate" => rest
            .parse()
            .map(OperatorCommand::Rate)
            .map_err(|_| "usage: rate <words per minute>".to_string()),
        "say" if !rest.is_empty() => Ok(OperatorCommand::Say(rest.to_string())),
        "say" => Err("usage: say <text>".into()),
        "action" => {
            let mut parts = rest.split_whitespace();
            let name = parts
                .next()
                .ok_or_else(|| "usage: action <name> [target]".to_string())?;
            Ok(OperatorCommand::Action {
                name: name.to_string(),
                target: parts.next().map(str::to_string),
            })
        }
        "help" | "?" => Ok(OperatorCommand::Help),
        "quit" | "exit" => Ok(OperatorCommand::Quit),
        "" => Err(String::new()),
        other => Err(format!("unknown command '{other}', type 'help'")),
    }
}

/// Forward stdin lines to the event loop until EOF or `quit`.
///
/// Runs on its own thread so a pending read never holds up shutdown.
pub fn spawn_console(events: UnboundedSender<UiEvent>) -> std::io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("console".into())
        .spawn(move || read_console(io::stdin().lock(), &events))
}

fn read_console(input: impl BufRead, events: &UnboundedSender<UiEvent>) {
    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(error = %e, "console read failed");
                return;
            }
        };
        match parse_command(&line) {
            Ok(cmd) => {
                let quit = cmd == OperatorCommand::Quit;
                if events.send(UiEvent::Command(cmd)).is_err() || quit {
                    return;
                }
            }
            Err(msg) if msg.is_empty() => {}
            Err(msg) => eprintln!("{msg}"),
        }
    }
    let _ = events.send(UiEvent::Command(OperatorCommand::Quit));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(parse_command("connect"), Ok(OperatorCommand::Connect));
        assert_eq!(parse_command("  START "), Ok(OperatorCommand::Start));
        assert_eq!(parse_command("speech off"), Ok(OperatorCommand::Speech(false)));
        assert_eq!(parse_command("rate 180"), Ok(OperatorCommand::Rate(180)));
        assert_eq!(parse_command("exit"), Ok(OperatorCommand::Quit));
    }

    #[test]
    fn test_parse_text_commands() {
        assert_eq!(
            parse_command("say Robot   ready"),
            Ok(OperatorCommand::Say("Robot   ready".into()))
        );
        assert_eq!(
            parse_command("action move_to_pick p10"),
            Ok(OperatorCommand::Action {
                name: "move_to_pick".into(),
                target: Some("p10".into())
            })
        );
        assert_eq!(
            parse_command("action gripper_open"),
            Ok(OperatorCommand::Action {
                name: "gripper_open".into(),
                target: None
            })
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_command("speech maybe").is_err());
        assert!(parse_command("rate fast").is_err());
        assert!(parse_command("say").is_err());
        assert!(parse_command("action").is_err());
        assert_eq!(parse_command("   "), Err(String::new()));
        assert!(parse_command("fly").unwrap_err().contains("unknown command"));
    }

    #[test]
    fn test_console_forwards_until_quit() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let input = "connect\n\nbogus\nsay hello\nquit\nstart\n";
        read_console(input.as_bytes(), &tx);

        let mut got = Vec::new();
        while let Ok(UiEvent::Command(cmd)) = rx.try_recv() {
            got.push(cmd);
        }
        assert_eq!(
            got,
            vec![
                OperatorCommand::Connect,
                OperatorCommand::Say("hello".into()),
                OperatorCommand::Quit
            ]
        );
    }

    #[test]
    fn test_console_eof_quits() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        read_console("status\n".as_bytes(), &tx);
        assert!(matches!(rx.try_recv(), Ok(UiEvent::Command(OperatorCommand::Status))));
        assert!(matches!(rx.try_recv(), Ok(UiEvent::Command(OperatorCommand::Quit))));
    }
}
