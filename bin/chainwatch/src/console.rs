//! Line-oriented operator console read from stdin.

use std::{
    io::{self, BufRead},
    str::FromStr,
    thread,
};

use chainwatch_sync::{Stream, SyncHandle, View};
use tokio::sync::mpsc;
use tracing::*;

use crate::{config::normalize_endpoint, errors::CommandError, sink};

const HELP: &str = "commands: view dashboard|blocks|groups, refresh blocks|groups, status, \
                    host <url>, pause, resume, quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    View(View),
    Refresh(Stream),
    Status,
    Host(String),
    Pause,
    Resume,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(cmd) = words.next() else {
            return Err(CommandError::Usage(HELP));
        };
        let arg = words.next();
        if words.next().is_some() {
            return Err(CommandError::InvalidArgument(format!(
                "too many arguments to {cmd}"
            )));
        }

        let command = match (cmd, arg) {
            ("view", Some(view)) => {
                Command::View(view.parse().map_err(CommandError::InvalidArgument)?)
            }
            ("view", None) => return Err(CommandError::Usage("view dashboard|blocks|groups")),
            ("refresh", Some("blocks")) => Command::Refresh(Stream::Blocks),
            ("refresh", Some("groups")) => Command::Refresh(Stream::Groups),
            ("refresh", _) => return Err(CommandError::Usage("refresh blocks|groups")),
            ("host", Some(url)) => Command::Host(
                normalize_endpoint(url).map_err(|e| CommandError::InvalidArgument(e.to_string()))?,
            ),
            ("host", None) => return Err(CommandError::Usage("host <url>")),
            ("status", None) => Command::Status,
            ("pause", None) => Command::Pause,
            ("resume", None) => Command::Resume,
            ("help", None) => Command::Help,
            ("quit" | "exit", None) => Command::Quit,
            ("status" | "pause" | "resume" | "help" | "quit" | "exit", Some(_)) => {
                return Err(CommandError::InvalidArgument(format!(
                    "{cmd} takes no arguments"
                )))
            }
            (other, _) => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(command)
    }
}

/// Reads stdin on a detached thread and forwards each line.
///
/// The thread is not owned by the runtime, so a read blocked on the terminal does not hold up
/// shutdown. The channel closes at end of input.
pub(crate) fn spawn_stdin_reader() -> io::Result<mpsc::Receiver<String>> {
    let (tx, rx) = mpsc::channel(16);
    thread::Builder::new()
        .name("chainwatch-stdin".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(error) => {
                        warn!(%error, "failed to read stdin");
                        break;
                    }
                };
                if tx.blocking_send(line).is_err() {
                    break;
                }
            }
            trace!("stdin closed");
        })?;
    Ok(rx)
}

/// Runs commands from `lines` until `quit` or the channel closes.
pub(crate) async fn run_console(
    handle: &SyncHandle,
    mut lines: mpsc::Receiver<String>,
) -> anyhow::Result<()> {
    while let Some(line) = lines.recv().await {
        if line.trim().is_empty() {
            continue;
        }
        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(error) => {
                warn!(%error, "bad command");
                continue;
            }
        };
        debug!(?command, "console command");

        match command {
            Command::View(view) => handle.activate_view(view).await?,
            Command::Refresh(stream) => handle.refresh(stream).await?,
            Command::Status => sink::log_status(handle),
            Command::Host(url) => handle.set_endpoint(url).await?,
            Command::Pause => handle.set_auto_refresh(false).await?,
            Command::Resume => handle.set_auto_refresh(true).await?,
            Command::Help => info!("{HELP}"),
            Command::Quit => break,
        }
    }

    Ok(())
}
