//! Foreground policy daemon driven by line commands on stdin.
//!
//! ```text
//! add <display>                          register a display
//! remove <display>                       unregister a display
//! focus <display> <package|-> [types]    focused window changed
//! insets <display> <types>               shell reported visible insets
//! overlay <display>                      re-read persistency
//! ime <display> show|hide                keyboard shown or hidden
//! status                                 print every display
//! quit                                   stop
//! ```
//!
//! `types` is a comma separated list such as `status,navigation`.

use std::io::BufRead;
use std::ops::ControlFlow;
use std::str::FromStr;
use std::sync::Arc;

use colored::Colorize;
use tokio::sync::mpsc;

use super::output;
use crate::actor::{BarPolicyActor, BarPolicyHandle};
use crate::broadcast::{CrossProcessEventBroadcaster, DisplayEventListener, Executor, SerialExecutor};
use crate::config::SysbarsConfig;
use crate::display::{LoggingShell, PersistencySource, WindowShell};
use crate::error::SysbarsError;
use crate::events::DisplayEvent;
use crate::insets::{DisplayId, InsetTypes, InsetsState};
use crate::settings::{FileSettings, SettingsSource};

/// One line of daemon input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DaemonCommand {
    Add(DisplayId),
    Remove(DisplayId),
    Focus {
        display_id: DisplayId,
        package: Option<String>,
        requested: InsetTypes,
    },
    Insets { display_id: DisplayId, visible: InsetTypes },
    Overlay(DisplayId),
    Ime { display_id: DisplayId, showing: bool },
    Status,
    Quit,
}

fn display_arg(token: Option<&str>) -> Result<DisplayId, String> {
    let token = token.ok_or_else(|| "missing display id".to_string())?;
    token.parse().map_err(|_| format!("invalid display id '{token}'"))
}

fn types_arg(token: Option<&str>) -> Result<InsetTypes, String> {
    token.map_or(Ok(InsetTypes::empty()), |token| {
        InsetTypes::parse_list(token).map_err(|bad| format!("unknown inset type '{bad}'"))
    })
}

impl FromStr for DaemonCommand {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut tokens = line.split_whitespace();
        let Some(verb) = tokens.next() else {
            return Err("empty command".to_string());
        };

        let command = match verb.to_ascii_lowercase().as_str() {
            "add" => Self::Add(display_arg(tokens.next())?),
            "remove" => Self::Remove(display_arg(tokens.next())?),
            "focus" => {
                let display_id = display_arg(tokens.next())?;
                let package = match tokens.next() {
                    None | Some("-") => None,
                    Some(package) => Some(package.to_string()),
                };
                Self::Focus { display_id, package, requested: types_arg(tokens.next())? }
            }
            "insets" => {
                let display_id = display_arg(tokens.next())?;
                Self::Insets { display_id, visible: types_arg(tokens.next())? }
            }
            "overlay" => Self::Overlay(display_arg(tokens.next())?),
            "ime" => {
                let display_id = display_arg(tokens.next())?;
                let showing = match tokens.next() {
                    Some("show") => true,
                    Some("hide") => false,
                    other => return Err(format!("expected show or hide, got {other:?}")),
                };
                Self::Ime { display_id, showing }
            }
            "status" => Self::Status,
            "quit" | "exit" => Self::Quit,
            other => return Err(format!("unknown command '{other}'")),
        };

        if let Some(extra) = tokens.next() {
            return Err(format!("unexpected argument '{extra}'"));
        }
        Ok(command)
    }
}

/// Prints keyboard events for the displays it is subscribed to.
struct KeyboardPrinter;

impl DisplayEventListener for KeyboardPrinter {
    fn on_event(&self, display_id: DisplayId, event: &DisplayEvent) {
        match event {
            DisplayEvent::KeyboardVisibilityChanged { showing } => {
                let state = if *showing { "shown".green() } else { "hidden".yellow() };
                println!("{} display {display_id}: keyboard {state}", event.name().dimmed());
            }
        }
    }
}

/// Everything the daemon loop needs to apply a command.
pub struct Daemon {
    handle: BarPolicyHandle,
    broadcaster: Arc<CrossProcessEventBroadcaster>,
    listener: Arc<dyn DisplayEventListener>,
    executor: Arc<dyn Executor>,
    json: bool,
}

impl Daemon {
    /// Spawns the actor and the keyboard event executor.
    ///
    /// Must be called inside a tokio runtime.
    #[must_use]
    pub fn spawn(
        settings: Arc<dyn SettingsSource>,
        shell: Arc<dyn WindowShell>,
        persistency: Arc<dyn PersistencySource>,
        listener: Arc<dyn DisplayEventListener>,
        json: bool,
    ) -> Self {
        let broadcaster = Arc::new(CrossProcessEventBroadcaster::new());
        let handle = BarPolicyActor::spawn(settings, shell, persistency, Arc::clone(&broadcaster));
        Self {
            handle,
            broadcaster,
            listener,
            executor: Arc::new(SerialExecutor::spawn("keyboard-events")),
            json,
        }
    }

    /// Handle to the actor.
    #[must_use]
    pub const fn handle(&self) -> &BarPolicyHandle { &self.handle }

    /// Applies one command.
    ///
    /// # Errors
    ///
    /// Returns an error if the actor is gone.
    pub async fn dispatch(&self, command: DaemonCommand) -> Result<ControlFlow<()>, SysbarsError> {
        match command {
            DaemonCommand::Add(display_id) => {
                self.handle.display_added(display_id)?;
                self.broadcaster.subscribe(
                    display_id,
                    Arc::clone(&self.listener),
                    Arc::clone(&self.executor),
                );
            }
            DaemonCommand::Remove(display_id) => {
                self.broadcaster.unsubscribe(display_id, &self.listener);
                self.handle.display_removed(display_id)?;
            }
            DaemonCommand::Focus { display_id, package, requested } => {
                self.handle.focused_window_changed(display_id, package.as_deref(), requested)?;
            }
            DaemonCommand::Insets { display_id, visible } => {
                self.handle.insets_state_changed(display_id, InsetsState::new(visible))?;
            }
            DaemonCommand::Overlay(display_id) => self.handle.overlay_changed(display_id)?,
            DaemonCommand::Ime { display_id, showing } => {
                self.handle.ime_visibility_changed(display_id, showing)?;
            }
            DaemonCommand::Status => self.print_status().await?,
            DaemonCommand::Quit => {
                self.handle.shutdown()?;
                return Ok(ControlFlow::Break(()));
            }
        }
        Ok(ControlFlow::Continue(()))
    }

    async fn print_status(&self) -> Result<(), SysbarsError> {
        let snapshot = self.handle.snapshot().await?;
        if self.json {
            output::print_highlighted_json(&serde_json::to_value(&snapshot)?);
            return Ok(());
        }

        let policy = snapshot.policy.setting_value.as_deref().unwrap_or("<unset>");
        println!("{} {}", "policy:".dimmed(), policy.cyan());
        if snapshot.displays.is_empty() {
            println!("{}", "No displays registered.".dimmed());
        } else {
            println!("{}", output::displays_table(&snapshot));
        }
        Ok(())
    }
}

/// Runs the daemon until `quit` or end of input.
///
/// # Errors
///
/// Returns an error if stdin cannot be read or the actor stops unexpectedly.
pub async fn run(config: &SysbarsConfig, displays: &[DisplayId], json: bool) -> Result<(), SysbarsError> {
    let settings_path = config.settings_path();
    tracing::info!(settings = %settings_path.display(), "starting bar policy daemon");

    let daemon = Daemon::spawn(
        Arc::new(FileSettings::new(settings_path)),
        Arc::new(LoggingShell),
        Arc::new(config.persistency.clone()),
        Arc::new(KeyboardPrinter),
        json,
    );

    for display_id in displays {
        daemon.dispatch(DaemonCommand::Add(*display_id)).await?;
    }

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    std::thread::Builder::new().name("sysbars-stdin".to_string()).spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if tx.send(line).is_err() {
                break;
            }
        }
    })?;

    while let Some(line) = rx.recv().await {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match line.parse::<DaemonCommand>() {
            Ok(command) => {
                if daemon.dispatch(command).await?.is_break() {
                    return Ok(());
                }
            }
            Err(err) => eprintln!("{} {err}", "error:".red()),
        }
    }

    tracing::debug!("stdin closed, stopping daemon");
    daemon.handle().shutdown()?;
    Ok(())
}
