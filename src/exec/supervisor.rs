// src/exec/supervisor.rs

//! The process supervisor.
//!
//! A single background task owns the [`RunningSet`]; every start/stop request
//! is a message to that task, so "is this script already running?" is decided
//! by exactly one owner and two concurrent starts of the same id can never
//! both spawn a process. [`Supervisor`] is the cheap, cloneable handle the
//! rest of the crate uses.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::errors::{Result, ScriptdError};
use crate::exec::events::{self, EventSender, SupervisorEvent};
use crate::exec::process_runner::{self, ProcessRun, Reaped};
use crate::exec::running_set::{RunningInfo, RunningProcess, RunningSet, StopDecision};
use crate::registry::{ScriptDefinition, ScriptRegistry};
use crate::types::ScriptId;

/// Result of [`Supervisor::start`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    /// The script was already running; the request stopped it instead.
    AlreadyRunningToggledOff,
    NotFound,
    /// Nothing was spawned; a `SetupError` event carries the same message.
    LaunchError(String),
}

/// Result of [`Supervisor::stop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped,
    NotRunning,
}

enum Command {
    Start {
        id: ScriptId,
        args: Option<Vec<String>>,
        reply: oneshot::Sender<StartOutcome>,
    },
    Stop {
        id: ScriptId,
        reply: oneshot::Sender<StopOutcome>,
    },
    StopAll {
        reply: oneshot::Sender<usize>,
    },
    Snapshot {
        reply: oneshot::Sender<Vec<RunningInfo>>,
    },
}

/// Handle to the supervisor loop.
#[derive(Debug, Clone)]
pub struct Supervisor {
    tx: mpsc::Sender<Command>,
}

impl Supervisor {
    /// Spawn the supervisor loop on the current Tokio runtime.
    pub fn spawn(registry: Arc<ScriptRegistry>, events: EventSender) -> Self {
        let (tx, rx) = mpsc::channel::<Command>(32);
        let (reaped_tx, reaped_rx) = mpsc::unbounded_channel::<Reaped>();

        let state = SupervisorLoop {
            registry,
            events,
            running: RunningSet::new(),
            reaped_tx,
        };
        tokio::spawn(state.run(rx, reaped_rx));

        Self { tx }
    }

    /// Start `id`, or stop it if it is already running.
    ///
    /// `args = None` uses the script's configured default arguments.
    pub async fn start(&self, id: &ScriptId, args: Option<Vec<String>>) -> Result<StartOutcome> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Start {
            id: id.clone(),
            args,
            reply,
        })
        .await?;
        rx.await.map_err(|_| ScriptdError::SupervisorClosed)
    }

    /// Kill the process for `id` if there is one.
    pub async fn stop(&self, id: &ScriptId) -> Result<StopOutcome> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Stop {
            id: id.clone(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| ScriptdError::SupervisorClosed)
    }

    /// Kill every running process; returns how many were signalled.
    pub async fn stop_all(&self) -> Result<usize> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::StopAll { reply }).await?;
        rx.await.map_err(|_| ScriptdError::SupervisorClosed)
    }

    pub async fn running(&self) -> Result<Vec<RunningInfo>> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Snapshot { reply }).await?;
        rx.await.map_err(|_| ScriptdError::SupervisorClosed)
    }

    pub async fn is_running(&self, id: &ScriptId) -> Result<bool> {
        Ok(self.running().await?.iter().any(|p| &p.id == id))
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.tx
            .send(command)
            .await
            .map_err(|_| ScriptdError::SupervisorClosed)
    }
}

struct SupervisorLoop {
    registry: Arc<ScriptRegistry>,
    events: EventSender,
    running: RunningSet,
    reaped_tx: mpsc::UnboundedSender<Reaped>,
}

impl SupervisorLoop {
    async fn run(
        mut self,
        mut rx: mpsc::Receiver<Command>,
        mut reaped_rx: mpsc::UnboundedReceiver<Reaped>,
    ) {
        info!("supervisor loop started");
        let mut handles_open = true;

        loop {
            tokio::select! {
                cmd = rx.recv(), if handles_open => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    None => {
                        // Every handle is gone: kill what is left and stay
                        // around only long enough to reap it.
                        handles_open = false;
                        self.stop_all();
                    }
                },
                Some(reaped) = reaped_rx.recv() => self.handle_reaped(reaped),
            }

            if !handles_open && self.running.is_empty() {
                break;
            }
        }

        info!("supervisor loop finished");
    }

    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Start { id, args, reply } => {
                let outcome = self.start(&id, args);
                let _ = reply.send(outcome);
            }
            Command::Stop { id, reply } => {
                let outcome = self.stop(&id);
                let _ = reply.send(outcome);
            }
            Command::StopAll { reply } => {
                let _ = reply.send(self.stop_all());
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.running.snapshot());
            }
        }
    }

    fn start(&mut self, id: &ScriptId, args: Option<Vec<String>>) -> StartOutcome {
        let Some(def) = self.registry.get(id).cloned() else {
            warn!(script = %id, "start requested for unknown script");
            return StartOutcome::NotFound;
        };

        if self.running.contains(id) {
            info!(script = %id, "script already running; treating start as stop");
            self.stop(id);
            return StartOutcome::AlreadyRunningToggledOff;
        }

        if !def.executable_path.exists() {
            let message = format!(
                "script '{}' not found",
                def.executable_path.display()
            );
            return self.setup_error(&def, message);
        }

        let args = args.unwrap_or_else(|| def.default_args.clone());
        let child = match process_runner::spawn_script(&def, &args) {
            Ok(child) => child,
            Err(e) => {
                let message = format!("cannot launch '{}': {e}", def.file_name());
                return self.setup_error(&def, message);
            }
        };

        let run_id = self.running.next_run_id();
        let pid = child.id();
        let (stop_tx, stop_rx) = oneshot::channel();

        info!(script = %id, run_id, ?pid, ?args, "script started");
        self.emit(SupervisorEvent::Started { id: id.clone() });
        self.emit(SupervisorEvent::Log {
            id: id.clone(),
            text: events::start_banner(&def.file_name()),
        });

        let process = RunningProcess::new(
            id.clone(),
            def.display_name.clone(),
            def.file_name(),
            pid,
            run_id,
            stop_tx,
        );
        if self.running.insert(process).is_err() {
            // Unreachable while this loop is the only writer; the child is
            // killed on drop.
            warn!(script = %id, "running set already had an entry; dropping new process");
            return StartOutcome::AlreadyRunningToggledOff;
        }

        tokio::spawn(process_runner::supervise(ProcessRun {
            id: id.clone(),
            run_id,
            child,
            stop_rx,
            events: self.events.clone(),
            reaped_tx: self.reaped_tx.clone(),
        }));

        StartOutcome::Started
    }

    fn stop(&mut self, id: &ScriptId) -> StopOutcome {
        match self.running.request_stop(id) {
            StopDecision::NotRunning => {
                debug!(script = %id, "stop requested but script is not running");
                StopOutcome::NotRunning
            }
            StopDecision::AlreadyStopping => {
                debug!(script = %id, "stop already in progress");
                StopOutcome::Stopped
            }
            StopDecision::Stop { handle, file_name } => {
                info!(script = %id, "stopping script");
                self.emit(SupervisorEvent::Log {
                    id: id.clone(),
                    text: events::stop_banner(&file_name),
                });
                if handle.send(()).is_err() {
                    debug!(script = %id, "runner already finished while stopping");
                }
                StopOutcome::Stopped
            }
        }
    }

    fn stop_all(&mut self) -> usize {
        let ids = self.running.stoppable_ids();
        for id in ids.iter() {
            self.stop(id);
        }
        ids.len()
    }

    fn handle_reaped(&mut self, reaped: Reaped) {
        let Reaped { id, run_id, exit } = reaped;

        let Some(process) = self.running.reap(&id, run_id) else {
            debug!(script = %id, run_id, "exit report for unknown run; ignoring");
            return;
        };

        self.emit(SupervisorEvent::Log {
            id: id.clone(),
            text: events::finish_banner(&exit),
        });
        self.emit(SupervisorEvent::Finished {
            id,
            summary: events::finish_summary(&process.file_name, &exit),
            exit,
        });
    }

    fn setup_error(&self, def: &ScriptDefinition, message: String) -> StartOutcome {
        warn!(script = %def.id, %message, "script could not be launched");
        self.emit(SupervisorEvent::SetupError {
            id: def.id.clone(),
            message: message.clone(),
        });
        StartOutcome::LaunchError(message)
    }

    fn emit(&self, event: SupervisorEvent) {
        if self.events.send(event).is_err() {
            debug!("no event consumer attached; dropping event");
        }
    }
}
