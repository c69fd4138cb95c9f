// src/exec/events.rs

//! Events the supervisor publishes to consumers.
//!
//! Delivery is an unbounded `mpsc` channel: publishing never blocks the
//! supervisor, and events for one script arrive in the order they were
//! produced.

use std::fmt;
use std::process::ExitStatus;

use tokio::sync::mpsc;

use crate::types::ScriptId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorEvent {
    /// The script could not be launched; no process exists.
    SetupError { id: ScriptId, message: String },
    /// A process was spawned. Always precedes its first `Log`.
    Started { id: ScriptId },
    /// Raw decoded output (or a supervisor banner line), unmodified.
    Log { id: ScriptId, text: String },
    /// The process is gone and no longer in the running set.
    Finished {
        id: ScriptId,
        summary: String,
        exit: ExitReport,
    },
}

impl SupervisorEvent {
    pub fn id(&self) -> &ScriptId {
        match self {
            SupervisorEvent::SetupError { id, .. }
            | SupervisorEvent::Started { id }
            | SupervisorEvent::Log { id, .. }
            | SupervisorEvent::Finished { id, .. } => id,
        }
    }
}

pub type EventSender = mpsc::UnboundedSender<SupervisorEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<SupervisorEvent>;

pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// How a process ended.
///
/// `code` is set when the process exited with one; `signal` when it was
/// terminated by one (unix only). Both are `None` if waiting on the process
/// itself failed. `killed` records that the supervisor stopped the run, since
/// on some platforms a forced termination still reports an exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitReport {
    pub code: Option<i32>,
    pub signal: Option<i32>,
    pub killed: bool,
}

impl ExitReport {
    pub fn from_status(status: &ExitStatus, killed: bool) -> Self {
        #[cfg(unix)]
        let signal = {
            use std::os::unix::process::ExitStatusExt;
            status.signal()
        };
        #[cfg(not(unix))]
        let signal = None;

        Self {
            code: status.code(),
            signal,
            killed,
        }
    }

    pub fn unknown(killed: bool) -> Self {
        Self {
            code: None,
            signal: None,
            killed,
        }
    }

    /// Exited on its own (any exit code), as opposed to crashing or being killed.
    pub fn is_clean(&self) -> bool {
        self.code.is_some() && !self.killed
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    pub fn status_text(&self) -> &'static str {
        if self.is_clean() { "normal exit" } else { "crashed" }
    }
}

impl fmt::Display for ExitReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "exit code: {}, status: {}",
            self.code.unwrap_or(-1),
            self.status_text()
        )?;
        if let Some(signal) = self.signal {
            write!(f, ", signal: {signal}")?;
        }
        Ok(())
    }
}

/// Banner logged when a script is launched.
pub fn start_banner(file_name: &str) -> String {
    format!("--- starting script: {file_name} ---\n")
}

/// Banner logged right before a script is killed.
pub fn stop_banner(file_name: &str) -> String {
    format!("--- stopping script: {file_name} ---\n")
}

/// Final log line of a run.
pub fn finish_banner(exit: &ExitReport) -> String {
    format!("\n--- script finished ({exit}) ---\n")
}

/// Summary carried by `Finished`.
pub fn finish_summary(file_name: &str, exit: &ExitReport) -> String {
    format!("{file_name} finished ({exit})")
}
