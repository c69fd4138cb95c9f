// src/exec/process_runner.rs

//! Per-process runner: owns the OS child from spawn to reap.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::exec::events::{EventSender, ExitReport};
use crate::exec::output::{OutputStream, pump_output};
use crate::registry::ScriptDefinition;
use crate::types::ScriptId;

/// How long to keep reading output after the process exited.
///
/// Grandchildren may inherit the pipes and keep them open; past this bound
/// the readers are abandoned so `Finished` is not held up.
const OUTPUT_DRAIN_TIMEOUT: Duration = Duration::from_millis(500);

/// Exit notification sent back to the supervisor loop, once per run.
#[derive(Debug)]
pub struct Reaped {
    pub id: ScriptId,
    pub run_id: u64,
    pub exit: ExitReport,
}

/// Build the command for a script.
///
/// The argument vector is `[path, args...]`: with an interpreter the script
/// path is its first argument, otherwise the path itself is executed. The
/// path is passed as-is, not in the lossy form used for the id.
pub fn build_command(def: &ScriptDefinition, args: &[String]) -> Command {
    let mut cmd = match def.interpreter.as_deref() {
        Some(interpreter) => {
            let mut c = Command::new(interpreter);
            c.arg(&def.executable_path);
            c
        }
        None => Command::new(&def.executable_path),
    };

    cmd.args(args)
        .env("PYTHONIOENCODING", "utf-8")
        .env("PYTHONUTF8", "1")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    cmd
}

pub fn spawn_script(def: &ScriptDefinition, args: &[String]) -> std::io::Result<Child> {
    build_command(def, args).spawn()
}

/// Everything a runner needs for one process.
pub(crate) struct ProcessRun {
    pub id: ScriptId,
    pub run_id: u64,
    pub child: Child,
    pub stop_rx: oneshot::Receiver<()>,
    pub events: EventSender,
    pub reaped_tx: mpsc::UnboundedSender<Reaped>,
}

/// Pump output, wait for exit (or kill on request), then report back.
pub(crate) async fn supervise(run: ProcessRun) {
    let ProcessRun {
        id,
        run_id,
        mut child,
        mut stop_rx,
        events,
        reaped_tx,
    } = run;

    let mut pumps = Vec::with_capacity(2);
    if let Some(stdout) = child.stdout.take() {
        pumps.push(tokio::spawn(pump_output(
            stdout,
            id.clone(),
            OutputStream::Stdout,
            events.clone(),
        )));
    }
    if let Some(stderr) = child.stderr.take() {
        pumps.push(tokio::spawn(pump_output(
            stderr,
            id.clone(),
            OutputStream::Stderr,
            events.clone(),
        )));
    }

    let mut killed = false;
    let status = tokio::select! {
        status = child.wait() => status,
        _ = &mut stop_rx => {
            killed = true;
            // Either an explicit stop or the supervisor went away; both mean
            // the process must not outlive us.
            info!(script = %id, run_id, "killing script process");
            if let Err(e) = child.start_kill() {
                warn!(script = %id, run_id, error = %e, "failed to kill script process");
            }
            child.wait().await
        }
    };

    let exit = match status {
        Ok(status) => ExitReport::from_status(&status, killed),
        Err(e) => {
            error!(script = %id, run_id, error = %e, "waiting for script process failed");
            ExitReport::unknown(killed)
        }
    };

    let aborts: Vec<_> = pumps.iter().map(|h| h.abort_handle()).collect();
    let drained = tokio::time::timeout(OUTPUT_DRAIN_TIMEOUT, async {
        for pump in pumps {
            let _ = pump.await;
        }
    })
    .await;
    if drained.is_err() {
        debug!(script = %id, run_id, "output still open after exit; abandoning readers");
        for abort in aborts {
            abort.abort();
        }
    }

    info!(
        script = %id,
        run_id,
        exit_code = exit.code.unwrap_or(-1),
        clean = exit.is_clean(),
        killed,
        "script process exited"
    );

    if reaped_tx.send(Reaped { id, run_id, exit }).is_err() {
        debug!(run_id, "supervisor loop gone; exit not reported");
    }
}
