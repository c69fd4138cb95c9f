use std::time::Duration;

use scriptd::exec::{EventReceiver, SupervisorEvent};
use scriptd::types::ScriptId;

/// Collect events until `Finished` for `id` arrives (inclusive).
///
/// Panics if it does not arrive within `within`.
pub async fn collect_until_finished(
    rx: &mut EventReceiver,
    id: &ScriptId,
    within: Duration,
) -> Vec<SupervisorEvent> {
    let mut seen = Vec::new();
    let deadline = tokio::time::Instant::now() + within;

    loop {
        let event = tokio::time::timeout_at(deadline, rx.recv())
            .await
            .unwrap_or_else(|_| panic!("no Finished for {id} in time; saw {seen:?}"))
            .expect("event channel closed");

        let done = event.id() == id && matches!(event, SupervisorEvent::Finished { .. });
        seen.push(event);
        if done {
            return seen;
        }
    }
}

/// Concatenated text of every `Log` event for `id`.
pub fn log_text(events: &[SupervisorEvent], id: &ScriptId) -> String {
    events
        .iter()
        .filter(|e| e.id() == id)
        .filter_map(|e| match e {
            SupervisorEvent::Log { text, .. } => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

/// Short tag per event, handy for ordering assertions.
pub fn kinds(events: &[SupervisorEvent]) -> Vec<&'static str> {
    events
        .iter()
        .map(|e| match e {
            SupervisorEvent::SetupError { .. } => "setup_error",
            SupervisorEvent::Started { .. } => "started",
            SupervisorEvent::Log { .. } => "log",
            SupervisorEvent::Finished { .. } => "finished",
        })
        .collect()
}

/// Drain whatever is queued right now without waiting.
pub fn drain_now(rx: &mut EventReceiver) -> Vec<SupervisorEvent> {
    let mut out = Vec::new();
    while let Ok(event) = rx.try_recv() {
        out.push(event);
    }
    out
}

pub const FINISH_WAIT: Duration = Duration::from_secs(5);
