// src/console/mod.rs

//! Terminal consumer of supervisor events.
//!
//! Keeps a [`LogView`] per script and prints every committed line prefixed
//! with the script's display name. In-place progress updates therefore show
//! up once, in their final form.

pub mod log_view;

use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::exec::{EventReceiver, SupervisorEvent};
use crate::registry::ScriptRegistry;
use crate::types::ScriptId;

pub use log_view::LogView;

pub struct ConsoleReporter<W: Write> {
    registry: Arc<ScriptRegistry>,
    views: HashMap<ScriptId, LogView>,
    out: W,
}

impl ConsoleReporter<io::Stdout> {
    pub fn stdout(registry: Arc<ScriptRegistry>) -> Self {
        Self::new(registry, io::stdout())
    }
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(registry: Arc<ScriptRegistry>, out: W) -> Self {
        Self {
            registry,
            views: HashMap::new(),
            out,
        }
    }

    pub fn view(&self, id: &ScriptId) -> Option<&LogView> {
        self.views.get(id)
    }

    pub fn writer(&self) -> &W {
        &self.out
    }

    /// Consume events until every sender is gone, then hand the reporter
    /// back.
    pub async fn run(mut self, mut rx: EventReceiver) -> Self {
        while let Some(event) = rx.recv().await {
            if let Err(e) = self.handle(&event) {
                warn!(script = %event.id(), error = %e, "failed to write script output to console");
            }
        }
        self
    }

    pub fn handle(&mut self, event: &SupervisorEvent) -> io::Result<()> {
        match event {
            SupervisorEvent::SetupError { id, message } => {
                error!(script = %id, %message, "script setup failed");
                let label = self.label(id);
                writeln!(self.out, "[{label}] error: {message}")?;
            }
            SupervisorEvent::Started { id } => {
                info!(script = %id, "script running");
                self.views.entry(id.clone()).or_default();
            }
            SupervisorEvent::Log { id, text } => {
                let committed = self.views.entry(id.clone()).or_default().apply(text);
                self.print_lines(id, &committed)?;
            }
            SupervisorEvent::Finished { id, summary, .. } => {
                let partial = self.views.get_mut(id).and_then(LogView::take_partial);
                if let Some(line) = partial {
                    self.print_lines(id, &[line])?;
                }
                info!(script = %id, %summary, "script finished");
            }
        }
        self.out.flush()
    }

    fn print_lines(&mut self, id: &ScriptId, lines: &[String]) -> io::Result<()> {
        if lines.is_empty() {
            return Ok(());
        }
        let label = self.label(id);
        for line in lines {
            writeln!(self.out, "[{label}] {line}")?;
        }
        Ok(())
    }

    fn label(&self, id: &ScriptId) -> String {
        self.registry
            .get(id)
            .map(|def| def.display_name.clone())
            .unwrap_or_else(|| id.to_string())
    }
}
