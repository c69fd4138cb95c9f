use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use scriptd::errors::Result;
use scriptd::exec::{ScriptLauncher, StartOutcome};
use scriptd::types::ScriptId;

/// A fake launcher that:
/// - records every start request (id + args)
/// - answers with a fixed outcome, without spawning anything.
#[derive(Clone)]
pub struct FakeLauncher {
    outcome: StartOutcome,
    requests: Arc<Mutex<Vec<(ScriptId, Option<Vec<String>>)>>>,
}

impl FakeLauncher {
    pub fn new(outcome: StartOutcome) -> Self {
        Self {
            outcome,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn requests(&self) -> Vec<(ScriptId, Option<Vec<String>>)> {
        self.requests.lock().unwrap().clone()
    }
}

impl ScriptLauncher for FakeLauncher {
    fn start_script(
        &self,
        id: ScriptId,
        args: Option<Vec<String>>,
    ) -> Pin<Box<dyn Future<Output = Result<StartOutcome>> + Send + '_>> {
        let requests = Arc::clone(&self.requests);
        let outcome = self.outcome.clone();

        Box::pin(async move {
            requests.lock().unwrap().push((id, args));
            Ok(outcome)
        })
    }
}
