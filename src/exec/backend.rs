// src/exec/backend.rs

//! Pluggable launch backend.
//!
//! The trigger server talks to a `ScriptLauncher` instead of a concrete
//! [`Supervisor`]. Production wires in the supervisor; tests can provide a
//! launcher that records requests without spawning anything.

use std::future::Future;
use std::pin::Pin;

use crate::errors::Result;
use crate::exec::supervisor::{StartOutcome, Supervisor};
use crate::types::ScriptId;

pub trait ScriptLauncher: Send + Sync {
    /// Start (or toggle off) the script `id`.
    fn start_script(
        &self,
        id: ScriptId,
        args: Option<Vec<String>>,
    ) -> Pin<Box<dyn Future<Output = Result<StartOutcome>> + Send + '_>>;
}

impl ScriptLauncher for Supervisor {
    fn start_script(
        &self,
        id: ScriptId,
        args: Option<Vec<String>>,
    ) -> Pin<Box<dyn Future<Output = Result<StartOutcome>> + Send + '_>> {
        Box::pin(async move { self.start(&id, args).await })
    }
}
