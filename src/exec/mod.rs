// src/exec/mod.rs

//! Process supervision layer.
//!
//! Runs registered scripts with `tokio::process::Command`, captures their
//! output and reports lifecycle changes as [`SupervisorEvent`]s.
//!
//! - [`supervisor`] owns the supervisor loop and the public handle.
//! - [`running_set`] is the synchronous running-set state it mutates.
//! - [`process_runner`] spawns one script and reaps it.
//! - [`output`] turns pipe reads into `Log` events.
//! - [`events`] defines the event type and banner texts.
//! - [`backend`] provides the `ScriptLauncher` seam used by the trigger server.

pub mod backend;
pub mod events;
pub mod output;
pub mod process_runner;
pub mod running_set;
pub mod supervisor;

pub use backend::ScriptLauncher;
pub use events::{EventReceiver, EventSender, ExitReport, SupervisorEvent, event_channel};
pub use running_set::{RunningInfo, RunningSet};
pub use supervisor::{StartOutcome, StopOutcome, Supervisor};
