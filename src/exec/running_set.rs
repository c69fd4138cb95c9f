// src/exec/running_set.rs

//! The supervisor's running set as plain synchronous state.
//!
//! All "is this script running?" decisions are made here, by the single task
//! that owns the set. Nothing in this module spawns, waits or does IO, so it
//! can be tested without a runtime.

use std::collections::HashMap;
use std::time::SystemTime;

use tokio::sync::oneshot;

use crate::types::ScriptId;

/// Handle used to ask a process runner to kill its child.
pub type StopHandle = oneshot::Sender<()>;

/// One live process. At most one exists per [`ScriptId`].
#[derive(Debug)]
pub struct RunningProcess {
    pub id: ScriptId,
    pub display_name: String,
    pub file_name: String,
    pub pid: Option<u32>,
    pub started_at: SystemTime,
    /// Distinguishes successive runs of the same script.
    pub run_id: u64,
    /// `None` once a stop was requested.
    stop: Option<StopHandle>,
}

impl RunningProcess {
    pub fn new(
        id: ScriptId,
        display_name: String,
        file_name: String,
        pid: Option<u32>,
        run_id: u64,
        stop: StopHandle,
    ) -> Self {
        Self {
            id,
            display_name,
            file_name,
            pid,
            started_at: SystemTime::now(),
            run_id,
            stop: Some(stop),
        }
    }

    pub fn is_stopping(&self) -> bool {
        self.stop.is_none()
    }

    pub fn info(&self) -> RunningInfo {
        RunningInfo {
            id: self.id.clone(),
            display_name: self.display_name.clone(),
            pid: self.pid,
            started_at: self.started_at,
            stopping: self.is_stopping(),
        }
    }
}

/// Snapshot of a running process handed out to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningInfo {
    pub id: ScriptId,
    pub display_name: String,
    pub pid: Option<u32>,
    pub started_at: SystemTime,
    pub stopping: bool,
}

/// Result of [`RunningSet::request_stop`].
#[derive(Debug)]
pub enum StopDecision {
    NotRunning,
    /// A kill was already requested for this run.
    AlreadyStopping,
    /// Caller must fire the handle; `file_name` is for the stop banner.
    Stop { handle: StopHandle, file_name: String },
}

#[derive(Debug, Default)]
pub struct RunningSet {
    entries: HashMap<ScriptId, RunningProcess>,
    last_run_id: u64,
}

impl RunningSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_run_id(&mut self) -> u64 {
        self.last_run_id += 1;
        self.last_run_id
    }

    pub fn contains(&self, id: &ScriptId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn get(&self, id: &ScriptId) -> Option<&RunningProcess> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Register a freshly spawned process.
    ///
    /// Returns the process back if the id is already taken; the caller must
    /// have checked [`contains`](Self::contains) first.
    pub fn insert(&mut self, process: RunningProcess) -> Result<(), RunningProcess> {
        if self.entries.contains_key(&process.id) {
            return Err(process);
        }
        self.entries.insert(process.id.clone(), process);
        Ok(())
    }

    /// Mark the process for `id` as stopping and hand out its stop handle.
    pub fn request_stop(&mut self, id: &ScriptId) -> StopDecision {
        match self.entries.get_mut(id) {
            None => StopDecision::NotRunning,
            Some(entry) => match entry.stop.take() {
                Some(handle) => StopDecision::Stop {
                    handle,
                    file_name: entry.file_name.clone(),
                },
                None => StopDecision::AlreadyStopping,
            },
        }
    }

    /// Remove the entry for a process that exited.
    ///
    /// Only removes it if `run_id` matches, so a late report from an older
    /// run can never evict a newer one.
    pub fn reap(&mut self, id: &ScriptId, run_id: u64) -> Option<RunningProcess> {
        match self.entries.get(id) {
            Some(entry) if entry.run_id == run_id => self.entries.remove(id),
            _ => None,
        }
    }

    /// Ids of every process not already being stopped.
    pub fn stoppable_ids(&self) -> Vec<ScriptId> {
        self.entries
            .values()
            .filter(|p| !p.is_stopping())
            .map(|p| p.id.clone())
            .collect()
    }

    pub fn snapshot(&self) -> Vec<RunningInfo> {
        let mut infos: Vec<_> = self.entries.values().map(RunningProcess::info).collect();
        infos.sort_by(|a, b| a.id.cmp(&b.id));
        infos
    }
}
