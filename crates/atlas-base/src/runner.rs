//! Background runner: executes one pipeline run on a worker thread and
//! proxies its permission prompts to whoever polls the runner.
//!
//! Lifecycle: `Idle -> Running -> (AwaitingInput <-> Running)* -> Completed | Failed`.
//! A runner is single-use; once it reaches a terminal state the owner builds
//! a new one for the next query.
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, error, info, info_span};

use crate::decision::{Decision, DecisionHook};
use crate::handoff::{Handoff, Phase, WorkerHook};

/// Text delivered instead of an empty pipeline answer.
pub const EMPTY_RESPONSE_NOTICE: &str = "The agent finished without producing an answer.";

/// Failure raised by a pipeline run. Crosses the thread boundary only as text.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The LLM backend failed (network, auth, bad response)
    #[error("backend error: {0}")]
    Backend(String),
    /// A tool failed in a way the agent could not recover from
    #[error("tool '{tool}' failed: {message}")]
    Tool { tool: String, message: String },
    /// The agent ran out of steps before producing a final answer
    #[error("agent '{agent}' gave no final answer within {steps} steps")]
    StepLimit { agent: String, steps: usize },
    /// The worker thread panicked
    #[error("worker panicked: {0}")]
    Panicked(String),
    #[error("{0}")]
    Other(String),
}

/// The long-running computation a [`Runner`] drives. Called once per run on
/// the worker thread; may call `hook` any number of times, one at a time.
pub trait Pipeline: Send + Sync {
    fn run(&self, query: &str, hook: &dyn DecisionHook) -> Result<String, PipelineError>;
}

impl<F> Pipeline for F
where
    F: Fn(&str, &dyn DecisionHook) -> Result<String, PipelineError> + Send + Sync,
{
    fn run(&self, query: &str, hook: &dyn DecisionHook) -> Result<String, PipelineError> {
        self(query, hook)
    }
}

/// Observable runner state, derived on every read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    AwaitingInput,
    Completed,
    Failed,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Completed | RunState::Failed)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunnerOptions {
    /// Deny an unanswered approval after this long. `None` waits forever.
    pub approval_timeout: Option<Duration>,
}

pub struct Runner {
    pipeline: Arc<dyn Pipeline>,
    handoff: Arc<Handoff>,
    result_tx: Sender<String>,
    result_rx: Receiver<String>,
    error_tx: Sender<String>,
    error_rx: Receiver<String>,
    thread: Option<JoinHandle<()>>,
}

impl Runner {
    pub fn new(pipeline: Arc<dyn Pipeline>, options: RunnerOptions) -> Self {
        let (result_tx, result_rx) = mpsc::channel();
        let (error_tx, error_rx) = mpsc::channel();
        Self {
            pipeline,
            handoff: Arc::new(Handoff::new(options.approval_timeout)),
            result_tx,
            result_rx,
            error_tx,
            error_rx,
            thread: None,
        }
    }

    /// Spawn the worker for `query`. No-op unless the runner is still idle.
    pub fn start(&mut self, query: &str) {
        if !self.handoff.begin() {
            debug!(state = ?self.state(), "start ignored: runner already used");
            return;
        }
        info!(query, "starting agent runner");

        let pipeline = self.pipeline.clone();
        let handoff = self.handoff.clone();
        let result_tx = self.result_tx.clone();
        let error_tx = self.error_tx.clone();
        let query_owned = query.to_string();

        let spawned = thread::Builder::new()
            .name("agent-worker".to_string())
            .spawn(move || worker_main(pipeline.as_ref(), &handoff, &query_owned, &result_tx, &error_tx));

        match spawned {
            Ok(handle) => self.thread = Some(handle),
            Err(e) => {
                error!(error = %e, "failed to spawn agent worker");
                let _ = self.error_tx.send(format!("failed to start agent worker: {}", e));
                self.handoff.set_phase(Phase::Failed);
            }
        }
    }

    /// Answer the outstanding permission request. Ignored when nothing is pending.
    pub fn send_approval(&self, approved: bool) {
        if !self.handoff.deliver(Decision::from_bool(approved)) {
            debug!(approved, "send_approval ignored: no pending request");
        }
    }

    pub fn is_running(&self) -> bool {
        self.handoff.phase() == Phase::Running
    }

    pub fn waiting_for_input(&self) -> bool {
        self.handoff.is_waiting()
    }

    pub fn pending_request(&self) -> Option<String> {
        self.handoff.pending_prompt()
    }

    pub fn state(&self) -> RunState {
        match self.handoff.phase() {
            Phase::Idle => RunState::Idle,
            Phase::Running if self.handoff.is_waiting() => RunState::AwaitingInput,
            Phase::Running => RunState::Running,
            Phase::Completed => RunState::Completed,
            Phase::Failed => RunState::Failed,
        }
    }

    /// Take the final answer if the worker has produced one.
    pub fn try_take_result(&self) -> Option<String> {
        self.result_rx.try_recv().ok()
    }

    /// Take the failure description if the worker has failed.
    pub fn try_take_error(&self) -> Option<String> {
        self.error_rx.try_recv().ok()
    }

    /// Whether the worker thread has exited (always false before `start`).
    pub fn worker_exited(&self) -> bool {
        self.thread.as_ref().is_some_and(|h| h.is_finished())
    }
}

impl Drop for Runner {
    fn drop(&mut self) {
        // The worker cannot be cancelled, only released from a pending wait.
        self.handoff.abandon();
        if self.thread.is_some() && !self.worker_exited() {
            debug!("runner dropped while its worker is still running; outcome will be discarded");
        }
    }
}

fn worker_main(
    pipeline: &dyn Pipeline,
    handoff: &Handoff,
    query: &str,
    result_tx: &Sender<String>,
    error_tx: &Sender<String>,
) {
    let _span = info_span!("agent_run").entered();
    let hook = WorkerHook { handoff };

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| pipeline.run(query, &hook)))
        .unwrap_or_else(|payload| Err(PipelineError::Panicked(panic_message(payload.as_ref()))));

    // Fill the slot before leaving `Running`, so a poller that sees the
    // terminal phase always finds the outcome waiting.
    match outcome {
        Ok(text) => {
            let text = if text.trim().is_empty() {
                error!("agent returned an empty response");
                EMPTY_RESPONSE_NOTICE.to_string()
            } else {
                info!(chars = text.len(), "agent finished successfully");
                text
            };
            let _ = result_tx.send(text);
            handoff.set_phase(Phase::Completed);
        }
        Err(e) => {
            error!(error = %e, "agent thread failed");
            let _ = error_tx.send(e.to_string());
            handoff.set_phase(Phase::Failed);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
