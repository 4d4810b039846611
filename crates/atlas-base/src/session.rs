//! Conversation session: the transcript plus the runner serving it.
//!
//! The session is the state machine the front end drives. Each UI tick calls
//! [`Session::tick`] once; rendering only ever reads [`Session::view`] and
//! [`Session::messages`].
use std::sync::Arc;

use tracing::{debug, info};

use crate::message::Message;
use crate::runner::{Pipeline, Runner, RunnerOptions};

/// What the front end should show right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    /// Accepting a new query
    Idle,
    /// Worker busy, no decision needed
    Working,
    /// Worker blocked on a human decision
    AwaitingApproval { prompt: String },
}

/// Outcome of one tick, in the order the steps are evaluated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tick {
    /// Step 1: a decision is needed; nothing else happens this tick
    AwaitingApproval,
    /// Step 2: still working; poll again after a short delay
    Working,
    /// Step 3: the answer was appended to the transcript
    Answered,
    /// Step 4: the failure was appended to the transcript
    Failed,
    /// Step 5: idle, input may be accepted
    Idle,
}

impl Tick {
    /// Whether the transcript changed and the view should be redrawn at once.
    pub fn changed(&self) -> bool {
        matches!(self, Tick::Answered | Tick::Failed)
    }
}

pub struct Session {
    messages: Vec<Message>,
    runner: Runner,
    pipeline: Arc<dyn Pipeline>,
    options: RunnerOptions,
}

impl Session {
    pub fn new(pipeline: Arc<dyn Pipeline>, options: RunnerOptions) -> Self {
        let runner = Runner::new(pipeline.clone(), options);
        Self { messages: Vec::new(), runner, pipeline, options }
    }

    /// Start the transcript with an assistant greeting.
    pub fn with_greeting(mut self, greeting: &str) -> Self {
        if !greeting.trim().is_empty() {
            self.messages.push(Message::assistant(greeting));
        }
        self
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn runner(&self) -> &Runner {
        &self.runner
    }

    pub fn view(&self) -> View {
        if let Some(prompt) = self.runner.pending_request() {
            View::AwaitingApproval { prompt }
        } else if self.runner.is_running() {
            View::Working
        } else {
            View::Idle
        }
    }

    /// Evaluate one tick. Never blocks.
    pub fn tick(&mut self) -> Tick {
        if self.runner.waiting_for_input() {
            return Tick::AwaitingApproval;
        }
        if self.runner.is_running() {
            return Tick::Working;
        }
        if let Some(result) = self.runner.try_take_result() {
            self.messages.push(Message::assistant(result));
            return Tick::Answered;
        }
        if let Some(error) = self.runner.try_take_error() {
            self.messages.push(Message::error(&error));
            return Tick::Failed;
        }
        Tick::Idle
    }

    /// Append `query` and start a run for it. Returns false (and changes
    /// nothing) when the query is blank or a run is still in flight.
    pub fn submit(&mut self, query: &str) -> bool {
        let query = query.trim();
        if query.is_empty() {
            return false;
        }
        if self.runner.is_running() {
            debug!("submit ignored: a run is in flight");
            return false;
        }
        if self.runner.state().is_terminal() {
            // Collect anything the previous run left behind before replacing it.
            while self.tick().changed() {}
            self.runner = Runner::new(self.pipeline.clone(), self.options);
        }
        self.messages.push(Message::user(query));
        self.runner.start(query);
        true
    }

    /// Route a human decision to the runner. No-op unless a request is pending.
    pub fn approve(&self, approved: bool) {
        self.runner.send_approval(approved);
    }

    /// Drop the transcript and the runner. A worker still in flight is left to
    /// finish on its own; its outcome is discarded.
    pub fn clear(&mut self) {
        info!(messages = self.messages.len(), "clearing session");
        self.messages.clear();
        self.runner = Runner::new(self.pipeline.clone(), self.options);
    }
}
