//! Core of the human-in-the-loop bridge: a single-use [`Runner`] that drives a
//! blocking [`Pipeline`] on a worker thread, and the [`Session`] state machine
//! a front end polls.
pub mod decision;
mod handoff;
pub mod message;
pub mod runner;
pub mod session;

pub use decision::{Decision, DecisionHook, FixedDecision, is_affirmative};
pub use message::{Message, Role};
pub use runner::{EMPTY_RESPONSE_NOTICE, Pipeline, PipelineError, RunState, Runner, RunnerOptions};
pub use session::{Session, Tick, View};
