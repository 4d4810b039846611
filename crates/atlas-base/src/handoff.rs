//! Worker <-> UI hand-off channel.
//!
//! The worker publishes one [`PendingApproval`] at a time and blocks on its
//! private reply channel. The UI side only ever peeks at the pending slot or
//! takes it out to answer it, so neither side can hand a decision to the
//! wrong request.
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, SyncSender};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::decision::{DEFAULT_PROMPT, Decision, DecisionHook};

/// Lifecycle phase stored in the shared handle. `AwaitingInput` is not a
/// phase of its own: it is `Running` with a pending approval present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum Phase {
    Idle = 0,
    Running = 1,
    Completed = 2,
    Failed = 3,
}

impl Phase {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => Phase::Running,
            2 => Phase::Completed,
            3 => Phase::Failed,
            _ => Phase::Idle,
        }
    }
}

/// An outstanding request for a human decision.
struct PendingApproval {
    prompt: String,
    reply: SyncSender<Decision>,
}

/// State shared between a [`crate::Runner`] and its worker thread.
pub(crate) struct Handoff {
    phase: AtomicU8,
    pending: Mutex<Option<PendingApproval>>,
    /// Held by the worker for the whole ask/wait cycle, so a pipeline that
    /// asks from several threads still has one outstanding request at a time.
    ask_lock: Mutex<()>,
    /// Set once the owning runner is dropped; later requests are denied.
    abandoned: AtomicBool,
    approval_timeout: Option<Duration>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

impl Handoff {
    pub(crate) fn new(approval_timeout: Option<Duration>) -> Self {
        Self {
            phase: AtomicU8::new(Phase::Idle as u8),
            pending: Mutex::new(None),
            ask_lock: Mutex::new(()),
            abandoned: AtomicBool::new(false),
            approval_timeout,
        }
    }

    pub(crate) fn phase(&self) -> Phase {
        Phase::from_u8(self.phase.load(Ordering::Acquire))
    }

    pub(crate) fn set_phase(&self, phase: Phase) {
        self.phase.store(phase as u8, Ordering::Release);
    }

    /// Move from `Idle` to `Running`. Returns false if the runner was already
    /// started at some point.
    pub(crate) fn begin(&self) -> bool {
        self.phase
            .compare_exchange(Phase::Idle as u8, Phase::Running as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn is_waiting(&self) -> bool {
        lock(&self.pending).is_some()
    }

    pub(crate) fn pending_prompt(&self) -> Option<String> {
        lock(&self.pending).as_ref().map(|p| p.prompt.clone())
    }

    /// UI side: answer the outstanding request. The pending slot is emptied
    /// in the same critical section, so a second call finds nothing to answer.
    pub(crate) fn deliver(&self, decision: Decision) -> bool {
        let Some(pending) = lock(&self.pending).take() else {
            return false;
        };
        info!(prompt = %pending.prompt, ?decision, "approval delivered");
        // The worker only goes away after timing out, in which case the
        // decision is simply late.
        let _ = pending.reply.send(decision);
        true
    }

    /// Owner is gone: release a blocked worker with a denial and refuse
    /// anything it asks afterwards.
    pub(crate) fn abandon(&self) {
        self.abandoned.store(true, Ordering::Release);
        if let Some(pending) = lock(&self.pending).take() {
            warn!(prompt = %pending.prompt, "runner dropped while awaiting approval; denying");
        }
    }

    /// Worker side: publish `prompt` and block until the UI answers.
    pub(crate) fn request(&self, prompt: &str) -> Decision {
        let _asking = lock(&self.ask_lock);

        let prompt = if prompt.trim().is_empty() { DEFAULT_PROMPT } else { prompt };
        let (tx, rx) = mpsc::sync_channel(1);
        {
            // Checked under the slot lock so `abandon` either sees the
            // published request or we see the flag.
            let mut slot = lock(&self.pending);
            if self.abandoned.load(Ordering::Acquire) {
                debug!(prompt, "approval requested after runner was dropped; denying");
                return Decision::Deny;
            }
            debug_assert!(slot.is_none(), "a second approval was published while one is outstanding");
            *slot = Some(PendingApproval { prompt: prompt.to_string(), reply: tx });
        }
        info!(prompt, "agent requested input");

        let received = match self.approval_timeout {
            Some(timeout) => rx.recv_timeout(timeout),
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };

        match received {
            Ok(decision) => {
                info!(?decision, "user responded");
                decision
            }
            Err(RecvTimeoutError::Timeout) => {
                // Withdraw the request; if the UI answered in the meantime, honour it.
                lock(&self.pending).take();
                match rx.try_recv() {
                    Ok(decision) => decision,
                    Err(_) => {
                        warn!(prompt, "no answer within the approval timeout; denying");
                        Decision::Deny
                    }
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                debug!(prompt, "approval request abandoned; denying");
                Decision::Deny
            }
        }
    }
}

/// The [`DecisionHook`] handed to the pipeline running on the worker thread.
pub(crate) struct WorkerHook<'a> {
    pub(crate) handoff: &'a Handoff,
}

impl DecisionHook for WorkerHook<'_> {
    fn ask(&self, prompt: &str) -> String {
        self.handoff.request(prompt).token().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    fn wait_until(cond: impl Fn() -> bool) {
        let start = Instant::now();
        while !cond() {
            assert!(start.elapsed() < Duration::from_secs(5), "condition not reached in time");
            thread::sleep(Duration::from_millis(2));
        }
    }

    #[test]
    fn begin_only_once() {
        let h = Handoff::new(None);
        assert!(h.begin());
        assert!(!h.begin());
        h.set_phase(Phase::Completed);
        assert!(!h.begin());
    }

    #[test]
    fn deliver_without_pending_is_refused() {
        let h = Handoff::new(None);
        assert!(!h.deliver(Decision::Approve));
        assert!(!h.is_waiting());
    }

    #[test]
    fn request_blocks_until_delivered() {
        let h = Arc::new(Handoff::new(None));
        let worker = {
            let h = h.clone();
            thread::spawn(move || h.request("Use Wikipedia tool?"))
        };
        wait_until(|| h.is_waiting());
        assert_eq!(h.pending_prompt().as_deref(), Some("Use Wikipedia tool?"));
        assert!(h.deliver(Decision::Approve));
        assert!(!h.is_waiting());
        assert_eq!(worker.join().unwrap(), Decision::Approve);
    }

    #[test]
    fn empty_prompt_gets_default_text() {
        let h = Arc::new(Handoff::new(None));
        let worker = {
            let h = h.clone();
            thread::spawn(move || h.request("  "))
        };
        wait_until(|| h.is_waiting());
        assert_eq!(h.pending_prompt().as_deref(), Some(DEFAULT_PROMPT));
        h.deliver(Decision::Deny);
        assert_eq!(worker.join().unwrap(), Decision::Deny);
    }

    #[test]
    fn timeout_denies_and_clears_pending() {
        let h = Handoff::new(Some(Duration::from_millis(20)));
        assert_eq!(h.request("anyone there?"), Decision::Deny);
        assert!(!h.is_waiting());
    }

    #[test]
    fn abandon_releases_blocked_worker() {
        let h = Arc::new(Handoff::new(None));
        let worker = {
            let h = h.clone();
            thread::spawn(move || h.request("Allow OpenMeteo?"))
        };
        wait_until(|| h.is_waiting());
        h.abandon();
        assert_eq!(worker.join().unwrap(), Decision::Deny);
        // Anything asked afterwards is refused without blocking.
        assert_eq!(h.request("again?"), Decision::Deny);
    }

    #[test]
    fn abandon_racing_publish_never_strands_worker() {
        let (done_tx, done_rx) = mpsc::channel();
        for _ in 0..200 {
            let h = Arc::new(Handoff::new(None));
            let worker = {
                let h = h.clone();
                let done = done_tx.clone();
                thread::spawn(move || {
                    let _ = done.send(h.request("Use WeatherPlanning tool?"));
                })
            };
            thread::yield_now();
            h.abandon();
            let decision = done_rx.recv_timeout(Duration::from_secs(5)).expect("worker stranded after abandon");
            assert_eq!(decision, Decision::Deny);
            worker.join().unwrap();
        }
    }

    #[test]
    fn worker_hook_returns_tokens() {
        let h = Arc::new(Handoff::new(None));
        let worker = {
            let h = h.clone();
            thread::spawn(move || WorkerHook { handoff: &h }.ask("ok?"))
        };
        wait_until(|| h.is_waiting());
        h.deliver(Decision::Approve);
        assert_eq!(worker.join().unwrap(), "y");
    }
}
