use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use atlas_base::{
    DecisionHook, EMPTY_RESPONSE_NOTICE, Pipeline, PipelineError, Role, RunState, Runner, RunnerOptions, Session,
    Tick, View,
};

fn wait_until(what: &str, mut cond: impl FnMut() -> bool) {
    let start = Instant::now();
    while !cond() {
        assert!(start.elapsed() < Duration::from_secs(5), "timed out waiting for: {}", what);
        thread::sleep(Duration::from_millis(2));
    }
}

/// Answers immediately without asking anything.
struct Plain(&'static str);

impl Pipeline for Plain {
    fn run(&self, query: &str, _hook: &dyn DecisionHook) -> Result<String, PipelineError> {
        Ok(format!("{}: {}", self.0, query))
    }
}

/// Asks each prompt in turn and records the tokens it gets back.
struct Asking {
    prompts: Vec<&'static str>,
    answers: Arc<Mutex<Vec<String>>>,
}

impl Pipeline for Asking {
    fn run(&self, _query: &str, hook: &dyn DecisionHook) -> Result<String, PipelineError> {
        for p in &self.prompts {
            let token = hook.ask(p);
            self.answers.lock().unwrap().push(token);
        }
        Ok("itinerary ready".to_string())
    }
}

struct Failing;

impl Pipeline for Failing {
    fn run(&self, _query: &str, _hook: &dyn DecisionHook) -> Result<String, PipelineError> {
        Err(PipelineError::Backend("rate limited".to_string()))
    }
}

struct Panicking;

impl Pipeline for Panicking {
    fn run(&self, _query: &str, _hook: &dyn DecisionHook) -> Result<String, PipelineError> {
        panic!("tool exploded");
    }
}

/// Counts runs and blocks until released, so tests can poke a running worker.
struct Gated {
    runs: Arc<AtomicUsize>,
    release: Arc<Mutex<bool>>,
}

impl Pipeline for Gated {
    fn run(&self, _query: &str, _hook: &dyn DecisionHook) -> Result<String, PipelineError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        while !*self.release.lock().unwrap() {
            thread::sleep(Duration::from_millis(2));
        }
        Ok("done".to_string())
    }
}

fn runner(p: impl Pipeline + 'static) -> Runner {
    Runner::new(Arc::new(p), RunnerOptions::default())
}

#[test]
fn plan_without_decisions_yields_one_answer() {
    let mut session = Session::new(Arc::new(Plain("plan")), RunnerOptions::default());
    assert!(session.submit("Plan 3 days in Lisbon"));

    wait_until("run to finish", || !session.runner().is_running());
    assert_eq!(session.tick(), Tick::Answered);
    assert_eq!(session.tick(), Tick::Idle);

    let msgs = session.messages();
    assert_eq!(msgs.len(), 2);
    assert_eq!(msgs[0].role, Role::User);
    assert_eq!(msgs[1].role, Role::Assistant);
    assert_eq!(msgs[1].content, "plan: Plan 3 days in Lisbon");
}

#[test]
fn approval_unblocks_worker() {
    let answers = Arc::new(Mutex::new(Vec::new()));
    let mut r = runner(Asking { prompts: vec!["Use Wikipedia tool?"], answers: answers.clone() });
    r.start("Plan a trip to Hanoi");

    wait_until("approval request", || r.waiting_for_input());
    assert_eq!(r.state(), RunState::AwaitingInput);
    assert_eq!(r.pending_request().as_deref(), Some("Use Wikipedia tool?"));
    assert!(r.is_running());

    r.send_approval(true);
    assert!(!r.waiting_for_input());
    assert!(r.pending_request().is_none());

    wait_until("completion", || r.state() == RunState::Completed);
    assert_eq!(r.try_take_result().as_deref(), Some("itinerary ready"));
    assert!(r.try_take_result().is_none());
    assert_eq!(*answers.lock().unwrap(), vec!["y".to_string()]);
}

#[test]
fn failure_lands_in_transcript_once() {
    let mut session = Session::new(Arc::new(Failing), RunnerOptions::default());
    session.submit("Weather in Oslo?");

    wait_until("failure", || !session.runner().is_running());
    assert_eq!(session.runner().state(), RunState::Failed);
    assert_eq!(session.tick(), Tick::Failed);
    assert_eq!(session.tick(), Tick::Idle);

    let errors: Vec<_> = session.messages().iter().filter(|m| m.is_error).collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].content, "Error: backend error: rate limited");
}

#[test]
fn panic_is_contained_at_thread_boundary() {
    let mut r = runner(Panicking);
    r.start("anything");
    wait_until("failure", || r.state() == RunState::Failed);
    let err = r.try_take_error().expect("error slot filled");
    assert!(err.contains("tool exploded"), "got {}", err);
    wait_until("thread exit", || r.worker_exited());
}

#[test]
fn approval_without_run_is_noop() {
    let r = runner(Plain("x"));
    r.send_approval(true);
    r.send_approval(false);
    assert_eq!(r.state(), RunState::Idle);
    assert!(!r.waiting_for_input());
}

#[test]
fn approval_while_running_but_not_waiting_is_dropped() {
    let answers = Arc::new(Mutex::new(Vec::new()));
    let release = Arc::new(Mutex::new(false));
    let runs = Arc::new(AtomicUsize::new(0));

    // A stray approval must not be queued for a later request.
    let mut gated = runner(Gated { runs: runs.clone(), release: release.clone() });
    gated.start("q");
    wait_until("gated run", || runs.load(Ordering::SeqCst) == 1);
    gated.send_approval(true);
    assert!(!gated.waiting_for_input());
    *release.lock().unwrap() = true;
    wait_until("gated completion", || gated.state() == RunState::Completed);

    let mut r = runner(Asking { prompts: vec!["first?"], answers: answers.clone() });
    r.send_approval(true);
    r.start("q");
    wait_until("request", || r.waiting_for_input());
    r.send_approval(false);
    wait_until("completion", || r.state() == RunState::Completed);
    assert_eq!(*answers.lock().unwrap(), vec!["n".to_string()]);
}

#[test]
fn double_start_keeps_single_run() {
    let runs = Arc::new(AtomicUsize::new(0));
    let release = Arc::new(Mutex::new(false));
    let mut r = runner(Gated { runs: runs.clone(), release: release.clone() });

    r.start("first");
    r.start("second");
    wait_until("run begins", || runs.load(Ordering::SeqCst) >= 1);
    r.start("third");
    *release.lock().unwrap() = true;

    wait_until("completion", || r.state() == RunState::Completed);
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(r.try_take_result().as_deref(), Some("done"));

    // Terminal runners are not restartable.
    r.start("again");
    assert_eq!(r.state(), RunState::Completed);
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

#[test]
fn decisions_match_requests_in_order() {
    let prompts = vec!["p1", "p2", "p3", "p4", "p5", "p6"];
    let answers = Arc::new(Mutex::new(Vec::new()));
    let mut r = runner(Asking { prompts: prompts.clone(), answers: answers.clone() });
    r.start("q");

    let mut expected = Vec::new();
    for (i, p) in prompts.iter().enumerate() {
        wait_until("next request", || r.pending_request().as_deref() == Some(*p));
        let approve = i % 2 == 0;
        r.send_approval(approve);
        assert_ne!(r.pending_request().as_deref(), Some(*p), "request cleared once answered");
        expected.push(if approve { "y" } else { "n" }.to_string());
    }

    wait_until("completion", || r.state() == RunState::Completed);
    assert_eq!(*answers.lock().unwrap(), expected);
}

#[test]
fn session_view_tracks_runner() {
    let answers = Arc::new(Mutex::new(Vec::new()));
    let mut session =
        Session::new(Arc::new(Asking { prompts: vec!["Allow OpenMeteo?"], answers }), RunnerOptions::default())
            .with_greeting("Hello! Where would you like to go?");
    assert_eq!(session.view(), View::Idle);
    assert_eq!(session.messages().len(), 1);

    assert!(!session.submit("   "));
    assert!(session.submit("Kyoto in April"));
    assert!(!session.submit("another one"), "input refused while running");

    wait_until("approval", || session.tick() == Tick::AwaitingApproval);
    assert_eq!(session.view(), View::AwaitingApproval { prompt: "Allow OpenMeteo?".to_string() });

    session.approve(true);
    wait_until("answer", || session.tick() == Tick::Answered);
    assert_eq!(session.view(), View::Idle);
    assert_eq!(session.messages().last().map(|m| m.content.as_str()), Some("itinerary ready"));
}

#[test]
fn session_replaces_finished_runner() {
    let mut session = Session::new(Arc::new(Plain("a")), RunnerOptions::default());
    session.submit("one");
    wait_until("first run", || !session.runner().is_running());
    // Result not yet drained: the next submit must not lose it.
    assert!(session.submit("two"));
    wait_until("second run", || !session.runner().is_running());
    while session.tick().changed() {}

    let contents: Vec<&str> = session.messages().iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["one", "a: one", "two", "a: two"]);
}

#[test]
fn clear_resets_transcript_and_releases_worker() {
    let answers = Arc::new(Mutex::new(Vec::new()));
    let mut session = Session::new(
        Arc::new(Asking { prompts: vec!["Use Wikipedia tool?"], answers: answers.clone() }),
        RunnerOptions::default(),
    );
    session.submit("Lisbon");
    wait_until("approval", || session.runner().waiting_for_input());

    session.clear();
    assert!(session.messages().is_empty());
    assert_eq!(session.runner().state(), RunState::Idle);

    // The abandoned worker was released with a denial.
    wait_until("abandoned worker answered", || !answers.lock().unwrap().is_empty());
    assert_eq!(*answers.lock().unwrap(), vec!["n".to_string()]);
}

#[test]
fn approval_timeout_denies() {
    let answers = Arc::new(Mutex::new(Vec::new()));
    let mut r = Runner::new(
        Arc::new(Asking { prompts: vec!["Use Wikipedia tool?"], answers: answers.clone() }),
        RunnerOptions { approval_timeout: Some(Duration::from_millis(30)) },
    );
    r.start("q");
    wait_until("completion", || r.state() == RunState::Completed);
    assert_eq!(*answers.lock().unwrap(), vec!["n".to_string()]);
}

#[test]
fn empty_answer_is_replaced() {
    struct Blank;
    impl Pipeline for Blank {
        fn run(&self, _q: &str, _h: &dyn DecisionHook) -> Result<String, PipelineError> {
            Ok("   ".to_string())
        }
    }
    let mut r = runner(Blank);
    r.start("q");
    wait_until("completion", || r.state() == RunState::Completed);
    assert_eq!(r.try_take_result().as_deref(), Some(EMPTY_RESPONSE_NOTICE));
}
