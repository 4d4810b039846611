//! `atlas ask "<query>"`: one run on the terminal without the TUI. Permission
//! prompts are answered on stdin.
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use atlas_base::{Pipeline, Runner, RunnerOptions, is_affirmative};
use tracing::{info, warn};

/// Drive `runner` until it finishes, answering each permission request with a
/// line read from `input`. End of input denies.
pub fn drive(
    runner: &mut Runner,
    query: &str,
    input: &mut impl BufRead,
    out: &mut impl Write,
    poll: Duration,
) -> io::Result<Result<String, String>> {
    runner.start(query);
    loop {
        if let Some(prompt) = runner.pending_request() {
            write!(out, "\n{}\n[y/n] > ", prompt)?;
            out.flush()?;
            let mut line = String::new();
            let approved = input.read_line(&mut line)? > 0 && is_affirmative(&line);
            info!(approved, "decision from stdin");
            runner.send_approval(approved);
            continue;
        }
        // Read the phase first: the outcome slot is filled before it turns terminal.
        let finished = runner.state().is_terminal();
        if let Some(answer) = runner.try_take_result() {
            return Ok(Ok(answer));
        }
        if let Some(error) = runner.try_take_error() {
            return Ok(Err(error));
        }
        if finished {
            warn!("run finished without an outcome");
            return Ok(Err("the agent stopped without reporting an outcome".to_string()));
        }
        thread::sleep(poll);
    }
}

/// Returns whether the run produced an answer.
pub fn run(pipeline: Arc<dyn Pipeline>, options: RunnerOptions, query: &str, poll: Duration) -> io::Result<bool> {
    let mut runner = Runner::new(pipeline, options);
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    match drive(&mut runner, query, &mut stdin.lock(), &mut stdout, poll)? {
        Ok(answer) => {
            writeln!(stdout, "\n{}", answer)?;
            Ok(true)
        }
        Err(error) => {
            eprintln!("Error: {}", error);
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atlas_base::{DecisionHook, PipelineError};

    fn runner(f: impl Fn(&str, &dyn DecisionHook) -> Result<String, PipelineError> + Send + Sync + 'static) -> Runner {
        Runner::new(Arc::new(f), RunnerOptions::default())
    }

    #[test]
    fn answers_prompts_from_input() {
        let mut r = runner(|q: &str, hook: &dyn DecisionHook| {
            let first = hook.ask("Use Wikipedia tool?");
            let second = hook.ask("Use OpenMeteo tool?");
            Ok(format!("{}: {}{}", q, first, second))
        });
        let mut input = io::Cursor::new(b"yes\nnope\n".to_vec());
        let mut out = Vec::new();

        let outcome = drive(&mut r, "Lima", &mut input, &mut out, Duration::from_millis(2)).unwrap();
        assert_eq!(outcome, Ok("Lima: yn".to_string()));

        let shown = String::from_utf8(out).unwrap();
        assert!(shown.contains("Use Wikipedia tool?\n[y/n] > "));
        assert!(shown.contains("Use OpenMeteo tool?"));
    }

    #[test]
    fn end_of_input_denies() {
        let mut r = runner(|_: &str, hook: &dyn DecisionHook| Ok(hook.ask("Use Wikipedia tool?")));
        let mut input = io::Cursor::new(Vec::new());
        let outcome = drive(&mut r, "q", &mut input, &mut Vec::new(), Duration::from_millis(2)).unwrap();
        assert_eq!(outcome, Ok("n".to_string()));
    }

    #[test]
    fn failure_is_returned() {
        let mut r = runner(|_: &str, _: &dyn DecisionHook| Err(PipelineError::Backend("401".into())));
        let outcome = drive(&mut r, "q", &mut io::Cursor::new(Vec::new()), &mut Vec::new(), Duration::from_millis(2)).unwrap();
        assert_eq!(outcome, Err("backend error: 401".to_string()));
    }
}
