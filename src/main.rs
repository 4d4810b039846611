mod app;
mod headless;
mod infra;
mod ui;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use crossterm::{
    ExecutableCommand,
    event::{DisableBracketedPaste, EnableBracketedPaste},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::prelude::*;
use tracing::{error, info};

use atlas_agents::{AgentOptions, OpenAiCompatClient, Toolbox, TravelPipeline};
use atlas_base::{Pipeline, Session};

use app::App;
use infra::config::{AppConfig, ConfigError, api_key};
use infra::constants::TOOL_TIMEOUT_SECS;

const USAGE: &str = "\
Usage: atlas [--config <file>]               interactive planner
       atlas [--config <file>] ask <query>   one question, approvals on stdin";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Tui,
    Ask(String),
    Help,
}

#[derive(Debug, PartialEq, Eq)]
struct CliArgs {
    config: Option<PathBuf>,
    command: Command,
}

fn parse_args(args: &[String]) -> Result<CliArgs, String> {
    let mut config = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                let path = args.get(i + 1).ok_or("--config needs a file path")?;
                config = Some(PathBuf::from(path));
                i += 2;
            }
            "--help" | "-h" => return Ok(CliArgs { config, command: Command::Help }),
            "ask" => {
                let query = args[i + 1..].join(" ");
                if query.trim().is_empty() {
                    return Err("ask needs a query".to_string());
                }
                return Ok(CliArgs { config, command: Command::Ask(query) });
            }
            other => return Err(format!("Unknown argument: {}", other)),
        }
    }
    Ok(CliArgs { config, command: Command::Tui })
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = match parse_args(&args) {
        Ok(cli) => cli,
        Err(msg) => {
            eprintln!("{}\n\n{}", msg, USAGE);
            return ExitCode::from(2);
        }
    };
    if cli.command == Command::Help {
        println!("{}", USAGE);
        return ExitCode::SUCCESS;
    }

    let _ = dotenvy::dotenv();

    // Startup failures never reach the UI
    let (config, pipeline) = match startup(&cli) {
        Ok(ready) => ready,
        Err(e) => {
            error!(error = %e, "startup failed");
            eprintln!("atlas: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let outcome = match cli.command {
        Command::Ask(query) => headless::run(pipeline, config.runner_options(), &query, config.poll_interval()),
        _ => run_tui(&config, pipeline).map(|()| true),
    };
    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!(error = %e, "terminal error");
            eprintln!("atlas: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn startup(cli: &CliArgs) -> Result<(AppConfig, Arc<dyn Pipeline>), ConfigError> {
    let config = AppConfig::load(cli.config.as_deref())?;
    let log_path = infra::logging::init(&config.log_dir)?;
    info!(log = %log_path.display(), model = %config.llm.model, "atlas starting");

    let pipeline: Arc<dyn Pipeline> = Arc::new(build_pipeline(&config)?);
    Ok((config, pipeline))
}

fn build_pipeline(config: &AppConfig) -> Result<TravelPipeline, ConfigError> {
    let key = api_key(|name| std::env::var(name).ok())?;
    let backend = Arc::new(OpenAiCompatClient::new(config.llm_settings(), key)?);
    let toolbox = Toolbox::with_defaults(TOOL_TIMEOUT_SECS)?;
    let roster = config.roster()?;
    let options = AgentOptions { max_steps: config.agents.max_steps, permission: Arc::new(config.permission_policy()) };
    Ok(TravelPipeline::build(&roster, backend, &toolbox, options)?)
}

fn restore_terminal() {
    let _ = disable_raw_mode();
    let _ = io::stdout().execute(DisableBracketedPaste);
    let _ = io::stdout().execute(LeaveAlternateScreen);
}

fn run_tui(config: &AppConfig, pipeline: Arc<dyn Pipeline>) -> io::Result<()> {
    // A panic in the UI thread must not leave the terminal in raw mode
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        restore_terminal();
        error!(panic = %info, "ui panicked");
        default_hook(info);
    }));

    enable_raw_mode()?;
    io::stdout().execute(EnterAlternateScreen)?;
    io::stdout().execute(EnableBracketedPaste)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;

    let session = Session::new(pipeline, config.runner_options()).with_greeting(&config.ui.greeting);
    let mut app = App::new(session, config.llm_settings().api_model(), config.poll_interval());
    let result = app.run(&mut terminal);

    restore_terminal();
    info!("atlas stopped");
    result
}
