use std::io;
use std::time::{Duration, Instant};

use crossterm::event;
use ratatui::prelude::*;
use tracing::info;

use atlas_base::{Session, Tick, View};

use crate::app::actions::ActionResult;
use crate::app::events::handle_event;
use crate::infra::constants::{IDLE_POLL_MS, RENDER_THROTTLE_MS};
use crate::ui;

pub struct App {
    pub session: Session,
    pub input: String,
    /// Lines scrolled up from the bottom of the transcript
    pub scroll_back: u16,
    pub spinner_frame: usize,
    /// Model name shown in the status bar
    pub model: String,
    /// One-line hint shown above the input (e.g. "still working")
    pub notice: Option<String>,
    pub dirty: bool,
    poll_interval: Duration,
    last_render: Instant,
    last_spin: Instant,
    last_view: View,
}

impl App {
    pub fn new(session: Session, model: &str, poll_interval: Duration) -> Self {
        let now = Instant::now();
        Self {
            session,
            input: String::new(),
            scroll_back: 0,
            spinner_frame: 0,
            model: model.to_string(),
            notice: None,
            dirty: true,
            poll_interval,
            last_render: now,
            last_spin: now,
            last_view: View::Idle,
        }
    }

    pub fn run(&mut self, terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> io::Result<()> {
        terminal.draw(|frame| ui::render(frame, self))?;
        self.dirty = false;

        loop {
            // === INPUT FIRST ===
            if event::poll(Duration::ZERO)? {
                let evt = event::read()?;
                let action = handle_event(&evt, &self.session.view());
                if let ActionResult::Quit = self.apply_action(action) {
                    info!("quit requested");
                    break;
                }
                // Re-tick straight away so a decision or submit shows at once
                self.tick();
                if self.dirty {
                    self.draw(terminal)?;
                }
            }

            // === BACKGROUND ===
            let tick = self.tick();

            if self.dirty && self.last_render.elapsed() >= Duration::from_millis(RENDER_THROTTLE_MS) {
                self.draw(terminal)?;
            }

            let wait = match tick {
                Tick::Working => self.poll_interval.min(Duration::from_millis(IDLE_POLL_MS)),
                Tick::Answered | Tick::Failed => Duration::ZERO,
                Tick::AwaitingApproval | Tick::Idle => Duration::from_millis(IDLE_POLL_MS),
            };
            let _ = event::poll(wait)?;
        }
        Ok(())
    }

    /// One session tick plus the bookkeeping the renderer needs.
    pub fn tick(&mut self) -> Tick {
        let tick = self.session.tick();
        if tick.changed() {
            self.scroll_back = 0;
            self.dirty = true;
        }

        let view = self.session.view();
        if view != self.last_view {
            self.last_view = view;
            self.dirty = true;
        }

        if tick == Tick::Working && self.last_spin.elapsed() >= self.poll_interval {
            self.spinner_frame = self.spinner_frame.wrapping_add(1);
            self.last_spin = Instant::now();
            self.dirty = true;
        }
        tick
    }

    fn draw(&mut self, terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> io::Result<()> {
        terminal.draw(|frame| ui::render(frame, self))?;
        self.dirty = false;
        self.last_render = Instant::now();
        Ok(())
    }
}
