use atlas_base::View;
use tracing::debug;

use crate::app::App;

/// Everything a key press can ask the app to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    None,
    Quit,
    InsertChar(char),
    Backspace,
    PasteText(String),
    InputSubmit,
    Approve,
    Deny,
    ClearConversation,
    ScrollUp(u16),
    ScrollDown(u16),
    ScrollToBottom,
}

pub enum ActionResult {
    Continue,
    Quit,
}

impl App {
    pub fn apply_action(&mut self, action: Action) -> ActionResult {
        match action {
            Action::None => return ActionResult::Continue,
            Action::Quit => return ActionResult::Quit,
            Action::InsertChar(c) => self.input.push(c),
            Action::Backspace => {
                self.input.pop();
            }
            Action::PasteText(text) => self.input.push_str(&text.replace('\n', " ")),
            Action::InputSubmit => self.submit_input(),
            Action::Approve => self.decide(true),
            Action::Deny => self.decide(false),
            Action::ClearConversation => {
                self.session.clear();
                self.scroll_back = 0;
                self.notice = None;
            }
            Action::ScrollUp(n) => self.scroll_back = self.scroll_back.saturating_add(n),
            Action::ScrollDown(n) => self.scroll_back = self.scroll_back.saturating_sub(n),
            Action::ScrollToBottom => self.scroll_back = 0,
        }
        self.dirty = true;
        ActionResult::Continue
    }

    fn decide(&mut self, approved: bool) {
        debug!(approved, "decision from keyboard");
        self.session.approve(approved);
        self.notice = None;
    }

    fn submit_input(&mut self) {
        if self.input.trim().is_empty() {
            return;
        }
        if self.session.view() != View::Idle {
            self.notice = Some("Atlas is still working on the previous request.".to_string());
            return;
        }
        if self.session.submit(&self.input) {
            self.input.clear();
            self.scroll_back = 0;
            self.notice = None;
        }
    }
}
