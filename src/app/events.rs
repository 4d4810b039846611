use crossterm::event::{Event, KeyCode, KeyEventKind, KeyModifiers};

use atlas_base::View;

use crate::app::actions::Action;
use crate::infra::constants::SCROLL_PAGE_AMOUNT;

/// Map a terminal event to an action for the current view.
pub fn handle_event(event: &Event, view: &View) -> Action {
    match event {
        Event::Key(key) => {
            if key.kind == KeyEventKind::Release {
                return Action::None;
            }
            let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

            // Global Ctrl shortcuts
            if ctrl {
                return match key.code {
                    KeyCode::Char('q') => Action::Quit,
                    KeyCode::Char('l') => Action::ClearConversation,
                    _ => Action::None,
                };
            }

            match key.code {
                KeyCode::PageUp => return Action::ScrollUp(SCROLL_PAGE_AMOUNT),
                KeyCode::PageDown => return Action::ScrollDown(SCROLL_PAGE_AMOUNT),
                KeyCode::End => return Action::ScrollToBottom,
                _ => {}
            }

            match view {
                // Input is locked to the decision while the worker waits
                View::AwaitingApproval { .. } => match key.code {
                    KeyCode::Char('y' | 'Y') => Action::Approve,
                    KeyCode::Char('n' | 'N') => Action::Deny,
                    _ => Action::None,
                },
                View::Working | View::Idle => match key.code {
                    KeyCode::Esc if *view == View::Idle => Action::Quit,
                    KeyCode::Enter => Action::InputSubmit,
                    KeyCode::Backspace => Action::Backspace,
                    KeyCode::Char(c) => Action::InsertChar(c),
                    _ => Action::None,
                },
            }
        }
        // Bracketed paste: normalize line endings
        Event::Paste(text) => {
            if matches!(view, View::AwaitingApproval { .. }) {
                return Action::None;
            }
            Action::PasteText(text.replace("\r\n", "\n").replace('\r', "\n"))
        }
        _ => Action::None,
    }
}
