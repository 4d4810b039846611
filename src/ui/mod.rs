mod approval;
mod conversation;
mod helpers;
mod input;
mod sidebar;
mod theme;

use ratatui::{prelude::*, widgets::Block};

use atlas_base::View;

use crate::app::App;
use crate::infra::constants::SIDEBAR_WIDTH;

pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();
    frame.render_widget(Block::default().style(Style::default().bg(theme::BG_BASE)), area);

    // Main layout: body + status bar
    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(area);

    let body_layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(1)])
        .split(main_layout[0]);

    sidebar::render_sidebar(frame, app, body_layout[0]);
    render_main_content(frame, app, body_layout[1]);
    input::render_status_bar(frame, app, main_layout[1]);

    if let View::AwaitingApproval { prompt } = app.session.view() {
        approval::render_approval(frame, &prompt, body_layout[1]);
    }
}

fn render_main_content(frame: &mut Frame, app: &App, area: Rect) {
    let input_height = if app.notice.is_some() { 4 } else { 3 };
    let content_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(input_height)])
        .split(area);

    conversation::render_conversation(frame, app, content_layout[0]);
    input::render_input(frame, app, content_layout[1]);
}
