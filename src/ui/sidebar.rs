use ratatui::{prelude::*, widgets::Paragraph};

use atlas_base::{RunState, View};

use super::{helpers::spinner, theme};
use crate::app::App;

const HELP: &[(&str, &str)] = &[
    ("Enter", "send"),
    ("y / n", "approve / deny"),
    ("PgUp/PgDn", "scroll"),
    ("Ctrl+L", "clear"),
    ("Ctrl+Q", "quit"),
];

/// Badge text and color for the current view.
pub fn status_badge(view: &View, frame: usize) -> (String, Color) {
    match view {
        View::Idle => ("READY".to_string(), theme::TEXT_MUTED),
        View::Working => (format!("{} WORKING", spinner(frame)), theme::SUCCESS),
        View::AwaitingApproval { .. } => ("WAITING FOR YOU".to_string(), theme::WARNING),
    }
}

pub fn render_sidebar(frame: &mut Frame, app: &App, area: Rect) {
    let base_style = Style::default().bg(theme::BG_BASE);
    let muted = Style::default().fg(theme::TEXT_MUTED);
    let view = app.session.view();
    let (badge, badge_color) = status_badge(&view, app.spinner_frame);

    let mut lines = vec![
        Line::from(vec![Span::styled("  ", base_style), Span::styled("ATLAS", Style::default().fg(theme::ACCENT).bold())]),
        Line::from(""),
        Line::from(vec![
            Span::styled("  ", base_style),
            Span::styled(format!(" {} ", badge), Style::default().fg(theme::BG_BASE).bg(badge_color).bold()),
        ]),
        Line::from(""),
    ];

    let run = match app.session.runner().state() {
        RunState::Idle => "no query yet",
        RunState::Running => "running",
        RunState::AwaitingInput => "awaiting input",
        RunState::Completed => "completed",
        RunState::Failed => "failed",
    };
    lines.push(Line::from(vec![Span::styled("  Last run  ", muted), Span::styled(run, Style::default().fg(theme::TEXT))]));
    lines.push(Line::from(vec![
        Span::styled("  Messages  ", muted),
        Span::styled(app.session.messages().len().to_string(), Style::default().fg(theme::TEXT)),
    ]));
    lines.push(Line::from(""));

    for (key, what) in HELP {
        lines.push(Line::from(vec![
            Span::styled(format!("  {:<10}", key), Style::default().fg(theme::ACCENT_DIM)),
            Span::styled(*what, muted),
        ]));
    }

    frame.render_widget(Paragraph::new(lines).style(base_style), area);
}
