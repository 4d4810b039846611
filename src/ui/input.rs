use ratatui::{
    prelude::*,
    widgets::{Block, BorderType, Borders, Paragraph, Wrap},
};
use unicode_width::UnicodeWidthStr;

use atlas_base::View;

use super::theme;
use crate::app::App;

pub fn render_input(frame: &mut Frame, app: &App, area: Rect) {
    let view = app.session.view();
    let (title, border, placeholder) = match view {
        View::Idle => (" Ask Atlas ", theme::ACCENT, "Where are you travelling?"),
        View::Working => (" Ask Atlas (busy) ", theme::BORDER, "Atlas is working..."),
        View::AwaitingApproval { .. } => (" Decision needed ", theme::WARNING, "Press y to approve or n to deny"),
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(border))
        .style(Style::default().bg(theme::BG_RAISED))
        .title(Span::styled(title, Style::default().fg(border).bold()));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut lines = Vec::new();
    if let Some(notice) = &app.notice {
        lines.push(Line::from(Span::styled(notice.clone(), Style::default().fg(theme::WARNING).italic())));
    }
    if app.input.is_empty() {
        lines.push(Line::from(Span::styled(placeholder, Style::default().fg(theme::TEXT_MUTED).italic())));
    } else {
        lines.push(Line::from(Span::styled(app.input.clone(), Style::default().fg(theme::TEXT))));
    }
    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);

    if view == View::Idle && inner.width > 0 {
        let row = u16::from(app.notice.is_some());
        let col = (app.input.width() as u16).min(inner.width.saturating_sub(1));
        frame.set_cursor_position((inner.x + col, inner.y + row));
    }
}

pub fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let base_style = Style::default().bg(theme::BG_BASE).fg(theme::TEXT_MUTED);
    let (badge, color) = super::sidebar::status_badge(&app.session.view(), app.spinner_frame);

    let spans = vec![
        Span::styled(" ", base_style),
        Span::styled(format!(" {} ", badge), Style::default().fg(theme::BG_BASE).bg(color).bold()),
        Span::styled(" ", base_style),
        Span::styled(" MODEL ", Style::default().fg(theme::BG_BASE).bg(theme::ACCENT_DIM).bold()),
        Span::styled(format!(" {} ", app.model), Style::default().fg(theme::TEXT).bg(theme::BG_RAISED)),
    ];
    frame.render_widget(Paragraph::new(Line::from(spans)).style(base_style), area);
}
