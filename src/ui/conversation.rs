use ratatui::{
    prelude::*,
    widgets::{Block, BorderType, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState},
};

use atlas_base::{Message, Role, View};

use super::{helpers::wrap_text, theme};
use crate::app::App;

/// Prefix width: icon + space + "You  " / "Atlas"
const PREFIX_WIDTH: usize = 8;

fn label(msg: &Message) -> (&'static str, &'static str, Color) {
    match (msg.role, msg.is_error) {
        (Role::User, _) => ("▸", "You", theme::USER),
        (Role::Assistant, true) => ("✗", "Atlas", theme::ERROR),
        (Role::Assistant, false) => ("●", "Atlas", theme::ASSISTANT),
    }
}

/// Transcript pre-wrapped to `width` columns.
pub fn transcript_lines(messages: &[Message], width: usize) -> Vec<Line<'static>> {
    let wrap_width = width.saturating_sub(PREFIX_WIDTH + 1);
    let mut text: Vec<Line<'static>> = Vec::new();

    for msg in messages {
        let (icon, who, color) = label(msg);
        let body_style = if msg.is_error {
            Style::default().fg(theme::ERROR)
        } else if msg.role == Role::User {
            Style::default().fg(theme::TEXT)
        } else {
            Style::default().fg(theme::TEXT)
        };

        let mut first = true;
        for paragraph in msg.content.lines() {
            if paragraph.trim().is_empty() {
                text.push(Line::from(""));
                continue;
            }
            for wrapped in wrap_text(paragraph, wrap_width) {
                let prefix = if first {
                    first = false;
                    vec![
                        Span::styled(format!("{} ", icon), Style::default().fg(color)),
                        Span::styled(format!("{:<6}", who), Style::default().fg(color).bold()),
                    ]
                } else {
                    vec![Span::raw(" ".repeat(PREFIX_WIDTH))]
                };
                let mut spans = prefix;
                spans.push(Span::styled(wrapped, body_style));
                text.push(Line::from(spans));
            }
        }
        text.push(Line::from(vec![Span::styled(
            format!("{}{}", " ".repeat(PREFIX_WIDTH), msg.created_at.format("%H:%M")),
            Style::default().fg(theme::TEXT_MUTED).italic(),
        )]));
        text.push(Line::from(""));
    }
    text
}

/// Paragraph scroll takes a `u16`; very long transcripts pin to the last row it can address.
fn scroll_row(offset: usize) -> u16 {
    u16::try_from(offset).unwrap_or(u16::MAX)
}

pub fn render_conversation(frame: &mut Frame, app: &App, area: Rect) {
    let working = app.session.view() != View::Idle;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme::BORDER))
        .style(Style::default().bg(theme::BG_RAISED))
        .title(Span::styled(
            if working { " Conversation ● " } else { " Conversation " },
            Style::default().fg(theme::ACCENT).bold(),
        ));
    let content_area = block.inner(area);
    frame.render_widget(block, area);

    let messages = app.session.messages();
    if messages.is_empty() {
        let hint = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled(
                "  Ask about a destination to get started",
                Style::default().fg(theme::TEXT_MUTED).italic(),
            )),
        ]);
        frame.render_widget(hint, content_area);
        return;
    }

    let mut lines = transcript_lines(messages, content_area.width.saturating_sub(1) as usize);
    if working {
        lines.push(Line::from(Span::styled(
            format!("{} Atlas is working...", super::helpers::spinner(app.spinner_frame)),
            Style::default().fg(theme::TEXT_MUTED).italic(),
        )));
    }

    let max_offset = lines.len().saturating_sub(content_area.height as usize);
    let offset = max_offset.saturating_sub(app.scroll_back as usize);

    frame.render_widget(Paragraph::new(lines).scroll((scroll_row(offset), 0)), content_area);

    if max_offset > 0 {
        let mut state = ScrollbarState::new(max_offset).position(offset);
        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .begin_symbol(None)
                .end_symbol(None)
                .style(Style::default().fg(theme::BORDER)),
            content_area,
            &mut state,
        );
    }
}
