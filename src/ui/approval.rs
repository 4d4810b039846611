use ratatui::{
    prelude::*,
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap},
};

use super::{helpers::wrap_text, theme};

const CARD_WIDTH: u16 = 64;

/// Centered card: the worker's prompt plus the two choices.
pub fn render_approval(frame: &mut Frame, prompt: &str, area: Rect) {
    let width = CARD_WIDTH.min(area.width.saturating_sub(4));
    let inner_width = width.saturating_sub(4) as usize;
    let prompt_lines: Vec<String> = prompt.lines().flat_map(|l| wrap_text(l, inner_width)).collect();
    let height = (prompt_lines.len() as u16 + 5).min(area.height);

    let card = Rect::new(
        area.x + (area.width.saturating_sub(width)) / 2,
        area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height,
    );

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme::WARNING))
        .style(Style::default().bg(theme::BG_RAISED))
        .title(Span::styled(" Permission requested ", Style::default().fg(theme::WARNING).bold()));

    let mut lines: Vec<Line> = prompt_lines
        .into_iter()
        .map(|l| Line::from(Span::styled(format!(" {}", l), Style::default().fg(theme::TEXT))))
        .collect();
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::raw(" "),
        Span::styled(" [y] Approve ", Style::default().fg(theme::BG_BASE).bg(theme::SUCCESS).bold()),
        Span::raw("  "),
        Span::styled(" [n] Deny ", Style::default().fg(theme::BG_BASE).bg(theme::ERROR).bold()),
    ]));

    frame.render_widget(Clear, card);
    frame.render_widget(Paragraph::new(lines).block(block).wrap(Wrap { trim: false }), card);
}
