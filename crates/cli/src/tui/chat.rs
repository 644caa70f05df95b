//! Message feed widget.
//!
//! Messages are pre-wrapped into terminal rows so the row count handed to the
//! feed follower is exactly what the `Paragraph` draws.

use super::theme::THEME;
use proto::{Message, Role};
use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const USER_LABEL: &str = "You: ";
const ASSISTANT_LABEL: &str = "AI:  ";
const INDENT: &str = "     ";
const EMPTY_HINT: &str = "Ask anything. Nothing you type here is saved.";
const AFFORDANCE: &str = " ↓ New messages (End) ";

/// Rendered feed plus the offset and affordance state for this frame.
pub struct FeedView {
    pub rows: Vec<Line<'static>>,
    pub offset: u16,
    pub show_affordance: bool,
}

/// Area inside the feed border.
pub fn inner(area: Rect) -> Rect {
    Block::default().borders(Borders::ALL).inner(area)
}

/// Word-wraps `text` into rows at most `width` cells wide.
///
/// Words wider than a row are split by character. Explicit newlines always
/// start a new row, and an empty line yields one empty row.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut rows = Vec::new();

    for line in text.split('\n') {
        let mut row = String::new();
        let mut row_width = 0usize;

        for word in line.split_inclusive(' ') {
            let word_width = UnicodeWidthStr::width(word);
            let fit_width = UnicodeWidthStr::width(word.trim_end());
            if row_width > 0 && row_width + fit_width > width {
                rows.push(std::mem::take(&mut row).trim_end().to_string());
                row_width = 0;
            }
            if fit_width > width {
                for ch in word.chars() {
                    let ch_width = ch.width().unwrap_or(0);
                    if row_width > 0 && row_width + ch_width > width {
                        rows.push(std::mem::take(&mut row).trim_end().to_string());
                        row_width = 0;
                    }
                    row.push(ch);
                    row_width += ch_width;
                }
            } else {
                row.push_str(word);
                row_width += word_width;
            }
        }

        rows.push(row.trim_end().to_string());
    }

    rows
}

/// Lays the timeline out into rows for an inner width of `width` cells.
pub fn build_rows(messages: &[Message], width: u16) -> Vec<Line<'static>> {
    let text_width = (width as usize).saturating_sub(INDENT.len()).max(1);
    let mut rows = Vec::new();

    for message in messages {
        let (label, color) = match message.role {
            Role::User => (USER_LABEL, THEME.you_label),
            Role::Assistant | Role::System => (ASSISTANT_LABEL, THEME.ai_label),
        };
        let label = Span::styled(label, Style::default().fg(color).add_modifier(Modifier::BOLD));

        rows.push(Line::from(""));
        if message.content.is_empty() {
            rows.push(Line::from(vec![
                label,
                Span::styled("…", Style::default().fg(THEME.text_dim)),
            ]));
            continue;
        }

        for (i, row) in wrap_text(&message.content, text_width).into_iter().enumerate() {
            if i == 0 {
                rows.push(Line::from(vec![label.clone(), Span::raw(row)]));
            } else {
                rows.push(Line::from(Span::raw(format!("{INDENT}{row}"))));
            }
        }
    }

    rows
}

/// Renders the feed and, when the reader is away from the bottom, the
/// "new messages" marker on its last inner row.
pub fn render(frame: &mut Frame<'_>, area: Rect, view: &FeedView) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(THEME.frame));

    let feed = if view.rows.is_empty() {
        Paragraph::new(Line::from(Span::styled(
            EMPTY_HINT,
            Style::default().fg(THEME.text_dim),
        )))
        .block(block)
        .centered()
    } else {
        Paragraph::new(Text::from(view.rows.clone()))
            .block(block)
            .scroll((view.offset, 0))
    };
    frame.render_widget(feed, area);

    let inner = inner(area);
    if view.show_affordance && inner.height > 0 {
        let marker = Rect {
            x: inner.x,
            y: inner.y + inner.height - 1,
            width: inner.width,
            height: 1,
        };
        let line = Line::from(Span::styled(
            AFFORDANCE,
            Style::default()
                .fg(THEME.new_below)
                .add_modifier(Modifier::BOLD | Modifier::REVERSED),
        ));
        frame.render_widget(Paragraph::new(line).right_aligned(), marker);
    }
}
