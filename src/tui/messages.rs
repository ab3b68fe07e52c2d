//! Messages pane: the conversation as cards, newest at the bottom.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Widget},
};

use std::cell::Cell;

use super::theme::Palette;
use crate::chat::ChatView;
use crate::models::{ChatMessage, Sender};

/// Selection and scroll position over `ChatView::messages`.
#[derive(Debug, Default)]
pub struct MessagesState {
    pub selected: usize,
    /// Last rendered scroll position, kept so the view only moves when the
    /// selection leaves it.
    scroll_offset: Cell<usize>,
}

impl MessagesState {
    pub fn select_previous(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn select_next(&mut self, count: usize) {
        if self.selected + 1 < count {
            self.selected += 1;
        }
    }

    /// Jump to the newest message.
    pub fn follow(&mut self, count: usize) {
        self.selected = count.saturating_sub(1);
    }

    pub fn selected_message<'a>(&self, chat: &'a ChatView) -> Option<&'a ChatMessage> {
        chat.messages.get(self.selected)
    }
}

pub fn render(
    area: Rect,
    buf: &mut Buffer,
    state: &MessagesState,
    chat: &ChatView,
    focused: bool,
    palette: &Palette,
) {
    let border_type = if focused {
        BorderType::Double
    } else {
        BorderType::Plain
    };
    let title = match &chat.current_session {
        Some(id) => format!(" Chat {} ", id),
        None => " New chat ".to_string(),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(border_type)
        .border_style(palette.border(focused))
        .title(Span::styled(title, palette.title()));

    let inner = block.inner(area);
    block.render(area, buf);

    if inner.height == 0 || inner.width == 0 {
        return;
    }

    if chat.messages.is_empty() && !chat.pending {
        let line = Line::from(Span::styled(
            " Upload a document (C-o) or ask a question to get started.",
            Style::default().fg(palette.muted),
        ));
        Paragraph::new(line).render(Rect::new(inner.x, inner.y, inner.width, 1), buf);
        return;
    }

    let (mut all_lines, ranges) =
        build_message_lines(&chat.messages, state.selected, focused, inner.width as usize, palette);
    if chat.pending {
        all_lines.push(Line::from(Span::styled(
            " AI is thinking...",
            Style::default()
                .fg(palette.bot)
                .add_modifier(Modifier::ITALIC),
        )));
    }

    let total_lines = all_lines.len();
    let visible_height = inner.height as usize;
    let mut scroll = compute_auto_scroll(
        state.scroll_offset.get(),
        state.selected,
        &ranges,
        visible_height,
        total_lines,
    );
    // Keep the thinking line in view while the newest message is selected.
    if chat.pending && state.selected + 1 >= chat.messages.len() {
        scroll = total_lines.saturating_sub(visible_height);
    }
    state.scroll_offset.set(scroll);

    for (row, line) in all_lines.into_iter().skip(scroll).take(visible_height).enumerate() {
        let line_area = Rect::new(inner.x, inner.y + row as u16, inner.width, 1);
        Paragraph::new(line).render(line_area, buf);
    }

    if total_lines > visible_height {
        let x = inner.x + inner.width.saturating_sub(1);
        let style = Style::default().fg(palette.muted);
        if scroll > 0 {
            let cell = &mut buf[(x, inner.y)];
            cell.set_char('^');
            cell.set_style(style);
        }
        if scroll + visible_height < total_lines {
            let cell = &mut buf[(x, inner.y + inner.height.saturating_sub(1))];
            cell.set_char('v');
            cell.set_style(style);
        }
    }
}

/// Flat line buffer plus each message's `[start, end)` line range.
fn build_message_lines(
    messages: &[ChatMessage],
    selected: usize,
    focused: bool,
    width: usize,
    palette: &Palette,
) -> (Vec<Line<'static>>, Vec<(usize, usize)>) {
    let mut lines = Vec::new();
    let mut ranges = Vec::with_capacity(messages.len());

    for (idx, msg) in messages.iter().enumerate() {
        let start = lines.len();
        let is_selected = focused && idx == selected;
        if msg.sender == Sender::Status {
            render_status_line(&mut lines, msg, width, is_selected, palette);
        } else {
            render_message_card(&mut lines, msg, width, is_selected, palette);
        }
        ranges.push((start, lines.len()));
    }

    (lines, ranges)
}

fn render_status_line(
    lines: &mut Vec<Line<'static>>,
    msg: &ChatMessage,
    width: usize,
    is_selected: bool,
    palette: &Palette,
) {
    let text = msg.content.display_text();
    let color = if text.starts_with("[error]") || text.starts_with("Session expired") {
        palette.error
    } else if text.starts_with("[ok]") {
        palette.ok
    } else {
        palette.muted
    };
    let mut style = Style::default().fg(color);
    if is_selected {
        style = style.add_modifier(Modifier::REVERSED);
    }
    for chunk in wrap_text(&text, width.saturating_sub(2)) {
        lines.push(Line::from(Span::styled(format!(" {}", chunk), style)));
    }
}

fn render_message_card(
    lines: &mut Vec<Line<'static>>,
    msg: &ChatMessage,
    width: usize,
    is_selected: bool,
    palette: &Palette,
) {
    // Answers hug the left edge, questions are indented.
    let indent = if msg.sender == Sender::User { 4 } else { 0 };
    let card_inner_width = width.saturating_sub(indent).saturating_sub(2);
    if card_inner_width < 10 {
        return;
    }

    let border_style = if is_selected {
        Style::default().fg(palette.focus)
    } else {
        Style::default().fg(palette.muted)
    };
    let (who, who_color) = match msg.sender {
        Sender::User => ("You", palette.user),
        _ => ("CogniDoc AI", palette.bot),
    };
    let timestamp = msg
        .created_at
        .with_timezone(&chrono::Local)
        .format("%H:%M")
        .to_string();
    let indent_str = " ".repeat(indent);
    let content_width = card_inner_width.saturating_sub(2);

    lines.push(Line::from(Span::styled(
        format!("{}+-{}-+", indent_str, "-".repeat(content_width)),
        border_style,
    )));

    let pad = content_width
        .saturating_sub(who.len())
        .saturating_sub(timestamp.len());
    lines.push(Line::from(vec![
        Span::raw(indent_str.clone()),
        Span::styled("| ", border_style),
        Span::styled(
            who.to_string(),
            Style::default().fg(who_color).add_modifier(Modifier::BOLD),
        ),
        Span::raw(" ".repeat(pad)),
        Span::styled(timestamp, Style::default().fg(palette.muted)),
        Span::styled(" |", border_style),
    ]));

    for chunk in wrap_text(&msg.content.display_text(), content_width) {
        let pad = content_width.saturating_sub(unicode_width::UnicodeWidthStr::width(chunk.as_str()));
        lines.push(Line::from(vec![
            Span::raw(indent_str.clone()),
            Span::styled("| ", border_style),
            Span::styled(format!("{}{}", chunk, " ".repeat(pad)), Style::default().fg(palette.fg)),
            Span::styled(" |", border_style),
        ]));
    }

    if msg.is_exportable() && is_selected {
        let hint = "[s] save as JSON";
        let pad = content_width.saturating_sub(hint.len());
        lines.push(Line::from(vec![
            Span::raw(indent_str.clone()),
            Span::styled("| ", border_style),
            Span::raw(" ".repeat(pad)),
            Span::styled(hint, Style::default().fg(palette.accent)),
            Span::styled(" |", border_style),
        ]));
    }

    lines.push(Line::from(Span::styled(
        format!("{}+-{}-+", indent_str, "-".repeat(content_width)),
        border_style,
    )));
    lines.push(Line::from(""));
}

/// Split on newlines, then word-wrap each line to `max_width` columns.
/// Words longer than a line are hard-split.
fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    use unicode_width::UnicodeWidthChar;

    if max_width == 0 {
        return vec![];
    }
    let mut result = Vec::new();
    for line in text.lines() {
        let indent = line.len() - line.trim_start_matches(' ').len();
        let mut current = " ".repeat(indent);
        let mut width = indent;
        let mut has_word = false;
        for word in line.split_whitespace() {
            let word_width = unicode_width::UnicodeWidthStr::width(word);
            if has_word && width + 1 + word_width > max_width {
                result.push(std::mem::take(&mut current));
                width = 0;
            } else if has_word {
                current.push(' ');
                width += 1;
            }
            for ch in word.chars() {
                let w = ch.width().unwrap_or(0);
                if width + w > max_width && width > 0 {
                    result.push(std::mem::take(&mut current));
                    width = 0;
                }
                current.push(ch);
                width += w;
            }
            has_word = true;
        }
        result.push(current);
    }
    result
}

/// Scroll offset that keeps the selected message visible.
fn compute_auto_scroll(
    current_scroll: usize,
    selected: usize,
    ranges: &[(usize, usize)],
    visible_height: usize,
    total_lines: usize,
) -> usize {
    if ranges.is_empty() || total_lines <= visible_height {
        return 0;
    }
    let Some(&(sel_start, sel_end)) = ranges.get(selected) else {
        return current_scroll;
    };

    let mut scroll = current_scroll;
    if sel_end - sel_start >= visible_height {
        scroll = sel_start;
    } else {
        if sel_start < scroll {
            scroll = sel_start;
        }
        if sel_end > scroll + visible_height {
            scroll = sel_end - visible_height;
        }
    }
    scroll.min(total_lines - visible_height)
}
