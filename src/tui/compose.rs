//! Compose box: question input with the attached-document line.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Widget},
    Frame,
};

use super::input::TextInput;
use super::theme::Palette;

/// 1 border + 1 document line + 1 input + 1 border.
pub const COMPOSE_HEIGHT: u16 = 4;

pub fn render(
    area: Rect,
    frame: &mut Frame,
    input: &TextInput,
    document_url: Option<&str>,
    pending: bool,
    focused: bool,
    palette: &Palette,
) {
    let border_type = if focused {
        BorderType::Double
    } else {
        BorderType::Plain
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(border_type)
        .border_style(palette.border(focused))
        .title(Span::styled(" Ask a question ", palette.title()));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.height == 0 || inner.width == 0 {
        return;
    }

    let doc_area = Rect::new(inner.x, inner.y, inner.width, 1);
    render_document_line(doc_area, frame.buffer_mut(), document_url, palette);

    if inner.height < 2 {
        return;
    }
    let input_area = Rect::new(inner.x, inner.y + 1, inner.width, 1);
    // One leading margin column.
    let display = input.window((input_area.width as usize).saturating_sub(1), None);

    let line = if pending {
        Line::from(Span::styled(" Waiting for the answer...", Style::default().fg(palette.muted)))
    } else if input.is_empty() {
        Line::from(Span::styled(
            " Ask about your documents (Enter to send, Alt+Enter for a new line)",
            Style::default().fg(palette.muted),
        ))
    } else {
        Line::from(Span::styled(
            format!(" {}", display.visible),
            Style::default().fg(palette.fg),
        ))
    };
    Paragraph::new(line).render(input_area, frame.buffer_mut());

    if focused && !pending {
        frame.set_cursor_position((
            input_area.x + 1 + display.cursor_offset as u16,
            input_area.y,
        ));
    }
}

fn render_document_line(area: Rect, buf: &mut Buffer, document_url: Option<&str>, palette: &Palette) {
    let (text, style) = match document_url {
        Some(url) => (url.to_string(), Style::default().fg(palette.accent)),
        None => (
            "(none, C-l to set)".to_string(),
            Style::default().fg(palette.muted),
        ),
    };
    let line = Line::from(vec![
        Span::styled(" Document: ", Style::default().fg(palette.muted)),
        Span::styled(text, style),
    ]);
    Paragraph::new(line).render(area, buf);
}
