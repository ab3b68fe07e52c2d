//! One-line input overlay for file paths and document URLs.

use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget},
    Frame,
};

use super::input::TextInput;
use super::theme::Palette;

/// Overlay height: border + input + border.
const PROMPT_HEIGHT: u16 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    /// Local file to upload.
    UploadFile,
    /// URL attached to every question.
    DocumentUrl,
    /// URL the backend should fetch and index.
    FetchUrl,
}

impl PromptKind {
    fn title(&self) -> &'static str {
        match self {
            PromptKind::UploadFile => " Upload file (.pdf, .docx, .eml) ",
            PromptKind::DocumentUrl => " Document URL for questions (empty clears) ",
            PromptKind::FetchUrl => " Fetch document from URL ",
        }
    }

    fn placeholder(&self) -> &'static str {
        match self {
            PromptKind::UploadFile => "~/Documents/policy.pdf",
            PromptKind::DocumentUrl | PromptKind::FetchUrl => "https://example.com/report.pdf",
        }
    }
}

#[derive(Debug, Default)]
pub struct PromptState {
    pub kind: Option<PromptKind>,
    pub input: TextInput,
}

impl PromptState {
    pub fn is_open(&self) -> bool {
        self.kind.is_some()
    }

    pub fn open(&mut self, kind: PromptKind, initial: Option<&str>) {
        self.kind = Some(kind);
        self.input = TextInput::with_text(initial.unwrap_or(""));
    }

    pub fn close(&mut self) {
        self.kind = None;
        self.input.clear();
    }

    /// Close and hand back what was typed, trimmed.
    pub fn submit(&mut self) -> Option<(PromptKind, String)> {
        let kind = self.kind.take()?;
        let value = self.input.take().trim().to_string();
        Some((kind, value))
    }
}

/// Expand a leading `~/` to the home directory.
pub fn expand_home(path: &str) -> std::path::PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(dirs) = directories::BaseDirs::new() {
            return dirs.home_dir().join(rest);
        }
    }
    std::path::PathBuf::from(path)
}

/// Draw the prompt just below the header.
pub fn render_prompt_overlay(frame: &mut Frame, state: &PromptState, palette: &Palette) {
    let Some(kind) = state.kind else {
        return;
    };
    let area = frame.area();
    let height = PROMPT_HEIGHT.min(area.height.saturating_sub(1));
    if height == 0 {
        return;
    }
    let overlay_area = Rect::new(area.x, area.y + 1, area.width, height);
    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.accent))
        .style(palette.base())
        .title(Line::from(Span::styled(kind.title(), palette.title())))
        .title_bottom(Line::from(Span::styled(
            " Enter: ok  Esc: cancel ",
            Style::default().fg(palette.muted),
        )));
    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);

    if inner.height == 0 || inner.width == 0 {
        return;
    }

    let display = state
        .input
        .window((inner.width as usize).saturating_sub(2), None);
    let line = if state.input.is_empty() {
        Line::from(Span::styled(
            format!(" {}", kind.placeholder()),
            Style::default().fg(palette.muted),
        ))
    } else {
        Line::from(Span::styled(
            format!(" {}", display.visible),
            Style::default().fg(palette.fg),
        ))
    };
    Paragraph::new(line).render(inner, frame.buffer_mut());
    frame.set_cursor_position((inner.x + 1 + display.cursor_offset as u16, inner.y));
}
