//! Debug log pane: captured tracing output, newest at the bottom.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};

use super::log_capture::LogBuffer;
use super::theme::Palette;

/// Scrollback kept for display, independent of the capture buffer size.
const MAX_LINES: usize = 1000;

/// Height of the pane when visible.
pub const DEBUG_LOG_HEIGHT: u16 = 10;

pub struct DebugLogState {
    source: LogBuffer,
    lines: Vec<String>,
    pub visible: bool,
    /// Lines scrolled back from the bottom; 0 follows the tail.
    scroll_back: usize,
}

impl DebugLogState {
    pub fn new(source: LogBuffer) -> Self {
        Self {
            source,
            lines: Vec::new(),
            visible: false,
            scroll_back: 0,
        }
    }

    /// Pull newly captured lines. Called once per frame.
    pub fn refresh(&mut self) {
        self.lines.extend(self.source.drain());
        if self.lines.len() > MAX_LINES {
            let excess = self.lines.len() - MAX_LINES;
            self.lines.drain(..excess);
            self.scroll_back = self.scroll_back.min(self.lines.len().saturating_sub(1));
        }
    }

    pub fn toggle(&mut self) {
        self.visible = !self.visible;
        if self.visible {
            self.scroll_back = 0;
        }
    }

    pub fn scroll_up(&mut self, n: usize) {
        self.scroll_back = (self.scroll_back + n).min(self.lines.len().saturating_sub(1));
    }

    pub fn scroll_down(&mut self, n: usize) {
        self.scroll_back = self.scroll_back.saturating_sub(n);
    }
}

pub fn render(area: Rect, buf: &mut Buffer, state: &DebugLogState, palette: &Palette) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.muted))
        .title(Span::styled(" Debug Log (PgUp/PgDn) ", palette.title()));
    let inner = block.inner(area);
    block.render(area, buf);

    if inner.height == 0 || inner.width == 0 {
        return;
    }

    let end = state.lines.len().saturating_sub(state.scroll_back);
    let start = end.saturating_sub(inner.height as usize);
    let lines: Vec<Line> = state.lines[start..end]
        .iter()
        .map(|l| Line::from(Span::styled(l.clone(), Style::default().fg(level_color(l, palette)))))
        .collect();
    Paragraph::new(lines).render(inner, buf);
}

/// Color by the level word the fmt layer puts in front of each event.
fn level_color(line: &str, palette: &Palette) -> Color {
    match line.split_whitespace().find(|w| {
        matches!(*w, "ERROR" | "WARN" | "INFO" | "DEBUG" | "TRACE")
    }) {
        Some("ERROR") => palette.error,
        Some("WARN") => Color::Yellow,
        Some("INFO") => palette.ok,
        Some(_) => palette.muted,
        None => palette.fg,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Theme;

    fn filled(n: usize) -> DebugLogState {
        let source = LogBuffer::new();
        for i in 0..n {
            source.push(format!("line {}", i));
        }
        let mut state = DebugLogState::new(source);
        state.refresh();
        state
    }

    #[test]
    fn test_refresh_accumulates() {
        let source = LogBuffer::new();
        let mut state = DebugLogState::new(source.clone());
        source.push("a".to_string());
        state.refresh();
        source.push("b".to_string());
        state.refresh();
        assert_eq!(state.lines, vec!["a", "b"]);
    }

    #[test]
    fn test_scroll_clamps() {
        let mut state = filled(5);
        state.scroll_up(100);
        assert_eq!(state.scroll_back, 4);
        state.scroll_down(3);
        assert_eq!(state.scroll_back, 1);
        state.scroll_down(10);
        assert_eq!(state.scroll_back, 0);
    }

    #[test]
    fn test_toggle_returns_to_tail() {
        let mut state = filled(20);
        state.toggle();
        state.scroll_up(5);
        state.toggle();
        state.toggle();
        assert!(state.visible);
        assert_eq!(state.scroll_back, 0);
    }

    #[test]
    fn test_level_color() {
        let palette = Palette::for_theme(Theme::Dark);
        assert_eq!(level_color("2025-01-01T00:00:00Z ERROR boom", &palette), palette.error);
        assert_eq!(level_color("2025-01-01T00:00:00Z  INFO ok", &palette), palette.ok);
        assert_eq!(level_color("plain", &palette), palette.fg);
    }
}
