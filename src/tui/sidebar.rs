//! Sidebar widget: "New chat" plus the saved chat sessions.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Widget},
};

use super::theme::Palette;
use crate::models::SessionSummary;

/// One row in the sidebar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SidebarItem {
    NewChat,
    /// Index into `ChatView::sessions`.
    Session(usize),
}

#[derive(Debug, Default)]
pub struct SidebarState {
    /// Row index; 0 is "New chat".
    pub selected: usize,
}

impl SidebarState {
    pub fn item_count(sessions: &[SessionSummary]) -> usize {
        sessions.len() + 1
    }

    pub fn item(&self, sessions: &[SessionSummary]) -> SidebarItem {
        match self.selected {
            0 => SidebarItem::NewChat,
            n if n <= sessions.len() => SidebarItem::Session(n - 1),
            _ => SidebarItem::NewChat,
        }
    }

    pub fn move_up(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn move_down(&mut self, sessions: &[SessionSummary]) {
        if self.selected + 1 < Self::item_count(sessions) {
            self.selected += 1;
        }
    }

    /// Keep the selection in range after the list was replaced.
    pub fn clamp_selection(&mut self, sessions: &[SessionSummary]) {
        self.selected = self.selected.min(Self::item_count(sessions) - 1);
    }
}

pub fn render(
    area: Rect,
    buf: &mut Buffer,
    state: &SidebarState,
    sessions: &[SessionSummary],
    current_session: Option<&str>,
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
        .title(Span::styled(" History ", palette.title()));

    let inner = block.inner(area);
    block.render(area, buf);

    let available_height = inner.height as usize;
    if available_height == 0 || inner.width == 0 {
        return;
    }

    let count = SidebarState::item_count(sessions);
    let scroll_offset = compute_scroll_offset(state.selected, available_height, count);

    for (row, idx) in (scroll_offset..count).take(available_height).enumerate() {
        let item = if idx == 0 {
            SidebarItem::NewChat
        } else {
            SidebarItem::Session(idx - 1)
        };
        let (text, mut style) = match item {
            SidebarItem::NewChat => (
                "+ New chat".to_string(),
                Style::default().fg(palette.accent),
            ),
            SidebarItem::Session(i) => {
                let session = &sessions[i];
                let is_current = current_session == Some(session.session_id.as_str());
                let marker = if is_current { '*' } else { ' ' };
                let style = if is_current {
                    Style::default().fg(palette.fg).add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(palette.fg)
                };
                (format!("{} {}", marker, session.label()), style)
            }
        };
        if idx == state.selected && focused {
            style = style.add_modifier(Modifier::REVERSED);
        }

        let truncated: String = text.chars().take(inner.width as usize).collect();
        let line_area = Rect::new(inner.x, inner.y + row as u16, inner.width, 1);
        Paragraph::new(Line::from(Span::styled(truncated, style))).render(line_area, buf);
    }
}

/// First visible row so that `selected` stays on screen.
fn compute_scroll_offset(selected: usize, visible: usize, total: usize) -> usize {
    if total <= visible || selected < visible {
        0
    } else {
        (selected + 1 - visible).min(total - visible)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sessions(n: usize) -> Vec<SessionSummary> {
        (0..n)
            .map(|i| SessionSummary {
                session_id: format!("s{}", i),
                created_at: None,
            })
            .collect()
    }

    #[test]
    fn test_first_row_is_new_chat() {
        let list = sessions(2);
        let mut state = SidebarState::default();
        assert_eq!(state.item(&list), SidebarItem::NewChat);
        state.move_down(&list);
        assert_eq!(state.item(&list), SidebarItem::Session(0));
        state.move_down(&list);
        state.move_down(&list);
        assert_eq!(state.item(&list), SidebarItem::Session(1));
        state.move_up();
        assert_eq!(state.item(&list), SidebarItem::Session(0));
    }

    #[test]
    fn test_clamp_after_shrink() {
        let mut state = SidebarState { selected: 5 };
        state.clamp_selection(&sessions(2));
        assert_eq!(state.selected, 2);
        state.clamp_selection(&[]);
        assert_eq!(state.selected, 0);
    }

    #[test]
    fn test_scroll_offset() {
        assert_eq!(compute_scroll_offset(0, 5, 20), 0);
        assert_eq!(compute_scroll_offset(4, 5, 20), 0);
        assert_eq!(compute_scroll_offset(5, 5, 20), 1);
        assert_eq!(compute_scroll_offset(19, 5, 20), 15);
        assert_eq!(compute_scroll_offset(3, 10, 4), 0);
    }
}
