//! Help popup overlay: keyboard shortcuts grouped by view.

use ratatui::{
    layout::{Constraint, Layout, Margin, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use super::theme::Palette;

const POPUP_WIDTH: u16 = 84;
const POPUP_HEIGHT: u16 = 24;
const KEY_COLUMN: usize = 12;

/// A titled group of `(keys, action)` rows.
type Section = (&'static str, &'static [(&'static str, &'static str)]);

const GENERAL: Section = (
    "GENERAL",
    &[
        ("? / F1", "Toggle this help"),
        ("Ctrl+T", "Toggle light/dark theme"),
        ("Ctrl+D", "Toggle debug log"),
        ("PgUp/PgDn", "Scroll debug log"),
        ("Ctrl+X", "Log out"),
        ("Ctrl+C", "Quit"),
    ],
);

const SIGN_IN: Section = (
    "SIGN IN",
    &[
        ("Tab", "Email / password"),
        ("Enter", "Submit"),
        ("Ctrl+R", "Switch login / register"),
        ("Ctrl+G", "Sign in with Google"),
        ("Esc", "Back to home"),
    ],
);

const CHAT: Section = (
    "CHAT",
    &[
        ("Tab", "History, messages, compose"),
        ("Enter", "Send / open session"),
        ("Alt+Enter", "New line (one question each)"),
        ("Up/Down", "Move within pane"),
        ("s", "Save selected answer as JSON"),
        ("Ctrl+N", "New chat"),
    ],
);

const DOCUMENTS: Section = (
    "DOCUMENTS",
    &[
        ("Ctrl+O", "Upload a local file"),
        ("Ctrl+L", "Set document URL for questions"),
        ("Ctrl+F", "Fetch document from URL"),
    ],
);

/// Render the help popup centered on screen.
pub fn render_help_popup(frame: &mut Frame, palette: &Palette) {
    let area = frame.area();
    let popup = centered_rect(
        POPUP_WIDTH.min(area.width.saturating_sub(2)),
        POPUP_HEIGHT.min(area.height.saturating_sub(2)),
        area,
    );
    frame.render_widget(Clear, popup);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.accent))
        .style(palette.base())
        .title(Span::styled(" Keys ", palette.title()))
        .title_bottom(Span::styled(
            " any key closes ",
            Style::default().fg(palette.muted),
        ));
    let inner = block.inner(popup).inner(Margin::new(1, 1));
    frame.render_widget(block, popup);

    let [left, right] =
        Layout::horizontal([Constraint::Fill(1), Constraint::Fill(1)]).areas(inner);
    frame.render_widget(Paragraph::new(section_lines(&[GENERAL, SIGN_IN], palette)), left);
    frame.render_widget(Paragraph::new(section_lines(&[CHAT, DOCUMENTS], palette)), right);
}

fn section_lines(sections: &[Section], palette: &Palette) -> Vec<Line<'static>> {
    let heading = Style::default().fg(palette.fg).add_modifier(Modifier::BOLD);
    let key = Style::default().fg(palette.focus);
    let action = Style::default().fg(palette.fg);

    let mut lines = Vec::new();
    for (title, rows) in sections {
        if !lines.is_empty() {
            lines.push(Line::default());
        }
        lines.push(Line::styled(*title, heading));
        lines.extend(rows.iter().map(|(keys, what)| {
            Line::from(vec![
                Span::styled(format!("{:<width$}", keys, width = KEY_COLUMN), key),
                Span::styled(*what, action),
            ])
        }));
    }
    lines
}

/// Centered sub-rect of the given size within `area`.
pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    Rect::new(x, y, width.min(area.width), height.min(area.height))
}
