//! UI rendering for the TUI

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Paragraph, Widget},
    Frame,
};

use super::app::{App, Pane};
use super::auth_form;
use super::compose;
use super::debug_log;
use super::help;
use super::messages;
use super::prompt;
use super::sidebar;
use super::theme::Palette;
use crate::router::View;

/// Width of the history sidebar.
const SIDEBAR_WIDTH: u16 = 30;

/// Main render function
pub fn render(frame: &mut Frame, app: &App) {
    let palette = Palette::for_theme(app.store().theme());
    let area = frame.area();
    frame.render_widget(Block::default().style(palette.base()), area);

    let debug_height = if app.debug_log.visible {
        debug_log::DEBUG_LOG_HEIGHT
    } else {
        0
    };
    let [header_area, main_area, debug_area, status_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Fill(1),
        Constraint::Length(debug_height),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(header_area, frame.buffer_mut(), app, &palette);

    match app.view() {
        View::Home => render_home(main_area, frame.buffer_mut(), &palette),
        View::Auth => auth_form::render(frame, main_area, &app.auth, &palette),
        View::AuthRedirect => render_redirect(main_area, frame.buffer_mut(), &palette),
        View::Chat => render_chat(main_area, frame, app, &palette),
    }

    if app.debug_log.visible {
        debug_log::render(debug_area, frame.buffer_mut(), &app.debug_log, &palette);
    }
    render_status(status_area, frame.buffer_mut(), app, &palette);

    if app.prompt.is_open() {
        prompt::render_prompt_overlay(frame, &app.prompt, &palette);
    }
    if app.show_help {
        help::render_help_popup(frame, &palette);
    }
}

fn render_header(area: Rect, buf: &mut Buffer, app: &App, palette: &Palette) {
    let title = " CogniDoc AI";
    let mut right = format!("[C-t] {} theme  [?] Help ", app.store().theme());
    if app.is_authenticated() {
        right = format!("[C-x] Logout  {}", right);
    }

    let padding = (area.width as usize).saturating_sub(title.len() + right.len());
    let line = Line::from(vec![
        Span::styled(title, palette.bar().add_modifier(Modifier::BOLD)),
        Span::raw(" ".repeat(padding)),
        Span::styled(right, palette.bar()),
    ]);
    Paragraph::new(line).style(palette.bar()).render(area, buf);
}

fn render_home(area: Rect, buf: &mut Buffer, palette: &Palette) {
    let lines = vec![
        Line::from(Span::styled(
            "CogniDoc AI",
            Style::default().fg(palette.accent).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "Ask questions about your PDFs, Word documents and emails.",
            Style::default().fg(palette.fg),
        )),
        Line::from(Span::styled(
            "Upload a file or point at a URL, then chat with it.",
            Style::default().fg(palette.muted),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled(
                "[Enter] Get Started",
                Style::default().fg(palette.focus).add_modifier(Modifier::BOLD),
            ),
            Span::styled("    [q] Quit", Style::default().fg(palette.muted)),
        ]),
    ];
    let top = area.y + area.height.saturating_sub(lines.len() as u16) / 2;
    let text_area = Rect::new(area.x, top, area.width, area.height.saturating_sub(top - area.y));
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .render(text_area, buf);
}

fn render_redirect(area: Rect, buf: &mut Buffer, palette: &Palette) {
    let y = area.y + area.height / 2;
    Paragraph::new(Line::from(Span::styled(
        "Signing you in...",
        Style::default().fg(palette.muted),
    )))
    .alignment(Alignment::Center)
    .render(Rect::new(area.x, y, area.width, 1), buf);
}

fn render_chat(area: Rect, frame: &mut Frame, app: &App, palette: &Palette) {
    let [sidebar_area, content_area] =
        Layout::horizontal([Constraint::Length(SIDEBAR_WIDTH), Constraint::Fill(1)]).areas(area);

    sidebar::render(
        sidebar_area,
        frame.buffer_mut(),
        &app.sidebar,
        &app.chat.sessions,
        app.chat.current_session.as_deref(),
        app.active_pane == Pane::Sidebar,
        palette,
    );

    let [messages_area, compose_area] = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(compose::COMPOSE_HEIGHT),
    ])
    .areas(content_area);

    messages::render(
        messages_area,
        frame.buffer_mut(),
        &app.messages,
        &app.chat,
        app.active_pane == Pane::Messages,
        palette,
    );

    compose::render(
        compose_area,
        frame,
        &app.compose,
        app.chat.document_url.as_deref(),
        app.chat.pending,
        app.active_pane == Pane::Compose && !app.prompt.is_open(),
        palette,
    );
}

fn render_status(area: Rect, buf: &mut Buffer, app: &App, palette: &Palette) {
    if let Some(msg) = &app.status_message {
        let color = if app.status_is_error {
            palette.error
        } else {
            palette.ok
        };
        let line = Line::from(Span::styled(
            format!(" {} ", msg),
            Style::default().fg(color).bg(palette.bar_bg),
        ));
        Paragraph::new(line).style(palette.bar()).render(area, buf);
        return;
    }

    let hints = match app.view() {
        View::Home => " Enter: get started | C-t: theme | ?: help | C-c: quit".to_string(),
        View::Auth | View::AuthRedirect => {
            " Tab: next field | Enter: submit | C-r: login/register | C-g: Google | Esc: back"
                .to_string()
        }
        View::Chat => format!(
            " Tab: {} | C-o: upload | C-l: doc URL | C-f: fetch | C-n: new chat | ?: help",
            app.active_pane.as_str()
        ),
    };
    Paragraph::new(Line::from(Span::styled(hints, palette.bar())))
        .style(palette.bar())
        .render(area, buf);
}
