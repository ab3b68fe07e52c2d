//! Login / register screen.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Widget, Wrap},
    Frame,
};

use super::help::centered_rect;
use super::input::TextInput;
use super::theme::Palette;
use crate::auth::AuthMode;

const FORM_WIDTH: u16 = 64;
const FORM_HEIGHT: u16 = 16;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum AuthField {
    #[default]
    Email,
    Password,
}

#[derive(Debug, Default)]
pub struct AuthFormState {
    pub email: TextInput,
    pub password: TextInput,
    pub focus: AuthField,
    pub mode: AuthMode,
    /// Shown under the form until the next submission or mode switch.
    pub error: Option<String>,
    /// A credential request is in flight.
    pub submitting: bool,
    /// Google sign-in URL while waiting for the redirect.
    pub oauth_url: Option<String>,
}

impl AuthFormState {
    pub fn focused_input(&mut self) -> &mut TextInput {
        match self.focus {
            AuthField::Email => &mut self.email,
            AuthField::Password => &mut self.password,
        }
    }

    pub fn switch_field(&mut self) {
        self.focus = match self.focus {
            AuthField::Email => AuthField::Password,
            AuthField::Password => AuthField::Email,
        };
    }

    pub fn toggle_mode(&mut self) {
        self.mode = self.mode.toggle();
        self.error = None;
    }

    /// Forget typed credentials, keep the mode.
    pub fn reset(&mut self) {
        let mode = self.mode;
        *self = Self {
            mode,
            ..Self::default()
        };
    }
}

pub fn render(frame: &mut Frame, area: Rect, state: &AuthFormState, palette: &Palette) {
    let form_area = centered_rect(FORM_WIDTH, FORM_HEIGHT, area);
    let title = match state.mode {
        AuthMode::Login => " Login ",
        AuthMode::Register => " Register ",
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(palette.accent))
        .title(Span::styled(title, palette.title()));
    let inner = block.inner(form_area);
    frame.render_widget(block, form_area);

    if inner.height < 8 || inner.width < 20 {
        return;
    }

    let field_width = inner.width.saturating_sub(4);
    let email_area = Rect::new(inner.x + 2, inner.y + 1, field_width, 3);
    let password_area = Rect::new(inner.x + 2, inner.y + 4, field_width, 3);
    render_field(frame, email_area, "Email", &state.email, None, state.focus == AuthField::Email, palette);
    render_field(
        frame,
        password_area,
        "Password",
        &state.password,
        Some('*'),
        state.focus == AuthField::Password,
        palette,
    );

    let mut lines = Vec::new();
    if state.submitting {
        lines.push(Line::from(Span::styled(
            "Please wait...",
            Style::default().fg(palette.muted),
        )));
    } else if let Some(err) = &state.error {
        lines.push(Line::from(Span::styled(
            err.clone(),
            Style::default().fg(palette.error),
        )));
    }
    if let Some(url) = &state.oauth_url {
        lines.push(Line::from(Span::styled(
            "Open in your browser to sign in with Google:",
            Style::default().fg(palette.fg),
        )));
        lines.push(Line::from(Span::styled(
            url.clone(),
            Style::default().fg(palette.accent),
        )));
    } else {
        let switch = match state.mode {
            AuthMode::Login => "Don't have an account? C-r: Register here",
            AuthMode::Register => "Already have an account? C-r: Login here",
        };
        lines.push(Line::from(vec![
            Span::styled(
                "Enter",
                Style::default().fg(palette.focus).add_modifier(Modifier::BOLD),
            ),
            Span::styled(": submit  ", Style::default().fg(palette.muted)),
            Span::styled(
                "C-g",
                Style::default().fg(palette.focus).add_modifier(Modifier::BOLD),
            ),
            Span::styled(": Sign in with Google", Style::default().fg(palette.muted)),
        ]));
        lines.push(Line::from(Span::styled(
            switch,
            Style::default().fg(palette.muted),
        )));
    }

    let footer_area = Rect::new(
        inner.x + 2,
        inner.y + 8,
        field_width,
        inner.height.saturating_sub(8),
    );
    Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .render(footer_area, frame.buffer_mut());
}

fn render_field(
    frame: &mut Frame,
    area: Rect,
    label: &str,
    input: &TextInput,
    mask: Option<char>,
    focused: bool,
    palette: &Palette,
) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(palette.border(focused))
        .title(Span::styled(format!(" {} ", label), Style::default().fg(palette.muted)));
    let inner = block.inner(area);
    frame.render_widget(block, area);
    if inner.width == 0 || inner.height == 0 {
        return;
    }

    let display = input.window((inner.width as usize).saturating_sub(1), mask);
    Paragraph::new(Line::from(Span::styled(
        format!(" {}", display.visible),
        Style::default().fg(palette.fg),
    )))
    .render(inner, frame.buffer_mut());

    if focused {
        frame.set_cursor_position((inner.x + 1 + display.cursor_offset as u16, inner.y));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_mode_clears_error() {
        let mut form = AuthFormState {
            error: Some("Invalid credentials".to_string()),
            ..AuthFormState::default()
        };
        form.toggle_mode();
        assert_eq!(form.mode, AuthMode::Register);
        assert!(form.error.is_none());
    }

    #[test]
    fn test_typing_goes_to_focused_field() {
        let mut form = AuthFormState::default();
        form.focused_input().insert_char('a');
        form.switch_field();
        form.focused_input().insert_char('x');
        assert_eq!(form.email.value(), "a");
        assert_eq!(form.password.value(), "x");
    }

    #[test]
    fn test_reset_keeps_mode() {
        let mut form = AuthFormState::default();
        form.toggle_mode();
        form.email.insert_char('a');
        form.reset();
        assert!(form.email.is_empty());
        assert_eq!(form.mode, AuthMode::Register);
    }
}
