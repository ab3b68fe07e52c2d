//! Terminal colors for the light and dark themes.

use ratatui::style::{Color, Modifier, Style};

use crate::models::Theme;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub bg: Color,
    pub fg: Color,
    pub muted: Color,
    pub accent: Color,
    pub focus: Color,
    pub bar_bg: Color,
    pub bar_fg: Color,
    pub user: Color,
    pub bot: Color,
    pub ok: Color,
    pub error: Color,
}

impl Palette {
    pub fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Light => Self {
                bg: Color::White,
                fg: Color::Black,
                muted: Color::Gray,
                accent: Color::Blue,
                focus: Color::Magenta,
                bar_bg: Color::Gray,
                bar_fg: Color::Black,
                user: Color::Blue,
                bot: Color::Green,
                ok: Color::Green,
                error: Color::Red,
            },
            Theme::Dark => Self {
                bg: Color::Black,
                fg: Color::White,
                muted: Color::DarkGray,
                accent: Color::Cyan,
                focus: Color::Yellow,
                bar_bg: Color::DarkGray,
                bar_fg: Color::White,
                user: Color::Cyan,
                bot: Color::LightGreen,
                ok: Color::Green,
                error: Color::LightRed,
            },
        }
    }

    pub fn base(&self) -> Style {
        Style::default().fg(self.fg).bg(self.bg)
    }

    pub fn bar(&self) -> Style {
        Style::default().fg(self.bar_fg).bg(self.bar_bg)
    }

    pub fn border(&self, focused: bool) -> Style {
        if focused {
            Style::default().fg(self.focus)
        } else {
            Style::default().fg(self.muted)
        }
    }

    pub fn title(&self) -> Style {
        Style::default().fg(self.accent).add_modifier(Modifier::BOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_themes_differ() {
        let light = Palette::for_theme(Theme::Light);
        let dark = Palette::for_theme(Theme::Dark);
        assert_ne!(light.bg, dark.bg);
        assert_ne!(light.fg, dark.fg);
    }
}
