//! Theme colors, with optional overrides from the `[theme]` config section

use ratatui::style::Color;

use crate::config::ThemeConfig;

/// Theme colors for the UI
#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    pub accent: Color,      // Focused borders, key hints
    pub verified: Color,    // Accepted verdicts, filled gauge
    pub rejected: Color,    // Rejected verdicts, failure gauge
    pub warning: Color,     // Status messages
    pub text: Color,        // Primary text
    pub text_dim: Color,    // Hints, placeholders, disabled input
    pub inactive: Color,    // Unfocused borders
    pub header: Color,      // Section headings
}

impl Default for Theme {
    fn default() -> Self {
        // Catppuccin-inspired
        Self {
            accent: Color::Rgb(250, 179, 135),
            verified: Color::Rgb(166, 218, 149),
            rejected: Color::Rgb(243, 139, 168),
            warning: Color::Rgb(249, 226, 175),
            text: Color::Rgb(205, 214, 244),
            text_dim: Color::Rgb(147, 153, 178),
            inactive: Color::Rgb(88, 91, 112),
            header: Color::Rgb(137, 180, 250),
        }
    }
}

impl Theme {
    /// Build a theme from config, keeping defaults for anything missing or unparsable
    pub fn from_config(config: &ThemeConfig) -> Self {
        let base = Self::default();
        let pick = |value: &Option<String>, fallback: Color| {
            value
                .as_deref()
                .and_then(Self::parse_hex_color)
                .unwrap_or(fallback)
        };

        Self {
            accent: pick(&config.accent, base.accent),
            verified: pick(&config.verified, base.verified),
            rejected: pick(&config.rejected, base.rejected),
            warning: pick(&config.warning, base.warning),
            text: pick(&config.text, base.text),
            text_dim: pick(&config.text_dim, base.text_dim),
            inactive: pick(&config.inactive, base.inactive),
            header: pick(&config.header, base.header),
        }
    }

    /// Parse a hex color string (#RRGGBB or #RGB)
    fn parse_hex_color(s: &str) -> Option<Color> {
        let s = s.trim().trim_start_matches('#');
        if !s.is_ascii() {
            return None;
        }

        if s.len() == 6 {
            let r = u8::from_str_radix(&s[0..2], 16).ok()?;
            let g = u8::from_str_radix(&s[2..4], 16).ok()?;
            let b = u8::from_str_radix(&s[4..6], 16).ok()?;
            Some(Color::Rgb(r, g, b))
        } else if s.len() == 3 {
            let r = u8::from_str_radix(&s[0..1], 16).ok()? * 17;
            let g = u8::from_str_radix(&s[1..2], 16).ok()? * 17;
            let b = u8::from_str_radix(&s[2..3], 16).ok()? * 17;
            Some(Color::Rgb(r, g, b))
        } else {
            None
        }
    }
}
